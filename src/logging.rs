// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use flexi_logger::{Logger, LoggerHandle};
use log::LevelFilter;

//==============================================================================
// Associate Functions
//==============================================================================

/// Initializes the default `flexi_logger` sink at the given level.
///
/// The library itself never calls this: every module reaches for the `log`
/// facade macros only. Applications embedding the reactor opt in by calling
/// this once at start-up (see `src/bin/echo_demo.rs`).
pub fn init(level: LevelFilter) -> LoggerHandle {
    Logger::try_with_str(level.to_string())
        .expect("invalid log level filter")
        .start()
        .expect("failed to start flexi_logger sink")
}
