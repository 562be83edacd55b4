// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::time::Duration;

//==============================================================================
// Constants
//==============================================================================

/// Default cap on a single message frame's payload.
const DEFAULT_MAX_FRAME_SIZE: u32 = 1 << 20;

/// Default upper bound on a single readiness wait.
const DEFAULT_POLL_TIMEOUT_CAP: Duration = Duration::from_secs(1);

/// Default starting capacity for ingress/egress buffers.
const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Default starting capacity for the fd table.
const DEFAULT_FD_TABLE_CAPACITY: usize = 64;

//==============================================================================
// Structures
//==============================================================================

/// Tunable policy knobs for [crate::reactor::Reactor].
///
/// None of these are load-bearing for correctness; they bound resource usage
/// (frame size, buffer growth) or latency (how quickly `shutdown()` is noticed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReactorConfig {
    max_frame_size: u32,
    poll_timeout_cap: Duration,
    initial_buffer_capacity: usize,
    initial_fd_table_capacity: usize,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate functions for [ReactorConfig].
impl ReactorConfig {
    /// Maximum payload size the framer accepts before treating the header as malformed.
    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    /// Returns a copy of this configuration with a new frame-size cap.
    pub fn with_max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Upper bound on how long a single readiness wait may block.
    pub fn poll_timeout_cap(&self) -> Duration {
        self.poll_timeout_cap
    }

    /// Returns a copy of this configuration with a new poll-wait cap.
    pub fn with_poll_timeout_cap(mut self, poll_timeout_cap: Duration) -> Self {
        self.poll_timeout_cap = poll_timeout_cap;
        self
    }

    /// Starting capacity reserved for each ingress/egress buffer.
    pub fn initial_buffer_capacity(&self) -> usize {
        self.initial_buffer_capacity
    }

    /// Returns a copy of this configuration with a new initial buffer capacity.
    pub fn with_initial_buffer_capacity(mut self, initial_buffer_capacity: usize) -> Self {
        self.initial_buffer_capacity = initial_buffer_capacity;
        self
    }

    /// Starting capacity reserved for the fd table.
    pub fn initial_fd_table_capacity(&self) -> usize {
        self.initial_fd_table_capacity
    }

    /// Returns a copy of this configuration with a new initial fd-table capacity.
    pub fn with_initial_fd_table_capacity(mut self, initial_fd_table_capacity: usize) -> Self {
        self.initial_fd_table_capacity = initial_fd_table_capacity;
        self
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

/// Default trait implementation for [ReactorConfig].
impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            poll_timeout_cap: DEFAULT_POLL_TIMEOUT_CAP,
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            initial_fd_table_capacity: DEFAULT_FD_TABLE_CAPACITY,
        }
    }
}
