// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use custom_error::custom_error;

//==============================================================================
// Structures
//==============================================================================

custom_error! {
    /// Failure conditions raised by the reactor (CX) and message exchange (MX).
    #[derive(PartialEq, Eq, Clone)]
    pub Fail

    InvalidFd { fd: i32 } = "fd {fd} is not owned by this reactor",
    IoError { origin: &'static str, code: i32 } = "{origin} failed with errno {code}",
    PeerClosed { origin: &'static str } = "peer closed during {origin}",
    MalformedFrame { details: &'static str } = "malformed frame: {details}",
    ReadinessFailed { code: i32 } = "readiness call failed with errno {code}",
    AwaitTimedOut = "await deadline elapsed before the message arrived",
    AddressInUse = "address already in use",
    TooManyOpenedFiles { details: &'static str } = "{details}",
    Malformed { details: &'static str } = "{details}",
}

//==============================================================================
// Trait Implementations
//==============================================================================

/// `custom_error!` derives `Display`/`Error`; `Debug` is spelled out here in
/// terms of `Display` so `Fail` can sit inside `#[derive(Debug)]` structures.
impl std::fmt::Debug for Fail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
