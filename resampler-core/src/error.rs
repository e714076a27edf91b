// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `error` module defines the error type returned by fallible, recoverable operations.
//!
//! Precondition violations (invalid lengths, out-of-range rates, malformed method identifiers)
//! are not represented here; those are programming errors and are reported via `panic!`/`assert!`
//! at the call site rather than as a `Result`.

use std::error::Error as StdError;
use std::fmt;

/// `Error` enumerates the recoverable failure modes of constructing or running a resampler.
#[derive(Debug)]
pub enum Error {
    /// The instance could not be constructed: an unsupported method for this build, an invalid
    /// channel map, a missing format-conversion primitive, or a backend that failed to
    /// initialize.
    Config(&'static str),
    /// A backend reported a runtime error from `process`, `reset`, or `update_rates`. Backends are
    /// treated as infallible in steady state, so this is always fatal to the instance.
    Backend(Box<dyn StdError + Send + Sync>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "resampler configuration error: {}", msg),
            Error::Backend(err) => write!(f, "resampler backend error: {}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Backend(err) => Some(err.as_ref()),
            Error::Config(_) => None,
        }
    }
}

/// A specialized `Result` type for fallible resampler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to create a configuration error.
pub fn config_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::Config(msg))
}

/// Convenience function to wrap a backend error.
pub fn backend_error<T>(err: impl StdError + Send + Sync + 'static) -> Result<T> {
    Err(Error::Backend(Box::new(err)))
}
