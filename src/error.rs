// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// A scene kernel error.
#[derive(Debug)]
pub enum Error {
    /// An operation received geometrically impossible arguments,
    /// e.g. an elliptical arc with non-finite radii.
    InvalidArgument(String),

    /// An input document (SVG or binary) violates its grammar.
    ParseFailed(String),

    /// An operation is not supported by the current scene state,
    /// e.g. serializing a symbol or a backend failure.
    InvalidOperation(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(ref msg) => {
                write!(f, "invalid argument: {}", msg)
            }
            Error::ParseFailed(ref msg) => {
                write!(f, "parsing failed cause {}", msg)
            }
            Error::InvalidOperation(ref msg) => {
                write!(f, "invalid operation: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}
