//! Error module
pub use std::io::ErrorKind as IoErrorKind;
use std::{borrow::Cow, io};
use thiserror::Error;

/// A unified error enum for everything that can go wrong while probing a
/// session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("An error occured during the attempt of performing I/O: {}", message)]
    /// An error occured when opening the socket or the runtime.
    Io {
        /// A list specifying general categories of I/O error.
        kind: IoErrorKind,
        /// The error description.
        message: String,
    },
    #[error("{}", _0)]
    /// An error raised by the TDS client, passed through unchanged.
    Driver(#[from] tiberius::error::Error),
    #[error("Configuration error: {}", _0)]
    /// The connection settings could not be parsed or are inconsistent.
    Config(Cow<'static, str>),
    #[error("Query returned no value: {}", _0)]
    /// A scalar query produced no row, or a NULL.
    MissingValue(Cow<'static, str>),
}

impl Error {
    /// Returns the error code, if the error originates from the
    /// server.
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::Driver(e) => e.code(),
            _ => None,
        }
    }

    /// The address the server asked the client to reconnect to, if the
    /// login was answered with a routing request.
    pub fn routing_target(&self) -> Option<(&str, u16)> {
        match self {
            Error::Driver(tiberius::error::Error::Routing { host, port }) => {
                Some((host.as_str(), *port))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Self::Io {
            kind: err.kind(),
            message: format!("{}", err),
        }
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Error {
        Error::Config(format!("Error parsing an integer: {}", err).into())
    }
}

impl From<connection_string::Error> for Error {
    fn from(err: connection_string::Error) -> Error {
        let err = Cow::Owned(format!("{}", err));
        Error::Config(err)
    }
}
