//! Error types for DbProxy operations.

use std::fmt;

/// The primary error type for all DbProxy operations.
#[derive(Debug)]
pub enum Error {
    /// Protocol errors (malformed or truncated wire data)
    Protocol(ProtocolError),
    /// Configuration errors
    Config(ConfigError),
    /// I/O errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    pub raw_data: Option<Vec<u8>>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The configuration document could not be parsed
    Parse,
    /// The configuration parsed but is inconsistent
    Invalid,
    /// The remote configuration store could not be read
    Store,
    /// No file path is associated with the configuration
    NoPath,
}

impl Error {
    /// Build a protocol error, optionally keeping the offending payload.
    pub fn protocol(message: impl Into<String>, raw_data: Option<&[u8]>) -> Self {
        Error::Protocol(ProtocolError {
            message: message.into(),
            raw_data: raw_data.map(<[u8]>::to_vec),
            source: None,
        })
    }

    /// Build a configuration error of the given kind.
    pub fn config(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            kind,
            message: message.into(),
            source: None,
        })
    }

    /// Does this error mean the connection's byte stream can no longer be trusted?
    ///
    /// Protocol and I/O errors leave the peer in an unknown state, so the
    /// session layer should close or reset the connection.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Error::Protocol(_) | Error::Io(_))
    }

    /// Raw payload attached to a protocol error, if any.
    pub fn raw_data(&self) -> Option<&[u8]> {
        match self {
            Error::Protocol(e) => e.raw_data.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Protocol(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for DbProxy operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_keeps_raw_payload() {
        let err = Error::protocol("truncated OK packet", Some(&[0x00, 0xFC]));
        assert_eq!(err.raw_data(), Some(&[0x00, 0xFC][..]));
        assert!(err.is_connection_fatal());
        assert_eq!(err.to_string(), "Protocol error: truncated OK packet");
    }

    #[test]
    fn config_errors_are_not_connection_fatal() {
        let err = Error::config(ConfigErrorKind::Invalid, "unknown node 'dnode_9'");
        assert!(!err.is_connection_fatal());
        assert!(err.raw_data().is_none());
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown node 'dnode_9'"
        );
        match err {
            Error::Config(e) => assert_eq!(e.kind, ConfigErrorKind::Invalid),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn io_error_source_is_exposed() {
        use std::error::Error as _;

        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "proxy.yaml",
        ));
        assert!(err.is_connection_fatal());
        assert!(err.source().is_some());
    }
}
