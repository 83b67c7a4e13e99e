//! Error types for the dialer and tunnel lifecycle

use std::fmt;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Step of the protected-socket pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStage {
    /// Allocating the OS socket
    Create,
    /// Handing the descriptor to the protector
    Protect,
    /// Connecting to the resolved address
    Connect,
    /// Adapting the connected descriptor into a runtime handle
    Wrap,
}

impl fmt::Display for SocketStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketStage::Create => write!(f, "create"),
            SocketStage::Protect => write!(f, "protect"),
            SocketStage::Connect => write!(f, "connect"),
            SocketStage::Wrap => write!(f, "wrap"),
        }
    }
}

/// Dialer error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("failed to resolve address {host}: {source}")]
    Resolution {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("socket {stage} failed for {addr}: {source}")]
    Socket {
        stage: SocketStage,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Packet stack error: {0}")]
    Stack(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }

    pub fn resolution<S: Into<String>>(host: S, source: io::Error) -> Self {
        Error::Resolution {
            host: host.into(),
            source,
        }
    }

    pub fn socket(stage: SocketStage, addr: SocketAddr, source: io::Error) -> Self {
        Error::Socket {
            stage,
            addr,
            source,
        }
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }

    pub fn engine<S: Into<String>>(msg: S) -> Self {
        Error::Engine(msg.into())
    }

    pub fn stack<S: Into<String>>(msg: S) -> Self {
        Error::Stack(msg.into())
    }

    pub fn state<S: Into<String>>(msg: S) -> Self {
        Error::State(msg.into())
    }

    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        Error::Cancelled(msg.into())
    }

    /// Whether the error only affects the connection being dialed
    pub fn is_per_connection(&self) -> bool {
        matches!(
            self,
            Error::Resolution { .. }
                | Error::Socket { .. }
                | Error::Unsupported(_)
                | Error::Cancelled(_)
        )
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let e = Error::config("test error");
        assert!(matches!(e, Error::Config(_)));
        assert!(!e.is_per_connection());
    }

    #[test]
    fn test_error_display() {
        let e = Error::unsupported("unsupported network protocol: sctp");
        assert_eq!(e.to_string(), "Unsupported: unsupported network protocol: sctp");
    }

    #[test]
    fn test_resolution_error_keeps_host() {
        let e = Error::resolution(
            "example.com:443",
            io::Error::new(io::ErrorKind::NotFound, "no such host"),
        );
        assert_eq!(
            e.to_string(),
            "failed to resolve address example.com:443: no such host"
        );
        assert!(e.is_per_connection());
    }

    #[test]
    fn test_socket_error_names_stage() {
        let addr: SocketAddr = "[::ffff:127.0.0.1]:80".parse().unwrap();
        let e = Error::socket(
            SocketStage::Connect,
            addr,
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        assert!(e.to_string().starts_with("socket connect failed for [::ffff:127.0.0.1]:80"));
        assert!(std::error::Error::source(&e).is_some());
    }
}
