//! Error handling for the latency tester

use std::io;
use thiserror::Error;

/// Custom error types for the latency tester
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// Hostname resolution errors
    #[error("DNS resolution error: {0}")]
    DnsResolution(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (addresses, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// The OS refused to create or use a socket
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed or mismatched ICMP/DNS reply
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Test execution errors
    #[error("Test execution error: {0}")]
    TestExecution(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new DNS resolution error
    pub fn dns_resolution<S: Into<String>>(message: S) -> Self {
        Self::DnsResolution(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new permission error
    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a new test execution error
    pub fn test_execution<S: Into<String>>(message: S) -> Self {
        Self::TestExecution(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Classify an I/O error from a socket operation, prefixing the message
    /// with the operation that failed.
    pub fn from_io(operation: &str, error: io::Error) -> Self {
        let message = format!("{}: {}", operation, error);
        if is_permission_error(&error) {
            Self::PermissionDenied(message)
        } else {
            match error.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout(message),
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::AddrNotAvailable
                | io::ErrorKind::AddrInUse => Self::Network(message),
                _ => match error.raw_os_error() {
                    Some(code) if is_unreachable_code(code) => Self::Network(message),
                    _ => Self::Io(message),
                },
            }
        }
    }

    /// Whether this error should escalate the ICMP socket fallback chain
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::DnsResolution(_) => "DNS",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::PermissionDenied(_) => "PERMISSION",
            Self::Protocol(_) => "PROTOCOL",
            Self::TestExecution(_) => "TEST",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (the next probe may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::HttpRequest(_) | Self::Timeout(_) | Self::Protocol(_) => true,
            Self::DnsResolution(_) | Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::PermissionDenied(_) | Self::Io(_) | Self::TestExecution(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::Network(msg) => {
                format!("Network connectivity issue: {}\n\nSuggestion: Check that the target is reachable over this address family.", msg)
            }
            Self::DnsResolution(msg) => {
                format!("DNS resolution failed: {}\n\nSuggestion: Comparison mode needs both an A and an AAAA record for the hostname.", msg)
            }
            Self::HttpRequest(msg) => {
                format!("HTTP request failed: {}\n\nSuggestion: Check that the target serves HTTP on the selected port.", msg)
            }
            Self::Timeout(msg) => {
                format!("Request timed out: {}\n\nSuggestion: Increase the timeout value using --timeout or check your network connection.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check the format of your addresses, ports and query names.", msg)
            }
            Self::Io(msg) => {
                format!("I/O operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input values.", msg)
            }
            Self::PermissionDenied(msg) => {
                format!("Permission denied: {}\n\nSuggestion: ICMP raw sockets need elevated privileges. Run as root, grant CAP_NET_RAW, or widen net.ipv4.ping_group_range.", msg)
            }
            Self::Protocol(msg) => {
                format!("Unexpected reply: {}\n\nSuggestion: The server answered with a malformed or mismatched packet.", msg)
            }
            Self::TestExecution(msg) => {
                format!("Test execution failed: {}\n\nSuggestion: This may be a temporary issue. Try running the test again.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Network(_) | Self::DnsResolution(_) | Self::HttpRequest(_) => 2,  // Network issues
            Self::Timeout(_) => 3,
            Self::PermissionDenied(_) => 4,
            Self::Io(_) => 5,
            Self::TestExecution(_) | Self::Protocol(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::DnsResolution(_) | Self::HttpRequest(_) | Self::Protocol(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::PermissionDenied(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Io(_) | Self::TestExecution(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

fn is_permission_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    match error.raw_os_error() {
        #[cfg(unix)]
        Some(code) => code == libc::EPERM || code == libc::EACCES,
        #[cfg(windows)]
        Some(code) => code == WSAEACCES,
        #[cfg(not(any(unix, windows)))]
        Some(_) => false,
        None => false,
    }
}

#[cfg(windows)]
const WSAEACCES: i32 = 10013;

fn is_unreachable_code(code: i32) -> bool {
    #[cfg(unix)]
    {
        code == libc::ENETUNREACH || code == libc::EHOSTUNREACH
    }
    #[cfg(windows)]
    {
        // WSAENETUNREACH, WSAEHOSTUNREACH
        code == 10051 || code == 10065
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = code;
        false
    }
}

// Standard library error conversions
impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        if is_permission_error(&error) {
            Self::permission_denied(error.to_string())
        } else if matches!(error.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
            Self::timeout(error.to_string())
        } else {
            Self::io(error.to_string())
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<trust_dns_resolver::error::ResolveError> for AppError {
    fn from(error: trust_dns_resolver::error::ResolveError) -> Self {
        Self::dns_resolution(error.to_string())
    }
}

impl From<rustls::Error> for AppError {
    fn from(error: rustls::Error) -> Self {
        Self::network(format!("TLS error: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::timeout("operation timed out")
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<std::fmt::Error> for AppError {
    fn from(error: std::fmt::Error) -> Self {
        Self::internal(format!("Formatting error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for structured error logging and user feedback
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));

        if self.verbose {
            eprintln!();
            eprintln!("{}", error.user_friendly_message());

            if error.is_recoverable() {
                eprintln!();
                if self.use_color {
                    use colored::Colorize;
                    eprintln!("{}", "This error might be temporary. You can try running the command again.".green());
                } else {
                    eprintln!("This error might be temporary. You can try running the command again.");
                }
            }
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(!config_error.is_recoverable());
        assert_eq!(config_error.exit_code(), 1);

        let protocol_error = AppError::protocol("DNS response ID mismatch: got 1, expected 2");
        assert_eq!(protocol_error.category(), "PROTOCOL");
        assert!(protocol_error.is_recoverable());
        assert_eq!(protocol_error.exit_code(), 6);
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::network("network"),
            AppError::dns_resolution("dns"),
            AppError::http_request("http"),
            AppError::timeout("timeout"),
            AppError::validation("validation"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::permission_denied("perm"),
            AppError::protocol("proto"),
            AppError::test_execution("test"),
            AppError::internal("internal"),
        ];

        let expected_categories = [
            "CONFIG", "NETWORK", "DNS", "HTTP", "TIMEOUT", "VALIDATION", "IO",
            "PARSE", "PERMISSION", "PROTOCOL", "TEST", "INTERNAL",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::network("test").exit_code(), 2);
        assert_eq!(AppError::dns_resolution("test").exit_code(), 2);
        assert_eq!(AppError::timeout("test").exit_code(), 3);
        assert_eq!(AppError::permission_denied("test").exit_code(), 4);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::test_execution("test").exit_code(), 6);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_permission_classification_uses_error_kind() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "whatever the OS says");
        let err = AppError::from_io("create socket", denied);
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains("create socket"));

        // Wording alone never triggers escalation
        let worded = io::Error::new(io::ErrorKind::Other, "permission denied");
        assert!(!AppError::from_io("create socket", worded).is_permission_denied());
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_classification_uses_raw_os_error() {
        let eperm = io::Error::from_raw_os_error(libc::EPERM);
        assert!(AppError::from_io("socket", eperm).is_permission_denied());

        let eacces = io::Error::from_raw_os_error(libc::EACCES);
        assert!(AppError::from(eacces).is_permission_denied());

        let unreachable = io::Error::from_raw_os_error(libc::ENETUNREACH);
        let err = AppError::from_io("connect", unreachable);
        assert!(!err.is_permission_denied());
        assert_eq!(err.category(), "NETWORK");
    }

    #[test]
    fn test_timeout_classification() {
        let would_block = io::Error::new(io::ErrorKind::WouldBlock, "again");
        assert_eq!(AppError::from_io("recv", would_block).category(), "TIMEOUT");

        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(AppError::from_io("recv", timed_out).category(), "TIMEOUT");
    }

    #[test]
    fn test_user_friendly_messages() {
        let error = AppError::permission_denied("raw socket");
        let message = error.user_friendly_message();
        assert!(message.contains("Permission denied"));
        assert!(message.contains("Suggestion:"));
        assert!(message.contains("CAP_NET_RAW"));
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::timeout("no reply");
        let formatted_no_color = error.format_for_console(false);
        let formatted_color = error.format_for_console(true);

        assert_eq!(formatted_no_color, "[TIMEOUT] Timeout error: no reply");
        assert!(formatted_color.contains("TIMEOUT"));
        assert!(formatted_color.contains("no reply"));
    }

    #[test]
    fn test_conversions() {
        let url_error = url::Url::parse("not a url").unwrap_err();
        assert_eq!(AppError::from(url_error).category(), "PARSE");

        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(AppError::from(json_error).to_string().contains("JSON parse error"));

        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        assert_eq!(AppError::from(dotenv_error).category(), "CONFIG");

        let addr_error = "not-an-ip".parse::<std::net::IpAddr>().unwrap_err();
        assert!(AppError::from(addr_error).to_string().contains("IP address parse error"));

        let anyhow_error = anyhow::anyhow!("boom");
        assert_eq!(AppError::from(anyhow_error).category(), "INTERNAL");
    }
}
