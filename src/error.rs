//! Error types for the Weather MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Weather MCP Server
#[derive(Error, Debug)]
pub enum WeatherMcpError {
    /// Open-Meteo API errors
    #[error("Weather API error: {0}")]
    Weather(#[from] WeatherApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP errors raised inside the retry middleware
    #[error("HTTP error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
}

impl WeatherMcpError {
    /// Whether this error is reported to the host as a JSON-RPC error
    /// rather than as tool output.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            WeatherMcpError::Mcp(
                McpError::UnknownTool { .. } | McpError::InvalidArguments { .. }
            )
        )
    }
}

/// Open-Meteo API errors
#[derive(Error, Debug)]
pub enum WeatherApiError {
    #[error("{endpoint} request failed ({status}): {body}")]
    RequestFailed {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{endpoint} returned a malformed response: {message}")]
    MalformedResponse {
        endpoint: &'static str,
        message: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },

    #[error("Transport error: {message}")]
    TransportError { message: String },
}

/// Result type alias for Weather MCP operations
pub type Result<T> = std::result::Result<T, WeatherMcpError>;
