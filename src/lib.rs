//! Weather MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing a single `get-weather` tool.
//! Locations are resolved and looked up through the Open-Meteo APIs.

pub mod config;
pub mod error;
pub mod mcp;
pub mod weather;

pub use config::Config;
pub use error::{Result, WeatherMcpError};
