//! Weather MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server exposing current weather for a
//! named location via the Open-Meteo APIs.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use weather_mcp_server::config::{server, Config};
use weather_mcp_server::error::Result;
use weather_mcp_server::mcp::server::McpServer;
use weather_mcp_server::mcp::tools::{weather_registry, GetWeatherTool, McpTool};
use weather_mcp_server::weather::client::OpenMeteoClient;

/// Weather MCP Server
#[derive(Parser)]
#[command(name = "weather-mcp-server")]
#[command(author, version, about = "Weather MCP Server - current conditions for any named location")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the geocoding endpoint
    #[arg(long, global = true)]
    geocoding_url: Option<String>,

    /// Override the forecast endpoint
    #[arg(long, global = true)]
    forecast_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Retries on transient network errors
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the weather once and print the tool output
    Lookup {
        /// Place name to geocode
        location: String,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration
    fn config(&self) -> Result<Config> {
        let mut config = Config::new()?;

        if let Some(url) = &self.geocoding_url {
            config.geocoding_url = url.clone();
        }
        if let Some(url) = &self.forecast_url {
            config.forecast_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging; stdout carries protocol frames
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Weather MCP server failed");
            ExitCode::FAILURE
        }
    }
}

/// Run the selected command; tool-level failures map to a failing exit code
async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.config()?;
    let client = Arc::new(OpenMeteoClient::new(&config)?);
    let registry = weather_registry(client)?;

    match cli.command {
        Some(Commands::Lookup { location }) => {
            let result = registry
                .call_tool(GetWeatherTool::NAME, json!({ "location": location }))
                .await?;
            println!("{}", result.text_content());
            if result.is_error {
                return Ok(ExitCode::FAILURE);
            }
        }
        None => {
            tracing::info!(
                name = server::NAME,
                version = server::VERSION,
                port = server::PORT,
                geocoding_url = %config.geocoding_url,
                forecast_url = %config.forecast_url,
                "Starting MCP server on stdio"
            );
            McpServer::new(registry).run_stdio().await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
