//! MCP Tool definitions and handlers
//!
//! Holds the tool registry and the `get-weather` tool.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::error::{McpError, Result};
use crate::mcp::types::{CallToolResult, Tool};
use crate::weather::client::WeatherProvider;
use crate::weather::lookup::{lookup_current_weather, LookupOutcome};

/// A callable tool with a typed, validated argument struct
#[async_trait]
pub trait McpTool: Send + Sync + 'static {
    /// Arguments; their JSON schema is advertised to the host
    type Args: DeserializeOwned + JsonSchema + Validate + Send;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    /// Run the tool with arguments that already passed validation
    async fn call(&self, args: Self::Args) -> Result<CallToolResult>;
}

#[async_trait]
trait RegisteredTool: Send + Sync {
    fn definition(&self) -> &Tool;

    async fn invoke(&self, arguments: Value) -> Result<CallToolResult>;
}

struct TypedTool<T> {
    tool: T,
    definition: Tool,
}

#[async_trait]
impl<T: McpTool> RegisteredTool for TypedTool<T> {
    fn definition(&self) -> &Tool {
        &self.definition
    }

    async fn invoke(&self, arguments: Value) -> Result<CallToolResult> {
        let args = parse_arguments::<T::Args>(arguments)?;
        self.tool.call(args).await
    }
}

/// Deserialize and validate tool arguments
pub fn parse_arguments<A>(arguments: Value) -> Result<A>
where
    A: DeserializeOwned + Validate,
{
    let args: A = serde_json::from_value(arguments).map_err(|e| McpError::InvalidArguments {
        message: e.to_string(),
    })?;

    args.validate().map_err(|e| McpError::InvalidArguments {
        message: e.to_string(),
    })?;

    Ok(args)
}

/// JSON schema for a tool's arguments, without the document-level meta keys
pub fn input_schema<A: JsonSchema>() -> Result<Value> {
    let mut schema = serde_json::to_value(schemars::schema_for!(A))?;
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    Ok(schema)
}

/// Tool registry
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn RegisteredTool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its name
    pub fn register<T: McpTool>(&mut self, tool: T) -> Result<()> {
        if self.find(T::NAME).is_some() {
            return Err(McpError::DuplicateTool {
                name: T::NAME.to_string(),
            }
            .into());
        }

        let definition = Tool {
            name: T::NAME.to_string(),
            description: Some(T::DESCRIPTION.to_string()),
            input_schema: input_schema::<T::Args>()?,
        };

        tracing::debug!(tool = T::NAME, "Registered tool");
        self.tools.push(Box::new(TypedTool { tool, definition }));
        Ok(())
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.definition().clone()).collect()
    }

    /// Call a tool by name.
    ///
    /// Unknown tools and invalid arguments are returned as errors without
    /// running the tool. Failures inside the tool become an error result.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let tool = self.find(name).ok_or_else(|| McpError::UnknownTool {
            name: name.to_string(),
        })?;

        match tool.invoke(arguments).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_protocol_error() => Err(e),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool invocation failed");
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }

    fn find(&self, name: &str) -> Option<&dyn RegisteredTool> {
        self.tools
            .iter()
            .find(|t| t.definition().name == name)
            .map(|t| t.as_ref())
    }
}

/// Build the registry exposing the weather tool
pub fn weather_registry(provider: Arc<dyn WeatherProvider>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(GetWeatherTool::new(provider))?;
    Ok(registry)
}

// ==================== get-weather ====================

/// Arguments for `get-weather`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct GetWeatherArgs {
    /// The location to get the weather for
    #[validate(length(min = 1))]
    pub location: String,
}

/// Current weather for a named location
pub struct GetWeatherTool {
    provider: Arc<dyn WeatherProvider>,
}

impl GetWeatherTool {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl McpTool for GetWeatherTool {
    type Args = GetWeatherArgs;

    const NAME: &'static str = "get-weather";
    const DESCRIPTION: &'static str = "Get the weather for a location";

    async fn call(&self, args: GetWeatherArgs) -> Result<CallToolResult> {
        match lookup_current_weather(self.provider.as_ref(), &args.location).await? {
            LookupOutcome::NotFound => Ok(CallToolResult::text(format!(
                "No location found for {}",
                args.location
            ))),
            LookupOutcome::Found { report, .. } => {
                Ok(CallToolResult::text(serde_json::to_string_pretty(&report)?))
            }
        }
    }
}
