// Tool trait and name-keyed registry

use crate::error::{McpError, McpResult};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::schema::ArgumentSchema;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Declared arguments, checked before `execute` is reached
    fn arguments(&self) -> &ArgumentSchema;

    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.arguments().to_json_schema(),
        }
    }

    /// Execute the tool with already validated arguments
    async fn execute(&self, arguments: Map<String, Value>) -> McpResult<CallToolResult>;
}

/// Tool registry, fixed after startup
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replaced previously registered tool");
        }
    }

    /// Builder-style registration
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all tool schemas, ordered by name
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate and execute one invocation.
    pub async fn call(&self, name: &str, arguments: &Value) -> McpResult<CallToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;

        let validated = tool.arguments().validate(arguments)?;
        tracing::debug!(tool = %name, "Arguments validated");

        tool.execute(validated).await
    }
}
