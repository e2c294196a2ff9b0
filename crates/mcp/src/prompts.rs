// Prompts: named templates that run a tool call and render the result as a message

use crate::backend::SearchBackend;
use crate::error::{McpError, McpResult};
use crate::protocol::{GetPromptResult, PromptMessage, PromptSchema, ToolContent};
use crate::schema::ArgumentSchema;
use crate::tools::{search_arguments, SearchArgs, TOOL_SEARCH};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait Prompt: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn arguments(&self) -> &ArgumentSchema;

    fn schema(&self) -> PromptSchema {
        PromptSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            arguments: self.arguments().prompt_arguments(),
        }
    }

    /// Render the prompt from already validated arguments
    async fn render(&self, arguments: Map<String, Value>) -> McpResult<GetPromptResult>;
}

/// Prompt registry, fixed after startup
#[derive(Clone, Default)]
pub struct PromptRegistry {
    prompts: BTreeMap<String, Arc<dyn Prompt>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, prompt: Arc<dyn Prompt>) {
        self.prompts.insert(prompt.name().to_string(), prompt);
    }

    pub fn with(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.register(prompt);
        self
    }

    pub fn list_schemas(&self) -> Vec<PromptSchema> {
        self.prompts.values().map(|p| p.schema()).collect()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Look up, validate and render one prompt.
    pub async fn get(&self, name: &str, arguments: &Value) -> McpResult<GetPromptResult> {
        let prompt = self
            .prompts
            .get(name)
            .ok_or_else(|| McpError::UnknownPrompt(name.to_string()))?;

        let validated = prompt.arguments().validate_prompt(arguments)?;
        prompt.render(validated).await
    }
}

/// `search` prompt: same arguments as the tool, result wrapped as a user message
pub struct SearchPrompt {
    backend: Arc<dyn SearchBackend>,
    arguments: ArgumentSchema,
}

impl SearchPrompt {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            arguments: search_arguments(),
        }
    }
}

#[async_trait::async_trait]
impl Prompt for SearchPrompt {
    fn name(&self) -> &str {
        TOOL_SEARCH
    }

    fn description(&self) -> &str {
        crate::tools::search::SEARCH_DESCRIPTION
    }

    fn arguments(&self) -> &ArgumentSchema {
        &self.arguments
    }

    async fn render(&self, arguments: Map<String, Value>) -> McpResult<GetPromptResult> {
        let args = SearchArgs::from_validated(&arguments)?;
        let content = self.backend.search(&args.query, args.max_results).await?;

        Ok(GetPromptResult {
            description: Some(format!("Markdown content for search query: {}", args.query)),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: ToolContent::text(content),
            }],
        })
    }
}
