use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Represents a tool call requested by the model in its response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub tool_type: String, // e.g., "function"
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FunctionCall {
    pub name: String,
    /// Decoded JSON arguments; the OpenAI wire format carries them as a string.
    pub arguments: JsonValue,
}

fn function_type() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            tool_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }
}

/// Defines the structure for a tool that can be provided to an AI model.
/// This is the "schema" for a single function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String, // Should always be "function" for now
    pub function: FunctionDefinition,
}

/// The definition of the function, including its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue, // JSON Schema object
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: JsonValue) -> Self {
        Self {
            tool_type: function_type(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// Handler behind a tool: JSON arguments in, JSON result or error message out.
pub type ToolHandler = Arc<dyn Fn(JsonValue) -> Result<JsonValue, String> + Send + Sync>;

/// A self-contained, executable tool including its definition and handler.
#[derive(Clone)]
pub struct Tool {
    pub definition: ToolDefinition,
    pub handler: ToolHandler,
}

impl Tool {
    pub fn new<F>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(JsonValue) -> Result<JsonValue, String> + Send + Sync + 'static,
    {
        Self {
            definition,
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.function.name
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// A collection of executable tools, searchable by name.
///
/// Names are unique: registering a tool under an existing name replaces it.
#[derive(Debug, Clone, Default)]
pub struct ToolLibrary {
    tools: BTreeMap<String, Tool>,
}

impl ToolLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Definitions in name order, ready to be offered to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
