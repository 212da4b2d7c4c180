//! The bounded tool-calling loop.
//!
//! Each round sends the conversation plus the tool definitions to the model.
//! A reply without tool calls ends the loop with its text. A reply with tool
//! calls runs every requested tool, feeds the results back, and costs one
//! round. The loop stops after `max_calls` rounds.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::{json, Value as JsonValue};

use crate::datam::{Message, Usage};
use crate::orchestra::ChatModel;
use crate::tools::{ToolCall, ToolLibrary};

pub const DEFAULT_MAX_CALLS: usize = 3;
pub const ROUND_LIMIT_ERROR: &str = "maximum function calls reached";

/// How a run of the loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The model answered without requesting a tool.
    Answered {
        content: String,
        function_calls_made: usize,
    },
    /// Every round requested tools; the model never produced an answer.
    RoundLimit { function_calls_made: usize },
    /// A model call failed. Rounds already made are not rolled back.
    Failed {
        error: String,
        function_calls_made: usize,
    },
}

impl CallOutcome {
    pub fn function_calls_made(&self) -> usize {
        match self {
            CallOutcome::Answered { function_calls_made, .. }
            | CallOutcome::RoundLimit { function_calls_made }
            | CallOutcome::Failed { function_calls_made, .. } => *function_calls_made,
        }
    }

    /// The answer text, if the loop produced a non-empty one.
    pub fn content(&self) -> Option<&str> {
        match self {
            CallOutcome::Answered { content, .. } if !content.trim().is_empty() => Some(content),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CallOutcome::RoundLimit { .. } => Some(ROUND_LIMIT_ERROR),
            CallOutcome::Failed { error, .. } => Some(error),
            CallOutcome::Answered { .. } => None,
        }
    }
}

/// Result of [`FunctionCaller::run`]: the outcome plus the tokens it spent.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallResult {
    pub outcome: CallOutcome,
    pub usage: Usage,
}

/// Runs the tool-calling loop over a fixed tool library.
pub struct FunctionCaller {
    tools: Arc<ToolLibrary>,
    max_calls: usize,
}

impl FunctionCaller {
    pub fn new(tools: ToolLibrary, max_calls: usize) -> Self {
        Self {
            tools: Arc::new(tools),
            max_calls,
        }
    }

    pub fn tools(&self) -> &ToolLibrary {
        &self.tools
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Drives `model` over `messages` until it answers or the round bound is hit.
    pub async fn run(&self, model: &dyn ChatModel, mut messages: Vec<Message>) -> FunctionCallResult {
        let definitions = self.tools.definitions();
        let offered = (!definitions.is_empty()).then_some(definitions.as_slice());
        let mut usage = Usage::default();
        let mut calls_made = 0;

        // Invariant: calls_made <= max_calls, and each pass that does not
        // return consumes exactly one round.
        while calls_made < self.max_calls {
            let reply = match model.complete(&messages, offered).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Function-calling model call failed after {} rounds: {}", calls_made, e);
                    return FunctionCallResult {
                        outcome: CallOutcome::Failed {
                            error: e.to_string(),
                            function_calls_made: calls_made,
                        },
                        usage,
                    };
                }
            };
            if let Some(u) = reply.usage {
                usage += u;
            }

            if !reply.wants_tools() {
                return FunctionCallResult {
                    outcome: CallOutcome::Answered {
                        content: reply.content.unwrap_or_default(),
                        function_calls_made: calls_made,
                    },
                    usage,
                };
            }

            calls_made += 1;
            let tool_calls = reply.tool_calls;
            messages.push(Message::assistant_tool_calls(reply.content, tool_calls.clone()));
            for call in tool_calls {
                let result = self.execute_tool(&call).await;
                messages.push(Message::tool_result(call.id, call.function.name, result.to_string()));
            }
        }

        FunctionCallResult {
            outcome: CallOutcome::RoundLimit { function_calls_made: calls_made },
            usage,
        }
    }

    /// Runs one tool on the blocking pool. Never fails: unknown tools,
    /// handler errors and panics all become `{"error": ...}` payloads.
    pub async fn execute_tool(&self, call: &ToolCall) -> JsonValue {
        let name = call.function.name.clone();
        let Some(tool) = self.tools.get(&name) else {
            debug!("Model requested unknown tool '{}'", name);
            return json!({ "error": format!("function '{}' not found", name) });
        };

        let handler = Arc::clone(&tool.handler);
        let args = call.function.arguments.clone();
        debug!("Executing tool: {} with {}", name, args);

        match tokio::task::spawn_blocking(move || handler(args)).await {
            Ok(Ok(value)) => value,
            Ok(Err(message)) => json!({ "error": format!("function execution failed: {}", message) }),
            Err(join_error) => {
                let message = panic_message(join_error);
                warn!("Tool '{}' panicked: {}", name, message);
                json!({ "error": format!("function execution failed: {}", message) })
            }
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
