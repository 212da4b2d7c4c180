//! Per-use-case knowledge: FAQ documents, personas and lookup tables.
//!
//! The tables are compiled in from `data/*.json`. They are demo fixtures;
//! every catalog can also be built from caller-supplied JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChatbotError, Result};
use crate::vector::Document;

pub mod customer_support;
pub mod hr_assistant;
pub mod it_helpdesk;

pub use customer_support::SupportCatalog;
pub use hr_assistant::HrCatalog;
pub use it_helpdesk::ItCatalog;

/// The domains a chatbot instance can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    ItHelpdesk,
    CustomerSupport,
    HrAssistant,
}

/// Wording that differs between the personas.
struct Persona {
    role: &'static str,
    domain: &'static str,
    expertise: &'static str,
    escalation: &'static str,
    tools_hint: &'static str,
}

impl UseCase {
    pub const ALL: [UseCase; 3] = [UseCase::ItHelpdesk, UseCase::CustomerSupport, UseCase::HrAssistant];

    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::ItHelpdesk => "it_helpdesk",
            UseCase::CustomerSupport => "customer_support",
            UseCase::HrAssistant => "hr_assistant",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            UseCase::ItHelpdesk => "IT Helpdesk",
            UseCase::CustomerSupport => "Customer Support",
            UseCase::HrAssistant => "HR Assistant",
        }
    }

    fn persona(&self) -> Persona {
        match self {
            UseCase::ItHelpdesk => Persona {
                role: "an experienced IT helpdesk assistant",
                domain: "technical problems, device status checks, and software information",
                expertise: "IT",
                escalation: "IT support",
                tools_hint: "Use available functions when needed to provide accurate information.",
            },
            UseCase::CustomerSupport => Persona {
                role: "a friendly customer support representative",
                domain: "orders, products, shipping, and account issues",
                expertise: "customer service",
                escalation: "a human support agent",
                tools_hint: "Use available functions to check real-time information when appropriate.",
            },
            UseCase::HrAssistant => Persona {
                role: "a knowledgeable HR assistant",
                domain: "benefits, leave requests, company policies, and training information",
                expertise: "HR",
                escalation: "the HR department",
                tools_hint: "Use available functions to access employee-specific data when needed.",
            },
        }
    }

    /// System prompt for the function-calling path.
    pub fn system_prompt(&self) -> String {
        let p = self.persona();
        format!("You are {}. Help users with {}. {}", p.role, p.domain, p.tools_hint)
    }

    /// System prompt for a retrieval-augmented answer around `context`.
    pub fn rag_prompt(&self, context: &str) -> String {
        let p = self.persona();
        format!(
            "You are {role}. Help users with {domain} by:\n\
             1. Using the provided knowledge base context to give accurate answers when available\n\
             2. Providing clear, step-by-step instructions\n\
             3. Using your general {expertise} knowledge when the context doesn't have specific information\n\
             4. Being concise but thorough in your explanations\n\
             \n\
             Context from knowledge base:\n\
             {context}\n\
             \n\
             IMPORTANT:\n\
             - If the context above contains relevant information, use it to provide accurate answers\n\
             - If the context doesn't have specific information, use your general {expertise} knowledge to provide helpful guidance\n\
             - Only suggest contacting {escalation} if the issue truly requires it",
            role = p.role,
            domain = p.domain,
            expertise = p.expertise,
            escalation = p.escalation,
            context = context,
        )
    }

    /// System prompt for an answer with no retrieved context.
    pub fn direct_prompt(&self) -> String {
        let p = self.persona();
        format!(
            "You are {}. Help users with {} using your knowledge. Provide helpful, accurate \
             information and step-by-step guidance. Be proactive and helpful in your responses.",
            p.role, p.domain
        )
    }

    pub fn demo_questions(&self) -> &'static [&'static str] {
        match self {
            UseCase::ItHelpdesk => &[
                "My computer is running very slowly",
                "What's the status of printer01?",
                "How do I connect to the company VPN?",
                "Can you check if server01 is working?",
            ],
            UseCase::CustomerSupport => &[
                "How can I track my order?",
                "What's the status of order ORD123456?",
                "Tell me about the wireless headphones",
                "How much is shipping for a $75 order?",
            ],
            UseCase::HrAssistant => &[
                "How do I request time off?",
                "What's my leave balance for EMP001?",
                "Tell me about health insurance benefits",
                "What company holidays do we have in 2025?",
            ],
        }
    }

    /// The built-in FAQ documents for this use case.
    pub fn documents(&self) -> Result<Vec<Document>> {
        Ok(match self {
            UseCase::ItHelpdesk => ItCatalog::builtin()?.documents,
            UseCase::CustomerSupport => SupportCatalog::builtin()?.documents,
            UseCase::HrAssistant => HrCatalog::builtin()?.documents,
        })
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UseCase {
    type Err = ChatbotError;

    fn from_str(s: &str) -> Result<Self> {
        UseCase::ALL
            .into_iter()
            .find(|u| u.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                ChatbotError::Config(format!(
                    "Unknown use case '{}'. Expected one of: it_helpdesk, customer_support, hr_assistant.",
                    s
                ))
            })
    }
}

pub(crate) fn parse_catalog<T: serde::de::DeserializeOwned>(json: &str, name: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| ChatbotError::Config(format!("Failed to parse {} data: {}", name, e)))
}
