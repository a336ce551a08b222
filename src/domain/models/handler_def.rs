//! Descriptive handler metadata.
//!
//! Consumed only by help rendering; dispatch never looks at it.

use serde::{Deserialize, Serialize};

/// Category a handler is grouped under in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerCategory {
    System,
    Logging,
    Shell,
    File,
    Docker,
}

impl std::fmt::Display for HandlerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::System => "System",
            Self::Logging => "Logging",
            Self::Shell => "Shell",
            Self::File => "File",
            Self::Docker => "Docker",
        };
        f.write_str(s)
    }
}

/// One documented handler parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerParameter {
    pub name: String,
    pub param_type: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub description: String,
}

/// Self-description a handler exposes for help rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerDefinition {
    pub name: String,
    pub category: HandlerCategory,
    pub description: String,
    pub usage: String,
    pub examples: Vec<String>,
    pub parameters: Vec<HandlerParameter>,
    pub notes: Option<String>,
}

impl HandlerDefinition {
    pub fn new(
        name: impl Into<String>,
        category: HandlerCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            description: description.into(),
            usage: String::new(),
            examples: Vec::new(),
            parameters: Vec::new(),
            notes: None,
        }
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn parameter(
        mut self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        required: bool,
        default: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(HandlerParameter {
            name: name.into(),
            param_type: param_type.into(),
            required,
            default: default.map(ToString::to_string),
            description: description.into(),
        });
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
