//! Payload parsing shared by every handler.
//!
//! Command payloads arrive in one of two equivalent shapes:
//! - a JSON object (detected by a leading `{` after trimming), decoded into
//!   a handler-specific request type, or
//! - whitespace-delimited tokens where the first token names the handler
//!   (possibly `name:sub`), `--flag` tokens are switches, and everything
//!   else is a positional argument.

use crate::domain::errors::{AgentError, AgentResult};

/// A parsed command payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Tokens(TokenPayload),
}

/// Simple-form payload split into name, positional args and flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenPayload {
    /// Leading token, including any `name:sub` prefix.
    pub name: String,

    /// Positional arguments in order of appearance.
    pub args: Vec<String>,

    /// Switches, stored without their `--` prefix.
    pub flags: Vec<String>,
}

impl TokenPayload {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// First positional argument that is not consumed by `skip` leading ones.
    pub fn args_from(&self, skip: usize) -> &[String] {
        self.args.get(skip..).unwrap_or(&[])
    }
}

impl Payload {
    /// Parse a raw payload string into one of the two accepted forms.
    pub fn parse(raw: &str) -> AgentResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AgentError::Parse("empty payload".to_string()));
        }

        if trimmed.starts_with('{') {
            let value: serde_json::Value = serde_json::from_str(trimmed)
                .map_err(|e| AgentError::Parse(format!("invalid JSON payload: {e}")))?;
            if !value.is_object() {
                return Err(AgentError::Parse(
                    "JSON payload must be an object".to_string(),
                ));
            }
            return Ok(Self::Json(value));
        }

        let mut tokens = trimmed.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| AgentError::Parse("empty payload".to_string()))?
            .to_string();

        let mut args = Vec::new();
        let mut flags = Vec::new();
        for token in tokens {
            if let Some(flag) = token.strip_prefix("--") {
                flags.push(flag.to_string());
            } else {
                args.push(token.to_string());
            }
        }

        Ok(Self::Tokens(TokenPayload { name, args, flags }))
    }

    /// Leading handler-name token used for registry lookup.
    ///
    /// Token form: the first whitespace-separated token. JSON form: absent
    /// (JSON payloads reach a handler through an already-resolved name).
    pub fn lookup_key(raw: &str) -> Option<&str> {
        raw.trim().split_whitespace().next()
    }
}
