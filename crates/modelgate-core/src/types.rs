use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Sampling temperature used when the caller does not pick one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }
}

/// Content of the most recent user message, or "" if there is none.
pub fn last_user_message(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .and_then(|m| m.content.as_deref())
        .unwrap_or("")
}

/// Provider-agnostic completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Caller's model override. Only honoured by providers that accept it.
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: f64,
    /// `None` means the router's configured default.
    pub max_tokens: Option<u32>,
    /// Tool descriptors, forwarded verbatim.
    pub tools: Option<Vec<serde_json::Value>>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            tools: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Check the caller contract. Runs before any provider is contacted.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.messages.is_empty() {
            return Err(DispatchError::InvalidRequest(
                "messages must not be empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(DispatchError::InvalidRequest(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(DispatchError::InvalidRequest(
                "max_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn last_user_message(&self) -> &str {
        last_user_message(&self.messages)
    }

    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Successful answer from one provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub content: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<serde_json::Value>,
    /// Name of the provider that served the request.
    pub served_by: String,
    /// Model id that was actually sent.
    pub model: String,
    pub usage: TokenUsage,
}

impl CompletionResult {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn test_message_constructors() {
        let tool = Message::tool_result("call_1", "lookup", "42");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool.name.as_deref(), Some("lookup"));
        assert_eq!(tool.content.as_deref(), Some("42"));

        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_request_defaults() {
        let req = ChatRequest::new(vec![Message::user("hi")]);
        assert_eq!(req.temperature, DEFAULT_TEMPERATURE);
        assert!(req.model.is_none());
        assert!(req.max_tokens.is_none());
        assert!(!req.has_tools());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let empty = ChatRequest::new(vec![]);
        assert!(matches!(empty.validate(), Err(DispatchError::InvalidRequest(_))));

        let hot = ChatRequest::new(vec![Message::user("hi")]).with_temperature(2.5);
        assert!(matches!(hot.validate(), Err(DispatchError::InvalidRequest(_))));

        let zero = ChatRequest::new(vec![Message::user("hi")]).with_max_tokens(0);
        assert!(matches!(zero.validate(), Err(DispatchError::InvalidRequest(_))));
    }

    #[test]
    fn test_last_user_message() {
        let req = ChatRequest::new(vec![
            Message::system("be terse"),
            Message::user("first"),
            Message::assistant("ok"),
            Message::user("second"),
        ]);
        assert_eq!(req.last_user_message(), "second");

        let none = ChatRequest::new(vec![Message::system("only system")]);
        assert_eq!(none.last_user_message(), "");
    }

    #[test]
    fn test_empty_tools_are_not_tools() {
        let req = ChatRequest::new(vec![Message::user("hi")]).with_tools(vec![]);
        assert!(!req.has_tools());
    }
}
