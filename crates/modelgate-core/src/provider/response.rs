//! Typed views of OpenAI-format response bodies.
//!
//! Assistant text is pulled out by an ordered list of extractors so that a
//! provider which fills `reasoning_content` instead of `content` still yields
//! an answer.

use serde::Deserialize;

use crate::error::ProviderError;
use crate::types::TokenUsage;

#[derive(Debug, Deserialize)]
pub struct ChatCompletionBody {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<UsageBlock>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct UsageBlock {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<UsageBlock> for TokenUsage {
    fn from(u: UsageBlock) -> Self {
        TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

/// Pulls assistant text out of a message, or `None` if its field is blank.
pub type Extractor = fn(&ChoiceMessage) -> Option<&str>;

/// Tried in order; the first non-blank result wins.
pub const TEXT_EXTRACTORS: &[Extractor] = &[primary_content, reasoning_content];

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn primary_content(message: &ChoiceMessage) -> Option<&str> {
    non_blank(message.content.as_deref())
}

fn reasoning_content(message: &ChoiceMessage) -> Option<&str> {
    non_blank(message.reasoning_content.as_deref())
}

pub fn extract_text(message: &ChoiceMessage) -> Option<&str> {
    TEXT_EXTRACTORS.iter().find_map(|extract| extract(message))
}

/// The parts of a successful completion the router cares about.
#[derive(Debug, Clone)]
pub struct ParsedCompletion {
    pub content: String,
    pub tool_calls: Vec<serde_json::Value>,
    pub usage: TokenUsage,
}

/// Parse a 2xx chat-completion body.
///
/// A body without text and without tool calls counts as malformed.
pub fn parse_completion(body: &str) -> Result<ParsedCompletion, ProviderError> {
    let data: ChatCompletionBody = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid completion body: {e}")))?;

    let usage = data.usage.map(TokenUsage::from).unwrap_or_default();
    let message = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".to_string()))?
        .message
        .ok_or_else(|| ProviderError::MalformedResponse("No message in choice".to_string()))?;

    let content = extract_text(&message).map(str::to_string);
    let tool_calls = message.tool_calls.unwrap_or_default();

    match content {
        None if tool_calls.is_empty() => Err(ProviderError::MalformedResponse(
            "empty response content".to_string(),
        )),
        content => Ok(ParsedCompletion {
            content: content.unwrap_or_default(),
            tool_calls,
            usage,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Parse a `GET /models` body into the advertised model ids.
pub fn parse_model_list(body: &str) -> Result<Vec<String>, ProviderError> {
    let list: ModelList = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid model list: {e}")))?;
    Ok(list.data.into_iter().map(|m| m.id).collect())
}
