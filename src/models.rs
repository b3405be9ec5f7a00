use serde::{Deserialize, Serialize};

// Form payload posted by the blog builder UI
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub search_intent: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub include_images: bool,
}

impl BlogPostRequest {
    // All text fields filled in and a non-zero word count
    pub fn is_complete(&self) -> bool {
        [&self.url, &self.search_intent, &self.keywords, &self.tone]
            .iter()
            .all(|field| !field.trim().is_empty())
            && self.word_count > 0
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct BlogPostResponse {
    pub content: String,
}

// JSON error body returned on every non-2xx response
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            limit: None,
            retry_after_secs: None,
        }
    }
}

// Chat completions API request format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

// Chat completions API response format (only the fields we read)
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ChatChoice {
    pub message: ChatMessage,
}
