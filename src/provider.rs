//! Client for an OpenAI-compatible chat-completions API.

use std::time::Duration;

use crate::error::ProviderError;
use crate::models::{BlogPostRequest, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Used when the caller does not bring their own key.
    pub api_key: Option<String>,
}

#[derive(Clone)]
pub struct ContentProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

// Build the system prompt from the form fields
pub fn build_prompt(req: &BlogPostRequest) -> String {
    let mut prompt = format!(
        "You are an SEO expert and content writer. Create a {}-word blog post for the URL: {}. \
         The post should be optimized for {} search intent, \
         focus on the keywords: {}, \
         and be written in a {} tone.",
        req.word_count, req.url, req.search_intent, req.keywords, req.tone
    );
    if req.include_images {
        prompt.push_str(" Include suggestions for relevant images.");
    }
    prompt
}

impl ContentProvider {
    pub fn new(client: reqwest::Client, mut config: ProviderConfig) -> Self {
        // add https:// if not present
        if !config.base_url.starts_with("http") {
            config.base_url = format!("https://{}", config.base_url);
        }
        let trimmed = config.base_url.trim_end_matches('/').len();
        config.base_url.truncate(trimmed);
        Self { client, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Generates a blog post. `caller_key` takes precedence over the
    /// server-side key.
    pub async fn generate(
        &self,
        req: &BlogPostRequest,
        caller_key: Option<&str>,
    ) -> Result<String, ProviderError> {
        let api_key = caller_key
            .or(self.config.api_key.as_deref())
            .ok_or(ProviderError::MissingApiKey)?;

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: Some(build_prompt(req)),
            }],
            max_tokens: self.config.max_tokens,
        };

        let res = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion = res
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyCompletion)
    }
}
