use crate::llm::{GenerationError, TextGenerator};
use crate::profile::AiService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Choice {
    pub message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Endpoint and model for each supported chat-completion service.
pub fn endpoint(service: AiService) -> (&'static str, &'static str) {
    match service {
        AiService::OpenAi => ("https://api.openai.com/v1/chat/completions", "gpt-3.5-turbo"),
        AiService::DeepSeek => ("https://api.deepseek.com/v1/chat/completions", "deepseek-chat"),
    }
}

/// Pulls the first choice's trimmed text out of a raw response body.
pub fn response_text(service: AiService, body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let text = response
        .choices
        .first()
        .map(|choice| choice.message.content.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GenerationError::EmptyResponse(service.to_string()));
    }
    Ok(text)
}

#[derive(Debug)]
pub struct ChatCompletionClient {
    client: Client,
    api_key: String,
    service: AiService,
}

impl ChatCompletionClient {
    pub fn new(api_key: impl Into<String>, service: AiService) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let client = Client::builder().user_agent("Job-Autofill/1.0").build()?;

        Ok(Self {
            client,
            api_key,
            service,
        })
    }

    pub fn service(&self) -> AiService {
        self.service
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn complete(&self, system_prompt: &str, question: &str) -> Result<String, GenerationError> {
        let (url, model) = endpoint(self.service);
        let payload = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": question }
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS
        });

        tracing::debug!("Sending chat completion request to {}", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Api(format!(
                "{} request failed ({}): {}",
                self.service, status, error_text
            )));
        }

        let body = response.text().await?;
        response_text(self.service, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(endpoint(AiService::OpenAi).1, "gpt-3.5-turbo");
        assert_eq!(
            endpoint(AiService::DeepSeek).0,
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_response_text_takes_first_choice() {
        let body = r#"{"id":"x","choices":[{"message":{"role":"assistant","content":"  I am a great fit.  "}},{"message":{"role":"assistant","content":"ignored"}}]}"#;
        assert_eq!(response_text(AiService::OpenAi, body).unwrap(), "I am a great fit.");
    }

    #[test]
    fn test_response_text_rejects_empty() {
        let body = r#"{"id":"x","choices":[]}"#;
        assert!(matches!(
            response_text(AiService::DeepSeek, body),
            Err(GenerationError::EmptyResponse(service)) if service == "deepseek"
        ));
        assert!(matches!(
            response_text(AiService::OpenAi, "not json"),
            Err(GenerationError::Json(_))
        ));
    }

    #[test]
    fn test_new_requires_key() {
        assert!(matches!(
            ChatCompletionClient::new("  ", AiService::OpenAi),
            Err(GenerationError::MissingApiKey)
        ));
        let client = ChatCompletionClient::new("sk-test", AiService::DeepSeek).unwrap();
        assert_eq!(client.service(), AiService::DeepSeek);
    }
}
