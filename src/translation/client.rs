use crate::utils::{ApiConfig, Result, SheetTranslatorError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Language pair and optional domain hint shared by every row of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationOptions {
    pub source_lang: String,
    pub target_lang: String,
    pub domain: String,
}

impl TranslationOptions {
    /// Domain hint sent to the API; a generic description when none was given.
    pub fn domain_hint(&self) -> String {
        if self.domain.trim().is_empty() {
            format!(
                "General translation from {} to {}",
                self.source_lang, self.target_lang
            )
        } else {
            self.domain.clone()
        }
    }
}

/// Remote translation service. One call translates one cell.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        api_key: &str,
        text: &str,
        options: &TranslationOptions,
    ) -> Result<String>;
}

pub struct TranslationClient {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    translation_options: ApiTranslationOptions<'a>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiTranslationOptions<'a> {
    source_lang: &'a str,
    target_lang: &'a str,
    domains: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl TranslationClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries.max(1),
        })
    }

    async fn call_api(
        &self,
        api_key: &str,
        text: &str,
        options: &TranslationOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: text,
            }],
            translation_options: ApiTranslationOptions {
                source_lang: &options.source_lang,
                target_lang: &options.target_lang,
                domains: options.domain_hint(),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetTranslatorError::ApiError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: ChatResponse = response.json().await?;

        api_response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| SheetTranslatorError::ApiError("No text content in response".to_string()))
    }
}

#[async_trait]
impl Translator for TranslationClient {
    async fn translate(
        &self,
        api_key: &str,
        text: &str,
        options: &TranslationOptions,
    ) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            match self.call_api(api_key, text, options).await {
                Ok(translated) => return Ok(translated),
                Err(e) => {
                    warn!(attempt = attempt, error = %e, "Translation API call failed");
                    last_error = Some(e);

                    if attempt + 1 < self.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt as u32));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SheetTranslatorError::TranslationFailed("Unknown error".to_string())
        }))
    }
}
