use async_trait::async_trait;
use column_vector_store::{Label, Result, VectorStoreError, DEFAULT_API_BASE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_DESCRIPTION_LANGUAGE: &str = "Mongolian";

/// Rewrites label text before embedding (for example appending a
/// human-readable description). Must return exactly one label per input.
#[async_trait]
pub trait LabelAugmenter: Send + Sync {
    async fn augment(&self, labels: &[Label]) -> Result<Vec<Label>>;
}

/// Outcome of [`augment_or_original`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmented {
    pub labels: Vec<Label>,
    pub applied: bool,
}

/// Run the augmenter, falling back to `labels` unchanged if it fails or does
/// not return the same number of labels.
pub async fn augment_or_original(augmenter: &dyn LabelAugmenter, labels: Vec<Label>) -> Augmented {
    if labels.is_empty() {
        return Augmented {
            labels,
            applied: false,
        };
    }

    match augmenter.augment(&labels).await {
        Ok(rewritten) if rewritten.len() == labels.len() => {
            log::info!("Augmented {} labels", rewritten.len());
            Augmented {
                labels: rewritten,
                applied: true,
            }
        }
        Ok(rewritten) => {
            log::warn!(
                "Augmentation returned {} labels for {} inputs; keeping originals",
                rewritten.len(),
                labels.len()
            );
            Augmented {
                labels,
                applied: false,
            }
        }
        Err(err) => {
            log::warn!("Augmentation failed, keeping original labels: {err}");
            Augmented {
                labels,
                applied: false,
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatAugmenterConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub language: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ChatAugmenterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE.to_string(),
            language: DEFAULT_DESCRIPTION_LANGUAGE.to_string(),
            temperature: 0.3,
            max_tokens: 3000,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Appends a short description to each column label through one
/// chat-completions call.
pub struct ChatAugmenter {
    config: ChatAugmenterConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize, Debug)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatAugmenter {
    pub fn new(config: ChatAugmenterConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(VectorStoreError::provider(
                "OpenAI API key is empty (set OPENAI_API_KEY)",
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| VectorStoreError::provider(format!("HTTP client: {err}")))?;
        Ok(Self { config, client })
    }

    fn system_prompt(&self) -> String {
        format!(
            "You annotate relational database column names with a short {} description. \
             Be brief and clear.",
            self.config.language
        )
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| VectorStoreError::provider(format!("chat request: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| VectorStoreError::provider(format!("chat response: {err}")))?;
        if !status.is_success() {
            return Err(VectorStoreError::provider(format!(
                "chat API error ({status}): {text}"
            )));
        }
        parse_chat_response(&text)
    }
}

fn build_prompt(labels: &[Label], language: &str) -> String {
    let mut prompt = format!(
        "Append a short {language} description to each database column below.\n\
         Example: BI_HREMPLOYEE.COMPANYNAME -> BI_HREMPLOYEE.COMPANYNAME (company name)\n\
         Output only the results, one per line, each line starting with '-':\n\n"
    );
    for label in labels {
        prompt.push_str("- ");
        prompt.push_str(label);
        prompt.push('\n');
    }
    prompt
}

fn parse_chat_response(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|err| VectorStoreError::provider(format!("malformed chat response: {err}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| VectorStoreError::provider("chat response has no choices"))
}

/// Keep `- item` lines, stripped of the marker.
fn parse_bullets(content: &str) -> Vec<Label> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix('-'))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl LabelAugmenter for ChatAugmenter {
    async fn augment(&self, labels: &[Label]) -> Result<Vec<Label>> {
        log::info!(
            "Requesting {} descriptions for {} labels from '{}'",
            self.config.language,
            labels.len(),
            self.config.model
        );
        let content = self
            .complete(build_prompt(labels, &self.config.language))
            .await?;
        let rewritten = parse_bullets(&content);
        for label in &rewritten {
            log::debug!("  - {label}");
        }
        Ok(rewritten)
    }
}
