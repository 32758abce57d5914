use crate::error::{Result, VectorStoreError};
use crate::types::Vector;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_STUB_DIMENSION: usize = 384;

/// Turns text into vectors. Implementations may fail per call; callers decide
/// whether a failure is fatal.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vector>;

    fn model_id(&self) -> &str;
}

/// Deterministic offline embedder: hashes the text into a unit vector.
#[derive(Clone, Debug)]
pub struct StubEmbeddings {
    dimension: usize,
}

impl StubEmbeddings {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Default for StubEmbeddings {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vector> {
        Ok(stub_embed(text, self.dimension))
    }

    fn model_id(&self) -> &str {
        "stub"
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vector {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiEmbeddingsConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OpenAiEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Embeddings over an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddings {
    config: OpenAiEmbeddingsConfig,
    client: Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl OpenAiEmbeddings {
    pub fn new(config: OpenAiEmbeddingsConfig) -> Result<Self> {
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

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
    }

    async fn post(&self, input: &str) -> Result<EmbeddingResponse> {
        let body = EmbeddingRequest {
            input,
            model: &self.config.model,
        };
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| VectorStoreError::provider(format!("embedding request: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| VectorStoreError::provider(format!("embedding response: {err}")))?;
        if !status.is_success() {
            return Err(VectorStoreError::provider(format!(
                "embedding API error ({status}): {text}"
            )));
        }
        parse_embedding_response(&text)
    }
}

fn parse_embedding_response(body: &str) -> Result<EmbeddingResponse> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|err| VectorStoreError::provider(format!("malformed embedding response: {err}")))?;
    if parsed.data.is_empty() {
        return Err(VectorStoreError::provider(
            "embedding response has no 'data' entries",
        ));
    }
    if let Some(bad) = parsed.data.iter().find(|d| d.embedding.is_empty()) {
        return Err(VectorStoreError::provider(format!(
            "embedding response entry {} is empty",
            bad.index
        )));
    }
    parsed.data.sort_by_key(|d| d.index);
    Ok(parsed)
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vector> {
        let response = self.post(text).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| VectorStoreError::provider("embedding response has no entries"))
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
