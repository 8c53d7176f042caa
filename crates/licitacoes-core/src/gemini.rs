//! Gemini `generateContent` client for narrative reports.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::NarrativeConfig;
use crate::error::{NarrativeError, NarrativeResult};
use crate::narrative::{NarrativeGenerator, SYSTEM_INSTRUCTION, build_prompt, response_schema};
use crate::payload::Payload;

/// HTTP client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    /// Build a client from configuration.
    ///
    /// Without an API key the client cannot be built and the caller should
    /// report the narrative as unavailable.
    pub fn from_config(config: &NarrativeConfig) -> NarrativeResult<Self> {
        let api_key = config
            .resolved_api_key()
            .ok_or(NarrativeError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Request body asking for JSON output that follows the report schema.
fn request_body(prompt: &str) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> NarrativeResult<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(NarrativeError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl NarrativeGenerator for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, payload: &Payload<'_>) -> NarrativeResult<String> {
        let prompt = build_prompt(payload)?;
        let url = self.url();

        tracing::info!(url = %url, prompt_len = prompt.len(), "requesting narrative");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&prompt))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NarrativeError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        extract_text(parsed)
    }
}
