//! Ollama-backed generation provider.
//!
//! Talks to a local Ollama server over HTTP. Both generation and model
//! pulls stream line-delimited JSON.

use anyhow::{anyhow, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::generation_api::{ModelHandle, SamplingConfig, StreamChunk};
use std::env;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::provider::{GenerationProvider, ProgressFn};

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .pool_max_idle_per_host(2)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Streaming response: each line is one of these JSON objects.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

/// One line of `/api/pull` output.
#[derive(Debug, Deserialize)]
struct PullChunk {
    #[serde(default)]
    status: String,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

/// Match an installed tag against a requested model. A tagged request
/// ("llama3.2:3b") must match exactly; a bare name accepts any tag of the
/// same base model.
fn tag_matches(installed: &str, requested: &str) -> bool {
    if requested.contains(':') {
        installed == requested
    } else {
        installed == requested || installed.split(':').next() == Some(requested)
    }
}

fn pull_fraction(chunk: &PullChunk) -> Option<f64> {
    match (chunk.total, chunk.completed) {
        (Some(total), Some(completed)) if total > 0 => {
            Some((completed as f64 / total as f64).clamp(0.0, 1.0))
        }
        _ => None,
    }
}

pub struct OllamaClient {
    http: Client,
    base: String,
}

impl OllamaClient {
    /// `base_url` falls back to `OLLAMA_BASE_URL`, then the default port.
    pub fn new(base_url: Option<&str>) -> Self {
        let base = base_url
            .map(str::to_string)
            .or_else(|| env::var("OLLAMA_BASE_URL").ok())
            .unwrap_or_else(|| "http://127.0.0.1:11434".to_string());
        Self {
            http: SHARED_HTTP.clone(),
            base,
        }
    }

    /// Check whether the model tag is already pulled.
    async fn model_present(&self, model: &str) -> Result<bool> {
        let url = format!("{}/api/tags", self.base);
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("ollama error: {}", resp.status()));
        }
        let tags: TagsResponse = resp.json().await?;
        Ok(tags.models.iter().any(|m| tag_matches(&m.name, model)))
    }

    /// Pull the model, forwarding fractional download progress.
    async fn pull_model(&self, model: &str, progress: &ProgressFn) -> Result<()> {
        let url = format!("{}/api/pull", self.base);
        let req = PullRequest {
            name: model,
            stream: true,
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("ollama error: {}", resp.status()));
        }

        let mut stream = resp.bytes_stream();
        let mut buf = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| anyhow!("pull stream read error: {}", e))?;
            buf.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim().to_string();
                buf = buf[pos + 1..].to_string();
                if line.is_empty() {
                    continue;
                }

                let chunk: PullChunk = serde_json::from_str(&line)
                    .map_err(|e| anyhow!("failed to parse pull response: {}", e))?;
                if let Some(err) = chunk.error {
                    return Err(anyhow!("model pull failed: {}", err));
                }
                if let Some(fraction) = pull_fraction(&chunk) {
                    progress(fraction);
                }
                if chunk.status == "success" {
                    progress(1.0);
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl GenerationProvider for OllamaClient {
    async fn resolve_model(&self, model: &str, progress: ProgressFn) -> Result<ModelHandle> {
        if self.model_present(model).await? {
            progress(1.0);
            return Ok(ModelHandle::new(model));
        }

        tracing::info!(model, "model not present locally, pulling");
        self.pull_model(model, &progress).await?;
        Ok(ModelHandle::new(model))
    }

    async fn generate_stream(
        &self,
        handle: &ModelHandle,
        prompt: &str,
        sampling: &SamplingConfig,
        tx: UnboundedSender<StreamChunk>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let url = format!("{}/api/generate", self.base);
        let req = GenerateRequest {
            model: &handle.model,
            prompt,
            stream: true,
            options: GenerateOptions {
                temperature: sampling.temperature,
            },
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("ollama error: {}", resp.status()));
        }

        // Ollama streams line-delimited JSON
        let mut stream = resp.bytes_stream();
        let mut buf = String::new();

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                tracing::debug!("generation cancelled, dropping stream");
                return Ok(());
            }
            let bytes = chunk.map_err(|e| anyhow!("stream read error: {}", e))?;
            buf.push_str(&String::from_utf8_lossy(&bytes));

            // Process complete lines
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim().to_string();
                buf = buf[pos + 1..].to_string();

                if line.is_empty() {
                    continue;
                }
                if cancel.is_cancelled() {
                    return Ok(());
                }

                match serde_json::from_str::<GenerateChunk>(&line) {
                    Ok(chunk_data) => {
                        if !chunk_data.response.is_empty() {
                            let _ = tx.send(StreamChunk::Text(chunk_data.response));
                        }
                        if chunk_data.done {
                            let _ = tx.send(StreamChunk::Done { stop_reason: None });
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamChunk::Error(format!(
                            "Failed to parse Ollama stream: {}",
                            e
                        )));
                        return Ok(());
                    }
                }
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason: None });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_chunk() {
        let line = r#"{"model":"llama3.2:3b","response":"Hel","done":false}"#;
        let chunk: GenerateChunk = serde_json::from_str(line).unwrap();
        assert_eq!(chunk.response, "Hel");
        assert!(!chunk.done);
    }

    #[test]
    fn parses_final_chunk_without_text() {
        let line = r#"{"model":"llama3.2:3b","response":"","done":true,"total_duration":12345}"#;
        let chunk: GenerateChunk = serde_json::from_str(line).unwrap();
        assert!(chunk.response.is_empty());
        assert!(chunk.done);
    }

    #[test]
    fn tagged_requests_match_exactly() {
        assert!(tag_matches("llama3.2:3b", "llama3.2:3b"));
        assert!(!tag_matches("llama3.2:1b", "llama3.2:3b"));
        assert!(!tag_matches("llama3.1:8b", "llama3:8b"));
    }

    #[test]
    fn bare_requests_accept_any_tag_of_the_same_base() {
        assert!(tag_matches("tinyllama:latest", "tinyllama"));
        assert!(tag_matches("tinyllama", "tinyllama"));
        assert!(!tag_matches("llama3.2:1b", "llama3"));
    }

    #[test]
    fn pull_fraction_needs_totals() {
        let chunk: PullChunk =
            serde_json::from_str(r#"{"status":"pulling manifest"}"#).unwrap();
        assert!(pull_fraction(&chunk).is_none());

        let chunk: PullChunk = serde_json::from_str(
            r#"{"status":"downloading","total":200,"completed":50}"#,
        )
        .unwrap();
        assert_eq!(pull_fraction(&chunk), Some(0.25));
    }

    #[test]
    fn pull_error_line_is_detected() {
        let chunk: PullChunk =
            serde_json::from_str(r#"{"error":"pull model manifest: file does not exist"}"#)
                .unwrap();
        assert!(chunk.error.is_some());
    }

    #[test]
    fn base_url_override_wins() {
        let client = OllamaClient::new(Some("http://localhost:9999"));
        assert_eq!(client.base, "http://localhost:9999");
    }
}
