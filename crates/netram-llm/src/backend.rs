//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   GeminiBackend           — Google Gemini API (default; native JSON schema output)
//!   OpenAiBackend           — OpenAI API (gpt-4o, gpt-4o-mini, …)
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (LMStudio,
//!                             TogetherAI, Groq, OpenRouter, vLLM, …)
//!   AnthropicBackend        — Anthropic Messages API (claude-*)
//!   OllamaBackend           — local Ollama (OpenAI-compatible)
//!   UnavailableBackend      — placeholder when nothing is configured
//!
//! Every request may carry inline media and a JSON schema for the reply.
//! Gemini enforces the schema natively; the others get it as a system
//! instruction.

use async_trait::async_trait;
use netram_common::config::{LlmConfig, LlmProvider};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::media::MediaPart;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("{backend} cannot accept media of type {mime_type}")]
    UnsupportedMedia { backend: &'static str, mime_type: String },
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    /// Attached to the last user message.
    #[serde(default)]
    pub media: Vec<MediaPart>,
    /// JSON schema the reply must satisfy.
    #[serde(default)]
    pub response_schema: Option<Value>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    /// Short provider name recorded in the audit log.
    fn name(&self) -> &'static str;
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
    fn max_output_tokens(&self) -> usize;
}

/// Build the configured backend.
pub fn from_config(cfg: &LlmConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let key = cfg.api_key.as_ref().map(|k| k.expose_secret().to_string());
    let require_key = |provider: &str| {
        key.clone().ok_or_else(|| LlmError::Unavailable(format!("{provider} API key is not configured")))
    };
    let backend: Arc<dyn LlmBackend> = match cfg.provider {
        LlmProvider::Gemini => Arc::new(GeminiBackend::new(require_key("Gemini")?, &cfg.model)),
        LlmProvider::Openai => Arc::new(OpenAiBackend::new(require_key("OpenAI")?, &cfg.model)),
        LlmProvider::Anthropic => Arc::new(AnthropicBackend::new(require_key("Anthropic")?, &cfg.model)),
        LlmProvider::OpenaiCompatible => {
            let base_url = cfg.base_url.clone().ok_or_else(|| {
                LlmError::Unavailable("base_url is required for an OpenAI-compatible backend".into())
            })?;
            Arc::new(OpenAiCompatibleBackend::new(base_url, &cfg.model, key))
        }
        LlmProvider::Ollama => Arc::new(OllamaBackend::new(
            cfg.base_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string()),
            &cfg.model,
        )),
    };
    Ok(backend)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn parse_openai_response(json: &Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

async fn check_response_status(resp: reqwest::Response) -> Result<Value, LlmError> {
    let status = resp.status().as_u16();
    if status == 429 {
        return Err(LlmError::RateLimitExceeded);
    }
    let body: Value = resp.json().await?;
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

/// Fold the response schema into the system prompt for backends without
/// native structured output.
pub fn schema_instruction(schema: &Value) -> String {
    format!(
        "Respond with a single JSON object and nothing else. \
         It must conform to this JSON schema:\n{}",
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
    )
}

fn messages_with_schema(req: &LlmRequest) -> Vec<Message> {
    let mut messages = req.messages.clone();
    if let Some(schema) = &req.response_schema {
        let instruction = schema_instruction(schema);
        match messages.iter_mut().find(|m| m.role == "system") {
            Some(sys) => {
                sys.content.push_str("\n\n");
                sys.content.push_str(&instruction);
            }
            None => messages.insert(0, Message::system(instruction)),
        }
    }
    messages
}

fn last_user_index(messages: &[Message]) -> Option<usize> {
    messages.iter().rposition(|m| m.role == "user")
}

/// OpenAI chat messages; media becomes `image_url` parts on the last user turn.
fn openai_messages(req: &LlmRequest, backend: &'static str) -> Result<Vec<Value>, LlmError> {
    let messages = messages_with_schema(req);
    let media_at = last_user_index(&messages);
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| {
            if Some(i) != media_at || req.media.is_empty() {
                return Ok(json!({"role": m.role, "content": m.content}));
            }
            let mut parts = vec![json!({"type": "text", "text": m.content})];
            for part in &req.media {
                if !part.is_image() {
                    return Err(LlmError::UnsupportedMedia { backend, mime_type: part.mime_type.clone() });
                }
                parts.push(json!({"type": "image_url", "image_url": {"url": part.to_data_uri()}}));
            }
            Ok(json!({"role": m.role, "content": parts}))
        })
        .collect()
}

fn openai_body(req: &LlmRequest, model: &str, backend: &'static str) -> Result<Value, LlmError> {
    let mut body = json!({
        "model":       req.model.as_deref().unwrap_or(model),
        "messages":    openai_messages(req, backend)?,
        "max_tokens":  req.max_tokens.unwrap_or(4096),
        "temperature": req.temperature.unwrap_or(0.1),
    });
    if req.response_schema.is_some() {
        body["response_format"] = json!({"type": "json_object"});
    }
    Ok(body)
}

/// Gemini wants OpenAPI-style upper-case type names.
pub fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != "additionalProperties")
                .map(|(k, v)| {
                    let v = match (k.as_str(), v) {
                        ("type", Value::String(t)) => Value::String(t.to_ascii_uppercase()),
                        _ => to_gemini_schema(v),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

// ── 1. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), model: model.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = openai_body(&req, &self.model, self.name())?;
        let resp = self.client.post(&url).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn name(&self) -> &'static str { "ollama" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
    fn max_output_tokens(&self) -> usize { 8192 }
}

// ── 2. OpenAI ─────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { model: model.into(), api_key: api_key.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = openai_body(&req, &self.model, self.name())?;
        let resp = self.client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn name(&self) -> &'static str { "openai" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_output_tokens(&self) -> usize { 16_384 }
}

// ── 3. OpenAI-Compatible (LMStudio, TogetherAI, Groq, OpenRouter, vLLM, …) ──

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k),
            None    => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = openai_body(&req, &self.model, self.name())?;
        let resp = self.auth(self.client.post(&url)).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn name(&self) -> &'static str { "openai_compatible" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

// ── 4. Anthropic (claude-*) ───────────────────────────────────────────────────

pub struct AnthropicBackend {
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model: model.into(), client: reqwest::Client::new() }
    }

    fn media_block(&self, part: &MediaPart) -> Result<Value, LlmError> {
        let source = json!({"type": "base64", "media_type": part.mime_type, "data": part.data});
        if part.is_image() {
            Ok(json!({"type": "image", "source": source}))
        } else if part.mime_type == "application/pdf" {
            Ok(json!({"type": "document", "source": source}))
        } else {
            Err(LlmError::UnsupportedMedia { backend: self.name(), mime_type: part.mime_type.clone() })
        }
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let all = messages_with_schema(&req);
        // Anthropic Messages API — split system prompt from user messages
        let system = all.iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let turns: Vec<&Message> = all.iter().filter(|m| m.role != "system").collect();
        let media_at = turns.iter().rposition(|m| m.role == "user");
        let mut messages = Vec::with_capacity(turns.len());
        for (i, m) in turns.iter().enumerate() {
            if Some(i) == media_at && !req.media.is_empty() {
                let mut blocks = req.media.iter()
                    .map(|p| self.media_block(p))
                    .collect::<Result<Vec<_>, _>>()?;
                blocks.push(json!({"type": "text", "text": m.content}));
                messages.push(json!({"role": m.role, "content": blocks}));
            } else {
                messages.push(json!({"role": m.role, "content": m.content}));
            }
        }

        let model = req.model.as_deref().unwrap_or(&self.model);
        let mut body = json!({
            "model":      model,
            "messages":   messages,
            "max_tokens": req.max_tokens.unwrap_or(4096),
        });
        if let Some(t) = req.temperature {
            body["temperature"] = json!(t);
        }
        if !system.is_empty() {
            body["system"] = Value::String(system.to_string());
        }

        let resp = self.client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = check_response_status(resp).await?;

        let content = json["content"]
            .as_array()
            .map(|blocks| {
                blocks.iter()
                    .filter_map(|b| b["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: json["model"].as_str().unwrap_or(model).to_string(),
            prompt_tokens:     json["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        })
    }

    fn name(&self) -> &'static str { "anthropic" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

// ── 5. Google Gemini ──────────────────────────────────────────────────────────

pub struct GeminiBackend {
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model: model.into(), client: reqwest::Client::new() }
    }

    /// Request body for `generateContent`.
    pub fn request_body(req: &LlmRequest) -> Value {
        // System message → systemInstruction
        let system_text = req.messages.iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone());

        let turns: Vec<&Message> = req.messages.iter().filter(|m| m.role != "system").collect();
        let media_at = turns.iter().rposition(|m| m.role == "user");
        let contents: Vec<Value> = turns.iter()
            .enumerate()
            .map(|(i, m)| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                let mut parts = vec![json!({ "text": m.content })];
                if Some(i) == media_at {
                    parts.extend(req.media.iter().map(|p| json!({
                        "inlineData": { "mimeType": p.mime_type, "data": p.data }
                    })));
                }
                json!({ "role": role, "parts": parts })
            })
            .collect();

        let mut generation = json!({
            "maxOutputTokens": req.max_tokens.unwrap_or(4096),
            "temperature":     req.temperature.unwrap_or(0.1),
        });
        if let Some(schema) = &req.response_schema {
            generation["responseMimeType"] = json!("application/json");
            generation["responseSchema"] = to_gemini_schema(schema);
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation,
        });
        if let Some(sys) = system_text {
            body["systemInstruction"] = json!({ "parts": [{ "text": sys }] });
        }
        body
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = req.model.as_deref().unwrap_or(&self.model);
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        );
        let body = Self::request_body(&req);

        let resp = self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;

        let content = json["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts.iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let prompt_tokens = json["usageMetadata"]["promptTokenCount"]
            .as_u64().unwrap_or(0) as u32;
        let completion_tokens = json["usageMetadata"]["candidatesTokenCount"]
            .as_u64().unwrap_or(0) as u32;

        Ok(LlmResponse {
            content,
            model: model.to_string(),
            prompt_tokens,
            completion_tokens,
        })
    }

    fn name(&self) -> &'static str { "gemini" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

// ── 6. Unavailable ────────────────────────────────────────────────────────────

/// Stands in when no backend could be configured; every call fails with the
/// original reason so the rest of the service keeps running.
pub struct UnavailableBackend {
    pub model: String,
    pub reason: String,
}

impl UnavailableBackend {
    pub fn new(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { model: model.into(), reason: reason.into() }
    }
}

#[async_trait]
impl LlmBackend for UnavailableBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::Unavailable(self.reason.clone()))
    }

    fn name(&self) -> &'static str { "unavailable" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
    fn max_output_tokens(&self) -> usize { 0 }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
