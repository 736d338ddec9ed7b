//! LLM-backed agent over the Google Generative Language API.

use async_trait::async_trait;
use kosora_rag::RetrievalPassage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{Category, Finding};

use super::error::{AgentError, AgentResult};
use super::parse::{self, ParseContext};
use super::{AgentAdapter, AgentContext};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Passages beyond this many characters are cut in the prompt.
const MAX_PASSAGE_CHARS: usize = 1500;

/// Connection settings for [`GeminiAgent`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiSettings {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_base_url() -> String {
    GEMINI_API_BASE.to_string()
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            temperature: default_temperature(),
            base_url: default_base_url(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// One Gemini-backed agent, registered under a single category.
#[derive(Debug, Clone)]
pub struct GeminiAgent {
    id: String,
    category: Category,
    client: Client,
    settings: GeminiSettings,
}

impl GeminiAgent {
    pub fn new(category: Category, settings: GeminiSettings) -> Self {
        Self::with_client(Client::new(), category, settings)
    }

    /// Share one HTTP connection pool across several agents.
    pub fn with_client(client: Client, category: Category, settings: GeminiSettings) -> Self {
        Self {
            id: format!("gemini-{category}"),
            category,
            client,
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn focus(category: Category) -> &'static str {
    match category {
        Category::Grammar => "grammar errors (agreement, conjugation, syntax, spelling)",
        Category::Style => "style problems (clarity, concision, register, repetition)",
        Category::Content => {
            "content errors (factual mistakes, claims contradicting the reference material, missing key points)"
        }
        Category::Other => "any other problem a teacher would point out",
    }
}

/// Prompt asking for a JSON array of findings for one category.
pub fn build_prompt(
    category: Category,
    text: &str,
    passages: &[RetrievalPassage],
    locale: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are an exam corrector. Review the student answer below and report only {}.\n",
        focus(category)
    );
    if let Some(locale) = locale {
        prompt.push_str(&format!(
            "The answer is written in locale `{locale}`; write messages in that language.\n"
        ));
    }
    if !passages.is_empty() {
        prompt.push_str("\nReference material:\n");
        for p in passages {
            let excerpt: String = p.text.chars().take(MAX_PASSAGE_CHARS).collect();
            prompt.push_str(&format!("[{}] {}\n", p.passage_id, excerpt));
        }
    }
    prompt.push_str(&format!(
        "\nStudent answer:\n\"\"\"\n{text}\n\"\"\"\n\n\
         Return only a JSON array. Each element is an object with:\n\
         - \"start\", \"end\": character offsets into the answer, end exclusive\n\
         - \"message\": a short explanation\n\
         - \"severity\": \"info\" | \"warning\" | \"error\"\n\
         - \"confidence\": a number between 0 and 1\n\
         - \"suggestion\": optional replacement text\n\
         Return [] when there is nothing to report.\n"
    ));
    prompt
}

/// Concatenated text of the first candidate.
fn reply_text(body: &str) -> Result<String, String> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid response body: {e}"))?;
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or("response has no candidates")?;
    let text: String = content.parts.into_iter().map(|p| p.text).collect();
    if text.trim().is_empty() {
        return Err("response candidate is empty".to_string());
    }
    Ok(text)
}

fn request_error(agent_id: &str, err: reqwest::Error) -> AgentError {
    if err.is_timeout() {
        AgentError::timeout(agent_id, err.to_string())
    } else {
        AgentError::transport(agent_id, err.to_string())
    }
}

#[async_trait]
impl AgentAdapter for GeminiAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> Category {
        self.category
    }

    #[instrument(
        skip(self, text, context),
        fields(agent_id = %self.id, model = %self.settings.model)
    )]
    async fn evaluate(&self, text: &str, context: &AgentContext) -> AgentResult<Vec<Finding>> {
        let prompt = build_prompt(
            self.category,
            text,
            &context.passages,
            context.locale.as_deref(),
        );
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(self.settings.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .timeout(context.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(&self.id, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_error(&self.id, e))?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(AgentError::transport(&self.id, format!("HTTP {status}: {detail}")));
        }

        let reply = reply_text(&body).map_err(|e| AgentError::malformed(&self.id, e))?;
        let ctx = ParseContext::new(&self.id, self.category, text.chars().count());
        let findings = parse::parse_findings_text(&reply, &ctx)?;
        debug!(findings = findings.len(), "gemini reply parsed");
        Ok(findings)
    }
}
