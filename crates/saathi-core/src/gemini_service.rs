//! Gemini bridge: generation via the Generative Language API.
//!
//! The core talks to the model only through the [`ModelClient`] seam so the
//! orchestrator, crisis classifier, and pulse overlay can be exercised with
//! the offline [`StubClient`] (llm_mode = "mock") or a real [`GeminiBridge`].
//!
//! API key: `GEMINI_API_KEY` in the environment. Default model: `gemini-2.5-flash`.

use crate::shared::{Message, Role};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Errors from a model invocation. Callers inside the core absorb these into
/// safe typed values; nothing here crosses the core boundary.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model API key not configured")]
    NotConfigured,
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("model returned no candidates")]
    Empty,
}

/// Seam between the core and the generative model.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate a completion for the given system instruction and turns.
    async fn generate(&self, system: &str, turns: &[Message]) -> Result<String, ModelError>;
}

// Generative Language API request/response shapes
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: InstructionContent,
    contents: Vec<TurnContent>,
}

#[derive(Serialize)]
struct InstructionContent {
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TurnContent {
    role: &'static str,
    parts: Vec<TextPart>,
}

#[derive(Serialize, Deserialize)]
struct TextPart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

/// Gemini bridge: conversational and classification completions.
pub struct GeminiBridge {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiBridge {
    /// Create a bridge using `GEMINI_API_KEY` from the environment.
    /// Returns `None` if no key is found.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("GEMINI_API_KEY").ok()?.trim().to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    /// Create a bridge with an explicit API key.
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    /// Set the model id (e.g. `gemini-2.5-flash`).
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait::async_trait]
impl ModelClient for GeminiBridge {
    async fn generate(&self, system: &str, turns: &[Message]) -> Result<String, ModelError> {
        if self.api_key.is_empty() {
            return Err(ModelError::NotConfigured);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );
        let body = GenerateRequest {
            system_instruction: InstructionContent {
                parts: vec![TextPart {
                    text: system.to_string(),
                }],
            },
            contents: turns
                .iter()
                .map(|m| TurnContent {
                    role: match m.role {
                        Role::User => "user",
                        Role::Model => "model",
                    },
                    parts: vec![TextPart {
                        text: m.text.clone(),
                    }],
                })
                .collect(),
        };

        let res = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, body });
        }

        let parsed: GenerateResponse = res
            .json()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::Empty);
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Offline stub (llm_mode = "mock")
// ---------------------------------------------------------------------------

const STUB_REPLIES: &[&str] = &[
    "I hear you. It sounds like things are really tough right now.",
    "That sounds incredibly stressful. Thanks for sharing that with me.",
    "It takes courage to talk about this. I'm here to listen.",
    "I understand. Let's try to work through this together.",
];

/// Deterministic offline client for development and tests. Returns a canned
/// empathetic reply wrapped in the conversational JSON contract, with a
/// keyword-based mood stub.
#[derive(Debug, Default, Clone)]
pub struct StubClient;

impl StubClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ModelClient for StubClient {
    async fn generate(&self, _system: &str, turns: &[Message]) -> Result<String, ModelError> {
        let last = turns
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text.as_str())
            .unwrap_or("");
        let lower = last.to_lowercase();

        let (label, score) = if lower.contains("anxious") || lower.contains("worried") {
            ("anxious", 4)
        } else if lower.contains("sad") || lower.contains("down") {
            ("sad", 4)
        } else if lower.contains("happy") || lower.contains("joy") {
            ("happy", 8)
        } else {
            ("neutral", 5)
        };

        let reply = STUB_REPLIES[last.len() % STUB_REPLIES.len()];
        Ok(serde_json::json!({
            "reply": reply,
            "mood": {"label": label, "score": score},
            "suggested_intervention": "self_help_breathing",
            "is_crisis": false,
            "resources": [],
            "explain": "stubbed offline response"
        })
        .to_string())
    }
}

// ---------------------------------------------------------------------------
// Session title generation
// ---------------------------------------------------------------------------

static TITLE_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9\-']*").expect("title word regex"));

const TITLE_SMALL_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "for", "nor", "on", "at", "to", "from", "by", "of",
    "in", "with",
];

/// Generate a concise Title-Case session title (3-5 words) for the first
/// message of a session. Returns `None` on any failure; callers keep the
/// default title in that case.
pub async fn generate_short_title(
    client: &dyn ModelClient,
    text: &str,
    max_words: usize,
) -> Option<String> {
    let prompt = crate::prompts::title_user_prompt(text);
    let raw = client
        .generate(crate::prompts::TITLE_SYSTEM, &[Message::user(prompt)])
        .await
        .ok()?;
    clean_title(&raw, max_words)
}

/// Cleanup: first line, quotes stripped, word extraction, small-word
/// lowercasing, Title Case, word cap.
fn clean_title(raw: &str, max_words: usize) -> Option<String> {
    let first_line = raw.trim().lines().next()?.trim();
    let cleaned = first_line.trim_matches(|c: char| "\"'`“”‘’".contains(c));
    let words: Vec<&str> = TITLE_WORD_RE
        .find_iter(cleaned)
        .map(|m| m.as_str())
        .take(max_words.max(1))
        .collect();
    if words.is_empty() {
        return None;
    }
    let titled: Vec<String> = words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let wl = w.to_lowercase();
            if i != 0 && TITLE_SMALL_WORDS.contains(&wl.as_str()) {
                wl
            } else {
                let mut chars = wl.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => wl,
                }
            }
        })
        .collect();
    let title = titled.join(" ").trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_cases_and_caps_words() {
        assert_eq!(
            clean_title("\"exam stress and the fear of results\"", 5).as_deref(),
            Some("Exam Stress and the Fear")
        );
        assert_eq!(clean_title("  \n", 5), None);
        assert_eq!(clean_title("hello", 5).as_deref(), Some("Hello"));
    }

    #[test]
    fn clean_title_takes_first_line_only() {
        assert_eq!(
            clean_title("Feeling Overwhelmed Today\nextra commentary", 5).as_deref(),
            Some("Feeling Overwhelmed Today")
        );
    }

    #[tokio::test]
    async fn stub_client_is_deterministic_json() {
        let client = StubClient::new();
        let out = client
            .generate("system", &[Message::user("I feel anxious about exams")])
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["mood"]["label"], "anxious");
        assert_eq!(v["is_crisis"], false);

        let again = client
            .generate("system", &[Message::user("I feel anxious about exams")])
            .await
            .unwrap();
        assert_eq!(out, again);
    }
}
