//! Model-backed crisis classifier. Advisory input to the gate, never
//! authoritative by itself; every failure mode degrades to a typed judgment.

use crate::contract::extract_json_object;
use crate::gemini_service::ModelClient;
use crate::prompts::{crisis_detection_prompt, CRISIS_DETECTION_SYSTEM};
use crate::safety::pattern::FALLBACK_CRISIS_TERMS;
use crate::shared::Message;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// Which layer produced the judgment. The gate maps this to its reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgmentSource {
    /// Parsed from the model's JSON response.
    Model,
    /// The model response was unusable; the hardcoded keyword backstop fired.
    KeywordFallback,
    /// The model was unreachable or its output unusable, and no backstop hit.
    Unavailable,
}

/// A typed crisis judgment with confidence and rationale.
#[derive(Debug, Clone)]
pub struct CrisisJudgment {
    pub is_crisis: bool,
    pub confidence: f32,
    pub reasoning: String,
    pub source: JudgmentSource,
}

#[derive(Deserialize)]
struct RawJudgment {
    #[serde(default)]
    is_crisis: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Delegates a single-purpose classification prompt to the generative model.
pub struct ModelCrisisClassifier {
    client: Arc<dyn ModelClient>,
}

impl ModelCrisisClassifier {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    /// Classify a message for crisis indicators. Never returns an error:
    /// transport failures and unparseable output degrade to a judgment with
    /// the failure reason in `reasoning`.
    pub async fn classify(&self, text: &str) -> CrisisJudgment {
        let prompt = crisis_detection_prompt(text);
        let raw = match self
            .client
            .generate(CRISIS_DETECTION_SYSTEM, &[Message::user(prompt)])
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "crisis classifier unavailable");
                return CrisisJudgment {
                    is_crisis: false,
                    confidence: 0.0,
                    reasoning: e.to_string(),
                    source: JudgmentSource::Unavailable,
                };
            }
        };

        let parsed: Option<RawJudgment> = serde_json::from_str(&raw)
            .ok()
            .or_else(|| extract_json_object(&raw).and_then(|span| serde_json::from_str(span).ok()));

        if let Some(j) = parsed {
            return CrisisJudgment {
                is_crisis: j.is_crisis,
                confidence: (j.confidence as f32).clamp(0.0, 1.0),
                reasoning: j.reasoning,
                source: JudgmentSource::Model,
            };
        }

        // Unusable response: fall back to the keyword backstop.
        let lower = text.to_lowercase();
        if let Some(term) = FALLBACK_CRISIS_TERMS.iter().find(|t| lower.contains(*t)) {
            return CrisisJudgment {
                is_crisis: true,
                confidence: 0.9,
                reasoning: format!("keyword fallback: {term}"),
                source: JudgmentSource::KeywordFallback,
            };
        }

        CrisisJudgment {
            is_crisis: false,
            confidence: 0.0,
            reasoning: "unparseable".to_string(),
            source: JudgmentSource::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini_service::ModelError;

    struct CannedClient(Result<&'static str, ()>);

    #[async_trait::async_trait]
    impl ModelClient for CannedClient {
        async fn generate(&self, _system: &str, _turns: &[Message]) -> Result<String, ModelError> {
            match self.0 {
                Ok(s) => Ok(s.to_string()),
                Err(()) => Err(ModelError::Transport("connection refused".to_string())),
            }
        }
    }

    fn classifier(raw: Result<&'static str, ()>) -> ModelCrisisClassifier {
        ModelCrisisClassifier::new(Arc::new(CannedClient(raw)))
    }

    #[tokio::test]
    async fn clean_json_is_parsed() {
        let c = classifier(Ok(
            r#"{"is_crisis": true, "confidence": 0.85, "reasoning": "explicit ideation"}"#,
        ));
        let j = c.classify("some message").await;
        assert!(j.is_crisis);
        assert_eq!(j.source, JudgmentSource::Model);
        assert!((j.confidence - 0.85).abs() < 1e-6);
    }

    #[tokio::test]
    async fn json_wrapped_in_prose_is_recovered() {
        let c = classifier(Ok(
            r#"Here is my assessment: {"is_crisis": false, "confidence": 0.2, "reasoning": "metaphor"}"#,
        ));
        let j = c.classify("dying of laughter").await;
        assert!(!j.is_crisis);
        assert_eq!(j.source, JudgmentSource::Model);
    }

    #[tokio::test]
    async fn unusable_output_falls_back_to_keywords() {
        let c = classifier(Ok("I cannot help with that."));
        let j = c.classify("I want to end my life").await;
        assert!(j.is_crisis);
        assert_eq!(j.source, JudgmentSource::KeywordFallback);
        assert!((j.confidence - 0.9).abs() < 1e-6);

        let j = c.classify("what a lovely day").await;
        assert!(!j.is_crisis);
        assert_eq!(j.source, JudgmentSource::Unavailable);
        assert_eq!(j.reasoning, "unparseable");
    }

    #[tokio::test]
    async fn transport_failure_degrades_without_error() {
        let c = classifier(Err(()));
        let j = c.classify("anything").await;
        assert!(!j.is_crisis);
        assert_eq!(j.source, JudgmentSource::Unavailable);
        assert!(j.reasoning.contains("connection refused"));
    }
}
