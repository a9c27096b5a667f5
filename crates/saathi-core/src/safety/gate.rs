//! Crisis gate: one decision per call, no state across calls. This is the
//! safety-critical control point gating all downstream model generation.
//!
//! Layering: the deterministic matcher is both a pre-filter (fast path, no
//! model call on unambiguous text) and a safety-net backstop when the model
//! layer fails open. When crisis is declared, the turn gets the fixed
//! reviewed payload; free-form generation never reaches a user in crisis.

use crate::resources::kiran_helpline;
use crate::safety::classifier::{JudgmentSource, ModelCrisisClassifier};
use crate::safety::pattern::PatternMatcher;
use crate::shared::{CrisisDecision, Intervention, MoodJudgment, MoodLabel, TurnResult};
use tracing::{debug, info};

/// Fixed reply text for the crisis safety payload.
pub const CRISIS_REPLY: &str = "It sounds like you are going through a lot right now. \
    It's important to talk to someone who can help. Here is a resource for you.";

/// Orchestrates exclusion rules, the pattern pre-filter, and the model
/// classifier into one boolean decision with a traceable reason code.
pub struct CrisisGate {
    matcher: PatternMatcher,
    classifier: ModelCrisisClassifier,
    crisis_mood_score: u8,
}

impl CrisisGate {
    pub fn new(classifier: ModelCrisisClassifier, crisis_mood_score: u8) -> Self {
        Self {
            matcher: PatternMatcher::new(),
            classifier,
            crisis_mood_score: crisis_mood_score.clamp(1, 10),
        }
    }

    /// Evaluate one message. Decision order:
    /// 1. empty/whitespace-only -> not crisis
    /// 2. exclusion phrase -> not crisis (hard override)
    /// 3. pattern match -> crisis (`pattern_match`), no model call
    /// 4. model classifier -> crisis (`model_detection:<confidence%>`)
    /// 5. classifier unusable, keyword backstop -> crisis (`fallback_keyword_match`)
    /// 6. otherwise -> not crisis
    pub async fn evaluate(&self, text: &str) -> CrisisDecision {
        if text.trim().is_empty() {
            return CrisisDecision::not_crisis("empty_message");
        }

        if self.matcher.is_excluded(text) {
            debug!("exclusion phrase matched; overriding any keyword hit");
            return CrisisDecision::not_crisis("exclusion_phrase");
        }

        if let Some(term) = self.matcher.evaluate(text) {
            info!(reason = "pattern_match", term = %term, "crisis detected");
            return CrisisDecision::crisis("pattern_match", 1.0);
        }

        let judgment = self.classifier.classify(text).await;
        if judgment.is_crisis {
            let decision = match judgment.source {
                JudgmentSource::KeywordFallback => {
                    CrisisDecision::crisis("fallback_keyword_match", judgment.confidence)
                }
                _ => CrisisDecision::crisis(
                    format!(
                        "model_detection:{}",
                        (judgment.confidence * 100.0).round() as u32
                    ),
                    judgment.confidence,
                ),
            };
            info!(reason = %decision.reason_code, "crisis detected");
            return decision;
        }

        CrisisDecision::not_crisis("no_indicators")
    }

    /// The fixed, reviewed safety payload returned instead of a generated
    /// reply. Always carries at least one helpline resource and a
    /// maximally-negative mood.
    pub fn crisis_payload(&self) -> TurnResult {
        TurnResult {
            reply: CRISIS_REPLY.to_string(),
            mood: MoodJudgment {
                label: MoodLabel::Distressed,
                score: self.crisis_mood_score,
            },
            is_crisis: true,
            suggested_intervention: Intervention::CrisisProtocol.as_str().to_string(),
            resources: vec![kiran_helpline()],
            explain: "crisis indicators detected; safety protocol engaged".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini_service::{ModelClient, ModelError};
    use crate::shared::{Message, ResourceKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts calls so tests can assert the pattern fast path skips the model.
    struct CountingClient {
        calls: AtomicUsize,
        response: Result<&'static str, ()>,
    }

    #[async_trait::async_trait]
    impl ModelClient for CountingClient {
        async fn generate(&self, _system: &str, _turns: &[Message]) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.response {
                Ok(s) => Ok(s.to_string()),
                Err(()) => Err(ModelError::Transport("down".to_string())),
            }
        }
    }

    fn gate_with(response: Result<&'static str, ()>) -> (CrisisGate, Arc<CountingClient>) {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
            response,
        });
        let gate = CrisisGate::new(ModelCrisisClassifier::new(client.clone()), 2);
        (gate, client)
    }

    #[tokio::test]
    async fn direct_keyword_is_crisis_without_model_call() {
        let (gate, client) = gate_with(Err(()));
        let d = gate.evaluate("I want to kill myself").await;
        assert!(d.is_crisis);
        assert!(
            d.reason_code.starts_with("pattern_match")
                || d.reason_code.starts_with("fallback_keyword_match")
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exclusion_phrase_overrides_everything() {
        let (gate, _) = gate_with(Ok(r#"{"is_crisis": true, "confidence": 1.0, "reasoning": "x"}"#));
        let d = gate
            .evaluate("I'm dying of embarrassment, that test was so funny")
            .await;
        assert!(!d.is_crisis);
        assert_eq!(d.reason_code, "exclusion_phrase");

        let d = gate.evaluate("I don't want to die").await;
        assert!(!d.is_crisis);
    }

    #[tokio::test]
    async fn empty_message_is_not_crisis() {
        let (gate, client) = gate_with(Err(()));
        let d = gate.evaluate("   ").await;
        assert!(!d.is_crisis);
        assert_eq!(d.reason_code, "empty_message");
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_detection_carries_confidence_percent() {
        let (gate, _) =
            gate_with(Ok(r#"{"is_crisis": true, "confidence": 0.87, "reasoning": "indirect"}"#));
        let d = gate.evaluate("everyone would be better off someday").await;
        assert!(d.is_crisis);
        assert_eq!(d.reason_code, "model_detection:87");
    }

    #[tokio::test]
    async fn model_failure_fails_closed_to_not_crisis() {
        let (gate, _) = gate_with(Err(()));
        let d = gate.evaluate("feeling a bit low after results").await;
        assert!(!d.is_crisis);
        assert_eq!(d.reason_code, "no_indicators");
    }

    #[tokio::test]
    async fn crisis_payload_has_helpline_and_negative_mood() {
        let (gate, _) = gate_with(Err(()));
        let payload = gate.crisis_payload();
        assert!(payload.is_crisis);
        assert_eq!(payload.mood.label, MoodLabel::Distressed);
        assert_eq!(payload.mood.score, 2);
        assert_eq!(payload.suggested_intervention, "crisis_protocol");
        assert!(!payload.resources.is_empty());
        assert!(payload
            .resources
            .iter()
            .any(|r| r.kind == ResourceKind::Helpline));
        assert!(!payload.reply.is_empty());
    }
}
