//! Conversation orchestration: memory-command parsing, request assembly,
//! model invocation, contract enforcement, and history truncation.
//!
//! The orchestrator never lets an exception escape to the transport layer;
//! the only surfaced errors are explicit input-validation rejections at the
//! entry point.

use crate::config::CompanionConfig;
use crate::contract::ResponseContract;
use crate::gemini_service::ModelClient;
use crate::prompts::companion_system_instruction;
use crate::safety::CrisisGate;
use crate::session::{SessionState, SessionStore};
use crate::shared::{ConversationHistory, MemoryNotes, Message, MoodJudgment, TurnResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-turn transport cap on message text sent to the model.
pub const MAX_TRANSPORT_CHARS: usize = 2000;

/// Apologetic reply used when the model invocation itself fails.
pub const DEGRADED_REPLY: &str =
    "Sorry, I'm having trouble responding right now. Please try again in a moment.";

/// Input-validation rejections at the orchestration entry point. Everything
/// else in this module is absorbed into safe typed values.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("session_id is required")]
    EmptySessionId,
    #[error("message is required")]
    EmptyMessage,
}

/// Explicit memory commands intercepted before model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryCommand {
    Remember(String),
    ForgetAll,
    ForgetLast,
}

/// Strip an ASCII prefix case-insensitively, returning the remainder.
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// Parse a message as a memory command. Prefixes are case-insensitive;
/// ordinary chat turns never mutate memory.
pub fn parse_memory_command(text: &str) -> Option<MemoryCommand> {
    let trimmed = text.trim();
    for prefix in ["remember:", "remember that "] {
        if let Some(rest) = strip_prefix_ci(trimmed, prefix) {
            let fact = rest.trim();
            return (!fact.is_empty()).then(|| MemoryCommand::Remember(fact.to_string()));
        }
    }
    if trimmed.eq_ignore_ascii_case("forget all memory") {
        Some(MemoryCommand::ForgetAll)
    } else if trimmed.eq_ignore_ascii_case("forget last memory") {
        Some(MemoryCommand::ForgetLast)
    } else {
        None
    }
}

/// Assembles bounded history and memory notes into a model request, invokes
/// the model, and threads the result through the response contract.
pub struct ConversationOrchestrator {
    client: Arc<dyn ModelClient>,
    store: Arc<dyn SessionStore>,
    gate: CrisisGate,
    contract: ResponseContract,
    config: CompanionConfig,
}

impl ConversationOrchestrator {
    pub fn new(
        client: Arc<dyn ModelClient>,
        store: Arc<dyn SessionStore>,
        gate: CrisisGate,
        config: CompanionConfig,
    ) -> Self {
        let contract = ResponseContract::new(config.mood_normalize);
        Self {
            client,
            store,
            gate,
            contract,
            config,
        }
    }

    /// Full entry point for one inbound message: validation, crisis gate,
    /// session load, turn generation, session put. The crisis path returns
    /// the fixed payload and never reaches the generative model.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<TurnResult, OrchestratorError> {
        if session_id.trim().is_empty() {
            return Err(OrchestratorError::EmptySessionId);
        }
        if message.trim().is_empty() {
            return Err(OrchestratorError::EmptyMessage);
        }

        let mut state = self
            .store
            .get(session_id)
            .unwrap_or_else(|e| {
                warn!(error = %e, "session load failed; starting fresh");
                None
            })
            .unwrap_or_else(SessionState::default);

        let decision = self.gate.evaluate(message).await;
        let result = if decision.is_crisis {
            debug!(reason = %decision.reason_code, "returning fixed crisis payload");
            let payload = self.gate.crisis_payload();
            state.history.push(Message::user(message));
            state.history.push(Message::model(payload.reply.clone()));
            state.history.truncate_to_cap();
            payload
        } else {
            self.respond(message, &mut state.history, &mut state.notes)
                .await
        };

        if let Err(e) = self.store.put(session_id, &state) {
            warn!(error = %e, "session save failed");
        }
        Ok(result)
    }

    /// One conversational turn against already-loaded session state. Memory
    /// commands short-circuit; model failures degrade to a fixed safe result
    /// without touching the history.
    pub async fn respond(
        &self,
        message: &str,
        history: &mut ConversationHistory,
        notes: &mut MemoryNotes,
    ) -> TurnResult {
        if let Some(command) = parse_memory_command(message) {
            return apply_memory_command(command, notes);
        }

        let turns = self.assemble_turns(message, history, notes);
        let system = companion_system_instruction(self.config.language_policy);

        let raw = match self.client.generate(&system, &turns).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "model invocation failed; returning degraded turn");
                return degraded_turn();
            }
        };

        let result = self.contract.normalize(&raw);

        history.push(Message::user(message));
        history.push(Message::model(result.reply.clone()));
        history.truncate_to_cap();

        result
    }

    /// Optional synthetic memory turn, then bounded history, then the new
    /// user message. All text is transport-truncated.
    fn assemble_turns(
        &self,
        message: &str,
        history: &ConversationHistory,
        notes: &MemoryNotes,
    ) -> Vec<Message> {
        let mut turns = Vec::with_capacity(history.len() + 2);
        if !notes.is_empty() {
            let facts: Vec<String> = notes.iter().map(|f| format!("- {f}")).collect();
            turns.push(Message::user(format!(
                "For context, here are things I've asked you to remember about me:\n{}",
                facts.join("\n")
            )));
        }
        for m in history.iter() {
            turns.push(Message {
                role: m.role,
                text: truncate_chars(&m.text, MAX_TRANSPORT_CHARS),
            });
        }
        turns.push(Message::user(truncate_chars(message, MAX_TRANSPORT_CHARS)));
        turns
    }
}

/// Fixed safe result for a failed model invocation.
fn degraded_turn() -> TurnResult {
    TurnResult {
        reply: DEGRADED_REPLY.to_string(),
        mood: MoodJudgment::upstream_error(),
        is_crisis: false,
        suggested_intervention: String::new(),
        resources: Vec::new(),
        explain: String::new(),
    }
}

/// Acknowledgment turn for an intercepted memory command. Mutates the notes;
/// never reaches the model.
fn apply_memory_command(command: MemoryCommand, notes: &mut MemoryNotes) -> TurnResult {
    let reply = match command {
        MemoryCommand::Remember(fact) => {
            if notes.remember(fact) {
                "Got it - I'll remember that.".to_string()
            } else {
                "I already have that noted.".to_string()
            }
        }
        MemoryCommand::ForgetAll => {
            let n = notes.forget_all();
            if n > 0 {
                "Done - I've cleared everything you asked me to remember.".to_string()
            } else {
                "There was nothing saved to forget.".to_string()
            }
        }
        MemoryCommand::ForgetLast => match notes.forget_last() {
            Some(_) => "Okay, I've forgotten the last thing you told me.".to_string(),
            None => "There was nothing saved to forget.".to_string(),
        },
    };
    TurnResult {
        reply,
        mood: MoodJudgment::neutral(),
        is_crisis: false,
        suggested_intervention: String::new(),
        resources: Vec::new(),
        explain: "memory command".to_string(),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
