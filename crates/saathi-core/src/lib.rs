//! saathi-core: wellness companion core library.
//!
//! Layers: crisis detection (pattern pre-filter + model classifier + gate),
//! response-contract enforcement, conversation orchestration with bounded
//! history and explicit memory commands, session storage seam, and the
//! community pulse aggregator. The web/routing layer, auth, and the
//! persistent document store are external collaborators.

mod config;
mod contract;
mod gemini_service;
mod orchestrator;
mod pulse;
mod resources;
mod safety;
mod session;
mod shared;
pub mod prompts;

// Shared domain types
pub use shared::{
    ConversationHistory, CrisisDecision, Intervention, MemoryNotes, Message, MoodJudgment,
    MoodLabel, ResourceEntry, ResourceKind, Role, TurnResult, HISTORY_CAP, MEMORY_NOTES_CAP,
};

// Configuration
pub use config::{CompanionConfig, LanguagePolicy};

// Model client seam (Gemini bridge + offline stub)
pub use gemini_service::{
    generate_short_title, GeminiBridge, ModelClient, ModelError, StubClient,
};

// Crisis detection pipeline
pub use safety::{
    CrisisGate, CrisisJudgment, JudgmentSource, ModelCrisisClassifier, PatternMatcher,
    CRISIS_REPLY, FALLBACK_CRISIS_TERMS,
};

// Response contract
pub use contract::{ResponseContract, FALLBACK_REPLY_MISSING, FALLBACK_REPLY_UNPARSEABLE};

// Orchestration
pub use orchestrator::{
    parse_memory_command, ConversationOrchestrator, MemoryCommand, OrchestratorError,
    DEGRADED_REPLY, MAX_TRANSPORT_CHARS,
};

// Session storage
pub use session::{
    new_session_id, MemorySessionStore, SessionError, SessionState, SessionStore,
    SledSessionStore,
};

// Community pulse
pub use pulse::{
    hash_session_id, PulseAction, PulseAggregator, PulseEvent, PulseOverlay, PulseSummary,
    RegionSummary, SafetyLevel, ThemeCount, Trend, ALLOWED_THEMES,
};

// Static resource catalog
pub use resources::{kiran_helpline, resources_for_region};
