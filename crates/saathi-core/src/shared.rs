//! Shared domain types used across the companion core.

use serde::{Deserialize, Serialize};

/// Hard cap on conversation history length (5 exchanges). Oldest entries are
/// evicted first once the cap is exceeded.
pub const HISTORY_CAP: usize = 10;

/// Hard cap on persistent memory notes per session.
pub const MEMORY_NOTES_CAP: usize = 20;

// -----------------------------------------------------------------------------
// Conversation turns
// -----------------------------------------------------------------------------

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One turn in a conversation. Immutable once created; ordinal position is the
/// index in its [`ConversationHistory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Ordered conversation history, newest last. Bounded to [`HISTORY_CAP`]
/// entries with FIFO eviction; mutated only by the orchestrator at the end of
/// a completed exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    #[serde(default)]
    turns: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.turns.push(message);
    }

    /// Evicts oldest entries until the history fits [`HISTORY_CAP`].
    pub fn truncate_to_cap(&mut self) {
        if self.turns.len() > HISTORY_CAP {
            let excess = self.turns.len() - HISTORY_CAP;
            self.turns.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.turns.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.turns
    }
}

// -----------------------------------------------------------------------------
// Persistent memory notes
// -----------------------------------------------------------------------------

/// Short user-authored facts opted into persistence via explicit
/// remember/forget commands. Set semantics: deduplicated by exact text,
/// insertion-ordered, capped at [`MEMORY_NOTES_CAP`] with FIFO eviction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryNotes {
    #[serde(default)]
    notes: Vec<String>,
}

impl MemoryNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fact. Returns false if an identical fact is already stored.
    pub fn remember(&mut self, fact: impl Into<String>) -> bool {
        let fact = fact.into();
        let fact = fact.trim().to_string();
        if fact.is_empty() || self.notes.iter().any(|n| *n == fact) {
            return false;
        }
        self.notes.push(fact);
        if self.notes.len() > MEMORY_NOTES_CAP {
            let excess = self.notes.len() - MEMORY_NOTES_CAP;
            self.notes.drain(..excess);
        }
        true
    }

    /// Removes every stored fact, returning how many were dropped.
    pub fn forget_all(&mut self) -> usize {
        let n = self.notes.len();
        self.notes.clear();
        n
    }

    /// Removes exactly the most recently added fact.
    pub fn forget_last(&mut self) -> Option<String> {
        self.notes.pop()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.notes.iter()
    }
}

// -----------------------------------------------------------------------------
// Mood taxonomy
// -----------------------------------------------------------------------------

/// Canonical 10-tier mood taxonomy. Each label owns a fixed score band on the
/// 1-10 scale; [`MoodLabel::Error`] is the out-of-band marker (score 0) for
/// turns degraded by an upstream failure and is never produced by parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodLabel {
    Distressed,
    VerySad,
    Sad,
    Anxious,
    Frustrated,
    Neutral,
    Calm,
    Content,
    Happy,
    Joyful,
    Elated,
    Error,
}

impl Default for MoodLabel {
    fn default() -> Self {
        Self::Neutral
    }
}

impl MoodLabel {
    /// Inclusive score band for the label:
    /// distressed 1-2, very_sad 3, sad 4, anxious 4, frustrated 4, neutral 5,
    /// calm 6, content 7, happy 8, joyful 9, elated 10.
    pub fn score_band(&self) -> (u8, u8) {
        match self {
            MoodLabel::Distressed => (1, 2),
            MoodLabel::VerySad => (3, 3),
            MoodLabel::Sad | MoodLabel::Anxious | MoodLabel::Frustrated => (4, 4),
            MoodLabel::Neutral => (5, 5),
            MoodLabel::Calm => (6, 6),
            MoodLabel::Content => (7, 7),
            MoodLabel::Happy => (8, 8),
            MoodLabel::Joyful => (9, 9),
            MoodLabel::Elated => (10, 10),
            MoodLabel::Error => (0, 0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Distressed => "distressed",
            MoodLabel::VerySad => "very_sad",
            MoodLabel::Sad => "sad",
            MoodLabel::Anxious => "anxious",
            MoodLabel::Frustrated => "frustrated",
            MoodLabel::Neutral => "neutral",
            MoodLabel::Calm => "calm",
            MoodLabel::Content => "content",
            MoodLabel::Happy => "happy",
            MoodLabel::Joyful => "joyful",
            MoodLabel::Elated => "elated",
            MoodLabel::Error => "error",
        }
    }

    /// Lenient parse: case-insensitive, tolerates spaces for underscores.
    /// Unknown labels (including "error", which is internal-only) fall back
    /// to [`MoodLabel::Neutral`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "distressed" => MoodLabel::Distressed,
            "very_sad" => MoodLabel::VerySad,
            "sad" => MoodLabel::Sad,
            "anxious" => MoodLabel::Anxious,
            "frustrated" => MoodLabel::Frustrated,
            "neutral" => MoodLabel::Neutral,
            "calm" => MoodLabel::Calm,
            "content" => MoodLabel::Content,
            "happy" => MoodLabel::Happy,
            "joyful" => MoodLabel::Joyful,
            "elated" => MoodLabel::Elated,
            _ => MoodLabel::Neutral,
        }
    }
}

/// A mood classification: label + 1-10 score. The label is authoritative when
/// the two disagree; the score is coerced into the label's band, never the
/// reverse (and only when normalization is enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodJudgment {
    pub label: MoodLabel,
    pub score: u8,
}

impl Default for MoodJudgment {
    fn default() -> Self {
        Self::neutral()
    }
}

impl MoodJudgment {
    pub fn neutral() -> Self {
        Self {
            label: MoodLabel::Neutral,
            score: 5,
        }
    }

    /// Degraded-turn marker used when the upstream model is unavailable.
    pub fn upstream_error() -> Self {
        Self {
            label: MoodLabel::Error,
            score: 0,
        }
    }

    /// Clamps the score into the label's canonical band.
    pub fn clamp_into_band(&mut self) {
        let (lo, hi) = self.label.score_band();
        self.score = self.score.clamp(lo, hi);
    }
}

// -----------------------------------------------------------------------------
// Crisis decision
// -----------------------------------------------------------------------------

/// Outcome of one crisis-gate evaluation. Ephemeral: computed per message and
/// never persisted by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisDecision {
    pub is_crisis: bool,
    /// Which layer fired: `pattern_match`, `model_detection:<confidence%>`,
    /// `fallback_keyword_match`, or a not-crisis code
    /// (`empty_message`, `exclusion_phrase`, `no_indicators`).
    pub reason_code: String,
    pub confidence: f32,
}

impl CrisisDecision {
    pub fn crisis(reason_code: impl Into<String>, confidence: f32) -> Self {
        Self {
            is_crisis: true,
            reason_code: reason_code.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn not_crisis(reason_code: impl Into<String>) -> Self {
        Self {
            is_crisis: false,
            reason_code: reason_code.into(),
            confidence: 0.0,
        }
    }
}

// -----------------------------------------------------------------------------
// Turn result (the response contract's output)
// -----------------------------------------------------------------------------

/// Resource category used in turn results and the static catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Helpline,
    Counselling,
    Selfhelp,
    Peer,
    Emergency,
    #[serde(other)]
    Other,
}

impl Default for ResourceKind {
    fn default() -> Self {
        Self::Other
    }
}

/// One signposted resource. Model output is deserialized leniently: missing
/// fields default, unknown `type` values map to [`ResourceKind::Other`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Display title. Accepts the legacy `name` key from older payloads.
    #[serde(default, alias = "name")]
    pub title: String,
    /// `tel:` number or URL.
    #[serde(default)]
    pub contact: String,
    #[serde(default, rename = "type")]
    pub kind: ResourceKind,
    /// Optional cost hint ("free", "low") carried by catalog entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
}

/// Canonical intervention ids the companion may suggest. The wire field stays
/// a pass-through string; this enum is the allow-list for anything that needs
/// the semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intervention {
    SelfHelpBreathing,
    SelfHelp5Senses,
    SelfHelpMindfulness,
    ShortCopingPlan,
    ReferProfessional,
    ReferCrisisServices,
    FollowUpCheckin,
    PeerSupport,
    Clarify,
    CrisisProtocol,
}

impl Intervention {
    pub const ALL: &'static [Intervention] = &[
        Intervention::SelfHelpBreathing,
        Intervention::SelfHelp5Senses,
        Intervention::SelfHelpMindfulness,
        Intervention::ShortCopingPlan,
        Intervention::ReferProfessional,
        Intervention::ReferCrisisServices,
        Intervention::FollowUpCheckin,
        Intervention::PeerSupport,
        Intervention::Clarify,
        Intervention::CrisisProtocol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intervention::SelfHelpBreathing => "self_help_breathing",
            Intervention::SelfHelp5Senses => "self_help_5senses",
            Intervention::SelfHelpMindfulness => "self_help_mindfulness",
            Intervention::ShortCopingPlan => "short_coping_plan",
            Intervention::ReferProfessional => "refer_professional",
            Intervention::ReferCrisisServices => "refer_crisis_services",
            Intervention::FollowUpCheckin => "follow_up_checkin",
            Intervention::PeerSupport => "peer_support",
            Intervention::Clarify => "clarify",
            Intervention::CrisisProtocol => "crisis_protocol",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.iter().copied().find(|i| i.as_str() == s)
    }
}

/// The normalized result of one conversational turn. Every field has a safe
/// default; the struct is always well-formed regardless of what the upstream
/// model returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub mood: MoodJudgment,
    #[serde(default)]
    pub is_crisis: bool,
    #[serde(default)]
    pub suggested_intervention: String,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
    #[serde(default)]
    pub explain: String,
}

impl Default for TurnResult {
    fn default() -> Self {
        Self {
            reply: String::new(),
            mood: MoodJudgment::neutral(),
            is_crisis: false,
            suggested_intervention: String::new(),
            resources: Vec::new(),
            explain: String::new(),
        }
    }
}
