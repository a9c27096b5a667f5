//! Community pulse: anonymous, aggregate-only mood data per region with a
//! cached AI-generated overlay. No raw user text is ever stored or prompted.

use crate::contract::extract_json_object;
use crate::gemini_service::ModelClient;
use crate::prompts::{pulse_overlay_user_prompt, PULSE_OVERLAY_SYSTEM};
use crate::shared::Message;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

/// Allowed theme chips. Raw text never enters the store; only these tags do.
pub const ALLOWED_THEMES: &[&str] = &[
    "exam",
    "sleep",
    "family",
    "peer pressure",
    "loneliness",
    "friends",
    "relationships",
    "stress",
    "social",
    "money",
    "health",
    "career",
];

/// Rolling window length for region aggregates.
const WINDOW_DAYS: i64 = 7;

/// Sub-window length for the trend comparison.
const TREND_WINDOW_DAYS: i64 = 3;

/// Deadband around zero for the trend delta.
const TREND_DEADBAND: f64 = 0.2;

/// SHA-256 hex digest of a session identifier, used to anonymize reports.
pub fn hash_session_id(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One anonymized mood event inside a region window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseEvent {
    pub ts: DateTime<Utc>,
    pub score: u8,
    pub themes: Vec<String>,
    pub sid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeCount {
    pub name: String,
    pub count: usize,
}

/// Derived aggregate for one region's rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub pulse_score: f64,
    pub trend: Trend,
    pub top_themes: Vec<ThemeCount>,
    pub counts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Low,
    Medium,
    High,
}

impl SafetyLevel {
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => SafetyLevel::High,
            "medium" => SafetyLevel::Medium,
            _ => SafetyLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseAction {
    pub id: String,
    pub title: String,
    pub description: String,
    pub time_estimate: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// AI-generated overlay over the numeric aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseOverlay {
    pub ai_summary: String,
    pub ai_actions: Vec<PulseAction>,
    pub safety: SafetyLevel,
}

/// The full summary payload: aggregate + overlay + cache marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseSummary {
    #[serde(flatten)]
    pub summary: RegionSummary,
    #[serde(flatten)]
    pub overlay: PulseOverlay,
    pub cached: bool,
}

#[derive(Debug, Clone)]
struct CachedSummary {
    payload: PulseSummary,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RegionState {
    events: Vec<PulseEvent>,
    cache: Option<CachedSummary>,
}

/// Maintains rolling per-region aggregates and a TTL-cached AI overlay.
/// Shared mutable state is guarded per region by the map's entry locks, so
/// `report_event` and `summary` may race safely across callers.
pub struct PulseAggregator {
    regions: DashMap<String, RegionState>,
    client: Arc<dyn ModelClient>,
    ttl: Duration,
}

fn region_key(region: &str) -> String {
    let key = region.trim();
    if key.is_empty() {
        "default".to_string()
    } else {
        key.to_string()
    }
}

fn clamp_score(score: i64) -> u8 {
    score.clamp(1, 10) as u8
}

/// Filter to the allow-list, lowercase, dedup order-preserving, cap 5.
fn sanitize_themes(themes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in themes {
        let t = t.trim().to_lowercase();
        if ALLOWED_THEMES.contains(&t.as_str()) && !out.contains(&t) {
            out.push(t);
            if out.len() >= 5 {
                break;
            }
        }
    }
    out
}

impl PulseAggregator {
    pub fn new(client: Arc<dyn ModelClient>, ttl_secs: u64) -> Self {
        Self {
            regions: DashMap::new(),
            client,
            ttl: Duration::seconds(ttl_secs.max(1) as i64),
        }
    }

    /// Record one anonymized event: clamp the score, sanitize the themes,
    /// trim the region window, and invalidate the region's cached summary.
    pub fn report_event(&self, region: &str, score: i64, themes: &[String], sid_hash: &str) {
        self.report_event_at(region, score, themes, sid_hash, Utc::now());
    }

    fn report_event_at(
        &self,
        region: &str,
        score: i64,
        themes: &[String],
        sid_hash: &str,
        ts: DateTime<Utc>,
    ) {
        let key = region_key(region);
        let mut state = self.regions.entry(key).or_default();
        state.events.push(PulseEvent {
            ts,
            score: clamp_score(score),
            themes: sanitize_themes(themes),
            sid: sid_hash.to_string(),
        });
        let cutoff = ts - Duration::days(WINDOW_DAYS);
        state.events.retain(|e| e.ts >= cutoff);
        state.cache = None;
    }

    /// Record an anonymized thumbs vote on a suggested action. No raw text
    /// is kept; the vote goes to the telemetry log only.
    pub fn record_feedback(
        &self,
        region: &str,
        sid_hash: &str,
        suggestion_id: &str,
        value: i8,
    ) -> bool {
        if suggestion_id.trim().is_empty() || !(value == 1 || value == -1) {
            return false;
        }
        let sid_short: String = sid_hash.chars().take(10).collect();
        info!(
            region = %region_key(region),
            sid = %sid_short,
            suggestion = %suggestion_id,
            value,
            "pulse feedback"
        );
        true
    }

    /// Cached summary if fresh, else recompute the aggregate and request a
    /// new AI overlay (with the safe fallback on any failure).
    pub async fn summary(&self, region: &str) -> PulseSummary {
        self.summary_at(region, Utc::now()).await
    }

    async fn summary_at(&self, region: &str, now: DateTime<Utc>) -> PulseSummary {
        let key = region_key(region);

        // Cache check and event snapshot under the entry lock; the lock is
        // released before the overlay call awaits.
        let events: Vec<PulseEvent> = {
            let state = self.regions.entry(key.clone()).or_default();
            if let Some(cached) = &state.cache {
                if cached.expires_at > now {
                    let mut payload = cached.payload.clone();
                    payload.cached = true;
                    return payload;
                }
            }
            state.events.clone()
        };

        let summary = aggregate_region(&key, &events, now);
        let overlay = self.build_overlay(&summary).await;
        let payload = PulseSummary {
            summary,
            overlay,
            cached: false,
        };

        let mut state = self.regions.entry(key).or_default();
        state.cache = Some(CachedSummary {
            payload: payload.clone(),
            expires_at: now + self.ttl,
        });
        payload
    }

    async fn build_overlay(&self, summary: &RegionSummary) -> PulseOverlay {
        let themes: Vec<String> = summary.top_themes.iter().map(|t| t.name.clone()).collect();
        let prompt = pulse_overlay_user_prompt(
            &summary.region,
            summary.pulse_score,
            summary.trend.as_str(),
            &themes,
        );

        let raw = match self
            .client
            .generate(PULSE_OVERLAY_SYSTEM, &[Message::user(prompt)])
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "pulse overlay unavailable; using fallback");
                return fallback_overlay(summary);
            }
        };

        match parse_overlay(&raw) {
            Some(overlay) => overlay,
            None => {
                warn!("pulse overlay unparseable; using fallback");
                fallback_overlay(summary)
            }
        }
    }
}

/// Compute the numeric aggregate for a region window.
fn aggregate_region(region: &str, events: &[PulseEvent], now: DateTime<Utc>) -> RegionSummary {
    if events.is_empty() {
        return RegionSummary {
            region: region.to_string(),
            pulse_score: 0.0,
            trend: Trend::Flat,
            top_themes: Vec::new(),
            counts: 0,
        };
    }

    let sum: u64 = events.iter().map(|e| e.score as u64).sum();
    let avg = (sum as f64 / events.len() as f64 * 10.0).round() / 10.0;

    // Trend: mean of the last 3 days vs. the 3 days before them.
    let avg_for_window = |start_offset_days: i64| -> f64 {
        let start = now - Duration::days(start_offset_days);
        let end = start - Duration::days(TREND_WINDOW_DAYS);
        let scores: Vec<u64> = events
            .iter()
            .filter(|e| e.ts > end && e.ts <= start)
            .map(|e| e.score as u64)
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<u64>() as f64 / scores.len() as f64
        }
    };
    let recent = avg_for_window(0);
    let prev = avg_for_window(TREND_WINDOW_DAYS);
    let delta = recent - prev;
    let trend = if delta > TREND_DEADBAND {
        Trend::Up
    } else if delta < -TREND_DEADBAND {
        Trend::Down
    } else {
        Trend::Flat
    };

    // Top themes by frequency, ties broken alphabetically.
    let mut counts: Vec<ThemeCount> = Vec::new();
    for event in events {
        for theme in &event.themes {
            match counts.iter_mut().find(|c| c.name == *theme) {
                Some(c) => c.count += 1,
                None => counts.push(ThemeCount {
                    name: theme.clone(),
                    count: 1,
                }),
            }
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));
    counts.truncate(5);

    RegionSummary {
        region: region.to_string(),
        pulse_score: avg,
        trend,
        top_themes: counts,
        counts: events.len(),
    }
}

/// Validate the model's overlay JSON: 1-3 actions with defaulted ids and
/// length-capped fields, safety coerced into the allowed set.
fn parse_overlay(raw: &str) -> Option<PulseOverlay> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .ok()
        .or_else(|| extract_json_object(raw).and_then(|span| serde_json::from_str(span).ok()))?;
    let obj = value.as_object()?;

    let ai_summary = obj
        .get("ai_summary")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Community care ideas are ready.")
        .to_string();

    let mut actions: Vec<PulseAction> = Vec::new();
    if let Some(list) = obj.get("ai_actions").and_then(|v| v.as_array()) {
        for (i, a) in list.iter().take(3).enumerate() {
            let Some(a) = a.as_object() else { continue };
            let get = |k: &str| {
                a.get(k)
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_default()
            };
            actions.push(PulseAction {
                id: {
                    let id = get("id");
                    if id.trim().is_empty() {
                        format!("a{}", i + 1)
                    } else {
                        id
                    }
                },
                title: truncate(&get("title"), 60),
                description: truncate(&get("description"), 120),
                time_estimate: truncate(&get("time_estimate"), 8),
                kind: {
                    let kind = get("type");
                    if kind.trim().is_empty() {
                        "breathing".to_string()
                    } else {
                        kind
                    }
                },
            });
        }
    }
    if actions.is_empty() {
        actions.push(default_breathing_action());
    }

    let safety = SafetyLevel::parse(obj.get("safety").and_then(|v| v.as_str()).unwrap_or("low"));

    Some(PulseOverlay {
        ai_summary,
        ai_actions: actions,
        safety,
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.trim().chars().take(max_chars).collect()
}

fn default_breathing_action() -> PulseAction {
    PulseAction {
        id: "a1".to_string(),
        title: "60s box breathing".to_string(),
        description: "Inhale 4, hold 4, exhale 4, hold 4.".to_string(),
        time_estimate: "1".to_string(),
        kind: "breathing".to_string(),
    }
}

/// Hardcoded safe overlay used when the model call or its JSON parsing
/// fails. Safety escalates when the aggregate itself is low or declining.
fn fallback_overlay(summary: &RegionSummary) -> PulseOverlay {
    let safety = if summary.counts > 0
        && (summary.pulse_score <= 3.0 || summary.trend == Trend::Down)
    {
        SafetyLevel::Medium
    } else {
        SafetyLevel::Low
    };
    PulseOverlay {
        ai_summary: "Community pulse available. Try a 60s breathing break and a short study sprint."
            .to_string(),
        ai_actions: vec![
            default_breathing_action(),
            PulseAction {
                id: "a2".to_string(),
                title: "25m study sprint".to_string(),
                description: "Pick one topic; 25 minutes focus.".to_string(),
                time_estimate: "25".to_string(),
                kind: "pomodoro".to_string(),
            },
            PulseAction {
                id: "a3".to_string(),
                title: "Text a friend".to_string(),
                description: "Send a quick check-in message.".to_string(),
                time_estimate: "3".to_string(),
                kind: "social".to_string(),
            },
        ],
        safety,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini_service::ModelError;

    struct FailingClient;

    #[async_trait::async_trait]
    impl ModelClient for FailingClient {
        async fn generate(&self, _system: &str, _turns: &[Message]) -> Result<String, ModelError> {
            Err(ModelError::NotConfigured)
        }
    }

    struct OverlayClient;

    #[async_trait::async_trait]
    impl ModelClient for OverlayClient {
        async fn generate(&self, _system: &str, _turns: &[Message]) -> Result<String, ModelError> {
            Ok(r#"{"ai_summary":"Mood is steady this week.","ai_actions":[{"id":"x1","title":"Evening walk","description":"20 minutes outside.","time_estimate":"20","type":"movement"}],"safety":"low"}"#
                .to_string())
        }
    }

    fn aggregator(client: Arc<dyn ModelClient>) -> PulseAggregator {
        PulseAggregator::new(client, 1800)
    }

    #[test]
    fn hash_session_id_is_stable_hex() {
        let h = hash_session_id("session-42");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_session_id("session-42"));
        assert_ne!(h, hash_session_id("session-43"));
    }

    #[test]
    fn themes_are_filtered_deduped_and_capped() {
        let raw: Vec<String> = [
            "Exam", "exam", "astrology", "sleep", "family", "stress", "money", "career",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let clean = sanitize_themes(&raw);
        assert_eq!(clean, vec!["exam", "sleep", "family", "stress", "money"]);
    }

    #[test]
    fn trend_down_across_adjacent_windows() {
        let agg = aggregator(Arc::new(FailingClient));
        let now = Utc::now();
        for _ in 0..10 {
            agg.report_event_at("pune", 8, &[], "h1", now - Duration::days(4));
        }
        for _ in 0..10 {
            agg.report_event_at("pune", 2, &[], "h2", now - Duration::days(1));
        }

        let events = agg.regions.get("pune").unwrap().events.clone();
        let summary = aggregate_region("pune", &events, now);
        assert_eq!(summary.trend, Trend::Down);
        assert_eq!(summary.counts, 20);
        assert!((summary.pulse_score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn window_trims_events_older_than_seven_days() {
        let agg = aggregator(Arc::new(FailingClient));
        let now = Utc::now();
        agg.report_event_at("delhi", 5, &[], "h1", now - Duration::days(10));
        agg.report_event_at("delhi", 5, &[], "h2", now);
        assert_eq!(agg.regions.get("delhi").unwrap().events.len(), 1);
    }

    #[test]
    fn top_themes_break_ties_alphabetically() {
        let now = Utc::now();
        let mk = |themes: &[&str]| PulseEvent {
            ts: now,
            score: 5,
            themes: themes.iter().map(|s| s.to_string()).collect(),
            sid: "h".to_string(),
        };
        let events = vec![mk(&["sleep", "exam"]), mk(&["exam", "family", "sleep"]), mk(&["family"])];
        let summary = aggregate_region("default", &events, now);
        assert_eq!(
            summary
                .top_themes
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>(),
            vec!["exam", "family", "sleep"]
        );
    }

    #[tokio::test]
    async fn summary_uses_fallback_overlay_and_caches() {
        let agg = aggregator(Arc::new(FailingClient));
        agg.report_event("mumbai", 2, &["stress".to_string()], "h1");

        let first = agg.summary("mumbai").await;
        assert!(!first.cached);
        assert_eq!(first.overlay.safety, SafetyLevel::Medium);
        assert!(!first.overlay.ai_actions.is_empty());

        let second = agg.summary("mumbai").await;
        assert!(second.cached);

        // a new event invalidates the cache
        agg.report_event("mumbai", 9, &[], "h2");
        let third = agg.summary("mumbai").await;
        assert!(!third.cached);
    }

    #[tokio::test]
    async fn model_overlay_is_validated_and_used() {
        let agg = aggregator(Arc::new(OverlayClient));
        agg.report_event("goa", 7, &["friends".to_string()], "h1");
        let s = agg.summary("goa").await;
        assert_eq!(s.overlay.ai_summary, "Mood is steady this week.");
        assert_eq!(s.overlay.ai_actions.len(), 1);
        assert_eq!(s.overlay.ai_actions[0].kind, "movement");
        assert_eq!(s.overlay.safety, SafetyLevel::Low);
    }

    #[test]
    fn empty_region_summary_is_flat_zero() {
        let summary = aggregate_region("nowhere", &[], Utc::now());
        assert_eq!(summary.pulse_score, 0.0);
        assert_eq!(summary.trend, Trend::Flat);
        assert_eq!(summary.counts, 0);
    }

    #[test]
    fn feedback_requires_valid_vote() {
        let agg = aggregator(Arc::new(FailingClient));
        assert!(agg.record_feedback("pune", "hash", "a1", 1));
        assert!(agg.record_feedback("pune", "hash", "a1", -1));
        assert!(!agg.record_feedback("pune", "hash", "a1", 0));
        assert!(!agg.record_feedback("pune", "hash", "", 1));
    }
}
