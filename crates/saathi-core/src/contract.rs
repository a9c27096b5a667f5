//! Response contract: turn untyped model output into a well-formed
//! [`TurnResult`], repairing or defaulting every field independently.
//!
//! `normalize` is a total function: any input (valid JSON, partial JSON,
//! prose around JSON, non-object JSON, empty string) yields a usable result.
//! Parse failures are never surfaced to the end user.

use crate::shared::{MoodJudgment, MoodLabel, ResourceEntry, TurnResult};
use serde_json::Value;

/// Reply used when the raw output could not be parsed at all.
pub const FALLBACK_REPLY_UNPARSEABLE: &str =
    "Thanks for sharing - I hear you. Would you like a quick breathing exercise?";

/// Reply used when the parsed object is missing the `reply` field.
pub const FALLBACK_REPLY_MISSING: &str =
    "I'm not sure how to respond to that, but I'm here to listen.";

/// Enforces the conversational-turn output contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseContract {
    /// When true, mood scores are re-clamped into the label's canonical band
    /// after the [1, 10] clamp. Default OFF: the model's numeric judgment is
    /// trusted once in range.
    mood_normalize: bool,
}

impl ResponseContract {
    pub fn new(mood_normalize: bool) -> Self {
        Self { mood_normalize }
    }

    /// The all-default result returned when nothing can be recovered from the
    /// raw output.
    pub fn fallback(&self) -> TurnResult {
        TurnResult {
            reply: FALLBACK_REPLY_UNPARSEABLE.to_string(),
            mood: MoodJudgment::neutral(),
            is_crisis: false,
            suggested_intervention: String::new(),
            resources: Vec::new(),
            explain: String::new(),
        }
    }

    /// Normalize raw model output into a [`TurnResult`]. Total: never panics,
    /// never errors. Pure: no side effects, no IO.
    pub fn normalize(&self, raw: &str) -> TurnResult {
        let parsed: Option<Value> = serde_json::from_str(raw)
            .ok()
            .or_else(|| extract_json_object(raw).and_then(|span| serde_json::from_str(span).ok()));

        let obj = match parsed {
            Some(Value::Object(map)) => map,
            _ => return self.fallback(),
        };

        let reply = obj
            .get("reply")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_REPLY_MISSING)
            .to_string();

        let mood = self.normalize_mood(obj.get("mood"));
        let is_crisis = coerce_bool(obj.get("is_crisis"));

        let resources = obj
            .get("resources")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|v| v.is_object())
                    .filter_map(|v| serde_json::from_value::<ResourceEntry>(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let suggested_intervention = string_or_default(obj.get("suggested_intervention"));
        let explain = string_or_default(obj.get("explain"));

        TurnResult {
            reply,
            mood,
            is_crisis,
            suggested_intervention,
            resources,
            explain,
        }
    }

    /// Repair a mood value: missing/non-object -> neutral; missing label or
    /// score filled with the neutral default; score clamped into [1, 10];
    /// optional re-clamp into the label band.
    fn normalize_mood(&self, value: Option<&Value>) -> MoodJudgment {
        let map = match value {
            Some(Value::Object(map)) => map,
            _ => return MoodJudgment::neutral(),
        };

        let label = map
            .get("label")
            .and_then(Value::as_str)
            .map(MoodLabel::parse)
            .unwrap_or(MoodLabel::Neutral);

        let score = map
            .get("score")
            .map(coerce_score)
            .unwrap_or(5)
            .clamp(1, 10);

        let mut mood = MoodJudgment { label, score };
        if self.mood_normalize {
            mood.clamp_into_band();
        }
        mood
    }
}

/// Integer coercion for the mood score: numbers truncate, numeric strings
/// parse, anything else is neutral 5. Range clamping happens at the caller.
fn coerce_score(value: &Value) -> u8 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(|i| i.clamp(0, 255) as u8)
            .unwrap_or(5),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.clamp(0.0, 255.0) as u8).unwrap_or(5),
        _ => 5,
    }
}

/// Truthy coercion: real booleans pass through; the strings "true"/"True"
/// count as true; everything else is false.
fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn string_or_default(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Locate the first balanced top-level `{...}` span in raw text, respecting
/// string literals and escapes. Used to recover JSON wrapped in prose.
pub(crate) fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ResourceKind;

    fn contract() -> ResponseContract {
        ResponseContract::new(false)
    }

    #[test]
    fn not_json_at_all_yields_documented_fallback() {
        let out = contract().normalize("not json at all");
        assert_eq!(out, contract().fallback());
        assert_eq!(out.reply, FALLBACK_REPLY_UNPARSEABLE);
        assert_eq!(out.mood, MoodJudgment::neutral());
        assert!(!out.is_crisis);
        assert!(out.resources.is_empty());
    }

    #[test]
    fn json_wrapped_in_prose_is_recovered_and_clamped() {
        let raw = r#"Sorry, here's your answer: {"reply":"hi","mood":{"label":"happy","score":99}}"#;
        let out = contract().normalize(raw);
        assert_eq!(out.reply, "hi");
        assert_eq!(out.mood.score, 10);
        assert_eq!(out.mood.label, MoodLabel::Happy);
        assert!(!out.is_crisis);
        assert!(out.resources.is_empty());
    }

    #[test]
    fn non_object_json_treated_as_parse_failure() {
        assert_eq!(contract().normalize("[1, 2, 3]"), contract().fallback());
        assert_eq!(contract().normalize("\"just a string\""), contract().fallback());
        assert_eq!(contract().normalize("null"), contract().fallback());
        assert_eq!(contract().normalize(""), contract().fallback());
    }

    #[test]
    fn missing_fields_are_defaulted_independently() {
        let out = contract().normalize(r#"{"mood":{"score":3}}"#);
        assert_eq!(out.reply, FALLBACK_REPLY_MISSING);
        assert_eq!(out.mood.label, MoodLabel::Neutral);
        assert_eq!(out.mood.score, 3);
        assert_eq!(out.suggested_intervention, "");
        assert_eq!(out.explain, "");
    }

    #[test]
    fn truthy_string_crisis_is_coerced() {
        let out = contract().normalize(r#"{"reply":"x","is_crisis":"True"}"#);
        assert!(out.is_crisis);
        let out = contract().normalize(r#"{"reply":"x","is_crisis":"yes"}"#);
        assert!(!out.is_crisis);
        let out = contract().normalize(r#"{"reply":"x","is_crisis":1}"#);
        assert!(!out.is_crisis);
    }

    #[test]
    fn non_numeric_score_defaults_to_neutral_five() {
        let out = contract().normalize(r#"{"mood":{"label":"sad","score":"lots"}}"#);
        assert_eq!(out.mood.score, 5);
        assert_eq!(out.mood.label, MoodLabel::Sad);
    }

    #[test]
    fn band_normalization_only_when_enabled() {
        let raw = r#"{"mood":{"label":"distressed","score":7}}"#;
        let trusted = ResponseContract::new(false).normalize(raw);
        assert_eq!(trusted.mood.score, 7);

        let normalized = ResponseContract::new(true).normalize(raw);
        assert_eq!(normalized.mood.score, 2);
    }

    #[test]
    fn resources_deserialized_leniently() {
        let raw = r#"{"reply":"x","resources":[
            {"title":"KIRAN","contact":"tel:18005990019","type":"helpline"},
            {"name":"Legacy","type":"unheard-of"},
            "not an object",
            42
        ]}"#;
        let out = contract().normalize(raw);
        assert_eq!(out.resources.len(), 2);
        assert_eq!(out.resources[0].kind, ResourceKind::Helpline);
        assert_eq!(out.resources[1].title, "Legacy");
        assert_eq!(out.resources[1].kind, ResourceKind::Other);
    }

    #[test]
    fn normalize_is_idempotent_on_well_formed_input() {
        let raw = r#"{"reply":"hi there","mood":{"label":"calm","score":6},"is_crisis":false,"suggested_intervention":"self_help_breathing","resources":[{"title":"iCALL","contact":"tel:9152987821","type":"counselling"}],"explain":"steady mood"}"#;
        let once = contract().normalize(raw);
        let again = contract().normalize(&serde_json::to_string(&once).unwrap());
        assert_eq!(once, again);
    }

    #[test]
    fn extract_json_object_handles_braces_in_strings() {
        let raw = r#"prefix {"a":"b } c","n":{"x":1}} suffix"#;
        let span = extract_json_object(raw).unwrap();
        let v: serde_json::Value = serde_json::from_str(span).unwrap();
        assert_eq!(v["a"], "b } c");
        assert_eq!(v["n"]["x"], 1);
        assert!(extract_json_object("no braces here").is_none());
        assert!(extract_json_object("{unclosed").is_none());
    }
}
