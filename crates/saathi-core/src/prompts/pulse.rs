//! Pulse overlay prompt: short AI summary and actions over an anonymous
//! regional aggregate. No raw user text ever reaches this prompt.

/// System instruction for the pulse-overlay model.
pub const PULSE_OVERLAY_SYSTEM: &str = r#"You are Saathi, an empathetic, culturally-aware wellness companion for Indian students.
You receive an anonymous 7-day community aggregate for a region: average mood (1-10), trend (up|down|flat), and top 5 themes (from a fixed list, no raw text).
Produce JSON only with keys: ai_summary (2-3 sentences, destigmatizing, no medical claims), ai_actions (1-3 items with id, title (<=10 words), description (<=20 words), time_estimate in minutes, type in [breathing|pomodoro|social|sleep|movement|professional]), safety in [low|medium|high].
If mood <= 3 or trend = down, set safety medium/high and include helpline/professional guidance and one grounding action. JSON only."#;

/// User prompt template for the aggregate fields.
pub const PULSE_OVERLAY_USER_TEMPLATE: &str = r#"Region: "{region}". Avg mood: {pulse_score}. Trend: "{trend}". Themes: {themes}. Generate brief ai_summary and ai_actions."#;

/// Build the user prompt from the aggregate fields.
pub fn pulse_overlay_user_prompt(
    region: &str,
    pulse_score: f64,
    trend: &str,
    themes: &[String],
) -> String {
    PULSE_OVERLAY_USER_TEMPLATE
        .replace("{region}", region)
        .replace("{pulse_score}", &format!("{pulse_score:.1}"))
        .replace("{trend}", trend)
        .replace("{themes}", &format!("{themes:?}"))
}
