//! Session title generation: extract a concise 3-5 word title from the first
//! message, used to rename sessions from "New Chat" to descriptive summaries.

/// System instruction for the title-generation model.
pub const TITLE_SYSTEM: &str = r#"You will create a meaningful, emotionally relevant chat session title based on the user's first message.
Rules:
- Create a title that captures the emotional core or main topic of the message
- 3 to 5 words maximum
- Title Case (Capitalize Important Words)
- Be specific and descriptive (avoid generic titles like 'Feeling Sad' or 'Daily Chat')
- If the message mentions a specific concern, include it (e.g., 'Exam Stress Management')
- No quotes, emojis, or trailing punctuation
- Return ONLY the title text, nothing else."#;

/// User prompt template: placeholder is replaced with the first message.
pub const TITLE_USER_TEMPLATE: &str = r#"User's first message:
{message}

Title:"#;

/// Build the user prompt with the given first message.
pub fn title_user_prompt(message: &str) -> String {
    TITLE_USER_TEMPLATE.replace("{message}", message)
}
