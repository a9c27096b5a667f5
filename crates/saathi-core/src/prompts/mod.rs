//! Prompt templates: companion persona, crisis detection, pulse overlay,
//! and session title generation.

pub mod companion;
pub mod crisis;
pub mod pulse;
pub mod title;

pub use companion::{companion_system_instruction, COMPANION_FEW_SHOTS};
pub use crisis::{crisis_detection_prompt, CRISIS_DETECTION_SYSTEM};
pub use pulse::{pulse_overlay_user_prompt, PULSE_OVERLAY_SYSTEM};
pub use title::{title_user_prompt, TITLE_SYSTEM};
