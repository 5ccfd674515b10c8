//! Local checks run before anything leaves the process.
//!
//! `validate` reports at most one violation: the checks run in a fixed order
//! and the first failure wins, so the user always fixes one thing at a time.

use crate::settings::{self, AgentSettings, SettingsField, PROMPT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: SettingsField,
    pub message: String,
}

impl Violation {
    fn new(field: SettingsField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Numeric checks, in reporting order.
const RANGE_CHECKS: [SettingsField; 5] = [
    SettingsField::VoiceSpeed,
    SettingsField::Responsiveness,
    SettingsField::InterruptionSensitivity,
    SettingsField::VoiceTemperature,
    SettingsField::Volume,
];

/// Prompt length is counted in characters, not bytes.
pub fn validate(settings: &AgentSettings) -> Option<Violation> {
    let trimmed_len = settings.prompt.trim().chars().count();
    if trimmed_len == 0 {
        return Some(Violation::new(SettingsField::Prompt, "Prompt is required"));
    }
    if trimmed_len < PROMPT.min_len {
        return Some(Violation::new(
            SettingsField::Prompt,
            format!("Prompt must be at least {} characters", PROMPT.min_len),
        ));
    }
    if settings.prompt.chars().count() > PROMPT.max_len {
        return Some(Violation::new(
            SettingsField::Prompt,
            format!("Prompt must be less than {} characters", PROMPT.max_len),
        ));
    }

    for field in RANGE_CHECKS {
        let (Some(value), Some(constraint), Some(bounds)) = (
            settings.numeric(field),
            field.constraint(),
            field.range_text(),
        ) else {
            continue;
        };
        if !constraint.contains(value) {
            return Some(Violation::new(
                field,
                format!("{} must be between {bounds}", field.label()),
            ));
        }
    }

    if settings.language.is_empty() {
        return Some(Violation::new(SettingsField::Language, "Language is required"));
    }
    if settings.voice_id.is_empty() {
        return Some(Violation::new(SettingsField::VoiceId, "Voice is required"));
    }

    None
}

/// Catalog membership for `language` and `voice_id`. Run after `validate`
/// on the server, where an unknown value would otherwise cost a provider call.
pub fn validate_catalog(settings: &AgentSettings) -> Option<Violation> {
    if !settings::is_supported_language(&settings.language) {
        return Some(Violation::new(
            SettingsField::Language,
            format!("Language \"{}\" is not supported", settings.language),
        ));
    }
    if !settings::is_supported_voice(&settings.voice_id) {
        return Some(Violation::new(
            SettingsField::VoiceId,
            format!("Voice \"{}\" is not available", settings.voice_id),
        ));
    }
    None
}

/// Save-button gate, independent of the dirty check.
pub fn can_submit(settings: &AgentSettings) -> bool {
    !settings.prompt.trim().is_empty() && settings.prompt.chars().count() <= PROMPT.max_len
}
