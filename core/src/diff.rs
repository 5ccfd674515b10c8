use crate::settings::{AgentSettings, SettingsField};

/// Semantic equality used for the dirty check. The prompt is compared trimmed,
/// so whitespace-only edits at either end are not a change.
pub fn settings_equal(a: &AgentSettings, b: &AgentSettings) -> bool {
    changed_fields(a, b).is_empty()
}

/// Fields that differ between `before` and `after`, in declaration order.
pub fn changed_fields(before: &AgentSettings, after: &AgentSettings) -> Vec<SettingsField> {
    SettingsField::ALL
        .into_iter()
        .filter(|field| !field_equal(before, after, *field))
        .collect()
}

fn field_equal(a: &AgentSettings, b: &AgentSettings, field: SettingsField) -> bool {
    match field {
        SettingsField::Language => a.language == b.language,
        SettingsField::VoiceId => a.voice_id == b.voice_id,
        SettingsField::Prompt => a.prompt.trim() == b.prompt.trim(),
        numeric => match (a.numeric(numeric), b.numeric(numeric)) {
            (Some(x), Some(y)) => x == y || (x.is_nan() && y.is_nan()),
            _ => true,
        },
    }
}
