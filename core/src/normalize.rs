//! Translation of voice-agent provider error payloads into field-level errors.
//!
//! The provider only returns free text, so classification is keyword based:
//! an ordered rule table is scanned and the first matching rule decides the
//! field and the message. A miss degrades to the raw text with no field.
//! New phrasings are handled by adding rows to [`RULES`], not by new branches.

use serde_json::Value;

use crate::settings::{self, AgentSettings, FieldKey, SettingsField};
use crate::sync::ProviderResource;

pub const GENERIC_FAILURE: &str = "Failed to update agent configuration";
pub const PROMPT_UPDATE_FAILURE: &str = "Failed to update the agent prompt";

/// Substrings that point at the voice selection.
const VOICE_TOKENS: &[&str] = &["voice", "11labs", "voice_id", "not found"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub message: String,
    pub field: Option<FieldKey>,
}

/// Inputs available to message templates.
struct Subject<'a> {
    raw: &'a str,
    settings: &'a AgentSettings,
}

type Template = fn(&Subject<'_>) -> String;

enum Match {
    /// Lower-cased text contains any of these.
    Any(&'static [&'static str]),
    /// Lower-cased text contains all of these.
    All(&'static [&'static str]),
    /// Lower-cased text contains any of these, or names a catalog voice as a
    /// whole word ("sam" but not "sample").
    Voice(&'static [&'static str]),
}

impl Match {
    fn matches(&self, lowered: &str) -> bool {
        match self {
            Match::Any(words) => words.iter().any(|word| lowered.contains(word)),
            Match::All(words) => words.iter().all(|word| lowered.contains(word)),
            Match::Voice(words) => {
                words.iter().any(|word| lowered.contains(word)) || names_catalog_voice(lowered)
            }
        }
    }
}

fn names_catalog_voice(lowered: &str) -> bool {
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| {
            settings::VOICES.iter().any(|voice| {
                voice
                    .value
                    .rsplit('-')
                    .next()
                    .is_some_and(|name| name.eq_ignore_ascii_case(word))
            })
        })
}

enum Outcome {
    Field(FieldKey, Template),
    /// Sub-table tried in order; `otherwise` produces a field-less message.
    Nested {
        rules: &'static [Rule],
        otherwise: Template,
    },
}

struct Rule {
    when: Match,
    outcome: Outcome,
}

const fn field(field: SettingsField, template: Template) -> Outcome {
    Outcome::Field(FieldKey::Setting(field), template)
}

fn out_of_range(subject: &Subject<'_>, field: SettingsField) -> String {
    let value = subject.settings.numeric(field).unwrap_or_default();
    format!(
        "{} value {value} is out of range. Must be between {}.",
        field.label(),
        field.range_text().unwrap_or_default()
    )
}

static VALIDATION_RULES: [Rule; 2] = [
    Rule {
        when: Match::Voice(&["voice_id", "voice", "11labs"]),
        outcome: field(SettingsField::VoiceId, |s| {
            format!(
                "Voice \"{}\" is not valid. Please select a different voice.",
                s.settings.voice_id
            )
        }),
    },
    Rule {
        when: Match::Any(&["language"]),
        outcome: field(SettingsField::Language, |s| {
            format!(
                "Language \"{}\" is not valid. Please select a different language.",
                s.settings.language
            )
        }),
    },
];

static RULES: [Rule; 12] = [
    Rule {
        when: Match::Voice(VOICE_TOKENS),
        outcome: field(SettingsField::VoiceId, |s| {
            format!(
                "Voice \"{}\" is not available. Please select a different voice.",
                s.settings.voice_id
            )
        }),
    },
    Rule {
        when: Match::Any(&["language", "locale"]),
        outcome: field(SettingsField::Language, |s| {
            format!(
                "Language \"{}\" is not supported. Please select a different language.",
                s.settings.language
            )
        }),
    },
    Rule {
        when: Match::Any(&["voice_speed", "speed"]),
        outcome: field(SettingsField::VoiceSpeed, |s| {
            out_of_range(s, SettingsField::VoiceSpeed)
        }),
    },
    Rule {
        when: Match::Any(&["responsiveness"]),
        outcome: field(SettingsField::Responsiveness, |s| {
            out_of_range(s, SettingsField::Responsiveness)
        }),
    },
    Rule {
        when: Match::Any(&["interruption_sensitivity"]),
        outcome: field(SettingsField::InterruptionSensitivity, |s| {
            out_of_range(s, SettingsField::InterruptionSensitivity)
        }),
    },
    Rule {
        when: Match::Any(&["voice_temperature", "temperature"]),
        outcome: field(SettingsField::VoiceTemperature, |s| {
            out_of_range(s, SettingsField::VoiceTemperature)
        }),
    },
    Rule {
        when: Match::Any(&["volume"]),
        outcome: field(SettingsField::Volume, |s| out_of_range(s, SettingsField::Volume)),
    },
    Rule {
        when: Match::Any(&["prompt", "instruction", "general_prompt"]),
        outcome: field(SettingsField::Prompt, |s| format!("Prompt error: {}", s.raw)),
    },
    Rule {
        when: Match::Any(&["unauthorized", "forbidden", "auth"]),
        outcome: Outcome::Field(FieldKey::Auth, |_| {
            "Authentication failed. Please check your API credentials.".to_string()
        }),
    },
    Rule {
        when: Match::All(&["agent", "not found"]),
        outcome: Outcome::Field(FieldKey::Agent, |_| {
            "Agent not found. Please check your Agent ID configuration.".to_string()
        }),
    },
    Rule {
        when: Match::All(&["llm", "not found"]),
        outcome: Outcome::Field(FieldKey::Llm, |_| {
            "LLM not found. Please check your LLM ID configuration.".to_string()
        }),
    },
    Rule {
        when: Match::Any(&["validation", "invalid"]),
        outcome: Outcome::Nested {
            rules: &VALIDATION_RULES,
            otherwise: |s| format!("Validation error: {}", s.raw),
        },
    },
];

fn resolve(rules: &[Rule], subject: &Subject<'_>, lowered: &str) -> Option<NormalizedError> {
    let rule = rules.iter().find(|rule| rule.when.matches(lowered))?;
    Some(match &rule.outcome {
        Outcome::Field(key, template) => NormalizedError {
            message: template(subject),
            field: Some(*key),
        },
        Outcome::Nested { rules, otherwise } => {
            resolve(rules, subject, lowered).unwrap_or_else(|| NormalizedError {
                message: otherwise(subject),
                field: None,
            })
        }
    })
}

/// Last attempt at attribution when no rule named a field.
fn guess_field(combined: &str) -> Option<FieldKey> {
    if combined.contains("voice") || combined.contains("11labs") || names_catalog_voice(combined) {
        Some(SettingsField::VoiceId.into())
    } else if combined.contains("language") {
        Some(SettingsField::Language.into())
    } else if combined.contains("prompt") || combined.contains("llm") {
        Some(SettingsField::Prompt.into())
    } else {
        None
    }
}

fn text<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

/// Map a raw provider error payload onto a user-facing message and field.
///
/// `settings` are the values that were submitted; they are interpolated into
/// messages so the user sees what was rejected.
pub fn normalize(payload: &Value, settings: &AgentSettings) -> NormalizedError {
    let message = text(payload, "message");
    let error = text(payload, "error");

    let mut normalized = match message.or(error) {
        Some(raw) => {
            let subject = Subject { raw, settings };
            resolve(&RULES, &subject, &raw.to_lowercase()).unwrap_or_else(|| NormalizedError {
                message: raw.to_string(),
                field: None,
            })
        }
        None => NormalizedError {
            message: GENERIC_FAILURE.to_string(),
            field: None,
        },
    };

    if normalized.field.is_none() {
        let combined = format!("{} {}", message.unwrap_or_default(), error.unwrap_or_default());
        normalized.field = guess_field(&combined.to_lowercase());
    }

    normalized
}

/// Like [`normalize`], but a failure of the LLM resource is always a prompt
/// problem whatever the text says.
pub fn normalize_for_resource(
    payload: &Value,
    settings: &AgentSettings,
    resource: ProviderResource,
) -> NormalizedError {
    match resource {
        ProviderResource::Agent => normalize(payload, settings),
        ProviderResource::Llm => NormalizedError {
            message: text(payload, "message")
                .or_else(|| text(payload, "error"))
                .map(|raw| format!("Prompt error: {raw}"))
                .unwrap_or_else(|| PROMPT_UPDATE_FAILURE.to_string()),
            field: Some(SettingsField::Prompt.into()),
        },
    }
}
