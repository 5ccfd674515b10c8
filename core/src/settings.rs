use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Voice-agent configuration owned by one user.
///
/// This is a plain value: the session keeps a baseline and a working copy and
/// every hand-over between them is a `clone()`, never a shared reference.
/// Missing fields in a stored or submitted document fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct AgentSettings {
    /// Speech rate multiplier, 0.5 - 2.0
    #[schema(example = 1.0)]
    pub voice_speed: f64,
    /// How quickly the agent answers, 0 - 1
    #[schema(example = 1.0)]
    pub responsiveness: f64,
    /// How easily the caller can interrupt the agent, 0 - 1
    #[schema(example = 1.0)]
    pub interruption_sensitivity: f64,
    /// Voice variability, 0 - 2
    #[schema(example = 1.0)]
    pub voice_temperature: f64,
    /// Output volume, 0 - 2
    #[schema(example = 1.0)]
    pub volume: f64,
    /// Language code from the supported catalog (e.g. "en-US")
    #[schema(example = "en-US")]
    pub language: String,
    /// Voice identifier from the supported catalog (e.g. "11labs-Adrian")
    #[schema(example = "11labs-Adrian")]
    pub voice_id: String,
    /// Behavior prompt; 10 - 2000 characters once trimmed
    pub prompt: String,
}

pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_VOICE_ID: &str = "11labs-Adrian";

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            voice_speed: 1.0,
            responsiveness: 1.0,
            interruption_sensitivity: 1.0,
            voice_temperature: 1.0,
            volume: 1.0,
            language: DEFAULT_LANGUAGE.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            prompt: String::new(),
        }
    }
}

/// Closed interval plus the slider granularity for a numeric setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct NumericConstraint {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl NumericConstraint {
    /// NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Round `value` onto the step grid anchored at `min`. Out-of-range input is
    /// kept out of range so the validator still sees it.
    pub fn snap(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let steps = ((value - self.min) / self.step).round();
        // Steps are multiples of 0.05, two decimals drop the float residue.
        ((self.min + steps * self.step) * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PromptConstraint {
    pub min_len: usize,
    pub max_len: usize,
}

pub const VOICE_SPEED: NumericConstraint = NumericConstraint {
    min: 0.5,
    max: 2.0,
    step: 0.05,
};
pub const RESPONSIVENESS: NumericConstraint = NumericConstraint {
    min: 0.0,
    max: 1.0,
    step: 0.05,
};
pub const INTERRUPTION_SENSITIVITY: NumericConstraint = NumericConstraint {
    min: 0.0,
    max: 1.0,
    step: 0.05,
};
pub const VOICE_TEMPERATURE: NumericConstraint = NumericConstraint {
    min: 0.0,
    max: 2.0,
    step: 0.1,
};
pub const VOLUME: NumericConstraint = NumericConstraint {
    min: 0.0,
    max: 2.0,
    step: 0.1,
};
pub const PROMPT: PromptConstraint = PromptConstraint {
    min_len: 10,
    max_len: 2000,
};

/// The eight user-editable settings, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingsField {
    VoiceSpeed,
    Responsiveness,
    InterruptionSensitivity,
    VoiceTemperature,
    Volume,
    Language,
    VoiceId,
    Prompt,
}

impl SettingsField {
    pub const ALL: [SettingsField; 8] = [
        SettingsField::VoiceSpeed,
        SettingsField::Responsiveness,
        SettingsField::InterruptionSensitivity,
        SettingsField::VoiceTemperature,
        SettingsField::Volume,
        SettingsField::Language,
        SettingsField::VoiceId,
        SettingsField::Prompt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingsField::VoiceSpeed => "voice_speed",
            SettingsField::Responsiveness => "responsiveness",
            SettingsField::InterruptionSensitivity => "interruption_sensitivity",
            SettingsField::VoiceTemperature => "voice_temperature",
            SettingsField::Volume => "volume",
            SettingsField::Language => "language",
            SettingsField::VoiceId => "voice_id",
            SettingsField::Prompt => "prompt",
        }
    }

    /// Human label used at the start of messages ("Voice speed must be ...").
    pub fn label(self) -> &'static str {
        match self {
            SettingsField::VoiceSpeed => "Voice speed",
            SettingsField::Responsiveness => "Responsiveness",
            SettingsField::InterruptionSensitivity => "Interruption sensitivity",
            SettingsField::VoiceTemperature => "Voice temperature",
            SettingsField::Volume => "Volume",
            SettingsField::Language => "Language",
            SettingsField::VoiceId => "Voice",
            SettingsField::Prompt => "Prompt",
        }
    }

    pub fn constraint(self) -> Option<NumericConstraint> {
        match self {
            SettingsField::VoiceSpeed => Some(VOICE_SPEED),
            SettingsField::Responsiveness => Some(RESPONSIVENESS),
            SettingsField::InterruptionSensitivity => Some(INTERRUPTION_SENSITIVITY),
            SettingsField::VoiceTemperature => Some(VOICE_TEMPERATURE),
            SettingsField::Volume => Some(VOLUME),
            SettingsField::Language | SettingsField::VoiceId | SettingsField::Prompt => None,
        }
    }

    /// Bounds as they are spelled in user-facing messages.
    pub fn range_text(self) -> Option<&'static str> {
        match self {
            SettingsField::VoiceSpeed => Some("0.5 and 2.0"),
            SettingsField::Responsiveness | SettingsField::InterruptionSensitivity => {
                Some("0 and 1")
            }
            SettingsField::VoiceTemperature | SettingsField::Volume => Some("0 and 2"),
            SettingsField::Language | SettingsField::VoiceId | SettingsField::Prompt => None,
        }
    }
}

impl fmt::Display for SettingsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingsField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Where an error is displayed: next to a setting, or one of the upstream-only
/// sentinels that have no input of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    Setting(SettingsField),
    Auth,
    Agent,
    Llm,
}

impl FieldKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Setting(field) => field.as_str(),
            FieldKey::Auth => "auth",
            FieldKey::Agent => "agent",
            FieldKey::Llm => "llm",
        }
    }
}

impl From<SettingsField> for FieldKey {
    fn from(field: SettingsField) -> Self {
        FieldKey::Setting(field)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(FieldKey::Auth),
            "agent" => Ok(FieldKey::Agent),
            "llm" => Ok(FieldKey::Llm),
            other => other.parse::<SettingsField>().map(FieldKey::Setting),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown settings field '{0}'")]
pub struct UnknownField(pub String);

/// A single-field change to the working snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEdit {
    VoiceSpeed(f64),
    Responsiveness(f64),
    InterruptionSensitivity(f64),
    VoiceTemperature(f64),
    Volume(f64),
    Language(String),
    VoiceId(String),
    Prompt(String),
}

impl SettingsEdit {
    pub fn field(&self) -> SettingsField {
        match self {
            SettingsEdit::VoiceSpeed(_) => SettingsField::VoiceSpeed,
            SettingsEdit::Responsiveness(_) => SettingsField::Responsiveness,
            SettingsEdit::InterruptionSensitivity(_) => SettingsField::InterruptionSensitivity,
            SettingsEdit::VoiceTemperature(_) => SettingsField::VoiceTemperature,
            SettingsEdit::Volume(_) => SettingsField::Volume,
            SettingsEdit::Language(_) => SettingsField::Language,
            SettingsEdit::VoiceId(_) => SettingsField::VoiceId,
            SettingsEdit::Prompt(_) => SettingsField::Prompt,
        }
    }
}

impl AgentSettings {
    /// Apply one edit. Numeric values are snapped to their step grid.
    pub fn apply(&mut self, edit: SettingsEdit) {
        match edit {
            SettingsEdit::VoiceSpeed(v) => self.voice_speed = VOICE_SPEED.snap(v),
            SettingsEdit::Responsiveness(v) => self.responsiveness = RESPONSIVENESS.snap(v),
            SettingsEdit::InterruptionSensitivity(v) => {
                self.interruption_sensitivity = INTERRUPTION_SENSITIVITY.snap(v)
            }
            SettingsEdit::VoiceTemperature(v) => {
                self.voice_temperature = VOICE_TEMPERATURE.snap(v)
            }
            SettingsEdit::Volume(v) => self.volume = VOLUME.snap(v),
            SettingsEdit::Language(code) => self.language = code,
            SettingsEdit::VoiceId(id) => self.voice_id = id,
            SettingsEdit::Prompt(text) => self.prompt = text,
        }
    }

    pub fn numeric(&self, field: SettingsField) -> Option<f64> {
        match field {
            SettingsField::VoiceSpeed => Some(self.voice_speed),
            SettingsField::Responsiveness => Some(self.responsiveness),
            SettingsField::InterruptionSensitivity => Some(self.interruption_sensitivity),
            SettingsField::VoiceTemperature => Some(self.voice_temperature),
            SettingsField::Volume => Some(self.volume),
            SettingsField::Language | SettingsField::VoiceId | SettingsField::Prompt => None,
        }
    }

    /// Display value of a field, used for diffs and logs.
    pub fn display_value(&self, field: SettingsField) -> String {
        match field {
            SettingsField::Language => self.language.clone(),
            SettingsField::VoiceId => self.voice_id.clone(),
            SettingsField::Prompt => self.prompt.clone(),
            numeric => self
                .numeric(numeric)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }
    }
}

/// An option offered by the settings form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub value: &'static str,
    pub label: &'static str,
}

pub const LANGUAGES: &[CatalogEntry] = &[
    CatalogEntry { value: "en-US", label: "English (US)" },
    CatalogEntry { value: "en-GB", label: "English (UK)" },
    CatalogEntry { value: "es-ES", label: "Spanish (Spain)" },
    CatalogEntry { value: "es-MX", label: "Spanish (Mexico)" },
    CatalogEntry { value: "fr-FR", label: "French" },
    CatalogEntry { value: "de-DE", label: "German" },
    CatalogEntry { value: "it-IT", label: "Italian" },
    CatalogEntry { value: "pt-BR", label: "Portuguese (Brazil)" },
    CatalogEntry { value: "ja-JP", label: "Japanese" },
    CatalogEntry { value: "zh-CN", label: "Chinese (Simplified)" },
    CatalogEntry { value: "ko-KR", label: "Korean" },
    CatalogEntry { value: "ar-SA", label: "Arabic" },
    CatalogEntry { value: "hi-IN", label: "Hindi" },
    CatalogEntry { value: "ru-RU", label: "Russian" },
    CatalogEntry { value: "multilingual", label: "Multilingual" },
];

pub const VOICES: &[CatalogEntry] = &[
    CatalogEntry { value: "11labs-Adrian", label: "Adrian (Male, Authoritative)" },
    CatalogEntry { value: "11labs-Aria", label: "Aria (Female, Expressive)" },
    CatalogEntry { value: "11labs-Clyde", label: "Clyde (Male, Warm)" },
    CatalogEntry { value: "11labs-Emily", label: "Emily (Female, Calm)" },
    CatalogEntry { value: "11labs-Josh", label: "Josh (Male, Casual)" },
    CatalogEntry { value: "11labs-Rachel", label: "Rachel (Female, Professional)" },
    CatalogEntry { value: "11labs-Sam", label: "Sam (Male, Friendly)" },
];

pub fn is_supported_language(code: &str) -> bool {
    LANGUAGES.iter().any(|entry| entry.value == code)
}

pub fn is_supported_voice(voice_id: &str) -> bool {
    VOICES.iter().any(|entry| entry.value == voice_id)
}
