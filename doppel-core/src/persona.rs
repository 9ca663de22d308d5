//! Persona profiles learned from historical chat exports.
//!
//! A profile is built once by a learning pass over an exported chat log,
//! persisted as TOML, and read-only for the life of the process. The broker
//! uses it to bias prompt construction toward the persona's voice.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Emoji range sampled by the learning pass (Emoticons block).
const EMOJI_RANGE: std::ops::RangeInclusive<char> = '\u{1F600}'..='\u{1F64F}';

/// A style profile for one person, learned from their chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// Name the persona goes by in chat exports and prompts.
    pub display_name: String,
    /// Free-form style tag (e.g. "casual").
    #[serde(default = "default_style_tag")]
    pub style_tag: String,
    /// Messages attributed to the persona, in export order.
    #[serde(default)]
    pub common_phrases: Vec<String>,
    /// Emoji usage counts, keyed by the emoji itself.
    #[serde(default)]
    pub emoji_frequency: BTreeMap<String, u32>,
}

fn default_style_tag() -> String {
    "casual".to_string()
}

/// Errors when loading or saving a persona profile
#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No messages for '{0}' found in the export")]
    NoMessages(String),
}

impl PersonaProfile {
    /// Create an empty profile for `display_name`.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            style_tag: default_style_tag(),
            common_phrases: Vec::new(),
            emoji_frequency: BTreeMap::new(),
        }
    }

    /// Run the learning pass over an exported chat log.
    ///
    /// Lines are expected in the common `Name: message` export format; only
    /// lines attributed to `display_name` contribute. Phrase and emoji
    /// counts only grow during the pass.
    pub fn learn_from_export(
        display_name: impl Into<String>,
        export: &str,
    ) -> Result<Self, PersonaError> {
        let mut profile = Self::new(display_name);
        for line in export.lines() {
            let Some((speaker, message)) = line.split_once(": ") else {
                continue;
            };
            // Export formats prefix the speaker with timestamps or dashes;
            // match on the trailing name token.
            let name_token = speaker.split_whitespace().next_back().unwrap_or("");
            if name_token != profile.display_name {
                continue;
            }
            let message = message.trim();
            if message.is_empty() {
                continue;
            }
            profile.common_phrases.push(message.to_string());
            for ch in message.chars().filter(|c| EMOJI_RANGE.contains(c)) {
                *profile.emoji_frequency.entry(ch.to_string()).or_insert(0) += 1;
            }
        }

        if profile.common_phrases.is_empty() {
            return Err(PersonaError::NoMessages(profile.display_name));
        }
        Ok(profile)
    }

    /// Up to `limit` representative phrases, favoring short ones that read
    /// like habitual turns of phrase rather than one-off essays.
    pub fn representative_phrases(&self, limit: usize) -> Vec<&str> {
        let mut phrases: Vec<&str> = self
            .common_phrases
            .iter()
            .map(|s| s.as_str())
            .filter(|s| s.chars().count() <= 80)
            .collect();
        phrases.sort_by_key(|s| s.len());
        phrases.dedup();
        phrases.truncate(limit);
        phrases
    }

    /// Up to `limit` most-used emoji, most frequent first.
    pub fn top_emoji(&self, limit: usize) -> Vec<&str> {
        let mut entries: Vec<(&String, &u32)> = self.emoji_frequency.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        entries.into_iter().take(limit).map(|(e, _)| e.as_str()).collect()
    }

    /// Load a frozen profile from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PersonaError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Persist the profile as TOML.
    pub fn save(&self, path: &Path) -> Result<(), PersonaError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
