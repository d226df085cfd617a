//! API key selection.
//!
//! A generation can only start once a key is selected. Keys come from, in
//! order: the `--api-key` flag, the `VEO_API_KEY` / `GEMINI_API_KEY`
//! environment variables, the config file, and finally an interactive prompt.
//! A billing or permission failure clears the selection so the user has to
//! pick a different key.

use std::fmt;
use std::io::{BufRead, Write};

use crate::veo::{VeoError, API_KEY_ENV, FALLBACK_API_KEY_ENV};

/// An API key. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, VeoError> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(VeoError::MissingApiKey);
        }
        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Key with everything but the last four characters hidden.
    pub fn redacted(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.redacted())
    }
}

/// Where the selected key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Flag,
    Environment,
    ConfigFile,
    Prompt,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            KeySource::Flag => "--api-key flag",
            KeySource::Environment => "environment",
            KeySource::ConfigFile => "config file",
            KeySource::Prompt => "interactive prompt",
        };
        f.write_str(label)
    }
}

/// The currently selected key, if any.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    selected: Option<(ApiKey, KeySource)>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn selected(key: ApiKey, source: KeySource) -> Self {
        Self {
            selected: Some((key, source)),
        }
    }

    /// Resolve the key from the flag, the process environment and the config file.
    pub fn resolve(flag: Option<String>, config_key: Option<String>) -> Self {
        Self::resolve_with(flag, |name| std::env::var(name).ok(), config_key)
    }

    /// Like [`resolve`](Self::resolve) with an injectable environment lookup.
    pub fn resolve_with<F>(flag: Option<String>, env: F, config_key: Option<String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let candidates = [
            (flag, KeySource::Flag),
            (env(API_KEY_ENV), KeySource::Environment),
            (env(FALLBACK_API_KEY_ENV), KeySource::Environment),
            (config_key, KeySource::ConfigFile),
        ];

        for (candidate, source) in candidates {
            if let Some(key) = candidate.and_then(|k| ApiKey::new(k).ok()) {
                log::debug!("Using API key from {}", source);
                return Self::selected(key, source);
            }
        }

        Self::none()
    }

    pub fn select(&mut self, key: ApiKey, source: KeySource) {
        log::info!("API key selected from {}", source);
        self.selected = Some((key, source));
    }

    /// Clear the selection after a billing or permission failure.
    pub fn reset(&mut self) {
        if let Some((_, source)) = self.selected.take() {
            log::warn!("Cleared API key selected from {}", source);
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected.is_some()
    }

    pub fn key(&self) -> Option<&ApiKey> {
        self.selected.as_ref().map(|(key, _)| key)
    }

    pub fn source(&self) -> Option<KeySource> {
        self.selected.as_ref().map(|(_, source)| *source)
    }

    /// The selected key, or `NoCredentialSelected`.
    pub fn require(&self) -> Result<&ApiKey, VeoError> {
        self.key().ok_or(VeoError::NoCredentialSelected)
    }
}

/// Ask for an API key on `output` and read one line from `input`.
///
/// Returns `Ok(None)` when the user enters nothing or input is closed.
pub fn prompt_for_key<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
) -> std::io::Result<Option<ApiKey>> {
    write!(
        output,
        "Enter an API key from a billing-enabled Google Cloud project (leave empty to cancel): "
    )?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(ApiKey::new(line).ok())
}
