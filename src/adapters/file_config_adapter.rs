//! INI configuration backed by `configparser`.
//!
//! Section and key names are case-insensitive. Values are trimmed, and a
//! `;` or `#` after whitespace starts a trailing comment, so
//! `trace = out.csv ; optional` reads as `out.csv`.

use crate::domain::error::RuletraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use tracing::debug;

const INLINE_SOURCE: &str = "<inline>";

pub struct FileConfigAdapter {
    ini: Ini,
    source: String,
}

impl FileConfigAdapter {
    pub fn from_file(path: &Path) -> Result<Self, RuletraderError> {
        let source = path.display().to_string();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| RuletraderError::ConfigParse {
            file: source.clone(),
            reason,
        })?;
        debug!(file = %source, sections = ini.sections().len(), "config loaded");
        Ok(Self { ini, source })
    }

    pub fn from_string(content: &str) -> Result<Self, RuletraderError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| RuletraderError::ConfigParse {
                file: INLINE_SOURCE.to_string(),
                reason,
            })?;
        Ok(Self {
            ini,
            source: INLINE_SOURCE.to_string(),
        })
    }

    /// File the settings were read from, for messages.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn value(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|raw| strip_inline_comment(&raw).to_string())
    }
}

fn strip_inline_comment(value: &str) -> &str {
    let cut = value
        .char_indices()
        .find(|&(i, c)| (c == ';' || c == '#') && value[..i].ends_with(char::is_whitespace))
        .map_or(value.len(), |(i, _)| i);
    value[..cut].trim()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.value(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.value(section, key)
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(default)
    }
}
