//! Translation catalogs.
//!
//! A catalog file is a sequence of `<key>…</key><value>…</value>` pairs,
//! optionally wrapped in a root element. Anything between pairs is ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<key>\s*(.*?)\s*</key>\s*<value>(.*?)</value>").expect("valid entry pattern")
});

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("failed to read translations from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no translation for '{0}'")]
    MissingKey(String),
}

#[derive(Debug, Clone, Default)]
pub struct Translations {
    resource_id: String,
    entries: HashMap<String, String>,
}

impl Translations {
    /// Reads `<dir>/<resource_id>.xml`.
    pub fn load(dir: &Path, resource_id: &str) -> Result<Self, TranslationError> {
        let path = dir.join(format!("{resource_id}.xml"));
        let document = std::fs::read_to_string(&path).map_err(|source| TranslationError::Io {
            path: path.clone(),
            source,
        })?;
        let mut translations = Self::from_document(&document);
        translations.resource_id = resource_id.to_string();
        tracing::debug!(
            resource_id,
            entries = translations.entries.len(),
            "Loaded translations"
        );
        Ok(translations)
    }

    /// Parses a catalog held in memory. Later duplicates of a key win.
    pub fn from_document(document: &str) -> Self {
        let entries = ENTRY
            .captures_iter(document)
            .map(|caps| (unescape(&caps[1]), unescape(&caps[2])))
            .collect();
        Self {
            resource_id: String::new(),
            entries,
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn get(&self, key: &str) -> Result<&str, TranslationError> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| TranslationError::MissingKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
