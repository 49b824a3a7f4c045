use crate::error::{Result, WitError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Stored key holding the rendered text.
pub const CONTENT_KEY: &str = "content";
/// Stored key holding the markup language tag.
pub const MARKUP_KEY: &str = "markup";

/// Supported markup languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MarkupLanguage {
    #[default]
    PlainText,
    Markdown,
    JiraWiki,
}

impl MarkupLanguage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "PlainText",
            Self::Markdown => "Markdown",
            Self::JiraWiki => "JiraWiki",
        }
    }
}

impl fmt::Display for MarkupLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MarkupLanguage {
    type Err = WitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PlainText" => Ok(Self::PlainText),
            "Markdown" => Ok(Self::Markdown),
            "JiraWiki" => Ok(Self::JiraWiki),
            other => Err(WitError::validation(
                MARKUP_KEY,
                format!("unsupported markup language: {other}"),
            )),
        }
    }
}

/// Text content paired with the markup language it is written in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkupContent {
    pub content: String,
    pub markup: MarkupLanguage,
}

impl MarkupContent {
    #[must_use]
    pub fn new(content: impl Into<String>, markup: MarkupLanguage) -> Self {
        Self {
            content: content.into(),
            markup,
        }
    }

    #[must_use]
    pub fn plain(content: impl Into<String>) -> Self {
        Self::new(content, MarkupLanguage::PlainText)
    }

    /// Rebuild from the stored key/value map. A missing or empty markup tag
    /// falls back to plain text.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not a string or the markup tag is unsupported.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let content = match map.get(CONTENT_KEY) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => return Err(WitError::mismatch(other, "string", "non-string")),
        };
        let markup = match map.get(MARKUP_KEY) {
            None | Some(Value::Null) => MarkupLanguage::default(),
            Some(Value::String(tag)) if tag.is_empty() => MarkupLanguage::default(),
            Some(Value::String(tag)) => tag.parse()?,
            Some(other) => return Err(WitError::mismatch(other, "markup tag", "non-string")),
        };
        Ok(Self { content, markup })
    }

    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(CONTENT_KEY.to_string(), Value::String(self.content.clone()));
        map.insert(
            MARKUP_KEY.to_string(),
            Value::String(self.markup.as_str().to_string()),
        );
        map
    }
}
