use crate::tokenizer::TokenizerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fetched page as it is stored and displayed. The URL is the unique key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// First prominent heading (`<h1>`).
    #[serde(default)]
    pub heading: Option<String>,
    /// Flattened visible text.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Document {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    /// Raw text of one field; absent optional fields read as empty.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Heading => self.heading.as_deref().unwrap_or(""),
            Field::Content => &self.content,
            Field::Keywords => self.keywords.as_deref().unwrap_or(""),
            Field::Description => self.description.as_deref().unwrap_or(""),
        }
    }

    /// Heading when present and non-blank, otherwise the title.
    pub fn display_title(&self) -> &str {
        match self.heading.as_deref().map(str::trim) {
            Some(h) if !h.is_empty() => h,
            _ => self.title.trim(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Heading,
    Title,
    Content,
    Keywords,
    Description,
}

impl Field {
    pub const ALL: [Field; 5] = [Field::Heading, Field::Title, Field::Content, Field::Keywords, Field::Description];

    pub fn name(self) -> &'static str {
        match self {
            Field::Heading => "heading",
            Field::Title => "title",
            Field::Content => "content",
            Field::Keywords => "keywords",
            Field::Description => "description",
        }
    }
}

/// Versioned ranking multipliers per field. Used for scoring only, never for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldWeights {
    pub version: u32,
    pub weights: BTreeMap<Field, f32>,
}

impl FieldWeights {
    /// Fields missing from the table weigh nothing.
    pub fn weight(&self, field: Field) -> f32 {
        self.weights.get(&field).copied().unwrap_or(0.0)
    }
}

impl Default for FieldWeights {
    fn default() -> Self {
        let weights = [
            (Field::Heading, 3.0),
            (Field::Title, 2.0),
            (Field::Content, 1.0),
            (Field::Keywords, 0.5),
            (Field::Description, 0.5),
        ]
        .into_iter()
        .collect();
        Self { version: 1, weights }
    }
}

/// Everything that must agree between index time and query time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub tokenizer: TokenizerConfig,
    pub weights: FieldWeights,
}
