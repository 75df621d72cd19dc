//! Catalog data model: skills and their categories.

use serde::{Deserialize, Serialize};

/// A catalog entry: a named, server-hosted capability that accepts a prompt
/// and produces generated content.
///
/// Immutable once loaded; the catalog is replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Unique identifier, used to address the skill endpoint.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// What the skill does.
    pub description: String,
    /// Enum-like category string (e.g. `"code-generation"`).
    pub category: String,
    /// Ordered list of short tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Skill {
    /// Create a skill with no tags.
    #[must_use]
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: description.into(),
            category: category.into(),
            tags: Vec::new(),
        }
    }

    /// Builder-style tag attachment.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// A derived category aggregate. Never independently mutated; recomputed
/// from the skill list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category identifier, matching `Skill::category`.
    pub id: String,
    /// Human-readable label derived from the identifier.
    pub label: String,
    /// Number of skills in this category.
    pub count: usize,
}

impl Category {
    /// Derive a display label from a category identifier.
    ///
    /// `"code-generation"` becomes `"Code Generation"`.
    #[must_use]
    pub fn label_for(id: &str) -> String {
        id.split(['-', '_'])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
