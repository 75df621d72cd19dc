//! In-memory skill catalog.

use std::{collections::BTreeMap, sync::RwLock};

use async_trait::async_trait;
use skillstream_core::{Category, CatalogError, Skill, SkillCatalog};

/// In-memory catalog implementation.
///
/// Useful for single-process deployments and tests. The lock exists only
/// because the catalog can be replaced by a refresh; reads are otherwise
/// pure.
pub struct MemoryCatalog {
    skills: RwLock<Vec<Skill>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            skills: RwLock::new(Vec::new()),
        }
    }

    /// Create a catalog from a skill list.
    #[must_use]
    pub fn from_skills(skills: Vec<Skill>) -> Self {
        Self {
            skills: RwLock::new(skills),
        }
    }

    /// Load a catalog from a JSON array of skills.
    ///
    /// # Errors
    /// Returns an error if the JSON does not parse as a skill list.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let skills: Vec<Skill> =
            serde_json::from_str(json).map_err(|e| CatalogError::Internal(e.to_string()))?;
        tracing::debug!(count = skills.len(), "Loaded skill catalog");
        Ok(Self::from_skills(skills))
    }

    /// Replace the entire skill list, e.g. after a catalog refresh.
    pub fn replace(&self, skills: Vec<Skill>) {
        *self.skills.write().unwrap() = skills;
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SkillCatalog for MemoryCatalog {
    async fn list_skills(&self, category: Option<&str>) -> Result<Vec<Skill>, CatalogError> {
        let skills = self.skills.read().unwrap();
        Ok(skills
            .iter()
            .filter(|s| category.is_none_or(|c| s.category == c))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let skills = self.skills.read().unwrap();

        // BTreeMap keeps category order stable by id.
        let mut counts = BTreeMap::<&str, usize>::new();
        for skill in skills.iter() {
            *counts.entry(skill.category.as_str()).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(id, count)| Category {
                id: id.to_string(),
                label: Category::label_for(id),
                count,
            })
            .collect())
    }

    async fn get(&self, slug: &str) -> Result<Skill, CatalogError> {
        self.skills
            .read()
            .unwrap()
            .iter()
            .find(|s| s.slug == slug)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(slug.to_string()))
    }
}
