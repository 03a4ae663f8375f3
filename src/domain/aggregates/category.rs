//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::format::slugify;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub position: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 80, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: u32,
}

impl Category {
    pub fn create(input: &CategoryInput) -> Result<Self, CategoryError> {
        let name = Self::checked_name(input)?;
        Ok(Self {
            id: Uuid::now_v7().to_string(), slug: slugify(&name), name,
            description: input.description.clone(), image_url: input.image_url.clone(),
            position: input.position, created_at: Utc::now(),
        })
    }

    pub fn update(&mut self, input: &CategoryInput) -> Result<(), CategoryError> {
        self.name = Self::checked_name(input)?;
        self.slug = slugify(&self.name);
        self.description = input.description.clone();
        self.image_url = input.image_url.clone();
        self.position = input.position;
        Ok(())
    }

    fn checked_name(input: &CategoryInput) -> Result<String, CategoryError> {
        input.validate().map_err(|e| CategoryError::Invalid(e.to_string()))?;
        let name = input.name.trim().to_string();
        if name.is_empty() { return Err(CategoryError::MissingName); }
        Ok(name)
    }
}

/// Sort order for listings: position, then name.
pub fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("Missing name")]
    MissingName,
    #[error("Invalid category: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_slug_follows_name() {
        let mut c = Category::create(&CategoryInput { name: "Moda Praia".into(), ..Default::default() }).unwrap();
        assert_eq!(c.slug, "moda-praia");
        c.update(&CategoryInput { name: "Acessórios".into(), position: 2, ..Default::default() }).unwrap();
        assert_eq!(c.slug, "acessorios");
        assert_eq!(c.position, 2);
    }
    #[test]
    fn test_sort() {
        let mk = |n: &str, p| Category::create(&CategoryInput { name: n.into(), position: p, ..Default::default() }).unwrap();
        let mut cats = vec![mk("B", 1), mk("A", 1), mk("Z", 0)];
        sort_categories(&mut cats);
        let names: Vec<_> = cats.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Z", "A", "B"]);
    }
}
