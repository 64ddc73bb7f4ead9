//! Entities a reference can point at, as supplied by the host.

use novella_document::EntityKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of mentionable entities for one novel
pub trait EntityCatalog {
    fn list_mentionable(&self, scope_id: &str) -> Result<Vec<Entity>, CatalogError>;
}

/// Fixed entity list, the same for every scope
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entities: Vec<Entity>,
}

impl StaticCatalog {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// Parse a JSON array of entities
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

impl EntityCatalog for StaticCatalog {
    fn list_mentionable(&self, _scope_id: &str) -> Result<Vec<Entity>, CatalogError> {
        Ok(self.entities.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entities_parse_from_host_json() {
        let catalog = StaticCatalog::from_json(
            r#"[
                {"id": "c1", "name": "Alice", "type": "character", "role": "protagonist"},
                {"id": "m1", "name": "Harbor", "type": "location"}
            ]"#,
        )
        .unwrap();

        let entities = catalog.list_mentionable("novel-1").unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].role.as_deref(), Some("protagonist"));
        assert_eq!(entities[1].kind, EntityKind::Map);
    }

    #[test]
    fn test_malformed_catalog_is_an_error() {
        assert!(matches!(
            StaticCatalog::from_json("{"),
            Err(CatalogError::Json(_))
        ));
    }
}
