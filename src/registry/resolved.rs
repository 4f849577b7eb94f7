//! Runtime catalog model: validated definitions plus lookup maps.

use super::types::EntityDef;
use super::{catalog, validator};
use crate::error::RegistryError;
use std::collections::HashMap;

#[derive(Debug)]
pub struct CatalogModel {
    entities: Vec<EntityDef>,
    by_path: HashMap<&'static str, usize>,
    by_table: HashMap<&'static str, usize>,
}

impl CatalogModel {
    pub fn new(entities: Vec<EntityDef>) -> Result<Self, RegistryError> {
        validator::validate(&entities)?;
        let by_path = entities.iter().enumerate().map(|(i, e)| (e.path, i)).collect();
        let by_table = entities.iter().enumerate().map(|(i, e)| (e.table, i)).collect();
        Ok(CatalogModel {
            entities,
            by_path,
            by_table,
        })
    }

    /// The built-in catalog, validated.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(catalog::builtin())
    }

    pub fn entity(&self, path: &str) -> Option<&EntityDef> {
        self.by_path.get(path).map(|&i| &self.entities[i])
    }

    pub fn entity_by_table(&self, table: &str) -> Option<&EntityDef> {
        self.by_table.get(table).map(|&i| &self.entities[i])
    }

    pub fn entities(&self) -> &[EntityDef] {
        &self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_model_resolves_paths_and_tables() {
        let model = CatalogModel::builtin().unwrap();
        assert!(model.entity("awards").is_some());
        assert!(model.entity("tag-groups").is_some());
        assert!(model.entity("no-such-resource").is_none());
        assert_eq!(model.entity_by_table("tag_groups").unwrap().path, "tag-groups");
    }
}
