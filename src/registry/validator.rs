//! Registry integrity checks, run once at startup.

use super::types::{EntityDef, OWNER_COLUMN, PK_COLUMN};
use crate::error::RegistryError;
use std::collections::HashSet;

fn unknown_column(entity: &EntityDef, column: &str, referrer: &'static str) -> RegistryError {
    RegistryError::UnknownColumn {
        entity: entity.path.to_string(),
        column: column.to_string(),
        referrer,
    }
}

pub fn validate(entities: &[EntityDef]) -> Result<(), RegistryError> {
    let mut paths = HashSet::new();
    let mut tables = HashSet::new();
    let by_path: HashSet<&str> = entities.iter().map(|e| e.path).collect();
    let by_table: HashSet<&str> = entities.iter().map(|e| e.table).collect();

    for entity in entities {
        if !paths.insert(entity.path) {
            return Err(RegistryError::DuplicatePathSegment(entity.path.to_string()));
        }
        if !tables.insert(entity.table) {
            return Err(RegistryError::DuplicateTable(entity.table.to_string()));
        }
        if !entity.has_column(PK_COLUMN) {
            return Err(RegistryError::Invalid {
                entity: entity.path.to_string(),
                reason: format!("missing '{}' column", PK_COLUMN),
            });
        }
        if entity.owned && !entity.has_column(OWNER_COLUMN) {
            return Err(RegistryError::Invalid {
                entity: entity.path.to_string(),
                reason: format!("owned entity missing '{}' column", OWNER_COLUMN),
            });
        }
        if let Some(slug) = entity.slug_column {
            match entity.column(slug) {
                None => return Err(unknown_column(entity, slug, "slug_column")),
                Some(c) if !c.unique => {
                    return Err(RegistryError::Invalid {
                        entity: entity.path.to_string(),
                        reason: format!("slug column '{}' must be unique", slug),
                    })
                }
                Some(_) => {}
            }
        }
        for f in &entity.filters {
            if !entity.has_column(f.column) {
                return Err(unknown_column(entity, f.column, "filter"));
            }
        }
        for c in entity.search_columns {
            if !entity.has_column(c) {
                return Err(unknown_column(entity, c, "search_columns"));
            }
        }
        for c in entity.sortable_columns {
            if !entity.has_column(c) {
                return Err(unknown_column(entity, c, "sortable_columns"));
            }
        }
        for r in &entity.rules {
            if !entity.has_column(r.field) {
                return Err(unknown_column(entity, r.field, "rules"));
            }
        }
        for c in entity.sensitive_columns {
            if !entity.has_column(c) {
                return Err(unknown_column(entity, c, "sensitive_columns"));
            }
        }
        for c in entity.protected_columns {
            if !entity.has_column(c) {
                return Err(unknown_column(entity, c, "protected_columns"));
            }
        }
        for fk in &entity.foreign_keys {
            if !entity.has_column(fk.column) {
                return Err(unknown_column(entity, fk.column, "foreign_keys"));
            }
            if !by_table.contains(fk.table) {
                return Err(RegistryError::UnknownRelated {
                    entity: entity.path.to_string(),
                    related: fk.table.to_string(),
                });
            }
        }
        for embed in &entity.embeds {
            if !entity.has_column(embed.fk_column) {
                return Err(unknown_column(entity, embed.fk_column, "embeds"));
            }
            if !by_path.contains(embed.related) {
                return Err(RegistryError::UnknownRelated {
                    entity: entity.path.to_string(),
                    related: embed.related.to_string(),
                });
            }
        }
        for child in &entity.restrict_delete {
            if !by_table.contains(child.table) {
                return Err(RegistryError::UnknownRelated {
                    entity: entity.path.to_string(),
                    related: child.table.to_string(),
                });
            }
        }
        if let Some(stats) = &entity.statistics {
            if !entity.has_column(stats.group_by) {
                return Err(unknown_column(entity, stats.group_by, "statistics.group_by"));
            }
            if let Some(numeric) = stats.numeric {
                if !entity.has_column(numeric) {
                    return Err(unknown_column(entity, numeric, "statistics.numeric"));
                }
            }
            if let Some(top) = &stats.top {
                if !entity.has_column(top.by) {
                    return Err(unknown_column(entity, top.by, "statistics.top"));
                }
            }
        }
    }
    Ok(())
}
