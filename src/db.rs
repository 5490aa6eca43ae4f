//! Demand catalog cache schema and operations

use std::collections::HashMap;

use rusqlite::types::Type;
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::models::{DemandCatalog, EntityId, MaterialId};

/// Initialize the cache schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per cached entity, in demand catalog order
        CREATE TABLE IF NOT EXISTS catalog_entities (
            entity_id TEXT PRIMARY KEY,
            position INTEGER NOT NULL
        );

        -- Materials a full upgrade of the entity consumes
        CREATE TABLE IF NOT EXISTS catalog_materials (
            entity_id TEXT NOT NULL,
            material_id INTEGER NOT NULL,
            PRIMARY KEY (entity_id, material_id)
        );

        CREATE INDEX IF NOT EXISTS idx_catalog_entities_position ON catalog_entities(position);
        "#,
    )?;
    Ok(())
}

/// Replace the cached catalog with `catalog`
pub fn save_catalog(conn: &mut Connection, catalog: &DemandCatalog) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
        DELETE FROM catalog_materials;
        DELETE FROM catalog_entities;
        "#,
    )?;

    {
        let mut insert_entity =
            tx.prepare("INSERT INTO catalog_entities (entity_id, position) VALUES (?1, ?2)")?;
        let mut insert_material =
            tx.prepare("INSERT INTO catalog_materials (entity_id, material_id) VALUES (?1, ?2)")?;

        for (position, (entity, materials)) in catalog.entries().iter().enumerate() {
            let key = entity.to_string();
            insert_entity.execute(params![key, position as i64])?;
            for material in materials {
                insert_material.execute(params![key, material])?;
            }
        }
    }

    tx.commit()?;
    Ok(())
}

/// Load the cached catalog, empty if nothing was saved yet
pub fn load_catalog(conn: &Connection) -> Result<DemandCatalog> {
    let mut stmt = conn.prepare("SELECT entity_id, material_id FROM catalog_materials ORDER BY material_id")?;
    let rows = stmt.query_map([], |row| Ok((parse_entity_id(row, 0)?, row.get::<_, MaterialId>(1)?)))?;

    let mut materials: HashMap<EntityId, Vec<MaterialId>> = HashMap::new();
    for row in rows {
        let (entity, material) = row?;
        materials.entry(entity).or_default().push(material);
    }

    let mut stmt = conn.prepare("SELECT entity_id FROM catalog_entities ORDER BY position")?;
    let rows = stmt.query_map([], |row| parse_entity_id(row, 0))?;

    let mut catalog = DemandCatalog::new();
    for row in rows {
        let entity = row?;
        catalog.insert(entity, materials.remove(&entity).unwrap_or_default());
    }
    Ok(catalog)
}

/// Number of entities currently cached
pub fn cached_entity_count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM catalog_entities", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Drop every cached entry
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM catalog_materials;
        DELETE FROM catalog_entities;
        "#,
    )?;
    Ok(())
}

// Entity ids are stored stringified
fn parse_entity_id(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<EntityId> {
    let raw: String = row.get(index)?;
    raw.parse()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}
