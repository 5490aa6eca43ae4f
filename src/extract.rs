//! Demand catalog extraction
//!
//! Asks the calculator for a full upgrade of every character and weapon in
//! the catalog and records which materials each one consumes.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::calculator::{character_request, weapon_request};
use crate::client::CalculatorService;
use crate::error::{PlannerError, Result};
use crate::models::{Catalog, ComputedItem, DemandCatalog, EntityId, MaterialId, UpgradeRequest};

/// The traveler is listed once per element under each of two identities,
/// but the demand catalog keys by id and keeps one entry per identity.
pub const TRAVELER_ID: EntityId = 10000005;
const TRAVELER_IDENTITIES: usize = 2;

/// One request per avatar, then one per weapon, in catalog order
pub fn catalog_requests(snapshot: &Catalog) -> Vec<UpgradeRequest> {
    snapshot
        .avatars
        .iter()
        .map(character_request)
        .chain(snapshot.weapons.iter().map(weapon_request))
        .collect()
}

/// Every material id an entity's full upgrade consumes
pub fn materials_of(item: &ComputedItem) -> BTreeSet<MaterialId> {
    item.avatar_consume
        .iter()
        .chain(&item.avatar_skill_consume)
        .chain(&item.weapon_consume)
        .map(|material| material.id)
        .collect()
}

/// Number of demand catalog entries a snapshot should produce
pub fn expected_entity_count(snapshot: &Catalog) -> usize {
    let listed = snapshot.avatars.len() + snapshot.weapons.len();
    let traveler_rows = snapshot
        .avatars
        .iter()
        .filter(|avatar| avatar.id == TRAVELER_ID)
        .count();

    if traveler_rows == 0 {
        listed
    } else {
        (listed + TRAVELER_IDENTITIES).saturating_sub(traveler_rows * TRAVELER_IDENTITIES)
    }
}

/// Build the demand catalog for every entity in `snapshot`
pub fn extract_demand_catalog<S: CalculatorService + ?Sized>(
    service: &S,
    snapshot: &Catalog,
    chunk_size: usize,
) -> Result<(DemandCatalog, ExtractStats)> {
    let requests = catalog_requests(snapshot);
    info!(requests = requests.len(), "computing full upgrades for the whole catalog");

    let mut items = Vec::with_capacity(requests.len());
    for chunk in requests.chunks(chunk_size.max(1)) {
        let response = service.batch_compute(chunk)?;
        if response.items.len() != chunk.len() {
            return Err(PlannerError::remote(format!(
                "expected {} computed items, got {}",
                chunk.len(),
                response.items.len()
            )));
        }
        items.extend(response.items);
    }

    let ids = snapshot
        .avatars
        .iter()
        .map(|avatar| avatar.id)
        .chain(snapshot.weapons.iter().map(|weapon| weapon.id));

    let mut catalog = DemandCatalog::new();
    for (id, item) in ids.zip(&items) {
        let materials = materials_of(item);
        debug!(entity = id, materials = materials.len(), "extracted");
        catalog.insert(id, materials);
    }

    let stats = ExtractStats {
        avatars: snapshot.avatars.len(),
        weapons: snapshot.weapons.len(),
        entities: catalog.len(),
        materials: catalog
            .entries()
            .iter()
            .flat_map(|(_, materials)| materials.iter().copied())
            .collect::<BTreeSet<_>>()
            .len(),
    };
    Ok((catalog, stats))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub avatars: usize,
    pub weapons: usize,
    pub entities: usize,
    pub materials: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Extracted {} entities ({} avatars, {} weapons) covering {} materials",
            self.entities, self.avatars, self.weapons, self.materials
        )
    }
}
