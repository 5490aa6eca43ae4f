//! Greedy minimum cover over the demand catalog

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{PlannerError, Result};
use crate::models::{DemandCatalog, EntityId, MaterialId};

/// Pick entities until their combined materials cover every material in
/// the catalog.
///
/// Each round takes the entity adding the most uncovered materials; the
/// first one in catalog order wins a tie. Greedy, so not always optimal,
/// but deterministic for a given catalog order.
pub fn select_minimum_cover(catalog: &DemandCatalog) -> Result<Vec<EntityId>> {
    let entries = catalog.entries();
    let universe: BTreeSet<MaterialId> = entries
        .iter()
        .flat_map(|(_, materials)| materials.iter().copied())
        .collect();
    cover_universe(entries, &universe)
}

/// Greedy cover of an explicit universe by the given candidates.
///
/// Fails with [`PlannerError::CatalogInconsistency`] as soon as no remaining
/// candidate adds coverage while materials are still uncovered.
pub fn cover_universe(
    entries: &[(EntityId, Vec<MaterialId>)],
    universe: &BTreeSet<MaterialId>,
) -> Result<Vec<EntityId>> {
    info!(
        entities = entries.len(),
        materials = universe.len(),
        "finding minimum entities to cover all materials"
    );

    let mut remaining: BTreeSet<usize> = (0..entries.len()).collect();
    let mut covered: BTreeSet<MaterialId> = BTreeSet::new();
    let mut selected = Vec::new();

    while covered.len() < universe.len() {
        let mut best: Option<(usize, usize)> = None; // (index, new coverage)

        for &index in &remaining {
            let gain = entries[index]
                .1
                .iter()
                .filter(|&material| universe.contains(material) && !covered.contains(material))
                .count();
            if gain > best.map_or(0, |(_, best_gain)| best_gain) {
                best = Some((index, gain));
            }
        }

        let Some((index, gain)) = best else {
            let uncovered = universe.difference(&covered).copied().collect();
            return Err(PlannerError::CatalogInconsistency { uncovered });
        };

        let (entity, materials) = &entries[index];
        debug!(entity, gain, "selected entity");
        covered.extend(materials.iter().filter(|&m| universe.contains(m)).copied());
        remaining.remove(&index);
        selected.push(*entity);
    }

    info!(selected = selected.len(), "minimum cover found");
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(entries: &[(EntityId, &[MaterialId])]) -> DemandCatalog {
        entries
            .iter()
            .map(|(id, materials)| (*id, materials.to_vec()))
            .collect()
    }

    fn coverage(catalog: &DemandCatalog, selected: &[EntityId]) -> BTreeSet<MaterialId> {
        selected
            .iter()
            .flat_map(|id| catalog.materials(*id).unwrap().iter().copied())
            .collect()
    }

    #[test]
    fn triangle_needs_two_entities() {
        let catalog = demand(&[(1, &[1, 2]), (2, &[2, 3]), (3, &[1, 3])]);
        let selected = select_minimum_cover(&catalog).unwrap();

        assert_eq!(selected, vec![1, 2]);
        assert_eq!(coverage(&catalog, &selected), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn ties_go_to_catalog_order() {
        let catalog = demand(&[(30, &[5, 6]), (10, &[7, 8]), (20, &[5, 6, 7, 8])]);
        assert_eq!(select_minimum_cover(&catalog).unwrap(), vec![20]);

        let catalog = demand(&[(10, &[7, 8]), (30, &[5, 6])]);
        assert_eq!(select_minimum_cover(&catalog).unwrap(), vec![10, 30]);
    }

    #[test]
    fn unclaimed_material_fails_fast() {
        let catalog = demand(&[(1, &[1, 2]), (2, &[2])]);
        let universe = BTreeSet::from([1, 2, 3]);

        match cover_universe(catalog.entries(), &universe) {
            Err(PlannerError::CatalogInconsistency { uncovered }) => assert_eq!(uncovered, vec![3]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn covers_every_material() {
        let catalog = demand(&[
            (10000002, &[104301, 104302, 104303, 113001]),
            (10000003, &[104301, 104302, 104303, 113002, 101]),
            (11101, &[114001, 114002, 101]),
            (11102, &[114001, 114002, 114003, 114004]),
            (13201, &[113001, 113002]),
        ]);
        let selected = select_minimum_cover(&catalog).unwrap();

        let universe: BTreeSet<MaterialId> = catalog
            .entries()
            .iter()
            .flat_map(|(_, m)| m.iter().copied())
            .collect();
        assert_eq!(coverage(&catalog, &selected), universe);
        assert_eq!(selected, select_minimum_cover(&catalog).unwrap());
    }

    #[test]
    fn empty_catalog_selects_nothing() {
        assert!(select_minimum_cover(&DemandCatalog::new()).unwrap().is_empty());
    }
}
