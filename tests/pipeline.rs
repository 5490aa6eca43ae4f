use std::cell::Cell;
use std::collections::BTreeMap;

use mat_planner::PlannerError;
use mat_planner::client::CalculatorService;
use mat_planner::config::PlannerConfig;
use mat_planner::db;
use mat_planner::error::Result;
use mat_planner::models::{
    Avatar, BatchComputeResponse, ComputedItem, ConsumedMaterial, DemandCatalog, EntityId,
    MaterialCount, MaterialId, MaterialRef, Skill, UpgradeRequest, Weapon,
};
use mat_planner::planner::plan;
use rusqlite::Connection;

const UNITS_PER_PART: i64 = 10;

/// Calculator stand-in with a fixed two-character, two-weapon catalog
struct Scripted {
    fail_with_identity: bool,
    compute_calls: Cell<usize>,
}

impl Scripted {
    fn new() -> Self {
        Self {
            fail_with_identity: false,
            compute_calls: Cell::new(0),
        }
    }
}

fn material_name(id: MaterialId) -> &'static str {
    match id {
        202 => "Mora",
        104301 => "Teachings of Freedom",
        104302 => "Guide to Freedom",
        104303 => "Philosophies of Freedom",
        113001 => "Hurricane Seed",
        113002 => "Lightning Prism",
        114001 => "Tile of Decarabian's Tower",
        114002 => "Debris of Decarabian's City",
        114003 => "Fragment of Decarabian's Epic",
        114004 => "Scattered Piece of Decarabian's Dream",
        _ => "Unknown",
    }
}

fn avatar_materials(id: EntityId) -> (&'static [MaterialId], &'static [MaterialId]) {
    // (ascension, talents)
    match id {
        10000002 => (&[202, 113001], &[202, 104301, 104302, 104303]),
        10000003 => (&[202, 113002], &[202, 104301, 104302, 104303]),
        _ => (&[], &[]),
    }
}

fn weapon_materials(id: EntityId) -> &'static [MaterialId] {
    match id {
        11101 => &[202, 114001, 114002, 114003, 114004],
        11102 => &[202, 114001, 114002],
        _ => &[],
    }
}

fn refs(ids: &[MaterialId]) -> Vec<MaterialRef> {
    ids.iter().map(|id| MaterialRef { id: *id }).collect()
}

impl CalculatorService for Scripted {
    fn avatars(&self) -> Result<Vec<Avatar>> {
        Ok([10000002, 10000003]
            .into_iter()
            .map(|id| Avatar {
                id,
                name: format!("Avatar {id}"),
                element_attr_id: 4,
                skill_list: vec![Skill { group_id: id * 10 }],
            })
            .collect())
    }

    fn weapons(&self) -> Result<Vec<Weapon>> {
        Ok([11101, 11102]
            .into_iter()
            .map(|id| Weapon {
                id,
                name: format!("Weapon {id}"),
                max_level: 90,
            })
            .collect())
    }

    fn batch_compute(&self, items: &[UpgradeRequest]) -> Result<BatchComputeResponse> {
        self.compute_calls.set(self.compute_calls.get() + 1);
        if self.fail_with_identity {
            return Err(PlannerError::InvalidIdentity);
        }

        let mut consumed: BTreeMap<MaterialId, i64> = BTreeMap::new();
        let mut computed = Vec::new();
        for request in items {
            let (ascension, talents) = request
                .avatar
                .as_ref()
                .map_or((&[][..], &[][..]), |avatar| avatar_materials(avatar.avatar_id));
            let weapon = request
                .weapon
                .as_ref()
                .map_or(&[][..], |weapon| weapon_materials(weapon.id));

            for part in [ascension, talents, weapon] {
                for id in part {
                    *consumed.entry(*id).or_default() += UNITS_PER_PART;
                }
            }
            computed.push(ComputedItem {
                avatar_consume: refs(ascension),
                avatar_skill_consume: refs(talents),
                weapon_consume: refs(weapon),
            });
        }

        Ok(BatchComputeResponse {
            items: computed,
            available_material: vec![
                MaterialCount { id: 104301, num: 30 },
                MaterialCount { id: 114001, num: 27 },
                MaterialCount { id: 114002, num: 5 },
            ],
            overall_consume: consumed
                .into_iter()
                .map(|(id, num)| ConsumedMaterial {
                    id,
                    name: material_name(id).to_string(),
                    num,
                    lack_num: 0,
                })
                .collect(),
        })
    }
}

fn open() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn config() -> PlannerConfig {
    PlannerConfig {
        count: 2,
        chunk_size: 3,
    }
}

#[test]
fn full_run_produces_expected_inventory() {
    let mut conn = open();
    let service = Scripted::new();

    let outcome = plan(&mut conn, &service, &config(), false).unwrap();

    assert_eq!(outcome.selected, vec![10000002, 11101, 10000003]);
    assert!(outcome.extracted.is_some());

    let materials = &outcome.export.materials;
    assert_eq!(materials["Mora"], 80);
    assert_eq!(materials["TeachingsOfFreedom"], 60);
    assert_eq!(materials["GuideToFreedom"], 20);
    assert_eq!(materials["PhilosophiesOfFreedom"], 30);
    assert_eq!(materials["HurricaneSeed"], 20);
    assert_eq!(materials["LightningPrism"], 30);
    assert_eq!(materials["TileOfDecarabiansTower"], 47);
    assert_eq!(materials["DebrisOfDecarabiansCity"], 25);
    assert_eq!(materials["FragmentOfDecarabiansEpic"], 16);
    assert_eq!(materials["ScatteredPieceOfDecarabiansDream"], 20);
    assert_eq!(materials.len(), 10);
}

#[test]
fn repeated_runs_are_byte_identical() {
    let first = plan(&mut open(), &Scripted::new(), &config(), false).unwrap();
    let second = plan(&mut open(), &Scripted::new(), &config(), false).unwrap();

    assert_eq!(first.export.to_json().unwrap(), second.export.to_json().unwrap());
}

#[test]
fn second_run_reuses_cached_catalog() {
    let mut conn = open();
    let service = Scripted::new();

    let first = plan(&mut conn, &service, &config(), false).unwrap();
    let calls_after_first = service.compute_calls.get();
    let second = plan(&mut conn, &service, &config(), false).unwrap();

    assert!(second.extracted.is_none());
    // 6 simulated requests in chunks of 3, no catalog extraction
    assert_eq!(service.compute_calls.get() - calls_after_first, 2);
    assert_eq!(first.export, second.export);
}

#[test]
fn stale_cache_is_rebuilt() {
    let mut conn = open();
    let stale: DemandCatalog = vec![(10000002, vec![202])].into_iter().collect();
    db::save_catalog(&mut conn, &stale).unwrap();

    let outcome = plan(&mut conn, &Scripted::new(), &config(), false).unwrap();

    assert!(outcome.extracted.is_some());
    assert_eq!(db::cached_entity_count(&conn).unwrap(), 4);
}

#[test]
fn invalid_identity_aborts_the_run() {
    let service = Scripted {
        fail_with_identity: true,
        ..Scripted::new()
    };

    let result = plan(&mut open(), &service, &config(), false);

    assert!(matches!(result, Err(PlannerError::InvalidIdentity)));
    assert_eq!(service.compute_calls.get(), 1);
}

#[test]
fn zero_chunk_size_is_rejected_before_any_call() {
    let service = Scripted::new();
    let config = PlannerConfig {
        count: 2,
        chunk_size: 0,
    };

    let result = plan(&mut open(), &service, &config, false);

    assert!(matches!(result, Err(PlannerError::InvalidConfig { .. })));
    assert_eq!(service.compute_calls.get(), 0);
}
