//! Batch demand simulation
//!
//! Expands the selected entities into many simulated upgrade requests,
//! sends them to the calculator in fixed-size chunks and flattens the
//! responses into consumption records carrying the surplus per material.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::client::CalculatorService;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::models::{
    Avatar, AvatarTarget, BatchComputeResponse, Catalog, ConsumptionRecord, EntityId, MaterialId,
    SkillTarget, UpgradeRequest, Weapon, WeaponTarget,
};

const AVATAR_LEVEL_FROM: u32 = 1;
const AVATAR_LEVEL_TO: u32 = 90;
const SKILL_LEVEL_FROM: u32 = 1;
const SKILL_LEVEL_TO: u32 = 10;
const WEAPON_LEVEL_FROM: u32 = 1;

/// Full upgrade of a character with no weapon attached
pub fn character_request(avatar: &Avatar) -> UpgradeRequest {
    UpgradeRequest {
        avatar: Some(AvatarTarget {
            avatar_id: avatar.id,
            avatar_level_current: AVATAR_LEVEL_FROM,
            avatar_level_target: AVATAR_LEVEL_TO,
            element_attr_id: avatar.element_attr_id,
            skill_list: avatar
                .skill_list
                .iter()
                .map(|skill| SkillTarget {
                    id: skill.group_id,
                    level_current: SKILL_LEVEL_FROM,
                    level_target: SKILL_LEVEL_TO,
                })
                .collect(),
        }),
        weapon: None,
    }
}

/// Full upgrade of a weapon on its own
pub fn weapon_request(weapon: &Weapon) -> UpgradeRequest {
    UpgradeRequest {
        avatar: None,
        weapon: Some(WeaponTarget {
            id: weapon.id,
            level_current: WEAPON_LEVEL_FROM,
            level_target: weapon.max_level,
        }),
    }
}

/// Synthesize `count` requests per selected entity and merge the two kinds.
///
/// Entities are taken in catalog order, not selection order.
pub fn build_requests(snapshot: &Catalog, selected: &[EntityId], count: usize) -> Vec<UpgradeRequest> {
    let selected: HashSet<EntityId> = selected.iter().copied().collect();

    let characters: Vec<UpgradeRequest> = snapshot
        .avatars
        .iter()
        .filter(|avatar| selected.contains(&avatar.id))
        .flat_map(|avatar| std::iter::repeat_n(character_request(avatar), count))
        .collect();
    let weapons: Vec<UpgradeRequest> = snapshot
        .weapons
        .iter()
        .filter(|weapon| selected.contains(&weapon.id))
        .flat_map(|weapon| std::iter::repeat_n(weapon_request(weapon), count))
        .collect();

    debug!(characters = characters.len(), weapons = weapons.len(), "synthesized requests");
    pair_requests(characters, weapons)
}

/// Equip `weapons[i]` on `characters[i]`, then append whatever is left over.
///
/// The pairing only exists to fit the one-character-one-weapon request
/// shape. When characters outnumber weapons their unpaired tail is sent a
/// second time; otherwise the weapons' tail goes out as weapon-only requests.
pub fn pair_requests(
    mut characters: Vec<UpgradeRequest>,
    weapons: Vec<UpgradeRequest>,
) -> Vec<UpgradeRequest> {
    let len_characters = characters.len();
    let len_weapons = weapons.len();

    for (character, weapon) in characters.iter_mut().zip(&weapons) {
        character.weapon = weapon.weapon.clone();
    }

    if len_characters > len_weapons {
        let tail = characters[len_weapons..].to_vec();
        characters.extend(tail);
    } else {
        characters.extend(weapons.into_iter().skip(len_characters));
    }
    characters
}

/// Send `requests` in chunks of `chunk_size` and flatten the responses.
///
/// Chunks go out strictly one after another; the first failure aborts the
/// whole run.
pub fn run_batches<F>(
    requests: &[UpgradeRequest],
    chunk_size: usize,
    mut simulate: F,
) -> Result<Vec<ConsumptionRecord>>
where
    F: FnMut(&[UpgradeRequest]) -> Result<BatchComputeResponse>,
{
    let total_chunks = requests.len().div_ceil(chunk_size.max(1));
    let mut records = Vec::new();

    for (index, chunk) in requests.chunks(chunk_size.max(1)).enumerate() {
        info!(chunk = index + 1, of = total_chunks, size = chunk.len(), "calculating materials");
        let response = simulate(chunk)?;
        collect_records(response, &mut records);
    }

    Ok(records)
}

/// Attach each consumed material's surplus and append it to `records`
pub fn collect_records(response: BatchComputeResponse, records: &mut Vec<ConsumptionRecord>) {
    let available: HashMap<MaterialId, i64> = response
        .available_material
        .iter()
        .map(|material| (material.id, material.num))
        .collect();

    records.extend(response.overall_consume.into_iter().map(|material| ConsumptionRecord {
        extra: available.get(&material.id).copied().unwrap_or(0),
        material_id: material.id,
        display_name: material.name,
        required_num: material.num,
        lack_num: material.lack_num,
    }));
}

/// Simulate farming the selected entities `config.count` times each
pub fn simulate_selected<S: CalculatorService + ?Sized>(
    service: &S,
    snapshot: &Catalog,
    selected: &[EntityId],
    config: &PlannerConfig,
) -> Result<Vec<ConsumptionRecord>> {
    info!(
        entities = selected.len(),
        count = config.count,
        "calculating materials for {} simulated upgrades",
        selected.len() * config.count
    );

    let requests = build_requests(snapshot, selected, config.count);
    run_batches(&requests, config.chunk_size, |chunk| service.batch_compute(chunk))
}
