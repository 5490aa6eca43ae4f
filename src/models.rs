//! Data models for entities, materials and calculator payloads

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

pub type MaterialId = i64;
pub type EntityId = i64;

/// Character entry from the remote avatar list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub element_attr_id: i64,
    #[serde(default)]
    pub skill_list: Vec<Skill>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub group_id: i64,
}

/// Weapon entry from the remote weapon list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub max_level: u32,
}

/// One snapshot of the remote catalog, in the order the service returned it
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub avatars: Vec<Avatar>,
    pub weapons: Vec<Weapon>,
}

/// Wrapper the list endpoints return
#[derive(Debug, Deserialize)]
pub struct EntityList<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
}

/// Materials each entity needs to be fully upgraded.
///
/// Iteration follows insertion order, which the selector relies on for its
/// tie-break. Re-inserting an id replaces its materials but keeps its slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemandCatalog {
    entries: Vec<(EntityId, Vec<MaterialId>)>,
}

impl DemandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: EntityId, materials: impl IntoIterator<Item = MaterialId>) {
        let mut materials: Vec<MaterialId> = materials.into_iter().collect();
        materials.sort_unstable();
        materials.dedup();

        match self.entries.iter_mut().find(|(id, _)| *id == entity) {
            Some((_, existing)) => *existing = materials,
            None => self.entries.push((entity, materials)),
        }
    }

    pub fn materials(&self, entity: EntityId) -> Option<&[MaterialId]> {
        self.entries
            .iter()
            .find(|(id, _)| *id == entity)
            .map(|(_, materials)| materials.as_slice())
    }

    pub fn entries(&self) -> &[(EntityId, Vec<MaterialId>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(EntityId, Vec<MaterialId>)> for DemandCatalog {
    fn from_iter<I: IntoIterator<Item = (EntityId, Vec<MaterialId>)>>(iter: I) -> Self {
        let mut catalog = DemandCatalog::new();
        for (entity, materials) in iter {
            catalog.insert(entity, materials);
        }
        catalog
    }
}

/// One item of a batch compute request.
///
/// Character requests carry the avatar fields and an optional weapon,
/// serialized as `{}` when absent. Weapon-only requests carry just the weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeRequest {
    #[serde(flatten)]
    pub avatar: Option<AvatarTarget>,
    #[serde(serialize_with = "serialize_weapon_slot")]
    pub weapon: Option<WeaponTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvatarTarget {
    pub avatar_id: EntityId,
    pub avatar_level_current: u32,
    pub avatar_level_target: u32,
    pub element_attr_id: i64,
    pub skill_list: Vec<SkillTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillTarget {
    pub id: i64,
    pub level_current: u32,
    pub level_target: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeaponTarget {
    pub id: EntityId,
    pub level_current: u32,
    pub level_target: u32,
}

fn serialize_weapon_slot<S>(weapon: &Option<WeaponTarget>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match weapon {
        Some(weapon) => weapon.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Response body of the batch compute endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchComputeResponse {
    #[serde(default)]
    pub items: Vec<ComputedItem>,
    #[serde(default)]
    pub available_material: Vec<MaterialCount>,
    #[serde(default)]
    pub overall_consume: Vec<ConsumedMaterial>,
}

/// Per-request breakdown, in request order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComputedItem {
    #[serde(default)]
    pub avatar_consume: Vec<MaterialRef>,
    #[serde(default)]
    pub avatar_skill_consume: Vec<MaterialRef>,
    #[serde(default)]
    pub weapon_consume: Vec<MaterialRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialRef {
    pub id: MaterialId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialCount {
    pub id: MaterialId,
    pub num: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumedMaterial {
    pub id: MaterialId,
    #[serde(default)]
    pub name: String,
    pub num: i64,
    #[serde(default)]
    pub lack_num: i64,
}

/// How much of a material one simulated chunk needed, lacked and had spare
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionRecord {
    pub material_id: MaterialId,
    pub display_name: String,
    pub required_num: i64,
    pub lack_num: i64,
    pub extra: i64,
}

impl ConsumptionRecord {
    /// Count the player is assumed to hold: what was used plus the surplus
    pub fn held(&self) -> i64 {
        self.required_num - self.lack_num + self.extra
    }
}

/// Inventory line keyed by its normalized name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedItem {
    pub normalized_name: String,
    pub material_id: MaterialId,
    pub extra: i64,
    pub num: i64, // Lowered by surplus redistribution
}
