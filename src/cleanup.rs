//! Inventory clean-up and tiered surplus redistribution
//!
//! Raw consumption records are folded into one inventory line per
//! normalized name. Items that belong to the same upgrade tier are grouped
//! into material chains, ordered from the cheapest rarity up, and surplus
//! low-rarity stock is credited against the need for the next rarities at
//! the in-game 3:1 conversion ratio.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::models::{CleanedItem, ConsumptionRecord, MaterialId};

/// Inventory keyed by normalized item name
pub type Inventory = BTreeMap<String, CleanedItem>;

/// Units of one rarity needed to craft one unit of the next
pub const CONVERSION_RATIO: i64 = 3;

static WORD_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[- ]").expect("separator pattern is valid"));
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W").expect("non-word pattern is valid"));

/// Turn a display name into an inventory key: "Guide to Freedom" becomes
/// "GuideToFreedom". Applying it twice gives the same key.
pub fn normalize_name(raw: &str) -> String {
    let joined: String = WORD_SEPARATOR
        .split(raw.trim_matches('"'))
        .map(|word| capitalize(&NON_WORD.replace_all(word, "")))
        .collect();
    NON_WORD.replace_all(&joined, "").into_owned()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Fold records into one item per normalized name, keeping the record with
/// the larger held count when names collide.
pub fn normalize_records(records: &[ConsumptionRecord]) -> Inventory {
    let mut inventory = Inventory::new();

    for record in records {
        let name = normalize_name(&record.display_name);
        let num = record.held();

        let replace = inventory.get(&name).is_none_or(|existing| num > existing.num);
        if replace {
            inventory.insert(
                name.clone(),
                CleanedItem {
                    normalized_name: name,
                    material_id: record.material_id,
                    extra: record.extra,
                    num,
                },
            );
        }
    }

    inventory
}

/// Upgrade tier of a material, derived from its id range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Weapon ascension materials and ascension gems, four rarities
    Ascension,
    /// Talent books, three rarities
    TalentBook,
}

impl Tier {
    pub fn of(id: MaterialId) -> Option<Tier> {
        if id > 114000 || (104100 < id && id < 104300) {
            Some(Tier::Ascension)
        } else if 104300 < id && id < 113000 && id != 104319 {
            // 104319 is Crown of Insight, which has no lower rarities
            Some(Tier::TalentBook)
        } else {
            None
        }
    }

    /// Rarities in one chain of this tier
    pub fn chain_len(self) -> usize {
        match self {
            Tier::Ascension => 4,
            Tier::TalentBook => 3,
        }
    }
}

/// Group tiered items into chains of names, lowest id first in each chain.
///
/// Within a tier items are sorted by descending id and cut into runs of
/// the tier's chain length, so a short run only ever holds the lowest ids.
/// Items sharing an id stay in name order.
pub fn material_chains(inventory: &Inventory) -> Vec<Vec<String>> {
    let mut items: Vec<&CleanedItem> = inventory.values().collect();
    items.sort_by(|a, b| b.material_id.cmp(&a.material_id));

    let mut ascension = Vec::new();
    let mut talent_books = Vec::new();
    for item in items {
        match Tier::of(item.material_id) {
            Some(Tier::Ascension) => ascension.push(item.normalized_name.clone()),
            Some(Tier::TalentBook) => talent_books.push(item.normalized_name.clone()),
            None => {}
        }
    }

    let mut chains: Vec<Vec<String>> = [(Tier::Ascension, ascension), (Tier::TalentBook, talent_books)]
        .into_iter()
        .flat_map(|(tier, names)| {
            names
                .chunks(tier.chain_len())
                .map(|chunk| chunk.iter().rev().cloned().collect::<Vec<_>>())
                .collect::<Vec<_>>()
        })
        .collect();
    chains.reverse();
    chains
}

/// One surplus credit applied during redistribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub source: String,
    pub target: String,
    pub distance: usize,
    pub factor: i64,
    pub amount: i64,
}

/// Credit surplus along every material chain, lowering `num` in place.
pub fn redistribute(inventory: &mut Inventory) -> Vec<Adjustment> {
    let chains = material_chains(inventory);
    info!(chains = chains.len(), "redistributing surplus");

    let mut adjustments = Vec::new();
    for chain in &chains {
        debug!(?chain, "processing chain");
        redistribute_chain(inventory, chain, &mut adjustments);
    }
    adjustments
}

/// Walk one chain from the cheapest rarity up. Every item with surplus
/// credits `extra / 3^distance` to the nearest later item with no surplus.
///
/// The target found for one source is cached and reused for the next only
/// while the cached item's own extra is non-zero; otherwise the search runs
/// again from the slot after the current source. Extras do not change
/// during the walk, so in practice each source rescans.
fn redistribute_chain(inventory: &mut Inventory, chain: &[String], adjustments: &mut Vec<Adjustment>) {
    let extra_of = |inventory: &Inventory, index: usize| inventory.get(&chain[index]).map_or(0, |item| item.extra);

    let mut next_valid: Option<usize> = None;
    for current in 0..chain.len() {
        let surplus = extra_of(inventory, current);
        if surplus <= 0 {
            continue;
        }

        let keep_cached = next_valid.is_some_and(|index| extra_of(inventory, index) != 0);
        if !keep_cached {
            next_valid = (current + 1..chain.len()).find(|&index| extra_of(inventory, index) == 0);
        }

        let Some(target) = next_valid else {
            continue;
        };
        let distance = target.abs_diff(current);
        let factor = CONVERSION_RATIO.pow(distance as u32);
        let amount = surplus / factor;

        if let Some(item) = inventory.get_mut(&chain[target]) {
            item.num -= amount;
        }
        adjustments.push(Adjustment {
            source: chain[current].clone(),
            target: chain[target].clone(),
            distance,
            factor,
            amount,
        });
    }
}

/// Normalize raw records and redistribute their surplus
pub fn clean_up_materials(records: &[ConsumptionRecord]) -> (Inventory, Vec<Adjustment>) {
    info!(records = records.len(), "cleaning up materials");
    let mut inventory = normalize_records(records);
    let adjustments = redistribute(&mut inventory);
    (inventory, adjustments)
}
