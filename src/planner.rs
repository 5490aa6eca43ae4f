//! End-to-end planning run

use rusqlite::Connection;
use tracing::info;

use crate::calculator::simulate_selected;
use crate::cleanup::{Adjustment, Inventory, clean_up_materials};
use crate::client::CalculatorService;
use crate::config::PlannerConfig;
use crate::db;
use crate::error::Result;
use crate::export::GoodExport;
use crate::extract::{ExtractStats, expected_entity_count, extract_demand_catalog};
use crate::models::{Catalog, DemandCatalog, EntityId};
use crate::selector::select_minimum_cover;

/// Everything a run produced, for reporting and tests
#[derive(Debug)]
pub struct PlanOutcome {
    /// Present when the catalog was recomputed rather than read from cache
    pub extracted: Option<ExtractStats>,
    pub selected: Vec<EntityId>,
    pub records: usize,
    pub inventory: Inventory,
    pub adjustments: Vec<Adjustment>,
    pub export: GoodExport,
}

/// Reuse the cached demand catalog when it matches `snapshot`, otherwise
/// rebuild it from the calculator and store it.
pub fn load_demand_catalog<S: CalculatorService + ?Sized>(
    conn: &mut Connection,
    service: &S,
    snapshot: &Catalog,
    config: &PlannerConfig,
    refresh: bool,
) -> Result<(DemandCatalog, Option<ExtractStats>)> {
    let cached = db::cached_entity_count(conn)?;
    let expected = expected_entity_count(snapshot);
    info!(cached, expected, "checking catalog cache");

    if !refresh && cached > 0 && cached == expected {
        info!("no new avatars or weapons, using cached catalog");
        return Ok((db::load_catalog(conn)?, None));
    }

    if refresh {
        info!("refresh requested, recalculating catalog");
    } else if cached == 0 {
        info!("no cached catalog found, doing first time calculation");
    } else {
        info!("new avatars or weapons found, recalculating");
    }

    let (catalog, stats) = extract_demand_catalog(service, snapshot, config.chunk_size)?;
    db::save_catalog(conn, &catalog)?;
    Ok((catalog, Some(stats)))
}

/// Run the whole pipeline: catalog, minimum cover, simulation, clean-up.
///
/// Nothing is written to disk besides the catalog cache; the caller decides
/// what to do with the export.
pub fn plan<S: CalculatorService + ?Sized>(
    conn: &mut Connection,
    service: &S,
    config: &PlannerConfig,
    refresh: bool,
) -> Result<PlanOutcome> {
    config.validate()?;

    info!("fetching avatars and weapons");
    let snapshot = service.catalog()?;
    let (catalog, extracted) = load_demand_catalog(conn, service, &snapshot, config, refresh)?;

    let selected = select_minimum_cover(&catalog)?;
    let records = simulate_selected(service, &snapshot, &selected, config)?;
    let (inventory, adjustments) = clean_up_materials(&records);
    let export = GoodExport::from_inventory(&inventory);

    Ok(PlanOutcome {
        extracted,
        selected,
        records: records.len(),
        inventory,
        adjustments,
        export,
    })
}
