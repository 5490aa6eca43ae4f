//! GOOD inventory export

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cleanup::Inventory;
use crate::error::{PlannerError, Result};

pub const GOOD_FORMAT: &str = "GOOD";
pub const GOOD_VERSION: u32 = 2;
pub const NEP_VERSION: &str = "0.1";
pub const EXPORT_SOURCE: &str = "mat-planner";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodExport {
    pub format: String,
    pub version: u32,
    pub nep_version: String,
    pub source: String,
    pub materials: BTreeMap<String, i64>,
}

impl GoodExport {
    pub fn from_inventory(inventory: &Inventory) -> Self {
        Self {
            format: GOOD_FORMAT.to_string(),
            version: GOOD_VERSION,
            nep_version: NEP_VERSION.to_string(),
            source: EXPORT_SOURCE.to_string(),
            materials: inventory
                .values()
                .map(|item| (item.normalized_name.clone(), item.num))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        info!(path = %path.display(), materials = self.materials.len(), "writing GOOD export");
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
