//! Error type shared by every planner stage

use std::path::PathBuf;

use thiserror::Error;

use crate::models::MaterialId;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("either the UID or the cookies are invalid")]
    InvalidIdentity,
    #[error("remote calculator failed: {message}")]
    RemoteFailure { message: String },
    #[error("no remaining entity covers materials {uncovered:?}")]
    CatalogInconsistency { uncovered: Vec<MaterialId> },
    #[error("missing env variable: {key}")]
    MissingEnv { key: &'static str },
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
    #[error("catalog cache error: {0}")]
    Cache(#[from] rusqlite::Error),
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlannerError {
    pub fn remote(message: impl Into<String>) -> Self {
        PlannerError::RemoteFailure {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
