//! Identity and tunables

use crate::error::{PlannerError, Result};

pub const ENV_COOKIES: &str = "COOKIES";
pub const ENV_UID: &str = "UID";
pub const ENV_REGION: &str = "REGION";

pub const DEFAULT_REGION: &str = "os_asia";
pub const DEFAULT_COUNT: usize = 50;
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Account the calculator runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub cookies: String,
    pub uid: String,
    pub region: String,
}

impl Identity {
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(mut getter: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let cookies = required_env(&mut getter, ENV_COOKIES)?;
        let uid = required_env(&mut getter, ENV_UID)?;
        let region = getter(ENV_REGION)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Ok(Self {
            cookies,
            uid,
            region,
        })
    }
}

fn required_env<F>(getter: &mut F, key: &'static str) -> Result<String>
where
    F: FnMut(&str) -> Option<String>,
{
    match getter(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PlannerError::MissingEnv { key }),
    }
}

/// Numeric knobs of the simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Simulated upgrade copies per selected entity
    pub count: usize,
    /// Requests per batch compute call; the service rejects larger bodies
    pub chunk_size: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(PlannerError::InvalidConfig {
                message: "count must be at least 1".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(PlannerError::InvalidConfig {
                message: "chunk size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
