use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::application::AppError;
use crate::domain::TaxPolicy;
use crate::storage::StoreLocation;

/// User settings for the bookkeeping store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Database file path, or ":memory:" for a store that lives only for the session
    #[serde(default = "default_database")]
    pub database: String,

    /// How invoice tax rates are chosen
    #[serde(default)]
    pub tax_policy: TaxPolicy,

    /// Reject a new client whose name is already registered
    #[serde(default = "default_true")]
    pub unique_client_names: bool,

    /// Currency label shown next to amounts
    #[serde(default = "default_currency")]
    pub currency: String,

    /// How many clients the dashboard lists as recently added
    #[serde(default = "default_recent_clients")]
    pub recent_clients: usize,
}

fn default_database() -> String {
    "daftar.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    "SAR".to_string()
}

fn default_recent_clients() -> usize {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database(),
            tax_policy: TaxPolicy::default(),
            unique_client_names: default_true(),
            currency: default_currency(),
            recent_clients: default_recent_clients(),
        }
    }
}

impl Settings {
    /// Settings for a throwaway in-memory store.
    pub fn in_memory() -> Self {
        Self {
            database: ":memory:".to_string(),
            ..Self::default()
        }
    }

    pub fn store_location(&self) -> StoreLocation {
        StoreLocation::parse(&self.database)
    }

    /// Load settings from `path`, or defaults when the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Write settings to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| AppError::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.database.trim().is_empty() {
            return Err(AppError::Config("database must not be empty".to_string()));
        }
        if let TaxPolicy::Selectable {
            max_percent,
            default_percent,
        } = self.tax_policy
        {
            if default_percent > max_percent {
                return Err(AppError::Config(format!(
                    "default tax rate {}% exceeds maximum {}%",
                    default_percent, max_percent
                )));
            }
        }
        Ok(())
    }
}
