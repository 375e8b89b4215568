//! # Config Loader
//!
//! Loads the routing configuration: both destinations and the flush policy.
//!
//! `[secondary]` may omit its `dsn`; the blueprint then only records the
//! ordered `fallback_env` names. Looking those up happens when the routing
//! transport is built, not here.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("splitter.toml")).unwrap();
//! println!("Errors go to {}", blueprint.primary.dsn);
//! ```

mod parser;
mod validator;

pub use contracts::RoutingBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a `.toml` or `.json` file, then validate it
    ///
    /// # Errors
    /// Unknown extension, unreadable file, parse or validation failure.
    pub fn load_from_path(path: &Path) -> Result<RoutingBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), ?format, "Parsing configuration");
        Self::load_from_str(&content, format)
    }

    /// Parse and validate configuration text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RoutingBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Render as TOML (explicit addresses keep their secret keys)
    pub fn to_toml(blueprint: &RoutingBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Render as JSON
    pub fn to_json(blueprint: &RoutingBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}
