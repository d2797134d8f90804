//! Console configuration loading.
//!
//! A JSON file configures the navigation shell; a missing or corrupt file
//! degrades to defaults rather than failing startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "console.json";

/// Static configuration for the navigation and session core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Product name shown as the window-title prefix.
    pub product_name: String,
    /// View rendered when the history token is empty.
    pub default_view: String,
    /// Sentinel token that forces the logged-out view.
    pub logout_view: String,
    /// Minimum idle-timeout the client will accept, regardless of the
    /// server-reported value.
    pub session_timeout_floor_ms: u64,
    /// Sibling-compatibility classes for deep-link stickiness: view name →
    /// class name. Views in the same class exchange tab/subtab suffixes.
    pub sibling_classes: HashMap<String, String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let mut sibling_classes = HashMap::new();
        // Entity-detail views are interchangeable by tab+subtab.
        for name in ["Resource", "ResourceGroup", "AutoGroup", "AutoCluster"] {
            sibling_classes.insert(name.to_string(), "entity-detail".to_string());
        }
        Self {
            product_name: "Console".to_string(),
            default_view: "Dashboards".to_string(),
            logout_view: "LogOut".to_string(),
            session_timeout_floor_ms: crate::session::SESSION_TIMEOUT_FLOOR_MS,
            sibling_classes,
        }
    }
}

/// Returns the path to the console configuration file (~/.console/console.json).
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".console").join(CONFIG_FILE))
}

/// Loads the configuration, returning defaults if the file is absent or
/// unreadable.
pub fn load_config() -> ConsoleConfig {
    config_path()
        .and_then(|p| fs::read_to_string(&p).ok())
        .and_then(|c| serde_json::from_str(&c).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ConsoleConfig::default();
        assert_eq!(config.default_view, "Dashboards");
        assert_eq!(config.logout_view, "LogOut");
        assert_eq!(
            config.sibling_classes.get("Resource"),
            config.sibling_classes.get("ResourceGroup")
        );
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: ConsoleConfig =
            serde_json::from_str(r#"{"product_name": "Acme Ops"}"#).expect("parse");
        assert_eq!(config.product_name, "Acme Ops");
        assert_eq!(config.default_view, "Dashboards");
    }
}
