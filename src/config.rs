use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "NutriPharm";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/NutriPharm/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("NutriPharm")
}

/// Path of the local store database.
pub fn db_path() -> PathBuf {
    app_data_dir().join("nutripharm.db")
}

/// Pharmacy identity shown on printed consultation sheets. Persisted under
/// its own key like the catalog and records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyConfig {
    pub pharmacy_name: String,
    pub pharmacist_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}
