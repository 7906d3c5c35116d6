//! NutriPharm core — the decision logic behind a pharmacy's prenatal
//! supplement consultations.
//!
//! Two independent components: the pure recommendation rule engine
//! (`recommendation`) and the record-sync reconciler (`sync`). Everything
//! around them — forms, printing, admin screens — lives in the UI layer and
//! talks to this crate through `PharmacyState` and the two entry points.

pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod recommendation;
pub mod sync;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the host application. Call once at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
