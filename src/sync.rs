//! Record-sync engine — pull/push against an opaque remote blob store.
//!
//! One shared blob per pharmacy, addressed by a short user-chosen sync code.
//! Pull merges inbound records additively (union-by-id, local preferred) and
//! replaces the catalog wholesale; push overwrites the remote blob with the
//! full local state. The protocol is deliberately asymmetric: local writes
//! propagate immediately via push, remote writes are only discovered by the
//! 30-second poll, so cross-device staleness is bounded by one poll interval.
//!
//! Every failure mode (offline, timeout, rejection, malformed body) is
//! non-fatal: it surfaces as a `SyncStatus`, never as an error to the caller,
//! and the next poll tick retries. Consultations keep working fully offline.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_state::PharmacyState;
use crate::models::{ConsultationRecord, Product, RecordSet};

/// Pull is cancelled after this long; push relies on the transport default.
pub const PULL_TIMEOUT: Duration = Duration::from_secs(5);

/// Remote changes are discovered at most this late.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Sync codes shorter than this (after trimming) are ignored.
const MIN_SYNC_CODE_LEN: usize = 2;

// ═══════════════════════════════════════════════════════════
// Status & payload types
// ═══════════════════════════════════════════════════════════

/// Connection status, driven only by pull/push attempts — a timer tick by
/// itself never changes it. `Offline` overrides the others whenever a
/// network-dependent operation is attempted without connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Connected { synced_at: DateTime<Utc> },
    Error,
    Offline,
}

impl SyncStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// The full remote blob: always the total state, never a diff.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemotePayload {
    #[serde(default)]
    pub records: Vec<ConsultationRecord>,
    #[serde(default)]
    pub products: Vec<Product>,
    /// Writer-side wall clock in epoch milliseconds, informational only.
    #[serde(default)]
    pub timestamp: i64,
}

// ═══════════════════════════════════════════════════════════
// Connectivity seam
// ═══════════════════════════════════════════════════════════

/// Injectable connectivity check, evaluated before any network operation.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Production default: assume online and let the transport surface failures.
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

// ═══════════════════════════════════════════════════════════
// SyncClient
// ═══════════════════════════════════════════════════════════

pub struct SyncClient {
    base_url: String,
    http: reqwest::Client,
    probe: Box<dyn ConnectivityProbe>,
    status: Mutex<SyncStatus>,
}

impl SyncClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_probe(base_url, Box::new(AlwaysOnline))
    }

    pub fn with_probe(base_url: &str, probe: Box<dyn ConnectivityProbe>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            probe,
            status: Mutex::new(SyncStatus::Idle),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(SyncStatus::Error)
    }

    fn set_status(&self, status: SyncStatus) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }

    /// Fetch the remote blob and reconcile it into local state.
    ///
    /// Inbound records are merged additively (local authoritative for ids it
    /// already holds); a non-empty inbound catalog replaces the local one
    /// wholesale. Local state is untouched on every failure path.
    pub async fn pull(&self, code: &str, state: &PharmacyState) {
        let code = code.trim();
        if code.len() < MIN_SYNC_CODE_LEN {
            return;
        }
        if !self.probe.is_online() {
            self.set_status(SyncStatus::Offline);
            return;
        }
        self.set_status(SyncStatus::Syncing);

        // Cache-busting query parameter: upstream proxies cache the blob.
        let url = format!(
            "{}/{}?t={}",
            self.base_url,
            code,
            Utc::now().timestamp_millis()
        );

        let response = match self.http.get(&url).timeout(PULL_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Sync pull failed");
                self.set_status(SyncStatus::Error);
                return;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Sync pull rejected by remote");
            self.set_status(SyncStatus::Error);
            return;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Sync pull body unreadable");
                self.set_status(SyncStatus::Error);
                return;
            }
        };

        let payload: RemotePayload = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Sync pull body malformed");
                self.set_status(SyncStatus::Error);
                return;
            }
        };

        match state.apply_remote(payload) {
            Ok((added, catalog_replaced)) => {
                tracing::info!(added, catalog_replaced, "Sync pull merged");
                self.set_status(SyncStatus::Connected {
                    synced_at: Utc::now(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sync pull could not persist");
                self.set_status(SyncStatus::Error);
            }
        }
    }

    /// Overwrite the remote blob with the full local state. Best effort:
    /// never raises, never blocks the consultation workflow.
    ///
    /// Known limitation: no diffing and no remote-conflict detection, so two
    /// devices editing the *catalog* concurrently lose one side silently
    /// (records survive via the additive merge on pull).
    pub async fn push(&self, code: &str, records: &RecordSet, products: &[Product]) {
        let code = code.trim();
        if code.is_empty() {
            return;
        }
        if !self.probe.is_online() {
            self.set_status(SyncStatus::Offline);
            return;
        }
        self.set_status(SyncStatus::Syncing);

        let payload = RemotePayload {
            records: records.to_vec(),
            products: products.to_vec(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Sync push could not serialize");
                self.set_status(SyncStatus::Error);
                return;
            }
        };

        // text/plain keeps the original transport preflight-free.
        let result = self
            .http
            .post(format!("{}/{}", self.base_url, code))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(records = records.len(), "Sync push accepted");
                self.set_status(SyncStatus::Connected {
                    synced_at: Utc::now(),
                });
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Sync push rejected by remote");
                self.set_status(SyncStatus::Error);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sync push failed");
                self.set_status(SyncStatus::Error);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Poll scheduler
// ═══════════════════════════════════════════════════════════

/// Handle for the background poll task.
///
/// The task is parameterized by the sync code at creation: changing the code
/// means tearing this handle down and starting a new one. Dropped handles
/// abort the task.
pub struct SyncScheduler {
    handle: tokio::task::JoinHandle<()>,
}

impl SyncScheduler {
    /// Pull once immediately, then on the fixed 30-second interval.
    pub fn start(client: Arc<SyncClient>, state: Arc<PharmacyState>, code: String) -> Self {
        Self::start_with_interval(client, state, code, POLL_INTERVAL)
    }

    pub fn start_with_interval(
        client: Arc<SyncClient>,
        state: Arc<PharmacyState>,
        code: String,
        every: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            tracing::info!(interval_secs = every.as_secs(), "Sync scheduler started");
            let mut ticker = tokio::time::interval(every);
            loop {
                // First tick completes immediately.
                ticker.tick().await;
                let client = client.clone();
                let state = state.clone();
                let code = code.clone();
                // Each tick is an independent pull; a slow remote may cause
                // overlapping pulls, which the merge semantics tolerate.
                tokio::spawn(async move {
                    client.pull(&code, &state).await;
                });
            }
        });
        Self { handle }
    }

    /// Explicit teardown. Idempotent; also runs on Drop.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::*;
    use crate::models::{CurrentSupplements, SurveyData};
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Offline;

    impl ConnectivityProbe for Offline {
        fn is_online(&self) -> bool {
            false
        }
    }

    fn survey() -> SurveyData {
        SurveyData {
            customer_name: "한소희".into(),
            phone: None,
            note: None,
            stage: Stage::Mid,
            vitamin_d_level: VitaminDLevel::Deficient,
            hb_level: HbLevel::TwelveOrMore,
            symptoms: vec![],
            is_over_35: false,
            current_supplements: CurrentSupplements::default(),
        }
    }

    fn product(id: &str) -> Product {
        Product {
            id: id.into(),
            name: id.into(),
            price: 19000,
            ingredients: vec![],
            is_active: true,
            expiration_date: None,
            storage: StorageRequirement::Ambient,
            pill_type: None,
            usage: None,
        }
    }

    fn record() -> ConsultationRecord {
        ConsultationRecord::new(
            survey(),
            vec!["철분".into()],
            &[product("iron")],
            PurchaseStatus::Pending,
            CounselingMethod::InPerson,
            None,
        )
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Mock blob store that serves a fixed payload for any code.
    async fn serve_payload(payload: RemotePayload) -> String {
        let body = serde_json::to_string(&payload).unwrap();
        serve(Router::new().route("/:code", get(move || async move { body.clone() }))).await
    }

    async fn serve_fixed_body(body: &'static str, status: StatusCode) -> String {
        serve(Router::new().route(
            "/:code",
            get(move || async move { (status, body.to_string()) }),
        ))
        .await
    }

    // ── Pull ────────────────────────────────────────────────

    #[tokio::test]
    async fn pull_merges_remote_records_prefer_local() {
        let state = PharmacyState::open_in_memory().unwrap();
        let local = record();
        let local_id = local.id;
        state.add_record(local.clone()).unwrap();

        let mut stale = local.clone();
        stale.total_price = 1;
        let extra = record();
        let base = serve_payload(RemotePayload {
            records: vec![stale, extra.clone()],
            products: vec![],
            timestamp: Utc::now().timestamp_millis(),
        })
        .await;

        let client = SyncClient::new(&base);
        client.pull("pharm-01", &state).await;

        let records = state.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.get(&local_id).unwrap().total_price, 19000);
        assert!(records.contains(&extra.id));
        assert!(client.status().is_connected());
    }

    #[tokio::test]
    async fn pull_replaces_catalog_when_products_present() {
        let state = PharmacyState::open_in_memory().unwrap();
        state.replace_catalog(vec![product("old")]).unwrap();

        let base = serve_payload(RemotePayload {
            records: vec![],
            products: vec![product("new-a"), product("new-b")],
            timestamp: 0,
        })
        .await;

        SyncClient::new(&base).pull("pharm-01", &state).await;

        let catalog = state.catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.iter().all(|p| p.id.starts_with("new-")));
    }

    #[tokio::test]
    async fn pull_keeps_catalog_when_remote_products_empty() {
        let state = PharmacyState::open_in_memory().unwrap();
        state.replace_catalog(vec![product("keep-me")]).unwrap();

        let base = serve_payload(RemotePayload::default()).await;
        SyncClient::new(&base).pull("pharm-01", &state).await;

        assert_eq!(state.catalog().unwrap()[0].id, "keep-me");
    }

    #[tokio::test]
    async fn pull_offline_is_a_noop_with_offline_status() {
        let state = PharmacyState::open_in_memory().unwrap();
        state.add_record(record()).unwrap();
        state.replace_catalog(vec![product("iron")]).unwrap();
        let before_records = serde_json::to_string(&state.records().unwrap()).unwrap();
        let before_catalog = serde_json::to_string(&state.catalog().unwrap()).unwrap();

        let client = SyncClient::with_probe("http://127.0.0.1:1", Box::new(Offline));
        client.pull("pharm-01", &state).await;

        assert_eq!(client.status(), SyncStatus::Offline);
        let after_records = serde_json::to_string(&state.records().unwrap()).unwrap();
        let after_catalog = serde_json::to_string(&state.catalog().unwrap()).unwrap();
        assert_eq!(before_records, after_records);
        assert_eq!(before_catalog, after_catalog);
    }

    #[tokio::test]
    async fn pull_ignores_too_short_code() {
        let state = PharmacyState::open_in_memory().unwrap();
        let client = SyncClient::new("http://127.0.0.1:1");
        client.pull(" a ", &state).await;
        // Precondition fails before any transition.
        assert_eq!(client.status(), SyncStatus::Idle);
    }

    #[tokio::test]
    async fn pull_network_failure_sets_error_and_keeps_state() {
        let state = PharmacyState::open_in_memory().unwrap();
        state.add_record(record()).unwrap();

        // Nothing listens on port 1.
        let client = SyncClient::new("http://127.0.0.1:1");
        client.pull("pharm-01", &state).await;

        assert_eq!(client.status(), SyncStatus::Error);
        assert_eq!(state.records().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pull_non_2xx_sets_error() {
        let state = PharmacyState::open_in_memory().unwrap();
        let base = serve_fixed_body("gone", StatusCode::NOT_FOUND).await;
        let client = SyncClient::new(&base);
        client.pull("pharm-01", &state).await;
        assert_eq!(client.status(), SyncStatus::Error);
    }

    #[tokio::test]
    async fn pull_malformed_body_sets_error_without_mutation() {
        let state = PharmacyState::open_in_memory().unwrap();
        let base = serve_fixed_body("not json at all", StatusCode::OK).await;
        let client = SyncClient::new(&base);
        client.pull("pharm-01", &state).await;
        assert_eq!(client.status(), SyncStatus::Error);
        assert!(state.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pull_empty_body_sets_error() {
        let state = PharmacyState::open_in_memory().unwrap();
        let base = serve_fixed_body("", StatusCode::OK).await;
        let client = SyncClient::new(&base);
        client.pull("pharm-01", &state).await;
        assert_eq!(client.status(), SyncStatus::Error);
    }

    // ── Push ────────────────────────────────────────────────

    type Captured = Arc<Mutex<Vec<(String, String)>>>;

    async fn serve_capture() -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let shared = captured.clone();
        let router = Router::new()
            .route(
                "/:code",
                post(
                    |State(captured): State<Captured>,
                     headers: HeaderMap,
                     body: String| async move {
                        let content_type = headers
                            .get("content-type")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        captured.lock().unwrap().push((content_type, body));
                        StatusCode::OK
                    },
                ),
            )
            .with_state(shared);
        (serve(router).await, captured)
    }

    #[tokio::test]
    async fn push_sends_full_payload_as_text_plain() {
        let (base, captured) = serve_capture().await;

        let mut records = RecordSet::new();
        records.insert(record());
        let products = vec![product("iron"), product("cal-mag")];

        let client = SyncClient::new(&base);
        client.push("pharm-01", &records, &products).await;

        assert!(client.status().is_connected());
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (content_type, body) = &captured[0];
        assert_eq!(content_type, "text/plain");
        let payload: RemotePayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.records.len(), 1);
        assert_eq!(payload.products.len(), 2);
        assert!(payload.timestamp > 0);
    }

    #[tokio::test]
    async fn push_empty_code_is_silently_skipped() {
        let (base, captured) = serve_capture().await;
        let client = SyncClient::new(&base);
        client.push("   ", &RecordSet::new(), &[]).await;
        assert_eq!(client.status(), SyncStatus::Idle);
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_offline_skips_and_reports_offline() {
        let client = SyncClient::with_probe("http://127.0.0.1:1", Box::new(Offline));
        client.push("pharm-01", &RecordSet::new(), &[]).await;
        assert_eq!(client.status(), SyncStatus::Offline);
    }

    #[tokio::test]
    async fn push_rejection_sets_error() {
        let base = serve(Router::new().route(
            "/:code",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let client = SyncClient::new(&base);
        client.push("pharm-01", &RecordSet::new(), &[]).await;
        assert_eq!(client.status(), SyncStatus::Error);
    }

    // ── Scheduler ───────────────────────────────────────────

    async fn serve_counting(counter: Arc<AtomicUsize>) -> String {
        let router = Router::new()
            .route(
                "/:code",
                get(|State(counter): State<Arc<AtomicUsize>>| async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    serde_json::to_string(&RemotePayload::default()).unwrap()
                }),
            )
            .with_state(counter);
        serve(router).await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduler_pulls_immediately_then_periodically() {
        let counter = Arc::new(AtomicUsize::new(0));
        let base = serve_counting(counter.clone()).await;

        let state = Arc::new(PharmacyState::open_in_memory().unwrap());
        let client = Arc::new(SyncClient::new(&base));
        let scheduler = SyncScheduler::start_with_interval(
            client.clone(),
            state,
            "pharm-01".into(),
            Duration::from_millis(50),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(counter.load(Ordering::SeqCst) >= 1, "immediate pull expected");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(counter.load(Ordering::SeqCst) >= 3, "periodic pulls expected");
        assert!(client.status().is_connected());

        scheduler.shutdown();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduler_shutdown_stops_pulling() {
        let counter = Arc::new(AtomicUsize::new(0));
        let base = serve_counting(counter.clone()).await;

        let state = Arc::new(PharmacyState::open_in_memory().unwrap());
        let client = Arc::new(SyncClient::new(&base));
        let scheduler = SyncScheduler::start_with_interval(
            client,
            state,
            "pharm-01".into(),
            Duration::from_millis(50),
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        scheduler.shutdown();
        // Let any in-flight pull land before taking the baseline.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), settled);
    }
}
