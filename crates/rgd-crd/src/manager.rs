//! Schema cache aggregated from every configured source

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::CrdConfig;
use crate::error::Result;
use crate::gvk::Gvk;
use crate::schema::SchemaRecord;
use crate::source::{CrdSource, build_sources};

/// Read access to schemas by resource type identity
pub trait SchemaLookup: Send + Sync {
    fn get_by_identity(&self, gvk: &Gvk) -> Option<Arc<SchemaRecord>>;
}

impl SchemaLookup for HashMap<Gvk, Arc<SchemaRecord>> {
    fn get_by_identity(&self, gvk: &Gvk) -> Option<Arc<SchemaRecord>> {
        self.get(gvk).cloned()
    }
}

/// Outcome of one reload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Records returned by the sources, duplicates included
    pub records: usize,
    /// Distinct identities now cached
    pub cached: usize,
    pub succeeded: Vec<String>,
    /// `(source, error)` for each failed source
    pub failed: Vec<(String, String)>,
    /// Whether the cache was swapped for the new set
    pub replaced: bool,
}

/// Called after each background reload
pub type RefreshCallback = Arc<dyn Fn(&LoadReport) + Send + Sync>;

/// Owns the sources and the identity-indexed cache built from them
pub struct CrdManager {
    config: CrdConfig,
    sources: Vec<Arc<dyn CrdSource>>,
    cache: RwLock<HashMap<Gvk, Arc<SchemaRecord>>>,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
}

impl CrdManager {
    /// Create a manager with the sources described by `config`
    pub fn new(config: CrdConfig) -> Result<Self> {
        let sources = build_sources(&config)?;
        Ok(Self::with_sources(config, sources))
    }

    /// Create a manager over explicit sources
    pub fn with_sources(config: CrdConfig, sources: Vec<Arc<dyn CrdSource>>) -> Self {
        Self {
            config,
            sources,
            cache: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &CrdConfig {
        &self.config
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Query every source and rebuild the cache.
    ///
    /// Failed sources are logged and skipped. Records are merged in source
    /// order, so a later source wins on identity clashes. The new map
    /// replaces the old one in a single write.
    pub async fn load_crds(&self) -> LoadReport {
        let loads = self.sources.iter().map(|source| async move {
            (source.name().to_string(), source.load_crds().await)
        });

        let mut report = LoadReport::default();
        let mut fresh: HashMap<Gvk, Arc<SchemaRecord>> = HashMap::new();

        for (name, result) in join_all(loads).await {
            match result {
                Ok(records) => {
                    debug!(source = %name, records = records.len(), "source loaded");
                    report.records += records.len();
                    for record in records {
                        if let Some(previous) = fresh.get(&record.gvk) {
                            debug!(
                                gvk = %record.gvk,
                                previous = %previous.origin,
                                origin = %record.origin,
                                "schema overridden by later source"
                            );
                        }
                        fresh.insert(record.gvk.clone(), Arc::new(record));
                    }
                    report.succeeded.push(name);
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "failed to load CRDs from source");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        let all_failed = !self.sources.is_empty() && report.succeeded.is_empty();
        if all_failed && self.config.keep_stale_on_failure {
            warn!(
                failed = report.failed.len(),
                "every CRD source failed, keeping previous schemas"
            );
            report.cached = self.len();
            return report;
        }

        report.cached = fresh.len();
        report.replaced = true;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        *self
            .last_refresh
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());

        info!(
            schemas = report.cached,
            sources = report.succeeded.len(),
            failed = report.failed.len(),
            "CRD cache rebuilt"
        );
        report
    }

    pub fn get_by_identity(&self, gvk: &Gvk) -> Option<Arc<SchemaRecord>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(gvk)
            .cloned()
    }

    /// Number of cached identities
    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached identities, sorted
    pub fn identities(&self) -> Vec<Gvk> {
        let mut ids: Vec<Gvk> = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Snapshot of every cached record, sorted by identity
    pub fn records(&self) -> Vec<Arc<SchemaRecord>> {
        let mut records: Vec<Arc<SchemaRecord>> = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| a.gvk.cmp(&b.gvk));
        records
    }

    /// Time of the last successful rebuild
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self
            .last_refresh
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start reloading every `refresh_interval` in the background.
    ///
    /// Each cycle is bounded by `cycle_deadline`; a cycle that overruns is
    /// abandoned and the cache keeps its previous contents. The task ends
    /// when [`RefreshHandle::stop`] is called or the handle is dropped.
    pub fn spawn_refresh(self: &Arc<Self>, on_refresh: Option<RefreshCallback>) -> RefreshHandle {
        let manager = Arc::clone(self);
        let interval = self.config.refresh_interval;
        let deadline = self.config.cycle_deadline;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial load is the caller's.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }

                let cycle = tokio::time::timeout(deadline, manager.load_crds());
                tokio::select! {
                    _ = &mut stop_rx => break,
                    result = cycle => match result {
                        Ok(report) => {
                            if let Some(callback) = &on_refresh {
                                callback(&report);
                            }
                        }
                        Err(_) => warn!(
                            deadline = ?deadline,
                            "CRD refresh cycle exceeded its deadline"
                        ),
                    },
                }
            }

            debug!("CRD refresh stopped");
        });

        RefreshHandle {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }
}

impl SchemaLookup for CrdManager {
    fn get_by_identity(&self, gvk: &Gvk) -> Option<Arc<SchemaRecord>> {
        CrdManager::get_by_identity(self, gvk)
    }
}

/// Control handle for the background refresh task
pub struct RefreshHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Signal the task and wait for it to finish
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "CRD refresh task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrdError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a scripted sequence of results, repeating the last one
    struct ScriptedSource {
        name: String,
        script: Mutex<Vec<std::result::Result<Vec<SchemaRecord>, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(name: &str, script: Vec<std::result::Result<Vec<SchemaRecord>, String>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CrdSource for ScriptedSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn load_crds(&self) -> Result<Vec<SchemaRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            };
            next.map_err(CrdError::Other)
        }
    }

    fn record(group: &str, version: &str, kind: &str, origin: &str) -> SchemaRecord {
        SchemaRecord {
            gvk: Gvk::new(group, version, kind),
            crd_name: format!("{}s.{}", kind.to_lowercase(), group),
            schema: None,
            cel_rules: Vec::new(),
            origin: origin.to_string(),
            updated_at: Utc::now(),
        }
    }

    fn manager(sources: Vec<Arc<ScriptedSource>>, keep_stale: bool) -> CrdManager {
        let sources = sources
            .into_iter()
            .map(|s| s as Arc<dyn CrdSource>)
            .collect();
        let config = CrdConfig {
            keep_stale_on_failure: keep_stale,
            ..CrdConfig::default()
        };
        CrdManager::with_sources(config, sources)
    }

    #[tokio::test]
    async fn test_failed_source_is_skipped() {
        let good = ScriptedSource::new("good", vec![Ok(vec![record("a.io", "v1", "A", "good")])]);
        let bad = ScriptedSource::new("bad", vec![Err("boom".into())]);
        let manager = manager(vec![good, bad], true);

        let report = manager.load_crds().await;
        assert_eq!(report.succeeded, vec!["good"]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.replaced);
        assert!(manager.get_by_identity(&Gvk::new("a.io", "v1", "A")).is_some());
    }

    #[tokio::test]
    async fn test_last_source_wins() {
        let first = ScriptedSource::new("first", vec![Ok(vec![record("a.io", "v1", "A", "first")])]);
        let second = ScriptedSource::new("second", vec![Ok(vec![record("a.io", "v1", "A", "second")])]);
        let manager = manager(vec![first, second], true);

        manager.load_crds().await;
        let hit = manager.get_by_identity(&Gvk::new("a.io", "v1", "A")).unwrap();
        assert_eq!(hit.origin, "second");
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_drops_missing_identity() {
        let source = ScriptedSource::new(
            "s",
            vec![
                Ok(vec![
                    record("a.io", "v1", "A", "s"),
                    record("b.io", "v1", "B", "s"),
                ]),
                Ok(vec![record("a.io", "v1", "A", "s")]),
            ],
        );
        let manager = manager(vec![source], true);

        manager.load_crds().await;
        assert!(manager.get_by_identity(&Gvk::new("b.io", "v1", "B")).is_some());

        manager.load_crds().await;
        assert!(manager.get_by_identity(&Gvk::new("a.io", "v1", "A")).is_some());
        assert!(manager.get_by_identity(&Gvk::new("b.io", "v1", "B")).is_none());
        assert!(manager.get_by_identity(&Gvk::new("a.io", "v2", "A")).is_none());
    }

    #[tokio::test]
    async fn test_total_failure_keeps_stale_cache() {
        let source = ScriptedSource::new(
            "s",
            vec![Ok(vec![record("a.io", "v1", "A", "s")]), Err("down".into())],
        );
        let manager = manager(vec![source], true);

        manager.load_crds().await;
        let report = manager.load_crds().await;
        assert!(!report.replaced);
        assert_eq!(report.cached, 1);
        assert!(manager.get_by_identity(&Gvk::new("a.io", "v1", "A")).is_some());
    }

    #[tokio::test]
    async fn test_total_failure_wipes_when_configured() {
        let source = ScriptedSource::new(
            "s",
            vec![Ok(vec![record("a.io", "v1", "A", "s")]), Err("down".into())],
        );
        let manager = manager(vec![source], false);

        manager.load_crds().await;
        manager.load_crds().await;
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_and_stop() {
        let source = ScriptedSource::new("s", vec![Ok(vec![record("a.io", "v1", "A", "s")])]);
        let config = CrdConfig {
            refresh_interval: Duration::from_secs(60),
            ..CrdConfig::default()
        };
        let sources: Vec<Arc<dyn CrdSource>> = vec![source.clone()];
        let manager = Arc::new(CrdManager::with_sources(config, sources));

        let refreshed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&refreshed);
        let handle = manager.spawn_refresh(Some(Arc::new(move |_: &LoadReport| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(refreshed.load(Ordering::SeqCst), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.len(), 1);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    /// Never finishes a load
    struct HangingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CrdSource for HangingSource {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn load_crds(&self) -> Result<Vec<SchemaRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_cycle_is_abandoned() {
        let source = Arc::new(HangingSource {
            calls: AtomicUsize::new(0),
        });
        let config = CrdConfig {
            refresh_interval: Duration::from_secs(60),
            cycle_deadline: Duration::from_secs(10),
            ..CrdConfig::default()
        };
        let sources: Vec<Arc<dyn CrdSource>> = vec![source.clone()];
        let manager = Arc::new(CrdManager::with_sources(config, sources));

        let refreshed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&refreshed);
        let handle = manager.spawn_refresh(Some(Arc::new(move |_: &LoadReport| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(refreshed.load(Ordering::SeqCst), 0);
        assert!(manager.is_empty());
        assert!(manager.last_refresh().is_none());

        handle.stop().await;
    }
}
