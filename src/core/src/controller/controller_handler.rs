use crate::configuration::config::Config;
use crate::container_management::labeler::ContainerLabeler;
use crate::error_handling::types::*;
use crate::network::connection_filter::ConnectionFilter;
use crate::network::conntrack_source::FlowSource;
use crate::network::flow_record::FlowRecord;
use crate::network::port_source::ListeningPortSource;
use crate::reporting::snapshot::build_snapshot_text;
use crate::reporting::views::SessionViews;
use crate::session_management::expiry::ExpiryPolicy;
use crate::session_management::session_manager::{Reconciliation, SessionManager};
use crate::storage::storage_trait::StatsStorage;
use crate::storage::types::{theme_index, EndedSession, StatsDocument, THEMES};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;

/// Outcome of one poll.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub reconciliation: Reconciliation,
    /// Sessions finalized during this poll, already archived.
    pub ended: Vec<EndedSession>,
    pub views: SessionViews,
    pub active_sessions: usize,
}

/// Owner of all watcher state and driver of the polling loop.
///
/// One poll is [`Controller::tick`]: reconcile the snapshot, expire vanished sessions into
/// the history archive, rebuild the views. [`Controller::run`] repeats it at the configured
/// interval and takes care of autosave, operator save requests and the final flush.
///
/// # Fields Overview
///
/// - `config`: tunables, fixed at startup
/// - `filter`: admission toggles, flipped by the operator at runtime
/// - `sessions`: the session store
/// - `stats`: the persisted document, mutated in memory between saves
/// - `storage`, `labeler`, `ports`: external capabilities
/// - `status`: last operator-facing message
pub struct Controller {
    config: Config,
    filter: ConnectionFilter,
    sessions: SessionManager,
    stats: StatsDocument,
    storage: Box<dyn StatsStorage>,
    labeler: Box<dyn ContainerLabeler>,
    ports: Box<dyn ListeningPortSource>,
    last_autosave: Instant,
    status: String,
}

impl Controller {
    /// Validates `config` and loads the persisted stats document.
    pub fn new(
        config: Config,
        storage: Box<dyn StatsStorage>,
        labeler: Box<dyn ContainerLabeler>,
        ports: Box<dyn ListeningPortSource>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;

        let mut stats = storage.load();
        let evicted = stats.ended_history.enforce_capacity(config.history_size);
        if evicted > 0 {
            info!(
                "Dropped {} history record(s) beyond the configured capacity of {}",
                evicted, config.history_size
            );
        }

        let status = format!("Stats: {}", storage.location());
        info!(
            "Controller ready: poll every {:?}, grace {:?}, history capacity {}",
            config.poll_interval(),
            config.grace_period(),
            config.history_size
        );

        Ok(Self {
            filter: ConnectionFilter::new(&config.filters),
            sessions: SessionManager::new(ExpiryPolicy::new(config.grace_period())),
            stats,
            storage,
            labeler,
            ports,
            last_autosave: Instant::now(),
            status,
            config,
        })
    }

    /// Watched ports for the next poll. Admin ports are left out while hide-admin is on.
    pub fn watched_ports(&self) -> BTreeSet<u16> {
        let watched = self.ports.watched_ports();
        if self.filter.hide_admin {
            return watched
                .difference(self.filter.admin_ports())
                .copied()
                .collect();
        }
        watched
    }

    /// Runs one poll over `records`, observed at `now`.
    pub fn tick(&mut self, records: &[FlowRecord], now: Instant) -> TickReport {
        let watched = self.watched_ports();
        let reconciliation = self.sessions.reconcile(
            records,
            &watched,
            &self.filter,
            &mut self.stats.lifetime_port_hits,
            now,
        );

        let expired = self
            .sessions
            .cleanup_expired_sessions(&reconciliation.seen_keys, now);
        let ended_ts = Utc::now();
        let ended: Vec<EndedSession> = expired
            .into_iter()
            .map(|session| {
                let container = self.labeler.label_for_port(session.dst_port());
                session.finalize(ended_ts, container)
            })
            .collect();
        if !ended.is_empty() {
            for record in &ended {
                debug!(
                    "Session {}:{} -> {} ended after {}s [{}]",
                    record.src, record.sport, record.dport, record.duration_s, record.container
                );
            }
            self.stats
                .ended_history
                .extend(ended.iter().cloned(), self.config.history_size);
        }

        let views = SessionViews::build(
            self.sessions.active_sessions(),
            &self.stats.ended_history,
            self.config.top_n,
            now,
        );

        TickReport {
            active_sessions: self.sessions.get_active_session_count(),
            reconciliation,
            ended,
            views,
        }
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        self.storage.save(&mut self.stats)?;
        let text = build_snapshot_text(
            &self.stats,
            &self.filter,
            self.config.snapshot_rows,
            Utc::now(),
        );
        self.storage.write_snapshot(&text)
    }

    /// Writes the stats document and the snapshot report right away.
    pub fn save_now(&mut self) -> Result<(), StorageError> {
        match self.persist() {
            Ok(()) => {
                self.status = format!("Saved stats + snapshot ({})", self.storage.location());
                Ok(())
            }
            Err(e) => {
                warn!("Save failed: {}", e);
                self.status = format!("Save failed: {}", e);
                Err(e)
            }
        }
    }

    /// Saves if the autosave interval has elapsed since the previous attempt. A failed
    /// attempt is retried at the next interval, not on the next poll.
    pub fn maybe_autosave(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_autosave) < self.config.autosave_interval() {
            return false;
        }
        self.last_autosave = now;
        match self.persist() {
            Ok(()) => {
                debug!("Autosaved to {}", self.storage.location());
                self.status = format!(
                    "Autosaved stats + snapshot ({}s)",
                    self.config.autosave_interval().as_secs()
                );
                true
            }
            Err(e) => {
                warn!("Autosave failed: {}", e);
                self.status = format!("Autosave failed: {}", e);
                false
            }
        }
    }

    /// Clears the lifetime port counters and saves. The history archive is kept.
    pub fn reset_lifetime_hits(&mut self) -> Result<(), StorageError> {
        self.stats.reset_lifetime_hits();
        info!("Lifetime port hits reset");
        self.save_now()?;
        self.status = String::from("Lifetime port hits reset and saved");
        Ok(())
    }

    pub fn toggle_hide_private(&mut self) -> bool {
        self.filter.hide_private = !self.filter.hide_private;
        self.status = format!("Private sources: {}", label(self.filter.hide_private));
        self.filter.hide_private
    }

    pub fn toggle_hide_admin(&mut self) -> bool {
        self.filter.hide_admin = !self.filter.hide_admin;
        self.status = format!("Admin ports: {}", label(self.filter.hide_admin));
        self.filter.hide_admin
    }

    /// Moves to the next theme name and returns it. The choice is persisted with the stats.
    pub fn cycle_theme(&mut self) -> &str {
        let next = (theme_index(&self.stats.theme) + 1) % THEMES.len();
        self.stats.theme = THEMES[next].to_string();
        self.status = format!("Theme -> {} ({:02}/{})", THEMES[next], next + 1, THEMES.len());
        &self.stats.theme
    }

    pub fn toggle_established_only(&mut self) -> bool {
        self.filter.established_only = !self.filter.established_only;
        self.status = format!("Mode: {}", self.filter.mode_label());
        self.filter.established_only
    }

    /// Final flush of the stats document. Failures are logged only.
    pub fn shutdown(&mut self) {
        info!("Shutting down, saving stats");
        match self.storage.save(&mut self.stats) {
            Ok(()) => self.status = String::from("Stats saved on exit"),
            Err(e) => {
                warn!("Final save failed: {}", e);
                self.status = format!("Final save failed: {}", e);
            }
        }
    }

    /// Polls `source` until SIGINT or SIGTERM, then flushes. On Unix, SIGUSR1 requests an
    /// immediate save of stats and snapshot.
    pub async fn run<F: FlowSource>(&mut self, source: &mut F) -> Result<(), ControllerError> {
        let stop = Arc::new(AtomicBool::new(false));
        let save_requested = Arc::new(AtomicBool::new(false));
        install_signal_handlers(Arc::clone(&stop), Arc::clone(&save_requested))?;
        self.run_until(source, stop, save_requested).await
    }

    /// The polling loop proper. `stop` is checked before every poll.
    pub async fn run_until<F: FlowSource>(
        &mut self,
        source: &mut F,
        stop: Arc<AtomicBool>,
        save_requested: Arc<AtomicBool>,
    ) -> Result<(), ControllerError> {
        info!("Polling every {:?}", self.config.poll_interval());
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.last_autosave = tokio::time::Instant::now().into_std();

        while !stop.load(Ordering::SeqCst) {
            ticker.tick().await;
            if stop.load(Ordering::SeqCst) {
                break;
            }

            let records = match source.fetch().await {
                Ok(records) => records,
                Err(e) => {
                    warn!("No flow data this poll: {}", e);
                    Vec::new()
                }
            };
            let now = tokio::time::Instant::now().into_std();
            let report = self.tick(&records, now);
            debug!(
                "Poll: {} record(s) admitted, {} active, {} ended",
                report.reconciliation.total(),
                report.active_sessions,
                report.ended.len()
            );

            if save_requested.swap(false, Ordering::SeqCst) {
                // failure already reported through the status message
                let _ = self.save_now();
            }
            self.maybe_autosave(now);
        }

        self.shutdown();
        Ok(())
    }

    pub fn filter(&self) -> &ConnectionFilter {
        &self.filter
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn stats(&self) -> &StatsDocument {
        &self.stats
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

fn label(hidden: bool) -> &'static str {
    if hidden {
        "HIDE"
    } else {
        "SHOW"
    }
}

fn install_signal_handlers(
    stop: Arc<AtomicBool>,
    save_requested: Arc<AtomicBool>,
) -> Result<(), ControllerError> {
    let interrupt = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            interrupt.store(true, Ordering::SeqCst);
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate()).map_err(|e| {
            ControllerError::InitializationFailed(format!("SIGTERM handler: {}", e))
        })?;
        let mut user1 = signal(SignalKind::user_defined1()).map_err(|e| {
            ControllerError::InitializationFailed(format!("SIGUSR1 handler: {}", e))
        })?;

        tokio::spawn(async move {
            if terminate.recv().await.is_some() {
                info!("SIGTERM received, stopping");
                stop.store(true, Ordering::SeqCst);
            }
        });
        tokio::spawn(async move {
            while user1.recv().await.is_some() {
                info!("Save requested");
                save_requested.store(true, Ordering::SeqCst);
            }
        });
    }
    #[cfg(not(unix))]
    {
        let _ = (stop, save_requested);
    }

    Ok(())
}
