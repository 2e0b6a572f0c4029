//! Hot-reload (§4.4 "Hot reload"): a file watcher debounces config-file
//! writes, then calls `rebuild_runtime`. A second, independently-debounced
//! watcher on the configured skill paths just calls
//! `agents.reloadSkills()` — no coalescing needed there, since
//! `AgentManager::reload_skills` is itself idempotent and cheap.
//!
//! The interesting part is coalescing concurrent rebuild requests: three
//! file-system events arriving while a rebuild is mid-flight must not
//! queue three more rebuilds. [`RebuildGate`] is the coalescing primitive,
//! kept separate from the file-watching plumbing so it can be unit tested
//! without touching the filesystem.

use std::{path::PathBuf, sync::Arc, time::Duration};

use notify_debouncer_full::{DebounceEventResult, new_debouncer, notify::RecursiveMode};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use chatgate_config::schema::HotReloadConfig;

use crate::{config_bridge, state::SharedState};

#[derive(Default)]
struct GateState {
    in_flight: bool,
    pending: bool,
}

/// Coalesces concurrent rebuild requests: if a rebuild is already running
/// when a new one is requested, the new one is recorded as `pending` and
/// folded into exactly one extra rebuild once the in-flight one finishes
/// (§8 S6: three touches mid-flight ⇒ exactly one additional rebuild).
#[derive(Clone, Default)]
pub struct RebuildGate {
    state: Arc<Mutex<GateState>>,
}

impl RebuildGate {
    /// Run `rebuild` under the coalescing rule above. Returns once this
    /// call's own rebuild (or the one it coalesced into) has completed.
    pub async fn request<F, Fut>(&self, reason: &'static str, rebuild: F)
    where
        F: Fn(&'static str) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        {
            let mut guard = self.state.lock().await;
            if guard.in_flight {
                guard.pending = true;
                debug!(reason, "rebuild already in flight, coalescing");
                return;
            }
            guard.in_flight = true;
        }

        loop {
            rebuild(reason).await;
            let mut guard = self.state.lock().await;
            if guard.pending {
                guard.pending = false;
                drop(guard);
                debug!(reason, "running one coalesced rebuild after the in-flight one finished");
                continue;
            }
            guard.in_flight = false;
            break;
        }
    }
}

/// Owns the config/skill file watchers and the background tasks draining
/// their debounced events. Dropping this without calling
/// [`ReloadCoordinator::shutdown`] leaves the watcher tasks running until
/// the process exits.
pub struct ReloadCoordinator {
    _config_watcher: Option<notify_debouncer_full::Debouncer<notify_debouncer_full::notify::RecommendedWatcher, notify_debouncer_full::RecommendedCache>>,
    _skill_watcher: Option<notify_debouncer_full::Debouncer<notify_debouncer_full::notify::RecommendedWatcher, notify_debouncer_full::RecommendedCache>>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl ReloadCoordinator {
    /// Install watchers per the configured debounce intervals. `config_path
    /// = None` disables hot reload entirely (e.g. in tests), though the
    /// skill-path watcher still installs if `skill_paths` is non-empty.
    #[must_use]
    pub fn spawn(state: SharedState, config_path: Option<&std::path::Path>, hot_reload: HotReloadConfig) -> Self {
        let gate = RebuildGate::default();
        let mut tasks = Vec::new();

        let config_watcher = config_path.map(|path| {
            let (tx, mut rx) = mpsc::unbounded_channel::<()>();
            let debouncer = match new_debouncer(
                Duration::from_millis(hot_reload.config_debounce_ms.max(1)),
                None,
                move |result: DebounceEventResult| {
                    if result.is_ok() {
                        let _ = tx.send(());
                    }
                },
            ) {
                Ok(mut d) => {
                    if let Err(err) = d.watch(path, RecursiveMode::NonRecursive) {
                        warn!(path = %path.display(), error = %err, "failed to watch config file for hot reload");
                    }
                    Some(d)
                },
                Err(err) => {
                    warn!(error = %err, "failed to install config file watcher");
                    None
                },
            };

            let state = Arc::clone(&state);
            let gate = gate.clone();
            let path = path.to_path_buf();
            tasks.push(tokio::spawn(async move {
                while rx.recv().await.is_some() {
                    // Collapse any other debounce signals that queued up
                    // while a previous rebuild was in flight (`gate` itself
                    // only coalesces callers that overlap *during* a
                    // rebuild; this loop is the sole consumer and would
                    // otherwise pop them one at a time afterwards, each
                    // triggering its own separate rebuild).
                    while rx.try_recv().is_ok() {}
                    let state = Arc::clone(&state);
                    let path = path.clone();
                    gate.request("config_changed", move |reason| {
                        let state = Arc::clone(&state);
                        let path = path.clone();
                        async move { rebuild_runtime(&state, &path, reason).await }
                    })
                    .await;
                }
            }));

            debouncer
        });

        let skill_watcher = (!hot_reload.skill_paths.is_empty()).then(|| {
            let (tx, mut rx) = mpsc::unbounded_channel::<()>();
            let debouncer = new_debouncer(
                Duration::from_millis(hot_reload.skills_debounce_ms.max(1)),
                None,
                move |result: DebounceEventResult| {
                    if result.is_ok() {
                        let _ = tx.send(());
                    }
                },
            )
            .ok()
            .map(|mut d| {
                for raw in &hot_reload.skill_paths {
                    let path = PathBuf::from(raw);
                    if let Err(err) = d.watch(&path, RecursiveMode::Recursive) {
                        warn!(path = %path.display(), error = %err, "failed to watch skill path");
                    }
                }
                d
            });

            let state = Arc::clone(&state);
            tasks.push(tokio::spawn(async move {
                while rx.recv().await.is_some() {
                    info!("skill path changed, reloading skills");
                    if let Err(err) = state.collaborators.agent.reload_skills().await {
                        warn!(error = %err, "skill reload failed");
                    }
                }
            }));

            debouncer
        });

        Self { _config_watcher: config_watcher, _skill_watcher: skill_watcher, tasks }
    }

    /// Stop the watcher tasks. The underlying `notify` watchers are
    /// dropped along with `self`, which tears down their OS-level watches.
    pub async fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

/// §4.4 "Hot reload": stop every started channel account, reload config
/// from disk, recompute account specs, start the new set, swap the config
/// into `state`, and push the new config to the agent collaborator.
async fn rebuild_runtime(state: &SharedState, config_path: &std::path::Path, reason: &'static str) {
    info!(reason, path = %config_path.display(), "rebuilding runtime");

    let new_config = match chatgate_config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(error = %err, "hot reload: failed to load config, keeping the running configuration");
            return;
        },
    };

    {
        let mut registry = state.channels.write().await;
        let mut started = state.started_accounts.write().await;
        for (channel_type, account_id) in started.drain(..) {
            let Some(plugin) = registry.get_mut(&channel_type) else { continue };
            if let Err(err) = plugin.stop_account(&account_id).await {
                warn!(channel_type, account_id, error = %err, "failed to stop channel account during reload");
            }
        }

        let mut newly_started = Vec::new();
        for spec in config_bridge::account_specs(&new_config) {
            match registry.get_mut(spec.channel_type) {
                Some(plugin) => match plugin.start_account(&spec.account_id, spec.config).await {
                    Ok(()) => newly_started.push((spec.channel_type.to_string(), spec.account_id)),
                    Err(err) => warn!(
                        channel = spec.channel_type,
                        account_id = %spec.account_id,
                        error = %err,
                        "channel account failed to restart after reload"
                    ),
                },
                None => warn!(channel = spec.channel_type, "no plugin registered for channel type"),
            }
        }
        *started = newly_started;
    }

    if let Err(err) = state.collaborators.agent.reload_config(serde_json::to_value(&new_config).unwrap_or_default()).await {
        warn!(error = %err, "agent collaborator rejected the reloaded config");
    }

    *state.config.write().await = Arc::new(new_config);
    info!("runtime rebuild complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_requests_coalesce_into_one_extra_rebuild() {
        let gate = RebuildGate::default();
        let count = Arc::new(AtomicUsize::new(0));

        let rebuild = {
            let count = Arc::clone(&count);
            move |_reason: &'static str| {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        };

        // First request starts a rebuild that takes 50ms. Two more arrive
        // while it's in flight and must coalesce into exactly one more.
        let first = {
            let gate = gate.clone();
            let rebuild = rebuild.clone_fn();
            tokio::spawn(async move { gate.request("first", rebuild).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.request("second", rebuild.clone_fn()).await;
        gate.request("third", rebuild.clone_fn()).await;
        first.await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2, "expected exactly one coalesced rebuild after the first");
    }

    #[tokio::test]
    async fn sequential_requests_each_run() {
        let gate = RebuildGate::default();
        let count = Arc::new(AtomicUsize::new(0));
        let rebuild = {
            let count = Arc::clone(&count);
            move |_reason: &'static str| {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }
        };

        gate.request("a", rebuild.clone_fn()).await;
        gate.request("b", rebuild.clone_fn()).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    // `Fn` closures that capture a `Clone` counter need to be cloned per
    // call site above; this trivial helper avoids repeating the closure
    // literal.
    trait CloneFn: Clone {
        fn clone_fn(&self) -> Self {
            self.clone()
        }
    }
    impl<T: Clone> CloneFn for T {}

    /// Mirrors the production config-watcher consumer loop in `spawn`:
    /// a single task draining an mpsc channel and folding each batch
    /// through `RebuildGate`. Three signals queued before the consumer
    /// ever runs must still collapse into one rebuild, not three.
    #[tokio::test]
    async fn queued_signals_collapse_into_a_single_rebuild() {
        let gate = RebuildGate::default();
        let count = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        tx.send(()).unwrap();
        tx.send(()).unwrap();
        tx.send(()).unwrap();

        let rebuild = {
            let count = Arc::clone(&count);
            move |_reason: &'static str| {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }
        };

        while rx.recv().await.is_some() {
            while rx.try_recv().is_ok() {}
            gate.request("config_changed", rebuild.clone_fn()).await;
            break;
        }

        assert_eq!(count.load(Ordering::SeqCst), 1, "three signals queued before consumption should collapse into one rebuild");
    }
}
