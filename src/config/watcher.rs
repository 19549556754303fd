//! Hot reload of the configuration file.
//!
//! Every content change re-reads and re-validates the file. A config that
//! fails to load is logged and dropped. One identical to the last accepted
//! config is ignored, which folds the bursts of events editors produce
//! for a single save. Anything else is forwarded to the server, with the
//! trace settings that changed listed in the log.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{AgentConfig, TraceConfig};

/// Forwards validated, changed configurations from a file.
pub struct ConfigWatcher {
    path: PathBuf,
    current: AgentConfig,
    updates: mpsc::UnboundedSender<AgentConfig>,
}

impl ConfigWatcher {
    /// `current` is the config the server started with.
    pub fn new(path: &Path, current: AgentConfig) -> (Self, mpsc::UnboundedReceiver<AgentConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            updates,
        };
        (watcher, rx)
    }

    /// Start watching. Updates stop when the returned watcher is dropped.
    pub fn spawn(mut self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_content_change(&event.kind) => {
                self.reload();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Config watch error"),
        })?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Watching config file");
        Ok(watcher)
    }

    /// Re-read the file and forward it if it differs from the last
    /// accepted config. Returns the changed trace settings when forwarded.
    fn reload(&mut self) -> Option<Vec<&'static str>> {
        let next = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Config reload rejected");
                return None;
            }
        };
        if next == self.current {
            tracing::debug!(path = %self.path.display(), "Config file unchanged");
            return None;
        }

        let changed = changed_trace_settings(&self.current.trace, &next.trace);
        tracing::info!(path = %self.path.display(), trace_changes = ?changed, "Config file changed");
        if self.updates.send(next.clone()).is_err() {
            tracing::debug!("Config receiver dropped");
        }
        self.current = next;
        Some(changed)
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Any | ModifyKind::Data(_) | ModifyKind::Name(_))
    )
}

/// Names of the `[trace]` settings that differ between two configs.
pub fn changed_trace_settings(old: &TraceConfig, new: &TraceConfig) -> Vec<&'static str> {
    let checks = [
        ("enabled", old.enabled != new.enabled),
        ("application_name", old.application_name != new.application_name),
        ("agent_id", old.agent_id != new.agent_id),
        ("exclude_url", old.exclude_url != new.exclude_url),
        ("real_ip_header", old.real_ip_header != new.real_ip_header),
        ("real_ip_empty_value", old.real_ip_empty_value != new.real_ip_empty_value),
        ("sampling_rate", old.sampling_rate != new.sampling_rate),
        ("handler_api", old.handler_api != new.handler_api),
        ("param_each_limit", old.param_each_limit != new.param_each_limit),
        ("param_total_limit", old.param_total_limit != new.param_total_limit),
    ];
    checks
        .into_iter()
        .filter_map(|(name, differs)| differs.then_some(name))
        .collect()
}
