//! Filesystem watching primitives: native per-directory watches feeding a
//! channel of change notifications, plus the throttle state that coalesces
//! event bursts. Dispatching a change to the right manager is the
//! application's job.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};

use crate::error::Result;

/// Minimum spacing between two reprocessing runs for the same directory.
pub const WATCH_THROTTLE: Duration = Duration::from_millis(1000);

/// One change notification: which watched directory, which path.
#[derive(Debug)]
pub struct Change {
    pub dir_index: usize,
    pub path: PathBuf,
    pub at: Instant,
}

/// Per-directory throttle and busy gate. Editors fire several events per
/// save; only the first one within the throttle window triggers a rebuild,
/// and events that arrived while a rebuild for the directory was running
/// are dropped outright, never deferred.
#[derive(Debug, Default)]
pub struct DebounceState {
    last_fired: Option<Instant>,
    rebuild_done: Option<Instant>,
}

impl DebounceState {
    pub fn should_fire(&mut self, at: Instant, throttle: Duration) -> bool {
        if self.rebuild_done.is_some_and(|done| at < done) {
            return false;
        }
        let fire = match self.last_fired {
            None => true,
            Some(prev) => at.duration_since(prev) >= throttle,
        };
        if fire {
            self.last_fired = Some(at);
        }
        fire
    }

    /// Mark the end of a rebuild for this directory. Queued events with an
    /// earlier arrival time are discarded by [`Self::should_fire`].
    pub fn note_rebuild_finished(&mut self, at: Instant) {
        self.rebuild_done = Some(at);
    }
}

/// Owns one native watch per directory and funnels their events into a
/// single channel. Watches are non-recursive; nested include directories
/// are registered individually by the caller.
pub struct DirWatcher {
    // Kept alive for the lifetime of the watch session.
    _watchers: Vec<RecommendedWatcher>,
    rx: UnboundedReceiver<Change>,
}

impl DirWatcher {
    pub fn new(dirs: &[PathBuf]) -> Result<Self> {
        let (tx, rx) = unbounded_channel();
        let mut watchers = Vec::with_capacity(dirs.len());

        for (dir_index, dir) in dirs.iter().enumerate() {
            let mut watcher = notify::recommended_watcher(event_handler(dir_index, tx.clone()))?;
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            watchers.push(watcher);
        }

        Ok(DirWatcher {
            _watchers: watchers,
            rx,
        })
    }

    pub async fn recv(&mut self) -> Option<Change> {
        self.rx.recv().await
    }
}

/// Only create and modify events describe new content; access, metadata
/// and removal events must not trigger rebuilds.
fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn event_handler(
    dir_index: usize,
    tx: UnboundedSender<Change>,
) -> impl Fn(notify::Result<notify::Event>) {
    move |event| match event {
        Ok(event) => {
            if !is_content_change(&event.kind) {
                return;
            }
            for path in event.paths {
                // The receiver disappears only when the watch session ends.
                let _ = tx.send(Change {
                    dir_index,
                    path,
                    at: Instant::now(),
                });
            }
        }
        Err(err) => {
            // A failing watch must not tear down the session.
            error!("watch error: {err}");
        }
    }
}

/// True for paths the watcher should never react to: editor lock files and
/// anything that is not a regular file by the time we look at it.
pub fn should_skip(path: &std::path::Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return true,
    };
    if name.starts_with('~') {
        return true;
    }
    match std::fs::metadata(path) {
        Ok(meta) => !meta.is_file(),
        Err(err) => {
            // Deleted before we got here, which is fine.
            debug!("skipping {}: {err}", path.display());
            true
        }
    }
}

/// Watched directory list for the start banner, with the longest common
/// ancestor folded out.
pub fn fold_common_prefix(dirs: &[PathBuf]) -> (String, Vec<String>) {
    if dirs.is_empty() {
        return (String::new(), Vec::new());
    }
    if dirs.len() == 1 {
        return (dirs[0].display().to_string(), vec![".".to_string()]);
    }

    let mut prefix: Vec<std::path::Component> = dirs[0].components().collect();
    for dir in &dirs[1..] {
        let components: Vec<_> = dir.components().collect();
        let common = prefix
            .iter()
            .zip(components.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(common);
    }

    let root: PathBuf = prefix.iter().collect();
    let rest = dirs
        .iter()
        .map(|dir| match dir.strip_prefix(&root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => dir.display().to_string(),
        })
        .collect();
    (root.display().to_string(), rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_coalesces_to_one_fire() {
        let mut state = DebounceState::default();
        let t0 = Instant::now();
        assert!(state.should_fire(t0, WATCH_THROTTLE));
        assert!(!state.should_fire(t0 + Duration::from_millis(100), WATCH_THROTTLE));
        assert!(!state.should_fire(t0 + Duration::from_millis(900), WATCH_THROTTLE));
        assert!(state.should_fire(t0 + Duration::from_millis(1000), WATCH_THROTTLE));
    }

    #[test]
    fn fire_resets_the_window() {
        let mut state = DebounceState::default();
        let t0 = Instant::now();
        assert!(state.should_fire(t0, WATCH_THROTTLE));
        let t1 = t0 + Duration::from_millis(1500);
        assert!(state.should_fire(t1, WATCH_THROTTLE));
        assert!(!state.should_fire(t1 + Duration::from_millis(100), WATCH_THROTTLE));
    }

    #[test]
    fn busy_period_events_are_dropped_not_deferred() {
        let mut state = DebounceState::default();
        let t0 = Instant::now();
        assert!(state.should_fire(t0, WATCH_THROTTLE));

        // Rebuild runs for 2 s; an event lands midway, well past the
        // throttle window, and still must not fire afterwards.
        let during_rebuild = t0 + Duration::from_millis(1500);
        let rebuild_done = t0 + Duration::from_millis(2000);
        state.note_rebuild_finished(rebuild_done);
        assert!(!state.should_fire(during_rebuild, WATCH_THROTTLE));

        let after_rebuild = rebuild_done + Duration::from_millis(1);
        assert!(state.should_fire(after_rebuild, WATCH_THROTTLE));
    }

    #[test]
    fn only_content_changes_qualify() {
        use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_content_change(&EventKind::Access(AccessKind::Read)));
        assert!(!is_content_change(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_content_change(&EventKind::Any));
    }

    #[test]
    fn lock_file_names_are_skipped() {
        assert!(should_skip(std::path::Path::new("/src/~$orders.xlsx")));
    }

    #[test]
    fn common_prefix_folding() {
        let dirs = vec![
            PathBuf::from("/proj/xlsx"),
            PathBuf::from("/proj/extra/assets"),
        ];
        let (root, rest) = fold_common_prefix(&dirs);
        assert_eq!(root, "/proj");
        assert_eq!(rest, vec!["xlsx".to_string(), "extra/assets".to_string()]);
    }

    #[test]
    fn single_dir_is_its_own_root() {
        let (root, rest) = fold_common_prefix(&[PathBuf::from("/proj/xlsx")]);
        assert_eq!(root, "/proj/xlsx");
        assert_eq!(rest, vec![".".to_string()]);
    }
}
