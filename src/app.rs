//! Application orchestration: full compile run, manifest, bundle and the
//! interactive watch loop.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::bundle::Bundler;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{
    ExcelFileManager, ExcelManagerOptions, IncludeFileManager, MetaCalculator, ProgressEvent,
    ProgressReceiver, META_SRC_FILE,
};
use crate::watcher::{self, DebounceState, DirWatcher, WATCH_THROTTLE};

#[derive(Default)]
struct Stats {
    files: AtomicUsize,
    mocks: AtomicUsize,
    assets: AtomicUsize,
}

pub struct App {
    config: Config,
    excel: ExcelFileManager,
    includes: Option<IncludeFileManager>,
    stats: Arc<Stats>,
}

impl App {
    /// Prepare the destination directory and construct the managers.
    pub fn new(config: Config) -> Result<App> {
        if config.clean_dest_dir_on_start && config.dest_dir.exists() {
            std::fs::remove_dir_all(&config.dest_dir)?;
        }
        std::fs::create_dir_all(&config.dest_dir)?;

        let mut excel = ExcelFileManager::new(ExcelManagerOptions {
            src_dir: config.source_dir.clone(),
            dest_dir: config.dest_dir.clone(),
            with_hashing: config.with_meta,
            eol: config.eol,
            skip_fields_starting_with: config.skip_fields_starting_with.clone(),
            source_pattern: config.source_pattern.clone(),
        })?;

        let stats = Arc::new(Stats::default());
        spawn_progress_drain(excel.subscribe(), Arc::clone(&stats));

        let includes = match &config.include_dir {
            Some(dir) => {
                let mut mgr =
                    IncludeFileManager::new(dir.clone(), config.dest_dir.clone(), config.with_meta)?;
                spawn_progress_drain(mgr.subscribe(), Arc::clone(&stats));
                Some(mgr)
            }
            None => None,
        };

        Ok(App {
            config,
            excel,
            includes,
            stats,
        })
    }

    /// Full run: scan everything, write the manifest and the bundle, then
    /// optionally stay resident watching for changes.
    pub async fn run(&mut self) -> Result<()> {
        let started = Instant::now();

        self.excel.process_all().await?;
        if let Some(includes) = &mut self.includes {
            includes.process_all()?;
        }

        info!(
            "processed {} files, {} mocks, {} assets in {:.2?}",
            self.stats.files.load(Ordering::Relaxed),
            self.stats.mocks.load(Ordering::Relaxed),
            self.stats.assets.load(Ordering::Relaxed),
            started.elapsed()
        );

        self.rebuild_outputs()?;

        if self.config.watch {
            self.watch().await?;
        }
        Ok(())
    }

    /// Recompute the manifest and the bundle from the managers' current
    /// state. Called after the full scan and after every watch rebuild.
    fn rebuild_outputs(&self) -> Result<()> {
        if self.config.with_meta {
            let empty = std::collections::BTreeMap::new();
            let include_hashes = self
                .includes
                .as_ref()
                .map(|m| m.file_hash_map())
                .unwrap_or(&empty);
            MetaCalculator::new(self.config.eol).build_and_save(
                &self.config.dest_dir,
                self.excel.file_hash_map(),
                self.excel.mock_hash_map(),
                include_hashes,
            )?;
        }

        if self.config.no_bundle {
            return Ok(());
        }
        let bundle_path = match &self.config.bundle_path {
            Some(path) => path.clone(),
            None => return Ok(()),
        };

        let mut names = self.excel.test_object_list();
        if let Some(includes) = &self.includes {
            names.extend(includes.test_object_list());
        }
        if self.config.with_meta {
            names.push(META_SRC_FILE.to_string());
        }

        let bundler = Bundler::new(
            self.config.dest_dir.clone(),
            bundle_path,
            self.config.bundle_format,
        );
        let size = bundler.bundle(&names)?;
        info!(
            "bundled {} files into {} ({size} bytes)",
            names.len(),
            bundler.bundle_path().display()
        );
        Ok(())
    }

    async fn watch(&mut self) -> Result<()> {
        // Directory 0 is the workbook source; the rest belong to includes.
        let mut dirs: Vec<PathBuf> = vec![self.excel.src_dir().to_path_buf()];
        if let Some(includes) = &self.includes {
            dirs.extend(includes.src_dirs());
        }

        let (root, folded) = watcher::fold_common_prefix(&dirs);
        info!("watching {root} [{}]", folded.join(", "));
        let interactive = std::io::stdin().is_terminal();
        if interactive {
            info!("press q or Ctrl-C to stop");
        }

        let mut dir_watcher = DirWatcher::new(&dirs)?;
        let mut debounce: Vec<DebounceState> =
            (0..dirs.len()).map(|_| DebounceState::default()).collect();
        #[cfg(unix)]
        let _raw_input = if interactive {
            raw_input::RawInputGuard::enable()
        } else {
            None
        };
        let mut quit_rx = spawn_quit_listener(interactive);
        let mut quit_open = true;

        loop {
            tokio::select! {
                change = dir_watcher.recv() => {
                    let change = match change {
                        Some(change) => change,
                        None => break,
                    };
                    self.handle_change(change, &mut debounce).await;
                }
                quit = quit_rx.recv(), if quit_open => {
                    match quit {
                        Some(()) => {
                            info!("stopping watch");
                            break;
                        }
                        // Closed channel means stdin is not interactive.
                        None => quit_open = false,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("stopping watch");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_change(&mut self, change: watcher::Change, debounce: &mut [DebounceState]) {
        if watcher::should_skip(&change.path) {
            return;
        }
        if change.dir_index == 0 {
            let matches = change
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| self.excel.matches_source(n))
                .unwrap_or(false);
            if !matches {
                return;
            }
        }
        if !debounce[change.dir_index].should_fire(change.at, WATCH_THROTTLE) {
            debug!("throttled {}", change.path.display());
            return;
        }

        info!(
            "[{}] changed: {}",
            chrono::Local::now().format("%H:%M:%S"),
            change.path.display()
        );

        let result = self.reprocess(change.dir_index, &change.path).await;
        match result {
            Ok(()) => {
                if let Err(err) = self.rebuild_outputs() {
                    report(&err);
                }
            }
            // A broken source must not tear down the watch session.
            Err(err) => report(&err),
        }

        // Events that piled up while this rebuild ran are stale; discard
        // them instead of replaying.
        debounce[change.dir_index].note_rebuild_finished(Instant::now());
    }

    async fn reprocess(&mut self, dir_index: usize, path: &std::path::Path) -> Result<()> {
        if dir_index == 0 {
            self.excel.process_one_file(path).await
        } else {
            match &mut self.includes {
                Some(includes) => includes.process_one_file(path),
                None => Err(Error::usage("change event without an include manager")),
            }
        }
    }
}

fn spawn_progress_drain(mut rx: ProgressReceiver, stats: Arc<Stats>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::FileStarted { name } => {
                    stats.files.fetch_add(1, Ordering::Relaxed);
                    info!("{name}");
                }
                ProgressEvent::MockWritten { name, row_count } => {
                    stats.mocks.fetch_add(1, Ordering::Relaxed);
                    info!("  {name} ({row_count} rows)");
                }
                ProgressEvent::AssetCopied { name } => {
                    stats.assets.fetch_add(1, Ordering::Relaxed);
                    info!("  copied {name}");
                }
            }
        }
    });
}

/// Reads stdin byte-wise on a blocking thread and signals when the user
/// presses `q` or Ctrl-D. Inactive when stdin is not a terminal so piped
/// runs never block on it.
fn spawn_quit_listener(interactive: bool) -> tokio::sync::mpsc::UnboundedReceiver<()> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    if interactive {
        std::thread::spawn(move || {
            use std::io::Read;
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 1];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => {
                        let _ = tx.send(());
                        break;
                    }
                    // 0x04 is Ctrl-D arriving as a raw byte.
                    Ok(_) if matches!(buf[0], b'q' | b'Q' | 0x04) => {
                        let _ = tx.send(());
                        break;
                    }
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
        });
    }
    rx
}

/// Takes stdin out of canonical mode so a bare `q` keypress is delivered
/// without a newline. Only input flags are touched; output processing and
/// signal keys stay as they were. Previous settings are restored on drop.
#[cfg(unix)]
mod raw_input {
    use std::os::fd::AsRawFd;

    pub struct RawInputGuard {
        fd: i32,
        original: libc::termios,
    }

    impl RawInputGuard {
        pub fn enable() -> Option<Self> {
            let fd = std::io::stdin().as_raw_fd();
            unsafe {
                let mut term: libc::termios = std::mem::zeroed();
                if libc::tcgetattr(fd, &mut term) != 0 {
                    return None;
                }
                let original = term;
                term.c_lflag &= !(libc::ICANON | libc::ECHO);
                term.c_cc[libc::VMIN] = 1;
                term.c_cc[libc::VTIME] = 0;
                if libc::tcsetattr(fd, libc::TCSANOW, &term) != 0 {
                    return None;
                }
                Some(RawInputGuard { fd, original })
            }
        }
    }

    impl Drop for RawInputGuard {
        fn drop(&mut self) {
            unsafe {
                let _ = libc::tcsetattr(self.fd, libc::TCSANOW, &self.original);
            }
        }
    }
}

/// Print one failure with its context tags.
pub fn report(err: &Error) {
    error!("{err}");
    for line in err.context_lines() {
        error!("{line}");
    }
}
