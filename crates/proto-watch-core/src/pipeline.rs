//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Primary watch pipeline and generation lifecycle."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! Watch/dispatch pipeline.
//!
//! The pipeline subscribes to the watched folder, dispatches one generation
//! attempt per matching file found by the initial scan, then one attempt per
//! create or modify notification. Attempts run concurrently with no per-file
//! exclusion. Successful attempts hand their completion to a single consumer
//! through a channel of capacity 1; the consumer starts one compiler task per
//! completion.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use proto_watch_common::{log_pipeline_event, AppConfig, EventContext, EventOutcome};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::compiler::SchemaCompiler;
use crate::debounce::Debouncer;
use crate::error::{PipelineError, Result};
use crate::generate::Generator;
use crate::job::{GenerationComplete, SourceFilter};
use crate::status::StatusBoard;

const COMPLETION_CAPACITY: usize = 1;
const MIN_DEBOUNCE_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Scanning,
    Watching,
    Closed,
}

pub struct WatchPipeline {
    watch_dir: PathBuf,
    generator: Arc<Generator>,
    compiler: Arc<dyn SchemaCompiler>,
    status: StatusBoard,
    debounce: Duration,
}

impl WatchPipeline {
    pub fn new(
        watch_dir: impl Into<PathBuf>,
        generator: Generator,
        compiler: Arc<dyn SchemaCompiler>,
        status: StatusBoard,
    ) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            generator: Arc::new(generator),
            compiler,
            status,
            debounce: Duration::ZERO,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        compiler: Arc<dyn SchemaCompiler>,
        status: StatusBoard,
    ) -> Self {
        Self::new(
            &config.watch_folder,
            Generator::from_config(config),
            compiler,
            status,
        )
        .with_debounce(Duration::from_millis(config.debounce_ms))
    }

    /// Coalesce notifications per path for `window` before dispatching.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Subscribe, run the initial scan and start the watch loop.
    ///
    /// Returns once the pipeline is in [`PipelineState::Watching`]. Attempts
    /// dispatched by the scan may still be running.
    pub async fn start(self) -> Result<PipelineHandle> {
        let (state_tx, state_rx) = watch::channel(PipelineState::Idle);
        let (shutdown_tx, _) = broadcast::channel(4);
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CAPACITY);

        let consumer = spawn_consumer(
            completion_rx,
            self.compiler.clone(),
            shutdown_tx.subscribe(),
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                if event_tx.send(result).is_err() {
                    debug!("watch loop closed; dropping filesystem notification");
                }
            },
            notify::Config::default(),
        )
        .map_err(|source| PipelineError::Watch {
            path: self.watch_dir.clone(),
            source,
        })?;
        watcher
            .watch(&self.watch_dir, RecursiveMode::NonRecursive)
            .map_err(|source| PipelineError::Watch {
                path: self.watch_dir.clone(),
                source,
            })?;

        let dispatcher = Dispatcher {
            generator: self.generator.clone(),
            completions: completion_tx,
        };

        state_tx.send_replace(PipelineState::Scanning);
        let backlog = {
            let dir = self.watch_dir.clone();
            let filter = self.generator.filter().clone();
            tokio::task::spawn_blocking(move || scan(&dir, &filter)).await??
        };
        info!(folder = %self.watch_dir.display(), backlog = backlog.len(), "initial scan dispatched");
        for path in backlog {
            dispatcher.dispatch(path);
        }

        state_tx.send_replace(PipelineState::Watching);
        let watch_loop = tokio::spawn(run_watch_loop(
            event_rx,
            dispatcher,
            self.status.clone(),
            Debouncer::new(self.debounce),
            shutdown_tx.subscribe(),
        ));

        info!(folder = %self.watch_dir.display(), debounce_ms = self.debounce.as_millis() as u64, "watching for changes");
        Ok(PipelineHandle {
            watch_dir: self.watch_dir,
            shutdown: shutdown_tx,
            state: state_tx,
            state_rx,
            status: self.status,
            watcher: Some(watcher),
            tasks: vec![watch_loop, consumer],
        })
    }
}

/// Lifecycle handle of a running pipeline.
pub struct PipelineHandle {
    watch_dir: PathBuf,
    shutdown: broadcast::Sender<()>,
    state: watch::Sender<PipelineState>,
    state_rx: watch::Receiver<PipelineState>,
    status: StatusBoard,
    watcher: Option<RecommendedWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    pub fn state(&self) -> PipelineState {
        *self.state_rx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state_rx.clone()
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Stop watching and wait for the loop and the consumer to exit.
    /// In-flight attempts and compiler tasks are not awaited.
    pub async fn shutdown(mut self) -> Result<()> {
        drop(self.watcher.take());
        let _ = self.shutdown.send(());
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                error!(error = %err, "pipeline task join error");
            }
        }
        self.state.send_replace(PipelineState::Closed);
        info!(folder = %self.watch_dir.display(), "pipeline closed");
        Ok(())
    }
}

#[derive(Clone)]
struct Dispatcher {
    generator: Arc<Generator>,
    completions: mpsc::Sender<GenerationComplete>,
}

impl Dispatcher {
    fn matches(&self, path: &Path) -> bool {
        self.generator.filter().matches(path)
    }

    /// Spawn one independent generation attempt for `path`.
    fn dispatch(&self, path: PathBuf) {
        let generator = self.generator.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let source_display = path.display().to_string();
            let attempt = tokio::task::spawn_blocking(move || generator.generate(&path)).await;
            let ctx = EventContext::new().with_source(&source_display);
            match attempt {
                Ok(Ok(Some(completion))) => {
                    let schema = completion.schema_path().display().to_string();
                    log_pipeline_event(
                        Some(&ctx.clone().with_schema(&schema)),
                        "generation.completed",
                        "schema written",
                        EventOutcome::Success,
                    );
                    if completions.send(completion).await.is_err() {
                        debug!(source = %source_display, "completion consumer closed");
                    }
                }
                Ok(Ok(None)) => log_pipeline_event(
                    Some(&ctx),
                    "generation.skipped",
                    "no struct declarations",
                    EventOutcome::Skipped,
                ),
                Ok(Err(err)) => log_pipeline_event(
                    Some(&ctx),
                    "generation.failed",
                    &err.to_string(),
                    EventOutcome::Fault,
                ),
                Err(err) => {
                    error!(source = %source_display, error = %err, "generation attempt aborted")
                }
            }
        });
    }
}

/// Fan-in consumer: forwards each completion to the compiler as its own task,
/// so compilations of different schemas overlap.
fn spawn_consumer(
    mut completions: mpsc::Receiver<GenerationComplete>,
    compiler: Arc<dyn SchemaCompiler>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("completion consumer shutdown signal received");
                    break;
                }
                received = completions.recv() => {
                    let Some(completion) = received else {
                        break;
                    };
                    info!(
                        base_name = %completion.base_name,
                        output_dir = %completion.output_dir.display(),
                        "schema ready for compilation"
                    );
                    let compiler = compiler.clone();
                    tokio::spawn(async move { compiler.compile(completion).await });
                }
            }
        }
    })
}

/// Matching entries directly inside `dir`, sorted by name. Anything that is
/// not a directory counts, symlinks included. Blocking.
fn scan(dir: &Path, filter: &SourceFilter) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| PipelineError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() && filter.matches(entry.path()) {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}

async fn run_watch_loop(
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    dispatcher: Dispatcher,
    status: StatusBoard,
    mut debouncer: Debouncer,
    mut shutdown: broadcast::Receiver<()>,
) {
    let tick = debouncer.window().max(MIN_DEBOUNCE_TICK) / 2;
    let mut flush = tokio::time::interval(tick);
    flush.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("watch loop shutdown signal received");
                break;
            }
            received = events.recv() => {
                let Some(result) = received else {
                    debug!("watcher dropped; leaving watch loop");
                    break;
                };
                match result {
                    Ok(event) => {
                        for path in changed_paths(&event) {
                            status.file_changed(path);
                            if !dispatcher.matches(path) {
                                continue;
                            }
                            if debouncer.is_enabled() {
                                debouncer.record(path.to_path_buf(), Instant::now());
                            } else {
                                dispatcher.dispatch(path.to_path_buf());
                            }
                        }
                    }
                    Err(err) => warn!(error = %err, paths = ?err.paths, "watcher error"),
                }
            }
            _ = flush.tick(), if debouncer.is_enabled() => {
                for path in debouncer.drain_ready(Instant::now()) {
                    dispatcher.dispatch(path);
                }
            }
        }
    }
}

/// Paths of a notification that count as a create or modify of file content.
fn changed_paths(event: &Event) -> Vec<&Path> {
    let paths = event.paths.iter().map(PathBuf::as_path);
    match event.kind {
        EventKind::Create(CreateKind::File | CreateKind::Any) => paths.collect(),
        EventKind::Modify(ModifyKind::Metadata(_))
        | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => paths.last().into_iter().collect(),
        EventKind::Modify(_) => paths.collect(),
        _ => Vec::new(),
    }
}
