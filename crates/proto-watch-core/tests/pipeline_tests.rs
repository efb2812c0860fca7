//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "tests"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Watch pipeline lifecycle against a real filesystem watcher."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use proto_watch_common::AppConfig;
use proto_watch_core::{
    GenerationComplete, PipelineState, SchemaCompiler, StatusBoard, WatchPipeline, INITIAL_STATUS,
};
use tempfile::tempdir;
use tokio::sync::Semaphore;

#[derive(Default)]
struct RecordingCompiler {
    seen: Mutex<Vec<GenerationComplete>>,
}

impl RecordingCompiler {
    fn base_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .seen
            .lock()
            .iter()
            .map(|done| done.base_name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl SchemaCompiler for RecordingCompiler {
    async fn compile(&self, completion: GenerationComplete) {
        self.seen.lock().push(completion);
    }
}

/// Holds every compilation until the test closes the gate.
struct GatedCompiler {
    started: AtomicUsize,
    gate: Semaphore,
}

impl GatedCompiler {
    fn new() -> Self {
        Self {
            started: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaCompiler for GatedCompiler {
    async fn compile(&self, _completion: GenerationComplete) {
        self.started.fetch_add(1, Ordering::SeqCst);
        // Returns once the gate is closed.
        let _permit = self.gate.acquire().await;
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

fn config_for(root: &Path) -> AppConfig {
    let watch = root.join("models");
    let out = root.join("proto");
    std::fs::create_dir_all(&watch).unwrap();
    std::fs::create_dir_all(&out).unwrap();
    let mut config = AppConfig::new(watch, out, "gen");
    config.compiler.enabled = false;
    config
}

const USER_SOURCE: &str = "package models\n\ntype User struct {\n\tID string `json:\"id\"`\n}\n";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn initial_scan_generates_existing_sources() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path());
    std::fs::write(config.watch_folder.join("users.go"), USER_SOURCE).unwrap();
    std::fs::write(config.watch_folder.join("users.pb.go"), USER_SOURCE).unwrap();
    std::fs::write(config.watch_folder.join("empty.go"), "package models\n").unwrap();
    std::fs::write(config.watch_folder.join("README.md"), "notes").unwrap();

    let compiler = Arc::new(RecordingCompiler::default());
    let handle = WatchPipeline::from_config(&config, compiler.clone(), StatusBoard::new())
        .start()
        .await
        .unwrap();
    assert_eq!(handle.state(), PipelineState::Watching);
    assert_eq!(handle.watch_dir(), config.watch_folder.as_path());
    assert_eq!(handle.status().get(), INITIAL_STATUS);

    assert!(wait_until(|| compiler.base_names() == ["users"]).await);
    assert!(config.out_folder.join("users.proto").is_file());
    assert!(!config.out_folder.join("empty.proto").exists());

    handle.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_sources_are_generated_while_watching() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path());
    let compiler = Arc::new(RecordingCompiler::default());
    let status = StatusBoard::new();
    let handle = WatchPipeline::from_config(&config, compiler.clone(), status.clone())
        .start()
        .await
        .unwrap();

    let source = config.watch_folder.join("orders.go");
    std::fs::write(
        &source,
        "package models\n\ntype OrderRequest struct{ ID int64 }\ntype OrderResponse struct{ Ok bool }\n",
    )
    .unwrap();

    assert!(wait_until(|| compiler.base_names().contains(&"orders".to_owned())).await);
    assert!(status.get().starts_with("File changed: "));
    let written = std::fs::read_to_string(config.out_folder.join("orders.proto")).unwrap();
    assert!(written.contains("rpc Order(OrderRequest) returns (OrderResponse);"));

    let mut state = handle.subscribe_state();
    handle.shutdown().await.unwrap();
    assert_eq!(*state.borrow_and_update(), PipelineState::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn debounced_pipeline_still_generates() {
    let dir = tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.debounce_ms = 100;
    let compiler = Arc::new(RecordingCompiler::default());
    let handle = WatchPipeline::from_config(&config, compiler.clone(), StatusBoard::new())
        .start()
        .await
        .unwrap();

    let source = config.watch_folder.join("users.go");
    for _ in 0..5 {
        std::fs::write(&source, USER_SOURCE).unwrap();
    }

    assert!(wait_until(|| !compiler.base_names().is_empty()).await);
    assert!(compiler.base_names().iter().all(|name| name == "users"));
    handle.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_watch_folder_fails_to_start() {
    let dir = tempdir().unwrap();
    let config = AppConfig::new(dir.path().join("absent"), dir.path().join("proto"), "gen");
    let result = WatchPipeline::from_config(
        &config,
        Arc::new(RecordingCompiler::default()),
        StatusBoard::new(),
    )
    .start()
    .await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn compilations_overlap() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path());
    std::fs::write(config.watch_folder.join("users.go"), USER_SOURCE).unwrap();
    std::fs::write(
        config.watch_folder.join("orders.go"),
        "package models\n\ntype Order struct{ ID int64 }\n",
    )
    .unwrap();

    let compiler = Arc::new(GatedCompiler::new());
    let handle = WatchPipeline::from_config(&config, compiler.clone(), StatusBoard::new())
        .start()
        .await
        .unwrap();

    // Neither compilation can finish until both have started.
    assert!(wait_until(|| compiler.started() >= 2).await);
    compiler.gate.close();

    handle.shutdown().await.unwrap();
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn initial_scan_follows_symlinked_sources() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path());
    let shared = dir.path().join("shared.go");
    std::fs::write(&shared, USER_SOURCE).unwrap();
    std::os::unix::fs::symlink(&shared, config.watch_folder.join("linked.go")).unwrap();

    let compiler = Arc::new(RecordingCompiler::default());
    let handle = WatchPipeline::from_config(&config, compiler.clone(), StatusBoard::new())
        .start()
        .await
        .unwrap();

    assert!(wait_until(|| compiler.base_names() == ["linked"]).await);
    assert!(config.out_folder.join("linked.proto").is_file());
    handle.shutdown().await.unwrap();
}
