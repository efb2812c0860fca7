//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Primary watch pipeline and generation lifecycle."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! Downstream compilation of written schema documents.
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use proto_watch_common::{log_pipeline_event, AppConfig, EventContext, EventOutcome};
use tokio::process::Command;
use tracing::info;

use crate::job::GenerationComplete;

/// Receives every completed generation attempt.
///
/// Implementations log their own failures; nothing is reported back to the
/// pipeline.
#[async_trait]
pub trait SchemaCompiler: Send + Sync + 'static {
    async fn compile(&self, completion: GenerationComplete);
}

/// Runs `protoc` and, when configured, a client stub generator such as
/// `pbjs` as independent external processes.
#[derive(Debug, Clone)]
pub struct ProtocCompiler {
    protoc: String,
    client_generator: Option<String>,
    client_out_dir: PathBuf,
}

impl ProtocCompiler {
    pub fn new(protoc: impl Into<String>) -> Self {
        Self {
            protoc: protoc.into(),
            client_generator: None,
            client_out_dir: PathBuf::from("ts-gen"),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let compiler = &config.compiler;
        let mut protoc = Self::new(&compiler.protoc);
        if let Some(generator) = &compiler.client_generator {
            protoc = protoc.with_client_generator(generator, &compiler.client_out_folder);
        }
        protoc
    }

    pub fn with_client_generator(
        mut self,
        program: impl Into<String>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        self.client_generator = Some(program.into());
        self.client_out_dir = out_dir.into();
        self
    }

    fn protoc_command(&self, completion: &GenerationComplete) -> Command {
        let mut command = Command::new(&self.protoc);
        command
            .arg(format!("--proto_path={}", completion.output_dir.display()))
            .arg("--go_out=.")
            .arg("--go-grpc_out=.")
            .arg(completion.schema_path());
        command
    }

    fn client_command(&self, program: &str, completion: &GenerationComplete) -> Command {
        let target = self
            .client_out_dir
            .join(format!("{}.pb.ts", completion.base_name));
        let mut command = Command::new(program);
        command.arg(completion.schema_path()).arg("--ts").arg(target);
        command
    }

    /// Processes inherit the current directory, which is where `--go_out=.`
    /// places the Go bindings.
    async fn run(&self, label: &'static str, mut command: Command, completion: &GenerationComplete) {
        let schema = completion.schema_path().display().to_string();
        let ctx = EventContext::new().with_schema(&schema);
        match run_captured(&mut command).await.with_context(|| format!("failed to launch {label}")) {
            Ok(output) if output.status.success() => {
                log_pipeline_event(
                    Some(&ctx),
                    &format!("{label}.completed"),
                    &combined_output(&output),
                    EventOutcome::Success,
                );
            }
            Ok(output) => {
                log_pipeline_event(
                    Some(&ctx),
                    &format!("{label}.failed"),
                    &format!("{}: {}", output.status, combined_output(&output)),
                    EventOutcome::Fault,
                );
            }
            Err(err) => {
                log_pipeline_event(
                    Some(&ctx),
                    &format!("{label}.failed"),
                    &format!("{err:#}"),
                    EventOutcome::Fault,
                );
            }
        }
    }
}

#[async_trait]
impl SchemaCompiler for ProtocCompiler {
    async fn compile(&self, completion: GenerationComplete) {
        info!(
            base_name = %completion.base_name,
            output_dir = %completion.output_dir.display(),
            "compiling schema"
        );
        let protoc = self.run("protoc", self.protoc_command(&completion), &completion);
        match &self.client_generator {
            Some(program) => {
                let client = self.run(
                    "client-generator",
                    self.client_command(program, &completion),
                    &completion,
                );
                tokio::join!(protoc, client);
            }
            None => protoc.await,
        }
    }
}

/// Used when compilation is disabled; only records the completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompiler;

#[async_trait]
impl SchemaCompiler for NoopCompiler {
    async fn compile(&self, completion: GenerationComplete) {
        let schema = completion.schema_path().display().to_string();
        log_pipeline_event(
            Some(&EventContext::new().with_schema(&schema)),
            "compile.skipped",
            "compiler disabled",
            EventOutcome::Skipped,
        );
    }
}

pub fn compiler_from_config(config: &AppConfig) -> Arc<dyn SchemaCompiler> {
    if config.compiler.enabled {
        Arc::new(ProtocCompiler::from_config(config))
    } else {
        Arc::new(NoopCompiler)
    }
}

async fn run_captured(command: &mut Command) -> Result<Output> {
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;
    Ok(output)
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr);
    }
    text
}
