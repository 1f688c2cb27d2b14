//! Shared fixtures for flow tests: a fully faked host with a real temp
//! directory as the install root.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use whisvc_core::testing::{
    FakeArchiveFetcher, FakeProcessTable, MemoryConfigStore, MemoryServiceManager, ScriptedPrompt,
    ScriptedRunner, StaticHostProbe,
};
use whisvc_core::{
    CommandError, CommandOutput, CommandSpec, InstallLayout, ProcessInfo, ServiceRegistration,
    ServiceStatus, StartupType,
};
use whisvc_runtime::python::{ArchiveKind, RuntimeSource};
use whisvc_runtime::{Adapters, InstallContext, InstallLog};

pub const ARCHIVE_NAME: &str = "cpython-3.11.9-test-install_only.tar.gz";

type Rule = Box<dyn Fn(&CommandSpec) -> Option<Result<CommandOutput, CommandError>> + Send + Sync>;

/// gzip'd tar with the interpreter under a leading `python/` directory.
pub fn runtime_archive(python_body: &[u8]) -> Vec<u8> {
    let entry = Path::new("python").join(InstallLayout::python_executable(Path::new("")));
    let mut bytes = Vec::new();
    {
        let encoder = flate2::write::GzEncoder::new(&mut bytes, flate2::Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(python_body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, &entry, python_body).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }
    bytes
}

/// A service manager that already holds a registration from an earlier install.
pub fn existing_service(status: ServiceStatus) -> MemoryServiceManager {
    let registration = ServiceRegistration {
        name: "whisper-api".to_string(),
        display_name: "Whisper API Server".to_string(),
        description: String::new(),
        binary_path: PathBuf::from("/opt/whisper-api/python/bin/python3"),
        arguments: vec!["/opt/whisper-api/server.py".to_string()],
        working_directory: PathBuf::from("/opt/whisper-api"),
        startup: StartupType::Automatic,
        environment: Vec::new(),
    };
    MemoryServiceManager::default().with_service(registration, status)
}

pub fn runtime_source() -> RuntimeSource {
    RuntimeSource {
        url: format!("https://downloads.test/{ARCHIVE_NAME}"),
        kind: ArchiveKind::TarGz,
        strip_prefix: Some("python".to_string()),
        path_config: None,
    }
}

pub struct HarnessBuilder {
    host: StaticHostProbe,
    prompt: ScriptedPrompt,
    services: MemoryServiceManager,
    processes: Vec<ProcessInfo>,
    strays: Vec<(u32, PathBuf)>,
    gpu: Option<String>,
    serve_runtime: bool,
    rules: Vec<Rule>,
}

impl HarnessBuilder {
    pub fn host(mut self, host: StaticHostProbe) -> Self {
        self.host = host;
        self
    }

    pub fn prompt(mut self, prompt: ScriptedPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn services(mut self, services: MemoryServiceManager) -> Self {
        self.services = services;
        self
    }

    pub fn process(mut self, pid: u32, exe: PathBuf) -> Self {
        self.processes.push(ProcessInfo {
            pid,
            exe: Some(exe),
            parent: None,
        });
        self
    }

    /// A process whose executable is `relative` to the install path.
    pub fn stray(mut self, pid: u32, relative: impl Into<PathBuf>) -> Self {
        self.strays.push((pid, relative.into()));
        self
    }

    /// Report this `name, driver, compute_cap` line from the GPU query.
    pub fn gpu(mut self, csv_line: &str) -> Self {
        self.gpu = Some(csv_line.to_string());
        self
    }

    pub fn without_runtime_download(mut self) -> Self {
        self.serve_runtime = false;
        self
    }

    /// Checked before the built-in interpreter rule.
    pub fn rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&CommandSpec) -> Option<Result<CommandOutput, CommandError>> + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn build(self) -> Harness {
        let temp = TempDir::new().unwrap();
        let install_path = temp.path().join("whisper-api");
        let temp_logs = temp.path().join("tmp-logs");
        let mut processes = self.processes;
        processes.extend(self.strays.into_iter().map(|(pid, relative)| ProcessInfo {
            pid,
            exe: Some(install_path.join(relative)),
            parent: None,
        }));
        std::fs::create_dir_all(&temp_logs).unwrap();

        let mut gpu_tool_candidates = Vec::new();
        let mut runner = ScriptedRunner::default();
        if let Some(line) = self.gpu {
            let tool = temp.path().join("nvidia-smi");
            std::fs::write(&tool, b"").unwrap();
            gpu_tool_candidates.push(tool);
            runner = runner.respond(
                "nvidia-smi",
                "--format=csv,noheader",
                CommandOutput::ok(format!("{line}\n")),
            );
        }
        for rule in self.rules {
            runner = runner.rule(rule);
        }
        // An interpreter works only if its file says so.
        runner = runner.rule(|spec| {
            let body = std::fs::read(&spec.program).ok()?;
            Some(Ok(if body == b"GOOD" {
                CommandOutput::ok("Python 3.11.9")
            } else {
                CommandOutput::failed(1, "error while loading shared libraries")
            }))
        });

        let mut fetcher = FakeArchiveFetcher::default();
        if self.serve_runtime {
            fetcher = fetcher.serve(ARCHIVE_NAME, runtime_archive(b"GOOD"));
        }

        Harness {
            install_path,
            temp_logs,
            gpu_tool_candidates,
            runner: Arc::new(runner),
            config: Arc::new(MemoryConfigStore::default()),
            services: Arc::new(self.services),
            processes: Arc::new(FakeProcessTable::new(processes)),
            host: Arc::new(self.host),
            fetcher: Arc::new(fetcher),
            prompt: Arc::new(self.prompt),
            _temp: temp,
        }
    }
}

pub struct Harness {
    pub install_path: PathBuf,
    pub temp_logs: PathBuf,
    gpu_tool_candidates: Vec<PathBuf>,
    pub runner: Arc<ScriptedRunner>,
    pub config: Arc<MemoryConfigStore>,
    pub services: Arc<MemoryServiceManager>,
    pub processes: Arc<FakeProcessTable>,
    pub host: Arc<StaticHostProbe>,
    pub fetcher: Arc<FakeArchiveFetcher>,
    pub prompt: Arc<ScriptedPrompt>,
    _temp: TempDir,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            host: StaticHostProbe::elevated(),
            prompt: ScriptedPrompt::default(),
            services: MemoryServiceManager::default(),
            processes: Vec::new(),
            strays: Vec::new(),
            gpu: None,
            serve_runtime: true,
            rules: Vec::new(),
        }
    }

    pub fn layout(&self) -> InstallLayout {
        InstallLayout::new(&self.install_path).unwrap()
    }

    pub fn python(&self) -> PathBuf {
        InstallLayout::python_executable(&self.layout().runtime_dir())
    }

    /// A fresh context (and log) for one flow run.
    pub fn context(&self, flow: &str) -> InstallContext {
        let adapters = Adapters {
            runner: self.runner.clone(),
            config: self.config.clone(),
            services: self.services.clone(),
            processes: self.processes.clone(),
            host: self.host.clone(),
            fetcher: self.fetcher.clone(),
            prompt: self.prompt.clone(),
        };
        let log = InstallLog::create_in(&self.temp_logs, flow).unwrap();
        InstallContext::new(adapters, log)
            .with_health_timeout(Duration::ZERO)
            .with_stop_grace(Duration::from_millis(20))
            .with_runtime_source(runtime_source())
            .with_gpu_tool_candidates(self.gpu_tool_candidates.clone())
    }
}
