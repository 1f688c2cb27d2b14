//! Process enumeration and forced termination.

use std::path::Path;
use std::time::Duration;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::time::sleep;
use tracing::{info, warn};
use whisvc_core::{ProcessInfo, ProcessTable, processes_under};

/// [`ProcessTable`] backed by `sysinfo`.
#[derive(Debug, Default)]
pub struct SysinfoProcessTable;

impl ProcessTable for SysinfoProcessTable {
    fn list(&self) -> Vec<ProcessInfo> {
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        sys.processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                exe: process.exe().map(Path::to_path_buf),
                parent: process.parent().map(Pid::as_u32),
            })
            .collect()
    }

    fn kill(&self, pid: u32) -> bool {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{self, Signal};

            let Ok(raw) = i32::try_from(pid) else {
                return false;
            };
            match signal::kill(nix::unistd::Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => true,
                Err(e) => {
                    warn!(pid, error = %e, "Failed to signal process");
                    false
                }
            }
        }

        #[cfg(not(unix))]
        {
            let mut sys = System::new();
            let target = Pid::from_u32(pid);
            sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
            sys.process(target).is_none_or(sysinfo::Process::kill)
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        let mut sys = System::new();
        let target = Pid::from_u32(pid);
        sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
        sys.process(target).is_some()
    }
}

/// Kill every process whose executable lives under `root`, then wait up to
/// `grace` for them to disappear. Returns the pids that were signalled.
pub async fn terminate_under(table: &dyn ProcessTable, root: &Path, grace: Duration) -> Vec<u32> {
    let targets = processes_under(table, root);
    if targets.is_empty() {
        return Vec::new();
    }

    let mut signalled = Vec::new();
    for process in &targets {
        info!(
            pid = process.pid,
            exe = ?process.exe,
            "Terminating process holding files under install path"
        );
        if table.kill(process.pid) {
            signalled.push(process.pid);
        }
    }

    let step = Duration::from_millis(250);
    let mut waited = Duration::ZERO;
    while waited < grace && signalled.iter().any(|pid| table.is_alive(*pid)) {
        sleep(step).await;
        waited += step;
    }

    let survivors: Vec<u32> = signalled
        .iter()
        .copied()
        .filter(|pid| table.is_alive(*pid))
        .collect();
    if !survivors.is_empty() {
        warn!(?survivors, "Processes still alive after termination grace period");
    }
    signalled
}
