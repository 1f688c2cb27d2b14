//! Process enumeration port.

use std::path::{Path, PathBuf};

/// A running process and the executable it was started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub exe: Option<PathBuf>,
    pub parent: Option<u32>,
}

/// Snapshot access to the host process table.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait ProcessTable: Send + Sync {
    fn list(&self) -> Vec<ProcessInfo>;

    /// Terminate a process. Returns `false` if it could not be signalled.
    fn kill(&self, pid: u32) -> bool;

    fn is_alive(&self, pid: u32) -> bool;
}

/// Processes whose executable lives under `root`.
///
/// Used to find interpreters that would keep files locked during removal.
/// The calling process and its ancestors are never selected, even when the
/// installer itself runs from inside `root`.
pub fn processes_under(table: &dyn ProcessTable, root: &Path) -> Vec<ProcessInfo> {
    let processes = table.list();
    let lineage = lineage_of(&processes, std::process::id());
    processes
        .into_iter()
        .filter(|p| !lineage.contains(&p.pid))
        .filter(|p| p.exe.as_deref().is_some_and(|exe| exe.starts_with(root)))
        .collect()
}

/// `pid` followed by its parent chain as far as `processes` describes it.
fn lineage_of(processes: &[ProcessInfo], pid: u32) -> Vec<u32> {
    let mut lineage = vec![pid];
    let mut current = pid;
    while let Some(parent) = processes
        .iter()
        .find(|p| p.pid == current)
        .and_then(|p| p.parent)
    {
        if lineage.contains(&parent) {
            break;
        }
        lineage.push(parent);
        current = parent;
    }
    lineage
}
