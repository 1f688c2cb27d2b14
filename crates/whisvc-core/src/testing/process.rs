use std::sync::Mutex;

use crate::ports::{ProcessInfo, ProcessTable};

/// Process table whose `kill` removes the entry.
#[derive(Debug, Default)]
pub struct FakeProcessTable {
    processes: Mutex<Vec<ProcessInfo>>,
    killed: Mutex<Vec<u32>>,
}

impl FakeProcessTable {
    pub fn new(processes: Vec<ProcessInfo>) -> Self {
        Self {
            processes: Mutex::new(processes),
            killed: Mutex::new(Vec::new()),
        }
    }

    pub fn killed(&self) -> Vec<u32> {
        self.killed.lock().unwrap().clone()
    }
}

impl ProcessTable for FakeProcessTable {
    fn list(&self) -> Vec<ProcessInfo> {
        self.processes.lock().unwrap().clone()
    }

    fn kill(&self, pid: u32) -> bool {
        let mut processes = self.processes.lock().unwrap();
        let before = processes.len();
        processes.retain(|p| p.pid != pid);
        let removed = processes.len() != before;
        if removed {
            self.killed.lock().unwrap().push(pid);
        }
        removed
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.processes.lock().unwrap().iter().any(|p| p.pid == pid)
    }
}
