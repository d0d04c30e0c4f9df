//! Target process checks.

use sysinfo::{Pid, ProcessRefreshKind, System};

/// Whether a process with `pid` currently exists.
pub fn is_running(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        sysinfo::ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::everything(),
    );

    system.process(pid).is_some()
}
