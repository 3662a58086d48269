pub mod env;
pub mod progress_bars;
pub mod result_sink;
pub mod run_config;
pub mod run_log;

/// Resident memory of the current process in MB, or `None` when the process
/// cannot be inspected on this platform.
pub async fn get_memory_usage() -> Option<u64> {
    use sysinfo::{get_current_pid, System};
    let pid = get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid).map(|process| process.memory() / (1024 * 1024)) // Convert to MB
}
