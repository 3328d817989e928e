//! System-resource snapshot for the status endpoint.

use serde::Serialize;
use sysinfo::{Disks, System};

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SystemUsage {
    pub cpu_usage_percent: f32,
    pub memory_total_mb: f64,
    pub memory_available_mb: f64,
    pub disk_total_gb: f64,
    pub disk_used_gb: f64,
    pub disk_free_gb: f64,
}

/// Samples CPU, memory and disk usage. Blocks for one CPU refresh
/// interval; call through `spawn_blocking` from async contexts.
pub fn snapshot() -> SystemUsage {
    let mut sys = System::new();
    sys.refresh_memory();

    // CPU usage needs two refreshes with a delay in between.
    sys.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();
    let cpus = sys.cpus();
    let cpu_usage_percent = if cpus.is_empty() {
        0.0
    } else {
        (cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32).clamp(0.0, 100.0)
    };

    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.list().first());
    let (disk_total, disk_free) = root
        .map(|d| (d.total_space(), d.available_space()))
        .unwrap_or((0, 0));

    SystemUsage {
        cpu_usage_percent,
        memory_total_mb: sys.total_memory() as f64 / MIB,
        memory_available_mb: sys.available_memory() as f64 / MIB,
        disk_total_gb: disk_total as f64 / GIB,
        disk_used_gb: disk_total.saturating_sub(disk_free) as f64 / GIB,
        disk_free_gb: disk_free as f64 / GIB,
    }
}
