//! Process CPU/memory sampling for heartbeat payloads.
//!
//! The heartbeat sender only depends on the [`StatsSampler`] trait; the
//! shipped implementation reads `/proc/self` on Linux. CPU usage is the
//! utime+stime delta between consecutive samples over wall time, so the
//! first sample of a process reports 0%.

use crate::rpc::TransportError;
use std::sync::Mutex;
use std::time::Instant;

/// One observation of the calling process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSample {
    pub cpu_percent: f64,
    pub memory_bytes: f64,
}

/// Capability to sample the calling process's resource usage.
pub trait StatsSampler: Send + Sync {
    fn sample_self(&self) -> Result<ProcessSample, TransportError>;
}

/// Kernel clock ticks per second for /proc CPU accounting (USER_HZ).
const TICKS_PER_SEC: f64 = 100.0;

struct CpuSnapshot {
    ticks: u64,
    taken_at: Instant,
}

/// `/proc/self`-backed sampler (Linux).
#[derive(Default)]
pub struct ProcfsSampler {
    last: Mutex<Option<CpuSnapshot>>,
}

impl ProcfsSampler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsSampler for ProcfsSampler {
    fn sample_self(&self) -> Result<ProcessSample, TransportError> {
        let stat = std::fs::read_to_string("/proc/self/stat")
            .map_err(|e| TransportError::new(format!("reading /proc/self/stat: {}", e)))?;
        let ticks = parse_cpu_ticks(&stat)
            .ok_or_else(|| TransportError::new("malformed /proc/self/stat"))?;

        let status = std::fs::read_to_string("/proc/self/status")
            .map_err(|e| TransportError::new(format!("reading /proc/self/status: {}", e)))?;
        let memory_bytes = parse_rss_bytes(&status)
            .ok_or_else(|| TransportError::new("VmRSS missing from /proc/self/status"))?;

        let taken_at = Instant::now();
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let cpu_percent = match last.take() {
            Some(prev) => {
                let elapsed = taken_at.duration_since(prev.taken_at).as_secs_f64();
                if elapsed > 0.0 {
                    let cpu_secs = ticks.saturating_sub(prev.ticks) as f64 / TICKS_PER_SEC;
                    cpu_secs / elapsed * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        *last = Some(CpuSnapshot { ticks, taken_at });

        Ok(ProcessSample {
            cpu_percent,
            memory_bytes,
        })
    }
}

/// Extracts utime+stime from /proc/<pid>/stat. The comm field may contain
/// spaces, so fields are counted from after the closing paren.
fn parse_cpu_ticks(stat: &str) -> Option<u64> {
    let rest = stat.rsplit(')').next()?;
    let mut fields = rest.split_whitespace();
    // Fields after the paren start at state (field 3); utime and stime are
    // fields 14 and 15.
    let utime: u64 = fields.nth(11)?.parse().ok()?;
    let stime: u64 = fields.next()?.parse().ok()?;
    Some(utime + stime)
}

/// Extracts VmRSS (reported in kB) from /proc/<pid>/status, in bytes.
fn parse_rss_bytes(status: &str) -> Option<f64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024.0)
}
