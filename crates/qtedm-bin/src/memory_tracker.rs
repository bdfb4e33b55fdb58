//! Optional virtual-memory sampling.
//!
//! `TRACK_MEM=<interval>[:<path>]` starts a background thread that
//! appends one CSV row per interval with the process's VmSize and
//! VmRSS (from `/proc/self/status` on Linux; zeros elsewhere). The
//! default sink is `qtedm_mem.csv` in the working directory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

pub struct MemoryTrackerConfig {
    pub interval: Duration,
    pub path: PathBuf,
}

/// Parse the `TRACK_MEM` value: seconds, optionally `:<path>`.
pub fn parse_track_mem(value: &str) -> Option<MemoryTrackerConfig> {
    let mut parts = value.splitn(2, ':');
    let interval_text = parts.next()?.trim();
    let seconds: f64 = interval_text.parse().ok().filter(|s| *s > 0.0)?;
    let path = parts
        .next()
        .map(|p| PathBuf::from(p.trim()))
        .unwrap_or_else(|| PathBuf::from("qtedm_mem.csv"));
    Some(MemoryTrackerConfig {
        interval: Duration::from_secs_f64(seconds),
        path,
    })
}

fn vm_figures_kib() -> (u64, u64) {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return (0, 0);
    };
    let mut size = 0;
    let mut rss = 0;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmSize:") {
            size = rest.trim().trim_end_matches(" kB").trim().parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("VmRSS:") {
            rss = rest.trim().trim_end_matches(" kB").trim().parse().unwrap_or(0);
        }
    }
    (size, rss)
}

/// Spawn the sampler thread. It runs for the life of the process.
pub fn spawn(config: MemoryTrackerConfig) {
    info!(target: "memtrack", path = %config.path.display(),
        interval_s = config.interval.as_secs_f64(), "memory tracking enabled");
    std::thread::Builder::new()
        .name("memtrack".into())
        .spawn(move || {
            let start = Instant::now();
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.path);
            let mut file = match file {
                Ok(file) => file,
                Err(error) => {
                    warn!(target: "memtrack", %error, "cannot open memory CSV");
                    return;
                }
            };
            let _ = writeln!(file, "elapsed_s,vm_size_kib,vm_rss_kib");
            loop {
                std::thread::sleep(config.interval);
                let (size, rss) = vm_figures_kib();
                let elapsed = start.elapsed().as_secs_f64();
                if writeln!(file, "{elapsed:.1},{size},{rss}").is_err() {
                    return;
                }
            }
        })
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_interval_only() {
        let config = parse_track_mem("5").unwrap();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.path, PathBuf::from("qtedm_mem.csv"));
    }

    #[test]
    fn parse_interval_and_path() {
        let config = parse_track_mem("0.5:/tmp/mem.csv").unwrap();
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(config.path, PathBuf::from("/tmp/mem.csv"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_track_mem("").is_none());
        assert!(parse_track_mem("zero").is_none());
        assert!(parse_track_mem("-1").is_none());
    }
}
