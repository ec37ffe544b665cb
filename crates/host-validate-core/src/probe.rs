//! Host probes backing the built-in facts.
//!
//! The engine never inspects the host directly for built-ins; it asks a
//! [`HostProbe`]. The default [`SystemProbe`] answers from the standard
//! library and `/proc`, with a `uname` fallback for hosts without
//! procfs. Tests substitute a fake probe.

use std::process::Command;

/// Source of the kernel/arch information behind the built-in facts.
pub trait HostProbe {
    /// Kernel name as reported by the host, e.g. `Linux`.
    fn kernel(&self) -> String;

    /// Kernel release, e.g. `5.15.0-91-generic`.
    fn release(&self) -> String;

    /// Kernel version string.
    fn version(&self) -> String;

    /// Machine architecture, e.g. `x86_64`.
    fn arch(&self) -> String;

    /// Operating-system family in `std::env::consts::OS` vocabulary,
    /// e.g. `linux` or `freebsd`. Drives driver auto-detection.
    fn os(&self) -> &str;
}

/// Probe answering for the host the process runs on.
#[derive(Debug, Default)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn kernel(&self) -> String {
        match std::env::consts::OS {
            "linux" => "Linux",
            "macos" => "Darwin",
            "freebsd" => "FreeBSD",
            "netbsd" => "NetBSD",
            "openbsd" => "OpenBSD",
            "dragonfly" => "DragonFly",
            "windows" => "Windows_NT",
            other => other,
        }
        .to_string()
    }

    fn release(&self) -> String {
        proc_read("/proc/sys/kernel/osrelease")
            .or_else(|| uname_flag("-r"))
            .unwrap_or_default()
    }

    fn version(&self) -> String {
        proc_read("/proc/sys/kernel/version")
            .or_else(|| uname_flag("-v"))
            .unwrap_or_default()
    }

    fn arch(&self) -> String {
        std::env::consts::ARCH.to_string()
    }

    fn os(&self) -> &str {
        std::env::consts::OS
    }
}

fn proc_read(path: &str) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

fn uname_flag(flag: &str) -> Option<String> {
    let output = Command::new("uname").arg(flag).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
