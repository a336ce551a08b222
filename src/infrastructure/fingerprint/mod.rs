//! Stable hardware-derived agent identity.
//!
//! Gathers an OS-specific bag of hardware identifiers plus hostname,
//! network links and disks, and digests them to a hex SHA-256 string. The
//! same host always derives the same fingerprint; missing sources are
//! skipped, and when every source fails the digest falls back to
//! `{os, arch, hostname}`.
//!
//! Probing runs synchronously: it happens once at startup, before the
//! stream loop exists.

use crate::domain::errors::AgentResult;
use sha2::{Digest, Sha256};
use sysinfo::{Disks, Networks, System};
use tracing::debug;

/// Generate the fingerprint for this host.
///
/// Idempotent: repeated invocations on the same host yield byte-identical
/// output.
pub fn generate() -> AgentResult<String> {
    let mut sources = Vec::new();

    platform_identifiers(&mut sources);
    common_identifiers(&mut sources);

    if sources.is_empty() {
        debug!("no hardware identifiers available, falling back to os/arch/hostname");
        sources.push(std::env::consts::OS.to_string());
        sources.push(std::env::consts::ARCH.to_string());
        sources.push(System::host_name().unwrap_or_default());
    }

    let mut hasher = Sha256::new();
    for source in &sources {
        hasher.update(source.as_bytes());
        hasher.update(b"\n");
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(target_os = "linux")]
fn platform_identifiers(sources: &mut Vec<String>) {
    // Only fields that are stable across reboots; /proc/cpuinfo also
    // carries per-read values such as "cpu MHz".
    const STABLE_CPU_FIELDS: [&str; 5] =
        ["vendor_id", "cpu family", "model", "model name", "stepping"];

    if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
        let mut stable: Vec<&str> = cpuinfo
            .lines()
            .filter(|line| {
                let key = line.split(':').next().unwrap_or("").trim();
                STABLE_CPU_FIELDS.contains(&key)
            })
            .collect();
        stable.dedup();
        if !stable.is_empty() {
            sources.push(stable.join("\n"));
        }
    }

    for path in [
        "/sys/class/dmi/id/product_uuid",
        "/sys/class/dmi/id/board_serial",
    ] {
        match std::fs::read_to_string(path) {
            Ok(contents) if !contents.trim().is_empty() => {
                sources.push(contents.trim().to_string());
            }
            _ => debug!(path, "identifier source unavailable, skipping"),
        }
    }
}

#[cfg(target_os = "macos")]
fn platform_identifiers(sources: &mut Vec<String>) {
    for (program, args) in [
        ("system_profiler", &["SPHardwareDataType"][..]),
        ("ioreg", &["-d2", "-c", "IOPlatformExpertDevice"][..]),
    ] {
        if let Some(output) = run_tool(program, args) {
            sources.push(output);
        }
    }
}

#[cfg(target_os = "windows")]
fn platform_identifiers(sources: &mut Vec<String>) {
    for args in [
        &["csproduct", "get", "uuid"][..],
        &["bios", "get", "serialnumber"][..],
        &["baseboard", "get", "serialnumber"][..],
        &["cpu", "get", "processorid"][..],
    ] {
        if let Some(output) = run_tool("wmic", args) {
            sources.push(output);
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn platform_identifiers(_sources: &mut Vec<String>) {}

/// Identifiers gathered the same way on every OS: network link names, disk
/// names and the hostname. Enumeration order is not guaranteed, so the
/// lists are sorted before hashing.
fn common_identifiers(sources: &mut Vec<String>) {
    let networks = Networks::new_with_refreshed_list();
    let mut links: Vec<String> = networks.list().keys().cloned().collect();
    links.sort();
    if !links.is_empty() {
        sources.push(format!("links:{}", links.join(",")));
    }

    let disks = Disks::new_with_refreshed_list();
    let mut disk_names: Vec<String> = disks
        .list()
        .iter()
        .map(|d| d.name().to_string_lossy().into_owned())
        .collect();
    disk_names.sort();
    disk_names.dedup();
    if !disk_names.is_empty() {
        sources.push(format!("disks:{}", disk_names.join(",")));
    }

    if let Some(hostname) = System::host_name() {
        sources.push(format!("hostname:{hostname}"));
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn run_tool(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        debug!(program, "identifier tool failed, skipping");
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        let fp = generate().unwrap();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_idempotent() {
        let first = generate().unwrap();
        let second = generate().unwrap();
        assert_eq!(first, second);
    }
}
