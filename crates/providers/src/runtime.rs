//! Local runtime health and model auto-selection.
//!
//! The app checks the runtime is listening before it starts a session and,
//! on machines that never picked a model, selects one matching available
//! RAM.

use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use sysinfo::System;

/// How much RAM is available (approximately) for choosing a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RamTier {
    /// < 4 GB — too little for any useful local model
    Tiny,
    /// 4–7 GB — smallest viable model
    Low,
    /// 8–15 GB — comfortable for 3-4B models
    Medium,
    /// 16+ GB — can run 7-8B models
    High,
}

fn ram_tier() -> RamTier {
    let mut sys = System::new();
    sys.refresh_memory();
    tier_for_gb(sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0))
}

fn tier_for_gb(gb: f64) -> RamTier {
    if gb < 4.0 {
        RamTier::Tiny
    } else if gb < 8.0 {
        RamTier::Low
    } else if gb < 16.0 {
        RamTier::Medium
    } else {
        RamTier::High
    }
}

/// Pick the best default model tag for this machine's RAM.
///
/// Returns `(model_tag, human_description)`.
pub fn recommended_model() -> (&'static str, &'static str) {
    match ram_tier() {
        RamTier::Tiny => (
            "tinyllama",
            "TinyLlama (1.1B) — lightweight, fits on low-RAM devices",
        ),
        RamTier::Low => ("llama3.2:1b", "Llama 3.2 1B — compact but capable"),
        RamTier::Medium => (
            "llama3.2:3b",
            "Llama 3.2 3B — good balance of speed and quality",
        ),
        RamTier::High => ("llama3.1:8b", "Llama 3.1 8B — best local quality"),
    }
}

/// Check whether the runtime is already listening at `base_url`.
pub fn runtime_reachable(base_url: &str) -> bool {
    let Some(addr) = host_port(base_url) else {
        return false;
    };
    let Ok(addr) = addr.parse::<SocketAddr>() else {
        return false;
    };
    TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_ok()
}

/// Extract "host:port" from a base URL like "http://127.0.0.1:11434".
fn host_port(base_url: &str) -> Option<String> {
    let rest = base_url
        .strip_prefix("http://")
        .or_else(|| base_url.strip_prefix("https://"))?;
    let hostport = rest.split('/').next()?;
    if hostport.contains(':') {
        Some(hostport.to_string())
    } else {
        Some(format!("{}:80", hostport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(tier_for_gb(2.0), RamTier::Tiny);
        assert_eq!(tier_for_gb(4.0), RamTier::Low);
        assert_eq!(tier_for_gb(8.0), RamTier::Medium);
        assert_eq!(tier_for_gb(32.0), RamTier::High);
    }

    #[test]
    fn host_port_parsing() {
        assert_eq!(
            host_port("http://127.0.0.1:11434").as_deref(),
            Some("127.0.0.1:11434")
        );
        assert_eq!(
            host_port("http://127.0.0.1:11434/api").as_deref(),
            Some("127.0.0.1:11434")
        );
        assert!(host_port("not a url").is_none());
    }

    #[test]
    fn unparseable_base_url_is_unreachable() {
        assert!(!runtime_reachable("garbage"));
    }
}
