//! Reader for the INI file NukeServerSocket writes with its listening port.
//!
//! Only the `port` key of the `[server]` section is consulted. Keys that
//! appear before any section header are treated as belonging to it, since
//! older listener versions wrote a bare `port=NNNNN` line.

use crate::config::ServerConfig;
use regex::Regex;
use std::sync::LazyLock;

/// A port value is exactly five ASCII digits.
static PORT_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{5}$").unwrap());

/// Outcome of looking up the listener port in INI content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortLookup {
    /// No `port` key in the server section.
    Missing,
    /// A `port` entry exists but its value is not five digits.
    Malformed(String),
    /// Five digits, not yet range-checked.
    Found(u32),
}

/// Find the server port in INI text.
pub fn lookup_server_port(content: &str) -> PortLookup {
    let mut in_server_section = true;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_server_section = section.trim().eq_ignore_ascii_case(ServerConfig::INI_SECTION);
            continue;
        }

        if !in_server_section {
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (line, None),
        };
        if !key.eq_ignore_ascii_case(ServerConfig::INI_PORT_KEY) {
            continue;
        }

        return match value {
            Some(value) if PORT_VALUE.is_match(value) => match value.parse::<u32>() {
                Ok(port) => PortLookup::Found(port),
                Err(_) => PortLookup::Malformed(line.to_string()),
            },
            _ => PortLookup::Malformed(line.to_string()),
        };
    }

    PortLookup::Missing
}
