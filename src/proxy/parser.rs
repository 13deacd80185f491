//! Proxy list parser turning text lines into (endpoint, protocol) pairs

use crate::proxy::models::{ProxyEntry, ProxyProtocol};
use crate::Result;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// `protocol://[user:pass@]host:port`
static URL_FORMAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?|socks5)://((?:[^@\s/]+@)?[^:@\s/]+:\d+)/?$")
        .expect("Invalid URL format regex")
});

/// `user:pass@ip:port`
static AUTH_AT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[\d.]+:\d+$").expect("Invalid auth format regex"));

/// `ip:port`
static BARE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d.]+:\d+$").expect("Invalid bare format regex"));

/// Proxy parser for proxy lists
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single proxy line
    ///
    /// Supports formats, in priority order:
    /// - protocol://IP:PORT and protocol://USER:PASS@IP:PORT (http, https, socks5)
    /// - USER:PASS@IP:PORT (http)
    /// - IP:PORT (http)
    pub fn parse_line(line: &str) -> Option<ProxyEntry> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        if let Some(caps) = URL_FORMAT_REGEX.captures(line) {
            let protocol = caps[1].parse::<ProxyProtocol>().ok()?;
            return Some(ProxyEntry::new(&caps[2], protocol));
        }

        if AUTH_AT_REGEX.is_match(line) || BARE_REGEX.is_match(line) {
            return Some(ProxyEntry::new(line, ProxyProtocol::Http));
        }

        tracing::debug!(line, "Dropping unrecognized proxy line");
        None
    }

    /// Parse proxies from a string (multiple lines), keeping input order
    pub fn parse_string(content: &str) -> Vec<ProxyEntry> {
        content.lines().filter_map(Self::parse_line).collect()
    }

    /// Parse proxies from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<ProxyEntry>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read proxy list {}", path.display()))?;
        Ok(Self::parse_string(&content))
    }
}
