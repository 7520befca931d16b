//! Reply-line grammar for ping output and reduction into a [`ProbeResult`].

use crate::dialect::Dialect;
use netreach_model::ProbeResult;

/// One probe attempt recognized in the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reply {
    /// Round-trip time in milliseconds, `None` when the attempt got no reply.
    pub time_ms: Option<f64>,
}

/// Reduces captured ping output to a result. Lines that are not probe
/// attempts (banners, summaries, blank lines) are skipped.
pub fn parse_ping_output(host: &str, text: &str, dialect: Dialect) -> ProbeResult {
    let mut sent = 0u32;
    let mut times = Vec::new();

    for reply in text.lines().filter_map(|line| parse_reply_line(line, dialect)) {
        sent += 1;
        if let Some(time) = reply.time_ms {
            times.push(time);
        }
    }

    ProbeResult::from_samples(host, sent, times)
}

pub fn parse_reply_line(line: &str, dialect: Dialect) -> Option<Reply> {
    match dialect {
        Dialect::Windows => parse_windows_reply(line),
        Dialect::Posix => parse_posix_reply(line),
    }
}

pub(crate) const WINDOWS_TIMED_OUT: &str = "Request timed out.";

// Reply from 8.8.8.8: bytes=32 time=10ms TTL=117
fn parse_windows_reply(line: &str) -> Option<Reply> {
    if line.trim_start().starts_with(WINDOWS_TIMED_OUT) {
        return Some(Reply { time_ms: None });
    }
    if !line.contains("bytes=") {
        return None;
    }

    if line.contains("timeout") {
        return Some(Reply { time_ms: None });
    }

    let start = ["time=", "time<"]
        .iter()
        .find_map(|marker| line.find(marker).map(|idx| idx + marker.len()))?;
    let rest = &line[start..];
    let time_ms = rest
        .find("ms")
        .and_then(|end| rest[..end].trim().parse::<u32>().ok())
        .map(f64::from);

    Some(Reply { time_ms })
}

// 64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.3 ms
fn parse_posix_reply(line: &str) -> Option<Reply> {
    if !line.contains("bytes from") {
        return None;
    }

    let time_ms = line.find("time=").and_then(|idx| {
        let rest = &line[idx + "time=".len()..];
        let token = rest.split(' ').next()?;
        let token = token.strip_suffix("ms").unwrap_or(token);
        token.trim().parse::<f64>().ok()
    });

    Some(Reply { time_ms })
}
