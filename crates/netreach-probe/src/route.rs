//! Hop-line grammars for tracert and traceroute output.

use crate::dialect::Dialect;
use crate::ping::WINDOWS_TIMED_OUT;
use netreach_model::{Hop, HOP_SAMPLES, UNREACHABLE_HOST};

/// Parses every recognized hop line, in output order. Banner lines and lines
/// matching neither hop shape are skipped.
pub fn parse_route_output(text: &str, dialect: Dialect) -> Vec<Hop> {
    text.lines()
        .filter_map(|line| parse_hop_line(line, dialect))
        .collect()
}

pub fn parse_hop_line(line: &str, dialect: Dialect) -> Option<Hop> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let hop = parse_hop_index(tokens[0])?;

    match dialect {
        Dialect::Windows => parse_windows_hop(hop, &tokens[1..]),
        Dialect::Posix => {
            if line.to_ascii_lowercase().starts_with("traceroute") {
                return None;
            }
            parse_posix_hop(hop, &tokens[1..])
        }
    }
}

fn parse_hop_index(token: &str) -> Option<u32> {
    if !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

//  1    <1 ms    <1 ms    <1 ms  192.168.1.1
//  2     *        *        *     Request timed out.
fn parse_windows_hop(hop: u32, tokens: &[&str]) -> Option<Hop> {
    let mut samples = Vec::with_capacity(HOP_SAMPLES);
    let mut i = 0;

    while samples.len() < HOP_SAMPLES {
        let tok = *tokens.get(i)?;
        let next = tokens.get(i + 1).copied();

        if tok == "*" {
            samples.push(None);
            i += if next == Some("ms") { 2 } else { 1 };
            continue;
        }

        let (value, consumed_next) = parse_rtt(tok.trim_start_matches('<'), next)?;
        samples.push(Some(value));
        i += if consumed_next { 2 } else { 1 };
    }

    let host = tokens[i..].join(" ");
    if host.is_empty() {
        return None;
    }
    let host = if host.starts_with(WINDOWS_TIMED_OUT) {
        UNREACHABLE_HOST.to_string()
    } else {
        host
    };

    Some(Hop::new(hop, host, samples))
}

//  3  host.example (10.0.0.1)  1.1 ms  1.2 ms  1.3 ms
//  5  * * *
fn parse_posix_hop(hop: u32, tokens: &[&str]) -> Option<Hop> {
    let mut samples = Vec::with_capacity(HOP_SAMPLES);
    let mut i = 0;
    while tokens.get(i) == Some(&"*") {
        samples.push(None);
        i += 1;
    }

    let Some(name) = tokens.get(i).copied() else {
        if samples.is_empty() {
            return None;
        }
        return Some(Hop::unreachable(hop));
    };

    let host = match tokens.get(i + 1).and_then(|tok| parenthesized(tok)) {
        Some(ip) => {
            i += 2;
            if name == ip {
                ip.to_string()
            } else {
                format!("{name} ({ip})")
            }
        }
        None if is_ip_token(name) => {
            i += 1;
            name.to_string()
        }
        None => return None,
    };

    append_probe_tokens(&tokens[i..], &mut samples);
    Some(Hop::new(hop, host, samples))
}

fn parenthesized(token: &str) -> Option<&str> {
    let inside = token.strip_prefix('(')?.strip_suffix(')')?.trim();
    if inside.is_empty() {
        None
    } else {
        Some(inside)
    }
}

fn append_probe_tokens(tokens: &[&str], rtt_ms: &mut Vec<Option<f64>>) {
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];

        if tok == "*" {
            rtt_ms.push(None);
            i += 1;
            continue;
        }

        if tok.starts_with('!') {
            i += 1;
            continue;
        }

        let next = tokens.get(i + 1).copied();
        if let Some((val, consumed_next)) = parse_rtt(tok, next) {
            rtt_ms.push(Some(val));
            i += if consumed_next { 2 } else { 1 };
            continue;
        }

        i += 1;
    }
}

fn is_ip_token(token: &str) -> bool {
    if token.ends_with("ms") {
        return false;
    }

    is_ipv4(token) || is_ipv6(token)
}

fn is_ipv4(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.len() <= 3 && part.parse::<u8>().is_ok())
}

fn is_ipv6(token: &str) -> bool {
    token.contains(':') && token.chars().all(|c| c.is_ascii_hexdigit() || c == ':')
}

fn parse_rtt(token: &str, next: Option<&str>) -> Option<(f64, bool)> {
    if let Some(num) = token.strip_suffix("ms") {
        if let Ok(val) = num.parse::<f64>() {
            return Some((val, false));
        }
    }

    if let Ok(val) = token.parse::<f64>() {
        if matches!(next, Some(next_tok) if next_tok.starts_with("ms")) {
            return Some((val, true));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_unreachable_hop() {
        let hop = parse_hop_line("5 * * *", Dialect::Posix).unwrap();
        assert_eq!(hop, Hop::unreachable(5));
        assert_eq!(hop.host, "* * *");
        assert_eq!(hop.times, [None, None, None]);
        assert_eq!(hop.avg_time, None);
    }

    #[test]
    fn posix_resolved_hop() {
        let hop = parse_hop_line(
            "3 host.example (10.0.0.1)  1.1 ms  1.2 ms  1.3 ms",
            Dialect::Posix,
        )
        .unwrap();
        assert_eq!(hop.hop, 3);
        assert_eq!(hop.host, "host.example (10.0.0.1)");
        assert_eq!(hop.times, [Some(1.1), Some(1.2), Some(1.3)]);
        assert!((hop.avg_time.unwrap() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn posix_host_equal_to_ip_is_collapsed() {
        let hop = parse_hop_line(" 1  192.168.1.1 (192.168.1.1)  0.512 ms", Dialect::Posix)
            .unwrap();
        assert_eq!(hop.host, "192.168.1.1");
        assert_eq!(hop.times, [Some(0.512), None, None]);
    }

    #[test]
    fn posix_partial_replies_keep_position() {
        let hop = parse_hop_line(
            " 4  * edge.example (203.0.113.9)  8.0 ms !H  9.0 ms",
            Dialect::Posix,
        )
        .unwrap();
        assert_eq!(hop.host, "edge.example (203.0.113.9)");
        assert_eq!(hop.times, [None, Some(8.0), Some(9.0)]);
        assert_eq!(hop.avg_time, Some(8.5));
    }

    #[test]
    fn posix_numeric_output() {
        let hop = parse_hop_line(" 2  10.0.0.1  5.2 ms *  5.1 ms", Dialect::Posix).unwrap();
        assert_eq!(hop.host, "10.0.0.1");
        assert_eq!(hop.times, [Some(5.2), None, Some(5.1)]);
    }

    #[test]
    fn posix_banner_and_garbage_are_skipped() {
        assert!(parse_hop_line(
            "traceroute to example.com (93.184.216.34), 30 hops max, 60 byte packets",
            Dialect::Posix
        )
        .is_none());
        assert!(parse_hop_line("7 somehost 1.0 ms", Dialect::Posix).is_none());
        assert!(parse_hop_line("7", Dialect::Posix).is_none());
    }

    #[test]
    fn windows_hops() {
        let hop = parse_hop_line("  1    <1 ms    <1 ms    <1 ms  192.168.1.1", Dialect::Windows)
            .unwrap();
        assert_eq!(hop.host, "192.168.1.1");
        assert_eq!(hop.times, [Some(1.0), Some(1.0), Some(1.0)]);

        let hop = parse_hop_line(
            "  3    10 ms    11 ms    12 ms  host.example [10.0.0.1]",
            Dialect::Windows,
        )
        .unwrap();
        assert_eq!(hop.host, "host.example [10.0.0.1]");
        assert_eq!(hop.avg_time, Some(11.0));
    }

    #[test]
    fn windows_timed_out_hop_is_normalized() {
        let hop = parse_hop_line(
            "  2     *        *        *     Request timed out.",
            Dialect::Windows,
        )
        .unwrap();
        assert_eq!(hop, Hop::unreachable(2));
    }

    #[test]
    fn windows_star_with_ms_suffix() {
        let hop = parse_hop_line("  6   * ms   14 ms   15 ms  10.1.1.1", Dialect::Windows).unwrap();
        assert_eq!(hop.times, [None, Some(14.0), Some(15.0)]);
    }

    #[test]
    fn windows_banner_is_skipped() {
        for line in [
            "Tracing route to example.com [93.184.216.34]",
            "over a maximum of 30 hops:",
            "Trace complete.",
            "  4    10 ms    11 ms",
        ] {
            assert!(parse_hop_line(line, Dialect::Windows).is_none(), "{line}");
        }
    }
}
