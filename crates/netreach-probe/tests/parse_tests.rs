use netreach_model::{Hop, UNREACHABLE_HOST};
use netreach_probe::{parse_ping_output, parse_route_output, Dialect};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn ping_linux_all_replies() {
    let text = include_str!("fixtures/ping_linux_all_replies.txt");
    let result = parse_ping_output("8.8.8.8", text, Dialect::Posix);

    assert_eq!(result.host, "8.8.8.8");
    assert_eq!((result.sent, result.received, result.lost), (4, 4, 0));
    assert_eq!(result.loss_percent, 0.0);
    assert_eq!(result.times, vec![12.3, 11.8, 13.1, 12.0]);
    assert_close(result.min_time, 11.8);
    assert_close(result.max_time, 13.1);
    assert_close(result.avg_time, 12.3);
    assert!(result.success);
    assert!(result.failure.is_none());
}

#[test]
fn ping_identical_replies() {
    let text = "64 bytes from 8.8.8.8: icmp_seq=1 time=12.3 ms\n".repeat(4);
    let result = parse_ping_output("8.8.8.8", &text, Dialect::Posix);

    assert_eq!((result.sent, result.received, result.lost), (4, 4, 0));
    assert_eq!(result.loss_percent, 0.0);
    assert_eq!(result.times, vec![12.3; 4]);
    assert_close(result.min_time, 12.3);
    assert_close(result.max_time, 12.3);
    assert_close(result.avg_time, 12.3);
    assert!(result.success);
}

#[test]
fn ping_linux_total_loss_has_no_attempt_lines() {
    let text = include_str!("fixtures/ping_linux_total_loss.txt");
    let result = parse_ping_output("203.0.113.7", text, Dialect::Posix);

    assert_eq!((result.sent, result.received, result.lost), (0, 0, 0));
    assert_eq!(result.loss_percent, 0.0);
    assert_eq!((result.min_time, result.max_time, result.avg_time), (0.0, 0.0, 0.0));
    assert!(!result.success);
}

#[test]
fn ping_windows_one_timeout() {
    let text = include_str!("fixtures/ping_windows_one_timeout.txt");
    let result = parse_ping_output("8.8.8.8", text, Dialect::Windows);

    assert_eq!((result.sent, result.received, result.lost), (4, 3, 1));
    assert_close(result.loss_percent, 25.0);
    assert_eq!(result.times, vec![10.0, 12.0, 11.0]);
    assert_close(result.avg_time, 11.0);
}

#[test]
fn ping_windows_timeout_marker_on_reply_line() {
    let text = "\
Reply from 8.8.8.8: bytes=32 time=10ms TTL=117
Reply from 8.8.8.8: bytes=32 time=10ms TTL=117
Reply from 8.8.8.8: bytes=32 time=10ms TTL=117
Reply from 8.8.8.8: bytes=32 timeout
";
    let result = parse_ping_output("8.8.8.8", text, Dialect::Windows);

    assert_eq!((result.sent, result.received, result.lost), (4, 3, 1));
    assert_close(result.loss_percent, 25.0);
}

#[test]
fn ping_parse_is_deterministic() {
    let text = include_str!("fixtures/ping_windows_one_timeout.txt");
    let first = parse_ping_output("8.8.8.8", text, Dialect::Windows);
    let second = parse_ping_output("8.8.8.8", text, Dialect::Windows);
    assert_eq!(first, second);
}

#[test]
fn route_parse_is_deterministic() {
    let cases = [
        (include_str!("fixtures/traceroute_linux_1.txt"), Dialect::Posix),
        (include_str!("fixtures/tracert_windows_1.txt"), Dialect::Windows),
    ];
    for (text, dialect) in cases {
        let first = parse_route_output(text, dialect);
        let second = parse_route_output(text, dialect);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}

#[test]
fn traceroute_linux() {
    let text = include_str!("fixtures/traceroute_linux_1.txt");
    let hops = parse_route_output(text, Dialect::Posix);

    assert_eq!(hops.len(), 6);
    let indexes: Vec<u32> = hops.iter().map(|hop| hop.hop).collect();
    assert_eq!(indexes, vec![1, 2, 3, 4, 5, 6]);

    assert_eq!(hops[0].host, "_gateway (192.168.1.1)");
    assert_eq!(hops[1].host, "10.0.0.1");
    assert_eq!(hops[1].times, [Some(5.201), None, Some(5.144)]);

    assert_eq!(hops[2].host, "host.example (10.0.0.2)");
    assert_eq!(hops[2].times, [Some(1.1), Some(1.2), Some(1.3)]);
    assert_close(hops[2].avg_time.unwrap(), 1.2);

    assert_eq!(hops[3], Hop::unreachable(4));
    assert_eq!(hops[4].times, [Some(9.004), Some(9.120), Some(9.311)]);
    assert_eq!(hops[5].host, "93.184.216.34");
}

#[test]
fn tracert_windows() {
    let text = include_str!("fixtures/tracert_windows_1.txt");
    let hops = parse_route_output(text, Dialect::Windows);

    assert_eq!(hops.len(), 4);
    assert_eq!(hops[0].host, "192.168.1.1");
    assert_eq!(hops[0].times, [Some(1.0), Some(1.0), Some(1.0)]);

    assert_eq!(hops[1].host, UNREACHABLE_HOST);
    assert_eq!(hops[1].times, [None, None, None]);
    assert_eq!(hops[1].avg_time, None);

    assert_eq!(hops[2].host, "host.example [10.0.0.2]");
    assert_close(hops[2].avg_time.unwrap(), 11.0);

    assert_eq!(hops[3].times, [Some(15.0), None, Some(17.0)]);
    assert_close(hops[3].avg_time.unwrap(), 16.0);
}

#[test]
fn every_hop_has_three_samples() {
    let linux = parse_route_output(include_str!("fixtures/traceroute_linux_1.txt"), Dialect::Posix);
    let windows =
        parse_route_output(include_str!("fixtures/tracert_windows_1.txt"), Dialect::Windows);
    for hop in linux.iter().chain(windows.iter()) {
        assert_eq!(hop.times.len(), 3);
        if hop.times.iter().all(Option::is_none) {
            assert!(hop.avg_time.is_none());
        }
    }
}

#[test]
fn wrong_dialect_yields_nothing() {
    let hops = parse_route_output(include_str!("fixtures/tracert_windows_1.txt"), Dialect::Posix);
    assert!(hops.is_empty());
    let replies = parse_ping_output(
        "8.8.8.8",
        include_str!("fixtures/ping_linux_all_replies.txt"),
        Dialect::Windows,
    );
    assert_eq!(replies.sent, 0);
}
