use crate::command::CommandSpec;
use crate::dialect::Dialect;
use crate::error::ProbeError;
use crate::route::parse_hop_line;
use netreach_model::{Hop, Route};
use std::io::{self, BufRead, BufReader};
use std::process::Stdio;
use std::sync::mpsc::{self, Sender};
use std::thread;

#[derive(Debug, Clone, PartialEq)]
pub enum RouteEvent {
    Hop(Hop),
    Done { status: i32 },
    Error { message: String },
}

/// Starts `spec` and forwards each hop as soon as its line is printed.
/// `Done` is always the last event and is sent once both pipes are drained
/// and the process has exited.
pub fn spawn_command_stream(
    spec: &CommandSpec,
    dialect: Dialect,
    sender: Sender<RouteEvent>,
) -> Result<(), ProbeError> {
    log::debug!("streaming {spec}");

    let launch_error = |source: io::Error| ProbeError::Launch {
        program: spec.program.clone(),
        source,
    };

    let mut child = spec
        .to_command()
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(launch_error)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| launch_error(io::Error::other("missing stdout pipe")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| launch_error(io::Error::other("missing stderr pipe")))?;

    let tx_out = sender.clone();
    let stdout_reader = thread::spawn(move || {
        let reader = BufReader::new(stdout);
        for line in reader.lines().map_while(Result::ok) {
            if let Some(hop) = parse_hop_line(&line, dialect) {
                if tx_out.send(RouteEvent::Hop(hop)).is_err() {
                    break;
                }
            }
        }
    });

    let tx_err = sender.clone();
    let stderr_reader = thread::spawn(move || {
        let reader = BufReader::new(stderr);
        let lines: Vec<String> = reader.lines().map_while(Result::ok).collect();
        let message = lines.join(" ");
        if !message.trim().is_empty() {
            let _ = tx_err.send(RouteEvent::Error { message });
        }
    });

    thread::spawn(move || {
        let _ = stdout_reader.join();
        let _ = stderr_reader.join();
        let code = child.wait().ok().and_then(|s| s.code()).unwrap_or(-1);
        let _ = sender.send(RouteEvent::Done { status: code });
    });

    Ok(())
}

/// Runs `spec` in the background and returns the receiving end of its events.
pub fn stream_command(
    spec: &CommandSpec,
    dialect: Dialect,
) -> Result<mpsc::Receiver<RouteEvent>, ProbeError> {
    let (tx, rx) = mpsc::channel();
    spawn_command_stream(spec, dialect, tx)?;
    Ok(rx)
}

/// Drains a route event stream into a [`Route`], calling `on_hop` for each
/// hop as it arrives. A non-zero exit with no hops is an error carrying the
/// tool's stderr; a stream that ends without `Done` counts as status -1.
pub fn collect_route(
    program: &str,
    target: &str,
    events: impl IntoIterator<Item = RouteEvent>,
    mut on_hop: impl FnMut(&Hop),
) -> Result<Route, ProbeError> {
    let mut hops = Vec::new();
    let mut messages: Vec<String> = Vec::new();
    let mut status = -1;

    for event in events {
        match event {
            RouteEvent::Hop(hop) => {
                on_hop(&hop);
                hops.push(hop);
            }
            RouteEvent::Error { message } => messages.push(message),
            RouteEvent::Done { status: code } => {
                status = code;
                break;
            }
        }
    }

    if status == 0 || !hops.is_empty() {
        return Ok(Route::new(target, hops));
    }

    Err(ProbeError::Exit {
        program: program.to_string(),
        status: format!("exit status: {status}"),
        output: messages.join("\n"),
    })
}
