mod output;
mod settings;

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use netreach_model::{Hop, ProbeRequest, ProbeResult, Route, RouteRequest};
use netreach_probe::{
    discover_many, local_fqdn, local_hostname, parse_ping_output, parse_route_output,
    probe_many, resolve_host, Dialect, LogSink, Prober,
};
use output::{emit_json, read_targets};
use serde::Serialize;
use settings::Settings;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "netreach", version, about = "Reachability and route probing CLI")]
struct Cli {
    /// JSON file with default counts, timeouts and concurrency.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Ping(PingArgs),
    Trace(TraceArgs),
    Parse(ParseArgs),
    Hostname(HostnameArgs),
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct TargetArgs {
    #[arg(long)]
    targets: Option<PathBuf>,

    #[arg(long = "target")]
    target_list: Vec<String>,

    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long, default_value_t = 1)]
    repeat: u32,

    #[arg(long, default_value_t = 0)]
    interval_ms: u64,
}

#[derive(Args)]
#[command(about = "Ping targets with the system ping command")]
struct PingArgs {
    #[command(flatten)]
    common: TargetArgs,

    #[arg(long)]
    count: Option<u32>,

    #[arg(long)]
    timeout_secs: Option<u32>,
}

#[derive(Args)]
#[command(
    about = "Discover routes with the system route tool. Only target networks you own or have permission to test."
)]
struct TraceArgs {
    #[command(flatten)]
    common: TargetArgs,

    #[arg(long)]
    max_hops: Option<u32>,

    #[arg(long)]
    timeout_secs: Option<u32>,

    /// Print hops as they are discovered (single target only).
    #[arg(long)]
    stream: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputKind {
    Ping,
    Route,
}

#[derive(Args)]
#[command(about = "Parse previously captured ping or route output")]
struct ParseArgs {
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long, value_enum)]
    kind: OutputKind,

    #[arg(long)]
    dialect: Option<Dialect>,

    /// Host name to record in the result.
    #[arg(long, default_value = "unknown")]
    host: String,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
#[command(about = "Print this machine's host name")]
struct HostnameArgs {
    /// Print the fully qualified domain name instead.
    #[arg(long)]
    fqdn: bool,
}

#[derive(Args)]
struct ResolveArgs {
    hosts: Vec<String>,
}

#[derive(Serialize)]
struct HostInfo {
    os: String,
    arch: String,
    dialect: String,
}

impl HostInfo {
    fn current(dialect: Dialect) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            dialect: dialect.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Report<T> {
    version: String,
    started_at_utc: String,
    finished_at_utc: String,
    host: HostInfo,
    rounds: Vec<Round<T>>,
}

#[derive(Serialize)]
struct Round<T> {
    repeat: u32,
    timestamp_utc: String,
    results: Vec<T>,
}

#[derive(Serialize)]
struct Resolution {
    host: String,
    addresses: Vec<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Ping(args) => run_ping(args, &settings),
        Commands::Trace(args) => run_trace(args, &settings),
        Commands::Parse(args) => run_parse(args),
        Commands::Hostname(args) => run_hostname(args),
        Commands::Resolve(args) => run_resolve(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn collect_targets(args: &TargetArgs) -> Result<Vec<String>> {
    let mut targets = match &args.targets {
        Some(path) => read_targets(path)?,
        None => Vec::new(),
    };
    targets.extend(args.target_list.iter().cloned());

    if targets.is_empty() {
        return Err(anyhow!("no targets provided (use --targets or --target)"));
    }
    Ok(targets)
}

/// Runs `round` `repeat` times, sleeping `interval_ms` between rounds.
fn run_rounds<T>(common: &TargetArgs, mut round: impl FnMut() -> Vec<T>) -> Vec<Round<T>> {
    let mut rounds = Vec::new();
    for rep in 0..common.repeat {
        let timestamp_utc = now_utc();
        rounds.push(Round {
            repeat: rep,
            timestamp_utc,
            results: round(),
        });

        if common.interval_ms > 0 && rep + 1 < common.repeat {
            sleep(Duration::from_millis(common.interval_ms));
        }
    }
    rounds
}

fn run_ping(args: PingArgs, settings: &Settings) -> Result<()> {
    let started_at_utc = now_utc();
    let targets = collect_targets(&args.common)?;
    let count = args.count.unwrap_or(settings.ping_count);
    let timeout_secs = args.timeout_secs.unwrap_or(settings.ping_timeout_secs);

    let requests = targets
        .iter()
        .map(|target| {
            ProbeRequest::new(target.as_str(), count, timeout_secs)
                .with_context(|| format!("invalid ping request for {target:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let concurrency = args.common.concurrency.unwrap_or(settings.concurrency);
    let prober = Prober::new(Arc::new(LogSink));
    let rounds = run_rounds(&args.common, || probe_many(&prober, &requests, concurrency));

    let any_success = rounds
        .iter()
        .flat_map(|round| round.results.iter())
        .any(|result: &ProbeResult| result.success);

    let report = Report {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at_utc,
        finished_at_utc: now_utc(),
        host: HostInfo::current(prober.dialect()),
        rounds,
    };
    emit_json(args.common.out.as_deref(), &report)?;

    if any_success {
        Ok(())
    } else {
        Err(anyhow!("no target answered"))
    }
}

fn run_trace(args: TraceArgs, settings: &Settings) -> Result<()> {
    let started_at_utc = now_utc();
    let targets = collect_targets(&args.common)?;
    let max_hops = args.max_hops.unwrap_or(settings.max_hops);
    let timeout_secs = args.timeout_secs.unwrap_or(settings.hop_timeout_secs);

    let requests = targets
        .iter()
        .map(|target| {
            RouteRequest::new(target.as_str(), max_hops, timeout_secs)
                .with_context(|| format!("invalid route request for {target:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    if args.stream {
        let [request] = requests.as_slice() else {
            return Err(anyhow!("--stream takes exactly one target"));
        };
        let prober = Prober::new(Arc::new(LogSink));
        let route = prober.stream_route(request, |hop| eprintln!("{}", format_hop(hop)));
        emit_json(args.common.out.as_deref(), &route)?;
        return match &route.failure {
            Some(failure) => Err(anyhow!(
                "route discovery to {} failed: {}",
                route.target,
                failure.message
            )),
            None => Ok(()),
        };
    }

    let concurrency = args.common.concurrency.unwrap_or(settings.concurrency);
    let prober = Prober::new(Arc::new(LogSink));
    let rounds = run_rounds(&args.common, || discover_many(&prober, &requests, concurrency));

    let failed = rounds
        .iter()
        .flat_map(|round| round.results.iter())
        .filter(|route: &&Route| route.is_failed())
        .count();
    if failed > 0 {
        log::warn!("{failed} route run(s) failed");
    }

    let report = Report {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at_utc,
        finished_at_utc: now_utc(),
        host: HostInfo::current(prober.dialect()),
        rounds,
    };
    emit_json(args.common.out.as_deref(), &report)
}

fn format_hop(hop: &Hop) -> String {
    let times: Vec<String> = hop
        .times
        .iter()
        .map(|time| match time {
            Some(ms) => format!("{ms:.3} ms"),
            None => "*".to_string(),
        })
        .collect();
    format!("{:>2}  {}  {}", hop.hop, hop.host, times.join("  "))
}

fn run_parse(args: ParseArgs) -> Result<()> {
    let text = read_capture(&args.in_path)?;
    let dialect = args.dialect.unwrap_or_else(Dialect::host);

    match args.kind {
        OutputKind::Ping => {
            let result = parse_ping_output(&args.host, &text, dialect);
            emit_json(args.out.as_deref(), &result)
        }
        OutputKind::Route => {
            let route = Route::new(args.host, parse_route_output(&text, dialect));
            emit_json(args.out.as_deref(), &route)
        }
    }
}

fn read_capture(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read input {:?}", path))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn run_hostname(args: HostnameArgs) -> Result<()> {
    let name = if args.fqdn {
        local_fqdn().context("failed to read local fqdn")?
    } else {
        local_hostname().context("failed to read local hostname")?
    };
    println!("{name}");
    Ok(())
}

fn run_resolve(args: ResolveArgs) -> Result<()> {
    let hosts = if args.hosts.is_empty() {
        vec![local_hostname().context("failed to read local hostname")?]
    } else {
        args.hosts
    };

    let resolutions: Vec<Resolution> = hosts
        .into_iter()
        .map(|host| match resolve_host(&host) {
            Ok(addresses) => Resolution {
                host,
                addresses,
                error: None,
            },
            Err(err) => {
                log::warn!("{err}");
                Resolution {
                    host,
                    addresses: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        })
        .collect();

    emit_json(None, &resolutions)
}
