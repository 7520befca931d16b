//! Reachability probing and route discovery through the platform's
//! `ping` and `traceroute`/`tracert` tools.

pub mod batch;
pub mod command;
pub mod dialect;
pub mod error;
pub mod host;
pub mod ping;
pub mod prober;
pub mod route;
pub mod sink;
pub mod stream;

pub use batch::{discover_many, probe_many};
pub use command::{
    ping_command, route_command, CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner,
};
pub use dialect::Dialect;
pub use error::{HostError, ProbeError};
pub use host::{local_fqdn, local_hostname, resolve_host, resolve_ip};
pub use ping::{parse_ping_output, parse_reply_line, Reply};
pub use prober::Prober;
pub use route::{parse_hop_line, parse_route_output};
pub use sink::{DiagnosticSink, LogSink, MemorySink, NullSink};
pub use stream::{collect_route, spawn_command_stream, stream_command, RouteEvent};
