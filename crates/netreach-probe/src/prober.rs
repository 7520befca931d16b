use crate::command::{ping_command, route_command, CommandRunner, CommandSpec, SystemCommandRunner};
use crate::dialect::Dialect;
use crate::error::ProbeError;
use crate::ping::parse_ping_output;
use crate::route::parse_route_output;
use crate::sink::DiagnosticSink;
use crate::stream::{collect_route, stream_command};
use netreach_model::{Hop, ProbeRequest, ProbeResult, Route, RouteRequest};
use std::sync::Arc;

/// Runs the platform's ping and route tools and parses what they print.
///
/// Holds no per-call state, so one `Prober` can be shared across threads.
/// Each call owns its child process until the process exits.
#[derive(Clone)]
pub struct Prober {
    dialect: Dialect,
    runner: Arc<dyn CommandRunner>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Prober {
    /// A prober for the host platform that reports into `sink`.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self::with_runner(Dialect::host(), Arc::new(SystemCommandRunner), sink)
    }

    pub fn with_runner(
        dialect: Dialect,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            dialect,
            runner,
            sink,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Probes `request.host()`. A non-zero exit is only an error when no
    /// reply was received.
    pub fn try_probe(&self, request: &ProbeRequest) -> Result<ProbeResult, ProbeError> {
        self.run_probe(request).map_err(|(err, _)| err)
    }

    /// Like [`Prober::try_probe`] but never fails: the error is reported to
    /// the sink and attached to the returned result.
    pub fn probe(&self, request: &ProbeRequest) -> ProbeResult {
        match self.run_probe(request) {
            Ok(result) => result,
            Err((err, degraded)) => {
                self.sink
                    .report(&format!("ping to {} failed: {err}", request.host()));
                degraded.with_failure(err.to_failure())
            }
        }
    }

    pub fn try_discover_route(&self, request: &RouteRequest) -> Result<Route, ProbeError> {
        self.run_route(request)
    }

    /// Like [`Prober::try_discover_route`] but never fails. A failed run
    /// comes back as a [`Route`] with no hops and `failure` set.
    pub fn discover_route(&self, request: &RouteRequest) -> Route {
        match self.run_route(request) {
            Ok(route) => route,
            Err(err) => {
                self.sink
                    .report(&format!("route to {} failed: {err}", request.host()));
                Route::failed(request.host(), err.to_failure())
            }
        }
    }

    /// Discovers the route while the tool runs, calling `on_hop` for each
    /// hop as it is printed. Follows the same failure policy as
    /// [`Prober::try_discover_route`].
    pub fn try_stream_route(
        &self,
        request: &RouteRequest,
        on_hop: impl FnMut(&Hop),
    ) -> Result<Route, ProbeError> {
        let spec = route_command(request, self.dialect);
        self.try_stream_command(request.host(), &spec, on_hop)
    }

    /// Streaming form of [`Prober::discover_route`]; failures are reported
    /// to the sink and returned as a failed [`Route`].
    pub fn stream_route(&self, request: &RouteRequest, on_hop: impl FnMut(&Hop)) -> Route {
        let spec = route_command(request, self.dialect);
        self.stream_command(request.host(), &spec, on_hop)
    }

    /// Streams an arbitrary route command for `target`.
    pub fn try_stream_command(
        &self,
        target: &str,
        spec: &CommandSpec,
        on_hop: impl FnMut(&Hop),
    ) -> Result<Route, ProbeError> {
        let events = stream_command(spec, self.dialect)?;
        collect_route(&spec.program, target, events, on_hop)
    }

    pub fn stream_command(
        &self,
        target: &str,
        spec: &CommandSpec,
        on_hop: impl FnMut(&Hop),
    ) -> Route {
        match self.try_stream_command(target, spec, on_hop) {
            Ok(route) => route,
            Err(err) => {
                self.sink.report(&format!("route to {target} failed: {err}"));
                Route::failed(target, err.to_failure())
            }
        }
    }

    fn run_probe(&self, request: &ProbeRequest) -> Result<ProbeResult, (ProbeError, ProbeResult)> {
        let spec = ping_command(request, self.dialect);
        let host = request.host();

        let output = match self.runner.run(&spec) {
            Ok(output) => output,
            Err(source) => {
                let err = launch_error(&spec, source);
                let not_run = ProbeResult::not_run(host, err.to_failure());
                return Err((err, not_run));
            }
        };

        let result = parse_ping_output(host, &output.text, self.dialect);
        if output.success || result.received > 0 {
            return Ok(result);
        }

        let err = ProbeError::Exit {
            program: spec.program,
            status: output.status,
            output: output.text,
        };
        Err((err, result))
    }

    fn run_route(&self, request: &RouteRequest) -> Result<Route, ProbeError> {
        let spec = route_command(request, self.dialect);
        let output = self
            .runner
            .run(&spec)
            .map_err(|source| launch_error(&spec, source))?;

        let hops = parse_route_output(&output.text, self.dialect);
        if output.success || !hops.is_empty() {
            return Ok(Route::new(request.host(), hops));
        }

        Err(ProbeError::Exit {
            program: spec.program,
            status: output.status,
            output: output.text,
        })
    }
}

fn launch_error(spec: &CommandSpec, source: std::io::Error) -> ProbeError {
    ProbeError::Launch {
        program: spec.program.clone(),
        source,
    }
}
