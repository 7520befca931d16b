//! Independent probe runs over many targets.

use crate::prober::Prober;
use netreach_model::{ProbeRequest, ProbeResult, Route, RouteRequest};
use rayon::prelude::*;

/// Probes every request with up to `concurrency` runs in flight. Results are
/// in request order whatever order the runs finish in.
pub fn probe_many(
    prober: &Prober,
    requests: &[ProbeRequest],
    concurrency: usize,
) -> Vec<ProbeResult> {
    run_ordered(requests, concurrency, |request| prober.probe(request))
}

pub fn discover_many(prober: &Prober, requests: &[RouteRequest], concurrency: usize) -> Vec<Route> {
    run_ordered(requests, concurrency, |request| prober.discover_route(request))
}

fn run_ordered<T, U, F>(items: &[T], concurrency: usize, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    if concurrency <= 1 || items.len() <= 1 {
        return items.iter().map(&f).collect();
    }

    let threads = concurrency.min(items.len());
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| items.par_iter().map(&f).collect()),
        Err(err) => {
            log::warn!("failed to build probe pool ({err}); running sequentially");
            items.iter().map(&f).collect()
        }
    }
}
