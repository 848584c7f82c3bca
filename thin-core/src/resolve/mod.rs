// thin-core/src/resolve/mod.rs
//! The resolver capability and concurrent resolution of request lists.
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::bounded;
use thin_common::error::{Result, ThinError};
use thin_common::model::{Coordinate, DependencyRequest, ResolvedArtifact};
use threadpool::ThreadPool;
use tracing::{debug, instrument, warn};

pub mod transitive;

pub use transitive::RepositoryResolver;

/// Turns requests into local files.
pub trait ArtifactResolver: Send + Sync {
    /// The requested artifact followed by its transitive closure, honoring the
    /// request's own exclusions.
    fn resolve(&self, request: &DependencyRequest) -> Result<Vec<ResolvedArtifact>>;

    /// Local path of a descriptor (`pom`) coordinate.
    fn resolve_descriptor(&self, coordinate: &Coordinate) -> Result<PathBuf>;
}

impl<T: ArtifactResolver + ?Sized> ArtifactResolver for Arc<T> {
    fn resolve(&self, request: &DependencyRequest) -> Result<Vec<ResolvedArtifact>> {
        (**self).resolve(request)
    }

    fn resolve_descriptor(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        (**self).resolve_descriptor(coordinate)
    }
}

/// Shared flag checked before each request is started.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Called once per resolved artifact.
pub type ProgressSink = Arc<dyn Fn(&ResolvedArtifact) + Send + Sync>;

#[derive(Clone)]
pub struct ResolveOptions {
    pub workers: usize,
    pub progress: Option<ProgressSink>,
    pub cancel: CancellationToken,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl ResolveOptions {
    pub fn sequential() -> Self {
        Self {
            workers: 1,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl std::fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("workers", &self.workers)
            .field("progress", &self.progress.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get_physical().saturating_sub(1)).min(6)
}

/// Resolves every request, returning the results in request order.
///
/// Requests run on a thread pool; any failure fails the whole call and the
/// requests not yet started are skipped.
#[instrument(skip_all, fields(requests = requests.len()))]
pub fn resolve_all(
    resolver: &Arc<dyn ArtifactResolver>,
    requests: &[DependencyRequest],
    options: &ResolveOptions,
) -> Result<Vec<Vec<ResolvedArtifact>>> {
    let abort = CancellationToken::new();
    let workers = options.workers.max(1).min(requests.len());
    if workers <= 1 {
        return requests
            .iter()
            .map(|request| resolve_one(resolver.as_ref(), request, options, &abort))
            .collect();
    }

    debug!("Resolving {} requests with {} workers", requests.len(), workers);
    let pool = ThreadPool::new(workers);
    let (tx, rx) = bounded(requests.len());
    for (index, request) in requests.iter().enumerate() {
        let resolver = Arc::clone(resolver);
        let request = request.clone();
        let options = options.clone();
        let abort = abort.clone();
        let tx = tx.clone();
        pool.execute(move || {
            let result = resolve_one(resolver.as_ref(), &request, &options, &abort);
            if result.is_err() {
                abort.cancel();
            }
            let _ = tx.send((index, result));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<Vec<ResolvedArtifact>>> = vec![None; requests.len()];
    let mut failures: Vec<(usize, ThinError)> = Vec::new();
    for (index, result) in rx.iter() {
        match result {
            Ok(artifacts) => slots[index] = Some(artifacts),
            Err(e) => failures.push((index, e)),
        }
    }

    if options.cancel.is_cancelled() {
        debug!("Resolution cancelled, discarding {} results", slots.len());
        return Err(ThinError::Cancelled);
    }
    if !failures.is_empty() {
        failures.sort_by_key(|(index, _)| *index);
        // skipped requests report Cancelled; prefer the failure that caused it
        let position = failures
            .iter()
            .position(|(_, e)| !matches!(e, ThinError::Cancelled))
            .unwrap_or(0);
        return Err(failures.swap_remove(position).1);
    }

    slots
        .into_iter()
        .zip(requests)
        .map(|(slot, request)| {
            slot.ok_or_else(|| {
                warn!("Worker for {} exited without a result", request.coordinate);
                ThinError::resolution(request.coordinate.to_string(), "resolver worker failed")
            })
        })
        .collect()
}

fn resolve_one(
    resolver: &dyn ArtifactResolver,
    request: &DependencyRequest,
    options: &ResolveOptions,
    abort: &CancellationToken,
) -> Result<Vec<ResolvedArtifact>> {
    if options.cancel.is_cancelled() || abort.is_cancelled() {
        return Err(ThinError::Cancelled);
    }
    let artifacts = resolver.resolve(request)?;
    if let Some(progress) = &options.progress {
        for artifact in &artifacts {
            progress(artifact);
        }
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use thin_common::model::Scope;

    use super::*;

    struct Delayed;

    impl ArtifactResolver for Delayed {
        fn resolve(&self, request: &DependencyRequest) -> Result<Vec<ResolvedArtifact>> {
            let c = &request.coordinate;
            if c.artifact() == "broken" {
                return Err(ThinError::resolution(c.to_string(), "not found"));
            }
            // later requests finish first
            let delay = 40u64.saturating_sub(c.version().unwrap_or("0").parse::<u64>().unwrap_or(0) * 10);
            thread::sleep(Duration::from_millis(delay));
            Ok(vec![ResolvedArtifact::new(c.clone(), format!("/repo/{}.jar", c.artifact()))])
        }

        fn resolve_descriptor(&self, coordinate: &Coordinate) -> Result<PathBuf> {
            Err(ThinError::DescriptorNotFound(coordinate.to_string()))
        }
    }

    fn request(text: &str) -> DependencyRequest {
        DependencyRequest::new(Coordinate::parse(text).unwrap(), Scope::Compile)
    }

    #[test]
    fn results_follow_request_order_not_completion_order() {
        let resolver: Arc<dyn ArtifactResolver> = Arc::new(Delayed);
        let requests = vec![request("g:a:0"), request("g:b:1"), request("g:c:2"), request("g:d:3")];
        let options = ResolveOptions {
            workers: 4,
            ..ResolveOptions::default()
        };
        let results = resolve_all(&resolver, &requests, &options).unwrap();
        let names: Vec<_> = results
            .iter()
            .map(|r| r[0].coordinate.artifact().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn any_failure_fails_the_whole_call() {
        let resolver: Arc<dyn ArtifactResolver> = Arc::new(Delayed);
        let requests = vec![request("g:a:0"), request("g:broken:1"), request("g:c:2")];
        let options = ResolveOptions {
            workers: 3,
            ..ResolveOptions::default()
        };
        let err = resolve_all(&resolver, &requests, &options).unwrap_err();
        assert!(err.to_string().contains("g:broken"), "{err}");

        let err = resolve_all(&resolver, &requests, &ResolveOptions::sequential()).unwrap_err();
        assert!(matches!(err, ThinError::ArtifactResolutionFailure { .. }));
    }

    #[test]
    fn cancelled_before_start_resolves_nothing() {
        let resolver: Arc<dyn ArtifactResolver> = Arc::new(Delayed);
        let options = ResolveOptions::sequential();
        options.cancel.cancel();
        let err = resolve_all(&resolver, &[request("g:a:1")], &options).unwrap_err();
        assert!(matches!(err, ThinError::Cancelled));
    }

    #[test]
    fn progress_sees_every_artifact() {
        let resolver: Arc<dyn ArtifactResolver> = Arc::new(Delayed);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = ResolveOptions::sequential().with_progress(Arc::new(move |artifact: &ResolvedArtifact| {
            sink.lock().unwrap().push(artifact.to_string());
        }));
        resolve_all(&resolver, &[request("g:a:1"), request("g:b:2")], &options).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
