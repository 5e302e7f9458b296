/*!
 * Lifetime Registry
 *
 * Records handle initialization and release events so leaked handles can be
 * traced back to the code that created them.
 *
 * ## Design
 *
 * - One short-lived mutex guards all counters and the in-flight table
 * - Provenance is captured before the lock is taken
 * - Backtraces are symbolized lazily, only when a snapshot is taken
 * - An absent registry (`None`) is a valid recorder that records nothing
 */

use super::config::{CaptureMode, RegistryConfig};
use super::stats::HandleStats;
use crate::core::types::RawHandle;
use ahash::RandomState;
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Where and how a handle was initialized
pub struct Provenance {
    location: &'static Location<'static>,
    thread: Option<String>,
    backtrace: Option<Backtrace>,
}

impl Provenance {
    fn capture(location: &'static Location<'static>, mode: CaptureMode) -> Option<Self> {
        match mode {
            CaptureMode::Disabled => None,
            CaptureMode::Location => Some(Self {
                location,
                thread: std::thread::current().name().map(str::to_owned),
                backtrace: None,
            }),
            CaptureMode::Backtrace => Some(Self {
                location,
                thread: std::thread::current().name().map(str::to_owned),
                backtrace: Some(Backtrace::force_capture()),
            }),
        }
    }

    /// Caller location of `HandleGuard::init`
    #[inline]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.location)?;
        if let Some(ref thread) = self.thread {
            writeln!(f, "\tthread: {}", thread)?;
        }
        if let Some(ref backtrace) = self.backtrace {
            writeln!(f, "{}", backtrace)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provenance")
            .field("location", &self.location)
            .field("thread", &self.thread)
            .field("backtrace", &self.backtrace.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Counters {
    initialized: u64,
    closed: u64,
    close_failed: u64,
    in_flight: HashMap<RawHandle, Option<Provenance>, RandomState>,
}

/// Thread-safe recorder of handle lifetimes
///
/// Attach one to every guard under test, then inspect
/// [`snapshot`](Self::snapshot) once all of them have been released.
///
/// # Example
///
/// ```
/// use rc_handle::{HandleGuard, HandleError, LifetimeRegistry};
/// use std::sync::Arc;
///
/// let registry = Arc::new(LifetimeRegistry::new());
/// let guard: HandleGuard = HandleGuard::new();
/// guard.attach_registry(Some(registry.clone()));
/// guard.init(3, |_| Ok::<(), HandleError>(())).unwrap();
/// guard.release().unwrap();
///
/// assert_eq!(registry.snapshot().report(), "");
/// ```
pub struct LifetimeRegistry {
    config: RegistryConfig,
    counters: Mutex<Counters>,
}

impl LifetimeRegistry {
    /// Registry with the default configuration (full backtraces)
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Registry configured from `RC_HANDLE_CAPTURE`
    pub fn from_env() -> Self {
        Self::with_config(RegistryConfig::from_env())
    }

    #[inline]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Record an initialization of `handle` made at `location`
    pub fn record_init(&self, handle: RawHandle, location: &'static Location<'static>) {
        let provenance = Provenance::capture(location, self.config.capture);

        let mut counters = self.counters.lock();
        counters.initialized += 1;
        counters.in_flight.insert(handle, provenance);
    }

    /// Record a release of `handle`, successful or not
    pub fn record_close(&self, handle: RawHandle, failed: bool) {
        let mut counters = self.counters.lock();
        if failed {
            counters.close_failed += 1;
        } else {
            counters.closed += 1;
        }
        counters.in_flight.remove(&handle);
    }

    /// Current statistics
    ///
    /// For accurate results, call once the code under test has stopped
    /// initializing and releasing handles.
    pub fn snapshot(&self) -> HandleStats {
        let counters = self.counters.lock();

        let in_flight: BTreeMap<RawHandle, String> = counters
            .in_flight
            .iter()
            .map(|(handle, provenance)| {
                let text = match provenance {
                    Some(p) => p.to_string(),
                    None => "(provenance capture disabled)\n".to_string(),
                };
                (*handle, text)
            })
            .collect();

        HandleStats {
            initialized: counters.initialized,
            closed: counters.closed,
            close_failed: counters.close_failed,
            in_flight,
        }
    }

    /// Number of handles currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.counters.lock().in_flight.len()
    }
}

impl Default for LifetimeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifetimeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counters = self.counters.lock();
        f.debug_struct("LifetimeRegistry")
            .field("capture", &self.config.capture)
            .field("initialized", &counters.initialized)
            .field("closed", &counters.closed)
            .field("close_failed", &counters.close_failed)
            .field("in_flight", &counters.in_flight.len())
            .finish()
    }
}

/// Sink for handle lifecycle events
///
/// Implemented for `Option<R>` so that an absent registry records nothing
/// and snapshots as all-zero statistics.
pub trait LifetimeRecorder {
    fn record_init(&self, handle: RawHandle, location: &'static Location<'static>);

    fn record_close(&self, handle: RawHandle, failed: bool);

    fn snapshot(&self) -> HandleStats;
}

impl LifetimeRecorder for LifetimeRegistry {
    #[inline]
    fn record_init(&self, handle: RawHandle, location: &'static Location<'static>) {
        LifetimeRegistry::record_init(self, handle, location)
    }

    #[inline]
    fn record_close(&self, handle: RawHandle, failed: bool) {
        LifetimeRegistry::record_close(self, handle, failed)
    }

    #[inline]
    fn snapshot(&self) -> HandleStats {
        LifetimeRegistry::snapshot(self)
    }
}

impl<R: LifetimeRecorder + ?Sized> LifetimeRecorder for Arc<R> {
    #[inline]
    fn record_init(&self, handle: RawHandle, location: &'static Location<'static>) {
        (**self).record_init(handle, location)
    }

    #[inline]
    fn record_close(&self, handle: RawHandle, failed: bool) {
        (**self).record_close(handle, failed)
    }

    #[inline]
    fn snapshot(&self) -> HandleStats {
        (**self).snapshot()
    }
}

impl<R: LifetimeRecorder + ?Sized> LifetimeRecorder for &R {
    #[inline]
    fn record_init(&self, handle: RawHandle, location: &'static Location<'static>) {
        (**self).record_init(handle, location)
    }

    #[inline]
    fn record_close(&self, handle: RawHandle, failed: bool) {
        (**self).record_close(handle, failed)
    }

    #[inline]
    fn snapshot(&self) -> HandleStats {
        (**self).snapshot()
    }
}

impl<R: LifetimeRecorder> LifetimeRecorder for Option<R> {
    #[inline]
    fn record_init(&self, handle: RawHandle, location: &'static Location<'static>) {
        if let Some(recorder) = self {
            recorder.record_init(handle, location);
        }
    }

    #[inline]
    fn record_close(&self, handle: RawHandle, failed: bool) {
        if let Some(recorder) = self {
            recorder.record_close(handle, failed);
        }
    }

    #[inline]
    fn snapshot(&self) -> HandleStats {
        match self {
            Some(recorder) => recorder.snapshot(),
            None => HandleStats::default(),
        }
    }
}
