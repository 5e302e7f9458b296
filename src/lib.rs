/*!
 * rc-handle
 * Reference-counted OS handles with lifetime tracking
 *
 * A [`HandleGuard`] lets many threads use one raw handle at once and
 * releases it exactly once, after the last user is done. A
 * [`LifetimeRegistry`] attached to guards records where each handle was
 * created, so tests can report leaked handles.
 */

pub mod core;
pub mod monitoring;
pub mod syscalls;

// Re-exports
pub use crate::core::{
    Guard, GuardDrop, GuardMetadata, HandleError, HandleGuard, HandleRef, HandleResult,
    HandleState, LifecycleError, LifecycleResult, Observable, RawHandle,
};
pub use monitoring::{
    init_tracing, CaptureMode, HandleStats, LifetimeRecorder, LifetimeRegistry, Provenance,
    RegistryConfig,
};
pub use syscalls::wrap_failure;

#[cfg(unix)]
pub use syscalls::{close_fd, guard_owned_fd};
