/*!
 * Lifetime Monitoring
 * Handle lifetime tracking, leak reports and structured tracing setup
 */

mod config;
mod registry;
mod stats;
mod tracer;

pub use config::{CaptureMode, RegistryConfig, CAPTURE_ENV_VAR};
pub use registry::{LifetimeRecorder, LifetimeRegistry, Provenance};
pub use stats::HandleStats;
pub use tracer::{init_tracing, TRACE_JSON_ENV_VAR};
