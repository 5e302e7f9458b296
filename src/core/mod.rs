/*!
 * Core Module
 * Handle guards, lifecycle types and error handling
 */

pub mod errors;
pub mod guard;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use guard::{Guard, GuardDrop, GuardMetadata, HandleGuard, HandleRef, Observable};
pub use types::*;
