/*!
 * Guard Traits
 *
 * Core abstractions for RAII handle guards
 */

use super::GuardMetadata;
use crate::core::types::RawHandle;
use std::fmt;

/// Core guard trait
///
/// All guards provide:
/// - Resource type identification
/// - Metadata access
/// - Manual release capability
pub trait Guard: Send + Sync {
    /// Error returned by a failed release
    type Error;

    /// Resource type name for logging/debugging
    fn resource_type(&self) -> &'static str;

    /// Get guard metadata
    fn metadata(&self) -> &GuardMetadata;

    /// Check if the guarded resource is currently usable
    fn is_active(&self) -> bool;

    /// Manually release the resource
    ///
    /// Returns `Err` if never acquired or already released
    fn release(&self) -> Result<(), Self::Error>;
}

/// Guards that can be dropped with custom cleanup
///
/// Separates Drop logic for better testability and observability
pub trait GuardDrop: Guard {
    /// Perform cleanup on drop
    ///
    /// # Panics
    ///
    /// Should NOT panic. Log errors instead.
    fn on_drop(&mut self);
}

/// Guards with observable lifecycle
pub trait Observable: Guard {
    /// Emit initialization event
    fn emit_initialized(&self, handle: RawHandle);

    /// Emit release event
    fn emit_released(&self, handle: RawHandle);

    /// Emit release failure event
    fn emit_error(&self, handle: RawHandle, error: &dyn fmt::Display);
}
