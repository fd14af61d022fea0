//! Dry-run side-effect guard
//!
//! While a dry run is in flight, outbound network calls are default-denied
//! and adjacent asynchronous subsystems (mail, job queue, background
//! workers) are switched into non-executing modes. Entry captures each
//! subsystem's prior state; exit restores it unconditionally, even when the
//! run body failed.

pub mod allowlist;
pub mod capability;
pub mod http;

pub use allowlist::{AllowList, HostPattern};
pub use capability::{
    Capability, CapabilityRegistry, DeliveryMode, JobQueueCapability, JobQueueHandle,
    MailerCapability, MailerHandle, NetworkCapability, QueueMode, WorkerCapability, WorkerHandle,
    WorkerMode,
};
pub use http::{GuardedClient, NetworkPolicy, NetworkSwitch};

use crate::error::Result;

/// Scope that keeps every registered capability engaged until dropped.
///
/// Dropping restores prior state in reverse order; the runner relies on
/// this for the "always restore, even on error or interrupt" contract.
pub struct GuardScope<'a> {
    registry: &'a mut CapabilityRegistry,
    engaged: bool,
}

impl<'a> GuardScope<'a> {
    /// Engage every capability in the registry.
    pub fn enter(registry: &'a mut CapabilityRegistry) -> Result<Self> {
        registry.engage_all()?;
        Ok(Self {
            registry,
            engaged: true,
        })
    }
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        if self.engaged {
            self.registry.restore_all();
        }
    }
}
