//! Side-effect capability registry
//!
//! Each optional side-effect subsystem (outbound network, mail dispatch,
//! job enqueue, background workers) registers a capability: an apply/restore
//! pair. The dry-run guard engages every registered capability on entry and
//! restores each one's captured prior state on exit, in reverse order,
//! whether or not the run body failed.

use crate::error::Result;
use crate::guard::allowlist::AllowList;
use crate::guard::http::{NetworkPolicy, NetworkSwitch};
use std::sync::{Arc, Mutex};

/// One guarded subsystem: switch it into its non-executing mode, remember
/// what it was, put it back afterward.
pub trait Capability {
    fn name(&self) -> &'static str;

    /// Capture prior state and switch the subsystem into guarded mode.
    fn engage(&mut self) -> Result<()>;

    /// Restore the captured prior state. Must not fail; called from Drop
    /// paths.
    fn restore(&mut self);
}

/// Registry of the side-effect subsystems present in this process.
///
/// Host applications register their capabilities once at startup; the
/// engine adds the network capability itself per run.
#[derive(Default)]
pub struct CapabilityRegistry {
    caps: Vec<Box<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cap: Box<dyn Capability>) {
        self.caps.push(cap);
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    /// Engage every capability, rolling back the ones already engaged if a
    /// later one fails.
    pub fn engage_all(&mut self) -> Result<()> {
        for i in 0..self.caps.len() {
            if let Err(e) = self.caps[i].engage() {
                for cap in self.caps[..i].iter_mut().rev() {
                    cap.restore();
                }
                return Err(e);
            }
            tracing::debug!(capability = self.caps[i].name(), "side-effect guard engaged");
        }
        Ok(())
    }

    /// Restore every capability in reverse registration order.
    pub fn restore_all(&mut self) {
        for cap in self.caps.iter_mut().rev() {
            cap.restore();
            tracing::debug!(capability = cap.name(), "side-effect guard restored");
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// Swaps a deny-except-allow-list policy into the shared network switch.
pub struct NetworkCapability {
    switch: Arc<NetworkSwitch>,
    allowlist: AllowList,
    prior: Option<NetworkPolicy>,
}

impl NetworkCapability {
    pub fn new(switch: Arc<NetworkSwitch>, allowlist: AllowList) -> Self {
        Self {
            switch,
            allowlist,
            prior: None,
        }
    }
}

impl Capability for NetworkCapability {
    fn name(&self) -> &'static str {
        "network"
    }

    fn engage(&mut self) -> Result<()> {
        let prior = self
            .switch
            .swap(NetworkPolicy::DenyExcept(self.allowlist.clone()));
        self.prior = Some(prior);
        Ok(())
    }

    fn restore(&mut self) {
        if let Some(prior) = self.prior.take() {
            self.switch.swap(prior);
        }
    }
}

// ============================================================================
// Mail dispatch
// ============================================================================

/// Whether outbound transactional mail is actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    #[default]
    Deliver,
    Hold,
}

/// Shared mail-delivery mode a host application's mailer consults.
pub type MailerHandle = Arc<Mutex<DeliveryMode>>;

/// Holds mail dispatch for the guard's duration.
pub struct MailerCapability {
    handle: MailerHandle,
    prior: Option<DeliveryMode>,
}

impl MailerCapability {
    pub fn new(handle: MailerHandle) -> Self {
        Self {
            handle,
            prior: None,
        }
    }
}

impl Capability for MailerCapability {
    fn name(&self) -> &'static str {
        "mailer"
    }

    fn engage(&mut self) -> Result<()> {
        let mut mode = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        self.prior = Some(std::mem::replace(&mut *mode, DeliveryMode::Hold));
        Ok(())
    }

    fn restore(&mut self) {
        if let Some(prior) = self.prior.take() {
            *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = prior;
        }
    }
}

// ============================================================================
// Job enqueue
// ============================================================================

/// Whether enqueued jobs are handed to the real queue or captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueMode {
    #[default]
    Enqueue,
    Capture,
}

pub type JobQueueHandle = Arc<Mutex<QueueMode>>;

/// Redirects job enqueue to a capturing test mode for the guard's duration.
pub struct JobQueueCapability {
    handle: JobQueueHandle,
    prior: Option<QueueMode>,
}

impl JobQueueCapability {
    pub fn new(handle: JobQueueHandle) -> Self {
        Self {
            handle,
            prior: None,
        }
    }
}

impl Capability for JobQueueCapability {
    fn name(&self) -> &'static str {
        "job_queue"
    }

    fn engage(&mut self) -> Result<()> {
        let mut mode = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        self.prior = Some(std::mem::replace(&mut *mode, QueueMode::Capture));
        Ok(())
    }

    fn restore(&mut self) {
        if let Some(prior) = self.prior.take() {
            *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = prior;
        }
    }
}

// ============================================================================
// Background workers
// ============================================================================

/// Whether background workers execute work or fake it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerMode {
    #[default]
    Execute,
    Fake,
}

pub type WorkerHandle = Arc<Mutex<WorkerMode>>;

/// Switches background-worker execution to a non-executing fake mode.
pub struct WorkerCapability {
    handle: WorkerHandle,
    prior: Option<WorkerMode>,
}

impl WorkerCapability {
    pub fn new(handle: WorkerHandle) -> Self {
        Self {
            handle,
            prior: None,
        }
    }
}

impl Capability for WorkerCapability {
    fn name(&self) -> &'static str {
        "worker"
    }

    fn engage(&mut self) -> Result<()> {
        let mut mode = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        self.prior = Some(std::mem::replace(&mut *mode, WorkerMode::Fake));
        Ok(())
    }

    fn restore(&mut self) {
        if let Some(prior) = self.prior.take() {
            *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = prior;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ShiftError;

    #[test]
    fn test_mailer_capability_round_trips() {
        let handle: MailerHandle = Arc::new(Mutex::new(DeliveryMode::Deliver));
        let mut cap = MailerCapability::new(Arc::clone(&handle));

        cap.engage().unwrap();
        assert_eq!(*handle.lock().unwrap(), DeliveryMode::Hold);

        cap.restore();
        assert_eq!(*handle.lock().unwrap(), DeliveryMode::Deliver);
    }

    #[test]
    fn test_restore_preserves_pre_existing_guarded_state() {
        // A nested/test context may already be holding mail.
        let handle: MailerHandle = Arc::new(Mutex::new(DeliveryMode::Hold));
        let mut cap = MailerCapability::new(Arc::clone(&handle));

        cap.engage().unwrap();
        cap.restore();
        assert_eq!(*handle.lock().unwrap(), DeliveryMode::Hold);
    }

    #[test]
    fn test_network_capability_restores_prior_policy() {
        let switch = NetworkSwitch::new();
        let mut cap = NetworkCapability::new(Arc::clone(&switch), AllowList::default());

        cap.engage().unwrap();
        assert!(switch.is_guarding());

        cap.restore();
        assert!(!switch.is_guarding());
    }

    #[test]
    fn test_registry_engages_and_restores_everything() {
        let mail: MailerHandle = Arc::new(Mutex::new(DeliveryMode::Deliver));
        let jobs: JobQueueHandle = Arc::new(Mutex::new(QueueMode::Enqueue));
        let workers: WorkerHandle = Arc::new(Mutex::new(WorkerMode::Execute));

        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(MailerCapability::new(Arc::clone(&mail))));
        registry.register(Box::new(JobQueueCapability::new(Arc::clone(&jobs))));
        registry.register(Box::new(WorkerCapability::new(Arc::clone(&workers))));

        registry.engage_all().unwrap();
        assert_eq!(*mail.lock().unwrap(), DeliveryMode::Hold);
        assert_eq!(*jobs.lock().unwrap(), QueueMode::Capture);
        assert_eq!(*workers.lock().unwrap(), WorkerMode::Fake);

        registry.restore_all();
        assert_eq!(*mail.lock().unwrap(), DeliveryMode::Deliver);
        assert_eq!(*jobs.lock().unwrap(), QueueMode::Enqueue);
        assert_eq!(*workers.lock().unwrap(), WorkerMode::Execute);
    }

    #[test]
    fn test_engage_failure_rolls_back_earlier_capabilities() {
        struct Failing;
        impl Capability for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }
            fn engage(&mut self) -> Result<()> {
                Err(ShiftError::config("subsystem unavailable"))
            }
            fn restore(&mut self) {}
        }

        let mail: MailerHandle = Arc::new(Mutex::new(DeliveryMode::Deliver));
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(MailerCapability::new(Arc::clone(&mail))));
        registry.register(Box::new(Failing));

        assert!(registry.engage_all().is_err());
        assert_eq!(*mail.lock().unwrap(), DeliveryMode::Deliver);
    }
}
