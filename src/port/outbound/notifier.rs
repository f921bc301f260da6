//! Notifier port for workload lifecycle events.
//!
//! This module defines the trait for announcing lifecycle transitions such as
//! uploads awaiting review, review outcomes and build failures.

use crate::domain::{ImageRef, Message, RuntimeHandle, WorkloadKey};
use crate::error::BuildStep;

use super::inbox::Inbox;

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A tenant uploaded a workload that needs operator review.
    Submitted { key: WorkloadKey },
    /// The operator approved a workload and its image was built.
    Approved { key: WorkloadKey, image: ImageRef },
    /// The operator rejected a workload; it was discarded.
    Rejected { key: WorkloadKey },
    /// An approved workload failed to build and remains awaiting review.
    BuildFailed {
        key: WorkloadKey,
        step: BuildStep,
        message: String,
    },
    /// A container was started for a workload.
    Started {
        key: WorkloadKey,
        handle: RuntimeHandle,
    },
    /// A workload was stopped.
    Stopped { key: WorkloadKey },
    /// A workload and all its runtime artifacts were removed.
    Deleted { key: WorkloadKey },
}

impl Event {
    /// Registry key the event refers to.
    #[must_use]
    pub const fn key(&self) -> &WorkloadKey {
        match self {
            Self::Submitted { key }
            | Self::Approved { key, .. }
            | Self::Rejected { key }
            | Self::BuildFailed { key, .. }
            | Self::Started { key, .. }
            | Self::Stopped { key }
            | Self::Deleted { key } => key,
        }
    }
}

/// Trait for notification handlers.
///
/// Implement this trait to receive events from the system.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - The `notify` method should return quickly; spawn a task for slow I/O
pub trait Notifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotifierRegistry {
    fn notify(&self, event: Event) {
        self.notify_all(event);
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{info, warn};
        match event {
            Event::Submitted { key } => {
                info!(workload = %key, "Workload uploaded and needs verification");
            }
            Event::Approved { key, image } => {
                info!(workload = %key, image = %image, "Workload approved and built");
            }
            Event::Rejected { key } => {
                info!(workload = %key, "Workload rejected");
            }
            Event::BuildFailed { key, step, message } => {
                warn!(workload = %key, step = %step, error = %message, "Build failed");
            }
            Event::Started { key, handle } => {
                info!(workload = %key, handle = %handle, "Workload started");
            }
            Event::Stopped { key } => {
                info!(workload = %key, "Workload stopped");
            }
            Event::Deleted { key } => {
                info!(workload = %key, "Workload deleted");
            }
        }
    }
}

/// Delivers review outcomes to the owning tenant's inbox.
pub struct InboxNotifier<I> {
    inbox: I,
}

impl<I: Inbox> InboxNotifier<I> {
    pub const fn new(inbox: I) -> Self {
        Self { inbox }
    }

    fn message_for(event: &Event) -> Option<String> {
        match event {
            Event::Approved { key, .. } => Some(format!(
                "Your code for '{}' has been verified and an image has been created",
                key.name
            )),
            Event::Rejected { key } => {
                Some(format!("Your code for '{}' has been rejected", key.name))
            }
            Event::BuildFailed { key, step, .. } => Some(format!(
                "Your code for '{}' was approved but the build failed ({step}); it is still awaiting review",
                key.name
            )),
            _ => None,
        }
    }
}

impl<I: Inbox> Notifier for InboxNotifier<I> {
    fn notify(&self, event: Event) {
        let Some(body) = Self::message_for(&event) else {
            return;
        };
        let tenant = event.key().tenant.clone();
        if let Err(e) = self.inbox.push(Message::system(tenant.clone(), body)) {
            tracing::warn!(tenant = %tenant, error = %e, "Failed to deliver inbox message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::domain::TenantId;
    use crate::error::Result;

    #[derive(Default, Clone)]
    struct VecInbox(Arc<Mutex<Vec<Message>>>);

    impl Inbox for VecInbox {
        fn push(&self, message: Message) -> Result<()> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }

        fn drain(&self, tenant: &TenantId) -> Result<Vec<Message>> {
            let mut all = self.0.lock().unwrap();
            let (mine, rest): (Vec<_>, Vec<_>) =
                all.drain(..).partition(|m| &m.tenant == tenant);
            *all = rest;
            Ok(mine)
        }
    }

    struct Counting(Arc<Mutex<usize>>);

    impl Notifier for Counting {
        fn notify(&self, _event: Event) {
            *self.0.lock().unwrap() += 1;
        }
    }

    fn key() -> WorkloadKey {
        WorkloadKey::parse("alice", "bot").unwrap()
    }

    #[test]
    fn registry_broadcasts_to_all() {
        let count = Arc::new(Mutex::new(0));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(Counting(Arc::clone(&count))));
        registry.register(Box::new(Counting(Arc::clone(&count))));
        registry.register(Box::new(NullNotifier));
        assert_eq!(registry.len(), 3);

        registry.notify_all(Event::Stopped { key: key() });
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn inbox_receives_review_outcomes_only() {
        let inbox = VecInbox::default();
        let notifier = InboxNotifier::new(inbox.clone());

        notifier.notify(Event::Submitted { key: key() });
        notifier.notify(Event::Stopped { key: key() });
        notifier.notify(Event::Rejected { key: key() });

        let messages = inbox.drain(&key().tenant).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains("rejected"));
        assert_eq!(messages[0].author, "Server");
    }
}
