//! The event notifier.
//!
//! [`EventNotifier`] routes events raised by the replication core to at most
//! one observer per replicator handle.
//!
//! # Thread safety
//!
//! - `notify_*` may be called from any thread, concurrently for different
//!   handles. Events for one handle are delivered in the order they were
//!   raised.
//! - The registration table lock is only held for lookups and updates, never
//!   while observer code runs.
//! - Once `unregister` returns, no new callback starts for that
//!   registration.
//! - Called from outside any callback, `unregister` also waits for a
//!   callback already running on another thread. Called from inside a
//!   callback, it never blocks on another thread's delivery; that thread's
//!   current callback may still finish, and nothing is delivered after it.
//! - Handlers may unregister their own registration or any other one.
//!
//! # Usage
//!
//! ```rust
//! use replnotify_core::{
//!     ActivityLevel, DocumentEnded, EventNotifier, ReplicatorHandle, ReplicatorObserver,
//!     ReplicatorStatus,
//! };
//!
//! struct Printer;
//!
//! impl ReplicatorObserver<String> for Printer {
//!     fn on_status_changed(&self, r: ReplicatorHandle, s: &ReplicatorStatus, ctx: &String) {
//!         println!("[{ctx}] {r}: {:?}", s.level);
//!     }
//!     fn on_document_ended(&self, r: ReplicatorHandle, d: &DocumentEnded, ctx: &String) {
//!         println!("[{ctx}] {r}: {} done", d.doc_id);
//!     }
//! }
//!
//! let notifier = EventNotifier::new();
//! let handle = ReplicatorHandle::new(1);
//! let id = notifier.register(handle, Printer, "main".to_string()).unwrap();
//!
//! notifier.notify_status(handle, ReplicatorStatus::new(ActivityLevel::Busy));
//! notifier.unregister(id);
//! ```

use crate::config::{DispatchMode, NotifierConfig};
use crate::dispatch::{Dispatcher, Event, Registration};
use crate::error::{NotifyError, NotifyResult};
use crate::error_info::ErrorInfo;
use crate::observer::ReplicatorObserver;
use crate::stats::{NotifierStats, NotifierStatsSnapshot};
use crate::types::{
    DocumentEnded, RegistrationId, ReplicatorHandle, ReplicatorStatus, RevisionFlags,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

struct Registry<C> {
    by_handle: HashMap<ReplicatorHandle, Arc<Registration<C>>>,
    by_id: HashMap<RegistrationId, ReplicatorHandle>,
}

impl<C> Registry<C> {
    fn new() -> Self {
        Self {
            by_handle: HashMap::new(),
            by_id: HashMap::new(),
        }
    }
}

/// Routes replication events to registered observers.
///
/// `C` is the context token type handed back to the observer with every
/// event. The notifier never inspects it.
pub struct EventNotifier<C = ()> {
    config: NotifierConfig,
    registry: Mutex<Registry<C>>,
    next_id: AtomicU64,
    stats: Arc<NotifierStats>,
    dispatcher: Option<Dispatcher<C>>,
}

impl<C: Send + Sync + 'static> EventNotifier<C> {
    /// Creates a notifier with synchronous dispatch.
    pub fn new() -> Self {
        Self {
            config: NotifierConfig::new(),
            registry: Mutex::new(Registry::new()),
            next_id: AtomicU64::new(1),
            stats: Arc::new(NotifierStats::new()),
            dispatcher: None,
        }
    }

    /// Creates a notifier from a configuration.
    ///
    /// Fails only if the dispatcher thread of queued mode cannot be spawned.
    pub fn with_config(config: NotifierConfig) -> NotifyResult<Self> {
        let stats = Arc::new(NotifierStats::new());
        let dispatcher = match config.dispatch {
            DispatchMode::Synchronous => None,
            DispatchMode::Queued => Some(Dispatcher::spawn(&config.thread_name, Arc::clone(&stats))?),
        };

        Ok(Self {
            config,
            registry: Mutex::new(Registry::new()),
            next_id: AtomicU64::new(1),
            stats,
            dispatcher,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Binds `observer` and `context` to `handle`.
    ///
    /// Fails with [`NotifyError::AlreadyRegistered`] if the handle already has
    /// an observer; the existing registration is left untouched.
    pub fn register<O>(&self, handle: ReplicatorHandle, observer: O, context: C) -> NotifyResult<RegistrationId>
    where
        O: ReplicatorObserver<C> + 'static,
    {
        let mut registry = self.registry.lock();
        if registry.by_handle.contains_key(&handle) {
            return Err(NotifyError::AlreadyRegistered { handle });
        }

        let id = RegistrationId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let registration = Registration::new(id, handle, Arc::new(observer), context);
        registry.by_handle.insert(handle, Arc::new(registration));
        registry.by_id.insert(id, handle);
        drop(registry);

        debug!(%handle, registration = %id, "observer registered");
        Ok(id)
    }

    /// Detaches the observer of registration `id`.
    ///
    /// No callback for the registration starts after this call returns.
    /// When called outside any observer callback, it also waits for a
    /// callback already running on another thread to return. When called
    /// from inside a callback it does not wait, so a callback already running
    /// on another thread may still finish. Unknown or already removed ids are
    /// ignored.
    pub fn unregister(&self, id: RegistrationId) {
        let removed = {
            let mut registry = self.registry.lock();
            match registry.by_id.remove(&id) {
                Some(handle) => registry.by_handle.remove(&handle),
                None => None,
            }
        };

        let Some(registration) = removed else {
            return;
        };
        let settled = registration.deactivate();
        debug!(
            handle = %registration.handle,
            registration = %registration.id,
            settled,
            "observer unregistered"
        );
    }

    /// Reports a change in the aggregate status of `handle`.
    ///
    /// Called by the replication core; never fails and never propagates an
    /// observer panic.
    pub fn notify_status(&self, handle: ReplicatorHandle, status: ReplicatorStatus) {
        self.stats.record_status_event();
        self.dispatch(handle, Event::Status(status));
    }

    /// Reports that one document's push or pull attempt finished.
    ///
    /// `is_transient` marks a failure the core will retry by itself.
    #[allow(clippy::too_many_arguments)]
    pub fn notify_document_ended(
        &self,
        handle: ReplicatorHandle,
        pushing: bool,
        doc_id: impl Into<String>,
        rev_id: impl Into<String>,
        flags: RevisionFlags,
        error: Option<ErrorInfo>,
        is_transient: bool,
    ) {
        self.stats.record_document_event();
        self.dispatch(
            handle,
            Event::DocumentEnded(DocumentEnded {
                pushing,
                doc_id: doc_id.into(),
                rev_id: rev_id.into(),
                flags,
                error,
                transient: is_transient,
            }),
        );
    }

    /// Returns true if `handle` has an active observer.
    pub fn is_registered(&self, handle: ReplicatorHandle) -> bool {
        self.registry.lock().by_handle.contains_key(&handle)
    }

    /// Returns the number of active registrations.
    pub fn registration_count(&self) -> usize {
        self.registry.lock().by_handle.len()
    }

    /// Returns the handle bound by registration `id`, if still active.
    pub fn handle_of(&self, id: RegistrationId) -> Option<ReplicatorHandle> {
        self.registry.lock().by_id.get(&id).copied()
    }

    /// Returns a snapshot of the notifier counters.
    pub fn stats(&self) -> NotifierStatsSnapshot {
        self.stats.snapshot()
    }

    /// Waits until every event raised before this call has been delivered or
    /// dropped. Returns immediately in synchronous mode.
    pub fn flush(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.flush();
        }
    }

    fn dispatch(&self, handle: ReplicatorHandle, event: Event) {
        let registration = self.registry.lock().by_handle.get(&handle).cloned();

        let Some(registration) = registration else {
            self.stats.record_dropped_unknown();
            let err = NotifyError::UnknownHandle { handle };
            debug!(error = %err, "event dropped");
            return;
        };

        match &self.dispatcher {
            Some(dispatcher) => dispatcher.enqueue(registration, event),
            None => registration.deliver(&event, &self.stats),
        }
    }
}

impl<C: Send + Sync + 'static> Default for EventNotifier<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventNotifier<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("dispatch", &self.config.dispatch)
            .field("registrations", &self.registry.lock().by_handle.len())
            .finish()
    }
}
