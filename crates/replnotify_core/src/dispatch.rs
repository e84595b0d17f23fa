//! Delivery of events to observers.
//!
//! Every registration carries a reentrant delivery guard and an `active`
//! flag. Delivery checks the flag while holding the guard. Teardown clears
//! the flag first, so no callback starts afterwards, and then acquires the
//! guard to wait for a callback already running on another thread.
//!
//! A thread that is itself inside a callback never blocks on another
//! registration's guard: two handlers tearing down each other's registrations
//! would otherwise wait on each other forever. In that case teardown only
//! clears the flag and the other thread's current callback may still finish.
//! The guard is reentrant so a handler may unregister itself.
//!
//! In queued mode a single dispatcher thread drains a FIFO channel, which
//! keeps per-handle order without blocking the thread that raised the event.

use crate::error::{NotifyError, NotifyResult};
use crate::observer::ReplicatorObserver;
use crate::stats::NotifierStats;
use crate::types::{DocumentEnded, RegistrationId, ReplicatorHandle, ReplicatorStatus};
use parking_lot::ReentrantMutex;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace};

thread_local! {
    // Number of observer callbacks running on this thread.
    static DELIVERY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Returns true if the current thread is running an observer callback.
pub(crate) fn in_delivery() -> bool {
    DELIVERY_DEPTH.with(|depth| depth.get() > 0)
}

/// An event raised by the replication core.
#[derive(Debug, Clone)]
pub(crate) enum Event {
    Status(ReplicatorStatus),
    DocumentEnded(DocumentEnded),
}

impl Event {
    fn kind(&self) -> &'static str {
        match self {
            Event::Status(_) => "status",
            Event::DocumentEnded(_) => "document_ended",
        }
    }
}

/// One observer bound to one replicator handle.
pub(crate) struct Registration<C> {
    pub(crate) id: RegistrationId,
    pub(crate) handle: ReplicatorHandle,
    observer: Arc<dyn ReplicatorObserver<C>>,
    context: C,
    active: AtomicBool,
    delivery: ReentrantMutex<()>,
}

impl<C> Registration<C> {
    pub(crate) fn new(
        id: RegistrationId,
        handle: ReplicatorHandle,
        observer: Arc<dyn ReplicatorObserver<C>>,
        context: C,
    ) -> Self {
        Self {
            id,
            handle,
            observer,
            context,
            active: AtomicBool::new(true),
            delivery: ReentrantMutex::new(()),
        }
    }

    /// Marks the registration as torn down.
    ///
    /// Blocks until a callback running on another thread has returned, unless
    /// the current thread is itself inside a callback. Returns true if no
    /// callback for this registration can still be running elsewhere.
    pub(crate) fn deactivate(&self) -> bool {
        self.active.store(false, Ordering::Release);
        if in_delivery() {
            return self.delivery.try_lock().is_some();
        }
        let _guard = self.delivery.lock();
        true
    }

    /// Hands `event` to the observer unless the registration was torn down.
    pub(crate) fn deliver(&self, event: &Event, stats: &NotifierStats) {
        let _guard = self.delivery.lock();
        if !self.active.load(Ordering::Acquire) {
            stats.record_dropped_inactive();
            debug!(
                handle = %self.handle,
                registration = %self.id,
                kind = event.kind(),
                "dropping event for torn-down registration"
            );
            return;
        }

        stats.record_delivered();
        trace!(handle = %self.handle, kind = event.kind(), "delivering event");

        DELIVERY_DEPTH.with(|depth| depth.set(depth.get() + 1));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match event {
            Event::Status(status) => {
                self.observer
                    .on_status_changed(self.handle, status, &self.context)
            }
            Event::DocumentEnded(doc) => {
                self.observer
                    .on_document_ended(self.handle, doc, &self.context)
            }
        }));
        DELIVERY_DEPTH.with(|depth| depth.set(depth.get() - 1));

        if let Err(payload) = outcome {
            stats.record_observer_panic();
            let err = NotifyError::ObserverPanicked {
                handle: self.handle,
                message: panic_message(payload.as_ref()),
            };
            error!(error = %err, kind = event.kind(), "observer handler panicked");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

enum Job<C> {
    Deliver(Arc<Registration<C>>, Event),
    Flush(Sender<()>),
}

/// Dispatcher thread for queued mode.
pub(crate) struct Dispatcher<C> {
    sender: Option<Sender<Job<C>>>,
    worker: Option<JoinHandle<()>>,
}

impl<C: Send + Sync + 'static> Dispatcher<C> {
    /// Spawns the dispatcher thread.
    pub(crate) fn spawn(thread_name: &str, stats: Arc<NotifierStats>) -> NotifyResult<Self> {
        let (sender, receiver) = mpsc::channel::<Job<C>>();

        let worker = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                for job in receiver {
                    match job {
                        Job::Deliver(registration, event) => registration.deliver(&event, &stats),
                        Job::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
                debug!("dispatcher queue closed");
            })
            .map_err(|e| NotifyError::Dispatcher(format!("failed to spawn dispatcher: {e}")))?;

        info!(thread = thread_name, "event dispatcher started");

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queues an event. Never blocks.
    pub(crate) fn enqueue(&self, registration: Arc<Registration<C>>, event: Event) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(Job::Deliver(registration, event)).is_err() {
            error!("dispatcher thread is gone; event dropped");
        }
    }

    /// Waits until every job queued before this call has been processed.
    ///
    /// Returns immediately when called from the dispatcher thread itself.
    pub(crate) fn flush(&self) {
        if self.is_dispatcher_thread() {
            return;
        }
        let Some(sender) = &self.sender else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if sender.send(Job::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    fn is_dispatcher_thread(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.thread().id() == thread::current().id())
    }
}

impl<C> Drop for Dispatcher<C> {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is left and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                error!("dispatcher thread panicked");
            }
            info!("event dispatcher stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityLevel;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Counter {
        calls: Mutex<Vec<(ReplicatorHandle, u32)>>,
    }

    impl ReplicatorObserver<u32> for Counter {
        fn on_status_changed(&self, replicator: ReplicatorHandle, _: &ReplicatorStatus, ctx: &u32) {
            self.calls.lock().push((replicator, *ctx));
        }

        fn on_document_ended(&self, _: ReplicatorHandle, _: &DocumentEnded, _: &u32) {
            panic!("document handler failed");
        }
    }

    fn registration(observer: Arc<Counter>) -> Registration<u32> {
        Registration::new(
            RegistrationId::new(1),
            ReplicatorHandle::new(10),
            observer,
            42,
        )
    }

    fn doc_event() -> Event {
        Event::DocumentEnded(DocumentEnded {
            pushing: true,
            doc_id: "d".into(),
            rev_id: "1-a".into(),
            flags: Default::default(),
            error: None,
            transient: false,
        })
    }

    #[test]
    fn deliver_passes_handle_and_context() {
        let observer = Arc::new(Counter::default());
        let reg = registration(Arc::clone(&observer));
        let stats = NotifierStats::new();

        reg.deliver(&Event::Status(ReplicatorStatus::new(ActivityLevel::Idle)), &stats);

        assert_eq!(*observer.calls.lock(), vec![(ReplicatorHandle::new(10), 42)]);
        assert_eq!(stats.snapshot().delivered, 1);
    }

    #[test]
    fn deliver_skips_deactivated() {
        let observer = Arc::new(Counter::default());
        let reg = registration(Arc::clone(&observer));
        let stats = NotifierStats::new();

        assert!(reg.deactivate());
        reg.deliver(&Event::Status(ReplicatorStatus::new(ActivityLevel::Idle)), &stats);

        assert!(observer.calls.lock().is_empty());
        assert_eq!(stats.snapshot().dropped_inactive, 1);
    }

    /// Tears down another registration from inside its own callback.
    struct Remover {
        target: Arc<Registration<u32>>,
        settled: Mutex<Option<bool>>,
    }

    impl ReplicatorObserver<u32> for Remover {
        fn on_status_changed(&self, _: ReplicatorHandle, _: &ReplicatorStatus, _: &u32) {
            assert!(in_delivery());
            *self.settled.lock() = Some(self.target.deactivate());
        }

        fn on_document_ended(&self, _: ReplicatorHandle, _: &DocumentEnded, _: &u32) {}
    }

    #[test]
    fn deactivate_inside_callback_does_not_block_on_busy_guard() {
        let target = Arc::new(registration(Arc::new(Counter::default())));
        let remover = Arc::new(Remover {
            target: Arc::clone(&target),
            settled: Mutex::new(None),
        });
        let outer = Registration::new(
            RegistrationId::new(2),
            ReplicatorHandle::new(20),
            Arc::clone(&remover) as Arc<dyn ReplicatorObserver<u32>>,
            0,
        );
        let stats = NotifierStats::new();

        let (held_tx, held_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let holder = {
            let target = Arc::clone(&target);
            thread::spawn(move || {
                let _guard = target.delivery.lock();
                held_tx.send(()).unwrap();
                let _ = done_rx.recv();
            })
        };
        held_rx.recv().unwrap();

        outer.deliver(&Event::Status(ReplicatorStatus::new(ActivityLevel::Busy)), &stats);
        assert!(!in_delivery());
        assert_eq!(*remover.settled.lock(), Some(false));
        assert!(!target.active.load(Ordering::Acquire));

        done_tx.send(()).unwrap();
        holder.join().unwrap();
    }

    #[test]
    fn deliver_contains_panics() {
        let observer = Arc::new(Counter::default());
        let reg = registration(Arc::clone(&observer));
        let stats = NotifierStats::new();

        reg.deliver(&doc_event(), &stats);
        reg.deliver(&Event::Status(ReplicatorStatus::new(ActivityLevel::Busy)), &stats);

        let snap = stats.snapshot();
        assert_eq!(snap.observer_panics, 1);
        assert_eq!(snap.delivered, 2);
        assert_eq!(observer.calls.lock().len(), 1);
    }

    #[test]
    fn panic_message_extraction() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&7u8), "unknown panic");
    }

    #[test]
    fn dispatcher_delivers_in_order_and_flushes() {
        let observer = Arc::new(Counter::default());
        let reg = Arc::new(registration(Arc::clone(&observer)));
        let stats = Arc::new(NotifierStats::new());
        let dispatcher = Dispatcher::spawn("test-dispatch", Arc::clone(&stats)).unwrap();

        for _ in 0..5 {
            dispatcher.enqueue(
                Arc::clone(&reg),
                Event::Status(ReplicatorStatus::new(ActivityLevel::Busy)),
            );
        }
        dispatcher.flush();

        assert_eq!(observer.calls.lock().len(), 5);
        assert_eq!(stats.snapshot().delivered, 5);
    }

    #[test]
    fn dispatcher_drains_on_drop() {
        let observer = Arc::new(Counter::default());
        let reg = Arc::new(registration(Arc::clone(&observer)));
        let stats = Arc::new(NotifierStats::new());
        let dispatcher = Dispatcher::spawn("test-dispatch", Arc::clone(&stats)).unwrap();

        dispatcher.enqueue(reg, Event::Status(ReplicatorStatus::new(ActivityLevel::Idle)));
        drop(dispatcher);

        assert_eq!(observer.calls.lock().len(), 1);
    }
}
