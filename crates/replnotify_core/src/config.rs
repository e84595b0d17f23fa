//! Configuration for the event notifier.

/// How events are handed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Observers run on the thread that raised the event.
    #[default]
    Synchronous,
    /// Events are queued and delivered by a dedicated dispatcher thread.
    Queued,
}

/// Configuration for an `EventNotifier`.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Dispatch mode.
    pub dispatch: DispatchMode,
    /// Name of the dispatcher thread in queued mode.
    pub thread_name: String,
}

impl NotifierConfig {
    /// Creates a configuration with synchronous dispatch.
    pub fn new() -> Self {
        Self {
            dispatch: DispatchMode::Synchronous,
            thread_name: "replnotify-dispatch".to_string(),
        }
    }

    /// Creates a configuration with queued dispatch.
    pub fn queued() -> Self {
        Self::new().with_dispatch(DispatchMode::Queued)
    }

    /// Sets the dispatch mode.
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Sets the dispatcher thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self::new()
    }
}
