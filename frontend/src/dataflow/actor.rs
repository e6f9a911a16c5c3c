//! Single-value Actor implementation for reactive state management
//!
//! An Actor owns one value behind a `tokio::sync::watch` channel and one
//! processing task. Only the task mutates the value; everyone else reads
//! snapshots or awaits changes through [`Actor::signal`].

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Aborts the processing task once the last Actor clone is dropped.
#[derive(Debug)]
struct TaskHandle(JoinHandle<()>);

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Single-value reactive state container for the Actor+Relay architecture.
///
/// # Core Principles
///
/// - **Single Point of Mutation**: only the processor task writes the value
/// - **Sequential Processing**: events are handled one at a time; events on
///   one relay keep their send order, events on different relays do not
/// - **Scoped Lifetime**: dropping the last clone aborts the task, so timers
///   and connections owned by the task are released synchronously
///
/// # Examples
///
/// ```rust
/// use frontend::dataflow::{Actor, relay};
/// use futures::StreamExt;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let (increment_relay, mut increment_stream) = relay::<u32>();
///
/// let counter = Actor::new(0u32, async move |state| {
///     while let Some(amount) = increment_stream.next().await {
///         state.send_modify(|count| *count += amount);
///     }
/// });
///
/// increment_relay.send(5);
/// counter.signal().wait_for(|count| *count == 5).await.unwrap();
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    state: watch::Receiver<T>,
    task_handle: Arc<TaskHandle>,
}

impl<T> Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an Actor with initial state and its event processing loop.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn new<F, Fut>(initial_state: T, processor: F) -> Self
    where
        F: FnOnce(watch::Sender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, state) = watch::channel(initial_state);
        let task_handle = Arc::new(TaskHandle(tokio::spawn(processor(sender))));
        Self { state, task_handle }
    }

    /// Receiver that observes every state change.
    pub fn signal(&self) -> watch::Receiver<T> {
        self.state.clone()
    }

    /// Clone of the current value, for render passes.
    pub fn snapshot(&self) -> T {
        self.state.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.state.borrow())
    }

    pub fn is_running(&self) -> bool {
        !self.task_handle.0.is_finished()
    }

    /// Abort the processing task now, even if other clones are alive.
    /// The last published value stays readable.
    pub fn stop(&self) {
        self.task_handle.0.abort();
    }
}
