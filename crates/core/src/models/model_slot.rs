use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::shared::error::PipelineError;

/// Produces a loaded model handle, or a human-readable reason it failed.
pub type ModelLoader<T> = Box<dyn FnOnce() -> Result<Arc<T>, String> + Send>;

/// Observable lifecycle of one model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Ready,
    Failed,
    Released,
}

enum SlotState<T: ?Sized> {
    Unloaded,
    Loading,
    Ready(Arc<T>),
    Failed(String),
    Released,
}

/// Holds one lazily loaded model.
///
/// `Unloaded → Loading → Ready | Failed`, and `Released` after teardown.
/// A failed load is final for the life of the slot. The first caller of
/// [`ModelSlot::begin_load`] wins; later calls are no-ops, so concurrent
/// first use loads exactly once.
pub struct ModelSlot<T: ?Sized> {
    name: &'static str,
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T: ?Sized + Send + Sync + 'static> ModelSlot<T> {
    pub fn new(name: &'static str) -> Self {
        Self::with_state(name, SlotState::Unloaded)
    }

    /// A slot that starts out holding `handle`.
    pub fn ready(name: &'static str, handle: Arc<T>) -> Self {
        Self::with_state(name, SlotState::Ready(handle))
    }

    fn with_state(name: &'static str, state: SlotState<T>) -> Self {
        Self {
            name,
            state: Mutex::new(state),
            ready: Condvar::new(),
        }
    }

    pub fn status(&self) -> ModelStatus {
        match *self.lock() {
            SlotState::Unloaded => ModelStatus::Unloaded,
            SlotState::Loading => ModelStatus::Loading,
            SlotState::Ready(_) => ModelStatus::Ready,
            SlotState::Failed(_) => ModelStatus::Failed,
            SlotState::Released => ModelStatus::Released,
        }
    }

    /// Start loading on a background thread if nothing has been loaded yet.
    ///
    /// Returns `true` when this call started the load.
    pub fn begin_load(self: &Arc<Self>, loader: ModelLoader<T>) -> bool {
        {
            let mut state = self.lock();
            if !matches!(*state, SlotState::Unloaded) {
                return false;
            }
            *state = SlotState::Loading;
        }

        let slot = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("load-{}", self.name))
            .spawn(move || slot.finish_load(loader));
        if let Err(e) = spawned {
            self.settle(SlotState::Failed(format!("could not start loader thread: {e}")));
        }
        true
    }

    fn finish_load(&self, loader: ModelLoader<T>) {
        log::info!("Loading {} model", self.name);
        let started = Instant::now();
        // A panicking loader still settles the slot as Failed.
        let outcome = panic::catch_unwind(AssertUnwindSafe(loader)).unwrap_or_else(|payload| {
            Err(format!("loader panicked: {}", panic_message(&*payload)))
        });
        match &outcome {
            Ok(_) => log::info!(
                "{} model loaded in {:.1}s",
                self.name,
                started.elapsed().as_secs_f64()
            ),
            Err(reason) => log::error!("Failed to load {} model: {reason}", self.name),
        }
        self.settle(match outcome {
            Ok(handle) => SlotState::Ready(handle),
            Err(reason) => SlotState::Failed(reason),
        });
    }

    fn settle(&self, next: SlotState<T>) {
        let mut state = self.lock();
        // A teardown during loading wins over the late result.
        if !matches!(*state, SlotState::Released) {
            *state = next;
        }
        drop(state);
        self.ready.notify_all();
    }

    /// The handle if the model is ready right now.
    pub fn get(&self) -> Result<Arc<T>, PipelineError> {
        match &*self.lock() {
            SlotState::Ready(handle) => Ok(Arc::clone(handle)),
            other => Err(self.unavailable(other)),
        }
    }

    /// Block until the model leaves `Loading`, up to `timeout`.
    pub fn wait(&self, timeout: Duration) -> Result<Arc<T>, PipelineError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            match &*state {
                SlotState::Ready(handle) => return Ok(Arc::clone(handle)),
                SlotState::Loading => {}
                other => return Err(self.unavailable(other)),
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(PipelineError::Timeout {
                    operation: "model loading",
                    after: timeout,
                });
            }
            let (guard, _) = self
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Drop the handle. Later lookups fail with `ModelUnavailable`.
    pub fn release(&self) {
        *self.lock() = SlotState::Released;
        self.ready.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unavailable(&self, state: &SlotState<T>) -> PipelineError {
        let reason = match state {
            SlotState::Unloaded => "not loaded".to_string(),
            SlotState::Loading => "still loading".to_string(),
            SlotState::Failed(reason) => format!("load failed: {reason}"),
            SlotState::Released => "released".to_string(),
            SlotState::Ready(_) => "ready".to_string(),
        };
        PipelineError::ModelUnavailable {
            model: self.name,
            reason,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}
