// src/scanner/controller.rs
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::poll_loop::run_poll_loop;
use super::stream_loop::run_stream_loop;
use super::{ScanContext, ScannerState, StateCell};
use crate::error::ControlError;
use crate::lead::LeadSource;
use crate::sources::discord::ChatStream;
use crate::sources::SourceAdapter;

type WorkerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

struct Slot {
    state: StateCell,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Slot {
    fn idle() -> Self {
        Self {
            state: StateCell::new(ScannerState::Stopped),
            token: CancellationToken::new(),
            handle: None,
        }
    }
}

/// Sets the slot to Stopped when the worker future ends, including on panic.
struct ExitGuard {
    source: LeadSource,
    state: StateCell,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.state.mark_stopped();
        gauge!("scanner_running", "source" => self.source.as_str()).set(0.0);
    }
}

/// Owns one background loop per source and its lifecycle state.
pub struct ScannerController {
    ctx: Arc<ScanContext>,
    pollers: HashMap<LeadSource, Arc<dyn SourceAdapter>>,
    stream: Option<Arc<dyn ChatStream>>,
    slots: Mutex<HashMap<LeadSource, Slot>>,
}

impl ScannerController {
    pub fn new(ctx: Arc<ScanContext>) -> Self {
        Self {
            ctx,
            pollers: HashMap::new(),
            stream: None,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.pollers.insert(adapter.source(), adapter);
        self
    }

    pub fn with_adapters(self, adapters: impl IntoIterator<Item = Arc<dyn SourceAdapter>>) -> Self {
        adapters.into_iter().fold(self, Self::with_adapter)
    }

    pub fn with_stream(mut self, stream: Arc<dyn ChatStream>) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn context(&self) -> &Arc<ScanContext> {
        &self.ctx
    }

    /// Sources that have a worker registered.
    pub fn sources(&self) -> Vec<LeadSource> {
        LeadSource::ALL
            .into_iter()
            .filter(|s| self.is_registered(*s))
            .collect()
    }

    fn is_registered(&self, source: LeadSource) -> bool {
        self.pollers.contains_key(&source)
            || self.stream.as_ref().is_some_and(|s| s.source() == source)
    }

    /// Arm `source`. Only valid from `Stopped`; settings are loaded and
    /// validated before any task is spawned.
    pub fn start(&self, source: LeadSource) -> Result<ScannerState, ControlError> {
        // read outside the lock; the file read blocks
        let settings = self.ctx.settings.load().map_err(ControlError::Settings)?;

        let mut slots = self.slots.lock();
        let slot = slots.entry(source).or_insert_with(Slot::idle);

        let current = slot.state.get();
        if current != ScannerState::Stopped {
            return Err(ControlError::InvalidTransition {
                scanner: source,
                state: current,
            });
        }

        let token = CancellationToken::new();
        let (state, task): (StateCell, WorkerFuture) =
            if let Some(adapter) = self.pollers.get(&source) {
                adapter.validate(&settings)?;
                let fut = run_poll_loop(self.ctx.clone(), adapter.clone(), token.clone(), settings);
                (StateCell::new(ScannerState::Running), Box::pin(fut))
            } else if let Some(stream) = self.stream.as_ref().filter(|s| s.source() == source) {
                stream.validate(&settings)?;
                let state = StateCell::new(ScannerState::Starting);
                let fut = run_stream_loop(
                    self.ctx.clone(),
                    stream.clone(),
                    token.clone(),
                    state.clone(),
                    settings,
                );
                (state, Box::pin(fut))
            } else {
                return Err(ControlError::UnknownSource(source));
            };

        let initial = state.get();
        slot.state = state;
        let guard = ExitGuard {
            source,
            state: slot.state.clone(),
        };
        slot.token = token;
        gauge!("scanner_running", "source" => source.as_str()).set(1.0);
        slot.handle = Some(tokio::spawn(async move {
            let _guard = guard;
            task.await;
        }));

        tracing::info!(target: "scanner", %source, state = ?initial, "scanner started");
        self.ctx.logs.info(source, "scanner started");
        Ok(initial)
    }

    /// Request a stop. Idempotent; does not wait for the worker to exit.
    pub fn stop(&self, source: LeadSource) -> ScannerState {
        let slots = self.slots.lock();
        let Some(slot) = slots.get(&source) else {
            return ScannerState::Stopped;
        };
        let was_active = slot.state.get().is_active();
        let state = slot.state.request_stop();
        slot.token.cancel();
        if was_active {
            tracing::info!(target: "scanner", %source, "stop requested");
            self.ctx.logs.info(source, "stop requested");
        }
        state
    }

    pub fn state(&self, source: LeadSource) -> ScannerState {
        self.slots
            .lock()
            .get(&source)
            .map_or(ScannerState::Stopped, |s| s.state.get())
    }

    /// State of every registered source, in display order.
    pub fn states(&self) -> Vec<(LeadSource, ScannerState)> {
        self.sources()
            .into_iter()
            .map(|s| (s, self.state(s)))
            .collect()
    }

    pub fn stop_all(&self) {
        let sources: Vec<LeadSource> = self.slots.lock().keys().copied().collect();
        for source in sources {
            self.stop(source);
        }
    }

    /// Stop everything and wait up to `grace` for the workers to exit.
    pub async fn shutdown(&self, grace: Duration) {
        self.stop_all();
        let handles: Vec<(LeadSource, JoinHandle<()>)> = self
            .slots
            .lock()
            .iter_mut()
            .filter_map(|(s, slot)| slot.handle.take().map(|h| (*s, h)))
            .collect();
        for (source, handle) in handles {
            if tokio::time::timeout(grace, handle).await.is_err() {
                tracing::warn!(target: "scanner", %source, "worker did not exit within grace period");
            }
        }
    }
}
