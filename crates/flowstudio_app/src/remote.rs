// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bridge between the egui frame loop and async backend calls.
//!
//! Backend futures run on a tokio runtime; completions come back over a
//! channel and are drained once per frame. Every event carries the
//! generation it was spawned under, and events from a previous generation
//! are dropped on receipt: a screen that was torn down while a request was
//! in flight never has its state mutated by the late response.

use flowstudio_client::{ApiError, ExecutionHandle, ExecutionStatus, Flow, UserProfile};
use std::future::Future;
use std::sync::mpsc::{channel, Receiver, Sender};
use tracing::debug;

/// A completed backend call
pub enum RemoteEvent {
    /// Login finished
    LoggedIn(Result<UserProfile, ApiError>),
    /// Flow listing finished
    FlowsListed(Result<Vec<Flow>, ApiError>),
    /// A single flow was fetched for editing
    FlowLoaded(Result<Flow, ApiError>),
    /// Create finished
    FlowCreated(Result<Flow, ApiError>),
    /// Save finished
    FlowSaved(Result<Flow, ApiError>),
    /// Delete finished
    FlowDeleted {
        /// The deleted flow's id
        id: String,
        /// Outcome of the call
        result: Result<(), ApiError>,
    },
    /// Execute finished starting
    ExecutionStarted {
        /// The flow being executed
        flow_id: String,
        /// Outcome of the call
        result: Result<ExecutionHandle, ApiError>,
    },
    /// One execution status poll
    ExecutionPolled {
        /// The flow being executed
        flow_id: String,
        /// Outcome of the poll
        result: Result<ExecutionStatus, ApiError>,
    },
}

/// Sends events back from a spawned task
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<(u64, RemoteEvent)>,
    generation: u64,
}

impl EventSink {
    /// Send an event; silently dropped if the app is shutting down
    pub fn send(&self, event: RemoteEvent) {
        let _ = self.tx.send((self.generation, event));
    }
}

/// Owns the tokio runtime and the result channel
pub struct Remote {
    runtime: tokio::runtime::Runtime,
    tx: Sender<(u64, RemoteEvent)>,
    rx: Receiver<(u64, RemoteEvent)>,
    generation: u64,
}

impl Remote {
    /// Create the runtime and channel pair
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (tx, rx) = channel();
        Ok(Self {
            runtime,
            tx,
            rx,
            generation: 0,
        })
    }

    /// Invalidate all in-flight requests.
    ///
    /// Called on screen transitions; responses spawned before the bump are
    /// ignored when they arrive.
    pub fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Spawn a backend task. The task receives a sink bound to the current
    /// generation and may send any number of events.
    pub fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(EventSink) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let sink = EventSink {
            tx: self.tx.clone(),
            generation: self.generation,
        };
        self.runtime.spawn(task(sink));
    }

    /// Drain completed events for this frame, discarding stale generations
    pub fn poll(&mut self) -> Vec<RemoteEvent> {
        let mut events = Vec::new();
        while let Ok((generation, event)) = self.rx.try_recv() {
            if generation == self.generation {
                events.push(event);
            } else {
                debug!("dropping response from a torn-down screen");
            }
        }
        events
    }
}
