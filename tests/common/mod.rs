//! Shared test helpers: a recording transport and an event recorder.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use strum::IntoEnumIterator;
use tokio::sync::Notify;

use genai_live::error::{LiveError, Result};
use genai_live::live::{
    EventBus, EventKind, LiveCallbacks, LiveEvent, LiveSession, LiveTransport,
};
use genai_live::types::{
    Blob, Content, FunctionResponse, LiveConnectConfig, StreamingLog,
};

/// One call observed on a mock session.
#[derive(Debug, Clone, PartialEq)]
pub enum SentUnit {
    RealtimeInput(Blob),
    ToolResponse(Vec<FunctionResponse>),
    ClientContent {
        turns: Vec<Content>,
        turn_complete: bool,
    },
    Close,
}

#[derive(Default)]
struct MockState {
    connects: Vec<(String, LiveConnectConfig)>,
    callbacks: Vec<LiveCallbacks>,
    sent: Vec<(usize, SentUnit)>,
    fail_next: Option<Failure>,
}

struct Failure {
    message: String,
    after_open: bool,
}

/// A transport that records every connect and every call on its sessions.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    gate: Option<Arc<Notify>>,
    open_on_connect: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            gate: None,
            open_on_connect: true,
        }
    }

    /// Connect attempts stay pending until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn fail_next_connect(&self, message: &str) {
        self.state.lock().unwrap().fail_next = Some(Failure {
            message: message.to_string(),
            after_open: false,
        });
    }

    /// The next connect reports `open` and then fails, like a setup
    /// frame that cannot be written after the handshake.
    pub fn open_then_fail_next_connect(&self, message: &str) {
        self.state.lock().unwrap().fail_next = Some(Failure {
            message: message.to_string(),
            after_open: true,
        });
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects.len()
    }

    pub fn connects(&self) -> Vec<(String, LiveConnectConfig)> {
        self.state.lock().unwrap().connects.clone()
    }

    /// Callbacks handed to the `index`-th connect call.
    pub fn callbacks(&self, index: usize) -> LiveCallbacks {
        self.state.lock().unwrap().callbacks[index].clone()
    }

    pub fn last_callbacks(&self) -> LiveCallbacks {
        let state = self.state.lock().unwrap();
        state.callbacks.last().cloned().expect("no connect attempt yet")
    }

    /// Every unit sent on any session, in order.
    pub fn sent(&self) -> Vec<SentUnit> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|(_, unit)| unit.clone())
            .collect()
    }

    /// Units sent on the `index`-th session.
    pub fn sent_on(&self, index: usize) -> Vec<SentUnit> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(session, _)| *session == index)
            .map(|(_, unit)| unit.clone())
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.sent()
            .iter()
            .filter(|unit| **unit == SentUnit::Close)
            .count()
    }
}

#[async_trait]
impl LiveTransport for MockTransport {
    async fn connect(
        &self,
        model: &str,
        config: &LiveConnectConfig,
        callbacks: LiveCallbacks,
    ) -> Result<Box<dyn LiveSession>> {
        let index = {
            let mut state = self.state.lock().unwrap();
            state.connects.push((model.to_string(), config.clone()));
            state.callbacks.push(callbacks.clone());
            state.connects.len() - 1
        };

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let failure = self.state.lock().unwrap().fail_next.take();
        if let Some(failure) = failure {
            if failure.after_open {
                callbacks.open();
                return Err(LiveError::Transport(failure.message));
            }
            return Err(LiveError::Connection(failure.message));
        }
        if self.open_on_connect {
            callbacks.open();
        }
        Ok(Box::new(MockSession {
            index,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSession {
    index: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn record(&self, unit: SentUnit) -> Result<()> {
        self.state.lock().unwrap().sent.push((self.index, unit));
        Ok(())
    }
}

impl LiveSession for MockSession {
    fn close(&self) {
        let _ = self.record(SentUnit::Close);
    }

    fn send_realtime_input(&self, media: Blob) -> Result<()> {
        self.record(SentUnit::RealtimeInput(media))
    }

    fn send_tool_response(&self, function_responses: Vec<FunctionResponse>) -> Result<()> {
        self.record(SentUnit::ToolResponse(function_responses))
    }

    fn send_client_content(&self, turns: Vec<Content>, turn_complete: bool) -> Result<()> {
        self.record(SentUnit::ClientContent {
            turns,
            turn_complete,
        })
    }
}

/// Collects every event published on a bus.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<LiveEvent>>>,
}

impl Recorder {
    pub fn attach(bus: &EventBus) -> Self {
        let recorder = Self::default();
        for kind in EventKind::iter() {
            let events = Arc::clone(&recorder.events);
            bus.on(kind, move |event| events.lock().unwrap().push(event.clone()));
        }
        recorder
    }

    pub fn events(&self) -> Vec<LiveEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events other than `log` entries.
    pub fn protocol_events(&self) -> Vec<LiveEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.kind() != EventKind::Log)
            .collect()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.protocol_events().iter().map(LiveEvent::kind).collect()
    }

    pub fn logs(&self) -> Vec<StreamingLog> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LiveEvent::Log(log) => Some(log),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}
