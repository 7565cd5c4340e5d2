//! Shared fixtures for integration tests: an in-process fake Moonraker and
//! a sink that records every call.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use moonraker_bridge::{ClientOptions, LifecycleSink, MoonrakerClient, ServerAddress};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Options
// ============================================================================

/// Options with every delay shortened for tests.
pub fn fast_options() -> ClientOptions {
    ClientOptions::new()
        .with_request_timeout(Duration::from_millis(300))
        .with_reconnect_delay(Duration::from_millis(50))
        .with_connect_timeout(Duration::from_secs(2))
        .with_klippy_poll_interval(Duration::from_millis(10))
}

/// Builds a client pointed at `fake`.
pub fn client_for(
    fake: &FakeMoonraker,
    sink: Arc<RecordingSink>,
    options: ClientOptions,
) -> MoonrakerClient {
    MoonrakerClient::builder()
        .address(ServerAddress::new("127.0.0.1", fake.port()))
        .sink(sink)
        .printer_id("test-printer")
        .options(options)
        .build()
        .expect("client")
}

/// Polls `condition` every 5ms until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    condition()
}

// ============================================================================
// FakeMoonraker
// ============================================================================

/// Scripted state shared by every connection to the fake.
pub struct FakeState {
    /// `klippy_state` answers, front first. `ready` once empty.
    klippy_states: Mutex<VecDeque<String>>,
    /// Printer objects served by `printer.objects.query`.
    objects: Mutex<Map<String, Value>>,
    /// Writer for the most recent connection.
    push_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    pub connections: AtomicUsize,
    pub server_info_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
}

/// In-process Moonraker speaking just enough JSON-RPC for the client.
///
/// Special methods:
///
/// | Method | Reply |
/// |--------|-------|
/// | `never.reply` | none |
/// | `fail.me` | error object, code 400 |
/// | `empty.reply` | neither result nor error |
/// | anything else unknown | `"ok"` |
pub struct FakeMoonraker {
    port: u16,
    state: Arc<FakeState>,
    task: JoinHandle<()>,
}

impl FakeMoonraker {
    /// Binds to a random local port and starts accepting.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let mut objects = Map::new();
        objects.insert(
            "print_stats".into(),
            json!({
                "state": "standby",
                "filename": "",
                "print_duration": 0.0,
                "total_duration": 0.0,
                "message": ""
            }),
        );
        objects.insert("virtual_sdcard".into(), json!({ "progress": 0.0 }));
        objects.insert(
            "gcode_move".into(),
            json!({ "speed_factor": 1.0, "homing_origin": [0.0, 0.0, 0.2, 0.0] }),
        );

        let state = Arc::new(FakeState {
            klippy_states: Mutex::new(VecDeque::new()),
            objects: Mutex::new(objects),
            push_tx: Mutex::new(None),
            connections: AtomicUsize::new(0),
            server_info_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        });

        let task = tokio::spawn(accept_loop(listener, Arc::clone(&state)));
        Self { port, state, task }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &FakeState {
        &self.state
    }

    /// Queues `klippy_state` answers for `server.info`.
    pub fn script_klippy_states(&self, states: &[&str]) {
        let mut queue = self.state.klippy_states.lock();
        queue.extend(states.iter().map(|s| (*s).to_string()));
    }

    /// Replaces one printer object.
    pub fn set_object(&self, name: &str, value: Value) {
        self.state.objects.lock().insert(name.to_string(), value);
    }

    /// Pushes a notification on the most recent connection.
    pub fn push(&self, method: &str, params: Value) {
        let frame = json!({ "jsonrpc": "2.0", "method": method, "params": params });
        self.push_raw(&frame.to_string());
    }

    /// Pushes a raw text frame on the most recent connection.
    pub fn push_raw(&self, text: &str) {
        self.send_message(Message::Text(text.to_string().into()));
    }

    /// Closes the most recent connection from the server side.
    pub fn close_current(&self) {
        self.send_message(Message::Close(None));
    }

    fn send_message(&self, message: Message) {
        if let Some(tx) = self.state.push_tx.lock().as_ref() {
            let _ = tx.send(message);
        }
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn server_info_calls(&self) -> usize {
        self.state.server_info_calls.load(Ordering::SeqCst)
    }
}

impl Drop for FakeMoonraker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<FakeState>) {
    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(serve(stream, Arc::clone(&state)));
    }
}

async fn serve(stream: TcpStream, state: Arc<FakeState>) {
    let Ok(ws_stream) = accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    *state.push_tx.lock() = Some(tx.clone());
    state.connections.fetch_add(1, Ordering::SeqCst);

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = read.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        if let Some(reply) = answer(&state, &frame) {
            let _ = tx.send(Message::Text(reply.to_string().into()));
        }
    }

    writer.abort();
}

fn answer(state: &FakeState, frame: &Value) -> Option<Value> {
    let id = frame.get("id")?.clone();
    let method = frame.get("method").and_then(Value::as_str).unwrap_or_default();

    let result = match method {
        "server.info" => {
            state.server_info_calls.fetch_add(1, Ordering::SeqCst);
            let klippy = state
                .klippy_states
                .lock()
                .pop_front()
                .unwrap_or_else(|| "ready".to_string());
            json!({ "klippy_connected": true, "klippy_state": klippy })
        }

        "printer.objects.subscribe" => {
            state.subscribe_calls.fetch_add(1, Ordering::SeqCst);
            json!({ "eventtime": 1.0, "status": {} })
        }

        "printer.objects.query" => {
            state.query_calls.fetch_add(1, Ordering::SeqCst);
            let objects = state.objects.lock();
            let status: Map<String, Value> = frame["params"]["objects"]
                .as_object()
                .map(|requested| {
                    requested
                        .keys()
                        .filter_map(|name| objects.get(name).map(|v| (name.clone(), v.clone())))
                        .collect()
                })
                .unwrap_or_default();
            json!({ "eventtime": 1.0, "status": status })
        }

        "never.reply" => return None,

        "fail.me" => {
            return Some(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": 400, "message": "Bad request" }
            }));
        }

        "empty.reply" => return Some(json!({ "jsonrpc": "2.0", "id": id })),

        _ => json!("ok"),
    };

    Some(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

// ============================================================================
// RecordingSink
// ============================================================================

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Started(String),
    Paused(Option<String>),
    Resumed(Option<String>),
    Progress(f64),
    Restore {
        state: String,
        filename: Option<String>,
        total_duration: Option<f64>,
    },
}

/// Sink that records calls and can hold progress calls back.
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    octo_keys: Mutex<Vec<String>>,
    printer_id: Mutex<Option<String>>,
    progress_gate: Option<Semaphore>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A sink whose `on_print_progress` never returns.
    pub fn blocking_progress() -> Arc<Self> {
        Arc::new(Self {
            progress_gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn restore_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, SinkCall::Restore { .. }))
            .count()
    }

    pub fn octo_keys(&self) -> Vec<String> {
        self.octo_keys.lock().clone()
    }

    pub fn printer_id(&self) -> Option<String> {
        self.printer_id.lock().clone()
    }

    fn record(&self, call: SinkCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl LifecycleSink for RecordingSink {
    async fn on_started(&self, filename: &str) {
        self.record(SinkCall::Started(filename.to_string()));
    }

    async fn on_paused(&self, filename: Option<&str>) {
        self.record(SinkCall::Paused(filename.map(str::to_string)));
    }

    async fn on_resume(&self, filename: Option<&str>) {
        self.record(SinkCall::Resumed(filename.map(str::to_string)));
    }

    async fn on_print_progress(&self, percent: f64) {
        if let Some(gate) = &self.progress_gate {
            let _permit = gate.acquire().await;
        }
        self.record(SinkCall::Progress(percent));
    }

    async fn on_restore_print_if_needed(
        &self,
        state: &str,
        filename: Option<&str>,
        total_duration_sec: Option<f64>,
    ) {
        self.record(SinkCall::Restore {
            state: state.to_string(),
            filename: filename.map(str::to_string),
            total_duration: total_duration_sec,
        });
    }

    fn set_printer_id(&self, printer_id: &str) {
        *self.printer_id.lock() = Some(printer_id.to_string());
    }

    fn set_octo_key(&self, octo_key: &str) {
        self.octo_keys.lock().push(octo_key.to_string());
    }
}
