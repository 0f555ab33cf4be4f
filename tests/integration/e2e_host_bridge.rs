//! End-to-end tests for the `glance-host` binary (stdin/stdout JSON bridge).
//!
//! Each test spawns a fresh subprocess with its data and config directories
//! pointed at a temp dir, sends JSON commands over stdin, and reads JSON
//! responses/events from stdout.

use crate::helpers::{drain_events, memory_engine};
use glance::host::{CommandEnvelope, CommandName, command_channel_with_events, event_targets};
use glance::{GlanceConfig, InstanceId, WidgetEngine};
use glance::clock::{ManualClock, MonotonicInstant};
use glance::render::TimerRenderer;
use glance::store::MemoryKv;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Test harness
// ---------------------------------------------------------------------------

struct HostBridgeHarness {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    reader: Lines<BufReader<ChildStdout>>,
}

impl HostBridgeHarness {
    async fn spawn(dir: &Path) -> Self {
        let binary = env!("CARGO_BIN_EXE_glance-host");

        let mut child = Command::new(binary)
            .env("GLANCE_DATA_DIR", dir.join("data"))
            .env("GLANCE_CONFIG_DIR", dir.join("config"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap_or_else(|e| panic!("failed to spawn glance-host at {binary}: {e}"));

        let child_stdin = child.stdin.take().expect("no stdin on child process");
        let child_stdout = child.stdout.take().expect("no stdout on child process");

        Self {
            child,
            stdin: BufWriter::new(child_stdin),
            reader: BufReader::new(child_stdout).lines(),
        }
    }

    async fn write(&mut self, cmd: &Value) {
        let mut json = serde_json::to_string(cmd).unwrap();
        json.push('\n');
        self.stdin.write_all(json.as_bytes()).await.unwrap();
        self.stdin.flush().await.unwrap();
    }

    /// Send a command and return its `ResponseEnvelope`, skipping events.
    async fn send(&mut self, cmd: Value) -> Value {
        let request_id = cmd["request_id"].clone();
        self.write(&cmd).await;
        loop {
            let val = self.read_line().await;
            if val.get("ok").is_some() && val["request_id"] == request_id {
                return val;
            }
        }
    }

    /// Send a command and collect events until its response and an event
    /// named `event` have both arrived.
    async fn send_expecting_event(&mut self, cmd: Value, event: &str) -> (Value, Value) {
        let request_id = cmd["request_id"].clone();
        self.write(&cmd).await;

        let mut response = None;
        let mut found = None;
        while response.is_none() || found.is_none() {
            let val = self.read_line().await;
            if val.get("ok").is_some() && val["request_id"] == request_id {
                response = Some(val);
            } else if val["event"] == event {
                found = Some(val);
            }
        }
        (response.unwrap(), found.unwrap())
    }

    async fn read_line(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), self.reader.next_line())
            .await
            .expect("timeout reading from glance-host")
            .expect("IO error reading from glance-host")
            .expect("unexpected EOF from glance-host");
        serde_json::from_str(&line).unwrap_or_else(|e| {
            panic!("invalid JSON from glance-host: {e}\nraw line: {line}");
        })
    }

    /// Close stdin and verify the process exits cleanly (code 0).
    async fn shutdown(mut self) {
        drop(self.stdin);
        let status = tokio::time::timeout(Duration::from_secs(5), self.child.wait())
            .await
            .expect("timeout waiting for glance-host to exit")
            .expect("failed to wait for glance-host");
        assert!(status.success(), "glance-host exited with: {status}");
    }
}

/// Build a `CommandEnvelope` JSON value with a unique request ID.
fn make_cmd(command: &str, payload: Value) -> Value {
    serde_json::json!({
        "v": 1,
        "request_id": format!("test-{}", uuid::Uuid::new_v4()),
        "command": command,
        "payload": payload
    })
}

// ---------------------------------------------------------------------------
// Subprocess tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn e2e_host_ping_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = HostBridgeHarness::spawn(dir.path()).await;

    let pong = h.send(make_cmd("host.ping", serde_json::json!({}))).await;
    assert_eq!(pong["ok"], true);
    assert_eq!(pong["payload"]["pong"], true);

    let version = h
        .send(make_cmd("host.version", serde_json::json!({})))
        .await;
    assert_eq!(version["payload"]["contract_version"], 1);
    assert_eq!(version["payload"]["channel"], "glance_host_v1");
    h.shutdown().await;
}

#[tokio::test]
async fn e2e_timer_start_pushes_status_render() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = HostBridgeHarness::spawn(dir.path()).await;

    let (resp, event) = h
        .send_expecting_event(
            make_cmd("timer.start", serde_json::json!({"instance_id": "w1"})),
            "render.status",
        )
        .await;
    assert_eq!(resp["ok"], true);
    assert_eq!(resp["payload"]["outcome"], "started");
    assert_eq!(event["payload"]["instance_id"], "w1");
    assert_eq!(event["payload"]["running"], true);
    assert_eq!(event["payload"]["primary_action"], "pause");

    let reset = h
        .send(make_cmd("timer.reset", serde_json::json!({"instance_id": "w1"})))
        .await;
    assert_eq!(reset["payload"]["phase"], "stopped");
    h.shutdown().await;
}

#[tokio::test]
async fn e2e_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = HostBridgeHarness::spawn(dir.path()).await;
    first
        .send(make_cmd("widget.bind", serde_json::json!({"instance_id": "w1"})))
        .await;
    first
        .send(make_cmd(
            "list.replace",
            serde_json::json!({"data": [{"name": "Math", "time": "7:15"}]}),
        ))
        .await;
    first
        .send(make_cmd("timer.start", serde_json::json!({"instance_id": "w1"})))
        .await;
    let stop = first
        .send(make_cmd("runtime.stop", serde_json::json!({})))
        .await;
    assert_eq!(stop["ok"], true);
    first.shutdown().await;

    let mut second = HostBridgeHarness::spawn(dir.path()).await;
    let status = second
        .send(make_cmd("timer.status", serde_json::json!({"instance_id": "w1"})))
        .await;
    assert_eq!(status["payload"]["phase"], "running");
    assert_eq!(status["payload"]["ticking"], true);

    let list = second
        .send(make_cmd("list.snapshot", serde_json::json!({})))
        .await;
    assert_eq!(list["payload"]["count"], 1);
    assert_eq!(list["payload"]["rows"][0]["time"], "7:15 AM");
    second.shutdown().await;
}

#[tokio::test]
async fn e2e_bad_input_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = HostBridgeHarness::spawn(dir.path()).await;

    h.stdin.write_all(b"{oops\n").await.unwrap();
    h.stdin.flush().await.unwrap();
    let parse_error = h.read_line().await;
    assert_eq!(parse_error["request_id"], "parse-error");
    assert_eq!(parse_error["ok"], false);

    let missing = h
        .send(make_cmd("timer.pause", serde_json::json!({})))
        .await;
    assert_eq!(missing["ok"], false);

    let pong = h.send(make_cmd("host.ping", serde_json::json!({}))).await;
    assert_eq!(pong["ok"], true);
    h.shutdown().await;
}

// ---------------------------------------------------------------------------
// In-process channel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unbind_keeps_timer_and_emits_event() {
    let (event_tx, mut event_rx) = broadcast::channel(64);
    let clock = ManualClock::new(MonotonicInstant::ZERO);
    let engine = Arc::new(WidgetEngine::new(
        Arc::new(MemoryKv::new()),
        Arc::new(clock.clone()),
        event_targets(&event_tx),
        &GlanceConfig::default(),
    ));
    let (client, server) = command_channel_with_events(8, event_tx, Arc::clone(&engine));
    tokio::spawn(server.run());

    let payload = serde_json::json!({"instance_id": "w1"});
    for command in [CommandName::WidgetBind, CommandName::TimerStart] {
        let resp = client
            .send(CommandEnvelope::new("r", command, payload.clone()))
            .await
            .unwrap();
        assert!(resp.ok);
    }
    clock.advance(Duration::from_secs(9));
    drain_events(&mut event_rx);

    let resp = client
        .send(CommandEnvelope::new("r", CommandName::WidgetUnbind, payload))
        .await
        .unwrap();
    assert!(resp.ok);

    let events = drain_events(&mut event_rx);
    assert!(events.iter().any(|e| e.event == "widget.unbound"));
    let id = InstanceId::new("w1");
    assert!(!engine.is_ticking(&id));
    assert!(engine.status(&id).running);
    assert_eq!(engine.status(&id).elapsed, Duration::from_secs(9));
}

#[tokio::test]
async fn recording_and_event_renderers_agree() {
    let t = memory_engine();
    let id = InstanceId::new("w1");
    t.engine.start(&id);
    t.clock.advance(Duration::from_secs(61));

    let (event_tx, mut event_rx) = broadcast::channel(8);
    let targets = event_targets(&event_tx);
    let view = t.engine.timer_view(&id);
    targets.summary.render_timer(&view).unwrap();

    let events = drain_events(&mut event_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "render.summary");
    assert_eq!(events[0].payload["clock_text"], "00:01:01");
    assert_eq!(events[0].payload["headline"], "⏱ 00:01:01");
}
