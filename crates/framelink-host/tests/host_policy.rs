//! Origin filtering, duplicate ids, expiry, selection and the handler loop.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use framelink_core::error::FrameLinkError;
use framelink_core::protocol::{Action, SizeReport};
use framelink_embed::RequestOptions;
use framelink_host::dispatch::{IgnoreReason, EXPIRED_ERROR};
use framelink_host::{ActionHandler, HostDispatcher, Inbound, PendingAction, RecordStatus};

mod support;
use support::*;

fn tool_frame(id: &str) -> String {
    json!({
        "type": "tool",
        "messageId": id,
        "payload": { "toolName": "delete_entry", "params": { "id": 7 } }
    })
    .to_string()
}

#[tokio::test]
async fn host_drops_frames_from_foreign_origins() {
    let link = link();
    let mut inbound = pump_host(&link);

    link.frame_port.inject(EVIL_ORIGIN, tool_frame("evil-1"));
    assert!(matches!(
        next_inbound(&mut inbound).await,
        Inbound::Ignored(IgnoreReason::OriginRejected)
    ));
    assert!(!link.host.is_pending("evil-1"));
    assert!(link.host.history().is_empty());

    link.frame_port.inject(FRAME_ORIGIN, tool_frame("ok-1"));
    assert!(matches!(next_inbound(&mut inbound).await, Inbound::Action(_)));
    assert!(link.host.is_pending("ok-1"));

    let m = link.host.metrics();
    assert_eq!(m.frames.get(&[("outcome", "origin_rejected")]), 1);
    assert_eq!(m.frames.get(&[("outcome", "action")]), 1);
    assert_eq!(m.pending.get(&[]), 1);
}

#[tokio::test]
async fn host_ignores_malformed_and_unknown_frames() {
    let link = link();
    let mut inbound = pump_host(&link);

    link.frame_port.inject(FRAME_ORIGIN, "not json");
    link.frame_port
        .inject(FRAME_ORIGIN, json!({ "type": "ui-telemetry" }).to_string());
    link.frame_port.inject(
        FRAME_ORIGIN,
        json!({ "type": "tool", "payload": { "toolName": "x" } }).to_string(),
    );
    link.frame_port.inject(
        FRAME_ORIGIN,
        json!({ "type": "ui-lifecycle-iframe-render-data", "payload": { "renderData": {} } })
            .to_string(),
    );

    let mut reasons = Vec::new();
    for _ in 0..4 {
        match next_inbound(&mut inbound).await {
            Inbound::Ignored(r) => reasons.push(r),
            other => panic!("expected ignored frame, got {other:?}"),
        }
    }
    assert_eq!(
        reasons,
        vec![
            IgnoreReason::BadEnvelope,
            IgnoreReason::UnknownType,
            IgnoreReason::BadEnvelope,
            IgnoreReason::NotForHost,
        ]
    );
    assert_eq!(link.host.pending_count(), 0);
}

#[tokio::test]
async fn duplicate_request_id_is_ignored() {
    let link = link();
    let mut inbound = pump_host(&link);

    link.frame_port.inject(FRAME_ORIGIN, tool_frame("dup"));
    link.frame_port.inject(FRAME_ORIGIN, tool_frame("dup"));

    assert!(matches!(next_inbound(&mut inbound).await, Inbound::Action(_)));
    assert!(matches!(
        next_inbound(&mut inbound).await,
        Inbound::Ignored(IgnoreReason::DuplicateId)
    ));
    assert_eq!(link.host.pending_count(), 1);
    assert_eq!(link.host.history().len(), 1);
}

#[tokio::test]
async fn embedded_ignores_spoofed_response() {
    let link = link();
    let mut inbound = pump_host(&link);

    let mut call = link.client.call_tool("delete_entry", json!({ "id": 7 }), RequestOptions::new());
    let pending = next_action(&mut inbound).await;

    let spoof = json!({
        "type": "ui-message-response",
        "messageId": pending.message_id.as_str(),
        "payload": { "result": { "success": false } }
    })
    .to_string();
    link.host_port.inject(EVIL_ORIGIN, spoof);

    assert!(
        tokio::time::timeout(Duration::from_millis(30), &mut call)
            .await
            .is_err(),
        "spoofed response must not settle the request"
    );

    link.host
        .resolve_request(pending.message_id.as_str(), json!({ "success": true }));
    assert_eq!(call.await.unwrap(), json!({ "success": true }));
}

#[tokio::test]
async fn embedded_ignores_undecodable_response() {
    let link = link();
    let mut inbound = pump_host(&link);

    let mut call = link.client.call_tool("delete_entry", json!({ "id": 7 }), RequestOptions::new());
    let pending = next_action(&mut inbound).await;
    let id = pending.message_id.as_str();

    link.host_port.inject(
        HOST_ORIGIN,
        json!({ "type": "ui-message-response", "messageId": id }).to_string(),
    );
    link.host_port.inject(
        HOST_ORIGIN,
        json!({ "type": "ui-message-response", "messageId": id, "payload": { "error": 42 } })
            .to_string(),
    );

    assert!(
        tokio::time::timeout(Duration::from_millis(50), &mut call)
            .await
            .is_err(),
        "malformed response must not settle the request"
    );

    assert!(link.host.resolve_request(id, json!({ "success": true })));
    assert_eq!(call.await.unwrap(), json!({ "success": true }));
}

#[tokio::test]
async fn embedded_ignores_render_data_from_foreign_origin() {
    let link = link();
    link.host_port.inject(
        EVIL_ORIGIN,
        json!({
            "type": "ui-lifecycle-iframe-render-data",
            "payload": { "renderData": { "entry": { "id": 666 } } }
        })
        .to_string(),
    );
    settle().await;
    assert!(link.client.render_data_log().is_empty());

    link.host.send_render_data(json!({ "entry": { "id": 3 } })).unwrap();
    settle().await;
    assert_eq!(link.client.render_data_log(), vec![json!({ "entry": { "id": 3 } })]);
}

#[tokio::test]
async fn stale_requests_expire() {
    let link = link_with(strict_config("  pending_ttl_ms: 1000"));
    let mut inbound = pump_host(&link);

    let call = link.client.notify("saved", RequestOptions::new());
    let pending = next_action(&mut inbound).await;
    let id = pending.message_id.clone();

    assert_eq!(link.host.expire_stale(), 0);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(link.host.expire_stale(), 1);

    let err = call.await.unwrap_err();
    assert!(matches!(err, FrameLinkError::Remote(_)));
    assert_eq!(err.to_string(), EXPIRED_ERROR);

    assert!(!link.host.resolve_request(id.as_str(), json!({})));
    assert_eq!(link.host.history()[0].status, RecordStatus::Expired);
    assert_eq!(link.host.metrics().pending.get(&[]), 0);
}

#[tokio::test]
async fn sweeper_expires_without_manual_calls() {
    let link = link_with(strict_config("  pending_ttl_ms: 1000"));
    let mut inbound = pump_host(&link);
    let sweeper = link.host.spawn_expiry_sweeper().expect("ttl configured");

    let call = link.client.notify("saved", RequestOptions::new());
    let pending = next_action(&mut inbound).await;

    let err = tokio::time::timeout(Duration::from_secs(3), call)
        .await
        .expect("sweeper should settle the request")
        .unwrap_err();
    assert!(matches!(err, FrameLinkError::Remote(_)));
    assert_eq!(err.to_string(), EXPIRED_ERROR);

    assert!(!link.host.is_pending(pending.message_id.as_str()));
    assert_eq!(link.host.metrics().pending.get(&[]), 0);
    assert_eq!(link.host.history()[0].status, RecordStatus::Expired);
    sweeper.abort();
}

#[tokio::test]
async fn expiry_disabled_by_default() {
    let link = link();
    assert_eq!(link.host.expire_stale(), 0);
    assert!(link.host.spawn_expiry_sweeper().is_none());
}

#[tokio::test]
async fn selected_request_is_resolved() {
    let link = link();
    let mut inbound = pump_host(&link);

    let first = link.client.send_prompt("one", RequestOptions::new());
    let p1 = next_action(&mut inbound).await;
    tokio::time::sleep(Duration::from_millis(2)).await;
    let second = link.client.send_prompt("two", RequestOptions::new());
    let p2 = next_action(&mut inbound).await;

    assert_eq!(link.host.pending_ids(), vec![p1.message_id.clone(), p2.message_id.clone()]);
    assert!(!link.host.resolve_selected(json!("nothing selected")));

    assert!(link.host.select(p2.message_id.as_str()));
    assert!(!link.host.select(p1.message_id.as_str()));
    assert_eq!(link.host.selected(), Some(p2.message_id.clone()));

    assert!(link.host.resolve_selected(json!("picked")));
    assert_eq!(link.host.selected(), None);

    assert_eq!(second.await.unwrap(), json!("picked"));

    assert!(link.host.select(p1.message_id.as_str()));
    link.host.clear_selection();
    assert_eq!(link.host.selected(), None);
    link.host.reject_request(p1.message_id.as_str(), "declined");
    assert_eq!(first.await.unwrap_err().to_string(), "declined");
}

struct RecordingHandler {
    ready: AtomicU32,
    resized: AtomicU32,
}

#[async_trait]
impl ActionHandler for RecordingHandler {
    async fn on_action(&self, host: HostDispatcher, action: PendingAction) {
        let id = action.message_id.as_str();
        match &action.action {
            Action::InvokeOperation { tool_name, params } => {
                host.resolve_request(id, json!({ "tool": tool_name, "echo": params }));
            }
            other => {
                host.reject_request(id, format!("{} not supported", other.kind()));
            }
        }
    }

    async fn on_ready(&self, _host: HostDispatcher) {
        self.ready.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_resize(&self, _host: HostDispatcher, _size: SizeReport) {
        self.resized.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn spawned_handler_answers_actions() {
    let link = link();
    let handler = Arc::new(RecordingHandler {
        ready: AtomicU32::new(0),
        resized: AtomicU32::new(0),
    });
    let task = link.host.spawn(handler.clone());

    link.client.init_lifecycle();

    let echoed = link
        .client
        .call_tool("delete_entry", json!({ "id": 7 }), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(echoed, json!({ "tool": "delete_entry", "echo": { "id": 7 } }));

    let err = link
        .client
        .navigate_to_link("https://example.com", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "navigate not supported");

    settle().await;
    assert_eq!(handler.ready.load(Ordering::SeqCst), 1);
    assert_eq!(handler.resized.load(Ordering::SeqCst), 1);
    assert_eq!(link.host.pending_count(), 0);
    assert_eq!(
        link.host
            .metrics()
            .settled
            .get(&[("kind", "invoke-operation"), ("status", "resolved")]),
        1
    );
    task.abort();
}
