//! Envelope decode vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use framelink_core::protocol::{decode_envelope, Message};

use vector_loader::load;

#[test]
fn envelope_vectors() {
    let files = [
        "ready.json",
        "ready_extra_fields.json",
        "size_change.json",
        "size_bad_payload.json",
        "tool_request.json",
        "tool_missing_id.json",
        "prompt_request.json",
        "link_request.json",
        "intent_default_params.json",
        "response_result.json",
        "response_error.json",
        "render_data.json",
        "render_data_unwrapped.json",
        "unknown_type.json",
        "malformed.json",
    ];

    for f in files {
        let v = load(f);
        let res = Message::decode_frame(&v.frame.bytes());

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let msg = res.expect("expected ok message");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(msg.type_tag(), ex["type"].as_str().unwrap(), "vector={}", v.description);

        match ex.get("message_id").and_then(|m| m.as_str()) {
            Some(id) => assert_eq!(msg.message_id().unwrap().as_str(), id, "vector={}", v.description),
            None => assert!(msg.message_id().is_none(), "vector={}", v.description),
        }

        if let Some(kind) = ex.get("kind").and_then(|k| k.as_str()) {
            let Message::ActionRequest { action, .. } = &msg else {
                panic!("vector={} expected an action request", v.description);
            };
            assert_eq!(action.kind().as_str(), kind, "vector={}", v.description);
        }

        let encoded: serde_json::Value = serde_json::from_slice(&msg.encode().unwrap()).unwrap();
        assert_eq!(encoded, ex["encoded"], "vector={}", v.description);
    }
}

#[test]
fn header_decode_leaves_payload_raw() {
    let env = decode_envelope(br#"{"type":"tool","messageId":"x","payload":{"toolName":"t","params":{"deep":[1,2,3]}}}"#)
        .unwrap();
    assert_eq!(env.msg_type, "tool");
    assert_eq!(env.message_id.as_deref(), Some("x"));
    assert!(env.payload.unwrap().get().contains("\"deep\""));
}
