// Verify wire format for the classroom dispatcher's frames and payloads.

use classroom_protocol::frames::{EventFrame, InboundFrame, ResFrame};
use classroom_protocol::messages::{ChatMessageParams, JoinParams, StepWire};

#[test]
fn req_frame_round_trip() {
    let json = r#"{"type":"req","id":"abc-123","method":"join","params":{"namespaceName":"algebra","lessonName":"intro"}}"#;
    let frame: InboundFrame = serde_json::from_str(json).unwrap();
    assert_eq!(frame.frame_type, "req");

    let req = frame.as_req().unwrap();
    assert_eq!(req.method, "join");
    assert_eq!(req.id, "abc-123");
}

#[test]
fn res_ok_serialization() {
    let res = ResFrame::ok("req-1", serde_json::json!({"pong": true}));
    let json = serde_json::to_string(&res).unwrap();

    assert!(json.contains(r#""type":"res""#));
    assert!(json.contains(r#""ok":true"#));
    assert!(!json.contains(r#""error""#));
}

#[test]
fn res_err_serialization() {
    let res = ResFrame::err("req-2", "NOT_FOUND", "no such room");
    let json = serde_json::to_string(&res).unwrap();

    assert!(json.contains(r#""ok":false"#));
    assert!(json.contains(r#""NOT_FOUND""#));
    assert!(!json.contains(r#""payload""#));
}

#[test]
fn event_frame_carries_payload() {
    let ev = EventFrame::new("user_joins", serde_json::json!({"email": "bob@example.com"}));
    let json = serde_json::to_string(&ev).unwrap();

    assert!(json.contains(r#""type":"event""#));
    assert!(json.contains(r#""event":"user_joins""#));
    assert!(json.contains("bob@example.com"));
}

#[test]
fn join_params_deserialize() {
    let json = r#"{"namespaceName":"algebra","lessonName":"intro","userID":"u1","userEmail":"bob@example.com","userName":"Bob"}"#;
    let params: JoinParams = serde_json::from_str(json).unwrap();
    assert_eq!(params.user_email, "bob@example.com");
}

#[test]
fn chat_message_params_default_anonymous() {
    let json = r#"{"chatroom":"ns/l:general","body":"hi"}"#;
    let params: ChatMessageParams = serde_json::from_str(json).unwrap();
    assert!(!params.anonymous);
}

#[test]
fn step_wire_round_trips_opaque_op() {
    let step = StepWire {
        client_id: "c1".to_string(),
        op: serde_json::json!([1, "AB", -3]),
    };
    let json = serde_json::to_string(&step).unwrap();
    let back: StepWire = serde_json::from_str(&json).unwrap();
    assert_eq!(back.client_id, "c1");
}

#[test]
fn inbound_frame_rejects_non_req() {
    let json = r#"{"type":"event","event":"tick","payload":{}}"#;
    let frame: InboundFrame = serde_json::from_str(json).unwrap();
    assert!(frame.as_req().is_none(), "event frame must not parse as req");
}
