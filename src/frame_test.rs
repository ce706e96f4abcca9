use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("item:submit", Data::new());
    assert_eq!(frame.syscall, "item:submit");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn done_with_inherits_syscall_and_parent() {
    let req = Frame::request("item:submit", Data::new());
    let done = req.done_with(Data::new());

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.syscall, "item:submit");
    assert_eq!(done.status, Status::Done);
    assert_ne!(done.id, req.id);
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(!Status::Request.is_terminal());
}

#[test]
fn prefix_extraction() {
    let frame = Frame::request("viewport:report", Data::new());
    assert_eq!(frame.prefix(), "viewport");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
}

#[test]
fn client_frame_with_missing_optional_fields_parses() {
    let json = serde_json::json!({
        "id": Uuid::new_v4(),
        "syscall": "item:submit",
        "status": "request",
        "data": { "text": "HELLO" }
    });
    let frame: Frame = serde_json::from_value(json).unwrap();
    assert!(frame.parent_id.is_none());
    assert!(frame.from.is_none());
    assert_eq!(frame.data.get("text").and_then(|v| v.as_str()), Some("HELLO"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("slow down")]
    struct Busy;

    impl ErrorCode for Busy {
        fn error_code(&self) -> &'static str {
            "E_BUSY"
        }

        fn retryable(&self) -> bool {
            true
        }
    }

    let req = Frame::request("item:submit", Data::new());
    let err = req.error_from(&Busy);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.parent_id, Some(req.id));
    assert_eq!(err.data.get("code").and_then(|v| v.as_str()), Some("E_BUSY"));
    assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("slow down"));
    assert_eq!(err.data.get("retryable").and_then(serde_json::Value::as_bool), Some(true));
}
