use super::*;

#[test]
fn error_display_empty_cookie_key() {
    let err = LifecycleError::EmptyCookieKey;
    assert_eq!(format!("{}", err), "cookie key must not be empty");
}

#[test]
fn error_display_admission_rejected() {
    let err = LifecycleError::AdmissionRejected {
        reason: "cookie value mismatch".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "plugin admission rejected: cookie value mismatch"
    );
}

#[test]
fn error_display_already_exists() {
    let err = LifecycleError::AlreadyExists {
        cookie_key: "alice-key".to_string(),
    };
    assert_eq!(format!("{}", err), "cookie key already registered: alice-key");
}

#[test]
fn error_display_not_found() {
    let err = LifecycleError::NotFound {
        cookie_key: "bob-key".to_string(),
    };
    assert_eq!(format!("{}", err), "cookie key not registered: bob-key");
}

#[test]
fn error_display_internal() {
    let err = LifecycleError::Internal {
        message: "stream decode failed".to_string(),
    };
    assert_eq!(format!("{}", err), "internal error: stream decode failed");
}

#[test]
fn lifecycle_error_serialization_roundtrip() {
    let err = LifecycleError::AlreadyExists {
        cookie_key: "alice-key".to_string(),
    };
    let json = serde_json::to_string(&err).unwrap();
    let parsed: LifecycleError = serde_json::from_str(&json).unwrap();
    assert!(matches!(
        parsed,
        LifecycleError::AlreadyExists { cookie_key } if cookie_key == "alice-key"
    ));
}

#[test]
fn transport_error_display() {
    let err = TransportError::new("connection reset");
    assert_eq!(format!("{}", err), "connection reset");
}
