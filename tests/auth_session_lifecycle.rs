
use serde_json::json;
use test_support::{
    load_snapshot, login, request_err, request_ok, spawn_sidecar, temp_dir, write_snapshot,
    PASSCODE,
};

#[test]
fn guard_lifecycle_from_locked_to_logout() {
    let dir = temp_dir("studiod-auth");
    let data = write_snapshot(
        &dir,
        &["2024-01-01,2024-01-01 09:00:00,Monday,9,Yoga,Ana,20,18,16,2,0.8,0.9,0.1"],
    );
    let (_child, mut stdin, mut reader) = spawn_sidecar(&data);

    // A fresh session starts unauthenticated with nothing pending.
    let status = request_ok(&mut stdin, &mut reader, "1", "auth.status", json!({}));
    assert_eq!(status["authenticated"], json!(false));
    assert!(status["pendingInput"].is_null());
    assert!(status["selection"].is_null());

    // A wrong passcode is a recoverable error and leaves the flag untouched.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "passcode": "not the passcode" }),
    );
    assert_eq!(error["code"], json!("incorrect_passcode"));
    assert_eq!(error["message"], json!("incorrect passcode"));

    let status = request_ok(&mut stdin, &mut reader, "3", "auth.status", json!({}));
    assert_eq!(status["authenticated"], json!(false));
    assert_eq!(status["pendingInput"], json!("not the passcode"));
    assert_eq!(status["authError"], json!("incorrect passcode"));

    // The exact configured secret authenticates and clears the failure.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "passcode": PASSCODE }),
    );
    assert_eq!(result["authenticated"], json!(true));
    let status = request_ok(&mut stdin, &mut reader, "5", "auth.status", json!({}));
    assert_eq!(status["authenticated"], json!(true));
    assert!(status["pendingInput"].is_null());
    assert!(status["authError"].is_null());

    // A render records the accepted selection in the session.
    load_snapshot(&mut stdin, &mut reader, "6");
    let rendered = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "dashboard.render",
        json!({ "discipline": "Yoga", "minClasses": 2 }),
    );
    assert_eq!(rendered["view"], json!("dashboard"));
    let status = request_ok(&mut stdin, &mut reader, "8", "auth.status", json!({}));
    assert_eq!(status["selection"]["discipline"], json!("Yoga"));
    assert_eq!(status["minClasses"], json!(2));

    // Logout restores the initial state with no residual selection.
    let result = request_ok(&mut stdin, &mut reader, "9", "auth.logout", json!({}));
    assert_eq!(result["authenticated"], json!(false));
    let status = request_ok(&mut stdin, &mut reader, "10", "auth.status", json!({}));
    assert_eq!(status["authenticated"], json!(false));
    assert!(status["pendingInput"].is_null());
    assert!(status["authError"].is_null());
    assert!(status["selection"].is_null());
    assert!(status["minClasses"].is_null());

    // And the guard re-locks the pipeline.
    let relocked = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "dashboard.render",
        json!({}),
    );
    assert_eq!(relocked["view"], json!("prompt"));

    login(&mut stdin, &mut reader, "12");
}
