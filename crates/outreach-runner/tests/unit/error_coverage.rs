//! Error classification as seen by callers of the runner.

use outreach_runner::Error;

#[test]
fn test_caller_facing_errors_are_not_contact_local() {
    let caller_facing = [
        Error::invalid_config_field("category", "category must not be empty"),
        Error::channel_not_ready("session closed"),
        Error::discovery("lead service down"),
        Error::AlreadyRunning {
            account: "acme".to_string(),
        },
    ];
    for err in caller_facing {
        assert!(!err.is_contact_local(), "{err:?} should reach the caller");
    }
}

#[test]
fn test_contact_local_errors() {
    assert!(Error::channel("send timed out").is_contact_local());
    assert!(Error::persistence("disk full").is_contact_local());
}

#[test]
fn test_multiple_error_types_retryability() {
    let errors = vec![
        (Error::discovery("test"), true),
        (Error::channel("test"), true),
        (Error::persistence("test"), true),
        (Error::channel_not_ready("test"), true),
        (Error::invalid_config("test"), false),
        (
            Error::NotRunning {
                account: "a".to_string(),
            },
            false,
        ),
        (
            Error::RunNotFound {
                id: "r".to_string(),
            },
            false,
        ),
        (Error::Io(std::io::Error::other("test")), true),
    ];

    for (err, expected_retryable) in errors {
        assert_eq!(
            err.is_retryable(),
            expected_retryable,
            "Error {:?} retryability mismatch",
            err
        );
    }
}

#[test]
fn test_error_source_chain() {
    let io_err = std::io::Error::other("root cause");
    let err = Error::discovery_with_source("wrapper", io_err);

    let std_err: &dyn std::error::Error = &err;
    assert!(std_err.source().is_some(), "Should have error source");
}

#[test]
fn test_display_messages() {
    assert_eq!(
        Error::NotRunning {
            account: "acme".to_string()
        }
        .to_string(),
        "No campaign running for account acme"
    );
    assert_eq!(
        Error::channel_not_ready("qr code not scanned").to_string(),
        "Messaging channel not ready: qr code not scanned"
    );
}
