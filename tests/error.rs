//! Tests for error module

use explorer_tiles::error::{ExplorerError, OptionExt};

#[test]
fn test_error_display() {
    let err = ExplorerError::InvalidTrajectory {
        activity_id: 42,
        index: 3,
        reason: "missing latitude".to_string(),
    };
    assert!(err.to_string().contains("42"));
    assert!(err.to_string().contains("point 3"));
    assert!(err.to_string().contains("missing latitude"));
}

#[test]
fn test_option_ext() {
    let none: Option<i32> = None;
    assert!(matches!(
        none.ok_or_missing_activity(7),
        Err(ExplorerError::MissingActivity(7))
    ));

    let none: Option<f64> = None;
    let result = none.ok_or_invalid_point(1, 0, "missing longitude");
    assert!(matches!(result, Err(ExplorerError::InvalidTrajectory { .. })));
}

#[test]
fn test_activity_local_classification() {
    assert!(ExplorerError::MissingActivity(1).is_activity_local());
    assert!(ExplorerError::TimeSeries {
        activity_id: 1,
        reason: "corrupt".to_string()
    }
    .is_activity_local());
    assert!(!ExplorerError::InvalidZoom(25).is_activity_local());
    assert!(!ExplorerError::io("x", std::io::Error::other("disk")).is_activity_local());
}
