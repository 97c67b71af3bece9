// ABOUTME: Tests for bucket message types - wire field names and defaults.
// ABOUTME: Verifies the JSON shape the bucket service expects.

use super::*;
use crate::error::{ClientError, ContextError};

#[test]
fn test_request_serialization_uses_service_field_names() {
    let batch = BatchRequest::single(BucketRequest::new("f", "b", 42));
    let json = serde_json::to_value(&batch).unwrap();

    assert_eq!(json["require_all"], false);
    assert_eq!(json["request"][0]["bucket_family"], "f");
    assert_eq!(json["request"][0]["bucket"], "b");
    assert_eq!(json["request"][0]["amount"], 42);
    assert_eq!(json["request"][0]["partial_fulfillment"], false);
}

#[test]
fn test_single_batch_shape() {
    let batch = BatchRequest::single(BucketRequest::new("f", "b", -7));

    assert_eq!(batch.len(), 1);
    assert!(!batch.require_all);
    assert_eq!(batch.requests[0].amount, -7);
    assert!(!batch.requests[0].partial_fulfillment);
}

#[test]
fn test_partial_fulfillment_builder() {
    let req = BucketRequest::new("f", "b", 1).with_partial_fulfillment(true);
    assert!(req.partial_fulfillment);
}

#[test]
fn test_response_deserialization() {
    let json = r#"{"response": [{"success": true}, {"success": false}]}"#;
    let resp: BatchResponse = serde_json::from_str(json).unwrap();

    assert_eq!(resp, BatchResponse::from_flags([true, false]));
    assert!(resp.first().unwrap().success);
}

#[test]
fn test_response_missing_fields_default() {
    // The service omits default-valued fields
    let resp: BatchResponse = serde_json::from_str("{}").unwrap();
    assert!(resp.is_empty());

    let resp: BatchResponse = serde_json::from_str(r#"{"response": [{}]}"#).unwrap();
    assert_eq!(resp.len(), 1);
    assert!(!resp.responses[0].success);
}

#[test]
fn test_admission_fail_open_always_grants() {
    let admission = Admission::fail_open(Some(ClientError::Context(
        ContextError::DeadlineExceeded,
    )));
    let (granted, error) = admission.into_parts();

    assert!(granted);
    assert!(error.is_some());
}

#[test]
fn test_admission_decided() {
    assert!(!Admission::decided(false).is_granted());
    assert!(Admission::decided(true).error.is_none());
}

#[test]
fn test_multi_admission_all_granted() {
    assert!(MultiAdmission::fail_open(3, None).all_granted());

    let mixed = MultiAdmission {
        granted: vec![true, false],
        error: None,
    };
    assert!(!mixed.all_granted());
}
