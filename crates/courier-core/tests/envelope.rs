//! End-to-end envelope decoding across modes and error descriptors.

use courier_core::{
    CallSite, DecodeError, ErrorAnnotation, ErrorDescriptor, Ignored, Optional, PrimitiveKind,
    Required, resolve_annotations,
};
use rstest::rstest;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Msg {
    msg: String,
}

#[rstest]
#[case::status_first(r#"{"status":"0x000","data":{"msg":"m"},"message":"ok"}"#)]
#[case::data_first(r#"{"data":{"msg":"m"},"message":"ok","status":"0x000"}"#)]
#[case::message_first(r#"{"message":"ok","status":"0x000","data":{"msg":"m"}}"#)]
#[case::unknown_keys(r#"{"trace":[1,{"x":null}],"message":"ok","data":{"msg":"m"},"status":"0x000","errors":null}"#)]
fn key_order_does_not_change_the_result(#[case] body: &str) {
    let site = CallSite::new(Required::<Msg>::new());
    let direct: Msg = serde_json::from_str(r#"{"msg":"m"}"#).unwrap();
    assert_eq!(site.decode(body).unwrap(), direct);
}

#[test]
fn required_int() {
    let site = CallSite::new(Required::<i32>::new());
    let value = site
        .decode(r#"{"status":"0x000","message":"success","data":99}"#)
        .unwrap();
    assert_eq!(value, 99);
}

#[rstest]
#[case::missing(r#"{"status":"0x000","message":"success"}"#)]
#[case::null(r#"{"status":"0x000","message":"success","data":null}"#)]
fn absent_data(#[case] body: &str) {
    assert_eq!(CallSite::new(Optional::<i32>::new()).decode(body).unwrap(), None);
    assert_eq!(CallSite::new(Optional::<Msg>::new()).decode(body).unwrap(), None);
    assert_eq!(CallSite::new(Optional::<Vec<Msg>>::new()).decode(body).unwrap(), None);

    let error = CallSite::new(Required::<i32>::new()).decode(body).unwrap_err();
    assert!(matches!(
        error.as_decode_error(),
        Some(DecodeError::NullPayload { field: "data" })
    ));
}

#[rstest]
#[case::null_then_value(r#"{"status":"0x000","message":"m","data":null,"data":5}"#, Some(5))]
#[case::value_then_null(r#"{"status":"0x000","message":"m","data":5,"data":null}"#, None)]
#[case::value_then_value(r#"{"data":1,"status":"0x000","data":2,"message":"m"}"#, Some(2))]
#[case::bad_then_value(r#"{"status":"0x000","message":"m","data":"x","data":3}"#, Some(3))]
fn last_data_member_wins(#[case] body: &str, #[case] expected: Option<i32>) {
    assert_eq!(CallSite::new(Optional::<i32>::new()).decode(body).unwrap(), expected);

    let required = CallSite::new(Required::<i32>::new()).decode(body);
    match expected {
        Some(value) => assert_eq!(required.unwrap(), value),
        None => assert!(matches!(
            required.unwrap_err().as_decode_error(),
            Some(DecodeError::NullPayload { field: "data" })
        )),
    }
}

#[rstest]
#[case::leading_zero("01")]
#[case::trailing_dot("1.")]
#[case::out_of_range("1e400")]
fn malformed_number_payload_is_rejected(#[case] number: &str) {
    let body = format!(r#"{{"status":"0x000","message":"m","data":{number}}}"#);
    let error = CallSite::new(Required::<f64>::new()).decode(&body).unwrap_err();
    assert!(error.as_decode_error().is_some());
}

#[test]
fn malformed_number_in_skipped_member_is_rejected() {
    let site = CallSite::new(Required::<f64>::new());
    let error = site
        .decode(r#"{"status":"0x000","message":"m","data":1,"extra":-00.e5}"#)
        .unwrap_err();
    assert!(error.as_decode_error().is_some());
}

#[test]
fn json_array_payload() {
    let site = CallSite::new(Required::<Vec<Msg>>::new());
    let list = site
        .decode(
            r#"{
                "status":"0x000",
                "message":"success",
                "data":[{"msg":"msg1"},{"msg":"msg2"}]
            }"#,
        )
        .unwrap();
    assert_eq!(list[0].msg, "msg1");
    assert_eq!(list[1].msg, "msg2");
}

#[test]
fn optional_present_object() {
    let site = CallSite::new(Optional::<Msg>::new());
    let value = site
        .decode(r#"{"status":"0x000","message":"success","data":{"msg":"msg"}}"#)
        .unwrap();
    assert_eq!(value, Some(Msg { msg: "msg".into() }));
}

#[test]
fn ignored_discards_any_payload() {
    let site = CallSite::new(Ignored);
    site.decode(r#"{"status":"0x000","message":"success","data":{"a":[1,2,{"b":false}]}}"#)
        .unwrap();
    site.decode(r#"{"status":"0x000","message":"success"}"#).unwrap();
}

#[test]
fn primitive_error() {
    let site = CallSite::new(Required::<Msg>::new())
        .with_errors(ErrorDescriptor::<String>::primitive())
        .unwrap();
    let error = site
        .decode(r#"{"status":"0x129","message":"failure","errors":"errorMsg1"}"#)
        .unwrap_err();
    let failure = error.as_server_failure().unwrap();
    assert_eq!(failure.error_data().map(String::as_str), Some("errorMsg1"));
}

#[test]
fn object_error() {
    let site = CallSite::new(Required::<Msg>::new())
        .with_errors(ErrorDescriptor::<Msg>::object())
        .unwrap();
    let error = site
        .decode(r#"{"errors":{"msg":"errorMsg"},"status":"0x129","message":"failure"}"#)
        .unwrap_err();
    let failure = error.as_server_failure().unwrap();
    assert_eq!(failure.error_data(), Some(&Msg { msg: "errorMsg".into() }));
}

#[test]
fn array_error() {
    let site = CallSite::new(Required::<Msg>::new())
        .with_errors(ErrorDescriptor::<Vec<Msg>>::array())
        .unwrap();
    let error = site
        .decode(r#"{"status":"0x129","message":"failure","errors":[{"msg":"e1"},{"msg":"e2"}]}"#)
        .unwrap_err();
    let failure = error.as_server_failure().unwrap();
    assert_eq!(failure.status(), "0x129");
    assert_eq!(failure.message(), "failure");
    assert_eq!(
        failure.error_data(),
        Some(&vec![Msg { msg: "e1".into() }, Msg { msg: "e2".into() }])
    );
}

#[test]
fn failure_without_errors_member() {
    let site = CallSite::new(Optional::<Msg>::new())
        .with_errors(ErrorDescriptor::<Msg>::object())
        .unwrap();
    let error = site
        .decode(r#"{"status":"1x052","message":"failure"}"#)
        .unwrap_err();
    assert!(error.as_server_failure().unwrap().error_data().is_none());
}

#[test]
fn resolved_annotation_decodes_dynamic_errors() {
    let descriptor = resolve_annotations(&[ErrorAnnotation::Primitive(PrimitiveKind::Float)])
        .unwrap()
        .unwrap();
    let site = CallSite::new(Ignored).with_errors(descriptor).unwrap();
    let error = site
        .decode(r#"{"status":"0x129","message":"failure","errors":1.5}"#)
        .unwrap_err();
    assert_eq!(
        error.as_server_failure().unwrap().error_data(),
        Some(&json!(1.5))
    );
}

#[test]
fn malformed_envelope_is_a_decode_error() {
    let site = CallSite::new(Required::<i32>::new());
    let error = site.decode(r#"{"status":"0x000","message":"ok","data":}"#).unwrap_err();
    assert!(error.as_decode_error().is_some());
    assert!(error.as_server_failure().is_none());
    assert!(site.decode("[]").unwrap_err().as_decode_error().is_some());
}
