use std::{borrow::Cow, num::ParseIntError};

use assert_call::{call, CallRecorder};

use super::*;

fn parse(s: &str) -> Result<i32, CallbackError> {
    Ok(s.parse::<i32>()?)
}

#[test]
fn question_mark_converts_std_errors() {
    let e = parse("x").unwrap_err();
    assert!(e.downcast_ref::<ParseIntError>().is_some());
    assert_eq!(e.to_string(), "invalid digit found in string");
}

#[test]
fn msg_displays_message() {
    let e = CallbackError::msg("boom");
    assert_eq!(e.to_string(), "boom");
    assert_eq!(e.source().to_string(), "boom");
}

#[test]
fn injection_error_message() {
    let e = InjectionError::new(Cow::Borrowed("auth"));
    assert_eq!(
        e.to_string(),
        "[service inject] cannot inject `auth` before provided"
    );
}

#[test]
fn custom_handler_receives_error() {
    let mut cr = CallRecorder::new();
    let h = ErrorHandler::new(|e| call!("error: {e}"));
    h.handle(CallbackError::msg("boom"));
    cr.verify("error: boom");
}

#[test]
fn guard_returns_none_on_error() {
    let mut cr = CallRecorder::new();
    let h = ErrorHandler::new(|e| call!("error: {e}"));
    assert_eq!(guard(&h, || Ok(1)), Some(1));
    cr.verify(());
    assert_eq!(guard::<i32>(&h, || Err(CallbackError::msg("bad"))), None);
    cr.verify("error: bad");
}

#[test]
fn default_handler_swallows() {
    let h = ErrorHandler::default();
    h.handle(CallbackError::msg("ignored"));
    assert_eq!(format!("{h:?}"), "ErrorHandler(log)");
}
