//! Shared helpers for integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use softwin::platform::{HeadlessHandle, HeadlessPlatform};
use softwin::{Context, ErrorCode, WindowId};

pub const RED: u32 = 0x00FF_0000;
pub const GREEN: u32 = 0x0000_FF00;
pub const BLUE: u32 = 0x0000_00FF;
pub const YELLOW: u32 = 0x00FF_FF00;
pub const BACKGROUND: u32 = 0x0000_0000;

/// Errors delivered to the error callback
pub type Reports = Rc<RefCell<Vec<(ErrorCode, String)>>>;

/// A headless context that records every reported error
pub fn context() -> (Context<HeadlessPlatform>, Reports) {
    let reports: Reports = Rc::default();
    let sink = Rc::clone(&reports);

    let mut context = Context::new(HeadlessPlatform::new());
    context.set_error_callback(Some(Box::new(move |code, message: &str| {
        sink.borrow_mut().push((code, message.to_string()));
    })));
    (context, reports)
}

/// An initialized context with one window
pub fn context_with_window(
    width: i32,
    height: i32,
) -> (Context<HeadlessPlatform>, Reports, WindowId, HeadlessHandle) {
    let (mut context, reports) = context();
    assert!(context.init());
    let id = context.create_window(width, height, "test").expect("window");
    let handle = *context.platform().handles().last().expect("native window");
    (context, reports, id, handle)
}

/// Codes of every reported error
pub fn codes(reports: &Reports) -> Vec<ErrorCode> {
    reports.borrow().iter().map(|(code, _)| *code).collect()
}
