//! Context and window lifecycle

mod common;

use std::rc::Rc;

use common::{codes, context, context_with_window};
use softwin::platform::HeadlessPlatform;
use softwin::{Context, ErrorCode};

#[test]
fn test_init_is_idempotent() {
    let (mut context, reports) = context();

    assert!(context.init());
    assert!(context.init());
    assert!(context.is_initialized());
    assert_eq!(context.platform().registration_count(), 1);
    assert!(reports.borrow().is_empty());
}

#[test]
fn test_terminate_is_idempotent() {
    let (mut context, reports) = context();

    context.terminate();
    assert!(context.init());
    context.terminate();
    context.terminate();

    assert!(!context.is_initialized());
    assert!(!context.platform().is_registered());
    assert!(reports.borrow().is_empty());

    assert!(context.init());
    assert_eq!(context.platform().registration_count(), 2);
}

#[test]
fn test_failed_init_rolls_back() {
    let (mut context, reports) = context();
    context.platform_mut().fail_init(true);

    assert!(!context.init());
    assert!(!context.is_initialized());
    assert!(!context.platform().is_registered());
    assert_eq!(codes(&reports), vec![ErrorCode::PlatformError]);

    context.platform_mut().fail_init(false);
    assert!(context.init());
}

#[test]
fn test_create_window_rejects_non_positive_sizes() {
    let (mut context, reports) = context();
    assert!(context.init());

    for (width, height) in [(0, 480), (640, 0), (-1, 480), (640, -5), (0, 0), (i32::MIN, 1)] {
        assert!(context.create_window(width, height, "bad").is_none());
    }

    assert_eq!(codes(&reports), vec![ErrorCode::InvalidValue; 6]);
    assert!(reports.borrow()[0].1.contains("0x480"));
    assert_eq!(context.window_count(), 0);
    assert_eq!(context.platform().window_count(), 0);
}

#[test]
fn test_create_window_matches_requested_client_size() {
    let (mut context, reports) = context();
    assert!(context.init());

    for (width, height) in [(1, 1), (640, 480), (1920, 1080), (333, 77)] {
        let id = context.create_window(width, height, "sized").expect("window");
        assert_eq!(context.get_window_size(id), (width, height));
        assert_eq!(context.get_viewport(id).width, width);
    }
    assert!(reports.borrow().is_empty());
}

#[test]
fn test_create_window_requires_init() {
    let (mut context, reports) = context();

    assert!(context.create_window(640, 480, "early").is_none());
    assert_eq!(codes(&reports), vec![ErrorCode::NotInitialized]);
    assert_eq!(reports.borrow()[0].1, "softwin is not initialized");
}

#[test]
fn test_new_window_is_centered_shown_and_focused() {
    let (context, _, _, handle) = context_with_window(640, 480);

    let native = context.platform().window(handle).unwrap();
    assert_eq!(native.title(), "test");
    assert_eq!(native.position(), (640, 300));
    assert!(native.is_visible());
    assert!(native.is_focused());
    assert!(native.is_resizable());
}

#[test]
fn test_hidden_hint_skips_show_and_focus() {
    let (mut context, _) = context();
    assert!(context.init());
    context.set_window_hint(softwin::WindowHint::Visible, false);

    context.create_window(100, 100, "hidden").unwrap();
    let handle = context.platform().handles()[0];
    let native = context.platform().window(handle).unwrap();
    assert!(!native.is_visible());
    assert!(!native.is_focused());
}

#[test]
fn test_platform_failure_leaves_nothing_behind() {
    let (mut context, reports) = context();
    assert!(context.init());
    context.platform_mut().fail_next_window();

    assert!(context.create_window(640, 480, "doomed").is_none());
    assert_eq!(codes(&reports), vec![ErrorCode::PlatformError]);
    assert_eq!(context.window_count(), 0);

    assert!(context.create_window(640, 480, "retry").is_some());
}

#[test]
fn test_destroy_window_releases_native_window() {
    let (mut context, reports, id, handle) = context_with_window(200, 100);

    context.destroy_window(id);
    assert!(context.platform().window(handle).is_none());
    assert_eq!(context.window_count(), 0);

    context.destroy_window(id);
    assert!(reports.borrow().is_empty());
}

#[test]
fn test_window_should_close_requires_init() {
    let (mut context, reports, id, _) = context_with_window(200, 100);
    context.terminate();

    assert!(!context.window_should_close(id));
    assert_eq!(codes(&reports), vec![ErrorCode::NotInitialized]);
}

#[test]
fn test_silenced_errors_do_not_reach_old_callback() {
    let (mut context, reports) = context();
    assert!(context.set_error_callback(None).is_some());

    assert!(context.create_window(1, 1, "early").is_none());
    assert!(reports.borrow().is_empty());
}

#[test]
fn test_title_with_interior_nul_fails_cleanly() {
    let (mut context, reports) = context();
    assert!(context.init());

    assert!(context.create_window(10, 10, "a\0b").is_none());
    assert_eq!(codes(&reports), vec![ErrorCode::PlatformError]);
    assert_eq!(reports.borrow()[0].1, "failed to convert string from UTF-8");
    assert_eq!(context.window_count(), 0);
    assert_eq!(context.platform().window_count(), 0);
}

#[test]
fn test_dropping_context_releases_windows() {
    let mut context = Context::new(HeadlessPlatform::new());
    assert!(context.init());
    let id = context.create_window(64, 64, "dropped").unwrap();

    let owner = Rc::new(());
    let held = Rc::clone(&owner);
    context.set_window_size_callback(id, Some(Box::new(move |_, _, _| drop(Rc::clone(&held)))));
    assert_eq!(Rc::strong_count(&owner), 2);

    drop(context);
    assert_eq!(Rc::strong_count(&owner), 1);
}
