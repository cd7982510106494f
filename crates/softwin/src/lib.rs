//! # softwin
//!
//! A minimal windowing and input library for software renderers.
//!
//! It opens a window, pumps the host's message queue, turns host messages into
//! a few semantic events (close request, resize, mouse button) and presents a
//! caller-owned pixel buffer into a viewport of the window's client area.
//!
//! ## Features
//!
//! - **Explicit context**: no process-global state; every call goes through a [`Context`]
//! - **Event values**: [`Context::poll_events`] returns the events of one tick, in order
//! - **Zero-copy presentation**: buffers are borrowed, never copied
//! - **Backends**: GDI on Windows, plus an in-memory backend for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #![allow(unsafe_code)]
//! use softwin::prelude::*;
//!
//! fn main() {
//!     let mut context = Context::new(HeadlessPlatform::new());
//!     context.set_error_callback(Some(Box::new(|code, message: &str| {
//!         eprintln!("error 0x{:08X}: {message}", code.code());
//!     })));
//!
//!     if !context.init() {
//!         return;
//!     }
//!     let Some(window) = context.create_window(640, 480, "Hello softwin") else {
//!         return;
//!     };
//!
//!     let pixels = vec![0x0020_4080u32; 320 * 240];
//!     // SAFETY: `pixels` outlives the window
//!     unsafe { context.update_buffer(window, &pixels, 320, 240) };
//!
//!     while !context.window_should_close(window) {
//!         for (_, event) in context.poll_events() {
//!             println!("{event:?}");
//!         }
//!         # break;
//!     }
//!
//!     context.destroy_window(window);
//!     context.terminate();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod platform;
pub mod window;

mod context;

pub use config::{Config, ConfigError, ConfigFormat, ContextConfig, WindowHint, WindowHints};
pub use context::Context;
pub use error::{Error, ErrorCallback, ErrorCode, ErrorReporter, Result};
pub use event::{Action, Modifiers, MouseButton, WindowEvent, MOUSE_BUTTON_COUNT};
pub use window::{MouseButtonCallback, SizeCallback, SizeLimits, Viewport, WindowId, DONT_CARE};

/// Common imports for library users
pub mod prelude {
    #[cfg(windows)]
    pub use crate::platform::{NativePlatform, Win32Platform};
    pub use crate::{
        platform::{HeadlessPlatform, Platform},
        Action, Context, ContextConfig, ErrorCode, Modifiers, MouseButton, Viewport, WindowEvent,
        WindowHint, WindowId,
    };
}
