//! Host display service backends
//!
//! The [`Platform`] trait is the capability set the context needs from a host:
//! register a window class, create and destroy native windows, drain the message
//! queue, and blit pixels into a window. Everything above this trait is host
//! independent; backends never see a [`Window`](crate::window) and the context
//! never sees a native type beyond the opaque [`Platform::Handle`].
//!
//! # Backends
//!
//! - **`win32`**: GDI backend on Windows
//! - **`headless`**: in-memory backend for tests and display-less runs

use std::fmt::Debug;
use std::hash::Hash;
use std::mem;

use crate::error::{Error, Result};
use crate::event::Modifiers;
use crate::window::{SizeLimits, Viewport};

pub mod headless;
#[cfg(windows)]
pub mod win32;

pub use headless::{HeadlessHandle, HeadlessPlatform, HeadlessWindow};
#[cfg(windows)]
pub use win32::{Win32Handle, Win32Platform};

/// The native backend for the current target
#[cfg(windows)]
pub type NativePlatform = Win32Platform;

/// Host message as delivered by a backend, before normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMessage {
    /// Close box, Alt+F4 or equivalent
    CloseRequested,
    /// New client-area size
    Resized {
        /// Client width
        width: i32,
        /// Client height
        height: i32,
    },
    /// Mouse button transition with a raw button id
    Button {
        /// Raw id; only `0..=7` is meaningful
        button: i32,
        /// Pressed or released
        pressed: bool,
        /// Modifiers sampled when the host delivered the message
        mods: Modifiers,
    },
    /// Part of the client area needs repainting; already validated by the backend
    PaintRequested,
}

/// Parameters for realizing a native window
#[derive(Debug, Clone, Copy)]
pub struct NativeWindowDesc<'a> {
    /// Requested client width
    pub width: i32,
    /// Requested client height
    pub height: i32,
    /// UTF-8 title, encoded by the backend
    pub title: &'a str,
    /// Whether the frame allows resizing
    pub resizable: bool,
}

/// Borrowed pixels handed to [`Platform::present`]
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Packed `0x00RRGGBB` pixels, top row first
    pub pixels: &'a [u32],
    /// Width of the source in pixels
    pub width: i32,
    /// Height of the source in pixels
    pub height: i32,
}

/// Monotonic timer calibration captured at init
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerCalibration {
    /// Ticks per second
    pub frequency: u64,
    /// Tick value at init
    pub offset: u64,
}

impl TimerCalibration {
    /// Seconds elapsed between the calibration point and `ticks`
    pub fn seconds_since(&self, ticks: u64) -> f64 {
        if self.frequency == 0 {
            return 0.0;
        }
        ticks.saturating_sub(self.offset) as f64 / self.frequency as f64
    }
}

/// Capability set of a host display service
///
/// All methods are called from the thread that owns the context.
pub trait Platform {
    /// Opaque native window identifier
    type Handle: Copy + Eq + Hash + Debug;

    /// Register the window class and calibrate the timer
    fn init(&mut self) -> Result<TimerCalibration>;

    /// Release what `init` registered; safe after a failed `init`
    fn terminate(&mut self);

    /// Create a hidden native window whose client area matches `desc`
    fn create_window(&mut self, desc: &NativeWindowDesc<'_>) -> Result<Self::Handle>;

    /// Release the window's paint resources, then the native handle
    fn destroy_window(&mut self, handle: Self::Handle);

    /// Make the window visible
    fn show_window(&mut self, handle: Self::Handle);

    /// Raise the window and give it input focus
    fn focus_window(&mut self, handle: Self::Handle);

    /// Constrain interactive resizing of the client area
    fn set_size_limits(&mut self, handle: Self::Handle, limits: SizeLimits);

    /// Append every message queued so far to `out` without blocking
    fn drain_messages(&mut self, out: &mut Vec<(Self::Handle, RawMessage)>);

    /// Cursor position relative to the window's client area
    fn cursor_pos(&self, handle: Self::Handle) -> Result<(f64, f64)>;

    /// Capture or release the pointer for this window
    fn set_capture(&mut self, handle: Self::Handle, captured: bool);

    /// Fill the whole client area with `color`
    fn clear(&mut self, handle: Self::Handle, color: u32);

    /// Stretch `frame` into `viewport` and paint the rest of the client area with `clear_color`
    fn present(
        &mut self,
        handle: Self::Handle,
        frame: &Frame<'_>,
        viewport: Viewport,
        clear_color: u32,
    ) -> Result<()>;

    /// Current value of the monotonic timer in ticks
    fn timer_value(&self) -> u64;
}

/// Queue a message, replacing a pending one of the same kind when it is redundant
///
/// A resize or paint request supersedes the previous resize or paint request
/// for the same window, unless a close or button message for that window was
/// queued in between. This keeps a host queue bounded while the user drags a
/// window border.
pub fn push_coalesced<H: Copy + Eq>(inbox: &mut Vec<(H, RawMessage)>, handle: H, message: RawMessage) {
    let collapsible = |m: &RawMessage| matches!(m, RawMessage::Resized { .. } | RawMessage::PaintRequested);

    if collapsible(&message) {
        for index in (0..inbox.len()).rev() {
            let (target, queued) = inbox[index];
            if target != handle {
                continue;
            }
            if mem::discriminant(&queued) == mem::discriminant(&message) {
                inbox.remove(index);
                break;
            }
            if !collapsible(&queued) {
                break;
            }
        }
    }
    inbox.push((handle, message));
}

/// Move the messages of windows matched by `owns` to `out`, keeping the rest queued
///
/// Relative order is preserved on both sides.
pub fn take_owned<H: Copy>(
    inbox: &mut Vec<(H, RawMessage)>,
    out: &mut Vec<(H, RawMessage)>,
    owns: impl Fn(H) -> bool,
) {
    let mut kept = Vec::new();
    for (handle, message) in inbox.drain(..) {
        if owns(handle) {
            out.push((handle, message));
        } else {
            kept.push((handle, message));
        }
    }
    *inbox = kept;
}

/// Check a window title can be handed to a host as a NUL-terminated string
pub fn validate_title(title: &str) -> Result<()> {
    if title.contains('\0') {
        return Err(Error::platform("failed to convert string from UTF-8"));
    }
    Ok(())
}

/// Button id for a side button; only two side buttons are distinguished
pub const fn side_button_id(first: bool) -> i32 {
    if first {
        3
    } else {
        4
    }
}
