//! Window entity and its state machine
//!
//! A [`Window`] holds everything the caller can observe about a window: the
//! should-close flag, client size, size limits, the attached pixel buffer, the
//! viewport and per-button state. [`Window::apply`] is the pure transition
//! function the event pump runs for every routed host message; side effects on
//! the host (capture, clearing, blitting) and callbacks are left to the pump.

use std::fmt;
use std::ptr::NonNull;

use slotmap::new_key_type;

use crate::error::{Error, Result};
use crate::event::{Action, Modifiers, MouseButton, WindowEvent, MOUSE_BUTTON_COUNT};
use crate::platform::RawMessage;

/// Sentinel for an unset size limit
pub const DONT_CARE: i32 = -1;

new_key_type! {
    /// Stable identifier of a window owned by a [`Context`](crate::Context)
    pub struct WindowId;
}

/// Callback invoked after the client area was resized
pub type SizeCallback = Box<dyn FnMut(WindowId, i32, i32)>;

/// Callback invoked for every mouse button transition
pub type MouseButtonCallback = Box<dyn FnMut(WindowId, MouseButton, Action, Modifiers)>;

/// Sub-rectangle of the client area that receives the pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Left edge
    pub ox: i32,
    /// Top edge
    pub oy: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Viewport {
    /// Create a viewport
    pub const fn new(ox: i32, oy: i32, width: i32, height: i32) -> Self {
        Self { ox, oy, width, height }
    }

    /// Viewport covering a whole client area
    pub const fn full(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether the viewport lies inside a client area of the given size
    pub fn fits_within(&self, width: i32, height: i32) -> bool {
        self.ox >= 0
            && self.oy >= 0
            && self.width >= 0
            && self.height >= 0
            && i64::from(self.ox) + i64::from(self.width) <= i64::from(width)
            && i64::from(self.oy) + i64::from(self.height) <= i64::from(height)
    }

    /// Whether the client pixel `(x, y)` falls inside the viewport
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.ox && y >= self.oy && x - self.ox < self.width && y - self.oy < self.height
    }

    /// Whether the viewport covers no pixels
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Client-area size limits; each field is positive or [`DONT_CARE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    /// Minimum client width
    pub min_width: i32,
    /// Minimum client height
    pub min_height: i32,
    /// Maximum client width
    pub max_width: i32,
    /// Maximum client height
    pub max_height: i32,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            min_width: DONT_CARE,
            min_height: DONT_CARE,
            max_width: DONT_CARE,
            max_height: DONT_CARE,
        }
    }
}

impl SizeLimits {
    /// Check every bound is positive or unset and minimums do not exceed maximums
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.min_width, self.min_height, self.max_width, self.max_height];
        if bounds.iter().any(|&bound| bound != DONT_CARE && bound <= 0) {
            return Err(Error::invalid_value(format!("invalid window size limits {self:?}")));
        }

        let inverted = |min: i32, max: i32| min != DONT_CARE && max != DONT_CARE && min > max;
        if inverted(self.min_width, self.max_width) || inverted(self.min_height, self.max_height) {
            return Err(Error::invalid_value(format!(
                "minimum window size exceeds maximum {self:?}"
            )));
        }

        Ok(())
    }

    /// Clamp a client size into the limits
    pub fn clamp(&self, width: i32, height: i32) -> (i32, i32) {
        let clamp_axis = |value: i32, min: i32, max: i32| {
            let value = if min == DONT_CARE { value } else { value.max(min) };
            if max == DONT_CARE {
                value
            } else {
                value.min(max)
            }
        };

        (
            clamp_axis(width, self.min_width, self.max_width),
            clamp_axis(height, self.min_height, self.max_height),
        )
    }
}

/// Non-owning view of a caller's pixel buffer
///
/// Only a pointer, a length and the declared extent are kept. Whoever builds a
/// view promises the memory stays allocated and is neither written nor
/// mutably borrowed for as long as the view is attached to a window.
#[derive(Clone, Copy)]
pub struct BufferView {
    ptr: NonNull<u32>,
    len: usize,
    width: i32,
    height: i32,
}

impl BufferView {
    pub(crate) fn new(pixels: &[u32], width: i32, height: i32) -> Self {
        Self {
            ptr: NonNull::from(pixels).cast(),
            len: pixels.len(),
            width,
            height,
        }
    }

    /// Declared width of the buffer
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Declared height of the buffer
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Reborrow the caller's pixels
    ///
    /// # Safety
    /// The buffer this view was created from must still be alive, unshrunk and
    /// not mutably borrowed since the view was made.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn pixels(&self) -> &[u32] {
        std::slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }
}

impl fmt::Debug for BufferView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferView")
            .field("len", &self.len)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Window entity
pub(crate) struct Window<H> {
    pub(crate) native: H,
    pub(crate) should_close: bool,
    pub(crate) resizable: bool,
    pub(crate) limits: SizeLimits,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) buffer: Option<BufferView>,
    pub(crate) viewport: Viewport,
    pub(crate) mouse_buttons: [Action; MOUSE_BUTTON_COUNT],
    pub(crate) size_callback: Option<SizeCallback>,
    pub(crate) mouse_button_callback: Option<MouseButtonCallback>,
}

impl<H> Window<H> {
    pub(crate) fn new(native: H, width: i32, height: i32, resizable: bool) -> Self {
        Self {
            native,
            should_close: false,
            resizable,
            limits: SizeLimits::default(),
            width,
            height,
            buffer: None,
            viewport: Viewport::full(width, height),
            mouse_buttons: [Action::Release; MOUSE_BUTTON_COUNT],
            size_callback: None,
            mouse_button_callback: None,
        }
    }

    /// Apply a routed host message and return the event it produces, if any
    pub(crate) fn apply(&mut self, message: RawMessage) -> Option<WindowEvent> {
        match message {
            RawMessage::CloseRequested => {
                self.should_close = true;
                Some(WindowEvent::Closed)
            }
            RawMessage::Resized { width, height } => {
                self.width = width;
                self.height = height;
                self.viewport = Viewport::full(width, height);
                Some(WindowEvent::Resized { width, height })
            }
            RawMessage::Button { button, pressed, mods } => {
                let button = MouseButton::from_index(button)?;
                let action = if pressed { Action::Press } else { Action::Release };
                self.mouse_buttons[button.index()] = action;
                Some(WindowEvent::MouseButton { button, action, mods })
            }
            RawMessage::PaintRequested => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Window<u32> {
        Window::new(7, 640, 480, true)
    }

    #[test]
    fn test_new_window_state() {
        let window = window();
        assert!(!window.should_close);
        assert_eq!(window.viewport, Viewport::full(640, 480));
        assert_eq!(window.limits, SizeLimits::default());
        assert!(window.mouse_buttons.iter().all(|&action| action == Action::Release));
        assert!(window.buffer.is_none());
    }

    #[test]
    fn test_close_request_latches() {
        let mut window = window();
        assert_eq!(window.apply(RawMessage::CloseRequested), Some(WindowEvent::Closed));
        assert!(window.should_close);

        window.apply(RawMessage::Resized { width: 10, height: 10 });
        assert!(window.should_close);
    }

    #[test]
    fn test_resize_resets_viewport() {
        let mut window = window();
        window.viewport = Viewport::new(10, 10, 100, 100);

        let event = window.apply(RawMessage::Resized { width: 800, height: 600 });
        assert_eq!(event, Some(WindowEvent::Resized { width: 800, height: 600 }));
        assert_eq!((window.width, window.height), (800, 600));
        assert_eq!(window.viewport, Viewport::full(800, 600));
    }

    #[test]
    fn test_button_transitions_are_recorded() {
        let mut window = window();
        let mods = Modifiers::CONTROL;

        let event = window.apply(RawMessage::Button { button: 4, pressed: true, mods });
        assert_eq!(
            event,
            Some(WindowEvent::MouseButton {
                button: MouseButton::Button5,
                action: Action::Press,
                mods,
            })
        );
        assert_eq!(window.mouse_buttons[4], Action::Press);

        window.apply(RawMessage::Button { button: 4, pressed: false, mods });
        assert_eq!(window.mouse_buttons[4], Action::Release);
    }

    #[test]
    fn test_out_of_range_buttons_are_dropped() {
        let mut window = window();
        for button in [-1, 8, 42] {
            let event = window.apply(RawMessage::Button {
                button,
                pressed: true,
                mods: Modifiers::empty(),
            });
            assert_eq!(event, None);
        }
        assert!(window.mouse_buttons.iter().all(|&action| action == Action::Release));
    }

    #[test]
    fn test_paint_produces_no_event() {
        let mut window = window();
        assert_eq!(window.apply(RawMessage::PaintRequested), None);
    }

    #[test]
    fn test_viewport_bounds() {
        assert!(Viewport::new(0, 0, 640, 480).fits_within(640, 480));
        assert!(Viewport::new(40, 80, 600, 400).fits_within(640, 480));
        assert!(!Viewport::new(41, 0, 600, 100).fits_within(640, 480));
        assert!(!Viewport::new(0, 1, 10, 480).fits_within(640, 480));
        assert!(!Viewport::new(-1, 0, 10, 10).fits_within(640, 480));
        assert!(!Viewport::new(i32::MAX, 0, i32::MAX, 1).fits_within(640, 480));

        let viewport = Viewport::new(10, 20, 5, 5);
        assert!(viewport.contains(10, 20));
        assert!(viewport.contains(14, 24));
        assert!(!viewport.contains(15, 20));
        assert!(Viewport::full(0, 5).is_empty());
    }

    #[test]
    fn test_size_limits() {
        assert!(SizeLimits::default().validate().is_ok());

        let limits = SizeLimits {
            min_width: 100,
            min_height: DONT_CARE,
            max_width: 400,
            max_height: 300,
        };
        assert!(limits.validate().is_ok());
        assert_eq!(limits.clamp(50, 500), (100, 300));
        assert_eq!(limits.clamp(250, 10), (250, 10));

        let inverted = SizeLimits { min_width: 500, ..limits };
        assert!(inverted.validate().is_err());

        let zero = SizeLimits { max_height: 0, ..limits };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_buffer_view_extent() {
        let pixels = vec![0x00FF_0000u32; 6];
        let view = BufferView::new(&pixels, 3, 2);
        assert_eq!((view.width(), view.height()), (3, 2));
        #[allow(unsafe_code)]
        let seen = unsafe { view.pixels() };
        assert_eq!(seen, pixels.as_slice());
    }
}
