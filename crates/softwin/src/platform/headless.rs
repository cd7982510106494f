//! In-memory backend
//!
//! Emulates a host display service without a display: each window owns a
//! client-area surface of `0x00RRGGBB` pixels, and tests drive the message queue
//! by posting close, resize, button and paint messages. Presentation uses the
//! same nearest-neighbour stretch as GDI `StretchDIBits` in `COLORONCOLOR` mode.

use std::collections::HashMap;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::event::Modifiers;
use crate::platform::{
    push_coalesced, Frame, NativeWindowDesc, Platform, RawMessage, TimerCalibration,
};
use crate::window::{SizeLimits, Viewport};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Native handle of a headless window
///
/// Any value can be built so tests can post messages for windows the context
/// does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadlessHandle(pub u64);

/// State of one headless window
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    title: String,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    resizable: bool,
    visible: bool,
    focused: bool,
    captured: bool,
    limits: SizeLimits,
    bitmap_extent: (i32, i32),
    surface: Vec<u32>,
}

impl HeadlessWindow {
    fn new(desc: &NativeWindowDesc<'_>, x: i32, y: i32) -> Self {
        Self {
            title: desc.title.to_string(),
            x,
            y,
            width: desc.width,
            height: desc.height,
            resizable: desc.resizable,
            visible: false,
            focused: false,
            captured: false,
            limits: SizeLimits::default(),
            bitmap_extent: (0, 0),
            surface: vec![0; pixel_count(desc.width, desc.height)],
        }
    }

    /// Window title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Screen position of the client area's top-left corner
    pub const fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Client-area size
    pub const fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Whether the frame allows resizing
    pub const fn is_resizable(&self) -> bool {
        self.resizable
    }

    /// Whether the window was shown
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the window has input focus
    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    /// Whether the window holds pointer capture
    pub const fn has_capture(&self) -> bool {
        self.captured
    }

    /// Size limits last pushed by the context
    pub const fn size_limits(&self) -> SizeLimits {
        self.limits
    }

    /// Source extent recorded in the bitmap header by the last presentation
    pub const fn bitmap_extent(&self) -> (i32, i32) {
        self.bitmap_extent
    }

    /// Client pixel at `(x, y)`
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.surface.get(y as usize * self.width as usize + x as usize).copied()
    }

    fn resize_surface(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
        self.surface = vec![0; pixel_count(width, height)];
    }
}

/// In-memory [`Platform`] implementation
#[derive(Debug)]
pub struct HeadlessPlatform {
    registered: bool,
    registrations: usize,
    fail_init: bool,
    fail_next_window: bool,
    next_handle: u64,
    screen: (i32, i32),
    windows: HashMap<HeadlessHandle, HeadlessWindow>,
    queue: Vec<(HeadlessHandle, RawMessage)>,
    cursor: (i32, i32),
    modifiers: Modifiers,
    epoch: Instant,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    /// Create a backend with a 1920x1080 virtual screen
    pub fn new() -> Self {
        Self::with_screen_size(1920, 1080)
    }

    /// Create a backend with a custom virtual screen size
    pub fn with_screen_size(width: i32, height: i32) -> Self {
        Self {
            registered: false,
            registrations: 0,
            fail_init: false,
            fail_next_window: false,
            next_handle: 1,
            screen: (width, height),
            windows: HashMap::new(),
            queue: Vec::new(),
            cursor: (0, 0),
            modifiers: Modifiers::empty(),
            epoch: Instant::now(),
        }
    }

    /// Whether the window class is currently registered
    pub const fn is_registered(&self) -> bool {
        self.registered
    }

    /// How many times the window class was registered
    pub const fn registration_count(&self) -> usize {
        self.registrations
    }

    /// Make every subsequent `init` fail
    pub fn fail_init(&mut self, fail: bool) {
        self.fail_init = fail;
    }

    /// Make the next window creation fail
    pub fn fail_next_window(&mut self) {
        self.fail_next_window = true;
    }

    /// Live native windows
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// State of a native window
    pub fn window(&self, handle: HeadlessHandle) -> Option<&HeadlessWindow> {
        self.windows.get(&handle)
    }

    /// Handles of every live native window, oldest first
    pub fn handles(&self) -> Vec<HeadlessHandle> {
        let mut handles: Vec<_> = self.windows.keys().copied().collect();
        handles.sort();
        handles
    }

    /// Queue a close request
    pub fn post_close(&mut self, handle: HeadlessHandle) {
        self.queue.push((handle, RawMessage::CloseRequested));
    }

    /// Resize the client area as a user drag would, then queue the size and paint messages
    ///
    /// The size is clamped to the window's limits and the surface contents are
    /// discarded. Pending resize and paint messages for the window are coalesced.
    pub fn post_resize(&mut self, handle: HeadlessHandle, width: i32, height: i32) {
        let (width, height) = match self.windows.get_mut(&handle) {
            Some(window) => {
                let (width, height) = window.limits.clamp(width.max(0), height.max(0));
                window.resize_surface(width, height);
                (width, height)
            }
            None => (width, height),
        };
        push_coalesced(&mut self.queue, handle, RawMessage::Resized { width, height });
        push_coalesced(&mut self.queue, handle, RawMessage::PaintRequested);
    }

    /// Queue a button transition with a raw button id
    ///
    /// Modifiers are sampled when the message is drained, like live keyboard state.
    pub fn post_button(&mut self, handle: HeadlessHandle, button: i32, pressed: bool) {
        self.queue.push((
            handle,
            RawMessage::Button {
                button,
                pressed,
                mods: Modifiers::empty(),
            },
        ));
    }

    /// Queue a paint request
    pub fn post_paint(&mut self, handle: HeadlessHandle) {
        push_coalesced(&mut self.queue, handle, RawMessage::PaintRequested);
    }

    /// Number of queued messages
    pub fn pending_messages(&self) -> usize {
        self.queue.len()
    }

    /// Move the cursor to a screen position
    pub fn set_cursor_pos(&mut self, x: i32, y: i32) {
        self.cursor = (x, y);
    }

    /// Set the modifier keys currently held
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    fn window_mut(&mut self, handle: HeadlessHandle) -> Option<&mut HeadlessWindow> {
        let window = self.windows.get_mut(&handle);
        if window.is_none() {
            log::warn!("Headless window {handle:?} does not exist");
        }
        window
    }

    fn elapsed_nanos(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Platform for HeadlessPlatform {
    type Handle = HeadlessHandle;

    fn init(&mut self) -> Result<TimerCalibration> {
        if self.fail_init {
            return Err(Error::platform("failed to register window class"));
        }

        self.registered = true;
        self.registrations += 1;
        Ok(TimerCalibration {
            frequency: NANOS_PER_SECOND,
            offset: self.elapsed_nanos(),
        })
    }

    fn terminate(&mut self) {
        self.registered = false;
        self.queue.clear();
    }

    fn create_window(&mut self, desc: &NativeWindowDesc<'_>) -> Result<HeadlessHandle> {
        if !self.registered {
            return Err(Error::platform("window class is not registered"));
        }
        if std::mem::take(&mut self.fail_next_window) {
            return Err(Error::platform("failed to create window"));
        }

        let handle = HeadlessHandle(self.next_handle);
        self.next_handle += 1;

        let x = (self.screen.0 - desc.width) / 2;
        let y = (self.screen.1 - desc.height) / 2;
        self.windows.insert(handle, HeadlessWindow::new(desc, x, y));
        Ok(handle)
    }

    fn destroy_window(&mut self, handle: HeadlessHandle) {
        self.windows.remove(&handle);
        self.queue.retain(|(target, _)| *target != handle);
    }

    fn show_window(&mut self, handle: HeadlessHandle) {
        if let Some(window) = self.window_mut(handle) {
            window.visible = true;
        }
    }

    fn focus_window(&mut self, handle: HeadlessHandle) {
        if !self.windows.contains_key(&handle) {
            return;
        }
        for (target, window) in &mut self.windows {
            window.focused = *target == handle;
        }
    }

    fn set_size_limits(&mut self, handle: HeadlessHandle, limits: SizeLimits) {
        if let Some(window) = self.window_mut(handle) {
            window.limits = limits;
        }
    }

    fn drain_messages(&mut self, out: &mut Vec<(HeadlessHandle, RawMessage)>) {
        let modifiers = self.modifiers;
        out.extend(self.queue.drain(..).map(|(handle, message)| match message {
            RawMessage::Button { button, pressed, .. } => (
                handle,
                RawMessage::Button {
                    button,
                    pressed,
                    mods: modifiers,
                },
            ),
            other => (handle, other),
        }));
    }

    fn cursor_pos(&self, handle: HeadlessHandle) -> Result<(f64, f64)> {
        let window = self
            .windows
            .get(&handle)
            .ok_or_else(|| Error::platform("failed to query cursor position"))?;
        Ok((
            f64::from(self.cursor.0 - window.x),
            f64::from(self.cursor.1 - window.y),
        ))
    }

    fn set_capture(&mut self, handle: HeadlessHandle, captured: bool) {
        for (target, window) in &mut self.windows {
            if *target == handle {
                window.captured = captured;
            } else if captured {
                window.captured = false;
            }
        }
    }

    fn clear(&mut self, handle: HeadlessHandle, color: u32) {
        if let Some(window) = self.window_mut(handle) {
            window.surface.fill(color);
        }
    }

    fn present(
        &mut self,
        handle: HeadlessHandle,
        frame: &Frame<'_>,
        viewport: Viewport,
        clear_color: u32,
    ) -> Result<()> {
        let window = self
            .windows
            .get_mut(&handle)
            .ok_or_else(|| Error::platform("failed to get device context"))?;

        window.bitmap_extent = (frame.width, frame.height);
        compose(
            &mut window.surface,
            window.width,
            window.height,
            frame,
            viewport,
            clear_color,
        );
        Ok(())
    }

    fn timer_value(&self) -> u64 {
        self.elapsed_nanos()
    }
}

fn pixel_count(width: i32, height: i32) -> usize {
    width.max(0) as usize * height.max(0) as usize
}

/// Paint a client surface: `frame` stretched into `viewport`, `clear_color` elsewhere
fn compose(
    surface: &mut [u32],
    surface_width: i32,
    surface_height: i32,
    frame: &Frame<'_>,
    viewport: Viewport,
    clear_color: u32,
) {
    let source_width = i64::from(frame.width);
    let source_height = i64::from(frame.height);

    for y in 0..surface_height {
        let row = y as usize * surface_width as usize;
        for x in 0..surface_width {
            let color = if viewport.contains(x, y) {
                let sx = i64::from(x - viewport.ox) * source_width / i64::from(viewport.width);
                let sy = i64::from(y - viewport.oy) * source_height / i64::from(viewport.height);
                frame
                    .pixels
                    .get((sy * source_width + sx) as usize)
                    .copied()
                    .unwrap_or(clear_color)
            } else {
                clear_color
            };
            surface[row + x as usize] = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: u32 = 0x00FF_0000;
    const GREEN: u32 = 0x0000_FF00;
    const BLUE: u32 = 0x0000_00FF;
    const WHITE: u32 = 0x00FF_FFFF;

    fn desc(width: i32, height: i32) -> NativeWindowDesc<'static> {
        NativeWindowDesc {
            width,
            height,
            title: "headless",
            resizable: true,
        }
    }

    fn platform_with_window(width: i32, height: i32) -> (HeadlessPlatform, HeadlessHandle) {
        let mut platform = HeadlessPlatform::new();
        platform.init().unwrap();
        let handle = platform.create_window(&desc(width, height)).unwrap();
        (platform, handle)
    }

    #[test]
    fn test_window_is_centered() {
        let (platform, handle) = platform_with_window(640, 480);
        let window = platform.window(handle).unwrap();
        assert_eq!(window.position(), (640, 300));
        assert_eq!(window.size(), (640, 480));
        assert!(!window.is_visible());
    }

    #[test]
    fn test_create_requires_registration() {
        let mut platform = HeadlessPlatform::new();
        assert!(platform.create_window(&desc(10, 10)).is_err());
    }

    #[test]
    fn test_compose_stretches_into_viewport() {
        let pixels = [RED, GREEN, BLUE, WHITE];
        let frame = Frame {
            pixels: &pixels,
            width: 2,
            height: 2,
        };
        let mut surface = vec![0; 8 * 6];
        compose(&mut surface, 8, 6, &frame, Viewport::new(2, 1, 4, 4), 7);

        let at = |x: usize, y: usize| surface[y * 8 + x];
        assert_eq!(at(0, 0), 7);
        assert_eq!(at(2, 1), RED);
        assert_eq!(at(5, 1), GREEN);
        assert_eq!(at(2, 4), BLUE);
        assert_eq!(at(5, 4), WHITE);
        assert_eq!(at(6, 4), 7);
        assert_eq!(at(3, 5), 7);
    }

    #[test]
    fn test_compose_with_empty_viewport_only_clears() {
        let pixels = [RED];
        let frame = Frame {
            pixels: &pixels,
            width: 1,
            height: 1,
        };
        let mut surface = vec![RED; 4];
        compose(&mut surface, 2, 2, &frame, Viewport::new(1, 1, 0, 0), 0);
        assert!(surface.iter().all(|&pixel| pixel == 0));
    }

    #[test]
    fn test_resize_is_clamped_and_queues_paint() {
        let (mut platform, handle) = platform_with_window(300, 300);
        platform.set_size_limits(
            handle,
            SizeLimits {
                min_width: 200,
                min_height: 200,
                max_width: 400,
                max_height: 400,
            },
        );
        platform.post_resize(handle, 100, 900);

        let mut out = Vec::new();
        platform.drain_messages(&mut out);
        assert_eq!(
            out,
            vec![
                (handle, RawMessage::Resized { width: 200, height: 400 }),
                (handle, RawMessage::PaintRequested),
            ]
        );
        assert_eq!(platform.window(handle).unwrap().size(), (200, 400));
    }

    #[test]
    fn test_repeated_resizes_are_coalesced() {
        let (mut platform, handle) = platform_with_window(100, 100);
        platform.post_resize(handle, 120, 120);
        platform.post_resize(handle, 140, 130);
        platform.post_paint(handle);
        assert_eq!(platform.pending_messages(), 2);

        let mut out = Vec::new();
        platform.drain_messages(&mut out);
        assert_eq!(
            out,
            vec![
                (handle, RawMessage::Resized { width: 140, height: 130 }),
                (handle, RawMessage::PaintRequested),
            ]
        );
    }

    #[test]
    fn test_modifiers_sampled_at_drain() {
        let (mut platform, handle) = platform_with_window(10, 10);
        platform.post_button(handle, 0, true);
        platform.set_modifiers(Modifiers::ALT);

        let mut out = Vec::new();
        platform.drain_messages(&mut out);
        assert_eq!(
            out[0].1,
            RawMessage::Button {
                button: 0,
                pressed: true,
                mods: Modifiers::ALT,
            }
        );
        assert_eq!(platform.pending_messages(), 0);
    }

    #[test]
    fn test_destroy_purges_queue() {
        let (mut platform, handle) = platform_with_window(10, 10);
        platform.post_close(handle);
        platform.destroy_window(handle);

        let mut out = Vec::new();
        platform.drain_messages(&mut out);
        assert!(out.is_empty());
        assert_eq!(platform.window_count(), 0);
    }

    #[test]
    fn test_cursor_is_client_relative() {
        let (mut platform, handle) = platform_with_window(640, 480);
        platform.set_cursor_pos(700, 350);
        assert_eq!(platform.cursor_pos(handle).unwrap(), (60.0, 50.0));
        assert!(platform.cursor_pos(HeadlessHandle(99)).is_err());
    }
}
