//! Library context
//!
//! A [`Context`] owns everything that would otherwise be process-wide: the
//! initialized flag, window hints, timer calibration, the error reporter, the
//! platform backend and every window. Windows are addressed by [`WindowId`];
//! native handles are mapped back to ids through a routing table that is filled
//! on creation and erased on destruction, and is never used to keep a window
//! alive.
//!
//! Public operations follow a status-return contract: failures are reported
//! through the error callback and the call returns `false`, `None` or a zero
//! value. The fallible work lives in private `try_*` methods that use `?`.

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::config::{ContextConfig, WindowHint, WindowHints};
use crate::error::{Error, ErrorCallback, ErrorReporter, Result};
use crate::event::{Action, MouseButton, WindowEvent};
use crate::platform::{
    validate_title, Frame, NativeWindowDesc, Platform, RawMessage, TimerCalibration,
};
use crate::window::{
    BufferView, MouseButtonCallback, SizeCallback, SizeLimits, Viewport, Window, WindowId,
};

/// Windowing context bound to one platform backend
///
/// Single-threaded: use it only from the thread that created it.
pub struct Context<P: Platform> {
    platform: P,
    config: ContextConfig,
    errors: ErrorReporter,
    initialized: bool,
    hints: WindowHints,
    timer: TimerCalibration,
    windows: SlotMap<WindowId, Window<P::Handle>>,
    routes: HashMap<P::Handle, WindowId>,
    scratch: Vec<(P::Handle, RawMessage)>,
}

impl<P: Platform> Context<P> {
    /// Create an uninitialized context with the default configuration
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, ContextConfig::default())
    }

    /// Create an uninitialized context
    pub fn with_config(platform: P, config: ContextConfig) -> Self {
        Self {
            platform,
            config,
            errors: ErrorReporter::new(),
            initialized: false,
            hints: WindowHints::NONE,
            timer: TimerCalibration::default(),
            windows: SlotMap::with_key(),
            routes: HashMap::new(),
            scratch: Vec::new(),
        }
    }

    /// The platform backend
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutable access to the platform backend
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Configuration applied by `init`
    pub const fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Whether `init` succeeded and `terminate` has not run since
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialize the context
    ///
    /// Returns `true` immediately when already initialized. On a platform
    /// failure everything the backend registered is rolled back.
    pub fn init(&mut self) -> bool {
        if self.initialized {
            return true;
        }

        self.reset();

        match self.platform.init() {
            Ok(timer) => self.timer = timer,
            Err(err) => {
                self.platform.terminate();
                self.errors.report(&err);
                return false;
            }
        }

        self.hints = self.config.hints;
        self.initialized = true;
        log::debug!("softwin initialized with hints {:?}", self.hints);
        true
    }

    /// Tear the context down; a no-op when not initialized
    ///
    /// Windows still alive are destroyed first.
    pub fn terminate(&mut self) {
        if !self.initialized {
            return;
        }

        let leaked: Vec<WindowId> = self.windows.keys().collect();
        if !leaked.is_empty() {
            log::warn!("Destroying {} window(s) left alive at terminate", leaked.len());
        }
        for id in leaked {
            self.release_window(id);
        }

        self.platform.terminate();
        self.reset();
        log::debug!("softwin terminated");
    }

    /// Replace the error callback, returning the previous one
    ///
    /// `None` silences error reports. Valid before `init`.
    pub fn set_error_callback(&mut self, callback: Option<ErrorCallback>) -> Option<ErrorCallback> {
        self.errors.set_callback(callback)
    }

    /// Set a hint for windows created afterwards
    pub fn set_window_hint(&mut self, hint: WindowHint, value: bool) {
        let result = self.require_init().map(|()| self.hints.set(hint, value));
        self.report(result);
    }

    /// Restore the configured hints
    pub fn default_window_hints(&mut self) {
        let result = self.require_init().map(|()| self.hints = self.config.hints);
        self.report(result);
    }

    /// Current hints
    pub const fn window_hints(&self) -> WindowHints {
        self.hints
    }

    /// Seconds since `init`, `0.0` when not initialized
    pub fn get_time(&mut self) -> f64 {
        let result = self
            .require_init()
            .map(|()| self.timer.seconds_since(self.platform.timer_value()));
        self.report(result).unwrap_or(0.0)
    }

    /// Create a window whose client area is `width` x `height`
    ///
    /// Returns `None` after reporting when the size is not positive, the
    /// context is not initialized or the platform refuses.
    pub fn create_window(&mut self, width: i32, height: i32, title: &str) -> Option<WindowId> {
        let result = self.try_create_window(width, height, title);
        self.report(result)
    }

    /// Destroy a window; unknown or already destroyed ids are ignored
    pub fn destroy_window(&mut self, id: WindowId) {
        let result = self.require_init();
        if self.report(result).is_some() {
            self.release_window(id);
        }
    }

    /// Whether a close was requested for the window
    pub fn window_should_close(&mut self, id: WindowId) -> bool {
        let result = self.window(id).map(|window| window.should_close);
        self.report(result).unwrap_or(false)
    }

    /// Set or clear the should-close flag
    pub fn set_window_should_close(&mut self, id: WindowId, value: bool) {
        let result = self.window_mut(id).map(|window| window.should_close = value);
        self.report(result);
    }

    /// Client-area size, `(0, 0)` on error
    pub fn get_window_size(&mut self, id: WindowId) -> (i32, i32) {
        let result = self.window(id).map(|window| (window.width, window.height));
        self.report(result).unwrap_or((0, 0))
    }

    /// Whether the window was created with a resizable frame
    pub fn is_window_resizable(&mut self, id: WindowId) -> bool {
        let result = self.window(id).map(|window| window.resizable);
        self.report(result).unwrap_or(false)
    }

    /// Constrain the client size; each bound is positive or [`DONT_CARE`](crate::DONT_CARE)
    pub fn set_window_size_limits(
        &mut self,
        id: WindowId,
        min_width: i32,
        min_height: i32,
        max_width: i32,
        max_height: i32,
    ) -> bool {
        let limits = SizeLimits {
            min_width,
            min_height,
            max_width,
            max_height,
        };
        let result = self.try_set_size_limits(id, limits);
        self.report(result).is_some()
    }

    /// Current size limits
    pub fn get_window_size_limits(&mut self, id: WindowId) -> SizeLimits {
        let result = self.window(id).map(|window| window.limits);
        self.report(result).unwrap_or_default()
    }

    /// Register the resize callback, returning the previous one
    pub fn set_window_size_callback(
        &mut self,
        id: WindowId,
        callback: Option<SizeCallback>,
    ) -> Option<SizeCallback> {
        let result = self
            .window_mut(id)
            .map(|window| std::mem::replace(&mut window.size_callback, callback));
        self.report(result).flatten()
    }

    /// Register the mouse-button callback, returning the previous one
    pub fn set_mouse_button_callback(
        &mut self,
        id: WindowId,
        callback: Option<MouseButtonCallback>,
    ) -> Option<MouseButtonCallback> {
        let result = self
            .window_mut(id)
            .map(|window| std::mem::replace(&mut window.mouse_button_callback, callback));
        self.report(result).flatten()
    }

    /// Last recorded state of a mouse button
    pub fn get_mouse_button(&mut self, id: WindowId, button: MouseButton) -> Action {
        let result = self
            .window(id)
            .map(|window| window.mouse_buttons[button.index()]);
        self.report(result).unwrap_or_default()
    }

    /// Cursor position relative to the client area, `(0.0, 0.0)` on error
    pub fn get_cursor_pos(&mut self, id: WindowId) -> (f64, f64) {
        let result = self
            .window(id)
            .map(|window| window.native)
            .and_then(|native| self.platform.cursor_pos(native));
        self.report(result).unwrap_or((0.0, 0.0))
    }

    /// Drain the host queue once and return the events it produced, in order
    ///
    /// Never blocks. Window state is updated and callbacks run before this
    /// returns. Paint requests are handled internally and are not returned.
    pub fn poll_events(&mut self) -> Vec<(WindowId, WindowEvent)> {
        let result = self.require_init();
        if self.report(result).is_none() {
            return Vec::new();
        }

        let mut messages = std::mem::take(&mut self.scratch);
        self.platform.drain_messages(&mut messages);

        let mut events = Vec::with_capacity(messages.len());
        for (handle, message) in messages.drain(..) {
            let Some(&id) = self.routes.get(&handle) else {
                log::trace!("Dropping {message:?} for foreign handle {handle:?}");
                continue;
            };
            if let Some(event) = self.dispatch(id, message) {
                events.push((id, event));
            }
        }

        self.scratch = messages;
        events
    }

    /// Attach a pixel buffer and repaint the viewport from it immediately
    ///
    /// `buffer` holds `width * height` packed `0x00RRGGBB` pixels, top row
    /// first. It is not copied.
    ///
    /// # Safety
    /// The window keeps a pointer to `buffer` and reads it on every later
    /// paint. Until the next `update_buffer` for this window, its destruction
    /// or `terminate`, the buffer must stay allocated and unshrunk, and it must
    /// not be written or mutably borrowed at all. To draw a new frame, write
    /// the pixels and then call `update_buffer` again before the next
    /// `poll_events`.
    #[allow(unsafe_code)]
    pub unsafe fn update_buffer(
        &mut self,
        id: WindowId,
        buffer: &[u32],
        width: i32,
        height: i32,
    ) -> bool {
        let result = self.try_update_buffer(id, buffer, width, height);
        self.report(result).is_some()
    }

    /// Set the viewport the buffer is presented into
    ///
    /// Fails without changing anything when a value is negative or the
    /// rectangle leaves the client area. Takes effect on the next paint.
    pub fn set_viewport(&mut self, id: WindowId, ox: i32, oy: i32, width: i32, height: i32) -> bool {
        let result = self.try_set_viewport(id, Viewport::new(ox, oy, width, height));
        self.report(result).is_some()
    }

    /// Current viewport
    pub fn get_viewport(&mut self, id: WindowId) -> Viewport {
        let result = self.window(id).map(|window| window.viewport);
        self.report(result).unwrap_or_default()
    }

    /// Number of live windows
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    fn try_create_window(&mut self, width: i32, height: i32, title: &str) -> Result<WindowId> {
        self.require_init()?;
        if width <= 0 || height <= 0 {
            return Err(Error::invalid_value(format!(
                "invalid window size {width}x{height}"
            )));
        }
        validate_title(title)?;

        let resizable = self.hints.resizable;
        let native = self.platform.create_window(&NativeWindowDesc {
            width,
            height,
            title,
            resizable,
        })?;

        let id = self.windows.insert(Window::new(native, width, height, resizable));
        self.routes.insert(native, id);

        if self.hints.visible {
            self.platform.show_window(native);
            if self.hints.focused {
                self.platform.focus_window(native);
            }
        }

        log::debug!("Created window {id:?} ({width}x{height}) \"{title}\"");
        Ok(id)
    }

    fn try_set_size_limits(&mut self, id: WindowId, limits: SizeLimits) -> Result<()> {
        limits.validate()?;
        let window = self.window_mut(id)?;
        window.limits = limits;
        let native = window.native;
        self.platform.set_size_limits(native, limits);
        Ok(())
    }

    fn try_update_buffer(&mut self, id: WindowId, buffer: &[u32], width: i32, height: i32) -> Result<()> {
        self.require_init()?;
        let window = self
            .windows
            .get_mut(id)
            .ok_or_else(|| unknown_window(id))?;

        if width <= 0 || height <= 0 {
            return Err(Error::invalid_value(format!(
                "invalid buffer size {width}x{height}"
            )));
        }
        let required = width as usize * height as usize;
        if buffer.len() < required {
            return Err(Error::invalid_value(format!(
                "buffer holds {} pixels, {width}x{height} needs {required}",
                buffer.len()
            )));
        }

        window.buffer = Some(BufferView::new(buffer, width, height));
        present(&mut self.platform, window, self.config.clear_color)
    }

    fn try_set_viewport(&mut self, id: WindowId, viewport: Viewport) -> Result<()> {
        if viewport.ox < 0 || viewport.oy < 0 || viewport.width < 0 || viewport.height < 0 {
            return Err(Error::invalid_value(format!("negative viewport {viewport:?}")));
        }

        let window = self.window_mut(id)?;
        if !viewport.fits_within(window.width, window.height) {
            return Err(Error::invalid_value(format!(
                "viewport {viewport:?} exceeds the {}x{} client area",
                window.width, window.height
            )));
        }

        window.viewport = viewport;
        Ok(())
    }

    /// Run one routed message through the window's state machine and host side effects
    fn dispatch(&mut self, id: WindowId, message: RawMessage) -> Option<WindowEvent> {
        let window = self.windows.get_mut(id)?;

        if message == RawMessage::PaintRequested {
            if let Err(err) = present(&mut self.platform, window, self.config.clear_color) {
                self.errors.report(&err);
            }
            return None;
        }

        let event = window.apply(message)?;
        match event {
            WindowEvent::Closed => {
                log::debug!("Close requested for window {id:?}");
            }
            WindowEvent::Resized { width, height } => {
                self.platform.clear(window.native, self.config.clear_color);
                if let Some(callback) = window.size_callback.as_mut() {
                    callback(id, width, height);
                }
            }
            WindowEvent::MouseButton { button, action, mods } => {
                self.platform.set_capture(window.native, action == Action::Press);
                if let Some(callback) = window.mouse_button_callback.as_mut() {
                    callback(id, button, action, mods);
                }
            }
        }
        Some(event)
    }

    fn release_window(&mut self, id: WindowId) {
        let Some(window) = self.windows.remove(id) else {
            return;
        };
        self.routes.remove(&window.native);
        self.platform.destroy_window(window.native);
        log::debug!("Destroyed window {id:?}");
    }

    fn reset(&mut self) {
        self.initialized = false;
        self.hints = WindowHints::NONE;
        self.timer = TimerCalibration::default();
        self.windows.clear();
        self.routes.clear();
        self.scratch.clear();
    }

    fn require_init(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::not_initialized())
        }
    }

    fn window(&self, id: WindowId) -> Result<&Window<P::Handle>> {
        self.require_init()?;
        self.windows.get(id).ok_or_else(|| unknown_window(id))
    }

    fn window_mut(&mut self, id: WindowId) -> Result<&mut Window<P::Handle>> {
        self.require_init()?;
        self.windows.get_mut(id).ok_or_else(|| unknown_window(id))
    }

    fn report<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.report(&err);
                None
            }
        }
    }
}

impl<P: Platform> Drop for Context<P> {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn unknown_window(id: WindowId) -> Error {
    Error::invalid_value(format!("unknown window {id:?}"))
}

/// Blit the window's attached buffer, if any, into its viewport
fn present<P: Platform>(platform: &mut P, window: &Window<P::Handle>, clear_color: u32) -> Result<()> {
    let Some(buffer) = window.buffer.as_ref() else {
        return Ok(());
    };

    // SAFETY: the buffer stays valid while attached, per the `update_buffer` contract
    #[allow(unsafe_code)]
    let pixels = unsafe { buffer.pixels() };

    let frame = Frame {
        pixels,
        width: buffer.width(),
        height: buffer.height(),
    };
    platform.present(window.native, &frame, window.viewport, clear_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::platform::HeadlessPlatform;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Reports = Rc<RefCell<Vec<ErrorCode>>>;

    fn context() -> (Context<HeadlessPlatform>, Reports) {
        let reports: Reports = Rc::default();
        let sink = Rc::clone(&reports);
        let mut context = Context::new(HeadlessPlatform::new());
        context.set_error_callback(Some(Box::new(move |code, _: &str| sink.borrow_mut().push(code))));
        (context, reports)
    }

    #[test]
    fn test_operations_before_init_report_not_initialized() {
        let (mut context, reports) = context();

        assert!(context.create_window(100, 100, "early").is_none());
        assert!(context.poll_events().is_empty());
        assert_eq!(context.get_time(), 0.0);
        context.set_window_hint(WindowHint::Visible, false);

        assert_eq!(reports.borrow().len(), 4);
        assert!(reports.borrow().iter().all(|&code| code == ErrorCode::NotInitialized));
    }

    #[test]
    fn test_hints_follow_init_and_terminate() {
        let (mut context, _) = context();
        assert_eq!(context.window_hints(), WindowHints::NONE);

        assert!(context.init());
        assert_eq!(context.window_hints(), WindowHints::default());

        context.set_window_hint(WindowHint::Resizable, false);
        assert!(!context.window_hints().resizable);
        context.default_window_hints();
        assert!(context.window_hints().resizable);

        context.terminate();
        assert_eq!(context.window_hints(), WindowHints::NONE);
    }

    #[test]
    fn test_configured_hints_apply_to_new_windows() {
        let config = ContextConfig {
            hints: WindowHints {
                resizable: false,
                visible: true,
                focused: false,
            },
            ..ContextConfig::default()
        };
        let mut context = Context::with_config(HeadlessPlatform::new(), config);
        assert!(context.init());

        let id = context.create_window(320, 200, "configured").unwrap();
        assert!(!context.is_window_resizable(id));

        let handle = context.platform().handles()[0];
        let native = context.platform().window(handle).unwrap();
        assert!(native.is_visible());
        assert!(!native.is_focused());
        assert!(!native.is_resizable());
    }

    #[test]
    fn test_unknown_window_reports_invalid_value() {
        let (mut context, reports) = context();
        assert!(context.init());
        let id = context.create_window(10, 10, "gone").unwrap();
        context.destroy_window(id);

        assert!(!context.window_should_close(id));
        assert_eq!(context.get_window_size(id), (0, 0));
        context.destroy_window(id);

        assert_eq!(*reports.borrow(), vec![ErrorCode::InvalidValue, ErrorCode::InvalidValue]);
    }

    #[test]
    fn test_size_limits_are_validated_and_forwarded() {
        let (mut context, reports) = context();
        assert!(context.init());
        let id = context.create_window(300, 300, "limits").unwrap();

        assert!(context.set_window_size_limits(id, 200, 200, crate::DONT_CARE, 400));
        let handle = context.platform().handles()[0];
        assert_eq!(context.platform().window(handle).unwrap().size_limits().max_height, 400);

        assert!(!context.set_window_size_limits(id, 0, 200, 400, 400));
        assert_eq!(context.get_window_size_limits(id).min_width, 200);
        assert_eq!(*reports.borrow(), vec![ErrorCode::InvalidValue]);
    }

    #[test]
    fn test_get_time_advances() {
        let (mut context, _) = context();
        assert!(context.init());
        let first = context.get_time();
        let second = context.get_time();
        assert!(first >= 0.0);
        assert!(second >= first);
    }

    #[test]
    fn test_terminate_releases_native_windows() {
        let mut context = Context::new(HeadlessPlatform::new());
        assert!(context.init());
        context.create_window(10, 10, "one");
        context.create_window(10, 10, "two");
        assert_eq!(context.platform().window_count(), 2);

        context.terminate();
        assert_eq!(context.platform().window_count(), 0);
        assert_eq!(context.window_count(), 0);
        assert!(!context.platform().is_registered());
    }
}
