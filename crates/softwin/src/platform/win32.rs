//! Win32 backend
//!
//! Each backend instance registers its own window class with a private window
//! procedure and presents buffers with GDI `StretchDIBits`. The window
//! procedure never touches window entities: it only records host messages in a
//! thread-local inbox shared by all instances on the thread, and
//! `drain_messages` hands each instance the messages of its own windows after
//! the queue is pumped. Messages sent outside the pump (e.g. `WM_SIZE` from
//! `ShowWindow`) wait in the inbox until the next drain.
//!
//! # Limitations
//!
//! While the user drags a window border Windows runs a modal loop inside
//! `DispatchMessageW`, so the window is not repainted from the caller's buffer
//! and no size callback runs until the drag ends. Resize and paint requests
//! queued meanwhile are coalesced, so only the final size is reported.
#![allow(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use winapi::shared::minwindef::{DWORD, FALSE, HIWORD, LOWORD, LPARAM, LRESULT, TRUE, UINT, WPARAM};
use winapi::shared::windef::{HBRUSH, HDC, HWND, POINT, RECT};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::profileapi::{QueryPerformanceCounter, QueryPerformanceFrequency};
use winapi::um::wingdi::{
    CreateSolidBrush, DeleteObject, GetStockObject, SetStretchBltMode, StretchDIBits, BITMAPINFO,
    BITMAPINFOHEADER, BI_RGB, BLACK_BRUSH, COLORONCOLOR, DIB_RGB_COLORS, RGB, SRCCOPY,
};
use winapi::um::winnt::LARGE_INTEGER;
use winapi::um::winuser::{
    AdjustWindowRectEx, BeginPaint, BringWindowToTop, CreateWindowExW, DefWindowProcW,
    DestroyWindow, DispatchMessageW, EndPaint, FillRect, GetClientRect, GetCursorPos, GetDC,
    GetKeyState, GetSystemMetrics, LoadCursorW, LoadImageW, PeekMessageW, RegisterClassExW,
    ReleaseCapture, ReleaseDC, ScreenToClient, SetCapture, SetFocus, SetForegroundWindow,
    ShowWindow, TranslateMessage, UnregisterClassW, CS_HREDRAW, CS_OWNDC, CS_VREDRAW,
    GET_XBUTTON_WPARAM, IDC_ARROW, IDI_APPLICATION, IMAGE_ICON, LR_DEFAULTSIZE, LR_SHARED,
    MINMAXINFO, MSG, PAINTSTRUCT, PM_REMOVE, SM_CXSCREEN, SM_CYSCREEN, SW_SHOW, VK_CONTROL,
    VK_LWIN, VK_MENU, VK_RWIN, VK_SHIFT, WM_CLOSE, WM_GETMINMAXINFO, WM_LBUTTONDOWN,
    WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_PAINT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SIZE,
    WM_XBUTTONDOWN, WM_XBUTTONUP, WNDCLASSEXW, WS_CAPTION, WS_CLIPCHILDREN, WS_CLIPSIBLINGS,
    WS_EX_APPWINDOW, WS_MAXIMIZEBOX, WS_MINIMIZEBOX, WS_SYSMENU, WS_THICKFRAME, XBUTTON1,
};

use crate::error::{Error, Result};
use crate::event::Modifiers;
use crate::platform::{
    push_coalesced, side_button_id, take_owned, validate_title, Frame, NativeWindowDesc,
    Platform, RawMessage, TimerCalibration,
};
use crate::window::{SizeLimits, Viewport, DONT_CARE};

const CLASS_PREFIX: &str = "SOFTWIN";
const ICON_NAME: &str = "SOFTWIN_ICON";
const EX_STYLE: DWORD = WS_EX_APPWINDOW;

/// Native handle of a Win32 window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Win32Handle(usize);

impl Win32Handle {
    fn from_hwnd(hwnd: HWND) -> Self {
        Self(hwnd as usize)
    }

    fn hwnd(self) -> HWND {
        self.0 as HWND
    }
}

/// What the window procedure needs to know about each window
struct ProcWindow {
    style: DWORD,
    limits: SizeLimits,
}

#[derive(Default)]
struct ProcState {
    inbox: Vec<(Win32Handle, RawMessage)>,
    windows: HashMap<Win32Handle, ProcWindow>,
}

thread_local! {
    static PROC_STATE: RefCell<ProcState> = RefCell::new(ProcState::default());
}

static NEXT_CLASS_ID: AtomicUsize = AtomicUsize::new(0);

fn post(handle: Win32Handle, message: RawMessage) {
    PROC_STATE.with(|state| push_coalesced(&mut state.borrow_mut().inbox, handle, message));
}

/// Class name for a new backend instance; never reused within the process
fn next_class_name() -> String {
    format!("{CLASS_PREFIX}_{}", NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
}

/// Paint resources owned by one window
struct NativeWindow {
    hdc: HDC,
    bitmap: BITMAPINFO,
}

/// GDI-backed [`Platform`] implementation
pub struct Win32Platform {
    class_label: String,
    class_name: Vec<u16>,
    registered: bool,
    windows: HashMap<Win32Handle, NativeWindow>,
}

impl Default for Win32Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl Win32Platform {
    /// Create an unregistered backend with a window class of its own
    pub fn new() -> Self {
        let class_label = next_class_name();
        Self {
            class_name: wide(&class_label),
            class_label,
            registered: false,
            windows: HashMap::new(),
        }
    }
}

impl Platform for Win32Platform {
    type Handle = Win32Handle;

    fn init(&mut self) -> Result<TimerCalibration> {
        unsafe {
            let instance = GetModuleHandleW(ptr::null());
            let icon_name = wide(ICON_NAME);

            let mut icon = LoadImageW(
                instance,
                icon_name.as_ptr(),
                IMAGE_ICON,
                0,
                0,
                LR_DEFAULTSIZE | LR_SHARED,
            );
            if icon.is_null() {
                icon = LoadImageW(
                    ptr::null_mut(),
                    IDI_APPLICATION,
                    IMAGE_ICON,
                    0,
                    0,
                    LR_DEFAULTSIZE | LR_SHARED,
                );
            }

            let mut class: WNDCLASSEXW = mem::zeroed();
            class.cbSize = mem::size_of::<WNDCLASSEXW>() as UINT;
            class.style = CS_HREDRAW | CS_VREDRAW | CS_OWNDC;
            class.lpfnWndProc = Some(window_proc);
            class.hInstance = instance;
            class.hCursor = LoadCursorW(ptr::null_mut(), IDC_ARROW);
            class.hIcon = icon.cast();
            class.hbrBackground = GetStockObject(BLACK_BRUSH) as HBRUSH;
            class.lpszClassName = self.class_name.as_ptr();

            if RegisterClassExW(&class) == 0 {
                return Err(Error::platform(format!(
                    "failed to register window class (error {})",
                    GetLastError()
                )));
            }
            self.registered = true;

            let mut frequency: LARGE_INTEGER = mem::zeroed();
            let mut offset: LARGE_INTEGER = mem::zeroed();
            if QueryPerformanceFrequency(&mut frequency) == 0
                || QueryPerformanceCounter(&mut offset) == 0
            {
                return Err(Error::platform("failed to calibrate the performance counter"));
            }

            log::debug!("Registered window class {}", self.class_label);
            Ok(TimerCalibration {
                frequency: *frequency.QuadPart() as u64,
                offset: *offset.QuadPart() as u64,
            })
        }
    }

    fn terminate(&mut self) {
        if !self.registered {
            return;
        }
        unsafe {
            UnregisterClassW(self.class_name.as_ptr(), GetModuleHandleW(ptr::null()));
        }
        self.registered = false;
        for &handle in self.windows.keys() {
            forget_window(handle);
        }
    }

    fn create_window(&mut self, desc: &NativeWindowDesc<'_>) -> Result<Win32Handle> {
        let style = window_style(desc.resizable);
        let title = encode_title(desc.title)?;

        unsafe {
            let mut rect = RECT {
                left: 0,
                top: 0,
                right: desc.width,
                bottom: desc.height,
            };
            AdjustWindowRectEx(&mut rect, style, FALSE, EX_STYLE);
            let full_width = rect.right - rect.left;
            let full_height = rect.bottom - rect.top;

            let x = (GetSystemMetrics(SM_CXSCREEN) - full_width) / 2;
            let y = (GetSystemMetrics(SM_CYSCREEN) - full_height) / 2;

            let hwnd = CreateWindowExW(
                EX_STYLE,
                self.class_name.as_ptr(),
                title.as_ptr(),
                style,
                x,
                y,
                full_width,
                full_height,
                ptr::null_mut(),
                ptr::null_mut(),
                GetModuleHandleW(ptr::null()),
                ptr::null_mut(),
            );
            if hwnd.is_null() {
                return Err(Error::platform(format!(
                    "failed to create window (error {})",
                    GetLastError()
                )));
            }
            let handle = Win32Handle::from_hwnd(hwnd);

            let hdc = GetDC(hwnd);
            if hdc.is_null() {
                forget_window(handle);
                DestroyWindow(hwnd);
                return Err(Error::platform("failed to get device context"));
            }
            SetStretchBltMode(hdc, COLORONCOLOR);

            PROC_STATE.with(|state| {
                state.borrow_mut().windows.insert(
                    handle,
                    ProcWindow {
                        style,
                        limits: SizeLimits::default(),
                    },
                );
            });
            self.windows.insert(
                handle,
                NativeWindow {
                    hdc,
                    bitmap: bitmap_header(0, 0),
                },
            );
            Ok(handle)
        }
    }

    fn destroy_window(&mut self, handle: Win32Handle) {
        // Removing the entry drops the bitmap header before the DC and the window go
        let Some(NativeWindow { hdc, .. }) = self.windows.remove(&handle) else {
            return;
        };

        unsafe {
            ReleaseDC(handle.hwnd(), hdc);
            DestroyWindow(handle.hwnd());
        }
        forget_window(handle);
    }

    fn show_window(&mut self, handle: Win32Handle) {
        unsafe {
            ShowWindow(handle.hwnd(), SW_SHOW);
        }
    }

    fn focus_window(&mut self, handle: Win32Handle) {
        unsafe {
            BringWindowToTop(handle.hwnd());
            SetForegroundWindow(handle.hwnd());
            SetFocus(handle.hwnd());
        }
    }

    fn set_size_limits(&mut self, handle: Win32Handle, limits: SizeLimits) {
        PROC_STATE.with(|state| {
            if let Some(window) = state.borrow_mut().windows.get_mut(&handle) {
                window.limits = limits;
            }
        });
    }

    fn drain_messages(&mut self, out: &mut Vec<(Win32Handle, RawMessage)>) {
        unsafe {
            let mut msg: MSG = mem::zeroed();
            while PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        let windows = &self.windows;
        PROC_STATE.with(|state| {
            take_owned(&mut state.borrow_mut().inbox, out, |handle| {
                windows.contains_key(&handle)
            });
        });
    }

    fn cursor_pos(&self, handle: Win32Handle) -> Result<(f64, f64)> {
        let mut point = POINT { x: 0, y: 0 };
        unsafe {
            if GetCursorPos(&mut point) == 0 || ScreenToClient(handle.hwnd(), &mut point) == 0 {
                return Err(Error::platform("failed to query cursor position"));
            }
        }
        Ok((f64::from(point.x), f64::from(point.y)))
    }

    fn set_capture(&mut self, handle: Win32Handle, captured: bool) {
        unsafe {
            if captured {
                SetCapture(handle.hwnd());
            } else {
                ReleaseCapture();
            }
        }
    }

    fn clear(&mut self, handle: Win32Handle, color: u32) {
        let Some(native) = self.windows.get(&handle) else {
            return;
        };
        unsafe {
            let mut client: RECT = mem::zeroed();
            GetClientRect(handle.hwnd(), &mut client);
            fill_rects(native.hdc, &[client], color);
        }
    }

    fn present(
        &mut self,
        handle: Win32Handle,
        frame: &Frame<'_>,
        viewport: Viewport,
        clear_color: u32,
    ) -> Result<()> {
        let native = self
            .windows
            .get_mut(&handle)
            .ok_or_else(|| Error::platform("failed to get device context"))?;
        native.bitmap.bmiHeader.biWidth = frame.width;
        // Negative height: top-down rows, first pixel at the top-left corner
        native.bitmap.bmiHeader.biHeight = -frame.height;

        unsafe {
            let mut client: RECT = mem::zeroed();
            GetClientRect(handle.hwnd(), &mut client);
            fill_rects(native.hdc, &surrounding_rects(&client, viewport), clear_color);

            if viewport.is_empty() {
                return Ok(());
            }

            let lines = StretchDIBits(
                native.hdc,
                viewport.ox,
                viewport.oy,
                viewport.width,
                viewport.height,
                0,
                0,
                frame.width,
                frame.height,
                frame.pixels.as_ptr().cast(),
                &native.bitmap,
                DIB_RGB_COLORS,
                SRCCOPY,
            );
            if lines == 0 {
                return Err(Error::platform("failed to blit buffer"));
            }
        }
        Ok(())
    }

    fn timer_value(&self) -> u64 {
        unsafe {
            let mut counter: LARGE_INTEGER = mem::zeroed();
            QueryPerformanceCounter(&mut counter);
            *counter.QuadPart() as u64
        }
    }
}

impl Drop for Win32Platform {
    fn drop(&mut self) {
        let handles: Vec<_> = self.windows.keys().copied().collect();
        for handle in handles {
            self.destroy_window(handle);
        }
        self.terminate();
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: UINT,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let handle = Win32Handle::from_hwnd(hwnd);

    match msg {
        WM_CLOSE => {
            // The context decides when to destroy; default handling would destroy now
            post(handle, RawMessage::CloseRequested);
            return 0;
        }
        WM_SIZE => {
            let width = i32::from(LOWORD(lparam as DWORD));
            let height = i32::from(HIWORD(lparam as DWORD));
            post(handle, RawMessage::Resized { width, height });
        }
        WM_PAINT => {
            let mut paint: PAINTSTRUCT = mem::zeroed();
            BeginPaint(hwnd, &mut paint);
            EndPaint(hwnd, &paint);
            post(handle, RawMessage::PaintRequested);
            return 0;
        }
        WM_LBUTTONDOWN | WM_LBUTTONUP | WM_RBUTTONDOWN | WM_RBUTTONUP | WM_MBUTTONDOWN
        | WM_MBUTTONUP | WM_XBUTTONDOWN | WM_XBUTTONUP => {
            let button = match msg {
                WM_LBUTTONDOWN | WM_LBUTTONUP => 0,
                WM_RBUTTONDOWN | WM_RBUTTONUP => 1,
                WM_MBUTTONDOWN | WM_MBUTTONUP => 2,
                _ => side_button_id(GET_XBUTTON_WPARAM(wparam) == XBUTTON1),
            };
            let pressed = matches!(
                msg,
                WM_LBUTTONDOWN | WM_RBUTTONDOWN | WM_MBUTTONDOWN | WM_XBUTTONDOWN
            );
            post(
                handle,
                RawMessage::Button {
                    button,
                    pressed,
                    mods: current_modifiers(),
                },
            );

            if matches!(msg, WM_XBUTTONDOWN | WM_XBUTTONUP) {
                return TRUE as LRESULT;
            }
            return 0;
        }
        WM_GETMINMAXINFO => {
            let window = PROC_STATE.with(|state| {
                state
                    .borrow()
                    .windows
                    .get(&handle)
                    .map(|window| (window.style, window.limits))
            });
            if let Some((style, limits)) = window {
                apply_size_limits(&mut *(lparam as *mut MINMAXINFO), style, limits);
                return 0;
            }
        }
        _ => {}
    }

    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn window_style(resizable: bool) -> DWORD {
    let mut style = WS_CLIPSIBLINGS | WS_CLIPCHILDREN | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX;
    if resizable {
        style |= WS_MAXIMIZEBOX | WS_THICKFRAME;
    }
    style
}

fn wide(text: &str) -> Vec<u16> {
    OsStr::new(text).encode_wide().chain(Some(0)).collect()
}

/// UTF-8 title to a NUL-terminated UTF-16 string
fn encode_title(title: &str) -> Result<Vec<u16>> {
    validate_title(title)?;
    Ok(wide(title))
}

fn bitmap_header(width: i32, height: i32) -> BITMAPINFO {
    let mut bitmap: BITMAPINFO = unsafe { mem::zeroed() };
    bitmap.bmiHeader = BITMAPINFOHEADER {
        biSize: mem::size_of::<BITMAPINFOHEADER>() as DWORD,
        biWidth: width,
        biHeight: -height,
        biPlanes: 1,
        biBitCount: 32,
        biCompression: BI_RGB,
        biSizeImage: 0,
        biXPelsPerMeter: 0,
        biYPelsPerMeter: 0,
        biClrUsed: 0,
        biClrImportant: 0,
    };
    bitmap
}

fn forget_window(handle: Win32Handle) {
    PROC_STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.windows.remove(&handle);
        state.inbox.retain(|(target, _)| *target != handle);
    });
}

fn current_modifiers() -> Modifiers {
    let held = |key: i32| (unsafe { GetKeyState(key) } as u16) & 0x8000 != 0;

    let mut mods = Modifiers::empty();
    if held(VK_SHIFT) {
        mods |= Modifiers::SHIFT;
    }
    if held(VK_CONTROL) {
        mods |= Modifiers::CONTROL;
    }
    if held(VK_MENU) {
        mods |= Modifiers::ALT;
    }
    if held(VK_LWIN) || held(VK_RWIN) {
        mods |= Modifiers::SUPER;
    }
    mods
}

/// Convert client-area limits to the outer track sizes Windows expects
unsafe fn apply_size_limits(info: &mut MINMAXINFO, style: DWORD, limits: SizeLimits) {
    let outer = |width: i32, height: i32| {
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        };
        AdjustWindowRectEx(&mut rect, style, FALSE, EX_STYLE);
        (rect.right - rect.left, rect.bottom - rect.top)
    };

    if limits.min_width != DONT_CARE && limits.min_height != DONT_CARE {
        let (width, height) = outer(limits.min_width, limits.min_height);
        info.ptMinTrackSize.x = width;
        info.ptMinTrackSize.y = height;
    }
    if limits.max_width != DONT_CARE && limits.max_height != DONT_CARE {
        let (width, height) = outer(limits.max_width, limits.max_height);
        info.ptMaxTrackSize.x = width;
        info.ptMaxTrackSize.y = height;
    }
}

/// Up to four rectangles covering the client area outside the viewport
fn surrounding_rects(client: &RECT, viewport: Viewport) -> Vec<RECT> {
    let right = viewport.ox + viewport.width;
    let bottom = viewport.oy + viewport.height;

    [
        RECT { left: client.left, top: client.top, right: client.right, bottom: viewport.oy },
        RECT { left: client.left, top: bottom, right: client.right, bottom: client.bottom },
        RECT { left: client.left, top: viewport.oy, right: viewport.ox, bottom },
        RECT { left: right, top: viewport.oy, right: client.right, bottom },
    ]
    .into_iter()
    .filter(|rect| rect.right > rect.left && rect.bottom > rect.top)
    .collect()
}

/// Fill rectangles with a `0x00RRGGBB` color
unsafe fn fill_rects(hdc: HDC, rects: &[RECT], color: u32) {
    if rects.is_empty() {
        return;
    }
    let brush = CreateSolidBrush(RGB(
        (color >> 16) as u8,
        (color >> 8) as u8,
        color as u8,
    ));
    for rect in rects {
        FillRect(hdc, rect, brush);
    }
    DeleteObject(brush.cast());
}
