//! Hello window demo
//!
//! Opens a 640x480 window, presents an animated gradient from a 320x240
//! software buffer and logs resize and mouse button events until the window is
//! closed. Without a native backend the same loop runs headless and closes
//! itself after a few frames.
#![allow(unsafe_code)]

use softwin::platform::Platform;
use softwin::{Config, Context, ContextConfig, WindowEvent, WindowId};

const WINDOW_WIDTH: i32 = 640;
const WINDOW_HEIGHT: i32 = 480;
const BUFFER_WIDTH: i32 = 320;
const BUFFER_HEIGHT: i32 = 240;
const CONFIG_PATH: &str = "softwin.toml";

struct HelloApp<P: Platform> {
    // Declared before `pixels` so the window is gone before its buffer is freed
    context: Context<P>,
    window: WindowId,
    pixels: Vec<u32>,
    frame: u32,
}

impl<P: Platform> HelloApp<P> {
    fn new(platform: P, config: ContextConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let mut context = Context::with_config(platform, config);
        context.set_error_callback(Some(Box::new(|code, message: &str| {
            log::error!("softwin error 0x{:08X}: {message}", code.code());
        })));

        if !context.init() {
            return Err("failed to initialize softwin".into());
        }

        let window = context
            .create_window(WINDOW_WIDTH, WINDOW_HEIGHT, "Hello softwin")
            .ok_or("failed to create window")?;

        context.set_window_size_callback(
            window,
            Some(Box::new(|_, width, height| {
                log::info!("Window resized to {width}x{height}");
            })),
        );
        context.set_mouse_button_callback(
            window,
            Some(Box::new(|_, button, action, mods| {
                log::info!("{button:?} {action:?} with {mods:?}");
            })),
        );

        Ok(Self {
            context,
            window,
            pixels: vec![0; (BUFFER_WIDTH * BUFFER_HEIGHT) as usize],
            frame: 0,
        })
    }

    /// Run one tick; returns `false` once the window should close
    fn tick(&mut self) -> bool {
        for (_, event) in self.context.poll_events() {
            if event == WindowEvent::Closed {
                log::info!("Close requested after {} frames", self.frame);
            }
        }
        if self.context.window_should_close(self.window) {
            return false;
        }

        self.draw();
        // SAFETY: `pixels` is never resized and outlives the window, and it is
        // only written in `draw`, right before being attached again here
        unsafe {
            self.context
                .update_buffer(self.window, &self.pixels, BUFFER_WIDTH, BUFFER_HEIGHT);
        }
        self.frame += 1;
        true
    }

    fn draw(&mut self) {
        let shift = (self.context.get_time() * 60.0) as u32;
        for (y, row) in self.pixels.chunks_exact_mut(BUFFER_WIDTH as usize).enumerate() {
            for (x, pixel) in row.iter_mut().enumerate() {
                let red = (x as u32 + shift) & 0xFF;
                let green = (y as u32 + shift / 2) & 0xFF;
                *pixel = (red << 16) | (green << 8) | 0x40;
            }
        }
    }

    fn shutdown(mut self) {
        self.context.destroy_window(self.window);
        self.context.terminate();
        log::info!("Shut down after {} frames", self.frame);
    }
}

fn load_config() -> ContextConfig {
    match ContextConfig::load_from_file(CONFIG_PATH) {
        Ok(config) => {
            log::info!("Loaded {CONFIG_PATH}");
            config
        }
        Err(err) => {
            log::debug!("Using default configuration ({err})");
            ContextConfig::default()
        }
    }
}

#[cfg(windows)]
fn run(config: ContextConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = HelloApp::new(softwin::platform::Win32Platform::new(), config)?;
    while app.tick() {
        std::thread::sleep(std::time::Duration::from_millis(16));
    }
    app.shutdown();
    Ok(())
}

#[cfg(not(windows))]
fn run(config: ContextConfig) -> Result<(), Box<dyn std::error::Error>> {
    const HEADLESS_FRAMES: u32 = 120;

    log::warn!("No native backend on this target, running headless");
    let mut app = HelloApp::new(softwin::platform::HeadlessPlatform::new(), config)?;
    while app.tick() {
        if app.frame == HEADLESS_FRAMES {
            let platform = app.context.platform_mut();
            if let Some(&handle) = platform.handles().first() {
                platform.post_button(handle, 0, true);
                platform.post_button(handle, 0, false);
                platform.post_close(handle);
            }
        }
    }
    app.shutdown();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    softwin::logging::init_with_filter("info");

    log::info!("Starting hello_window");
    run(load_config())
}
