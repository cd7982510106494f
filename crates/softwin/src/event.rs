//! Normalized window events and input types
//!
//! The event pump turns host messages into [`WindowEvent`] values. Mouse buttons
//! follow the usual 8-button numbering: left, right, middle, then the side
//! buttons starting at index 3.

use bitflags::bitflags;

/// Number of tracked mouse buttons
pub const MOUSE_BUTTON_COUNT: usize = 8;

/// Mouse button identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MouseButton {
    /// Left mouse button
    Left = 0,
    /// Right mouse button
    Right = 1,
    /// Middle mouse button
    Middle = 2,
    /// First side button (back)
    Button4 = 3,
    /// Second side button (forward)
    Button5 = 4,
    /// Extra button 6
    Button6 = 5,
    /// Extra button 7
    Button7 = 6,
    /// Extra button 8
    Button8 = 7,
}

impl MouseButton {
    /// Every button, in index order
    pub const ALL: [Self; MOUSE_BUTTON_COUNT] = [
        Self::Left,
        Self::Right,
        Self::Middle,
        Self::Button4,
        Self::Button5,
        Self::Button6,
        Self::Button7,
        Self::Button8,
    ];

    /// Map a raw button index, `None` outside `0..=7`
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Index of this button in `0..=7`
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Button state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    /// Button is up
    #[default]
    Release,
    /// Button went down
    Press,
    /// Button is held and auto-repeating
    Repeat,
}

bitflags! {
    /// Modifier keys held when an input event was delivered
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Either shift key
        const SHIFT = 0x01;
        /// Either control key
        const CONTROL = 0x02;
        /// Either alt key
        const ALT = 0x04;
        /// Either super (Windows/command) key
        const SUPER = 0x08;
    }
}

/// Semantic event produced by the event pump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The user asked to close the window
    Closed,
    /// The client area changed size
    Resized {
        /// New client width in pixels
        width: i32,
        /// New client height in pixels
        height: i32,
    },
    /// A mouse button changed state
    MouseButton {
        /// Button that changed
        button: MouseButton,
        /// New state
        action: Action,
        /// Modifier keys held at delivery time
        mods: Modifiers,
    },
}
