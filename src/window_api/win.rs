use anyhow::Result;
use tracing::{debug, instrument};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW};

use super::{ActiveWindowData, WindowManager};

#[instrument]
pub fn get_active() -> Option<ActiveWindowData> {
    let window = unsafe { GetForegroundWindow() };

    // Happens while focus is being switched or when the desktop itself is focused.
    if window.is_invalid() {
        return None;
    }

    let mut text: [u16; 4096] = [0; 4096];
    let len = unsafe { GetWindowTextW(window, &mut text) };
    let title = String::from_utf16_lossy(&text[..len.max(0) as usize]);

    Some(ActiveWindowData::new(title))
}

pub struct WindowsWindowManager {}

impl WindowsWindowManager {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsWindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager for WindowsWindowManager {
    fn get_active_window_data(&mut self) -> Result<Option<ActiveWindowData>> {
        let active = get_active();
        if active.is_none() {
            debug!("No foreground window");
        }
        Ok(active)
    }
}
