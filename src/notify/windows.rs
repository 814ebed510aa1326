//! Notifications on Windows using MessageBeep / Beep Win32 APIs.

use tracing::debug;
use windows::Win32::System::Diagnostics::Debug::Beep;
use windows::Win32::UI::WindowsAndMessaging::{MessageBeep, MB_ICONEXCLAMATION};

use super::{ring_terminal_bell, Notifier, NotifyError};

/// System exclamation sound, then a 1 kHz speaker beep, then the terminal bell.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformNotifier;

impl PlatformNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for PlatformNotifier {
    fn play_notification(&self) -> Result<(), NotifyError> {
        // SAFETY: both calls take plain values and touch no caller memory.
        let played = unsafe { MessageBeep(MB_ICONEXCLAMATION) }
            .or_else(|e| {
                debug!("MessageBeep failed: {}", e);
                unsafe { Beep(1000, 500) }
            });

        match played {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Beep failed: {}", e);
                ring_terminal_bell()
            }
        }
    }
}
