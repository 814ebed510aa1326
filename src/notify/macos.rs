//! Notifications on macOS using the bundled system sounds.

use super::{play_first_available, Notifier, NotifyError};

const PLAYERS: &[(&str, &[&str])] = &[
    ("afplay", &["/System/Library/Sounds/Glass.aiff"]),
    ("say", &["-v", "Samantha", "beep"]),
];

/// `afplay` with the Glass system sound, then `say`, then the terminal bell.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformNotifier;

impl PlatformNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for PlatformNotifier {
    fn play_notification(&self) -> Result<(), NotifyError> {
        play_first_available(PLAYERS)
    }
}
