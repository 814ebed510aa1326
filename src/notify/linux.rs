//! Notifications on Linux through the ALSA / PulseAudio command-line players.

use super::{play_first_available, Notifier, NotifyError};

const PLAYERS: &[(&str, &[&str])] = &[
    ("aplay", &["/usr/share/sounds/alsa/Front_Left.wav"]),
    (
        "paplay",
        &["/usr/share/sounds/freedesktop/stereo/message.oga"],
    ),
    ("beep", &[]),
];

/// Plays the first sound player that works, then falls back to the bell.
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
