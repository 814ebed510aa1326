//! Audible notifications with platform-specific implementations.

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod windows;

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

#[cfg(target_os = "macos")]
pub use macos::PlatformNotifier;
#[cfg(target_os = "linux")]
pub use linux::PlatformNotifier;
#[cfg(target_os = "windows")]
pub use windows::PlatformNotifier;

/// How long a sound player may run before it is killed.
const SOUND_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a sound could not be produced.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("terminal bell unavailable: {0}")]
    Bell(#[source] std::io::Error),
}

/// Something that can produce a short audible cue.
pub trait Notifier {
    /// Play one cue. Best effort: fallbacks are the implementation's concern.
    fn play_notification(&self) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn play_notification(&self) -> Result<(), NotifyError> {
        (**self).play_notification()
    }
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn play_notification(&self) -> Result<(), NotifyError> {
        (**self).play_notification()
    }
}

/// Notifier used when sound is muted. Logs instead of playing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn play_notification(&self) -> Result<(), NotifyError> {
        info!("(muted) notification");
        Ok(())
    }
}

/// Pick the notifier for this run.
pub fn select(mute: bool) -> Box<dyn Notifier + Send> {
    if mute {
        Box::new(SilentNotifier)
    } else {
        Box::new(PlatformNotifier::new())
    }
}

/// Run a sound player to completion, discarding its output.
#[cfg_attr(target_os = "windows", allow(dead_code))]
pub(crate) fn run_sound_command(program: &str, args: &[&str]) -> Result<(), NotifyError> {
    run_with_timeout(program, args, SOUND_COMMAND_TIMEOUT)
}

fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<(), NotifyError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| NotifyError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let started = Instant::now();
    loop {
        let exited = child.try_wait().map_err(|source| NotifyError::Spawn {
            program: program.to_string(),
            source,
        })?;

        match exited {
            Some(status) if status.success() => return Ok(()),
            Some(status) => {
                return Err(NotifyError::Failed {
                    program: program.to_string(),
                    status: status.to_string(),
                })
            }
            None if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(NotifyError::TimedOut {
                    program: program.to_string(),
                    timeout,
                });
            }
            None => std::thread::sleep(Duration::from_millis(20)),
        }
    }
}

/// Try each sound player in order, then fall back to the terminal bell.
#[cfg_attr(target_os = "windows", allow(dead_code))]
pub(crate) fn play_first_available(players: &[(&str, &[&str])]) -> Result<(), NotifyError> {
    for (program, args) in players {
        match run_sound_command(program, args) {
            Ok(()) => return Ok(()),
            Err(e) => debug!("Sound player unavailable: {}", e),
        }
    }
    ring_terminal_bell()
}

/// Last resort: ASCII BEL on stdout.
pub(crate) fn ring_terminal_bell() -> Result<(), NotifyError> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(b"\x07").map_err(NotifyError::Bell)?;
    stdout.flush().map_err(NotifyError::Bell)
}

#[cfg(test)]
pub mod testing {
    use super::{Notifier, NotifyError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Counts notifications and fails on chosen (1-based) calls.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        plays: AtomicU32,
        fail_on: Vec<u32>,
        fail_all: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_all: true,
                ..Default::default()
            })
        }

        pub fn failing_on(calls: &[u32]) -> Arc<Self> {
            Arc::new(Self {
                fail_on: calls.to_vec(),
                ..Default::default()
            })
        }

        pub fn plays(&self) -> u32 {
            self.plays.load(Ordering::SeqCst)
        }
    }

    impl Notifier for RecordingNotifier {
        fn play_notification(&self) -> Result<(), NotifyError> {
            let call = self.plays.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_all || self.fail_on.contains(&call) {
                return Err(NotifyError::Failed {
                    program: "test-player".to_string(),
                    status: "no audio device".to_string(),
                });
            }
            Ok(())
        }
    }
}
