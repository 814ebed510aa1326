//! Pointer access and synthetic movement with platform-specific implementations.

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod windows;

use std::f64::consts::TAU;
use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::alarm::Clock;

#[cfg(target_os = "macos")]
pub use macos::PlatformPointer;
#[cfg(target_os = "linux")]
pub use linux::PlatformPointer;
#[cfg(target_os = "windows")]
pub use windows::PlatformPointer;

/// Pause between intermediate positions of a glide.
const GLIDE_STEP: Duration = Duration::from_millis(10);

/// Pixels per second of glide, before clamping.
const GLIDE_SPEED: f64 = 200.0;

/// Pointer position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels.
    pub fn distance_to(&self, other: Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }

    fn lerp(&self, to: Position, t: f64) -> Position {
        let x = self.x + ((to.x - self.x) as f64 * t).round() as i32;
        let y = self.y + ((to.y - self.y) as f64 * t).round() as i32;
        Position { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Error)]
pub enum PointerError {
    #[error("pointer backend unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read pointer position: {0}")]
    Query(String),
    #[error("failed to move pointer: {0}")]
    Move(String),
}

/// Read and drive the system pointer.
pub trait Pointer {
    fn position(&self) -> Result<Position, PointerError>;
    fn move_to(&mut self, to: Position) -> Result<(), PointerError>;
    /// Size of the main screen in pixels.
    fn screen_size(&self) -> Result<(u32, u32), PointerError>;
}

/// How synthetic moves are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveSettings {
    pub min_distance: u32,
    pub max_distance: u32,
    /// Targets keep at least this far from every screen edge.
    pub margin: u32,
    /// Interpolate the path instead of jumping.
    pub smooth: bool,
}

/// Pick a point at a random angle and distance from `current`, kept inside
/// the screen margins.
pub fn random_target<R: Rng + ?Sized>(
    current: Position,
    screen: (u32, u32),
    settings: &MoveSettings,
    rng: &mut R,
) -> Position {
    let angle = rng.gen_range(0.0..TAU);
    let (min, max) = (settings.min_distance as f64, settings.max_distance as f64);
    let distance = if max > min { rng.gen_range(min..=max) } else { min };

    let x = (current.x as f64 + distance * angle.cos()) as i32;
    let y = (current.y as f64 + distance * angle.sin()) as i32;

    Position {
        x: clamp_axis(x, screen.0, settings.margin),
        y: clamp_axis(y, screen.1, settings.margin),
    }
}

fn clamp_axis(value: i32, size: u32, margin: u32) -> i32 {
    let low = margin as i32;
    let high = (size as i32 - margin as i32).max(low);
    value.clamp(low, high)
}

/// Time to spend gliding over `distance` pixels: between 0.5s and 2s.
pub fn glide_duration(distance: f64) -> Duration {
    Duration::from_secs_f64((distance / GLIDE_SPEED).clamp(0.5, 2.0))
}

/// Move along a straight line from `from` to `to` over `duration`, ending
/// exactly on `to`.
pub fn glide<P, C>(
    pointer: &mut P,
    from: Position,
    to: Position,
    duration: Duration,
    clock: &C,
) -> Result<(), PointerError>
where
    P: Pointer + ?Sized,
    C: Clock + ?Sized,
{
    let steps = (duration.as_millis() / GLIDE_STEP.as_millis()).max(1) as u32;
    let pause = duration / steps;

    for step in 1..=steps {
        let t = step as f64 / steps as f64;
        pointer.move_to(from.lerp(to, t))?;
        if step < steps {
            clock.sleep(pause);
        }
    }
    Ok(())
}

/// Move to a random target, gliding when `settings.smooth` is set. Returns
/// the target.
pub fn nudge<P, R, C>(
    pointer: &mut P,
    from: Position,
    settings: &MoveSettings,
    rng: &mut R,
    clock: &C,
) -> Result<Position, PointerError>
where
    P: Pointer + ?Sized,
    R: Rng + ?Sized,
    C: Clock + ?Sized,
{
    let screen = pointer.screen_size()?;
    let target = random_target(from, screen, settings, rng);

    if settings.smooth {
        let duration = glide_duration(from.distance_to(target));
        glide(pointer, from, target, duration, clock)?;
    } else {
        pointer.move_to(target)?;
    }
    Ok(target)
}
