//! Pointer access on macOS using CoreGraphics events.

use core_graphics::display::CGDisplay;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;

use super::{Pointer, PointerError, Position};

/// Pointer on the main display. Moves are posted as HID mouse-moved events
/// so the system counts them as input.
pub struct PlatformPointer;

impl PlatformPointer {
    pub fn new() -> Result<Self, PointerError> {
        event_source()?;
        Ok(Self)
    }
}

fn event_source() -> Result<CGEventSource, PointerError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|_| {
        PointerError::Unavailable(
            "cannot create CoreGraphics event source (is Accessibility access granted?)".to_string(),
        )
    })
}

impl Pointer for PlatformPointer {
    fn position(&self) -> Result<Position, PointerError> {
        let event = CGEvent::new(event_source()?)
            .map_err(|_| PointerError::Query("cannot create CGEvent".to_string()))?;
        let location = event.location();
        Ok(Position::new(location.x.round() as i32, location.y.round() as i32))
    }

    fn move_to(&mut self, to: Position) -> Result<(), PointerError> {
        let event = CGEvent::new_mouse_event(
            event_source()?,
            CGEventType::MouseMoved,
            CGPoint::new(to.x as f64, to.y as f64),
            CGMouseButton::Left,
        )
        .map_err(|_| PointerError::Move("cannot create mouse-moved event".to_string()))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn screen_size(&self) -> Result<(u32, u32), PointerError> {
        let display = CGDisplay::main();
        Ok((display.pixels_wide() as u32, display.pixels_high() as u32))
    }
}
