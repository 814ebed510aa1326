//! Pointer access on Windows using the cursor Win32 APIs.

use windows::Win32::Foundation::POINT;
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SetCursorPos, SM_CXSCREEN, SM_CYSCREEN,
};

use super::{Pointer, PointerError, Position};

/// Cursor on the primary monitor.
pub struct PlatformPointer;

impl PlatformPointer {
    pub fn new() -> Result<Self, PointerError> {
        Ok(Self)
    }
}

impl Pointer for PlatformPointer {
    fn position(&self) -> Result<Position, PointerError> {
        let mut point = POINT::default();
        // SAFETY: `point` is a valid, writable POINT for the duration of the call.
        unsafe { GetCursorPos(&mut point) }.map_err(|e| PointerError::Query(e.to_string()))?;
        Ok(Position::new(point.x, point.y))
    }

    fn move_to(&mut self, to: Position) -> Result<(), PointerError> {
        // SAFETY: SetCursorPos takes plain integers and touches no caller memory.
        unsafe { SetCursorPos(to.x, to.y) }.map_err(|e| PointerError::Move(e.to_string()))
    }

    fn screen_size(&self) -> Result<(u32, u32), PointerError> {
        // SAFETY: GetSystemMetrics only reads system state for a valid index.
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        Ok((width.max(0) as u32, height.max(0) as u32))
    }
}
