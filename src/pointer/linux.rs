//! Pointer access on Linux using the X11 core protocol.

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use super::{Pointer, PointerError, Position};

/// Pointer on the default X11 screen.
pub struct PlatformPointer {
    conn: RustConnection,
    root: Window,
    width: u16,
    height: u16,
}

impl PlatformPointer {
    /// Connect to the display named by `DISPLAY`.
    pub fn new() -> Result<Self, PointerError> {
        let (conn, screen_num) = RustConnection::connect(None).map_err(|e| {
            PointerError::Unavailable(format!("cannot connect to X11 display ({e}). Is DISPLAY set?"))
        })?;

        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| PointerError::Unavailable(format!("X11 screen {screen_num} not found")))?;
        let (root, width, height) = (screen.root, screen.width_in_pixels, screen.height_in_pixels);

        Ok(Self {
            conn,
            root,
            width,
            height,
        })
    }
}

impl Pointer for PlatformPointer {
    fn position(&self) -> Result<Position, PointerError> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .map_err(|e| PointerError::Query(e.to_string()))?
            .reply()
            .map_err(|e| PointerError::Query(e.to_string()))?;

        Ok(Position::new(reply.root_x.into(), reply.root_y.into()))
    }

    fn move_to(&mut self, to: Position) -> Result<(), PointerError> {
        let x = to.x.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        let y = to.y.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, x, y)
            .map_err(|e| PointerError::Move(e.to_string()))?
            .check()
            .map_err(|e| PointerError::Move(e.to_string()))
    }

    fn screen_size(&self) -> Result<(u32, u32), PointerError> {
        Ok((self.width as u32, self.height as u32))
    }
}
