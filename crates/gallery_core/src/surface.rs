//! Owner registry for the single shared video surface.
//!
//! Only one video decoder exists for the whole gallery; its output is bound to
//! at most one tile at a time. Acquiring for a new tile revokes it from the
//! previous holder (last writer wins, never an error).

use sphere_layout::TileId;

#[derive(Debug, Default)]
pub struct SharedVideoSurface {
    holder: Option<TileId>,
    handoffs: u64,
}

impl SharedVideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn holder(&self) -> Option<TileId> {
        self.holder
    }

    #[inline]
    pub fn is_held_by(&self, tile: TileId) -> bool {
        self.holder == Some(tile)
    }

    /// Binds the surface to `tile`; returns the tile it was revoked from, if any.
    pub fn acquire(&mut self, tile: TileId) -> Option<TileId> {
        self.handoffs += 1;
        self.holder.replace(tile).filter(|&prev| prev != tile)
    }

    /// Releases the surface if `tile` holds it.
    pub fn release(&mut self, tile: TileId) -> bool {
        if self.is_held_by(tile) {
            self.holder = None;
            true
        } else {
            false
        }
    }

    pub fn release_any(&mut self) -> Option<TileId> {
        self.holder.take()
    }

    /// Number of `acquire` calls so far.
    pub fn handoffs(&self) -> u64 {
        self.handoffs
    }
}
