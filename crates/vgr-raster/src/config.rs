//! Fixed pipeline geometry and the read-only `Config` buffer.

use bytemuck::{Pod, Zeroable};

/// Width of a square tile, in pixels.
pub const TILE_WIDTH: u32 = 16;
/// Tile height, in pixels (tiles are square).
pub const TILE_HEIGHT: u32 = TILE_WIDTH;
/// Bin width, in tiles.
pub const N_TILE_X: u32 = 16;
/// Bin height, in tiles.
pub const N_TILE_Y: u32 = 16;
/// Tiles per bin (`N_TILE_X * N_TILE_Y`); also the coarse workgroup size and
/// the streaming window size.
pub const N_TILE: u32 = N_TILE_X * N_TILE_Y;
/// Coarse-stage workgroup size: one lane per tile in a bin.
pub const WG_SIZE: u32 = N_TILE;
/// `WG_SIZE / 32`: number of 32-bit bitmap slices covering one window.
pub const N_SLICE: u32 = WG_SIZE / 32;
/// Horizontal pixels handled by one fine-stage lane.
pub const PIXELS_PER_THREAD: u32 = 4;
/// Fine-stage workgroup lane grid: 4 lanes wide, 16 tall.
pub const FINE_WG_X: u32 = 4;
/// Fine-stage workgroup lane grid height.
pub const FINE_WG_Y: u32 = 16;

/// Initial per-tile PTCL allocation, in words.
pub const PTCL_INITIAL_ALLOC: u32 = 64;
/// Size of a bump-allocated PTCL block, in words.
pub const PTCL_INCREMENT: u32 = 256;
/// Words reserved at the end of every block for a terminating jump.
pub const PTCL_HEADROOM: u32 = 2;

/// Read-only pipeline configuration, uploaded once per dispatch.
///
/// Byte-identical to the `Config` struct a coarse/fine WGSL shader binds as
/// a uniform buffer (see [`crate::shaders::COARSE`]).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Config {
    /// Framebuffer width, in tiles.
    pub width_in_tiles: u32,
    /// Framebuffer height, in tiles.
    pub height_in_tiles: u32,
    /// Number of draw objects in the scene.
    pub n_drawobj: u32,
    /// Base word offset into `scene` where draw tags start.
    pub drawtag_base: u32,
    /// Base word offset into `scene` where draw data starts.
    pub drawdata_base: u32,
}

impl Config {
    /// Width of the framebuffer, in bins (`ceil(width_in_tiles / N_TILE_X)`).
    pub fn width_in_bins(&self) -> u32 {
        self.width_in_tiles.div_ceil(N_TILE_X)
    }

    /// Height of the framebuffer, in bins (`ceil(height_in_tiles / N_TILE_Y)`).
    pub fn height_in_bins(&self) -> u32 {
        self.height_in_tiles.div_ceil(N_TILE_Y)
    }

    /// Total number of tiles in the framebuffer.
    pub fn n_tiles(&self) -> u32 {
        self.width_in_tiles * self.height_in_tiles
    }

    /// Word offset where the bump-allocated PTCL region begins.
    pub fn ptcl_static_end(&self) -> u32 {
        self.n_tiles() * PTCL_INITIAL_ALLOC
    }

    /// Framebuffer width in pixels.
    pub fn width_px(&self) -> u32 {
        self.width_in_tiles * TILE_WIDTH
    }

    /// Framebuffer height in pixels.
    pub fn height_px(&self) -> u32 {
        self.height_in_tiles * TILE_HEIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_rounding() {
        let cfg = Config {
            width_in_tiles: 17,
            height_in_tiles: 16,
            ..Default::default()
        };
        assert_eq!(cfg.width_in_bins(), 2);
        assert_eq!(cfg.height_in_bins(), 1);
    }

    #[test]
    fn static_end_matches_tile_count() {
        let cfg = Config {
            width_in_tiles: 2,
            height_in_tiles: 3,
            ..Default::default()
        };
        assert_eq!(cfg.ptcl_static_end(), 6 * PTCL_INITIAL_ALLOC);
    }
}
