//! Read-only view over the buffers the coarse stage consumes.
//!
//! Bundles the nine input buffers (`config, scene, draw_monoids,
//! bin_headers, bin_data, paths, tiles, segments, info`) into one borrowed
//! struct so kernel functions take one argument instead of threading eight
//! slices through every call.

use vgr_core::{Error, Result};

use crate::config::Config;
use crate::types::{BinHeader, DrawMonoid, PathRec, Segment, TileRec};

/// Borrowed view over all coarse-stage input buffers.
#[derive(Clone, Copy)]
pub struct SceneView<'a> {
    /// Pipeline configuration.
    pub config: Config,
    /// Opaque word-addressed scene stream (draw tags + draw data).
    pub scene: &'a [u32],
    /// Per-draw-object monoid, indexed by `drawobj_ix`.
    pub draw_monoids: &'a [DrawMonoid],
    /// Per-(partition, bin) headers, laid out `[partition][bin]`.
    pub bin_headers: &'a [BinHeader],
    /// Concatenated per-partition draw-object refs.
    pub bin_data: &'a [u32],
    /// Per-path bounding boxes and tile-grid bases.
    pub paths: &'a [PathRec],
    /// Global tile grid (backdrop + segment-list head per tile).
    pub tiles: &'a [TileRec],
    /// Segment pool, indexed by `TileRec::segments` / `Segment::next`.
    pub segments: &'a [Segment],
    /// Auxiliary per-draw info words (e.g. line width).
    pub info: &'a [u32],
}

impl<'a> SceneView<'a> {
    /// Number of (partition, bin) header rows per bin column, i.e. the
    /// number of partitions covering the whole scene.
    pub fn n_partitions(&self) -> usize {
        if self.bin_headers.is_empty() {
            0
        } else {
            self.bin_headers.len() / crate::config::N_TILE as usize
        }
    }

    /// Draw tag for `drawobj_ix`, or `DRAWTAG_NOP` if out of range.
    pub fn drawtag(&self, drawobj_ix: u32) -> u32 {
        let ix = (self.config.drawtag_base + drawobj_ix) as usize;
        self.scene.get(ix).copied().unwrap_or(crate::coarse::DRAWTAG_NOP)
    }

    /// Fetch the `BinHeader` for `(partition, bin_ix)`.
    pub fn bin_header(&self, partition: u32, bin_ix: u32) -> Result<BinHeader> {
        let ix = (partition * crate::config::N_TILE + bin_ix) as usize;
        self.bin_headers.get(ix).copied().ok_or(Error::BufferTooShort {
            name: "bin_headers",
            needed: ix,
            len: self.bin_headers.len(),
        })
    }

    /// Fetch a `bin_data` entry (a draw-object index).
    pub fn bin_data_at(&self, ix: u32) -> Result<u32> {
        self.bin_data.get(ix as usize).copied().ok_or(Error::BufferTooShort {
            name: "bin_data",
            needed: ix as usize,
            len: self.bin_data.len(),
        })
    }

    /// Fetch the path record for `path_ix`.
    pub fn path(&self, path_ix: u32) -> Result<PathRec> {
        self.paths.get(path_ix as usize).copied().ok_or(Error::BufferTooShort {
            name: "paths",
            needed: path_ix as usize,
            len: self.paths.len(),
        })
    }

    /// Fetch the tile record at global tile index `tile_ix`.
    pub fn tile(&self, tile_ix: u32) -> Result<TileRec> {
        self.tiles.get(tile_ix as usize).copied().ok_or(Error::BufferTooShort {
            name: "tiles",
            needed: tile_ix as usize,
            len: self.tiles.len(),
        })
    }

    /// Fetch the segment at `seg_ix` (1-based; callers never dereference
    /// index `0`, which means "no segment").
    pub fn segment(&self, seg_ix: u32) -> Result<Segment> {
        self.segments.get(seg_ix as usize).copied().ok_or(Error::BufferTooShort {
            name: "segments",
            needed: seg_ix as usize,
            len: self.segments.len(),
        })
    }

    /// Fetch the draw monoid for `drawobj_ix`.
    pub fn draw_monoid(&self, drawobj_ix: u32) -> Result<DrawMonoid> {
        self.draw_monoids
            .get(drawobj_ix as usize)
            .copied()
            .ok_or(Error::BufferTooShort {
                name: "draw_monoids",
                needed: drawobj_ix as usize,
                len: self.draw_monoids.len(),
            })
    }

    /// Fetch a draw object's auxiliary data word from `scene`, at
    /// `config.drawdata_base + scene_offset`.
    pub fn drawdata(&self, scene_offset: u32) -> Result<u32> {
        let ix = (self.config.drawdata_base + scene_offset) as usize;
        self.scene.get(ix).copied().ok_or(Error::BufferTooShort {
            name: "scene",
            needed: ix,
            len: self.scene.len(),
        })
    }

    /// Fetch an `info` word (e.g. a line width, bitcast from `u32`).
    pub fn info_word(&self, info_offset: u32) -> Result<u32> {
        self.info.get(info_offset as usize).copied().ok_or(Error::BufferTooShort {
            name: "info",
            needed: info_offset as usize,
            len: self.info.len(),
        })
    }
}
