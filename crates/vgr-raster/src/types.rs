//! GPU-layout data types shared by the upstream binner/tiler and this crate.
//!
//! All types are `#[repr(C)]` + `bytemuck::{Pod, Zeroable}`, the same
//! convention `DimsUniform`/`CdlUniform`-style GPU uniform structs use for
//! types that round-trip through a `wgpu` storage or uniform buffer
//! unchanged.

use bytemuck::{Pod, Zeroable};

/// Per-draw-object monoid: identifies the path and the auxiliary data for a
/// draw object.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawMonoid {
    /// Index of the path this draw object renders.
    pub path_ix: u32,
    /// Word offset into `scene` (relative to `config.drawdata_base`) where
    /// this draw object's auxiliary data (color, linewidth, ...) lives.
    pub scene_offset: u32,
    /// Word offset into `info` for this draw object's extra per-draw data.
    pub info_offset: u32,
    /// Padding so `array<DrawMonoid>` strides on 16-byte boundaries.
    pub _pad: u32,
}

/// Per-(partition, bin) header written by the upstream binning pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BinHeader {
    /// Number of draw-object refs this partition contributes to this bin.
    pub element_count: u32,
    /// Offset into `bin_data` where this partition's refs for this bin start.
    pub chunk_offset: u32,
}

/// Per-path bounding box and tile-grid base, in tile coordinates.
///
/// Named `PathRec` rather than `Path` to avoid colliding with
/// `std::path::Path`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PathRec {
    /// Bounding box `[x0, y0, x1, y1]` in tile coordinates. `x0 <= x1`, `y0 <= y1`.
    pub bbox: [i32; 4],
    /// Base index into the global tile grid for this path's own tile rectangle.
    pub tiles: u32,
    /// Padding to keep the struct 16-byte aligned for storage-buffer arrays.
    pub _pad: [u32; 3],
}

impl PathRec {
    /// Row stride of this path's own tile rectangle (`x1 - x0`).
    pub fn stride(&self) -> i32 {
        self.bbox[2] - self.bbox[0]
    }
}

/// Per-tile segment-list head and backdrop winding number.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TileRec {
    /// Signed winding number at the left edge of the tile.
    pub backdrop: i32,
    /// Index into the segment list for this tile; `0` means no segments.
    pub segments: u32,
}

impl TileRec {
    /// A tile is empty iff it has no segments and a zero backdrop.
    pub fn is_empty(&self) -> bool {
        self.segments == 0 && self.backdrop == 0
    }
}

/// A line segment clipped to a single tile.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Segment {
    /// Segment start point, in pixel coordinates.
    pub origin: [f32; 2],
    /// Segment vector (end - origin), in pixel coordinates.
    pub delta: [f32; 2],
    /// Extra edge contribution for half-open verticals.
    pub y_edge: f32,
    /// Index of the next segment in this tile's intrusive list; `0` terminates.
    pub next: u32,
}

/// Process-wide bump allocator state for the PTCL buffer.
///
/// `ptcl` is advanced with an atomic fetch-add by the coarse stage; `failed`
/// is set once the dynamic region would overflow the caller's buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BumpAllocators {
    /// Next free word offset within the dynamic PTCL region.
    pub ptcl: u32,
    /// Nonzero once an `alloc_cmd` grant would have overflowed the buffer.
    pub failed: u32,
}

/// Runtime, host-side counterpart of [`BumpAllocators`] used by the CPU
/// simulation: the wire-format struct above is `Pod` for upload/download,
/// but the atomic fetch-add every lane races on needs `AtomicU32` cells,
/// which are not `Pod`. One `BumpCell` is shared by every lane/bin
/// processed in a dispatch, exactly like the single global
/// `BumpAllocators` buffer the real shaders bind.
#[derive(Debug, Default)]
pub struct BumpCell {
    /// Next free word offset within the dynamic PTCL region.
    pub ptcl: std::sync::atomic::AtomicU32,
    /// Nonzero once an `alloc_cmd` grant would have overflowed the buffer.
    pub failed: std::sync::atomic::AtomicU32,
}

impl BumpCell {
    /// A fresh cell with both counters at zero, as required before coarse
    /// dispatch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot into the wire-format struct, e.g. for host-side inspection.
    pub fn load(&self, order: std::sync::atomic::Ordering) -> BumpAllocators {
        BumpAllocators {
            ptcl: self.ptcl.load(order),
            failed: self.failed.load(order),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_rec_stride() {
        let p = PathRec {
            bbox: [2, 3, 10, 8],
            tiles: 0,
            _pad: [0; 3],
        };
        assert_eq!(p.stride(), 8);
    }

    #[test]
    fn tile_rec_empty() {
        assert!(TileRec { backdrop: 0, segments: 0 }.is_empty());
        assert!(!TileRec { backdrop: 1, segments: 0 }.is_empty());
        assert!(!TileRec { backdrop: 0, segments: 5 }.is_empty());
    }
}
