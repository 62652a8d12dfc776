//! Builds the hard-coded scene `vgr demo` renders.
//!
//! Grounded on `vgr_raster::coarse`'s own unit-test fixtures
//! (`single_tile_solid_fill`): a real upstream binner/tiler would populate
//! these buffers, but this crate's scope stops at the coarse/fine kernels,
//! so the demo scene is assembled by hand the same way the tests do.

use vgr_core::Result;
use vgr_raster::coarse::DRAWTAG_FILL_COLOR;
use vgr_raster::config::Config;
use vgr_raster::types::{BinHeader, DrawMonoid, PathRec, Segment, TileRec};
use vgr_raster::SceneView;

/// An owned scene: every buffer [`SceneView`] borrows, plus the `ptcl`
/// backing store sized to match `config`.
pub struct DemoScene {
    pub config: Config,
    pub scene: Vec<u32>,
    pub draw_monoids: Vec<DrawMonoid>,
    pub bin_headers: Vec<BinHeader>,
    pub bin_data: Vec<u32>,
    pub paths: Vec<PathRec>,
    pub tiles: Vec<TileRec>,
    pub segments: Vec<Segment>,
    pub info: Vec<u32>,
}

impl DemoScene {
    pub fn view(&self) -> SceneView<'_> {
        SceneView {
            config: self.config,
            scene: &self.scene,
            draw_monoids: &self.draw_monoids,
            bin_headers: &self.bin_headers,
            bin_data: &self.bin_data,
            paths: &self.paths,
            tiles: &self.tiles,
            segments: &self.segments,
            info: &self.info,
        }
    }
}

/// Two draw objects on a 4x4-tile (64x64px) framebuffer: an opaque red
/// solid-fill square over tiles `(0,0)..(2,2)`, and a translucent blue
/// diagonal stroke across the single tile at `(2,2)`.
pub fn build() -> Result<DemoScene> {
    let config = Config {
        width_in_tiles: 4,
        height_in_tiles: 4,
        n_drawobj: 2,
        drawtag_base: 0,
        drawdata_base: 2,
    };

    // scene = [drawtag(0), drawtag(1), drawdata(0), drawdata(1)]
    let scene = vec![
        DRAWTAG_FILL_COLOR,
        DRAWTAG_FILL_COLOR,
        0xFF0000FF, // opaque red, packed 0xAABBGGRR
        0x800000FF, // half-alpha blue
    ];

    let draw_monoids = vec![
        DrawMonoid { path_ix: 0, scene_offset: 0, info_offset: 0, _pad: 0 },
        DrawMonoid { path_ix: 1, scene_offset: 1, info_offset: 1, _pad: 0 },
    ];

    // info[0]: fill (negative linewidth). info[1]: stroke, linewidth 2.0.
    let info = vec![(-1.0f32).to_bits(), (2.0f32).to_bits()];

    // Path 0: solid fill over the 2x2 tile block at tile-space (0,0)..(2,2),
    // owning tiles[0..4] of the global tile grid.
    let path0 = PathRec { bbox: [0, 0, 2, 2], tiles: 0, _pad: [0; 3] };
    // Path 1: stroke over the single tile at (2,2)..(3,3), owning tiles[4].
    let path1 = PathRec { bbox: [2, 2, 3, 3], tiles: 4, _pad: [0; 3] };
    let paths = vec![path0, path1];

    // tiles[0..4]: path 0's fully-covered block, no segments needed.
    let mut tiles = vec![TileRec { backdrop: 1, segments: 0 }; 4];
    // tiles[4]: path 1's tile, referencing segment 1 (index 0 means "none").
    tiles.push(TileRec { backdrop: 0, segments: 1 });

    // segments[0] is the unused "no segment" sentinel; segments[1] is the
    // tile-local diagonal from (0, 0) to (16, 16).
    let segments = vec![
        Segment::default(),
        Segment { origin: [0.0, 0.0], delta: [16.0, 16.0], y_edge: 0.0, next: 0 },
    ];

    // One partition, one bin, both draw objects land in it.
    let bin_headers = vec![BinHeader { element_count: 2, chunk_offset: 0 }];
    let bin_data = vec![0u32, 1u32];

    Ok(DemoScene { config, scene, draw_monoids, bin_headers, bin_data, paths, tiles, segments, info })
}
