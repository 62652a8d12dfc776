//! CPU simulation of the coarse rasterizer kernel.
//!
//! One workgroup per bin, `WG_SIZE` lanes per workgroup. This module runs
//! every lane of every bin sequentially instead of in lockstep, which is
//! observably identical as long as the per-phase data dependencies (refill →
//! fan-out → bitmap scatter → emission) are respected in order — exactly the
//! ordering a `workgroupBarrier()` enforces on the real device. See
//! [`crate::shaders::COARSE`] for the WGSL transcription that runs those
//! phases in actual lockstep across lanes.

use vgr_core::Result;

use crate::config::{N_SLICE, N_TILE, N_TILE_X, N_TILE_Y, WG_SIZE};
use crate::ptcl::PtclWriter;
use crate::scene::SceneView;
use crate::types::BumpCell;

/// Draw tag for an absent/past-the-window draw object.
pub const DRAWTAG_NOP: u32 = 0;
/// The only draw tag this pipeline implements: a solid-color fill or stroke,
/// distinguished downstream by the sign of its line width.
pub const DRAWTAG_FILL_COLOR: u32 = 0x44;

const N: usize = WG_SIZE as usize;

/// Workgroup-shared scratchpad for one bin's coarse processing.
///
/// Mirrors the `var<workgroup>` arrays of the WGSL source. Persists across
/// the whole bin (not reset between windows): `bitmaps` is explicitly
/// zeroed at the top of each window's fan-out pass, and everything else is
/// simply overwritten in the slots the algorithm visits.
struct WorkgroupScratch {
    part_offsets: [u32; N],
    part_count: [u32; N],
    drawobj_ix: [u32; N],
    tile_x0: [i32; N],
    tile_y0: [i32; N],
    tile_width: [i32; N],
    tile_stride: [i32; N],
    tile_base: [i32; N],
    tile_count: [u32; N],
    bitmaps: [[u32; N]; N_SLICE as usize],
}

impl WorkgroupScratch {
    fn new() -> Self {
        Self {
            part_offsets: [0; N],
            part_count: [0; N],
            drawobj_ix: [0; N],
            tile_x0: [0; N],
            tile_y0: [0; N],
            tile_width: [0; N],
            tile_stride: [0; N],
            tile_base: [0; N],
            tile_count: [0; N],
            bitmaps: [[0; N]; N_SLICE as usize],
        }
    }
}

/// Workgroup-wide inclusive (Hillis-Steele) prefix sum, `log2(N)` steps,
/// each reading only the previous step's values (the array snapshot stands
/// in for the `workgroupBarrier()` that separates steps on the real device).
fn hillis_steele_inclusive_scan(data: &mut [u32; N]) {
    let mut step = 1usize;
    while step < N {
        let snapshot = *data;
        for l in step..N {
            data[l] = snapshot[l] + snapshot[l - step];
        }
        step *= 2;
    }
}

/// Find the smallest index `p` such that `counts[p] > needle`, assuming
/// `counts` is non-decreasing and has exactly `N` (a power of two) entries.
/// The ladder of halving steps is a GPU-friendly binary search, used for
/// both the partition lookup (refill) and the draw-object lookup (bitmap
/// scatter).
fn search_sorted(counts: &[u32; N], needle: u32) -> usize {
    let mut ix = 0usize;
    let mut step = N / 2;
    while step >= 1 {
        let candidate = ix + step;
        if candidate < N && counts[candidate] <= needle {
            ix = candidate;
        }
        step /= 2;
    }
    if counts[ix] <= needle { ix + 1 } else { 0 }
}

/// Run the coarse rasterizer over every bin in the scene, writing commands
/// into `ptcl` and advancing `bump`.
pub fn run_coarse_cpu(scene: &SceneView, ptcl: &mut [u32], bump: &BumpCell) -> Result<()> {
    let cfg = scene.config;
    let static_end = cfg.ptcl_static_end();
    let width_in_bins = cfg.width_in_bins();
    let height_in_bins = cfg.height_in_bins();
    let n_partitions = cfg.n_drawobj.div_ceil(N_TILE);

    for by in 0..height_in_bins {
        for bx in 0..width_in_bins {
            process_bin(scene, bx, by, width_in_bins, n_partitions, static_end, ptcl, bump)?;
        }
    }
    Ok(())
}

/// One workgroup's worth of work: process bin `(bx, by)` end to end,
/// including the final `CMD_END` emission for each of its in-bounds tiles.
#[allow(clippy::too_many_arguments)]
fn process_bin(
    scene: &SceneView,
    bx: u32,
    by: u32,
    width_in_bins: u32,
    n_partitions: u32,
    static_end: u32,
    ptcl: &mut [u32],
    bump: &BumpCell,
) -> Result<()> {
    let cfg = scene.config;
    let bin_ix = by * width_in_bins + bx;
    let bin_tile_x = (bx * N_TILE_X) as i32;
    let bin_tile_y = (by * N_TILE_Y) as i32;

    // Lane geometry: lane `l`'s tile role, fixed for the whole bin.
    let mut tile_valid = [false; N];
    let mut writers = [PtclWriter::new(static_end, 0); N];
    for l in 0..N {
        let tx = (l as u32) % N_TILE_X;
        let ty = (l as u32) / N_TILE_X;
        let gx = bx * N_TILE_X + tx;
        let gy = by * N_TILE_Y + ty;
        let valid = gx < cfg.width_in_tiles && gy < cfg.height_in_tiles;
        tile_valid[l] = valid;
        if valid {
            let ix = gy * cfg.width_in_tiles + gx;
            writers[l] = PtclWriter::new(static_end, ix);
        }
    }

    let mut sh = WorkgroupScratch::new();

    let mut partition_ix = 0u32;
    let mut ready_ix = 0u32;
    let mut rd_ix = 0u32;
    let mut wr_ix = 0u32;

    loop {
        refill_window(
            scene,
            bin_ix,
            n_partitions,
            &mut partition_ix,
            &mut ready_ix,
            rd_ix,
            &mut wr_ix,
            &mut sh,
        )?;

        fan_out_and_emit(scene, bin_tile_x, bin_tile_y, rd_ix, wr_ix, &mut sh, &tile_valid, &mut writers, ptcl, bump)?;

        rd_ix += N_TILE;
        if rd_ix >= ready_ix && partition_ix >= n_partitions {
            break;
        }
    }

    for l in 0..N {
        if tile_valid[l] {
            writers[l].write_end(ptcl, bump);
        }
    }
    Ok(())
}

/// Refill sub-loop: bring the window `[rd_ix, wr_ix)` up to `N_TILE` refs,
/// or drain the remaining `bin_data` for this bin if fewer than that
/// remain.
#[allow(clippy::too_many_arguments)]
fn refill_window(
    scene: &SceneView,
    bin_ix: u32,
    n_partitions: u32,
    partition_ix: &mut u32,
    ready_ix: &mut u32,
    rd_ix: u32,
    wr_ix: &mut u32,
    sh: &mut WorkgroupScratch,
) -> Result<()> {
    loop {
        if *wr_ix - rd_ix >= N_TILE {
            break;
        }
        if *ready_ix == *wr_ix && *partition_ix < n_partitions {
            let part_start_ix = *ready_ix;
            let mut element_count = [0u32; N];
            for l in 0..N {
                let p = *partition_ix + l as u32;
                if p < n_partitions {
                    let h = scene.bin_header(p, bin_ix)?;
                    element_count[l] = h.element_count;
                    sh.part_offsets[l] = h.chunk_offset;
                }
            }
            hillis_steele_inclusive_scan(&mut element_count);
            for l in 0..N {
                sh.part_count[l] = part_start_ix + element_count[l];
            }
            *ready_ix = sh.part_count[N - 1];
            *partition_ix += N_TILE;
        } else if *ready_ix == *wr_ix {
            // No new partitions remain and nothing is pending: this bin's
            // draw-object list is exhausted, possibly with a short window.
            break;
        }

        let old_wr_ix = *wr_ix;
        for l in 0..N {
            let idx = rd_ix + l as u32;
            if idx >= old_wr_ix && idx < *ready_ix {
                let p = search_sorted(&sh.part_count, idx);
                let lower = if p == 0 { 0 } else { sh.part_count[p - 1] };
                let local_index = idx - lower;
                sh.drawobj_ix[l] = scene.bin_data_at(sh.part_offsets[p] + local_index)?;
            }
        }
        *wr_ix = (rd_ix + N_TILE).min(*ready_ix);
    }
    Ok(())
}

/// Fan-out, bitmap scatter, and per-tile emission for the window currently
/// held in `sh`.
#[allow(clippy::too_many_arguments)]
fn fan_out_and_emit(
    scene: &SceneView,
    bin_tile_x: i32,
    bin_tile_y: i32,
    rd_ix: u32,
    wr_ix: u32,
    sh: &mut WorkgroupScratch,
    tile_valid: &[bool; N],
    writers: &mut [PtclWriter; N],
    ptcl: &mut [u32],
    bump: &BumpCell,
) -> Result<()> {
    let window_len = wr_ix - rd_ix;

    // Fan-out: lane `l` now means "the l-th draw object in this window".
    for l in 0..N {
        sh.tile_count[l] = 0;
        if (l as u32) >= window_len {
            continue;
        }
        let drawobj_ix = sh.drawobj_ix[l];
        let tag = scene.drawtag(drawobj_ix);
        if tag != DRAWTAG_FILL_COLOR {
            continue;
        }
        let dm = scene.draw_monoid(drawobj_ix)?;
        let path = scene.path(dm.path_ix)?;
        let x0 = (path.bbox[0] - bin_tile_x).clamp(0, N_TILE_X as i32);
        let y0 = (path.bbox[1] - bin_tile_y).clamp(0, N_TILE_Y as i32);
        let x1 = (path.bbox[2] - bin_tile_x).clamp(0, N_TILE_X as i32);
        let y1 = (path.bbox[3] - bin_tile_y).clamp(0, N_TILE_Y as i32);
        let width = x1 - x0;
        let height = y1 - y0;
        let stride = path.stride();
        let dx = path.bbox[0] - bin_tile_x;
        let dy = path.bbox[1] - bin_tile_y;
        let base = path.tiles as i32 - (dy * stride + dx);

        sh.tile_x0[l] = x0;
        sh.tile_y0[l] = y0;
        sh.tile_width[l] = width;
        sh.tile_stride[l] = stride;
        sh.tile_base[l] = base;
        sh.tile_count[l] = (width * height) as u32;
    }

    // Second prefix sum, over tile_count, for the bitmap scatter.
    let mut tile_count_scan = sh.tile_count;
    hillis_steele_inclusive_scan(&mut tile_count_scan);
    let total_tile_count = tile_count_scan[N - 1];

    for slice in sh.bitmaps.iter_mut() {
        *slice = [0; N];
    }

    for ix in 0..total_tile_count {
        let el_ix = search_sorted(&tile_count_scan, ix);
        let lower = if el_ix == 0 { 0 } else { tile_count_scan[el_ix - 1] };
        let seq_ix = ix - lower;
        let width = sh.tile_width[el_ix];
        let x = sh.tile_x0[el_ix] + (seq_ix as i32) % width;
        let y = sh.tile_y0[el_ix] + (seq_ix as i32) / width;
        let tile_ix = (sh.tile_base[el_ix] + sh.tile_stride[el_ix] * y + x) as u32;
        let tile = scene.tile(tile_ix)?;
        if !tile.is_empty() {
            let local_tile_ix = (y * N_TILE_X as i32 + x) as usize;
            sh.bitmaps[el_ix / 32][local_tile_ix] |= 1u32 << (el_ix as u32 & 31);
        }
    }

    // Emission: lane `l` reverts to "tile l".
    for l in 0..N {
        if !tile_valid[l] {
            continue;
        }
        let tx = (l as u32 % N_TILE_X) as i32;
        let ty = (l as u32 / N_TILE_X) as i32;
        for s in 0..N_SLICE as usize {
            let mut bits = sh.bitmaps[s][l];
            while bits != 0 {
                let b = bits.trailing_zeros();
                bits &= bits - 1;
                let el_ix = s * 32 + b as usize;

                let drawobj_ix = sh.drawobj_ix[el_ix];
                let dm = scene.draw_monoid(drawobj_ix)?;
                let tile_ix = (sh.tile_base[el_ix] + sh.tile_stride[el_ix] * ty + tx) as u32;
                let tile = scene.tile(tile_ix)?;
                let linewidth = f32::from_bits(scene.info_word(dm.info_offset)?);
                let rgba = scene.drawdata(dm.scene_offset)?;

                writers[l].write_path(ptcl, bump, tile.segments, tile.backdrop, linewidth);
                writers[l].write_color(ptcl, bump, rgba);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::{BinHeader, DrawMonoid, PathRec, TileRec};

    fn empty_scene_config(width_in_tiles: u32, height_in_tiles: u32) -> Config {
        Config {
            width_in_tiles,
            height_in_tiles,
            n_drawobj: 0,
            drawtag_base: 0,
            drawdata_base: 0,
        }
    }

    #[test]
    fn empty_scene_writes_only_end() {
        let cfg = empty_scene_config(1, 1);
        let mut ptcl = vec![0u32; cfg.ptcl_static_end() as usize];
        let bump = BumpCell::new();
        let scene_words: [u32; 0] = [];
        let view = SceneView {
            config: cfg,
            scene: &scene_words,
            draw_monoids: &[],
            bin_headers: &[],
            bin_data: &[],
            paths: &[],
            tiles: &[TileRec::default()],
            segments: &[],
            info: &[],
        };
        run_coarse_cpu(&view, &mut ptcl, &bump).unwrap();
        let cmds = crate::ptcl::decode_stream(&ptcl, 0, 4);
        assert_eq!(cmds, vec![crate::ptcl::Cmd::End]);
        assert_eq!(bump.load(std::sync::atomic::Ordering::Relaxed).ptcl, 0);
    }

    #[test]
    fn single_tile_solid_fill() {
        // One path, one draw object, covering tile (0,0) with a non-empty
        // tile (so write_path emits CMD_SOLID, not CMD_FILL).
        let cfg = Config {
            width_in_tiles: 1,
            height_in_tiles: 1,
            n_drawobj: 1,
            drawtag_base: 0,
            drawdata_base: 1,
        };
        let scene_words = [DRAWTAG_FILL_COLOR, 0xFF0000FFu32];
        let draw_monoids = [DrawMonoid {
            path_ix: 0,
            scene_offset: 0,
            info_offset: 0,
            _pad: 0,
        }];
        let paths = [PathRec {
            bbox: [0, 0, 1, 1],
            tiles: 0,
            _pad: [0; 3],
        }];
        let tiles = [TileRec {
            backdrop: 1,
            segments: 0,
        }];
        let info = [(-1.0f32).to_bits()];
        let bin_headers = [BinHeader {
            element_count: 1,
            chunk_offset: 0,
        }];
        let bin_data = [0u32];

        let view = SceneView {
            config: cfg,
            scene: &scene_words,
            draw_monoids: &draw_monoids,
            bin_headers: &bin_headers,
            bin_data: &bin_data,
            paths: &paths,
            tiles: &tiles,
            segments: &[],
            info: &info,
        };

        let mut ptcl = vec![0u32; cfg.ptcl_static_end() as usize];
        let bump = BumpCell::new();
        run_coarse_cpu(&view, &mut ptcl, &bump).unwrap();

        let cmds = crate::ptcl::decode_stream(&ptcl, 0, 4);
        assert_eq!(
            cmds,
            vec![crate::ptcl::Cmd::Solid, crate::ptcl::Cmd::Color(0xFF0000FF), crate::ptcl::Cmd::End]
        );
    }

    #[test]
    fn hillis_steele_matches_naive_cumulative_sum() {
        let mut data = [0u32; N];
        for (i, d) in data.iter_mut().enumerate() {
            *d = (i % 7) as u32;
        }
        let mut expected = [0u32; N];
        let mut running = 0u32;
        for i in 0..N {
            running += data[i];
            expected[i] = running;
        }
        hillis_steele_inclusive_scan(&mut data);
        assert_eq!(data, expected);
    }

    #[test]
    fn search_sorted_finds_upper_bound() {
        let mut counts = [0u32; N];
        // A handful of non-zero partitions, rest flat (zero-size).
        counts[0] = 2;
        for c in counts.iter_mut().skip(1).take(N - 1) {
            *c = 2;
        }
        counts[10] = 5;
        for c in counts.iter_mut().skip(11) {
            *c = 5;
        }
        counts[200] = 9;
        for c in counts.iter_mut().skip(201) {
            *c = 9;
        }
        assert_eq!(search_sorted(&counts, 0), 0);
        assert_eq!(search_sorted(&counts, 1), 0);
        assert_eq!(search_sorted(&counts, 2), 10);
        assert_eq!(search_sorted(&counts, 4), 10);
        assert_eq!(search_sorted(&counts, 5), 200);
        assert_eq!(search_sorted(&counts, 8), 200);
    }
}
