//! CPU simulation of the fine rasterizer kernel.
//!
//! One workgroup per tile (`FINE_WG_X` x `FINE_WG_Y` = 4x16 = 64 lanes);
//! each lane owns `PIXELS_PER_THREAD` horizontal pixels, so a workgroup
//! covers exactly one 16x16 tile. Lanes are independent — unlike
//! [`crate::coarse`], there is no shared-memory phase and therefore no lane
//! reinterpretation and no barrier to stand in for.

use vgr_core::{Error, Result, Vec2};

use crate::config::{Config, FINE_WG_X, FINE_WG_Y, PIXELS_PER_THREAD, PTCL_INITIAL_ALLOC, TILE_WIDTH};
use crate::ptcl::CmdTag;
use crate::types::Segment;

/// Packed `0xAABBGGRR` emitted for a tile whose PTCL stream cannot be
/// trusted because the bump allocator overflowed while coarse was writing
/// it.
pub const BUMP_FAILED_COLOR: u32 = 0xFF00_FFFF;

/// Numerical epsilon used to un-premultiply alpha without dividing by zero.
const UNPREMULTIPLY_EPS: f32 = 1e-6;
/// Segments with `delta . delta` below this are treated as zero-length and
/// skipped by the stroke distance field.
const DEGENERATE_DELTA_EPS: f32 = 1e-12;
/// Bound on segment-chain length per tile, mirroring
/// [`crate::ptcl::decode_stream`]'s `max_jumps`: a well-formed `next` chain
/// always terminates, but this keeps a corrupt buffer from hanging a lane.
const MAX_SEGMENT_CHAIN: u32 = 1 << 20;

/// Run the fine rasterizer over every tile in the framebuffer, writing
/// packed `0xAABBGGRR` pixels into `output` (row-major, row stride
/// `cfg.width_px()`).
///
/// `bump_failed` is the snapshot of `BumpAllocators::failed` coarse left
/// behind; when set, every tile is painted [`BUMP_FAILED_COLOR`] instead of
/// being interpreted, since its PTCL stream may be truncated or corrupt.
pub fn run_fine_cpu(
    cfg: &Config,
    ptcl: &[u32],
    segments: &[Segment],
    bump_failed: bool,
    output: &mut [u32],
) -> Result<()> {
    let width_px = cfg.width_px();
    for ty in 0..cfg.height_in_tiles {
        for tx in 0..cfg.width_in_tiles {
            let tile_ix = ty * cfg.width_in_tiles + tx;
            run_tile(tile_ix, tx, ty, ptcl, segments, bump_failed, width_px, output)?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_tile(
    tile_ix: u32,
    tx: u32,
    ty: u32,
    ptcl: &[u32],
    segments: &[Segment],
    bump_failed: bool,
    width_px: u32,
    output: &mut [u32],
) -> Result<()> {
    for lane_y in 0..FINE_WG_Y {
        for lane_x in 0..FINE_WG_X {
            let colors = if bump_failed {
                [BUMP_FAILED_COLOR; PIXELS_PER_THREAD as usize]
            } else {
                run_lane(tile_ix, lane_x, lane_y, ptcl, segments)?
            };
            let px0 = tx * TILE_WIDTH + lane_x * PIXELS_PER_THREAD;
            let py = ty * TILE_WIDTH + lane_y;
            for (i, &c) in colors.iter().enumerate() {
                let px = px0 + i as u32;
                let ix = (py * width_px + px) as usize;
                if let Some(slot) = output.get_mut(ix) {
                    *slot = c;
                }
            }
        }
    }
    Ok(())
}

/// Interpreter loop for one lane: walk `tile_ix`'s PTCL stream,
/// accumulating premultiplied `rgba` for this lane's 4 pixels, until
/// `CMD_END`.
fn run_lane(tile_ix: u32, lane_x: u32, lane_y: u32, ptcl: &[u32], segments: &[Segment]) -> Result<[u32; 4]> {
    let xy = (lane_x as f32 * PIXELS_PER_THREAD as f32, lane_y as f32);
    let mut rgba = [[0.0f32; 4]; PIXELS_PER_THREAD as usize];
    let mut pending_area: Option<[f32; 4]> = None;
    let mut cmd_ix = tile_ix * PTCL_INITIAL_ALLOC;

    loop {
        let tag = *ptcl.get(cmd_ix as usize).ok_or(Error::UnknownPtclTag {
            tag: 0,
            tile_ix,
            cmd_offset: cmd_ix,
        })?;
        match CmdTag::from_u32(tag) {
            Some(CmdTag::End) => break,
            Some(CmdTag::Fill) => {
                let seg_head = word(ptcl, cmd_ix + 1, tile_ix, cmd_ix)?;
                let backdrop = word(ptcl, cmd_ix + 2, tile_ix, cmd_ix)? as i32;
                let area = fill_path(backdrop, seg_head, xy, segments, tile_ix, cmd_ix)?;
                pending_area = Some(area);
                cmd_ix += 3;
            }
            Some(CmdTag::Stroke) => {
                let seg_head = word(ptcl, cmd_ix + 1, tile_ix, cmd_ix)?;
                let half_width = f32::from_bits(word(ptcl, cmd_ix + 2, tile_ix, cmd_ix)?);
                let area = stroke_path(seg_head, half_width, xy, segments, tile_ix, cmd_ix)?;
                pending_area = Some(area);
                cmd_ix += 3;
            }
            Some(CmdTag::Solid) => {
                pending_area = Some([1.0; 4]);
                cmd_ix += 1;
            }
            Some(CmdTag::Color) => {
                let rgba_u32 = word(ptcl, cmd_ix + 1, tile_ix, cmd_ix)?;
                let area = pending_area.take().unwrap_or([0.0; 4]);
                let [r, g, b, a] = unpack_rgba8(rgba_u32);
                for i in 0..4 {
                    let cov = area[i];
                    let fg = [r * cov, g * cov, b * cov, a * cov];
                    for c in 0..4 {
                        rgba[i][c] = rgba[i][c] * (1.0 - fg[3]) + fg[c];
                    }
                }
                cmd_ix += 2;
            }
            Some(CmdTag::Jump) => {
                cmd_ix = word(ptcl, cmd_ix + 1, tile_ix, cmd_ix)?;
            }
            None => {
                return Err(Error::UnknownPtclTag { tag, tile_ix, cmd_offset: cmd_ix });
            }
        }
    }

    let mut out = [0u32; 4];
    for i in 0..4 {
        let a = rgba[i][3];
        let inv = 1.0 / (a + UNPREMULTIPLY_EPS);
        let straight = [rgba[i][0] * inv, rgba[i][1] * inv, rgba[i][2] * inv, a];
        out[i] = pack_rgba8(straight);
    }
    Ok(out)
}

fn word(ptcl: &[u32], ix: u32, tile_ix: u32, cmd_offset: u32) -> Result<u32> {
    ptcl.get(ix as usize).copied().ok_or(Error::UnknownPtclTag { tag: 0, tile_ix, cmd_offset })
}

/// WGSL `sign()` semantics: `0.0` at zero (both signs), unlike `f32::signum`
/// which returns `±1.0` even for `±0.0`. `fill_path`'s half-open-vertical
/// term relies on this to stay inert for a purely-vertical segment.
fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Unpack a packed `0xAABBGGRR` word into straight-alpha `(r, g, b, a)` in
/// `[0, 1]`.
fn unpack_rgba8(word: u32) -> [f32; 4] {
    let bytes = word.to_le_bytes();
    [
        bytes[0] as f32 / 255.0,
        bytes[1] as f32 / 255.0,
        bytes[2] as f32 / 255.0,
        bytes[3] as f32 / 255.0,
    ]
}

/// Pack straight `[r, g, b, a]` in `[0, 1]` into a `0xAABBGGRR` word,
/// rounding to the nearest 8-bit value (so an exactly-1.0 channel round-trips
/// to `0xFF`).
fn pack_rgba8(rgba: [f32; 4]) -> u32 {
    let b = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    u32::from_le_bytes(b)
}

/// Analytic exact-area winding coverage for this lane's 4 pixels, starting
/// from tile `backdrop` and walking the segment chain rooted at `seg_head`
/// (0 means no segments, so the loop does not execute and `area[i] =
/// |backdrop|` for all 4).
fn fill_path(
    backdrop: i32,
    seg_head: u32,
    xy: (f32, f32),
    segments: &[Segment],
    tile_ix: u32,
    cmd_offset: u32,
) -> Result<[f32; 4]> {
    let mut area = [backdrop as f32; 4];
    let mut cur = seg_head;
    let mut steps = 0u32;
    while cur != 0 {
        steps += 1;
        if steps > MAX_SEGMENT_CHAIN {
            return Err(Error::UnknownPtclTag { tag: cur, tile_ix, cmd_offset });
        }
        let seg = *segments
            .get(cur as usize)
            .ok_or(Error::BufferTooShort { name: "segments", needed: cur as usize, len: segments.len() })?;

        let y = seg.origin[1] - xy.1;
        let y0 = (y).clamp(0.0, 1.0);
        let y1 = (y + seg.delta[1]).clamp(0.0, 1.0);
        let dy = y0 - y1;
        if dy != 0.0 {
            let t0 = (y0 - y) / seg.delta[1];
            let t1 = (y1 - y) / seg.delta[1];
            let x0 = (seg.origin[0] - xy.0) + t0 * seg.delta[0];
            let x1 = (seg.origin[0] - xy.0) + t1 * seg.delta[0];
            let xmin0 = x0.min(x1);
            let xmax0 = x0.max(x1);
            for (i, a) in area.iter_mut().enumerate() {
                let xmin = (xmin0 - i as f32).min(1.0) - 1e-6;
                let xmax = xmax0 - i as f32;
                let b = xmax.min(1.0);
                let c = b.max(0.0);
                let d = xmin.max(0.0);
                let contrib = (b + 0.5 * (d * d - c * c) - xmin) / (xmax - xmin);
                *a += contrib * dy;
            }
        }

        let y_edge_contrib = sign(seg.delta[0]) * (xy.1 - seg.y_edge + 1.0).clamp(0.0, 1.0);
        for a in area.iter_mut() {
            *a += y_edge_contrib;
        }

        cur = seg.next;
    }
    Ok(area.map(f32::abs))
}

/// Distance-to-polyline coverage for this lane's 4 pixels. Expressed with
/// [`Vec2`] rather than manual component arithmetic, since the
/// point-to-segment distance here is genuinely a vector op (`dot`,
/// `length`), unlike `fill_path`'s per-pixel scalar clamping.
fn stroke_path(
    seg_head: u32,
    half_width: f32,
    xy: (f32, f32),
    segments: &[Segment],
    tile_ix: u32,
    cmd_offset: u32,
) -> Result<[f32; 4]> {
    let mut df = [1e9f32; 4];
    let mut cur = seg_head;
    let mut steps = 0u32;
    while cur != 0 {
        steps += 1;
        if steps > MAX_SEGMENT_CHAIN {
            return Err(Error::UnknownPtclTag { tag: cur, tile_ix, cmd_offset });
        }
        let seg = *segments
            .get(cur as usize)
            .ok_or(Error::BufferTooShort { name: "segments", needed: cur as usize, len: segments.len() })?;

        let delta = Vec2::new(seg.delta[0], seg.delta[1]);
        let delta_dot = delta.dot(delta);
        if delta_dot < DEGENERATE_DELTA_EPS {
            cur = seg.next;
            continue;
        }
        let scale = 1.0 / delta_dot;
        let origin = Vec2::new(seg.origin[0], seg.origin[1]);
        let dpos0 = Vec2::new(xy.0, xy.1) + Vec2::splat(0.5) - origin;
        for (i, d) in df.iter_mut().enumerate() {
            let dpos = dpos0 + Vec2::new(i as f32, 0.0);
            let t = (dpos.dot(delta) * scale).clamp(0.0, 1.0);
            let dist = (delta * t - dpos).length();
            *d = d.min(dist);
        }

        cur = seg.next;
    }
    Ok(df.map(|d| (half_width + 0.5 - d).clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptcl::PtclWriter;
    use crate::types::BumpCell;

    fn cfg_1x1() -> Config {
        Config {
            width_in_tiles: 1,
            height_in_tiles: 1,
            n_drawobj: 0,
            drawtag_base: 0,
            drawdata_base: 0,
        }
    }

    #[test]
    fn empty_scene_is_transparent_black() {
        let cfg = cfg_1x1();
        let mut ptcl = vec![0u32; PTCL_INITIAL_ALLOC as usize];
        let bump = BumpCell::new();
        let mut w = PtclWriter::new(PTCL_INITIAL_ALLOC, 0);
        w.write_end(&mut ptcl, &bump);

        let mut output = vec![0xFFFF_FFFFu32; (cfg.width_px() * cfg.height_px()) as usize];
        run_fine_cpu(&cfg, &ptcl, &[], false, &mut output).unwrap();
        assert!(output.iter().all(|&p| p == 0), "expected transparent black, got {:#x}", output[0]);
    }

    #[test]
    fn solid_opaque_red_covers_tile_exactly() {
        let cfg = cfg_1x1();
        let mut ptcl = vec![0u32; PTCL_INITIAL_ALLOC as usize];
        let bump = BumpCell::new();
        let mut w = PtclWriter::new(PTCL_INITIAL_ALLOC, 0);
        w.write_path(&mut ptcl, &bump, 0, 0, -1.0);
        w.write_color(&mut ptcl, &bump, 0xFF0000FF);
        w.write_end(&mut ptcl, &bump);

        let mut output = vec![0u32; (cfg.width_px() * cfg.height_px()) as usize];
        run_fine_cpu(&cfg, &ptcl, &[], false, &mut output).unwrap();
        assert!(output.iter().all(|&p| p == 0xFF0000FF));
    }

    #[test]
    fn bump_failure_paints_tile_magenta() {
        let cfg = cfg_1x1();
        let ptcl = vec![0u32; PTCL_INITIAL_ALLOC as usize]; // CMD_END never reached; irrelevant, bump_failed short-circuits
        let mut output = vec![0u32; (cfg.width_px() * cfg.height_px()) as usize];
        run_fine_cpu(&cfg, &ptcl, &[], true, &mut output).unwrap();
        assert!(output.iter().all(|&p| p == BUMP_FAILED_COLOR));
    }

    #[test]
    fn unknown_tag_aborts_stream() {
        let cfg = cfg_1x1();
        let mut ptcl = vec![0u32; PTCL_INITIAL_ALLOC as usize];
        ptcl[0] = 42; // not a known CmdTag
        let mut output = vec![0u32; (cfg.width_px() * cfg.height_px()) as usize];
        let err = run_fine_cpu(&cfg, &ptcl, &[], false, &mut output).unwrap_err();
        assert!(err.is_unknown_tag());
    }

    #[test]
    fn idempotent_rerun_matches() {
        let cfg = cfg_1x1();
        let mut ptcl = vec![0u32; PTCL_INITIAL_ALLOC as usize];
        let bump = BumpCell::new();
        let mut w = PtclWriter::new(PTCL_INITIAL_ALLOC, 0);
        w.write_path(&mut ptcl, &bump, 0, 0, -1.0);
        w.write_color(&mut ptcl, &bump, 0x11223344);
        w.write_end(&mut ptcl, &bump);

        let mut a = vec![0u32; (cfg.width_px() * cfg.height_px()) as usize];
        let mut b = a.clone();
        run_fine_cpu(&cfg, &ptcl, &[], false, &mut a).unwrap();
        run_fine_cpu(&cfg, &ptcl, &[], false, &mut b).unwrap();
        assert_eq!(a, b);
    }

    /// `fill_path`'s analytic area must equal a straight edge's exact
    /// geometric coverage. A single vertical edge at `x=8` splits the tile
    /// into a left half-plane (winding 0) and a right half-plane (winding 1);
    /// `y_edge` is pushed out of range so the half-open-vertical term (meant
    /// for edges that continue past this tile) does not contaminate the
    /// measurement.
    #[test]
    fn analytic_fill_path_matches_half_plane_coverage() {
        let segments = vec![
            Segment::default(),
            Segment { origin: [8.0, 0.0], delta: [0.0, 16.0], y_edge: 100.0, next: 0 },
        ];
        for row in 0..16u32 {
            // Pixels 0..4: four full pixel-widths left of the edge.
            let area_left = fill_path(0, 1, (0.0, row as f32), &segments, 0, 0).unwrap();
            for a in area_left {
                approx::assert_abs_diff_eq!(a, 0.0, epsilon = 1e-4);
            }
            // Pixels 12..16: four full pixel-widths right of the edge.
            let area_right = fill_path(0, 1, (12.0, row as f32), &segments, 0, 0).unwrap();
            for a in area_right {
                approx::assert_abs_diff_eq!(a, 1.0, epsilon = 1e-4);
            }
        }
    }
}
