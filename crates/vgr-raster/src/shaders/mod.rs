//! WGSL compute shader sources for the coarse and fine rasterizer stages.
//!
//! These are the same algorithms [`crate::coarse`] and [`crate::fine`]
//! simulate on the CPU, written as the actual compute shaders a `wgpu`
//! dispatch runs (see [`crate::gpu`], feature `wgpu`). Embedded as
//! `pub const &str`, with no build-time shader compilation: just string
//! constants `wgpu` validates at pipeline-creation time.

#![allow(dead_code)] // consumed by the `wgpu` backend only

/// The coarse rasterizer compute shader: streaming bin merge, tile fan-out,
/// and PTCL emission.
///
/// Dispatched with workgroup grid `(width_in_bins, height_in_bins, 1)`,
/// `@workgroup_size(256)` — one lane per tile in a bin.
pub const COARSE: &str = r#"
// Coarse rasterizer: per-bin streaming merge + tile fan-out + PTCL emission.

const TILE_WIDTH: u32 = 16u;
const N_TILE_X: u32 = 16u;
const N_TILE_Y: u32 = 16u;
const N_TILE: u32 = 256u;
const WG_SIZE: u32 = 256u;
const N_SLICE: u32 = 8u;
const PTCL_INITIAL_ALLOC: u32 = 64u;
const PTCL_INCREMENT: u32 = 256u;
const PTCL_HEADROOM: u32 = 2u;

const DRAWTAG_NOP: u32 = 0u;
const DRAWTAG_FILL_COLOR: u32 = 0x44u;

const CMD_END: u32 = 0u;
const CMD_FILL: u32 = 1u;
const CMD_STROKE: u32 = 2u;
const CMD_SOLID: u32 = 3u;
const CMD_COLOR: u32 = 5u;
const CMD_JUMP: u32 = 11u;

struct Config {
    width_in_tiles: u32,
    height_in_tiles: u32,
    n_drawobj: u32,
    drawtag_base: u32,
    drawdata_base: u32,
}

struct DrawMonoid {
    path_ix: u32,
    scene_offset: u32,
    info_offset: u32,
    _pad: u32,
}

struct BinHeader {
    element_count: u32,
    chunk_offset: u32,
}

struct PathRec {
    bbox: vec4<i32>,
    tiles: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct TileRec {
    backdrop: i32,
    segments: u32,
}

struct BumpAllocators {
    ptcl: atomic<u32>,
    failed: atomic<u32>,
}

@group(0) @binding(0) var<uniform> config: Config;
@group(0) @binding(1) var<storage, read> scene: array<u32>;
@group(0) @binding(2) var<storage, read> draw_monoids: array<DrawMonoid>;
@group(0) @binding(3) var<storage, read> bin_headers: array<BinHeader>;
@group(0) @binding(4) var<storage, read> bin_data: array<u32>;
@group(0) @binding(5) var<storage, read> paths: array<PathRec>;
@group(0) @binding(6) var<storage, read> tiles: array<TileRec>;
@group(0) @binding(7) var<storage, read> info: array<u32>;
@group(0) @binding(8) var<storage, read_write> ptcl: array<u32>;
@group(0) @binding(9) var<storage, read_write> bump: BumpAllocators;

var<workgroup> sh_part_offsets: array<u32, WG_SIZE>;
var<workgroup> sh_part_count: array<u32, WG_SIZE>;
var<workgroup> sh_drawobj_ix: array<u32, WG_SIZE>;
var<workgroup> sh_tile_x0: array<i32, WG_SIZE>;
var<workgroup> sh_tile_y0: array<i32, WG_SIZE>;
var<workgroup> sh_tile_width: array<i32, WG_SIZE>;
var<workgroup> sh_tile_stride: array<i32, WG_SIZE>;
var<workgroup> sh_tile_base: array<i32, WG_SIZE>;
var<workgroup> sh_tile_count: array<u32, WG_SIZE>;
var<workgroup> sh_bitmaps: array<atomic<u32>, N_SLICE * WG_SIZE>;

var<workgroup> sh_scan: array<u32, WG_SIZE>;

fn n_partitions() -> u32 {
    return config.n_drawobj / N_TILE + select(0u, 1u, config.n_drawobj % N_TILE != 0u);
}

fn static_end() -> u32 {
    return config.width_in_tiles * config.height_in_tiles * PTCL_INITIAL_ALLOC;
}

// Workgroup-wide inclusive Hillis-Steele scan of `sh_scan`, staged through
// `local_id.x`. Separate barriers before and after each of the log2(WG_SIZE)
// steps.
fn workgroup_scan(local_ix: u32) {
    var offset = 1u;
    loop {
        if offset >= WG_SIZE { break; }
        workgroupBarrier();
        var v = sh_scan[local_ix];
        if local_ix >= offset {
            v = v + sh_scan[local_ix - offset];
        }
        workgroupBarrier();
        sh_scan[local_ix] = v;
        offset = offset * 2u;
    }
}

// Smallest index p with counts[p] > needle, over a WG_SIZE-length
// non-decreasing array (used for both the partition lookup and the
// draw-object lookup).
fn search_sorted(needle: u32) -> u32 {
    var ix = 0u;
    var step = WG_SIZE / 2u;
    loop {
        if step < 1u { break; }
        let candidate = ix + step;
        if candidate < WG_SIZE && sh_scan[candidate] <= needle {
            ix = candidate;
        }
        step = step / 2u;
    }
    if sh_scan[ix] <= needle { return ix + 1u; }
    return 0u;
}

@compute @workgroup_size(256)
fn main(
    @builtin(workgroup_id) wg_id: vec3<u32>,
    @builtin(local_invocation_id) local_id: vec3<u32>,
) {
    let width_in_bins = config.width_in_tiles / N_TILE_X + select(0u, 1u, config.width_in_tiles % N_TILE_X != 0u);
    let bx = wg_id.x;
    let by = wg_id.y;
    let bin_ix = by * width_in_bins + bx;
    let bin_tile_x = i32(bx * N_TILE_X);
    let bin_tile_y = i32(by * N_TILE_Y);

    let l = local_id.x;
    let tx = l % N_TILE_X;
    let ty = l / N_TILE_X;
    let gx = bx * N_TILE_X + tx;
    let gy = by * N_TILE_Y + ty;
    let tile_valid = gx < config.width_in_tiles && gy < config.height_in_tiles;
    let this_tile_ix = gy * config.width_in_tiles + gx;

    var cmd_offset = this_tile_ix * PTCL_INITIAL_ALLOC;
    var cmd_limit = cmd_offset + (PTCL_INITIAL_ALLOC - PTCL_HEADROOM);

    var partition_ix = 0u;
    var ready_ix = 0u;
    var rd_ix = 0u;
    var wr_ix = 0u;
    let n_part = n_partitions();
    let se = static_end();

    loop {
        // --- refill ---
        loop {
            if wr_ix - rd_ix >= N_TILE { break; }
            if ready_ix == wr_ix && partition_ix < n_part {
                let part_start_ix = ready_ix;
                var element_count = 0u;
                let p = partition_ix + l;
                if p < n_part {
                    let h = bin_headers[p * N_TILE + bin_ix];
                    element_count = h.element_count;
                    sh_part_offsets[l] = h.chunk_offset;
                }
                sh_scan[l] = element_count;
                workgroup_scan(l);
                sh_part_count[l] = part_start_ix + sh_scan[l];
                workgroupBarrier();
                ready_ix = sh_part_count[WG_SIZE - 1u];
                partition_ix = partition_ix + WG_SIZE;
            } else if ready_ix == wr_ix {
                break;
            }

            let idx = rd_ix + l;
            if idx >= wr_ix && idx < ready_ix {
                let p2 = search_sorted(idx);
                var lower = 0u;
                if p2 > 0u { lower = sh_part_count[p2 - 1u]; }
                sh_drawobj_ix[l] = bin_data[sh_part_offsets[p2] + (idx - lower)];
            }
            workgroupBarrier();
            wr_ix = min(rd_ix + N_TILE, ready_ix);
        }

        // --- fan-out: lane l now means "draw object l" ---
        let window_len = wr_ix - rd_ix;
        var tile_count = 0u;
        if l < window_len {
            let drawobj_ix = sh_drawobj_ix[l];
            let tag = scene[config.drawtag_base + drawobj_ix];
            if tag == DRAWTAG_FILL_COLOR {
                let dm = draw_monoids[drawobj_ix];
                let path = paths[dm.path_ix];
                let x0 = clamp(path.bbox.x - bin_tile_x, 0, i32(N_TILE_X));
                let y0 = clamp(path.bbox.y - bin_tile_y, 0, i32(N_TILE_Y));
                let x1 = clamp(path.bbox.z - bin_tile_x, 0, i32(N_TILE_X));
                let y1 = clamp(path.bbox.w - bin_tile_y, 0, i32(N_TILE_Y));
                let width = x1 - x0;
                let height = y1 - y0;
                let stride = path.bbox.z - path.bbox.x;
                let dx = path.bbox.x - bin_tile_x;
                let dy = path.bbox.y - bin_tile_y;
                sh_tile_x0[l] = x0;
                sh_tile_y0[l] = y0;
                sh_tile_width[l] = width;
                sh_tile_stride[l] = stride;
                sh_tile_base[l] = i32(path.tiles) - (dy * stride + dx);
                tile_count = u32(max(width * height, 0));
            }
        }
        sh_scan[l] = tile_count;
        workgroup_scan(l);
        sh_tile_count[l] = sh_scan[l];
        workgroupBarrier();
        let total_tile_count = sh_tile_count[WG_SIZE - 1u];

        for (var s = 0u; s < N_SLICE; s = s + 1u) {
            atomicStore(&sh_bitmaps[s * WG_SIZE + l], 0u);
        }
        workgroupBarrier();

        for (var ix = l; ix < total_tile_count; ix = ix + WG_SIZE) {
            let el_ix = search_sorted(ix);
            var lower2 = 0u;
            if el_ix > 0u { lower2 = sh_tile_count[el_ix - 1u]; }
            let seq_ix = ix - lower2;
            let width2 = u32(sh_tile_width[el_ix]);
            let x = sh_tile_x0[el_ix] + i32(seq_ix % width2);
            let y = sh_tile_y0[el_ix] + i32(seq_ix / width2);
            let tile_ix2 = u32(sh_tile_base[el_ix] + sh_tile_stride[el_ix] * y + x);
            let t = tiles[tile_ix2];
            if t.segments != 0u || t.backdrop != 0 {
                let local_tile_ix = u32(y) * N_TILE_X + u32(x);
                atomicOr(&sh_bitmaps[(el_ix / 32u) * WG_SIZE + local_tile_ix], 1u << (el_ix & 31u));
            }
        }
        workgroupBarrier();

        // --- emission: lane l reverts to "tile l" ---
        if tile_valid {
            for (var s = 0u; s < N_SLICE; s = s + 1u) {
                var bits = atomicLoad(&sh_bitmaps[s * WG_SIZE + l]);
                loop {
                    if bits == 0u { break; }
                    let b = countTrailingZeros(bits);
                    bits = bits & (bits - 1u);
                    let el_ix = s * 32u + b;

                    let drawobj_ix = sh_drawobj_ix[el_ix];
                    let dm = draw_monoids[drawobj_ix];
                    let tile_ix3 = u32(sh_tile_base[el_ix] + sh_tile_stride[el_ix] * i32(ty) + i32(tx));
                    let t = tiles[tile_ix3];
                    let linewidth = bitcast<f32>(info[dm.info_offset]);
                    let rgba = scene[config.drawdata_base + dm.scene_offset];

                    // alloc_cmd(3): reserve room for CMD_FILL/CMD_STROKE before dispatch.
                    if cmd_offset + 3u >= cmd_limit {
                        let new_offset = atomicAdd(&bump.ptcl, PTCL_INCREMENT);
                        if se + new_offset + PTCL_INCREMENT > arrayLength(&ptcl) {
                            atomicStore(&bump.failed, 1u);
                        }
                        ptcl[cmd_offset] = CMD_JUMP;
                        ptcl[cmd_offset + 1u] = se + new_offset;
                        cmd_offset = se + new_offset;
                        cmd_limit = cmd_offset + (PTCL_INCREMENT - PTCL_HEADROOM);
                    }
                    if linewidth < 0.0 {
                        if t.segments != 0u {
                            ptcl[cmd_offset] = CMD_FILL;
                            ptcl[cmd_offset + 1u] = t.segments;
                            ptcl[cmd_offset + 2u] = bitcast<u32>(t.backdrop);
                            cmd_offset = cmd_offset + 3u;
                        } else {
                            ptcl[cmd_offset] = CMD_SOLID;
                            cmd_offset = cmd_offset + 1u;
                        }
                    } else {
                        ptcl[cmd_offset] = CMD_STROKE;
                        ptcl[cmd_offset + 1u] = t.segments;
                        ptcl[cmd_offset + 2u] = bitcast<u32>(0.5 * linewidth);
                        cmd_offset = cmd_offset + 3u;
                    }

                    // alloc_cmd(2) + CMD_COLOR.
                    if cmd_offset + 2u >= cmd_limit {
                        let new_offset2 = atomicAdd(&bump.ptcl, PTCL_INCREMENT);
                        if se + new_offset2 + PTCL_INCREMENT > arrayLength(&ptcl) {
                            atomicStore(&bump.failed, 1u);
                        }
                        ptcl[cmd_offset] = CMD_JUMP;
                        ptcl[cmd_offset + 1u] = se + new_offset2;
                        cmd_offset = se + new_offset2;
                        cmd_limit = cmd_offset + (PTCL_INCREMENT - PTCL_HEADROOM);
                    }
                    ptcl[cmd_offset] = CMD_COLOR;
                    ptcl[cmd_offset + 1u] = rgba;
                    cmd_offset = cmd_offset + 2u;
                }
            }
        }

        rd_ix = rd_ix + N_TILE;
        workgroupBarrier();
        if rd_ix >= ready_ix && partition_ix >= n_part { break; }
    }

    if tile_valid {
        if cmd_offset + 1u >= cmd_limit {
            let new_offset = atomicAdd(&bump.ptcl, PTCL_INCREMENT);
            if se + new_offset + PTCL_INCREMENT > arrayLength(&ptcl) {
                atomicStore(&bump.failed, 1u);
            }
            ptcl[cmd_offset] = CMD_JUMP;
            ptcl[cmd_offset + 1u] = se + new_offset;
            cmd_offset = se + new_offset;
        }
        ptcl[cmd_offset] = CMD_END;
    }
}
"#;

/// The fine rasterizer compute shader: interprets a tile's PTCL stream into
/// anti-aliased, premultiplied pixels.
///
/// Dispatched with workgroup grid `(width_in_tiles, height_in_tiles, 1)`,
/// `@workgroup_size(4, 16)` — each lane handles `PIXELS_PER_THREAD` (4)
/// horizontal pixels, so one workgroup covers one 16x16 tile.
pub const FINE: &str = r#"
const TILE_WIDTH: u32 = 16u;
const PIXELS_PER_THREAD: u32 = 4u;
const PTCL_INITIAL_ALLOC: u32 = 64u;

const CMD_END: u32 = 0u;
const CMD_FILL: u32 = 1u;
const CMD_STROKE: u32 = 2u;
const CMD_SOLID: u32 = 3u;
const CMD_COLOR: u32 = 5u;
const CMD_JUMP: u32 = 11u;

struct Config {
    width_in_tiles: u32,
    height_in_tiles: u32,
    n_drawobj: u32,
    drawtag_base: u32,
    drawdata_base: u32,
}

struct Segment {
    origin: vec2<f32>,
    delta: vec2<f32>,
    y_edge: f32,
    next: u32,
}

@group(0) @binding(0) var<uniform> config: Config;
@group(0) @binding(1) var<storage, read> ptcl: array<u32>;
@group(0) @binding(2) var<storage, read> segments: array<Segment>;
@group(0) @binding(3) var<storage, read> bump_failed: u32;
@group(0) @binding(4) var<storage, read_write> output: array<u32>;

fn fill_path(backdrop: i32, seg_head: u32, xy: vec2<f32>) -> array<f32, 4> {
    var area: array<f32, 4>;
    for (var i = 0u; i < 4u; i = i + 1u) { area[i] = f32(backdrop); }

    var cur = seg_head;
    loop {
        if cur == 0u { break; }
        let seg = segments[cur];
        let y = seg.origin.y - xy.y;
        let y0 = clamp(y, 0.0, 1.0);
        let y1 = clamp(y + seg.delta.y, 0.0, 1.0);
        let dy = y0 - y1;
        if dy != 0.0 {
            let t0 = (y0 - y) / seg.delta.y;
            let t1 = (y1 - y) / seg.delta.y;
            let x0 = (seg.origin.x - xy.x) + t0 * seg.delta.x;
            let x1 = (seg.origin.x - xy.x) + t1 * seg.delta.x;
            let xmin0 = min(x0, x1);
            let xmax0 = max(x0, x1);
            for (var i = 0u; i < 4u; i = i + 1u) {
                let xmin = min(xmin0 - f32(i), 1.0) - 1e-6;
                let xmax = xmax0 - f32(i);
                let b = min(xmax, 1.0);
                let c = max(b, 0.0);
                let d = max(xmin, 0.0);
                let contrib = (b + 0.5 * (d * d - c * c) - xmin) / (xmax - xmin);
                area[i] = area[i] + contrib * dy;
            }
        }
        let y_edge_contrib = sign(seg.delta.x) * clamp(xy.y - seg.y_edge + 1.0, 0.0, 1.0);
        for (var i = 0u; i < 4u; i = i + 1u) { area[i] = area[i] + y_edge_contrib; }
        cur = seg.next;
    }

    for (var i = 0u; i < 4u; i = i + 1u) { area[i] = abs(area[i]); }
    return area;
}

fn stroke_path(seg_head: u32, half_width: f32, xy: vec2<f32>) -> array<f32, 4> {
    var df: array<f32, 4>;
    for (var i = 0u; i < 4u; i = i + 1u) { df[i] = 1e9; }

    var cur = seg_head;
    loop {
        if cur == 0u { break; }
        let seg = segments[cur];
        let delta_dot = dot(seg.delta, seg.delta);
        if delta_dot >= 1e-12 {
            let scale = 1.0 / delta_dot;
            let dpos0 = xy + vec2<f32>(0.5, 0.5) - seg.origin;
            for (var i = 0u; i < 4u; i = i + 1u) {
                let dpos = dpos0 + vec2<f32>(f32(i), 0.0);
                let t = clamp(dot(dpos, seg.delta) * scale, 0.0, 1.0);
                df[i] = min(df[i], length(seg.delta * t - dpos));
            }
        }
        cur = seg.next;
    }

    var area: array<f32, 4>;
    for (var i = 0u; i < 4u; i = i + 1u) {
        area[i] = clamp(half_width + 0.5 - df[i], 0.0, 1.0);
    }
    return area;
}

// `word` is packed `0xAABBGGRR`; `unpack4x8unorm` treats byte 0 (the least
// significant) as component `.x`, so the result is already `(R, G, B, A)`.
fn unpack_rgba(word: u32) -> vec4<f32> {
    return unpack4x8unorm(word);
}

@compute @workgroup_size(4, 16)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(workgroup_id) wg_id: vec3<u32>) {
    let tile_ix = wg_id.y * config.width_in_tiles + wg_id.x;
    let xy = vec2<f32>(f32(gid.x * PIXELS_PER_THREAD), f32(gid.y));

    if bump_failed != 0u {
        for (var i = 0u; i < 4u; i = i + 1u) {
            let px = wg_id.x * TILE_WIDTH + gid.x * PIXELS_PER_THREAD + i;
            let py = wg_id.y * TILE_WIDTH + gid.y;
            let out_ix = py * (config.width_in_tiles * TILE_WIDTH) + px;
            output[out_ix] = 0xFF00FFFFu;
        }
        return;
    }

    var rgba: array<vec4<f32>, 4>;
    var area: array<f32, 4>;
    for (var i = 0u; i < 4u; i = i + 1u) {
        rgba[i] = vec4<f32>(0.0);
        area[i] = 0.0;
    }

    var cmd_ix = tile_ix * PTCL_INITIAL_ALLOC;
    loop {
        let tag = ptcl[cmd_ix];
        if tag == CMD_END { break; }
        if tag == CMD_FILL {
            let segp = ptcl[cmd_ix + 1u];
            let backdrop = bitcast<i32>(ptcl[cmd_ix + 2u]);
            area = fill_path(backdrop, segp, xy);
            cmd_ix = cmd_ix + 3u;
        } else if tag == CMD_STROKE {
            let segp = ptcl[cmd_ix + 1u];
            let half_width = bitcast<f32>(ptcl[cmd_ix + 2u]);
            area = stroke_path(segp, half_width, xy);
            cmd_ix = cmd_ix + 3u;
        } else if tag == CMD_SOLID {
            for (var i = 0u; i < 4u; i = i + 1u) { area[i] = 1.0; }
            cmd_ix = cmd_ix + 1u;
        } else if tag == CMD_COLOR {
            let rgba_word = ptcl[cmd_ix + 1u];
            let straight = unpack_rgba(rgba_word);
            for (var i = 0u; i < 4u; i = i + 1u) {
                let fg = straight * area[i];
                rgba[i] = rgba[i] * (1.0 - fg.a) + fg;
            }
            cmd_ix = cmd_ix + 2u;
        } else if tag == CMD_JUMP {
            cmd_ix = ptcl[cmd_ix + 1u];
        } else {
            break;
        }
    }

    for (var i = 0u; i < 4u; i = i + 1u) {
        let a = rgba[i].a;
        let straight = vec4<f32>(rgba[i].rgb / (a + 1e-6), a);
        let packed = pack4x8unorm(straight);
        let px = wg_id.x * TILE_WIDTH + gid.x * PIXELS_PER_THREAD + i;
        let py = wg_id.y * TILE_WIDTH + gid.y;
        let out_ix = py * (config.width_in_tiles * TILE_WIDTH) + px;
        output[out_ix] = packed;
    }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_sources_are_non_empty_and_balanced() {
        for src in [COARSE, FINE] {
            assert!(!src.trim().is_empty());
            assert_eq!(src.matches('{').count(), src.matches('}').count());
        }
    }
}
