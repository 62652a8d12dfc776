//! Benchmarks for the coarse and fine rasterizer kernels.
//!
//! Grounded on `vfx-bench/benches/vfx_bench.rs`'s `criterion_group!` shape:
//! one `Criterion` function per kernel, `black_box`-wrapped inputs, a
//! `Throughput` scaled to the unit of work. `vfx-bench` is a standalone
//! crate importing every `vfx-*` operator crate; this workspace only has one
//! compute crate worth benchmarking, so the bench lives directly in
//! `vgr-raster` instead of a dedicated bench-only crate.
//!
//! Run with: `cargo bench -p vgr-raster`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use vgr_raster::coarse::DRAWTAG_FILL_COLOR;
use vgr_raster::config::Config;
use vgr_raster::types::{BinHeader, BumpCell, DrawMonoid, PathRec, TileRec};
use vgr_raster::SceneView;

/// A scene with `n_drawobj` tiny 1x1-tile solid fills scattered (with
/// wraparound, so tiles get several overlapping fills) across a
/// `width x height` tile framebuffer, all within a single bin
/// (`width, height <= 16`). Mirrors the fixture shape of
/// `coarse::tests::single_tile_solid_fill`, scaled up.
struct BenchScene {
    config: Config,
    scene: Vec<u32>,
    draw_monoids: Vec<DrawMonoid>,
    paths: Vec<PathRec>,
    tiles: Vec<TileRec>,
    info: Vec<u32>,
    bin_headers: Vec<BinHeader>,
    bin_data: Vec<u32>,
}

impl BenchScene {
    fn build(n_drawobj: u32, width: u32, height: u32) -> Self {
        let config = Config { width_in_tiles: width, height_in_tiles: height, n_drawobj, drawtag_base: 0, drawdata_base: n_drawobj };

        let mut scene = vec![DRAWTAG_FILL_COLOR; n_drawobj as usize];
        scene.extend((0..n_drawobj).map(|i| u32::from_le_bytes([(i % 256) as u8, 0, 0, 255])));

        let draw_monoids: Vec<DrawMonoid> =
            (0..n_drawobj).map(|i| DrawMonoid { path_ix: i, scene_offset: i, info_offset: 0, _pad: 0 }).collect();

        // Each draw object owns a single-cell slot in `tiles`, addressed
        // through its own `PathRec::tiles` base (a 1x1 bbox has stride 1),
        // the same per-path tile-storage convention `single_tile_solid_fill`
        // exercises with one path instead of many.
        let n_tiles = width * height;
        let paths: Vec<PathRec> = (0..n_drawobj)
            .map(|i| {
                let tile_ix = i % n_tiles;
                let x = (tile_ix % width) as i32;
                let y = (tile_ix / width) as i32;
                PathRec { bbox: [x, y, x + 1, y + 1], tiles: i, _pad: [0; 3] }
            })
            .collect();

        let tiles = vec![TileRec { backdrop: 1, segments: 0 }; n_drawobj as usize];
        let info = vec![(-1.0f32).to_bits()];

        // Framebuffer stays within one bin (`width, height <= N_TILE_X/Y`),
        // so only `bin_ix == 0` of each partition row is ever read.
        const PART: u32 = vgr_raster::config::N_TILE;
        let n_partitions = n_drawobj.div_ceil(PART);
        let mut bin_headers = vec![BinHeader::default(); (n_partitions * PART) as usize];
        for p in 0..n_partitions {
            bin_headers[(p * PART) as usize] =
                BinHeader { element_count: PART.min(n_drawobj - p * PART), chunk_offset: p * PART };
        }
        let bin_data: Vec<u32> = (0..n_drawobj).collect();

        Self { config, scene, draw_monoids, paths, tiles, info, bin_headers, bin_data }
    }

    fn view(&self) -> SceneView<'_> {
        SceneView {
            config: self.config,
            scene: &self.scene,
            draw_monoids: &self.draw_monoids,
            bin_headers: &self.bin_headers,
            bin_data: &self.bin_data,
            paths: &self.paths,
            tiles: &self.tiles,
            segments: &[],
            info: &self.info,
        }
    }
}

fn bench_coarse(c: &mut Criterion) {
    let mut group = c.benchmark_group("coarse");
    for &n in &[256u32, 1024, 4096] {
        let scene = BenchScene::build(n, 8, 8);
        let view = scene.view();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("run_coarse_cpu", n), &view, |b, view| {
            b.iter(|| {
                let mut ptcl = vec![0u32; (view.config.ptcl_static_end() + 64 * vgr_raster::config::PTCL_INCREMENT) as usize];
                let bump = BumpCell::new();
                vgr_raster::run_coarse_cpu(black_box(view), &mut ptcl, &bump).unwrap();
                black_box(&ptcl);
            })
        });
    }
    group.finish();
}

fn bench_fine(c: &mut Criterion) {
    let mut group = c.benchmark_group("fine");
    for &(w, h) in &[(4u32, 4u32), (16, 16)] {
        let scene = BenchScene::build((w * h).min(256), w, h);
        let view = scene.view();
        let mut ptcl = vec![0u32; (view.config.ptcl_static_end() + 64 * vgr_raster::config::PTCL_INCREMENT) as usize];
        let bump = BumpCell::new();
        vgr_raster::run_coarse_cpu(&view, &mut ptcl, &bump).unwrap();
        let bump_failed = bump.load(std::sync::atomic::Ordering::Relaxed).failed != 0;
        let cfg = view.config;

        group.throughput(Throughput::Elements((cfg.width_px() * cfg.height_px()) as u64));
        group.bench_with_input(BenchmarkId::new("run_fine_cpu", format!("{w}x{h}tiles")), &cfg, |b, cfg| {
            b.iter(|| {
                let mut output = vec![0u32; (cfg.width_px() * cfg.height_px()) as usize];
                vgr_raster::run_fine_cpu(black_box(cfg), &ptcl, &[], bump_failed, &mut output).unwrap();
                black_box(&output);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_coarse, bench_fine);
criterion_main!(benches);
