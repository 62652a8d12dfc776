//! Coarse and fine rasterizer kernels for a GPU-resident 2D vector-graphics
//! pipeline.
//!
//! This crate implements the two compute stages of the pipeline: the
//! **coarse rasterizer**, which merges per-bin draw-object lists into a
//! per-tile command stream
//! (PTCL), and the **fine rasterizer**, which interprets that stream into
//! final anti-aliased pixels. Both are provided as deterministic CPU
//! simulations (the primary, always-available implementation this crate's
//! tests exercise) and, behind the `wgpu` feature, as the literal WGSL
//! compute shaders a real GPU dispatch runs.
//!
//! # Architecture
//!
//! ```text
//! SceneView (config, scene, draw_monoids, bin_headers, bin_data, paths, tiles, segments, info)
//!     └── coarse::run_coarse_cpu  -->  ptcl buffer + bump cursor
//!             └── fine::run_fine_cpu  -->  output framebuffer
//! ```
//!
//! The `gpu` module (feature `wgpu`) dispatches [`shaders::COARSE`] and
//! [`shaders::FINE`] against caller-owned `wgpu::Buffer`s instead of running
//! the CPU simulation; it is not required to use this crate.

pub mod coarse;
pub mod config;
pub mod fine;
pub mod ptcl;
pub mod scene;
pub mod shaders;
pub mod types;

#[cfg(feature = "wgpu")]
pub mod gpu;

pub use coarse::run_coarse_cpu;
pub use fine::run_fine_cpu;
pub use scene::SceneView;
