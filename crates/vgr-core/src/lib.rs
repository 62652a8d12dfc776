//! Shared types for the `vgr` 2D vector-graphics rasterization pipeline.
//!
//! This crate holds what the coarse and fine rasterizer crates both need and
//! nothing else: a 2D vector alias, and the error type shared across the
//! pipeline's CPU-simulation and (optional) `wgpu` backends.

pub mod error;

pub use error::{Error, Result};

/// 2D vector used for segment endpoints and pixel-space math.
///
/// Re-exported rather than wrapped: every arithmetic op the coarse/fine
/// kernels need (`dot`, `length`, component access) already exists on
/// [`glam::Vec2`], and wrapping it would just be forwarding calls.
pub type Vec2 = glam::Vec2;
