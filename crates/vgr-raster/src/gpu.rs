//! Thin `wgpu` dispatch for the coarse and fine compute shaders.
//!
//! Grounded on `vfx_gpu::context::GpuContext` and
//! `vfx_gpu::backend::wgpu_backend`'s `create_pipeline`/bind-group pattern,
//! reduced to what this crate's narrower scope needs: this module does not
//! allocate, size, or own any buffer. The caller creates and binds every
//! `wgpu::Buffer` each kernel reads (`config, scene, draw_monoids,
//! bin_headers, bin_data, paths, tiles, info, ptcl, bump` for coarse;
//! `config, ptcl, segments, bump_failed, output` for fine) and this module
//! only builds the bind group and submits one compute pass.

use std::sync::Arc;

use vgr_core::{Error, Result};

use crate::shaders;

/// Owns the `wgpu::Device`/`Queue` and the two rasterizer pipelines.
///
/// Analogous to `vfx_gpu::context::GpuContext`, but scoped to exactly the
/// two compute pipelines this crate defines instead of a general-purpose
/// image-processing pipeline cache.
pub struct GpuRasterContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    coarse_pipeline: wgpu::ComputePipeline,
    fine_pipeline: wgpu::ComputePipeline,
}

impl GpuRasterContext {
    /// Request a high-performance adapter and build both pipelines.
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(Error::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("vgr-raster"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| Error::DeviceCreation(e.to_string()))?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let coarse_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vgr-coarse"),
            source: wgpu::ShaderSource::Wgsl(shaders::COARSE.into()),
        });
        let fine_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vgr-fine"),
            source: wgpu::ShaderSource::Wgsl(shaders::FINE.into()),
        });

        let coarse_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("vgr-coarse-pipeline"),
            layout: None,
            module: &coarse_module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });
        let fine_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("vgr-fine-pipeline"),
            layout: None,
            module: &fine_module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self { device, queue, coarse_pipeline, fine_pipeline })
    }

    /// Dispatch the coarse rasterizer over a `(width_in_bins, height_in_bins)`
    /// workgroup grid, binding the nine buffers in binding-index order.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch_coarse(
        &self,
        width_in_bins: u32,
        height_in_bins: u32,
        config: &wgpu::Buffer,
        scene: &wgpu::Buffer,
        draw_monoids: &wgpu::Buffer,
        bin_headers: &wgpu::Buffer,
        bin_data: &wgpu::Buffer,
        paths: &wgpu::Buffer,
        tiles: &wgpu::Buffer,
        info: &wgpu::Buffer,
        ptcl: &wgpu::Buffer,
        bump: &wgpu::Buffer,
    ) {
        let layout = self.coarse_pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vgr-coarse-bind-group"),
            layout: &layout,
            entries: &[
                entry(0, config),
                entry(1, scene),
                entry(2, draw_monoids),
                entry(3, bin_headers),
                entry(4, bin_data),
                entry(5, paths),
                entry(6, tiles),
                entry(7, info),
                entry(8, ptcl),
                entry(9, bump),
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vgr-coarse-encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("vgr-coarse-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.coarse_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(width_in_bins, height_in_bins, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Dispatch the fine rasterizer over a `(width_in_tiles, height_in_tiles)`
    /// workgroup grid.
    pub fn dispatch_fine(
        &self,
        width_in_tiles: u32,
        height_in_tiles: u32,
        config: &wgpu::Buffer,
        ptcl: &wgpu::Buffer,
        segments: &wgpu::Buffer,
        bump_failed: &wgpu::Buffer,
        output: &wgpu::Buffer,
    ) {
        let layout = self.fine_pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vgr-fine-bind-group"),
            layout: &layout,
            entries: &[
                entry(0, config),
                entry(1, ptcl),
                entry(2, segments),
                entry(3, bump_failed),
                entry(4, output),
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vgr-fine-encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("vgr-fine-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.fine_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(width_in_tiles, height_in_tiles, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// The underlying device, for callers that need to create or map
    /// buffers themselves (this module owns no buffers).
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The underlying queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

fn entry(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry { binding, resource: buffer.as_entire_binding() }
}
