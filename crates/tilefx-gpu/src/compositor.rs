//! Multi-pass filter compositor.

use std::collections::HashMap;

use tilefx_core::PixelBuffer;
use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use crate::kernel::{GpuKernel, KernelId};
use crate::shaders::FULLSCREEN_VERTEX;
use crate::uniform;
use crate::{GpuContext, GpuError, GpuResult};

const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A kernel ready to run: its program cache key plus its packed uniforms.
struct PreparedKernel {
    id: KernelId,
    uniforms: wgpu::Buffer,
}

/// Persistent render surfaces, sized to the composited frame.
struct Surfaces {
    width: u32,
    height: u32,
    /// Upload target for the composed frame; sampled by pass 0.
    source: wgpu::Texture,
    /// Ping-pong pair for intermediate passes.
    ping: wgpu::Texture,
    pong: wgpu::Texture,
    /// Final pass renders here; read back after the frame.
    dest: wgpu::Texture,
}

impl Surfaces {
    fn destroy(&self) {
        self.source.destroy();
        self.ping.destroy();
        self.pong.destroy();
        self.dest.destroy();
    }
}

/// Renders an ordered kernel chain against a composed frame.
///
/// Pipelines compile once per distinct [`KernelId`] and are reused across
/// frames and across [`set_kernels`](Self::set_kernels) calls; the render
/// surfaces are reallocated only when the frame size changes. Everything
/// else allocated during [`composite`](Self::composite) is dropped at the
/// end of the frame.
pub struct FilterCompositor {
    ctx: GpuContext,
    sampler: wgpu::Sampler,
    bind_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    programs: HashMap<KernelId, wgpu::RenderPipeline>,
    chain: Vec<PreparedKernel>,
    surfaces: Option<Surfaces>,
}

impl FilterCompositor {
    /// Build a compositor on an existing context.
    ///
    /// The common bind group layout (source texture, sampler, uniform
    /// block) is shared by every kernel.
    pub fn new(ctx: GpuContext) -> Self {
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("compositor_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("compositor_bind_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("compositor_pipeline_layout"),
                bind_group_layouts: &[&bind_layout],
                push_constant_ranges: &[],
            });

        Self {
            ctx,
            sampler,
            bind_layout,
            pipeline_layout,
            programs: HashMap::new(),
            chain: Vec::new(),
            surfaces: None,
        }
    }

    /// Number of kernels currently installed.
    pub fn kernel_count(&self) -> usize {
        self.chain.len()
    }

    /// Number of distinct compiled programs held in the cache.
    pub fn cached_program_count(&self) -> usize {
        self.programs.len()
    }

    /// Install the ordered kernel chain for subsequent frames.
    ///
    /// Each kernel's program is compiled once per distinct identity and
    /// cached; its uniform buffer is built here, once, not per frame. On
    /// any compile failure the previous chain stays installed and the
    /// backend diagnostic is returned in [`GpuError::KernelCompile`].
    pub fn set_kernels(&mut self, kernels: Vec<GpuKernel>) -> GpuResult<()> {
        let mut chain = Vec::with_capacity(kernels.len());
        for kernel in &kernels {
            if !self.programs.contains_key(&kernel.id) {
                let pipeline = self.compile(kernel)?;
                self.programs.insert(kernel.id, pipeline);
            }
            let uniforms = self
                .ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(kernel.name()),
                    contents: &uniform::pack(&kernel.params),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
            chain.push(PreparedKernel {
                id: kernel.id,
                uniforms,
            });
        }
        debug!(kernels = chain.len(), "kernel chain installed");
        self.chain = chain;
        Ok(())
    }

    /// Remove all kernels; [`composite`](Self::composite) becomes an
    /// identity pass and the host surface shows through unmodified.
    pub fn clear_kernels(&mut self) {
        debug!("kernel chain cleared");
        self.chain.clear();
    }

    fn compile(&self, kernel: &GpuKernel) -> GpuResult<wgpu::RenderPipeline> {
        let source = format!("{FULLSCREEN_VERTEX}\n{}", kernel.fragment);
        let device = &self.ctx.device;

        // Capture shader and pipeline diagnostics instead of letting them
        // surface as uncaptured device errors.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.name()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(kernel.name()),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: SURFACE_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::KernelCompile {
                kernel: kernel.name(),
                detail: err.to_string(),
            });
        }
        trace!(kernel = kernel.name(), "pipeline compiled");
        Ok(pipeline)
    }

    fn create_texture(&self, width: u32, height: u32, usage: wgpu::TextureUsages, label: &str) -> wgpu::Texture {
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage,
            view_formats: &[],
        })
    }

    fn ensure_surfaces(&mut self, width: u32, height: u32) {
        if let Some(s) = &self.surfaces {
            if s.width == width && s.height == height {
                return;
            }
            s.destroy();
        }
        debug!(width, height, "allocating compositor surfaces");
        let pass_usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        self.surfaces = Some(Surfaces {
            width,
            height,
            source: self.create_texture(
                width,
                height,
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                "compositor_source",
            ),
            ping: self.create_texture(width, height, pass_usage, "compositor_ping"),
            pong: self.create_texture(width, height, pass_usage, "compositor_pong"),
            dest: self.create_texture(
                width,
                height,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                "compositor_dest",
            ),
        });
    }

    /// Run the installed kernel chain over `frame` and return the result.
    ///
    /// With no kernels installed this is an identity pass. Otherwise the
    /// frame is uploaded into the source texture and each kernel runs as
    /// one fullscreen pass: pass 0 samples the source, later passes sample
    /// the previous pass's output, and the final pass renders into the
    /// destination texture, which is then read back.
    pub fn composite(&mut self, frame: &PixelBuffer) -> GpuResult<PixelBuffer> {
        if self.chain.is_empty() {
            return Ok(frame.clone());
        }
        let (width, height) = frame.dimensions();
        self.ensure_surfaces(width, height);
        let surfaces = self.surfaces.as_ref().ok_or_else(|| {
            GpuError::Readback("compositor surfaces unavailable".into())
        })?;
        let device = &self.ctx.device;

        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &surfaces.source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let source_view = surfaces.source.create_view(&Default::default());
        let ping_view = surfaces.ping.create_view(&Default::default());
        let pong_view = surfaces.pong.create_view(&Default::default());
        let dest_view = surfaces.dest.create_view(&Default::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("compositor_encoder"),
        });

        let last = self.chain.len() - 1;
        for (i, kernel) in self.chain.iter().enumerate() {
            let input = if i == 0 {
                &source_view
            } else if (i - 1) % 2 == 0 {
                &ping_view
            } else {
                &pong_view
            };
            let target = if i == last {
                &dest_view
            } else if i % 2 == 0 {
                &ping_view
            } else {
                &pong_view
            };

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(kernel.id.name()),
                layout: &self.bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(input),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: kernel.uniforms.as_entire_binding(),
                    },
                ],
            });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(kernel.id.name()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.programs[&kernel.id]);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
            drop(pass);
            trace!(pass = i, kernel = kernel.id.name(), "pass recorded");
        }

        // Per-frame staging buffer; dropped when the frame ends.
        let bytes_per_row = aligned_bytes_per_row(width);
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("compositor_readback"),
            size: bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &surfaces.dest,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.submit_and_wait(encoder);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GpuError::Readback(e.to_string())),
            Err(e) => return Err(GpuError::Readback(e.to_string())),
        }

        let mapped = slice.get_mapped_range();
        let row = (width * 4) as usize;
        let mut data = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            let start = y * bytes_per_row as usize;
            data.extend_from_slice(&mapped[start..start + row]);
        }
        drop(mapped);
        staging.unmap();

        PixelBuffer::from_raw(width, height, data).map_err(|e| GpuError::Readback(e.to_string()))
    }

    /// Release every GPU object the compositor holds: compiled programs,
    /// the kernel chain's uniform buffers, and the render surfaces.
    pub fn destroy(&mut self) {
        for kernel in &self.chain {
            kernel.uniforms.destroy();
        }
        self.chain.clear();
        self.programs.clear();
        if let Some(s) = self.surfaces.take() {
            s.destroy();
        }
    }
}

impl Drop for FilterCompositor {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{brightness_kernel, greyscale_kernel, invert_kernel};

    // Adapter availability varies by machine; GPU tests bail out quietly
    // when there is none.
    fn compositor() -> Option<FilterCompositor> {
        GpuContext::new().ok().map(FilterCompositor::new)
    }

    fn frame(v: u8) -> PixelBuffer {
        PixelBuffer::filled(8, 8, [v, v, v, 255]).unwrap()
    }

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
        assert_eq!(aligned_bytes_per_row(128), 512);
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let Some(mut c) = compositor() else { return };
        let input = frame(42);
        let out = c.composite(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_invert_twice_round_trips() {
        let Some(mut c) = compositor() else { return };
        c.set_kernels(vec![invert_kernel(), invert_kernel()]).unwrap();
        let input = frame(100);
        let out = c.composite(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_brightness_pass_adds_adjustment() {
        let Some(mut c) = compositor() else { return };
        c.set_kernels(vec![brightness_kernel(50).unwrap()]).unwrap();
        let out = c.composite(&frame(100)).unwrap();
        assert_eq!(out.pixel(3, 3), [150, 150, 150, 255]);
    }

    #[test]
    fn test_program_cache_keyed_by_identity() {
        let Some(mut c) = compositor() else { return };
        c.set_kernels(vec![brightness_kernel(10).unwrap()]).unwrap();
        assert_eq!(c.cached_program_count(), 1);
        // Same identity, different parameters: no recompilation.
        c.set_kernels(vec![brightness_kernel(200).unwrap()]).unwrap();
        assert_eq!(c.cached_program_count(), 1);
        c.set_kernels(vec![greyscale_kernel(), brightness_kernel(5).unwrap()])
            .unwrap();
        assert_eq!(c.cached_program_count(), 2);
    }

    #[test]
    fn test_bad_shader_fails_fast_and_keeps_chain() {
        let Some(mut c) = compositor() else { return };
        c.set_kernels(vec![invert_kernel()]).unwrap();

        let broken = GpuKernel {
            id: KernelId("broken"),
            fragment: "this is not wgsl",
            params: Vec::new(),
        };
        let err = c.set_kernels(vec![broken]).unwrap_err();
        assert!(matches!(err, GpuError::KernelCompile { kernel: "broken", .. }));
        // The previous chain is still installed.
        assert_eq!(c.kernel_count(), 1);
    }

    #[test]
    fn test_clear_kernels_restores_identity() {
        let Some(mut c) = compositor() else { return };
        c.set_kernels(vec![invert_kernel()]).unwrap();
        c.clear_kernels();
        let input = frame(9);
        assert_eq!(c.composite(&input).unwrap(), input);
        assert_eq!(c.kernel_count(), 0);
    }
}
