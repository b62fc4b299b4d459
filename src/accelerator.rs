//! GPU backend: the `zoom.wgsl` kernel run across every usable adapter.
//!
//! Each adapter gets its own device, queue and compiled pipeline (a *lane*).
//! A frame is split into one horizontal band per lane; all bands are
//! submitted before any is waited on, so the devices work side by side.
//! Every GPU object is owned by a value in this module and released when it
//! drops, on error paths included.

use std::ops::Range;

use bytemuck::Zeroable;
use crossbeam::channel;
use log::{debug, info, trace, warn};
use rayon::prelude::{
    IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator,
};

use crate::{
    backend::Backend,
    command_encoder::{self, CommandEncoderExt},
    compute::{self, zoom_dispatch_size},
    frame::{Frame, FrameSequence},
    kernel::{self, KernelArgs},
    palette::Palette,
    screen::Size,
    typed_buffer::{self, Buffer},
    var::Var,
    zoom::{Viewport, ZoomPlan},
    Error, Result,
};

/// One adapter, ready to run the kernel.
struct Lane {
    name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// The rows of the frame a lane computes, with the buffers it computes them in.
/// Allocated once per render and reused for every frame.
struct Band<'a> {
    lane: &'a Lane,
    rows: Range<u32>,
    output: Buffer<u32>,
    readback: Buffer<u32>,
    args: Var<KernelArgs>,
    bind_group: wgpu::BindGroup,
}

pub struct Accelerator {
    lanes: Vec<Lane>,
}

fn is_gpu(device_type: wgpu::DeviceType) -> bool {
    matches!(
        device_type,
        wgpu::DeviceType::DiscreteGpu
            | wgpu::DeviceType::IntegratedGpu
            | wgpu::DeviceType::VirtualGpu
    )
}

fn setup_error(lane: &str, what: &str, error: impl std::fmt::Display) -> Error {
    Error::AcceleratorSetup(format!("{} on {}: {}", what, lane, error))
}

/// Picks the adapters to build lanes on, as indices into `adapters`.
///
/// Each entry is an adapter's info and whether it can run compute shaders.
/// Adapters are grouped by backend, and the first backend in enumeration order
/// with a usable adapter wins, so a device exposed through several backends
/// gets one lane. Within that backend GPUs are preferred; when it has none,
/// every usable adapter is taken.
fn select_adapters(adapters: &[(wgpu::AdapterInfo, bool)]) -> Vec<usize> {
    let backend = match adapters.iter().find(|(_, usable)| *usable) {
        Some((info, _)) => info.backend,
        None => return Vec::new(),
    };
    let usable: Vec<usize> = adapters
        .iter()
        .enumerate()
        .filter(|(_, (info, usable))| *usable && info.backend == backend)
        .map(|(index, _)| index)
        .collect();

    let gpus: Vec<usize> = usable
        .iter()
        .copied()
        .filter(|&index| is_gpu(adapters[index].0.device_type))
        .collect();
    if gpus.is_empty() {
        warn!(
            "no GPU adapter on {:?}, falling back to all {} adapters",
            backend,
            usable.len()
        );
        usable
    } else {
        gpus
    }
}

impl Accelerator {
    /// Finds the usable adapters and builds the kernel on each.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::all());
        let adapters: Vec<wgpu::Adapter> = instance
            .enumerate_adapters(wgpu::Backends::all())
            .collect();
        if adapters.is_empty() {
            return Err(Error::AcceleratorSetup("no graphics adapters found".into()));
        }

        let described: Vec<(wgpu::AdapterInfo, bool)> = adapters
            .iter()
            .map(|adapter| {
                let info = adapter.get_info();
                let usable = adapter
                    .get_downlevel_capabilities()
                    .flags
                    .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);
                if !usable {
                    debug!("skipping {}: no compute shader support", info.name);
                }
                (info, usable)
            })
            .collect();

        let chosen = select_adapters(&described);
        if chosen.is_empty() {
            return Err(Error::AcceleratorSetup(
                "no adapter with compute shader support is available".into(),
            ));
        }

        let lanes = chosen
            .into_iter()
            .map(|index| Lane::new(&adapters[index]))
            .collect::<Result<Vec<_>>>()?;

        Ok(Accelerator { lanes })
    }

    pub fn device_count(&self) -> usize {
        self.lanes.len()
    }

    fn bands(&self, size: Size) -> Result<Vec<Band<'_>>> {
        self.lanes
            .iter()
            .zip(compute::bands(size.height, self.lanes.len()))
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(lane, rows)| lane.band(size, rows))
            .collect()
    }

    fn render_frame(
        &self,
        bands: &[Band],
        viewport: &Viewport,
        size: Size,
        palette_len: usize,
    ) -> Result<Frame> {
        for band in bands {
            band.submit(viewport, size, palette_len)?;
        }

        let receivers: Vec<_> = bands
            .iter()
            .map(|band| {
                let (sender, receiver) = channel::bounded(1);
                band.readback.slice().map_async(wgpu::MapMode::Read, move |result| {
                    let _ = sender.send(result);
                });
                receiver
            })
            .collect();

        let mut pixels = vec![0u8; size.pixel_count()];
        for (band, receiver) in bands.iter().zip(receivers) {
            band.lane.device.poll(wgpu::Maintain::Wait);
            receiver
                .recv()
                .map_err(|_| Error::Device(format!("{} dropped a readback", band.lane.name)))?
                .map_err(|error| {
                    Error::Device(format!("readback on {} failed: {}", band.lane.name, error))
                })?;

            let start = band.rows.start as usize * size.width as usize;
            let end = band.rows.end as usize * size.width as usize;
            let narrowed = {
                let words = band.readback.slice().get_mapped_range();
                narrow(&words, &mut pixels[start..end], palette_len)
            };
            band.readback.unmap();
            narrowed?;
        }

        Frame::new(size, pixels)
    }
}

/// Copies device words into palette-index bytes, rejecting indices outside the palette.
fn narrow(words: &[u32], pixels: &mut [u8], palette_len: usize) -> Result<()> {
    if words.len() != pixels.len() {
        return Err(Error::Device(format!(
            "readback holds {} pixels, band needs {}",
            words.len(),
            pixels.len()
        )));
    }
    pixels
        .par_iter_mut()
        .zip(words.par_iter())
        .try_for_each(|(pixel, &word)| {
            if word as usize >= palette_len {
                return Err(word);
            }
            *pixel = word as u8;
            Ok(())
        })
        .map_err(|word| {
            Error::Device(format!(
                "kernel wrote palette index {} for a {} colour palette",
                word, palette_len
            ))
        })
}

impl Lane {
    fn new(adapter: &wgpu::Adapter) -> Result<Self> {
        let info = adapter.get_info();
        let name = format!("{} ({:?})", info.name, info.backend);
        info!("using {}", name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("zoom-device"),
                features: wgpu::Features::empty(),
                limits: adapter.limits(),
            },
            None,
        ))
        .map_err(|error| setup_error(&name, "device creation failed", error))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("zoom-kernel"),
            source: wgpu::ShaderSource::Wgsl(kernel::SOURCE.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("zoom-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("zoom-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("zoom-pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: kernel::ENTRY_POINT,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(setup_error(&name, "kernel build failed", error));
        }

        Ok(Lane {
            name,
            device,
            queue,
            bind_group_layout,
            pipeline,
        })
    }

    fn band(&self, size: Size, rows: Range<u32>) -> Result<Band<'_>> {
        let len = size.width as u64 * (rows.end - rows.start) as u64;
        trace!("allocating band {:?} ({} pixels) on {}", rows, len, self.name);

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let output = typed_buffer::Builder::new(len)
            .with_label("band-output")
            .with_usage(wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC)
            .create(&self.device);
        let readback = typed_buffer::Builder::new(len)
            .with_label("band-readback")
            .with_usage(wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST)
            .create(&self.device);
        let args = Var::new(&self.device, "band-args", KernelArgs::zeroed());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("band-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: output.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: args.binding_resource(),
                },
            ],
        });

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            return Err(Error::Device(format!(
                "buffer allocation on {} failed: {}",
                self.name, error
            )));
        }

        Ok(Band {
            lane: self,
            rows,
            output,
            readback,
            args,
            bind_group,
        })
    }
}

impl<'a> Band<'a> {
    /// Queues the kernel launch and the copy into the readback buffer.
    fn submit(&self, viewport: &Viewport, size: Size, palette_len: usize) -> Result<()> {
        let lane = self.lane;
        lane.device.push_error_scope(wgpu::ErrorFilter::Validation);

        self.args.write(
            &lane.queue,
            KernelArgs::new(viewport, size, palette_len, self.rows.clone()),
        );

        let (x, y, z) = zoom_dispatch_size(size.width, self.rows.end - self.rows.start);
        let commands = command_encoder::record(&lane.device, "zoom-commands", |encoder| {
            encoder.with_compute_pass("zoom-pass", |compute_pass| {
                compute_pass.set_pipeline(&lane.pipeline);
                compute_pass.set_bind_group(0, &self.bind_group, &[]);
                compute_pass.dispatch_workgroups(x, y, z);
            });
            typed_buffer::copy_buffer_to_buffer(encoder, &self.output, &self.readback);
        });
        lane.queue.submit(Some(commands));

        match pollster::block_on(lane.device.pop_error_scope()) {
            Some(error) => Err(Error::Device(format!(
                "kernel launch on {} failed: {}",
                lane.name, error
            ))),
            None => Ok(()),
        }
    }
}

impl Backend for Accelerator {
    fn name(&self) -> &str {
        "accelerator"
    }

    fn render(&mut self, palette: &Palette, plan: &ZoomPlan) -> Result<FrameSequence> {
        let size = plan.size();
        let bands = self.bands(size)?;
        debug!("split {} rows into {} bands", size.height, bands.len());

        let frames = plan
            .viewports()
            .iter()
            .enumerate()
            .map(|(index, viewport)| {
                trace!("dispatching frame {}", index);
                self.render_frame(&bands, viewport, size, palette.len())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FrameSequence::from(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        palette::PaletteName,
        pool::CpuPool,
        screen::Resolution,
        zoom::Target,
    };

    /// Indices below this come from orbits escaping in roughly 30 iterations or fewer.
    const FAST_ESCAPE: u8 = 8;

    fn accelerator() -> Option<Accelerator> {
        let _ = env_logger::builder().is_test(true).try_init();
        match Accelerator::new() {
            Ok(accelerator) => Some(accelerator),
            Err(error) => {
                eprintln!("skipping accelerator test: {}", error);
                None
            }
        }
    }

    #[test]
    fn narrow_rejects_indices_past_the_palette() {
        let mut pixels = [0u8; 3];
        narrow(&[0, 1, 2], &mut pixels, 3).unwrap();
        assert_eq!(pixels, [0, 1, 2]);
        assert!(narrow(&[0, 3, 1], &mut pixels, 3).is_err());
        assert!(narrow(&[0, 1], &mut pixels, 3).is_err());
    }

    #[test]
    fn gpu_classification() {
        assert!(is_gpu(wgpu::DeviceType::DiscreteGpu));
        assert!(is_gpu(wgpu::DeviceType::IntegratedGpu));
        assert!(!is_gpu(wgpu::DeviceType::Cpu));
        assert!(!is_gpu(wgpu::DeviceType::Other));
    }

    fn adapter(name: &str, backend: wgpu::Backend, device_type: wgpu::DeviceType) -> wgpu::AdapterInfo {
        wgpu::AdapterInfo {
            name: name.to_string(),
            vendor: 0,
            device: 0,
            device_type,
            driver: String::new(),
            driver_info: String::new(),
            backend,
        }
    }

    #[test]
    fn one_backend_is_chosen_for_a_device_seen_twice() {
        let adapters = [
            (adapter("card", wgpu::Backend::Vulkan, wgpu::DeviceType::DiscreteGpu), true),
            (adapter("card", wgpu::Backend::Gl, wgpu::DeviceType::DiscreteGpu), true),
        ];
        assert_eq!(select_adapters(&adapters), vec![0]);
    }

    #[test]
    fn gpus_are_preferred_within_the_backend() {
        let adapters = [
            (adapter("llvmpipe", wgpu::Backend::Vulkan, wgpu::DeviceType::Cpu), true),
            (adapter("card-a", wgpu::Backend::Vulkan, wgpu::DeviceType::DiscreteGpu), true),
            (adapter("card-b", wgpu::Backend::Vulkan, wgpu::DeviceType::IntegratedGpu), true),
            (adapter("card-a", wgpu::Backend::Gl, wgpu::DeviceType::DiscreteGpu), true),
        ];
        assert_eq!(select_adapters(&adapters), vec![1, 2]);
    }

    #[test]
    fn falls_back_to_every_usable_adapter_without_a_gpu() {
        let adapters = [
            (adapter("old", wgpu::Backend::Gl, wgpu::DeviceType::Other), false),
            (adapter("llvmpipe", wgpu::Backend::Vulkan, wgpu::DeviceType::Cpu), true),
            (adapter("swiftshader", wgpu::Backend::Vulkan, wgpu::DeviceType::Cpu), true),
            (adapter("card", wgpu::Backend::Gl, wgpu::DeviceType::DiscreteGpu), true),
        ];
        assert_eq!(select_adapters(&adapters), vec![1, 2]);
    }

    #[test]
    fn nothing_is_chosen_without_compute_support() {
        let adapters = [(adapter("old", wgpu::Backend::Gl, wgpu::DeviceType::DiscreteGpu), false)];
        assert!(select_adapters(&adapters).is_empty());
        assert!(select_adapters(&[]).is_empty());
    }

    #[test]
    fn agrees_with_the_cpu_pool() {
        let Some(mut accelerator) = accelerator() else {
            return;
        };
        let palette = PaletteName::Vivid.palette();
        let plan = ZoomPlan::new(
            Resolution::Small.size(),
            Target::new(-0.6366988, -0.4426395).unwrap(),
            10,
        )
        .unwrap();

        let gpu = accelerator.render(&palette, &plan).unwrap();
        let cpu = CpuPool::new(4).unwrap().render(&palette, &plan).unwrap();

        assert_eq!(gpu.len(), cpu.len());
        for (index, (gpu, cpu)) in gpu.iter().zip(cpu.iter()).enumerate() {
            let mismatched = gpu
                .pixels()
                .iter()
                .zip(cpu.pixels())
                .filter(|(a, b)| a != b)
                .count();
            // Single precision drifts from double precision on slow-escaping
            // orbits near the boundary, so only a sliver may differ by more than one.
            let far = gpu
                .pixels()
                .iter()
                .zip(cpu.pixels())
                .filter(|(&a, &b)| (a as i32 - b as i32).abs() > 1)
                .count();
            assert!(
                mismatched * 100 <= cpu.pixels().len(),
                "frame {}: {} pixels differ",
                index,
                mismatched
            );
            assert!(
                far * 1000 <= cpu.pixels().len(),
                "frame {}: {} pixels differ by more than one index",
                index,
                far
            );
            // Orbits that escape within a few dozen iterations are well conditioned.
            for (pixel, (&a, &b)) in gpu.pixels().iter().zip(cpu.pixels()).enumerate() {
                if b < FAST_ESCAPE {
                    assert!(
                        (a as i32 - b as i32).abs() <= 1,
                        "frame {}: pixel {} is {} on the GPU and {} on the CPU",
                        index,
                        pixel,
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn frames_stay_inside_the_palette() {
        let Some(mut accelerator) = accelerator() else {
            return;
        };
        let palette = PaletteName::Hippie.palette();
        let plan = ZoomPlan::new(
            Size::new(100, 80).unwrap(),
            Target::new(0.0, 0.0).unwrap(),
            3,
        )
        .unwrap();

        let frames = accelerator.render(&palette, &plan).unwrap();

        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert_eq!(frame.size(), plan.size());
            assert!(frame.pixels().iter().all(|&index| (index as usize) < palette.len()));
        }
    }
}
