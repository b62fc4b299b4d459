use std::marker::PhantomData;

use wgpu::util::DeviceExt;

/// A single uniform value living on the device.
pub struct Var<A> {
    buffer: wgpu::Buffer,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Var<A> {
    pub fn new(device: &wgpu::Device, label: &str, contents: A) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&contents),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Var {
            buffer,
            phantom_data: PhantomData,
        }
    }

    /// Queues an overwrite; it lands before the next submission on `queue`.
    pub fn write(&self, queue: &wgpu::Queue, contents: A) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&contents));
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}

impl<A> Drop for Var<A> {
    fn drop(&mut self) {
        self.buffer.destroy()
    }
}
