/*!
Typed `wgpu` buffers.

The accelerator moves palette indices between the device and the host as
plain `u32` words. A raw `wgpu::Buffer` forgets that; nothing stops a
readback from being cast to the wrong element type or a copy from being
sized in bytes where it should be sized in elements.

This module wraps `wgpu::Buffer` with its element type, sizes buffers in
elements, and casts mapped ranges with [`bytemuck`].
*/

use std::{marker::PhantomData, mem::size_of, ops::Deref};

pub struct Buffer<A> {
    buffer: wgpu::Buffer,
    len: u64,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Buffer<A> {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of `A`s the buffer holds.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn slice(&self) -> Slice<A> {
        Slice {
            slice: self.buffer.slice(..),
            phantom_data: PhantomData,
        }
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }

    pub fn unmap(&self) {
        self.buffer.unmap()
    }
}

impl<A> Drop for Buffer<A> {
    fn drop(&mut self) {
        self.buffer.destroy()
    }
}

pub struct Slice<'a, A> {
    slice: wgpu::BufferSlice<'a>,
    phantom_data: PhantomData<A>,
}

impl<'a, A> Slice<'a, A> {
    pub fn map_async(
        &self,
        mode: wgpu::MapMode,
        callback: impl FnOnce(Result<(), wgpu::BufferAsyncError>) + Send + 'static,
    ) {
        self.slice.map_async(mode, callback)
    }

    pub fn get_mapped_range(&self) -> View<'a, A> {
        View {
            view: self.slice.get_mapped_range(),
            phantom_data: PhantomData,
        }
    }
}

pub struct View<'a, A> {
    view: wgpu::BufferView<'a>,
    phantom_data: PhantomData<A>,
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> Deref for View<'a, A> {
    type Target = [A];

    fn deref(&self) -> &Self::Target {
        bytemuck::cast_slice(&*self.view)
    }
}

pub struct Builder<'a, A> {
    label: Option<&'a str>,
    len: u64,
    usage: wgpu::BufferUsages,
    phantom_data: PhantomData<A>,
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> Builder<'a, A> {
    /// An uninitialised buffer of `len` elements.
    pub fn new(len: u64) -> Self {
        Self {
            label: None,
            len,
            usage: wgpu::BufferUsages::empty(),
            phantom_data: PhantomData,
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_usage(mut self, usage: wgpu::BufferUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn create(self, device: &wgpu::Device) -> Buffer<A> {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: self.label,
            size: self.len * size_of::<A>() as u64,
            usage: self.usage,
            mapped_at_creation: false,
        });

        Buffer {
            buffer,
            len: self.len,
            phantom_data: PhantomData,
        }
    }
}

/// Copies all of `source` into `destination`; both must hold the same number of elements.
pub fn copy_buffer_to_buffer<A: bytemuck::Pod + bytemuck::Zeroable>(
    command_encoder: &mut wgpu::CommandEncoder,
    source: &Buffer<A>,
    destination: &Buffer<A>,
) {
    debug_assert_eq!(source.len(), destination.len());
    command_encoder.copy_buffer_to_buffer(
        source.buffer(),
        0,
        destination.buffer(),
        0,
        source.len() * size_of::<A>() as u64,
    )
}
