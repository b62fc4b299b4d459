pub trait CommandEncoderExt {
    fn with_compute_pass<'pass, A>(
        &'pass mut self,
        label: &str,
        function: impl FnOnce(&mut wgpu::ComputePass<'pass>) -> A,
    ) -> A;
}

impl CommandEncoderExt for wgpu::CommandEncoder {
    fn with_compute_pass<'pass, A>(
        &'pass mut self,
        label: &str,
        function: impl FnOnce(&mut wgpu::ComputePass<'pass>) -> A,
    ) -> A {
        let mut compute_pass = self.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
        });
        function(&mut compute_pass)
    }
}

/// Records commands with `function` and finishes them into a buffer ready to submit.
pub fn record(
    device: &wgpu::Device,
    label: &str,
    function: impl FnOnce(&mut wgpu::CommandEncoder),
) -> wgpu::CommandBuffer {
    let mut command_encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
    function(&mut command_encoder);
    command_encoder.finish()
}
