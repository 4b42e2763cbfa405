//! Dynamic GPU buffer management with automatic resizing
//!
//! Per-object scene uniforms are packed into one buffer that grows when a
//! frame has more drawables than it can hold.

/// A GPU buffer that can grow dynamically
///
/// Uses a 2x growth strategy when capacity is exceeded.
/// Never shrinks (GPU buffers cannot be resized in place).
pub struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: usize, // Capacity in bytes
    len: usize,      // Current data length in bytes
    usage: wgpu::BufferUsages,
    label: String,
}

impl DynamicBuffer {
    /// Buffer with the given initial byte capacity.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        initial_capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let capacity = initial_capacity.max(64); // Minimum 64 bytes

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity as u64,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            capacity,
            len: 0,
            usage,
            label: label.to_owned(),
        }
    }

    /// Write raw bytes to buffer, growing if necessary.
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation).
    pub fn write_bytes(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
    ) -> bool {
        let needed = data.len();

        let reallocated = if needed > self.capacity {
            let new_capacity = (needed * 2).max(self.capacity + 1024);

            self.buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&self.label),
                size: new_capacity as u64,
                usage: self.usage | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            self.capacity = new_capacity;
            true
        } else {
            false
        };

        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, data);
        }
        self.len = needed;

        reallocated
    }

    /// Pack `items` at `stride`-byte intervals (dynamic-offset uniform
    /// layout) and upload them, growing if necessary.
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation).
    pub fn write_strided<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        items: &[T],
        stride: usize,
    ) -> bool {
        let packed = pack_strided(items, stride);
        self.write_bytes(device, queue, &packed)
    }

    /// The current GPU buffer. Changes after a reallocating write.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Bytes written by the last write.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the last write was empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}


/// Lay out `items` so item `i` starts at byte `i * stride`. A stride smaller
/// than the item size is raised to it.
pub fn pack_strided<T: bytemuck::Pod>(items: &[T], stride: usize) -> Vec<u8> {
    let size = std::mem::size_of::<T>();
    let stride = stride.max(size);
    let mut bytes = vec![0u8; items.len() * stride];
    for (chunk, item) in bytes.chunks_exact_mut(stride).zip(items) {
        chunk[..size].copy_from_slice(bytemuck::bytes_of(item));
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_packing_pads_each_item() {
        let bytes = pack_strided(&[1u32, 2u32], 8);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &1u32.to_ne_bytes());
        assert_eq!(&bytes[8..12], &2u32.to_ne_bytes());
        assert!(bytes[4..8].iter().all(|&b| b == 0));
    }

    #[test]
    fn stride_never_truncates_items() {
        assert_eq!(pack_strided(&[[1.0f32; 4]], 4).len(), 16);
        assert!(pack_strided::<u32>(&[], 256).is_empty());
    }
}
