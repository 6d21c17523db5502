//! GPU buffer that grows when an upload outgrows it.
//!
//! Instance groups have a fixed capacity, so reallocation only happens when
//! a group is replaced by a larger one under the same ID.

/// Minimum allocation in bytes.
const MIN_CAPACITY: usize = 64;

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
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        initial_capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let capacity = aligned(initial_capacity.max(MIN_CAPACITY));
        let buffer = create(device, label, capacity, usage);

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
            let new_capacity =
                aligned((needed * 2).max(self.capacity + 1024));
            self.buffer = create(device, &self.label, new_capacity, self.usage);
            log::debug!(
                "Grew '{}' from {} to {} bytes",
                self.label,
                self.capacity,
                new_capacity
            );
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

    /// The underlying `wgpu::Buffer`.
    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Bytes written by the last upload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn create(
    device: &wgpu::Device,
    label: &str,
    size: usize,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Round up to `wgpu::COPY_BUFFER_ALIGNMENT`.
fn aligned(size: usize) -> usize {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    size.div_ceil(align) * align
}
