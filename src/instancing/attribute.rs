//! Dense per-instance attribute buffers.
//!
//! An [`InstanceAttribute`] is the CPU-side mirror of one GPU instance buffer:
//! a fixed number of slots, each `item_size` floats wide. Writers touch
//! individual slots; the render loop checks [`InstanceAttribute::needs_upload`]
//! and re-submits the whole buffer when it is set.

use serde::{Deserialize, Serialize};

/// Update-frequency hint handed to the rendering engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub enum BufferUsage {
    /// Written rarely.
    #[default]
    Static,
    /// Rewritten most frames.
    Dynamic,
}

/// Fixed-capacity, slot-addressed float buffer with an upload flag.
#[derive(Debug, Clone)]
pub struct InstanceAttribute {
    data: Vec<f32>,
    item_size: usize,
    usage: BufferUsage,
    needs_upload: bool,
    /// Bumped every time the buffer is flagged for upload.
    version: u64,
    disposed: bool,
}

impl InstanceAttribute {
    /// `count` slots of `item_size` floats, all zero.
    #[must_use]
    pub fn new(count: usize, item_size: usize, usage: BufferUsage) -> Self {
        Self {
            data: vec![0.0; count * item_size],
            item_size,
            usage,
            needs_upload: false,
            version: 0,
            disposed: false,
        }
    }

    /// `count` slots, each initialised to `fill`.
    #[must_use]
    pub fn filled(count: usize, fill: &[f32], usage: BufferUsage) -> Self {
        let mut attr = Self::new(count, fill.len(), usage);
        for slot in attr.data.chunks_exact_mut(fill.len().max(1)) {
            slot.copy_from_slice(fill);
        }
        attr
    }

    /// Number of slots.
    #[must_use]
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    /// Floats per slot.
    #[must_use]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Update-frequency hint.
    #[must_use]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Read one slot. `None` when out of range.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.item_size)?;
        self.data.get(start..start + self.item_size)
    }

    /// Overwrite one slot. Returns `false` when `index` is out of range or
    /// `values` has the wrong width.
    pub fn set_slot(&mut self, index: usize, values: &[f32]) -> bool {
        if values.len() != self.item_size || index >= self.count() {
            return false;
        }
        let start = index * self.item_size;
        self.data[start..start + self.item_size].copy_from_slice(values);
        true
    }

    /// The full float array.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// The full buffer as bytes, ready for `queue.write_buffer`.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Size of the buffer in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        size_of_val(self.data.as_slice())
    }

    /// Whether the GPU copy is stale.
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    /// Flag the buffer for re-upload and bump its version.
    pub fn mark_needs_upload(&mut self) {
        self.needs_upload = true;
        self.version += 1;
    }

    /// Called by the uploader once the GPU copy matches.
    pub fn mark_uploaded(&mut self) {
        self.needs_upload = false;
    }

    /// Number of times the buffer has been flagged for upload.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Release the storage. The attribute reports zero slots afterwards.
    pub fn dispose(&mut self) {
        self.data = Vec::new();
        self.needs_upload = false;
        self.disposed = true;
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
