//! Render-loop side of the registry: mirrors flushed instance buffers into
//! wgpu storage buffers.
//!
//! Call [`InstanceUploader::sync`] once per frame after
//! [`InstanceRegistry::flush`]. Only buffers flagged for upload are written,
//! and GPU buffers of groups that no longer exist are released.

use rustc_hash::FxHashMap;

use super::dynamic_buffer::DynamicBuffer;
use crate::instancing::{
    GroupBuffers, InstanceAttribute, InstanceRegistry, COLOR_FLOATS,
};

/// Floats per color on the GPU: rgb plus one padding float, matching the
/// 16-byte stride of `array<vec3<f32>>` in a storage buffer.
pub const GPU_COLOR_FLOATS: usize = 4;

/// GPU copies of one group's buffers.
pub struct GpuInstanceGroup {
    transforms: DynamicBuffer,
    colors: Option<DynamicBuffer>,
    instance_count: u32,
}

/// Usage for per-instance data: readable as a storage buffer or as an
/// instance-step vertex buffer.
const INSTANCE_USAGE: wgpu::BufferUsages =
    wgpu::BufferUsages::STORAGE.union(wgpu::BufferUsages::VERTEX);

impl GpuInstanceGroup {
    fn new(
        device: &wgpu::Device,
        group_id: &str,
        buffers: &GroupBuffers,
    ) -> Self {
        let transforms = DynamicBuffer::new(
            device,
            &format!("{group_id} Instance Transforms"),
            buffers.transforms.byte_len(),
            INSTANCE_USAGE,
        );
        let colors = buffers
            .colors
            .as_ref()
            .map(|colors| color_buffer(device, group_id, colors));
        Self {
            transforms,
            colors,
            instance_count: 0,
        }
    }

    /// Write every flagged attribute. Returns `true` if any GPU buffer was
    /// (re)allocated, so bind groups referencing it need recreation.
    fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        group_id: &str,
        buffers: &GroupBuffers,
    ) -> bool {
        let mut reallocated = upload_attribute(
            &mut self.transforms,
            device,
            queue,
            &buffers.transforms,
        );

        if let Some(cpu) = &buffers.colors {
            if let Some(gpu) = &mut self.colors {
                reallocated |= upload_colors(gpu, device, queue, cpu);
            } else {
                // Group was replaced by one with a color-capable material.
                let mut fresh = color_buffer(device, group_id, cpu);
                let _ = upload_colors(&mut fresh, device, queue, cpu);
                self.colors = Some(fresh);
                reallocated = true;
            }
        } else if self.colors.take().is_some() {
            reallocated = true;
        }

        self.instance_count =
            u32::try_from(buffers.active_count).unwrap_or(u32::MAX);
        reallocated
    }

    /// Transform storage buffer (16 floats per instance).
    #[must_use]
    pub fn transforms(&self) -> &wgpu::Buffer {
        self.transforms.buffer()
    }

    /// Color storage buffer, if the group has one. Each instance takes
    /// [`GPU_COLOR_FLOATS`] floats (rgb, then 1.0), so shaders can read it
    /// as `array<vec3<f32>>` or `array<vec4<f32>>`.
    #[must_use]
    pub fn colors(&self) -> Option<&wgpu::Buffer> {
        self.colors.as_ref().map(DynamicBuffer::buffer)
    }

    /// Instance count for this group's draw call.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }
}

fn color_buffer(
    device: &wgpu::Device,
    group_id: &str,
    colors: &InstanceAttribute,
) -> DynamicBuffer {
    DynamicBuffer::new(
        device,
        &format!("{group_id} Instance Colors"),
        colors.count() * GPU_COLOR_FLOATS * size_of::<f32>(),
        INSTANCE_USAGE,
    )
}

fn upload_attribute(
    gpu: &mut DynamicBuffer,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    attribute: &InstanceAttribute,
) -> bool {
    if !attribute.needs_upload() {
        return false;
    }
    log::trace!(
        "Uploading {} bytes (version {})",
        attribute.byte_len(),
        attribute.version()
    );
    gpu.write_bytes(device, queue, attribute.as_bytes())
}

/// Like [`upload_attribute`], widening each rgb slot to four floats.
fn upload_colors(
    gpu: &mut DynamicBuffer,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    colors: &InstanceAttribute,
) -> bool {
    if !colors.needs_upload() {
        return false;
    }
    let padded = padded_colors(colors);
    log::trace!(
        "Uploading {} colors (version {})",
        padded.len(),
        colors.version()
    );
    gpu.write_bytes(device, queue, bytemuck::cast_slice(&padded))
}

fn padded_colors(colors: &InstanceAttribute) -> Vec<[f32; GPU_COLOR_FLOATS]> {
    colors
        .as_slice()
        .chunks_exact(COLOR_FLOATS)
        .map(|c| [c[0], c[1], c[2], 1.0])
        .collect()
}

/// Counters from one [`InstanceUploader::sync`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Groups whose buffers were written.
    pub groups_uploaded: usize,
    /// Groups whose GPU buffers were reallocated.
    pub reallocated: usize,
    /// GPU groups released because the registry dropped them.
    pub released: usize,
}

/// Owns the wgpu buffers for every registry group.
#[derive(Default)]
pub struct InstanceUploader {
    groups: FxHashMap<String, GpuInstanceGroup>,
}

impl InstanceUploader {
    /// Uploader with no GPU buffers yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload flagged buffers, clear their flags, and release GPU buffers of
    /// removed groups.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        registry: &mut InstanceRegistry,
    ) -> UploadReport {
        let mut report = UploadReport::default();

        let before = self.groups.len();
        self.groups.retain(|id, _| registry.contains_group(id));
        report.released = before - self.groups.len();

        for (group_id, buffers) in registry.pending_uploads() {
            let gpu =
                self.groups.entry(group_id.to_owned()).or_insert_with(|| {
                    GpuInstanceGroup::new(device, group_id, buffers)
                });
            if gpu.upload(device, queue, group_id, buffers) {
                report.reallocated += 1;
            }
            buffers.mark_uploaded();
            report.groups_uploaded += 1;
        }

        if report.groups_uploaded > 0 || report.released > 0 {
            log::debug!(
                "Instance upload: {} groups written, {} reallocated, {} \
                 released",
                report.groups_uploaded,
                report.reallocated,
                report.released
            );
        }
        report
    }

    /// GPU buffers for a group, if it has been uploaded at least once.
    #[must_use]
    pub fn group(&self, group_id: &str) -> Option<&GpuInstanceGroup> {
        self.groups.get(group_id)
    }

    /// Groups with GPU buffers, for issuing one draw call each.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &GpuInstanceGroup)> {
        self.groups.iter().map(|(id, group)| (id.as_str(), group))
    }

    /// GPU buffer sizes: `(label, used_bytes, allocated_bytes)`.
    #[must_use]
    pub fn buffer_info(&self) -> Vec<(String, usize, usize)> {
        let mut info = Vec::new();
        for (id, group) in &self.groups {
            info.push((
                format!("{id} transforms"),
                group.transforms.len(),
                group.transforms.capacity(),
            ));
            if let Some(colors) = &group.colors {
                info.push((
                    format!("{id} colors"),
                    colors.len(),
                    colors.capacity(),
                ));
            }
        }
        info.sort_by(|a, b| a.0.cmp(&b.0));
        info
    }
}
