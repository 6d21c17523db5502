//! GPU resource management utilities.
//!
//! Mirrors the registry's CPU-side instance buffers into wgpu buffers once
//! per frame.

/// Growable GPU buffers with automatic reallocation.
pub mod dynamic_buffer;
/// Per-group wgpu instance buffers fed from the registry.
pub mod instance_upload;

pub use instance_upload::{
    GpuInstanceGroup, InstanceUploader, UploadReport, GPU_COLOR_FLOATS,
};
