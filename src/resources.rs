//! Rendering-engine resources referenced by instance groups.
//!
//! Geometry and materials are owned by the host's rendering engine. A group
//! only holds shared references to them and queries two things: the size of
//! the geometry (for stats) and whether the material can take a per-instance
//! color.

/// Shared geometry as seen by the batching layer.
pub trait Geometry: Send + Sync {
    /// Number of vertices in one copy of the geometry.
    fn vertex_count(&self) -> usize;

    /// Total byte length of the geometry's own attribute buffers.
    fn byte_length(&self) -> usize;

    /// Human-readable name for diagnostics.
    fn label(&self) -> &str {
        "geometry"
    }
}

/// Shared material as seen by the batching layer.
pub trait Material: Send + Sync {
    /// Whether shaders built from this material read a per-instance color.
    fn supports_instance_color(&self) -> bool;

    /// Human-readable name for diagnostics.
    fn label(&self) -> &str {
        "material"
    }
}

// ---------------------------------------------------------------------------
// Plain descriptors
// ---------------------------------------------------------------------------

/// Geometry descriptor for hosts that only need to report sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryInfo {
    /// Debug name.
    pub label: String,
    /// Vertices per copy.
    pub vertex_count: usize,
    /// Bytes across all vertex/index attributes.
    pub byte_length: usize,
}

impl GeometryInfo {
    /// Descriptor whose byte length is derived from a per-vertex stride.
    #[must_use]
    pub fn with_stride(
        label: impl Into<String>,
        vertex_count: usize,
        bytes_per_vertex: usize,
    ) -> Self {
        Self {
            label: label.into(),
            vertex_count,
            byte_length: vertex_count * bytes_per_vertex,
        }
    }

    /// Position + normal + uv (8 floats per vertex), non-indexed.
    #[must_use]
    pub fn standard(label: impl Into<String>, vertex_count: usize) -> Self {
        Self::with_stride(label, vertex_count, 8 * 4)
    }
}

impl Geometry for GeometryInfo {
    fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    fn byte_length(&self) -> usize {
        self.byte_length
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Material descriptor with its capabilities fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialInfo {
    /// Debug name.
    pub label: String,
    /// Per-instance color support.
    pub instance_color: bool,
}

impl MaterialInfo {
    /// Material that reads per-instance colors.
    #[must_use]
    pub fn colored(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instance_color: true,
        }
    }

    /// Material that ignores per-instance colors.
    #[must_use]
    pub fn uniform(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instance_color: false,
        }
    }
}

impl Material for MaterialInfo {
    fn supports_instance_color(&self) -> bool {
        self.instance_color
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_geometry_counts_eight_floats_per_vertex() {
        let cube = GeometryInfo::standard("cube", 24);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.byte_length(), 24 * 32);
        assert_eq!(Geometry::label(&cube), "cube");
    }

    #[test]
    fn material_capability_is_a_flag() {
        assert!(MaterialInfo::colored("lambert").supports_instance_color());
        assert!(!MaterialInfo::uniform("line").supports_instance_color());
    }
}
