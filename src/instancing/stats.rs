//! Read-only aggregation over all groups: draw calls, vertices, memory.

use serde::Serialize;

use super::group::{InstanceGroup, COLOR_FLOATS, TRANSFORM_FLOATS};

const FLOAT_BYTES: usize = size_of::<f32>();

/// Registry-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Number of groups.
    pub groups: usize,
    /// Live instances across all groups.
    pub total_instances: usize,
    /// One per group.
    pub draw_calls: usize,
    /// Geometry vertex count times live instances, summed over groups.
    pub estimated_vertices: usize,
    /// Instance buffers (by capacity) plus each group's shared geometry.
    pub estimated_memory_bytes: usize,
}

/// Bytes held by one group: the transform buffer, the color buffer when
/// present, and the shared geometry counted once.
#[must_use]
pub fn estimate_group_memory(group: &InstanceGroup) -> usize {
    let capacity = group.capacity();
    let transforms = capacity * TRANSFORM_FLOATS * FLOAT_BYTES;
    let colors = if group.has_instance_color() {
        capacity * COLOR_FLOATS * FLOAT_BYTES
    } else {
        0
    };
    transforms + colors + group.config().geometry.byte_length()
}

/// Vertices submitted for one group.
#[must_use]
pub fn estimate_group_vertices(group: &InstanceGroup) -> usize {
    group.config().geometry.vertex_count() * group.len()
}

/// Fold every group into a [`RegistryStats`].
pub(crate) fn collect<'a>(
    groups: impl IntoIterator<Item = &'a InstanceGroup>,
) -> RegistryStats {
    groups
        .into_iter()
        .fold(RegistryStats::default(), |mut stats, group| {
            stats.groups += 1;
            stats.draw_calls += 1;
            stats.total_instances += group.len();
            stats.estimated_vertices += estimate_group_vertices(group);
            stats.estimated_memory_bytes += estimate_group_memory(group);
            stats
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::instancing::group::GroupConfig;
    use crate::resources::{GeometryInfo, MaterialInfo};

    #[test]
    fn memory_counts_buffers_by_capacity() {
        let geometry = GeometryInfo::with_stride("quad", 4, 12);
        let plain = InstanceGroup::new(
            "plain".into(),
            GroupConfig::new(
                Arc::new(geometry.clone()),
                Arc::new(MaterialInfo::uniform("m")),
                10,
            ),
            [1.0; 3],
        );
        assert_eq!(estimate_group_memory(&plain), 10 * 64 + 48);

        let colored = InstanceGroup::new(
            "colored".into(),
            GroupConfig::new(
                Arc::new(geometry),
                Arc::new(MaterialInfo::colored("m")),
                10,
            ),
            [1.0; 3],
        );
        assert_eq!(estimate_group_memory(&colored), 10 * 64 + 10 * 12 + 48);

        let stats = collect([&plain, &colored]);
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.total_instances, 0);
        assert_eq!(stats.estimated_vertices, 0);
        assert_eq!(
            stats.estimated_memory_bytes,
            estimate_group_memory(&plain) + estimate_group_memory(&colored)
        );
    }

    #[test]
    fn empty_registry_is_all_zero() {
        assert_eq!(collect(std::iter::empty()), RegistryStats::default());
    }
}
