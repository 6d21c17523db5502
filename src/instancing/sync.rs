//! Batch synchronizer: rebuilds a group's dense buffers from its instance
//! list.
//!
//! A dirty group is always resynchronized in full. There is no per-slot
//! diffing; the whole transform buffer is rewritten and flagged for upload.

use super::group::{GroupBuffers, InstanceStore};
use super::object::ZERO_SCALE_TRANSFORM;

/// Rewrite `buffers` from `store`.
///
/// - slot `i < len` gets instance `i`'s transform, or the zero-scale
///   transform when the instance is hidden;
/// - when the group has a color buffer, slot `i` gets instance `i`'s color,
///   or `default_color` when the instance has none;
/// - slots `len..capacity` are reset to zero scale;
/// - `active_count` becomes `len` and both buffers are flagged for upload.
///
/// Returns the number of transform slots written.
pub fn synchronize(
    store: &InstanceStore,
    buffers: &mut GroupBuffers,
    default_color: [f32; 3],
) -> usize {
    let capacity = buffers.transforms.count();
    let live = store.len().min(capacity);

    for (slot, instance) in store.as_slice().iter().take(live).enumerate() {
        let matrix = instance.render_transform().to_cols_array();
        let _ = buffers.transforms.set_slot(slot, &matrix);

        if let Some(colors) = buffers.colors.as_mut() {
            let color = instance.color.unwrap_or(default_color);
            let _ = colors.set_slot(slot, &color);
        }
    }

    let zero = ZERO_SCALE_TRANSFORM.to_cols_array();
    for slot in live..capacity {
        let _ = buffers.transforms.set_slot(slot, &zero);
    }

    buffers.active_count = live;
    buffers.transforms.mark_needs_upload();
    if let Some(colors) = &mut buffers.colors {
        colors.mark_needs_upload();
    }

    capacity
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Mat4, Vec3};

    use super::*;
    use crate::instancing::group::GroupConfig;
    use crate::instancing::object::InstancedObject;
    use crate::resources::{GeometryInfo, MaterialInfo};

    const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

    fn buffers(capacity: usize, colored: bool) -> GroupBuffers {
        let material = if colored {
            MaterialInfo::colored("m")
        } else {
            MaterialInfo::uniform("m")
        };
        let config = GroupConfig::new(
            Arc::new(GeometryInfo::standard("g", 8)),
            Arc::new(material),
            capacity,
        );
        GroupBuffers::allocate(&config, WHITE)
    }

    fn at(id: &str, x: f32) -> InstancedObject {
        InstancedObject::new(id).with_position(Vec3::new(x, 0.0, 0.0))
    }

    fn slot_matrix(buffers: &GroupBuffers, slot: usize) -> Mat4 {
        Mat4::from_cols_slice(buffers.transforms.slot(slot).unwrap())
    }

    #[test]
    fn writes_live_slots_in_list_order() {
        let mut store = InstanceStore::default();
        let _ = store.push(at("a", 1.0));
        let _ = store.push(at("b", 2.0));
        let mut buffers = buffers(4, false);

        let written = synchronize(&store, &mut buffers, WHITE);

        assert_eq!(written, 4);
        assert_eq!(buffers.active_count, 2);
        assert_eq!(slot_matrix(&buffers, 0), at("a", 1.0).transform());
        assert_eq!(slot_matrix(&buffers, 1), at("b", 2.0).transform());
        assert_eq!(slot_matrix(&buffers, 2), ZERO_SCALE_TRANSFORM);
        assert!(buffers.transforms.needs_upload());
    }

    #[test]
    fn shrinking_list_clears_the_tail() {
        let mut store = InstanceStore::default();
        for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
            let _ = store.push(at(id, i as f32 + 1.0));
        }
        let mut buffers = buffers(3, false);
        let _ = synchronize(&store, &mut buffers, WHITE);

        let _ = store.remove("a");
        let _ = store.remove("b");
        let _ = synchronize(&store, &mut buffers, WHITE);

        assert_eq!(buffers.active_count, 1);
        assert_eq!(slot_matrix(&buffers, 0), at("c", 3.0).transform());
        assert_eq!(slot_matrix(&buffers, 1), ZERO_SCALE_TRANSFORM);
        assert_eq!(slot_matrix(&buffers, 2), ZERO_SCALE_TRANSFORM);
    }

    #[test]
    fn hidden_instance_keeps_its_slot() {
        let mut store = InstanceStore::default();
        let _ = store.push(at("a", 1.0));
        let _ = store.push(at("b", 2.0).with_visible(false));
        let _ = store.push(at("c", 3.0));
        let mut buffers = buffers(3, false);

        let _ = synchronize(&store, &mut buffers, WHITE);

        assert_eq!(buffers.active_count, 3);
        assert_eq!(slot_matrix(&buffers, 1), ZERO_SCALE_TRANSFORM);
        assert_eq!(slot_matrix(&buffers, 2), at("c", 3.0).transform());
    }

    #[test]
    fn unset_colors_use_the_default() {
        let mut store = InstanceStore::default();
        let _ = store.push(at("a", 0.0).with_color([1.0, 0.0, 0.0]));
        let _ = store.push(at("b", 0.0));
        let mut buffers = buffers(2, true);

        let _ = synchronize(&store, &mut buffers, WHITE);

        let colors = buffers.colors.as_ref().unwrap();
        assert_eq!(colors.slot(0), Some(&[1.0, 0.0, 0.0][..]));
        assert_eq!(colors.slot(1), Some(&[1.0, 1.0, 1.0][..]));
        assert!(colors.needs_upload());
    }

    #[test]
    fn shifted_uncolored_instance_drops_previous_color() {
        let mut store = InstanceStore::default();
        let _ = store.push(at("a", 0.0).with_color([1.0, 0.0, 0.0]));
        let _ = store.push(at("b", 1.0));
        let mut buffers = buffers(2, true);
        let _ = synchronize(&store, &mut buffers, WHITE);

        let _ = store.remove("a");
        let _ = synchronize(&store, &mut buffers, [0.5, 0.5, 0.5]);

        let colors = buffers.colors.as_ref().unwrap();
        assert_eq!(colors.slot(0), Some(&[0.5, 0.5, 0.5][..]));
        assert_eq!(slot_matrix(&buffers, 0), at("b", 1.0).transform());
    }

    #[test]
    fn cleared_color_falls_back_to_default() {
        let mut store = InstanceStore::default();
        let _ = store.push(at("a", 0.0).with_color([0.0, 0.0, 1.0]));
        let mut buffers = buffers(1, true);
        let _ = synchronize(&store, &mut buffers, WHITE);

        if let Some(record) = store.get_mut("a") {
            record.color = None;
        }
        let _ = synchronize(&store, &mut buffers, WHITE);

        let colors = buffers.colors.as_ref().unwrap();
        assert_eq!(colors.slot(0), Some(&WHITE[..]));
    }

    #[test]
    fn colors_ignored_without_color_buffer() {
        let mut store = InstanceStore::default();
        let _ = store.push(at("a", 0.0).with_color([0.0, 1.0, 0.0]));
        let mut buffers = buffers(1, false);

        let _ = synchronize(&store, &mut buffers, WHITE);

        assert!(buffers.colors.is_none());
        assert_eq!(buffers.active_count, 1);
    }
}
