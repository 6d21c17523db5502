use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::attribute::{BufferUsage, InstanceAttribute};
use super::object::{InstancedObject, ZERO_SCALE_TRANSFORM};
use crate::resources::{Geometry, Material};

/// Floats per transform slot (column-major 4x4).
pub const TRANSFORM_FLOATS: usize = 16;
/// Floats per color slot (RGB).
pub const COLOR_FLOATS: usize = 3;

// ---------------------------------------------------------------------------
// GroupConfig
// ---------------------------------------------------------------------------

/// Settings fixed when a group is created.
#[derive(Clone)]
pub struct GroupConfig {
    /// Geometry shared by every instance.
    pub geometry: Arc<dyn Geometry>,
    /// Material shared by every instance.
    pub material: Arc<dyn Material>,
    /// Maximum number of instances; also the buffer slot count.
    pub capacity: usize,
    /// Tag buffers as frequently updated.
    pub dynamic: bool,
}

impl GroupConfig {
    /// Static group with the given capacity.
    pub fn new(
        geometry: Arc<dyn Geometry>,
        material: Arc<dyn Material>,
        capacity: usize,
    ) -> Self {
        Self {
            geometry,
            material,
            capacity,
            dynamic: false,
        }
    }

    /// Mark the group's buffers as frequently updated.
    #[must_use]
    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    fn usage(&self) -> BufferUsage {
        if self.dynamic {
            BufferUsage::Dynamic
        } else {
            BufferUsage::Static
        }
    }
}

impl fmt::Debug for GroupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupConfig")
            .field("geometry", &self.geometry.label())
            .field("material", &self.material.label())
            .field("capacity", &self.capacity)
            .field("dynamic", &self.dynamic)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// InstanceStore
// ---------------------------------------------------------------------------

/// Ordered instance list with an ID-to-slot index.
///
/// List position is the buffer slot. Removing shifts every later instance
/// down by one and the index is rewritten for the shifted tail.
#[derive(Debug, Clone, Default)]
pub struct InstanceStore {
    instances: Vec<InstancedObject>,
    slots: FxHashMap<String, usize>,
}

impl InstanceStore {
    /// Empty store with room for `capacity` instances.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
            slots: FxHashMap::with_capacity_and_hasher(
                capacity,
                Default::default(),
            ),
        }
    }

    /// Number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances in slot order.
    #[must_use]
    pub fn as_slice(&self) -> &[InstancedObject] {
        &self.instances
    }

    /// Slot of the instance with `id`.
    #[must_use]
    pub fn slot_of(&self, id: &str) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Instance with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&InstancedObject> {
        self.slot_of(id).map(|slot| &self.instances[slot])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut InstancedObject> {
        let slot = self.slot_of(id)?;
        self.instances.get_mut(slot)
    }

    /// Append and return the assigned slot. The caller checks capacity and
    /// uniqueness first.
    pub(crate) fn push(&mut self, instance: InstancedObject) -> usize {
        let slot = self.instances.len();
        let _ = self.slots.insert(instance.id.clone(), slot);
        self.instances.push(instance);
        slot
    }

    /// Remove by ID, shifting later instances down one slot.
    pub(crate) fn remove(&mut self, id: &str) -> Option<InstancedObject> {
        let slot = self.slots.remove(id)?;
        let removed = self.instances.remove(slot);
        for shifted in &self.instances[slot..] {
            if let Some(s) = self.slots.get_mut(&shifted.id) {
                *s -= 1;
            }
        }
        Some(removed)
    }

    pub(crate) fn clear(&mut self) {
        self.instances.clear();
        self.slots.clear();
    }
}

// ---------------------------------------------------------------------------
// GroupBuffers
// ---------------------------------------------------------------------------

/// Dense GPU-facing buffers of one group.
#[derive(Debug, Clone)]
pub struct GroupBuffers {
    /// One 4x4 matrix per slot.
    pub transforms: InstanceAttribute,
    /// One RGB per slot, present only for color-capable materials.
    pub colors: Option<InstanceAttribute>,
    /// Instances the renderer should draw, set on flush.
    pub active_count: usize,
}

impl GroupBuffers {
    /// Allocate buffers for `config`. Every transform slot starts at zero
    /// scale so fresh capacity never draws.
    #[must_use]
    pub fn allocate(config: &GroupConfig, initial_color: [f32; 3]) -> Self {
        let usage = config.usage();
        let transforms = InstanceAttribute::filled(
            config.capacity,
            &ZERO_SCALE_TRANSFORM.to_cols_array(),
            usage,
        );
        let colors = config.material.supports_instance_color().then(|| {
            InstanceAttribute::filled(config.capacity, &initial_color, usage)
        });
        Self {
            transforms,
            colors,
            active_count: 0,
        }
    }

    /// Whether either buffer is waiting for upload.
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.transforms.needs_upload()
            || self.colors.as_ref().is_some_and(InstanceAttribute::needs_upload)
    }

    /// Clear the upload flag on both buffers.
    pub fn mark_uploaded(&mut self) {
        self.transforms.mark_uploaded();
        if let Some(colors) = &mut self.colors {
            colors.mark_uploaded();
        }
    }

    pub(crate) fn dispose(&mut self) {
        self.transforms.dispose();
        if let Some(colors) = &mut self.colors {
            colors.dispose();
        }
        self.active_count = 0;
    }
}

// ---------------------------------------------------------------------------
// InstanceGroup
// ---------------------------------------------------------------------------

/// One batch: shared geometry/material, its instances, and its buffers.
#[derive(Debug, Clone)]
pub struct InstanceGroup {
    id: String,
    config: GroupConfig,
    pub(crate) store: InstanceStore,
    pub(crate) buffers: GroupBuffers,
}

impl InstanceGroup {
    pub(crate) fn new(
        id: String,
        config: GroupConfig,
        initial_color: [f32; 3],
    ) -> Self {
        let buffers = GroupBuffers::allocate(&config, initial_color);
        let store = InstanceStore::with_capacity(config.capacity);
        Self {
            id,
            config,
            store,
            buffers,
        }
    }

    /// Group identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation-time configuration.
    #[must_use]
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Maximum instance count.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of live instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the group has no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Whether another instance fits.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.store.len() >= self.config.capacity
    }

    /// The instance list.
    #[must_use]
    pub fn instances(&self) -> &InstanceStore {
        &self.store
    }

    /// The dense buffers as of the last flush.
    #[must_use]
    pub fn buffers(&self) -> &GroupBuffers {
        &self.buffers
    }

    /// Whether the group carries a per-instance color buffer.
    #[must_use]
    pub fn has_instance_color(&self) -> bool {
        self.buffers.colors.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{GeometryInfo, MaterialInfo};

    fn config(capacity: usize, colored: bool) -> GroupConfig {
        let material = if colored {
            MaterialInfo::colored("m")
        } else {
            MaterialInfo::uniform("m")
        };
        GroupConfig::new(
            Arc::new(GeometryInfo::standard("g", 24)),
            Arc::new(material),
            capacity,
        )
    }

    #[test]
    fn store_reindexes_after_removal() {
        let mut store = InstanceStore::default();
        for id in ["a", "b", "c", "d"] {
            let _ = store.push(InstancedObject::new(id));
        }
        let removed = store.remove("b").unwrap();
        assert_eq!(removed.id, "b");
        assert_eq!(store.slot_of("a"), Some(0));
        assert_eq!(store.slot_of("c"), Some(1));
        assert_eq!(store.slot_of("d"), Some(2));
        assert_eq!(store.slot_of("b"), None);
        assert_eq!(store.get("d").map(|o| o.id.as_str()), Some("d"));
        assert!(store.remove("b").is_none());
    }

    #[test]
    fn color_buffer_follows_material_capability() {
        let plain = GroupBuffers::allocate(&config(4, false), [1.0; 3]);
        assert!(plain.colors.is_none());

        let colored = GroupBuffers::allocate(&config(4, true), [0.5; 3]);
        let colors = colored.colors.as_ref().unwrap();
        assert_eq!(colors.count(), 4);
        assert_eq!(colors.slot(3), Some(&[0.5, 0.5, 0.5][..]));
    }

    #[test]
    fn fresh_transforms_are_zero_scale() {
        let buffers = GroupBuffers::allocate(&config(2, false), [1.0; 3]);
        let zero = ZERO_SCALE_TRANSFORM.to_cols_array();
        assert_eq!(buffers.transforms.slot(0), Some(&zero[..]));
        assert_eq!(buffers.transforms.slot(1), Some(&zero[..]));
        assert!(!buffers.needs_upload());
    }

    #[test]
    fn dynamic_hint_reaches_both_buffers() {
        let buffers =
            GroupBuffers::allocate(&config(2, true).dynamic(true), [1.0; 3]);
        assert_eq!(buffers.transforms.usage(), BufferUsage::Dynamic);
        assert_eq!(
            buffers.colors.as_ref().map(InstanceAttribute::usage),
            Some(BufferUsage::Dynamic)
        );
    }
}
