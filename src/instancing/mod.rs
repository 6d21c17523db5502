//! Instance registry: groups of drawables that share geometry and material,
//! batched into one draw call per group.
//!
//! Callers create a group, then add, update and remove instances between
//! frames. Mutations only touch the sparse instance list and mark the group
//! dirty; once per render tick [`InstanceRegistry::flush`] rebuilds the dense
//! buffers of every dirty group, and the render loop uploads whatever is
//! flagged.

mod attribute;
mod group;
mod object;
mod shared;
mod stats;
pub mod sync;

pub use attribute::{BufferUsage, InstanceAttribute};
pub use group::{
    GroupBuffers, GroupConfig, InstanceGroup, InstanceStore, COLOR_FLOATS,
    TRANSFORM_FLOATS,
};
pub use object::{InstancePatch, InstancedObject, ZERO_SCALE_TRANSFORM};
use rustc_hash::{FxHashMap, FxHashSet};
pub use shared::SharedRegistry;
pub use stats::{
    estimate_group_memory, estimate_group_vertices, RegistryStats,
};
use web_time::{Duration, Instant};

use crate::error::InstancingError;
use crate::options::{DuplicatePolicy, RegistryOptions};

// ---------------------------------------------------------------------------
// FlushReport
// ---------------------------------------------------------------------------

/// Summary of the most recent flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Dirty groups that were resynchronized.
    pub groups_synced: usize,
    /// Transform slots rewritten across those groups.
    pub slots_written: usize,
    /// Wall time spent in the flush.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// InstanceRegistry
// ---------------------------------------------------------------------------

/// Owns every instance group and the set of groups awaiting a flush.
///
/// The registry is a plain value: the host creates it, passes it to whoever
/// needs it, and drops or [`cleanup`](Self::cleanup)s it. Wrap it in a
/// [`SharedRegistry`] to use it from several threads.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    groups: FxHashMap<String, InstanceGroup>,
    dirty: FxHashSet<String>,
    options: RegistryOptions,
    last_flush: FlushReport,
}

impl InstanceRegistry {
    /// Empty registry with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry with the given options.
    #[must_use]
    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Replace the options. Existing buffers are not reallocated.
    pub fn set_options(&mut self, options: RegistryOptions) {
        self.options = options;
    }

    // -- Group lifecycle --

    /// Create a group and allocate its buffers.
    ///
    /// A group already registered under `group_id` is disposed and replaced.
    pub fn create_group(
        &mut self,
        group_id: impl Into<String>,
        config: GroupConfig,
    ) -> &InstanceGroup {
        let group_id = group_id.into();
        if let Some(mut previous) = self.groups.remove(&group_id) {
            previous.buffers.dispose();
            let _ = self.dirty.remove(&group_id);
            if self.options.warn_on_group_replace {
                log::warn!(
                    "Replacing instance group '{group_id}' ({} instances \
                     discarded)",
                    previous.len()
                );
            }
        }

        log::info!(
            "Created instance group '{group_id}': {} x '{}' / '{}'{}",
            config.capacity,
            config.geometry.label(),
            config.material.label(),
            if config.material.supports_instance_color() {
                " with instance color"
            } else {
                ""
            }
        );

        let group = InstanceGroup::new(
            group_id.clone(),
            config,
            self.options.initial_color,
        );
        self.groups.entry(group_id).or_insert(group)
    }

    /// Dispose one group's buffers and forget it. Returns `false` if no such
    /// group exists.
    pub fn remove_group(&mut self, group_id: &str) -> bool {
        let Some(mut group) = self.groups.remove(group_id) else {
            log::warn!("{}", InstancingError::GroupNotFound(group_id.into()));
            return false;
        };
        group.buffers.dispose();
        let _ = self.dirty.remove(group_id);
        log::info!("Removed instance group '{group_id}'");
        true
    }

    /// Dispose every group and clear all bookkeeping. Safe to call on an
    /// empty registry.
    pub fn cleanup(&mut self) {
        if self.groups.is_empty() && self.dirty.is_empty() {
            return;
        }
        for group in self.groups.values_mut() {
            group.buffers.dispose();
            group.store.clear();
        }
        log::info!("Disposed {} instance groups", self.groups.len());
        self.groups.clear();
        self.dirty.clear();
    }

    // -- Instance CRUD --

    /// Append an instance to a group. Returns `false` (and logs why) if the
    /// group is missing, full, or already holds the ID under
    /// [`DuplicatePolicy::Reject`].
    pub fn add_instance(
        &mut self,
        group_id: &str,
        instance: InstancedObject,
    ) -> bool {
        log_failure(self.try_add_instance(group_id, instance))
    }

    /// [`add_instance`](Self::add_instance) returning the assigned slot.
    ///
    /// # Errors
    ///
    /// [`InstancingError::GroupNotFound`], [`InstancingError::CapacityExceeded`]
    /// when the group is full, or [`InstancingError::DuplicateInstance`] when
    /// the ID exists and duplicates are rejected.
    pub fn try_add_instance(
        &mut self,
        group_id: &str,
        instance: InstancedObject,
    ) -> Result<usize, InstancingError> {
        let policy = self.options.duplicate_instances;
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| InstancingError::GroupNotFound(group_id.into()))?;

        let slot = if let Some(existing) = group.store.slot_of(&instance.id) {
            if policy == DuplicatePolicy::Reject {
                return Err(InstancingError::DuplicateInstance {
                    group: group_id.into(),
                    instance: instance.id,
                });
            }
            if let Some(record) = group.store.get_mut(&instance.id) {
                *record = instance;
            }
            existing
        } else {
            if group.is_full() {
                return Err(InstancingError::CapacityExceeded {
                    group: group_id.into(),
                    capacity: group.capacity(),
                });
            }
            group.store.push(instance)
        };

        self.mark_dirty(group_id);
        Ok(slot)
    }

    /// Merge `patch` into an existing instance, keeping its slot. Returns
    /// `false` (and logs why) if the group or instance is missing.
    pub fn update_instance(
        &mut self,
        group_id: &str,
        instance_id: &str,
        patch: InstancePatch,
    ) -> bool {
        log_failure(self.try_update_instance(group_id, instance_id, patch))
    }

    /// [`update_instance`](Self::update_instance) returning the slot.
    ///
    /// # Errors
    ///
    /// [`InstancingError::GroupNotFound`] or
    /// [`InstancingError::InstanceNotFound`].
    pub fn try_update_instance(
        &mut self,
        group_id: &str,
        instance_id: &str,
        patch: InstancePatch,
    ) -> Result<usize, InstancingError> {
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| InstancingError::GroupNotFound(group_id.into()))?;
        let slot = group.store.slot_of(instance_id).ok_or_else(|| {
            InstancingError::InstanceNotFound {
                group: group_id.into(),
                instance: instance_id.into(),
            }
        })?;
        if let Some(record) = group.store.get_mut(instance_id) {
            record.apply(patch);
        }
        self.mark_dirty(group_id);
        Ok(slot)
    }

    /// Remove an instance; later instances move down one slot. Returns
    /// `false` (and logs why) if the group or instance is missing.
    pub fn remove_instance(&mut self, group_id: &str, instance_id: &str) -> bool {
        log_failure(self.try_remove_instance(group_id, instance_id))
    }

    /// [`remove_instance`](Self::remove_instance) returning the removed
    /// record.
    ///
    /// # Errors
    ///
    /// [`InstancingError::GroupNotFound`] or
    /// [`InstancingError::InstanceNotFound`].
    pub fn try_remove_instance(
        &mut self,
        group_id: &str,
        instance_id: &str,
    ) -> Result<InstancedObject, InstancingError> {
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| InstancingError::GroupNotFound(group_id.into()))?;
        let removed = group.store.remove(instance_id).ok_or_else(|| {
            InstancingError::InstanceNotFound {
                group: group_id.into(),
                instance: instance_id.into(),
            }
        })?;
        self.mark_dirty(group_id);
        Ok(removed)
    }

    // -- Synchronization --

    fn mark_dirty(&mut self, group_id: &str) {
        if !self.dirty.contains(group_id) {
            let _ = self.dirty.insert(group_id.to_owned());
        }
    }

    /// Rebuild the buffers of every dirty group and clear the dirty set.
    /// Call once per render tick, before drawing.
    pub fn flush(&mut self) {
        let start = Instant::now();
        let mut report = FlushReport::default();
        let default_color = self.options.initial_color;

        for group_id in self.dirty.drain() {
            let Some(group) = self.groups.get_mut(&group_id) else {
                continue;
            };
            report.slots_written += sync::synchronize(
                &group.store,
                &mut group.buffers,
                default_color,
            );
            report.groups_synced += 1;
        }

        report.elapsed = start.elapsed();
        if report.groups_synced > 0 {
            log::debug!(
                "Flushed {} instance groups ({} slots) in {:?}",
                report.groups_synced,
                report.slots_written,
                report.elapsed
            );
        }
        self.last_flush = report;
    }

    /// Mark every group dirty, then [`flush`](Self::flush).
    pub fn force_flush(&mut self) {
        self.dirty.extend(self.groups.keys().cloned());
        self.flush();
    }

    /// Report from the most recent flush.
    #[must_use]
    pub fn last_flush(&self) -> FlushReport {
        self.last_flush
    }

    /// Whether a group has changes not yet flushed.
    #[must_use]
    pub fn is_dirty(&self, group_id: &str) -> bool {
        self.dirty.contains(group_id)
    }

    /// Number of groups awaiting a flush.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    // -- Read access --

    /// A group by ID.
    #[must_use]
    pub fn group(&self, group_id: &str) -> Option<&InstanceGroup> {
        self.groups.get(group_id)
    }

    /// Whether a group exists.
    #[must_use]
    pub fn contains_group(&self, group_id: &str) -> bool {
        self.groups.contains_key(group_id)
    }

    /// All groups, in no particular order.
    pub fn groups(&self) -> impl Iterator<Item = &InstanceGroup> {
        self.groups.values()
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// An instance by group and instance ID.
    #[must_use]
    pub fn instance(
        &self,
        group_id: &str,
        instance_id: &str,
    ) -> Option<&InstancedObject> {
        self.groups.get(group_id)?.store.get(instance_id)
    }

    /// Buffers waiting for upload, with their group ID. The consumer calls
    /// [`GroupBuffers::mark_uploaded`] after submitting them.
    pub fn pending_uploads(
        &mut self,
    ) -> impl Iterator<Item = (&str, &mut GroupBuffers)> {
        self.groups
            .iter_mut()
            .filter(|(_, group)| group.buffers.needs_upload())
            .map(|(id, group)| (id.as_str(), &mut group.buffers))
    }

    // -- Stats --

    /// Counters over all groups. Cheap enough to call every frame.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        stats::collect(self.groups.values())
    }

    /// Instance buffer sizes: `(label, used_bytes, allocated_bytes)`, where
    /// "used" covers only the live slots.
    #[must_use]
    pub fn buffer_info(&self) -> Vec<(String, usize, usize)> {
        let mut info = Vec::with_capacity(self.groups.len() * 2);
        for group in self.groups.values() {
            let live = group.len();
            let transforms = &group.buffers.transforms;
            info.push((
                format!("{} transforms", group.id()),
                live * TRANSFORM_FLOATS * 4,
                transforms.byte_len(),
            ));
            if let Some(colors) = &group.buffers.colors {
                info.push((
                    format!("{} colors", group.id()),
                    live * COLOR_FLOATS * 4,
                    colors.byte_len(),
                ));
            }
        }
        info.sort_by(|a, b| a.0.cmp(&b.0));
        info
    }
}

/// Collapse a fallible registry call to the bool API, logging the failure.
fn log_failure<T>(result: Result<T, InstancingError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            log::warn!("{e}");
            false
        }
    }
}
