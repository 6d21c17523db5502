use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Transform written for hidden instances and unused capacity.
///
/// Zero scale collapses the geometry to a point, so the slot draws nothing
/// while keeping its place in the buffer.
pub const ZERO_SCALE_TRANSFORM: Mat4 = Mat4::from_cols(
    glam::Vec4::ZERO,
    glam::Vec4::ZERO,
    glam::Vec4::ZERO,
    glam::Vec4::W,
);

/// One logical drawable sharing its group's geometry and material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancedObject {
    /// Identifier, unique within the owning group.
    pub id: String,
    /// World-space translation.
    pub position: Vec3,
    /// XYZ Euler angles in radians.
    pub rotation: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
    /// Per-instance RGB, written only when the material supports it.
    pub color: Option<[f32; 3]>,
    /// Hidden instances keep their slot but render at zero scale.
    pub visible: bool,
    /// Caller data carried along untouched.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl InstancedObject {
    /// Visible instance at the origin with unit scale.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            color: None,
            visible: true,
            payload: serde_json::Value::Null,
        }
    }

    /// Set the position.
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the Euler rotation (radians).
    #[must_use]
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Set the per-instance color.
    #[must_use]
    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = Some(color);
        self
    }

    /// Set visibility.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Attach a caller payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Model matrix from position, rotation and scale.
    #[must_use]
    pub fn transform(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(
            self.scale,
            rotation,
            self.position,
        )
    }

    /// The matrix the synchronizer writes: the model matrix when visible,
    /// [`ZERO_SCALE_TRANSFORM`] otherwise.
    #[must_use]
    pub fn render_transform(&self) -> Mat4 {
        if self.visible {
            self.transform()
        } else {
            ZERO_SCALE_TRANSFORM
        }
    }

    /// Merge `patch` into this record. The ID never changes.
    pub fn apply(&mut self, patch: InstancePatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(scale) = patch.scale {
            self.scale = scale;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        if let Some(payload) = patch.payload {
            self.payload = payload;
        }
    }
}

/// Partial update for an [`InstancedObject`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstancePatch {
    /// New position.
    pub position: Option<Vec3>,
    /// New rotation.
    pub rotation: Option<Vec3>,
    /// New scale.
    pub scale: Option<Vec3>,
    /// `Some(None)` clears the color.
    pub color: Option<Option<[f32; 3]>>,
    /// New visibility.
    pub visible: Option<bool>,
    /// Replacement payload.
    pub payload: Option<serde_json::Value>,
}

impl InstancePatch {
    /// Empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch the position.
    #[must_use]
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Patch the rotation.
    #[must_use]
    pub fn rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Patch the scale.
    #[must_use]
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Patch the color.
    #[must_use]
    pub fn color(mut self, color: [f32; 3]) -> Self {
        self.color = Some(Some(color));
        self
    }

    /// Clear the color.
    #[must_use]
    pub fn clear_color(mut self) -> Self {
        self.color = Some(None);
        self
    }

    /// Patch visibility.
    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Replace the payload.
    #[must_use]
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Patch that overwrites every field of `object` except its ID.
    #[must_use]
    pub fn replacing(object: InstancedObject) -> Self {
        Self {
            position: Some(object.position),
            rotation: Some(object.rotation),
            scale: Some(object.scale),
            color: Some(object.color),
            visible: Some(object.visible),
            payload: Some(object.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn transform_composes_scale_rotation_translation() {
        let obj = InstancedObject::new("a")
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Vec3::new(0.0, 0.0, FRAC_PI_2))
            .with_scale(Vec3::splat(2.0));
        let p = obj.transform().transform_point3(Vec3::X);
        // X scaled to 2, rotated onto +Y, then translated.
        assert!((p - Vec3::new(1.0, 4.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn hidden_instances_render_at_zero_scale() {
        let obj = InstancedObject::new("a")
            .with_position(Vec3::new(5.0, 0.0, 0.0))
            .with_visible(false);
        assert_eq!(obj.render_transform(), ZERO_SCALE_TRANSFORM);
        assert_eq!(
            ZERO_SCALE_TRANSFORM.transform_point3(Vec3::new(9.0, 9.0, 9.0)),
            Vec3::ZERO
        );
    }

    #[test]
    fn patch_merges_only_supplied_fields() {
        let mut obj = InstancedObject::new("a")
            .with_color([1.0, 0.0, 0.0])
            .with_scale(Vec3::splat(3.0));
        obj.apply(InstancePatch::new().position(Vec3::Y).visible(false));
        assert_eq!(obj.id, "a");
        assert_eq!(obj.position, Vec3::Y);
        assert_eq!(obj.scale, Vec3::splat(3.0));
        assert_eq!(obj.color, Some([1.0, 0.0, 0.0]));
        assert!(!obj.visible);

        obj.apply(InstancePatch::new().clear_color());
        assert_eq!(obj.color, None);
    }

    #[test]
    fn replacing_patch_keeps_id() {
        let mut obj = InstancedObject::new("keep");
        let other = InstancedObject::new("other")
            .with_position(Vec3::Z)
            .with_payload(serde_json::json!({ "label": "ptr" }));
        obj.apply(InstancePatch::replacing(other));
        assert_eq!(obj.id, "keep");
        assert_eq!(obj.position, Vec3::Z);
        assert_eq!(obj.payload["label"], "ptr");
    }

    #[test]
    fn deserializes_with_missing_payload() {
        let json = r#"{
            "id": "m1",
            "position": [0.0, 1.0, 0.0],
            "rotation": [0.0, 0.0, 0.0],
            "scale": [1.0, 1.0, 1.0],
            "color": null,
            "visible": true
        }"#;
        let obj: InstancedObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.position, Vec3::Y);
        assert!(obj.payload.is_null());
    }
}
