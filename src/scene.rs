// scene.rs - the narrow slice of a 3D engine the view adapters depend on

use crate::error::SceneError;
use crate::media::SourceKind;
use crate::stereo::{Eye, UvTransform};
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Monotonic model-load counter. `LoadToken::NONE` means nothing is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LoadToken(pub u64);

impl LoadToken {
    pub const NONE: LoadToken = LoadToken(0);

    pub fn next(self) -> LoadToken {
        LoadToken(self.0 + 1)
    }
}

/// Partial or full UV sphere, angles in degrees (three.js conventions).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereSpec {
    pub radius: f32,
    pub segments_width: u32,
    pub segments_height: u32,
    pub phi_start: f32,
    pub phi_length: f32,
    pub theta_start: f32,
    pub theta_length: f32,
}

impl SphereSpec {
    pub fn full(radius: f32, segments_width: u32, segments_height: u32) -> Self {
        Self {
            radius,
            segments_width,
            segments_height,
            phi_start: 0.0,
            phi_length: 360.0,
            theta_start: 0.0,
            theta_length: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Plane { width: f32, height: f32 },
    Sphere(SphereSpec),
    /// Container whose content arrives through [`Scene::load_model`].
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    /// Euler angles in degrees, applied Y then X then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureSource {
    pub src: String,
    pub kind: SourceKind,
}

impl TextureSource {
    pub fn new(src: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            src: src.into(),
            kind,
        }
    }
}

/// Fragment path for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shading {
    /// Sample at `uv * repeat + offset`.
    #[default]
    Standard,
    /// Hemisphere blackout split, see [`crate::stereo::legacy_sample_u`].
    LegacyHalfTurn { eye: Eye, half_turn: bool },
}

/// Capabilities a rendering layer provides to the view adapters.
///
/// Everything is called from the render-loop thread. `set_uv_transform` and
/// `set_shading` run once per rendered eye and must not allocate.
pub trait Scene {
    fn spawn(&mut self, label: &'static str, geometry: Geometry, pose: Pose) -> EntityId;
    fn set_geometry(&mut self, id: EntityId, geometry: Geometry) -> Result<(), SceneError>;
    fn set_visible(&mut self, id: EntityId, visible: bool) -> Result<(), SceneError>;
    fn set_scale(&mut self, id: EntityId, scale: Vec3) -> Result<(), SceneError>;
    /// Euler degrees, replaces the current rotation.
    fn set_rotation(&mut self, id: EntityId, rotation: Vec3) -> Result<(), SceneError>;
    /// Translation applied to the entity's content before its own scale.
    fn set_content_offset(&mut self, id: EntityId, offset: Vec3) -> Result<(), SceneError>;

    fn create_texture(&mut self, source: &TextureSource) -> Result<TextureId, SceneError>;
    fn dispose_texture(&mut self, texture: TextureId) -> Result<(), SceneError>;
    fn bind_texture(&mut self, id: EntityId, texture: Option<TextureId>) -> Result<(), SceneError>;

    fn set_uv_transform(&mut self, id: EntityId, transform: UvTransform);
    fn set_shading(&mut self, id: EntityId, shading: Shading);

    /// Start loading a model into `id`. Completion is reported back to the
    /// adapter by the host together with `token`.
    fn load_model(&mut self, id: EntityId, src: &str, token: LoadToken) -> Result<(), SceneError>;
    fn clear_model(&mut self, id: EntityId) -> Result<(), SceneError>;
}
