// headless.rs - an in-memory Scene that records what the adapters asked for
//
// Used by the tests and handy for driving the dispatcher without a GPU.

use crate::error::SceneError;
use crate::scene::{
    EntityId, Geometry, LoadToken, Pose, Scene, Shading, TextureId, TextureSource,
};
use crate::stereo::UvTransform;
use glam::Vec3;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone)]
pub struct HeadlessEntity {
    pub label: &'static str,
    pub geometry: Geometry,
    pub pose: Pose,
    pub visible: bool,
    pub texture: Option<TextureId>,
    pub uv: UvTransform,
    pub shading: Shading,
    pub content_offset: Vec3,
    pub model: Option<(String, LoadToken)>,
}

#[derive(Debug, Default)]
pub struct HeadlessScene {
    entities: Vec<HeadlessEntity>,
    live_textures: BTreeMap<TextureId, TextureSource>,
    next_texture: u32,
    pub textures_created: usize,
    pub textures_disposed: usize,
    pub uv_writes: usize,
    /// When set, `dispose_texture` releases the texture but reports failure.
    pub fail_dispose: bool,
    /// Sources for which `create_texture` fails.
    pub unavailable: HashSet<String>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self, id: EntityId) -> Option<&HeadlessEntity> {
        self.entities.get(id.0 as usize)
    }

    pub fn find(&self, label: &str) -> Option<(EntityId, &HeadlessEntity)> {
        self.entities
            .iter()
            .enumerate()
            .find(|(_, e)| e.label == label)
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn visible_labels(&self) -> Vec<&'static str> {
        self.entities.iter().filter(|e| e.visible).map(|e| e.label).collect()
    }

    pub fn live_textures(&self) -> usize {
        self.live_textures.len()
    }

    pub fn texture_source(&self, id: TextureId) -> Option<&TextureSource> {
        self.live_textures.get(&id)
    }

    fn get_mut(&mut self, id: EntityId) -> Result<&mut HeadlessEntity, SceneError> {
        self.entities
            .get_mut(id.0 as usize)
            .ok_or(SceneError::UnknownEntity(id.0))
    }
}

impl Scene for HeadlessScene {
    fn spawn(&mut self, label: &'static str, geometry: Geometry, pose: Pose) -> EntityId {
        self.entities.push(HeadlessEntity {
            label,
            geometry,
            pose,
            visible: false,
            texture: None,
            uv: UvTransform::IDENTITY,
            shading: Shading::Standard,
            content_offset: Vec3::ZERO,
            model: None,
        });
        EntityId(self.entities.len() as u32 - 1)
    }

    fn set_geometry(&mut self, id: EntityId, geometry: Geometry) -> Result<(), SceneError> {
        self.get_mut(id)?.geometry = geometry;
        Ok(())
    }

    fn set_visible(&mut self, id: EntityId, visible: bool) -> Result<(), SceneError> {
        self.get_mut(id)?.visible = visible;
        Ok(())
    }

    fn set_scale(&mut self, id: EntityId, scale: Vec3) -> Result<(), SceneError> {
        self.get_mut(id)?.pose.scale = scale;
        Ok(())
    }

    fn set_rotation(&mut self, id: EntityId, rotation: Vec3) -> Result<(), SceneError> {
        self.get_mut(id)?.pose.rotation = rotation;
        Ok(())
    }

    fn set_content_offset(&mut self, id: EntityId, offset: Vec3) -> Result<(), SceneError> {
        self.get_mut(id)?.content_offset = offset;
        Ok(())
    }

    fn create_texture(&mut self, source: &TextureSource) -> Result<TextureId, SceneError> {
        if self.unavailable.contains(&source.src) {
            return Err(SceneError::SourceUnavailable(source.src.clone()));
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.live_textures.insert(id, source.clone());
        self.textures_created += 1;
        Ok(id)
    }

    fn dispose_texture(&mut self, texture: TextureId) -> Result<(), SceneError> {
        if self.live_textures.remove(&texture).is_none() {
            return Err(SceneError::UnknownTexture(texture.0));
        }
        self.textures_disposed += 1;
        if self.fail_dispose {
            return Err(SceneError::Dispose(format!("texture {} refused", texture.0)));
        }
        Ok(())
    }

    fn bind_texture(&mut self, id: EntityId, texture: Option<TextureId>) -> Result<(), SceneError> {
        if let Some(t) = texture {
            if !self.live_textures.contains_key(&t) {
                return Err(SceneError::UnknownTexture(t.0));
            }
        }
        self.get_mut(id)?.texture = texture;
        Ok(())
    }

    fn set_uv_transform(&mut self, id: EntityId, transform: UvTransform) {
        if let Some(e) = self.entities.get_mut(id.0 as usize) {
            e.uv = transform;
            self.uv_writes += 1;
        }
    }

    fn set_shading(&mut self, id: EntityId, shading: Shading) {
        if let Some(e) = self.entities.get_mut(id.0 as usize) {
            e.shading = shading;
        }
    }

    fn load_model(&mut self, id: EntityId, src: &str, token: LoadToken) -> Result<(), SceneError> {
        self.get_mut(id)?.model = Some((src.to_string(), token));
        Ok(())
    }

    fn clear_model(&mut self, id: EntityId) -> Result<(), SceneError> {
        self.get_mut(id)?.model = None;
        Ok(())
    }
}
