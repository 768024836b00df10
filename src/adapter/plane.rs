// plane.rs - textured plane shared by the flat and side-by-side views

use super::{
    set_visible_logged, AdapterState, MediaDimensions, ReadySubscription, ShowRequest,
    TextureSlot, FACING_VIEWER, PLANE_POSITION,
};
use crate::error::SceneError;
use crate::media::SourceKind;
use crate::scene::{EntityId, Geometry, Pose, Scene, TextureSource};
use glam::Vec3;

pub(crate) struct MediaPlane {
    label: &'static str,
    height: f32,
    /// 2.0 for side-by-side sources, where one eye sees half the width.
    width_divisor: f32,
    entity: Option<EntityId>,
    texture: TextureSlot,
    pending: Option<ReadySubscription>,
    kind: SourceKind,
    state: AdapterState,
}

impl MediaPlane {
    pub(crate) fn new(label: &'static str, height: f32, width_divisor: f32) -> Self {
        Self {
            label,
            height,
            width_divisor,
            entity: None,
            texture: TextureSlot::default(),
            pending: None,
            kind: SourceKind::Image,
            state: AdapterState::Uninitialized,
        }
    }

    pub(crate) fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    pub(crate) fn state(&self) -> AdapterState {
        self.state
    }

    fn ensure(&mut self, scene: &mut dyn Scene) -> EntityId {
        if let Some(id) = self.entity {
            return id;
        }
        let id = scene.spawn(
            self.label,
            Geometry::Plane {
                width: self.height,
                height: self.height,
            },
            Pose {
                position: PLANE_POSITION,
                rotation: FACING_VIEWER,
                scale: Vec3::ONE,
            },
        );
        self.entity = Some(id);
        self.state = AdapterState::Hidden;
        id
    }

    /// Plane width keeping the visible (per-eye) aspect ratio.
    pub(crate) fn plane_width(&self, dims: MediaDimensions) -> Option<f32> {
        let aspect = dims.aspect()? / self.width_divisor;
        (aspect > 0.0).then_some(self.height * aspect)
    }

    fn resize(&self, scene: &mut dyn Scene, entity: EntityId, dims: MediaDimensions) {
        let Some(width) = self.plane_width(dims) else {
            return;
        };
        let geometry = Geometry::Plane {
            width,
            height: self.height,
        };
        if let Err(e) = scene.set_geometry(entity, geometry) {
            log::warn!("[{}] failed to resize plane: {e}", self.label);
        }
    }

    pub(crate) fn show(
        &mut self,
        scene: &mut dyn Scene,
        request: &ShowRequest<'_>,
    ) -> Result<EntityId, SceneError> {
        let entity = self.ensure(scene);
        self.pending = None;
        set_visible_logged(scene, entity, false);
        self.kind = request.kind();

        match (self.kind, request.ready) {
            (SourceKind::Video, ready) => {
                if let Some(dims) = ready {
                    self.resize(scene, entity, dims);
                }
                let source = TextureSource::new(request.src(), SourceKind::Video);
                if let Err(e) = self.texture.replace(scene, entity, &source) {
                    self.state = AdapterState::Hidden;
                    return Err(e);
                }
                // keep following metadata so the plane tracks the frame size
                self.pending = Some(ReadySubscription::new(request.src(), "metadata"));
                set_visible_logged(scene, entity, true);
                self.state = AdapterState::Shown;
            }
            (_, Some(dims)) => {
                if let Err(e) = self.commit_image(scene, entity, request.src(), dims) {
                    self.state = AdapterState::Hidden;
                    return Err(e);
                }
            }
            (_, None) => {
                // drop the previous image now so it cannot flash before the new one
                self.texture.release(scene, entity);
                self.pending = Some(ReadySubscription::new(request.src(), "load"));
                self.state = AdapterState::Pending;
            }
        }
        Ok(entity)
    }

    fn commit_image(
        &mut self,
        scene: &mut dyn Scene,
        entity: EntityId,
        src: &str,
        dims: MediaDimensions,
    ) -> Result<(), SceneError> {
        self.resize(scene, entity, dims);
        self.texture
            .replace(scene, entity, &TextureSource::new(src, SourceKind::Image))?;
        set_visible_logged(scene, entity, true);
        self.state = AdapterState::Shown;
        Ok(())
    }

    pub(crate) fn media_ready(
        &mut self,
        scene: &mut dyn Scene,
        src: &str,
        dims: MediaDimensions,
    ) -> Result<(), SceneError> {
        let Some(entity) = self.entity else {
            return Ok(());
        };
        if !self.pending.as_ref().is_some_and(|p| p.matches(src)) {
            log::debug!("[{}] ignoring ready event for stale source {src}", self.label);
            return Ok(());
        }
        if self.kind == SourceKind::Video {
            self.resize(scene, entity, dims);
            return Ok(());
        }
        self.pending = None;
        self.commit_image(scene, entity, src, dims)
    }

    pub(crate) fn hide(&mut self, scene: &mut dyn Scene) {
        self.pending = None;
        let Some(entity) = self.entity else {
            return;
        };
        set_visible_logged(scene, entity, false);
        self.texture.release(scene, entity);
        self.state = AdapterState::Hidden;
    }
}
