// vr180.rs - stereo hemisphere viewed from inside

use super::{
    set_visible_logged, AdapterState, MediaDimensions, ReadySubscription, ShowRequest,
    TextureSlot, ViewAdapter, ViewContext,
};
use crate::error::SceneError;
use crate::media::SourceKind;
use crate::mode::ViewMode;
use crate::scene::{EntityId, Geometry, Pose, Scene, Shading, SphereSpec, TextureSource};
use crate::stereo::{
    compute_transform, resolve_eye, Eye, FrameContext, MonoEye, StereoLayout, UvTransform,
};
use glam::Vec3;

pub const VR180_SPHERE: SphereSpec = SphereSpec {
    radius: 20.0,
    segments_width: 100,
    segments_height: 50,
    phi_start: 0.0,
    phi_length: 180.0,
    theta_start: 0.0,
    theta_length: 180.0,
};

pub struct Vr180Adapter {
    layout: StereoLayout,
    mono_eye: MonoEye,
    sphere: Option<EntityId>,
    texture: TextureSlot,
    pending: Option<ReadySubscription>,
    state: AdapterState,
}

impl Vr180Adapter {
    pub fn new(ctx: &ViewContext) -> Self {
        let layout = if ctx.legacy_half_turn {
            StereoLayout::LegacyHalfTurn { half_turn: true }
        } else {
            StereoLayout::InsideSphere
        };
        Self {
            layout,
            mono_eye: ctx.mono_eye,
            sphere: None,
            texture: TextureSlot::default(),
            pending: None,
            state: AdapterState::Uninitialized,
        }
    }

    pub fn layout(&self) -> StereoLayout {
        self.layout
    }

    fn ensure(&mut self, scene: &mut dyn Scene) -> EntityId {
        if let Some(id) = self.sphere {
            return id;
        }
        let id = scene.spawn(
            "vr180-sphere",
            Geometry::Sphere(VR180_SPHERE),
            Pose {
                position: Vec3::ZERO,
                rotation: Vec3::ZERO,
                scale: Vec3::new(1.0, -1.0, 1.0),
            },
        );
        self.sphere = Some(id);
        self.state = AdapterState::Hidden;
        id
    }

    fn apply_eye(&self, scene: &mut dyn Scene, sphere: EntityId, eye: Eye) {
        match self.layout {
            StereoLayout::LegacyHalfTurn { half_turn } => {
                scene.set_uv_transform(sphere, UvTransform::IDENTITY);
                scene.set_shading(sphere, Shading::LegacyHalfTurn { eye, half_turn });
            }
            layout => {
                let t = compute_transform(layout, eye, self.mono_eye);
                scene.set_uv_transform(sphere, t.into());
            }
        }
    }

    fn commit(
        &mut self,
        scene: &mut dyn Scene,
        sphere: EntityId,
        source: &TextureSource,
    ) -> Result<(), SceneError> {
        self.texture.replace(scene, sphere, source)?;
        if !matches!(self.layout, StereoLayout::LegacyHalfTurn { .. }) {
            scene.set_shading(sphere, Shading::Standard);
        }
        self.apply_eye(scene, sphere, Eye::Mono);
        set_visible_logged(scene, sphere, true);
        self.state = AdapterState::Shown;
        Ok(())
    }
}

impl ViewAdapter for Vr180Adapter {
    fn mode(&self) -> ViewMode {
        ViewMode::Vr180
    }

    fn state(&self) -> AdapterState {
        self.state
    }

    fn show(&mut self, scene: &mut dyn Scene, request: &ShowRequest<'_>) -> Result<(), SceneError> {
        let sphere = self.ensure(scene);
        self.pending = None;
        set_visible_logged(scene, sphere, false);

        let kind = request.kind();
        let result = match (kind, request.ready) {
            (SourceKind::Video, _) | (_, Some(_)) => {
                let source = TextureSource::new(request.src(), kind);
                self.commit(scene, sphere, &source)
            }
            (_, None) => {
                self.texture.release(scene, sphere);
                self.pending = Some(ReadySubscription::new(request.src(), "load"));
                self.state = AdapterState::Pending;
                Ok(())
            }
        };
        if result.is_err() {
            self.state = AdapterState::Hidden;
        }
        result
    }

    fn hide(&mut self, scene: &mut dyn Scene) {
        self.pending = None;
        let Some(sphere) = self.sphere else {
            return;
        };
        set_visible_logged(scene, sphere, false);
        self.texture.release(scene, sphere);
        self.state = AdapterState::Hidden;
    }

    fn media_ready(
        &mut self,
        scene: &mut dyn Scene,
        src: &str,
        _dims: MediaDimensions,
    ) -> Result<(), SceneError> {
        let Some(sphere) = self.sphere else {
            return Ok(());
        };
        if !self.pending.as_ref().is_some_and(|p| p.matches(src)) {
            return Ok(());
        }
        self.pending = None;
        self.commit(scene, sphere, &TextureSource::new(src, SourceKind::Image))
    }

    fn update_frame(&mut self, scene: &mut dyn Scene, frame: &FrameContext) {
        if self.state != AdapterState::Shown {
            return;
        }
        if let Some(sphere) = self.sphere {
            let eye = resolve_eye(frame, self.mono_eye);
            self.apply_eye(scene, sphere, eye);
        }
    }

    fn set_mono_eye(&mut self, mono_eye: MonoEye) {
        self.mono_eye = mono_eye;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;
    use crate::media::MediaDescriptor;
    use crate::stereo::Viewport;

    fn right_eye() -> FrameContext {
        FrameContext::eye_pass(Viewport { x: 1000.0, y: 0.0, width: 1000.0, height: 1000.0 })
    }

    #[test]
    fn inside_sphere_mapping_per_eye() {
        let mut scene = HeadlessScene::new();
        let mut vr = Vr180Adapter::new(&ViewContext::default());
        let d = MediaDescriptor::from_source("clip_vr180.mp4", None);
        vr.show(&mut scene, &ShowRequest { descriptor: &d, ready: None }).unwrap();
        assert_eq!(vr.state(), AdapterState::Shown);

        let (id, sphere) = scene.find("vr180-sphere").unwrap();
        assert_eq!(sphere.pose.scale, Vec3::new(1.0, -1.0, 1.0));
        assert_eq!(sphere.uv.repeat.x, -0.5);
        assert_eq!(sphere.uv.offset.x, 0.5);

        vr.update_frame(&mut scene, &right_eye());
        let e = scene.entity(id).unwrap();
        assert_eq!(e.uv.repeat.x, -0.5);
        assert_eq!(e.uv.offset.x, 1.0);
        assert_eq!(e.shading, Shading::Standard);
    }

    #[test]
    fn legacy_mode_uses_blackout_shading() {
        let mut scene = HeadlessScene::new();
        let ctx = ViewContext { legacy_half_turn: true, ..ViewContext::default() };
        let mut vr = Vr180Adapter::new(&ctx);
        let d = MediaDescriptor::from_source("old_vr180.jpg", None);
        let req = ShowRequest { descriptor: &d, ready: Some(MediaDimensions::new(4096, 2048)) };
        vr.show(&mut scene, &req).unwrap();

        vr.update_frame(&mut scene, &right_eye());
        let (_, e) = scene.find("vr180-sphere").unwrap();
        assert_eq!(e.uv, UvTransform::IDENTITY);
        assert_eq!(e.shading, Shading::LegacyHalfTurn { eye: Eye::Right, half_turn: true });
    }

    #[test]
    fn image_texture_waits_for_ready() {
        let mut scene = HeadlessScene::new();
        let mut vr = Vr180Adapter::new(&ViewContext::default());
        let d = MediaDescriptor::from_source("trip_vr180.jpg", None);
        vr.show(&mut scene, &ShowRequest { descriptor: &d, ready: None }).unwrap();
        assert_eq!(vr.state(), AdapterState::Pending);
        assert_eq!(scene.textures_created, 0);

        vr.media_ready(&mut scene, "trip_vr180.jpg", MediaDimensions::new(8, 4)).unwrap();
        assert_eq!(vr.state(), AdapterState::Shown);
        assert!(scene.find("vr180-sphere").unwrap().1.visible);
    }

    #[test]
    fn failed_texture_leaves_adapter_hidden() {
        let mut scene = HeadlessScene::new();
        scene.unavailable.insert("gone_vr180.mp4".into());
        let mut vr = Vr180Adapter::new(&ViewContext::default());
        let d = MediaDescriptor::from_source("gone_vr180.mp4", None);
        assert!(vr.show(&mut scene, &ShowRequest { descriptor: &d, ready: None }).is_err());
        assert_eq!(vr.state(), AdapterState::Hidden);
    }
}
