// sbs.rs - side-by-side stereo pair on a flat plane

use super::plane::MediaPlane;
use super::{AdapterState, MediaDimensions, ShowRequest, ViewAdapter, ViewContext};
use crate::error::SceneError;
use crate::mode::ViewMode;
use crate::scene::Scene;
use crate::stereo::{compute_transform, resolve_eye, Eye, FrameContext, MonoEye, StereoLayout};

pub struct SbsAdapter {
    plane: MediaPlane,
    mono_eye: MonoEye,
}

impl SbsAdapter {
    pub fn new(ctx: &ViewContext) -> Self {
        Self {
            plane: MediaPlane::new("stereo-plane", ctx.plane_height, 2.0),
            mono_eye: ctx.mono_eye,
        }
    }
}

impl ViewAdapter for SbsAdapter {
    fn mode(&self) -> ViewMode {
        ViewMode::Sbs
    }

    fn state(&self) -> AdapterState {
        self.plane.state()
    }

    fn show(&mut self, scene: &mut dyn Scene, request: &ShowRequest<'_>) -> Result<(), SceneError> {
        let entity = self.plane.show(scene, request)?;
        let initial = compute_transform(StereoLayout::Plane, Eye::Mono, self.mono_eye);
        scene.set_uv_transform(entity, initial.into());
        Ok(())
    }

    fn hide(&mut self, scene: &mut dyn Scene) {
        self.plane.hide(scene);
    }

    fn media_ready(
        &mut self,
        scene: &mut dyn Scene,
        src: &str,
        dims: MediaDimensions,
    ) -> Result<(), SceneError> {
        self.plane.media_ready(scene, src, dims)
    }

    fn update_frame(&mut self, scene: &mut dyn Scene, frame: &FrameContext) {
        if !self.plane.state().is_active() {
            return;
        }
        if let Some(entity) = self.plane.entity() {
            let eye = resolve_eye(frame, self.mono_eye);
            let t = compute_transform(StereoLayout::Plane, eye, self.mono_eye);
            scene.set_uv_transform(entity, t.into());
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
    use crate::scene::Geometry;
    use crate::stereo::Viewport;
    use glam::Vec2;

    fn shown(scene: &mut HeadlessScene) -> SbsAdapter {
        let mut sbs = SbsAdapter::new(&ViewContext::default());
        let d = MediaDescriptor::from_source("pair_sbs.png", None);
        let req = ShowRequest { descriptor: &d, ready: Some(MediaDimensions::new(3840, 1080)) };
        sbs.show(scene, &req).unwrap();
        sbs
    }

    #[test]
    fn plane_width_uses_half_the_image() {
        let mut scene = HeadlessScene::new();
        shown(&mut scene);
        let (_, plane) = scene.find("stereo-plane").unwrap();
        let expected = 3.0 * ((3840.0_f32 / 1080.0) / 2.0);
        assert_eq!(plane.geometry, Geometry::Plane { width: expected, height: 3.0 });
        assert!(plane.visible);
        assert_eq!(plane.uv.repeat, Vec2::new(0.5, 1.0));
        assert_eq!(plane.uv.offset, Vec2::ZERO);
    }

    #[test]
    fn per_eye_pass_selects_half() {
        let mut scene = HeadlessScene::new();
        let mut sbs = shown(&mut scene);
        let (id, _) = scene.find("stereo-plane").unwrap();

        let right = FrameContext::eye_pass(Viewport { x: 960.0, y: 0.0, width: 960.0, height: 1080.0 });
        sbs.update_frame(&mut scene, &right);
        assert_eq!(scene.entity(id).unwrap().uv.offset.x, 0.5);

        let left = FrameContext::eye_pass(Viewport { x: 0.0, y: 0.0, width: 960.0, height: 1080.0 });
        sbs.update_frame(&mut scene, &left);
        assert_eq!(scene.entity(id).unwrap().uv.offset.x, 0.0);
        assert_eq!(scene.entity(id).unwrap().uv.repeat.x, 0.5);
    }

    #[test]
    fn windowed_follows_mono_eye() {
        let mut scene = HeadlessScene::new();
        let mut sbs = shown(&mut scene);
        let (id, _) = scene.find("stereo-plane").unwrap();

        sbs.set_mono_eye(MonoEye::Right);
        sbs.update_frame(&mut scene, &FrameContext::windowed());
        assert_eq!(scene.entity(id).unwrap().uv.offset.x, 0.5);
    }

    #[test]
    fn hidden_adapter_does_not_write() {
        let mut scene = HeadlessScene::new();
        let mut sbs = shown(&mut scene);
        sbs.hide(&mut scene);
        let writes = scene.uv_writes;
        sbs.update_frame(&mut scene, &FrameContext::windowed());
        assert_eq!(scene.uv_writes, writes);
        assert_eq!(scene.textures_created, 1);
    }
}
