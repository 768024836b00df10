// flat.rs - plain image or video on a plane

use super::plane::MediaPlane;
use super::{AdapterState, MediaDimensions, ShowRequest, ViewAdapter, ViewContext};
use crate::error::SceneError;
use crate::mode::ViewMode;
use crate::scene::Scene;

pub struct FlatAdapter {
    plane: MediaPlane,
}

impl FlatAdapter {
    pub fn new(ctx: &ViewContext) -> Self {
        Self {
            plane: MediaPlane::new("flat-plane", ctx.plane_height, 1.0),
        }
    }
}

impl ViewAdapter for FlatAdapter {
    fn mode(&self) -> ViewMode {
        ViewMode::Flat
    }

    fn state(&self) -> AdapterState {
        self.plane.state()
    }

    fn show(&mut self, scene: &mut dyn Scene, request: &ShowRequest<'_>) -> Result<(), SceneError> {
        self.plane.show(scene, request).map(|_| ())
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;
    use crate::media::MediaDescriptor;
    use crate::scene::Geometry;

    fn request(d: &MediaDescriptor, ready: Option<MediaDimensions>) -> ShowRequest<'_> {
        ShowRequest { descriptor: d, ready }
    }

    #[test]
    fn image_waits_for_load_before_showing() {
        let mut scene = HeadlessScene::new();
        let mut flat = FlatAdapter::new(&ViewContext::default());
        let d = MediaDescriptor::from_source("data/holiday.jpg", None);

        flat.show(&mut scene, &request(&d, None)).unwrap();
        assert_eq!(flat.state(), AdapterState::Pending);
        let (_, plane) = scene.find("flat-plane").unwrap();
        assert!(!plane.visible);
        assert_eq!(scene.textures_created, 0);

        flat.media_ready(&mut scene, "data/holiday.jpg", MediaDimensions::new(1600, 800))
            .unwrap();
        assert_eq!(flat.state(), AdapterState::Shown);
        let (_, plane) = scene.find("flat-plane").unwrap();
        assert!(plane.visible);
        assert_eq!(plane.geometry, Geometry::Plane { width: 6.0, height: 3.0 });
        assert_eq!(scene.live_textures(), 1);
    }

    #[test]
    fn stale_ready_event_is_ignored() {
        let mut scene = HeadlessScene::new();
        let mut flat = FlatAdapter::new(&ViewContext::default());
        let a = MediaDescriptor::from_source("a.jpg", None);
        let b = MediaDescriptor::from_source("b.jpg", None);

        flat.show(&mut scene, &request(&a, None)).unwrap();
        flat.show(&mut scene, &request(&b, None)).unwrap();
        flat.media_ready(&mut scene, "a.jpg", MediaDimensions::new(10, 10)).unwrap();
        assert_eq!(flat.state(), AdapterState::Pending);
        assert_eq!(scene.textures_created, 0);
    }

    #[test]
    fn video_binds_immediately_and_tracks_metadata() {
        let mut scene = HeadlessScene::new();
        let mut flat = FlatAdapter::new(&ViewContext::default());
        let d = MediaDescriptor::from_source("clip.mp4", None);

        flat.show(&mut scene, &request(&d, None)).unwrap();
        assert_eq!(flat.state(), AdapterState::Shown);
        assert_eq!(scene.live_textures(), 1);
        assert!(scene.find("flat-plane").unwrap().1.visible);

        flat.media_ready(&mut scene, "clip.mp4", MediaDimensions::new(1920, 1080)).unwrap();
        let (_, plane) = scene.find("flat-plane").unwrap();
        assert_eq!(plane.geometry, Geometry::Plane { width: 3.0 * (1920.0_f32 / 1080.0), height: 3.0 });
        assert_eq!(scene.textures_created, 1);
    }

    #[test]
    fn hide_releases_texture_and_is_idempotent() {
        let mut scene = HeadlessScene::new();
        let mut flat = FlatAdapter::new(&ViewContext::default());
        let d = MediaDescriptor::from_source("x.png", None);
        flat.show(&mut scene, &request(&d, Some(MediaDimensions::new(4, 3)))).unwrap();

        flat.hide(&mut scene);
        flat.hide(&mut scene);
        assert_eq!(flat.state(), AdapterState::Hidden);
        assert_eq!(scene.live_textures(), 0);
        assert_eq!(scene.textures_disposed, 1);
        assert!(scene.visible_labels().is_empty());
    }

    #[test]
    fn hide_before_first_show_is_harmless() {
        let mut scene = HeadlessScene::new();
        let mut flat = FlatAdapter::new(&ViewContext::default());
        flat.hide(&mut scene);
        assert_eq!(flat.state(), AdapterState::Uninitialized);
        assert_eq!(scene.entity_count(), 0);
    }
}
