// vr360.rs - equirectangular panorama on a sky sphere, videos on a second sphere

use super::{
    set_visible_logged, AdapterState, MediaDimensions, ReadySubscription, ShowRequest,
    TextureSlot, ViewAdapter,
};
use crate::error::SceneError;
use crate::media::SourceKind;
use crate::mode::ViewMode;
use crate::scene::{EntityId, Geometry, Pose, Scene, SphereSpec, TextureSource};
use crate::stereo::{equirect_fit, UvTransform};
use glam::Vec3;

const SKY_RADIUS: f32 = 500.0;

#[derive(Default)]
pub struct Vr360Adapter {
    sky: Option<EntityId>,
    video_sphere: Option<EntityId>,
    sky_texture: TextureSlot,
    video_texture: TextureSlot,
    pending: Option<ReadySubscription>,
    state: AdapterState,
}

impl Vr360Adapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, scene: &mut dyn Scene) -> (EntityId, EntityId) {
        let spec = SphereSpec::full(SKY_RADIUS, 100, 50);
        // flip x so the panorama reads correctly from inside
        let pose = Pose {
            scale: Vec3::new(-1.0, 1.0, 1.0),
            ..Pose::default()
        };
        let sky = *self
            .sky
            .get_or_insert_with(|| scene.spawn("sky", Geometry::Sphere(spec), pose));
        let video = *self
            .video_sphere
            .get_or_insert_with(|| scene.spawn("video-sphere", Geometry::Sphere(spec), pose));
        if self.state == AdapterState::Uninitialized {
            self.state = AdapterState::Hidden;
        }
        (sky, video)
    }

    fn commit_video(
        &mut self,
        scene: &mut dyn Scene,
        video: EntityId,
        src: &str,
    ) -> Result<(), SceneError> {
        self.video_texture
            .replace(scene, video, &TextureSource::new(src, SourceKind::Video))?;
        scene.set_uv_transform(video, UvTransform::IDENTITY);
        set_visible_logged(scene, video, true);
        self.state = AdapterState::Shown;
        Ok(())
    }

    fn commit_image(
        &mut self,
        scene: &mut dyn Scene,
        sky: EntityId,
        src: &str,
        dims: MediaDimensions,
    ) -> Result<(), SceneError> {
        self.sky_texture
            .replace(scene, sky, &TextureSource::new(src, SourceKind::Image))?;
        scene.set_uv_transform(sky, equirect_fit(dims.width, dims.height));
        set_visible_logged(scene, sky, true);
        self.state = AdapterState::Shown;
        Ok(())
    }
}

impl ViewAdapter for Vr360Adapter {
    fn mode(&self) -> ViewMode {
        ViewMode::Vr360
    }

    fn state(&self) -> AdapterState {
        self.state
    }

    fn show(&mut self, scene: &mut dyn Scene, request: &ShowRequest<'_>) -> Result<(), SceneError> {
        let (sky, video) = self.ensure(scene);
        self.pending = None;
        set_visible_logged(scene, sky, false);
        set_visible_logged(scene, video, false);

        let result = match (request.kind(), request.ready) {
            (SourceKind::Video, _) => {
                self.sky_texture.release(scene, sky);
                self.commit_video(scene, video, request.src())
            }
            (_, Some(dims)) => {
                self.video_texture.release(scene, video);
                self.commit_image(scene, sky, request.src(), dims)
            }
            (_, None) => {
                self.video_texture.release(scene, video);
                self.sky_texture.release(scene, sky);
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
        if let Some(sky) = self.sky {
            set_visible_logged(scene, sky, false);
            self.sky_texture.release(scene, sky);
        }
        if let Some(video) = self.video_sphere {
            set_visible_logged(scene, video, false);
            self.video_texture.release(scene, video);
        }
        if self.state != AdapterState::Uninitialized {
            self.state = AdapterState::Hidden;
        }
    }

    fn media_ready(
        &mut self,
        scene: &mut dyn Scene,
        src: &str,
        dims: MediaDimensions,
    ) -> Result<(), SceneError> {
        let Some(sky) = self.sky else {
            return Ok(());
        };
        if !self.pending.as_ref().is_some_and(|p| p.matches(src)) {
            log::debug!("[vr360] ignoring ready event for stale source {src}");
            return Ok(());
        }
        self.pending = None;
        self.commit_image(scene, sky, src, dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaDescriptor;
    use crate::headless::HeadlessScene;
    use glam::Vec2;

    #[test]
    fn wide_panorama_is_cropped_on_the_sky() {
        let mut scene = HeadlessScene::new();
        let mut vr = Vr360Adapter::new();
        let d = MediaDescriptor::from_source("city_360.jpg", None);
        vr.show(&mut scene, &ShowRequest { descriptor: &d, ready: None }).unwrap();
        assert_eq!(vr.state(), AdapterState::Pending);
        assert!(scene.visible_labels().is_empty());

        vr.media_ready(&mut scene, "city_360.jpg", MediaDimensions::new(6000, 2000)).unwrap();
        let (_, sky) = scene.find("sky").unwrap();
        assert!(sky.visible);
        assert_eq!(sky.uv.repeat, Vec2::new(2.0 / 3.0, 1.0));
        assert_eq!(scene.visible_labels(), vec!["sky"]);
    }

    #[test]
    fn video_goes_to_the_video_sphere() {
        let mut scene = HeadlessScene::new();
        let mut vr = Vr360Adapter::new();
        let img = MediaDescriptor::from_source("city_360.jpg", None);
        vr.show(&mut scene, &ShowRequest { descriptor: &img, ready: Some(MediaDimensions::new(4, 2)) })
            .unwrap();
        assert_eq!(scene.visible_labels(), vec!["sky"]);

        let clip = MediaDescriptor::from_source("walk_360.mp4", None);
        vr.show(&mut scene, &ShowRequest { descriptor: &clip, ready: None }).unwrap();
        assert_eq!(scene.visible_labels(), vec!["video-sphere"]);
        assert_eq!(scene.live_textures(), 1);
        assert_eq!(scene.textures_disposed, 1);
    }

    #[test]
    fn hide_clears_both_spheres() {
        let mut scene = HeadlessScene::new();
        let mut vr = Vr360Adapter::new();
        let clip = MediaDescriptor::from_source("walk_360.mp4", None);
        vr.show(&mut scene, &ShowRequest { descriptor: &clip, ready: None }).unwrap();
        vr.hide(&mut scene);
        assert!(scene.visible_labels().is_empty());
        assert_eq!(scene.live_textures(), 0);
        assert_eq!(vr.state(), AdapterState::Hidden);
    }
}
