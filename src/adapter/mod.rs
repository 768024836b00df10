//! View adapters: one per [`ViewMode`], each owning its scene entities.
//!
//! An adapter is created on first use and cached by the dispatcher for the
//! rest of the session. Its entities are reused across `show`/`hide` cycles;
//! its textures are not, they are disposed on every source change and on hide.

mod flat;
mod model;
mod plane;
mod sbs;
mod vr180;
mod vr360;

pub use flat::FlatAdapter;
pub use model::ModelAdapter;
pub use sbs::SbsAdapter;
pub use vr180::Vr180Adapter;
pub use vr360::Vr360Adapter;

use crate::error::SceneError;
use crate::fit::Aabb;
use crate::media::{MediaDescriptor, SourceKind};
use crate::mode::ViewMode;
use crate::params::ViewerParams;
use crate::scene::{EntityId, LoadToken, Scene, TextureId, TextureSource};
use crate::stereo::{FrameContext, MonoEye};
use glam::Vec3;

/// Pixel size of a decoded image or of a video's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDimensions {
    pub width: u32,
    pub height: u32,
}

impl MediaDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, `None` when either side is zero.
    pub fn aspect(&self) -> Option<f32> {
        (self.width > 0 && self.height > 0).then(|| self.width as f32 / self.height as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterState {
    #[default]
    Uninitialized,
    Hidden,
    /// Shown, waiting for the media to become ready.
    Pending,
    Shown,
}

impl AdapterState {
    pub fn is_active(self) -> bool {
        matches!(self, AdapterState::Pending | AdapterState::Shown)
    }
}

/// Settings shared by every adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    pub mono_eye: MonoEye,
    /// Render VR180 with the old blackout split instead of mirrored repeat.
    pub legacy_half_turn: bool,
    pub plane_height: f32,
    pub model_target_size: f32,
    /// Model load tokens handed out by a new adapter start above this.
    pub load_token_floor: LoadToken,
}

impl Default for ViewContext {
    fn default() -> Self {
        Self {
            mono_eye: MonoEye::Left,
            legacy_half_turn: false,
            plane_height: 3.0,
            model_target_size: 0.5,
            load_token_floor: LoadToken::NONE,
        }
    }
}

pub struct ShowRequest<'a> {
    pub descriptor: &'a MediaDescriptor,
    /// Set when the media is already decoded (or a video's metadata known).
    pub ready: Option<MediaDimensions>,
}

impl ShowRequest<'_> {
    pub fn src(&self) -> &str {
        &self.descriptor.source_ref
    }

    pub fn kind(&self) -> SourceKind {
        self.descriptor.kind()
    }
}

pub type ModelOutcome = Result<Aabb, String>;

pub trait ViewAdapter {
    fn mode(&self) -> ViewMode;
    fn state(&self) -> AdapterState;

    fn show(&mut self, scene: &mut dyn Scene, request: &ShowRequest<'_>) -> Result<(), SceneError>;

    /// Idempotent.
    fn hide(&mut self, scene: &mut dyn Scene);

    /// The media `src` finished loading (image decoded, video metadata known).
    fn media_ready(
        &mut self,
        _scene: &mut dyn Scene,
        _src: &str,
        _dims: MediaDimensions,
    ) -> Result<(), SceneError> {
        Ok(())
    }

    /// Called once per rendered eye.
    fn update_frame(&mut self, _scene: &mut dyn Scene, _frame: &FrameContext) {}

    fn set_mono_eye(&mut self, _mono_eye: MonoEye) {}

    fn apply_params(&mut self, _scene: &mut dyn Scene, _params: &ViewerParams) {}

    fn model_loaded(&mut self, _scene: &mut dyn Scene, _token: LoadToken, _outcome: ModelOutcome) {}

    /// Highest model load token this adapter has issued.
    fn last_load_token(&self) -> LoadToken {
        LoadToken::NONE
    }
}

/// A live "tell me when `src` is ready" registration. Dropping it is the
/// release; a late ready event for a released source finds no match.
#[derive(Debug)]
pub(crate) struct ReadySubscription {
    src: String,
    what: &'static str,
}

impl ReadySubscription {
    pub(crate) fn new(src: &str, what: &'static str) -> Self {
        log::trace!("waiting for {what} of {src}");
        Self {
            src: src.to_string(),
            what,
        }
    }

    pub(crate) fn matches(&self, src: &str) -> bool {
        self.src == src
    }
}

impl Drop for ReadySubscription {
    fn drop(&mut self) {
        log::trace!("released {} subscription for {}", self.what, self.src);
    }
}

/// The texture currently bound to one entity.
#[derive(Debug, Default)]
pub(crate) struct TextureSlot {
    current: Option<TextureId>,
}

impl TextureSlot {
    /// Dispose the old texture, then create and bind the new one.
    pub(crate) fn replace(
        &mut self,
        scene: &mut dyn Scene,
        entity: EntityId,
        source: &TextureSource,
    ) -> Result<TextureId, SceneError> {
        self.release(scene, entity);
        let tex = scene.create_texture(source)?;
        if let Err(e) = scene.bind_texture(entity, Some(tex)) {
            dispose_quietly(scene, tex);
            return Err(e);
        }
        self.current = Some(tex);
        Ok(tex)
    }

    pub(crate) fn release(&mut self, scene: &mut dyn Scene, entity: EntityId) {
        if let Some(tex) = self.current.take() {
            if let Err(e) = scene.bind_texture(entity, None) {
                log::warn!("failed to unbind texture {}: {e}", tex.0);
            }
            dispose_quietly(scene, tex);
        }
    }
}

/// Dispose failures must never block a mode switch.
pub(crate) fn dispose_quietly(scene: &mut dyn Scene, tex: TextureId) {
    if let Err(e) = scene.dispose_texture(tex) {
        log::warn!("failed to dispose texture {}: {e}", tex.0);
    }
}

pub(crate) fn set_visible_logged(scene: &mut dyn Scene, entity: EntityId, visible: bool) {
    if let Err(e) = scene.set_visible(entity, visible) {
        log::warn!("failed to set visibility of entity {}: {e}", entity.0);
    }
}

pub(crate) const PLANE_POSITION: Vec3 = Vec3::new(0.0, 1.2, 2.5);
pub(crate) const FACING_VIEWER: Vec3 = Vec3::new(0.0, 180.0, 0.0);
