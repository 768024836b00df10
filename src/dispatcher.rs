//! Routes a media descriptor to the adapter for its mode and keeps exactly
//! one adapter showing at a time.

use crate::adapter::{
    FlatAdapter, MediaDimensions, ModelAdapter, ModelOutcome, SbsAdapter, ShowRequest,
    ViewAdapter, ViewContext, Vr180Adapter, Vr360Adapter,
};
use crate::error::ViewError;
use crate::media::MediaDescriptor;
use crate::mode::{detect, ViewMode};
use crate::params::{ParameterStore, ViewerParams};
use crate::scene::{LoadToken, Scene};
use crate::stereo::{FrameContext, MonoEye};
use std::collections::BTreeMap;

pub type AdapterFactory = fn(&ViewContext) -> Box<dyn ViewAdapter>;

/// Constructors per mode, looked up on first use of a mode.
#[derive(Clone)]
pub struct AdapterRegistry {
    factories: BTreeMap<ViewMode, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ViewMode::Flat, |ctx| Box::new(FlatAdapter::new(ctx)));
        registry.register(ViewMode::Sbs, |ctx| Box::new(SbsAdapter::new(ctx)));
        registry.register(ViewMode::Vr180, |ctx| Box::new(Vr180Adapter::new(ctx)));
        registry.register(ViewMode::Vr360, |_| Box::new(Vr360Adapter::new()));
        registry.register(ViewMode::Model, |ctx| Box::new(ModelAdapter::new(ctx)));
        registry
    }

    pub fn register(&mut self, mode: ViewMode, factory: AdapterFactory) {
        self.factories.insert(mode, factory);
    }

    fn get(&self, mode: ViewMode) -> Option<AdapterFactory> {
        self.factories.get(&mode).copied()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveViewState {
    pub current_mode: Option<ViewMode>,
}

pub struct ViewDispatcher {
    registry: AdapterRegistry,
    context: ViewContext,
    cache: BTreeMap<ViewMode, Box<dyn ViewAdapter>>,
    active: ActiveViewState,
    params: ParameterStore,
    descriptor: Option<MediaDescriptor>,
}

impl ViewDispatcher {
    pub fn new(registry: AdapterRegistry, context: ViewContext) -> Self {
        Self {
            registry,
            context,
            cache: BTreeMap::new(),
            active: ActiveViewState::default(),
            params: ParameterStore::new(),
            descriptor: None,
        }
    }

    pub fn current_mode(&self) -> Option<ViewMode> {
        self.active.current_mode
    }

    pub fn current_descriptor(&self) -> Option<&MediaDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    pub fn params(&self) -> &ViewerParams {
        self.params.get()
    }

    /// Number of adapters currently showing or waiting for their media.
    pub fn shown_count(&self) -> usize {
        self.cache.values().filter(|a| a.state().is_active()).count()
    }

    /// Show `descriptor` in the view its mode calls for, hiding whatever was
    /// active before. `ready` carries the media size if it is already known.
    pub fn activate(
        &mut self,
        scene: &mut dyn Scene,
        descriptor: MediaDescriptor,
        ready: Option<MediaDimensions>,
    ) -> Result<ViewMode, ViewError> {
        let mode = detect(&descriptor);
        let Some(factory) = self.registry.get(mode) else {
            log::error!("no view registered for {} ({})", mode.label(), descriptor.filename);
            return Err(ViewError::UnsupportedMode(mode));
        };

        let context = self.context;
        self.cache.entry(mode).or_insert_with(|| {
            log::debug!("creating {} view", mode.label());
            factory(&context)
        });

        if let Some(previous) = self.active.current_mode.filter(|m| *m != mode) {
            if let Some(adapter) = self.cache.get_mut(&previous) {
                log::debug!("hiding {} view", previous.label());
                adapter.hide(scene);
            }
        }
        self.active.current_mode = Some(mode);

        log::info!("showing {} as {}", descriptor.source_ref, mode.label());
        let adapter = self
            .cache
            .get_mut(&mode)
            .ok_or(ViewError::UnsupportedMode(mode))?;
        let request = ShowRequest {
            descriptor: &descriptor,
            ready,
        };
        let shown = adapter.show(scene, &request);
        if shown.is_ok() {
            adapter.apply_params(scene, self.params.get());
        }
        let src = descriptor.source_ref.clone();
        self.descriptor = Some(descriptor);

        match shown {
            Ok(()) => Ok(mode),
            Err(source) => {
                log::error!("{} view failed to show {src}: {source}", mode.label());
                Err(ViewError::Show { mode, src, source })
            }
        }
    }

    fn current(&mut self) -> Option<&mut Box<dyn ViewAdapter>> {
        let mode = self.active.current_mode?;
        self.cache.get_mut(&mode)
    }

    pub fn media_ready(
        &mut self,
        scene: &mut dyn Scene,
        src: &str,
        dims: MediaDimensions,
    ) -> Result<(), ViewError> {
        match self.current() {
            Some(adapter) => Ok(adapter.media_ready(scene, src, dims)?),
            None => Ok(()),
        }
    }

    /// Per-eye hook; call once for each rendered eye.
    pub fn update_frame(&mut self, scene: &mut dyn Scene, frame: &FrameContext) {
        if let Some(adapter) = self.current() {
            adapter.update_frame(scene, frame);
        }
    }

    pub fn model_loaded(&mut self, scene: &mut dyn Scene, token: LoadToken, outcome: ModelOutcome) {
        if let Some(adapter) = self.current() {
            adapter.model_loaded(scene, token, outcome);
        }
    }

    pub fn set_mono_eye(&mut self, mono_eye: MonoEye) {
        self.context.mono_eye = mono_eye;
        for adapter in self.cache.values_mut() {
            adapter.set_mono_eye(mono_eye);
        }
    }

    pub fn set_params(&mut self, scene: &mut dyn Scene, params: ViewerParams) -> Result<(), ViewError> {
        self.params.set_model_scale(params.model_scale)?;
        self.params.set_model_orientation(params.model_orientation);
        self.reapply_params(scene);
        Ok(())
    }

    pub fn set_model_scale(&mut self, scene: &mut dyn Scene, scale: f32) -> Result<(), ViewError> {
        self.params.set_model_scale(scale)?;
        self.reapply_params(scene);
        Ok(())
    }

    /// Merge a `params` object from the control channel. Valid keys are kept
    /// even if another key is rejected; returns whether anything changed.
    pub fn apply_params_json(
        &mut self,
        scene: &mut dyn Scene,
        value: &serde_json::Value,
    ) -> Result<bool, ViewError> {
        let before = *self.params.get();
        let merged = self.params.merge_json(value);
        let changed = *self.params.get() != before;
        if changed {
            self.reapply_params(scene);
        }
        merged.map(|_| changed)
    }

    fn reapply_params(&mut self, scene: &mut dyn Scene) {
        let params = *self.params.get();
        if let Some(adapter) = self.current() {
            adapter.apply_params(scene, &params);
        }
    }

    pub fn params_payload(&self) -> serde_json::Value {
        self.params.to_payload()
    }

    /// Drop every cached adapter after the scene was rebuilt from scratch.
    /// Params and the model load counter survive; returns the descriptor that
    /// was showing.
    pub fn reset(&mut self) -> Option<MediaDescriptor> {
        let issued = self.cache.values().map(|a| a.last_load_token()).max();
        if let Some(issued) = issued {
            self.context.load_token_floor = self.context.load_token_floor.max(issued);
        }
        self.cache.clear();
        self.active.current_mode = None;
        self.descriptor.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;
    use crate::stereo::Viewport;
    use serde_json::json;

    fn dispatcher() -> ViewDispatcher {
        ViewDispatcher::new(AdapterRegistry::with_defaults(), ViewContext::default())
    }

    #[test]
    fn switching_modes_hides_the_previous_view() {
        let mut scene = HeadlessScene::new();
        let mut d = dispatcher();
        d.activate(&mut scene, MediaDescriptor::from_source("clip.mp4", None), None)
            .unwrap();
        assert_eq!(scene.visible_labels(), vec!["flat-plane"]);

        let mode = d
            .activate(&mut scene, MediaDescriptor::from_source("clip_vr180.mp4", None), None)
            .unwrap();
        assert_eq!(mode, ViewMode::Vr180);
        assert_eq!(scene.visible_labels(), vec!["vr180-sphere"]);
        assert_eq!(d.shown_count(), 1);
        assert_eq!(scene.live_textures(), 1);
    }

    #[test]
    fn unsupported_mode_keeps_current_view() {
        let mut scene = HeadlessScene::new();
        let mut registry = AdapterRegistry::empty();
        registry.register(ViewMode::Flat, |ctx| Box::new(FlatAdapter::new(ctx)));
        let mut d = ViewDispatcher::new(registry, ViewContext::default());

        d.activate(&mut scene, MediaDescriptor::from_source("a.mp4", None), None)
            .unwrap();
        let err = d
            .activate(&mut scene, MediaDescriptor::from_source("b.glb", None), None)
            .unwrap_err();
        assert!(matches!(err, ViewError::UnsupportedMode(ViewMode::Model)));
        assert_eq!(d.current_mode(), Some(ViewMode::Flat));
        assert_eq!(scene.visible_labels(), vec!["flat-plane"]);
    }

    #[test]
    fn show_failure_is_reported_with_context() {
        let mut scene = HeadlessScene::new();
        scene.unavailable.insert("missing.mp4".into());
        let mut d = dispatcher();
        let err = d
            .activate(&mut scene, MediaDescriptor::from_source("missing.mp4", None), None)
            .unwrap_err();
        match err {
            ViewError::Show { mode, src, .. } => {
                assert_eq!(mode, ViewMode::Flat);
                assert_eq!(src, "missing.mp4");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(d.current_mode(), Some(ViewMode::Flat));
    }

    #[test]
    fn frame_hook_reaches_only_the_current_adapter() {
        let mut scene = HeadlessScene::new();
        let mut d = dispatcher();
        d.activate(
            &mut scene,
            MediaDescriptor::from_source("pair_sbs.png", None),
            Some(MediaDimensions::new(200, 100)),
        )
        .unwrap();
        d.activate(&mut scene, MediaDescriptor::from_source("clip.mp4", None), None)
            .unwrap();

        let writes = scene.uv_writes;
        let frame = FrameContext::eye_pass(Viewport { x: 100.0, y: 0.0, width: 100.0, height: 100.0 });
        d.update_frame(&mut scene, &frame);
        assert_eq!(scene.uv_writes, writes);
    }

    #[test]
    fn mono_eye_reaches_cached_adapters() {
        let mut scene = HeadlessScene::new();
        let mut d = dispatcher();
        d.activate(
            &mut scene,
            MediaDescriptor::from_source("pair_sbs.png", None),
            Some(MediaDimensions::new(200, 100)),
        )
        .unwrap();
        d.set_mono_eye(MonoEye::Right);
        d.update_frame(&mut scene, &FrameContext::windowed());
        let (_, plane) = scene.find("stereo-plane").unwrap();
        assert_eq!(plane.uv.offset.x, 0.5);
        assert_eq!(d.context().mono_eye, MonoEye::Right);
    }

    #[test]
    fn params_json_keeps_valid_fields() {
        let mut scene = HeadlessScene::new();
        let mut d = dispatcher();
        let result = d.apply_params_json(
            &mut scene,
            &json!({"modelScale": -1.0, "modelOrientation": "back"}),
        );
        assert!(result.is_err());
        assert_eq!(d.params().model_scale, 1.0);
        assert_eq!(
            d.params().model_orientation,
            crate::params::ModelOrientation::Back
        );
        assert_eq!(d.params_payload()["type"], "params");
    }

    #[test]
    fn reset_returns_last_descriptor_and_keeps_params() {
        let mut scene = HeadlessScene::new();
        let mut d = dispatcher();
        d.set_model_scale(&mut scene, 2.0).unwrap();
        d.activate(&mut scene, MediaDescriptor::from_source("clip.mp4", None), None)
            .unwrap();

        let last = d.reset().unwrap();
        assert_eq!(last.source_ref, "clip.mp4");
        assert_eq!(d.current_mode(), None);
        assert_eq!(d.shown_count(), 0);
        assert_eq!(d.params().model_scale, 2.0);
    }

    #[test]
    fn reset_raises_the_load_token_floor() {
        let mut scene = HeadlessScene::new();
        let mut d = dispatcher();
        d.activate(&mut scene, MediaDescriptor::from_source("a.glb", None), None)
            .unwrap();
        d.activate(&mut scene, MediaDescriptor::from_source("b.glb", None), None)
            .unwrap();

        d.reset();
        assert_eq!(d.context().load_token_floor, LoadToken(2));
        // nothing cached after a reset, the floor must not drop
        d.reset();
        assert_eq!(d.context().load_token_floor, LoadToken(2));
    }
}
