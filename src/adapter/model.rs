// model.rs - glTF/GLB model placed in front of the viewer

use super::{
    set_visible_logged, AdapterState, ModelOutcome, ShowRequest, ViewAdapter, ViewContext,
};
use crate::error::SceneError;
use crate::fit::fit_to_target;
use crate::mode::ViewMode;
use crate::params::ViewerParams;
use crate::scene::{EntityId, Geometry, LoadToken, Pose, Scene};
use glam::Vec3;

const MODEL_POSITION: Vec3 = Vec3::new(0.0, 1.2, 1.0);

pub struct ModelAdapter {
    target_size: f32,
    entity: Option<EntityId>,
    last_token: LoadToken,
    /// Token of the load whose result may still be applied.
    active_token: LoadToken,
    /// Scale computed by the last successful fit, before the user multiplier.
    base_scale: f32,
    params: ViewerParams,
    state: AdapterState,
}

impl ModelAdapter {
    pub fn new(ctx: &ViewContext) -> Self {
        Self {
            target_size: ctx.model_target_size,
            entity: None,
            last_token: ctx.load_token_floor,
            active_token: LoadToken::NONE,
            base_scale: 1.0,
            params: ViewerParams::default(),
            state: AdapterState::Uninitialized,
        }
    }

    /// Token the next `model_loaded` call must carry to be applied.
    pub fn active_token(&self) -> LoadToken {
        self.active_token
    }

    fn ensure(&mut self, scene: &mut dyn Scene) -> EntityId {
        if let Some(id) = self.entity {
            return id;
        }
        let id = scene.spawn(
            "glb-model-view",
            Geometry::Model,
            Pose {
                position: MODEL_POSITION,
                rotation: Vec3::new(0.0, 180.0, 0.0),
                scale: Vec3::ONE,
            },
        );
        self.entity = Some(id);
        self.state = AdapterState::Hidden;
        id
    }

    fn apply_transform(&self, scene: &mut dyn Scene, entity: EntityId) {
        let scale = Vec3::splat(self.base_scale * self.params.model_scale);
        if let Err(e) = scene.set_scale(entity, scale) {
            log::warn!("[model] failed to scale: {e}");
        }
        let yaw = self.params.model_orientation.yaw_degrees();
        if let Err(e) = scene.set_rotation(entity, Vec3::new(0.0, yaw, 0.0)) {
            log::warn!("[model] failed to rotate: {e}");
        }
    }
}

impl ViewAdapter for ModelAdapter {
    fn mode(&self) -> ViewMode {
        ViewMode::Model
    }

    fn state(&self) -> AdapterState {
        self.state
    }

    fn show(&mut self, scene: &mut dyn Scene, request: &ShowRequest<'_>) -> Result<(), SceneError> {
        let entity = self.ensure(scene);
        self.last_token = self.last_token.next();
        self.active_token = self.last_token;
        self.base_scale = 1.0;

        set_visible_logged(scene, entity, false);
        scene.set_scale(entity, Vec3::ONE)?;
        scene.set_content_offset(entity, Vec3::ZERO)?;
        scene.clear_model(entity)?;

        let src = request.src();
        if src.is_empty() {
            log::warn!("[model] no model source given");
            self.active_token = LoadToken::NONE;
            self.state = AdapterState::Pending;
            return Ok(());
        }
        if let Err(e) = scene.load_model(entity, src, self.active_token) {
            self.active_token = LoadToken::NONE;
            self.state = AdapterState::Hidden;
            return Err(e);
        }
        self.state = AdapterState::Pending;
        Ok(())
    }

    fn hide(&mut self, scene: &mut dyn Scene) {
        self.active_token = LoadToken::NONE;
        let Some(entity) = self.entity else {
            return;
        };
        if let Err(e) = scene.clear_model(entity) {
            log::warn!("[model] failed to clear model: {e}");
        }
        set_visible_logged(scene, entity, false);
        self.state = AdapterState::Hidden;
    }

    fn apply_params(&mut self, scene: &mut dyn Scene, params: &ViewerParams) {
        self.params = *params;
        if let (Some(entity), AdapterState::Shown) = (self.entity, self.state) {
            self.apply_transform(scene, entity);
        }
    }

    fn last_load_token(&self) -> LoadToken {
        self.last_token
    }

    fn model_loaded(&mut self, scene: &mut dyn Scene, token: LoadToken, outcome: ModelOutcome) {
        if token == LoadToken::NONE || token != self.active_token {
            log::debug!("[model] dropping result of superseded load {}", token.0);
            return;
        }
        let Some(entity) = self.entity else {
            return;
        };
        self.active_token = LoadToken::NONE;

        let bounds = match outcome {
            Ok(bounds) => bounds,
            Err(e) => {
                log::error!("[model] failed to load model: {e}");
                set_visible_logged(scene, entity, false);
                self.state = AdapterState::Hidden;
                return;
            }
        };

        match fit_to_target(&bounds, self.target_size) {
            Some(fit) => {
                if let Err(e) = scene.set_content_offset(entity, fit.center_offset) {
                    log::warn!("[model] failed to centre model: {e}");
                }
                self.base_scale = fit.scale_factor;
            }
            None => {
                log::warn!("[model] model has no geometry bounds, showing unscaled");
                self.base_scale = 1.0;
            }
        }
        self.state = AdapterState::Shown;
        self.apply_transform(scene, entity);
        set_visible_logged(scene, entity, true);
    }
}
