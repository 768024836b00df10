// params.rs - externally pushed viewer overrides

use crate::error::ViewError;
use serde::{Deserialize, Serialize};

/// Yaw applied to a model, replacing the default facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelOrientation {
    #[default]
    Front,
    Back,
    Left,
    Right,
}

impl ModelOrientation {
    /// Entity yaw in degrees. `Front` matches the default model facing.
    pub fn yaw_degrees(self) -> f32 {
        match self {
            ModelOrientation::Front => 180.0,
            ModelOrientation::Right => 90.0,
            ModelOrientation::Back => 0.0,
            ModelOrientation::Left => 270.0,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Some(Self::Front),
            "back" => Some(Self::Back),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerParams {
    /// Multiplier on top of the fitted model scale; must be finite and > 0.
    pub model_scale: f32,
    pub model_orientation: ModelOrientation,
}

impl Default for ViewerParams {
    fn default() -> Self {
        Self {
            model_scale: 1.0,
            model_orientation: ModelOrientation::Front,
        }
    }
}

/// Holds the current overrides. Every assignment is validated; a rejected
/// field leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    params: ViewerParams,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &ViewerParams {
        &self.params
    }

    pub fn set_model_scale(&mut self, scale: f32) -> Result<(), ViewError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ViewError::InvalidParam {
                name: "modelScale",
                reason: format!("{scale} is not a positive finite number"),
            });
        }
        self.params.model_scale = scale;
        Ok(())
    }

    pub fn set_model_orientation(&mut self, orientation: ModelOrientation) {
        self.params.model_orientation = orientation;
    }

    /// Merge a JSON `params` object. Unknown keys are ignored; recognised keys
    /// with bad values are reported after every valid key has been applied.
    /// Returns whether anything changed.
    pub fn merge_json(&mut self, value: &serde_json::Value) -> Result<bool, ViewError> {
        let Some(obj) = value.as_object() else {
            return Err(ViewError::InvalidParam {
                name: "params",
                reason: "expected a JSON object".into(),
            });
        };

        let before = self.params;
        let mut first_err = None;

        if let Some(v) = obj.get("modelScale") {
            let parsed = match v {
                serde_json::Value::Number(n) => n.as_f64().map(|f| f as f32),
                serde_json::Value::String(s) => s.trim().parse::<f32>().ok(),
                _ => None,
            };
            let res = match parsed {
                Some(scale) => self.set_model_scale(scale),
                None => Err(ViewError::InvalidParam {
                    name: "modelScale",
                    reason: format!("not a number: {v}"),
                }),
            };
            if let Err(e) = res {
                first_err.get_or_insert(e);
            }
        }

        if let Some(v) = obj.get("modelOrientation") {
            match v.as_str().and_then(ModelOrientation::parse) {
                Some(o) => self.set_model_orientation(o),
                None => {
                    first_err.get_or_insert(ViewError::InvalidParam {
                        name: "modelOrientation",
                        reason: format!("expected front, back, left or right, got {v}"),
                    });
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(self.params != before),
        }
    }

    /// The store as a `{"type":"params","params":{...}}` payload.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "type": "params", "params": self.params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let store = ParameterStore::new();
        assert_eq!(store.get().model_scale, 1.0);
        assert_eq!(store.get().model_orientation, ModelOrientation::Front);
    }

    #[test]
    fn rejects_non_positive_scale() {
        let mut store = ParameterStore::new();
        assert!(store.set_model_scale(0.0).is_err());
        assert!(store.set_model_scale(-2.0).is_err());
        assert!(store.set_model_scale(f32::NAN).is_err());
        assert_eq!(store.get().model_scale, 1.0);
        store.set_model_scale(2.0).unwrap();
        assert_eq!(store.get().model_scale, 2.0);
    }

    #[test]
    fn merges_known_keys() {
        let mut store = ParameterStore::new();
        let changed = store
            .merge_json(&json!({ "modelScale": 2, "modelOrientation": "Left", "other": true }))
            .unwrap();
        assert!(changed);
        assert_eq!(store.get().model_scale, 2.0);
        assert_eq!(store.get().model_orientation, ModelOrientation::Left);

        let changed = store.merge_json(&json!({ "modelScale": "2.0" })).unwrap();
        assert!(!changed);
    }

    #[test]
    fn bad_value_keeps_the_good_ones() {
        let mut store = ParameterStore::new();
        let err = store
            .merge_json(&json!({ "modelScale": -1, "modelOrientation": "back" }))
            .unwrap_err();
        assert!(matches!(err, ViewError::InvalidParam { name: "modelScale", .. }));
        assert_eq!(store.get().model_scale, 1.0);
        assert_eq!(store.get().model_orientation, ModelOrientation::Back);

        assert!(store.merge_json(&json!({ "modelOrientation": "up" })).is_err());
        assert!(store.merge_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn payload_shape() {
        let mut store = ParameterStore::new();
        store.set_model_scale(0.5).unwrap();
        let p = store.to_payload();
        assert_eq!(p["type"], "params");
        assert_eq!(p["params"]["modelScale"], 0.5);
        assert_eq!(p["params"]["modelOrientation"], "front");
    }

    #[test]
    fn orientation_yaw() {
        assert_eq!(ModelOrientation::Front.yaw_degrees(), 180.0);
        assert_eq!(ModelOrientation::Back.yaw_degrees(), 0.0);
    }
}
