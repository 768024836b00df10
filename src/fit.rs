// fit.rs - centre a loaded model and scale it to a target size

use glam::Vec3;

/// Axis-aligned bounding box. `Aabb::EMPTY` is inverted so that any point
/// extends it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut b, p| {
            b.extend(p);
            b
        })
    }

    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Placement derived from a model's bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelFitResult {
    /// Translation applied to the model content so its box is centred on the
    /// entity origin.
    pub center_offset: Vec3,
    /// Uniform scale bringing the largest dimension to the target size.
    pub scale_factor: f32,
}

impl ModelFitResult {
    pub const IDENTITY: ModelFitResult = ModelFitResult {
        center_offset: Vec3::ZERO,
        scale_factor: 1.0,
    };
}

/// Returns `None` for an empty box: the caller keeps identity scale and still
/// shows the model.
pub fn fit_to_target(bounds: &Aabb, target_size: f32) -> Option<ModelFitResult> {
    if bounds.is_empty() {
        return None;
    }
    let center = bounds.center();
    let center_offset = if center.is_finite() { -center } else { Vec3::ZERO };

    let size = bounds.size();
    let max_dim = size.x.max(size.y).max(size.z);
    let scale_factor = if max_dim > 0.0 && max_dim.is_finite() {
        target_size / max_dim
    } else {
        1.0
    };

    Some(ModelFitResult {
        center_offset,
        scale_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_largest_dimension_to_target() {
        let b = Aabb::new(Vec3::new(-1.0, 0.0, -0.25), Vec3::new(1.0, 1.0, 0.25));
        let fit = fit_to_target(&b, 0.5).unwrap();
        assert_eq!(fit.scale_factor, 0.25);
        assert_eq!(fit.center_offset, Vec3::new(0.0, -0.5, 0.0));
    }

    #[test]
    fn empty_box_is_rejected() {
        assert!(fit_to_target(&Aabb::EMPTY, 0.5).is_none());
        assert!(Aabb::from_points(std::iter::empty()).is_empty());
    }

    #[test]
    fn degenerate_box_keeps_unit_scale() {
        let p = Vec3::new(3.0, 4.0, 5.0);
        let fit = fit_to_target(&Aabb::new(p, p), 0.5).unwrap();
        assert_eq!(fit.scale_factor, 1.0);
        assert_eq!(fit.center_offset, -p);
    }

    #[test]
    fn non_finite_center_is_not_applied() {
        let b = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(f32::INFINITY, 1.0, 1.0));
        let fit = fit_to_target(&b, 0.5).unwrap();
        assert_eq!(fit.center_offset, Vec3::ZERO);
        assert_eq!(fit.scale_factor, 1.0);
    }

    #[test]
    fn from_points_and_union() {
        let a = Aabb::from_points([Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0)]);
        let b = Aabb::from_points([Vec3::splat(-1.0)]);
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(u.size(), Vec3::new(2.0, 3.0, 4.0));
    }
}
