// stereo.rs - per-eye texture remapping for side-by-side stereo sources
//
// A combined SBS image carries the left eye in u ∈ [0, 0.5) and the right eye
// in u ∈ [0.5, 1). Everything here is pure; adapters call it from their
// per-frame update.

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
    Mono,
}

/// Which half is shown when there is no per-eye signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonoEye {
    #[default]
    Left,
    Right,
}

impl MonoEye {
    pub fn toggled(self) -> Self {
        match self {
            MonoEye::Left => MonoEye::Right,
            MonoEye::Right => MonoEye::Left,
        }
    }
}

impl Eye {
    /// Collapse `Mono` onto the configured default eye.
    pub fn or_mono(self, mono_eye: MonoEye) -> Eye {
        match (self, mono_eye) {
            (Eye::Mono, MonoEye::Left) => Eye::Left,
            (Eye::Mono, MonoEye::Right) => Eye::Right,
            (eye, _) => eye,
        }
    }

    /// Shader-side encoding: 0 left, 1 right, 2 mono.
    pub fn index(self) -> u32 {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
            Eye::Mono => 2,
        }
    }
}

/// How the stereo pair is laid onto geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoLayout {
    /// No stereo split; the whole image is shown.
    None,
    /// Flat plane seen from the front.
    Plane,
    /// Sphere interior; sampling direction is mirrored.
    InsideSphere,
    /// Old hemisphere split: each eye sees its half, the other half of the
    /// sphere is painted black. Selection happens per fragment, see
    /// [`legacy_sample_u`].
    LegacyHalfTurn { half_turn: bool },
}

/// Horizontal UV remap for one eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub repeat_x: f32,
    pub offset_x: f32,
}

impl TextureTransform {
    pub const IDENTITY: TextureTransform = TextureTransform {
        repeat_x: 1.0,
        offset_x: 0.0,
    };

    /// Source span `[lo, hi]` this transform samples for u ∈ [0, 1].
    pub fn sampled_span(&self) -> (f32, f32) {
        let a = self.offset_x;
        let b = self.offset_x + self.repeat_x;
        (a.min(b), a.max(b))
    }
}

/// Full 2D UV transform handed to the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub repeat: Vec2,
    pub offset: Vec2,
}

impl UvTransform {
    pub const IDENTITY: UvTransform = UvTransform {
        repeat: Vec2::ONE,
        offset: Vec2::ZERO,
    };
}

impl Default for UvTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<TextureTransform> for UvTransform {
    fn from(t: TextureTransform) -> Self {
        UvTransform {
            repeat: Vec2::new(t.repeat_x, 1.0),
            offset: Vec2::new(t.offset_x, 0.0),
        }
    }
}

pub fn compute_transform(layout: StereoLayout, eye: Eye, mono_eye: MonoEye) -> TextureTransform {
    let eye = eye.or_mono(mono_eye);
    match layout {
        StereoLayout::None | StereoLayout::LegacyHalfTurn { .. } => TextureTransform::IDENTITY,
        StereoLayout::Plane => TextureTransform {
            repeat_x: 0.5,
            offset_x: if eye == Eye::Right { 0.5 } else { 0.0 },
        },
        StereoLayout::InsideSphere => TextureTransform {
            repeat_x: -0.5,
            offset_x: if eye == Eye::Right { 1.0 } else { 0.5 },
        },
    }
}

/// Per-eye viewport reported by the render context, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// What the render context knows about the pass being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameContext {
    pub presenting: bool,
    pub viewport: Option<Viewport>,
}

impl FrameContext {
    pub fn windowed() -> Self {
        Self::default()
    }

    pub fn eye_pass(viewport: Viewport) -> Self {
        Self {
            presenting: true,
            viewport: Some(viewport),
        }
    }
}

/// The eye being rendered. A right-eye viewport starts to the right of the
/// origin; without a viewport and outside a session the mono eye is used.
pub fn resolve_eye(frame: &FrameContext, mono_eye: MonoEye) -> Eye {
    match frame.viewport {
        Some(vp) if vp.x > 0.0 => Eye::Right,
        Some(_) => Eye::Left,
        None if !frame.presenting => Eye::Mono.or_mono(mono_eye),
        None => Eye::Mono,
    }
}

/// Legacy half-turn split for one fragment. Returns the horizontal sample
/// coordinate, or `None` where the fragment is painted black.
///
/// The arithmetic matches the WGSL path in `shader.wgsl` step for step.
pub fn legacy_sample_u(u: f32, eye: Eye, half_turn: bool) -> Option<f32> {
    let mut x = u;
    if half_turn {
        x = (x + 0.5).fract();
    }
    x = if x <= 0.5 {
        -1.0
    } else if eye == Eye::Right {
        -0.5 + x
    } else {
        x
    };
    let s = 1.0 - x;
    if s >= 1.0 {
        None
    } else {
        Some(s)
    }
}

const EQUIRECT_ASPECT: f32 = 2.0;

/// Crop a non-2:1 panorama to the centred 2:1 region.
pub fn equirect_fit(width: u32, height: u32) -> UvTransform {
    let aspect = if height == 0 {
        EQUIRECT_ASPECT
    } else {
        width as f32 / height as f32
    };
    let mut t = UvTransform::IDENTITY;
    if aspect > EQUIRECT_ASPECT {
        t.repeat.x = EQUIRECT_ASPECT / aspect;
        t.offset.x = (1.0 - t.repeat.x) / 2.0;
    } else if aspect < EQUIRECT_ASPECT {
        t.repeat.y = aspect / EQUIRECT_ASPECT;
        t.offset.y = (1.0 - t.repeat.y) / 2.0;
    }
    t
}
