//! Stereo media viewer core.
//!
//! Picks a view mode for each media source (flat, side-by-side, VR180,
//! VR360, 3D model), drives the per-mode adapters against an abstract
//! [`scene::Scene`], and remaps stereo textures per rendered eye. The
//! desktop binary supplies the wgpu scene, the window and the loaders.

pub mod adapter;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod fit;
pub mod headless;
pub mod immersive;
pub mod media;
pub mod mesh;
pub mod mode;
pub mod params;
pub mod scene;
pub mod stereo;

pub use dispatcher::{AdapterRegistry, ViewDispatcher};
pub use mode::{detect, ViewMode};
