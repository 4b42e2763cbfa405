//! Cameras used by the pipeline.
//!
//! A perspective [`Camera`] views the scene; an orthographic [`OrthoCamera`]
//! frames the full-screen quads of the post-processing passes.

/// Perspective camera and GPU uniform.
pub mod core;
/// Orthographic camera for full-screen quads.
pub mod ortho;

use std::cell::RefCell;
use std::rc::Rc;

pub use self::core::{Camera, CameraUniform};
pub use self::ortho::OrthoCamera;

/// Single-threaded shared camera handle.
pub type SharedCamera = Rc<RefCell<Camera>>;
