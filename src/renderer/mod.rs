//! The layered multi-pass renderer.
//!
//! Each frame runs a fixed stage sequence through a
//! [`RenderBackend`](crate::backend::RenderBackend):
//!
//! 1. [`glow`]: glow-tagged geometry into the glow target.
//! 2. [`bloom`]: bloom-tagged geometry into target A, soft threshold into B,
//!    then separable blur ping-pong between A and B.
//! 3. [`main_scene`]: default and bloom layers onto the screen.
//! 4. [`composite`]: bloom and glow added onto the screen without clearing.
//!
//! [`RenderPipeline`] owns the stages and propagates resize and destroy.

pub mod bloom;
pub mod composite;
pub mod filter;
pub mod glow;
pub mod main_scene;
mod pipeline;
pub mod quad;
pub mod stage;
pub mod target;

pub use pipeline::{FrameReport, RenderPipeline};
