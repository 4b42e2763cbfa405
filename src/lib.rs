// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Documentation
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::private_intra_doc_links)]
#![warn(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![warn(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![warn(clippy::cognitive_complexity)]
#![warn(clippy::too_many_lines)]
#![warn(clippy::excessive_nesting)]
// Function signature hygiene
#![warn(clippy::too_many_arguments)]
#![warn(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::implicit_clone)]
// String hygiene
#![warn(clippy::inefficient_to_string)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::manual_string_new)]
#![warn(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![warn(unused_results)]
#![warn(unused_qualifications)]
// Cast hygiene
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]

//! Layered multi-pass post-processing renderer built on wgpu.
//!
//! erdtree-fx renders a scene in four fixed stages per frame: a glow capture
//! into an off-screen target, a bloom capture followed by a soft threshold
//! and a separable Gaussian blur, the main scene onto the screen, and an
//! additive composite of the bloom and glow textures on top of it. The glow
//! is anchored to the screen projection of a registered 3D glow source.
//!
//! # Key entry points
//!
//! - [`renderer::RenderPipeline`] - owns the stages, their targets and
//!   quads; `render()`, `resize()` and `destroy()`
//! - [`backend::RenderBackend`] - the graphics seam, implemented by
//!   [`gpu::WgpuBackend`] and the CPU reference [`backend::SoftwareBackend`]
//! - [`layers::PassConfig`] - which render layers each pass sees
//! - [`options::Options`] - bloom, glow and composite parameters with TOML
//!   presets and a JSON schema
//! - [`scene::Scene`] - drawables tagged with render layers, plus the glow
//!   source registration
//!
//! # Architecture
//!
//! The pipeline is single-threaded and driven by the host's frame callback.
//! Scene and camera are shared with the host through `Rc<RefCell<_>>`; the
//! viewport and the clock are read through [`viewport::ViewportSource`] and
//! [`util::frame_timing::Clock`]. Each scene pass hands the backend an
//! explicit layer mask instead of mutating the camera.

pub mod backend;
pub mod camera;
pub mod error;
pub mod gpu;
pub mod layers;
pub mod options;
pub mod renderer;
pub mod scene;
pub mod util;
#[cfg(feature = "viewer")]
pub mod viewer;
pub mod viewport;

pub use error::PipelineError;
