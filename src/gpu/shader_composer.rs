use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

use crate::error::PipelineError;

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads all shared WGSL modules at construction time. Consuming shaders
/// use `#import erdtree::module_name` to pull in shared code. The composer
/// produces `naga::Module` IR directly, skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path)
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/effects.wgsl"),
        file_path: "modules/effects.wgsl",
    },
];

/// Threshold shader source.
pub const THRESHOLD_WGSL: &str =
    include_str!("../../assets/shaders/screen/threshold.wgsl");
/// Blur shader source.
pub const BLUR_WGSL: &str = include_str!("../../assets/shaders/screen/blur.wgsl");
/// Composite shader source (three fragment entry points).
pub const COMPOSITE_WGSL: &str =
    include_str!("../../assets/shaders/screen/composite.wgsl");
/// Forward scene shader source.
pub const SCENE_WGSL: &str = include_str!("../../assets/shaders/raster/scene.wgsl");

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, PipelineError> {
        let mut composer = Composer::default();
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    PipelineError::Shader(format!(
                        "module '{}': {e:?}",
                        m.file_path
                    ))
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose a shader source string (which may contain `#import`
    /// directives) into a `wgpu::ShaderModule` ready for pipeline creation.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Shader`] when composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
    ) -> Result<wgpu::ShaderModule, PipelineError> {
        let naga_module = self.compose_naga(source, file_path).map_err(|e| {
            PipelineError::Shader(format!("'{file_path}': {e}"))
        })?;

        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module. Useful for testing shader composition without a GPU
    /// device.
    ///
    /// # Errors
    ///
    /// The composer error for invalid sources or unresolved imports.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, Box<naga_oil::compose::ComposerError>> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_shaders_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for (source, file_path) in [
            (THRESHOLD_WGSL, "threshold.wgsl"),
            (BLUR_WGSL, "blur.wgsl"),
            (COMPOSITE_WGSL, "composite.wgsl"),
            (SCENE_WGSL, "scene.wgsl"),
        ] {
            composer.compose_naga(source, file_path).unwrap_or_else(|e| {
                panic!("Shader '{file_path}' failed to compose: {e}")
            });
        }
    }

    #[test]
    fn composite_exposes_all_entry_points() {
        let mut composer = ShaderComposer::new().unwrap();
        let module = composer
            .compose_naga(COMPOSITE_WGSL, "composite.wgsl")
            .unwrap();
        let names: Vec<_> =
            module.entry_points.iter().map(|e| e.name.as_str()).collect();
        for entry in ["vs_main", "fs_bloom", "fs_glow", "fs_combined"] {
            assert!(names.contains(&entry), "missing {entry}");
        }
    }
}
