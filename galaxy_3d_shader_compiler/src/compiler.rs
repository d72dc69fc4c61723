/// StageCompiler: one GLSL stage to a validated SPIR-V unit
///
/// Each stage is compiled on its own by glslang (through shaderc) against
/// the pipeline's fixed target environment. The result is a `CompiledUnit`
/// that the linker and the emitter share through `Arc`.

use std::borrow::Cow;
use crate::backend::{BackendGuard, ShaderBackend};
use crate::config::{CompilerConfig, ValidationRules};
use crate::error::{Error, Result};
use crate::interface::{self, StageInterface};
use crate::log::LogSeverity;
use crate::source::ShaderSource;
use crate::stage::ShaderStage;

const LOG_SOURCE: &str = "galaxy3d::shader::Compiler";

const EXPLICIT_LAYOUT_EXTENSIONS: &str = "\
#extension GL_ARB_separate_shader_objects : enable
#extension GL_ARB_shading_language_420pack : enable
";

// ===== COMPILED UNIT =====

/// Compiled SPIR-V of exactly one stage, with its interface tables
#[derive(Debug)]
pub struct CompiledUnit {
    stage: ShaderStage,
    source_name: String,
    entry_point: String,
    words: Vec<u32>,
    interface: StageInterface,
}

impl CompiledUnit {
    /// Stage this unit was compiled for
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Name of the source it was compiled from
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Entry point name
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Inputs, outputs and bound resources of the entry point
    pub fn interface(&self) -> &StageInterface {
        &self.interface
    }

    pub(crate) fn words(&self) -> &[u32] {
        &self.words
    }
}

// ===== STAGE COMPILER =====

/// Compiles single stages for one fixed target environment
pub struct StageCompiler {
    _backend: BackendGuard,
    config: CompilerConfig,
}

impl StageCompiler {
    /// Create a compiler bound to an initialized backend
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration is rejected.
    pub fn new(backend: &BackendGuard, config: CompilerConfig) -> Result<Self> {
        config.validate()
            .map_err(|e| ShaderBackend::log_and_return_error(LOG_SOURCE, e))?;
        Ok(Self {
            _backend: backend.clone(),
            config,
        })
    }

    /// Target environment
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `source` as `stage`
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedStage` for stages with no glslang shader kind
    /// - `Error::CompileFailed` for preprocessor, parse, semantic, client-rule
    ///   or limit failures
    pub fn compile(&self, source: &ShaderSource, stage: ShaderStage) -> Result<CompiledUnit> {
        let Some(kind) = stage.to_shader_kind() else {
            return Err(ShaderBackend::log_and_return_error(LOG_SOURCE, Error::UnsupportedStage(stage)));
        };

        let fail = |log: String| {
            crate::shader_error!(LOG_SOURCE,
                "compile [{}] failure, this shader has been ignored", source.name());
            crate::shader_debug!(LOG_SOURCE, "{}", log);
            Error::CompileFailed { stage, log }
        };

        let compiler = shaderc::Compiler::new()
            .ok_or_else(|| fail("failed to initialize the glslang compiler".to_string()))?;
        let options = self.compile_options()
            .ok_or_else(|| fail("failed to create glslang compile options".to_string()))?;

        let text = self.versioned_text(source);
        let entry_point = self.config.entry_point.as_str();

        let artifact = compiler
            .compile_into_spirv(&text, kind, source.name(), entry_point, Some(&options))
            .map_err(|e| fail(e.to_string()))?;

        if artifact.get_num_warnings() > 0 {
            crate::shader_warn!(LOG_SOURCE, "compile [{}] warnings:\n{}",
                source.name(), artifact.get_warning_messages().trim_end());
        }

        if self.config.rules.contains(ValidationRules::AST_DUMP) && ShaderBackend::wants(LogSeverity::Trace) {
            if let Ok(assembly) = compiler.compile_into_spirv_assembly(
                &text, kind, source.name(), entry_point, Some(&options)) {
                crate::shader_trace!(LOG_SOURCE, "[{}] SPIR-V:\n{}", source.name(), assembly.as_text());
            }
        }

        let words = artifact.as_binary().to_vec();
        let interface = interface::extract(&words, entry_point).map_err(fail)?;
        self.check_limits(stage, &interface).map_err(fail)?;

        crate::shader_debug!(LOG_SOURCE,
            "compile [{}] as {} stage: {} inputs, {} outputs, {} resources",
            source.name(), stage,
            interface.inputs.len(), interface.outputs.len(), interface.resources.len());

        Ok(CompiledUnit {
            stage,
            source_name: source.name().to_string(),
            entry_point: entry_point.to_string(),
            words,
            interface,
        })
    }

    /// glslang options for the configured target environment
    fn compile_options(&self) -> Option<shaderc::CompileOptions<'static>> {
        let config = &self.config;
        let mut options = shaderc::CompileOptions::new()?;

        options.set_source_language(shaderc::SourceLanguage::GLSL);
        options.set_target_env(shaderc::TargetEnv::Vulkan, config.client.to_env_version() as u32);
        options.set_target_spirv(config.target.to_shaderc());

        for (name, value) in &config.defines {
            options.add_macro_definition(name, Some(value.as_str()));
        }

        if !config.rules.contains(ValidationRules::CLIENT_RULES) {
            options.set_auto_bind_uniforms(true);
            options.set_auto_map_locations(true);
        }

        if config.debug_info {
            options.set_generate_debug_info();
        }

        let limits = &config.limits;
        for (limit, value) in [
            (shaderc::Limit::MaxVertexAttribs, limits.max_vertex_attribs),
            (shaderc::Limit::MaxDrawBuffers, limits.max_draw_buffers),
            (shaderc::Limit::MaxTextureImageUnits, limits.max_texture_image_units),
            (shaderc::Limit::MaxCombinedTextureImageUnits, limits.max_combined_texture_image_units),
        ] {
            options.set_limit(limit, i32::try_from(value).unwrap_or(i32::MAX));
        }

        Some(options)
    }

    /// Source text with the default `#version` prepended when missing
    ///
    /// Below 420 the preamble also enables the extensions that explicit
    /// `location` and `binding` qualifiers need. `#line 1` keeps diagnostic
    /// line numbers aligned with the caller's text.
    fn versioned_text<'a>(&self, source: &'a ShaderSource) -> Cow<'a, str> {
        if source.has_version_directive() {
            return Cow::Borrowed(source.text());
        }

        let version = self.config.glsl_version.number();
        let extensions = if version < 420 { EXPLICIT_LAYOUT_EXTENSIONS } else { "" };
        Cow::Owned(format!("#version {}\n{}#line 1\n{}", version, extensions, source.text()))
    }

    fn check_limits(&self, stage: ShaderStage, interface: &StageInterface) -> std::result::Result<(), String> {
        let limits = &self.config.limits;

        let exceeds = |var: &interface::InterfaceVariable, max: u32| {
            var.location
                .checked_add(var.location_count())
                .map_or(true, |end| end > max)
        };

        if stage == ShaderStage::Vertex {
            if let Some(input) = interface.inputs.iter().find(|v| exceeds(v, limits.max_vertex_attribs)) {
                return Err(format!(
                    "vertex input '{}' at location {} ({} location(s)) exceeds max_vertex_attribs ({})",
                    input.name, input.location, input.location_count(), limits.max_vertex_attribs));
            }
        }

        if stage == ShaderStage::Fragment {
            if let Some(output) = interface.outputs.iter().find(|v| exceeds(v, limits.max_draw_buffers)) {
                return Err(format!(
                    "fragment output '{}' at location {} ({} location(s)) exceeds max_draw_buffers ({})",
                    output.name, output.location, output.location_count(), limits.max_draw_buffers));
            }
        }

        let opaque = interface.opaque_count();
        if opaque > limits.max_texture_image_units {
            return Err(format!(
                "{} opaque resources exceed max_texture_image_units ({})",
                opaque, limits.max_texture_image_units));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
