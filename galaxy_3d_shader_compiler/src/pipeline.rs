/// ShaderPipeline: compile, link, then reflect or emit
///
/// The pipeline drives the per-stage compiler, the linker, the reflection
/// extractor and the emitter in order:
///
/// ```text
/// Created --compile()--> Compiled --link()--> Linked --reflect()--> Reflected
///                                       \
///                                        +--> LinkFailed
/// ```
///
/// A stage that fails to compile is left out of the program instead of
/// aborting its siblings. Once linked, emission and reflection are
/// repeatable reads of the frozen program.

use std::path::Path;
use std::sync::Arc;
use crate::backend::{BackendGuard, ShaderBackend};
use crate::compiler::{CompiledUnit, StageCompiler};
use crate::config::CompilerConfig;
use crate::emitter::{BinaryModule, SpvEmitter};
use crate::error::{Error, Result};
use crate::linker::{LinkedProgram, ProgramLinker};
use crate::reflection::{ReflectionExtractor, ShaderDetail};
use crate::source::ShaderSource;
use crate::stage::ShaderStage;

const LOG_SOURCE: &str = "galaxy3d::shader::Pipeline";

/// Lifecycle state of a `ShaderPipeline`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Accepting stage sources
    Created,
    /// Every requested stage went through the compiler
    Compiled,
    /// Program linked, ready for reflection and emission
    Linked,
    /// Reflection extracted (emission still available)
    Reflected,
    /// Link attempted and failed, nothing left to do
    LinkFailed,
}

/// Compile/link/reflect/emit driver for one shader program
pub struct ShaderPipeline {
    compiler: StageCompiler,
    emitter: SpvEmitter,
    state: PipelineState,
    requested: Vec<(ShaderStage, ShaderSource)>,
    units: Vec<Arc<CompiledUnit>>,
    program: Option<LinkedProgram>,
    detail: Option<ShaderDetail>,
}

impl ShaderPipeline {
    /// Create an empty pipeline for one target environment
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration is rejected.
    pub fn new(backend: &BackendGuard, config: CompilerConfig) -> Result<Self> {
        let emitter = SpvEmitter::new(&config);
        let compiler = StageCompiler::new(backend, config)?;
        Ok(Self {
            compiler,
            emitter,
            state: PipelineState::Created,
            requested: Vec::new(),
            units: Vec::new(),
            program: None,
            detail: None,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &CompilerConfig {
        self.compiler.config()
    }

    /// Stages added so far, in insertion order
    pub fn requested_stages(&self) -> Vec<ShaderStage> {
        self.requested.iter().map(|(stage, _)| *stage).collect()
    }

    /// Stages that compiled successfully
    pub fn compiled_stages(&self) -> Vec<ShaderStage> {
        self.units.iter().map(|unit| unit.stage()).collect()
    }

    /// Linked program, once `link()` succeeded
    pub fn program(&self) -> Option<&LinkedProgram> {
        self.program.as_ref()
    }

    /// Request `stage` to be compiled from `source`
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` if the pipeline was already compiled
    /// - `Error::DuplicateStage` if `stage` was already requested
    pub fn add_stage(&mut self, stage: ShaderStage, source: ShaderSource) -> Result<()> {
        self.check_new_stage(stage)?;
        crate::shader_debug!(LOG_SOURCE, "{} stage requested from [{}]", stage, source.name());
        self.requested.push((stage, source));
        Ok(())
    }

    /// Request `stage` to be compiled from the file at `path`
    ///
    /// # Errors
    ///
    /// Same as `add_stage`, plus `Error::LoadFailed` if the file is missing,
    /// unreadable or empty. The stage is then left absent.
    pub fn add_stage_file(&mut self, stage: ShaderStage, path: impl AsRef<Path>) -> Result<()> {
        self.check_new_stage(stage)?;
        let source = ShaderSource::from_file(path)?;
        self.add_stage(stage, source)
    }

    fn check_new_stage(&self, stage: ShaderStage) -> Result<()> {
        if self.state != PipelineState::Created {
            crate::shader_bail!(LOG_SOURCE, Error::InvalidState(format!(
                "cannot add the {} stage in {:?} state", stage, self.state)));
        }
        if self.requested.iter().any(|(existing, _)| *existing == stage) {
            crate::shader_bail!(LOG_SOURCE, Error::DuplicateStage(stage));
        }
        Ok(())
    }

    /// Compile every requested stage independently
    ///
    /// The pipeline moves to `Compiled` even when some stages fail; the
    /// failed stages are simply absent from the later link.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` if not in `Created` state
    /// - the stage error if one stage failed, `Error::Multiple` if several did
    pub fn compile(&mut self) -> Result<()> {
        if self.state != PipelineState::Created {
            crate::shader_bail!(LOG_SOURCE, Error::InvalidState(format!(
                "compile() called in {:?} state", self.state)));
        }

        let mut errors = Vec::new();
        for (stage, source) in &self.requested {
            match self.compiler.compile(source, *stage) {
                Ok(unit) => self.units.push(Arc::new(unit)),
                Err(error) => errors.push(error),
            }
        }
        self.state = PipelineState::Compiled;

        crate::shader_debug!(LOG_SOURCE, "compiled {}/{} stage(s)",
            self.units.len(), self.requested.len());

        match Error::aggregate(errors) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Link the compiled stages
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` if not in `Compiled` state
    /// - `Error::LinkFailed` if no stage compiled or the stages do not link;
    ///   the pipeline then moves to `LinkFailed`
    pub fn link(&mut self) -> Result<()> {
        if self.state != PipelineState::Compiled {
            crate::shader_bail!(LOG_SOURCE, Error::InvalidState(format!(
                "link() called in {:?} state", self.state)));
        }

        match self.link_units() {
            Ok(program) => {
                self.program = Some(program);
                self.state = PipelineState::Linked;
                Ok(())
            }
            Err(error) => {
                self.state = PipelineState::LinkFailed;
                Err(error)
            }
        }
    }

    fn link_units(&self) -> Result<LinkedProgram> {
        let mut linker = ProgramLinker::new(self.compiler.config());
        for unit in &self.units {
            linker.add_stage(Arc::clone(unit))?;
        }
        linker.link()
    }

    /// Build and extract the reflection of the linked program
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless the program is linked.
    pub fn reflect(&mut self) -> Result<&ShaderDetail> {
        let program = self.linked_program("reflect()")?;
        let detail = ReflectionExtractor::build_reflection(program).extract();

        crate::shader_debug!(LOG_SOURCE, "reflection extracted: {} uniform(s), {} pipeline io",
            detail.uniforms.len(), detail.pipeline_io.len());

        self.state = PipelineState::Reflected;
        Ok(&*self.detail.insert(detail))
    }

    /// Reflection extracted by the last `reflect()` call
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if `reflect()` has not been called.
    pub fn detail(&self) -> Result<&ShaderDetail> {
        match (&self.state, &self.detail) {
            (PipelineState::Reflected, Some(detail)) => Ok(detail),
            _ => Err(ShaderBackend::log_and_return_error(LOG_SOURCE, Error::InvalidState(format!(
                "detail() called in {:?} state", self.state)))),
        }
    }

    /// Emit the SPIR-V module of `stage`
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` unless the program is linked
    /// - `Error::EmitFailed` if the stage is not linked or emission fails
    pub fn try_emit(&self, stage: ShaderStage) -> Result<BinaryModule> {
        let program = self.linked_program("emit()")?;
        self.emitter.emit(program, stage)
    }

    /// Emit the SPIR-V module of `stage`, empty on any failure
    pub fn emit(&self, stage: ShaderStage) -> BinaryModule {
        self.try_emit(stage)
            .unwrap_or_else(|_| BinaryModule::empty(stage))
    }

    /// Emit every linked stage, in pipeline order
    ///
    /// # Errors
    ///
    /// Same as `try_emit`, stopping at the first failing stage.
    pub fn emit_all(&self) -> Result<Vec<BinaryModule>> {
        let program = self.linked_program("emit_all()")?;
        program
            .stages()
            .into_iter()
            .map(|stage| self.emitter.emit(program, stage))
            .collect()
    }

    fn linked_program(&self, operation: &str) -> Result<&LinkedProgram> {
        match (&self.state, &self.program) {
            (PipelineState::Linked | PipelineState::Reflected, Some(program)) => Ok(program),
            _ => Err(ShaderBackend::log_and_return_error(LOG_SOURCE, Error::InvalidState(format!(
                "{} called in {:?} state", operation, self.state)))),
        }
    }
}

// ===== ONE-SHOT HELPERS =====

/// Compile, link and emit a single stage
///
/// Returns an empty module on any failure (the failure is logged).
pub fn glsl_to_spv(
    backend: &BackendGuard,
    source: &ShaderSource,
    stage: ShaderStage,
    config: CompilerConfig,
) -> BinaryModule {
    let build = || -> Result<BinaryModule> {
        let mut pipeline = ShaderPipeline::new(backend, config)?;
        pipeline.add_stage(stage, source.clone())?;
        pipeline.compile()?;
        pipeline.link()?;
        pipeline.try_emit(stage)
    };
    build().unwrap_or_else(|_| BinaryModule::empty(stage))
}

/// Compile and link a vertex/fragment pair, then extract its reflection
///
/// Either stage may be omitted; at least one must be given.
///
/// # Errors
///
/// Fails if any given stage fails to compile, or if the link fails.
pub fn gen_glsl_detail(
    backend: &BackendGuard,
    vertex: Option<ShaderSource>,
    fragment: Option<ShaderSource>,
    config: CompilerConfig,
) -> Result<ShaderDetail> {
    let mut pipeline = ShaderPipeline::new(backend, config)?;
    if let Some(source) = vertex {
        pipeline.add_stage(ShaderStage::Vertex, source)?;
    }
    if let Some(source) = fragment {
        pipeline.add_stage(ShaderStage::Fragment, source)?;
    }
    pipeline.compile()?;
    pipeline.link()?;
    pipeline.reflect().cloned()
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
