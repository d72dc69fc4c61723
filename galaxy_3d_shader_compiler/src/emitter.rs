/// SpvEmitter: linked stages to SPIR-V word streams
///
/// Emission is a pure read of the linked program: the same program and stage
/// always produce the same words. Every emitted module is checked before it
/// is handed out (header words, and a spirq pass that must find the entry
/// point).

use crate::config::{CompilerConfig, SpirvVersion};
use crate::error::{Error, Result};
use crate::linker::LinkedProgram;
use crate::stage::ShaderStage;

const LOG_SOURCE: &str = "galaxy3d::shader::Emitter";

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

// ===== BINARY MODULE =====

/// SPIR-V module of one stage
///
/// An empty word sequence is the failure value returned by
/// `ShaderPipeline::emit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryModule {
    stage: ShaderStage,
    words: Vec<u32>,
}

impl BinaryModule {
    /// Empty (failed) module for `stage`
    pub fn empty(stage: ShaderStage) -> Self {
        Self {
            stage,
            words: Vec::new(),
        }
    }

    /// Stage the module was emitted for
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Whether emission failed
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of 32-bit words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// SPIR-V words
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// SPIR-V bytes, as expected by `ShaderDesc::code`
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Take the words out of the module
    pub fn into_words(self) -> Vec<u32> {
        self.words
    }
}

// ===== EMITTER =====

/// Hands out verified SPIR-V of linked stages for one target version
pub struct SpvEmitter {
    target: SpirvVersion,
}

impl SpvEmitter {
    /// Create an emitter for the config's SPIR-V target
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            target: config.target,
        }
    }

    /// SPIR-V version expected in module headers
    pub fn target(&self) -> SpirvVersion {
        self.target
    }

    /// Emit the SPIR-V module of `stage`
    ///
    /// # Errors
    ///
    /// Returns `Error::EmitFailed` if the stage is not part of the program
    /// or its module does not pass verification.
    pub fn emit(&self, program: &LinkedProgram, stage: ShaderStage) -> Result<BinaryModule> {
        let fail = |message: String| {
            crate::shader_error!(LOG_SOURCE, "{} shader generate failure: {}", stage, message);
            Error::EmitFailed { stage, message }
        };

        let unit = program
            .unit(stage)
            .ok_or_else(|| fail(format!("{} stage is not part of the linked program", stage)))?;

        let words = unit.words();
        self.verify(words, unit.entry_point()).map_err(fail)?;

        crate::shader_info!(LOG_SOURCE, "{} shader [{}] generate success, data size : {}",
            stage, unit.source_name(), words.len());

        Ok(BinaryModule { stage, words: words.to_vec() })
    }

    /// Header and entry point checks
    fn verify(&self, words: &[u32], entry_point: &str) -> std::result::Result<(), String> {
        if words.len() < 5 {
            return Err(format!("module too short ({} words)", words.len()));
        }
        if words[0] != SPIRV_MAGIC {
            return Err(format!("bad magic number {:#010x}", words[0]));
        }
        if words[1] != self.target.header_word() {
            return Err(format!(
                "version word {:#010x} does not match target {}", words[1], self.target));
        }

        let entry_points = spirq::ReflectConfig::new()
            .spv(words)
            .ref_all_rscs(true)
            .reflect()
            .map_err(|e| format!("SPIR-V reflection failed: {:?}", e))?;

        let entry = entry_points
            .iter()
            .find(|ep| ep.name == entry_point)
            .ok_or_else(|| format!("entry point '{}' missing from module", entry_point))?;

        crate::shader_trace!(LOG_SOURCE, "entry point '{}' verified: {} interface variable(s)",
            entry.name, entry.vars.len());

        Ok(())
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
