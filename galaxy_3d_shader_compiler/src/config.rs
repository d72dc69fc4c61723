/// Compiler configuration: target environment, validation rules and limits
///
/// Every pipeline compiles against one fixed target environment: a GLSL
/// dialect version, a Vulkan client version and a SPIR-V target version.
/// The defaults reproduce the engine's historical setup (Vulkan 1.1,
/// SPIR-V 1.2, entry point `main`).

use std::fmt;
use std::str::FromStr;
use bitflags::bitflags;
use crate::error::{Error, Result};

// ===== GLSL VERSION =====

/// GLSL dialect version assumed when a source has no `#version` directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GlslVersion {
    V400,
    V410,
    V420,
    V430,
    V440,
    V450,
    V460,
}

impl GlslVersion {
    /// Every recognized version, oldest first
    pub const ALL: [GlslVersion; 7] = [
        GlslVersion::V400,
        GlslVersion::V410,
        GlslVersion::V420,
        GlslVersion::V430,
        GlslVersion::V440,
        GlslVersion::V450,
        GlslVersion::V460,
    ];

    /// Numeric version as written in a `#version` directive
    pub fn number(&self) -> u32 {
        match self {
            GlslVersion::V400 => 400,
            GlslVersion::V410 => 410,
            GlslVersion::V420 => 420,
            GlslVersion::V430 => 430,
            GlslVersion::V440 => 440,
            GlslVersion::V450 => 450,
            GlslVersion::V460 => 460,
        }
    }

    /// Recognized version from its number
    pub fn from_number(number: u32) -> Option<Self> {
        GlslVersion::ALL.into_iter().find(|version| version.number() == number)
    }
}

impl FromStr for GlslVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().trim_end_matches(" core").trim_end_matches("core");
        digits
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(GlslVersion::from_number)
            .ok_or_else(|| Error::InvalidConfig(format!(
                "Unrecognized GLSL version '{}' (expected 400 to 460)", s)))
    }
}

// ===== VULKAN CLIENT =====

/// Vulkan client API version the SPIR-V is consumed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VulkanVersion {
    V1_0,
    V1_1,
    V1_2,
    V1_3,
}

impl VulkanVersion {
    /// Highest SPIR-V version a driver of this client version must accept
    pub fn max_spirv(&self) -> SpirvVersion {
        match self {
            VulkanVersion::V1_0 => SpirvVersion::V1_0,
            VulkanVersion::V1_1 => SpirvVersion::V1_3,
            VulkanVersion::V1_2 => SpirvVersion::V1_5,
            VulkanVersion::V1_3 => SpirvVersion::V1_6,
        }
    }

    /// `(major, minor)` pair
    pub fn version(&self) -> (u32, u32) {
        match self {
            VulkanVersion::V1_0 => (1, 0),
            VulkanVersion::V1_1 => (1, 1),
            VulkanVersion::V1_2 => (1, 2),
            VulkanVersion::V1_3 => (1, 3),
        }
    }

    pub(crate) fn to_env_version(self) -> shaderc::EnvVersion {
        match self {
            VulkanVersion::V1_0 => shaderc::EnvVersion::Vulkan1_0,
            VulkanVersion::V1_1 => shaderc::EnvVersion::Vulkan1_1,
            VulkanVersion::V1_2 => shaderc::EnvVersion::Vulkan1_2,
            VulkanVersion::V1_3 => shaderc::EnvVersion::Vulkan1_3,
        }
    }
}

impl fmt::Display for VulkanVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.version();
        write!(f, "vulkan{}.{}", major, minor)
    }
}

impl FromStr for VulkanVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let version = lower
            .strip_prefix("vulkan")
            .unwrap_or(&lower)
            .trim_start_matches(['_', ' '])
            .replace('_', ".");
        match version.as_str() {
            "1.0" => Ok(VulkanVersion::V1_0),
            "1.1" => Ok(VulkanVersion::V1_1),
            "1.2" => Ok(VulkanVersion::V1_2),
            "1.3" => Ok(VulkanVersion::V1_3),
            _ => Err(Error::InvalidConfig(format!(
                "Unrecognized Vulkan version '{}' (expected vulkan1.0 to vulkan1.3)", s))),
        }
    }
}

// ===== SPIR-V TARGET =====

/// SPIR-V binary format version of the emitted modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpirvVersion {
    V1_0,
    V1_1,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
    V1_6,
}

impl SpirvVersion {
    /// `(major, minor)` pair
    pub fn version(&self) -> (u8, u8) {
        match self {
            SpirvVersion::V1_0 => (1, 0),
            SpirvVersion::V1_1 => (1, 1),
            SpirvVersion::V1_2 => (1, 2),
            SpirvVersion::V1_3 => (1, 3),
            SpirvVersion::V1_4 => (1, 4),
            SpirvVersion::V1_5 => (1, 5),
            SpirvVersion::V1_6 => (1, 6),
        }
    }

    /// Version word found in the second word of a module header
    pub fn header_word(&self) -> u32 {
        let (major, minor) = self.version();
        ((major as u32) << 16) | ((minor as u32) << 8)
    }

    pub(crate) fn to_shaderc(self) -> shaderc::SpirvVersion {
        match self {
            SpirvVersion::V1_0 => shaderc::SpirvVersion::V1_0,
            SpirvVersion::V1_1 => shaderc::SpirvVersion::V1_1,
            SpirvVersion::V1_2 => shaderc::SpirvVersion::V1_2,
            SpirvVersion::V1_3 => shaderc::SpirvVersion::V1_3,
            SpirvVersion::V1_4 => shaderc::SpirvVersion::V1_4,
            SpirvVersion::V1_5 => shaderc::SpirvVersion::V1_5,
            SpirvVersion::V1_6 => shaderc::SpirvVersion::V1_6,
        }
    }
}

impl fmt::Display for SpirvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.version();
        write!(f, "spv{}.{}", major, minor)
    }
}

impl FromStr for SpirvVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let version = lower
            .strip_prefix("spirv")
            .or_else(|| lower.strip_prefix("spv"))
            .unwrap_or(&lower)
            .trim_start_matches(['_', ' ', '-'])
            .replace('_', ".");
        match version.as_str() {
            "1.0" => Ok(SpirvVersion::V1_0),
            "1.1" => Ok(SpirvVersion::V1_1),
            "1.2" => Ok(SpirvVersion::V1_2),
            "1.3" => Ok(SpirvVersion::V1_3),
            "1.4" => Ok(SpirvVersion::V1_4),
            "1.5" => Ok(SpirvVersion::V1_5),
            "1.6" => Ok(SpirvVersion::V1_6),
            _ => Err(Error::InvalidConfig(format!(
                "Unrecognized SPIR-V version '{}' (expected spv1.0 to spv1.6)", s))),
        }
    }
}

// ===== VALIDATION RULES =====

bitflags! {
    /// Validation rule set applied while compiling and linking
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValidationRules: u32 {
        /// SPIR-V generation rules; always required
        const SPIRV_RULES = 1 << 0;
        /// Vulkan client rules: explicit bindings and locations. Without
        /// them, bindings and locations are assigned automatically
        const CLIENT_RULES = 1 << 1;
        /// Dump the generated module as SPIR-V assembly at trace severity
        const AST_DUMP = 1 << 2;
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        let rules = ValidationRules::SPIRV_RULES | ValidationRules::CLIENT_RULES;
        if cfg!(debug_assertions) {
            rules | ValidationRules::AST_DUMP
        } else {
            rules
        }
    }
}

// ===== RESOURCE LIMITS =====

/// Built-in resource limits enforced at compile and link time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Highest vertex input location + 1
    pub max_vertex_attribs: u32,
    /// Highest fragment output location + 1
    pub max_draw_buffers: u32,
    /// Opaque resources declared by a single stage
    pub max_texture_image_units: u32,
    /// Opaque resources across the whole linked program
    pub max_combined_texture_image_units: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_vertex_attribs: 64,
            max_draw_buffers: 32,
            max_texture_image_units: 32,
            max_combined_texture_image_units: 80,
        }
    }
}

// ===== COMPILER CONFIG =====

/// Target environment shared by every stage of a pipeline
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Dialect version used when a source omits `#version`
    pub glsl_version: GlslVersion,
    /// Vulkan client version
    pub client: VulkanVersion,
    /// SPIR-V target version
    pub target: SpirvVersion,
    /// Validation rule set
    pub rules: ValidationRules,
    /// Entry point name written into the SPIR-V modules
    pub entry_point: String,
    /// Extra preprocessor definitions (`name`, `value`)
    pub defines: Vec<(String, String)>,
    /// Built-in resource limits
    pub limits: ResourceLimits,
    /// Reflect every declared resource, not only the ones an entry point uses
    pub reflect_all_resources: bool,
    /// Emit debug information (source text and line tables)
    pub debug_info: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            glsl_version: GlslVersion::V400,
            client: VulkanVersion::V1_1,
            target: SpirvVersion::V1_2,
            rules: ValidationRules::default(),
            entry_point: "main".to_string(),
            defines: Vec::new(),
            limits: ResourceLimits::default(),
            reflect_all_resources: true,
            debug_info: false,
        }
    }
}

impl CompilerConfig {
    /// Add a preprocessor definition
    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }

    /// Check that the options form a coherent target environment
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if:
    /// - the SPIR-V rule set is disabled
    /// - the SPIR-V target exceeds what the Vulkan client accepts
    /// - the entry point is not a valid identifier
    /// - a define name is not a valid identifier
    pub fn validate(&self) -> Result<()> {
        if !self.rules.contains(ValidationRules::SPIRV_RULES) {
            return Err(Error::InvalidConfig(
                "SPIR-V rules cannot be disabled when generating SPIR-V".to_string()));
        }

        if self.target > self.client.max_spirv() {
            return Err(Error::InvalidConfig(format!(
                "SPIR-V target {} exceeds the maximum supported by {} ({})",
                self.target, self.client, self.client.max_spirv())));
        }

        if !is_identifier(&self.entry_point) {
            return Err(Error::InvalidConfig(format!(
                "Entry point '{}' is not a valid identifier", self.entry_point)));
        }

        if let Some((name, _)) = self.defines.iter().find(|(name, _)| !is_identifier(name)) {
            return Err(Error::InvalidConfig(format!(
                "Preprocessor define '{}' is not a valid identifier", name)));
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
