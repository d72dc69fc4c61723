/// Shader stage tags and stage bit-sets
///
/// `ShaderStage` is a closed set. Ray-tracing and mesh stages live in a
/// separate `ExtensionStage` enum so callers cannot branch on them by
/// accident. Every concrete stage maps to a glslang shader kind.

use std::fmt;
use bitflags::bitflags;

// ===== SHADER STAGE =====

/// Pipeline stage a shader is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Tessellation control shader
    TessControl,
    /// Tessellation evaluation shader
    TessEvaluation,
    /// Geometry shader
    Geometry,
    /// Fragment/Pixel shader
    Fragment,
    /// Compute shader
    Compute,
    /// Optional ray-tracing or mesh stage
    Extension(ExtensionStage),
    /// No single stage (empty or multi-stage mask)
    Undefined,
}

/// Optional ray-tracing and mesh-shading stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionStage {
    RayGen,
    Intersect,
    AnyHit,
    ClosestHit,
    Miss,
    Callable,
    Task,
    Mesh,
}

impl ShaderStage {
    /// Core (non-extension) stages in pipeline order
    pub const CORE: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEvaluation,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    /// Lower-case stage name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tessellation control",
            ShaderStage::TessEvaluation => "tessellation evaluation",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
            ShaderStage::Extension(ext) => ext.name(),
            ShaderStage::Undefined => "undefined",
        }
    }

    /// Single-bit mask of this stage (empty for `Undefined`)
    pub fn mask(&self) -> StageMask {
        STAGE_BITS
            .iter()
            .find(|(_, stage)| stage == self)
            .map(|(mask, _)| *mask)
            .unwrap_or(StageMask::empty())
    }

    /// Whether the backend can compile this stage
    pub fn is_supported(&self) -> bool {
        self.to_shader_kind().is_some()
    }

    /// Whether this is a rasterization pipeline stage
    pub fn is_graphics(&self) -> bool {
        matches!(
            self,
            ShaderStage::Vertex
                | ShaderStage::TessControl
                | ShaderStage::TessEvaluation
                | ShaderStage::Geometry
                | ShaderStage::Fragment
        )
    }

    /// Position of the stage in the pipeline (used to sort linked stages)
    ///
    /// Task and mesh shaders replace the vertex front-end, so they sort
    /// before the fragment stage.
    pub(crate) fn pipeline_order(&self) -> u32 {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Extension(ExtensionStage::Task) => 1,
            ShaderStage::Extension(ExtensionStage::Mesh) => 2,
            ShaderStage::TessControl => 3,
            ShaderStage::TessEvaluation => 4,
            ShaderStage::Geometry => 5,
            ShaderStage::Fragment => 6,
            ShaderStage::Compute => 7,
            ShaderStage::Extension(ext) => 8 + *ext as u32,
            ShaderStage::Undefined => u32::MAX,
        }
    }

    /// Whether inputs (`input == true`) or outputs of this stage are
    /// arrayed per vertex, with the outer array dimension implicit
    pub(crate) fn is_per_vertex(&self, input: bool) -> bool {
        match self {
            ShaderStage::TessControl => true,
            ShaderStage::TessEvaluation | ShaderStage::Geometry => input,
            ShaderStage::Extension(ExtensionStage::Mesh) => !input,
            _ => false,
        }
    }

    /// glslang shader kind, for concrete stages only
    pub(crate) fn to_shader_kind(self) -> Option<shaderc::ShaderKind> {
        let kind = match self {
            ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
            ShaderStage::TessControl => shaderc::ShaderKind::TessControl,
            ShaderStage::TessEvaluation => shaderc::ShaderKind::TessEvaluation,
            ShaderStage::Geometry => shaderc::ShaderKind::Geometry,
            ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
            ShaderStage::Compute => shaderc::ShaderKind::Compute,
            ShaderStage::Extension(ext) => match ext {
                ExtensionStage::RayGen => shaderc::ShaderKind::RayGeneration,
                ExtensionStage::Intersect => shaderc::ShaderKind::Intersection,
                ExtensionStage::AnyHit => shaderc::ShaderKind::AnyHit,
                ExtensionStage::ClosestHit => shaderc::ShaderKind::ClosestHit,
                ExtensionStage::Miss => shaderc::ShaderKind::Miss,
                ExtensionStage::Callable => shaderc::ShaderKind::Callable,
                ExtensionStage::Task => shaderc::ShaderKind::Task,
                ExtensionStage::Mesh => shaderc::ShaderKind::Mesh,
            },
            ShaderStage::Undefined => return None,
        };
        Some(kind)
    }
}

impl ExtensionStage {
    /// Lower-case stage name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ExtensionStage::RayGen => "ray generation",
            ExtensionStage::Intersect => "intersection",
            ExtensionStage::AnyHit => "any hit",
            ExtensionStage::ClosestHit => "closest hit",
            ExtensionStage::Miss => "miss",
            ExtensionStage::Callable => "callable",
            ExtensionStage::Task => "task",
            ExtensionStage::Mesh => "mesh",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===== STAGE MASK =====

bitflags! {
    /// Set of stages a resource is present in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StageMask: u32 {
        const VERTEX = 1 << 0;
        const TESS_CONTROL = 1 << 1;
        const TESS_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
        const RAY_GEN = 1 << 6;
        const INTERSECT = 1 << 7;
        const ANY_HIT = 1 << 8;
        const CLOSEST_HIT = 1 << 9;
        const MISS = 1 << 10;
        const CALLABLE = 1 << 11;
        const TASK = 1 << 12;
        const MESH = 1 << 13;
    }
}

/// Singleton masks and the stage each one resolves to
const STAGE_BITS: [(StageMask, ShaderStage); 14] = [
    (StageMask::VERTEX, ShaderStage::Vertex),
    (StageMask::TESS_CONTROL, ShaderStage::TessControl),
    (StageMask::TESS_EVALUATION, ShaderStage::TessEvaluation),
    (StageMask::GEOMETRY, ShaderStage::Geometry),
    (StageMask::FRAGMENT, ShaderStage::Fragment),
    (StageMask::COMPUTE, ShaderStage::Compute),
    (StageMask::RAY_GEN, ShaderStage::Extension(ExtensionStage::RayGen)),
    (StageMask::INTERSECT, ShaderStage::Extension(ExtensionStage::Intersect)),
    (StageMask::ANY_HIT, ShaderStage::Extension(ExtensionStage::AnyHit)),
    (StageMask::CLOSEST_HIT, ShaderStage::Extension(ExtensionStage::ClosestHit)),
    (StageMask::MISS, ShaderStage::Extension(ExtensionStage::Miss)),
    (StageMask::CALLABLE, ShaderStage::Extension(ExtensionStage::Callable)),
    (StageMask::TASK, ShaderStage::Extension(ExtensionStage::Task)),
    (StageMask::MESH, ShaderStage::Extension(ExtensionStage::Mesh)),
];

impl StageMask {
    /// Resolve the mask to a single owning stage
    ///
    /// Exactly one bit set maps to that stage. The empty mask and masks with
    /// two or more bits (resources shared between stages) resolve to
    /// `ShaderStage::Undefined`; keep the mask itself to recover every stage.
    pub fn to_stage(self) -> ShaderStage {
        if self.bits().count_ones() != 1 {
            return ShaderStage::Undefined;
        }
        STAGE_BITS
            .iter()
            .find(|(mask, _)| *mask == self)
            .map(|(_, stage)| *stage)
            .unwrap_or(ShaderStage::Undefined)
    }

    /// Every stage present in the mask, in pipeline order
    pub fn stages(self) -> Vec<ShaderStage> {
        STAGE_BITS
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, stage)| *stage)
            .collect()
    }
}

impl From<ShaderStage> for StageMask {
    fn from(stage: ShaderStage) -> Self {
        stage.mask()
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
