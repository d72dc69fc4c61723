/// ReflectionExtractor: linked program to binding descriptors
///
/// `build_reflection` walks the linked program into four tables (uniform
/// variables, uniform blocks, pipeline inputs, pipeline outputs) and
/// `extract` turns them into a `ShaderDetail`, in that fixed order.
///
/// Owning stages come from `StageMask::to_stage`: a resource shared by
/// several stages resolves to `ShaderStage::Undefined`, and its full mask is
/// kept in `stages`.

use std::collections::BTreeMap;
use crate::interface::{InterfaceVariable, IoFormat, OpaqueClass, ResourceClass, ResourceDim};
use crate::linker::{LinkedProgram, LinkedResource};
use crate::stage::{ShaderStage, StageMask};

const LOG_SOURCE: &str = "galaxy3d::shader::Reflection";

// ===== DESCRIPTORS =====

/// Kind of a reflected uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// Handle to external GPU state (texture, sampler, storage image)
    OpaqueResource,
    /// Uniform block of plain data
    ValueBlock,
}

/// One reflected uniform (opaque resource or uniform block)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDescriptor {
    pub set: u32,
    pub binding: u32,
    /// Block byte size, or dimension code for opaque resources (see `ResourceDim`)
    pub size: u32,
    pub kind: UniformKind,
    /// Owning stage (`Undefined` when shared by several stages)
    pub stage: ShaderStage,
    /// Every stage the uniform is present in
    pub stages: StageMask,
    pub name: String,
    /// Opaque resource class (`None` for blocks)
    pub opaque_class: Option<OpaqueClass>,
    /// Binding array length (1 when not an array)
    pub count: u32,
}

impl UniformDescriptor {
    /// Dimensionality of an opaque resource
    pub fn dim(&self) -> Option<ResourceDim> {
        match self.kind {
            UniformKind::OpaqueResource => ResourceDim::from_code(self.size),
            UniformKind::ValueBlock => None,
        }
    }
}

/// Direction of a pipeline interface variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoDirection {
    In,
    Out,
}

/// One reflected pipeline input or output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineIODescriptor {
    pub location: u32,
    /// Array element count (1 for non-arrays)
    pub size: u32,
    pub byte_size: u32,
    pub direction: IoDirection,
    pub stage: ShaderStage,
    pub stages: StageMask,
    pub name: String,
    /// Element shape (`None` for aggregate types)
    pub format: Option<IoFormat>,
}

/// Binding entry of one descriptor set layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetLayoutBinding {
    pub binding: u32,
    pub kind: UniformKind,
    pub opaque_class: Option<OpaqueClass>,
    pub count: u32,
    pub stages: StageMask,
}

/// Bindings of one descriptor set, sorted by binding number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetLayout {
    pub set: u32,
    pub bindings: Vec<SetLayoutBinding>,
}

/// Reflection result of a linked program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDetail {
    /// Opaque resources first, then uniform blocks
    pub uniforms: Vec<UniformDescriptor>,
    /// Pipeline inputs first, then pipeline outputs
    pub pipeline_io: Vec<PipelineIODescriptor>,
}

impl ShaderDetail {
    /// Pipeline inputs (first linked stage)
    pub fn inputs(&self) -> impl Iterator<Item = &PipelineIODescriptor> {
        self.pipeline_io.iter().filter(|io| io.direction == IoDirection::In)
    }

    /// Pipeline outputs (last linked stage)
    pub fn outputs(&self) -> impl Iterator<Item = &PipelineIODescriptor> {
        self.pipeline_io.iter().filter(|io| io.direction == IoDirection::Out)
    }

    /// Uniform bound at `(set, binding)`
    pub fn uniform(&self, set: u32, binding: u32) -> Option<&UniformDescriptor> {
        self.uniforms.iter().find(|u| u.set == set && u.binding == binding)
    }

    /// Group uniforms into descriptor set layouts, sorted by set then binding
    pub fn set_layouts(&self) -> Vec<SetLayout> {
        let mut sets: BTreeMap<u32, BTreeMap<u32, SetLayoutBinding>> = BTreeMap::new();
        for uniform in &self.uniforms {
            sets.entry(uniform.set).or_default().insert(uniform.binding, SetLayoutBinding {
                binding: uniform.binding,
                kind: uniform.kind,
                opaque_class: uniform.opaque_class,
                count: uniform.count,
                stages: uniform.stages,
            });
        }
        sets.into_iter()
            .map(|(set, bindings)| SetLayout {
                set,
                bindings: bindings.into_values().collect(),
            })
            .collect()
    }
}

// ===== EXTRACTOR =====

/// Reflection tables of one linked program
#[derive(Debug, Clone)]
pub struct ReflectionExtractor {
    uniform_variables: Vec<LinkedResource>,
    uniform_blocks: Vec<LinkedResource>,
    pipe_inputs: Vec<(ShaderStage, InterfaceVariable)>,
    pipe_outputs: Vec<(ShaderStage, InterfaceVariable)>,
}

impl ReflectionExtractor {
    /// Walk the linked program into reflection tables
    pub fn build_reflection(program: &LinkedProgram) -> Self {
        let mut uniform_variables = Vec::new();
        let mut uniform_blocks = Vec::new();
        for resource in program.resources() {
            match resource.info.class {
                ResourceClass::Opaque { .. } => {
                    uniform_variables.push(resource.clone());
                }
                ResourceClass::UniformBlock => uniform_blocks.push(resource.clone()),
                ResourceClass::StorageBlock => {}
            }
        }

        let pipe_inputs = program
            .first_unit()
            .map(|unit| unit.interface().inputs.iter().map(|v| (unit.stage(), v.clone())).collect())
            .unwrap_or_default();
        let pipe_outputs = program
            .last_unit()
            .map(|unit| unit.interface().outputs.iter().map(|v| (unit.stage(), v.clone())).collect())
            .unwrap_or_default();

        let reflection = Self {
            uniform_variables,
            uniform_blocks,
            pipe_inputs,
            pipe_outputs,
        };
        reflection.dump();
        reflection
    }

    pub fn num_uniform_variables(&self) -> usize {
        self.uniform_variables.len()
    }

    pub fn num_uniform_blocks(&self) -> usize {
        self.uniform_blocks.len()
    }

    pub fn num_pipe_inputs(&self) -> usize {
        self.pipe_inputs.len()
    }

    pub fn num_pipe_outputs(&self) -> usize {
        self.pipe_outputs.len()
    }

    /// Produce the descriptors, in traversal order
    pub fn extract(&self) -> ShaderDetail {
        let mut detail = ShaderDetail::default();

        // uniform - opaque resources
        for resource in &self.uniform_variables {
            let ResourceClass::Opaque { class, .. } = resource.info.class else {
                continue;
            };
            detail.uniforms.push(UniformDescriptor {
                set: resource.info.set,
                binding: resource.info.binding,
                size: resource.info.size,
                kind: UniformKind::OpaqueResource,
                stage: resource.stages.to_stage(),
                stages: resource.stages,
                name: resource.info.name.clone(),
                opaque_class: Some(class),
                count: resource.info.count,
            });
        }

        // uniform - block
        for resource in &self.uniform_blocks {
            detail.uniforms.push(UniformDescriptor {
                set: resource.info.set,
                binding: resource.info.binding,
                size: resource.info.size,
                kind: UniformKind::ValueBlock,
                stage: resource.stages.to_stage(),
                stages: resource.stages,
                name: resource.info.name.clone(),
                opaque_class: None,
                count: resource.info.count,
            });
        }

        // pipe in
        for (stage, variable) in &self.pipe_inputs {
            detail.pipeline_io.push(io_descriptor(*stage, variable, IoDirection::In));
        }

        // pipe out
        for (stage, variable) in &self.pipe_outputs {
            detail.pipeline_io.push(io_descriptor(*stage, variable, IoDirection::Out));
        }

        let undefined = detail.uniforms.iter().filter(|u| u.stage == ShaderStage::Undefined).count();
        if undefined > 0 {
            crate::shader_debug!(LOG_SOURCE,
                "{} uniform(s) shared by several stages resolve to the undefined stage", undefined);
        }

        detail
    }

    /// Log every reflection table at debug severity
    pub fn dump(&self) {
        crate::shader_debug!(LOG_SOURCE, "Uniform reflection ({}):", self.uniform_variables.len());
        for r in &self.uniform_variables {
            crate::shader_debug!(LOG_SOURCE, "  {}: set {}, binding {}, {:?}, size {}, stages {:?}",
                r.info.name, r.info.set, r.info.binding, r.info.class, r.info.size, r.stages.stages());
        }
        crate::shader_debug!(LOG_SOURCE, "Uniform block reflection ({}):", self.uniform_blocks.len());
        for r in &self.uniform_blocks {
            crate::shader_debug!(LOG_SOURCE, "  {}: set {}, binding {}, size {}, stages {:?}",
                r.info.name, r.info.set, r.info.binding, r.info.size, r.stages.stages());
        }
        crate::shader_debug!(LOG_SOURCE, "Pipeline input reflection ({}):", self.pipe_inputs.len());
        for (stage, v) in &self.pipe_inputs {
            crate::shader_debug!(LOG_SOURCE, "  {}: location {}, {:?} x{}, {} stage",
                v.name, v.location, v.format, v.array_len, stage);
        }
        crate::shader_debug!(LOG_SOURCE, "Pipeline output reflection ({}):", self.pipe_outputs.len());
        for (stage, v) in &self.pipe_outputs {
            crate::shader_debug!(LOG_SOURCE, "  {}: location {}, {:?} x{}, {} stage",
                v.name, v.location, v.format, v.array_len, stage);
        }
    }
}

fn io_descriptor(stage: ShaderStage, variable: &InterfaceVariable, direction: IoDirection) -> PipelineIODescriptor {
    let stages = stage.mask();
    PipelineIODescriptor {
        location: variable.location,
        size: variable.array_len,
        byte_size: variable.byte_size,
        direction,
        stage: stages.to_stage(),
        stages,
        name: variable.name.clone(),
        format: variable.format,
    }
}

#[cfg(test)]
#[path = "reflection_tests.rs"]
mod tests;
