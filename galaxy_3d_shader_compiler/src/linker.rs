/// ProgramLinker: compiled stages to one linked program
///
/// The linker checks that the stages form one coherent program (adjacent
/// stage interfaces match, shared bindings agree) and merges the per-stage
/// resource tables into one table keyed by `(set, binding)`, recording the
/// stages each resource is present in.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::compiler::CompiledUnit;
use crate::config::CompilerConfig;
use crate::error::{Error, Result};
use crate::interface::ResourceInfo;
use crate::stage::{ShaderStage, StageMask};

const LOG_SOURCE: &str = "galaxy3d::shader::Linker";

// ===== LINKED PROGRAM =====

/// One entry of the merged resource table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedResource {
    /// Declaration from the first stage that declares the binding
    pub info: ResourceInfo,
    /// Stages the resource is present in
    pub stages: StageMask,
}

/// Cross-validated program spanning every linked stage
///
/// Only `ProgramLinker::link` produces a `LinkedProgram`, so holding one
/// proves the link succeeded.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    units: Vec<Arc<CompiledUnit>>,
    resources: Vec<LinkedResource>,
    config: CompilerConfig,
}

impl LinkedProgram {
    /// Linked stages in pipeline order
    pub fn stages(&self) -> Vec<ShaderStage> {
        self.units.iter().map(|unit| unit.stage()).collect()
    }

    /// Mask of every linked stage
    pub fn stage_mask(&self) -> StageMask {
        self.units
            .iter()
            .fold(StageMask::empty(), |mask, unit| mask | unit.stage().mask())
    }

    /// Whether `stage` is part of the program
    pub fn contains(&self, stage: ShaderStage) -> bool {
        self.unit(stage).is_some()
    }

    /// Compiled unit of `stage`
    pub fn unit(&self, stage: ShaderStage) -> Option<&Arc<CompiledUnit>> {
        self.units.iter().find(|unit| unit.stage() == stage)
    }

    /// All units in pipeline order
    pub fn units(&self) -> &[Arc<CompiledUnit>] {
        &self.units
    }

    /// First stage of the pipeline (source of pipeline inputs)
    pub fn first_unit(&self) -> Option<&Arc<CompiledUnit>> {
        self.units.first()
    }

    /// Last stage of the pipeline (source of pipeline outputs)
    pub fn last_unit(&self) -> Option<&Arc<CompiledUnit>> {
        self.units.last()
    }

    /// Merged resource table, in stage then declaration order
    pub fn resources(&self) -> &[LinkedResource] {
        &self.resources
    }

    /// Target environment the program was linked for
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }
}

// ===== PROGRAM LINKER =====

/// Accumulates compiled stages, then links them
pub struct ProgramLinker {
    config: CompilerConfig,
    units: Vec<Arc<CompiledUnit>>,
}

impl ProgramLinker {
    /// Create an empty linker for the given target environment
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            config: config.clone(),
            units: Vec::new(),
        }
    }

    /// Number of stages added so far
    pub fn stage_count(&self) -> usize {
        self.units.len()
    }

    /// Add one compiled stage
    ///
    /// # Errors
    ///
    /// Returns `Error::LinkFailed` if a unit for the same stage was already added.
    pub fn add_stage(&mut self, unit: Arc<CompiledUnit>) -> Result<()> {
        if self.units.iter().any(|existing| existing.stage() == unit.stage()) {
            crate::shader_bail!(LOG_SOURCE, Error::LinkFailed(format!(
                "{} stage added twice", unit.stage())));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Cross-validate the stages and merge their tables
    ///
    /// # Errors
    ///
    /// Returns `Error::LinkFailed` if:
    /// - no stage was added
    /// - a compute stage is mixed with other stages
    /// - a stage reads an input its predecessor does not write, or with another type
    /// - one binding is declared differently by two stages
    /// - the program exceeds `max_combined_texture_image_units`
    pub fn link(mut self) -> Result<LinkedProgram> {
        // ========== VALIDATION 1: At least one stage ==========
        if self.units.is_empty() {
            crate::shader_bail!(LOG_SOURCE, Error::LinkFailed(
                "no compiled stage to link".to_string()));
        }

        self.units.sort_by_key(|unit| unit.stage().pipeline_order());

        // ========== VALIDATION 2: Compute stands alone ==========
        if self.units.len() > 1 && self.units.iter().any(|unit| unit.stage() == ShaderStage::Compute) {
            crate::shader_bail!(LOG_SOURCE, Error::LinkFailed(
                "compute stage cannot be linked with other stages".to_string()));
        }

        // ========== VALIDATION 3: Adjacent stage interfaces ==========
        for pair in self.units.windows(2) {
            if let Err(message) = Self::match_interfaces(&pair[0], &pair[1]) {
                crate::shader_bail!(LOG_SOURCE, Error::LinkFailed(message));
            }
        }

        // ========== MERGE RESOURCE TABLES ==========
        let resources = match self.merge_resources() {
            Ok(resources) => resources,
            Err(message) => crate::shader_bail!(LOG_SOURCE, Error::LinkFailed(message)),
        };

        // ========== VALIDATION 4: Combined limits ==========
        let opaque: u32 = resources
            .iter()
            .filter(|r| r.info.class.is_opaque())
            .map(|r| r.info.count)
            .sum();
        let max = self.config.limits.max_combined_texture_image_units;
        if opaque > max {
            crate::shader_bail!(LOG_SOURCE, Error::LinkFailed(format!(
                "{} opaque resources exceed max_combined_texture_image_units ({})", opaque, max)));
        }

        let names: Vec<&str> = self.units.iter().map(|unit| unit.stage().name()).collect();
        crate::shader_info!(LOG_SOURCE, "program linked: {} stage(s) [{}], {} resource(s)",
            self.units.len(), names.join(", "), resources.len());

        Ok(LinkedProgram {
            units: self.units,
            resources,
            config: self.config,
        })
    }

    /// Every location read by `consumer` must be written by `producer` with
    /// the same vector type
    ///
    /// Variables are matched by location range, so a matrix or array output
    /// feeds inputs at any of the locations it spans. The implicit per-vertex
    /// array of tessellation, geometry and mesh interfaces takes no locations.
    fn match_interfaces(producer: &CompiledUnit, consumer: &CompiledUnit) -> std::result::Result<(), String> {
        let producer_per_vertex = producer.stage().is_per_vertex(false);
        let consumer_per_vertex = consumer.stage().is_per_vertex(true);
        let outputs = &producer.interface().outputs;

        for input in &consumer.interface().inputs {
            let input_span = input.location_span(consumer_per_vertex);
            for offset in 0..input_span {
                let Some(location) = input.location.checked_add(offset) else {
                    break;
                };
                let Some(output) = outputs
                    .iter()
                    .find(|output| output.covers(location, producer_per_vertex)) else {
                    return Err(format!(
                        "{} input '{}' (location {}) is not written by the {} stage",
                        consumer.stage(), input.name, location, producer.stage()));
                };

                let same_type = match (output.format, input.format) {
                    (Some(out_format), Some(in_format)) => out_format.column() == in_format.column(),
                    (None, None) => {
                        output.location == input.location
                            && (producer_per_vertex || consumer_per_vertex || output.byte_size == input.byte_size)
                    }
                    _ => false,
                };
                if !same_type {
                    return Err(format!(
                        "location {} has different types in {} output '{}' ({:?} x{}) and {} input '{}' ({:?} x{})",
                        location,
                        producer.stage(), output.name, output.format, output.array_len,
                        consumer.stage(), input.name, input.format, input.array_len));
                }
            }
        }
        Ok(())
    }

    /// Merge per-stage resources by `(set, binding)`, OR-ing stage masks
    fn merge_resources(&self) -> std::result::Result<Vec<LinkedResource>, String> {
        let mut merged: Vec<LinkedResource> = Vec::new();
        let mut slots: FxHashMap<(u32, u32), usize> = FxHashMap::default();

        for unit in &self.units {
            for resource in &unit.interface().resources {
                let active = self.config.reflect_all_resources || resource.referenced;
                let stage_bit = if active { unit.stage().mask() } else { StageMask::empty() };

                match slots.get(&(resource.set, resource.binding)) {
                    Some(&index) => {
                        let existing = &mut merged[index];
                        if existing.info.class != resource.class || existing.info.size != resource.size {
                            return Err(format!(
                                "binding (set={}, binding={}) is declared as '{}' {:?} in {:?} and as '{}' {:?} in {} stage",
                                resource.set, resource.binding,
                                existing.info.name, existing.info.class, existing.stages.stages(),
                                resource.name, resource.class, unit.stage()));
                        }
                        existing.info.referenced |= resource.referenced;
                        existing.stages |= stage_bit;
                    }
                    None => {
                        slots.insert((resource.set, resource.binding), merged.len());
                        merged.push(LinkedResource {
                            info: resource.clone(),
                            stages: stage_bit,
                        });
                    }
                }
            }
        }

        // Resources no entry point uses are dropped when only active ones are reflected
        merged.retain(|r| !r.stages.is_empty());
        Ok(merged)
    }
}

#[cfg(test)]
#[path = "linker_tests.rs"]
mod tests;
