/// Per-stage interface tables read off a compiled SPIR-V module
///
/// For one entry point this collects the location-bound inputs and outputs
/// and every variable carrying a descriptor binding. Built-ins are skipped.
/// The linker matches these tables across stages and the reflection walk
/// turns them into descriptors.

use rustc_hash::FxHashSet;
use spirq::spirv::Dim;
use spirq::ty::{DescriptorType, ScalarType, Type};
use spirq::var::Variable;

// ===== IO FORMAT =====

/// Scalar category of an interface variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoScalar {
    Float,
    Sint,
    Uint,
    Bool,
}

/// Shape of one interface variable element
///
/// Scalars are 1x1, vectors are `rows` components in one column, matrices
/// are `columns` x `rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoFormat {
    pub scalar: IoScalar,
    /// Scalar width in bytes
    pub width: u8,
    pub columns: u8,
    pub rows: u8,
}

impl IoFormat {
    /// Number of scalar components
    pub fn components(&self) -> u32 {
        self.columns as u32 * self.rows as u32
    }

    /// Locations taken by one element: one per column, two for 64-bit
    /// vectors wider than two components
    pub fn locations(&self) -> u32 {
        let per_column = if self.width > 4 && self.rows > 2 { 2 } else { 1 };
        self.columns as u32 * per_column
    }

    /// Format of the vector stored at each location of this element
    pub fn column(&self) -> IoFormat {
        IoFormat { columns: 1, ..*self }
    }
}

/// A location-bound input or output of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceVariable {
    pub name: String,
    pub location: u32,
    /// Element shape (`None` for aggregate types)
    pub format: Option<IoFormat>,
    /// Array element count (1 for non-arrays)
    pub array_len: u32,
    pub byte_size: u32,
}

impl InterfaceVariable {
    /// Number of consecutive locations the variable occupies
    pub fn location_count(&self) -> u32 {
        let per_element = self.format.map(|f| f.locations()).unwrap_or(1);
        per_element.saturating_mul(self.array_len.max(1))
    }

    /// Last location occupied, `None` when the range leaves `u32`
    pub fn last_location(&self) -> Option<u32> {
        self.location.checked_add(self.location_count() - 1)
    }

    /// Locations taken at the interface; a per-vertex variable (with an
    /// implicit outer array) takes those of a single element
    pub fn location_span(&self, per_vertex: bool) -> u32 {
        if per_vertex {
            self.format.map(|f| f.locations()).unwrap_or(1)
        } else {
            self.location_count()
        }
    }

    /// Whether `location` falls inside the variable's location range
    pub fn covers(&self, location: u32, per_vertex: bool) -> bool {
        location >= self.location && location - self.location < self.location_span(per_vertex)
    }
}

// ===== RESOURCES =====

/// Dimensionality of an opaque resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDim {
    D1,
    D2,
    D3,
    Cube,
    Rect,
    Buffer,
    SubpassData,
}

impl ResourceDim {
    /// Numeric code stored in `UniformDescriptor::size`
    /// (1D=1, 2D=2, 3D=3, cube=4, rect=5, buffer=6, subpass=7)
    pub fn code(&self) -> u32 {
        match self {
            ResourceDim::D1 => 1,
            ResourceDim::D2 => 2,
            ResourceDim::D3 => 3,
            ResourceDim::Cube => 4,
            ResourceDim::Rect => 5,
            ResourceDim::Buffer => 6,
            ResourceDim::SubpassData => 7,
        }
    }

    /// Decode a size field; 0 and unknown codes have no dimension
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ResourceDim::D1),
            2 => Some(ResourceDim::D2),
            3 => Some(ResourceDim::D3),
            4 => Some(ResourceDim::Cube),
            5 => Some(ResourceDim::Rect),
            6 => Some(ResourceDim::Buffer),
            7 => Some(ResourceDim::SubpassData),
            _ => None,
        }
    }

    fn from_spirv(dim: Dim) -> Option<Self> {
        match dim {
            Dim::Dim1D => Some(ResourceDim::D1),
            Dim::Dim2D => Some(ResourceDim::D2),
            Dim::Dim3D => Some(ResourceDim::D3),
            Dim::DimCube => Some(ResourceDim::Cube),
            Dim::DimRect => Some(ResourceDim::Rect),
            Dim::DimBuffer => Some(ResourceDim::Buffer),
            Dim::DimSubpassData => Some(ResourceDim::SubpassData),
            _ => None,
        }
    }
}

/// Kind of opaque (handle) resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueClass {
    /// Texture combined with its sampler (`sampler2D`, ...)
    CombinedImageSampler,
    /// Sampled texture (`texture2D`, ...)
    SampledImage,
    /// Storage image (`image2D`, ...)
    StorageImage,
    /// Sampler object (`sampler`, `samplerShadow`)
    Sampler,
    /// Read-only texel buffer (`samplerBuffer`, `textureBuffer`)
    UniformTexelBuffer,
    /// Read-write texel buffer (`imageBuffer`)
    StorageTexelBuffer,
    /// Subpass input (`subpassInput`)
    InputAttachment,
    /// Ray-tracing acceleration structure
    AccelStruct,
}

/// Class of a bound variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Opaque {
        class: OpaqueClass,
        dim: Option<ResourceDim>,
        arrayed: bool,
    },
    UniformBlock,
    StorageBlock,
}

impl ResourceClass {
    pub fn is_opaque(&self) -> bool {
        matches!(self, ResourceClass::Opaque { .. })
    }
}

/// A variable with a descriptor binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    /// Block name for blocks, variable name otherwise
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub class: ResourceClass,
    /// Byte size for blocks, dimension code for opaque resources
    pub size: u32,
    /// Binding array length (1 when not an array or unsized)
    pub count: u32,
    /// Whether the entry point reads or writes the resource
    pub referenced: bool,
}

/// Interface tables of one compiled stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInterface {
    pub inputs: Vec<InterfaceVariable>,
    pub outputs: Vec<InterfaceVariable>,
    pub resources: Vec<ResourceInfo>,
}

impl StageInterface {
    /// Input whose location range starts at `location`
    pub fn input(&self, location: u32) -> Option<&InterfaceVariable> {
        self.inputs.iter().find(|v| v.location == location)
    }

    /// Output whose location range starts at `location`
    pub fn output(&self, location: u32) -> Option<&InterfaceVariable> {
        self.outputs.iter().find(|v| v.location == location)
    }

    /// Number of opaque resources
    pub fn opaque_count(&self) -> u32 {
        self.resources
            .iter()
            .filter(|r| r.class.is_opaque())
            .map(|r| r.count)
            .sum()
    }
}

// ===== EXTRACTION =====

/// Build the interface tables of `entry_point` from a SPIR-V module
///
/// The module is reflected twice: once with every declared resource and
/// once with the resources the entry point actually accesses, which sets
/// `ResourceInfo::referenced`.
pub(crate) fn extract(words: &[u32], entry_point: &str) -> Result<StageInterface, String> {
    let declared = reflect_entry(words, entry_point, true)?;
    let accessed: FxHashSet<(u32, u32)> = reflect_entry(words, entry_point, false)?
        .iter()
        .filter_map(|var| match var {
            Variable::Descriptor { desc_bind, .. } => Some((desc_bind.set(), desc_bind.bind())),
            _ => None,
        })
        .collect();

    let mut interface = StageInterface::default();
    for var in &declared {
        match var {
            Variable::Input { name, location, ty } => {
                interface.inputs.push(interface_variable(name.as_deref(), location.loc(), ty));
            }
            Variable::Output { name, location, ty } => {
                interface.outputs.push(interface_variable(name.as_deref(), location.loc(), ty));
            }
            Variable::Descriptor { name, desc_bind, desc_ty, ty, nbind } => {
                let Some(class) = classify_resource(desc_ty, ty) else {
                    continue;
                };
                let (name, size) = match class {
                    ResourceClass::Opaque { dim, .. } => {
                        (name.clone(), dim.map(|d| d.code()).unwrap_or(0))
                    }
                    ResourceClass::UniformBlock | ResourceClass::StorageBlock => {
                        (block_name(ty).or_else(|| name.clone()), byte_size(ty))
                    }
                };
                let key = (desc_bind.set(), desc_bind.bind());
                interface.resources.push(ResourceInfo {
                    name: name.unwrap_or_default(),
                    set: key.0,
                    binding: key.1,
                    class,
                    size,
                    count: (*nbind).max(1),
                    referenced: accessed.contains(&key),
                });
            }
            _ => {}
        }
    }

    interface.inputs.sort_by_key(|v| v.location);
    interface.outputs.sort_by_key(|v| v.location);
    Ok(interface)
}

/// Variables of the named entry point
pub(crate) fn reflect_entry(words: &[u32], entry_point: &str, all_resources: bool) -> Result<Vec<Variable>, String> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(all_resources)
        .reflect()
        .map_err(|e| format!("SPIR-V reflection failed: {}", e))?;

    entry_points
        .into_iter()
        .find(|entry| entry.name == entry_point)
        .map(|entry| entry.vars)
        .ok_or_else(|| format!("entry point '{}' not found in the SPIR-V module", entry_point))
}

fn interface_variable(name: Option<&str>, location: u32, ty: &Type) -> InterfaceVariable {
    let (format, array_len) = io_format(ty);
    InterfaceVariable {
        name: name.unwrap_or_default().to_string(),
        location,
        format,
        array_len,
        byte_size: byte_size(ty),
    }
}

fn io_format(ty: &Type) -> (Option<IoFormat>, u32) {
    match ty {
        Type::Array(array) => {
            let (format, inner_len) = io_format(&array.element_ty);
            let len = array.nelement.unwrap_or(1).max(1);
            (format, len.saturating_mul(inner_len))
        }
        _ => (element_format(ty), 1),
    }
}

fn element_format(ty: &Type) -> Option<IoFormat> {
    let (scalar, columns, rows) = match ty {
        Type::Scalar(scalar) => (scalar, 1, 1),
        Type::Vector(vector) => (&vector.scalar_ty, 1, vector.nscalar),
        Type::Matrix(matrix) => (&matrix.vector_ty.scalar_ty, matrix.nvector, matrix.vector_ty.nscalar),
        _ => return None,
    };
    let (kind, bits) = match scalar {
        ScalarType::Float { bits } => (IoScalar::Float, *bits),
        ScalarType::Integer { bits, is_signed: true } => (IoScalar::Sint, *bits),
        ScalarType::Integer { bits, is_signed: false } => (IoScalar::Uint, *bits),
        ScalarType::Boolean => (IoScalar::Bool, 32),
        ScalarType::Void => return None,
    };
    Some(IoFormat {
        scalar: kind,
        width: (bits / 8) as u8,
        columns: columns as u8,
        rows: rows as u8,
    })
}

fn byte_size(ty: &Type) -> u32 {
    ty.nbyte().map(|n| n as u32).unwrap_or(0)
}

/// Class of a descriptor, from its descriptor type and element type
fn classify_resource(desc_ty: &DescriptorType, ty: &Type) -> Option<ResourceClass> {
    let opaque = match desc_ty {
        DescriptorType::UniformBuffer() => return Some(ResourceClass::UniformBlock),
        DescriptorType::StorageBuffer(_) => return Some(ResourceClass::StorageBlock),
        DescriptorType::CombinedImageSampler() => OpaqueClass::CombinedImageSampler,
        DescriptorType::SampledImage() => OpaqueClass::SampledImage,
        DescriptorType::StorageImage(_) => OpaqueClass::StorageImage,
        DescriptorType::Sampler() => OpaqueClass::Sampler,
        DescriptorType::UniformTexelBuffer() => OpaqueClass::UniformTexelBuffer,
        DescriptorType::StorageTexelBuffer(_) => OpaqueClass::StorageTexelBuffer,
        DescriptorType::InputAttachment(_) => OpaqueClass::InputAttachment,
        DescriptorType::AccelStruct() => OpaqueClass::AccelStruct,
    };
    let (dim, arrayed) = image_shape(ty);
    Some(ResourceClass::Opaque { class: opaque, dim, arrayed })
}

/// Dimension and arrayness of an image-like type
fn image_shape(ty: &Type) -> (Option<ResourceDim>, bool) {
    match ty {
        Type::CombinedImageSampler(combined) => {
            let image = &combined.sampled_image_ty;
            (ResourceDim::from_spirv(image.dim), image.is_array)
        }
        Type::SampledImage(image) => (ResourceDim::from_spirv(image.dim), image.is_array),
        Type::StorageImage(image) => (ResourceDim::from_spirv(image.dim), image.is_array),
        Type::Image(image) => (ResourceDim::from_spirv(image.dim), image.is_array),
        Type::SubpassData(_) => (Some(ResourceDim::SubpassData), false),
        _ => (None, false),
    }
}

fn block_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Struct(block) => block.name.clone(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "interface_tests.rs"]
mod tests;
