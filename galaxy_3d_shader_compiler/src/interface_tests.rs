//! Unit tests for interface.rs
//!
//! Compiles fixtures to SPIR-V, then checks the interface tables read back
//! from the words.

use crate::interface::*;
use crate::shader_fixtures::*;
use crate::stage::ShaderStage;

fn interface_of(text: &str, stage: ShaderStage) -> StageInterface {
    let unit = compile(text, stage);
    extract(unit.words(), "main").unwrap()
}

const VEC2: IoFormat = IoFormat { scalar: IoScalar::Float, width: 4, columns: 1, rows: 2 };

// ============================================================================
// PIPELINE IO
// ============================================================================

#[test]
fn test_vertex_io() {
    let interface = interface_of(CAMERA_VERT, ShaderStage::Vertex);

    assert_eq!(interface.inputs.len(), 2);
    let position = interface.input(0).unwrap();
    assert_eq!(position.name, "a_position");
    assert_eq!(position.format, Some(IoFormat { scalar: IoScalar::Float, width: 4, columns: 1, rows: 3 }));
    assert_eq!(position.array_len, 1);
    assert_eq!(position.byte_size, 12);

    let uv = interface.input(1).unwrap();
    assert_eq!(uv.format, Some(VEC2));
    assert_eq!(uv.format.unwrap().components(), 2);
}

#[test]
fn test_builtins_are_skipped() {
    let interface = interface_of(BASIC_VERT, ShaderStage::Vertex);

    // gl_Position is written but not reported
    assert_eq!(interface.outputs.len(), 1);
    let uv = interface.output(0).unwrap();
    assert_eq!(uv.name, "v_uv");
    assert_eq!(uv.format, Some(VEC2));
    assert_eq!(uv.byte_size, 8);
}

#[test]
fn test_fragment_io() {
    let interface = interface_of(BASIC_FRAG, ShaderStage::Fragment);

    assert_eq!(interface.inputs.len(), 1);
    assert_eq!(interface.input(0).unwrap().name, "v_uv");
    assert_eq!(interface.outputs.len(), 1);
    assert_eq!(interface.output(0).unwrap().byte_size, 16);
    assert!(interface.output(1).is_none());
}

#[test]
fn test_matrix_input_spans_columns() {
    let interface = interface_of(LEGACY_VERT, ShaderStage::Vertex);

    let model = interface.input(1).unwrap();
    assert_eq!(model.format, Some(IoFormat { scalar: IoScalar::Float, width: 4, columns: 4, rows: 4 }));
    assert_eq!(model.location_count(), 4);
    assert_eq!(model.last_location(), Some(4));
    assert!(model.covers(1, false) && model.covers(4, false));
    assert!(!model.covers(0, false) && !model.covers(5, false));
    assert_eq!(model.format.unwrap().column().components(), 4);
}

#[test]
fn test_location_count_of_arrays() {
    let variable = InterfaceVariable {
        name: "v_weights".to_string(),
        location: 2,
        format: Some(VEC2),
        array_len: 3,
        byte_size: 24,
    };
    assert_eq!(variable.location_count(), 3);
    assert_eq!(variable.last_location(), Some(4));

    let dvec4 = IoFormat { scalar: IoScalar::Float, width: 8, columns: 1, rows: 4 };
    assert_eq!(dvec4.locations(), 2);

    assert_eq!(variable.location_span(true), 1);
    assert!(variable.covers(4, false));
    assert!(!variable.covers(3, true));

    let at_end = InterfaceVariable { location: u32::MAX, array_len: 2, ..variable };
    assert_eq!(at_end.last_location(), None);
    assert!(at_end.covers(u32::MAX, false));
}

#[test]
fn test_matrix_and_array_outputs_cover_their_range() {
    let text = "\
#version 450
layout(location = 0) out mat4 v_frame;
layout(location = 4) out vec2 v_uv[2];
void main() {
    v_frame = mat4(1.0);
    v_uv[0] = vec2(0.0);
    v_uv[1] = vec2(1.0);
    gl_Position = vec4(0.0);
}
";
    let interface = interface_of(text, ShaderStage::Vertex);
    let covering = |location: u32| {
        interface.outputs.iter().find(|v| v.covers(location, false)).map(|v| v.name.as_str())
    };
    assert_eq!(covering(2), Some("v_frame"));
    assert_eq!(covering(5), Some("v_uv"));
    assert_eq!(covering(6), None);
    assert!(interface.output(2).is_none());
}

// ============================================================================
// RESOURCES
// ============================================================================

#[test]
fn test_uniform_block_and_texture() {
    let interface = interface_of(BASIC_FRAG, ShaderStage::Fragment);
    assert_eq!(interface.resources.len(), 2);

    let block = interface.resources.iter().find(|r| r.binding == 0).unwrap();
    assert_eq!(block.name, "Params");
    assert_eq!(block.set, 0);
    assert_eq!(block.class, ResourceClass::UniformBlock);
    assert_eq!(block.size, 16);
    assert_eq!(block.count, 1);
    assert!(block.referenced);

    let texture = interface.resources.iter().find(|r| r.binding == 1).unwrap();
    assert_eq!(texture.name, "u_albedo");
    assert_eq!(texture.class, ResourceClass::Opaque {
        class: OpaqueClass::SampledImage,
        dim: Some(ResourceDim::D2),
        arrayed: false,
    });
    assert_eq!(texture.size, ResourceDim::D2.code());
    assert!(!texture.referenced);

    assert_eq!(interface.opaque_count(), 1);
}

#[test]
fn test_combined_image_sampler() {
    let interface = interface_of(COMBINED_FRAG, ShaderStage::Fragment);

    let sampler = interface.resources.iter().find(|r| r.binding == 1).unwrap();
    assert_eq!(sampler.name, "u_albedo");
    assert_eq!(sampler.class, ResourceClass::Opaque {
        class: OpaqueClass::CombinedImageSampler,
        dim: Some(ResourceDim::D2),
        arrayed: false,
    });
    assert_eq!(sampler.size, 2);
    assert!(sampler.referenced);
}

#[test]
fn test_sampler_has_no_dimension() {
    let interface = interface_of(CAMERA_FRAG, ShaderStage::Fragment);

    let sampler = interface.resources.iter().find(|r| r.binding == 3).unwrap();
    assert_eq!(sampler.class, ResourceClass::Opaque {
        class: OpaqueClass::Sampler,
        dim: None,
        arrayed: false,
    });
    assert_eq!(sampler.size, 0);
    assert_eq!(interface.opaque_count(), 2);
}

#[test]
fn test_arrayed_cube_and_binding_array() {
    let text = "\
#version 450
layout(location = 0) out vec4 o_color;
layout(set = 1, binding = 0) uniform samplerCubeArray u_environment;
layout(set = 1, binding = 1) uniform sampler2D u_layers[4];
void main() {
    o_color = texture(u_environment, vec4(0.0, 0.0, 1.0, 0.0)) + texture(u_layers[2], vec2(0.5));
}
";
    let interface = interface_of(text, ShaderStage::Fragment);

    let environment = interface.resources.iter().find(|r| r.binding == 0).unwrap();
    assert_eq!(environment.class, ResourceClass::Opaque {
        class: OpaqueClass::CombinedImageSampler,
        dim: Some(ResourceDim::Cube),
        arrayed: true,
    });
    assert_eq!(environment.size, 4);

    let layers = interface.resources.iter().find(|r| r.binding == 1).unwrap();
    assert_eq!(layers.count, 4);
    assert_eq!(interface.opaque_count(), 5);
}

#[test]
fn test_mat4_block_size() {
    let interface = interface_of(CAMERA_VERT, ShaderStage::Vertex);
    let camera = interface.resources.iter().find(|r| r.name == "Camera").unwrap();
    assert_eq!(camera.binding, 2);
    assert_eq!(camera.size, 64);
}

#[test]
fn test_storage_block() {
    let interface = interface_of(DOUBLE_COMP, ShaderStage::Compute);
    assert!(interface.inputs.is_empty());
    assert!(interface.outputs.is_empty());
    assert_eq!(interface.resources.len(), 1);
    assert_eq!(interface.resources[0].class, ResourceClass::StorageBlock);
    assert_eq!(interface.resources[0].name, "Data");
}

#[test]
fn test_unknown_entry_point() {
    let unit = compile(BASIC_VERT, ShaderStage::Vertex);
    let err = extract(unit.words(), "vs_main").unwrap_err();
    assert!(err.contains("vs_main"));
}

#[test]
fn test_garbage_words_fail_reflection() {
    assert!(extract(&[0xdead_beef, 0, 0, 0, 0], "main").is_err());
}

// ============================================================================
// RESOURCE DIM CODES
// ============================================================================

#[test]
fn test_resource_dim_codes() {
    for dim in [
        ResourceDim::D1,
        ResourceDim::D2,
        ResourceDim::D3,
        ResourceDim::Cube,
        ResourceDim::Rect,
        ResourceDim::Buffer,
        ResourceDim::SubpassData,
    ] {
        assert_eq!(ResourceDim::from_code(dim.code()), Some(dim));
    }
    assert_eq!(ResourceDim::Cube.code(), 4);
    assert_eq!(ResourceDim::SubpassData.code(), 7);
    assert_eq!(ResourceDim::from_code(0), None);
    assert_eq!(ResourceDim::from_code(9), None);
}
