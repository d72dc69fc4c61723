//! Integration tests for the compile → link → reflect/emit pipeline
//!
//! These tests drive the public API end-to-end on the GLSL fixtures in
//! `tests/shaders/`. No GPU required.
//!
//! Run with: cargo test --test pipeline_integration_tests


use galaxy_3d_shader_compiler::galaxy3d::{ErrorKind, ShaderBackend};
use galaxy_3d_shader_compiler::galaxy3d::shader::{
    gen_glsl_detail, glsl_to_spv, CompilerConfig, IoDirection, OpaqueClass, PipelineState,
    ResourceDim, ShaderPipeline, ShaderSource, ShaderStage, SpirvVersion, StageMask,
    UniformKind, VulkanVersion, SPIRV_MAGIC,
};
use shader_test_utils::{load_shader, shader_path};

// ============================================================================
// END-TO-END REFLECTION
// ============================================================================

#[test]
fn test_integration_textured_program_reflection() {
    let backend = ShaderBackend::acquire().unwrap();
    let mut pipeline = ShaderPipeline::new(&backend, CompilerConfig::default()).unwrap();
    pipeline.add_stage_file(ShaderStage::Vertex, shader_path("textured.vert")).unwrap();
    pipeline.add_stage_file(ShaderStage::Fragment, shader_path("textured.frag")).unwrap();

    pipeline.compile().unwrap();
    pipeline.link().unwrap();
    let detail = pipeline.reflect().unwrap().clone();

    // Step 1: opaque resources first, in declaration order
    assert_eq!(detail.uniforms.len(), 4);
    let albedo = &detail.uniforms[0];
    assert_eq!(albedo.name, "u_albedo");
    assert_eq!(albedo.kind, UniformKind::OpaqueResource);
    assert_eq!((albedo.set, albedo.binding), (1, 0));
    assert_eq!(albedo.dim(), Some(ResourceDim::D2));
    assert_eq!(albedo.stage, ShaderStage::Fragment);

    let sampler = &detail.uniforms[1];
    assert_eq!(sampler.opaque_class, Some(OpaqueClass::Sampler));
    assert_eq!((sampler.set, sampler.binding), (1, 1));

    // Step 2: uniform blocks, the shared camera resolves to undefined
    let camera = &detail.uniforms[2];
    assert_eq!(camera.name, "Camera");
    assert_eq!(camera.kind, UniformKind::ValueBlock);
    assert_eq!(camera.size, 64);
    assert_eq!(camera.stage, ShaderStage::Undefined);
    assert_eq!(camera.stages, StageMask::VERTEX | StageMask::FRAGMENT);

    let material = &detail.uniforms[3];
    assert_eq!(material.name, "Material");
    assert_eq!(material.size, 32);
    assert_eq!(material.stage, ShaderStage::Fragment);

    // Step 3: vertex inputs, then fragment outputs
    let inputs: Vec<(u32, &str)> = detail.inputs().map(|io| (io.location, io.name.as_str())).collect();
    assert_eq!(inputs, vec![(0, "a_position"), (1, "a_uv")]);
    let outputs: Vec<&str> = detail.outputs().map(|io| io.name.as_str()).collect();
    assert_eq!(outputs, vec!["o_color"]);

    // Step 4: descriptor set layouts
    let layouts = detail.set_layouts();
    assert_eq!(layouts.len(), 2);
    assert_eq!(layouts[0].bindings.len(), 2);
    assert_eq!(layouts[1].bindings.len(), 2);
}

#[test]
fn test_integration_gen_glsl_detail_matches_pipeline() {
    let backend = ShaderBackend::acquire().unwrap();
    let detail = gen_glsl_detail(&backend,
        Some(load_shader("textured.vert")),
        Some(load_shader("textured.frag")),
        CompilerConfig::default()).unwrap();

    assert_eq!(detail.uniforms.len(), 4);
    assert_eq!(detail.pipeline_io.first().unwrap().direction, IoDirection::In);
    assert_eq!(detail.pipeline_io.last().unwrap().direction, IoDirection::Out);
}

#[test]
fn test_integration_combined_sampler_on_glsl_400() {
    let backend = ShaderBackend::acquire().unwrap();
    let detail = gen_glsl_detail(&backend,
        Some(load_shader("textured.vert")),
        Some(load_shader("combined.frag")),
        CompilerConfig::default()).unwrap();

    let albedo = &detail.uniforms[0];
    assert_eq!(albedo.name, "u_albedo");
    assert_eq!(albedo.opaque_class, Some(OpaqueClass::CombinedImageSampler));
    assert_eq!(albedo.dim(), Some(ResourceDim::D2));
    assert_eq!((albedo.set, albedo.binding), (0, 1));

    let layouts = detail.set_layouts();
    assert_eq!(layouts.len(), 1);
    assert_eq!(layouts[0].bindings.len(), 2);
}

// ============================================================================
// END-TO-END EMISSION
// ============================================================================

#[test]
fn test_integration_emit_all_stages() {
    let backend = ShaderBackend::acquire().unwrap();
    let mut pipeline = ShaderPipeline::new(&backend, CompilerConfig::default()).unwrap();
    pipeline.add_stage(ShaderStage::Vertex, load_shader("textured.vert")).unwrap();
    pipeline.add_stage(ShaderStage::Fragment, load_shader("textured.frag")).unwrap();
    pipeline.compile().unwrap();
    pipeline.link().unwrap();

    let modules = pipeline.emit_all().unwrap();
    assert_eq!(modules.len(), 2);
    for module in &modules {
        assert_eq!(module.words()[0], SPIRV_MAGIC);
        assert_eq!(module.words()[1], SpirvVersion::V1_2.header_word());
        assert_eq!(module.as_bytes().len() % 4, 0);
    }

    // emission is a pure read of the linked program
    let again = pipeline.emit_all().unwrap();
    assert_eq!(modules, again);
}

#[test]
fn test_integration_compute_storage_images() {
    let backend = ShaderBackend::acquire().unwrap();
    let config = CompilerConfig {
        client: VulkanVersion::V1_3,
        target: SpirvVersion::V1_6,
        ..CompilerConfig::default()
    };
    let mut pipeline = ShaderPipeline::new(&backend, config).unwrap();
    pipeline.add_stage(ShaderStage::Compute, load_shader("blur.comp")).unwrap();
    pipeline.compile().unwrap();
    pipeline.link().unwrap();

    let module = pipeline.emit(ShaderStage::Compute);
    assert!(!module.is_empty());
    assert_eq!(module.words()[1], 0x0001_0600);

    let detail = pipeline.reflect().unwrap();
    assert_eq!(detail.uniforms.len(), 2);
    assert!(detail.uniforms.iter().all(|u| u.opaque_class == Some(OpaqueClass::StorageImage)));
    assert!(detail.uniforms.iter().all(|u| u.stage == ShaderStage::Compute));
    assert!(detail.pipeline_io.is_empty());
}

#[test]
fn test_integration_glsl_to_spv() {
    let backend = ShaderBackend::acquire().unwrap();
    let module = glsl_to_spv(&backend, &load_shader("textured.frag"),
        ShaderStage::Fragment, CompilerConfig::default());
    assert!(!module.is_empty());
    assert_eq!(module.stage(), ShaderStage::Fragment);
}

// ============================================================================
// FAILURE PATHS
// ============================================================================

#[test]
fn test_integration_syntax_error_leaves_stage_empty() {
    let backend = ShaderBackend::acquire().unwrap();
    let mut pipeline = ShaderPipeline::new(&backend, CompilerConfig::default()).unwrap();
    pipeline.add_stage(ShaderStage::Vertex, load_shader("textured.vert")).unwrap();
    pipeline.add_stage(ShaderStage::Fragment, load_shader("syntax_error.frag")).unwrap();

    let err = pipeline.compile().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert_eq!(pipeline.state(), PipelineState::Compiled);

    pipeline.link().unwrap();
    assert!(!pipeline.emit(ShaderStage::Vertex).is_empty());
    assert!(pipeline.emit(ShaderStage::Fragment).is_empty());
}

#[test]
fn test_integration_empty_source_fails_before_compile() {
    let backend = ShaderBackend::acquire().unwrap();
    let mut pipeline = ShaderPipeline::new(&backend, CompilerConfig::default()).unwrap();

    let err = pipeline.add_stage_file(ShaderStage::Fragment, shader_path("empty.frag")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
    assert!(ShaderSource::new("inline.frag", "").is_err());

    // nothing was requested, so nothing links
    pipeline.compile().unwrap();
    assert_eq!(pipeline.link().unwrap_err().kind(), ErrorKind::Link);
}

#[test]
fn test_integration_vertex_fragment_mismatch() {
    let backend = ShaderBackend::acquire().unwrap();
    let fragment = ShaderSource::new("mismatch.frag", "\
layout(location = 0) in vec4 v_uv;
layout(location = 0) out vec4 o_color;
void main() { o_color = v_uv; }
").unwrap();

    let mut pipeline = ShaderPipeline::new(&backend, CompilerConfig::default()).unwrap();
    pipeline.add_stage(ShaderStage::Vertex, load_shader("textured.vert")).unwrap();
    pipeline.add_stage(ShaderStage::Fragment, fragment).unwrap();
    pipeline.compile().unwrap();

    let err = pipeline.link().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Link);
    assert_eq!(pipeline.state(), PipelineState::LinkFailed);
    assert!(pipeline.emit_all().is_err());
}
