//! GLSL sources shared by the unit tests

use crate::backend::{BackendGuard, ShaderBackend};
use crate::compiler::{CompiledUnit, StageCompiler};
use crate::config::CompilerConfig;
use crate::source::ShaderSource;
use crate::stage::ShaderStage;
use std::sync::Arc;

/// One vertex input at location 0, one output at location 0
pub const BASIC_VERT: &str = "\
#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;
void main() {
    v_uv = a_position * 0.5 + 0.5;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Params block at (0, 0), texture at (0, 1), one input, one output
pub const BASIC_FRAG: &str = "\
#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 o_color;
layout(set = 0, binding = 0) uniform Params {
    vec4 tint;
} params;
layout(set = 0, binding = 1) uniform texture2D u_albedo;
void main() {
    o_color = params.tint * vec4(v_uv, 0.0, 1.0);
}
";

/// Camera block at (0, 2), shared with `CAMERA_FRAG`
pub const CAMERA_VERT: &str = "\
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec2 a_uv;
layout(location = 0) out vec2 v_uv;
layout(set = 0, binding = 2) uniform Camera {
    mat4 view_proj;
} camera;
void main() {
    v_uv = a_uv;
    gl_Position = camera.view_proj * vec4(a_position, 1.0);
}
";

/// Camera block at (0, 2), texture at (0, 1), sampler at (0, 3)
pub const CAMERA_FRAG: &str = "\
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 o_color;
layout(set = 0, binding = 2) uniform Camera {
    mat4 view_proj;
} camera;
layout(set = 0, binding = 1) uniform texture2D u_albedo;
layout(set = 0, binding = 3) uniform sampler u_sampler;
void main() {
    o_color = camera.view_proj * vec4(v_uv, 0.0, 1.0);
}
";

/// Params block at (0, 0) (16 bytes), combined sampler at (0, 1), one input
pub const COMBINED_FRAG: &str = "\
#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 o_color;
layout(set = 0, binding = 0) uniform Params {
    vec4 tint;
} params;
layout(set = 0, binding = 1) uniform sampler2D u_albedo;
void main() {
    o_color = params.tint * texture(u_albedo, v_uv);
}
";

/// `#version 400` pair: mat4 instance transform at location 1 (locations 1..4)
pub const LEGACY_VERT: &str = "\
#version 400
#extension GL_ARB_separate_shader_objects : enable
layout(location = 0) in vec3 a_position;
layout(location = 1) in mat4 a_model;
layout(location = 0) out vec3 v_normal;
void main() {
    v_normal = normalize(a_position);
    gl_Position = a_model * vec4(a_position, 1.0);
}
";

/// `#version 400` fragment reading `LEGACY_VERT`, shadow sampler at (0, 0)
pub const LEGACY_FRAG: &str = "\
#version 400
#extension GL_ARB_separate_shader_objects : enable
#extension GL_ARB_shading_language_420pack : enable
layout(location = 0) in vec3 v_normal;
layout(location = 0) out vec4 o_color;
layout(set = 0, binding = 0) uniform sampler2DShadow u_shadow;
void main() {
    float lit = texture(u_shadow, vec3(v_normal.xy, 0.5));
    o_color = vec4(v_normal * lit, 1.0);
}
";

/// Storage buffer at (0, 0)
pub const DOUBLE_COMP: &str = "\
#version 450
layout(local_size_x = 64) in;
layout(std430, set = 0, binding = 0) buffer Data {
    float values[];
} data;
void main() {
    uint index = gl_GlobalInvocationID.x;
    data.values[index] = data.values[index] * 2.0;
}
";

/// Missing closing parenthesis
pub const BROKEN_FRAG: &str = "\
#version 450
layout(location = 0) out vec4 o_color;
void main( {
    o_color = vec4(1.0);
}
";

pub fn source(name: &str, text: &str) -> ShaderSource {
    ShaderSource::new(name, text).unwrap()
}

pub fn backend() -> BackendGuard {
    ShaderBackend::acquire().unwrap()
}

pub fn compile_with(config: CompilerConfig, text: &str, stage: ShaderStage) -> CompiledUnit {
    let compiler = StageCompiler::new(&backend(), config).unwrap();
    compiler.compile(&source("fixture", text), stage).unwrap()
}

pub fn compile(text: &str, stage: ShaderStage) -> Arc<CompiledUnit> {
    Arc::new(compile_with(CompilerConfig::default(), text, stage))
}
