/*!
# Galaxy 3D Shader Compiler

GLSL to SPIR-V compilation and reflection for the Galaxy 3D engine.

The crate turns GLSL source text for one or more pipeline stages into SPIR-V
modules ready for a Vulkan driver, and extracts the resource-binding metadata
(opaque uniforms, uniform blocks, pipeline inputs/outputs) a renderer needs to
build matching descriptor layouts.

## Architecture

- **ShaderBackend**: Reference-counted process-wide backend bracket and logger
- **StageCompiler**: Compiles one stage into a SPIR-V `CompiledUnit`
- **ProgramLinker**: Links compiled stages into a `LinkedProgram`
- **SpvEmitter**: Emits one SPIR-V `BinaryModule` per linked stage
- **ReflectionExtractor**: Builds reflection tables and extracts a `ShaderDetail`
- **ShaderPipeline**: Compile → Link → {Reflect | Emit} state machine

GLSL compilation is delegated to glslang through `shaderc`; stage interfaces
and emitted modules are read back with `spirq`.
*/

// Internal modules
mod error;
mod backend;
mod source;
mod interface;
pub mod log;
pub mod config;
pub mod stage;
pub mod compiler;
pub mod linker;
pub mod emitter;
pub mod reflection;
pub mod pipeline;

#[cfg(test)]
mod shader_fixtures;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, ErrorKind, Result};

    // Backend singleton
    pub use crate::backend::{ShaderBackend, BackendGuard};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: shader_* macros are NOT re-exported here - they are internal only
    }

    // Shader sub-module with the whole compilation pipeline
    pub mod shader {
        pub use crate::config::*;
        pub use crate::stage::*;
        pub use crate::source::ShaderSource;
        pub use crate::interface::{
            StageInterface, InterfaceVariable, IoFormat, IoScalar,
            ResourceInfo, ResourceClass, OpaqueClass, ResourceDim,
        };
        pub use crate::compiler::*;
        pub use crate::linker::*;
        pub use crate::emitter::*;
        pub use crate::reflection::*;
        pub use crate::pipeline::*;
    }
}
