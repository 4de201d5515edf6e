//! # Prang Compiler
//!
//! Compiles decorated class components into render functions and component
//! registrations for a Vue-style runtime.
//!
//! ## Pipeline
//!
//! 1. **Scan**: `@Component`, `@Pipe` and `@Module` classes are analyzed into
//!    metadata keyed by a scope id derived from the file path and class index.
//!    Imported classes are followed across files so templates know which tags
//!    are components and which names are pipes.
//! 2. **Rewrite**: the decorator is removed and replaced by a static
//!    registration block; `input()`, `model()` and `output()` fields receive
//!    their names. In dev mode the template is imported from a virtual module,
//!    in build mode it is compiled inline.
//! 3. **Template**: HTML is parsed, transformed (structural directives, pipes,
//!    `this.x`, signal reads) and generated as a render function.
//! 4. **Style**: stylesheets go through a pluggable style compiler with the
//!    component's `data-v-` attribute.
//!
//! Virtual module ids look like `/src/app.component.html?prang&type=template&scopeId=1a2b3c4d`.

mod ast;
mod casing;
mod codegen;
mod component;
mod diagnostics;
mod discovery;
mod edit;
mod meta;
mod model;
mod parse;
mod pipe;
mod pipeline;
mod promote;
mod registry;
mod renamer;
mod scanner;
mod scope;
mod script;
mod sourcemap;
mod style;
mod template;
mod this_ref;
mod transform;
mod virtual_id;
mod visitor;

#[cfg(feature = "napi")]
mod native;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod component_tests;
#[cfg(test)]
mod parse_tests;
#[cfg(test)]
mod scanner_tests;

// Build tool integration
pub use discovery::{discover_sources, find_script_files, is_script_file, FileSystemHost};
pub use pipeline::{BuildMode, Compiler, CompilerOptions, ModuleHost, TransformOutput};

// Metadata
pub use meta::{
    BindingKind, BindingMetadata, ClassMeta, ClassType, ComponentMeta, FieldBinding, FieldRole, ImportBinding,
    ModuleMeta, PipeMeta, ScopeId, StyleRef, TemplateRef,
};
pub use registry::{template_imports, InMemoryRegistry, MetadataRegistry, TemplateImports};
pub use scanner::{ScanOptions, ScanOutcome, Scanner};

// Stages
pub use codegen::CodegenMode;
pub use component::{rewrite_module, RewriteOptions, RewrittenModule};
pub use style::{compile_style, PassthroughStyles, StyleCompiler, StyleError, StyleOptions, StyleOutput, StyleRequest};
pub use template::{compile_template, CompiledTemplate, TemplateOptions};

// Shared types
pub use ast::SourceLocation;
pub use diagnostics::{describe, CompileResult, CompilerError, Severity};
pub use sourcemap::SourceMap;
pub use virtual_id::{format_virtual_id, parse_virtual_id, VirtualId, VirtualIdError, VirtualKind, VirtualQuery};

#[cfg(feature = "napi")]
pub use native::{
    compile_template_native, format_virtual_id_native, parse_virtual_id_native, scan_source_native, NativeCompiler,
};
