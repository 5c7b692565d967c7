//! Teleidoscope Compiler - Strict Numeric Module Backend
//!
//! This crate lowers a parsed Teleidoscope program into a single
//! strictly-typed numeric module:
//!
//! - Coercion Resolver: assigns every expression a numeric kind and
//!   inserts explicit coercion markers at use-sites
//! - Signature Normalizer: fixes the calling convention and synthesizes
//!   the entry function
//! - Module Emitter: deterministically renders the module text

pub mod builtins;
pub mod emit;
pub mod js;
pub mod kind;
pub mod normalize;
pub mod resolve;

mod codegen_tests;

pub use emit::lower_module;
pub use js::{ImportDecl, ImportSource, JsModule, MODULE_FACTORY_NAME};
pub use kind::{NumericKind, ValueKind};
pub use normalize::{normalize_program, ModulePlan};
pub use resolve::{resolve_program, Annotations, CalleeKind, CallableSig, LoopStrategy};

use tlc_common::CompilerError;
use tlc_frontend::Program;

/// How loop continue conditions are lowered; the decision is made once
/// per compiled module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopLowering {
    /// Test the source condition directly (canonical)
    #[default]
    CounterComparison,

    /// Rewrite `counter < bound` conditions to a truncated-difference
    /// nonzero test, `~~(bound - counter)`
    TruncatingNonzero,
}

/// Per-compilation options
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub loop_lowering: LoopLowering,
}

/// Main entry point for code generation: compile a parsed program into
/// the emitted module text. Fails atomically; no partial module is ever
/// produced.
pub fn generate_module(
    program: &Program,
    options: &CompileOptions,
) -> Result<String, CompilerError> {
    let annotations = resolve::resolve_program(program, options)?;
    let plan = normalize::normalize_program(program, &annotations);
    let module = emit::lower_module(&annotations, &plan);
    Ok(module.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlc_frontend::Frontend;

    #[test]
    fn test_generate_module_smoke() {
        let program = Frontend::parse_source("1 + 2").unwrap();
        let module = generate_module(&program, &CompileOptions::default()).unwrap();
        assert!(module.starts_with("function Teleidoscope(stdlib, foreign, heap) {"));
        assert!(module.contains("\"use asm\";"));
        assert!(module.contains("return { main: $main };"));
    }

    #[test]
    fn test_failed_compilation_yields_no_module() {
        let program = Frontend::parse_source("frob(1)").unwrap();
        let result = generate_module(&program, &CompileOptions::default());
        assert!(matches!(result, Err(CompilerError::UnboundName { .. })));
    }
}
