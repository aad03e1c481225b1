//! Tacgen Compiler
//!
//! Lowers a resolved syntax tree of a small class-based language into linear
//! three-address code, assigning frame offsets and sizes to every declared
//! symbol along the way.

pub mod compiler;
pub mod diagnostics;

use compiler::ast::Program;
use compiler::lower::{lower, LowerError};
use compiler::resolve::{resolve, ResolveError};
use compiler::symbols::ScopeTable;
use compiler::tac::TacProgram;

use thiserror::Error;

// ── Compile options ─────────────────────────────────────────────────

/// What happens at the end of a `switch` case body that does not jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchCaseExit {
    /// A `goto end` is appended after each non-empty case (default).
    #[default]
    ImplicitBreak,
    /// Control runs on into the next case's label.
    FallThrough,
}

/// Handling of array literals whose rows disagree in length or depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RaggedArrayPolicy {
    /// Report a diagnostic and store no elements (default).
    #[default]
    Reject,
    /// Size each dimension by its longest row and store zero values in the gaps.
    ZeroPad,
}

/// How a closed function or class frame affects the enclosing cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedFrameLayout {
    /// The enclosing cursor resumes where it was (default).
    #[default]
    Independent,
    /// The closed frame's size is added to the enclosing cursor.
    Folded,
}

/// Options controlling the lowering pass.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Size of a reference and of an array header. Default: `8`.
    pub pointer_size: u32,
    /// Case exit behavior. Default: `ImplicitBreak`.
    pub switch_cases: SwitchCaseExit,
    /// Ragged array literal handling. Default: `Reject`.
    pub ragged_arrays: RaggedArrayPolicy,
    /// Nested frame accounting. Default: `Independent`.
    pub nested_frames: NestedFrameLayout,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            pointer_size: 8,
            switch_cases: SwitchCaseExit::default(),
            ragged_arrays: RaggedArrayPolicy::default(),
            nested_frames: NestedFrameLayout::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("resolve errors: {0:?}")]
    Resolve(Vec<ResolveError>),
    #[error("lowering errors: {0:?}")]
    Lower(Vec<LowerError>),
}

impl From<Vec<ResolveError>> for CompileError {
    fn from(errors: Vec<ResolveError>) -> Self {
        CompileError::Resolve(errors)
    }
}

impl From<Vec<LowerError>> for CompileError {
    fn from(errors: Vec<LowerError>) -> Self {
        CompileError::Lower(errors)
    }
}

/// Lowered code together with the scope table it annotated.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub tac: TacProgram,
    pub scopes: ScopeTable,
}

/// Collect declarations from `program`, then lower it.
pub fn compile(program: &Program, options: &CompileOptions) -> Result<CompileOutput, CompileError> {
    let scopes = resolve(program)?;
    compile_with_scopes(program, scopes, options)
}

/// Lower `program` against a scope table produced elsewhere.
///
/// Any lowering diagnostic fails the compilation; use
/// [`compiler::lower::lower`] directly to keep the best-effort output.
pub fn compile_with_scopes(
    program: &Program,
    mut scopes: ScopeTable,
    options: &CompileOptions,
) -> Result<CompileOutput, CompileError> {
    let lowered = lower(program, &mut scopes, options);
    if !lowered.diagnostics.is_empty() {
        return Err(lowered.diagnostics.into());
    }
    Ok(CompileOutput { tac: lowered.program, scopes })
}
