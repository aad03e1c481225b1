//! Coded diagnostics for declaration and lowering errors.
//!
//! Code ranges:
//!   E0100–E0199  Declaration collection errors
//!   E0200–E0299  Lowering errors

use crate::compiler::lower::LowerError;
use crate::compiler::resolve::ResolveError;
use crate::CompileError;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A diagnostic ready for display
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub line: Option<usize>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Render without colors (for logs, tests)
    pub fn render_plain(&self) -> String {
        let mut out = String::new();

        let severity_label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };

        if let Some(ref code) = self.code {
            out.push_str(&format!("{}[{}]: ", severity_label, code));
        } else {
            out.push_str(&format!("{}: ", severity_label));
        }
        out.push_str(&self.message);
        out.push('\n');

        if let Some(line) = self.line {
            out.push_str(&format!("  --> line {}\n", line));
        }

        for suggestion in &self.suggestions {
            out.push_str(&format!("   = help: {}\n", suggestion));
        }

        out
    }
}

// Edit distance for suggestions
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();

    for (i, ac) in a_chars.iter().enumerate() {
        let mut row = vec![i + 1; b_chars.len() + 1];
        for (j, bc) in b_chars.iter().enumerate() {
            let cost = usize::from(ac != bc);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        prev = row;
    }

    prev[b_chars.len()]
}

fn suggest_similar(name: &str, candidates: &[&str], max_distance: usize) -> Vec<String> {
    let mut matches: Vec<(usize, String)> = candidates
        .iter()
        .filter(|c| **c != name)
        .filter_map(|c| {
            let d = edit_distance(name, c);
            (d <= max_distance).then(|| (d, c.to_string()))
        })
        .collect();

    matches.sort_by_key(|(d, _)| *d);
    matches.into_iter().map(|(_, s)| s).take(3).collect()
}

pub fn resolve_error_code(e: &ResolveError) -> &'static str {
    match e {
        ResolveError::Duplicate { .. } => "E0100",
        ResolveError::ScopeCollision { .. } => "E0101",
    }
}

pub fn lower_error_code(e: &LowerError) -> &'static str {
    match e {
        LowerError::UnresolvedSymbol { .. } => "E0200",
        LowerError::BreakOutsideLoop { .. } => "E0201",
        LowerError::ContinueOutsideLoop { .. } => "E0202",
        LowerError::RaggedArrayLiteral { .. } => "E0203",
    }
}

fn format_resolve_error(error: &ResolveError) -> Diagnostic {
    let suggestions = match error {
        ResolveError::Duplicate { name, .. } => {
            vec![format!("rename one of the declarations of '{}' or move it to its own block", name)]
        }
        ResolveError::ScopeCollision { .. } => vec!["give each block a distinct start position".to_string()],
    };
    Diagnostic {
        severity: Severity::Error,
        code: Some(resolve_error_code(error).to_string()),
        message: error.to_string(),
        line: Some(error.line()),
        suggestions,
    }
}

/// `known_names` feeds "did you mean" hints for unresolved symbols.
pub fn format_lower_error(error: &LowerError, known_names: &[&str]) -> Diagnostic {
    let suggestions = match error {
        LowerError::UnresolvedSymbol { name, .. } => suggest_similar(name, known_names, 2)
            .into_iter()
            .map(|s| format!("did you mean '{}'?", s))
            .collect(),
        LowerError::BreakOutsideLoop { .. } => {
            vec!["'break' is only valid inside a loop or a switch".to_string()]
        }
        LowerError::ContinueOutsideLoop { .. } => vec!["'continue' is only valid inside a loop".to_string()],
        LowerError::RaggedArrayLiteral { .. } => {
            vec!["every row of an array literal must have the same length".to_string()]
        }
    };
    Diagnostic {
        severity: Severity::Error,
        code: Some(lower_error_code(error).to_string()),
        message: error.to_string(),
        line: Some(error.line()),
        suggestions,
    }
}

/// Convert a CompileError into a list of Diagnostics
pub fn format_compile_error(error: &CompileError, known_names: &[&str]) -> Vec<Diagnostic> {
    match error {
        CompileError::Resolve(errors) => errors.iter().map(format_resolve_error).collect(),
        CompileError::Lower(errors) => errors.iter().map(|e| format_lower_error(e, known_names)).collect(),
    }
}
