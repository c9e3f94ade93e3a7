//! Apex error reporting — the shared diagnostics substrate.
//!
//! Every pipeline stage (lexer, parser, resolver, codegen) owns a
//! [`Diagnostics`] list and appends to it instead of aborting. The
//! driver prints the accumulated entries after each stage and stops
//! the pipeline when a stage produced errors.

use std::fmt;

use thiserror::Error;

use crate::lexer::token::SourceLocation;

/// Diagnostic severity. Warnings are printed but never affect the
/// exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic tied to a source location.
///
/// Renders as `path:line:column: (error|warning): message`.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub location: SourceLocation,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.location.file, self.location.line, self.location.column, self.severity, self.message,
        )
    }
}

/// Ordered error and warning lists for one pipeline stage.
///
/// Ordering is stable and reflects production order, which for the
/// parser and lowerer is depth-first left-to-right over the AST.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            location,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.warnings.push(Diagnostic {
            location,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Number of errors recorded so far. Paired with
    /// [`Diagnostics::truncate_errors`] by the parser's speculative
    /// block-tail parse.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Discard errors recorded after `len`. Used when a speculative
    /// parse is rewound so its errors are not reported twice.
    pub fn truncate_errors(&mut self, len: usize) {
        self.errors.truncate(len);
    }

    /// Print every error, then every warning, to stderr.
    pub fn print_to_stderr(&self) {
        for diag in &self.errors {
            eprintln!("{diag}");
        }
        for diag in &self.warnings {
            eprintln!("{diag}");
        }
    }
}

/// Failures while emitting the verified module to disk.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to initialise native target: {0}")]
    TargetInit(String),
    #[error("failed to lookup target: {0}")]
    TargetLookup(String),
    #[error("failed to create target machine for '{0}'")]
    TargetMachine(String),
    #[error("failed to write LLVM IR: {0}")]
    WriteIr(String),
    #[error("failed to write object file: {0}")]
    WriteObject(String),
}

// ═══════════════════════════════════════════════════════════════════
// Status messages (coloured [apexc] tag, used by the verbose driver)
// ═══════════════════════════════════════════════════════════════════

/// Print a status/info message with a coloured `[apexc]` prefix.
pub fn info(message: impl fmt::Display) {
    eprintln!("\x1b[1;34m[apexc]\x1b[0m {message}");
}

/// Print a success message in green.
pub fn success(message: impl fmt::Display) {
    eprintln!("\x1b[1;32m[apexc]\x1b[0m {message}");
}
