//! Code generation — walks the AST and emits LLVM IR.
//!
//! Split by concern, mirroring the pipeline inside a function:
//!
//! - [`types`] — Apex type expressions → LLVM types, struct layouts
//! - [`func`]  — function lowering, entry allocas, verification
//! - [`expr`]  — expression and statement lowering, control-flow CFG

pub mod expr;
pub mod func;
pub mod types;

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};

use crate::ast::{self, ItemKind};
use crate::errors::Diagnostics;
use crate::lexer::token::SourceLocation;

/// Struct table entry: the LLVM layout plus field names in
/// declaration order, so field access can map a name to an index.
pub(crate) struct StructInfo<'ctx> {
    pub struct_type: StructType<'ctx>,
    pub field_names: Vec<String>,
}

/// One lowering pass over a module.
///
/// Two per-function symbol tables coexist: `values` holds immutable
/// SSA bindings (parameters, plain `let`), `slots` holds mutable
/// stack allocations (`let mut`, loop counters). Name lookup prefers
/// `slots` — issuing a load — and falls back to `values`.
pub struct Codegen<'a, 'ctx> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: &'a Module<'ctx>,
    pub(crate) builder: &'a Builder<'ctx>,
    pub(crate) functions: HashMap<String, FunctionValue<'ctx>>,
    pub(crate) structs: HashMap<String, StructInfo<'ctx>>,
    pub(crate) values: HashMap<String, BasicValueEnum<'ctx>>,
    pub(crate) slots: HashMap<String, (PointerValue<'ctx>, BasicTypeEnum<'ctx>)>,
    pub(crate) diags: Diagnostics,
}

impl<'a, 'ctx> Codegen<'a, 'ctx> {
    pub fn new(context: &'ctx Context, module: &'a Module<'ctx>, builder: &'a Builder<'ctx>) -> Self {
        Self {
            context,
            module,
            builder,
            functions: HashMap::new(),
            structs: HashMap::new(),
            values: HashMap::new(),
            slots: HashMap::new(),
            diags: Diagnostics::new(),
        }
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diags
    }

    /// Lower every item in source order, then run the module
    /// verifier. Returns `true` when the module is clean.
    pub fn generate(&mut self, module: &ast::Module) -> bool {
        for item in &module.items {
            match &item.kind {
                ItemKind::Function { params, return_type, body, .. } => {
                    self.compile_function(item, params, return_type, body.as_ref());
                }
                ItemKind::Struct { fields } => {
                    self.compile_struct(item, fields);
                }
                // Traits, impls, aliases, nested modules and imports
                // have no lowering yet.
                _ => {}
            }
        }

        if let Err(message) = self.module.verify() {
            self.diags.error(
                module.location.clone(),
                format!("Module verification failed: {}", message.to_string().trim_end()),
            );
        }

        !self.diags.has_errors()
    }

    // ── shared helpers ──────────────────────────────────────────────

    pub(crate) fn error(&mut self, location: &SourceLocation, message: impl Into<String>) {
        self.diags.error(location.clone(), message);
    }

    /// Terminator discipline, centralized: true when the insertion
    /// point already ends in a branch/return, in which case nothing
    /// further may be emitted there.
    pub(crate) fn block_has_terminator(&self) -> bool {
        self.builder
            .get_insert_block()
            .map_or(true, |block| block.get_terminator().is_some())
    }

    /// Fall through to `target` unless the current block already
    /// ends in a terminator.
    pub(crate) fn branch_to(&self, target: BasicBlock<'ctx>) {
        if !self.block_has_terminator() {
            self.builder.build_unconditional_branch(target).expect("build branch");
        }
    }
}
