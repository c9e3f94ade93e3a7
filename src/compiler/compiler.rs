//! Top-level coordinator for code generation and output emission.
//!
//! Owns the LLVM module and builder for one compilation unit. The
//! lowering itself lives in [`super::codegen`]; this type wires it to
//! module verification and to the object/IR writers.

use std::path::Path;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};
use inkwell::OptimizationLevel;

use crate::ast;
use crate::errors::{Diagnostics, EmitError};

use super::codegen::Codegen;

/// Holds LLVM state for a single compilation unit.
pub struct Compiler<'ctx> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: Module<'ctx>,
    pub(crate) builder: Builder<'ctx>,
}

impl<'ctx> Compiler<'ctx> {
    /// Create a new compiler; the IR module is named after the input.
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        Self { context, module, builder }
    }

    // ── codegen entry point ─────────────────────────────────────

    /// Lower a full module to LLVM IR and verify it. The returned
    /// diagnostics are non-empty on any lowering or verification
    /// failure; emission must not run when they contain errors.
    pub fn compile(&self, module: &ast::Module) -> Diagnostics {
        let mut codegen = Codegen::new(self.context, &self.module, &self.builder);
        codegen.generate(module);
        codegen.into_diagnostics()
    }

    // ── output helpers ──────────────────────────────────────────

    /// Dump the LLVM IR to stderr.
    pub fn dump_ir(&self) {
        self.module.print_to_stderr();
    }

    /// Return the LLVM IR as a string.
    pub fn ir_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Write textual LLVM IR to `path`.
    pub fn write_ir_file(&self, path: &Path) -> Result<(), EmitError> {
        self.module
            .print_to_file(path)
            .map_err(|e| EmitError::WriteIr(e.to_string()))
    }

    /// Write a relocatable object for the host default triple with a
    /// "generic" CPU.
    pub fn write_object_file(&self, path: &Path) -> Result<(), EmitError> {
        Target::initialize_native(&InitializationConfig::default()).map_err(EmitError::TargetInit)?;

        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple).map_err(|e| EmitError::TargetLookup(e.to_string()))?;
        let machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::Default,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| EmitError::TargetMachine(triple.as_str().to_string_lossy().into_owned()))?;

        machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| EmitError::WriteObject(e.to_string()))
    }
}
