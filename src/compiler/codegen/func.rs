//! Function lowering: signatures, parameter binding, terminator
//! synthesis and per-function verification.

use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::PointerValue;

use crate::ast::{Expr, FunctionParam, Item, Type};

use super::Codegen;

impl<'a, 'ctx> Codegen<'a, 'ctx> {
    /// Lower one function item.
    ///
    /// 1. Lower parameter and return types and build the signature.
    /// 2. Create the function with external linkage and record it.
    /// 3. Name parameters and seed the SSA table with their values.
    /// 4. Lower the body into a fresh entry block.
    /// 5. Synthesize a missing terminator from the tail value.
    /// 6. Verify; a failing function is erased and reported.
    pub(crate) fn compile_function(
        &mut self,
        item: &Item,
        params: &[FunctionParam],
        return_type: &Type,
        body: Option<&Expr>,
    ) {
        let mut param_types: Vec<BasicMetadataTypeEnum> = Vec::with_capacity(params.len());
        for param in params {
            match self.compile_type(&param.ty) {
                Some(lowered) => param_types.push(lowered.into()),
                None => return,
            }
        }

        let returns_void = Self::type_is_void(return_type);
        let fn_type = if returns_void {
            self.context.void_type().fn_type(&param_types, false)
        } else {
            match self.compile_type(return_type) {
                Some(lowered) => lowered.fn_type(&param_types, false),
                None => return,
            }
        };

        let fn_val = self.module.add_function(&item.name, fn_type, None);
        self.functions.insert(item.name.clone(), fn_val);

        self.values.clear();
        self.slots.clear();
        for (index, param) in params.iter().enumerate() {
            if let Some(arg) = fn_val.get_nth_param(index as u32) {
                arg.set_name(&param.name);
                self.values.insert(param.name.clone(), arg);
            }
        }

        // Bodyless functions (`fn f();`, extern items) stay
        // declarations.
        let Some(body) = body else { return };

        let entry = self.context.append_basic_block(fn_val, "entry");
        self.builder.position_at_end(entry);

        let tail_value = self.compile_expr(body);

        if !self.block_has_terminator() {
            match tail_value {
                Some(value) if !returns_void => {
                    self.builder.build_return(Some(&value)).expect("build return");
                }
                _ => {
                    if returns_void {
                        self.builder.build_return(None).expect("build return");
                    }
                    // A non-void function with no tail value stays
                    // unterminated and is rejected by the verifier.
                }
            }
        }

        if !fn_val.verify(true) {
            self.error(
                &item.location,
                format!("Function verification failed for '{}'", item.name),
            );
            unsafe { fn_val.delete() };
            self.functions.remove(&item.name);
        }
    }

    /// Allocate in the entry block so a `let mut` slot dominates
    /// every use regardless of where the statement sits.
    pub(crate) fn create_entry_alloca(
        &mut self,
        ty: BasicTypeEnum<'ctx>,
        name: &str,
    ) -> PointerValue<'ctx> {
        let entry = self
            .builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .and_then(|function| function.get_first_basic_block());

        let Some(entry) = entry else {
            return self.builder.build_alloca(ty, name).expect("build alloca");
        };

        let entry_builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => entry_builder.position_before(&first),
            None => entry_builder.position_at_end(entry),
        }
        entry_builder.build_alloca(ty, name).expect("build alloca")
    }
}
