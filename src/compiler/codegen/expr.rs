//! Expression and statement lowering.
//!
//! Control-flow constructs materialize SSA form directly: basic
//! blocks, conditional branches and φ-nodes for `if`, loop CFGs for
//! `while` and `for`. Every branch goes through the terminator
//! discipline helpers in `mod.rs` so no block ever receives a second
//! terminator.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum};
use inkwell::{FloatPredicate, IntPredicate};

use crate::ast::{BinaryOp, Expr, ExprKind, Pattern, PatternKind, Stmt, StmtKind, UnaryOp};
use crate::lexer::token::LiteralValue;

use super::Codegen;

impl<'a, 'ctx> Codegen<'a, 'ctx> {
    // ── statements ──────────────────────────────────────────────────

    pub(crate) fn compile_stmt(&mut self, stmt: &Stmt) {
        // Statements after a return/branch are unreachable; drop them
        // rather than emit into a terminated block.
        if self.block_has_terminator() {
            return;
        }

        match &stmt.kind {
            StmtKind::Let { pattern, ty, initializer } => {
                self.compile_let(stmt, pattern, ty.as_ref(), initializer.as_ref());
            }
            StmtKind::Expr { expr, .. } => {
                self.compile_expr(expr);
            }
            // Nested items are resolved but not lowered.
            StmtKind::Item(_) => {}
        }
    }

    /// `let` inserts the initializer straight into the SSA table;
    /// `let mut` allocates an entry-region slot, stores, and inserts
    /// into the mutable table.
    fn compile_let(
        &mut self,
        stmt: &Stmt,
        pattern: &Pattern,
        ty: Option<&crate::ast::Type>,
        initializer: Option<&Expr>,
    ) {
        let (name, is_mutable) = match &pattern.kind {
            PatternKind::Identifier { name, is_mutable } => (name.clone(), *is_mutable),
            PatternKind::Wildcard => {
                // Evaluate for effect, bind nothing.
                if let Some(init) = initializer {
                    self.compile_expr(init);
                }
                return;
            }
            _ => {
                self.error(&stmt.location, "Destructuring let bindings are not supported yet");
                return;
            }
        };

        let init_value = initializer.and_then(|init| self.compile_expr(init));

        if is_mutable {
            let slot_type = match (&init_value, ty) {
                (Some(value), _) => value.get_type(),
                (None, Some(ty)) => match self.compile_type(ty) {
                    Some(lowered) => lowered,
                    None => return,
                },
                (None, None) => {
                    self.error(&stmt.location, format!("Cannot determine a type for '{name}'"));
                    return;
                }
            };

            let slot = self.create_entry_alloca(slot_type, &name);
            if let Some(value) = init_value {
                self.builder.build_store(slot, value).expect("build store");
            }
            self.values.remove(&name);
            self.slots.insert(name, (slot, slot_type));
        } else if let Some(value) = init_value {
            self.slots.remove(&name);
            self.values.insert(name, value);
        }
    }

    // ── expressions ─────────────────────────────────────────────────

    pub(crate) fn compile_expr(&mut self, expr: &Expr) -> Option<BasicValueEnum<'ctx>> {
        match &expr.kind {
            ExprKind::Literal(value) => self.compile_literal(expr, value.as_ref()),

            ExprKind::Identifier(name) => self.compile_identifier(expr, name),

            ExprKind::Binary { op, left, right } if op.is_assignment() => {
                self.compile_assignment(expr, *op, left, right)
            }

            ExprKind::Binary { op, left, right } => {
                let lhs = self.compile_expr(left)?;
                let rhs = self.compile_expr(right)?;
                self.compile_binary_values(expr, *op, lhs, rhs)
            }

            ExprKind::Unary { op, operand } => self.compile_unary(expr, *op, operand),

            ExprKind::Call { callee, arguments } => self.compile_call(callee, arguments),

            ExprKind::FieldAccess { object, field } => self.compile_field_access(expr, object, field),

            ExprKind::Cast { value, target } => self.compile_cast(expr, value, target),

            ExprKind::StructLiteral { path, fields } => self.compile_struct_literal(expr, path, fields),

            ExprKind::Block { stmts, tail } => self.compile_block(stmts, tail.as_deref()),

            ExprKind::If { condition, then_branch, else_branch } => {
                self.compile_if(condition, then_branch, else_branch.as_deref())
            }

            ExprKind::Return(value) => self.compile_return(value.as_deref()),

            ExprKind::While { condition, body } => self.compile_while(condition, body),

            ExprKind::For { pattern, iterator, body } => self.compile_for(pattern, iterator, body),

            // Break/continue parse but lower to nothing until a loop
            // stack of (break, continue) targets exists.
            ExprKind::Break | ExprKind::Continue => None,

            ExprKind::Match { .. } => {
                self.error(&expr.location, "Match expressions are not lowered yet");
                None
            }

            ExprKind::Range { .. } => {
                self.error(&expr.location, "Range expressions are only supported as for-loop iterators");
                None
            }

            ExprKind::Index { .. } => {
                self.error(&expr.location, "Index expressions are not lowered yet");
                None
            }

            ExprKind::ArrayLiteral { .. } => {
                self.error(&expr.location, "Array literals are not lowered yet");
                None
            }

            // The unit value lowers to nothing.
            ExprKind::Tuple(elements) if elements.is_empty() => None,

            ExprKind::Tuple(_) => {
                self.error(&expr.location, "Tuple expressions are not lowered yet");
                None
            }
        }
    }

    fn compile_literal(
        &mut self,
        expr: &Expr,
        value: Option<&LiteralValue>,
    ) -> Option<BasicValueEnum<'ctx>> {
        match value {
            // Integers default to 32-bit signed; width inference is
            // absent.
            Some(LiteralValue::Int(v)) => {
                if *v > i32::MAX as i64 || *v < i32::MIN as i64 {
                    self.diags.warning(
                        expr.location.clone(),
                        format!("Integer literal {v} is truncated to 32 bits"),
                    );
                }
                Some(self.context.i32_type().const_int(*v as u64, true).into())
            }

            Some(LiteralValue::Uint(v)) => {
                self.diags.warning(
                    expr.location.clone(),
                    format!("Integer literal {v} is truncated to 32 bits"),
                );
                Some(self.context.i32_type().const_int(*v, false).into())
            }

            Some(LiteralValue::Float(v)) => Some(self.context.f64_type().const_float(*v).into()),

            Some(LiteralValue::Bool(b)) => {
                Some(self.context.bool_type().const_int(u64::from(*b), false).into())
            }

            Some(LiteralValue::Str(text)) => {
                let global = self
                    .builder
                    .build_global_string_ptr(text, "str")
                    .expect("build global string");
                Some(global.as_pointer_value().into())
            }

            // `null` is an untyped null pointer.
            None => Some(
                self.context
                    .i8_type()
                    .ptr_type(inkwell::AddressSpace::default())
                    .const_null()
                    .into(),
            ),
        }
    }

    fn compile_identifier(&mut self, expr: &Expr, name: &str) -> Option<BasicValueEnum<'ctx>> {
        // Mutable slots first (issuing a load), then SSA values, then
        // functions.
        if let Some((slot, _slot_type)) = self.slots.get(name).copied() {
            return Some(self.builder.build_load(slot, name).expect("build load"));
        }

        if let Some(value) = self.values.get(name).copied() {
            return Some(value);
        }

        if let Some(function) = self.functions.get(name).copied() {
            return Some(function.as_global_value().as_pointer_value().into());
        }

        self.error(&expr.location, format!("No value bound for '{name}'"));
        None
    }

    // ── assignment ──────────────────────────────────────────────────

    /// The target must resolve to a mutable-table entry (or a field
    /// of one); the stored value is the expression's result.
    fn compile_assignment(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Option<BasicValueEnum<'ctx>> {
        match &left.kind {
            ExprKind::Identifier(name) => {
                let Some((slot, _slot_type)) = self.slots.get(name).copied() else {
                    self.error(
                        &left.location,
                        format!("Cannot assign to '{name}': not a mutable variable"),
                    );
                    self.compile_expr(right);
                    return None;
                };

                let rhs = self.compile_expr(right)?;

                let stored = match op.compound_base() {
                    None => rhs,
                    Some(base) => {
                        let current =
                            self.builder.build_load(slot, "cur").expect("build load");
                        self.compile_binary_values(expr, base, current, rhs)?
                    }
                };

                self.builder.build_store(slot, stored).expect("build store");
                Some(stored)
            }

            ExprKind::FieldAccess { object, field } => {
                self.compile_field_assignment(expr, object, field, right, op)
            }

            _ => {
                self.error(&left.location, "Unsupported assignment target");
                None
            }
        }
    }

    // ── operators ───────────────────────────────────────────────────

    /// Integer operations are signed (`sdiv`, `srem`, `icmp s*`,
    /// `ashr`); float comparisons are ordered.
    pub(crate) fn compile_binary_values(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Option<BasicValueEnum<'ctx>> {
        use BinaryOp::*;

        if lhs.is_int_value() && rhs.is_int_value() {
            let l = lhs.into_int_value();
            let r = rhs.into_int_value();

            let value: BasicValueEnum = match op {
                Add => self.builder.build_int_add(l, r, "addtmp").expect("build add").into(),
                Sub => self.builder.build_int_sub(l, r, "subtmp").expect("build sub").into(),
                Mul => self.builder.build_int_mul(l, r, "multmp").expect("build mul").into(),
                Div => self
                    .builder
                    .build_int_signed_div(l, r, "divtmp")
                    .expect("build div")
                    .into(),
                Mod => self
                    .builder
                    .build_int_signed_rem(l, r, "modtmp")
                    .expect("build rem")
                    .into(),

                Eq | Ne | Lt | Le | Gt | Ge => {
                    let predicate = match op {
                        Eq => IntPredicate::EQ,
                        Ne => IntPredicate::NE,
                        Lt => IntPredicate::SLT,
                        Le => IntPredicate::SLE,
                        Gt => IntPredicate::SGT,
                        Ge => IntPredicate::SGE,
                        _ => unreachable!("comparison operator"),
                    };
                    self.builder
                        .build_int_compare(predicate, l, r, "cmptmp")
                        .expect("build compare")
                        .into()
                }

                // Logical and/or operate on i1 operands; a
                // short-circuit CFG is future work.
                And | BitAnd => self.builder.build_and(l, r, "andtmp").expect("build and").into(),
                Or | BitOr => self.builder.build_or(l, r, "ortmp").expect("build or").into(),
                BitXor => self.builder.build_xor(l, r, "xortmp").expect("build xor").into(),

                Shl => self.builder.build_left_shift(l, r, "shltmp").expect("build shl").into(),
                Shr => self
                    .builder
                    .build_right_shift(l, r, true, "shrtmp")
                    .expect("build shr")
                    .into(),

                _ => {
                    self.error(&expr.location, "Unsupported integer operator");
                    return None;
                }
            };
            return Some(value);
        }

        if lhs.is_float_value() && rhs.is_float_value() {
            let l = lhs.into_float_value();
            let r = rhs.into_float_value();

            let value: BasicValueEnum = match op {
                Add => self.builder.build_float_add(l, r, "faddtmp").expect("build fadd").into(),
                Sub => self.builder.build_float_sub(l, r, "fsubtmp").expect("build fsub").into(),
                Mul => self.builder.build_float_mul(l, r, "fmultmp").expect("build fmul").into(),
                Div => self.builder.build_float_div(l, r, "fdivtmp").expect("build fdiv").into(),
                Mod => self.builder.build_float_rem(l, r, "fremtmp").expect("build frem").into(),

                Eq | Ne | Lt | Le | Gt | Ge => {
                    let predicate = match op {
                        Eq => FloatPredicate::OEQ,
                        Ne => FloatPredicate::ONE,
                        Lt => FloatPredicate::OLT,
                        Le => FloatPredicate::OLE,
                        Gt => FloatPredicate::OGT,
                        Ge => FloatPredicate::OGE,
                        _ => unreachable!("comparison operator"),
                    };
                    self.builder
                        .build_float_compare(predicate, l, r, "fcmptmp")
                        .expect("build fcmp")
                        .into()
                }

                _ => {
                    self.error(&expr.location, "Operator is not defined for floating-point operands");
                    return None;
                }
            };
            return Some(value);
        }

        self.error(&expr.location, "Mismatched operand types in binary expression");
        None
    }

    fn compile_unary(
        &mut self,
        expr: &Expr,
        op: UnaryOp,
        operand: &Expr,
    ) -> Option<BasicValueEnum<'ctx>> {
        match op {
            UnaryOp::Neg => {
                let value = self.compile_expr(operand)?;
                if value.is_int_value() {
                    return Some(
                        self.builder
                            .build_int_neg(value.into_int_value(), "negtmp")
                            .expect("build neg")
                            .into(),
                    );
                }
                if value.is_float_value() {
                    return Some(
                        self.builder
                            .build_float_neg(value.into_float_value(), "fnegtmp")
                            .expect("build fneg")
                            .into(),
                    );
                }
                self.error(&expr.location, "Negation requires a numeric operand");
                None
            }

            UnaryOp::Not | UnaryOp::BitNot => {
                let value = self.compile_expr(operand)?;
                if value.is_int_value() {
                    return Some(
                        self.builder
                            .build_not(value.into_int_value(), "nottmp")
                            .expect("build not")
                            .into(),
                    );
                }
                self.error(&expr.location, "Bitwise/logical not requires an integer operand");
                None
            }

            UnaryOp::Deref | UnaryOp::AddrOf | UnaryOp::AddrOfMut => {
                self.error(&expr.location, "Reference and pointer operations are not lowered yet");
                None
            }
        }
    }

    // ── calls ───────────────────────────────────────────────────────

    fn compile_call(&mut self, callee: &Expr, arguments: &[Expr]) -> Option<BasicValueEnum<'ctx>> {
        let ExprKind::Identifier(name) = &callee.kind else {
            self.error(&callee.location, "Only direct calls to named functions are supported");
            return None;
        };

        let Some(function) = self.functions.get(name).copied() else {
            self.error(&callee.location, format!("Call to unknown function '{name}'"));
            return None;
        };

        let mut args: Vec<BasicMetadataValueEnum> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.compile_expr(argument)?.into());
        }

        let call = self.builder.build_call(function, &args, "calltmp").expect("build call");
        call.try_as_basic_value().left()
    }

    // ── blocks and control flow ─────────────────────────────────────

    pub(crate) fn compile_block(
        &mut self,
        stmts: &[Stmt],
        tail: Option<&Expr>,
    ) -> Option<BasicValueEnum<'ctx>> {
        for stmt in stmts {
            self.compile_stmt(stmt);
        }

        match tail {
            Some(expr) if !self.block_has_terminator() => self.compile_expr(expr),
            _ => None,
        }
    }

    /// `if` lowers to `then`/`else`/`ifcont`. Arms that do not
    /// terminate branch to the merge block; when both arm values
    /// exist with identical types they join in a φ-node. When both
    /// arms terminate the merge block is discarded.
    fn compile_if(
        &mut self,
        condition: &Expr,
        then_branch: &Expr,
        else_branch: Option<&Expr>,
    ) -> Option<BasicValueEnum<'ctx>> {
        let cond = self.compile_expr(condition)?;
        if !cond.is_int_value() {
            self.error(&condition.location, "Condition must be a boolean value");
            return None;
        }

        let function = self.builder.get_insert_block()?.get_parent()?;
        let then_bb = self.context.append_basic_block(function, "then");
        let else_bb = self.context.append_basic_block(function, "else");
        let merge_bb = self.context.append_basic_block(function, "ifcont");

        self.builder
            .build_conditional_branch(cond.into_int_value(), then_bb, else_bb)
            .expect("build conditional branch");

        self.builder.position_at_end(then_bb);
        let then_value = self.compile_expr(then_branch);
        let then_terminated = self.block_has_terminator();
        self.branch_to(merge_bb);
        let then_end = self.builder.get_insert_block()?;

        self.builder.position_at_end(else_bb);
        let else_value = match else_branch {
            Some(else_branch) => self.compile_expr(else_branch),
            None => None,
        };
        let else_terminated = self.block_has_terminator();
        self.branch_to(merge_bb);
        let else_end = self.builder.get_insert_block()?;

        if then_terminated && else_terminated {
            // Both arms leave through a return: the merge block has
            // no predecessors. The builder stays on the terminated
            // else block and terminator discipline suppresses any
            // code that follows.
            merge_bb.remove_from_function().ok();
            return None;
        }

        self.builder.position_at_end(merge_bb);

        if let (false, false, Some(then_value), Some(else_value)) =
            (then_terminated, else_terminated, then_value, else_value)
        {
            if then_value.get_type() == else_value.get_type() {
                let phi = self
                    .builder
                    .build_phi(then_value.get_type(), "iftmp")
                    .expect("build phi");
                phi.add_incoming(&[(&then_value, then_end), (&else_value, else_end)]);
                return Some(phi.as_basic_value());
            }
        }

        None
    }

    fn compile_return(&mut self, value: Option<&Expr>) -> Option<BasicValueEnum<'ctx>> {
        match value {
            Some(value) => {
                let lowered = self.compile_expr(value)?;
                if !self.block_has_terminator() {
                    self.builder.build_return(Some(&lowered)).expect("build return");
                }
            }
            None => {
                if !self.block_has_terminator() {
                    self.builder.build_return(None).expect("build return");
                }
            }
        }
        None
    }

    /// `while` lowers to `while.cond` / `while.body` / `while.end`;
    /// the body falls back to the condition unless it terminated.
    fn compile_while(&mut self, condition: &Expr, body: &Expr) -> Option<BasicValueEnum<'ctx>> {
        let function = self.builder.get_insert_block()?.get_parent()?;
        let cond_bb = self.context.append_basic_block(function, "while.cond");
        let body_bb = self.context.append_basic_block(function, "while.body");
        let end_bb = self.context.append_basic_block(function, "while.end");

        self.branch_to(cond_bb);

        self.builder.position_at_end(cond_bb);
        let cond = self.compile_expr(condition)?;
        if !cond.is_int_value() {
            self.error(&condition.location, "Condition must be a boolean value");
            return None;
        }
        self.builder
            .build_conditional_branch(cond.into_int_value(), body_bb, end_bb)
            .expect("build conditional branch");

        self.builder.position_at_end(body_bb);
        self.compile_expr(body);
        self.branch_to(cond_bb);

        self.builder.position_at_end(end_bb);
        None
    }

    /// `for` over a range lowers to `for.cond` / `for.body` /
    /// `for.inc` / `for.end` with a counter slot allocated in the
    /// entering block. During the body the counter is installed as a
    /// mutable binding under the loop variable's name; any shadowed
    /// slot is saved and restored afterwards.
    fn compile_for(
        &mut self,
        pattern: &Pattern,
        iterator: &Expr,
        body: &Expr,
    ) -> Option<BasicValueEnum<'ctx>> {
        let ExprKind::Range { start, end, inclusive } = &iterator.kind else {
            self.error(&iterator.location, "For loops over non-range iterators are not supported yet");
            return None;
        };

        let start_value = self.compile_expr(start)?;
        let end_value = self.compile_expr(end)?;
        if !start_value.is_int_value() || !end_value.is_int_value() {
            self.error(&iterator.location, "Range bounds must be integers");
            return None;
        }

        let binding = match &pattern.kind {
            PatternKind::Identifier { name, .. } => Some(name.clone()),
            PatternKind::Wildcard => None,
            _ => {
                self.error(&pattern.location, "Destructuring for-loop patterns are not supported yet");
                return None;
            }
        };

        let function = self.builder.get_insert_block()?.get_parent()?;
        let cond_bb = self.context.append_basic_block(function, "for.cond");
        let body_bb = self.context.append_basic_block(function, "for.body");
        let inc_bb = self.context.append_basic_block(function, "for.inc");
        let end_bb = self.context.append_basic_block(function, "for.end");

        let counter_name = binding.as_deref().unwrap_or("idx");
        let counter_type = self.context.i32_type();
        let counter = self.builder.build_alloca(counter_type, counter_name).expect("build alloca");
        self.builder.build_store(counter, start_value).expect("build store");
        self.branch_to(cond_bb);

        self.builder.position_at_end(cond_bb);
        let current = self
            .builder
            .build_load(counter, counter_name)
            .expect("build load")
            .into_int_value();
        let predicate = if *inclusive { IntPredicate::SLE } else { IntPredicate::SLT };
        let keep_going = self
            .builder
            .build_int_compare(predicate, current, end_value.into_int_value(), "forcond")
            .expect("build compare");
        self.builder
            .build_conditional_branch(keep_going, body_bb, end_bb)
            .expect("build conditional branch");

        self.builder.position_at_end(body_bb);
        let shadowed = binding
            .as_ref()
            .and_then(|name| self.slots.insert(name.clone(), (counter, counter_type.into())));
        self.compile_expr(body);
        if let Some(name) = &binding {
            match shadowed {
                Some(previous) => {
                    self.slots.insert(name.clone(), previous);
                }
                None => {
                    self.slots.remove(name);
                }
            }
        }
        self.branch_to(inc_bb);

        self.builder.position_at_end(inc_bb);
        let current = self
            .builder
            .build_load(counter, counter_name)
            .expect("build load")
            .into_int_value();
        let next = self
            .builder
            .build_int_add(current, counter_type.const_int(1, false), "fornext")
            .expect("build add");
        self.builder.build_store(counter, next).expect("build store");
        self.branch_to(cond_bb);

        self.builder.position_at_end(end_bb);
        None
    }

    // ── structs ─────────────────────────────────────────────────────

    /// Struct literals build through a temporary slot: one GEP+store
    /// per field, then a load of the aggregate.
    fn compile_struct_literal(
        &mut self,
        expr: &Expr,
        path: &[String],
        fields: &[crate::ast::FieldInit],
    ) -> Option<BasicValueEnum<'ctx>> {
        let name = &path[0];

        let Some(info) = self.structs.get(name) else {
            self.error(&expr.location, format!("Unknown struct '{name}'"));
            return None;
        };
        let struct_type = info.struct_type;
        let field_names = info.field_names.clone();

        let tmp = self.builder.build_alloca(struct_type, "structtmp").expect("build alloca");

        for field in fields {
            let Some(index) = field_names.iter().position(|n| n == &field.name) else {
                self.error(
                    &field.location,
                    format!("Struct '{}' has no field '{}'", name, field.name),
                );
                continue;
            };

            let Some(value) = self.compile_expr(&field.value) else { continue };
            let ptr = self
                .builder
                .build_struct_gep(tmp, index as u32, &field.name)
                .expect("build struct gep");
            self.builder.build_store(ptr, value).expect("build store");
        }

        Some(self.builder.build_load(tmp, "structval").expect("build load"))
    }

    /// Reading a field extracts by index from the aggregate value;
    /// the field order comes from the named struct's table entry.
    fn compile_field_access(
        &mut self,
        expr: &Expr,
        object: &Expr,
        field: &str,
    ) -> Option<BasicValueEnum<'ctx>> {
        let value = self.compile_expr(object)?;
        if !value.is_struct_value() {
            self.error(&expr.location, format!("Field '{field}' accessed on a non-struct value"));
            return None;
        }

        let struct_value = value.into_struct_value();
        let type_name = struct_value
            .get_type()
            .get_name()
            .map(|n| n.to_string_lossy().into_owned());

        let index = type_name
            .as_deref()
            .and_then(|n| self.structs.get(n))
            .and_then(|info| info.field_names.iter().position(|n| n == field));

        let Some(index) = index else {
            self.error(&expr.location, format!("Unknown field '{field}'"));
            return None;
        };

        Some(
            self.builder
                .build_extract_value(struct_value, index as u32, field)
                .expect("build extract value"),
        )
    }

    /// Writing a field requires the object to be a mutable slot of
    /// struct type; the write goes through a GEP into that slot.
    fn compile_field_assignment(
        &mut self,
        expr: &Expr,
        object: &Expr,
        field: &str,
        right: &Expr,
        op: BinaryOp,
    ) -> Option<BasicValueEnum<'ctx>> {
        let ExprKind::Identifier(name) = &object.kind else {
            self.error(&object.location, "Field assignment is only supported through a mutable variable");
            return None;
        };

        let Some((slot, slot_type)) = self.slots.get(name).copied() else {
            self.error(
                &object.location,
                format!("Cannot assign through '{name}': not a mutable variable"),
            );
            return None;
        };

        if !slot_type.is_struct_type() {
            self.error(&object.location, format!("'{name}' is not a struct"));
            return None;
        }
        let struct_type = slot_type.into_struct_type();

        let type_name = struct_type.get_name().map(|n| n.to_string_lossy().into_owned());
        let index = type_name
            .as_deref()
            .and_then(|n| self.structs.get(n))
            .and_then(|info| info.field_names.iter().position(|n| n == field));

        let Some(index) = index else {
            self.error(&expr.location, format!("Unknown field '{field}'"));
            return None;
        };

        let rhs = self.compile_expr(right)?;
        let ptr = self
            .builder
            .build_struct_gep(slot, index as u32, field)
            .expect("build struct gep");

        let stored = match op.compound_base() {
            None => rhs,
            Some(base) => {
                let _field_type = struct_type.get_field_type_at_index(index as u32)?;
                let current = self.builder.build_load(ptr, "cur").expect("build load");
                self.compile_binary_values(expr, base, current, rhs)?
            }
        };

        self.builder.build_store(ptr, stored).expect("build store");
        Some(stored)
    }

    // ── casts ───────────────────────────────────────────────────────

    /// Numeric `as` casts: int↔int by truncate/sign-extend, int↔float
    /// signed, float↔float by precision cast.
    fn compile_cast(
        &mut self,
        expr: &Expr,
        value: &Expr,
        target: &crate::ast::Type,
    ) -> Option<BasicValueEnum<'ctx>> {
        let lowered = self.compile_expr(value)?;
        let target_type = self.compile_type(target)?;

        if lowered.is_int_value() && target_type.is_int_type() {
            let source = lowered.into_int_value();
            let target_int = target_type.into_int_type();
            let source_width = source.get_type().get_bit_width();
            let target_width = target_int.get_bit_width();

            let cast: BasicValueEnum = if source_width == target_width {
                return Some(lowered);
            } else if source_width < target_width {
                self.builder
                    .build_int_s_extend(source, target_int, "sexttmp")
                    .expect("build sext")
                    .into()
            } else {
                self.builder
                    .build_int_truncate(source, target_int, "trunctmp")
                    .expect("build trunc")
                    .into()
            };
            return Some(cast);
        }

        if lowered.is_int_value() && target_type.is_float_type() {
            return Some(
                self.builder
                    .build_signed_int_to_float(
                        lowered.into_int_value(),
                        target_type.into_float_type(),
                        "sitofptmp",
                    )
                    .expect("build sitofp")
                    .into(),
            );
        }

        if lowered.is_float_value() && target_type.is_int_type() {
            return Some(
                self.builder
                    .build_float_to_signed_int(
                        lowered.into_float_value(),
                        target_type.into_int_type(),
                        "fptositmp",
                    )
                    .expect("build fptosi")
                    .into(),
            );
        }

        if lowered.is_float_value() && target_type.is_float_type() {
            return Some(
                self.builder
                    .build_float_cast(
                        lowered.into_float_value(),
                        target_type.into_float_type(),
                        "fpcasttmp",
                    )
                    .expect("build float cast")
                    .into(),
            );
        }

        self.error(&expr.location, "Unsupported cast");
        None
    }
}
