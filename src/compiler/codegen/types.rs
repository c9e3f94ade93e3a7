//! Apex type expressions → LLVM types, and struct item lowering.

use inkwell::types::{BasicType, BasicTypeEnum};
use inkwell::AddressSpace;

use crate::ast::{Item, StructField, Type, TypeKind};

use super::{Codegen, StructInfo};

impl<'a, 'ctx> Codegen<'a, 'ctx> {
    /// Map a primitive type name to its LLVM value type. `void` has
    /// no value type and is handled by the return-type path.
    pub(crate) fn primitive_type(&self, name: &str) -> Option<BasicTypeEnum<'ctx>> {
        let ty: BasicTypeEnum = match name {
            "bool" => self.context.bool_type().into(),
            "i8" | "u8" | "byte" => self.context.i8_type().into(),
            "i16" | "u16" => self.context.i16_type().into(),
            "i32" | "u32" => self.context.i32_type().into(),
            "i64" | "u64" => self.context.i64_type().into(),
            "i128" | "u128" => self.context.i128_type().into(),
            // Pointer-sized integers assume a 64-bit host.
            "isize" | "usize" => self.context.i64_type().into(),
            "f32" => self.context.f32_type().into(),
            "f64" => self.context.f64_type().into(),
            "char" => self.context.i32_type().into(),
            _ => return None,
        };
        Some(ty)
    }

    /// True for types that lower to no value: `void` and the unit
    /// tuple in return position.
    pub(crate) fn type_is_void(ty: &Type) -> bool {
        match &ty.kind {
            TypeKind::Primitive(name) => name == "void",
            TypeKind::Tuple(elements) => elements.is_empty(),
            _ => false,
        }
    }

    /// Lower a type expression to an LLVM value type. Types without a
    /// lowering yet report an error and return `None`.
    pub(crate) fn compile_type(&mut self, ty: &Type) -> Option<BasicTypeEnum<'ctx>> {
        match &ty.kind {
            TypeKind::Primitive(name) => {
                if name == "void" {
                    self.error(&ty.location, "'void' is only valid as a return type");
                    return None;
                }
                match self.primitive_type(name) {
                    Some(lowered) => Some(lowered),
                    None => {
                        self.error(&ty.location, format!("Unknown primitive type '{name}'"));
                        None
                    }
                }
            }

            // Pointers are opaque; references and function types
            // share their representation.
            TypeKind::Pointer { .. } | TypeKind::Reference { .. } | TypeKind::Function { .. } => {
                Some(self.context.i8_type().ptr_type(AddressSpace::default()).into())
            }

            TypeKind::Array { element, size } => {
                let element = self.compile_type(element)?;
                Some(element.array_type(*size as u32).into())
            }

            TypeKind::Slice { .. } => {
                self.error(&ty.location, "Slice types are not supported yet");
                None
            }

            TypeKind::Tuple(elements) => {
                let mut lowered = Vec::with_capacity(elements.len());
                for element in elements {
                    lowered.push(self.compile_type(element)?);
                }
                Some(self.context.struct_type(&lowered, false).into())
            }

            TypeKind::Named { path, .. } => {
                // A named type whose first segment spells a primitive
                // is that primitive.
                if path.len() == 1 {
                    if let Some(lowered) = self.primitive_type(&path[0]) {
                        return Some(lowered);
                    }
                }
                if let Some(info) = self.structs.get(&path[0]) {
                    return Some(info.struct_type.into());
                }
                self.error(&ty.location, format!("Unknown type '{}'", path.join("::")));
                None
            }

            TypeKind::Generic(name) => {
                self.error(
                    &ty.location,
                    format!("Generic type '{name}' cannot be lowered without monomorphization"),
                );
                None
            }
        }
    }

    /// Lower a struct item: fields in declaration order into a named
    /// struct type, recorded by name for later lookup.
    pub(crate) fn compile_struct(&mut self, item: &Item, fields: &[StructField]) {
        let mut field_types = Vec::with_capacity(fields.len());
        for field in fields {
            match self.compile_type(&field.ty) {
                Some(lowered) => field_types.push(lowered),
                None => return,
            }
        }

        let struct_type = self.context.opaque_struct_type(&item.name);
        struct_type.set_body(&field_types, false);

        self.structs.insert(
            item.name.clone(),
            StructInfo {
                struct_type,
                field_names: fields.iter().map(|field| field.name.clone()).collect(),
            },
        );
    }
}
