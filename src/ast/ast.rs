//! Abstract syntax tree for the Apex language.
//!
//! Every node kind is a tagged variant (`TypeKind`, `ExprKind`,
//! `StmtKind`, `PatternKind`, `ItemKind`) wrapped in a struct that
//! carries the node's source location. The tree is built once by the
//! parser, then borrowed read-only by the resolver and the lowerer.

use crate::lexer::token::{LiteralValue, SourceLocation};

// ═══════════════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    /// `i32`, `bool`, `void`, `f64`, `char`, `byte`, …
    Primitive(String),
    /// `*T` / `*mut T`
    Pointer { is_mutable: bool, pointee: Box<Type> },
    /// `&T` / `&mut T`
    Reference { is_mutable: bool, referent: Box<Type> },
    /// `[T; N]`
    Array { element: Box<Type>, size: u64 },
    /// `[T]`
    Slice { element: Box<Type> },
    /// `(T1, T2, …)` — the empty tuple is the unit type
    Tuple(Vec<Type>),
    /// `fn(T1, T2) -> R`
    Function { params: Vec<Type>, return_type: Option<Box<Type>> },
    /// `MyStruct`, `vec::Vec<i32>`, …
    Named { path: Vec<String>, generic_args: Vec<Type> },
    /// An in-scope generic parameter used as a type.
    Generic(String),
}

impl Type {
    pub fn new(kind: TypeKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Expressions
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
}

impl BinaryOp {
    /// True for `=` and the ten compound-assignment operators.
    pub fn is_assignment(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Assign
                | AddAssign
                | SubAssign
                | MulAssign
                | DivAssign
                | ModAssign
                | AndAssign
                | OrAssign
                | XorAssign
                | ShlAssign
                | ShrAssign
        )
    }

    /// The arithmetic/bitwise operation a compound assignment applies
    /// before storing, e.g. `AddAssign → Add`. `None` for plain `=`
    /// and non-assignment operators.
    pub fn compound_base(self) -> Option<BinaryOp> {
        use BinaryOp::*;
        let base = match self {
            AddAssign => Add,
            SubAssign => Sub,
            MulAssign => Mul,
            DivAssign => Div,
            ModAssign => Mod,
            AndAssign => BitAnd,
            OrAssign => BitOr,
            XorAssign => BitXor,
            ShlAssign => Shl,
            ShrAssign => Shr,
            _ => return None,
        };
        Some(base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Deref,
    AddrOf,
    AddrOfMut,
}

/// `name: value` inside a struct literal.
#[derive(Debug, Clone)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
    pub location: SourceLocation,
}

/// One `pattern [if guard] => body` arm of a `match`.
#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
    pub location: SourceLocation,
}

/// `[value; count]` repeat form of an array literal.
#[derive(Debug, Clone)]
pub struct ArrayRepeat {
    pub value: Box<Expr>,
    pub count: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
    /// Explicit annotation slot; filled by future type checking.
    pub type_annotation: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Self { kind, location, type_annotation: None }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Decoded literal; `None` is the `null` keyword.
    Literal(Option<LiteralValue>),
    Identifier(String),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Call { callee: Box<Expr>, arguments: Vec<Expr> },
    Index { base: Box<Expr>, index: Box<Expr> },
    FieldAccess { object: Box<Expr>, field: String },
    Cast { value: Box<Expr>, target: Type },
    StructLiteral { path: Vec<String>, fields: Vec<FieldInit> },
    ArrayLiteral { elements: Vec<Expr>, repeat: Option<ArrayRepeat> },
    Tuple(Vec<Expr>),
    /// `{ stmts; tail }` — the tail expression (no trailing `;`)
    /// provides the block's value.
    Block { stmts: Vec<Stmt>, tail: Option<Box<Expr>> },
    If { condition: Box<Expr>, then_branch: Box<Expr>, else_branch: Option<Box<Expr>> },
    Match { scrutinee: Box<Expr>, arms: Vec<MatchArm> },
    Range { start: Box<Expr>, end: Box<Expr>, inclusive: bool },
    Return(Option<Box<Expr>>),
    While { condition: Box<Expr>, body: Box<Expr> },
    For { pattern: Pattern, iterator: Box<Expr>, body: Box<Expr> },
    Break,
    Continue,
}

// ═══════════════════════════════════════════════════════════════════
// Patterns
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub location: SourceLocation,
}

impl Pattern {
    pub fn new(kind: PatternKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    /// `_`
    Wildcard,
    /// `x` / `mut x`
    Identifier { name: String, is_mutable: bool },
    Literal(LiteralValue),
    Tuple(Vec<Pattern>),
    /// `Point { x: px, y }`
    Struct { path: Vec<String>, fields: Vec<(String, Pattern)> },
    /// `Color::Red`, `Shape::Circle(r)`
    Enum { path: Vec<String>, args: Vec<Pattern> },
    /// `1..5`, `'a'..='z'`
    Range { start: Box<Pattern>, end: Box<Pattern>, inclusive: bool },
    /// `a | b | c`
    Or(Vec<Pattern>),
}

// ═══════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: SourceLocation,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Let { pattern: Pattern, ty: Option<Type>, initializer: Option<Expr> },
    /// `has_semicolon` decides whether the value is discarded; a
    /// trailing expression without `;` becomes the block tail instead
    /// and never appears as a statement.
    Expr { expr: Expr, has_semicolon: bool },
    Item(Box<Item>),
}

// ═══════════════════════════════════════════════════════════════════
// Items
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

#[derive(Debug, Clone)]
pub struct FunctionParam {
    pub name: String,
    pub ty: Type,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub visibility: Visibility,
    pub name: String,
    pub ty: Type,
    pub location: SourceLocation,
}

/// Enum variants are bare names; tuple and struct payloads are future
/// work in the grammar.
#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct GenericParam {
    pub name: String,
    /// Trait bounds as paths: `T: Clone + iter::Iterator`.
    pub bounds: Vec<Vec<String>>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub visibility: Visibility,
    pub name: String,
    pub generic_params: Vec<GenericParam>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    Function {
        params: Vec<FunctionParam>,
        return_type: Type,
        /// `None` for bodyless declarations (`fn f();`, extern items).
        body: Option<Expr>,
        is_extern: bool,
        is_unsafe: bool,
    },
    Struct {
        fields: Vec<StructField>,
    },
    Enum {
        variants: Vec<EnumVariant>,
    },
    Trait {
        items: Vec<Item>,
    },
    Impl {
        target: Type,
        items: Vec<Item>,
    },
    TypeAlias {
        aliased: Type,
    },
    Module {
        items: Vec<Item>,
        /// `mod name;` without a body.
        is_external: bool,
    },
    Import {
        path: Vec<String>,
        alias: Option<String>,
    },
}

/// One compilation unit: the items of a single source file.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub items: Vec<Item>,
    pub location: SourceLocation,
}
