//! Token and source-location types shared by the whole pipeline.

use std::fmt;
use std::rc::Rc;

/// A position in the original source buffer.
///
/// `line` and `column` are 1-indexed; `offset` is the 0-indexed byte
/// offset. The filename is reference-counted so every token and AST
/// node can carry a location without cloning the path.
#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub file: Rc<str>,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(file: Rc<str>, line: usize, column: usize, offset: usize) -> Self {
        Self { file, line, column, offset }
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self { file: Rc::from(""), line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Decoded value of a literal token.
///
/// Integers that fit `i64` decode as `Int`; larger ones as `Uint`.
/// Character literals decode as a one-character `Str`. `Bool` only
/// appears once the parser has folded `true`/`false` keywords.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // ── keywords ────────────────────────────────────────────────
    KwFn,
    KwLet,
    KwMut,
    KwConst,
    KwStatic,
    KwIf,
    KwElse,
    KwMatch,
    KwFor,
    KwWhile,
    KwLoop,
    KwBreak,
    KwContinue,
    KwReturn,
    KwStruct,
    KwEnum,
    KwImpl,
    KwTrait,
    KwType,
    KwPub,
    KwMod,
    KwModule,
    KwImport,
    KwExtern,
    KwUnsafe,
    KwDefer,
    KwAs,
    KwIn,
    KwTrue,
    KwFalse,
    KwNull,
    KwVoid,

    // ── primitive type keywords ─────────────────────────────────
    KwI8,
    KwI16,
    KwI32,
    KwI64,
    KwI128,
    KwIsize,
    KwU8,
    KwU16,
    KwU32,
    KwU64,
    KwU128,
    KwUsize,
    KwF32,
    KwF64,
    KwBool,
    KwChar,
    KwByte,

    // ── identifiers and literals ────────────────────────────────
    Identifier,
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    CharLiteral,

    // ── operators ───────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Assign,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    DotDot,
    DotDotEq,
    Arrow,
    FatArrow,
    ColonColon,
    Dot,
    Question,
    At,

    // ── punctuation ─────────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Hash,

    // ── special ─────────────────────────────────────────────────
    EndOfFile,
    Error,
}

/// A single lexed token: kind, the exact source text it matched, the
/// location of its first byte, and the decoded value for literals.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub location: SourceLocation,
    pub value: Option<LiteralValue>,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, location: SourceLocation) -> Self {
        Self { kind, lexeme: lexeme.into(), location, value: None }
    }
}

/// Re-classify a completed identifier against the fixed keyword table.
/// Case-sensitive; returns `None` for ordinary identifiers.
pub fn keyword_kind(text: &str) -> Option<TokenKind> {
    use TokenKind::*;
    let kind = match text {
        "fn" => KwFn,
        "let" => KwLet,
        "mut" => KwMut,
        "const" => KwConst,
        "static" => KwStatic,
        "if" => KwIf,
        "else" => KwElse,
        "match" => KwMatch,
        "for" => KwFor,
        "while" => KwWhile,
        "loop" => KwLoop,
        "break" => KwBreak,
        "continue" => KwContinue,
        "return" => KwReturn,
        "struct" => KwStruct,
        "enum" => KwEnum,
        "impl" => KwImpl,
        "trait" => KwTrait,
        "type" => KwType,
        "pub" => KwPub,
        "mod" => KwMod,
        "module" => KwModule,
        "import" => KwImport,
        "extern" => KwExtern,
        "unsafe" => KwUnsafe,
        "defer" => KwDefer,
        "as" => KwAs,
        "in" => KwIn,
        "true" => KwTrue,
        "false" => KwFalse,
        "null" => KwNull,
        "void" => KwVoid,
        "i8" => KwI8,
        "i16" => KwI16,
        "i32" => KwI32,
        "i64" => KwI64,
        "i128" => KwI128,
        "isize" => KwIsize,
        "u8" => KwU8,
        "u16" => KwU16,
        "u32" => KwU32,
        "u64" => KwU64,
        "u128" => KwU128,
        "usize" => KwUsize,
        "f32" => KwF32,
        "f64" => KwF64,
        "bool" => KwBool,
        "char" => KwChar,
        "byte" => KwByte,
        _ => return None,
    };
    Some(kind)
}

impl TokenKind {
    /// True for the primitive-type keywords (`i8` … `byte`, `void`).
    pub fn is_primitive_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            KwVoid
                | KwI8
                | KwI16
                | KwI32
                | KwI64
                | KwI128
                | KwIsize
                | KwU8
                | KwU16
                | KwU32
                | KwU64
                | KwU128
                | KwUsize
                | KwF32
                | KwF64
                | KwBool
                | KwChar
                | KwByte
        )
    }
}
