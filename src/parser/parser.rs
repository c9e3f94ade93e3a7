//! Recursive-descent parser for the Apex language.
//!
//! Single pass over the token stream, precedence climbing for
//! expressions, panic-mode recovery on syntax errors. Failed
//! productions return `None` upward — never a partial node — and the
//! callers either resynchronize or skip.
//!
//! The only non-local backtrack is the bounded speculative parse that
//! decides whether the last expression of a block is its tail value.

use crate::ast::{
    ArrayRepeat, BinaryOp, EnumVariant, Expr, ExprKind, FieldInit, FunctionParam, GenericParam,
    Item, ItemKind, MatchArm, Module, Pattern, PatternKind, Stmt, StmtKind, StructField, Type,
    TypeKind, UnaryOp, Visibility,
};
use crate::errors::Diagnostics;
use crate::lexer::token::{LiteralValue, SourceLocation, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diags: Diagnostics,
    /// Struct literals are suppressed while parsing `if`/`while`
    /// conditions, `for` iterators and `match` scrutinees, so that
    /// `if c { … }` does not parse `c { … }` as a literal. Bracketed
    /// subexpressions lift the suppression again.
    struct_literals_allowed: bool,
    /// Generic parameter names of the enclosing items; a bare named
    /// type matching one of these parses as `TypeKind::Generic`.
    generic_scopes: Vec<Vec<String>>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::EndOfFile, "", SourceLocation::default()));
        }
        Self {
            tokens,
            current: 0,
            diags: Diagnostics::new(),
            struct_literals_allowed: true,
            generic_scopes: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diags.has_errors()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    // ── token helpers ───────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    fn is_at_end(&self) -> bool {
        self.current + 1 >= self.tokens.len() || self.peek().kind == TokenKind::EndOfFile
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    /// Consume the expected token or record `message` (quoting the
    /// token actually found) and return `None`.
    fn consume(&mut self, kind: TokenKind, message: &str) -> Option<Token> {
        if self.check(kind) {
            return Some(self.advance());
        }
        self.error_expected(message);
        None
    }

    fn error_expected(&mut self, message: &str) {
        let token = self.peek().clone();
        let got = if token.kind == TokenKind::EndOfFile {
            "end of file".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        self.diags.error(token.location, format!("{message}, got {got}"));
    }

    fn error_at(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.diags.error(location, message);
    }

    /// Panic-mode recovery: discard tokens until just past a `;` or
    /// in front of the next statement/item-starting keyword.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::KwFn
                | TokenKind::KwStruct
                | TokenKind::KwEnum
                | TokenKind::KwImpl
                | TokenKind::KwTrait
                | TokenKind::KwLet
                | TokenKind::KwReturn => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn with_struct_literals<T>(&mut self, allowed: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.struct_literals_allowed, allowed);
        let result = f(self);
        self.struct_literals_allowed = saved;
        result
    }

    fn is_generic_param(&self, name: &str) -> bool {
        self.generic_scopes.iter().any(|scope| scope.iter().any(|p| p == name))
    }

    // ── module and items ────────────────────────────────────────────

    /// Entry point — parse the whole token stream into one module.
    pub fn parse_module(&mut self) -> Module {
        let location = self.peek().location.clone();
        let mut items = Vec::new();

        while !self.is_at_end() {
            match self.parse_item() {
                Some(item) => items.push(item),
                None => self.synchronize(),
            }
        }

        Module { name: "<main>".to_string(), items, location }
    }

    fn parse_visibility(&mut self) -> Visibility {
        if self.match_kind(TokenKind::KwPub) {
            return Visibility::Public;
        }
        Visibility::Private
    }

    fn parse_item(&mut self) -> Option<Item> {
        let visibility = self.parse_visibility();

        if self.match_kind(TokenKind::KwFn) {
            self.parse_function(visibility)
        } else if self.match_kind(TokenKind::KwStruct) {
            self.parse_struct(visibility)
        } else if self.match_kind(TokenKind::KwEnum) {
            self.parse_enum(visibility)
        } else if self.match_kind(TokenKind::KwTrait) {
            self.parse_trait(visibility)
        } else if self.match_kind(TokenKind::KwImpl) {
            self.parse_impl()
        } else if self.match_kind(TokenKind::KwType) {
            self.parse_type_alias(visibility)
        } else if self.match_kind(TokenKind::KwMod) {
            self.parse_module_item(visibility)
        } else if self.match_kind(TokenKind::KwImport) {
            self.parse_import()
        } else if self.match_kind(TokenKind::KwExtern) {
            self.parse_extern()
        } else {
            self.error_expected("Expected item declaration");
            None
        }
    }

    /// `fn [unsafe?] name [<generics>] (params) [-> Type] (body | ;)`
    /// The `fn` keyword has already been consumed.
    fn parse_function(&mut self, visibility: Visibility) -> Option<Item> {
        let location = self.previous().location.clone();

        let is_unsafe = self.match_kind(TokenKind::KwUnsafe);
        let name = self.consume(TokenKind::Identifier, "Expected function name")?.lexeme;

        let generic_params = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };

        self.generic_scopes.push(generic_params.iter().map(|p| p.name.clone()).collect());
        let result = self.parse_function_signature(visibility, location, name, generic_params, is_unsafe);
        self.generic_scopes.pop();
        result
    }

    fn parse_function_signature(
        &mut self,
        visibility: Visibility,
        location: SourceLocation,
        name: String,
        generic_params: Vec<GenericParam>,
        is_unsafe: bool,
    ) -> Option<Item> {
        self.consume(TokenKind::LParen, "Expected '(' after function name")?;
        let params = self.parse_function_params()?;
        self.consume(TokenKind::RParen, "Expected ')' after parameters")?;

        let return_type = if self.match_kind(TokenKind::Arrow) {
            self.parse_type()?
        } else {
            Type::new(TypeKind::Primitive("void".to_string()), self.peek().location.clone())
        };

        let body = if self.check(TokenKind::LBrace) {
            Some(self.parse_block_expr("Expected '{' to open function body")?)
        } else {
            self.consume(TokenKind::Semicolon, "Expected function body or ';'")?;
            None
        };

        Some(Item {
            kind: ItemKind::Function { params, return_type, body, is_extern: false, is_unsafe },
            visibility,
            name,
            generic_params,
            location,
        })
    }

    fn parse_function_params(&mut self) -> Option<Vec<FunctionParam>> {
        let mut params = Vec::new();

        if !self.check(TokenKind::RParen) {
            loop {
                let location = self.peek().location.clone();
                let name = self.consume(TokenKind::Identifier, "Expected parameter name")?.lexeme;
                self.consume(TokenKind::Colon, "Expected ':' after parameter name")?;
                let ty = self.parse_type()?;
                params.push(FunctionParam { name, ty, location });

                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
                // Trailing comma tolerated.
                if self.check(TokenKind::RParen) {
                    break;
                }
            }
        }

        Some(params)
    }

    fn parse_generic_params(&mut self) -> Option<Vec<GenericParam>> {
        let mut params = Vec::new();

        self.consume(TokenKind::Lt, "Expected '<'")?;

        if !self.check(TokenKind::Gt) {
            loop {
                let location = self.peek().location.clone();
                let name = self.consume(TokenKind::Identifier, "Expected generic parameter name")?.lexeme;

                let mut bounds = Vec::new();
                if self.match_kind(TokenKind::Colon) {
                    loop {
                        bounds.push(self.parse_path()?);
                        if !self.match_kind(TokenKind::Plus) {
                            break;
                        }
                    }
                }

                params.push(GenericParam { name, bounds, location });

                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::Gt) {
                    break;
                }
            }
        }

        self.consume(TokenKind::Gt, "Expected '>'")?;

        Some(params)
    }

    fn parse_struct(&mut self, visibility: Visibility) -> Option<Item> {
        let location = self.previous().location.clone();

        let name = self.consume(TokenKind::Identifier, "Expected struct name")?.lexeme;

        let generic_params = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };

        self.generic_scopes.push(generic_params.iter().map(|p| p.name.clone()).collect());
        let result = self.parse_struct_body(visibility, location, name, generic_params);
        self.generic_scopes.pop();
        result
    }

    fn parse_struct_body(
        &mut self,
        visibility: Visibility,
        location: SourceLocation,
        name: String,
        generic_params: Vec<GenericParam>,
    ) -> Option<Item> {
        self.consume(TokenKind::LBrace, "Expected '{'")?;

        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            fields.push(self.parse_struct_field()?);
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(Item {
            kind: ItemKind::Struct { fields },
            visibility,
            name,
            generic_params,
            location,
        })
    }

    fn parse_struct_field(&mut self) -> Option<StructField> {
        let location = self.peek().location.clone();
        let visibility = self.parse_visibility();
        let name = self.consume(TokenKind::Identifier, "Expected field name")?.lexeme;
        self.consume(TokenKind::Colon, "Expected ':' after field name")?;
        let ty = self.parse_type()?;
        Some(StructField { visibility, name, ty, location })
    }

    fn parse_enum(&mut self, visibility: Visibility) -> Option<Item> {
        let location = self.previous().location.clone();

        let name = self.consume(TokenKind::Identifier, "Expected enum name")?.lexeme;

        let generic_params = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };

        self.consume(TokenKind::LBrace, "Expected '{'")?;

        let mut variants = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let variant_loc = self.peek().location.clone();
            let variant_name = self.consume(TokenKind::Identifier, "Expected variant name")?.lexeme;
            variants.push(EnumVariant { name: variant_name, location: variant_loc });
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(Item {
            kind: ItemKind::Enum { variants },
            visibility,
            name,
            generic_params,
            location,
        })
    }

    fn parse_trait(&mut self, visibility: Visibility) -> Option<Item> {
        let location = self.previous().location.clone();

        let name = self.consume(TokenKind::Identifier, "Expected trait name")?.lexeme;

        self.consume(TokenKind::LBrace, "Expected '{'")?;

        let mut items = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.parse_item() {
                Some(item) => items.push(item),
                None => self.synchronize(),
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(Item {
            kind: ItemKind::Trait { items },
            visibility,
            name,
            generic_params: Vec::new(),
            location,
        })
    }

    /// `impl Type { items }` — impl blocks carry no visibility.
    fn parse_impl(&mut self) -> Option<Item> {
        let location = self.previous().location.clone();

        let target = self.parse_type()?;

        self.consume(TokenKind::LBrace, "Expected '{'")?;

        let mut items = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.parse_item() {
                Some(item) => items.push(item),
                None => self.synchronize(),
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(Item {
            kind: ItemKind::Impl { target, items },
            visibility: Visibility::Private,
            name: String::new(),
            generic_params: Vec::new(),
            location,
        })
    }

    fn parse_type_alias(&mut self, visibility: Visibility) -> Option<Item> {
        let location = self.previous().location.clone();

        let name = self.consume(TokenKind::Identifier, "Expected type alias name")?.lexeme;
        self.consume(TokenKind::Assign, "Expected '=' in type alias")?;
        let aliased = self.parse_type()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after type alias")?;

        Some(Item {
            kind: ItemKind::TypeAlias { aliased },
            visibility,
            name,
            generic_params: Vec::new(),
            location,
        })
    }

    fn parse_module_item(&mut self, visibility: Visibility) -> Option<Item> {
        let location = self.previous().location.clone();

        let name = self.consume(TokenKind::Identifier, "Expected module name")?.lexeme;

        if self.match_kind(TokenKind::Semicolon) {
            return Some(Item {
                kind: ItemKind::Module { items: Vec::new(), is_external: true },
                visibility,
                name,
                generic_params: Vec::new(),
                location,
            });
        }

        self.consume(TokenKind::LBrace, "Expected '{'")?;

        let mut items = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.parse_item() {
                Some(item) => items.push(item),
                None => self.synchronize(),
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(Item {
            kind: ItemKind::Module { items, is_external: false },
            visibility,
            name,
            generic_params: Vec::new(),
            location,
        })
    }

    fn parse_import(&mut self) -> Option<Item> {
        let location = self.previous().location.clone();

        let path = self.parse_path()?;

        let alias = if self.match_kind(TokenKind::KwAs) {
            Some(self.consume(TokenKind::Identifier, "Expected alias name")?.lexeme)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expected ';' after import")?;

        let name = path.last().cloned().unwrap_or_default();
        Some(Item {
            kind: ItemKind::Import { path, alias },
            visibility: Visibility::Private,
            name,
            generic_params: Vec::new(),
            location,
        })
    }

    /// `extern { item }` wraps exactly one item; a wrapped function is
    /// marked `is_extern`.
    fn parse_extern(&mut self) -> Option<Item> {
        self.consume(TokenKind::LBrace, "Expected '{'")?;

        let mut item = self.parse_item()?;
        if let ItemKind::Function { is_extern, .. } = &mut item.kind {
            *is_extern = true;
        }

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(item)
    }

    fn parse_path(&mut self) -> Option<Vec<String>> {
        let mut path = Vec::new();

        path.push(self.consume(TokenKind::Identifier, "Expected identifier")?.lexeme);

        while self.match_kind(TokenKind::ColonColon) {
            path.push(self.consume(TokenKind::Identifier, "Expected identifier after '::'")?.lexeme);
        }

        Some(path)
    }

    // ── statements ──────────────────────────────────────────────────

    fn is_item_start(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::KwFn
                | TokenKind::KwStruct
                | TokenKind::KwEnum
                | TokenKind::KwTrait
                | TokenKind::KwImpl
                | TokenKind::KwType
                | TokenKind::KwMod
                | TokenKind::KwImport
                | TokenKind::KwExtern
                | TokenKind::KwPub
        )
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        if self.match_kind(TokenKind::KwLet) {
            return self.parse_let_statement();
        }

        if self.is_item_start() {
            let location = self.peek().location.clone();
            let item = self.parse_item()?;
            return Some(Stmt::new(StmtKind::Item(Box::new(item)), location));
        }

        let expr = self.parse_expression()?;
        let location = expr.location.clone();
        let has_semicolon = self.match_kind(TokenKind::Semicolon);
        Some(Stmt::new(StmtKind::Expr { expr, has_semicolon }, location))
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        let location = self.previous().location.clone();

        let pattern = self.parse_pattern()?;

        let ty = if self.match_kind(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let initializer = if self.match_kind(TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expected ';' after let statement")?;

        Some(Stmt::new(StmtKind::Let { pattern, ty, initializer }, location))
    }

    // ── expressions ─────────────────────────────────────────────────

    pub fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_assignment()
    }

    /// Level 1 — right-associative assignment operators.
    fn parse_assignment(&mut self) -> Option<Expr> {
        let expr = self.parse_range()?;

        if self.match_kinds(&[
            TokenKind::Assign,
            TokenKind::PlusEq,
            TokenKind::MinusEq,
            TokenKind::StarEq,
            TokenKind::SlashEq,
            TokenKind::PercentEq,
            TokenKind::AmpEq,
            TokenKind::PipeEq,
            TokenKind::CaretEq,
            TokenKind::ShlEq,
            TokenKind::ShrEq,
        ]) {
            let op_token = self.previous().clone();
            let right = self.parse_assignment()?;

            let op = match op_token.kind {
                TokenKind::Assign => BinaryOp::Assign,
                TokenKind::PlusEq => BinaryOp::AddAssign,
                TokenKind::MinusEq => BinaryOp::SubAssign,
                TokenKind::StarEq => BinaryOp::MulAssign,
                TokenKind::SlashEq => BinaryOp::DivAssign,
                TokenKind::PercentEq => BinaryOp::ModAssign,
                TokenKind::AmpEq => BinaryOp::AndAssign,
                TokenKind::PipeEq => BinaryOp::OrAssign,
                TokenKind::CaretEq => BinaryOp::XorAssign,
                TokenKind::ShlEq => BinaryOp::ShlAssign,
                TokenKind::ShrEq => BinaryOp::ShrAssign,
                _ => unreachable!("assignment operator"),
            };

            return Some(Expr::new(
                ExprKind::Binary { op, left: Box::new(expr), right: Box::new(right) },
                op_token.location,
            ));
        }

        Some(expr)
    }

    /// `start .. end` / `start ..= end`, non-associative, sitting
    /// between assignment and logical-or.
    fn parse_range(&mut self) -> Option<Expr> {
        let start = self.parse_logical_or()?;

        if self.match_kinds(&[TokenKind::DotDot, TokenKind::DotDotEq]) {
            let op_token = self.previous().clone();
            let inclusive = op_token.kind == TokenKind::DotDotEq;
            let end = self.parse_logical_or()?;

            return Some(Expr::new(
                ExprKind::Range { start: Box::new(start), end: Box::new(end), inclusive },
                op_token.location,
            ));
        }

        Some(start)
    }

    /// One left-associative binary level over `next`.
    fn binary_level(
        &mut self,
        ops: &[(TokenKind, BinaryOp)],
        next: fn(&mut Parser) -> Option<Expr>,
    ) -> Option<Expr> {
        let mut expr = next(self)?;

        'level: loop {
            for &(kind, op) in ops {
                if self.check(kind) {
                    let op_token = self.advance();
                    let right = next(self)?;
                    expr = Expr::new(
                        ExprKind::Binary { op, left: Box::new(expr), right: Box::new(right) },
                        op_token.location,
                    );
                    continue 'level;
                }
            }
            break;
        }

        Some(expr)
    }

    fn parse_logical_or(&mut self) -> Option<Expr> {
        self.binary_level(&[(TokenKind::OrOr, BinaryOp::Or)], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Option<Expr> {
        self.binary_level(&[(TokenKind::AndAnd, BinaryOp::And)], Self::parse_bitwise_or)
    }

    fn parse_bitwise_or(&mut self) -> Option<Expr> {
        self.binary_level(&[(TokenKind::Pipe, BinaryOp::BitOr)], Self::parse_bitwise_xor)
    }

    fn parse_bitwise_xor(&mut self) -> Option<Expr> {
        self.binary_level(&[(TokenKind::Caret, BinaryOp::BitXor)], Self::parse_bitwise_and)
    }

    fn parse_bitwise_and(&mut self) -> Option<Expr> {
        self.binary_level(&[(TokenKind::Amp, BinaryOp::BitAnd)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        self.binary_level(
            &[(TokenKind::EqEq, BinaryOp::Eq), (TokenKind::NotEq, BinaryOp::Ne)],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Option<Expr> {
        self.binary_level(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::Le, BinaryOp::Le),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::Ge, BinaryOp::Ge),
            ],
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        self.binary_level(
            &[(TokenKind::Shl, BinaryOp::Shl), (TokenKind::Shr, BinaryOp::Shr)],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Option<Expr> {
        self.binary_level(
            &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Option<Expr> {
        self.binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    /// Level 12 — right-associative prefix operators.
    fn parse_unary(&mut self) -> Option<Expr> {
        if self.match_kinds(&[
            TokenKind::Minus,
            TokenKind::Bang,
            TokenKind::Tilde,
            TokenKind::Star,
            TokenKind::Amp,
        ]) {
            let op_token = self.previous().clone();

            let op = match op_token.kind {
                TokenKind::Minus => UnaryOp::Neg,
                TokenKind::Bang => UnaryOp::Not,
                TokenKind::Tilde => UnaryOp::BitNot,
                TokenKind::Star => UnaryOp::Deref,
                TokenKind::Amp => {
                    if self.match_kind(TokenKind::KwMut) {
                        UnaryOp::AddrOfMut
                    } else {
                        UnaryOp::AddrOf
                    }
                }
                _ => unreachable!("unary operator"),
            };

            let operand = self.parse_unary()?;
            return Some(Expr::new(
                ExprKind::Unary { op, operand: Box::new(operand) },
                op_token.location,
            ));
        }

        self.parse_postfix()
    }

    /// Level 13 — call, index, field access, `as` cast.
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.match_kind(TokenKind::LParen) {
                let location = self.previous().location.clone();
                let mut arguments = Vec::new();

                if !self.check(TokenKind::RParen) {
                    loop {
                        let arg = self.with_struct_literals(true, Self::parse_expression)?;
                        arguments.push(arg);
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                        if self.check(TokenKind::RParen) {
                            break;
                        }
                    }
                }

                self.consume(TokenKind::RParen, "Expected ')' after arguments")?;
                expr = Expr::new(
                    ExprKind::Call { callee: Box::new(expr), arguments },
                    location,
                );
            } else if self.match_kind(TokenKind::LBracket) {
                let location = self.previous().location.clone();
                let index = self.with_struct_literals(true, Self::parse_expression)?;
                self.consume(TokenKind::RBracket, "Expected ']' after index")?;
                expr = Expr::new(
                    ExprKind::Index { base: Box::new(expr), index: Box::new(index) },
                    location,
                );
            } else if self.match_kind(TokenKind::Dot) {
                let location = self.previous().location.clone();
                let field = self.consume(TokenKind::Identifier, "Expected field name")?.lexeme;
                expr = Expr::new(
                    ExprKind::FieldAccess { object: Box::new(expr), field },
                    location,
                );
            } else if self.match_kind(TokenKind::KwAs) {
                let location = self.previous().location.clone();
                let target = self.parse_type()?;
                expr = Expr::new(
                    ExprKind::Cast { value: Box::new(expr), target },
                    location,
                );
            } else {
                break;
            }
        }

        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::IntegerLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::CharLiteral => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(token.value), token.location))
            }

            TokenKind::KwTrue => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Some(LiteralValue::Bool(true))), token.location))
            }

            TokenKind::KwFalse => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Some(LiteralValue::Bool(false))), token.location))
            }

            TokenKind::KwNull => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(None), token.location))
            }

            TokenKind::Identifier => {
                let path = self.parse_path()?;

                if self.struct_literals_allowed && self.check(TokenKind::LBrace) {
                    return self.parse_struct_literal(path, token.location);
                }

                Some(Expr::new(ExprKind::Identifier(path[0].clone()), token.location))
            }

            TokenKind::LParen => {
                self.advance();

                if self.match_kind(TokenKind::RParen) {
                    // Unit value ().
                    return Some(Expr::new(ExprKind::Tuple(Vec::new()), token.location));
                }

                let first = self.with_struct_literals(true, Self::parse_expression)?;

                if self.match_kind(TokenKind::Comma) {
                    let mut elements = vec![first];

                    if !self.check(TokenKind::RParen) {
                        loop {
                            let element = self.with_struct_literals(true, Self::parse_expression)?;
                            elements.push(element);
                            if !self.match_kind(TokenKind::Comma) {
                                break;
                            }
                            if self.check(TokenKind::RParen) {
                                break;
                            }
                        }
                    }

                    self.consume(TokenKind::RParen, "Expected ')' after tuple")?;
                    return Some(Expr::new(ExprKind::Tuple(elements), token.location));
                }

                self.consume(TokenKind::RParen, "Expected ')' after expression")?;
                Some(first)
            }

            TokenKind::LBracket => {
                self.advance();
                self.parse_array_literal(token.location)
            }

            TokenKind::LBrace => self.parse_block_expr("Expected '{'"),

            TokenKind::KwIf => {
                self.advance();
                self.parse_if_expr(token.location)
            }

            TokenKind::KwMatch => {
                self.advance();
                self.parse_match_expr(token.location)
            }

            TokenKind::KwWhile => {
                self.advance();
                self.parse_while_expr(token.location)
            }

            TokenKind::KwFor => {
                self.advance();
                self.parse_for_expr(token.location)
            }

            TokenKind::KwReturn => {
                self.advance();
                let value = if matches!(
                    self.peek().kind,
                    TokenKind::Semicolon
                        | TokenKind::RBrace
                        | TokenKind::RParen
                        | TokenKind::Comma
                        | TokenKind::EndOfFile
                ) {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                Some(Expr::new(ExprKind::Return(value), token.location))
            }

            TokenKind::KwBreak => {
                self.advance();
                Some(Expr::new(ExprKind::Break, token.location))
            }

            TokenKind::KwContinue => {
                self.advance();
                Some(Expr::new(ExprKind::Continue, token.location))
            }

            _ => {
                self.error_expected("Expected expression");
                None
            }
        }
    }

    /// `{ stmt* tail? }` — consumes the opening brace itself.
    ///
    /// Tail detection is the parser's one bounded speculation: when
    /// the next token could start an expression, try parsing one; if
    /// `}` follows it is the tail, otherwise rewind (dropping any
    /// speculative errors) and reparse as a statement.
    fn parse_block_expr(&mut self, open_message: &str) -> Option<Expr> {
        let open = self.consume(TokenKind::LBrace, open_message)?;
        let location = open.location;

        let mut stmts = Vec::new();
        let mut tail = None;

        let saved_allowed = std::mem::replace(&mut self.struct_literals_allowed, true);

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if !self.check(TokenKind::KwLet) && !self.check(TokenKind::Semicolon) {
                let saved_pos = self.current;
                let saved_errors = self.diags.error_count();

                if let Some(expr) = self.parse_expression() {
                    if self.check(TokenKind::RBrace) {
                        tail = Some(Box::new(expr));
                        break;
                    }
                }

                self.current = saved_pos;
                self.diags.truncate_errors(saved_errors);
            }

            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
        }

        self.struct_literals_allowed = saved_allowed;

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(Expr::new(ExprKind::Block { stmts, tail }, location))
    }

    fn parse_if_expr(&mut self, location: SourceLocation) -> Option<Expr> {
        let condition = self.with_struct_literals(false, Self::parse_expression)?;

        let then_branch = self.parse_block_expr("Expected '{' after if condition")?;

        let else_branch = if self.match_kind(TokenKind::KwElse) {
            if self.check(TokenKind::KwIf) {
                let else_if = self.advance();
                Some(Box::new(self.parse_if_expr(else_if.location)?))
            } else {
                Some(Box::new(self.parse_block_expr("Expected '{' after else")?))
            }
        } else {
            None
        };

        Some(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            location,
        ))
    }

    fn parse_match_expr(&mut self, location: SourceLocation) -> Option<Expr> {
        let scrutinee = self.with_struct_literals(false, Self::parse_expression)?;

        self.consume(TokenKind::LBrace, "Expected '{' after match expression")?;

        let arms = self.with_struct_literals(true, |parser| {
            let mut arms = Vec::new();

            while !parser.check(TokenKind::RBrace) && !parser.is_at_end() {
                let arm_location = parser.peek().location.clone();
                let pattern = parser.parse_pattern()?;

                let guard = if parser.match_kind(TokenKind::KwIf) {
                    Some(parser.parse_expression()?)
                } else {
                    None
                };

                parser.consume(TokenKind::FatArrow, "Expected '=>' after pattern")?;
                let body = parser.parse_expression()?;

                arms.push(MatchArm { pattern, guard, body, location: arm_location });

                if !parser.match_kind(TokenKind::Comma) {
                    break;
                }
            }

            Some(arms)
        })?;

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(Expr::new(
            ExprKind::Match { scrutinee: Box::new(scrutinee), arms },
            location,
        ))
    }

    fn parse_while_expr(&mut self, location: SourceLocation) -> Option<Expr> {
        let condition = self.with_struct_literals(false, Self::parse_expression)?;
        let body = self.parse_block_expr("Expected '{' after while condition")?;

        Some(Expr::new(
            ExprKind::While { condition: Box::new(condition), body: Box::new(body) },
            location,
        ))
    }

    fn parse_for_expr(&mut self, location: SourceLocation) -> Option<Expr> {
        let pattern = self.parse_pattern()?;
        self.consume(TokenKind::KwIn, "Expected 'in' after for pattern")?;
        let iterator = self.with_struct_literals(false, Self::parse_expression)?;
        let body = self.parse_block_expr("Expected '{' after for iterator")?;

        Some(Expr::new(
            ExprKind::For { pattern, iterator: Box::new(iterator), body: Box::new(body) },
            location,
        ))
    }

    fn parse_struct_literal(&mut self, path: Vec<String>, location: SourceLocation) -> Option<Expr> {
        self.consume(TokenKind::LBrace, "Expected '{'")?;

        let mut fields = Vec::new();

        if !self.check(TokenKind::RBrace) {
            loop {
                let field_location = self.peek().location.clone();
                let name = self.consume(TokenKind::Identifier, "Expected field name")?.lexeme;
                self.consume(TokenKind::Colon, "Expected ':' after field name")?;
                let value = self.with_struct_literals(true, Self::parse_expression)?;
                fields.push(FieldInit { name, value, location: field_location });

                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RBrace) {
                    break;
                }
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}'")?;

        Some(Expr::new(ExprKind::StructLiteral { path, fields }, location))
    }

    /// `[a, b, c]` or `[value; count]`; the `[` is already consumed.
    fn parse_array_literal(&mut self, location: SourceLocation) -> Option<Expr> {
        if self.match_kind(TokenKind::RBracket) {
            return Some(Expr::new(
                ExprKind::ArrayLiteral { elements: Vec::new(), repeat: None },
                location,
            ));
        }

        let first = self.with_struct_literals(true, Self::parse_expression)?;

        if self.match_kind(TokenKind::Semicolon) {
            let count = self.with_struct_literals(true, Self::parse_expression)?;
            self.consume(TokenKind::RBracket, "Expected ']'")?;
            return Some(Expr::new(
                ExprKind::ArrayLiteral {
                    elements: Vec::new(),
                    repeat: Some(ArrayRepeat { value: Box::new(first), count: Box::new(count) }),
                },
                location,
            ));
        }

        let mut elements = vec![first];
        while self.match_kind(TokenKind::Comma) {
            if self.check(TokenKind::RBracket) {
                break;
            }
            let element = self.with_struct_literals(true, Self::parse_expression)?;
            elements.push(element);
        }

        self.consume(TokenKind::RBracket, "Expected ']'")?;

        Some(Expr::new(ExprKind::ArrayLiteral { elements, repeat: None }, location))
    }

    // ── patterns ────────────────────────────────────────────────────

    fn parse_pattern(&mut self) -> Option<Pattern> {
        let first = self.parse_pattern_primary()?;

        if self.check(TokenKind::Pipe) {
            let location = first.location.clone();
            let mut alternatives = vec![first];

            while self.match_kind(TokenKind::Pipe) {
                alternatives.push(self.parse_pattern_primary()?);
            }

            return Some(Pattern::new(PatternKind::Or(alternatives), location));
        }

        Some(first)
    }

    fn parse_pattern_primary(&mut self) -> Option<Pattern> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::KwMut => {
                self.advance();
                let name = self.consume(TokenKind::Identifier, "Expected identifier after 'mut'")?.lexeme;
                Some(Pattern::new(
                    PatternKind::Identifier { name, is_mutable: true },
                    token.location,
                ))
            }

            TokenKind::Identifier => {
                self.advance();

                if token.lexeme == "_" {
                    return Some(Pattern::new(PatternKind::Wildcard, token.location));
                }

                // Path pattern: enum variant, optionally with a tuple
                // payload.
                if self.check(TokenKind::ColonColon) {
                    let mut path = vec![token.lexeme.clone()];
                    while self.match_kind(TokenKind::ColonColon) {
                        path.push(
                            self.consume(TokenKind::Identifier, "Expected identifier after '::'")?.lexeme,
                        );
                    }

                    let mut args = Vec::new();
                    if self.match_kind(TokenKind::LParen) {
                        if !self.check(TokenKind::RParen) {
                            loop {
                                args.push(self.parse_pattern()?);
                                if !self.match_kind(TokenKind::Comma) {
                                    break;
                                }
                            }
                        }
                        self.consume(TokenKind::RParen, "Expected ')'")?;
                    }

                    return Some(Pattern::new(PatternKind::Enum { path, args }, token.location));
                }

                // Struct pattern: `Point { x: px, y }`.
                if self.check(TokenKind::LBrace) {
                    self.advance();

                    let mut fields = Vec::new();
                    while !self.check(TokenKind::RBrace) && !self.is_at_end() {
                        let field_token =
                            self.consume(TokenKind::Identifier, "Expected field name")?;
                        let pattern = if self.match_kind(TokenKind::Colon) {
                            self.parse_pattern()?
                        } else {
                            Pattern::new(
                                PatternKind::Identifier {
                                    name: field_token.lexeme.clone(),
                                    is_mutable: false,
                                },
                                field_token.location.clone(),
                            )
                        };
                        fields.push((field_token.lexeme, pattern));

                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                    }

                    self.consume(TokenKind::RBrace, "Expected '}'")?;

                    return Some(Pattern::new(
                        PatternKind::Struct { path: vec![token.lexeme], fields },
                        token.location,
                    ));
                }

                Some(Pattern::new(
                    PatternKind::Identifier { name: token.lexeme, is_mutable: false },
                    token.location,
                ))
            }

            TokenKind::IntegerLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::CharLiteral
            | TokenKind::KwTrue
            | TokenKind::KwFalse => {
                self.advance();

                let value = match token.kind {
                    TokenKind::KwTrue => LiteralValue::Bool(true),
                    TokenKind::KwFalse => LiteralValue::Bool(false),
                    _ => token.value.clone().unwrap_or(LiteralValue::Int(0)),
                };
                let start = Pattern::new(PatternKind::Literal(value), token.location.clone());

                if self.match_kinds(&[TokenKind::DotDot, TokenKind::DotDotEq]) {
                    let inclusive = self.previous().kind == TokenKind::DotDotEq;
                    let end = self.parse_pattern_primary()?;
                    return Some(Pattern::new(
                        PatternKind::Range {
                            start: Box::new(start),
                            end: Box::new(end),
                            inclusive,
                        },
                        token.location,
                    ));
                }

                Some(start)
            }

            TokenKind::LParen => {
                self.advance();

                let mut patterns = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        patterns.push(self.parse_pattern()?);
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                        if self.check(TokenKind::RParen) {
                            break;
                        }
                    }
                }

                self.consume(TokenKind::RParen, "Expected ')'")?;
                Some(Pattern::new(PatternKind::Tuple(patterns), token.location))
            }

            _ => {
                self.error_expected("Expected pattern");
                None
            }
        }
    }

    // ── types ───────────────────────────────────────────────────────

    pub fn parse_type(&mut self) -> Option<Type> {
        let token = self.peek().clone();

        match token.kind {
            // Pointer type: *T or *mut T
            TokenKind::Star => {
                self.advance();
                let is_mutable = self.match_kind(TokenKind::KwMut);
                let pointee = self.parse_type()?;
                Some(Type::new(
                    TypeKind::Pointer { is_mutable, pointee: Box::new(pointee) },
                    token.location,
                ))
            }

            // Reference type: &T or &mut T
            TokenKind::Amp => {
                self.advance();
                let is_mutable = self.match_kind(TokenKind::KwMut);
                let referent = self.parse_type()?;
                Some(Type::new(
                    TypeKind::Reference { is_mutable, referent: Box::new(referent) },
                    token.location,
                ))
            }

            // Slice [T] or array [T; N]
            TokenKind::LBracket => {
                self.advance();
                let element = self.parse_type()?;

                if self.match_kind(TokenKind::Semicolon) {
                    let size_token =
                        self.consume(TokenKind::IntegerLiteral, "Expected array size")?;
                    let size = match size_token.value {
                        Some(LiteralValue::Int(v)) if v >= 0 => v as u64,
                        Some(LiteralValue::Uint(v)) => v,
                        _ => {
                            self.error_at(size_token.location, "Invalid array size");
                            0
                        }
                    };
                    self.consume(TokenKind::RBracket, "Expected ']'")?;
                    return Some(Type::new(
                        TypeKind::Array { element: Box::new(element), size },
                        token.location,
                    ));
                }

                self.consume(TokenKind::RBracket, "Expected ']'")?;
                Some(Type::new(TypeKind::Slice { element: Box::new(element) }, token.location))
            }

            // Tuple type: (T1, T2, ...)
            TokenKind::LParen => {
                self.advance();

                let mut types = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        types.push(self.parse_type()?);
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                        if self.check(TokenKind::RParen) {
                            break;
                        }
                    }
                }

                self.consume(TokenKind::RParen, "Expected ')'")?;
                Some(Type::new(TypeKind::Tuple(types), token.location))
            }

            // Function type: fn(T1, T2) -> R
            TokenKind::KwFn => {
                self.advance();
                self.consume(TokenKind::LParen, "Expected '('")?;

                let mut params = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        params.push(self.parse_type()?);
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                        if self.check(TokenKind::RParen) {
                            break;
                        }
                    }
                }

                self.consume(TokenKind::RParen, "Expected ')'")?;

                let return_type = if self.match_kind(TokenKind::Arrow) {
                    Some(Box::new(self.parse_type()?))
                } else {
                    None
                };

                Some(Type::new(TypeKind::Function { params, return_type }, token.location))
            }

            // Named type: user path or generic parameter.
            TokenKind::Identifier => {
                let path = self.parse_path()?;

                let mut generic_args = Vec::new();
                if self.match_kind(TokenKind::Lt) {
                    if !self.check(TokenKind::Gt) {
                        loop {
                            generic_args.push(self.parse_type()?);
                            if !self.match_kind(TokenKind::Comma) {
                                break;
                            }
                            if self.check(TokenKind::Gt) {
                                break;
                            }
                        }
                    }
                    self.consume(TokenKind::Gt, "Expected '>'")?;
                }

                if path.len() == 1 && generic_args.is_empty() && self.is_generic_param(&path[0]) {
                    return Some(Type::new(TypeKind::Generic(path.into_iter().next()?), token.location));
                }

                Some(Type::new(TypeKind::Named { path, generic_args }, token.location))
            }

            // Primitive keyword.
            kind if kind.is_primitive_keyword() => {
                self.advance();
                Some(Type::new(TypeKind::Primitive(token.lexeme), token.location))
            }

            _ => {
                self.error_expected("Expected type");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_source(source: &str) -> (Module, usize) {
        let tokens = Lexer::new(source, "test.apex").tokenize_all();
        let mut parser = Parser::new(tokens);
        let module = parser.parse_module();
        (module, parser.diagnostics().error_count())
    }

    fn parse_ok(source: &str) -> Module {
        let (module, errors) = parse_source(source);
        assert_eq!(errors, 0, "unexpected parse errors in {source:?}");
        module
    }

    fn only_function_body(module: &Module) -> (&Vec<Stmt>, &Option<Box<Expr>>) {
        let Some(Item { kind: ItemKind::Function { body: Some(body), .. }, .. }) = module.items.first()
        else {
            panic!("expected a function item with a body");
        };
        let ExprKind::Block { stmts, tail } = &body.kind else {
            panic!("function body must be a block");
        };
        (stmts, tail)
    }

    #[test]
    fn empty_source_is_empty_module() {
        let module = parse_ok("");
        assert!(module.items.is_empty());
    }

    #[test]
    fn identity_function_shape() {
        let module = parse_ok("fn id(x: i32) -> i32 { x }");
        assert_eq!(module.items.len(), 1);

        let item = &module.items[0];
        assert_eq!(item.name, "id");
        let ItemKind::Function { params, body: Some(body), .. } = &item.kind else {
            panic!("expected function");
        };
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "x");

        let ExprKind::Block { stmts, tail } = &body.kind else { panic!("expected block") };
        assert!(stmts.is_empty());
        let Some(tail) = tail else { panic!("expected tail expression") };
        assert!(matches!(&tail.kind, ExprKind::Identifier(name) if name == "x"));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let module = parse_ok("fn f() -> i32 { 1 + 2 * 3 }");
        let (_, tail) = only_function_body(&module);
        let ExprKind::Binary { op: BinaryOp::Add, right, .. } = &tail.as_ref().unwrap().kind else {
            panic!("expected addition at the top");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn shift_binds_looser_than_addition() {
        let module = parse_ok("fn f() -> i32 { 1 + 2 << 3 }");
        let (_, tail) = only_function_body(&module);
        let ExprKind::Binary { op: BinaryOp::Shl, left, .. } = &tail.as_ref().unwrap().kind else {
            panic!("expected shift at the top");
        };
        assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let module = parse_ok("fn f() { a = b = 1; }");
        let (stmts, _) = only_function_body(&module);
        let StmtKind::Expr { expr, has_semicolon: true } = &stmts[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary { op: BinaryOp::Assign, right, .. } = &expr.kind else {
            panic!("expected assignment");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Assign, .. }));
    }

    #[test]
    fn block_with_tail_versus_statement() {
        // `{ 1 }` has a tail; `{ 1; }` has a trailing expression
        // statement and no tail.
        let module = parse_ok("fn f() -> i32 { 1 }");
        let (stmts, tail) = only_function_body(&module);
        assert!(stmts.is_empty());
        assert!(tail.is_some());

        let module = parse_ok("fn f() { 1; }");
        let (stmts, tail) = only_function_body(&module);
        assert_eq!(stmts.len(), 1);
        assert!(tail.is_none());
        assert!(matches!(stmts[0].kind, StmtKind::Expr { has_semicolon: true, .. }));
    }

    #[test]
    fn if_condition_is_not_a_struct_literal() {
        let module = parse_ok("fn sel(c: bool, a: i32, b: i32) -> i32 { if c { a } else { b } }");
        let (_, tail) = only_function_body(&module);
        let ExprKind::If { condition, else_branch, .. } = &tail.as_ref().unwrap().kind else {
            panic!("expected if expression");
        };
        assert!(matches!(&condition.kind, ExprKind::Identifier(name) if name == "c"));
        assert!(else_branch.is_some());
    }

    #[test]
    fn else_if_chains() {
        let module = parse_ok("fn f(a: bool, b: bool) -> i32 { if a { 1 } else if b { 2 } else { 3 } }");
        let (_, tail) = only_function_body(&module);
        let ExprKind::If { else_branch: Some(else_branch), .. } = &tail.as_ref().unwrap().kind else {
            panic!("expected if");
        };
        assert!(matches!(else_branch.kind, ExprKind::If { .. }));
    }

    #[test]
    fn struct_literal_in_let_initializer() {
        let module = parse_ok("fn f() { let p = Point { x: 1, y: 2 }; }");
        let (stmts, _) = only_function_body(&module);
        let StmtKind::Let { initializer: Some(init), .. } = &stmts[0].kind else {
            panic!("expected let with initializer");
        };
        let ExprKind::StructLiteral { path, fields } = &init.kind else {
            panic!("expected struct literal");
        };
        assert_eq!(path, &["Point".to_string()]);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn let_mut_pattern_records_mutability() {
        let module = parse_ok("fn f(x: i32) { let mut y = x; }");
        let (stmts, _) = only_function_body(&module);
        let StmtKind::Let { pattern, .. } = &stmts[0].kind else { panic!("expected let") };
        assert!(matches!(
            &pattern.kind,
            PatternKind::Identifier { name, is_mutable: true } if name == "y"
        ));
    }

    #[test]
    fn for_loop_over_range() {
        let module = parse_ok("fn sum(n: i32) -> i32 { let mut s = 0; for i in 0..n { s = s + i; } s }");
        let (stmts, tail) = only_function_body(&module);
        assert!(tail.is_some());

        let StmtKind::Expr { expr, .. } = &stmts[1].kind else { panic!("expected for statement") };
        let ExprKind::For { pattern, iterator, .. } = &expr.kind else { panic!("expected for") };
        assert!(matches!(&pattern.kind, PatternKind::Identifier { name, .. } if name == "i"));
        assert!(matches!(&iterator.kind, ExprKind::Range { inclusive: false, .. }));
    }

    #[test]
    fn inclusive_range_expression() {
        let module = parse_ok("fn f() { let r = 1..=10; }");
        let (stmts, _) = only_function_body(&module);
        let StmtKind::Let { initializer: Some(init), .. } = &stmts[0].kind else {
            panic!("expected let");
        };
        assert!(matches!(init.kind, ExprKind::Range { inclusive: true, .. }));
    }

    #[test]
    fn match_with_guard_and_pattern_forms() {
        let module = parse_ok(
            "fn f(x: i32) -> i32 {\n\
             \x20   match x {\n\
             \x20       0 => 1,\n\
             \x20       1 | 2 => 2,\n\
             \x20       3..=9 => 3,\n\
             \x20       n if n > 100 => 4,\n\
             \x20       _ => 5,\n\
             \x20   }\n\
             }",
        );
        let (_, tail) = only_function_body(&module);
        let ExprKind::Match { arms, .. } = &tail.as_ref().unwrap().kind else {
            panic!("expected match");
        };
        assert_eq!(arms.len(), 5);
        assert!(matches!(arms[0].pattern.kind, PatternKind::Literal(_)));
        assert!(matches!(arms[1].pattern.kind, PatternKind::Or(_)));
        assert!(matches!(arms[2].pattern.kind, PatternKind::Range { inclusive: true, .. }));
        assert!(arms[3].guard.is_some());
        assert!(matches!(arms[4].pattern.kind, PatternKind::Wildcard));
    }

    #[test]
    fn enum_and_struct_patterns() {
        let module = parse_ok(
            "fn f(x: i32) -> i32 { match x { Color::Red => 1, Shape::Circle(r) => 2, Point { x: px, y } => 3, _ => 0 } }",
        );
        let (_, tail) = only_function_body(&module);
        let ExprKind::Match { arms, .. } = &tail.as_ref().unwrap().kind else {
            panic!("expected match");
        };
        assert!(matches!(&arms[0].pattern.kind, PatternKind::Enum { path, args } if path.len() == 2 && args.is_empty()));
        assert!(matches!(&arms[1].pattern.kind, PatternKind::Enum { args, .. } if args.len() == 1));
        assert!(matches!(&arms[2].pattern.kind, PatternKind::Struct { fields, .. } if fields.len() == 2));
    }

    #[test]
    fn unary_operators_including_mutable_borrow() {
        let module = parse_ok("fn f(x: i32) { -x; !x; ~x; *x; &x; &mut x; }");
        let (stmts, _) = only_function_body(&module);
        let ops: Vec<UnaryOp> = stmts
            .iter()
            .map(|s| {
                let StmtKind::Expr { expr, .. } = &s.kind else { panic!("expected expr stmt") };
                let ExprKind::Unary { op, .. } = &expr.kind else { panic!("expected unary") };
                *op
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                UnaryOp::Neg,
                UnaryOp::Not,
                UnaryOp::BitNot,
                UnaryOp::Deref,
                UnaryOp::AddrOf,
                UnaryOp::AddrOfMut,
            ],
        );
    }

    #[test]
    fn postfix_chain_call_index_field_cast() {
        let module = parse_ok("fn f() { g(1, 2)[0].field as i64; }");
        let (stmts, _) = only_function_body(&module);
        let StmtKind::Expr { expr, .. } = &stmts[0].kind else { panic!("expected expr") };
        let ExprKind::Cast { value, .. } = &expr.kind else { panic!("expected cast") };
        let ExprKind::FieldAccess { object, field } = &value.kind else { panic!("expected field") };
        assert_eq!(field, "field");
        let ExprKind::Index { base, .. } = &object.kind else { panic!("expected index") };
        assert!(matches!(base.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn unit_and_tuple_expressions() {
        let module = parse_ok("fn f() { (); (1,); (1, 2, 3); }");
        let (stmts, _) = only_function_body(&module);
        let kinds: Vec<usize> = stmts
            .iter()
            .map(|s| {
                let StmtKind::Expr { expr, .. } = &s.kind else { panic!() };
                let ExprKind::Tuple(elements) = &expr.kind else { panic!("expected tuple") };
                elements.len()
            })
            .collect();
        assert_eq!(kinds, vec![0, 1, 3]);
    }

    #[test]
    fn array_literals_and_repeat_form() {
        let module = parse_ok("fn f() { [1, 2, 3]; [0; 8]; []; }");
        let (stmts, _) = only_function_body(&module);

        let StmtKind::Expr { expr, .. } = &stmts[0].kind else { panic!() };
        assert!(matches!(&expr.kind, ExprKind::ArrayLiteral { elements, repeat: None } if elements.len() == 3));

        let StmtKind::Expr { expr, .. } = &stmts[1].kind else { panic!() };
        assert!(matches!(&expr.kind, ExprKind::ArrayLiteral { repeat: Some(_), .. }));

        let StmtKind::Expr { expr, .. } = &stmts[2].kind else { panic!() };
        assert!(matches!(&expr.kind, ExprKind::ArrayLiteral { elements, repeat: None } if elements.is_empty()));
    }

    #[test]
    fn type_grammar_forms() {
        let module = parse_ok(
            "fn f(a: *mut u8, b: &[i32], c: [i32; 4], d: (i32, bool), e: fn(i32) -> i32, g: vec::Vec<i32>) { }",
        );
        let ItemKind::Function { params, .. } = &module.items[0].kind else { panic!() };

        assert!(matches!(&params[0].ty.kind, TypeKind::Pointer { is_mutable: true, .. }));
        let TypeKind::Reference { referent, .. } = &params[1].ty.kind else { panic!() };
        assert!(matches!(referent.kind, TypeKind::Slice { .. }));
        assert!(matches!(&params[2].ty.kind, TypeKind::Array { size: 4, .. }));
        assert!(matches!(&params[3].ty.kind, TypeKind::Tuple(types) if types.len() == 2));
        assert!(matches!(&params[4].ty.kind, TypeKind::Function { params, return_type: Some(_) } if params.len() == 1));
        assert!(matches!(
            &params[5].ty.kind,
            TypeKind::Named { path, generic_args } if path.len() == 2 && generic_args.len() == 1
        ));
    }

    #[test]
    fn generic_parameter_becomes_generic_type() {
        let module = parse_ok("fn first<T: Clone>(x: T) -> T { x }");
        let ItemKind::Function { params, return_type, .. } = &module.items[0].kind else {
            panic!()
        };
        assert!(matches!(&params[0].ty.kind, TypeKind::Generic(name) if name == "T"));
        assert!(matches!(&return_type.kind, TypeKind::Generic(name) if name == "T"));
        assert_eq!(module.items[0].generic_params[0].bounds.len(), 1);
    }

    #[test]
    fn struct_enum_trait_impl_items() {
        let module = parse_ok(
            "pub struct Point { pub x: i32, y: i32 }\n\
             enum Color { Red, Green, Blue }\n\
             trait Show { fn show(v: i32) -> i32; }\n\
             impl Point { fn get(p: i32) -> i32 { p } }\n\
             type Alias = i32;\n\
             mod helpers { fn h() { } }\n\
             import std::io as io;",
        );
        assert_eq!(module.items.len(), 7);
        assert_eq!(module.items[0].visibility, Visibility::Public);

        let ItemKind::Struct { fields } = &module.items[0].kind else { panic!() };
        assert_eq!(fields[0].visibility, Visibility::Public);
        assert_eq!(fields[1].visibility, Visibility::Private);

        let ItemKind::Enum { variants } = &module.items[1].kind else { panic!() };
        assert_eq!(variants.len(), 3);

        let ItemKind::Trait { items } = &module.items[2].kind else { panic!() };
        let ItemKind::Function { body, .. } = &items[0].kind else { panic!() };
        assert!(body.is_none());

        assert!(matches!(&module.items[3].kind, ItemKind::Impl { items, .. } if items.len() == 1));
        assert!(matches!(&module.items[4].kind, ItemKind::TypeAlias { .. }));
        assert!(matches!(&module.items[5].kind, ItemKind::Module { is_external: false, .. }));
        assert!(matches!(
            &module.items[6].kind,
            ItemKind::Import { path, alias: Some(alias) } if path.len() == 2 && alias == "io"
        ));
    }

    #[test]
    fn extern_block_marks_function() {
        let module = parse_ok("extern { fn write(fd: i32, len: i32) -> i32; }");
        let ItemKind::Function { is_extern, body, .. } = &module.items[0].kind else { panic!() };
        assert!(*is_extern);
        assert!(body.is_none());
    }

    #[test]
    fn trailing_commas_tolerated() {
        parse_ok("fn f(a: i32, b: i32,) { g(1, 2,); }");
    }

    #[test]
    fn nested_item_statement() {
        let module = parse_ok("fn f() { struct Inner { a: i32 } }");
        let (stmts, _) = only_function_body(&module);
        assert!(matches!(stmts[0].kind, StmtKind::Item(_)));
    }

    #[test]
    fn recovery_continues_after_bad_item() {
        let (module, errors) = parse_source("fn f(x i32) { } fn g() { }");
        assert!(errors > 0);
        assert!(module.items.iter().any(|item| item.name == "g"));
    }

    #[test]
    fn errors_carry_received_token() {
        let (_, errors) = parse_source("fn f( {");
        assert!(errors > 0);
        let tokens = Lexer::new("fn f( {", "test.apex").tokenize_all();
        let mut parser = Parser::new(tokens);
        parser.parse_module();
        let rendered = parser.diagnostics().errors()[0].to_string();
        assert!(rendered.contains("got '{'"), "{rendered}");
    }

    #[test]
    fn bodyless_function_requires_semicolon() {
        let module = parse_ok("fn declared(x: i32) -> i32;");
        let ItemKind::Function { body, .. } = &module.items[0].kind else { panic!() };
        assert!(body.is_none());
    }

    #[test]
    fn while_and_control_flow_expressions() {
        let module = parse_ok("fn f(n: i32) { while n < 10 { if n == 5 { break; } continue; } return; }");
        let (stmts, _) = only_function_body(&module);
        let StmtKind::Expr { expr, .. } = &stmts[0].kind else { panic!() };
        assert!(matches!(expr.kind, ExprKind::While { .. }));
        let StmtKind::Expr { expr, .. } = &stmts[1].kind else { panic!() };
        assert!(matches!(expr.kind, ExprKind::Return(None)));
    }
}
