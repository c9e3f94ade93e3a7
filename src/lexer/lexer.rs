//! Hand-written lexer for the Apex language.
//!
//! Produces a token stream with precise source locations and decoded
//! literal values. Lexing never aborts: malformed input is recorded on
//! the internal diagnostics list and, for unrecoverable mid-token
//! malformations, an [`TokenKind::Error`] token is emitted and
//! [`Lexer::tokenize_all`] stops.

use std::rc::Rc;

use crate::errors::Diagnostics;

use super::token::{keyword_kind, LiteralValue, SourceLocation, Token, TokenKind};

pub struct Lexer {
    source: String,
    filename: Rc<str>,
    current: usize,
    line: usize,
    column: usize,
    diags: Diagnostics,
}

impl Lexer {
    pub fn new(source: impl Into<String>, filename: &str) -> Self {
        Self {
            source: source.into(),
            filename: Rc::from(filename),
            current: 0,
            line: 1,
            column: 1,
            diags: Diagnostics::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diags.has_errors()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    // ── cursor helpers ──────────────────────────────────────────────

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(Rc::clone(&self.filename), self.line, self.column, self.current)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            return 0;
        }
        self.source.as_bytes()[self.current]
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            return 0;
        }
        self.source.as_bytes()[self.current + 1]
    }

    fn advance(&mut self) -> u8 {
        if self.is_at_end() {
            return 0;
        }
        let c = self.source.as_bytes()[self.current];
        self.current += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source.as_bytes()[self.current] != expected {
            return false;
        }
        self.advance();
        true
    }

    fn add_error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.diags.error(location, message);
    }

    // ── whitespace and comments ─────────────────────────────────────

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            let c = self.peek();
            if c == b' ' || c == b'\t' || c == b'\r' || c == b'\n' {
                self.advance();
            } else if c == b'/' && self.peek_next() == b'/' {
                self.skip_line_comment();
            } else if c == b'/' && self.peek_next() == b'*' {
                self.skip_block_comment();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while self.peek() != b'\n' && !self.is_at_end() {
            self.advance();
        }
    }

    /// Block comments nest: `/* /* */ */` is one comment.
    fn skip_block_comment(&mut self) {
        let start = self.current_location();
        self.advance(); // /
        self.advance(); // *

        let mut depth = 1usize;
        while depth > 0 && !self.is_at_end() {
            if self.peek() == b'/' && self.peek_next() == b'*' {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                self.advance();
            }
        }

        if depth > 0 {
            self.add_error(start, "Unterminated block comment");
        }
    }

    // ── token constructors ──────────────────────────────────────────

    fn make_token(&self, kind: TokenKind, lexeme: &str, location: SourceLocation) -> Token {
        Token::new(kind, lexeme, location)
    }

    fn make_error_token(&mut self, location: SourceLocation, message: impl Into<String>) -> Token {
        let message = message.into();
        self.add_error(location.clone(), message.clone());
        Token::new(TokenKind::Error, message, location)
    }

    // ── character classes ───────────────────────────────────────────

    fn is_alpha(c: u8) -> bool {
        c.is_ascii_alphabetic() || c == b'_'
    }

    fn is_digit(c: u8) -> bool {
        c.is_ascii_digit()
    }

    fn is_alphanum(c: u8) -> bool {
        Self::is_alpha(c) || Self::is_digit(c)
    }

    // ── scanners ────────────────────────────────────────────────────

    /// The first identifier byte has already been consumed.
    fn scan_identifier(&mut self, start: usize, location: SourceLocation) -> Token {
        while Self::is_alphanum(self.peek()) {
            self.advance();
        }

        let text = &self.source[start..self.current];
        match keyword_kind(text) {
            Some(kind) => Token::new(kind, text, location),
            None => Token::new(TokenKind::Identifier, text, location),
        }
    }

    /// The first digit has already been consumed. Handles base
    /// prefixes, fraction, exponent and a trailing alphanumeric type
    /// suffix (kept in the lexeme, excluded from the decoded value).
    fn scan_number(&mut self, start: usize, location: SourceLocation) -> Token {
        let mut is_float = false;
        let mut radix = 10u32;

        if self.source.as_bytes()[start] == b'0' && !self.is_at_end() {
            match self.peek() {
                b'x' | b'X' => {
                    self.advance();
                    radix = 16;
                    while self.peek().is_ascii_hexdigit() {
                        self.advance();
                    }
                }
                b'b' | b'B' => {
                    self.advance();
                    radix = 2;
                    while self.peek() == b'0' || self.peek() == b'1' {
                        self.advance();
                    }
                }
                b'o' | b'O' => {
                    self.advance();
                    radix = 8;
                    while (b'0'..=b'7').contains(&self.peek()) {
                        self.advance();
                    }
                }
                _ => {}
            }
        }

        while Self::is_digit(self.peek()) {
            self.advance();
        }

        // Fraction requires a digit after the dot so that `1..10`
        // still lexes as integer, `..`, integer.
        if self.peek() == b'.' && Self::is_digit(self.peek_next()) {
            is_float = true;
            self.advance();
            while Self::is_digit(self.peek()) {
                self.advance();
            }
        }

        if self.peek() == b'e' || self.peek() == b'E' {
            is_float = true;
            self.advance();
            if self.peek() == b'+' || self.peek() == b'-' {
                self.advance();
            }
            while Self::is_digit(self.peek()) {
                self.advance();
            }
        }

        let numeric_end = self.current;

        // Type suffix (`_i32`, `f64`, …) is lexical only.
        if Self::is_alpha(self.peek()) {
            while Self::is_alphanum(self.peek()) {
                self.advance();
            }
        }

        let lexeme = self.source[start..self.current].to_string();
        let numeric = self.source[start..numeric_end].to_string();

        let (kind, value) = if is_float {
            let value = match numeric.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    self.add_error(location.clone(), format!("Invalid float literal '{numeric}'"));
                    0.0
                }
            };
            (TokenKind::FloatLiteral, LiteralValue::Float(value))
        } else {
            let digits = if radix == 10 { numeric.as_str() } else { &numeric[2..] };
            let decoded = if digits.is_empty() {
                self.add_error(location.clone(), format!("Missing digits in integer literal '{numeric}'"));
                Ok(0)
            } else {
                u64::from_str_radix(digits, radix)
            };
            let value = match decoded {
                Ok(v) if v <= i64::MAX as u64 => LiteralValue::Int(v as i64),
                Ok(v) => LiteralValue::Uint(v),
                Err(_) => {
                    self.add_error(location.clone(), format!("Invalid integer literal '{numeric}'"));
                    LiteralValue::Int(0)
                }
            };
            (TokenKind::IntegerLiteral, value)
        };

        let mut token = self.make_token(kind, &lexeme, location);
        token.value = Some(value);
        token
    }

    /// The opening `"` has already been consumed.
    fn scan_string(&mut self, start: usize, location: SourceLocation) -> Token {
        let mut value: Vec<u8> = Vec::new();

        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }

                let escape_loc = self.current_location();
                let escaped = self.advance();
                match escaped {
                    b'n' => value.push(b'\n'),
                    b'r' => value.push(b'\r'),
                    b't' => value.push(b'\t'),
                    b'\\' => value.push(b'\\'),
                    b'"' => value.push(b'"'),
                    b'0' => value.push(0),
                    other => {
                        value.push(other);
                        self.add_error(
                            escape_loc,
                            format!("Invalid escape sequence: \\{}", other as char),
                        );
                    }
                }
            } else {
                let c = self.advance();
                value.push(c);
            }
        }

        if self.is_at_end() {
            return self.make_error_token(location, "Unterminated string literal");
        }

        self.advance(); // closing "

        let lexeme = self.source[start..self.current].to_string();
        let mut token = self.make_token(TokenKind::StringLiteral, &lexeme, location);
        token.value = Some(LiteralValue::Str(String::from_utf8_lossy(&value).into_owned()));
        token
    }

    /// The opening `'` has already been consumed. Exactly one source
    /// character or one recognized escape, then a closing `'`.
    fn scan_char(&mut self, start: usize, location: SourceLocation) -> Token {
        if self.is_at_end() {
            return self.make_error_token(location, "Unterminated character literal");
        }

        let value: u8;
        if self.peek() == b'\\' {
            self.advance();
            if self.is_at_end() {
                return self.make_error_token(location, "Unterminated character literal");
            }

            let escape_loc = self.current_location();
            let escaped = self.advance();
            value = match escaped {
                b'n' => b'\n',
                b'r' => b'\r',
                b't' => b'\t',
                b'\\' => b'\\',
                b'\'' => b'\'',
                b'0' => 0,
                other => {
                    self.add_error(
                        escape_loc,
                        format!("Invalid escape sequence: \\{}", other as char),
                    );
                    other
                }
            };
        } else {
            value = self.advance();
        }

        if self.peek() != b'\'' {
            return self.make_error_token(location, "Character literal must contain exactly one character");
        }

        self.advance(); // closing '

        let lexeme = self.source[start..self.current].to_string();
        let mut token = self.make_token(TokenKind::CharLiteral, &lexeme, location);
        token.value = Some(LiteralValue::Str((value as char).to_string()));
        token
    }

    // ── entry points ────────────────────────────────────────────────

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let location = self.current_location();

        if self.is_at_end() {
            return self.make_token(TokenKind::EndOfFile, "", location);
        }

        let start = self.current;
        let c = self.advance();

        if Self::is_alpha(c) {
            return self.scan_identifier(start, location);
        }
        if Self::is_digit(c) {
            return self.scan_number(start, location);
        }

        use TokenKind::*;
        match c {
            b'(' => self.make_token(LParen, "(", location),
            b')' => self.make_token(RParen, ")", location),
            b'{' => self.make_token(LBrace, "{", location),
            b'}' => self.make_token(RBrace, "}", location),
            b'[' => self.make_token(LBracket, "[", location),
            b']' => self.make_token(RBracket, "]", location),
            b',' => self.make_token(Comma, ",", location),
            b';' => self.make_token(Semicolon, ";", location),
            b'~' => self.make_token(Tilde, "~", location),
            b'?' => self.make_token(Question, "?", location),
            b'@' => self.make_token(At, "@", location),
            b'#' => self.make_token(Hash, "#", location),

            b':' => {
                if self.match_byte(b':') {
                    self.make_token(ColonColon, "::", location)
                } else {
                    self.make_token(Colon, ":", location)
                }
            }

            b'.' => {
                if self.match_byte(b'.') {
                    if self.match_byte(b'=') {
                        self.make_token(DotDotEq, "..=", location)
                    } else {
                        self.make_token(DotDot, "..", location)
                    }
                } else {
                    self.make_token(Dot, ".", location)
                }
            }

            b'+' => {
                if self.match_byte(b'=') {
                    self.make_token(PlusEq, "+=", location)
                } else {
                    self.make_token(Plus, "+", location)
                }
            }

            b'-' => {
                if self.match_byte(b'=') {
                    self.make_token(MinusEq, "-=", location)
                } else if self.match_byte(b'>') {
                    self.make_token(Arrow, "->", location)
                } else {
                    self.make_token(Minus, "-", location)
                }
            }

            b'*' => {
                if self.match_byte(b'=') {
                    self.make_token(StarEq, "*=", location)
                } else {
                    self.make_token(Star, "*", location)
                }
            }

            b'/' => {
                if self.match_byte(b'=') {
                    self.make_token(SlashEq, "/=", location)
                } else {
                    self.make_token(Slash, "/", location)
                }
            }

            b'%' => {
                if self.match_byte(b'=') {
                    self.make_token(PercentEq, "%=", location)
                } else {
                    self.make_token(Percent, "%", location)
                }
            }

            b'&' => {
                if self.match_byte(b'&') {
                    self.make_token(AndAnd, "&&", location)
                } else if self.match_byte(b'=') {
                    self.make_token(AmpEq, "&=", location)
                } else {
                    self.make_token(Amp, "&", location)
                }
            }

            b'|' => {
                if self.match_byte(b'|') {
                    self.make_token(OrOr, "||", location)
                } else if self.match_byte(b'=') {
                    self.make_token(PipeEq, "|=", location)
                } else {
                    self.make_token(Pipe, "|", location)
                }
            }

            b'^' => {
                if self.match_byte(b'=') {
                    self.make_token(CaretEq, "^=", location)
                } else {
                    self.make_token(Caret, "^", location)
                }
            }

            b'!' => {
                if self.match_byte(b'=') {
                    self.make_token(NotEq, "!=", location)
                } else {
                    self.make_token(Bang, "!", location)
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    self.make_token(EqEq, "==", location)
                } else if self.match_byte(b'>') {
                    self.make_token(FatArrow, "=>", location)
                } else {
                    self.make_token(Assign, "=", location)
                }
            }

            b'<' => {
                if self.match_byte(b'<') {
                    if self.match_byte(b'=') {
                        self.make_token(ShlEq, "<<=", location)
                    } else {
                        self.make_token(Shl, "<<", location)
                    }
                } else if self.match_byte(b'=') {
                    self.make_token(Le, "<=", location)
                } else {
                    self.make_token(Lt, "<", location)
                }
            }

            b'>' => {
                if self.match_byte(b'>') {
                    if self.match_byte(b'=') {
                        self.make_token(ShrEq, ">>=", location)
                    } else {
                        self.make_token(Shr, ">>", location)
                    }
                } else if self.match_byte(b'=') {
                    self.make_token(Ge, ">=", location)
                } else {
                    self.make_token(Gt, ">", location)
                }
            }

            b'"' => self.scan_string(start, location),
            b'\'' => self.scan_char(start, location),

            other => {
                self.make_error_token(location, format!("Unexpected character: {}", other as char))
            }
        }
    }

    /// Lex the whole buffer. The stream ends in exactly one
    /// `EndOfFile` or, on an unrecoverable malformation, one `Error`
    /// token.
    pub fn tokenize_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let kind = token.kind;
            tokens.push(token);
            if kind == TokenKind::EndOfFile || kind == TokenKind::Error {
                break;
            }
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source, "test.apex").tokenize_all()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_lexes_to_eof() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::EndOfFile);
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("fn let mut if else match foo _bar i32 usize"),
            vec![KwFn, KwLet, KwMut, KwIf, KwElse, KwMatch, Identifier, Identifier, KwI32, KwUsize, EndOfFile],
        );
    }

    #[test]
    fn operators_use_longest_match() {
        use TokenKind::*;
        assert_eq!(
            kinds(":: .. ..= -> => == != <= >= && || << >> <<= >>= += &="),
            vec![
                ColonColon, DotDot, DotDotEq, Arrow, FatArrow, EqEq, NotEq, Le, Ge, AndAnd, OrOr,
                Shl, Shr, ShlEq, ShrEq, PlusEq, AmpEq, EndOfFile,
            ],
        );
    }

    #[test]
    fn range_between_integers_is_three_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("1..10"),
            vec![IntegerLiteral, DotDot, IntegerLiteral, EndOfFile],
        );
    }

    #[test]
    fn nested_block_comment_produces_no_tokens() {
        let tokens = lex("/* outer /* inner */ still outer */");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::EndOfFile);
    }

    #[test]
    fn unterminated_block_comment_reports_error_and_yields_eof() {
        let mut lexer = Lexer::new("/* never closed", "test.apex");
        let tokens = lexer.tokenize_all();
        assert!(lexer.has_errors());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn decodes_integer_literals() {
        let cases = [
            ("42", 42),
            ("0x1F", 31),
            ("0b1010", 10),
            ("0o17", 15),
            ("0", 0),
        ];
        for (source, expected) in cases {
            let tokens = lex(source);
            assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral, "{source}");
            assert_eq!(tokens[0].value, Some(LiteralValue::Int(expected)), "{source}");
        }
    }

    #[test]
    fn integer_suffix_stays_in_lexeme_but_not_in_value() {
        let tokens = lex("0x1F_i32");
        assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
        assert_eq!(tokens[0].lexeme, "0x1F_i32");
        assert_eq!(tokens[0].value, Some(LiteralValue::Int(31)));
    }

    #[test]
    fn decodes_float_literals() {
        let tokens = lex("3.5 1e3 2.5e-1 7f64");
        assert_eq!(tokens[0].value, Some(LiteralValue::Float(3.5)));
        assert_eq!(tokens[1].value, Some(LiteralValue::Float(1000.0)));
        assert_eq!(tokens[2].value, Some(LiteralValue::Float(0.25)));
        // No dot and no exponent: stays an integer, `f64` is a suffix.
        assert_eq!(tokens[3].kind, TokenKind::IntegerLiteral);
        assert_eq!(tokens[3].value, Some(LiteralValue::Int(7)));
    }

    #[test]
    fn huge_integer_decodes_as_unsigned() {
        let tokens = lex("18446744073709551615");
        assert_eq!(tokens[0].value, Some(LiteralValue::Uint(u64::MAX)));
    }

    #[test]
    fn invalid_binary_digit_reports_error() {
        let mut lexer = Lexer::new("0b12", "test.apex");
        let tokens = lexer.tokenize_all();
        assert!(lexer.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
    }

    #[test]
    fn decodes_string_escapes() {
        let tokens = lex(r#""a\tb\n\"q\"""#);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].value, Some(LiteralValue::Str("a\tb\n\"q\"".to_string())));
    }

    #[test]
    fn invalid_escape_keeps_character_and_reports_error() {
        let mut lexer = Lexer::new(r#""a\qb""#, "test.apex");
        let tokens = lexer.tokenize_all();
        assert!(lexer.has_errors());
        assert_eq!(tokens[0].value, Some(LiteralValue::Str("aqb".to_string())));
    }

    #[test]
    fn unterminated_string_is_error_token() {
        let mut lexer = Lexer::new("\"no end", "test.apex");
        let tokens = lexer.tokenize_all();
        assert!(lexer.has_errors());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Error);
    }

    #[test]
    fn char_literals() {
        let tokens = lex(r"'a' '\n'");
        assert_eq!(tokens[0].kind, TokenKind::CharLiteral);
        assert_eq!(tokens[0].value, Some(LiteralValue::Str("a".to_string())));
        assert_eq!(tokens[1].value, Some(LiteralValue::Str("\n".to_string())));
    }

    #[test]
    fn multi_character_char_literal_is_error() {
        let mut lexer = Lexer::new("'ab'", "test.apex");
        let tokens = lexer.tokenize_all();
        assert!(lexer.has_errors());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Error);
    }

    #[test]
    fn unexpected_character_stops_the_stream() {
        let mut lexer = Lexer::new("fn $", "test.apex");
        let tokens = lexer.tokenize_all();
        assert_eq!(tokens[0].kind, TokenKind::KwFn);
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens.len(), 2);
        assert!(lexer.has_errors());
    }

    #[test]
    fn locations_point_at_first_byte() {
        let tokens = lex("fn id\n  x");
        assert_eq!((tokens[0].location.line, tokens[0].location.column), (1, 1));
        assert_eq!((tokens[1].location.line, tokens[1].location.column), (1, 4));
        assert_eq!((tokens[2].location.line, tokens[2].location.column), (2, 3));
        assert_eq!(tokens[1].location.offset, 3);
    }

    #[test]
    fn relexing_joined_lexemes_preserves_kinds() {
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let first: Vec<TokenKind> = kinds(source);
        let joined = lex(source)
            .iter()
            .map(|t| t.lexeme.clone())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(kinds(&joined), first);
    }
}
