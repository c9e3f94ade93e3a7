//! apexc — compiler driver for the Apex language.
//!
//! Usage:
//!   apexc hello.apex                 # compiles to hello.o
//!   apexc -o out.o hello.apex        # explicit output name
//!   apexc --emit-llvm hello.apex     # write textual LLVM IR
//!   apexc --emit-tokens hello.apex   # dump tokens and exit
//!   apexc --emit-ast hello.apex      # dump the AST and exit
//!
//! Pipeline:  source → Lexer → Parser → AST → Resolver → LLVM IR →
//! object file / .ll
//!
//! Exit code 0 on success or `--help`; 1 on any error. Diagnostics go
//! to stderr in source order; warnings never affect the exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser as CliParser;

use apexc::ast::{self, ExprKind, ItemKind, PatternKind, StmtKind};
use apexc::compiler::Compiler;
use apexc::errors;
use apexc::lexer::{Lexer, Token};
use apexc::parser::Parser;
use apexc::resolver::Resolver;

#[derive(CliParser, Debug)]
#[command(name = "apexc", about = "Compiler for the Apex language")]
struct Cli {
    /// Path to the source file
    input: PathBuf,

    /// Write output to <FILE> (default: input with .o or .ll)
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit textual LLVM IR instead of an object file
    #[arg(long)]
    emit_llvm: bool,

    /// Print a shallow AST dump and exit after parsing
    #[arg(long)]
    emit_ast: bool,

    /// Print the token stream and exit after lexing
    #[arg(long)]
    emit_tokens: bool,

    /// Print stage completion messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help prints on stdout and exits 0; every usage error
            // prints on stderr and exits 1.
            return if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let input_display = cli.input.display().to_string();

    if cli.verbose {
        errors::info(format!("compiling {input_display}"));
    }

    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("could not read {input_display}"))?;

    // ── Lex ─────────────────────────────────────────────────────
    let mut lexer = Lexer::new(source, &input_display);
    let tokens = lexer.tokenize_all();

    if lexer.has_errors() {
        lexer.diagnostics().print_to_stderr();
        return Ok(ExitCode::FAILURE);
    }

    if cli.emit_tokens {
        print_tokens(&tokens);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.verbose {
        errors::info(format!("lexing completed: {} tokens", tokens.len()));
    }

    // ── Parse ───────────────────────────────────────────────────
    let mut parser = Parser::new(tokens);
    let module = parser.parse_module();

    if parser.has_errors() {
        parser.diagnostics().print_to_stderr();
        return Ok(ExitCode::FAILURE);
    }

    if cli.emit_ast {
        print_ast(&module);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.verbose {
        errors::info("parsing completed");
    }

    // ── Resolve ─────────────────────────────────────────────────
    let mut resolver = Resolver::new();
    let resolved = resolver.analyze(&module);
    resolver.diagnostics().print_to_stderr();
    if !resolved {
        return Ok(ExitCode::FAILURE);
    }

    if cli.verbose {
        errors::info("semantic analysis completed");
    }

    // ── Lower ───────────────────────────────────────────────────
    let context = inkwell::context::Context::create();
    let module_name = cli.input.file_stem().and_then(|s| s.to_str()).unwrap_or("main");
    let compiler = Compiler::new(&context, module_name);

    let diags = compiler.compile(&module);
    diags.print_to_stderr();
    if diags.has_errors() {
        return Ok(ExitCode::FAILURE);
    }

    if cli.verbose {
        errors::info("code generation completed");
        compiler.dump_ir();
    }

    // ── Emit (only after verification succeeded) ────────────────
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension(if cli.emit_llvm { "ll" } else { "o" }));

    if cli.emit_llvm {
        compiler.write_ir_file(&output)?;
    } else {
        compiler.write_object_file(&output)?;
    }

    if cli.verbose {
        errors::success(format!("wrote {}", output.display()));
    }

    Ok(ExitCode::SUCCESS)
}

// ═══════════════════════════════════════════════════════════════════
// Debug dumps (--emit-tokens / --emit-ast)
// ═══════════════════════════════════════════════════════════════════

fn print_tokens(tokens: &[Token]) {
    println!("=== TOKENS ===");
    for token in tokens {
        println!(
            "{}:{} {:?} {:?}",
            token.location.line, token.location.column, token.kind, token.lexeme,
        );
    }
}

fn print_ast(module: &ast::Module) {
    println!("=== AST ===");
    println!("Module: {}", module.name);
    for item in &module.items {
        print_item(item, 1);
    }
}

fn indent(depth: usize) {
    print!("{}", "  ".repeat(depth));
}

fn print_item(item: &ast::Item, depth: usize) {
    indent(depth);
    match &item.kind {
        ItemKind::Function { body, .. } => {
            println!("Function: {}", item.name);
            if let Some(body) = body {
                print_expr(body, depth + 1);
            }
        }
        ItemKind::Struct { fields } => {
            println!("Struct: {} ({} fields)", item.name, fields.len());
        }
        ItemKind::Enum { variants } => {
            println!("Enum: {} ({} variants)", item.name, variants.len());
        }
        _ => println!("Item: {}", item.name),
    }
}

fn print_stmt(stmt: &ast::Stmt, depth: usize) {
    indent(depth);
    match &stmt.kind {
        StmtKind::Let { pattern, .. } => match &pattern.kind {
            PatternKind::Identifier { name, .. } => println!("Let: {name}"),
            _ => println!("Let"),
        },
        StmtKind::Expr { expr, .. } => {
            println!("ExprStmt");
            print_expr(expr, depth + 1);
        }
        StmtKind::Item(item) => {
            println!("ItemStmt");
            print_item(item, depth + 1);
        }
    }
}

fn print_expr(expr: &ast::Expr, depth: usize) {
    indent(depth);
    match &expr.kind {
        ExprKind::Literal(_) => println!("Literal"),
        ExprKind::Identifier(name) => println!("Identifier: {name}"),
        ExprKind::Binary { op, left, right } => {
            println!("Binary: {op:?}");
            print_expr(left, depth + 1);
            print_expr(right, depth + 1);
        }
        ExprKind::Unary { op, operand } => {
            println!("Unary: {op:?}");
            print_expr(operand, depth + 1);
        }
        ExprKind::Call { callee, arguments } => {
            println!("Call");
            print_expr(callee, depth + 1);
            for argument in arguments {
                print_expr(argument, depth + 1);
            }
        }
        ExprKind::Block { stmts, tail } => {
            println!("Block");
            for stmt in stmts {
                print_stmt(stmt, depth + 1);
            }
            if let Some(tail) = tail {
                print_expr(tail, depth + 1);
            }
        }
        ExprKind::If { condition, then_branch, else_branch } => {
            println!("If");
            print_expr(condition, depth + 1);
            print_expr(then_branch, depth + 1);
            if let Some(else_branch) = else_branch {
                print_expr(else_branch, depth + 1);
            }
        }
        ExprKind::While { condition, body } => {
            println!("While");
            print_expr(condition, depth + 1);
            print_expr(body, depth + 1);
        }
        ExprKind::For { iterator, body, .. } => {
            println!("For");
            print_expr(iterator, depth + 1);
            print_expr(body, depth + 1);
        }
        ExprKind::Return(value) => {
            println!("Return");
            if let Some(value) = value {
                print_expr(value, depth + 1);
            }
        }
        other => println!("Expr: {}", expr_kind_name(other)),
    }
}

fn expr_kind_name(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Literal(_) => "Literal",
        ExprKind::Identifier(_) => "Identifier",
        ExprKind::Binary { .. } => "Binary",
        ExprKind::Unary { .. } => "Unary",
        ExprKind::Call { .. } => "Call",
        ExprKind::Index { .. } => "Index",
        ExprKind::FieldAccess { .. } => "FieldAccess",
        ExprKind::Cast { .. } => "Cast",
        ExprKind::StructLiteral { .. } => "StructLiteral",
        ExprKind::ArrayLiteral { .. } => "ArrayLiteral",
        ExprKind::Tuple(_) => "Tuple",
        ExprKind::Block { .. } => "Block",
        ExprKind::If { .. } => "If",
        ExprKind::Match { .. } => "Match",
        ExprKind::Range { .. } => "Range",
        ExprKind::Return(_) => "Return",
        ExprKind::While { .. } => "While",
        ExprKind::For { .. } => "For",
        ExprKind::Break => "Break",
        ExprKind::Continue => "Continue",
    }
}
