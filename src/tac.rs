//! Three-address code generation.
//!
//! `CodeBuffer` is the append-only sink the lowering pass writes into: it
//! owns the temporary/label counters and the indent level. `TacEmitter`
//! walks a checked AST and lowers structured control flow to the labelled,
//! jump-based linear form consumed by the x86 back end.

use crate::ast::{Condition, Expr, IncOp, StatementList, Stmt, UnOp};
use crate::span::Spanned;

const INDENT_CHAR: char = '\t';

/// Append-only TAC sink with fresh-name sources and an indent counter.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    lines: Vec<String>,
    indent_level: u32,
    temp_count: u32,
    label_count: u32,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_temp(&mut self) -> String {
        self.temp_count += 1;
        format!("t{}", self.temp_count)
    }

    pub fn new_label(&mut self) -> String {
        self.label_count += 1;
        format!("L{}", self.label_count)
    }

    /// Append one line. Labels (suffix `:`) always land at column 0; every
    /// other line is prefixed with one tab per indent level.
    pub fn emit(&mut self, instruction: &str) {
        if instruction.ends_with(':') {
            self.lines.push(instruction.to_string());
        } else {
            let mut line = String::new();
            for _ in 0..self.indent_level {
                line.push(INDENT_CHAR);
            }
            line.push_str(instruction);
            self.lines.push(line);
        }
    }

    pub fn increase_indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn decrease_indent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// The accumulated listing, one line per emitted instruction.
    pub fn get_code(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.indent_level = 0;
        self.temp_count = 0;
        self.label_count = 0;
    }
}

/// Serialize a literal for the TAC layer. Integral values print without
/// decoration (`3`, not `3.0`); non-integral values keep their fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Lowers a checked AST into a `CodeBuffer`.
pub struct TacEmitter<'a> {
    buf: &'a mut CodeBuffer,
}

impl<'a> TacEmitter<'a> {
    pub fn new(buf: &'a mut CodeBuffer) -> Self {
        Self { buf }
    }

    pub fn emit_program(&mut self, root: &StatementList) {
        self.emit_stmt_list(root);
    }

    fn emit_stmt_list(&mut self, list: &StatementList) {
        for stmt in &list.stmts {
            self.emit_stmt(stmt);
        }
    }

    fn emit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Declaration { name, init, .. } => {
                // Uninitialized declarations produce no code; the data
                // section materializes the slot later.
                if let Some(init) = init {
                    let value = self.emit_expr(init);
                    self.buf.emit(&format!("MOV {}, {}", name.node, value));
                }
            }
            Stmt::Assignment { name, value } => {
                let value = self.emit_expr(value);
                self.buf.emit(&format!("MOV {}, {}", name.node, value));
            }
            Stmt::Increment { name, op } => match op {
                IncOp::Inc => self.buf.emit(&format!("ADD {0}, {0}, 1", name.node)),
                IncOp::Dec => self.buf.emit(&format!("SUB {0}, {0}, 1", name.node)),
            },
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => self.emit_if(cond, then_body, else_body.as_deref()),
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => self.emit_for(init, cond, step, body),
            Stmt::Block(list) => self.emit_stmt_list(list),
        }
    }

    fn emit_if(
        &mut self,
        cond: &Condition,
        then_body: &Spanned<Stmt>,
        else_body: Option<&Spanned<Stmt>>,
    ) {
        let (left, op, right) = self.emit_condition(cond);
        let label_true = self.buf.new_label();
        let label_end = self.buf.new_label();

        if let Some(else_body) = else_body {
            let label_false = self.buf.new_label();
            self.buf
                .emit(&format!("IF {} {} {} GOTO {}", left, op, right, label_true));
            self.buf.emit(&format!("GOTO {}", label_false));
            self.buf.emit(&format!("{}:", label_true));

            self.buf.increase_indent();
            self.emit_stmt(then_body);
            self.buf.decrease_indent();

            self.buf.emit(&format!("GOTO {}", label_end));
            self.buf.emit(&format!("{}:", label_false));

            self.buf.increase_indent();
            self.emit_stmt(else_body);
            self.buf.decrease_indent();
        } else {
            self.buf
                .emit(&format!("IF {} {} {} GOTO {}", left, op, right, label_true));
            self.buf.emit(&format!("GOTO {}", label_end));
            self.buf.emit(&format!("{}:", label_true));

            self.buf.increase_indent();
            self.emit_stmt(then_body);
            self.buf.decrease_indent();
        }
        self.buf.emit(&format!("{}:", label_end));
    }

    fn emit_for(
        &mut self,
        init: &Spanned<Stmt>,
        cond: &Condition,
        step: &Spanned<Stmt>,
        body: &Spanned<Stmt>,
    ) {
        self.emit_stmt(init);

        let label_start = self.buf.new_label();
        let label_body = self.buf.new_label();
        let label_end = self.buf.new_label();

        self.buf.emit(&format!("{}:", label_start));
        let (left, op, right) = self.emit_condition(cond);
        self.buf
            .emit(&format!("IF {} {} {} GOTO {}", left, op, right, label_body));
        self.buf.emit(&format!("GOTO {}", label_end));

        self.buf.emit(&format!("{}:", label_body));

        self.buf.increase_indent();
        self.emit_stmt(body);
        self.emit_stmt(step);
        self.buf.decrease_indent();

        self.buf.emit(&format!("GOTO {}", label_start));
        self.buf.emit(&format!("{}:", label_end));
    }

    /// Lower both condition operands; the comparison itself stays symbolic
    /// until the IF instruction is formed.
    fn emit_condition(&mut self, cond: &Condition) -> (String, &'static str, String) {
        let left = self.emit_expr(&cond.lhs);
        let right = self.emit_expr(&cond.rhs);
        (left, cond.op.as_str(), right)
    }

    /// Lower an expression and return the operand naming its value: a fresh
    /// temporary, a literal-holding temporary, or a variable name.
    fn emit_expr(&mut self, expr: &Spanned<Expr>) -> String {
        match &expr.node {
            Expr::Number(value) => {
                let temp = self.buf.new_temp();
                self.buf
                    .emit(&format!("{} = {}", temp, format_number(*value)));
                temp
            }
            // Variables are referenced directly, no temporary needed.
            Expr::Ident(name) => name.clone(),
            Expr::Binary { op, lhs, rhs } => {
                let left = self.emit_expr(lhs);
                let right = self.emit_expr(rhs);
                let temp = self.buf.new_temp();
                self.buf
                    .emit(&format!("{} = {} {} {}", temp, left, op.as_str(), right));
                temp
            }
            Expr::Unary { op, expr } => {
                let value = self.emit_expr(expr);
                let temp = self.buf.new_temp();
                self.buf.emit(&format!(
                    "{} = {} {}",
                    temp,
                    match op {
                        UnOp::Neg => "-",
                    },
                    value
                ));
                temp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn lower(source: &str) -> String {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        let program = Parser::new(tokens).parse_program().unwrap();
        crate::sema::check(&program).unwrap();
        let mut buf = CodeBuffer::new();
        TacEmitter::new(&mut buf).emit_program(&program);
        buf.get_code()
    }

    #[test]
    fn test_fresh_names_are_monotonic() {
        let mut buf = CodeBuffer::new();
        assert_eq!(buf.new_temp(), "t1");
        assert_eq!(buf.new_temp(), "t2");
        assert_eq!(buf.new_label(), "L1");
        assert_eq!(buf.new_label(), "L2");
        assert_eq!(buf.new_temp(), "t3");
    }

    #[test]
    fn test_reset_restarts_counters() {
        let mut buf = CodeBuffer::new();
        buf.new_temp();
        buf.new_label();
        buf.increase_indent();
        buf.emit("MOV a, 1");
        buf.reset();
        assert_eq!(buf.get_code(), "");
        assert_eq!(buf.new_temp(), "t1");
        assert_eq!(buf.new_label(), "L1");
    }

    #[test]
    fn test_labels_are_never_indented() {
        let mut buf = CodeBuffer::new();
        buf.increase_indent();
        buf.increase_indent();
        buf.emit("L1:");
        buf.emit("MOV a, t1");
        assert_eq!(buf.get_code(), "L1:\n\t\tMOV a, t1\n");
    }

    #[test]
    fn test_decrease_indent_clamps_at_zero() {
        let mut buf = CodeBuffer::new();
        buf.decrease_indent();
        buf.emit("MOV a, 1");
        assert_eq!(buf.get_code(), "MOV a, 1\n");
    }

    #[test]
    fn test_simple_declaration_and_assignment() {
        let tac = lower("int a; a = 3 + 4;");
        assert_eq!(tac, "t1 = 3\nt2 = 4\nt3 = t1 + t2\nMOV a, t3\n");
    }

    #[test]
    fn test_initializer_lowers_like_assignment() {
        let tac = lower("int a = 7;");
        assert_eq!(tac, "t1 = 7\nMOV a, t1\n");
    }

    #[test]
    fn test_uninitialized_declaration_emits_nothing() {
        assert_eq!(lower("int a;"), "");
    }

    #[test]
    fn test_identifier_needs_no_temporary() {
        let tac = lower("int a; int b; b = a;");
        assert_eq!(tac, "MOV b, a\n");
    }

    #[test]
    fn test_increment_forms() {
        let tac = lower("int i; i++; i--;");
        assert_eq!(tac, "ADD i, i, 1\nSUB i, i, 1\n");
    }

    #[test]
    fn test_unary_minus() {
        let tac = lower("int a; a = -3;");
        assert_eq!(tac, "t1 = 3\nt2 = - t1\nMOV a, t2\n");
    }

    #[test]
    fn test_if_else_shape() {
        let tac = lower("int x; x = 1; if (x < 2) { x = 3; } else { x = 4; }");
        let expected = "t1 = 1\n\
                        MOV x, t1\n\
                        t2 = 2\n\
                        IF x < t2 GOTO L1\n\
                        GOTO L3\n\
                        L1:\n\
                        \tt3 = 3\n\
                        \tMOV x, t3\n\
                        GOTO L2\n\
                        L3:\n\
                        \tt4 = 4\n\
                        \tMOV x, t4\n\
                        L2:\n";
        assert_eq!(tac, expected);
    }

    #[test]
    fn test_if_without_else_shape() {
        let tac = lower("int x; if (x == 0) { x = 1; }");
        let expected = "t1 = 0\n\
                        IF x == t1 GOTO L1\n\
                        GOTO L2\n\
                        L1:\n\
                        \tt2 = 1\n\
                        \tMOV x, t2\n\
                        L2:\n";
        assert_eq!(tac, expected);
    }

    #[test]
    fn test_for_loop_shape() {
        let tac = lower("int i; for (i = 0; i < 3; i++) { i = i + 1; }");
        let expected = "t1 = 0\n\
                        MOV i, t1\n\
                        L1:\n\
                        t2 = 3\n\
                        IF i < t2 GOTO L2\n\
                        GOTO L3\n\
                        L2:\n\
                        \tt3 = 1\n\
                        \tt4 = i + t3\n\
                        \tMOV i, t4\n\
                        \tADD i, i, 1\n\
                        GOTO L1\n\
                        L3:\n";
        assert_eq!(tac, expected);
    }

    #[test]
    fn test_nested_control_flow_indent() {
        let tac = lower(
            "int i; int j; int v; for (i = 0; i < 2; i++) { for (j = 0; j < 2; j++) { v = v + j; } }",
        );
        // The inner loop body sits two levels deep.
        assert!(tac.contains("\n\t\tt5 = v + j\n"));
        // Labels stay at column 0 regardless of nesting.
        for line in tac.lines() {
            if line.ends_with(':') {
                assert!(!line.starts_with('\t'), "indented label: {:?}", line);
            }
        }
    }

    #[test]
    fn test_float_literal_keeps_fraction() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(3.5), "3.5");
        assert_eq!(format_number(-2.0), "-2");
    }

    #[test]
    fn test_same_program_lowers_identically() {
        let a = lower("int x; if (x > 1) { x = 2; }");
        let b = lower("int x; if (x > 1) { x = 2; }");
        assert_eq!(a, b);
    }
}
