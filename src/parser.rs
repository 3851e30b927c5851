use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

const MAX_NESTING_DEPTH: u32 = 256;

pub struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    pub fn parse_program(mut self) -> Result<StatementList, Vec<Diagnostic>> {
        let mut stmts = Vec::new();
        while !self.at(&Lexeme::Eof) {
            let before = self.pos;
            stmts.push(self.parse_stmt());
            if self.pos == before {
                // No progress; skip the offending token to guarantee termination.
                self.advance();
            }
        }

        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(StatementList { stmts })
    }

    fn parse_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();

        if !self.enter_nesting() {
            return Spanned::new(Stmt::Block(StatementList::default()), start);
        }

        let stmt = match self.peek().clone() {
            Lexeme::Int | Lexeme::Float => {
                let decl = self.parse_declaration();
                self.expect(&Lexeme::Semicolon);
                decl
            }
            Lexeme::Ident(_) => {
                let stmt = self.parse_assignment_or_increment();
                self.expect(&Lexeme::Semicolon);
                stmt
            }
            Lexeme::If => self.parse_if(),
            Lexeme::For => self.parse_for(),
            Lexeme::LBrace => self.parse_block(),
            other => {
                self.error_at_current(&format!(
                    "expected statement, found {}",
                    other.description()
                ));
                self.advance();
                Stmt::Block(StatementList::default())
            }
        };

        self.exit_nesting();
        let span = start.merge(self.prev_span());
        Spanned::new(stmt, span)
    }

    /// `int x` or `int x = expr`, without the trailing semicolon, so the
    /// same production serves both statements and `for` initializers.
    fn parse_declaration(&mut self) -> Stmt {
        let ty = match self.advance().node {
            Lexeme::Float => "float",
            _ => "int",
        }
        .to_string();
        let name = self.expect_ident();
        let init = if self.eat(&Lexeme::Assign) {
            Some(self.parse_expr())
        } else {
            None
        };
        Stmt::Declaration { ty, name, init }
    }

    /// `x = expr`, `x++`, or `x--`, without the trailing semicolon.
    fn parse_assignment_or_increment(&mut self) -> Stmt {
        let name = self.expect_ident();
        match self.peek() {
            Lexeme::PlusPlus => {
                self.advance();
                Stmt::Increment {
                    name,
                    op: IncOp::Inc,
                }
            }
            Lexeme::MinusMinus => {
                self.advance();
                Stmt::Increment {
                    name,
                    op: IncOp::Dec,
                }
            }
            _ => {
                self.expect(&Lexeme::Assign);
                let value = self.parse_expr();
                Stmt::Assignment { name, value }
            }
        }
    }

    fn parse_if(&mut self) -> Stmt {
        self.expect(&Lexeme::If);
        self.expect(&Lexeme::LParen);
        let cond = self.parse_condition();
        self.expect(&Lexeme::RParen);
        let then_body = Box::new(self.parse_stmt());
        let else_body = if self.eat(&Lexeme::Else) {
            Some(Box::new(self.parse_stmt()))
        } else {
            None
        };
        Stmt::If {
            cond,
            then_body,
            else_body,
        }
    }

    fn parse_for(&mut self) -> Stmt {
        self.expect(&Lexeme::For);
        self.expect(&Lexeme::LParen);

        let init_start = self.current_span();
        let init = match self.peek() {
            Lexeme::Int | Lexeme::Float => self.parse_declaration(),
            _ => self.parse_assignment_or_increment(),
        };
        let init = Spanned::new(init, init_start.merge(self.prev_span()));
        self.expect(&Lexeme::Semicolon);

        let cond = self.parse_condition();
        self.expect(&Lexeme::Semicolon);

        let step_start = self.current_span();
        let step = self.parse_assignment_or_increment();
        let step = Spanned::new(step, step_start.merge(self.prev_span()));
        self.expect(&Lexeme::RParen);

        let body = Box::new(self.parse_stmt());
        Stmt::For {
            init: Box::new(init),
            cond,
            step: Box::new(step),
            body,
        }
    }

    fn parse_block(&mut self) -> Stmt {
        self.expect(&Lexeme::LBrace);
        let mut stmts = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            let before = self.pos;
            stmts.push(self.parse_stmt());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(&Lexeme::RBrace);
        Stmt::Block(StatementList { stmts })
    }

    /// Conditions are a single top-level comparison: `expr relop expr`.
    fn parse_condition(&mut self) -> Condition {
        let lhs = self.parse_expr();
        let op = self.parse_relop();
        let rhs = self.parse_expr();
        Condition { lhs, op, rhs }
    }

    fn parse_relop(&mut self) -> RelOp {
        let op = match self.peek().clone() {
            Lexeme::Lt => RelOp::Lt,
            Lexeme::Le => RelOp::Le,
            Lexeme::Gt => RelOp::Gt,
            Lexeme::Ge => RelOp::Ge,
            Lexeme::EqEq => RelOp::Eq,
            Lexeme::Ne => RelOp::Ne,
            other => {
                self.error_at_current(&format!(
                    "expected comparison operator, found {}",
                    other.description()
                ));
                return RelOp::Lt;
            }
        };
        self.advance();
        op
    }

    fn parse_expr(&mut self) -> Spanned<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Spanned<Expr> {
        let mut lhs = self.parse_primary();

        loop {
            let op = match self.peek() {
                Lexeme::Plus => BinOp::Add,
                Lexeme::Minus => BinOp::Sub,
                Lexeme::Star => BinOp::Mul,
                Lexeme::Slash => BinOp::Div,
                _ => break,
            };

            let (l_bp, r_bp) = op_binding_power(op);
            if l_bp < min_bp {
                break;
            }

            self.advance(); // consume operator
            let rhs = self.parse_expr_bp(r_bp);
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(
                Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }

        lhs
    }

    fn parse_primary(&mut self) -> Spanned<Expr> {
        let start = self.current_span();

        match self.peek().clone() {
            Lexeme::Number(n) => {
                self.advance();
                Spanned::new(Expr::Number(n), start)
            }
            Lexeme::Ident(name) => {
                self.advance();
                Spanned::new(Expr::Ident(name), start)
            }
            Lexeme::Minus => {
                self.advance();
                let operand = self.parse_primary();
                let span = start.merge(operand.span);
                Spanned::new(
                    Expr::Unary {
                        op: UnOp::Neg,
                        expr: Box::new(operand),
                    },
                    span,
                )
            }
            Lexeme::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(&Lexeme::RParen);
                inner
            }
            other => {
                self.error_at_current(&format!(
                    "expected expression, found {}",
                    other.description()
                ));
                if !self.at(&Lexeme::Eof) {
                    self.advance();
                }
                Spanned::new(Expr::Number(0.0), start)
            }
        }
    }

    fn enter_nesting(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.error_at_current("nesting depth exceeded (maximum 256 levels)");
            return false;
        }
        true
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn advance(&mut self) -> Spanned<Lexeme> {
        let tok = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> Span {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            span
        } else {
            self.error_at_current(&format!(
                "expected {}, found {}",
                token.description(),
                self.peek().description()
            ));
            self.current_span()
        }
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Spanned::new(name, span)
        } else {
            self.error_at_current(&format!(
                "expected identifier, found {}",
                self.peek().description()
            ));
            Spanned::new("_error_".to_string(), self.current_span())
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        self.diagnostics
            .push(Diagnostic::error(msg.to_string(), self.current_span()));
    }
}

/// Returns (left binding power, right binding power) for a binary operator.
/// Higher binding power = higher precedence.
fn op_binding_power(op: BinOp) -> (u8, u8) {
    match op {
        BinOp::Add | BinOp::Sub => (6, 7), // left-associative
        BinOp::Mul | BinOp::Div => (8, 9), // left-associative
    }
}
