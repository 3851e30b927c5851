//! Semantic analysis: scoped symbol resolution over the AST.
//!
//! One error per compilation: the walk aborts on the first failure. Code
//! generation runs only after this pass succeeds.

use std::collections::HashMap;

use crate::ast::{Condition, Expr, StatementList, Stmt};
use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};

/// A declared variable. The declared type is recorded as written but does
/// not drive checking beyond storage.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub ty: String,
}

/// Stack of nested scopes, innermost last. The global frame is never popped.
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Insert into the current scope. Fails if the current scope already
    /// holds a symbol with the same name; shadowing an outer scope is fine.
    pub fn add_symbol(&mut self, symbol: Symbol, span: Span) -> Result<(), SemanticError> {
        let top = self.scopes.last_mut().unwrap();
        if top.contains_key(&symbol.name) {
            return Err(SemanticError::new(
                format!("Variable '{}' already declared in this scope.", symbol.name),
                span,
            ));
        }
        top.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Search from the innermost scope to the outermost.
    pub fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

/// A semantic error: message plus the source span it is anchored to.
#[derive(Clone, Debug)]
pub struct SemanticError {
    pub message: String,
    pub span: Span,
}

impl SemanticError {
    pub fn new(message: String, span: Span) -> Self {
        Self { message, span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.message.clone(), self.span)
    }
}

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Semantic Error: {}", self.message)
    }
}

impl std::error::Error for SemanticError {}

/// Check declarations and uses over the whole program, populating and
/// discarding scopes along the way.
pub fn check(root: &StatementList) -> Result<(), SemanticError> {
    let mut checker = Checker {
        symbols: SymbolTable::new(),
    };
    checker.check_stmt_list(root)
}

struct Checker {
    symbols: SymbolTable,
}

impl Checker {
    fn check_stmt_list(&mut self, list: &StatementList) -> Result<(), SemanticError> {
        for stmt in &list.stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<(), SemanticError> {
        match &stmt.node {
            Stmt::Declaration { ty, name, init } => {
                // The name is in scope before its initializer is checked,
                // matching C: `int a = a;` resolves `a` to this declaration.
                self.symbols.add_symbol(
                    Symbol {
                        name: name.node.clone(),
                        ty: ty.clone(),
                    },
                    name.span,
                )?;
                if let Some(init) = init {
                    self.check_expr(init)?;
                }
                Ok(())
            }
            Stmt::Assignment { name, value } => {
                if self.symbols.lookup_symbol(&name.node).is_none() {
                    return Err(SemanticError::new(
                        format!("Undeclared variable '{}' used in assignment.", name.node),
                        name.span,
                    ));
                }
                self.check_expr(value)
            }
            // Increment targets are not resolved here; only the TAC form
            // references the name.
            Stmt::Increment { .. } => Ok(()),
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.check_condition(cond)?;
                self.check_stmt(then_body)?;
                if let Some(else_body) = else_body {
                    self.check_stmt(else_body)?;
                }
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                // One scope encloses init, condition, step, and body, so a
                // declaration in the initializer is visible to all of them.
                self.symbols.enter_scope();
                let result = self
                    .check_stmt(init)
                    .and_then(|_| self.check_condition(cond))
                    .and_then(|_| self.check_stmt(step))
                    .and_then(|_| self.check_stmt(body));
                self.symbols.exit_scope();
                result
            }
            Stmt::Block(list) => {
                self.symbols.enter_scope();
                let result = self.check_stmt_list(list);
                self.symbols.exit_scope();
                result
            }
        }
    }

    fn check_condition(&mut self, cond: &Condition) -> Result<(), SemanticError> {
        self.check_expr(&cond.lhs)?;
        self.check_expr(&cond.rhs)
    }

    fn check_expr(&mut self, expr: &Spanned<Expr>) -> Result<(), SemanticError> {
        match &expr.node {
            Expr::Number(_) => Ok(()),
            Expr::Ident(name) => {
                if self.symbols.lookup_symbol(name).is_none() {
                    return Err(SemanticError::new(
                        format!("Undeclared variable '{}' used in expression.", name),
                        expr.span,
                    ));
                }
                Ok(())
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs)?;
                self.check_expr(rhs)
            }
            Expr::Unary { expr, .. } => self.check_expr(expr),
        }
    }
}
