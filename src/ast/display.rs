//! Indented tree view of a parsed program, for the `ast` subcommand.

use super::{Condition, Expr, StatementList, Stmt};
use crate::span::Spanned;

/// Render the program as an indented node tree.
pub fn format_ast(root: &StatementList) -> String {
    let mut out = String::new();
    write_stmt_list(&mut out, root, 0);
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_stmt_list(out: &mut String, list: &StatementList, depth: usize) {
    indent(out, depth);
    out.push_str("StatementList:\n");
    for stmt in &list.stmts {
        write_stmt(out, stmt, depth + 1);
    }
}

fn write_stmt(out: &mut String, stmt: &Spanned<Stmt>, depth: usize) {
    match &stmt.node {
        Stmt::Declaration { ty, name, init } => {
            indent(out, depth);
            match init {
                Some(expr) => {
                    out.push_str(&format!("Declaration: {} {} =\n", ty, name.node));
                    write_expr(out, expr, depth + 1);
                }
                None => out.push_str(&format!("Declaration: {} {}\n", ty, name.node)),
            }
        }
        Stmt::Assignment { name, value } => {
            indent(out, depth);
            out.push_str(&format!("Assignment: {} =\n", name.node));
            write_expr(out, value, depth + 1);
        }
        Stmt::Increment { name, op } => {
            indent(out, depth);
            out.push_str(&format!("Increment: {}{}\n", name.node, op.as_str()));
        }
        Stmt::If {
            cond,
            then_body,
            else_body,
        } => {
            indent(out, depth);
            out.push_str("IfStatement:\n");
            indent(out, depth + 1);
            out.push_str("Condition:\n");
            write_condition(out, cond, depth + 2);
            indent(out, depth + 1);
            out.push_str("Then:\n");
            write_stmt(out, then_body, depth + 2);
            if let Some(else_body) = else_body {
                indent(out, depth + 1);
                out.push_str("Else:\n");
                write_stmt(out, else_body, depth + 2);
            }
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            indent(out, depth);
            out.push_str("ForStatement:\n");
            indent(out, depth + 1);
            out.push_str("Init:\n");
            write_stmt(out, init, depth + 2);
            indent(out, depth + 1);
            out.push_str("Condition:\n");
            write_condition(out, cond, depth + 2);
            indent(out, depth + 1);
            out.push_str("Step:\n");
            write_stmt(out, step, depth + 2);
            indent(out, depth + 1);
            out.push_str("Body:\n");
            write_stmt(out, body, depth + 2);
        }
        Stmt::Block(list) => {
            indent(out, depth);
            out.push_str("Block:\n");
            write_stmt_list(out, list, depth + 1);
        }
    }
}

fn write_condition(out: &mut String, cond: &Condition, depth: usize) {
    indent(out, depth);
    out.push_str(&format!("Compare: {}\n", cond.op));
    write_expr(out, &cond.lhs, depth + 1);
    write_expr(out, &cond.rhs, depth + 1);
}

fn write_expr(out: &mut String, expr: &Spanned<Expr>, depth: usize) {
    match &expr.node {
        Expr::Number(v) => {
            indent(out, depth);
            out.push_str(&format!("Number: {}\n", crate::tac::format_number(*v)));
        }
        Expr::Ident(name) => {
            indent(out, depth);
            out.push_str(&format!("Identifier: {}\n", name));
        }
        Expr::Binary { op, lhs, rhs } => {
            indent(out, depth);
            out.push_str(&format!("BinaryOp: {}\n", op));
            write_expr(out, lhs, depth + 1);
            write_expr(out, rhs, depth + 1);
        }
        Expr::Unary { op, expr } => {
            indent(out, depth);
            out.push_str(&format!("UnaryOp: {}\n", op));
            write_expr(out, expr, depth + 1);
        }
    }
}
