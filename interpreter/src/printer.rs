use std::rc::Rc;

use losk_core::{Literal, Token};

use crate::ast::{Expr, ExprVisitor, FunctionDecl, Stmt, StmtVisitor};

/// Renders the tree in a parenthesized prefix form, e.g. `(print (+ 1 (group (* 2 3))))`.
pub(crate) struct AstPrinter;

impl AstPrinter {
    pub(crate) fn print(&mut self, stmt: &Stmt) -> String {
        self.visit_stmt(stmt)
    }

    fn parenthesize(&mut self, name: &str, exprs: &[&Expr]) -> String {
        let mut out = format!("({}", name);
        for expr in exprs {
            out.push(' ');
            out.push_str(&self.visit_expr(expr));
        }
        out.push(')');
        out
    }

    fn parenthesize_stmts(&mut self, head: String, stmts: &[Stmt]) -> String {
        let mut out = format!("({}", head);
        for stmt in stmts {
            out.push(' ');
            out.push_str(&self.visit_stmt(stmt));
        }
        out.push(')');
        out
    }

    fn function(&mut self, keyword: &str, declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect();
        let head = format!(
            "{} {} ({})",
            keyword,
            declaration.name.lexeme,
            params.join(" ")
        );
        self.parenthesize_stmts(head, &declaration.body)
    }
}

impl ExprVisitor for AstPrinter {
    type Item = String;

    fn visit_assign(&mut self, name: &Token, value: &Expr) -> String {
        self.parenthesize(&format!("= {}", name.lexeme), &[value])
    }

    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> String {
        self.parenthesize(&operator.lexeme, &[left, right])
    }

    fn visit_call(&mut self, callee: &Expr, _: &Token, args: &[Expr]) -> String {
        let mut exprs = vec![callee];
        exprs.extend(args.iter());
        self.parenthesize("call", &exprs)
    }

    fn visit_get(&mut self, object: &Expr, name: &Token) -> String {
        format!("(. {} {})", self.visit_expr(object), name.lexeme)
    }

    fn visit_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> String {
        format!(
            "(= (. {} {}) {})",
            self.visit_expr(object),
            name.lexeme,
            self.visit_expr(value)
        )
    }

    fn visit_this(&mut self, _: &Token) -> String {
        String::from("this")
    }

    fn visit_super(&mut self, _: &Token, method: &Token) -> String {
        format!("(super {})", method.lexeme)
    }

    fn visit_grouping(&mut self, expression: &Expr) -> String {
        self.parenthesize("group", &[expression])
    }

    fn visit_literal(&mut self, value: &Literal) -> String {
        match value {
            Literal::Str(val) => format!("\"{}\"", val),
            Literal::Num(val) => val.to_string(),
            Literal::Bool(val) => val.to_string(),
            Literal::Nil => String::from("nil"),
        }
    }

    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> String {
        self.parenthesize(&operator.lexeme, &[left, right])
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> String {
        self.parenthesize(&operator.lexeme, &[right])
    }

    fn visit_variable(&mut self, name: &Token) -> String {
        name.lexeme.clone()
    }
}

impl StmtVisitor for AstPrinter {
    type Item = String;

    fn visit_block(&mut self, statements: &[Stmt]) -> String {
        self.parenthesize_stmts(String::from("block"), statements)
    }

    fn visit_expression(&mut self, expression: &Expr) -> String {
        self.parenthesize(";", &[expression])
    }

    fn visit_function(&mut self, declaration: &Rc<FunctionDecl>) -> String {
        self.function("fun", declaration)
    }

    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> String {
        let mut out = format!("(class {}", name.lexeme);
        if let Some(superclass) = superclass {
            out.push_str(" < ");
            out.push_str(&self.visit_expr(superclass));
        }
        for method in methods {
            out.push(' ');
            out.push_str(&self.function("method", method));
        }
        out.push(')');
        out
    }

    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> String {
        let mut out = format!(
            "(if {} {}",
            self.visit_expr(condition),
            self.visit_stmt(then_branch)
        );
        if let Some(else_branch) = else_branch {
            out.push(' ');
            out.push_str(&self.visit_stmt(else_branch));
        }
        out.push(')');
        out
    }

    fn visit_while(&mut self, condition: &Expr, body: &Stmt) -> String {
        format!(
            "(while {} {})",
            self.visit_expr(condition),
            self.visit_stmt(body)
        )
    }

    fn visit_print(&mut self, _: &Token, expression: &Expr) -> String {
        self.parenthesize("print", &[expression])
    }

    fn visit_return(&mut self, _: &Token, value: Option<&Expr>) -> String {
        match value {
            Some(value) => self.parenthesize("return", &[value]),
            None => String::from("(return)"),
        }
    }

    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) -> String {
        let head = format!("var {}", name.lexeme);
        match init {
            Some(init) => self.parenthesize(&head, &[init]),
            None => format!("({})", head),
        }
    }
}
