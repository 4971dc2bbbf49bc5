use std::collections::HashMap;
use std::rc::Rc;

use ahash::AHashMap;
use losk_core::{Literal, Token, TokenIndex};

use crate::ast::{Expr, ExprVisitor, FunctionDecl, Stmt, StmtVisitor};
use crate::callable::INITIALIZER;
use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::parser::StmtStream;

#[derive(Copy, Clone)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Copy, Clone)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Walks the whole tree once, before execution, and counts the frames between each local
/// variable use and the frame that declares it. Errors are collected and the walk always runs to
/// the end. The interpreter only receives the counts when there were no errors.
pub struct Resolver<'a> {
    // Name to "ready" flag: false between the declaration and the end of its initializer
    scopes: Vec<HashMap<String, bool>>,
    locals: AHashMap<TokenIndex, usize>,
    interpreter: &'a mut Interpreter,
    current_fun: FunctionType,
    current_cls: ClassType,
    errors: Vec<Error>,
}

/// Statements that passed resolution and can be handed to [`Interpreter::interpret`].
pub struct ResolvedStmts(pub(crate) Vec<Stmt>);

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Resolver {
            scopes: Vec::new(),
            locals: AHashMap::new(),
            interpreter,
            current_fun: FunctionType::None,
            current_cls: ClassType::None,
            errors: Vec::new(),
        }
    }

    pub fn resolve(mut self, stmts: StmtStream) -> Result<ResolvedStmts, Vec<Error>> {
        self.resolve_stmts(&stmts.0);

        if self.errors.is_empty() {
            self.interpreter.resolve(self.locals);
            Ok(ResolvedStmts(stmts.0))
        } else {
            tracing::debug!(errors = self.errors.len(), "resolve failed");
            Err(self.errors)
        }
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    fn error(&mut self, token: &Token, msg: &str) {
        self.errors.push(Error::resolver_error(token, msg));
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    // Globals are not tracked, so declaring outside of any scope is a no-op
    fn declare(&mut self, name: &Token) {
        let redeclared = match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme.clone(), false).is_some(),
            None => false,
        };

        if redeclared {
            self.error(name, "Already a variable with this name in this scope.");
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn define_keyword(&mut self, keyword: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(String::from(keyword), true);
        }
    }

    fn resolve_local(&mut self, token: &Token) {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(&token.lexeme) {
                let depth = self.scopes.len() - 1 - i;
                tracing::trace!(name = %token.lexeme, line = token.line, depth, "resolved");
                self.locals.insert(token.idx, depth);
                return;
            }
        }
    }

    fn resolve_function(&mut self, declaration: &FunctionDecl, ty: FunctionType) {
        let enclosing = self.current_fun;
        self.current_fun = ty;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&declaration.body);
        self.end_scope();

        self.current_fun = enclosing;
    }
}

impl<'a> StmtVisitor for Resolver<'a> {
    type Item = ();

    fn visit_block(&mut self, statements: &[Stmt]) {
        self.begin_scope();
        self.resolve_stmts(statements);
        self.end_scope();
    }

    fn visit_expression(&mut self, expression: &Expr) {
        self.visit_expr(expression);
    }

    fn visit_function(&mut self, declaration: &Rc<FunctionDecl>) {
        // Defined before the body is resolved so the function can call itself
        self.declare(&declaration.name);
        self.define(&declaration.name);
        self.resolve_function(declaration, FunctionType::Function);
    }

    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) {
        let enclosing = self.current_cls;
        self.current_cls = ClassType::Class;
        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: super_name } = superclass {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name, "A class can't inherit from itself.");
                }
            }

            self.current_cls = ClassType::Subclass;
            self.visit_expr(superclass);
            self.begin_scope();
            self.define_keyword("super");
        }

        self.begin_scope();
        self.define_keyword("this");
        for method in methods {
            let ty = if method.name.lexeme == INITIALIZER {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, ty);
        }
        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_cls = enclosing;
    }

    fn visit_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) {
        self.visit_expr(condition);
        self.visit_stmt(then_branch);
        if let Some(else_branch) = else_branch {
            self.visit_stmt(else_branch);
        }
    }

    fn visit_while(&mut self, condition: &Expr, body: &Stmt) {
        self.visit_expr(condition);
        self.visit_stmt(body);
    }

    fn visit_print(&mut self, _: &Token, expression: &Expr) {
        self.visit_expr(expression);
    }

    fn visit_return(&mut self, keyword: &Token, value: Option<&Expr>) {
        if let FunctionType::None = self.current_fun {
            self.error(keyword, "Can't return from top-level code.");
        }

        if let Some(value) = value {
            if let FunctionType::Initializer = self.current_fun {
                self.error(keyword, "Can't return a value from an initializer.");
            }
            self.visit_expr(value);
        }
    }

    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) {
        self.declare(name);
        if let Some(init) = init {
            self.visit_expr(init);
        }
        self.define(name);
    }
}

impl<'a> ExprVisitor for Resolver<'a> {
    type Item = ();

    fn visit_assign(&mut self, name: &Token, value: &Expr) {
        self.visit_expr(value);
        self.resolve_local(name);
    }

    fn visit_binary(&mut self, left: &Expr, _: &Token, right: &Expr) {
        self.visit_expr(left);
        self.visit_expr(right);
    }

    fn visit_call(&mut self, callee: &Expr, _: &Token, args: &[Expr]) {
        self.visit_expr(callee);
        for arg in args {
            self.visit_expr(arg);
        }
    }

    fn visit_get(&mut self, object: &Expr, _: &Token) {
        self.visit_expr(object);
    }

    fn visit_set(&mut self, object: &Expr, _: &Token, value: &Expr) {
        self.visit_expr(value);
        self.visit_expr(object);
    }

    fn visit_this(&mut self, keyword: &Token) {
        if let ClassType::None = self.current_cls {
            self.error(keyword, "Can't use 'this' outside of a class.");
            return;
        }

        self.resolve_local(keyword);
    }

    fn visit_super(&mut self, keyword: &Token, _: &Token) {
        match self.current_cls {
            ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
            ClassType::Class => {
                self.error(keyword, "Can't use 'super' in a class with no superclass.")
            }
            ClassType::Subclass => self.resolve_local(keyword),
        }
    }

    fn visit_grouping(&mut self, expression: &Expr) {
        self.visit_expr(expression);
    }

    fn visit_literal(&mut self, _: &Literal) {}

    fn visit_logical(&mut self, left: &Expr, _: &Token, right: &Expr) {
        self.visit_expr(left);
        self.visit_expr(right);
    }

    fn visit_unary(&mut self, _: &Token, right: &Expr) {
        self.visit_expr(right);
    }

    fn visit_variable(&mut self, name: &Token) {
        // Declared in the innermost scope but not yet defined: the name is being read inside
        // its own initializer
        let in_initializer = self
            .scopes
            .last()
            .and_then(|scope| scope.get(&name.lexeme))
            .map_or(false, |ready| !ready);

        if in_initializer {
            self.error(name, "Can't read local variable in its own initializer.");
        }

        self.resolve_local(name);
    }
}
