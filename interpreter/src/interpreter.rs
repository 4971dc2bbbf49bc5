use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use ahash::AHashMap;
use losk_core::{Literal, Token, TokenIndex, Type};

use crate::ast::{Expr, ExprVisitor, FunctionDecl, Stmt, StmtVisitor};
use crate::callable::{self, Class, Function, Instance, INITIALIZER};
use crate::env::{Environment, UndefinedVariable};
use crate::error::Error;
use crate::limits::MAX_CALL_DEPTH;
use crate::resolver::ResolvedStmts;
use crate::value::Value;

/// How a statement completed. A `return` travels outwards as `Flow::Return` through every
/// enclosing block and loop until the call that runs the function body picks it up.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

type ExprResult = Result<Value, Error>;
type StmtResult = Result<Flow, Error>;

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    env: Rc<RefCell<Environment>>,

    // Hop counts computed by the resolver, keyed by the variable's name (or keyword) token.
    // A missing entry means the variable is global.
    locals: AHashMap<TokenIndex, usize>,
    stdout: Rc<RefCell<dyn Write>>,

    // Calls currently in progress
    call_depth: usize,
}

impl Interpreter {
    pub fn new(stdout: Rc<RefCell<dyn Write>>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals
            .borrow_mut()
            .define("clock", Value::Callable(Rc::new(callable::clock())));

        Interpreter {
            env: globals.clone(),
            globals,
            locals: AHashMap::new(),
            stdout,
            call_depth: 0,
        }
    }

    /// Runs the statements in order. The first runtime error stops execution and is returned.
    pub fn interpret(&mut self, resolved: &ResolvedStmts) -> Result<(), Error> {
        for stmt in &resolved.0 {
            if let Err(err) = self.execute(stmt) {
                tracing::debug!(line = err.line(), "runtime error: {}", err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Runs `stmts` with `env` as the current frame. The previous frame is restored on every
    /// way out, including errors and returns.
    pub(crate) fn execute_block(
        &mut self,
        stmts: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> StmtResult {
        let previous = std::mem::replace(&mut self.env, env);
        let result = self.execute_all(stmts);
        self.env = previous;
        result
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> StmtResult {
        for stmt in stmts {
            if let flow @ Flow::Return(_) = self.execute(stmt)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, stmt: &Stmt) -> StmtResult {
        #[cfg(feature = "debug-trace-execution")]
        tracing::trace!(?stmt, "execute");

        self.visit_stmt(stmt)
    }

    /// Takes the hop counts of a program that resolved without errors.
    pub(crate) fn resolve(&mut self, locals: AHashMap<TokenIndex, usize>) {
        self.locals.extend(locals);
    }

    #[cfg(test)]
    pub(crate) fn local_depth(&self, idx: TokenIndex) -> Option<usize> {
        self.locals.get(&idx).copied()
    }

    fn lookup_variable(&self, name: &Token) -> ExprResult {
        let value = match self.locals.get(&name.idx) {
            Some(dist) => self.env.borrow().get_at(*dist, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        value.ok_or_else(|| undefined_variable(name))
    }
}

fn undefined_variable(name: &Token) -> Error {
    Error::runtime_error(name, &format!("Undefined variable '{}'.", name.lexeme))
}

fn undefined_property(name: &Token) -> Error {
    Error::runtime_error(name, &format!("Undefined property '{}'.", name.lexeme))
}

// Applies a numeric binary operator, failing unless both operands are numbers.
fn numeric(
    operator: &Token,
    left: Value,
    right: Value,
    op: impl Fn(f64, f64) -> Value,
) -> ExprResult {
    match (left, right) {
        (Value::Num(left), Value::Num(right)) => Ok(op(left, right)),
        _ => Err(Error::runtime_error(operator, "Operands must be numbers.")),
    }
}

impl ExprVisitor for Interpreter {
    type Item = ExprResult;

    fn visit_assign(&mut self, name: &Token, value: &Expr) -> ExprResult {
        let value = self.visit_expr(value)?;

        let assigned = match self.locals.get(&name.idx) {
            Some(dist) => self
                .env
                .borrow_mut()
                .assign_at(*dist, &name.lexeme, value.clone()),
            None => self.globals.borrow_mut().assign(&name.lexeme, value.clone()),
        };

        assigned.map_err(|UndefinedVariable| undefined_variable(name))?;
        Ok(value)
    }

    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ExprResult {
        let left = self.visit_expr(left)?;
        let right = self.visit_expr(right)?;

        match operator.ty {
            Type::Plus => match (left, right) {
                (Value::Num(left), Value::Num(right)) => Ok(Value::Num(left + right)),
                (Value::Str(left), Value::Str(right)) => {
                    Ok(Value::from(format!("{}{}", left, right)))
                }
                _ => Err(Error::runtime_error(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            Type::Minus => numeric(operator, left, right, |l, r| Value::Num(l - r)),
            Type::Slash => numeric(operator, left, right, |l, r| Value::Num(l / r)),
            Type::Star => numeric(operator, left, right, |l, r| Value::Num(l * r)),
            Type::Greater => numeric(operator, left, right, |l, r| Value::Bool(l > r)),
            Type::GreaterEqual => numeric(operator, left, right, |l, r| Value::Bool(l >= r)),
            Type::Less => numeric(operator, left, right, |l, r| Value::Bool(l < r)),
            Type::LessEqual => numeric(operator, left, right, |l, r| Value::Bool(l <= r)),
            Type::EqualEqual => Ok(Value::Bool(left == right)),
            Type::BangEqual => Ok(Value::Bool(left != right)),
            _ => Err(Error::runtime_error(operator, "Invalid binary operator.")),
        }
    }

    fn visit_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> ExprResult {
        let callee = self.visit_expr(callee)?;
        let mut evaluated_args = Vec::with_capacity(args.len());
        for arg in args {
            evaluated_args.push(self.visit_expr(arg)?);
        }

        match callee {
            Value::Callable(func) => {
                if func.arity() != evaluated_args.len() {
                    Err(Error::runtime_error(
                        paren,
                        &format!(
                            "Expected {} arguments but got {}.",
                            func.arity(),
                            evaluated_args.len()
                        ),
                    ))
                } else if self.call_depth >= MAX_CALL_DEPTH {
                    Err(Error::runtime_error(paren, "Stack overflow."))
                } else {
                    self.call_depth += 1;
                    let result = func.call(self, evaluated_args);
                    self.call_depth -= 1;
                    result
                }
            }
            _ => Err(Error::runtime_error(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    fn visit_get(&mut self, object: &Expr, name: &Token) -> ExprResult {
        match self.visit_expr(object)? {
            Value::Instance(instance) => {
                Instance::get(&instance, &name.lexeme).ok_or_else(|| undefined_property(name))
            }
            _ => Err(Error::runtime_error(
                name,
                "Only instances have properties.",
            )),
        }
    }

    fn visit_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> ExprResult {
        match self.visit_expr(object)? {
            Value::Instance(instance) => {
                let value = self.visit_expr(value)?;
                instance.borrow_mut().set(&name.lexeme, value.clone());
                Ok(value)
            }
            _ => Err(Error::runtime_error(name, "Only instances have fields.")),
        }
    }

    fn visit_this(&mut self, keyword: &Token) -> ExprResult {
        self.lookup_variable(keyword)
    }

    fn visit_super(&mut self, keyword: &Token, method: &Token) -> ExprResult {
        // The resolver always puts `super` one frame above the frame holding `this`
        let dist = match self.locals.get(&keyword.idx) {
            Some(dist) => *dist,
            None => return Err(undefined_variable(keyword)),
        };

        let superclass = self.env.borrow().get_at(dist, "super");
        let object = self.env.borrow().get_at(dist.saturating_sub(1), "this");

        let superclass = match superclass {
            Some(Value::Callable(callable)) => callable.as_class(),
            _ => None,
        };

        match (superclass, object) {
            (Some(superclass), Some(Value::Instance(instance))) => superclass
                .find_method(&method.lexeme)
                .map(|function| Value::Callable(Rc::new(function.bind(instance))))
                .ok_or_else(|| undefined_property(method)),
            _ => Err(undefined_variable(keyword)),
        }
    }

    fn visit_grouping(&mut self, expression: &Expr) -> ExprResult {
        self.visit_expr(expression)
    }

    fn visit_literal(&mut self, value: &Literal) -> ExprResult {
        Ok(Value::from(value))
    }

    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ExprResult {
        let left = self.visit_expr(left)?;

        // The right operand only runs when the left one does not settle the result, and the
        // result is whichever operand settled it, not a boolean.
        if operator.ty == Type::Or {
            if left.is_truthy() {
                return Ok(left);
            }
        } else if !left.is_truthy() {
            return Ok(left);
        }

        self.visit_expr(right)
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> ExprResult {
        let right = self.visit_expr(right)?;
        match (operator.ty, right) {
            (Type::Minus, Value::Num(val)) => Ok(Value::Num(-val)),
            (Type::Minus, _) => Err(Error::runtime_error(
                operator,
                "Operand must be a number.",
            )),
            (Type::Bang, val) => Ok(Value::Bool(!val.is_truthy())),
            _ => Err(Error::runtime_error(operator, "Invalid unary operator.")),
        }
    }

    fn visit_variable(&mut self, name: &Token) -> ExprResult {
        self.lookup_variable(name)
    }
}

impl StmtVisitor for Interpreter {
    type Item = StmtResult;

    fn visit_block(&mut self, statements: &[Stmt]) -> StmtResult {
        let env = Rc::new(RefCell::new(Environment::with(self.env.clone())));
        self.execute_block(statements, env)
    }

    fn visit_expression(&mut self, expression: &Expr) -> StmtResult {
        self.visit_expr(expression)?;
        Ok(Flow::Normal)
    }

    fn visit_function(&mut self, declaration: &Rc<FunctionDecl>) -> StmtResult {
        let function = Function::new(Rc::clone(declaration), self.env.clone(), false);
        self.env
            .borrow_mut()
            .define(&declaration.name.lexeme, Value::Callable(Rc::new(function)));
        Ok(Flow::Normal)
    }

    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> StmtResult {
        let superclass = match superclass {
            Some(expr) => {
                let class = match self.visit_expr(expr)? {
                    Value::Callable(callable) => callable.as_class(),
                    _ => None,
                };

                match class {
                    Some(class) => Some(class),
                    None => {
                        let token = match expr {
                            Expr::Variable { name } => name,
                            _ => name,
                        };
                        return Err(Error::runtime_error(token, "Superclass must be a class."));
                    }
                }
            }
            None => None,
        };

        // Declared first so that methods can refer to the class
        self.env.borrow_mut().define(&name.lexeme, Value::Nil);

        let enclosing = superclass.as_ref().map(|superclass| {
            let mut env = Environment::with(self.env.clone());
            env.define("super", Value::Callable(superclass.clone()));
            std::mem::replace(&mut self.env, Rc::new(RefCell::new(env)))
        });

        let mut table = AHashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == INITIALIZER;
            let function = Function::new(Rc::clone(method), self.env.clone(), is_initializer);
            table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = Class::new(&name.lexeme, superclass, table);

        if let Some(enclosing) = enclosing {
            self.env = enclosing;
        }

        self.env
            .borrow_mut()
            .assign(&name.lexeme, Value::Callable(class))
            .map_err(|UndefinedVariable| undefined_variable(name))?;
        Ok(Flow::Normal)
    }

    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> StmtResult {
        if self.visit_expr(condition)?.is_truthy() {
            self.execute(then_branch)
        } else if let Some(else_branch) = else_branch {
            self.execute(else_branch)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn visit_while(&mut self, condition: &Expr, body: &Stmt) -> StmtResult {
        while self.visit_expr(condition)?.is_truthy() {
            if let flow @ Flow::Return(_) = self.execute(body)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn visit_print(&mut self, keyword: &Token, expression: &Expr) -> StmtResult {
        let value = self.visit_expr(expression)?;
        writeln!(RefCell::borrow_mut(&self.stdout), "{}", value)
            .map_err(|err| Error::runtime_error(keyword, &err.to_string()))?;
        Ok(Flow::Normal)
    }

    fn visit_return(&mut self, _: &Token, value: Option<&Expr>) -> StmtResult {
        let value = match value {
            Some(value) => self.visit_expr(value)?,
            None => Value::Nil,
        };
        Ok(Flow::Return(value))
    }

    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) -> StmtResult {
        let value = match init {
            Some(init) => self.visit_expr(init)?,
            None => Value::Nil,
        };
        self.env.borrow_mut().define(&name.lexeme, value);
        Ok(Flow::Normal)
    }
}
