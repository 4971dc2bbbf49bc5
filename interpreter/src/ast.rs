use losk_core::{Literal, Token};
use std::rc::Rc;

// Tokens are cloned into the nodes during parsing. Nodes that are looked up in the resolver's
// side-table are identified by the index of their name (or keyword) token, which is unique for
// a whole session, so the tree itself never has to be mutated or compared by address.

#[derive(Debug, PartialEq)]
pub(crate) enum Expr {
    Assign {
        name: Token,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        args: Vec<Expr>,
    },
    Get {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },
    This {
        keyword: Token,
    },
    Super {
        keyword: Token,
        method: Token,
    },
    Grouping {
        expression: Box<Expr>,
    },
    Literal {
        value: Literal,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        name: Token,
    },
}

pub(crate) trait ExprVisitor {
    type Item;

    fn visit_expr(&mut self, expr: &Expr) -> Self::Item {
        match expr {
            Expr::Assign { name, value } => self.visit_assign(name, value),
            Expr::Binary {
                left,
                operator,
                right,
            } => self.visit_binary(left, operator, right),
            Expr::Call {
                callee,
                paren,
                args,
            } => self.visit_call(callee, paren, args),
            Expr::Get { object, name } => self.visit_get(object, name),
            Expr::Set {
                object,
                name,
                value,
            } => self.visit_set(object, name, value),
            Expr::Grouping { expression } => self.visit_grouping(expression),
            Expr::Literal { value } => self.visit_literal(value),
            Expr::Logical {
                left,
                operator,
                right,
            } => self.visit_logical(left, operator, right),
            Expr::Unary { operator, right } => self.visit_unary(operator, right),
            Expr::Variable { name } => self.visit_variable(name),
            Expr::This { keyword } => self.visit_this(keyword),
            Expr::Super { keyword, method } => self.visit_super(keyword, method),
        }
    }

    fn visit_assign(&mut self, name: &Token, value: &Expr) -> Self::Item;
    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Self::Item;
    fn visit_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> Self::Item;
    fn visit_get(&mut self, object: &Expr, name: &Token) -> Self::Item;
    fn visit_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> Self::Item;
    fn visit_this(&mut self, keyword: &Token) -> Self::Item;
    fn visit_super(&mut self, keyword: &Token, method: &Token) -> Self::Item;
    fn visit_grouping(&mut self, expression: &Expr) -> Self::Item;
    fn visit_literal(&mut self, value: &Literal) -> Self::Item;
    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Self::Item;
    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> Self::Item;
    fn visit_variable(&mut self, name: &Token) -> Self::Item;
}

// Creator methods, these could most likely be written as a proc-macro, but I will need
// a separate crate. So here they go.
impl Expr {
    pub(crate) fn assign(name: Token, value: Expr) -> Self {
        Expr::Assign {
            name,
            value: Box::new(value),
        }
    }

    pub(crate) fn binary(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn call(callee: Expr, paren: Token, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        }
    }

    pub(crate) fn get(object: Expr, name: Token) -> Self {
        Expr::Get {
            object: Box::new(object),
            name,
        }
    }

    pub(crate) fn set(object: Box<Expr>, name: Token, value: Expr) -> Self {
        Expr::Set {
            object,
            name,
            value: Box::new(value),
        }
    }

    pub(crate) fn grouping(expression: Expr) -> Self {
        Expr::Grouping {
            expression: Box::new(expression),
        }
    }

    pub(crate) fn literal<T>(value: T) -> Self
    where
        Literal: From<T>,
    {
        Expr::Literal {
            value: Literal::from(value),
        }
    }

    pub(crate) fn nil() -> Self {
        Expr::Literal {
            value: Literal::Nil,
        }
    }

    pub(crate) fn logical(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Logical {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn unary(operator: Token, right: Expr) -> Self {
        Expr::Unary {
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn variable(name: Token) -> Self {
        Expr::Variable { name }
    }

    pub(crate) fn this(keyword: Token) -> Self {
        Expr::This { keyword }
    }

    pub(crate) fn super_(keyword: Token, method: Token) -> Self {
        Expr::Super { keyword, method }
    }
}

/// A function or method declaration. Shared between the tree and every function value created
/// from it, so calling or binding a function never copies its body.
#[derive(Debug, PartialEq)]
pub(crate) struct FunctionDecl {
    pub(crate) name: Token,
    pub(crate) params: Vec<Token>,
    pub(crate) body: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Stmt {
    Block {
        statements: Vec<Stmt>,
    },
    Expression {
        expression: Expr,
    },
    Function {
        declaration: Rc<FunctionDecl>,
    },
    Class {
        name: Token,
        superclass: Option<Expr>, // always a Variable
        methods: Vec<Rc<FunctionDecl>>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Print {
        keyword: Token,
        expression: Expr,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Var {
        name: Token,
        init: Option<Expr>,
    },
}

pub(crate) trait StmtVisitor {
    type Item;

    fn visit_stmt(&mut self, stmt: &Stmt) -> Self::Item {
        match stmt {
            Stmt::Expression { expression } => self.visit_expression(expression),
            Stmt::Block { statements } => self.visit_block(statements),
            Stmt::Function { declaration } => self.visit_function(declaration),
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.visit_class(name, superclass.as_ref(), methods),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.visit_if(condition, then_branch, else_branch.as_deref()),
            Stmt::While { condition, body } => self.visit_while(condition, body),
            Stmt::Print {
                keyword,
                expression,
            } => self.visit_print(keyword, expression),
            Stmt::Return { keyword, value } => self.visit_return(keyword, value.as_ref()),
            Stmt::Var { name, init } => self.visit_var(name, init.as_ref()),
        }
    }

    fn visit_block(&mut self, statements: &[Stmt]) -> Self::Item;
    fn visit_expression(&mut self, expression: &Expr) -> Self::Item;
    fn visit_function(&mut self, declaration: &Rc<FunctionDecl>) -> Self::Item;
    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Self::Item;
    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Self::Item;
    fn visit_while(&mut self, condition: &Expr, body: &Stmt) -> Self::Item;
    fn visit_print(&mut self, keyword: &Token, expression: &Expr) -> Self::Item;
    fn visit_return(&mut self, keyword: &Token, value: Option<&Expr>) -> Self::Item;
    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) -> Self::Item;
}

impl Stmt {
    pub(crate) fn block(statements: Vec<Stmt>) -> Self {
        Stmt::Block { statements }
    }

    pub(crate) fn expression(expression: Expr) -> Self {
        Stmt::Expression { expression }
    }

    pub(crate) fn class(
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    ) -> Self {
        Stmt::Class {
            name,
            superclass,
            methods,
        }
    }

    pub(crate) fn if_(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Self {
        Stmt::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    pub(crate) fn while_(condition: Expr, body: Stmt) -> Self {
        Stmt::While {
            condition,
            body: Box::new(body),
        }
    }

    pub(crate) fn print(keyword: Token, expression: Expr) -> Self {
        Stmt::Print {
            keyword,
            expression,
        }
    }

    pub(crate) fn return_(keyword: Token, value: Option<Expr>) -> Self {
        Stmt::Return { keyword, value }
    }

    pub(crate) fn var(name: Token, init: Option<Expr>) -> Self {
        Stmt::Var { name, init }
    }
}
