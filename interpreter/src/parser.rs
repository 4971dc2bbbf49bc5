use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::error::Error;
use crate::limits::MAX_ARITY;
use losk_core::{Token, Type};
use std::rc::Rc;

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,

    // Errors that are reported without unwinding the current declaration
    errors: Vec<Error>,
}

// A wrapper over vector of statements to not leak Stmt to public
#[derive(Debug, PartialEq)]
pub struct StmtStream(pub(crate) Vec<Stmt>);

impl StmtStream {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Helper alias for shorter return types
type ParserResult = Result<StmtStream, Vec<Error>>;
type StmtResult = Result<Stmt, Error>;
type ExprResult = Result<Expr, Error>;

// Function kind to differentiate between normal functions and class methods during parsing
#[derive(Debug, Clone, Copy)]
enum FunctionKind {
    Function,
    Method,
}

impl FunctionKind {
    fn describe(self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Method => "method",
        }
    }
}

impl<'a> Parser<'a> {
    /// `tokens` must end with an EOF token, as produced by the scanner.
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// Parses the whole token sequence. A syntax error does not stop the parse: the parser
    /// synchronizes on the next statement boundary and carries on, so every error in the source
    /// is returned.
    pub fn parse(&mut self) -> ParserResult {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        let errs = std::mem::take(&mut self.errors);
        if errs.is_empty() {
            tracing::debug!(statements = statements.len(), "parsed");
            Ok(StmtStream(statements))
        } else {
            tracing::debug!(errors = errs.len(), "parse failed");
            Err(errs)
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let res = if self.match_one(Type::Class) {
            self.class_declaration()
        } else if self.match_one(Type::Fun) {
            self.function(FunctionKind::Function)
                .map(|declaration| Stmt::Function { declaration })
        } else if self.match_one(Type::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match res {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                self.errors.push(err);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> StmtResult {
        let name = self.consume(Type::Identifier, "Expect class name.")?.clone();

        let superclass = if self.match_one(Type::Less) {
            self.consume(Type::Identifier, "Expect superclass name.")?;
            Some(Expr::variable(self.previous().clone()))
        } else {
            None
        };

        self.consume(Type::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            methods.push(self.function(FunctionKind::Method)?);
        }
        self.consume(Type::RightBrace, "Expect '}' after class body.")?;
        Ok(Stmt::class(name, superclass, methods))
    }

    fn function(&mut self, kind: FunctionKind) -> Result<Rc<FunctionDecl>, Error> {
        let name = self
            .consume(Type::Identifier, &format!("Expect {} name.", kind.describe()))?
            .clone();
        self.consume(
            Type::LeftParen,
            &format!("Expect '(' after {} name.", kind.describe()),
        )?;

        let mut params = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    let err = Error::parser_error(self.peek(), "Can't have more than 255 parameters.");
                    self.errors.push(err);
                }

                params.push(self.consume(Type::Identifier, "Expect parameter name.")?.clone());
                if !self.match_one(Type::Comma) {
                    break;
                }
            }
        }

        self.consume(Type::RightParen, "Expect ')' after parameters.")?;
        self.consume(
            Type::LeftBrace,
            &format!("Expect '{{' before {} body.", kind.describe()),
        )?;

        let body = self.block()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> StmtResult {
        let name = self.consume(Type::Identifier, "Expect variable name.")?.clone();
        let init = if self.match_one(Type::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(Type::SemiColon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::var(name, init))
    }

    fn statement(&mut self) -> StmtResult {
        if self.match_one(Type::If) {
            self.if_statement()
        } else if self.match_one(Type::Print) {
            self.print_statement()
        } else if self.match_one(Type::Return) {
            self.return_statement()
        } else if self.match_one(Type::While) {
            self.while_statement()
        } else if self.match_one(Type::For) {
            self.for_statement()
        } else if self.match_one(Type::LeftBrace) {
            Ok(Stmt::block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, Error> {
        let mut stmts = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(Type::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn expression_statement(&mut self) -> StmtResult {
        let expr = self.expression()?;
        self.consume(Type::SemiColon, "Expect ';' after expression.")?;
        Ok(Stmt::expression(expr))
    }

    fn if_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after if condition.")?;

        // The else binds to the nearest if, since the inner if consumes it first
        let then_branch = self.statement()?;
        let else_branch = if self.match_one(Type::Else) {
            Some(self.statement()?)
        } else {
            None
        };

        Ok(Stmt::if_(condition, then_branch, else_branch))
    }

    fn while_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;
        Ok(Stmt::while_(condition, body))
    }

    fn for_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_one(Type::SemiColon) {
            None
        } else if self.match_one(Type::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(Type::SemiColon) {
            self.expression()?
        } else {
            Expr::literal(true)
        };
        self.consume(Type::SemiColon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(Type::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(Type::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::block(vec![body, Stmt::expression(increment)]);
        }

        let looped = Stmt::while_(condition, body);
        match initializer {
            // initialise the variables first, after that it's just a normal while loop
            Some(initializer) => Ok(Stmt::block(vec![initializer, looped])),
            None => Ok(looped),
        }
    }

    fn print_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let expr = self.expression()?;
        self.consume(Type::SemiColon, "Expect ';' after value.")?;
        Ok(Stmt::print(keyword, expr))
    }

    fn return_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let value = if !self.check(Type::SemiColon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(Type::SemiColon, "Expect ';' after return value.")?;
        Ok(Stmt::return_(keyword, value))
    }

    fn expression(&mut self) -> ExprResult {
        self.assignment()
    }

    fn assignment(&mut self) -> ExprResult {
        let expr = self.or_expression()?;
        if self.match_one(Type::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            match expr {
                Expr::Variable { name } => Ok(Expr::assign(name, value)),
                Expr::Get { object, name } => Ok(Expr::set(object, name, value)),
                expr => {
                    // Nothing to synchronize on, the parser is still in a sane state
                    self.errors
                        .push(Error::parser_error(&equals, "Invalid assignment target."));
                    Ok(expr)
                }
            }
        } else {
            Ok(expr)
        }
    }

    fn or_expression(&mut self) -> ExprResult {
        let mut expr = self.and_expression()?;
        while self.match_one(Type::Or) {
            let operator = self.previous().clone();
            let right = self.and_expression()?;
            expr = Expr::logical(expr, operator, right);
        }
        Ok(expr)
    }

    fn and_expression(&mut self) -> ExprResult {
        let mut expr = self.equality()?;
        while self.match_one(Type::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::logical(expr, operator, right);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;
        while self.match_either(&[Type::BangEqual, Type::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.term()?;
        while self.match_either(&[
            Type::Greater,
            Type::GreaterEqual,
            Type::Less,
            Type::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;
        while self.match_either(&[Type::Plus, Type::Minus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;
        while self.match_either(&[Type::Slash, Type::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if self.match_either(&[Type::Bang, Type::Minus]) {
            let operator = self.previous().clone();
            Ok(Expr::unary(operator, self.unary()?))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;
        loop {
            if self.match_one(Type::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_one(Type::Dot) {
                let name = self
                    .consume(Type::Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = Expr::get(expr, name);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ExprResult {
        let mut args: Vec<Expr> = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if args.len() >= MAX_ARITY {
                    let err = Error::parser_error(self.peek(), "Can't have more than 255 arguments.");
                    self.errors.push(err);
                }

                args.push(self.expression()?);
                if !self.match_one(Type::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(Type::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::call(callee, paren.clone(), args))
    }

    fn primary(&mut self) -> ExprResult {
        if self.match_one(Type::True) {
            Ok(Expr::literal(true))
        } else if self.match_one(Type::False) {
            Ok(Expr::literal(false))
        } else if self.match_one(Type::Nil) {
            Ok(Expr::nil())
        } else if self.match_either(&[Type::Number, Type::String]) {
            Ok(Expr::literal(self.previous().value.clone()))
        } else if self.match_one(Type::Super) {
            let keyword = self.previous().clone();
            self.consume(Type::Dot, "Expect '.' after 'super'.")?;
            let method = self
                .consume(Type::Identifier, "Expect superclass method name.")?
                .clone();
            Ok(Expr::super_(keyword, method))
        } else if self.match_one(Type::LeftParen) {
            let expr = self.expression()?;
            self.consume(Type::RightParen, "Expect ')' after expression.")?;
            Ok(Expr::grouping(expr))
        } else if self.match_one(Type::This) {
            Ok(Expr::this(self.previous().clone()))
        } else if self.match_one(Type::Identifier) {
            Ok(Expr::variable(self.previous().clone()))
        } else {
            Err(Error::parser_error(self.peek(), "Expect expression."))
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().ty == Type::Eof
    }

    fn check(&self, ty: Type) -> bool {
        if self.is_at_end() {
            false
        } else {
            self.peek().ty == ty
        }
    }

    fn consume(&mut self, ty: Type, msg: &str) -> Result<&Token, Error> {
        if self.check(ty) {
            Ok(self.advance())
        } else {
            Err(Error::parser_error(self.peek(), msg))
        }
    }

    // Discards tokens until a statement boundary: right after a ';' or right before a keyword
    // that starts a declaration or statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().ty == Type::SemiColon {
                return;
            }

            match self.peek().ty {
                Type::Class
                | Type::Fun
                | Type::Var
                | Type::For
                | Type::If
                | Type::While
                | Type::Print
                | Type::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn match_either(&mut self, types: &[Type]) -> bool {
        for ty in types {
            if self.match_one(*ty) {
                // Already skipped in the `match_one`, just return result
                return true;
            }
        }

        false
    }

    fn match_one(&mut self, ty: Type) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Expr, Stmt};
    use crate::error::Error;
    use crate::parser::{Parser, StmtStream};
    use losk_core::{Literal, Scanner, Token, Type};

    macro_rules! token {
        ($ty:ident, $lex:literal, $idx:literal) => {
            Token::new(Type::$ty, String::from($lex), 1, $idx, Literal::Nil)
        };
    }

    fn parse(src: &str) -> Result<StmtStream, Vec<Error>> {
        let mut scanner = Scanner::new();
        let tokens: Vec<Token> = scanner.scan_tokens(src).collect();
        let mut parser = Parser::new(&tokens);
        parser.parse()
    }

    fn messages(src: &str) -> Vec<String> {
        parse(src)
            .unwrap_err()
            .into_iter()
            .map(|err| err.to_string())
            .collect()
    }

    #[test]
    fn test_comparison_from_raw_tokens() {
        let tokens = vec![
            Token::new(Type::Number, String::from("3"), 1, 0, Literal::Num(3.0)),
            token!(Greater, ">", 1),
            Token::new(Type::Number, String::from("1"), 1, 2, Literal::Num(1.0)),
            token!(SemiColon, ";", 3),
            Token::new(Type::Eof, String::new(), 1, 4, Literal::Nil),
        ];
        let mut parser = Parser::new(&tokens);
        let parsed = parser.parse().unwrap();

        assert_eq!(parsed.len(), 1);
        match &parsed.0[0] {
            Stmt::Expression {
                expression:
                    Expr::Binary {
                        left,
                        operator,
                        right,
                    },
            } => {
                assert_eq!(**left, Expr::literal(3));
                assert_eq!(operator.lexeme, ">");
                assert_eq!(**right, Expr::literal(1));
            }
            other => panic!("expected a binary expression statement, found {:?}", other),
        }
    }

    #[test]
    fn test_statements() {
        let tests = [
            // simple expression
            (
                "3 < 4;",
                Stmt::expression(Expr::binary(
                    Expr::literal(3),
                    token!(Less, "<", 1),
                    Expr::literal(4),
                )),
            ),
            // grouping expression
            (
                "1 + (\"hello\" - 4) - foo;",
                Stmt::expression(Expr::binary(
                    Expr::binary(
                        Expr::literal(1),
                        token!(Plus, "+", 1),
                        Expr::grouping(Expr::binary(
                            Expr::literal("hello"),
                            token!(Minus, "-", 4),
                            Expr::literal(4),
                        )),
                    ),
                    token!(Minus, "-", 7),
                    Expr::variable(token!(Identifier, "foo", 8)),
                )),
            ),
            // logical expression
            (
                "true and false;",
                Stmt::expression(Expr::logical(
                    Expr::literal(true),
                    token!(And, "and", 1),
                    Expr::literal(false),
                )),
            ),
            // nested grouping
            (
                "((1 + 2) / 4) * 10;",
                Stmt::expression(Expr::binary(
                    Expr::grouping(Expr::binary(
                        Expr::grouping(Expr::binary(
                            Expr::literal(1),
                            token!(Plus, "+", 3),
                            Expr::literal(2),
                        )),
                        token!(Slash, "/", 6),
                        Expr::literal(4),
                    )),
                    token!(Star, "*", 9),
                    Expr::literal(10),
                )),
            ),
            // print statement
            (
                "print 1 + 2;",
                Stmt::print(
                    token!(Print, "print", 0),
                    Expr::binary(Expr::literal(1), token!(Plus, "+", 2), Expr::literal(2)),
                ),
            ),
            // assignment is right associative
            (
                "a = b = nil;",
                Stmt::expression(Expr::assign(
                    token!(Identifier, "a", 0),
                    Expr::assign(token!(Identifier, "b", 2), Expr::nil()),
                )),
            ),
            // unary binds tighter than factor
            (
                "-1 * !x;",
                Stmt::expression(Expr::binary(
                    Expr::unary(token!(Minus, "-", 0), Expr::literal(1)),
                    token!(Star, "*", 2),
                    Expr::unary(
                        token!(Bang, "!", 3),
                        Expr::variable(token!(Identifier, "x", 4)),
                    ),
                )),
            ),
        ];

        for (src, expected) in tests {
            assert_eq!(parse(src).unwrap(), StmtStream(vec![expected]), "parsing {:?}", src);
        }
    }

    #[test]
    fn test_call_and_property_chains() {
        let parsed = parse("a.b.c(1)(2);").unwrap();
        let expected = Stmt::expression(Expr::call(
            Expr::call(
                Expr::get(
                    Expr::get(
                        Expr::variable(token!(Identifier, "a", 0)),
                        token!(Identifier, "b", 2),
                    ),
                    token!(Identifier, "c", 4),
                ),
                token!(RightParen, ")", 7),
                vec![Expr::literal(1)],
            ),
            token!(RightParen, ")", 10),
            vec![Expr::literal(2)],
        ));

        assert_eq!(parsed, StmtStream(vec![expected]));
    }

    #[test]
    fn test_property_assignment_becomes_set() {
        let parsed = parse("a.b = 1;").unwrap();
        let expected = Stmt::expression(Expr::set(
            Box::new(Expr::variable(token!(Identifier, "a", 0))),
            token!(Identifier, "b", 2),
            Expr::literal(1),
        ));

        assert_eq!(parsed, StmtStream(vec![expected]));
    }

    #[test]
    fn test_for_desugars_into_while() {
        let parsed = parse("for (var i = 0; i < 2; i = i + 1) print i;").unwrap();
        assert_eq!(parsed.len(), 1);

        match &parsed.0[0] {
            Stmt::Block { statements } => {
                assert!(matches!(statements[0], Stmt::Var { .. }));
                match &statements[1] {
                    Stmt::While { body, .. } => match body.as_ref() {
                        Stmt::Block { statements } => {
                            assert!(matches!(statements[0], Stmt::Print { .. }));
                            assert!(matches!(statements[1], Stmt::Expression { .. }));
                        }
                        other => panic!("expected the loop body in a block, found {:?}", other),
                    },
                    other => panic!("expected a while loop, found {:?}", other),
                }
            }
            other => panic!("expected a block, found {:?}", other),
        }
    }

    #[test]
    fn test_empty_for_clauses() {
        let parsed = parse("for (;;) print 1;").unwrap();
        match &parsed.0[0] {
            Stmt::While { condition, body } => {
                assert_eq!(*condition, Expr::literal(true));
                assert!(matches!(body.as_ref(), Stmt::Print { .. }));
            }
            other => panic!("expected a bare while loop, found {:?}", other),
        }
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let parsed = parse("if (a) if (b) print 1; else print 2;").unwrap();
        match &parsed.0[0] {
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert!(else_branch.is_none());
                assert!(matches!(
                    then_branch.as_ref(),
                    Stmt::If {
                        else_branch: Some(_),
                        ..
                    }
                ));
            }
            other => panic!("expected an if statement, found {:?}", other),
        }
    }

    #[test]
    fn test_class_declaration() {
        let parsed = parse("class B < A { init(x) { this.x = x; } get() { return super.get(); } }")
            .unwrap();
        match &parsed.0[0] {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(matches!(superclass, Some(Expr::Variable { name }) if name.lexeme == "A"));
                let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
                assert_eq!(names, vec!["init", "get"]);
                assert_eq!(methods[0].params.len(), 1);
            }
            other => panic!("expected a class, found {:?}", other),
        }
    }

    #[test]
    fn test_errors_are_collected_after_synchronizing() {
        assert_eq!(
            messages("var = 1;\nprint 2;\nprint ;\nvar ok = 3;"),
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect expression.",
            ]
        );
    }

    #[test]
    fn test_error_at_end() {
        assert_eq!(
            messages("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(
            messages("a + b = c;\nprint 1;"),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
    }

    #[test]
    fn test_error_inside_block_keeps_parsing_block() {
        assert_eq!(
            messages("{ print ; print 1; }\nprint ;"),
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at ';': Expect expression.",
            ]
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let args = vec!["1"; 256].join(", ");
        let src = format!("f({});", args);
        let errs = messages(&src);

        assert_eq!(errs.len(), 1);
        assert!(errs[0].ends_with("Can't have more than 255 arguments."));
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let src = format!("fun f({}) {{}}\nprint 1;", params.join(", "));
        let errs = messages(&src);

        assert_eq!(
            errs,
            vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
        );

        let params: Vec<String> = (0..255).map(|i| format!("p{}", i)).collect();
        assert!(parse(&format!("fun f({}) {{}}", params.join(", "))).is_ok());
    }
}
