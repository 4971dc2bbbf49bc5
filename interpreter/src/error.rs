use losk_core::{Error as CoreError, Token, Type};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("[line {line}] Error: {source}")]
    ScannerError { line: usize, source: CoreError },

    #[error("[line {line}] Error{location}: {msg}")]
    ParserError {
        token: Token,

        // line and location are copied from token, this is required because thiserror doesn't
        // support field access, e.g {token.line:?}, in error strings
        line: usize,
        location: String,
        msg: String,
    },

    #[error("[line {line}] Error{location}: {msg}")]
    ResolverError {
        token: Token,
        line: usize,
        location: String,
        msg: String,
    },

    #[error("{msg}\n[line {line}]")]
    RuntimeError {
        token: Token,
        line: usize,
        msg: String,
    },
}

fn location(token: &Token) -> String {
    match token.ty {
        Type::Eof => String::from(" at end"),
        _ => format!(" at '{}'", token.lexeme),
    }
}

impl Error {
    pub(crate) fn parser_error(token: &Token, msg: &str) -> Self {
        Error::ParserError {
            token: token.clone(),
            line: token.line,
            location: location(token),
            msg: String::from(msg),
        }
    }

    pub(crate) fn resolver_error(token: &Token, msg: &str) -> Self {
        Error::ResolverError {
            token: token.clone(),
            line: token.line,
            location: location(token),
            msg: String::from(msg),
        }
    }

    pub(crate) fn runtime_error(token: &Token, msg: &str) -> Self {
        Error::RuntimeError {
            token: token.clone(),
            line: token.line,
            msg: String::from(msg),
        }
    }

    /// Whether the error was raised before execution started.
    pub fn is_static(&self) -> bool {
        !matches!(self, Error::RuntimeError { .. })
    }

    pub fn line(&self) -> usize {
        match self {
            Error::ScannerError { line, .. }
            | Error::ParserError { line, .. }
            | Error::ResolverError { line, .. }
            | Error::RuntimeError { line, .. } => *line,
        }
    }
}

impl From<CoreError> for Error {
    fn from(value: CoreError) -> Self {
        Error::ScannerError {
            line: value.line(),
            source: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use losk_core::{Error as CoreError, Literal, Token, Type};

    #[test]
    fn test_messages() {
        let semi = Token::new(Type::SemiColon, String::from(";"), 3, 0, Literal::Nil);
        let eof = Token::new(Type::Eof, String::new(), 7, 1, Literal::Nil);

        assert_eq!(
            Error::from(CoreError::UnexpectedCharacter { ch: '@', line: 2 }).to_string(),
            "[line 2] Error: Unexpected character '@'."
        );
        assert_eq!(
            Error::parser_error(&semi, "Expect expression.").to_string(),
            "[line 3] Error at ';': Expect expression."
        );
        assert_eq!(
            Error::parser_error(&eof, "Expect ';' after value.").to_string(),
            "[line 7] Error at end: Expect ';' after value."
        );
        assert_eq!(
            Error::runtime_error(&semi, "Operands must be numbers.").to_string(),
            "Operands must be numbers.\n[line 3]"
        );
    }
}
