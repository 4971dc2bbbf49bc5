use phf::{phf_map, Map};

use crate::error::Error;
use crate::token::{Literal, Token, Type};

/// Produces token streams over source text.
///
/// A scanner is meant to live as long as a session: token indices continue where the previous
/// stream stopped, so tokens from different sources never share an index.
#[derive(Debug, Default)]
pub struct Scanner {
    index: usize,
}

impl Scanner {
    const KEYWORDS: Map<&'static str, Type> = phf_map! {
        "and" => Type::And,
        "else" => Type::Else,
        "for" => Type::For,
        "if" => Type::If,
        "or" => Type::Or,
        "return" => Type::Return,
        "this" => Type::This,
        "var" => Type::Var,
        "class" => Type::Class,
        "false" => Type::False,
        "fun" => Type::Fun,
        "nil" => Type::Nil,
        "print" => Type::Print,
        "super" => Type::Super,
        "true" => Type::True,
        "while" => Type::While,
    };

    pub fn new() -> Self {
        Scanner { index: 0 }
    }

    pub fn scan_tokens(&mut self, src: &str) -> TokenStream<'_> {
        TokenStream::new(src, &mut self.index)
    }
}

pub struct TokenStream<'a> {
    chars: Vec<char>,
    line: usize,

    // `start` and `current` points to the start and end of the token being scanned
    start: usize,
    current: usize,

    // Next token index, shared with the scanner that created this stream
    index: &'a mut usize,

    // This flag is set to `true` if the eof is reached and the eof token has been emitted.
    // This is required because the iterator needs to distinguish between when eof is reached but
    // the token is not emitted, and eof is reached and token has been emitted.
    eof: bool,
    errors: Vec<Error>,
}

impl<'a> TokenStream<'a> {
    fn new(src: &str, index: &'a mut usize) -> Self {
        TokenStream {
            chars: src.chars().collect(),
            line: 1,
            start: 0,
            current: 0,
            index,
            eof: false,
            errors: Vec::new(),
        }
    }

    /// Errors met so far. Scanning never stops on an error, the offending input is skipped.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }

    fn scan_token(&mut self) -> Option<Token> {
        let c = self.advance();

        match c {
            '(' => Some(self.make_token(Type::LeftParen)),
            ')' => Some(self.make_token(Type::RightParen)),
            '{' => Some(self.make_token(Type::LeftBrace)),
            '}' => Some(self.make_token(Type::RightBrace)),
            ',' => Some(self.make_token(Type::Comma)),
            '.' => Some(self.make_token(Type::Dot)),
            '-' => Some(self.make_token(Type::Minus)),
            '+' => Some(self.make_token(Type::Plus)),
            ';' => Some(self.make_token(Type::SemiColon)),
            '*' => Some(self.make_token(Type::Star)),

            '!' => {
                if self.match_char('=') {
                    Some(self.make_token(Type::BangEqual))
                } else {
                    Some(self.make_token(Type::Bang))
                }
            }

            '=' => {
                if self.match_char('=') {
                    Some(self.make_token(Type::EqualEqual))
                } else {
                    Some(self.make_token(Type::Equal))
                }
            }

            '<' => {
                if self.match_char('=') {
                    Some(self.make_token(Type::LessEqual))
                } else {
                    Some(self.make_token(Type::Less))
                }
            }

            '>' => {
                if self.match_char('=') {
                    Some(self.make_token(Type::GreaterEqual))
                } else {
                    Some(self.make_token(Type::Greater))
                }
            }

            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                    None
                } else {
                    Some(self.make_token(Type::Slash))
                }
            }

            '"' => Some(self.string()),

            // White spaces, do nothing
            ' ' | '\t' | '\r' => None,

            // Increment for new line
            '\n' => {
                self.line += 1;
                None
            }

            _ => {
                if c.is_ascii_digit() {
                    Some(self.number())
                } else if is_alpha(c) {
                    Some(self.identifier())
                } else {
                    self.errors.push(Error::UnexpectedCharacter {
                        ch: c,
                        line: self.line,
                    });
                    None
                }
            }
        }
    }

    fn string(&mut self) -> Token {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }

            self.advance();
        }

        if self.is_at_end() {
            self.errors
                .push(Error::UnterminatedString { line: self.line });
            let text: String = self.chars[self.start + 1..self.current].iter().collect();
            return self.make_token_with_val(Type::String, Literal::from(text));
        }

        // consume the closing "
        self.advance();
        let text: String = self.chars[self.start + 1..self.current - 1].iter().collect();
        self.make_token_with_val(Type::String, Literal::from(text))
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A trailing '.' is left for the next token
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.text();
        let value = text.parse::<f64>().unwrap_or_default();
        self.make_token_with_val(Type::Number, Literal::Num(value))
    }

    fn identifier(&mut self) -> Token {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = self.text();

        match Scanner::KEYWORDS.get(text.as_str()) {
            None => self.make_token(Type::Identifier),
            Some(Type::True) => self.make_token_with_val(Type::True, Literal::Bool(true)),
            Some(Type::False) => self.make_token_with_val(Type::False, Literal::Bool(false)),
            Some(keyword) => self.make_token(*keyword),
        }
    }

    fn text(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let res = self.peek();
        self.current += 1;
        res
    }

    fn match_char(&mut self, c: char) -> bool {
        if self.is_at_end() || self.peek() != c {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn make_token(&mut self, ty: Type) -> Token {
        self.make_token_with_val(ty, Literal::Nil)
    }

    fn make_token_with_val(&mut self, ty: Type, val: Literal) -> Token {
        let lexeme = match ty {
            Type::Eof => String::new(),
            _ => self.text(),
        };

        let token = Token::new(ty, lexeme, self.line, *self.index, val);
        *self.index += 1;
        token
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alpha_numeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

impl<'a> Iterator for TokenStream<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.current;

            if let Some(token) = self.scan_token() {
                return Some(token);
            }
        }

        self.eof = true;
        self.start = self.current;
        Some(self.make_token(Type::Eof))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::scanner::Scanner;
    use crate::token::{Literal, Token, Type};

    fn types(src: &str) -> Vec<Type> {
        let mut scanner = Scanner::new();
        scanner.scan_tokens(src).map(|token| token.ty).collect()
    }

    #[test]
    fn test_basic_scanning() {
        let source = "class fun {} var foo bar 12.45 \"hello\" true false nil // this is a comment";
        let mut scanner = Scanner::new();
        let stream = scanner.scan_tokens(source);

        assert_eq!(
            stream.collect::<Vec<Token>>(),
            vec![
                Token::new(Type::Class, String::from("class"), 1, 0, Literal::Nil),
                Token::new(Type::Fun, String::from("fun"), 1, 1, Literal::Nil),
                Token::new(Type::LeftBrace, String::from("{"), 1, 2, Literal::Nil),
                Token::new(Type::RightBrace, String::from("}"), 1, 3, Literal::Nil),
                Token::new(Type::Var, String::from("var"), 1, 4, Literal::Nil),
                Token::new(Type::Identifier, String::from("foo"), 1, 5, Literal::Nil),
                Token::new(Type::Identifier, String::from("bar"), 1, 6, Literal::Nil),
                Token::new(
                    Type::Number,
                    String::from("12.45"),
                    1,
                    7,
                    Literal::Num(12.45)
                ),
                Token::new(
                    Type::String,
                    String::from("\"hello\""),
                    1,
                    8,
                    Literal::from("hello")
                ),
                Token::new(Type::True, String::from("true"), 1, 9, Literal::Bool(true)),
                Token::new(
                    Type::False,
                    String::from("false"),
                    1,
                    10,
                    Literal::Bool(false)
                ),
                Token::new(Type::Nil, String::from("nil"), 1, 11, Literal::Nil),
                Token::new(Type::Eof, String::new(), 1, 12, Literal::Nil),
            ]
        );
    }

    #[test]
    fn test_single_and_double_characters() {
        let tests = [
            (".", vec![Type::Dot, Type::Eof]),
            ("()", vec![Type::LeftParen, Type::RightParen, Type::Eof]),
            ("!=", vec![Type::BangEqual, Type::Eof]),
            ("! =", vec![Type::Bang, Type::Equal, Type::Eof]),
            ("<=>=", vec![Type::LessEqual, Type::GreaterEqual, Type::Eof]),
            ("===", vec![Type::EqualEqual, Type::Equal, Type::Eof]),
            ("a/b", vec![Type::Identifier, Type::Slash, Type::Identifier, Type::Eof]),
            ("// a comment", vec![Type::Eof]),
            ("", vec![Type::Eof]),
        ];

        for (src, expected) in tests {
            assert_eq!(types(src), expected, "scanning {:?}", src);
        }
    }

    #[test]
    fn test_keywords_match_whole_identifier() {
        assert_eq!(types("andover"), vec![Type::Identifier, Type::Eof]);
        assert_eq!(types("and over"), vec![Type::And, Type::Identifier, Type::Eof]);
        assert_eq!(types("_class1"), vec![Type::Identifier, Type::Eof]);
        assert_eq!(
            types("and class else false fun for if nil or print return super this true var while"),
            vec![
                Type::And,
                Type::Class,
                Type::Else,
                Type::False,
                Type::Fun,
                Type::For,
                Type::If,
                Type::Nil,
                Type::Or,
                Type::Print,
                Type::Return,
                Type::Super,
                Type::This,
                Type::True,
                Type::Var,
                Type::While,
                Type::Eof,
            ]
        );
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_number() {
        let mut scanner = Scanner::new();
        let tokens: Vec<Token> = scanner.scan_tokens("123.").collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].value, Literal::Num(123.0));
        assert_eq!(tokens[0].lexeme, "123");
        assert_eq!(tokens[1].ty, Type::Dot);
    }

    #[test]
    fn test_multiline_string_counts_lines() {
        let mut scanner = Scanner::new();
        let tokens: Vec<Token> = scanner.scan_tokens("\"a\nb\"\nfoo").collect();

        assert_eq!(tokens[0].value, Literal::from("a\nb"));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 3);
        assert_eq!(tokens[2].ty, Type::Eof);
    }

    #[test]
    fn test_unterminated_string() {
        let source = "\"hello";
        let mut scanner = Scanner::new();
        let mut stream = scanner.scan_tokens(source);
        let tokens: Vec<Token> = stream.by_ref().collect();

        assert_eq!(stream.errors(), &[Error::UnterminatedString { line: 1 }]);
        assert_eq!(tokens[0].ty, Type::String);
        assert_eq!(tokens[0].value, Literal::from("hello"));
        assert_eq!(tokens[1].ty, Type::Eof);
    }

    #[test]
    fn test_unexpected_character_is_skipped() {
        let mut scanner = Scanner::new();
        let mut stream = scanner.scan_tokens("1 @\n# 2");
        let tokens: Vec<Type> = stream.by_ref().map(|token| token.ty).collect();

        assert_eq!(tokens, vec![Type::Number, Type::Number, Type::Eof]);
        assert_eq!(
            stream.take_errors(),
            vec![
                Error::UnexpectedCharacter { ch: '@', line: 1 },
                Error::UnexpectedCharacter { ch: '#', line: 2 },
            ]
        );
        assert!(stream.errors().is_empty());
    }

    #[test]
    fn test_indices_continue_across_sources() {
        let mut scanner = Scanner::new();
        let first: Vec<Token> = scanner.scan_tokens("a b").collect();
        let second: Vec<Token> = scanner.scan_tokens("c").collect();

        assert_eq!(first.last().unwrap().idx.0, 2);
        assert_eq!(second[0].idx.0, 3);
        assert_eq!(second[1].idx.0, 4);
    }
}
