use crate::SceneError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String), // name, position, Node3D
    Number(f32),
    String(String),

    At,     // @
    Equals, // =
    Comma,  // ,
    LParen, // (
    RParen, // )

    LBracket, // [
    RBracket, // ]

    Slash, // /
    Eof,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    token_line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            token_line: 1,
        }
    }

    /// Line the most recently returned token started on.
    pub fn token_line(&self) -> usize {
        self.token_line
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, SceneError> {
        self.skip_ws_and_comments();
        self.token_line = self.line;

        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '@' => Token::At,
            '=' => Token::Equals,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '/' => Token::Slash,

            '"' => {
                let start_line = self.token_line;
                let mut s = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some('\\') => match self.bump() {
                            Some('n') => s.push('\n'),
                            Some(other) => s.push(other),
                            None => break,
                        },
                        Some(c) => s.push(c),
                        None => {
                            return Err(SceneError::new(start_line, "unterminated string"));
                        }
                    }
                }
                Token::String(s)
            }

            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let mut s = String::new();
                s.push(c);
                while let Some(p) = self.peek() {
                    let exponent_sign =
                        (p == '-' || p == '+') && matches!(s.chars().last(), Some('e' | 'E'));
                    if p.is_ascii_digit() || p == '.' || p == 'e' || p == 'E' || exponent_sign {
                        s.push(p);
                        self.bump();
                    } else {
                        break;
                    }
                }
                let value = s
                    .parse::<f32>()
                    .map_err(|_| SceneError::new(self.token_line, format!("invalid number `{s}`")))?;
                Token::Number(value)
            }

            c if c.is_alphanumeric() || c == '_' => {
                let mut s = String::new();
                s.push(c);
                while let Some(p) = self.peek() {
                    if p.is_alphanumeric() || p == '_' {
                        s.push(p);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Token::Ident(s)
            }

            other => {
                return Err(SceneError::new(
                    self.token_line,
                    format!("unexpected character `{other}`"),
                ));
            }
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().expect("lex failure");
            if token == Token::Eof {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn lexes_vector_with_negative_and_exponent() {
        assert_eq!(
            tokens("position = (-0.5, 2e-3, 10)"),
            vec![
                Token::Ident("position".into()),
                Token::Equals,
                Token::LParen,
                Token::Number(-0.5),
                Token::Comma,
                Token::Number(0.002),
                Token::Comma,
                Token::Number(10.0),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            tokens("# header\n[main] # trailing\n"),
            vec![
                Token::LBracket,
                Token::Ident("main".into()),
                Token::RBracket
            ]
        );
    }

    #[test]
    fn reports_unterminated_string_line() {
        let mut lexer = Lexer::new("\n\nname = \"Katana");
        assert_eq!(lexer.next_token(), Ok(Token::Ident("name".into())));
        assert_eq!(lexer.next_token(), Ok(Token::Equals));
        let err = lexer.next_token().expect_err("expected failure");
        assert_eq!(err.line, 3);
    }
}
