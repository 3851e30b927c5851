use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Lexeme::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            if ch.is_ascii_digit() {
                return self.scan_number();
            }

            if let Some(tok) = self.scan_symbol(start) {
                return tok;
            }
            // scan_symbol returned None → error was recorded, try again
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            // Line comments
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'/'
            {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            // Block comments
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'*'
            {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos + 1 >= self.source.len() {
                        self.pos = self.source.len();
                        self.diagnostics.push(Diagnostic::error(
                            "unterminated block comment".to_string(),
                            Span::new(start as u32, self.pos as u32),
                        ));
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.source[self.pos + 1] == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }

            break;
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        let token = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        self.make_token(token, start, self.pos)
    }

    /// Scan an integer or float literal. Both produce `Lexeme::Number`;
    /// only integer semantics are carried through code generation.
    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos + 1 < self.source.len()
            && self.source[self.pos] == b'.'
            && self.source[self.pos + 1].is_ascii_digit()
        {
            self.pos += 1;
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        match text.parse::<f64>() {
            Ok(n) => self.make_token(Lexeme::Number(n), start, self.pos),
            Err(_) => {
                self.diagnostics.push(Diagnostic::error(
                    format!("malformed number literal '{}'", text),
                    Span::new(start as u32, self.pos as u32),
                ));
                self.make_token(Lexeme::Number(0.0), start, self.pos)
            }
        }
    }

    fn scan_symbol(&mut self, start: usize) -> Option<Spanned<Lexeme>> {
        let ch = self.source[self.pos];
        self.pos += 1;

        let token = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => Lexeme::LBrace,
            b'}' => Lexeme::RBrace,
            b';' => Lexeme::Semicolon,
            b',' => Lexeme::Comma,
            b'*' => Lexeme::Star,
            b'/' => Lexeme::Slash,
            b'+' => {
                if self.peek() == Some(b'+') {
                    self.pos += 1;
                    Lexeme::PlusPlus
                } else {
                    Lexeme::Plus
                }
            }
            b'-' => {
                if self.peek() == Some(b'-') {
                    self.pos += 1;
                    Lexeme::MinusMinus
                } else {
                    Lexeme::Minus
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::Le
                } else {
                    Lexeme::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::Ge
                } else {
                    Lexeme::Gt
                }
            }
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::EqEq
                } else {
                    Lexeme::Assign
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::Ne
                } else {
                    self.diagnostics.push(Diagnostic::error(
                        "unexpected '!'".to_string(),
                        Span::new(start as u32, self.pos as u32),
                    ));
                    return None;
                }
            }
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    format!("unexpected character '{}'", ch as char),
                    Span::new(start as u32, self.pos as u32),
                ));
                return None;
            }
        };

        Some(self.make_token(token, start, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Lexeme> {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "unexpected errors: {:?}", diags);
        tokens.into_iter().map(|t| t.node).collect()
    }

    #[test]
    fn test_keywords() {
        let tokens = lex("int float if else for");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Int,
                Lexeme::Float,
                Lexeme::If,
                Lexeme::Else,
                Lexeme::For,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_symbols() {
        let tokens = lex("( ) { } ; , = + - * / < <= > >= == != ++ --");
        assert_eq!(
            tokens,
            vec![
                Lexeme::LParen,
                Lexeme::RParen,
                Lexeme::LBrace,
                Lexeme::RBrace,
                Lexeme::Semicolon,
                Lexeme::Comma,
                Lexeme::Assign,
                Lexeme::Plus,
                Lexeme::Minus,
                Lexeme::Star,
                Lexeme::Slash,
                Lexeme::Lt,
                Lexeme::Le,
                Lexeme::Gt,
                Lexeme::Ge,
                Lexeme::EqEq,
                Lexeme::Ne,
                Lexeme::PlusPlus,
                Lexeme::MinusMinus,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("0 1 42 3.5");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Number(0.0),
                Lexeme::Number(1.0),
                Lexeme::Number(42.0),
                Lexeme::Number(3.5),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = lex("a var_1 _tmp forx");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("a".to_string()),
                Lexeme::Ident("var_1".to_string()),
                Lexeme::Ident("_tmp".to_string()),
                Lexeme::Ident("forx".to_string()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_increment_vs_plus() {
        let tokens = lex("i++ + j");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("i".to_string()),
                Lexeme::PlusPlus,
                Lexeme::Plus,
                Lexeme::Ident("j".to_string()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = lex("int a; // trailing\n/* block\n comment */ a = 1;");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Int,
                Lexeme::Ident("a".to_string()),
                Lexeme::Semicolon,
                Lexeme::Ident("a".to_string()),
                Lexeme::Assign,
                Lexeme::Number(1.0),
                Lexeme::Semicolon,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_spans() {
        let (tokens, diags) = Lexer::new("int abc;").tokenize();
        assert!(diags.is_empty());
        assert_eq!(tokens[0].span, Span::new(0, 3));
        assert_eq!(tokens[1].span, Span::new(4, 7));
        assert_eq!(tokens[2].span, Span::new(7, 8));
    }

    #[test]
    fn test_unknown_character_reported() {
        let (tokens, diags) = Lexer::new("int a @ ;").tokenize();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unexpected character"));
        // Lexing continues past the bad character
        let kinds: Vec<Lexeme> = tokens.into_iter().map(|t| t.node).collect();
        assert!(kinds.contains(&Lexeme::Semicolon));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (_, diags) = Lexer::new("int a; /* oops").tokenize();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unterminated"));
    }
}
