//! Turns assembly source into a flat token stream. One pass, no lookahead
//! beyond a single character of peek.

use crate::error::AsmError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bank {
    R,
    F,
    V,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Newline,
    Ident(String),
    Register(Bank, u8),
    Int(i64),
    Float(f64),
    Str(String),
    Comma,
    Colon,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub line: u32,
}

pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, AsmError> {
    let mut tokens = Vec::new();
    let mut line: u32 = 1;
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                chars.next();
                tokens.push(SpannedToken { token: Token::Newline, line });
                line += 1;
            }
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            ';' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ',' => {
                chars.next();
                tokens.push(SpannedToken { token: Token::Comma, line });
            }
            ':' => {
                chars.next();
                tokens.push(SpannedToken { token: Token::Colon, line });
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\n') | None => return Err(AsmError::UnexpectedToken { line }),
                        Some(c) => s.push(c),
                    }
                }
                tokens.push(SpannedToken { token: Token::Str(s), line });
            }
            c if c.is_ascii_digit() || ((c == '-' || c == '+') && starts_number(&chars)) => {
                let mut raw = String::new();
                raw.push(c);
                chars.next();
                let mut is_float = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        raw.push(c);
                        chars.next();
                    } else if c == '.' && !is_float {
                        is_float = true;
                        raw.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if is_float {
                    let v = raw.parse::<f64>().map_err(|_| AsmError::InvalidFloat { line })?;
                    tokens.push(SpannedToken { token: Token::Float(v), line });
                } else {
                    let v = raw.parse::<i64>().map_err(|_| AsmError::InvalidInteger { line })?;
                    tokens.push(SpannedToken { token: Token::Int(v), line });
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(SpannedToken { token: classify_ident(ident, line)?, line });
            }
            _ => return Err(AsmError::UnexpectedToken { line }),
        }
    }
    tokens.push(SpannedToken { token: Token::Newline, line });
    Ok(tokens)
}

/// `-`/`+` only starts a numeric literal when followed immediately by a digit;
/// otherwise it would collide with mnemonics (none start with `-` or `+`, but
/// this keeps the lexer honest about what it accepts).
fn starts_number(chars: &std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    let mut lookahead = chars.clone();
    lookahead.next();
    matches!(lookahead.peek(), Some(c) if c.is_ascii_digit())
}

fn classify_ident(ident: String, line: u32) -> Result<Token, AsmError> {
    let bank = match ident.chars().next() {
        Some('R') | Some('r') => Some(Bank::R),
        Some('F') | Some('f') => Some(Bank::F),
        Some('V') | Some('v') => Some(Bank::V),
        _ => None,
    };
    if let Some(bank) = bank {
        let rest = &ident[1..];
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            let n: u8 = rest.parse().map_err(|_| AsmError::BadRegister { line })?;
            return Ok(Token::Register(bank, n));
        }
    }
    Ok(Token::Ident(ident))
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens_only(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn splits_mnemonic_registers_and_literals() {
        let toks = tokens_only("ADD_R R2, R0, R1\n");
        assert_eq!(
            toks,
            vec![
                Token::Ident("ADD_R".into()),
                Token::Register(Bank::R, 2),
                Token::Comma,
                Token::Register(Bank::R, 0),
                Token::Comma,
                Token::Register(Bank::R, 1),
                Token::Newline,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn strings_and_comments_are_recognized() {
        let toks = tokens_only("LOAD_FRAME R0, \"sales\" ; predeclared\n");
        assert_eq!(
            toks,
            vec![
                Token::Ident("LOAD_FRAME".into()),
                Token::Register(Bank::R, 0),
                Token::Comma,
                Token::Str("sales".into()),
                Token::Newline,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn negative_and_float_literals() {
        let toks = tokens_only("LOAD_CONST R0, -5\nLOAD_CONST_F F0, 2.5\n");
        assert!(toks.contains(&Token::Int(-5)));
        assert!(toks.contains(&Token::Float(2.5)));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("LOAD_FRAME R0, \"sales\n").unwrap_err();
        assert_eq!(err.kind(), "unexpected-token");
    }

    #[test]
    fn blank_and_comment_only_lines_produce_no_real_tokens() {
        let toks = tokens_only("; just a comment\n\nHALT R0\n");
        assert_eq!(
            toks,
            vec![
                Token::Newline,
                Token::Newline,
                Token::Ident("HALT".into()),
                Token::Register(Bank::R, 0),
                Token::Newline,
                Token::Newline,
            ]
        );
    }
}
