//! Groups the token stream into one parsed instruction per logical line.

use crate::error::AsmError;
use crate::lexer::{Bank, SpannedToken, Token};

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Register(Bank, u8),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedInstruction {
    pub line: u32,
    pub mnemonic: String,
    pub operands: Vec<Operand>,
}

pub fn parse(tokens: &[SpannedToken]) -> Result<Vec<ParsedInstruction>, AsmError> {
    let mut instructions = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        if tokens[i].token == Token::Newline {
            i += 1;
            continue;
        }

        let line = tokens[i].line;
        let mnemonic = match &tokens[i].token {
            Token::Ident(name) => name.clone(),
            _ => return Err(AsmError::UnexpectedToken { line }),
        };
        i += 1;

        let mut operands = Vec::new();
        let mut expect_operand = true;
        loop {
            match tokens.get(i).map(|t| &t.token) {
                Some(Token::Newline) | None => {
                    if expect_operand && !operands.is_empty() {
                        return Err(AsmError::UnexpectedToken { line });
                    }
                    i += 1;
                    break;
                }
                Some(Token::Comma) => {
                    if expect_operand {
                        return Err(AsmError::UnexpectedToken { line });
                    }
                    expect_operand = true;
                    i += 1;
                }
                Some(_) if !expect_operand => return Err(AsmError::UnexpectedToken { line }),
                Some(Token::Register(bank, n)) => {
                    operands.push(Operand::Register(*bank, *n));
                    expect_operand = false;
                    i += 1;
                }
                Some(Token::Int(v)) => {
                    operands.push(Operand::Int(*v));
                    expect_operand = false;
                    i += 1;
                }
                Some(Token::Float(v)) => {
                    operands.push(Operand::Float(*v));
                    expect_operand = false;
                    i += 1;
                }
                Some(Token::Str(s)) => {
                    operands.push(Operand::Str(s.clone()));
                    expect_operand = false;
                    i += 1;
                }
                Some(Token::Ident(_)) | Some(Token::Colon) => {
                    return Err(AsmError::UnexpectedToken { line });
                }
            }
        }

        instructions.push(ParsedInstruction { line, mnemonic, operands });
    }

    Ok(instructions)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn parses_a_three_operand_instruction() {
        let tokens = tokenize("ADD_R R2, R0, R1\n").unwrap();
        let parsed = parse(&tokens).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].mnemonic, "ADD_R");
        assert_eq!(
            parsed[0].operands,
            vec![
                Operand::Register(Bank::R, 2),
                Operand::Register(Bank::R, 0),
                Operand::Register(Bank::R, 1),
            ]
        );
    }

    #[test]
    fn blank_lines_between_instructions_are_skipped() {
        let tokens = tokenize("NOP\n\n\nHALT R0\n").unwrap();
        let parsed = parse(&tokens).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].mnemonic, "NOP");
        assert_eq!(parsed[1].mnemonic, "HALT");
    }

    #[test]
    fn mixed_operand_kinds_parse_in_order() {
        let tokens = tokenize("ADD_COL R0, V1, \"price\"\n").unwrap();
        let parsed = parse(&tokens).unwrap();
        assert_eq!(
            parsed[0].operands,
            vec![
                Operand::Register(Bank::R, 0),
                Operand::Register(Bank::V, 1),
                Operand::Str("price".into()),
            ]
        );
    }

    #[test]
    fn a_trailing_comma_is_rejected() {
        let tokens = tokenize("ADD_R R2, R0,\n").unwrap();
        let err = parse(&tokens).unwrap_err();
        assert_eq!(err.kind(), "unexpected-token");
    }

    #[test]
    fn missing_comma_between_operands_is_rejected() {
        let tokens = tokenize("ADD_R R2 R0, R1\n").unwrap();
        let err = parse(&tokens).unwrap_err();
        assert_eq!(err.kind(), "unexpected-token");
    }
}
