//! Maps one parsed instruction to an encoded [`Instruction`], validating
//! operand shapes per opcode family (spec-cross-reference: opcode catalog).

use dasm_core::instruction::encode_plain;
use dasm_core::{Instruction, Opcode, ProgramBuilder};

use crate::error::AsmError;
use crate::lexer::Bank;
use crate::parser::{Operand, ParsedInstruction};

pub fn compile_instruction(
    builder: &mut ProgramBuilder,
    parsed: &ParsedInstruction,
) -> Result<Instruction, AsmError> {
    let line = parsed.line;
    let canonical = parsed.mnemonic.to_ascii_uppercase();
    let op = Opcode::from_name(&canonical).ok_or_else(|| AsmError::UnknownOpcode {
        line,
        mnemonic: parsed.mnemonic.clone(),
    })?;
    let ops = &parsed.operands;

    use Opcode::*;
    match op {
        LoadCsv | LoadJson | LoadParquet | LoadFrame => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let path = expect_str(ops, 1, line)?;
            let idx = builder.add_str_constant(path);
            Ok(encode_plain(op, dst, 0, 0, idx))
        }

        LoadConst => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let value = expect_int(ops, 1, line)?;
            let idx = builder.add_int_constant(value);
            Ok(encode_plain(op, dst, 0, 0, idx))
        }

        LoadConstF => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::F, line)?;
            let value = expect_float(ops, 1, line)?;
            let idx = builder.add_float_constant(value);
            Ok(encode_plain(op, dst, 0, 0, idx))
        }

        SelectCol => {
            expect_count(ops, 3, line)?;
            let dst = expect_reg(ops, 0, Bank::V, line)?;
            let src1 = expect_reg(ops, 1, Bank::R, line)?;
            let name = expect_str(ops, 2, line)?;
            let idx = intern_imm8(builder, name, line)?;
            Ok(encode_plain(op, dst, src1, 0, idx as u16))
        }

        Broadcast => {
            expect_count(ops, 3, line)?;
            let dst = expect_reg(ops, 0, Bank::V, line)?;
            let src1 = expect_reg(ops, 1, Bank::R, line)?;
            let src2 = expect_reg(ops, 2, Bank::V, line)?;
            Ok(encode_plain(op, dst, src1, src2, 0))
        }

        BroadcastF => {
            expect_count(ops, 3, line)?;
            let dst = expect_reg(ops, 0, Bank::V, line)?;
            let src1 = expect_reg(ops, 1, Bank::F, line)?;
            let src2 = expect_reg(ops, 2, Bank::V, line)?;
            Ok(encode_plain(op, dst, src1, src2, 0))
        }

        VecAddI | VecSubI | VecMulI | VecDivI | VecModI | VecAddF | VecSubF | VecMulF
        | VecDivF | CmpEq | CmpNe | CmpLt | CmpLe | CmpGt | CmpGe | And | Or | Filter | Take
        | StrConcat => {
            expect_count(ops, 3, line)?;
            let dst = expect_reg(ops, 0, Bank::V, line)?;
            let src1 = expect_reg(ops, 1, Bank::V, line)?;
            let src2 = expect_reg(ops, 2, Bank::V, line)?;
            Ok(encode_plain(op, dst, src1, src2, 0))
        }

        Not | StrLen | StrUpper | StrLower | StrTrim => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::V, line)?;
            let src1 = expect_reg(ops, 1, Bank::V, line)?;
            Ok(encode_plain(op, dst, src1, 0, 0))
        }

        ReduceSum | ReduceCount | ReduceMin | ReduceMax => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let src1 = expect_reg(ops, 1, Bank::V, line)?;
            Ok(encode_plain(op, dst, src1, 0, 0))
        }

        ReduceSumF | ReduceMinF | ReduceMaxF | ReduceMean => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::F, line)?;
            let src1 = expect_reg(ops, 1, Bank::V, line)?;
            Ok(encode_plain(op, dst, src1, 0, 0))
        }

        MoveR => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let src1 = expect_reg(ops, 1, Bank::R, line)?;
            Ok(encode_plain(op, dst, src1, 0, 0))
        }

        MoveF => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::F, line)?;
            let src1 = expect_reg(ops, 1, Bank::F, line)?;
            Ok(encode_plain(op, dst, src1, 0, 0))
        }

        AddR | SubR | MulR | DivR => {
            expect_count(ops, 3, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let src1 = expect_reg(ops, 1, Bank::R, line)?;
            let src2 = expect_reg(ops, 2, Bank::R, line)?;
            Ok(encode_plain(op, dst, src1, src2, 0))
        }

        NewFrame => {
            expect_count(ops, 1, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            Ok(encode_plain(op, dst, 0, 0, 0))
        }

        AddCol => {
            expect_count(ops, 3, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let src1 = expect_reg(ops, 1, Bank::V, line)?;
            let name = expect_str(ops, 2, line)?;
            let idx = intern_imm8(builder, name, line)?;
            Ok(encode_plain(op, dst, src1, 0, idx as u16))
        }

        RowCount | ColCount => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let src1 = expect_reg(ops, 1, Bank::R, line)?;
            Ok(encode_plain(op, dst, src1, 0, 0))
        }

        GroupBy => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let src1 = expect_reg(ops, 1, Bank::V, line)?;
            Ok(encode_plain(op, dst, src1, 0, 0))
        }

        GroupKeys | GroupCount => {
            expect_count(ops, 2, line)?;
            let dst = expect_reg(ops, 0, Bank::V, line)?;
            let src1 = expect_reg(ops, 1, Bank::R, line)?;
            Ok(encode_plain(op, dst, src1, 0, 0))
        }

        GroupSum | GroupSumF | GroupMin | GroupMax | GroupMinF | GroupMaxF | GroupMean => {
            expect_count(ops, 3, line)?;
            let dst = expect_reg(ops, 0, Bank::V, line)?;
            let src1 = expect_reg(ops, 1, Bank::R, line)?;
            let src2 = expect_reg(ops, 2, Bank::V, line)?;
            Ok(encode_plain(op, dst, src1, src2, 0))
        }

        JoinInner | JoinLeft | JoinRight | JoinOuter => {
            expect_count(ops, 4, line)?;
            let dst = expect_reg(ops, 0, Bank::R, line)?;
            let src1 = expect_reg(ops, 1, Bank::R, line)?;
            let src2 = expect_reg(ops, 2, Bank::R, line)?;
            let key = expect_str(ops, 3, line)?;
            let idx = intern_imm8(builder, key, line)?;
            Ok(encode_plain(op, dst, src1, src2, idx as u16))
        }

        StrContains | StrStartsWith | StrEndsWith | StrSplit | StrReplace => {
            expect_count(ops, 3, line)?;
            let dst = expect_reg(ops, 0, Bank::V, line)?;
            let src1 = expect_reg(ops, 1, Bank::V, line)?;
            let pat = expect_str(ops, 2, line)?;
            let idx = intern_imm8(builder, pat, line)?;
            Ok(encode_plain(op, dst, src1, 0, idx as u16))
        }

        Nop => {
            expect_count(ops, 0, line)?;
            Ok(encode_plain(op, 0, 0, 0, 0))
        }

        Halt | HaltV => {
            expect_count(ops, 1, line)?;
            let bank = if op == Halt { Bank::R } else { Bank::V };
            let dst = expect_reg(ops, 0, bank, line)?;
            Ok(encode_plain(op, dst, 0, 0, 0))
        }

        HaltF => {
            expect_count(ops, 1, line)?;
            let dst = expect_reg(ops, 0, Bank::F, line)?;
            Ok(encode_plain(op, dst, 0, 0, 0))
        }
    }
}

fn intern_imm8(builder: &mut ProgramBuilder, value: &str, line: u32) -> Result<u8, AsmError> {
    let idx = builder.add_str_constant(value);
    if idx > u8::MAX as u16 {
        return Err(AsmError::ConstantIndexOverflow { line });
    }
    Ok(idx as u8)
}

fn expect_count(ops: &[Operand], expected: usize, line: u32) -> Result<(), AsmError> {
    if ops.len() != expected {
        return Err(AsmError::OperandCountMismatch { line, expected, found: ops.len() });
    }
    Ok(())
}

fn expect_reg(ops: &[Operand], index: usize, bank: Bank, line: u32) -> Result<u8, AsmError> {
    match ops.get(index) {
        Some(Operand::Register(b, n)) if *b == bank => Ok(*n),
        _ => Err(AsmError::OperandKindMismatch { line, expected: bank_name(bank) }),
    }
}

fn expect_int(ops: &[Operand], index: usize, line: u32) -> Result<i64, AsmError> {
    match ops.get(index) {
        Some(Operand::Int(v)) => Ok(*v),
        _ => Err(AsmError::OperandKindMismatch { line, expected: "an integer literal" }),
    }
}

fn expect_float(ops: &[Operand], index: usize, line: u32) -> Result<f64, AsmError> {
    match ops.get(index) {
        Some(Operand::Float(v)) => Ok(*v),
        Some(Operand::Int(v)) => Ok(*v as f64),
        _ => Err(AsmError::OperandKindMismatch { line, expected: "a float literal" }),
    }
}

fn expect_str<'a>(ops: &'a [Operand], index: usize, line: u32) -> Result<&'a str, AsmError> {
    match ops.get(index) {
        Some(Operand::Str(s)) => Ok(s.as_str()),
        _ => Err(AsmError::OperandKindMismatch { line, expected: "a string literal" }),
    }
}

fn bank_name(bank: Bank) -> &'static str {
    match bank {
        Bank::R => "an R register",
        Bank::F => "an F register",
        Bank::V => "a V register",
    }
}
