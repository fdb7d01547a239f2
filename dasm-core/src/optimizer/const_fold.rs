//! Constant folding: a linear scan tracking, per `R`/`F` index, whether
//! the register currently holds a known compile-time constant.

use std::collections::HashMap;

use crate::instruction::encode_plain;
use crate::opcode::Opcode;
use crate::program::{Const, Program, ProgramBuilder};

use super::meta::{self, Bank};

pub(super) fn run(program: &Program) -> Program {
    let mut builder = ProgramBuilder {
        code: Vec::new(),
        constants: program.constants.clone(),
        float_constants: program.float_constants.clone(),
    };
    let mut known_r: HashMap<u8, i64> = HashMap::new();
    let mut known_f: HashMap<u8, f64> = HashMap::new();

    for &instr in &program.code {
        let Some(op) = instr.opcode() else {
            builder.push(instr);
            continue;
        };

        match op {
            Opcode::LoadConst => {
                match program.constant(instr.imm16()) {
                    Some(Const::Int(v)) => {
                        known_r.insert(instr.dst(), *v);
                    }
                    _ => {
                        known_r.remove(&instr.dst());
                    }
                }
                builder.push(instr);
            }
            Opcode::LoadConstF => {
                match program.float_constant(instr.imm16()) {
                    Some(v) => {
                        known_f.insert(instr.dst(), v);
                    }
                    None => {
                        known_f.remove(&instr.dst());
                    }
                }
                builder.push(instr);
            }
            Opcode::MoveR => {
                match known_r.get(&instr.src1()).copied() {
                    Some(v) => {
                        known_r.insert(instr.dst(), v);
                    }
                    None => {
                        known_r.remove(&instr.dst());
                    }
                }
                builder.push(instr);
            }
            Opcode::MoveF => {
                match known_f.get(&instr.src1()).copied() {
                    Some(v) => {
                        known_f.insert(instr.dst(), v);
                    }
                    None => {
                        known_f.remove(&instr.dst());
                    }
                }
                builder.push(instr);
            }
            Opcode::AddR | Opcode::SubR | Opcode::MulR | Opcode::DivR => {
                let a = known_r.get(&instr.src1()).copied();
                let b = known_r.get(&instr.src2()).copied();
                if op == Opcode::DivR && b == Some(0) {
                    // Preserved verbatim; division by zero is a runtime error, not a fold.
                    known_r.remove(&instr.dst());
                    builder.push(instr);
                } else if let (Some(a), Some(b)) = (a, b) {
                    let result = match op {
                        Opcode::AddR => a.wrapping_add(b),
                        Opcode::SubR => a.wrapping_sub(b),
                        Opcode::MulR => a.wrapping_mul(b),
                        Opcode::DivR => a.wrapping_div(b),
                        _ => unreachable!(),
                    };
                    let idx = builder.add_int_constant(result);
                    known_r.insert(instr.dst(), result);
                    builder.push(encode_plain(Opcode::LoadConst, instr.dst(), 0, 0, idx));
                } else {
                    known_r.remove(&instr.dst());
                    builder.push(instr);
                }
            }
            _ => {
                if let Some((bank, reg)) = meta::effect(op, instr).dest {
                    match bank {
                        Bank::R => {
                            known_r.remove(&reg);
                        }
                        Bank::F => {
                            known_f.remove(&reg);
                        }
                        Bank::V => {}
                    }
                }
                builder.push(instr);
            }
        }
    }

    builder.build()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::encode;

    #[test]
    fn scalar_sum_folds_to_a_single_load_const() {
        let mut builder = ProgramBuilder::new();
        let ten = builder.add_int_constant(10);
        let five = builder.add_int_constant(5);
        builder.push(encode_plain(Opcode::LoadConst, 0, 0, 0, ten));
        builder.push(encode_plain(Opcode::LoadConst, 1, 0, 0, five));
        builder.push(encode(Opcode::AddR, 0, 2, 0, 1, 0));
        builder.push(encode_plain(Opcode::Halt, 2, 0, 0, 0));
        let folded = run(&builder.build());

        assert_eq!(folded.code.len(), 4);
        let last = folded.code[3];
        assert_eq!(last.opcode(), Some(Opcode::Halt));
        let add_result_load = folded.code[2];
        assert_eq!(add_result_load.opcode(), Some(Opcode::LoadConst));
        assert_eq!(folded.constant(add_result_load.imm16()), Some(&Const::Int(15)));
    }

    #[test]
    fn division_by_known_zero_is_not_folded() {
        let mut builder = ProgramBuilder::new();
        let zero = builder.add_int_constant(0);
        let one = builder.add_int_constant(1);
        builder.push(encode_plain(Opcode::LoadConst, 0, 0, 0, zero));
        builder.push(encode_plain(Opcode::LoadConst, 1, 0, 0, one));
        builder.push(encode(Opcode::DivR, 0, 2, 1, 0, 0));
        builder.push(encode_plain(Opcode::Halt, 2, 0, 0, 0));
        let folded = run(&builder.build());
        assert_eq!(folded.code[2].opcode(), Some(Opcode::DivR));
    }
}
