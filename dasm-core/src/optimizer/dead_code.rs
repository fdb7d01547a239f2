//! Dead-code elimination: backward liveness from the program's
//! terminating `HALT`/`HALT_F`/`HALT_V`, keeping only instructions whose
//! destination is ever read downstream (or that have a side effect that
//! must survive regardless, like `ADD_COL` or a join).

use std::collections::HashSet;

use crate::opcode::Opcode;
use crate::program::Program;

use super::meta::{self, Bank};

pub(super) fn run(program: &Program) -> Program {
    let Some(halt_idx) = program
        .code
        .iter()
        .position(|instr| matches!(instr.opcode(), Some(Opcode::Halt) | Some(Opcode::HaltF) | Some(Opcode::HaltV)))
    else {
        return program.clone();
    };

    let mut used_r: HashSet<u8> = HashSet::new();
    let mut used_f: HashSet<u8> = HashSet::new();
    let mut used_v: HashSet<u8> = HashSet::new();

    let halt_instr = program.code[halt_idx];
    let halt_op = halt_instr.opcode().expect("matched above");
    for (bank, reg) in meta::effect(halt_op, halt_instr).sources {
        match bank {
            Bank::R => {
                used_r.insert(reg);
            }
            Bank::F => {
                used_f.insert(reg);
            }
            Bank::V => {
                used_v.insert(reg);
            }
        }
    }

    let mut needed = vec![false; program.code.len()];
    needed[halt_idx] = true;

    for i in (0..halt_idx).rev() {
        let instr = program.code[i];
        let Some(op) = instr.opcode() else { continue };
        let eff = meta::effect(op, instr);

        let dst_is_used = eff.dest.is_some_and(|(bank, reg)| match bank {
            Bank::R => used_r.contains(&reg),
            Bank::F => used_f.contains(&reg),
            Bank::V => used_v.contains(&reg),
        });

        if eff.side_effect || dst_is_used {
            needed[i] = true;
            for (bank, reg) in eff.sources {
                match bank {
                    Bank::R => {
                        used_r.insert(reg);
                    }
                    Bank::F => {
                        used_f.insert(reg);
                    }
                    Bank::V => {
                        used_v.insert(reg);
                    }
                }
            }
        }
    }

    let code = program
        .code
        .iter()
        .enumerate()
        .filter(|(i, _)| needed[*i])
        .map(|(_, instr)| *instr)
        .collect();

    Program { code, constants: program.constants.clone(), float_constants: program.float_constants.clone() }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::encode_plain;

    #[test]
    fn unused_loads_before_the_halt_are_dropped() {
        let program = Program {
            code: vec![
                encode_plain(Opcode::LoadConst, 0, 0, 0, 0),
                encode_plain(Opcode::LoadConst, 1, 0, 0, 0),
                encode_plain(Opcode::LoadConst, 2, 0, 0, 0),
                encode_plain(Opcode::Halt, 0, 0, 0, 0),
            ],
            constants: vec![crate::program::Const::Int(42), crate::program::Const::Int(100), crate::program::Const::Int(200)],
            float_constants: vec![],
        };
        let trimmed = run(&program);
        assert_eq!(trimmed.code.len(), 2);
        assert_eq!(trimmed.code[0].opcode(), Some(Opcode::LoadConst));
        assert_eq!(trimmed.code[0].dst(), 0);
        assert_eq!(trimmed.code[1].opcode(), Some(Opcode::Halt));
    }

    #[test]
    fn nop_is_always_dropped() {
        let program = Program {
            code: vec![encode_plain(Opcode::Nop, 0, 0, 0, 0), encode_plain(Opcode::Halt, 0, 0, 0, 0)],
            constants: vec![],
            float_constants: vec![],
        };
        let trimmed = run(&program);
        assert_eq!(trimmed.code.len(), 1);
        assert_eq!(trimmed.code[0].opcode(), Some(Opcode::Halt));
    }

    #[test]
    fn add_col_survives_even_though_its_dst_field_is_unread() {
        use crate::instruction::encode;
        let program = Program {
            code: vec![
                encode_plain(Opcode::NewFrame, 0, 0, 0, 0),
                encode_plain(Opcode::SelectCol, 0, 0, 0, 0),
                encode(Opcode::AddCol, 0, 0, 0, 0, 0),
                encode_plain(Opcode::Halt, 0, 0, 0, 0),
            ],
            constants: vec![],
            float_constants: vec![],
        };
        let trimmed = run(&program);
        assert!(trimmed.code.iter().any(|i| i.opcode() == Some(Opcode::AddCol)));
    }

    #[test]
    fn program_without_a_halt_is_returned_unchanged() {
        let program = Program {
            code: vec![encode_plain(Opcode::LoadConst, 0, 0, 0, 0)],
            constants: vec![],
            float_constants: vec![],
        };
        assert_eq!(run(&program), program);
    }
}
