//! Projection pruning: drops `SELECT_COL` / `BROADCAST` / `BROADCAST_F`
//! instructions whose `V` destination is never read anywhere else in
//! the program.

use std::collections::HashSet;

use crate::opcode::Opcode;
use crate::program::Program;

use super::meta::{self, Bank};

pub(super) fn run(program: &Program) -> Program {
    let mut live_v: HashSet<u8> = HashSet::new();
    for &instr in &program.code {
        if let Some(op) = instr.opcode() {
            for (bank, reg) in meta::effect(op, instr).sources {
                if bank == Bank::V {
                    live_v.insert(reg);
                }
            }
        }
    }

    let code = program
        .code
        .iter()
        .copied()
        .filter(|instr| match instr.opcode() {
            Some(Opcode::SelectCol) | Some(Opcode::Broadcast) | Some(Opcode::BroadcastF) => {
                live_v.contains(&instr.dst())
            }
            _ => true,
        })
        .collect();

    Program { code, constants: program.constants.clone(), float_constants: program.float_constants.clone() }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::encode_plain;

    #[test]
    fn unread_select_col_is_dropped() {
        let program = Program {
            code: vec![
                encode_plain(Opcode::NewFrame, 0, 0, 0, 0),
                encode_plain(Opcode::SelectCol, 0, 0, 0, 0),
                encode_plain(Opcode::Halt, 0, 0, 0, 0),
            ],
            constants: vec![],
            float_constants: vec![],
        };
        let pruned = run(&program);
        assert_eq!(pruned.code.len(), 2);
        assert_eq!(pruned.code[0].opcode(), Some(Opcode::NewFrame));
        assert_eq!(pruned.code[1].opcode(), Some(Opcode::Halt));
    }

    #[test]
    fn select_col_read_by_reduce_is_kept() {
        use crate::instruction::encode;
        let program = Program {
            code: vec![
                encode_plain(Opcode::NewFrame, 0, 0, 0, 0),
                encode_plain(Opcode::SelectCol, 0, 0, 0, 0),
                encode(Opcode::ReduceSum, 1, 0, 0, 0, 0),
                encode_plain(Opcode::Halt, 1, 0, 0, 0),
            ],
            constants: vec![],
            float_constants: vec![],
        };
        let pruned = run(&program);
        assert_eq!(pruned.code.len(), 4);
    }
}
