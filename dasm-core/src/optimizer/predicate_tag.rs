//! Predicate tagging: identifies which `V` registers hold a boolean mask
//! at the end of the program. A pure analysis pass — it never reorders
//! or drops instructions; `mask_registers` is the read-only query
//! surface the rest of the pipeline (and callers) can consult.

use std::collections::HashSet;

use crate::opcode::Opcode;
use crate::program::Program;

pub(super) fn run(program: &Program) -> Program {
    program.clone()
}

/// The set of `V` registers known to hold a bool mask by the time
/// execution reaches the end of `program`. Comparisons and `AND`/`OR`/
/// `NOT` produce masks; any other write to the same register clears
/// the tag.
pub fn mask_registers(program: &Program) -> HashSet<u8> {
    let mut masks = HashSet::new();
    for &instr in &program.code {
        let Some(op) = instr.opcode() else { continue };
        match op {
            Opcode::CmpEq
            | Opcode::CmpNe
            | Opcode::CmpLt
            | Opcode::CmpLe
            | Opcode::CmpGt
            | Opcode::CmpGe
            | Opcode::And
            | Opcode::Or
            | Opcode::Not => {
                masks.insert(instr.dst());
            }
            _ if writes_v(op) => {
                masks.remove(&instr.dst());
            }
            _ => {}
        }
    }
    masks
}

fn writes_v(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::SelectCol
            | Opcode::Broadcast
            | Opcode::BroadcastF
            | Opcode::VecAddI
            | Opcode::VecSubI
            | Opcode::VecMulI
            | Opcode::VecDivI
            | Opcode::VecModI
            | Opcode::VecAddF
            | Opcode::VecSubF
            | Opcode::VecMulF
            | Opcode::VecDivF
            | Opcode::Filter
            | Opcode::Take
            | Opcode::GroupKeys
            | Opcode::GroupCount
            | Opcode::GroupSum
            | Opcode::GroupSumF
            | Opcode::GroupMin
            | Opcode::GroupMax
            | Opcode::GroupMinF
            | Opcode::GroupMaxF
            | Opcode::GroupMean
            | Opcode::StrLen
            | Opcode::StrUpper
            | Opcode::StrLower
            | Opcode::StrTrim
            | Opcode::StrConcat
            | Opcode::StrContains
            | Opcode::StrStartsWith
            | Opcode::StrEndsWith
            | Opcode::StrSplit
            | Opcode::StrReplace
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::encode;
    use crate::instruction::encode_plain;

    #[test]
    fn comparison_result_is_tagged_a_mask() {
        let program = Program {
            code: vec![
                encode_plain(Opcode::SelectCol, 0, 0, 0, 0),
                encode_plain(Opcode::SelectCol, 1, 0, 0, 0),
                encode(Opcode::CmpGt, 0, 2, 0, 1, 0),
            ],
            constants: vec![],
            float_constants: vec![],
        };
        assert!(mask_registers(&program).contains(&2));
    }

    #[test]
    fn overwriting_a_mask_register_with_an_arithmetic_result_clears_the_tag() {
        let program = Program {
            code: vec![
                encode_plain(Opcode::SelectCol, 0, 0, 0, 0),
                encode_plain(Opcode::SelectCol, 1, 0, 0, 0),
                encode(Opcode::CmpGt, 0, 2, 0, 1, 0),
                encode(Opcode::VecAddI, 0, 2, 0, 1, 0),
            ],
            constants: vec![],
            float_constants: vec![],
        };
        assert!(!mask_registers(&program).contains(&2));
    }

    #[test]
    fn run_never_changes_the_instruction_stream() {
        let program = Program {
            code: vec![encode_plain(Opcode::Halt, 0, 0, 0, 0)],
            constants: vec![],
            float_constants: vec![],
        };
        assert_eq!(run(&program), program);
    }
}
