//! Per-opcode register-effect metadata used by the liveness-based passes
//! (projection pruning, dead-code elimination). Not used by the VM
//! itself — the VM dispatch table already encodes bank choice directly.

use crate::instruction::Instruction;
use crate::opcode::Opcode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) enum Bank {
    R,
    F,
    V,
}

/// `dest` is the register this instruction writes, if any. `sources` are
/// every register this instruction reads (including tricky cases where a
/// "dst"-named bit field is actually a read, as with `ADD_COL`'s frame
/// register and every `HALT*`). `side_effect` marks instructions that
/// dead-code elimination must always keep regardless of dst liveness.
pub(super) struct RegEffect {
    pub dest: Option<(Bank, u8)>,
    pub sources: Vec<(Bank, u8)>,
    pub side_effect: bool,
}

pub(super) fn effect(op: Opcode, instr: Instruction) -> RegEffect {
    use Bank::*;
    let dst = instr.dst();
    let src1 = instr.src1();
    let src2 = instr.src2();

    let plain = |dest, sources| RegEffect { dest, sources, side_effect: false };

    match op {
        Opcode::LoadCsv | Opcode::LoadJson | Opcode::LoadParquet | Opcode::LoadFrame | Opcode::LoadConst => {
            plain(Some((R, dst)), vec![])
        }
        Opcode::LoadConstF => plain(Some((F, dst)), vec![]),
        Opcode::SelectCol => plain(Some((V, dst)), vec![(R, src1)]),
        Opcode::Broadcast => plain(Some((V, dst)), vec![(R, src1), (V, src2)]),
        Opcode::BroadcastF => plain(Some((V, dst)), vec![(F, src1), (V, src2)]),

        Opcode::VecAddI
        | Opcode::VecSubI
        | Opcode::VecMulI
        | Opcode::VecDivI
        | Opcode::VecModI
        | Opcode::VecAddF
        | Opcode::VecSubF
        | Opcode::VecMulF
        | Opcode::VecDivF
        | Opcode::CmpEq
        | Opcode::CmpNe
        | Opcode::CmpLt
        | Opcode::CmpLe
        | Opcode::CmpGt
        | Opcode::CmpGe
        | Opcode::And
        | Opcode::Or
        | Opcode::Filter
        | Opcode::Take
        | Opcode::StrConcat => plain(Some((V, dst)), vec![(V, src1), (V, src2)]),

        Opcode::Not
        | Opcode::StrLen
        | Opcode::StrUpper
        | Opcode::StrLower
        | Opcode::StrTrim
        | Opcode::StrContains
        | Opcode::StrStartsWith
        | Opcode::StrEndsWith
        | Opcode::StrSplit
        | Opcode::StrReplace => plain(Some((V, dst)), vec![(V, src1)]),

        Opcode::ReduceSum | Opcode::ReduceCount | Opcode::ReduceMin | Opcode::ReduceMax => {
            plain(Some((R, dst)), vec![(V, src1)])
        }
        Opcode::ReduceSumF | Opcode::ReduceMinF | Opcode::ReduceMaxF | Opcode::ReduceMean => {
            plain(Some((F, dst)), vec![(V, src1)])
        }

        Opcode::MoveR => plain(Some((R, dst)), vec![(R, src1)]),
        Opcode::MoveF => plain(Some((F, dst)), vec![(F, src1)]),
        Opcode::AddR | Opcode::SubR | Opcode::MulR | Opcode::DivR => {
            plain(Some((R, dst)), vec![(R, src1), (R, src2)])
        }

        Opcode::NewFrame => plain(Some((R, dst)), vec![]),
        Opcode::AddCol => {
            RegEffect { dest: None, sources: vec![(R, dst), (V, src1)], side_effect: true }
        }
        Opcode::RowCount | Opcode::ColCount => plain(Some((R, dst)), vec![(R, src1)]),

        Opcode::GroupBy => plain(Some((R, dst)), vec![(V, src1)]),
        Opcode::GroupKeys | Opcode::GroupCount => plain(Some((V, dst)), vec![(R, src1)]),
        Opcode::GroupSum
        | Opcode::GroupSumF
        | Opcode::GroupMin
        | Opcode::GroupMax
        | Opcode::GroupMinF
        | Opcode::GroupMaxF
        | Opcode::GroupMean => plain(Some((V, dst)), vec![(R, src1), (V, src2)]),

        Opcode::JoinInner | Opcode::JoinLeft | Opcode::JoinRight | Opcode::JoinOuter => {
            RegEffect { dest: Some((R, dst)), sources: vec![(R, src1), (R, src2)], side_effect: true }
        }

        Opcode::Nop => plain(None, vec![]),
        Opcode::Halt => plain(None, vec![(R, dst)]),
        Opcode::HaltF => plain(None, vec![(F, dst)]),
        Opcode::HaltV => plain(None, vec![(V, dst)]),
    }
}
