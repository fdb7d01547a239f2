//! Renders a `Program` back to text: one `"NNNN: MNEMONIC <operands>"` line
//! per instruction.

use dasm_core::opcode::opcode_name;
use dasm_core::{Opcode, Program};

pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    for (i, instr) in program.code.iter().enumerate() {
        let opcode = instr.opcode();
        let mnemonic = opcode_name(opcode);
        let operands = opcode.map(|op| render_operands(op, instr, program)).unwrap_or_default();
        out.push_str(&format!("{:04}: {}{}\n", i, mnemonic, operands));
    }
    out
}

fn render_operands(op: Opcode, instr: &dasm_core::Instruction, program: &Program) -> String {
    use Opcode::*;

    let r = |n: u8| format!("R{n}");
    let f = |n: u8| format!("F{n}");
    let v = |n: u8| format!("V{n}");
    let k16 = |idx: u16| render_const(program, idx);
    let k8 = |idx: u8| render_const(program, idx as u16);

    let parts: Vec<String> = match op {
        LoadCsv | LoadJson | LoadParquet | LoadFrame | LoadConst => {
            vec![r(instr.dst()), k16(instr.imm16())]
        }
        LoadConstF => vec![f(instr.dst()), render_float(program, instr.imm16())],
        SelectCol => vec![v(instr.dst()), r(instr.src1()), k8(instr.imm8())],
        Broadcast => vec![v(instr.dst()), r(instr.src1()), v(instr.src2())],
        BroadcastF => vec![v(instr.dst()), f(instr.src1()), v(instr.src2())],

        VecAddI | VecSubI | VecMulI | VecDivI | VecModI | VecAddF | VecSubF | VecMulF
        | VecDivF | CmpEq | CmpNe | CmpLt | CmpLe | CmpGt | CmpGe | And | Or | Filter | Take
        | StrConcat => vec![v(instr.dst()), v(instr.src1()), v(instr.src2())],

        Not | StrLen | StrUpper | StrLower | StrTrim => vec![v(instr.dst()), v(instr.src1())],

        ReduceSum | ReduceCount | ReduceMin | ReduceMax => vec![r(instr.dst()), v(instr.src1())],
        ReduceSumF | ReduceMinF | ReduceMaxF | ReduceMean => vec![f(instr.dst()), v(instr.src1())],

        MoveR => vec![r(instr.dst()), r(instr.src1())],
        MoveF => vec![f(instr.dst()), f(instr.src1())],
        AddR | SubR | MulR | DivR => vec![r(instr.dst()), r(instr.src1()), r(instr.src2())],

        NewFrame => vec![r(instr.dst())],
        AddCol => vec![r(instr.dst()), v(instr.src1()), k8(instr.imm8())],
        RowCount | ColCount => vec![r(instr.dst()), r(instr.src1())],

        GroupBy => vec![r(instr.dst()), v(instr.src1())],
        GroupKeys | GroupCount => vec![v(instr.dst()), r(instr.src1())],
        GroupSum | GroupSumF | GroupMin | GroupMax | GroupMinF | GroupMaxF | GroupMean => {
            vec![v(instr.dst()), r(instr.src1()), v(instr.src2())]
        }

        JoinInner | JoinLeft | JoinRight | JoinOuter => {
            vec![r(instr.dst()), r(instr.src1()), r(instr.src2()), k8(instr.imm8())]
        }

        StrContains | StrStartsWith | StrEndsWith | StrSplit | StrReplace => {
            vec![v(instr.dst()), v(instr.src1()), k8(instr.imm8())]
        }

        Nop => vec![],
        Halt => vec![r(instr.dst())],
        HaltF => vec![f(instr.dst())],
        HaltV => vec![v(instr.dst())],
    };

    if parts.is_empty() {
        String::new()
    } else {
        format!(" {}", parts.join(", "))
    }
}

fn render_const(program: &Program, idx: u16) -> String {
    match program.constant(idx) {
        Some(dasm_core::Const::Int(v)) => v.to_string(),
        Some(dasm_core::Const::Str(s)) => format!("{s:?}"),
        None => format!("<const#{idx}>"),
    }
}

fn render_float(program: &Program, idx: u16) -> String {
    match program.float_constant(idx) {
        Some(v) => v.to_string(),
        None => format!("<fconst#{idx}>"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dasm_core::instruction::encode_plain;
    use dasm_core::ProgramBuilder;

    #[test]
    fn renders_indices_mnemonics_and_operands() {
        let mut builder = ProgramBuilder::new();
        let idx0 = builder.add_int_constant(10);
        let idx1 = builder.add_int_constant(5);
        builder.push(encode_plain(Opcode::LoadConst, 0, 0, 0, idx0));
        builder.push(encode_plain(Opcode::LoadConst, 1, 0, 0, idx1));
        builder.push(encode_plain(Opcode::AddR, 2, 0, 1, 0));
        builder.push(encode_plain(Opcode::Halt, 2, 0, 0, 0));
        let program = builder.build();

        let text = disassemble(&program);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0000: LOAD_CONST R0, 10");
        assert_eq!(lines[1], "0001: LOAD_CONST R1, 5");
        assert_eq!(lines[2], "0002: ADD_R R2, R0, R1");
        assert_eq!(lines[3], "0003: HALT R2");
    }

    #[test]
    fn string_constants_are_quoted() {
        let mut builder = ProgramBuilder::new();
        let idx = builder.add_str_constant("sales");
        builder.push(encode_plain(Opcode::LoadFrame, 0, 0, 0, idx));
        let program = builder.build();
        assert_eq!(disassemble(&program).trim(), "0000: LOAD_FRAME R0, \"sales\"");
    }

    #[test]
    fn unknown_opcode_byte_is_rendered_without_panicking() {
        let program = Program {
            code: vec![dasm_core::Instruction::from_u32(0xFF000000)],
            constants: vec![],
            float_constants: vec![],
        };
        assert_eq!(disassemble(&program).trim(), "0000: UNKNOWN");
    }
}
