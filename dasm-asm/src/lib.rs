//! Textual assembler and disassembler for DASM bytecode: a hand-written
//! lexer, parser and compiler (no grammar/parser-combinator dependency).

mod compiler;
mod disassembler;
mod error;
mod lexer;
mod parser;

use dasm_core::{Program, ProgramBuilder};

pub use error::AsmError;
pub use lexer::{Bank, Token};
pub use parser::{Operand, ParsedInstruction};

/// Assembles complete source text into a `Program`: tokenize, parse one
/// instruction per line, then compile each into the constant-pool-backed
/// instruction stream.
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    let tokens = lexer::tokenize(source)?;
    let instructions = parser::parse(&tokens)?;

    let mut builder = ProgramBuilder::new();
    for parsed in &instructions {
        let instr = compiler::compile_instruction(&mut builder, parsed)?;
        builder.push(instr);
    }
    Ok(builder.build())
}

pub fn disassemble(program: &Program) -> String {
    disassembler::disassemble(program)
}

#[cfg(test)]
mod test {
    use super::*;
    use dasm_core::vm::{ReturnValue, Vm};

    #[test]
    fn assembles_the_scalar_sum_scenario() {
        let source = "\
            LOAD_CONST R0, 10\n\
            LOAD_CONST R1, 5\n\
            ADD_R R2, R0, R1\n\
            HALT R2\n\
        ";
        let program = assemble(source).unwrap();
        let mut vm = Vm::new();
        vm.load(program);
        assert_eq!(vm.execute(), Ok(ReturnValue::Int(15)));
    }

    #[test]
    fn assemble_then_disassemble_reproduces_the_same_encoded_words() {
        let source = "LOAD_CONST R0, 10\nLOAD_CONST R1, 5\nADD_R R2, R0, R1\nHALT R2\n";
        let program = assemble(source).unwrap();
        let text = disassemble(&program);
        let reassembled = assemble(&text).unwrap();
        assert_eq!(program.code, reassembled.code);
    }

    #[test]
    fn unknown_mnemonic_surfaces_the_source_line() {
        let err = assemble("NOP\nBOGUS R0\n").unwrap_err();
        assert_eq!(err.kind(), "unknown-opcode");
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn empty_source_assembles_to_an_empty_program() {
        let program = assemble("").unwrap();
        assert!(program.code.is_empty());
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let source = "; header comment\n\nNOP ; trailing comment\n\nHALT R0\n";
        let program = assemble(source).unwrap();
        assert_eq!(program.code.len(), 2);
    }
}
