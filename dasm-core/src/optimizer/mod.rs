//! Bytecode-to-bytecode optimizer passes, applied in a fixed order:
//! constant folding, predicate tagging, projection pruning, then
//! dead-code elimination. Each pass only ever grows the constant pools
//! and never reorders instructions relative to one another.

mod const_fold;
mod dead_code;
mod meta;
mod predicate_tag;
mod projection_prune;

pub use predicate_tag::mask_registers;

use crate::program::Program;

pub fn optimize(program: &Program) -> Program {
    let program = const_fold::run(program);
    let program = predicate_tag::run(&program);
    let program = projection_prune::run(&program);
    dead_code::run(&program)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::{encode, encode_plain};
    use crate::opcode::Opcode;
    use crate::program::ProgramBuilder;
    use crate::vm::{ReturnValue, Vm};

    #[test]
    fn full_pipeline_folds_dead_loads_and_the_scalar_sum() {
        let mut builder = ProgramBuilder::new();
        let ten = builder.add_int_constant(10);
        let five = builder.add_int_constant(5);
        let unused = builder.add_int_constant(999);
        builder.push(encode_plain(Opcode::LoadConst, 0, 0, 0, ten));
        builder.push(encode_plain(Opcode::LoadConst, 1, 0, 0, five));
        builder.push(encode_plain(Opcode::LoadConst, 9, 0, 0, unused));
        builder.push(encode(Opcode::AddR, 0, 2, 0, 1, 0));
        builder.push(encode_plain(Opcode::Halt, 2, 0, 0, 0));
        let program = builder.build();

        let optimized = optimize(&program);
        // The unused LOAD_CONST into R9 is gone; the ADD_R folds to one LOAD_CONST.
        assert_eq!(optimized.code.len(), 2);

        let mut vm = Vm::new();
        vm.load(optimized);
        assert_eq!(vm.execute(), Ok(ReturnValue::Int(15)));
    }

    #[test]
    fn unread_select_col_does_not_survive_the_pipeline() {
        let program = crate::program::Program {
            code: vec![
                encode_plain(Opcode::NewFrame, 0, 0, 0, 0),
                encode_plain(Opcode::SelectCol, 0, 0, 0, 0),
                encode_plain(Opcode::Halt, 0, 0, 0, 0),
            ],
            constants: vec![],
            float_constants: vec![],
        };
        let optimized = optimize(&program);
        assert!(!optimized.code.iter().any(|i| i.opcode() == Some(Opcode::SelectCol)));
    }

    #[test]
    fn mask_registers_is_reachable_from_outside_the_module() {
        let program = crate::program::Program {
            code: vec![
                encode_plain(Opcode::SelectCol, 0, 0, 0, 0),
                encode_plain(Opcode::SelectCol, 1, 0, 0, 0),
                encode(Opcode::CmpEq, 0, 2, 0, 1, 0),
            ],
            constants: vec![],
            float_constants: vec![],
        };
        assert!(mask_registers(&program).contains(&2));
    }

    #[test]
    fn div_by_known_zero_still_errors_after_optimization() {
        let mut builder = ProgramBuilder::new();
        let zero = builder.add_int_constant(0);
        let one = builder.add_int_constant(1);
        builder.push(encode_plain(Opcode::LoadConst, 0, 0, 0, zero));
        builder.push(encode_plain(Opcode::LoadConst, 1, 0, 0, one));
        builder.push(encode(Opcode::DivR, 0, 2, 1, 0, 0));
        builder.push(encode_plain(Opcode::Halt, 2, 0, 0, 0));
        let optimized = optimize(&builder.build());
        let mut vm = Vm::new();
        vm.load(optimized);
        let err = vm.execute().unwrap_err();
        assert_eq!(err.kind(), "division-by-zero");
    }
}
