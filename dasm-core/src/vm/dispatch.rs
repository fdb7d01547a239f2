//! Per-opcode execution. One function per opcode family; `execute_one` is
//! the exhaustive match the decode loop in `vm::mod` calls into.

use std::cmp::Ordering;

use super::{ReturnValue, StepOutcome, Vm};
use crate::error::DasmError;
use crate::frame::Frame;
use crate::groupby::GroupByResult;
use crate::instruction::Instruction;
use crate::join::{self, JoinMode};
use crate::opcode::Opcode;
use crate::program::Const;
use crate::series::{Column, ColumnData, ColumnKind};

pub(super) fn execute_one(vm: &mut Vm, op: Opcode, instr: Instruction) -> Result<StepOutcome, DasmError> {
    match op {
        Opcode::LoadCsv => load_file(vm, instr, "csv"),
        Opcode::LoadJson => load_file(vm, instr, "json"),
        Opcode::LoadParquet => load_file(vm, instr, "parquet"),
        Opcode::LoadFrame => load_frame(vm, instr),
        Opcode::LoadConst => load_const(vm, instr),
        Opcode::LoadConstF => load_const_f(vm, instr),
        Opcode::SelectCol => select_col(vm, instr),
        Opcode::Broadcast => broadcast(vm, instr, false),
        Opcode::BroadcastF => broadcast(vm, instr, true),

        Opcode::VecAddI => vec_arith_i(vm, instr, IntOp::Add),
        Opcode::VecSubI => vec_arith_i(vm, instr, IntOp::Sub),
        Opcode::VecMulI => vec_arith_i(vm, instr, IntOp::Mul),
        Opcode::VecDivI => vec_arith_i(vm, instr, IntOp::Div),
        Opcode::VecModI => vec_arith_i(vm, instr, IntOp::Mod),
        Opcode::VecAddF => vec_arith_f(vm, instr, FloatOp::Add),
        Opcode::VecSubF => vec_arith_f(vm, instr, FloatOp::Sub),
        Opcode::VecMulF => vec_arith_f(vm, instr, FloatOp::Mul),
        Opcode::VecDivF => vec_arith_f(vm, instr, FloatOp::Div),

        Opcode::CmpEq => vec_cmp(vm, instr, CmpOp::Eq),
        Opcode::CmpNe => vec_cmp(vm, instr, CmpOp::Ne),
        Opcode::CmpLt => vec_cmp(vm, instr, CmpOp::Lt),
        Opcode::CmpLe => vec_cmp(vm, instr, CmpOp::Le),
        Opcode::CmpGt => vec_cmp(vm, instr, CmpOp::Gt),
        Opcode::CmpGe => vec_cmp(vm, instr, CmpOp::Ge),

        Opcode::And => logical_and_or(vm, instr, true),
        Opcode::Or => logical_and_or(vm, instr, false),
        Opcode::Not => logical_not(vm, instr),

        Opcode::Filter => filter(vm, instr),
        Opcode::Take => take(vm, instr),

        Opcode::ReduceSum => reduce_sum_i(vm, instr),
        Opcode::ReduceSumF => reduce_sum_f(vm, instr),
        Opcode::ReduceCount => reduce_count(vm, instr),
        Opcode::ReduceMin => reduce_min_max_i(vm, instr, true),
        Opcode::ReduceMax => reduce_min_max_i(vm, instr, false),
        Opcode::ReduceMinF => reduce_min_max_f(vm, instr, true),
        Opcode::ReduceMaxF => reduce_min_max_f(vm, instr, false),
        Opcode::ReduceMean => reduce_mean(vm, instr),

        Opcode::MoveR => move_r(vm, instr),
        Opcode::MoveF => move_f(vm, instr),
        Opcode::AddR => scalar_arith(vm, instr, ScalarOp::Add),
        Opcode::SubR => scalar_arith(vm, instr, ScalarOp::Sub),
        Opcode::MulR => scalar_arith(vm, instr, ScalarOp::Mul),
        Opcode::DivR => scalar_arith(vm, instr, ScalarOp::Div),

        Opcode::NewFrame => new_frame(vm, instr),
        Opcode::AddCol => add_col(vm, instr),
        Opcode::RowCount => row_count(vm, instr),
        Opcode::ColCount => col_count(vm, instr),

        Opcode::GroupBy => group_by(vm, instr),
        Opcode::GroupKeys => group_keys(vm, instr),
        Opcode::GroupCount => group_count(vm, instr),
        Opcode::GroupSum => group_fold(vm, instr, GroupAgg::Sum, false),
        Opcode::GroupSumF => group_fold(vm, instr, GroupAgg::Sum, true),
        Opcode::GroupMin => group_fold(vm, instr, GroupAgg::Min, false),
        Opcode::GroupMax => group_fold(vm, instr, GroupAgg::Max, false),
        Opcode::GroupMinF => group_fold(vm, instr, GroupAgg::Min, true),
        Opcode::GroupMaxF => group_fold(vm, instr, GroupAgg::Max, true),
        Opcode::GroupMean => group_fold(vm, instr, GroupAgg::Mean, true),

        Opcode::JoinInner => join_op(vm, instr, JoinMode::Inner),
        Opcode::JoinLeft => join_op(vm, instr, JoinMode::Left),
        Opcode::JoinRight => join_op(vm, instr, JoinMode::Right),
        Opcode::JoinOuter => join_op(vm, instr, JoinMode::Outer),

        Opcode::StrLen => str_len(vm, instr),
        Opcode::StrUpper => str_case(vm, instr, StrCase::Upper),
        Opcode::StrLower => str_case(vm, instr, StrCase::Lower),
        Opcode::StrTrim => str_trim(vm, instr),
        Opcode::StrConcat => str_concat(vm, instr),
        Opcode::StrContains => str_pred(vm, instr, StrPred::Contains),
        Opcode::StrStartsWith => str_pred(vm, instr, StrPred::StartsWith),
        Opcode::StrEndsWith => str_pred(vm, instr, StrPred::EndsWith),
        Opcode::StrSplit => str_split(vm, instr),
        Opcode::StrReplace => str_replace(vm, instr),

        Opcode::Nop => Ok(StepOutcome::Continue),
        Opcode::Halt => Ok(StepOutcome::Halt(ReturnValue::Int(vm.regs.r(instr.dst())))),
        Opcode::HaltF => Ok(StepOutcome::Halt(ReturnValue::Float(vm.regs.f(instr.dst())))),
        Opcode::HaltV => {
            let column = vm.regs.v(instr.dst()).cloned().unwrap_or_else(|| Column::int64("", Vec::new()));
            Ok(StepOutcome::Halt(ReturnValue::Column(column)))
        }
    }
}

// --- constant pool helpers ---------------------------------------------

fn const_ref(vm: &Vm, idx: u16) -> Result<&Const, DasmError> {
    vm.program.as_ref().unwrap().constant(idx).ok_or(DasmError::ConstantOutOfRange(idx))
}

fn const_str(vm: &Vm, idx: u16) -> Result<String, DasmError> {
    const_ref(vm, idx)?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| DasmError::TypeMismatch("expected string constant".into()))
}

fn const_int(vm: &Vm, idx: u16) -> Result<i64, DasmError> {
    const_ref(vm, idx)?.as_int().ok_or_else(|| DasmError::TypeMismatch("expected int constant".into()))
}

fn float_const(vm: &Vm, idx: u16) -> Result<f64, DasmError> {
    vm.program.as_ref().unwrap().float_constant(idx).ok_or(DasmError::ConstantOutOfRange(idx))
}

// --- loading -------------------------------------------------------------

fn load_file(vm: &mut Vm, instr: Instruction, format: &'static str) -> Result<StepOutcome, DasmError> {
    let dst = instr.dst();
    let path = const_str(vm, instr.imm16())?;
    if !vm.sandbox.allows(&path) {
        return Err(DasmError::FileAccessDenied(path));
    }
    let frame = match format {
        "csv" => vm.loader.load_csv(&path)?,
        "json" => vm.loader.load_json(&path)?,
        "parquet" => vm.loader.load_parquet(&path)?,
        _ => unreachable!("unknown load format"),
    };
    for column in frame.columns() {
        vm.account_column(column)?;
    }
    if let Some(stats) = &mut vm.stats {
        stats.frames_loaded += 1;
    }
    vm.regs.set_frame(dst, frame);
    vm.regs.set_r(dst, dst as i64);
    Ok(StepOutcome::Continue)
}

fn load_frame(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let dst = instr.dst();
    let name = const_str(vm, instr.imm16())?;
    let frame = vm.predeclared.get(&name).cloned().ok_or(DasmError::FrameNotFound(name))?;
    for column in frame.columns() {
        vm.account_column(column)?;
    }
    vm.regs.set_frame(dst, frame);
    vm.regs.set_r(dst, dst as i64);
    Ok(StepOutcome::Continue)
}

fn load_const(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let value = const_int(vm, instr.imm16())?;
    vm.regs.set_r(instr.dst(), value);
    Ok(StepOutcome::Continue)
}

fn load_const_f(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let value = float_const(vm, instr.imm16())?;
    vm.regs.set_f(instr.dst(), value);
    Ok(StepOutcome::Continue)
}

fn select_col(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let name = const_str(vm, instr.imm8() as u16)?;
    let handle = vm.regs.r(instr.src1()) as u8;
    let frame = vm.regs.frame(handle).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", instr.src1())))?;
    let column = frame.column(&name).ok_or_else(|| DasmError::ColumnNotFound(name))?.clone_column();
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

fn broadcast(vm: &mut Vm, instr: Instruction, is_float: bool) -> Result<StepOutcome, DasmError> {
    let len = vm.regs.v(instr.src2()).map_or(0, |c| c.length());
    let data = if is_float {
        let value = vm.regs.f(instr.src1());
        ColumnData::Float64(vec![Some(value); len])
    } else {
        let value = vm.regs.r(instr.src1());
        ColumnData::Int64(vec![Some(value); len])
    };
    let column = Column::new("broadcast", data);
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

// --- vector arithmetic ----------------------------------------------------

#[derive(Clone, Copy)]
enum IntOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

fn apply_int_op(op: IntOp, a: i64, b: i64) -> Result<i64, DasmError> {
    match op {
        IntOp::Add => Ok(a.wrapping_add(b)),
        IntOp::Sub => Ok(a.wrapping_sub(b)),
        IntOp::Mul => Ok(a.wrapping_mul(b)),
        IntOp::Div => {
            if b == 0 {
                return Err(DasmError::DivisionByZero);
            }
            Ok(a.wrapping_div(b))
        }
        IntOp::Mod => {
            if b == 0 {
                return Err(DasmError::DivisionByZero);
            }
            Ok(a.wrapping_rem(b))
        }
    }
}

fn vec_arith_i(vm: &mut Vm, instr: Instruction, op: IntOp) -> Result<StepOutcome, DasmError> {
    let empty = Column::int64("", Vec::new());
    let lhs = vm.regs.v(instr.src1()).unwrap_or(&empty).clone_column();
    let rhs = vm.regs.v(instr.src2()).unwrap_or(&empty).clone_column();
    let mut out = Vec::with_capacity(lhs.length());
    for i in 0..lhs.length() {
        let cell = match (lhs.get_i64(i), rhs.get_i64(i)) {
            (Some(a), Some(b)) => Some(apply_int_op(op, a, b)?),
            _ => None,
        };
        out.push(cell);
    }
    let column = Column::build_from_values(&lhs, ColumnData::Int64(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

#[derive(Clone, Copy)]
enum FloatOp {
    Add,
    Sub,
    Mul,
    Div,
}

fn vec_arith_f(vm: &mut Vm, instr: Instruction, op: FloatOp) -> Result<StepOutcome, DasmError> {
    let empty = Column::float64("", Vec::new());
    let lhs = vm.regs.v(instr.src1()).unwrap_or(&empty).clone_column();
    let rhs = vm.regs.v(instr.src2()).unwrap_or(&empty).clone_column();
    let mut out = Vec::with_capacity(lhs.length());
    for i in 0..lhs.length() {
        let cell = match (lhs.get_f64(i), rhs.get_f64(i)) {
            (Some(a), Some(b)) => Some(match op {
                FloatOp::Add => a + b,
                FloatOp::Sub => a - b,
                FloatOp::Mul => a * b,
                // IEEE-754 division: b == 0.0 yields +/-Inf rather than an error.
                FloatOp::Div => a / b,
            }),
            _ => None,
        };
        out.push(cell);
    }
    let column = Column::build_from_values(&lhs, ColumnData::Float64(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

// --- comparison ------------------------------------------------------------

#[derive(Clone, Copy)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn cmp_row(lhs: &Column, rhs: &Column, i: usize) -> Option<Ordering> {
    match (lhs.kind(), rhs.kind()) {
        (ColumnKind::Str, ColumnKind::Str) => match (lhs.get_str(i), rhs.get_str(i)) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => None,
        },
        (ColumnKind::Bool, ColumnKind::Bool) => match (lhs.get_bool(i), rhs.get_bool(i)) {
            (Some(a), Some(b)) => Some((a as u8).cmp(&(b as u8))),
            _ => None,
        },
        _ => match (lhs.get_f64(i), rhs.get_f64(i)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

fn vec_cmp(vm: &mut Vm, instr: Instruction, op: CmpOp) -> Result<StepOutcome, DasmError> {
    let empty = Column::int64("", Vec::new());
    let lhs = vm.regs.v(instr.src1()).unwrap_or(&empty).clone_column();
    let rhs = vm.regs.v(instr.src2()).unwrap_or(&empty).clone_column();
    let out: Vec<Option<bool>> = (0..lhs.length())
        .map(|i| {
            cmp_row(&lhs, &rhs, i).map(|ord| match op {
                CmpOp::Eq => ord == Ordering::Equal,
                CmpOp::Ne => ord != Ordering::Equal,
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Le => ord != Ordering::Greater,
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::Ge => ord != Ordering::Less,
            })
        })
        .collect();
    let column = Column::new(lhs.name().to_owned(), ColumnData::Bool(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

// --- logical -----------------------------------------------------------

fn require_bool(vm: &Vm, reg: u8) -> Result<Column, DasmError> {
    match vm.regs.v(reg) {
        Some(col) if col.kind() == ColumnKind::Bool => Ok(col.clone_column()),
        Some(col) => Err(DasmError::TypeMismatch(format!("expected bool column, found {:?}", col.kind()))),
        None => Ok(Column::bool("", Vec::new())),
    }
}

fn logical_and_or(vm: &mut Vm, instr: Instruction, is_and: bool) -> Result<StepOutcome, DasmError> {
    let lhs = require_bool(vm, instr.src1())?;
    let rhs = require_bool(vm, instr.src2())?;
    let out: Vec<Option<bool>> = (0..lhs.length())
        .map(|i| match (lhs.get_bool(i), rhs.get_bool(i)) {
            (Some(a), Some(b)) => Some(if is_and { a && b } else { a || b }),
            _ => None,
        })
        .collect();
    let column = Column::build_from_values(&lhs, ColumnData::Bool(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

fn logical_not(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let src = require_bool(vm, instr.src1())?;
    let out: Vec<Option<bool>> = (0..src.length()).map(|i| src.get_bool(i).map(|b| !b)).collect();
    let column = Column::build_from_values(&src, ColumnData::Bool(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

// --- row selection -------------------------------------------------------

fn filter(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let data = vm.regs.v(instr.src1()).cloned().unwrap_or_else(|| Column::int64("", Vec::new()));
    let mask_col = require_bool(vm, instr.src2())?;
    let mask = mask_col.as_mask()?;
    let column = data.filter_by_bitmap(&mask);
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

fn take(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let data = vm.regs.v(instr.src1()).cloned().unwrap_or_else(|| Column::int64("", Vec::new()));
    let indices_col = vm.regs.v(instr.src2()).cloned().unwrap_or_else(|| Column::int64("", Vec::new()));
    let indices: Vec<i64> = (0..indices_col.length()).map(|i| indices_col.get_i64(i).unwrap_or(-1)).collect();
    let column = data.take(&indices);
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

// --- reductions ------------------------------------------------------------

fn reduce_sum_i(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let sum = vm
        .regs
        .v(instr.src1())
        .map_or(0, |c| (0..c.length()).filter_map(|i| c.get_i64(i)).fold(0i64, i64::wrapping_add));
    vm.regs.set_r(instr.dst(), sum);
    Ok(StepOutcome::Continue)
}

fn reduce_sum_f(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let sum = vm.regs.v(instr.src1()).map_or(0.0, |c| (0..c.length()).filter_map(|i| c.get_f64(i)).sum());
    vm.regs.set_f(instr.dst(), sum);
    Ok(StepOutcome::Continue)
}

fn reduce_count(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let count = match vm.regs.v(instr.src1()) {
        Some(col) if col.kind() == ColumnKind::Bool => {
            (0..col.length()).filter(|&i| col.get_bool(i) == Some(true)).count()
        }
        Some(col) => (0..col.length()).filter(|&i| !col.is_null(i)).count(),
        None => 0,
    };
    vm.regs.set_r(instr.dst(), count as i64);
    Ok(StepOutcome::Continue)
}

fn fold_extreme<T: Copy>(values: impl Iterator<Item = T>, want_min: bool, less: impl Fn(T, T) -> bool) -> Option<T> {
    values.fold(None, |acc, v| match acc {
        None => Some(v),
        Some(cur) if want_min && less(v, cur) => Some(v),
        Some(cur) if !want_min && less(cur, v) => Some(v),
        Some(cur) => Some(cur),
    })
}

fn reduce_min_max_i(vm: &mut Vm, instr: Instruction, want_min: bool) -> Result<StepOutcome, DasmError> {
    let best = vm
        .regs
        .v(instr.src1())
        .and_then(|col| fold_extreme((0..col.length()).filter_map(|i| col.get_i64(i)), want_min, |a, b| a < b));
    vm.regs.set_r(instr.dst(), best.unwrap_or(0));
    Ok(StepOutcome::Continue)
}

fn reduce_min_max_f(vm: &mut Vm, instr: Instruction, want_min: bool) -> Result<StepOutcome, DasmError> {
    let best = vm
        .regs
        .v(instr.src1())
        .and_then(|col| fold_extreme((0..col.length()).filter_map(|i| col.get_f64(i)), want_min, |a, b| a < b));
    vm.regs.set_f(instr.dst(), best.unwrap_or(0.0));
    Ok(StepOutcome::Continue)
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn reduce_mean(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let mean = vm.regs.v(instr.src1()).map_or(0.0, |col| mean_of((0..col.length()).filter_map(|i| col.get_f64(i))));
    vm.regs.set_f(instr.dst(), mean);
    Ok(StepOutcome::Continue)
}

// --- scalar arithmetic / move --------------------------------------------

fn move_r(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    vm.regs.set_r(instr.dst(), vm.regs.r(instr.src1()));
    Ok(StepOutcome::Continue)
}

fn move_f(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    vm.regs.set_f(instr.dst(), vm.regs.f(instr.src1()));
    Ok(StepOutcome::Continue)
}

#[derive(Clone, Copy)]
enum ScalarOp {
    Add,
    Sub,
    Mul,
    Div,
}

fn scalar_arith(vm: &mut Vm, instr: Instruction, op: ScalarOp) -> Result<StepOutcome, DasmError> {
    let a = vm.regs.r(instr.src1());
    let b = vm.regs.r(instr.src2());
    let result = match op {
        ScalarOp::Add => a.wrapping_add(b),
        ScalarOp::Sub => a.wrapping_sub(b),
        ScalarOp::Mul => a.wrapping_mul(b),
        ScalarOp::Div => {
            if b == 0 {
                return Err(DasmError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
    };
    vm.regs.set_r(instr.dst(), result);
    Ok(StepOutcome::Continue)
}

// --- frame ops -----------------------------------------------------------

fn new_frame(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let dst = instr.dst();
    vm.regs.set_frame(dst, Frame::new());
    vm.regs.set_r(dst, dst as i64);
    Ok(StepOutcome::Continue)
}

fn add_col(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let frame_reg = instr.dst();
    let name = const_str(vm, instr.imm8() as u16)?;
    let column = vm.regs.v(instr.src1()).cloned().unwrap_or_else(|| Column::int64("", Vec::new())).rename(name);
    vm.account_column(&column)?;
    let handle = vm.regs.r(frame_reg) as u8;
    let frame = vm.regs.frame_mut(handle).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", frame_reg)))?;
    frame.add_column(column);
    Ok(StepOutcome::Continue)
}

fn row_count(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let handle = vm.regs.r(instr.src1()) as u8;
    let frame = vm.regs.frame(handle).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", instr.src1())))?;
    vm.regs.set_r(instr.dst(), frame.row_count() as i64);
    Ok(StepOutcome::Continue)
}

fn col_count(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let handle = vm.regs.r(instr.src1()) as u8;
    let frame = vm.regs.frame(handle).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", instr.src1())))?;
    vm.regs.set_r(instr.dst(), frame.col_count() as i64);
    Ok(StepOutcome::Continue)
}

// --- group-by --------------------------------------------------------------

fn group_by(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let dst = instr.dst();
    let key_col = vm.regs.v(instr.src1()).cloned().unwrap_or_else(|| Column::int64("", Vec::new()));
    vm.regs.set_groupby(dst, GroupByResult::build(&key_col));
    vm.regs.set_r(dst, dst as i64);
    Ok(StepOutcome::Continue)
}

fn group_keys(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let handle = vm.regs.r(instr.src1()) as u8;
    let gb = vm.regs.groupby(handle).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", instr.src1())))?;
    let column = gb.keys_column("key");
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

fn group_count(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let handle = vm.regs.r(instr.src1()) as u8;
    let gb = vm.regs.groupby(handle).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", instr.src1())))?;
    let column = gb.counts_column("count");
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

#[derive(Clone, Copy)]
enum GroupAgg {
    Sum,
    Min,
    Max,
    Mean,
}

fn group_fold(vm: &mut Vm, instr: Instruction, agg: GroupAgg, as_float: bool) -> Result<StepOutcome, DasmError> {
    let handle = vm.regs.r(instr.src1()) as u8;
    let gb = vm.regs.groupby(handle).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", instr.src1())))?.clone();
    let values = vm.regs.v(instr.src2()).cloned().unwrap_or_else(|| Column::float64("", Vec::new()));

    let float_output = as_float || matches!(agg, GroupAgg::Mean);
    let mut out_f: Vec<Option<f64>> = Vec::with_capacity(gb.group_count());
    let mut out_i: Vec<Option<i64>> = Vec::with_capacity(gb.group_count());

    for group in 0..gb.group_count() {
        let indices = gb.indices_for_group(group);
        match agg {
            GroupAgg::Sum if float_output => {
                out_f.push(Some(indices.iter().filter_map(|&i| values.get_f64(i)).sum()));
            }
            GroupAgg::Sum => {
                out_i.push(Some(indices.iter().filter_map(|&i| values.get_i64(i)).fold(0, i64::wrapping_add)));
            }
            GroupAgg::Min | GroupAgg::Max => {
                let want_min = matches!(agg, GroupAgg::Min);
                if float_output {
                    let best = fold_extreme(indices.iter().filter_map(|&i| values.get_f64(i)), want_min, |a, b| a < b);
                    out_f.push(Some(best.unwrap_or(0.0)));
                } else {
                    let best = fold_extreme(indices.iter().filter_map(|&i| values.get_i64(i)), want_min, |a, b| a < b);
                    out_i.push(Some(best.unwrap_or(0)));
                }
            }
            GroupAgg::Mean => {
                out_f.push(Some(mean_of(indices.iter().filter_map(|&i| values.get_f64(i)))));
            }
        }
    }

    let column =
        if float_output { Column::new("group", ColumnData::Float64(out_f)) } else { Column::new("group", ColumnData::Int64(out_i)) };
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

// --- join ------------------------------------------------------------------

fn join_op(vm: &mut Vm, instr: Instruction, mode: JoinMode) -> Result<StepOutcome, DasmError> {
    let dst = instr.dst();
    let key_name = const_str(vm, instr.imm8() as u16)?;
    let left = vm.regs.frame(vm.regs.r(instr.src1()) as u8).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", instr.src1())))?.clone();
    let right = vm.regs.frame(vm.regs.r(instr.src2()) as u8).ok_or_else(|| DasmError::FrameNotFound(format!("R{}", instr.src2())))?.clone();
    let result = join::join_frames(&left, &right, &key_name, mode)?;
    for column in result.columns() {
        vm.account_column(column)?;
    }
    vm.regs.set_frame(dst, result);
    vm.regs.set_r(dst, dst as i64);
    Ok(StepOutcome::Continue)
}

// --- string ops --------------------------------------------------------

fn require_str(vm: &Vm, reg: u8) -> Result<Column, DasmError> {
    match vm.regs.v(reg) {
        Some(col) if col.kind() == ColumnKind::Str => Ok(col.clone_column()),
        Some(col) => Err(DasmError::TypeMismatch(format!("expected string column, found {:?}", col.kind()))),
        None => Ok(Column::string("", Vec::new())),
    }
}

fn str_len(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let src = require_str(vm, instr.src1())?;
    let out: Vec<Option<i64>> = (0..src.length()).map(|i| src.get_str(i).map(|s| s.len() as i64)).collect();
    let column = Column::new(src.name().to_owned(), ColumnData::Int64(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

#[derive(Clone, Copy)]
enum StrCase {
    Upper,
    Lower,
}

fn str_case(vm: &mut Vm, instr: Instruction, case: StrCase) -> Result<StepOutcome, DasmError> {
    let src = require_str(vm, instr.src1())?;
    let out: Vec<Option<String>> = (0..src.length())
        .map(|i| {
            src.get_str(i).map(|s| match case {
                StrCase::Upper => s.to_uppercase(),
                StrCase::Lower => s.to_lowercase(),
            })
        })
        .collect();
    let column = Column::build_from_values(&src, ColumnData::Str(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

fn str_trim(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let src = require_str(vm, instr.src1())?;
    let out: Vec<Option<String>> = (0..src.length()).map(|i| src.get_str(i).map(|s| s.trim().to_owned())).collect();
    let column = Column::build_from_values(&src, ColumnData::Str(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

fn str_concat(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let lhs = require_str(vm, instr.src1())?;
    let rhs = require_str(vm, instr.src2())?;
    let out: Vec<Option<String>> = (0..lhs.length())
        .map(|i| match (lhs.get_str(i), rhs.get_str(i)) {
            (Some(a), Some(b)) => Some(format!("{}{}", a, b)),
            _ => None,
        })
        .collect();
    let column = Column::build_from_values(&lhs, ColumnData::Str(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

#[derive(Clone, Copy)]
enum StrPred {
    Contains,
    StartsWith,
    EndsWith,
}

fn str_pred(vm: &mut Vm, instr: Instruction, pred: StrPred) -> Result<StepOutcome, DasmError> {
    let src = require_str(vm, instr.src1())?;
    let pattern = const_str(vm, instr.imm8() as u16)?;
    let out: Vec<Option<bool>> = (0..src.length())
        .map(|i| {
            src.get_str(i).map(|s| match pred {
                StrPred::Contains => s.contains(&pattern),
                StrPred::StartsWith => s.starts_with(&pattern),
                StrPred::EndsWith => s.ends_with(&pattern),
            })
        })
        .collect();
    let column = Column::new(src.name().to_owned(), ColumnData::Bool(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

fn str_split(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let src = require_str(vm, instr.src1())?;
    let delim = const_str(vm, instr.imm8() as u16)?;
    let out: Vec<Option<String>> =
        (0..src.length()).map(|i| src.get_str(i).map(|s| s.split(&delim).next().unwrap_or("").to_owned())).collect();
    let column = Column::build_from_values(&src, ColumnData::Str(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

fn str_replace(vm: &mut Vm, instr: Instruction) -> Result<StepOutcome, DasmError> {
    let src = require_str(vm, instr.src1())?;
    let pattern = const_str(vm, instr.imm8() as u16)?;
    let out: Vec<Option<String>> = match pattern.split_once('|') {
        Some((old, new)) => (0..src.length()).map(|i| src.get_str(i).map(|s| s.replace(old, new))).collect(),
        None => (0..src.length()).map(|i| src.get_str(i).map(str::to_owned)).collect(),
    };
    let column = Column::build_from_values(&src, ColumnData::Str(out));
    vm.account_column(&column)?;
    vm.regs.set_v(instr.dst(), column);
    Ok(StepOutcome::Continue)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::{encode, encode_plain};
    use crate::program::{Const, Program};
    use crate::vm::ReturnValue;

    fn run(code: Vec<Instruction>, constants: Vec<Const>, float_constants: Vec<f64>) -> Result<ReturnValue, DasmError> {
        let mut vm = Vm::new();
        vm.load(Program { code, constants, float_constants });
        vm.execute()
    }

    #[test]
    fn scalar_sum_scenario() {
        // constants[0] = 10, constants[1] = 5; LOAD_CONST's imm16 is a pool index.
        let code = vec![
            encode_plain(Opcode::LoadConst, 0, 0, 0, 0),
            encode_plain(Opcode::LoadConst, 1, 0, 0, 1),
            encode(Opcode::AddR, 0, 2, 0, 1, 0),
            encode_plain(Opcode::Halt, 2, 0, 0, 0),
        ];
        assert_eq!(run(code, vec![Const::Int(10), Const::Int(5)], Vec::new()), Ok(ReturnValue::Int(15)));
    }

    #[test]
    fn div_by_zero_fails_for_integers() {
        let code = vec![
            encode_plain(Opcode::LoadConst, 0, 0, 0, 0),
            encode_plain(Opcode::LoadConst, 1, 0, 0, 1),
            encode(Opcode::DivR, 0, 2, 1, 0, 0),
            encode_plain(Opcode::Halt, 2, 0, 0, 0),
        ];
        assert_eq!(run(code, vec![Const::Int(0), Const::Int(1)], Vec::new()), Err(DasmError::DivisionByZero));
    }

    #[test]
    fn float_division_by_zero_yields_infinity() {
        let lhs = Column::float64("x", vec![Some(1.0)]);
        let rhs = Column::float64("y", vec![Some(0.0)]);
        let mut vm = Vm::new();
        vm.regs.set_v(1, lhs);
        vm.regs.set_v(2, rhs);
        let instr = encode(Opcode::VecDivF, 0, 0, 1, 2, 0);
        match execute_one(&mut vm, Opcode::VecDivF, instr).unwrap() {
            StepOutcome::Continue => {}
            _ => panic!("expected continue"),
        }
        assert_eq!(vm.regs.v(0).unwrap().get_f64(0), Some(f64::INFINITY));
    }

    #[test]
    fn reduce_sum_on_empty_column_is_zero() {
        let mut vm = Vm::new();
        let instr = encode_plain(Opcode::ReduceSum, 0, 1, 0, 0);
        execute_one(&mut vm, Opcode::ReduceSum, instr).unwrap();
        assert_eq!(vm.regs.r(0), 0);
    }

    #[test]
    fn reduce_mean_on_empty_column_is_zero_point_zero() {
        let mut vm = Vm::new();
        let instr = encode_plain(Opcode::ReduceMean, 0, 1, 0, 0);
        execute_one(&mut vm, Opcode::ReduceMean, instr).unwrap();
        assert_eq!(vm.regs.f(0), 0.0);
    }

    #[test]
    fn group_by_then_group_sum_f_then_reduce_matches_scenario_four() {
        let category = Column::string(
            "category",
            vec![Some("A".into()), Some("B".into()), Some("A".into()), Some("C".into())],
        );
        let amount = Column::float64("amount", vec![Some(10.0), Some(25.0), Some(7.5), Some(40.0)]);
        let mut vm = Vm::new();
        vm.regs.set_v(1, category);
        vm.regs.set_v(2, amount);

        execute_one(&mut vm, Opcode::GroupBy, encode_plain(Opcode::GroupBy, 0, 1, 0, 0)).unwrap();
        execute_one(&mut vm, Opcode::GroupSumF, encode(Opcode::GroupSumF, 0, 3, 0, 2, 0)).unwrap();
        execute_one(&mut vm, Opcode::ReduceSumF, encode_plain(Opcode::ReduceSumF, 0, 3, 0, 0)).unwrap();

        assert_eq!(vm.regs.f(0), 82.5);
    }

    #[test]
    fn str_replace_without_separator_returns_input_unchanged() {
        let src = Column::string("s", vec![Some("hello".into())]);
        let mut vm = Vm::new();
        vm.load(Program { code: Vec::new(), constants: vec![Const::Str("noseparator".into())], float_constants: Vec::new() });
        vm.regs.set_v(1, src);
        let instr = encode(Opcode::StrReplace, 0, 0, 1, 0, 0);
        execute_one(&mut vm, Opcode::StrReplace, instr).unwrap();
        assert_eq!(vm.regs.v(0).unwrap().get_str(0), Some("hello"));
    }

    #[test]
    fn str_replace_splits_on_first_pipe() {
        let src = Column::string("s", vec![Some("a-b-c".into())]);
        let mut vm = Vm::new();
        vm.load(Program { code: Vec::new(), constants: vec![Const::Str("-|_".into())], float_constants: Vec::new() });
        vm.regs.set_v(1, src);
        let instr = encode(Opcode::StrReplace, 0, 0, 1, 0, 0);
        execute_one(&mut vm, Opcode::StrReplace, instr).unwrap();
        assert_eq!(vm.regs.v(0).unwrap().get_str(0), Some("a_b_c"));
    }

    #[test]
    fn and_requires_bool_columns() {
        let mut vm = Vm::new();
        vm.regs.set_v(1, Column::int64("x", vec![Some(1)]));
        let instr = encode(Opcode::And, 0, 0, 1, 2, 0);
        let err = execute_one(&mut vm, Opcode::And, instr).unwrap_err();
        assert_eq!(err.kind(), "type-mismatch");
    }
}
