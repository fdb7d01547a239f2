//! The `DFBC` binary bytecode container: `Program` serialized to and
//! from a versioned byte stream.
//!
//! Layout (little-endian throughout): 4-byte magic `DFBC`, 2-byte
//! version, instruction count + that many 32-bit words (each
//! zero-extended to 8 bytes on the wire), a length-prefixed constants
//! block, and a float-constant count + that many float64 values.

mod error;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use dasm_core::{Const, Instruction, Program};

pub use error::BcError;

const MAGIC: &[u8; 4] = b"DFBC";
const VERSION: u16 = 1;

const TAG_INT: u8 = 0;
const TAG_STR: u8 = 1;

pub fn write<W: Write>(writer: &mut W, program: &Program) -> Result<(), BcError> {
    writer.write_all(MAGIC)?;
    writer.write_u16::<LittleEndian>(VERSION)?;

    writer.write_u32::<LittleEndian>(program.code.len() as u32)?;
    for instr in &program.code {
        writer.write_u64::<LittleEndian>(instr.to_u32() as u64)?;
    }

    let mut constants_block = Vec::new();
    constants_block.write_u32::<LittleEndian>(program.constants.len() as u32)?;
    for c in &program.constants {
        match c {
            Const::Int(v) => {
                constants_block.write_u8(TAG_INT)?;
                constants_block.write_i64::<LittleEndian>(*v)?;
            }
            Const::Str(s) => {
                constants_block.write_u8(TAG_STR)?;
                let bytes = s.as_bytes();
                constants_block.write_u32::<LittleEndian>(bytes.len() as u32)?;
                constants_block.write_all(bytes)?;
            }
        }
    }
    writer.write_u32::<LittleEndian>(constants_block.len() as u32)?;
    writer.write_all(&constants_block)?;

    writer.write_u32::<LittleEndian>(program.float_constants.len() as u32)?;
    for f in &program.float_constants {
        writer.write_f64::<LittleEndian>(*f)?;
    }

    Ok(())
}

pub fn read<R: Read>(reader: &mut R) -> Result<Program, BcError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(error::map_read_err)?;
    if &magic != MAGIC {
        return Err(BcError::InvalidMagic);
    }

    let version = reader.read_u16::<LittleEndian>().map_err(error::map_read_err)?;
    if version != VERSION {
        return Err(BcError::InvalidVersion(version));
    }

    let instr_count = reader.read_u32::<LittleEndian>().map_err(error::map_read_err)?;
    let mut code = Vec::with_capacity(instr_count as usize);
    for _ in 0..instr_count {
        let word = reader.read_u64::<LittleEndian>().map_err(error::map_read_err)?;
        code.push(Instruction::from_u32(word as u32));
    }

    let block_len = reader.read_u32::<LittleEndian>().map_err(error::map_read_err)?;
    let mut block = vec![0u8; block_len as usize];
    reader.read_exact(&mut block).map_err(error::map_read_err)?;
    let constants = parse_constants_block(&block)?;

    let float_count = reader.read_u32::<LittleEndian>().map_err(error::map_read_err)?;
    let mut float_constants = Vec::with_capacity(float_count as usize);
    for _ in 0..float_count {
        float_constants.push(reader.read_f64::<LittleEndian>().map_err(error::map_read_err)?);
    }

    Ok(Program { code, constants, float_constants })
}

fn parse_constants_block(block: &[u8]) -> Result<Vec<Const>, BcError> {
    let mut cursor = std::io::Cursor::new(block);
    let count = cursor.read_u32::<LittleEndian>().map_err(|_| BcError::MalformedConstants)?;
    let mut constants = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tag = cursor.read_u8().map_err(|_| BcError::MalformedConstants)?;
        match tag {
            TAG_INT => {
                let v = cursor.read_i64::<LittleEndian>().map_err(|_| BcError::MalformedConstants)?;
                constants.push(Const::Int(v));
            }
            TAG_STR => {
                let len = cursor.read_u32::<LittleEndian>().map_err(|_| BcError::MalformedConstants)?;
                let mut bytes = vec![0u8; len as usize];
                cursor.read_exact(&mut bytes).map_err(|_| BcError::MalformedConstants)?;
                let s = String::from_utf8(bytes).map_err(|_| BcError::MalformedConstants)?;
                constants.push(Const::Str(s));
            }
            _ => return Err(BcError::MalformedConstants),
        }
    }
    Ok(constants)
}

pub trait ReadBcExt: Read + Sized {
    fn read_dfbc(&mut self) -> Result<Program, BcError> {
        read(self)
    }
}

impl<R: Read + Sized> ReadBcExt for R {}

pub trait WriteBcExt: Write + Sized {
    fn write_dfbc(&mut self, program: &Program) -> Result<(), BcError> {
        write(self, program)
    }
}

impl<W: Write + Sized> WriteBcExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Program, BcError> {
    BufReader::new(File::open(path)?).read_dfbc()
}

pub fn write_file<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), BcError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_dfbc(program)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use dasm_core::instruction::encode_plain;
    use dasm_core::Opcode;

    fn sample_program() -> Program {
        Program {
            code: vec![
                encode_plain(Opcode::LoadConst, 0, 0, 0, 0),
                encode_plain(Opcode::Halt, 0, 0, 0, 0),
            ],
            constants: vec![Const::Int(42), Const::Str("sales".into())],
            float_constants: vec![1.5, -2.25],
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let program = sample_program();
        let mut buf = Vec::new();
        write(&mut buf, &program).unwrap();
        let decoded = read(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, program);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut buf = Vec::new();
        write(&mut buf, &sample_program()).unwrap();
        buf[0] = b'X';
        let err = read(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), "invalid-magic");
    }

    #[test]
    fn rejects_unknown_version() {
        let mut buf = Vec::new();
        write(&mut buf, &sample_program()).unwrap();
        buf[4] = 0xFF;
        buf[5] = 0xFF;
        let err = read(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), "invalid-version");
    }

    #[test]
    fn truncated_stream_is_reported() {
        let mut buf = Vec::new();
        write(&mut buf, &sample_program()).unwrap();
        buf.truncate(buf.len() - 4);
        let err = read(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), "truncated");
    }

    #[test]
    fn empty_program_round_trips() {
        let program = Program { code: vec![], constants: vec![], float_constants: vec![] };
        let mut buf = Vec::new();
        write(&mut buf, &program).unwrap();
        let decoded = read(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, program);
    }
}
