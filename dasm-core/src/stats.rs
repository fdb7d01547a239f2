//! Optional post-execution statistics.

use std::collections::HashMap;
use std::time::Duration;

use crate::opcode::Opcode;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub steps: u64,
    pub elapsed: Duration,
    pub frames_loaded: u64,
    per_opcode: HashMap<Opcode, u64>,
}

impl Stats {
    pub fn record_opcode(&mut self, op: Opcode) {
        *self.per_opcode.entry(op).or_insert(0) += 1;
    }

    pub fn opcode_count(&self, op: Opcode) -> u64 {
        self.per_opcode.get(&op).copied().unwrap_or(0)
    }

    pub fn per_opcode(&self) -> &HashMap<Opcode, u64> {
        &self.per_opcode
    }
}
