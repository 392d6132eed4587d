//! The label pre-pass: a single linear scan that resolves every `LABEL`
//! instruction's name to its index before execution starts, so `JUMP`,
//! `CALL`, and the conditional jumps can resolve targets in constant time.

use std::collections::HashMap;

use crate::error::InterpretError;
use crate::program::{Operand, Opcode, Program};

/// Maps a label name to the index of its `LABEL` instruction.
pub type LabelMap = HashMap<String, usize>;

/// Scan `program` once and build its label map. Fails with `SEM` if the
/// same label name is declared twice.
pub fn build_label_map(program: &Program) -> Result<LabelMap, InterpretError> {
    let mut map = LabelMap::new();
    for (index, instr) in program.iter().enumerate() {
        if instr.opcode != Opcode::Label {
            continue;
        }
        let name = match &instr.operands[0] {
            Operand::Label(name) => name,
            _ => unreachable!("LABEL's signature guarantees a label operand"),
        };
        if map.insert(name.clone(), index).is_some() {
            return Err(InterpretError::sem(format!("label '{name}' is already defined")));
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Instruction;

    fn label(name: &str) -> Instruction {
        Instruction { opcode: Opcode::Label, operands: vec![Operand::Label(name.to_string())] }
    }

    #[test]
    fn maps_labels_to_their_index() {
        let program = vec![label("start"), label("loop")];
        let map = build_label_map(&program).unwrap();
        assert_eq!(map["start"], 0);
        assert_eq!(map["loop"], 1);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let program = vec![label("start"), label("start")];
        assert!(build_label_map(&program).is_err());
    }

    #[test]
    fn non_label_instructions_are_skipped() {
        let program = vec![Instruction { opcode: Opcode::Createframe, operands: vec![] }, label("start")];
        let map = build_label_map(&program).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["start"], 1);
    }
}
