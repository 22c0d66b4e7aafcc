//! Disassembler for MIPS programs.
//!
//! Converts instruction words back to the assembler's syntax.

use crate::cpu::decode::{decode, sign_extend, Instruction};
use crate::cpu::registers::field_name;

/// Disassemble a single word to text.
pub fn disassemble_instruction(word: u32) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!(".word {:#010x}", word),
    }
}

/// Disassemble a slice of words, one line per word with its byte address.
pub fn disassemble(words: &[u32]) -> String {
    let mut output = String::new();
    output.push_str("# MIPS Disassembly\n");
    output.push_str("# ----------------\n\n");

    for (index, word) in words.iter().enumerate() {
        let line = disassemble_instruction(*word);
        output.push_str(&format!("{:08x}: {:08x}  {}\n", index * 4, word, line));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let r = field_name;
    let m = instr.mnemonic();

    match *instr {
        Instruction::Addi { rt, rs, imm } => {
            format!("{:<5}{}, {}, {}", m, r(rt), r(rs), sign_extend(imm) as i32)
        }

        Instruction::Beq { rs, rt, offset } | Instruction::Bne { rs, rt, offset } => {
            format!("{:<5}{}, {}, {}", m, r(rs), r(rt), sign_extend(offset) as i32)
        }

        Instruction::Add { rd, rs, rt }
        | Instruction::And { rd, rs, rt }
        | Instruction::Or { rd, rs, rt }
        | Instruction::Slt { rd, rs, rt } => {
            format!("{:<5}{}, {}, {}", m, r(rd), r(rs), r(rt))
        }

        Instruction::Sll { rd, rt, sa }
        | Instruction::Sra { rd, rt, sa }
        | Instruction::Srl { rd, rt, sa } => {
            format!("{:<5}{}, {}, {}", m, r(rd), r(rt), sa)
        }
    }
}
