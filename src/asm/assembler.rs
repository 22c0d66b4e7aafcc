//! Simple assembler for MIPS programs.
//!
//! Syntax:
//! ```text
//! # Comment (';' works too)
//! loop:                   # Define a label
//!     addi $t0, $t0, -1   # Immediate, decimal or 0x hex
//!     add  $t1, $t1, $8   # Registers by name or number
//!     sll  $t2, $t1, 2    # Shift amount 0-31
//!     bne  $t0, $zero, loop
//!     .word 0xdeadbeef    # Raw data word
//! ```
//!
//! Branch targets given as labels are turned into offsets for the machine's
//! branch rule (`pc += offset * 4`, then `pc += 4`), so a branch lands on the
//! labelled instruction.

use crate::cpu::decode::{encode, Instruction};
use crate::cpu::registers::{register_index, NUM_REGS};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a list of instruction words.
pub fn assemble(source: &str) -> Result<Vec<u32>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// Every mnemonic the machine executes. All take three operands.
const MNEMONICS: [&str; 10] = [
    "addi", "beq", "bne", "add", "and", "or", "slt", "sll", "sra", "srl",
];

/// A branch whose target label is resolved in pass 2.
struct PendingBranch {
    index: usize,
    instr: Instruction,
    label: String,
    line: usize,
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> word index).
    symbols: HashMap<String, usize>,
    /// Branches waiting for their label.
    pending: Vec<PendingBranch>,
    /// Output words.
    output: Vec<u32>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u32>, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve branch targets
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(&['#', ';'][..]) {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut line = line.trim();

        // Any number of labels may precede the instruction
        while let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim();
            if !is_identifier(label) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", label),
                });
            }
            if self.symbols.insert(label.to_string(), self.output.len()).is_some() {
                return Err(AssemblerError::DuplicateLabel {
                    line: line_num,
                    label: label.to_string(),
                });
            }
            line = line[colon_idx + 1..].trim();
        }

        if line.is_empty() {
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.find(char::is_whitespace) {
            Some(idx) => (&line[..idx], line[idx..].trim()),
            None => (line, ""),
        };
        let mnemonic = mnemonic.to_lowercase();
        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };

        if mnemonic == ".word" {
            expect_operands(&mnemonic, &operands, 1, line_num)?;
            let value = parse_number(operands[0], line_num)?;
            if !(i32::MIN as i64..=u32::MAX as i64).contains(&value) {
                return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
            }
            self.output.push(value as u32);
            return Ok(());
        }

        let instr = self.parse_instruction(&mnemonic, &operands, line_num)?;
        self.output.push(encode(&instr));
        Ok(())
    }

    fn parse_instruction(&mut self, mnemonic: &str, operands: &[&str], line_num: usize)
        -> Result<Instruction, AssemblerError>
    {
        if !MNEMONICS.contains(&mnemonic) {
            return Err(AssemblerError::UnknownMnemonic {
                line: line_num,
                mnemonic: mnemonic.to_string(),
            });
        }
        expect_operands(mnemonic, operands, 3, line_num)?;
        let reg = |i: usize| parse_register(operands[i], line_num);

        let instr = match mnemonic {
            "addi" => Instruction::Addi {
                rt: reg(0)?,
                rs: reg(1)?,
                imm: parse_imm16(operands[2], line_num)?,
            },

            "beq" | "bne" => {
                let (rs, rt) = (reg(0)?, reg(1)?);
                let target = operands[2];
                let offset = if is_identifier(target) {
                    // Placeholder, will be resolved in pass 2
                    0
                } else {
                    parse_imm16(target, line_num)?
                };
                let instr = if mnemonic == "beq" {
                    Instruction::Beq { rs, rt, offset }
                } else {
                    Instruction::Bne { rs, rt, offset }
                };
                if is_identifier(target) {
                    self.pending.push(PendingBranch {
                        index: self.output.len(),
                        instr,
                        label: target.to_string(),
                        line: line_num,
                    });
                }
                instr
            }

            "add" => Instruction::Add { rd: reg(0)?, rs: reg(1)?, rt: reg(2)? },
            "and" => Instruction::And { rd: reg(0)?, rs: reg(1)?, rt: reg(2)? },
            "or" => Instruction::Or { rd: reg(0)?, rs: reg(1)?, rt: reg(2)? },
            "slt" => Instruction::Slt { rd: reg(0)?, rs: reg(1)?, rt: reg(2)? },

            "sll" => Instruction::Sll { rd: reg(0)?, rt: reg(1)?, sa: parse_shift(operands[2], line_num)? },
            "sra" => Instruction::Sra { rd: reg(0)?, rt: reg(1)?, sa: parse_shift(operands[2], line_num)? },
            "srl" => Instruction::Srl { rd: reg(0)?, rt: reg(1)?, sa: parse_shift(operands[2], line_num)? },

            _ => unreachable!("mnemonic table out of sync: {}", mnemonic),
        };

        Ok(instr)
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for pending in &self.pending {
            let target = *self.symbols.get(&pending.label)
                .ok_or_else(|| AssemblerError::UndefinedLabel {
                    line: pending.line,
                    label: pending.label.clone(),
                })?;

            // Taken branch ends at branch + offset + 1
            let distance = target as i64 - pending.index as i64 - 1;
            if !(i16::MIN as i64..=i16::MAX as i64).contains(&distance) {
                return Err(AssemblerError::BranchOutOfRange {
                    line: pending.line,
                    label: pending.label.clone(),
                });
            }
            let offset = distance as i16 as u16;

            let instr = match pending.instr {
                Instruction::Beq { rs, rt, .. } => Instruction::Beq { rs, rt, offset },
                Instruction::Bne { rs, rt, .. } => Instruction::Bne { rs, rt, offset },
                other => other,
            };
            self.output[pending.index] = encode(&instr);
        }
        Ok(())
    }
}

fn expect_operands(mnemonic: &str, operands: &[&str], expected: usize, line_num: usize)
    -> Result<(), AssemblerError>
{
    if operands.len() != expected {
        return Err(AssemblerError::SyntaxError {
            line: line_num,
            message: format!(
                "{} takes {} operands, found {}",
                mnemonic, expected, operands.len()
            ),
        });
    }
    Ok(())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Parse `$name` or `$number`.
fn parse_register(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let bad = || AssemblerError::InvalidRegister {
        line: line_num,
        register: operand.to_string(),
    };

    if let Some(index) = register_index(operand) {
        return Ok(index as u8);
    }
    let number = operand.strip_prefix('$').ok_or_else(bad)?;
    match number.parse::<usize>() {
        Ok(index) if index < NUM_REGS => Ok(index as u8),
        _ => Err(bad()),
    }
}

/// Parse a decimal or `0x` hex literal, optionally negative.
fn parse_number(operand: &str, line_num: usize) -> Result<i64, AssemblerError> {
    let (negative, digits) = match operand.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, operand),
    };

    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        digits.parse::<i64>()
    };

    let value = parsed.map_err(|_| AssemblerError::SyntaxError {
        line: line_num,
        message: format!("invalid number '{}'", operand),
    })?;

    Ok(if negative { -value } else { value })
}

/// A 16-bit field: signed (-32768..=32767) or raw unsigned (up to 0xffff).
fn parse_imm16(operand: &str, line_num: usize) -> Result<u16, AssemblerError> {
    let value = parse_number(operand, line_num)?;
    if !(i16::MIN as i64..=u16::MAX as i64).contains(&value) {
        return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
    }
    Ok(value as u16)
}

fn parse_shift(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let value = parse_number(operand, line_num)?;
    if !(0..32).contains(&value) {
        return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
    }
    Ok(value as u8)
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("invalid register on line {line}: {register}")]
    InvalidRegister { line: usize, register: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("branch to {label} on line {line} is too far")]
    BranchOutOfRange { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::decode;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            # Simple test program
            addi $t0, $zero, 10
            addi $t1, $zero, 5
            add  $t2, $t0, $t1
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0], 0x2008_000a);
        assert_eq!(decode(result[2]), Ok(Instruction::Add { rd: 10, rs: 8, rt: 9 }));
    }

    #[test]
    fn test_numeric_registers_and_case() {
        let result = assemble("ADDI $8, $0, -1").unwrap();
        assert_eq!(result, vec![0x2008_ffff]);
    }

    #[test]
    fn test_forward_and_backward_labels() {
        let source = r#"
        start:  addi $t0, $zero, 3
        loop:   addi $t0, $t0, -1
                bne  $t0, $zero, loop
                beq  $zero, $zero, end
                addi $t1, $zero, 1
        end:
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.len(), 5);
        // bne at 2 -> loop at 1: offset -2
        assert_eq!(decode(result[2]), Ok(Instruction::Bne { rs: 8, rt: 0, offset: 0xfffe }));
        // beq at 3 -> end at 5: offset 1
        assert_eq!(decode(result[3]), Ok(Instruction::Beq { rs: 0, rt: 0, offset: 1 }));
    }

    #[test]
    fn test_numeric_branch_offset() {
        let result = assemble("beq $t0, $t1, 2").unwrap();
        assert_eq!(result, vec![0x1109_0002]);
    }

    #[test]
    fn test_shifts_and_words() {
        let source = r#"
            sll $t1, $t0, 4
            sra $t1, $t0, 31
            .word 0xdeadbeef
            .word -1
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(decode(result[0]), Ok(Instruction::Sll { rd: 9, rt: 8, sa: 4 }));
        assert_eq!(decode(result[1]), Ok(Instruction::Sra { rd: 9, rt: 8, sa: 31 }));
        assert_eq!(result[2], 0xdead_beef);
        assert_eq!(result[3], 0xffff_ffff);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            assemble("\nmul $t0, $t1, $t2"),
            Err(AssemblerError::UnknownMnemonic { line: 2, mnemonic: "mul".into() })
        );
        assert_eq!(
            assemble("add $t0, $t1, $q9"),
            Err(AssemblerError::InvalidRegister { line: 1, register: "$q9".into() })
        );
        assert_eq!(
            assemble("add $t0, $32, $t1"),
            Err(AssemblerError::InvalidRegister { line: 1, register: "$32".into() })
        );
        assert_eq!(
            assemble("bne $t0, $t1, nowhere"),
            Err(AssemblerError::UndefinedLabel { line: 1, label: "nowhere".into() })
        );
        assert_eq!(
            assemble("sll $t0, $t1, 32"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 32 })
        );
        assert_eq!(
            assemble("addi $t0, $t1, 70000"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 70000 })
        );
        assert!(matches!(
            assemble("add $t0, $t1"),
            Err(AssemblerError::SyntaxError { line: 1, .. })
        ));
        assert_eq!(
            assemble("a: \n a:"),
            Err(AssemblerError::DuplicateLabel { line: 2, label: "a".into() })
        );
    }
}
