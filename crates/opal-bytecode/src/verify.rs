//! Class-file verification
//!
//! Structural checks over a decoded class file: instruction streams must
//! parse, jumps must land on instruction boundaries, pool and local
//! references must be in range, execution must not fall off the end, and the
//! declared operand-stack depth must cover the computed depth.

use crate::classfile::{ClassFile, CodeAttr};
use crate::encoder::BytecodeReader;
use crate::opcode::Opcode;
use std::collections::HashSet;

/// Maximum operand stack depth accepted by the verifier
const MAX_STACK_DEPTH: i32 = 1024;

/// Bytecode verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Invalid opcode
    #[error("Invalid opcode {opcode:#x} at offset {offset}")]
    InvalidOpcode {
        /// The unrecognized opcode byte
        opcode: u8,
        /// Offset of the opcode in the code attribute
        offset: usize,
    },

    /// Stack underflow
    #[error("Stack underflow at offset {0}")]
    StackUnderflow(usize),

    /// Stack overflow
    #[error("Stack overflow at offset {0} (depth: {1})")]
    StackOverflow(usize, i32),

    /// Invalid jump target
    #[error("Invalid jump target {target} at offset {offset}")]
    InvalidJumpTarget {
        /// Absolute target offset of the jump
        target: usize,
        /// Offset of the jump instruction
        offset: usize,
    },

    /// Invalid constant pool reference
    #[error("Invalid constant pool reference: index {index} at offset {offset}")]
    InvalidConstantRef {
        /// The out-of-range pool index
        index: u32,
        /// Offset of the referencing instruction
        offset: usize,
    },

    /// Invalid local variable reference
    #[error("Invalid local variable reference: index {index} (max {max}) at offset {offset}")]
    InvalidLocalRef {
        /// The out-of-range local slot
        index: usize,
        /// Declared local slot count
        max: usize,
        /// Offset of the referencing instruction
        offset: usize,
    },

    /// Execution falls off end
    #[error("Execution falls off end of method at offset {0}")]
    FallOffEnd(usize),

    /// Declared max_stack does not cover the computed depth
    #[error("Declared max_stack {declared} is less than computed depth {computed}")]
    MaxStackTooSmall {
        /// Depth declared in the code attribute
        declared: u16,
        /// Depth computed by abstract interpretation
        computed: u16,
    },

    /// Class-file structure error
    #[error("Class structure error: {0}")]
    ClassStructure(String),

    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(String),
}

/// Parsed instruction
#[derive(Debug, Clone)]
struct Instruction {
    offset: usize,
    opcode: Opcode,
    operands: Vec<u8>,
}

impl Instruction {
    /// Argument count operand of CALL / CALL_STATIC / NEW (trailing u16)
    fn arg_count(&self) -> i32 {
        let bytes = [self.operands[4], self.operands[5]];
        i32::from(u16::from_le_bytes(bytes))
    }
}

/// Verify a class file's structure and every method body
pub fn verify_class(file: &ClassFile) -> Result<(), VerifyError> {
    file.validate()
        .map_err(|e| VerifyError::ClassStructure(e.to_string()))?;

    for method in &file.class.methods {
        if let Some(code) = &method.code {
            verify_code(file, code)?;
        }
    }

    Ok(())
}

/// Verify a single code attribute
pub fn verify_code(file: &ClassFile, code: &CodeAttr) -> Result<(), VerifyError> {
    // Bodiless attributes are not emitted, but tolerate them
    if code.code.is_empty() {
        return Ok(());
    }

    let instructions = parse_instructions(&code.code)?;
    let jump_targets = collect_jump_targets(&instructions);

    for &target in &jump_targets {
        if !is_valid_instruction_boundary(target, &instructions) {
            return Err(VerifyError::InvalidJumpTarget {
                target,
                offset: target,
            });
        }
    }

    let computed = max_stack_of(&instructions)?;
    if computed > code.max_stack {
        return Err(VerifyError::MaxStackTooSmall {
            declared: code.max_stack,
            computed,
        });
    }

    verify_constant_refs(&instructions, file)?;
    verify_local_refs(&instructions, code)?;

    if let Some(last) = instructions.last() {
        if !last.opcode.is_terminator() && !matches!(last.opcode, Opcode::Jmp) {
            return Err(VerifyError::FallOffEnd(last.offset));
        }
    }

    Ok(())
}

/// Compute the operand-stack depth required by an instruction stream
///
/// This is the derived metadata stored as `max_stack`; writers recompute it
/// rather than trusting a possibly stale declared value.
pub fn compute_max_stack(code: &[u8]) -> Result<u16, VerifyError> {
    let instructions = parse_instructions(code)?;
    max_stack_of(&instructions)
}

fn max_stack_of(instructions: &[Instruction]) -> Result<u16, VerifyError> {
    let mut depth = 0i32;
    let mut max_depth = 0i32;

    for instr in instructions {
        let (pops, pushes) = stack_effect(instr);

        if depth < pops {
            return Err(VerifyError::StackUnderflow(instr.offset));
        }
        depth -= pops;
        depth += pushes;
        if depth > MAX_STACK_DEPTH {
            return Err(VerifyError::StackOverflow(instr.offset, depth));
        }
        max_depth = max_depth.max(depth);

        // Depth resets after a terminator; remaining code is a jump target
        if instr.opcode.is_terminator() {
            depth = 0;
        }
    }

    Ok(max_depth as u16)
}

/// Parse all instructions from bytecode
fn parse_instructions(code: &[u8]) -> Result<Vec<Instruction>, VerifyError> {
    let mut instructions = Vec::new();
    let mut reader = BytecodeReader::new(code);

    while reader.has_more() {
        let offset = reader.position();
        let byte = reader
            .read_u8()
            .map_err(|e| VerifyError::DecodeError(e.to_string()))?;

        let opcode = Opcode::from_u8(byte).ok_or(VerifyError::InvalidOpcode {
            opcode: byte,
            offset,
        })?;

        let operand_size = opcode.operand_size();
        let operands = if operand_size > 0 {
            reader
                .read_bytes(operand_size)
                .map_err(|e| VerifyError::DecodeError(e.to_string()))?
        } else {
            Vec::new()
        };

        instructions.push(Instruction {
            offset,
            opcode,
            operands,
        });
    }

    Ok(instructions)
}

/// Collect all jump targets from instructions
fn collect_jump_targets(instructions: &[Instruction]) -> HashSet<usize> {
    let mut targets = HashSet::new();

    for instr in instructions {
        if instr.opcode.is_jump() && instr.operands.len() >= 4 {
            let offset_bytes: [u8; 4] = [
                instr.operands[0],
                instr.operands[1],
                instr.operands[2],
                instr.operands[3],
            ];
            let jump_offset = i32::from_le_bytes(offset_bytes);

            // Relative to the byte after the operand
            let target = (instr.offset as i32 + 1 + 4 + jump_offset) as usize;
            targets.insert(target);
        }
    }

    targets
}

/// Check if an offset is a valid instruction boundary
fn is_valid_instruction_boundary(offset: usize, instructions: &[Instruction]) -> bool {
    instructions.iter().any(|instr| instr.offset == offset)
}

/// Get the stack effect of an instruction (pops, pushes)
fn stack_effect(instr: &Instruction) -> (i32, i32) {
    match instr.opcode {
        Opcode::Nop => (0, 0),
        Opcode::Pop => (1, 0),
        Opcode::Dup => (1, 2),
        Opcode::Swap => (2, 2),
        Opcode::ConstNull
        | Opcode::ConstTrue
        | Opcode::ConstFalse
        | Opcode::ConstI32
        | Opcode::ConstF64
        | Opcode::ConstStr => (0, 1),
        Opcode::LoadLocal => (0, 1),
        Opcode::StoreLocal => (1, 0),
        Opcode::Iadd | Opcode::Isub | Opcode::Imul | Opcode::Idiv | Opcode::Imod => (2, 1),
        Opcode::Ineg | Opcode::Fneg => (1, 1),
        Opcode::Fadd | Opcode::Fsub | Opcode::Fmul | Opcode::Fdiv => (2, 1),
        Opcode::Ieq | Opcode::Ine | Opcode::Ilt | Opcode::Ile | Opcode::Igt | Opcode::Ige => {
            (2, 1)
        }
        Opcode::Not => (1, 1),
        Opcode::And | Opcode::Or => (2, 1),
        Opcode::Jmp => (0, 0),
        Opcode::JmpIfFalse | Opcode::JmpIfTrue => (1, 0),
        Opcode::Return => (1, 0),
        Opcode::ReturnVoid => (0, 0),
        // Calls pop the arguments (plus the receiver for CALL) and push the
        // result; void methods push null
        Opcode::Call => (instr.arg_count() + 1, 1),
        Opcode::CallStatic => (instr.arg_count(), 1),
        Opcode::New => (instr.arg_count(), 1),
        Opcode::LoadField => (1, 1),
        Opcode::StoreField => (2, 0),
        Opcode::LoadStatic => (0, 1),
        Opcode::StoreStatic => (1, 0),
        Opcode::Throw => (1, 0),
    }
}

/// Verify constant pool references in instructions
fn verify_constant_refs(
    instructions: &[Instruction],
    file: &ClassFile,
) -> Result<(), VerifyError> {
    for instr in instructions {
        let index = match instr.opcode {
            Opcode::ConstStr
            | Opcode::Call
            | Opcode::CallStatic
            | Opcode::New
            | Opcode::LoadField
            | Opcode::StoreField
            | Opcode::LoadStatic
            | Opcode::StoreStatic => {
                let bytes: [u8; 4] = [
                    instr.operands[0],
                    instr.operands[1],
                    instr.operands[2],
                    instr.operands[3],
                ];
                u32::from_le_bytes(bytes)
            }
            _ => continue,
        };

        if file.constants.get_string(index).is_none() {
            return Err(VerifyError::InvalidConstantRef {
                index,
                offset: instr.offset,
            });
        }
    }

    Ok(())
}

/// Verify local variable references in instructions
fn verify_local_refs(instructions: &[Instruction], code: &CodeAttr) -> Result<(), VerifyError> {
    let max = code.max_locals as usize;

    for instr in instructions {
        if matches!(instr.opcode, Opcode::LoadLocal | Opcode::StoreLocal) {
            let bytes = [instr.operands[0], instr.operands[1]];
            let index = u16::from_le_bytes(bytes) as usize;
            if index >= max {
                return Err(VerifyError::InvalidLocalRef {
                    index,
                    max,
                    offset: instr.offset,
                });
            }
        }
    }

    Ok(())
}
