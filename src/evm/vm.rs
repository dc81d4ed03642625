//! Reference interpreter.
//!
//! Runs compiled bytecode over a byte-string input and returns the output
//! buffer. It models the subset of the instruction set needed to exercise
//! compiled programs end to end: arithmetic and bitwise operations, hashing,
//! calldata and code access, memory, control flow, stack manipulation and
//! the halting instructions. There is no gas, storage or account state;
//! any other opcode is rejected with [`ExecutionError::UnsupportedOpcode`].

use crate::evm::errors::ExecutionError;
use crate::evm::isa::OpCode;
use crate::evm::stack::STACK_LIMIT;
use crate::types::word::{WORD_BITS, WORD_LEN, Word};
use std::ops::Range;

/// Largest memory size the interpreter will allocate, in bytes.
pub const MEMORY_LIMIT: usize = 1 << 20;

/// Executes `code` with `call_data` as input and returns the output.
///
/// Running off the end of the code halts like `STOP` with empty output.
pub fn execute(code: &[u8], call_data: &[u8]) -> Result<Vec<u8>, ExecutionError> {
    VM::new(code, call_data).run()
}

/// Outcome of a single instruction.
enum Flow {
    Continue,
    Halt(Vec<u8>),
}

/// Interpreter state for one execution.
pub struct VM<'a> {
    code: &'a [u8],
    call_data: &'a [u8],
    /// Offset of the next byte to decode.
    pc: usize,
    /// Offset and opcode of the instruction being executed.
    current: (usize, OpCode),
    stack: Vec<Word>,
    memory: Vec<u8>,
    /// `true` at offsets holding a JUMPDEST outside push data.
    jump_dests: Vec<bool>,
}

impl<'a> VM<'a> {
    pub fn new(code: &'a [u8], call_data: &'a [u8]) -> Self {
        Self {
            code,
            call_data,
            pc: 0,
            current: (0, OpCode::Stop),
            stack: Vec::new(),
            memory: Vec::new(),
            jump_dests: analyze_jump_dests(code),
        }
    }

    /// Executes until a halting instruction or the end of the code.
    pub fn run(&mut self) -> Result<Vec<u8>, ExecutionError> {
        while self.pc < self.code.len() {
            let pc = self.pc;
            let byte = self.code[pc];
            let op = OpCode::try_from(byte)
                .map_err(|unknown| ExecutionError::InvalidOpcode { opcode: unknown.0, pc })?;
            self.pc += 1;
            self.current = (pc, op);
            if let Flow::Halt(output) = self.exec(op)? {
                return Ok(output);
            }
        }
        Ok(Vec::new())
    }

    fn exec(&mut self, op: OpCode) -> Result<Flow, ExecutionError> {
        let byte = op as u8;
        match op {
            OpCode::Stop => return Ok(Flow::Halt(Vec::new())),
            OpCode::Add => self.op_binary(|a, b| a.wrapping_add(b))?,
            OpCode::Sub => self.op_binary(|a, b| a.wrapping_sub(b))?,
            OpCode::Lt => self.op_binary(|a, b| Word::from(a < b))?,
            OpCode::Gt => self.op_binary(|a, b| Word::from(a > b))?,
            OpCode::Eq => self.op_binary(|a, b| Word::from(a == b))?,
            OpCode::And => self.op_binary(|a, b| *a & *b)?,
            OpCode::Or => self.op_binary(|a, b| *a | *b)?,
            OpCode::Xor => self.op_binary(|a, b| *a ^ *b)?,
            OpCode::Byte => self.op_binary(|i, x| {
                let index = i.to_usize().unwrap_or(WORD_LEN);
                Word::from(x.byte(index) as u64)
            })?,
            OpCode::Shl => self.op_binary(|shift, v| v.shl(shift_amount(shift)))?,
            OpCode::Shr => self.op_binary(|shift, v| v.shr(shift_amount(shift)))?,
            OpCode::IsZero => {
                let a = self.pop()?;
                self.push(Word::from(a.is_zero()))?;
            }
            OpCode::Not => {
                let a = self.pop()?;
                self.push(!a)?;
            }
            OpCode::Keccak256 => self.op_keccak256()?,
            OpCode::CallDataLoad => {
                let offset = self.pop()?;
                let mut word = [0u8; WORD_LEN];
                copy_padded(&mut word, self.call_data, &offset);
                self.push(Word::from(word))?;
            }
            OpCode::CallDataSize => self.push(Word::from(self.call_data.len() as u64))?,
            OpCode::CallDataCopy => self.op_copy(self.call_data)?,
            OpCode::CodeSize => self.push(Word::from(self.code.len() as u64))?,
            OpCode::CodeCopy => self.op_copy(self.code)?,
            OpCode::Pop => {
                self.pop()?;
            }
            OpCode::MLoad => {
                let offset = self.pop()?;
                let range = self.memory_range(&offset, &Word::from(WORD_LEN as u64))?;
                let mut word = [0u8; WORD_LEN];
                word.copy_from_slice(&self.memory[range]);
                self.push(Word::from(word))?;
            }
            OpCode::MStore => {
                let offset = self.pop()?;
                let value = self.pop()?;
                let range = self.memory_range(&offset, &Word::from(WORD_LEN as u64))?;
                self.memory[range].copy_from_slice(&value.to_be_bytes());
            }
            OpCode::MStore8 => {
                let offset = self.pop()?;
                let value = self.pop()?;
                let range = self.memory_range(&offset, &Word::one())?;
                self.memory[range.start] = value.byte(WORD_LEN - 1);
            }
            OpCode::Jump => {
                let dest = self.pop()?;
                self.jump(dest)?;
            }
            OpCode::JumpI => {
                let dest = self.pop()?;
                let cond = self.pop()?;
                if !cond.is_zero() {
                    self.jump(dest)?;
                }
            }
            OpCode::Pc => self.push(Word::from(self.current.0 as u64))?,
            OpCode::MSize => self.push(Word::from(self.memory.len() as u64))?,
            OpCode::JumpDest => {}
            OpCode::Push0 => self.push(Word::zero())?,
            _ if op.is_push() => self.op_push(op.immediate_len())?,
            _ if (OpCode::Dup1 as u8..=OpCode::Dup16 as u8).contains(&byte) => {
                self.op_dup((byte - OpCode::Dup1 as u8) as usize + 1)?
            }
            _ if (OpCode::Swap1 as u8..=OpCode::Swap16 as u8).contains(&byte) => {
                self.op_swap((byte - OpCode::Swap1 as u8) as usize + 1)?
            }
            OpCode::Return => {
                let data = self.op_output()?;
                return Ok(Flow::Halt(data));
            }
            OpCode::Revert => {
                let data = self.op_output()?;
                return Err(ExecutionError::Reverted { data });
            }
            OpCode::Invalid => {
                return Err(ExecutionError::InvalidInstruction {
                    pc: self.current.0,
                });
            }
            _ => {
                return Err(ExecutionError::UnsupportedOpcode {
                    op: op.mnemonic(),
                    pc: self.current.0,
                });
            }
        }
        Ok(Flow::Continue)
    }

    fn pop(&mut self) -> Result<Word, ExecutionError> {
        let (pc, op) = self.current;
        self.stack.pop().ok_or(ExecutionError::StackUnderflow {
            op: op.mnemonic(),
            pc,
        })
    }

    fn push(&mut self, word: Word) -> Result<(), ExecutionError> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(ExecutionError::StackOverflow { pc: self.current.0 });
        }
        self.stack.push(word);
        Ok(())
    }

    /// Pops `a` (top) then `b`, pushes `f(a, b)`.
    fn op_binary(&mut self, f: impl Fn(&Word, &Word) -> Word) -> Result<(), ExecutionError> {
        let a = self.pop()?;
        let b = self.pop()?;
        self.push(f(&a, &b))
    }

    fn op_keccak256(&mut self) -> Result<(), ExecutionError> {
        let offset = self.pop()?;
        let size = self.pop()?;
        let range = self.memory_range(&offset, &size)?;
        let digest = Word::keccak256().chain(&self.memory[range]).finalize();
        self.push(digest)
    }

    /// `dest_offset, offset, size`: copies `src[offset..]` into memory,
    /// zero-filling past the end of `src`.
    fn op_copy(&mut self, src: &[u8]) -> Result<(), ExecutionError> {
        let dest = self.pop()?;
        let offset = self.pop()?;
        let size = self.pop()?;
        let range = self.memory_range(&dest, &size)?;
        copy_padded(&mut self.memory[range], src, &offset);
        Ok(())
    }

    fn op_push(&mut self, width: usize) -> Result<(), ExecutionError> {
        let word = self.read_immediate(width);
        self.push(word)
    }

    fn op_dup(&mut self, n: usize) -> Result<(), ExecutionError> {
        let len = self.stack.len();
        if len < n {
            return Err(self.underflow());
        }
        let word = self.stack[len - n];
        self.push(word)
    }

    fn op_swap(&mut self, n: usize) -> Result<(), ExecutionError> {
        let len = self.stack.len();
        if len < n + 1 {
            return Err(self.underflow());
        }
        self.stack.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// `offset, size`: the memory slice returned by RETURN and REVERT.
    fn op_output(&mut self) -> Result<Vec<u8>, ExecutionError> {
        let offset = self.pop()?;
        let size = self.pop()?;
        let range = self.memory_range(&offset, &size)?;
        Ok(self.memory[range].to_vec())
    }

    fn jump(&mut self, dest: Word) -> Result<(), ExecutionError> {
        let target = dest
            .to_usize()
            .filter(|&t| self.jump_dests.get(t).copied().unwrap_or(false));
        match target {
            Some(t) => {
                self.pc = t;
                Ok(())
            }
            None => Err(ExecutionError::InvalidJump {
                dest,
                pc: self.current.0,
            }),
        }
    }

    /// Reads a `width`-byte immediate, treating bytes past the end of the
    /// code as zero.
    /// Reads a `width`-byte immediate; bytes past the end of the code read as zero.
    fn read_immediate(&mut self, width: usize) -> Word {
        let mut word = [0u8; WORD_LEN];
        let start = self.pc.min(self.code.len());
        let end = self.pc.saturating_add(width).min(self.code.len());
        let at = WORD_LEN - width;
        word[at..at + (end - start)].copy_from_slice(&self.code[start..end]);
        self.pc = self.pc.saturating_add(width);
        Word::from(word)
    }

    /// Bounds-checks `offset..offset + size` and grows memory to cover it in
    /// whole words. A zero size touches nothing.
    fn memory_range(&mut self, offset: &Word, size: &Word) -> Result<Range<usize>, ExecutionError> {
        if size.is_zero() {
            return Ok(0..0);
        }
        let pc = self.current.0;
        let limit = || ExecutionError::MemoryLimit {
            offset: *offset,
            size: *size,
            pc,
        };
        let start = offset.to_usize().ok_or_else(limit)?;
        let len = size.to_usize().ok_or_else(limit)?;
        let end = start.checked_add(len).ok_or_else(limit)?;
        if end > MEMORY_LIMIT {
            return Err(limit());
        }
        let words = end.div_ceil(WORD_LEN) * WORD_LEN;
        if words > self.memory.len() {
            self.memory.resize(words, 0);
        }
        Ok(start..end)
    }

    fn underflow(&self) -> ExecutionError {
        let (pc, op) = self.current;
        ExecutionError::StackUnderflow {
            op: op.mnemonic(),
            pc,
        }
    }
}

/// Marks JUMPDEST bytes that are instructions rather than push data.
fn analyze_jump_dests(code: &[u8]) -> Vec<bool> {
    let mut dests = vec![false; code.len()];
    let mut i = 0;
    while i < code.len() {
        match OpCode::try_from(code[i]) {
            Ok(OpCode::JumpDest) => dests[i] = true,
            Ok(op) => i += op.immediate_len(),
            Err(_) => {}
        }
        i += 1;
    }
    dests
}

/// Fills `dest` from `src[offset..]`, zero past the end of `src`.
fn copy_padded(dest: &mut [u8], src: &[u8], offset: &Word) {
    dest.fill(0);
    let Some(start) = offset.to_usize().filter(|&s| s < src.len()) else {
        return;
    };
    let n = dest.len().min(src.len() - start);
    dest[..n].copy_from_slice(&src[start..start + n]);
}

fn shift_amount(shift: &Word) -> usize {
    shift.to_usize().unwrap_or(WORD_BITS)
}
