//! Push operand encoding.
//!
//! A push request names a constant in one of three source forms, and the
//! form decides the immediate width:
//!
//! - [`Constant::Int`]: narrowest big-endian encoding, at least one byte
//!   (`0` becomes `PUSH1 0x00`, never `PUSH0`); negative values are rejected
//! - [`Constant::Bytes`]: verbatim, width is the sequence length
//! - [`Constant::Word`]: always the full 32 bytes, even for zero

use crate::evm::errors::CompileError;
use crate::evm::isa::OpCode;
use crate::types::word::{U256, WORD_LEN, Word};

/// A constant as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constant {
    /// Plain integer literal; must not be negative.
    Int(i128),
    /// Explicit big-endian bytes.
    Bytes(Vec<u8>),
    /// Full-width value.
    Word(Word),
}

impl Constant {
    /// Chooses the immediate for this constant.
    pub fn encode(&self) -> Result<Immediate, CompileError> {
        match self {
            Constant::Int(v) => {
                let value = u128::try_from(*v)
                    .map_err(|_| CompileError::NegativeOperand { value: *v })?;
                let be = value.to_be_bytes();
                let width = minimal_width(value);
                Immediate::new(be[be.len() - width..].to_vec())
            }
            Constant::Bytes(bytes) => Immediate::new(bytes.clone()),
            Constant::Word(w) => Immediate::new(w.to_be_bytes().to_vec()),
        }
    }
}

macro_rules! constant_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Constant {
                fn from(v: $t) -> Self {
                    Constant::Int(v as i128)
                }
            }
        )*
    };
}

// i32 is the type of an unsuffixed literal such as `push(7)`
constant_from_int!(u8, u16, u32, u64, usize, i32, i64, i128);

impl From<Vec<u8>> for Constant {
    fn from(bytes: Vec<u8>) -> Self {
        Constant::Bytes(bytes)
    }
}

impl From<&[u8]> for Constant {
    fn from(bytes: &[u8]) -> Self {
        Constant::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Constant {
    fn from(bytes: [u8; N]) -> Self {
        Constant::Bytes(bytes.to_vec())
    }
}

impl From<Word> for Constant {
    fn from(w: Word) -> Self {
        Constant::Word(w)
    }
}

impl From<U256> for Constant {
    fn from(value: U256) -> Self {
        Constant::Word(Word(value))
    }
}

/// An encoded `PUSHn` immediate; the width selects the opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Immediate {
    opcode: OpCode,
    bytes: Vec<u8>,
}

impl Immediate {
    /// Wraps `bytes` as an immediate, rejecting widths outside `1..=32`.
    pub fn new(bytes: Vec<u8>) -> Result<Self, CompileError> {
        let Some(opcode) = OpCode::push(bytes.len()) else {
            return Err(CompileError::OperandTooWide { width: bytes.len() });
        };
        Ok(Self { opcode, bytes })
    }

    /// Encodes `value` left-padded to exactly `width` bytes.
    ///
    /// Returns `None` when the value needs more than `width` bytes.
    pub fn padded(value: usize, width: usize) -> Option<Self> {
        let opcode = OpCode::push(width)?;
        if minimal_width(value as u128) > width {
            return None;
        }
        let be = Word::from(value as u64).to_be_bytes();
        Some(Self {
            opcode,
            bytes: be[WORD_LEN - width..].to_vec(),
        })
    }

    pub fn width(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The `PUSHn` opcode matching this width.
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Opcode byte plus immediate.
    pub fn encoded_len(&self) -> usize {
        1 + self.width()
    }

    /// Appends the opcode and the immediate bytes.
    pub fn assemble(&self, out: &mut Vec<u8>) {
        out.push(self.opcode() as u8);
        out.extend_from_slice(&self.bytes);
    }
}

/// Smallest number of bytes that holds `value`, never less than one.
pub fn minimal_width(value: u128) -> usize {
    let significant = (u128::BITS - value.leading_zeros()).div_ceil(8) as usize;
    significant.clamp(1, WORD_LEN)
}
