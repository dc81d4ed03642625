//! Instruction set definitions.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode table and invokes a callback macro for code generation, so the
//! assembler, the interpreter and the table fingerprint all read one list.
//!
//! Each entry is `Name = opcode, "MNEMONIC" => [pops, pushes] + immediate`:
//! the number of stack items consumed, the number produced, and (for
//! `PUSHn` only) the immediate width in bytes.
//!
//! This module generates:
//! - The [`OpCode`] enum with opcode values
//! - `TryFrom<u8>` for decoding
//! - Static arity and immediate-width accessors

use crate::evm::errors::UnknownOpcode;
use std::fmt;

/// Invokes a callback macro with the complete opcode table.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Stop and arithmetic
            // =========================
            /// STOP ; halts execution
            Stop = 0x00, "STOP" => [0, 0],
            /// ADD a, b ; a + b (mod 2^256)
            Add = 0x01, "ADD" => [2, 1],
            /// MUL a, b ; a * b (mod 2^256)
            Mul = 0x02, "MUL" => [2, 1],
            /// SUB a, b ; a - b (mod 2^256)
            Sub = 0x03, "SUB" => [2, 1],
            /// DIV a, b ; a / b, zero if b == 0
            Div = 0x04, "DIV" => [2, 1],
            /// SDIV a, b ; signed a / b
            SDiv = 0x05, "SDIV" => [2, 1],
            /// MOD a, b ; a % b, zero if b == 0
            Mod = 0x06, "MOD" => [2, 1],
            /// SMOD a, b ; signed a % b
            SMod = 0x07, "SMOD" => [2, 1],
            /// ADDMOD a, b, n ; (a + b) % n
            AddMod = 0x08, "ADDMOD" => [3, 1],
            /// MULMOD a, b, n ; (a * b) % n
            MulMod = 0x09, "MULMOD" => [3, 1],
            /// EXP a, e ; a ** e (mod 2^256)
            Exp = 0x0A, "EXP" => [2, 1],
            /// SIGNEXTEND b, x ; sign-extend x from byte b
            SignExtend = 0x0B, "SIGNEXTEND" => [2, 1],
            // =========================
            // Comparison and bitwise logic
            // =========================
            /// LT a, b ; a < b
            Lt = 0x10, "LT" => [2, 1],
            /// GT a, b ; a > b
            Gt = 0x11, "GT" => [2, 1],
            /// SLT a, b ; signed a < b
            SLt = 0x12, "SLT" => [2, 1],
            /// SGT a, b ; signed a > b
            SGt = 0x13, "SGT" => [2, 1],
            /// EQ a, b ; a == b
            Eq = 0x14, "EQ" => [2, 1],
            /// ISZERO a ; a == 0
            IsZero = 0x15, "ISZERO" => [1, 1],
            /// AND a, b ; bitwise a & b
            And = 0x16, "AND" => [2, 1],
            /// OR a, b ; bitwise a | b
            Or = 0x17, "OR" => [2, 1],
            /// XOR a, b ; bitwise a ^ b
            Xor = 0x18, "XOR" => [2, 1],
            /// NOT a ; bitwise !a
            Not = 0x19, "NOT" => [1, 1],
            /// BYTE i, x ; i-th most significant byte of x
            Byte = 0x1A, "BYTE" => [2, 1],
            /// SHL shift, value ; value << shift
            Shl = 0x1B, "SHL" => [2, 1],
            /// SHR shift, value ; value >> shift (logical)
            Shr = 0x1C, "SHR" => [2, 1],
            /// SAR shift, value ; value >> shift (arithmetic)
            Sar = 0x1D, "SAR" => [2, 1],
            // =========================
            // Hashing
            // =========================
            /// KECCAK256 offset, size ; keccak256(memory[offset..offset+size])
            Keccak256 = 0x20, "KECCAK256" => [2, 1],
            // =========================
            // Environment
            // =========================
            /// ADDRESS ; address of the executing account
            Address = 0x30, "ADDRESS" => [0, 1],
            /// BALANCE addr ; balance of addr
            Balance = 0x31, "BALANCE" => [1, 1],
            /// ORIGIN ; transaction origin
            Origin = 0x32, "ORIGIN" => [0, 1],
            /// CALLER ; direct caller
            Caller = 0x33, "CALLER" => [0, 1],
            /// CALLVALUE ; value sent with the call
            CallValue = 0x34, "CALLVALUE" => [0, 1],
            /// CALLDATALOAD i ; calldata[i..i+32], zero padded
            CallDataLoad = 0x35, "CALLDATALOAD" => [1, 1],
            /// CALLDATASIZE ; calldata length in bytes
            CallDataSize = 0x36, "CALLDATASIZE" => [0, 1],
            /// CALLDATACOPY dest, offset, size ; memory[dest..] = calldata[offset..offset+size]
            CallDataCopy = 0x37, "CALLDATACOPY" => [3, 0],
            /// CODESIZE ; length of the executing code
            CodeSize = 0x38, "CODESIZE" => [0, 1],
            /// CODECOPY dest, offset, size ; memory[dest..] = code[offset..offset+size]
            CodeCopy = 0x39, "CODECOPY" => [3, 0],
            /// GASPRICE ; gas price of the transaction
            GasPrice = 0x3A, "GASPRICE" => [0, 1],
            /// EXTCODESIZE addr ; code length of addr
            ExtCodeSize = 0x3B, "EXTCODESIZE" => [1, 1],
            /// EXTCODECOPY addr, dest, offset, size ; copy code of addr to memory
            ExtCodeCopy = 0x3C, "EXTCODECOPY" => [4, 0],
            /// RETURNDATASIZE ; length of the last call's return data
            ReturnDataSize = 0x3D, "RETURNDATASIZE" => [0, 1],
            /// RETURNDATACOPY dest, offset, size ; copy return data to memory
            ReturnDataCopy = 0x3E, "RETURNDATACOPY" => [3, 0],
            /// EXTCODEHASH addr ; code hash of addr
            ExtCodeHash = 0x3F, "EXTCODEHASH" => [1, 1],
            // =========================
            // Block information
            // =========================
            /// BLOCKHASH n ; hash of block n
            BlockHash = 0x40, "BLOCKHASH" => [1, 1],
            /// COINBASE ; block beneficiary
            Coinbase = 0x41, "COINBASE" => [0, 1],
            /// TIMESTAMP ; block timestamp
            Timestamp = 0x42, "TIMESTAMP" => [0, 1],
            /// NUMBER ; block number
            Number = 0x43, "NUMBER" => [0, 1],
            /// PREVRANDAO ; beacon randomness
            PrevRandao = 0x44, "PREVRANDAO" => [0, 1],
            /// GASLIMIT ; block gas limit
            GasLimit = 0x45, "GASLIMIT" => [0, 1],
            /// CHAINID ; chain identifier
            ChainId = 0x46, "CHAINID" => [0, 1],
            /// SELFBALANCE ; balance of the executing account
            SelfBalance = 0x47, "SELFBALANCE" => [0, 1],
            /// BASEFEE ; block base fee
            BaseFee = 0x48, "BASEFEE" => [0, 1],
            /// BLOBHASH i ; versioned hash of blob i
            BlobHash = 0x49, "BLOBHASH" => [1, 1],
            /// BLOBBASEFEE ; blob base fee
            BlobBaseFee = 0x4A, "BLOBBASEFEE" => [0, 1],
            // =========================
            // Stack, memory, storage and flow
            // =========================
            /// POP a ; discards the top of the stack
            Pop = 0x50, "POP" => [1, 0],
            /// MLOAD offset ; memory[offset..offset+32]
            MLoad = 0x51, "MLOAD" => [1, 1],
            /// MSTORE offset, value ; memory[offset..offset+32] = value
            MStore = 0x52, "MSTORE" => [2, 0],
            /// MSTORE8 offset, value ; memory[offset] = value & 0xff
            MStore8 = 0x53, "MSTORE8" => [2, 0],
            /// SLOAD key ; storage[key]
            SLoad = 0x54, "SLOAD" => [1, 1],
            /// SSTORE key, value ; storage[key] = value
            SStore = 0x55, "SSTORE" => [2, 0],
            /// JUMP dest ; pc = dest
            Jump = 0x56, "JUMP" => [1, 0],
            /// JUMPI dest, cond ; pc = dest if cond != 0
            JumpI = 0x57, "JUMPI" => [2, 0],
            /// PC ; offset of this instruction
            Pc = 0x58, "PC" => [0, 1],
            /// MSIZE ; active memory size in bytes
            MSize = 0x59, "MSIZE" => [0, 1],
            /// GAS ; remaining gas
            Gas = 0x5A, "GAS" => [0, 1],
            /// JUMPDEST ; marks a valid jump destination
            JumpDest = 0x5B, "JUMPDEST" => [0, 0],
            /// TLOAD key ; transient storage[key]
            TLoad = 0x5C, "TLOAD" => [1, 1],
            /// TSTORE key, value ; transient storage[key] = value
            TStore = 0x5D, "TSTORE" => [2, 0],
            /// MCOPY dest, offset, size ; memory-to-memory copy
            MCopy = 0x5E, "MCOPY" => [3, 0],
            // =========================
            // Push
            // =========================
            /// PUSH0 ; pushes zero without an immediate
            Push0 = 0x5F, "PUSH0" => [0, 1],
            /// PUSH1 imm ; pushes a 1-byte big-endian immediate
            Push1 = 0x60, "PUSH1" => [0, 1] + 1,
            /// PUSH2 imm ; pushes a 2-byte big-endian immediate
            Push2 = 0x61, "PUSH2" => [0, 1] + 2,
            /// PUSH3 imm ; pushes a 3-byte big-endian immediate
            Push3 = 0x62, "PUSH3" => [0, 1] + 3,
            /// PUSH4 imm ; pushes a 4-byte big-endian immediate
            Push4 = 0x63, "PUSH4" => [0, 1] + 4,
            /// PUSH5 imm ; pushes a 5-byte big-endian immediate
            Push5 = 0x64, "PUSH5" => [0, 1] + 5,
            /// PUSH6 imm ; pushes a 6-byte big-endian immediate
            Push6 = 0x65, "PUSH6" => [0, 1] + 6,
            /// PUSH7 imm ; pushes a 7-byte big-endian immediate
            Push7 = 0x66, "PUSH7" => [0, 1] + 7,
            /// PUSH8 imm ; pushes a 8-byte big-endian immediate
            Push8 = 0x67, "PUSH8" => [0, 1] + 8,
            /// PUSH9 imm ; pushes a 9-byte big-endian immediate
            Push9 = 0x68, "PUSH9" => [0, 1] + 9,
            /// PUSH10 imm ; pushes a 10-byte big-endian immediate
            Push10 = 0x69, "PUSH10" => [0, 1] + 10,
            /// PUSH11 imm ; pushes a 11-byte big-endian immediate
            Push11 = 0x6A, "PUSH11" => [0, 1] + 11,
            /// PUSH12 imm ; pushes a 12-byte big-endian immediate
            Push12 = 0x6B, "PUSH12" => [0, 1] + 12,
            /// PUSH13 imm ; pushes a 13-byte big-endian immediate
            Push13 = 0x6C, "PUSH13" => [0, 1] + 13,
            /// PUSH14 imm ; pushes a 14-byte big-endian immediate
            Push14 = 0x6D, "PUSH14" => [0, 1] + 14,
            /// PUSH15 imm ; pushes a 15-byte big-endian immediate
            Push15 = 0x6E, "PUSH15" => [0, 1] + 15,
            /// PUSH16 imm ; pushes a 16-byte big-endian immediate
            Push16 = 0x6F, "PUSH16" => [0, 1] + 16,
            /// PUSH17 imm ; pushes a 17-byte big-endian immediate
            Push17 = 0x70, "PUSH17" => [0, 1] + 17,
            /// PUSH18 imm ; pushes a 18-byte big-endian immediate
            Push18 = 0x71, "PUSH18" => [0, 1] + 18,
            /// PUSH19 imm ; pushes a 19-byte big-endian immediate
            Push19 = 0x72, "PUSH19" => [0, 1] + 19,
            /// PUSH20 imm ; pushes a 20-byte big-endian immediate
            Push20 = 0x73, "PUSH20" => [0, 1] + 20,
            /// PUSH21 imm ; pushes a 21-byte big-endian immediate
            Push21 = 0x74, "PUSH21" => [0, 1] + 21,
            /// PUSH22 imm ; pushes a 22-byte big-endian immediate
            Push22 = 0x75, "PUSH22" => [0, 1] + 22,
            /// PUSH23 imm ; pushes a 23-byte big-endian immediate
            Push23 = 0x76, "PUSH23" => [0, 1] + 23,
            /// PUSH24 imm ; pushes a 24-byte big-endian immediate
            Push24 = 0x77, "PUSH24" => [0, 1] + 24,
            /// PUSH25 imm ; pushes a 25-byte big-endian immediate
            Push25 = 0x78, "PUSH25" => [0, 1] + 25,
            /// PUSH26 imm ; pushes a 26-byte big-endian immediate
            Push26 = 0x79, "PUSH26" => [0, 1] + 26,
            /// PUSH27 imm ; pushes a 27-byte big-endian immediate
            Push27 = 0x7A, "PUSH27" => [0, 1] + 27,
            /// PUSH28 imm ; pushes a 28-byte big-endian immediate
            Push28 = 0x7B, "PUSH28" => [0, 1] + 28,
            /// PUSH29 imm ; pushes a 29-byte big-endian immediate
            Push29 = 0x7C, "PUSH29" => [0, 1] + 29,
            /// PUSH30 imm ; pushes a 30-byte big-endian immediate
            Push30 = 0x7D, "PUSH30" => [0, 1] + 30,
            /// PUSH31 imm ; pushes a 31-byte big-endian immediate
            Push31 = 0x7E, "PUSH31" => [0, 1] + 31,
            /// PUSH32 imm ; pushes a 32-byte big-endian immediate
            Push32 = 0x7F, "PUSH32" => [0, 1] + 32,
            // =========================
            // Duplicate
            // =========================
            /// DUP1 ; copies the 1st stack item to the top
            Dup1 = 0x80, "DUP1" => [1, 2],
            /// DUP2 ; copies the 2nd stack item to the top
            Dup2 = 0x81, "DUP2" => [2, 3],
            /// DUP3 ; copies the 3rd stack item to the top
            Dup3 = 0x82, "DUP3" => [3, 4],
            /// DUP4 ; copies the 4th stack item to the top
            Dup4 = 0x83, "DUP4" => [4, 5],
            /// DUP5 ; copies the 5th stack item to the top
            Dup5 = 0x84, "DUP5" => [5, 6],
            /// DUP6 ; copies the 6th stack item to the top
            Dup6 = 0x85, "DUP6" => [6, 7],
            /// DUP7 ; copies the 7th stack item to the top
            Dup7 = 0x86, "DUP7" => [7, 8],
            /// DUP8 ; copies the 8th stack item to the top
            Dup8 = 0x87, "DUP8" => [8, 9],
            /// DUP9 ; copies the 9th stack item to the top
            Dup9 = 0x88, "DUP9" => [9, 10],
            /// DUP10 ; copies the 10th stack item to the top
            Dup10 = 0x89, "DUP10" => [10, 11],
            /// DUP11 ; copies the 11th stack item to the top
            Dup11 = 0x8A, "DUP11" => [11, 12],
            /// DUP12 ; copies the 12th stack item to the top
            Dup12 = 0x8B, "DUP12" => [12, 13],
            /// DUP13 ; copies the 13th stack item to the top
            Dup13 = 0x8C, "DUP13" => [13, 14],
            /// DUP14 ; copies the 14th stack item to the top
            Dup14 = 0x8D, "DUP14" => [14, 15],
            /// DUP15 ; copies the 15th stack item to the top
            Dup15 = 0x8E, "DUP15" => [15, 16],
            /// DUP16 ; copies the 16th stack item to the top
            Dup16 = 0x8F, "DUP16" => [16, 17],
            // =========================
            // Exchange
            // =========================
            /// SWAP1 ; exchanges the top with the 2nd stack item
            Swap1 = 0x90, "SWAP1" => [2, 2],
            /// SWAP2 ; exchanges the top with the 3rd stack item
            Swap2 = 0x91, "SWAP2" => [3, 3],
            /// SWAP3 ; exchanges the top with the 4th stack item
            Swap3 = 0x92, "SWAP3" => [4, 4],
            /// SWAP4 ; exchanges the top with the 5th stack item
            Swap4 = 0x93, "SWAP4" => [5, 5],
            /// SWAP5 ; exchanges the top with the 6th stack item
            Swap5 = 0x94, "SWAP5" => [6, 6],
            /// SWAP6 ; exchanges the top with the 7th stack item
            Swap6 = 0x95, "SWAP6" => [7, 7],
            /// SWAP7 ; exchanges the top with the 8th stack item
            Swap7 = 0x96, "SWAP7" => [8, 8],
            /// SWAP8 ; exchanges the top with the 9th stack item
            Swap8 = 0x97, "SWAP8" => [9, 9],
            /// SWAP9 ; exchanges the top with the 10th stack item
            Swap9 = 0x98, "SWAP9" => [10, 10],
            /// SWAP10 ; exchanges the top with the 11th stack item
            Swap10 = 0x99, "SWAP10" => [11, 11],
            /// SWAP11 ; exchanges the top with the 12th stack item
            Swap11 = 0x9A, "SWAP11" => [12, 12],
            /// SWAP12 ; exchanges the top with the 13th stack item
            Swap12 = 0x9B, "SWAP12" => [13, 13],
            /// SWAP13 ; exchanges the top with the 14th stack item
            Swap13 = 0x9C, "SWAP13" => [14, 14],
            /// SWAP14 ; exchanges the top with the 15th stack item
            Swap14 = 0x9D, "SWAP14" => [15, 15],
            /// SWAP15 ; exchanges the top with the 16th stack item
            Swap15 = 0x9E, "SWAP15" => [16, 16],
            /// SWAP16 ; exchanges the top with the 17th stack item
            Swap16 = 0x9F, "SWAP16" => [17, 17],
            // =========================
            // Logging
            // =========================
            /// LOG0 offset, size ; emits a log with 0 topics
            Log0 = 0xA0, "LOG0" => [2, 0],
            /// LOG1 offset, size, topic0 ; emits a log with 1 topics
            Log1 = 0xA1, "LOG1" => [3, 0],
            /// LOG2 offset, size, topic0, topic1 ; emits a log with 2 topics
            Log2 = 0xA2, "LOG2" => [4, 0],
            /// LOG3 offset, size, topic0, topic1, topic2 ; emits a log with 3 topics
            Log3 = 0xA3, "LOG3" => [5, 0],
            /// LOG4 offset, size, topic0, topic1, topic2, topic3 ; emits a log with 4 topics
            Log4 = 0xA4, "LOG4" => [6, 0],
            // =========================
            // System
            // =========================
            /// CREATE value, offset, size ; deploys a contract
            Create = 0xF0, "CREATE" => [3, 1],
            /// CALL gas, addr, value, in_offset, in_size, out_offset, out_size
            Call = 0xF1, "CALL" => [7, 1],
            /// CALLCODE gas, addr, value, in_offset, in_size, out_offset, out_size
            CallCode = 0xF2, "CALLCODE" => [7, 1],
            /// RETURN offset, size ; halts, returning memory[offset..offset+size]
            Return = 0xF3, "RETURN" => [2, 0],
            /// DELEGATECALL gas, addr, in_offset, in_size, out_offset, out_size
            DelegateCall = 0xF4, "DELEGATECALL" => [6, 1],
            /// CREATE2 value, offset, size, salt ; deploys at a deterministic address
            Create2 = 0xF5, "CREATE2" => [4, 1],
            /// STATICCALL gas, addr, in_offset, in_size, out_offset, out_size
            StaticCall = 0xFA, "STATICCALL" => [6, 1],
            /// REVERT offset, size ; halts, reverting with memory[offset..offset+size]
            Revert = 0xFD, "REVERT" => [2, 0],
            /// INVALID ; designated invalid instruction
            Invalid = 0xFE, "INVALID" => [0, 0],
            /// SELFDESTRUCT addr ; schedules the account for deletion
            SelfDestruct = 0xFF, "SELFDESTRUCT" => [1, 0],
        }
    };
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [$pops:literal, $pushes:literal] $(+ $imm:literal)?
        ),* $(,)?
    ) => {
        /// A machine instruction from the closed opcode set.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum OpCode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for OpCode {
            type Error = UnknownOpcode;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(OpCode::$name), )*
                    _ => Err(UnknownOpcode(value)),
                }
            }
        }

        impl OpCode {
            /// Every opcode in table order.
            pub const ALL: &'static [OpCode] = &[ $( OpCode::$name, )* ];

            /// Returns the assembly mnemonic.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( OpCode::$name => $mnemonic, )*
                }
            }

            /// Number of stack items consumed.
            pub const fn pops(&self) -> usize {
                match self {
                    $( OpCode::$name => $pops, )*
                }
            }

            /// Number of stack items produced.
            pub const fn pushes(&self) -> usize {
                match self {
                    $( OpCode::$name => $pushes, )*
                }
            }

            /// Width of the inline immediate following the opcode byte.
            pub const fn immediate_len(&self) -> usize {
                match self {
                    $( OpCode::$name => 0 $( + $imm )?, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

/// Largest immediate a `PUSHn` can carry.
pub const MAX_PUSH_WIDTH: usize = 32;

/// Number of distinct `DUPn` (and `SWAPn`) opcodes.
pub const STACK_WINDOW: usize = 16;

impl OpCode {
    /// `PUSHn` for `1 <= width <= 32`.
    pub fn push(width: usize) -> Option<OpCode> {
        if !(1..=MAX_PUSH_WIDTH).contains(&width) {
            return None;
        }
        OpCode::try_from(OpCode::Push0 as u8 + width as u8).ok()
    }

    /// `DUPn` for `1 <= n <= 16`.
    pub fn dup(n: usize) -> Option<OpCode> {
        if !(1..=STACK_WINDOW).contains(&n) {
            return None;
        }
        OpCode::try_from(OpCode::Dup1 as u8 + (n - 1) as u8).ok()
    }

    /// `SWAPn` for `1 <= n <= 16`.
    pub fn swap(n: usize) -> Option<OpCode> {
        if !(1..=STACK_WINDOW).contains(&n) {
            return None;
        }
        OpCode::try_from(OpCode::Swap1 as u8 + (n - 1) as u8).ok()
    }

    /// True for `PUSH1`..`PUSH32`; `PUSH0` carries no immediate.
    pub const fn is_push(&self) -> bool {
        self.immediate_len() > 0
    }

    /// Encoded length: the opcode byte plus its immediate.
    pub const fn encoded_len(&self) -> usize {
        1 + self.immediate_len()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
