//! Program-to-bytecode compiler.
//!
//! Compilation runs in three steps over one [`Code`]:
//!
//! 1. **Flatten**: functional forms are unrolled depth-first, post-order
//!    (arguments before the instruction that consumes them) while a
//!    [`StackDepth`] checks every instruction's arity, depth assertions and
//!    declarations, and resolves window-relative DUP/SWAP requests.
//! 2. **Layout**: byte offsets of every label are computed with a uniform
//!    width for label pushes. The width starts at one byte (or the forced
//!    width) and grows until it addresses the largest label offset.
//! 3. **Encode**: bytes are emitted, label pushes carrying the resolved
//!    offsets at the width chosen during layout.
//!
//! All state lives in the compile call; distinct programs can be compiled
//! concurrently and compiling the same program twice yields the same bytes.

use crate::evm::errors::CompileError;
use crate::evm::isa::{MAX_PUSH_WIDTH, OpCode};
use crate::evm::operand::{Immediate, minimal_width};
use crate::evm::program::{Code, Directive};
use crate::evm::stack::{STACK_LIMIT, StackDepth};
use std::collections::HashMap;

/// Compilation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Largest stack depth the program may reach.
    pub stack_limit: usize,
    /// Forces the byte width of every label push; `None` picks the
    /// narrowest width that reaches the furthest label.
    pub jump_target_width: Option<usize>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            stack_limit: STACK_LIMIT,
            jump_target_width: None,
        }
    }
}

/// Flattened program element.
#[derive(Clone, Debug, PartialEq, Eq)]
enum AsmItem {
    Op(OpCode),
    Push(Immediate),
    PushLabel(String),
    Label(String),
}

impl AsmItem {
    /// Encoded size given the current label-push width.
    fn size(&self, label_width: usize) -> usize {
        match self {
            AsmItem::Op(op) => op.encoded_len(),
            AsmItem::Push(imm) => imm.encoded_len(),
            AsmItem::PushLabel(_) => 1 + label_width,
            AsmItem::Label(_) => OpCode::JumpDest.encoded_len(),
        }
    }
}

/// Label offsets for one compilation run.
#[derive(Debug, Default)]
struct LabelTable {
    offsets: HashMap<String, usize>,
    /// Largest declared offset.
    furthest: usize,
}

impl LabelTable {
    /// Pass 1: assigns offsets to labels with `width`-byte label pushes.
    fn layout(items: &[AsmItem], width: usize) -> Result<Self, CompileError> {
        let mut table = LabelTable::default();
        let mut offset = 0usize;
        for item in items {
            if let AsmItem::Label(name) = item {
                table.define(name, offset)?;
            }
            offset += item.size(width);
        }
        Ok(table)
    }

    fn define(&mut self, name: &str, offset: usize) -> Result<(), CompileError> {
        if self.offsets.contains_key(name) {
            return Err(CompileError::DuplicateLabel {
                label: name.to_string(),
            });
        }
        self.offsets.insert(name.to_string(), offset);
        self.furthest = self.furthest.max(offset);
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<usize, CompileError> {
        self.offsets
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UndefinedLabel {
                label: name.to_string(),
            })
    }
}

/// Depth-tracked flattening of nested directives.
struct Flattener {
    stack: StackDepth,
    items: Vec<AsmItem>,
}

impl Flattener {
    fn new(stack_limit: usize) -> Self {
        Self {
            stack: StackDepth::new(stack_limit),
            items: Vec::new(),
        }
    }

    fn directive(&mut self, directive: &Directive) -> Result<(), CompileError> {
        match directive {
            Directive::Op(op) => self.op(*op),
            Directive::Push(constant) => {
                let imm = constant.encode()?;
                self.stack.apply(imm.opcode())?;
                self.items.push(AsmItem::Push(imm));
                Ok(())
            }
            Directive::PushLabel(name) => {
                self.stack.apply(OpCode::Push1)?;
                self.items.push(AsmItem::PushLabel(name.clone()));
                Ok(())
            }
            Directive::Label(name) => {
                self.stack.apply(OpCode::JumpDest)?;
                self.items.push(AsmItem::Label(name.clone()));
                Ok(())
            }
            Directive::ExpectDepth(depth) => self.stack.expect(*depth),
            Directive::SetDepth(depth) => self.stack.set(*depth),
            Directive::Call { op, args } => self.call(*op, args),
            Directive::Inverted(slot) => {
                let op = slot.resolve(self.stack.depth())?;
                self.op(op)
            }
        }
    }

    fn op(&mut self, op: OpCode) -> Result<(), CompileError> {
        if op.is_push() {
            return Err(CompileError::ImmediateRequired {
                op: op.mnemonic(),
            });
        }
        self.stack.apply(op)?;
        self.items.push(AsmItem::Op(op));
        Ok(())
    }

    fn call(&mut self, op: OpCode, args: &[Directive]) -> Result<(), CompileError> {
        if args.len() != op.pops() {
            return Err(CompileError::ArityMismatch {
                op: op.mnemonic(),
                expected: op.pops(),
                actual: args.len(),
            });
        }
        for arg in args {
            let entry = self.stack.depth();
            self.directive(arg)?;
            // each argument contributes exactly one value
            self.stack.expect(entry + 1)?;
        }
        self.op(op)
    }
}

/// Compiles `code` to bytecode.
///
/// Returns the first error encountered; no partial output is produced.
pub fn compile(code: &Code, options: &CompileOptions) -> Result<Vec<u8>, CompileError> {
    let mut flat = Flattener::new(options.stack_limit);
    for directive in code {
        flat.directive(directive)?;
    }
    let items = flat.items;

    let width = label_width(&items, options.jump_target_width)?;
    let labels = LabelTable::layout(&items, width)?;
    assemble(&items, &labels, width)
}

/// Picks the uniform label-push width.
///
/// Widening a push can move labels further out, so the layout is repeated
/// until the width covers the furthest label. Width only grows, so this
/// settles after at most a few rounds.
fn label_width(items: &[AsmItem], forced: Option<usize>) -> Result<usize, CompileError> {
    if let Some(width) = forced {
        if !(1..=MAX_PUSH_WIDTH).contains(&width) {
            return Err(CompileError::OperandTooWide { width });
        }
        return Ok(width);
    }

    let mut width = 1;
    loop {
        let table = LabelTable::layout(items, width)?;
        let needed = minimal_width(table.furthest as u128);
        if needed <= width {
            return Ok(width);
        }
        width = needed;
    }
}

/// Pass 2: emits bytes with label pushes resolved.
fn assemble(items: &[AsmItem], labels: &LabelTable, width: usize) -> Result<Vec<u8>, CompileError> {
    let mut out = Vec::with_capacity(items.iter().map(|i| i.size(width)).sum());
    for item in items {
        match item {
            AsmItem::Op(op) => out.push(*op as u8),
            AsmItem::Push(imm) => imm.assemble(&mut out),
            AsmItem::PushLabel(name) => {
                let offset = labels.resolve(name)?;
                let imm = Immediate::padded(offset, width).ok_or_else(|| {
                    CompileError::JumpTargetOverflow {
                        label: name.clone(),
                        offset,
                        width,
                    }
                })?;
                imm.assemble(&mut out);
            }
            AsmItem::Label(name) => {
                debug_assert_eq!(labels.resolve(name).ok(), Some(out.len()));
                out.push(OpCode::JumpDest as u8);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::operand::Constant;
    use crate::evm::stack::StackSlot;
    use crate::types::word::{U256, Word};

    fn op(op: OpCode) -> Directive {
        Directive::op(op)
    }

    fn push(v: impl Into<Constant>) -> Directive {
        Directive::push(v)
    }

    #[test]
    fn compile_empty_code() {
        assert!(Code::new().compile().unwrap().is_empty());
    }

    #[test]
    fn compile_plain_instructions() {
        let code = Code::new()
            .op(OpCode::CallDataSize)
            .op(OpCode::Push0)
            .op(OpCode::Push0)
            .op(OpCode::CallDataCopy);
        assert_eq!(code.compile().unwrap(), vec![0x36, 0x5f, 0x5f, 0x37]);
    }

    #[test]
    fn compile_push_forms() {
        let code = Code::new()
            .push(0u64)
            .push([0u8, 0, 0])
            .push(Word::zero())
            .op(OpCode::Push0);
        let bytes = code.compile().unwrap();
        assert_eq!(&bytes[..2], &[0x60, 0x00]);
        assert_eq!(&bytes[2..6], &[0x62, 0x00, 0x00, 0x00]);
        assert_eq!(bytes[6], 0x7f);
        assert!(bytes[7..39].iter().all(|&b| b == 0));
        assert_eq!(bytes[39], 0x5f);
        assert_eq!(bytes.len(), 40);
    }

    #[test]
    fn zero_widths_are_distinguishable() {
        let small = Code::new().push(0u64).compile().unwrap();
        let full = Code::new().push(Word::zero()).compile().unwrap();
        assert_eq!(small.len(), 2);
        assert_eq!(full.len(), 33);
    }

    #[test]
    fn compile_unsuffixed_literals() {
        let code = Code::new().push(1).push(0x1234).call(OpCode::Add, [push(7), push(9)]);
        assert_eq!(
            code.compile().unwrap(),
            vec![0x60, 0x01, 0x61, 0x12, 0x34, 0x60, 0x07, 0x60, 0x09, 0x01]
        );
    }

    #[test]
    fn push_rejects_negative_literal() {
        let err = Code::new().push(-5).compile().unwrap_err();
        assert_eq!(err, CompileError::NegativeOperand { value: -5 });
    }

    #[test]
    fn compile_full_width_constant() {
        let value = U256::from_dec_str(
            "115792089237316195423570985008687907853269984665640564039457584007913129639935",
        )
        .unwrap();
        let bytes = Code::new().push(value).compile().unwrap();
        assert_eq!(bytes[0], 0x7f);
        assert!(bytes[1..].iter().all(|&b| b == 0xff));
        assert_eq!(bytes.len(), 33);
    }

    #[test]
    fn push_rejects_bad_operand_width() {
        let err = Code::new().push(vec![1u8; 33]).compile().unwrap_err();
        assert_eq!(err, CompileError::OperandTooWide { width: 33 });
    }

    #[test]
    fn push_opcode_without_immediate_is_rejected() {
        let err = Code::new().op(OpCode::Push2).compile().unwrap_err();
        assert_eq!(err, CompileError::ImmediateRequired { op: "PUSH2" });
    }

    #[test]
    fn call_emits_arguments_before_op() {
        let code = Code::new().call(OpCode::Sub, [push(1u8), op(OpCode::CallDataSize)]);
        assert_eq!(code.compile().unwrap(), vec![0x60, 0x01, 0x36, 0x03]);
    }

    #[test]
    fn nested_calls_flatten_post_order() {
        // SHR(CALLDATALOAD(0), 248)
        let code = Code::new().call(
            OpCode::Shr,
            [
                Directive::call(OpCode::CallDataLoad, [op(OpCode::Push0)]),
                push(248u8),
            ],
        );
        assert_eq!(code.compile().unwrap(), vec![0x5f, 0x35, 0x60, 0xf8, 0x1c]);
    }

    #[test]
    fn call_arity_mismatch() {
        let err = Code::new()
            .call(OpCode::Add, [push(1u8)])
            .compile()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::ArityMismatch {
                op: "ADD",
                expected: 2,
                actual: 1
            }
        );

        let err = Code::new()
            .call(OpCode::CallDataSize, [push(1u8)])
            .compile()
            .unwrap_err();
        assert!(matches!(err, CompileError::ArityMismatch { expected: 0, .. }));
    }

    #[test]
    fn call_argument_must_produce_one_value() {
        // POP consumes instead of producing
        let err = Code::new()
            .push(1u8)
            .call(OpCode::IsZero, [op(OpCode::Pop)])
            .compile()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::StackDepthMismatch {
                expected: 2,
                actual: 0
            }
        );
    }

    #[test]
    fn call_net_effect_on_enclosing_depth() {
        let code = Code::new()
            .call(OpCode::Add, [push(1u8), push(2u8)])
            .expect_depth(1)
            .call(OpCode::MStore, [push(0u8), op(OpCode::Push0)])
            .expect_depth(1);
        assert!(code.compile().is_ok());
    }

    #[test]
    fn underflow_is_reported() {
        let err = Code::new()
            .op(OpCode::Push0)
            .op(OpCode::Add)
            .compile()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::StackUnderflow {
                op: "ADD",
                required: 2,
                depth: 1
            }
        );
    }

    #[test]
    fn depth_assertions() {
        let ok = Code::new().op(OpCode::Pc).expect_depth(1).compile();
        assert!(ok.is_ok());

        let err = Code::new().op(OpCode::Pc).expect_depth(2).compile();
        assert_eq!(
            err,
            Err(CompileError::StackDepthMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn set_depth_is_adopted_without_check() {
        let code = Code::new().set_depth(2).op(OpCode::Add).expect_depth(1);
        assert_eq!(code.compile().unwrap(), vec![0x01]);
    }

    #[test]
    fn stack_limit_from_options() {
        let code: Code = std::iter::repeat_n(op(OpCode::Pc), 5).collect();
        let options = CompileOptions {
            stack_limit: 4,
            ..CompileOptions::default()
        };
        assert_eq!(
            code.compile_with(&options),
            Err(CompileError::StackOverflow { depth: 5, limit: 4 })
        );
        assert!(code.compile().is_ok());
    }

    #[test]
    fn inverted_uses_tracked_depth() {
        let code: Code = std::iter::repeat_n(op(OpCode::Pc), 12)
            .chain([Directive::inverted(StackSlot::Dup(1))])
            .collect();
        let bytes = code.compile().unwrap();
        assert_eq!(*bytes.last().unwrap(), OpCode::Dup12 as u8);

        let err = Code::new()
            .op(OpCode::Pc)
            .inverted(StackSlot::Swap(1))
            .compile()
            .unwrap_err();
        assert!(matches!(err, CompileError::StackSlotUnreachable { .. }));
    }

    // ==================== Labels ====================

    #[test]
    fn label_emits_jumpdest_at_offset() {
        let code = Code::new()
            .push_label("end")
            .op(OpCode::Jump)
            .op(OpCode::Invalid)
            .label("end");
        assert_eq!(code.compile().unwrap(), vec![0x60, 0x04, 0x56, 0xfe, 0x5b]);
    }

    #[test]
    fn backward_and_forward_references_agree() {
        let code = Code::new()
            .push_label("target")
            .op(OpCode::Pop)
            .label("target")
            .push_label("target")
            .op(OpCode::Pop)
            .push_label("target")
            .op(OpCode::Pop);
        let bytes = code.compile().unwrap();
        assert_eq!(bytes[3], OpCode::JumpDest as u8);
        for push_at in [0, 4, 7] {
            assert_eq!(bytes[push_at], OpCode::Push1 as u8);
            assert_eq!(bytes[push_at + 1], 3);
        }
    }

    #[test]
    fn undefined_label() {
        let err = Code::new()
            .push_label("missing")
            .op(OpCode::Jump)
            .compile()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UndefinedLabel {
                label: "missing".into()
            }
        );
    }

    #[test]
    fn duplicate_label() {
        let err = Code::new()
            .label("dup")
            .label("dup")
            .compile()
            .unwrap_err();
        assert_eq!(err, CompileError::DuplicateLabel { label: "dup".into() });
    }

    #[test]
    fn label_width_grows_with_program() {
        // 300 single-byte instructions push the label past 0xff
        let mut code = Code::new().push_label("far").op(OpCode::Pop);
        code.extend(std::iter::repeat_n(op(OpCode::JumpDest), 300));
        let code = code.label("far");
        let bytes = code.compile().unwrap();
        assert_eq!(bytes[0], OpCode::Push2 as u8);
        let offset = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
        assert_eq!(offset, bytes.len() - 1);
        assert_eq!(bytes[offset], OpCode::JumpDest as u8);
    }

    #[test]
    fn label_width_boundary() {
        fn program(padding: usize) -> Code {
            let mut code = Code::new();
            for _ in 0..4 {
                code = code.push_label("late").op(OpCode::Pop);
            }
            code.extend(std::iter::repeat_n(op(OpCode::JumpDest), padding));
            code.label("late")
        }

        // label at 0xff: one byte is enough
        let bytes = program(243).compile().unwrap();
        assert_eq!(&bytes[..2], &[OpCode::Push1 as u8, 0xff]);
        assert_eq!(bytes[0xff], OpCode::JumpDest as u8);

        // label at 0x100 with 1-byte pushes; widening shifts it by 4
        let bytes = program(244).compile().unwrap();
        assert_eq!(bytes[0], OpCode::Push2 as u8);
        let offset = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
        assert_eq!(offset, 260);
        for push_at in (0..16).step_by(4) {
            assert_eq!(&bytes[push_at..push_at + 3], &[0x61, 0x01, 0x04]);
        }
        assert_eq!(bytes[offset], OpCode::JumpDest as u8);
    }

    #[test]
    fn forced_label_width() {
        let code = Code::new()
            .push_label("l")
            .op(OpCode::Jump)
            .label("l");
        let options = CompileOptions {
            jump_target_width: Some(4),
            ..CompileOptions::default()
        };
        assert_eq!(
            code.compile_with(&options).unwrap(),
            vec![0x63, 0, 0, 0, 6, 0x56, 0x5b]
        );

        let mut far = Code::new().push_label("far").op(OpCode::Pop);
        far.extend(std::iter::repeat_n(op(OpCode::JumpDest), 300));
        let far = far.label("far");
        let options = CompileOptions {
            jump_target_width: Some(1),
            ..CompileOptions::default()
        };
        assert!(matches!(
            far.compile_with(&options),
            Err(CompileError::JumpTargetOverflow { width: 1, .. })
        ));

        let options = CompileOptions {
            jump_target_width: Some(0),
            ..CompileOptions::default()
        };
        assert_eq!(
            code.compile_with(&options),
            Err(CompileError::OperandTooWide { width: 0 })
        );
    }

    #[test]
    fn compile_is_deterministic() {
        let code = Code::new()
            .label("top")
            .call(OpCode::Add, [push(7u8), push(Word::from(9u64))])
            .push_label("top")
            .op(OpCode::JumpI);
        assert_eq!(code.compile().unwrap(), code.compile().unwrap());
    }

    #[test]
    fn concurrent_compiles_do_not_interfere() {
        let programs: Vec<Code> = (0..8u64)
            .map(|i| {
                Code::new()
                    .push(i)
                    .push_label(format!("l{i}"))
                    .op(OpCode::JumpI)
                    .label(format!("l{i}"))
            })
            .collect();
        let expected: Vec<_> = programs.iter().map(|c| c.compile().unwrap()).collect();

        let handles: Vec<_> = programs
            .into_iter()
            .map(|code| std::thread::spawn(move || code.compile().unwrap()))
            .collect();
        for (handle, want) in handles.into_iter().zip(expected) {
            assert_eq!(handle.join().unwrap(), want);
        }
    }
}
