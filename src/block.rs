//! Basic blocks: the index-linked instruction list, phi-prefix helpers,
//! terminator lookup and CFG edge bookkeeping.
//!
//! Blocks are values; branch targets and phi incoming blocks reference them
//! as real operands, while the predecessor/successor multisets mirror the
//! current terminator's targets.

use crate::error::IrError;
use crate::module::Module;
use crate::value::{ValueId, ValueKind};

/// Payload of a basic block value.
#[derive(Debug, Clone)]
pub struct BlockData {
    pub func: ValueId,
    pub head: Option<ValueId>,
    pub tail: Option<ValueId>,
    pub preds: Vec<ValueId>,
    pub succs: Vec<ValueId>,
}

impl BlockData {
    pub fn new(func: ValueId) -> Self {
        Self {
            func,
            head: None,
            tail: None,
            preds: Vec::new(),
            succs: Vec::new(),
        }
    }
}

impl Module {
    pub(crate) fn block_data(&self, bb: ValueId) -> &BlockData {
        match &self.values.get(bb).kind {
            ValueKind::Block(data) => data,
            _ => panic!("value is not a basic block"),
        }
    }

    pub(crate) fn block_data_mut(&mut self, bb: ValueId) -> &mut BlockData {
        match &mut self.values.get_mut(bb).kind {
            ValueKind::Block(data) => data,
            _ => panic!("value is not a basic block"),
        }
    }

    pub fn is_block(&self, v: ValueId) -> bool {
        matches!(self.values.get(v).kind, ValueKind::Block(_))
    }

    /// Function that owns this block.
    pub fn block_parent(&self, bb: ValueId) -> ValueId {
        self.block_data(bb).func
    }

    pub fn first_instruction(&self, bb: ValueId) -> Option<ValueId> {
        self.block_data(bb).head
    }

    pub fn last_instruction(&self, bb: ValueId) -> Option<ValueId> {
        self.block_data(bb).tail
    }

    pub fn inst_next(&self, inst: ValueId) -> Option<ValueId> {
        self.values.inst(inst).and_then(|data| data.next)
    }

    pub fn inst_prev(&self, inst: ValueId) -> Option<ValueId> {
        self.values.inst(inst).and_then(|data| data.prev)
    }

    /// Block that owns this instruction.
    pub fn inst_parent(&self, inst: ValueId) -> Option<ValueId> {
        self.values.inst(inst).map(|data| data.block)
    }

    /// Forward iteration over a block's instructions.
    pub fn instructions(&self, bb: ValueId) -> InstIter<'_> {
        InstIter {
            module: self,
            cursor: self.first_instruction(bb),
        }
    }

    /// The tail instruction, if it is a terminator.
    pub fn get_terminator(&self, bb: ValueId) -> Option<ValueId> {
        let tail = self.block_data(bb).tail?;
        let data = self.values.inst(tail)?;
        data.opcode.is_terminator().then_some(tail)
    }

    /// First instruction that is not a phi.
    pub fn first_non_phi(&self, bb: ValueId) -> Option<ValueId> {
        let mut cursor = self.first_instruction(bb);
        while let Some(inst) = cursor {
            let data = self.values.inst(inst)?;
            if !data.opcode.is_phi() {
                return Some(inst);
            }
            cursor = data.next;
        }
        None
    }

    /// Last instruction that is not a phi.
    pub fn last_non_phi(&self, bb: ValueId) -> Option<ValueId> {
        let mut cursor = self.last_instruction(bb);
        while let Some(inst) = cursor {
            let data = self.values.inst(inst)?;
            if !data.opcode.is_phi() {
                return Some(inst);
            }
            cursor = data.prev;
        }
        None
    }

    pub fn predecessors(&self, bb: ValueId) -> &[ValueId] {
        &self.block_data(bb).preds
    }

    pub fn successors(&self, bb: ValueId) -> &[ValueId] {
        &self.block_data(bb).succs
    }

    /// Records a CFG edge on both endpoints.
    pub(crate) fn add_successor(&mut self, bb: ValueId, succ: ValueId) {
        self.block_data_mut(bb).succs.push(succ);
        self.block_data_mut(succ).preds.push(bb);
    }

    /// Drops every edge recorded by this block's terminator.
    pub(crate) fn clear_successors(&mut self, bb: ValueId) {
        let succs = std::mem::take(&mut self.block_data_mut(bb).succs);
        for succ in succs {
            let preds = &mut self.block_data_mut(succ).preds;
            if let Some(pos) = preds.iter().position(|&p| p == bb) {
                preds.remove(pos);
            }
        }
    }

    /// Links `inst` at the tail of `bb`. Fails if the block already ends in
    /// a terminator. This is the raw splice; the builder's factories are the
    /// checked entry point.
    pub fn append_instruction(&mut self, bb: ValueId, inst: ValueId) -> Result<(), IrError> {
        if self.get_terminator(bb).is_some() {
            return Err(IrError::BlockAlreadyTerminated);
        }
        let old_tail = self.block_data(bb).tail;
        {
            let data = self.values.inst_mut(inst).expect("appending a non-instruction");
            data.block = bb;
            data.prev = old_tail;
            data.next = None;
        }
        if let Some(tail) = old_tail {
            self.values.inst_mut(tail).expect("tail is an instruction").next = Some(inst);
        }
        let block = self.block_data_mut(bb);
        if block.head.is_none() {
            block.head = Some(inst);
        }
        block.tail = Some(inst);
        Ok(())
    }

    /// Splices `inst` immediately before `pos`.
    pub fn insert_before(&mut self, pos: ValueId, inst: ValueId) -> Result<(), IrError> {
        let (bb, old_prev) = match self.values.inst(pos) {
            Some(data) => (data.block, data.prev),
            None => return Err(IrError::PositionNotInBlock),
        };
        {
            let data = self.values.inst_mut(inst).expect("inserting a non-instruction");
            data.block = bb;
            data.prev = old_prev;
            data.next = Some(pos);
        }
        self.values.inst_mut(pos).expect("checked above").prev = Some(inst);
        match old_prev {
            Some(prev) => {
                self.values.inst_mut(prev).expect("linked instruction").next = Some(inst)
            }
            None => self.block_data_mut(bb).head = Some(inst),
        }
        Ok(())
    }

    /// Splices `inst` immediately after `pos`.
    pub fn insert_after(&mut self, pos: ValueId, inst: ValueId) -> Result<(), IrError> {
        let (bb, old_next) = match self.values.inst(pos) {
            Some(data) => (data.block, data.next),
            None => return Err(IrError::PositionNotInBlock),
        };
        {
            let data = self.values.inst_mut(inst).expect("inserting a non-instruction");
            data.block = bb;
            data.prev = Some(pos);
            data.next = old_next;
        }
        self.values.inst_mut(pos).expect("checked above").next = Some(inst);
        match old_next {
            Some(next) => {
                self.values.inst_mut(next).expect("linked instruction").prev = Some(inst)
            }
            None => self.block_data_mut(bb).tail = Some(inst),
        }
        Ok(())
    }

    fn unlink_instruction(&mut self, inst: ValueId) {
        let (bb, prev, next) = {
            let data = self.values.inst(inst).expect("unlinking a non-instruction");
            (data.block, data.prev, data.next)
        };
        match prev {
            Some(p) => self.values.inst_mut(p).expect("linked instruction").next = next,
            None => self.block_data_mut(bb).head = next,
        }
        match next {
            Some(n) => self.values.inst_mut(n).expect("linked instruction").prev = prev,
            None => self.block_data_mut(bb).tail = prev,
        }
    }

    /// Removes an instruction from its block and frees it. The instruction
    /// must be unused; its own operand uses (and terminator CFG edges) are
    /// detached here.
    pub fn erase_instruction(&mut self, inst: ValueId) -> Result<(), IrError> {
        if !self.values.get(inst).users.is_empty() {
            return Err(IrError::ValueHasUsers);
        }
        let (bb, is_term) = {
            let data = self
                .values
                .inst(inst)
                .ok_or(IrError::PositionNotInBlock)?;
            (data.block, data.opcode.is_terminator())
        };
        if is_term && self.get_terminator(bb) == Some(inst) {
            self.clear_successors(bb);
        }
        self.values.drop_all_uses(inst);
        self.unlink_instruction(inst);
        self.values.erase(inst);
        Ok(())
    }
}

/// Forward iterator over a block's instruction list.
pub struct InstIter<'a> {
    module: &'a Module,
    cursor: Option<ValueId>,
}

impl Iterator for InstIter<'_> {
    type Item = ValueId;

    fn next(&mut self) -> Option<ValueId> {
        let inst = self.cursor?;
        self.cursor = self.module.inst_next(inst);
        Some(inst)
    }
}
