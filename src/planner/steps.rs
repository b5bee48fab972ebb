//! The flat step program produced by the planner.
//!
//! A step is one instruction of the evaluation machine: an opcode with its
//! payload, plus the id of the AST node it was lowered from so runtime
//! failures can point back at source. Jump offsets are relative to the index
//! of the jumping step.

use std::sync::Arc;

use crate::ast::ExprId;
use crate::registry::Overload;
use crate::values::Val;

/// An immutable step program.
///
/// `subexprs` is the catalog of lazily-bound initializers referenced by
/// `CheckInit` steps. `max_stack` bounds the value stack across the main
/// step list and any subexpression it may trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub steps: Vec<Step>,
    pub subexprs: Vec<Vec<Step>>,
    pub slot_count: usize,
    pub max_stack: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub op: Op,
    pub expr_id: ExprId,
}

/// A function call step: the ordered candidate overloads recorded by the
/// checker, resolved to registry handles at plan time.
#[derive(Debug, Clone)]
pub struct CallOp {
    pub function: Arc<str>,
    pub overloads: Vec<Arc<Overload>>,
    pub argc: usize,
}

impl PartialEq for CallOp {
    fn eq(&self, other: &Self) -> bool {
        self.function == other.function
            && self.argc == other.argc
            && self.overloads.len() == other.overloads.len()
            && self
                .overloads
                .iter()
                .zip(other.overloads.iter())
                .all(|(a, b)| a.id == b.id)
    }
}

/// Step opcodes.
///
/// Stack effect notation: `[..., a, b] -> [..., r]` means the step pops `b`
/// then `a` and pushes `r`.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// `[...] -> [..., v]`
    PushConst(Val),

    /// Activation lookup. `[...] -> [..., v | unknown | error]`
    Resolve { name: Arc<str> },

    /// Field access on the operand. With `test_only`, pushes presence as a
    /// bool instead of the field value. `[..., operand] -> [..., v]`
    Select { field: Arc<str>, test_only: bool },

    /// `[..., a1..an] -> [..., r]` after propagation and overload dispatch.
    Call(CallOp),

    /// Unconditional relative jump.
    Jump { offset: isize },

    /// Jump when the top is a strict `false`. A strict bool top is popped
    /// when `pop` is set; a non-bool top is never popped and never jumps.
    JumpIfFalse { offset: isize, pop: bool },

    /// Jump when the top is a strict `true`; mirror of `JumpIfFalse`.
    JumpIfTrue { offset: isize, pop: bool },

    /// Jump, keeping the top, when it is not a bool — the error/unknown
    /// bypass for conditionals and loop conditions.
    JumpIfNotBool { offset: isize },

    /// Commutative merge for `&&` over the two topmost values:
    /// a strict `false` wins, then errors, then unknowns.
    /// `[..., a, b] -> [..., r]`
    LogicAnd,

    /// Commutative merge for `||`; a strict `true` wins.
    LogicOr,

    /// `[..., e1..en] -> [..., list]`; values at `optionals` indices are
    /// optionals, spliced out when absent.
    MakeList { size: usize, optionals: Arc<[usize]> },

    /// `[..., k1, v1, .. kn, vn] -> [..., map]`; a duplicate key is an error
    /// value. Entries at `optionals` indices have optional values.
    MakeMap { size: usize, optionals: Arc<[usize]> },

    /// Pop the iteration range and park an iteration cursor in `iter_slot`.
    /// An error or unknown range (or a non-iterable runtime value) is pushed
    /// back and control jumps past the whole comprehension.
    /// `[..., range] -> [...]`
    IterInit { iter_slot: usize, exit_offset: isize },

    /// Push the cursor's next element, or jump to the result sequence when
    /// the iteration is exhausted. Loop budget and cancellation are checked
    /// here. `[...] -> [..., elem]` or jump.
    IterNext { iter_slot: usize, offset: isize },

    /// Push the slot's value; if the slot is empty, run the catalogued
    /// subexpression instead, which leaves the value on the stack and
    /// stores it through its trailing `AssignSlot`. `[...] -> [..., v]`
    CheckInit { slot: usize, subexpr: usize },

    /// Copy the top of stack into the slot without popping. Closes every
    /// catalogued lazy initializer.
    AssignSlot { slot: usize },

    /// `[..., v] -> [...]`, storing `v` into the slot.
    AssignSlotAndPop { slot: usize },

    /// Push the slot's value. Reading an unassigned slot is a fatal
    /// internal fault.
    LoadSlot { slot: usize },

    /// Mark the slot empty so it can be reused by a sibling scope.
    ClearSlot { slot: usize },
}
