//! The step machine.
//!
//! One frame per evaluation: a value stack bounded by the planner's declared
//! maximum, a slot array for comprehension variables and lazy bindings, and
//! a step cursor. The loop reads the step at the cursor, applies its effect,
//! and advances unless the effect set the cursor. Strict error/unknown
//! propagation happens at call steps; the short-circuit steps do their own
//! inspection so `false && error` is still `false`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ast::ExprId;
use crate::interp::activation::Activation;
use crate::interp::fault::EvalFault;
use crate::planner::{CallOp, Op, Program, Step};
use crate::values::{MapVal, UnknownSet, Val};
use crate::values::map::MapError;

#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Total comprehension iterations allowed in one evaluation.
    pub iteration_budget: usize,
    /// Cooperative cancellation flag, checked at loop heads.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            iteration_budget: 100_000,
            cancel: None,
        }
    }
}

/// Execute a program against an activation.
///
/// The `Ok` value is the evaluation outcome, which may itself be an error or
/// unknown value; `Err` is reserved for internal invariant violations that
/// cannot arise from well-typed programs.
pub fn eval(
    program: &Program,
    activation: &dyn Activation,
    options: &EvalOptions,
) -> Result<Val, EvalFault> {
    let mut frame = Frame {
        stack: Vec::with_capacity(program.max_stack),
        slots: vec![Slot::Empty; program.slot_count],
        budget: options.iteration_budget,
    };
    if let Some(aborted) = run_steps(&mut frame, &program.steps, program, activation, options)? {
        return Ok(aborted);
    }
    if frame.stack.len() != 1 {
        return Err(EvalFault::ResidualStack {
            len: frame.stack.len(),
        });
    }
    Ok(frame.stack.pop().unwrap())
}

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Value(Val),
    Iter(IterState),
}

#[derive(Debug, Clone)]
struct IterState {
    items: Vec<Val>,
    pos: usize,
}

struct Frame {
    stack: Vec<Val>,
    slots: Vec<Slot>,
    budget: usize,
}

impl Frame {
    fn pop(&mut self, pc: usize) -> Result<Val, EvalFault> {
        self.stack.pop().ok_or(EvalFault::StackUnderflow { pc })
    }

    fn pop_n(&mut self, n: usize, pc: usize) -> Result<Vec<Val>, EvalFault> {
        let at = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(EvalFault::StackUnderflow { pc })?;
        Ok(self.stack.split_off(at))
    }

    fn top(&self, pc: usize) -> Result<&Val, EvalFault> {
        self.stack.last().ok_or(EvalFault::StackUnderflow { pc })
    }
}

/// Run one step list to completion. `Ok(Some(v))` aborts the whole
/// evaluation with `v` as its result (resource exhaustion, cancellation);
/// `Ok(None)` is ordinary completion.
fn run_steps(
    frame: &mut Frame,
    steps: &[Step],
    program: &Program,
    activation: &dyn Activation,
    options: &EvalOptions,
) -> Result<Option<Val>, EvalFault> {
    let mut pc = 0usize;
    while pc < steps.len() {
        let step = &steps[pc];
        tracing::trace!(pc, op = ?step.op, depth = frame.stack.len(), "step");
        if frame.stack.len() > program.max_stack {
            return Ok(Some(Val::error(
                step.expr_id,
                "evaluation stack depth limit exceeded",
            )));
        }
        let mut next = pc + 1;
        match &step.op {
            Op::PushConst(v) => frame.stack.push(v.clone()),

            Op::Resolve { name } => {
                let v = resolve_attribute(activation, name, step.expr_id);
                frame.stack.push(v);
            }

            Op::Select { field, test_only } => {
                let operand = frame.pop(pc)?;
                let v = select_field(operand, field, *test_only, step.expr_id);
                frame.stack.push(v);
            }

            Op::Call(call) => {
                let args = frame.pop_n(call.argc, pc)?;
                let v = dispatch_call(call, args, step.expr_id);
                frame.stack.push(v);
            }

            Op::Jump { offset } => next = jump(pc, *offset),

            Op::JumpIfFalse { offset, pop } => {
                match frame.top(pc)? {
                    Val::Bool(false) => {
                        if *pop {
                            frame.stack.pop();
                        }
                        next = jump(pc, *offset);
                    }
                    Val::Bool(true) => {
                        if *pop {
                            frame.stack.pop();
                        }
                    }
                    // Non-bool tops fall through untouched for the merge
                    // step to inspect.
                    _ => {}
                }
            }

            Op::JumpIfTrue { offset, pop } => match frame.top(pc)? {
                Val::Bool(true) => {
                    if *pop {
                        frame.stack.pop();
                    }
                    next = jump(pc, *offset);
                }
                Val::Bool(false) => {
                    if *pop {
                        frame.stack.pop();
                    }
                }
                _ => {}
            },

            Op::JumpIfNotBool { offset } => {
                if !matches!(frame.top(pc)?, Val::Bool(_)) {
                    next = jump(pc, *offset);
                }
            }

            Op::LogicAnd => {
                let b = frame.pop(pc)?;
                let a = frame.pop(pc)?;
                frame.stack.push(logic_and(step.expr_id, a, b));
            }

            Op::LogicOr => {
                let b = frame.pop(pc)?;
                let a = frame.pop(pc)?;
                frame.stack.push(logic_or(step.expr_id, a, b));
            }

            Op::MakeList { size, optionals } => {
                let elems = frame.pop_n(*size, pc)?;
                let v = make_list(elems, optionals, step.expr_id);
                frame.stack.push(v);
            }

            Op::MakeMap { size, optionals } => {
                let kvs = frame.pop_n(size * 2, pc)?;
                let v = make_map(kvs, optionals, step.expr_id);
                frame.stack.push(v);
            }

            Op::IterInit {
                iter_slot,
                exit_offset,
            } => {
                let range = frame.pop(pc)?;
                match iter_items(&range) {
                    Some(items) => {
                        frame.slots[*iter_slot] = Slot::Iter(IterState { items, pos: 0 });
                    }
                    None => {
                        let v = match range {
                            Val::Error(_) | Val::Unknown(_) => range,
                            other => Val::error(
                                step.expr_id,
                                format!(
                                    "value of type {} cannot be iterated",
                                    other.kind().name()
                                ),
                            ),
                        };
                        frame.stack.push(v);
                        next = jump(pc, *exit_offset);
                    }
                }
            }

            Op::IterNext { iter_slot, offset } => {
                if let Some(cancel) = &options.cancel {
                    if cancel.load(Ordering::Relaxed) {
                        return Ok(Some(Val::error(step.expr_id, "evaluation cancelled")));
                    }
                }
                let Slot::Iter(state) = &mut frame.slots[*iter_slot] else {
                    return Err(EvalFault::UnassignedSlot {
                        slot: *iter_slot,
                        pc,
                    });
                };
                if state.pos < state.items.len() {
                    if frame.budget == 0 {
                        return Ok(Some(Val::error(
                            step.expr_id,
                            "comprehension iteration budget exceeded",
                        )));
                    }
                    frame.budget -= 1;
                    let item = state.items[state.pos].clone();
                    state.pos += 1;
                    frame.stack.push(item);
                } else {
                    next = jump(pc, *offset);
                }
            }

            // The catalogued initializer ends in an AssignSlot, so running
            // it memoizes the slot and leaves the value on the stack.
            Op::CheckInit { slot, subexpr } => match &frame.slots[*slot] {
                Slot::Value(v) => frame.stack.push(v.clone()),
                _ => {
                    if let Some(aborted) = run_steps(
                        frame,
                        &program.subexprs[*subexpr],
                        program,
                        activation,
                        options,
                    )? {
                        return Ok(Some(aborted));
                    }
                }
            },

            Op::AssignSlot { slot } => {
                let v = frame.top(pc)?.clone();
                frame.slots[*slot] = Slot::Value(v);
            }

            Op::AssignSlotAndPop { slot } => {
                let v = frame.pop(pc)?;
                frame.slots[*slot] = Slot::Value(v);
            }

            Op::LoadSlot { slot } => match &frame.slots[*slot] {
                Slot::Value(v) => frame.stack.push(v.clone()),
                _ => return Err(EvalFault::UnassignedSlot { slot: *slot, pc }),
            },

            Op::ClearSlot { slot } => frame.slots[*slot] = Slot::Empty,
        }
        pc = next;
    }
    Ok(None)
}

fn jump(pc: usize, offset: isize) -> usize {
    (pc as isize + offset) as usize
}

fn resolve_attribute(activation: &dyn Activation, name: &str, id: ExprId) -> Val {
    for pattern in activation.unknown_patterns() {
        if pattern.matches(name) {
            return Val::unknown(name);
        }
    }
    match activation.resolve(name) {
        Some(v) => v,
        None => Val::error(id, format!("no such attribute '{}'", name)),
    }
}

fn select_field(operand: Val, field: &str, test_only: bool, id: ExprId) -> Val {
    match &operand {
        Val::Error(_) | Val::Unknown(_) => operand,
        Val::Map(m) => {
            let key = Val::string(field);
            if test_only {
                Val::Bool(m.contains(&key))
            } else {
                match m.get(&key) {
                    Some(v) => v.clone(),
                    None => Val::error(id, format!("no such key: '{}'", field)),
                }
            }
        }
        Val::Struct(s) => {
            if test_only {
                Val::Bool(s.has_field(field))
            } else {
                match s.field(field) {
                    Some(v) => v.clone(),
                    None => Val::error(id, format!("no such field: '{}'", field)),
                }
            }
        }
        other => Val::error(
            id,
            format!(
                "cannot select field '{}' from value of type {}",
                field,
                other.kind().name()
            ),
        ),
    }
}

fn dispatch_call(call: &CallOp, args: Vec<Val>, id: ExprId) -> Val {
    use crate::registry::Strictness;

    let has_error = args.iter().any(|a| a.is_error());
    let has_unknown = args.iter().any(|a| a.is_unknown());
    if has_error || has_unknown {
        // A lazy overload sees the raw values; otherwise errors dominate
        // unknowns and the first error wins.
        if let Some(o) = call
            .overloads
            .iter()
            .find(|o| o.strictness == Strictness::Lazy && o.matches(&args))
        {
            return stamp(o.invoke(&args), id);
        }
        if has_error {
            return args.into_iter().find(|a| a.is_error()).unwrap();
        }
        let mut merged: Option<UnknownSet> = None;
        for a in &args {
            if let Val::Unknown(u) = a {
                merged = Some(match merged {
                    None => (**u).clone(),
                    Some(m) => m.union(u),
                });
            }
        }
        return Val::Unknown(Arc::new(merged.unwrap()));
    }

    match call.overloads.iter().find(|o| o.matches(&args)) {
        Some(o) => stamp(o.invoke(&args), id),
        None => {
            let kinds: Vec<&str> = args.iter().map(|a| a.kind().name()).collect();
            Val::error(
                id,
                format!(
                    "no matching overload for '{}' applied to ({})",
                    call.function,
                    kinds.join(", ")
                ),
            )
        }
    }
}

/// Error values made inside host functions carry no AST id; attribute them
/// to the call site.
fn stamp(v: Val, id: ExprId) -> Val {
    match &v {
        Val::Error(e) if e.expr_id == 0 => Val::error(id, e.message.clone()),
        _ => v,
    }
}

fn logic_and(id: ExprId, a: Val, b: Val) -> Val {
    match (&a, &b) {
        (Val::Bool(false), _) | (_, Val::Bool(false)) => Val::Bool(false),
        (Val::Bool(true), Val::Bool(true)) => Val::Bool(true),
        (Val::Error(_), _) => a,
        (_, Val::Error(_)) => b,
        (Val::Unknown(x), Val::Unknown(y)) => Val::Unknown(Arc::new(x.union(y))),
        (Val::Unknown(_), _) => a,
        (_, Val::Unknown(_)) => b,
        _ => no_such_overload(id, "_&&_", &a, &b),
    }
}

fn logic_or(id: ExprId, a: Val, b: Val) -> Val {
    match (&a, &b) {
        (Val::Bool(true), _) | (_, Val::Bool(true)) => Val::Bool(true),
        (Val::Bool(false), Val::Bool(false)) => Val::Bool(false),
        (Val::Error(_), _) => a,
        (_, Val::Error(_)) => b,
        (Val::Unknown(x), Val::Unknown(y)) => Val::Unknown(Arc::new(x.union(y))),
        (Val::Unknown(_), _) => a,
        (_, Val::Unknown(_)) => b,
        _ => no_such_overload(id, "_||_", &a, &b),
    }
}

fn no_such_overload(id: ExprId, function: &str, a: &Val, b: &Val) -> Val {
    Val::error(
        id,
        format!(
            "no matching overload for '{}' applied to ({}, {})",
            function,
            a.kind().name(),
            b.kind().name()
        ),
    )
}

fn make_list(elems: Vec<Val>, optionals: &[usize], id: ExprId) -> Val {
    if let Some(e) = elems.iter().find(|e| e.is_error()) {
        return e.clone();
    }
    if let Some(u) = merge_unknowns(&elems) {
        return u;
    }
    let mut out = Vec::with_capacity(elems.len());
    for (i, elem) in elems.into_iter().enumerate() {
        if optionals.contains(&i) {
            match elem {
                Val::Optional(Some(v)) => out.push((*v).clone()),
                Val::Optional(None) => {}
                other => {
                    return Val::error(
                        id,
                        format!(
                            "expected an optional value at index {}, found {}",
                            i,
                            other.kind().name()
                        ),
                    )
                }
            }
        } else {
            out.push(elem);
        }
    }
    Val::List(out.into())
}

fn make_map(kvs: Vec<Val>, optionals: &[usize], id: ExprId) -> Val {
    if let Some(e) = kvs.iter().find(|e| e.is_error()) {
        return e.clone();
    }
    if let Some(u) = merge_unknowns(&kvs) {
        return u;
    }
    let mut map = MapVal::new();
    let mut iter = kvs.into_iter();
    let mut index = 0usize;
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        let value = if optionals.contains(&index) {
            match value {
                Val::Optional(Some(v)) => (*v).clone(),
                Val::Optional(None) => {
                    index += 1;
                    continue;
                }
                other => {
                    return Val::error(
                        id,
                        format!(
                            "expected an optional value for key {}, found {}",
                            crate::values::render::render_quoted(&key),
                            other.kind().name()
                        ),
                    )
                }
            }
        } else {
            value
        };
        match map.insert(key, value) {
            Ok(()) => {}
            Err(MapError::DuplicateKey(k)) => {
                return Val::error(
                    id,
                    format!(
                        "duplicate map key: {}",
                        crate::values::render::render_quoted(&k)
                    ),
                )
            }
            Err(MapError::UnsupportedKey(k)) => {
                return Val::error(
                    id,
                    format!("unsupported map key type: {}", k.kind().name()),
                )
            }
        }
        index += 1;
    }
    Val::Map(Arc::new(map))
}

fn merge_unknowns(vals: &[Val]) -> Option<Val> {
    let mut merged: Option<UnknownSet> = None;
    for v in vals {
        if let Val::Unknown(u) = v {
            merged = Some(match merged {
                None => (**u).clone(),
                Some(m) => m.union(u),
            });
        }
    }
    merged.map(|m| Val::Unknown(Arc::new(m)))
}

/// The element sequence a comprehension walks: list elements, or map keys in
/// insertion order. `None` for non-iterable values.
fn iter_items(range: &Val) -> Option<Vec<Val>> {
    match range {
        Val::List(l) => Some(l.to_vec()),
        Val::Map(m) => Some(m.keys().cloned().collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::Program;

    fn run(steps: Vec<Step>) -> Val {
        let max_stack = steps.len().max(4);
        let program = Program {
            steps,
            subexprs: Vec::new(),
            slot_count: 4,
            max_stack,
        };
        let activation = crate::interp::MapActivation::new();
        eval(&program, &activation, &EvalOptions::default()).unwrap()
    }

    fn step(op: Op) -> Step {
        Step { op, expr_id: 1 }
    }

    #[test]
    fn push_const_terminates_with_value() {
        assert_eq!(run(vec![step(Op::PushConst(Val::Int(7)))]), Val::Int(7));
    }

    #[test]
    fn slots_round_trip() {
        let out = run(vec![
            step(Op::PushConst(Val::Int(3))),
            step(Op::AssignSlotAndPop { slot: 0 }),
            step(Op::LoadSlot { slot: 0 }),
        ]);
        assert_eq!(out, Val::Int(3));
    }

    #[test]
    fn reading_cleared_slot_is_a_fault() {
        let program = Program {
            steps: vec![
                step(Op::PushConst(Val::Int(3))),
                step(Op::AssignSlot { slot: 0 }),
                step(Op::ClearSlot { slot: 0 }),
                step(Op::LoadSlot { slot: 0 }),
            ],
            subexprs: Vec::new(),
            slot_count: 1,
            max_stack: 4,
        };
        let activation = crate::interp::MapActivation::new();
        let err = eval(&program, &activation, &EvalOptions::default()).unwrap_err();
        assert!(matches!(err, EvalFault::UnassignedSlot { slot: 0, .. }));
    }

    #[test]
    fn logic_and_truth_table() {
        let e = Val::error(9, "boom");
        let u = Val::unknown("x");
        assert_eq!(logic_and(1, Val::Bool(false), e.clone()), Val::Bool(false));
        assert_eq!(logic_and(1, e.clone(), Val::Bool(false)), Val::Bool(false));
        assert_eq!(
            logic_and(1, Val::Bool(true), Val::Bool(true)),
            Val::Bool(true)
        );
        assert!(logic_and(1, e.clone(), Val::Bool(true)).is_error());
        assert!(logic_and(1, u.clone(), Val::Bool(true)).is_unknown());
        // Errors dominate unknowns.
        assert!(logic_and(1, u, e).is_error());
    }

    #[test]
    fn missing_attribute_resolves_to_error() {
        let out = run(vec![step(Op::Resolve { name: "ghost".into() })]);
        assert!(out.is_error());
        assert!(matches!(
            out,
            Val::Error(ref e) if e.message.contains("ghost")
        ));
    }
}
