use snafu::Snafu;

/// A fatal internal invariant violation.
///
/// These abort the single evaluation that hit them and are never produced by
/// well-typed programs: data-dependent failures are error values, not
/// faults.
#[derive(Debug, Snafu)]
pub enum EvalFault {
    #[snafu(display("value stack underflow at step {pc}"))]
    StackUnderflow { pc: usize },

    #[snafu(display("read of unassigned slot {slot} at step {pc}"))]
    UnassignedSlot { slot: usize, pc: usize },

    #[snafu(display("program terminated with {len} values on the stack"))]
    ResidualStack { len: usize },
}
