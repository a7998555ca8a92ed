use gale_a32::{Cond, LocationDescriptor};

/// The tagged last action of a block.
///
/// Terminals may nest: conditional constructs carry boxed children, and
/// `CheckHalt` wraps the terminal it guards (e.g. `CheckHalt{PopRsbHint}`
/// after a supervisor call).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// Bail to the consumer's interpreter for `num_instructions`
    /// instructions starting at `next`, then return to the dispatcher.
    Interpret {
        next: LocationDescriptor,
        num_instructions: usize,
    },
    /// Return to the dispatcher for a full lookup.
    ReturnToDispatch,
    /// Transfer to a statically known target, subject to the tick budget.
    LinkBlock { target: LocationDescriptor },
    /// Transfer to a statically known target without consulting the tick
    /// budget; the halt flag is still polled at the boundary.
    LinkBlockFast { target: LocationDescriptor },
    /// Predict the target through the return stack buffer.
    PopRsbHint,
    /// Predict the target through the fast-dispatch table.
    FastDispatchHint,
    /// Evaluate `cond` against the guest flags and continue with one child.
    If {
        cond: Cond,
        then_: Box<Terminal>,
        else_: Box<Terminal>,
    },
    /// Branch on the guest-state check bit.
    CheckBit {
        then_: Box<Terminal>,
        else_: Box<Terminal>,
    },
    /// Return to the host if a halt was requested, otherwise continue with
    /// the wrapped terminal.
    CheckHalt(Box<Terminal>),
}

impl Terminal {
    /// Nesting depth; used by the verifier to reject degenerate terminals.
    pub fn depth(&self) -> usize {
        match self {
            Terminal::If { then_, else_, .. } | Terminal::CheckBit { then_, else_ } => {
                1 + then_.depth().max(else_.depth())
            }
            Terminal::CheckHalt(inner) => 1 + inner.depth(),
            _ => 1,
        }
    }
}
