//! Optimizer passes.
//!
//! Every pass is a single forward or backward sweep over the instruction
//! list and is idempotent; running the whole pipeline twice yields the IR
//! the first run produced. Passes that need consumer callbacks (constant
//! memory reads, interpret-block merging) live with the runtime, not here.

mod const_prop;
mod dce;
mod get_set;
mod verify;

pub use const_prop::constant_propagation;
pub use dce::dead_code_elimination;
pub use get_set::get_set_elimination;
pub use verify::{verify, VerifyError};
