//! Typed SSA micro-op IR.
//!
//! A translated basic block is a [`Block`]: an entry [`LocationDescriptor`],
//! an optional condition guard, an ordered list of [`Inst`]s in SSA form
//! (operands are immediates or references to earlier instructions), a cycle
//! count and a [`Terminal`] describing the control transfer out of the
//! block. [`IrBuilder`] is the append-only construction interface used by
//! the translator; [`opt`] holds the callback-free rewrite passes.

pub mod eval;
pub mod opt;

mod block;
mod builder;
mod inst;
mod opcode;
mod terminal;
mod types;
mod value;

pub use block::Block;
pub use builder::IrBuilder;
pub use inst::{Inst, InstId};
pub use opcode::{Aux, Opcode, OpcodeInfo};
pub use terminal::Terminal;
pub use types::Type;
pub use value::Value;
