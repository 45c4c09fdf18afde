//! Passes that rewrite the IR.
//!
//! A pass gets the whole rule body and mutates it in place. Most passes are
//! implemented as a [Visitor] that is driven over the body by
//! [apply_visitor].

use crate::heuristic::HeuristicManager;
use crate::ir::visit_block;
use crate::ir::Block;
use crate::ir::Visitor;
use anyhow::Result;
use tracing::debug;

mod debug_print;
mod unroll;

pub use debug_print::DebugPrint;
pub use debug_print::DebugPrinter;
pub use unroll::UnrollLoops;
pub use unroll::UnrollingOptimizer;
pub use unroll::JUST_UNROLLED;

/// Whether a pass changed the IR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewriteResult {
    Changed,
    Unchanged,
}

impl RewriteResult {
    pub fn is_changed(&self) -> bool {
        matches!(self, RewriteResult::Changed)
    }
}

pub trait Pass {
    /// Name of the pass, which is also the command line flag without the
    /// leading `--`.
    const NAME: &'static str;
    fn convert(block: &mut Block, heuristics: &HeuristicManager) -> Result<RewriteResult>;
}

/// Drive a visitor over a whole rule body.
pub fn apply_visitor(block: &mut Block, visitor: &mut dyn Visitor) -> Result<()> {
    debug!("Visiting block with {} statements", block.len());
    visit_block(visitor, block)
}
