//! Analyses over the IR.

mod induction;

pub use induction::compute_induction;
pub use induction::induction_from_body;
pub use induction::induction_from_increment;
pub use induction::match_increment;
pub use induction::Direction;
pub use induction::IdiomMatch;
pub use induction::Induction;
pub use induction::InductionVariableIdentifier;
