//! Intermediate representation and optimization passes for rule bodies.
//!
//! A rule body is the imperative code inside one rule of a transform. The
//! code is parsed into a small tree of statements and expressions ([ir]).
//! Compiler passes walk that tree with a [ir::Visitor] and rewrite it in
//! place, inserting or deleting nodes while they go.
//!
//! The main pass in this crate is loop unrolling ([convert::UnrollLoops]).
//! It relies on the induction variable analysis in [analysis] to find out
//! which variable drives a loop, and asks a [heuristic::HeuristicManager]
//! how many times to unroll it.
//!
//! For an example on how to drive the passes from the command line, see the
//! `rirc` crate.

pub mod analysis;
pub mod convert;
pub mod frontend;
pub mod heuristic;
pub mod ir;
#[cfg(feature = "test-utils")]
pub mod tester;
mod transform;

pub use transform::configure_heuristics;
pub use transform::default_arguments;
pub use transform::init_subscriber;
pub use transform::options_from_matches;
pub use transform::transform;
pub use transform::DefaultTransformDispatch;
pub use transform::Passes;
pub use transform::SinglePass;
pub use transform::TransformDispatch;
pub use transform::TransformOptions;
