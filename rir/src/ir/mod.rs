//! Intermediate representation (IR) for rule bodies.
//!
//! A rule body is a [Block] of statements ([Stmt]) that each hold a list of
//! expressions ([Expr]). Expressions are token chains: an assignment such as
//! `i = i + 1` is a chain of five parts instead of a dedicated assignment
//! node. Passes walk and rewrite the tree through the [Visitor] protocol.

mod annotation;
mod block;
mod error;
mod expr;
mod node;
mod stmt;
mod visitor;

pub use annotation::Annotations;
pub use block::Block;
pub use error::IrError;
pub use expr::Expr;
pub use expr::ExprKind;
pub use node::Node;
pub use node::NodeKind;
pub use stmt::BasicStmt;
pub use stmt::BlockStmt;
pub use stmt::IfStmt;
pub use stmt::LoopStmt;
pub use stmt::RawStmt;
pub use stmt::Stmt;
pub use stmt::SwitchStmt;
pub use visitor::visit_block;
pub use visitor::visit_list;
pub use visitor::visit_slot;
pub use visitor::Spliceable;
pub use visitor::Splicer;
pub use visitor::Visitor;

pub fn spaces(indent: i32) -> String {
    "  ".repeat(indent.max(0) as usize)
}
