use crate::frontend::Location;
use crate::frontend::Parser;
use crate::ir::node::display_via_print;
use crate::ir::node::print_hook_list;
use crate::ir::visit_list;
use crate::ir::Annotations;
use crate::ir::Node;
use crate::ir::NodeKind;
use crate::ir::Stmt;
use crate::ir::Visitor;
use anyhow::Result;
use std::fmt;

/// Ordered list of statements; the root of a rule body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    stmts: Vec<Stmt>,
    annotations: Annotations,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block {
            stmts,
            annotations: Annotations::default(),
        }
    }
    /// Parse a sequence of statements from fragment text.
    pub fn parse(text: &str, pos: &Location) -> Result<Block> {
        Parser::parse_block(text, pos)
    }
    pub fn stmts(&self) -> &Vec<Stmt> {
        &self.stmts
    }
    pub fn stmts_mut(&mut self) -> &mut Vec<Stmt> {
        &mut self.stmts
    }
    pub fn add_stmt(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }
    pub fn len(&self) -> usize {
        self.stmts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
    pub fn contains_leaf(&self, val: &str) -> bool {
        self.stmts.iter().any(|stmt| stmt.contains_leaf(val))
    }
}

impl Node for Block {
    fn kind(&self) -> NodeKind {
        NodeKind::Block
    }
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
    fn children(&self) -> Vec<&dyn Node> {
        self.stmts.iter().map(|stmt| stmt as &dyn Node).collect()
    }
    fn accept(&mut self, visitor: &mut dyn Visitor) -> Result<()> {
        visit_list(visitor, &mut self.stmts)
    }
    fn print(
        &mut self,
        out: &mut dyn fmt::Write,
        visitor: Option<&mut dyn Visitor>,
    ) -> Result<()> {
        let mut visitor = visitor;
        print_hook_list(&mut self.stmts, out, &mut visitor, "\n")
    }
}

display_via_print!(Block);
