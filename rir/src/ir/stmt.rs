use crate::analysis::compute_induction;
use crate::analysis::Direction;
use crate::analysis::Induction;
use crate::frontend::Location;
use crate::frontend::Parser;
use crate::ir::node::display_via_print;
use crate::ir::node::print_hook;
use crate::ir::node::print_hook_list;
use crate::ir::visit_block;
use crate::ir::visit_list;
use crate::ir::visit_slot;
use crate::ir::Annotations;
use crate::ir::Block;
use crate::ir::Expr;
use crate::ir::IrError;
use crate::ir::Node;
use crate::ir::NodeKind;
use crate::ir::Visitor;
use anyhow::Result;
use std::fmt;

/// Simple statement such as an assignment or a call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicStmt {
    exprs: Vec<Expr>,
    annotations: Annotations,
}

impl BasicStmt {
    pub fn new(exprs: Vec<Expr>) -> Self {
        BasicStmt {
            exprs,
            annotations: Annotations::default(),
        }
    }
}

/// Compound statement `{ ... }`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockStmt {
    exprs: Vec<Expr>,
    block: Block,
    annotations: Annotations,
}

impl BlockStmt {
    pub fn new(block: Block) -> Self {
        BlockStmt {
            exprs: vec![],
            block,
            annotations: Annotations::default(),
        }
    }
    pub fn block(&self) -> &Block {
        &self.block
    }
    pub fn block_mut(&mut self) -> &mut Block {
        &mut self.block
    }
}

/// C-style `for(decl; test; inc) body` loop.
///
/// The induction variable analysis is cached on the loop. Mutating the
/// declaration or the increment clause drops the cache.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopStmt {
    exprs: Vec<Expr>,
    body: Box<Stmt>,
    induction: Option<Induction>,
    annotations: Annotations,
}

const DECL: usize = 0;
const TEST: usize = 1;
const INC: usize = 2;

impl LoopStmt {
    pub fn new(decl: Expr, test: Expr, inc: Expr, body: Stmt) -> Self {
        LoopStmt {
            exprs: vec![decl, test, inc],
            body: Box::new(body),
            induction: None,
            annotations: Annotations::default(),
        }
    }
    fn clause(&self, n: usize) -> &Expr {
        assert!(
            n < self.exprs.len(),
            "loop has only {} clauses",
            self.exprs.len()
        );
        &self.exprs[n]
    }
    fn clause_mut(&mut self, n: usize) -> &mut Expr {
        let len = self.exprs.len();
        assert!(n < len, "loop has only {len} clauses");
        &mut self.exprs[n]
    }
    pub fn decl_part(&self) -> &Expr {
        self.clause(DECL)
    }
    pub fn test_part(&self) -> &Expr {
        self.clause(TEST)
    }
    pub fn inc_part(&self) -> &Expr {
        self.clause(INC)
    }
    pub fn decl_part_mut(&mut self) -> &mut Expr {
        self.invalidate_induction();
        self.clause_mut(DECL)
    }
    pub fn test_part_mut(&mut self) -> &mut Expr {
        self.invalidate_induction();
        self.clause_mut(TEST)
    }
    pub fn inc_part_mut(&mut self) -> &mut Expr {
        self.invalidate_induction();
        self.clause_mut(INC)
    }
    pub fn set_test_part(&mut self, test: Expr) {
        *self.test_part_mut() = test;
    }
    pub fn clear_decl_part(&mut self) {
        *self.decl_part_mut() = Expr::nil();
    }
    pub fn clear_inc_part(&mut self) {
        *self.inc_part_mut() = Expr::nil();
    }
    pub fn body(&self) -> &Stmt {
        &self.body
    }
    pub fn body_mut(&mut self) -> &mut Stmt {
        &mut self.body
    }
    pub fn set_body(&mut self, body: Stmt) {
        *self.body = body;
    }
    /// Number of statements in the body; a single statement counts as one.
    pub fn body_size(&self) -> usize {
        match self.body.as_ref() {
            Stmt::Block(stmt) => stmt.block.stmts().len(),
            _ => 1,
        }
    }
    pub fn invalidate_induction(&mut self) {
        self.induction = None;
    }
    pub fn has_cached_induction(&self) -> bool {
        self.induction.is_some()
    }
    /// The induction variable analysis, computed on first use.
    ///
    /// Returns `None` when no induction variable could be found; that
    /// result is not cached.
    pub fn induction(&mut self) -> Result<Option<&Induction>> {
        if self.induction.is_none() {
            self.induction = compute_induction(self)?;
        }
        Ok(self.induction.as_ref())
    }
    pub fn induction_variable(&mut self) -> Result<Option<String>> {
        Ok(self.induction()?.map(|induction| induction.variable.clone()))
    }
    pub fn iteration_direction(&mut self) -> Result<Option<Direction>> {
        Ok(self.induction()?.map(|induction| induction.direction))
    }
    pub fn induction_increment(&mut self) -> Result<Option<String>> {
        Ok(self.induction()?.map(|induction| induction.increment.clone()))
    }
    /// The bound that the induction variable is compared against.
    ///
    /// Returns an empty string when the loop has no test condition or no
    /// induction variable.
    pub fn limit(&mut self) -> Result<String> {
        let variable = match self.induction_variable()? {
            Some(variable) => variable,
            None => return Ok("".to_string()),
        };
        let test = self.test_part();
        if test.is_nil() {
            return Ok("".to_string());
        }
        let op = match test.comparison_op() {
            Some(op) => op,
            None => {
                return Err(IrError::unsupported("loop test condition", &test.to_string()).into())
            }
        };
        if !test.has_top_level_leaf(op) {
            return Err(IrError::unsupported("nested comparison", &test.to_string()).into());
        }
        let lhs = test.get_lhs(op).to_string();
        let rhs = test.get_rhs(op).to_string();
        if lhs == variable {
            Ok(rhs)
        } else if rhs == variable {
            Ok(lhs)
        } else {
            Err(IrError::unsupported("loop bound", &test.to_string()).into())
        }
    }
}

/// `if(cond) then else otherwise`.
#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    exprs: Vec<Expr>,
    then: Box<Stmt>,
    otherwise: Option<Box<Stmt>>,
    annotations: Annotations,
}

impl IfStmt {
    pub fn new(cond: Expr, then: Stmt, otherwise: Option<Stmt>) -> Self {
        IfStmt {
            exprs: vec![cond],
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
            annotations: Annotations::default(),
        }
    }
    pub fn cond(&self) -> &Expr {
        &self.exprs[0]
    }
    pub fn then(&self) -> &Stmt {
        &self.then
    }
    pub fn otherwise(&self) -> Option<&Stmt> {
        self.otherwise.as_deref()
    }
}

/// `switch(cond) body`.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchStmt {
    exprs: Vec<Expr>,
    body: Box<Stmt>,
    annotations: Annotations,
}

impl SwitchStmt {
    pub fn new(cond: Expr, body: Stmt) -> Self {
        SwitchStmt {
            exprs: vec![cond],
            body: Box::new(body),
            annotations: Annotations::default(),
        }
    }
    pub fn cond(&self) -> &Expr {
        &self.exprs[0]
    }
    pub fn body(&self) -> &Stmt {
        &self.body
    }
}

/// Source text that is passed through as is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawStmt {
    exprs: Vec<Expr>,
    src: String,
    annotations: Annotations,
}

impl RawStmt {
    pub fn new(src: &str) -> Self {
        RawStmt {
            exprs: vec![],
            src: src.to_string(),
            annotations: Annotations::default(),
        }
    }
    pub fn src(&self) -> &str {
        &self.src
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Basic(BasicStmt),
    Block(BlockStmt),
    Loop(LoopStmt),
    Cond(IfStmt),
    Switch(SwitchStmt),
    Raw(RawStmt),
}

/// The empty statement `;`.
impl Default for Stmt {
    fn default() -> Self {
        Stmt::Basic(BasicStmt::default())
    }
}

impl Stmt {
    /// Parse exactly one statement from fragment text.
    pub fn parse(text: &str, pos: &Location) -> Result<Stmt> {
        Parser::parse_stmt(text, pos)
    }
    pub fn basic(expr: Expr) -> Stmt {
        Stmt::Basic(BasicStmt::new(vec![expr]))
    }
    pub fn from_block(block: Block) -> Stmt {
        Stmt::Block(BlockStmt::new(block))
    }
    pub fn exprs(&self) -> &Vec<Expr> {
        match self {
            Stmt::Basic(s) => &s.exprs,
            Stmt::Block(s) => &s.exprs,
            Stmt::Loop(s) => &s.exprs,
            Stmt::Cond(s) => &s.exprs,
            Stmt::Switch(s) => &s.exprs,
            Stmt::Raw(s) => &s.exprs,
        }
    }
    pub fn exprs_mut(&mut self) -> &mut Vec<Expr> {
        match self {
            Stmt::Basic(s) => &mut s.exprs,
            Stmt::Block(s) => &mut s.exprs,
            Stmt::Loop(s) => {
                s.invalidate_induction();
                &mut s.exprs
            }
            Stmt::Cond(s) => &mut s.exprs,
            Stmt::Switch(s) => &mut s.exprs,
            Stmt::Raw(s) => &mut s.exprs,
        }
    }
    pub fn add_expr(&mut self, expr: Expr) {
        self.exprs_mut().push(expr);
    }
    pub fn pop_expr(&mut self) -> Option<Expr> {
        self.exprs_mut().pop()
    }
    pub fn num_exprs(&self) -> usize {
        self.exprs().len()
    }
    pub fn part(&self, n: usize) -> &Expr {
        let exprs = self.exprs();
        assert!(
            n < exprs.len(),
            "part {n} out of range for {} parts",
            exprs.len()
        );
        &exprs[n]
    }
    pub fn part_mut(&mut self, n: usize) -> &mut Expr {
        let exprs = self.exprs_mut();
        let len = exprs.len();
        assert!(n < len, "part {n} out of range for {len} parts");
        &mut exprs[n]
    }
    /// Whether the leaf occurs in this statement or in any nested statement.
    pub fn contains_leaf(&self, val: &str) -> bool {
        if self.exprs().iter().any(|expr| expr.contains_leaf(val)) {
            return true;
        }
        match self {
            Stmt::Block(s) => s.block.contains_leaf(val),
            Stmt::Loop(s) => s.body.contains_leaf(val),
            Stmt::Cond(s) => {
                s.then.contains_leaf(val)
                    || s.otherwise.as_ref().is_some_and(|o| o.contains_leaf(val))
            }
            Stmt::Switch(s) => s.body.contains_leaf(val),
            Stmt::Basic(_) | Stmt::Raw(_) => false,
        }
    }
    /// The statements of a block statement, or a block holding only `self`.
    pub fn extract_block(&self) -> Block {
        match self {
            Stmt::Block(s) => s.block.clone(),
            _ => Block::new(vec![self.clone()]),
        }
    }
    pub fn is_control(&self) -> bool {
        matches!(self, Stmt::Loop(_) | Stmt::Cond(_) | Stmt::Switch(_))
    }
    pub fn as_loop(&self) -> Option<&LoopStmt> {
        match self {
            Stmt::Loop(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_loop_mut(&mut self) -> Option<&mut LoopStmt> {
        match self {
            Stmt::Loop(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Stmt::Block(s) => Some(&s.block),
            _ => None,
        }
    }
}

impl Node for Stmt {
    fn kind(&self) -> NodeKind {
        match self {
            Stmt::Basic(_) => NodeKind::StmtBasic,
            Stmt::Block(_) => NodeKind::StmtBlock,
            Stmt::Loop(_) => NodeKind::StmtLoop,
            Stmt::Cond(_) => NodeKind::StmtCond,
            Stmt::Switch(_) => NodeKind::StmtSwitch,
            Stmt::Raw(_) => NodeKind::StmtRaw,
        }
    }
    fn annotations(&self) -> &Annotations {
        match self {
            Stmt::Basic(s) => &s.annotations,
            Stmt::Block(s) => &s.annotations,
            Stmt::Loop(s) => &s.annotations,
            Stmt::Cond(s) => &s.annotations,
            Stmt::Switch(s) => &s.annotations,
            Stmt::Raw(s) => &s.annotations,
        }
    }
    fn annotations_mut(&mut self) -> &mut Annotations {
        match self {
            Stmt::Basic(s) => &mut s.annotations,
            Stmt::Block(s) => &mut s.annotations,
            Stmt::Loop(s) => &mut s.annotations,
            Stmt::Cond(s) => &mut s.annotations,
            Stmt::Switch(s) => &mut s.annotations,
            Stmt::Raw(s) => &mut s.annotations,
        }
    }
    fn children(&self) -> Vec<&dyn Node> {
        let mut children: Vec<&dyn Node> = self
            .exprs()
            .iter()
            .map(|expr| expr as &dyn Node)
            .collect();
        match self {
            Stmt::Block(s) => children.push(&s.block),
            Stmt::Loop(s) => children.push(s.body.as_ref()),
            Stmt::Cond(s) => {
                children.push(s.then.as_ref());
                if let Some(otherwise) = &s.otherwise {
                    children.push(otherwise.as_ref());
                }
            }
            Stmt::Switch(s) => children.push(s.body.as_ref()),
            Stmt::Basic(_) | Stmt::Raw(_) => (),
        }
        children
    }
    fn accept(&mut self, visitor: &mut dyn Visitor) -> Result<()> {
        match self {
            Stmt::Basic(s) => visit_list(visitor, &mut s.exprs),
            Stmt::Raw(s) => visit_list(visitor, &mut s.exprs),
            Stmt::Block(s) => {
                visit_list(visitor, &mut s.exprs)?;
                visit_block(visitor, &mut s.block)
            }
            Stmt::Loop(s) => {
                // The visitor may rewrite any clause.
                s.invalidate_induction();
                visit_list(visitor, &mut s.exprs)?;
                visit_slot(visitor, &mut s.body)?;
                s.invalidate_induction();
                Ok(())
            }
            Stmt::Cond(s) => {
                visit_list(visitor, &mut s.exprs)?;
                visit_slot(visitor, &mut s.then)?;
                if let Some(otherwise) = &mut s.otherwise {
                    visit_slot(visitor, otherwise)?;
                }
                Ok(())
            }
            Stmt::Switch(s) => {
                visit_list(visitor, &mut s.exprs)?;
                visit_slot(visitor, &mut s.body)
            }
        }
    }
    fn print(
        &mut self,
        out: &mut dyn fmt::Write,
        visitor: Option<&mut dyn Visitor>,
    ) -> Result<()> {
        let mut visitor = visitor;
        match self {
            Stmt::Basic(s) => {
                print_hook_list(&mut s.exprs, out, &mut visitor, " ")?;
                write!(out, ";")?;
            }
            Stmt::Block(s) => {
                assert!(s.exprs.is_empty(), "block statement cannot have parts");
                write!(out, "{{\n")?;
                print_hook(&mut s.block, out, &mut visitor)?;
                write!(out, "\n}}")?;
            }
            Stmt::Loop(s) => {
                assert!(s.exprs.len() >= 3, "loop needs decl, test and inc parts");
                write!(out, "for(")?;
                print_hook(&mut s.exprs[DECL], out, &mut visitor)?;
                write!(out, "; ")?;
                print_hook(&mut s.exprs[TEST], out, &mut visitor)?;
                write!(out, "; ")?;
                print_hook(&mut s.exprs[INC], out, &mut visitor)?;
                write!(out, ") ")?;
                print_hook(s.body.as_mut(), out, &mut visitor)?;
            }
            Stmt::Cond(s) => {
                assert!(s.exprs.len() == 1, "if needs exactly one condition");
                write!(out, "if(")?;
                print_hook(&mut s.exprs[0], out, &mut visitor)?;
                write!(out, ")\n")?;
                print_hook(s.then.as_mut(), out, &mut visitor)?;
                if let Some(otherwise) = &mut s.otherwise {
                    write!(out, "\nelse\n")?;
                    print_hook(otherwise.as_mut(), out, &mut visitor)?;
                }
            }
            Stmt::Switch(s) => {
                assert!(s.exprs.len() == 1, "switch needs exactly one selector");
                write!(out, "switch(")?;
                print_hook(&mut s.exprs[0], out, &mut visitor)?;
                write!(out, ") ")?;
                print_hook(s.body.as_mut(), out, &mut visitor)?;
            }
            Stmt::Raw(s) => {
                write!(out, "{}", s.src)?;
            }
        }
        Ok(())
    }
}

display_via_print!(Stmt);
