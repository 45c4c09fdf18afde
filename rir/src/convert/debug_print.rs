use crate::convert::apply_visitor;
use crate::convert::Pass;
use crate::convert::RewriteResult;
use crate::heuristic::HeuristicManager;
use crate::ir::spaces;
use crate::ir::Block;
use crate::ir::Expr;
use crate::ir::Node;
use crate::ir::Splicer;
use crate::ir::Stmt;
use crate::ir::Visitor;
use anyhow::Result;
use tracing::info;

/// Visitor that writes the tree structure of the IR to the log.
///
/// Each node becomes one line with its type and, for expressions, its text.
#[derive(Default)]
pub struct DebugPrinter {
    indent: i32,
    lines: Vec<String>,
}

impl DebugPrinter {
    pub fn new() -> Self {
        DebugPrinter::default()
    }
    /// Lines that were written so far.
    pub fn lines(&self) -> &Vec<String> {
        &self.lines
    }
    fn write(&mut self, node: &dyn Node) {
        let line = format!("{}{}", spaces(self.indent), node.debug_str());
        info!("{line}");
        self.lines.push(line);
    }
}

impl Visitor for DebugPrinter {
    fn before_expr(&mut self, expr: &mut Option<Expr>, _splicer: &mut Splicer<Expr>) -> Result<()> {
        if let Some(expr) = expr {
            self.write(&*expr);
        }
        self.indent += 1;
        Ok(())
    }
    fn after_expr(&mut self, _expr: &mut Option<Expr>, _splicer: &mut Splicer<Expr>) -> Result<()> {
        self.indent -= 1;
        Ok(())
    }
    fn before_stmt(&mut self, stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        if let Some(stmt) = stmt {
            self.write(&*stmt);
        }
        self.indent += 1;
        Ok(())
    }
    fn after_stmt(&mut self, _stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        self.indent -= 1;
        Ok(())
    }
}

/// Pass that logs the tree structure and leaves the IR alone.
pub struct DebugPrint;

impl Pass for DebugPrint {
    const NAME: &'static str = "debug-print";
    fn convert(block: &mut Block, _heuristics: &HeuristicManager) -> Result<RewriteResult> {
        let mut printer = DebugPrinter::new();
        apply_visitor(block, &mut printer)?;
        Ok(RewriteResult::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Location;

    #[test]
    fn test_debug_printer() {
        let mut block = Block::parse("x = 1;", &Location::default()).unwrap();
        let mut printer = DebugPrinter::new();
        apply_visitor(&mut block, &mut printer).unwrap();
        let lines = printer.lines();
        assert_eq!(lines[0], "STMT_BASIC");
        assert_eq!(lines[1], "  EXPR_CHAIN");
        assert_eq!(lines[2], "    EXPR_IDENT x");
        assert_eq!(lines.len(), 5);
    }
}
