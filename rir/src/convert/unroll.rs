use crate::analysis::Induction;
use crate::convert::apply_visitor;
use crate::convert::Pass;
use crate::convert::RewriteResult;
use crate::frontend::Location;
use crate::heuristic::HeuristicManager;
use crate::heuristic::ValueMap;
use crate::heuristic::UNROLLING_NUMBER;
use crate::ir::spaces;
use crate::ir::Block;
use crate::ir::Expr;
use crate::ir::LoopStmt;
use crate::ir::Node;
use crate::ir::NodeKind;
use crate::ir::Splicer;
use crate::ir::Stmt;
use crate::ir::Visitor;
use anyhow::Result;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Marks loops that were produced by unrolling.
pub const JUST_UNROLLED: &str = "justUnrolled";

/// Visitor that unrolls loops bottom-up.
///
/// A loop `for(i = 0; i < n; i++) body` with unroll factor 4 becomes
///
/// ```c
/// {
/// i = 0;
/// for(; i + 4 < n; ) { body i++; body i++; body i++; body i++; }
/// for(; i < n; i++) body
/// }
/// ```
///
/// where the second loop finishes the remaining iterations. Both loops are
/// tagged with [JUST_UNROLLED] so that the next run of the pass leaves them
/// alone (and removes the tag).
pub struct UnrollingOptimizer<'a> {
    heuristics: &'a HeuristicManager,
    /// Kinds of the statements that are currently being visited.
    stack: Vec<Option<NodeKind>>,
    unrolled: usize,
}

impl<'a> UnrollingOptimizer<'a> {
    pub fn new(heuristics: &'a HeuristicManager) -> Self {
        UnrollingOptimizer {
            heuristics,
            stack: vec![],
            unrolled: 0,
        }
    }
    /// Number of loops unrolled so far.
    pub fn unrolled(&self) -> usize {
        self.unrolled
    }
    fn indent(&self) -> i32 {
        self.stack.len() as i32
    }
    /// Number of loops around the current statement, including itself.
    fn loop_nesting_level(&self) -> usize {
        self.stack
            .iter()
            .filter(|kind| **kind == Some(NodeKind::StmtLoop))
            .count()
    }
    /// Whether the test condition has the supported `var OP bound` shape.
    fn should_unroll(the_loop: &mut LoopStmt) -> Result<bool> {
        let test = the_loop.test_part().clone();
        if test.contains_bool_op() || test.contains_ternary_op() {
            warn!("Not unrolling loop with complex test condition `{test}`");
            return Ok(false);
        }
        let op = match test.comparison_op() {
            Some(op) if test.has_top_level_leaf(op) => op,
            _ => {
                warn!("Not unrolling loop without a direct comparison in `{test}`");
                return Ok(false);
            }
        };
        let variable = match the_loop.induction_variable()? {
            Some(variable) => variable,
            None => {
                warn!("Not unrolling loop without induction variable");
                return Ok(false);
            }
        };
        let lhs = test.get_lhs(op).to_string();
        let rhs = test.get_rhs(op).to_string();
        if lhs == variable || rhs == variable {
            Ok(true)
        } else {
            warn!("Not unrolling loop; `{test}` does not compare {variable} directly");
            Ok(false)
        }
    }
    fn unrolling_number(&self, the_loop: &LoopStmt, ops: usize) -> Result<i64> {
        let mut features = ValueMap::new();
        let nesting = self.loop_nesting_level() as f64;
        features.insert("loopNestingLevel".to_string(), nesting);
        features.insert("loopBodySize".to_string(), the_loop.body_size() as f64);
        features.insert("loopBodyOps".to_string(), ops as f64);
        let heuristic = self.heuristics.get_heuristic(UNROLLING_NUMBER)?;
        let factor = heuristic.lock().eval_int(&features);
        debug!("{}Unroll factor {factor} for {features:?}", spaces(self.indent()));
        Ok(factor)
    }
    /// Visit a statement after its children were visited.
    fn visit(&mut self, slot: &mut Option<Stmt>) -> Result<()> {
        let stmt = match slot {
            Some(stmt) if stmt.kind() == NodeKind::StmtLoop => stmt,
            _ => return Ok(()),
        };
        if stmt.has_annotation(JUST_UNROLLED) {
            debug!("{}Skipping loop that was just unrolled", spaces(self.indent()));
            stmt.remove_annotation(JUST_UNROLLED);
            return Ok(());
        }
        let ops = stmt.ops_number();
        let the_loop = match stmt.as_loop_mut() {
            Some(the_loop) => the_loop,
            None => return Ok(()),
        };
        if !Self::should_unroll(the_loop)? {
            return Ok(());
        }
        let limit = the_loop.limit()?;
        if limit.is_empty() {
            return Ok(());
        }
        let factor = self.unrolling_number(the_loop, ops)?;
        if factor < 2 {
            return Ok(());
        }
        let induction = match the_loop.induction()? {
            Some(induction) => induction.clone(),
            None => return Ok(()),
        };
        if let Some(Stmt::Loop(the_loop)) = slot.take() {
            *slot = Some(unroll(the_loop, factor, &induction, &limit)?);
            self.unrolled += 1;
        }
        Ok(())
    }
}

/// How far the variable moves in one unrolled group.
fn unroll_offset(factor: i64, step: &str) -> String {
    match step.parse::<i64>().ok().and_then(|n| n.checked_mul(factor)) {
        Some(offset) => offset.to_string(),
        None => format!("{factor}*({step})"),
    }
}

fn tagged(the_loop: LoopStmt) -> Stmt {
    let mut stmt = Stmt::Loop(the_loop);
    stmt.add_annotation(JUST_UNROLLED);
    stmt
}

/// Rewrite a loop into an unrolled loop followed by a finishing loop.
fn unroll(mut the_loop: LoopStmt, factor: i64, induction: &Induction, limit: &str) -> Result<Stmt> {
    let pos = Location::default();
    let mut block = Block::default();
    if the_loop.decl_part().parts_number() != 0 {
        let decl = the_loop.decl_part().clone();
        the_loop.clear_decl_part();
        block.add_stmt(Stmt::basic(decl));
    }

    let mut finishing = the_loop.clone();

    let cond = format!(
        "{}{}{}{}{}",
        induction.variable,
        induction.direction,
        unroll_offset(factor, &induction.step),
        induction.direction.comparison_op(),
        limit
    );
    debug!("Unrolled loop condition {cond}");
    the_loop.set_test_part(Expr::parse(&cond, &pos)?);

    // A loop without increment clause moves the variable in its body.
    let inc = the_loop.inc_part();
    let increment = if inc.parts_number() == 0 {
        None
    } else {
        Some(Expr::parse(&inc.to_string(), &pos)?)
    };
    let body = the_loop.body().clone();
    let mut new_body = Block::default();
    for _ in 0..factor {
        new_body.add_stmt(body.clone());
        if let Some(increment) = &increment {
            new_body.add_stmt(Stmt::basic(increment.clone()));
        }
    }
    the_loop.set_body(Stmt::from_block(new_body));
    the_loop.clear_inc_part();
    block.add_stmt(tagged(the_loop));

    finishing.clear_decl_part();
    block.add_stmt(tagged(finishing));

    Ok(Stmt::from_block(block))
}

impl Visitor for UnrollingOptimizer<'_> {
    fn before_stmt(&mut self, stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        let kind = stmt.as_ref().map(|stmt| stmt.kind());
        self.stack.push(kind);
        Ok(())
    }
    fn after_stmt(&mut self, stmt: &mut Option<Stmt>, _splicer: &mut Splicer<Stmt>) -> Result<()> {
        let result = self.visit(stmt);
        self.stack.pop();
        result
    }
}

/// Pass that runs the [UnrollingOptimizer] once over a rule body.
pub struct UnrollLoops;

impl Pass for UnrollLoops {
    const NAME: &'static str = "unroll-loops";
    fn convert(block: &mut Block, heuristics: &HeuristicManager) -> Result<RewriteResult> {
        let mut optimizer = UnrollingOptimizer::new(heuristics);
        apply_visitor(block, &mut optimizer)?;
        let unrolled = optimizer.unrolled();
        info!("Unrolled {unrolled} loop(s)");
        if unrolled > 0 {
            Ok(RewriteResult::Changed)
        } else {
            Ok(RewriteResult::Unchanged)
        }
    }
}
