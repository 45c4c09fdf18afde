use crate::ir::Expr;
use crate::ir::ExprKind;
use crate::ir::IrError;
use crate::ir::LoopStmt;
use crate::ir::Node;
use crate::ir::Splicer;
use crate::ir::Visitor;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Display;
use tracing::debug;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Increasing,
    Decreasing,
}

impl Direction {
    pub fn as_char(&self) -> char {
        match self {
            Direction::Increasing => '+',
            Direction::Decreasing => '-',
        }
    }
    /// Comparison that keeps a loop running while the variable, moved by
    /// one unrolled group, has not passed the bound.
    pub fn comparison_op(&self) -> &'static str {
        match self {
            Direction::Increasing => "<",
            Direction::Decreasing => ">=",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Result of the induction variable analysis of a loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Induction {
    /// Name of the variable, such as `i`.
    pub variable: String,
    pub direction: Direction,
    /// Text of the statement that moves the variable, such as `i += 2`.
    pub increment: String,
    /// Amount the variable moves per iteration, such as `2`.
    pub step: String,
}

impl Display for Induction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}{}) via `{}`",
            self.variable, self.direction, self.step, self.increment
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdiomMatch {
    Induction(Induction),
    /// A recognized update that cannot drive a loop, such as `i *= 2`.
    NotInduction,
}

/// One row of the table of recognized increment idioms.
struct IncrementIdiom {
    pattern: &'static str,
    parts: usize,
    matcher: fn(&Expr) -> Option<IdiomMatch>,
}

/// Recognized increment idioms, matched top to bottom.
const IDIOMS: &[IncrementIdiom] = &[
    IncrementIdiom {
        pattern: "i++",
        parts: 2,
        matcher: post_increment,
    },
    IncrementIdiom {
        pattern: "++i",
        parts: 2,
        matcher: pre_increment,
    },
    IncrementIdiom {
        pattern: "i--",
        parts: 2,
        matcher: post_decrement,
    },
    IncrementIdiom {
        pattern: "--i",
        parts: 2,
        matcher: pre_decrement,
    },
    IncrementIdiom {
        pattern: "i += e",
        parts: 3,
        matcher: add_assign,
    },
    IncrementIdiom {
        pattern: "i -= e",
        parts: 3,
        matcher: sub_assign,
    },
    IncrementIdiom {
        pattern: "i *= e",
        parts: 3,
        matcher: scale_assign,
    },
    IncrementIdiom {
        pattern: "i = i + c",
        parts: 5,
        matcher: assign_variable_first,
    },
    IncrementIdiom {
        pattern: "i = c + i",
        parts: 5,
        matcher: assign_variable_last,
    },
];

fn found(expr: &Expr, variable: &Expr, direction: Direction, step: &str) -> Option<IdiomMatch> {
    Some(IdiomMatch::Induction(Induction {
        variable: variable.to_string(),
        direction,
        increment: expr.to_string(),
        step: step.to_string(),
    }))
}

fn post_increment(expr: &Expr) -> Option<IdiomMatch> {
    if expr.part(1).is_leaf_str("++") {
        return found(expr, expr.part(0), Direction::Increasing, "1");
    }
    None
}

fn pre_increment(expr: &Expr) -> Option<IdiomMatch> {
    if expr.part(0).is_leaf_str("++") {
        return found(expr, expr.part(1), Direction::Increasing, "1");
    }
    None
}

fn post_decrement(expr: &Expr) -> Option<IdiomMatch> {
    if expr.part(1).is_leaf_str("--") {
        return found(expr, expr.part(0), Direction::Decreasing, "1");
    }
    None
}

fn pre_decrement(expr: &Expr) -> Option<IdiomMatch> {
    if expr.part(0).is_leaf_str("--") {
        return found(expr, expr.part(1), Direction::Decreasing, "1");
    }
    None
}

fn add_assign(expr: &Expr) -> Option<IdiomMatch> {
    if expr.part(1).is_leaf_str("+=") {
        let step = expr.part(2).to_string();
        return found(expr, expr.part(0), Direction::Increasing, &step);
    }
    None
}

fn sub_assign(expr: &Expr) -> Option<IdiomMatch> {
    if expr.part(1).is_leaf_str("-=") {
        let step = expr.part(2).to_string();
        return found(expr, expr.part(0), Direction::Decreasing, &step);
    }
    None
}

fn scale_assign(expr: &Expr) -> Option<IdiomMatch> {
    if expr.part(1).is_leaf_str("*=") || expr.part(1).is_leaf_str("/=") {
        return Some(IdiomMatch::NotInduction);
    }
    None
}

fn direction_of(op: &Expr) -> Option<Direction> {
    if op.is_leaf_str("+") {
        Some(Direction::Increasing)
    } else if op.is_leaf_str("-") {
        Some(Direction::Decreasing)
    } else {
        None
    }
}

fn assign_variable_first(expr: &Expr) -> Option<IdiomMatch> {
    let target = expr.part(0);
    let is_match = expr.part(1).is_leaf_str("=")
        && expr.part(2).to_string() == target.to_string()
        && expr.part(4).expr_kind() == ExprKind::Lit;
    if !is_match {
        return None;
    }
    let direction = direction_of(expr.part(3))?;
    let step = expr.part(4).to_string();
    found(expr, target, direction, &step)
}

fn assign_variable_last(expr: &Expr) -> Option<IdiomMatch> {
    let target = expr.part(0);
    let is_match = expr.part(1).is_leaf_str("=")
        && expr.part(4).to_string() == target.to_string()
        && expr.part(2).expr_kind() == ExprKind::Lit;
    if !is_match {
        return None;
    }
    let direction = direction_of(expr.part(3))?;
    let step = expr.part(2).to_string();
    found(expr, target, direction, &step)
}

/// Match an expression against the table of increment idioms.
pub fn match_increment(expr: &Expr) -> Option<IdiomMatch> {
    if expr.expr_kind() != ExprKind::Chain {
        return None;
    }
    let n = expr.parts_number();
    for idiom in IDIOMS.iter().filter(|idiom| idiom.parts == n) {
        if let Some(result) = (idiom.matcher)(expr) {
            debug!("`{expr}` matches increment idiom `{}`", idiom.pattern);
            return Some(result);
        }
    }
    None
}

/// Pick between the candidates of the two halves of `a, b`.
fn pick_comma_candidate(
    lhs: Option<Induction>,
    rhs: Option<Induction>,
    test: &Expr,
) -> Option<Induction> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => {
            let lhs_in_test = test.contains_leaf(&lhs.variable);
            let rhs_in_test = test.contains_leaf(&rhs.variable);
            if lhs_in_test && !rhs_in_test {
                Some(lhs)
            } else if rhs_in_test && !lhs_in_test {
                Some(rhs)
            } else {
                warn!(
                    "Increment moves both {} and {}; using {}",
                    lhs.variable, rhs.variable, rhs.variable
                );
                Some(rhs)
            }
        }
        (Some(lhs), None) => Some(lhs),
        (None, rhs) => rhs,
    }
}

/// Find the induction variable in the increment clause of a loop.
///
/// Returns `Ok(None)` for updates that cannot drive a loop and an
/// [IrError::UnsupportedConstruct] for shapes outside the idiom table.
pub fn induction_from_increment(inc: &Expr, test: &Expr) -> Result<Option<Induction>> {
    if inc.has_top_level_leaf(",") {
        let lhs = induction_from_increment(&inc.get_lhs(","), test)?;
        let rhs = induction_from_increment(&inc.get_rhs(","), test)?;
        return Ok(pick_comma_candidate(lhs, rhs, test));
    }
    match match_increment(inc) {
        Some(IdiomMatch::Induction(induction)) => Ok(Some(induction)),
        Some(IdiomMatch::NotInduction) => Ok(None),
        None => Err(IrError::unsupported("loop increment", &inc.to_string()).into()),
    }
}

struct Candidate {
    count: usize,
    induction: Induction,
}

/// Visitor that counts, per variable, how often the variable is moved by
/// one of the increment idioms.
#[derive(Default)]
pub struct InductionVariableIdentifier {
    candidates: BTreeMap<String, Candidate>,
}

impl InductionVariableIdentifier {
    fn record(&mut self, induction: Induction) {
        debug!("Induction candidate {induction}");
        self.candidates
            .entry(induction.variable.clone())
            .and_modify(|candidate| candidate.count += 1)
            .or_insert(Candidate {
                count: 1,
                induction,
            });
    }
    /// Candidates that are moved exactly once, ordered by name.
    fn single_assignments(self) -> Vec<Induction> {
        self.candidates
            .into_values()
            .filter(|candidate| candidate.count == 1)
            .map(|candidate| candidate.induction)
            .collect()
    }
}

impl Visitor for InductionVariableIdentifier {
    fn before_expr(&mut self, expr: &mut Option<Expr>, _splicer: &mut Splicer<Expr>) -> Result<()> {
        if let Some(expr) = expr {
            if let Some(IdiomMatch::Induction(induction)) = match_increment(expr) {
                self.record(induction);
            }
        }
        Ok(())
    }
}

/// Find the induction variable by scanning the body of a loop.
pub fn induction_from_body(the_loop: &mut LoopStmt) -> Result<Option<Induction>> {
    let mut identifier = InductionVariableIdentifier::default();
    the_loop.body_mut().accept(&mut identifier)?;
    let mut candidates = identifier.single_assignments();
    match candidates.len() {
        0 => {
            warn!("No induction variable found in loop body:\n{}", the_loop.body());
            Ok(None)
        }
        1 => Ok(candidates.pop()),
        _ => {
            let test = the_loop.test_part();
            let in_test = candidates
                .iter()
                .filter(|candidate| test.contains_leaf(&candidate.variable))
                .collect::<Vec<&Induction>>();
            if in_test.len() == 1 {
                Ok(Some(in_test[0].clone()))
            } else {
                let candidates = candidates.into_iter().map(|c| c.variable).collect();
                Err(IrError::AmbiguousInductionVariable { candidates }.into())
            }
        }
    }
}

/// Compute the induction variable of a loop.
///
/// The increment clause is tried first. When it does not name an induction
/// variable, the body is scanned instead.
pub fn compute_induction(the_loop: &mut LoopStmt) -> Result<Option<Induction>> {
    let inc = the_loop.inc_part();
    let from_increment = if inc.expr_kind() == ExprKind::Chain {
        induction_from_increment(inc, the_loop.test_part())?
    } else {
        None
    };
    let induction = match from_increment {
        Some(induction) => Some(induction),
        None => induction_from_body(the_loop)?,
    };
    if let Some(induction) = &induction {
        debug!("Induction variable {induction}");
    }
    Ok(induction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Location;

    fn parse(src: &str) -> Expr {
        Expr::parse(src, &Location::default()).unwrap()
    }

    fn variable(src: &str) -> Option<(String, Direction, String)> {
        match match_increment(&parse(src)) {
            Some(IdiomMatch::Induction(i)) => Some((i.variable, i.direction, i.step)),
            _ => None,
        }
    }

    #[test]
    fn test_idiom_table() {
        let inc = Direction::Increasing;
        let dec = Direction::Decreasing;
        assert_eq!(variable("i++"), Some(("i".to_string(), inc, "1".to_string())));
        assert_eq!(variable("++i"), Some(("i".to_string(), inc, "1".to_string())));
        assert_eq!(variable("i--"), Some(("i".to_string(), dec, "1".to_string())));
        assert_eq!(variable("--i"), Some(("i".to_string(), dec, "1".to_string())));
        assert_eq!(variable("k += n"), Some(("k".to_string(), inc, "n".to_string())));
        assert_eq!(variable("k -= 2"), Some(("k".to_string(), dec, "2".to_string())));
        assert_eq!(variable("i = i + 3"), Some(("i".to_string(), inc, "3".to_string())));
        assert_eq!(variable("i = 3 + i"), Some(("i".to_string(), inc, "3".to_string())));
        assert_eq!(variable("i = i - 1"), Some(("i".to_string(), dec, "1".to_string())));

        assert_eq!(match_increment(&parse("i *= 2")), Some(IdiomMatch::NotInduction));
        assert_eq!(match_increment(&parse("i /= 2")), Some(IdiomMatch::NotInduction));
        // The other operand must be a literal.
        assert_eq!(match_increment(&parse("i = i + n")), None);
        assert_eq!(match_increment(&parse("i = j")), None);
        assert_eq!(match_increment(&parse("i")), None);
    }

    #[test]
    fn test_comma_chain() {
        let test = parse("j > 0");
        let induction = induction_from_increment(&parse("i++, j--"), &test)
            .unwrap()
            .unwrap();
        assert_eq!(induction.variable, "j");
        assert_eq!(induction.direction, Direction::Decreasing);

        let test = parse("i < n");
        let induction = induction_from_increment(&parse("i++, j--"), &test)
            .unwrap()
            .unwrap();
        assert_eq!(induction.variable, "i");

        // Neither appears in the test: the last one wins.
        let test = parse("k < n");
        let induction = induction_from_increment(&parse("i++, j--"), &test)
            .unwrap()
            .unwrap();
        assert_eq!(induction.variable, "j");

        let induction = induction_from_increment(&parse("i *= 2, j++"), &test)
            .unwrap()
            .unwrap();
        assert_eq!(induction.variable, "j");
    }

    #[test]
    fn test_unsupported_increment() {
        let err = induction_from_increment(&parse("i = next(i)"), &parse("i < n")).unwrap_err();
        let err = err.downcast::<IrError>().unwrap();
        assert_eq!(err, IrError::unsupported("loop increment", "i = next(i)"));
    }
}
