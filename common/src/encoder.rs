use crate::board::{Board, Point};
use crate::oracle::OracleError;
use itertools::Itertools;
use std::fmt;
use varisat::{CnfFormula, ExtendFormula, Lit};

/// A single constraint for the oracle.
/// For example, a revealed '2' with one flagged neighbour requires exactly
/// one hazard among its unknown neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// The hint cell this constraint comes from.
    pub source: Point,
    /// The unknown neighbours of `source`, in row-major order.
    pub variables: Vec<Point>,
    /// The exact number of hazards among `variables`.
    pub required_hazards: usize,
}

/// Everything the revealed hints say about the unknown cells.
/// Rebuilt from the board on every decision cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KnowledgeBase {
    /// Unknown cells touched by at least one constraint, in row-major order.
    pub variables: Vec<Point>,
    pub constraints: Vec<Constraint>,
}

impl KnowledgeBase {
    /// Builds one exact-k constraint per hint cell that still has unknown neighbours.
    pub fn build(board: &Board) -> Result<Self, OracleError> {
        let mut constraints = Vec::new();

        for (source, hint) in board.hint_cells() {
            let tally = board.tally(source);
            if tally.unknown.is_empty() {
                continue;
            }

            let required_hazards = (hint as usize)
                .checked_sub(tally.flagged)
                .filter(|&required| required <= tally.unknown.len())
                .ok_or_else(|| {
                    OracleError::Contradiction(format!(
                        "hint {hint} at {source} cannot hold with {} flagged and {} unknown neighbours",
                        tally.flagged,
                        tally.unknown.len()
                    ))
                })?;

            constraints.push(Constraint {
                source,
                variables: tally.unknown,
                required_hazards,
            });
        }

        let variables = constraints
            .iter()
            .flat_map(|c| c.variables.iter().copied())
            .sorted_by_key(|&p| board.index(p))
            .dedup()
            .collect();

        Ok(KnowledgeBase {
            variables,
            constraints,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn contains(&self, point: Point) -> bool {
        self.variables.contains(&point)
    }

    /// The conjunction of one exact-k DNF per constraint.
    pub fn to_dnf(&self) -> Formula {
        Formula::And(
            self.constraints
                .iter()
                .map(|c| exactly_k_dnf(&c.variables, c.required_hazards))
                .collect(),
        )
    }
}

/// A propositional formula over hazard indicators: `Var(p)` is true iff `p` is hazardous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Var(Point),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

impl Formula {
    pub fn literal(point: Point, hazard: bool) -> Self {
        if hazard {
            Formula::Var(point)
        } else {
            Formula::Not(Box::new(Formula::Var(point)))
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Var(p) => write!(f, "T{}_{}", p.x, p.y),
            Formula::Not(inner) => write!(f, "~{inner}"),
            Formula::And(children) => write!(f, "({})", children.iter().join(" & ")),
            Formula::Or(children) => write!(f, "({})", children.iter().join(" | ")),
        }
    }
}

/// "Exactly `k` of `vars` are hazards", as a disjunction over the k-subsets.
///
/// Each term keeps the literals in the order of `vars`, with the chosen ones
/// positive and the rest negated. `k == 0` and `k == vars.len()` each give a
/// single term.
pub fn exactly_k_dnf(vars: &[Point], k: usize) -> Formula {
    let term = |chosen: &[usize]| {
        Formula::And(
            vars.iter()
                .enumerate()
                .map(|(i, &p)| Formula::literal(p, chosen.contains(&i)))
                .collect(),
        )
    };

    if k == 0 {
        return Formula::Or(vec![term(&[])]);
    }
    Formula::Or(
        (0..vars.len())
            .combinations(k)
            .map(|chosen| term(&chosen))
            .collect(),
    )
}

/// Encodes an "exactly k" constraint into the CNF formula.
pub fn encode_exactly_k(formula: &mut CnfFormula, vars: &[Lit], k: usize) {
    encode_at_most_k(formula, vars, k);
    encode_at_least_k(formula, vars, k);
}

/// Encodes an "at most k" constraint: no k+1 variables are all true.
fn encode_at_most_k(formula: &mut CnfFormula, vars: &[Lit], k: usize) {
    if k >= vars.len() {
        return; // Always satisfiable.
    }
    if k == 0 {
        // All variables must be false.
        for &lit in vars {
            formula.add_clause(&[!lit]);
        }
        return;
    }

    for combo in vars.iter().copied().combinations(k + 1) {
        let clause: Vec<Lit> = combo.iter().map(|&lit| !lit).collect();
        formula.add_clause(&clause);
    }
}

/// Encodes an "at least k" constraint: every n-k+1 variables contain a true one.
fn encode_at_least_k(formula: &mut CnfFormula, vars: &[Lit], k: usize) {
    if k == 0 {
        return; // Always satisfied.
    }
    if k > vars.len() {
        // Unsatisfiable - add empty clause.
        formula.add_clause(&[]);
        return;
    }

    for combo in vars.iter().copied().combinations(vars.len() - k + 1) {
        formula.add_clause(&combo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use varisat::{Solver, Var};

    fn points(n: usize) -> Vec<Point> {
        (0..n).map(|x| Point::new(x, 0)).collect()
    }

    fn terms(formula: &Formula) -> &[Formula] {
        match formula {
            Formula::Or(terms) => terms,
            other => panic!("expected a disjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_dnf_enumerates_combinations() {
        // C(5, 2) terms, each with 2 positive and 3 negative literals.
        let dnf = exactly_k_dnf(&points(5), 2);
        let terms = terms(&dnf);
        assert_eq!(terms.len(), 10);
        for term in terms {
            let Formula::And(literals) = term else {
                panic!("expected a conjunction");
            };
            assert_eq!(literals.len(), 5);
            let positive = literals
                .iter()
                .filter(|l| matches!(l, Formula::Var(_)))
                .count();
            assert_eq!(positive, 2);
        }
        // No term repeats.
        assert_eq!(terms.iter().unique().count(), 10);
    }

    #[test]
    fn test_dnf_degenerate_cases() {
        let vars = points(3);

        let none = exactly_k_dnf(&vars, 0);
        assert_eq!(
            none,
            Formula::Or(vec![Formula::And(
                vars.iter().map(|&p| Formula::literal(p, false)).collect()
            )])
        );

        let all = exactly_k_dnf(&vars, 3);
        assert_eq!(
            all,
            Formula::Or(vec![Formula::And(
                vars.iter().map(|&p| Formula::literal(p, true)).collect()
            )])
        );
    }

    #[test]
    fn test_formula_display() {
        let dnf = exactly_k_dnf(&points(2), 1);
        assert_eq!(dnf.to_string(), "((T0_0 & ~T1_0) | (~T0_0 & T1_0))");
    }

    #[test]
    fn test_build_knowledge_base() {
        let mut board = Board::new(3);
        board.reveal(Point::new(0, 0), 1).unwrap();
        board.reveal(Point::new(1, 0), 2).unwrap();
        board.flag_hazard(Point::new(2, 0)).unwrap();

        let kb = KnowledgeBase::build(&board).unwrap();
        assert_eq!(kb.constraints.len(), 2);
        assert_eq!(
            kb.constraints[0],
            Constraint {
                source: Point::new(0, 0),
                variables: vec![Point::new(0, 1), Point::new(1, 1)],
                required_hazards: 1,
            }
        );
        assert_eq!(kb.constraints[1].required_hazards, 1);
        assert_eq!(kb.constraints[1].variables.len(), 3);
        assert_eq!(
            kb.variables,
            vec![
                Point::new(0, 1),
                Point::new(1, 1),
                Point::new(2, 1),
            ]
        );
    }

    #[test]
    fn test_build_skips_settled_hints() {
        let mut board = Board::new(2);
        for p in [Point::new(0, 0), Point::new(1, 0), Point::new(0, 1)] {
            board.reveal(p, 1).unwrap();
        }
        board.flag_hazard(Point::new(1, 1)).unwrap();
        assert!(KnowledgeBase::build(&board).unwrap().is_empty());
    }

    #[test]
    fn test_build_detects_contradiction() {
        // Two flags next to a 1.
        let mut board = Board::new(2);
        board.reveal(Point::new(0, 0), 1).unwrap();
        board.flag_hazard(Point::new(1, 0)).unwrap();
        board.flag_hazard(Point::new(0, 1)).unwrap();
        assert!(matches!(
            KnowledgeBase::build(&board),
            Err(OracleError::Contradiction(_))
        ));

        // A 3 with only two unknown neighbours.
        let mut board = Board::new(2);
        board.reveal(Point::new(0, 0), 3).unwrap();
        board.reveal(Point::new(1, 1), 0).unwrap();
        assert!(matches!(
            KnowledgeBase::build(&board),
            Err(OracleError::Contradiction(_))
        ));
    }

    fn count_models(n: usize, k: usize) -> usize {
        let mut formula = CnfFormula::new();
        let vars: Vec<Var> = (0..n).map(|_| formula.new_var()).collect();
        let lits: Vec<Lit> = vars.iter().map(|&v| Lit::from_var(v, true)).collect();
        encode_exactly_k(&mut formula, &lits, k);

        // Enumerate every assignment and count the ones the solver accepts.
        let mut models = 0;
        for mask in 0..(1u32 << n) {
            let mut solver = Solver::new();
            solver.add_formula(&formula);
            let assumptions: Vec<Lit> = vars
                .iter()
                .enumerate()
                .map(|(i, &v)| Lit::from_var(v, mask & (1 << i) != 0))
                .collect();
            solver.assume(&assumptions);
            if solver.solve().unwrap() {
                assert_eq!(mask.count_ones() as usize, k);
                models += 1;
            }
        }
        models
    }

    #[test]
    fn test_cnf_exactly_k_models() {
        assert_eq!(count_models(4, 0), 1);
        assert_eq!(count_models(4, 2), 6);
        assert_eq!(count_models(4, 4), 1);
        assert_eq!(count_models(3, 1), 3);
    }
}
