//! Satisfiability queries over the knowledge base.
//!
//! Both strategies answer the same question for a candidate cell `c`: is there
//! a hazard placement consistent with every revealed hint in which `c` is a
//! hazard? If not, `c` is proved safe.

use crate::board::Point;
use crate::encoder::{Formula, KnowledgeBase, encode_exactly_k};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;
use varisat::{CnfFormula, ExtendFormula, Lit, Solver, Var};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("malformed formula: {0}")]
    MalformedFormula(String),
    #[error("contradictory knowledge base: {0}")]
    Contradiction(String),
    #[error("oracle exceeded its {budget:?} budget")]
    Timeout { budget: Duration },
    #[error("solver failed: {0}")]
    Solver(String),
}

/// One way of asking the oracle about candidate cells.
pub trait SatQuery {
    /// Prepares to answer queries against `kb`.
    /// Fails with [`OracleError::Contradiction`] if `kb` has no model at all.
    fn load(&mut self, kb: &KnowledgeBase) -> Result<(), OracleError>;

    /// Whether some placement consistent with the loaded knowledge base makes
    /// `point` hazardous. Cells the knowledge base does not mention always can.
    fn can_be_hazard(&mut self, point: Point) -> Result<bool, OracleError>;
}

/// Which [`SatQuery`] implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleKind {
    Dnf,
    Cnf,
}

impl OracleKind {
    pub fn query(self) -> Box<dyn SatQuery> {
        match self {
            OracleKind::Dnf => Box::new(DnfAugmentation::default()),
            OracleKind::Cnf => Box::new(CnfAssumption::default()),
        }
    }
}

/// Keeps the knowledge base as a DNF conjunction and solves `KB ∧ c` from
/// scratch for every candidate.
#[derive(Debug, Default)]
pub struct DnfAugmentation {
    formula: Option<Formula>,
    variables: Vec<Point>,
}

impl DnfAugmentation {
    fn solve(&self, hypothesis: Option<Point>) -> Result<bool, OracleError> {
        let formula = self
            .formula
            .as_ref()
            .ok_or_else(|| OracleError::MalformedFormula("no knowledge base loaded".into()))?;

        let mut cnf = CnfFormula::new();
        let var_map: HashMap<Point, Var> = self
            .variables
            .iter()
            .map(|&p| (p, cnf.new_var()))
            .collect();

        assert_root(formula, &mut cnf, &var_map)?;
        if let Some(point) = hypothesis {
            cnf.add_clause(&[literal(&var_map, point)?]);
        }

        let mut solver = Solver::new();
        solver.add_formula(&cnf);
        solver
            .solve()
            .map_err(|err| OracleError::Solver(err.to_string()))
    }
}

impl SatQuery for DnfAugmentation {
    fn load(&mut self, kb: &KnowledgeBase) -> Result<(), OracleError> {
        let formula = kb.to_dnf();
        trace!(kb = %formula, "dnf knowledge base");
        self.formula = Some(formula);
        self.variables = kb.variables.clone();

        if !self.solve(None)? {
            return Err(OracleError::Contradiction(
                "knowledge base is unsatisfiable".into(),
            ));
        }
        Ok(())
    }

    fn can_be_hazard(&mut self, point: Point) -> Result<bool, OracleError> {
        if !self.variables.contains(&point) {
            return Ok(true);
        }
        self.solve(Some(point))
    }
}

/// Encodes the knowledge base into one solver and asks about each candidate
/// with a single unit assumption.
pub struct CnfAssumption {
    solver: Solver<'static>,
    var_map: HashMap<Point, Var>,
}

impl Default for CnfAssumption {
    fn default() -> Self {
        CnfAssumption {
            solver: Solver::new(),
            var_map: HashMap::new(),
        }
    }
}

impl SatQuery for CnfAssumption {
    fn load(&mut self, kb: &KnowledgeBase) -> Result<(), OracleError> {
        let mut formula = CnfFormula::new();
        let var_map: HashMap<Point, Var> = kb
            .variables
            .iter()
            .map(|&p| (p, formula.new_var()))
            .collect();

        // Degenerate constraints become unit clauses; opposing units mean the
        // hints contradict each other.
        let mut units: HashMap<Point, bool> = HashMap::new();
        for constraint in &kb.constraints {
            let forced = if constraint.required_hazards == 0 {
                Some(false)
            } else if constraint.required_hazards == constraint.variables.len() {
                Some(true)
            } else {
                None
            };
            if let Some(hazard) = forced {
                for &point in &constraint.variables {
                    if *units.entry(point).or_insert(hazard) != hazard {
                        return Err(OracleError::Contradiction(format!(
                            "opposing unit clauses for {point}"
                        )));
                    }
                }
            }

            let lits = constraint
                .variables
                .iter()
                .map(|&p| literal(&var_map, p))
                .collect::<Result<Vec<Lit>, _>>()?;
            encode_exactly_k(&mut formula, &lits, constraint.required_hazards);
        }
        trace!(
            vars = var_map.len(),
            constraints = kb.constraints.len(),
            "cnf knowledge base"
        );

        let mut solver = Solver::new();
        solver.add_formula(&formula);
        if !solver
            .solve()
            .map_err(|err| OracleError::Solver(err.to_string()))?
        {
            return Err(OracleError::Contradiction(
                "knowledge base is unsatisfiable".into(),
            ));
        }

        self.solver = solver;
        self.var_map = var_map;
        Ok(())
    }

    fn can_be_hazard(&mut self, point: Point) -> Result<bool, OracleError> {
        let Some(&var) = self.var_map.get(&point) else {
            return Ok(true);
        };

        self.solver.assume(&[Lit::from_var(var, true)]);
        let result = self.solver.solve();
        // Clear assumptions for the next query.
        self.solver.assume(&[]);
        result.map_err(|err| OracleError::Solver(err.to_string()))
    }
}

fn literal(var_map: &HashMap<Point, Var>, point: Point) -> Result<Lit, OracleError> {
    var_map
        .get(&point)
        .map(|&v| Lit::from_var(v, true))
        .ok_or_else(|| OracleError::MalformedFormula(format!("unknown variable {point}")))
}

/// Asserts `formula`. A top-level conjunction is split into one unit per conjunct.
fn assert_root(
    formula: &Formula,
    cnf: &mut CnfFormula,
    var_map: &HashMap<Point, Var>,
) -> Result<(), OracleError> {
    match formula {
        Formula::And(conjuncts) => {
            for conjunct in conjuncts {
                let lit = tseitin(conjunct, cnf, var_map)?;
                cnf.add_clause(&[lit]);
            }
        }
        other => {
            let lit = tseitin(other, cnf, var_map)?;
            cnf.add_clause(&[lit]);
        }
    }
    Ok(())
}

/// Returns a literal that implies `formula`, adding the defining clauses.
///
/// Every compound node occurs positively, so the one-sided (Plaisted-Greenbaum)
/// definition is enough for satisfiability.
fn tseitin(
    formula: &Formula,
    cnf: &mut CnfFormula,
    var_map: &HashMap<Point, Var>,
) -> Result<Lit, OracleError> {
    match formula {
        Formula::Var(point) => literal(var_map, *point),
        Formula::Not(inner) => match inner.as_ref() {
            Formula::Var(point) => Ok(!literal(var_map, *point)?),
            other => Err(OracleError::MalformedFormula(format!(
                "negated compound {other}"
            ))),
        },
        Formula::And(children) => {
            if children.is_empty() {
                return Err(OracleError::MalformedFormula("empty term".into()));
            }
            let node = Lit::from_var(cnf.new_var(), true);
            for child in children {
                let lit = tseitin(child, cnf, var_map)?;
                cnf.add_clause(&[!node, lit]);
            }
            Ok(node)
        }
        Formula::Or(children) => {
            if children.is_empty() {
                return Err(OracleError::MalformedFormula("empty disjunction".into()));
            }
            let node = Lit::from_var(cnf.new_var(), true);
            let mut clause = vec![!node];
            for child in children {
                clause.push(tseitin(child, cnf, var_map)?);
            }
            cnf.add_clause(&clause);
            Ok(node)
        }
    }
}

/// Finds the first candidate that cannot be a hazard.
///
/// Candidates are asked in the order given. `budget` bounds the wall-clock
/// time spent in this call, checked between queries.
pub fn first_provably_safe<I>(
    query: &mut dyn SatQuery,
    kb: &KnowledgeBase,
    candidates: I,
    budget: Option<Duration>,
) -> Result<Option<Point>, OracleError>
where
    I: IntoIterator<Item = Point>,
{
    let started = Instant::now();
    let within_budget = || match budget {
        Some(budget) if started.elapsed() > budget => Err(OracleError::Timeout { budget }),
        _ => Ok(()),
    };

    query.load(kb)?;
    within_budget()?;

    for candidate in candidates {
        within_budget()?;
        if !query.can_be_hazard(candidate)? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
