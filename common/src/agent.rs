use crate::EngineError;
use crate::board::{Board, CellState, Point};
use crate::encoder::KnowledgeBase;
use crate::environment::{Environment, HazardPolicy, Probe, Status};
use crate::frontier::Frontier;
use crate::inference::{Rule, Verdict, single_point};
use crate::layout::Layout;
use crate::oracle::{OracleKind, SatQuery, first_provably_safe};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How the agent picks its next move once the frontier is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Strategy {
    /// Probe the first unknown cell, with no reasoning at all.
    BasicProbe,
    /// Single-point inference only.
    SinglePointOnly,
    /// Single-point inference, then DNF knowledge base with one solve per candidate.
    SatDnf,
    /// Single-point inference, then CNF knowledge base queried under assumptions.
    #[default]
    SatCnf,
}

impl Strategy {
    pub fn oracle(self) -> Option<OracleKind> {
        match self {
            Strategy::BasicProbe | Strategy::SinglePointOnly => None,
            Strategy::SatDnf => Some(OracleKind::Dnf),
            Strategy::SatCnf => Some(OracleKind::Cnf),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::BasicProbe => "basic",
            Strategy::SinglePointOnly => "single-point",
            Strategy::SatDnf => "sat-dnf",
            Strategy::SatCnf => "sat-cnf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy {0:?}; expected basic, single-point, sat-dnf or sat-cnf")]
pub struct StrategyParseError(String);

impl FromStr for Strategy {
    type Err = StrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" | "p1" => Ok(Strategy::BasicProbe),
            "single-point" | "p2" => Ok(Strategy::SinglePointOnly),
            "sat-dnf" | "p3" => Ok(Strategy::SatDnf),
            "sat-cnf" | "p4" => Ok(Strategy::SatCnf),
            _ => Err(StrategyParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings for one episode.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct EpisodeConfig {
    pub strategy: Strategy,
    pub hazard_policy: HazardPolicy,
    /// Cells probed before any reasoning. `None` uses [`default_openings`].
    pub openings: Option<Vec<Point>>,
    /// Wall-clock limit for one oracle cycle.
    pub oracle_budget: Option<Duration>,
}

impl EpisodeConfig {
    pub fn new(strategy: Strategy) -> Self {
        EpisodeConfig {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_hazard_policy(mut self, policy: HazardPolicy) -> Self {
        self.hazard_policy = policy;
        self
    }

    pub fn with_openings(mut self, openings: Vec<Point>) -> Self {
        self.openings = Some(openings);
        self
    }

    pub fn with_oracle_budget(mut self, budget: Duration) -> Self {
        self.oracle_budget = Some(budget);
        self
    }
}

/// The top-left corner, plus the centre for every strategy that reasons.
pub fn default_openings(size: usize, strategy: Strategy) -> Vec<Point> {
    let mut openings = vec![Point::new(0, 0)];
    let centre = Point::new(size / 2, size / 2);
    if strategy != Strategy::BasicProbe && centre != openings[0] {
        openings.push(centre);
    }
    openings
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Outcome {
    Won,
    Lost,
    Stuck,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Won => "Agent alive: all solved",
            Outcome::Lost => "Agent dead: found hazard",
            Outcome::Stuck => "Agent not terminated",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Action {
    Probe,
    Flag,
}

/// Why a move was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Reason {
    Opening,
    Frontier,
    Blind,
    AllFlagged,
    AllMissing,
    Oracle,
    TerminalSweep,
}

/// One board mutation, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Move {
    pub point: Point,
    pub action: Action,
    pub reason: Reason,
    /// Set when a probe hit a hazard.
    pub exposed: bool,
}

/// Drives one episode: owns the knowledge board, the environment and the frontier.
pub struct Agent {
    config: EpisodeConfig,
    board: Board,
    env: Environment,
    frontier: Frontier,
    oracle: Option<Box<dyn SatQuery>>,
    moves: Vec<Move>,
    outcome: Option<Outcome>,
}

impl Agent {
    /// Sets up the episode and probes the opening cells.
    pub fn new(layout: Layout, config: EpisodeConfig) -> Result<Self, EngineError> {
        let size = layout.size();
        let openings = config
            .openings
            .clone()
            .unwrap_or_else(|| default_openings(size, config.strategy));

        info!(
            size,
            strategy = %config.strategy,
            policy = ?config.hazard_policy,
            "episode start"
        );

        let mut agent = Agent {
            board: Board::new(size),
            env: Environment::new(layout, config.hazard_policy),
            frontier: Frontier::new(),
            oracle: config.strategy.oracle().map(OracleKind::query),
            moves: Vec::new(),
            outcome: None,
            config,
        };

        for point in openings {
            if agent.outcome.is_some() {
                break;
            }
            if agent.board.contains(point) && !agent.board.state(point).is_unknown() {
                continue;
            }
            agent.probe(point, Reason::Opening)?;
            agent.settle();
        }
        Ok(agent)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &EpisodeConfig {
        &self.config
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn exposures(&self) -> usize {
        self.env.exposures()
    }

    /// Runs cycles until the episode ends.
    pub fn run(&mut self) -> Result<Outcome, EngineError> {
        loop {
            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }
        }
    }

    /// One decision cycle: expand the frontier, then make at most one verdict.
    /// Returns the outcome once the episode has ended.
    pub fn step(&mut self) -> Result<Option<Outcome>, EngineError> {
        if self.outcome.is_some() {
            return Ok(self.outcome);
        }

        for point in self.frontier.expand(&mut self.board, &mut self.env)? {
            self.record(point, Action::Probe, Reason::Frontier, false);
        }
        if let Some(outcome) = self.settle() {
            return Ok(Some(outcome));
        }

        match self.config.strategy {
            Strategy::BasicProbe => {
                let Some(point) = self.board.unresolved().next() else {
                    self.finish(Outcome::Stuck);
                    return Ok(self.outcome);
                };
                self.probe(point, Reason::Blind)?;
            }
            Strategy::SinglePointOnly | Strategy::SatDnf | Strategy::SatCnf => {
                let progressed = self.apply_single_point()? || self.apply_oracle()?;
                if !progressed {
                    self.finish(Outcome::Stuck);
                    return Ok(self.outcome);
                }
            }
        }

        Ok(self.settle())
    }

    fn apply_single_point(&mut self) -> Result<bool, EngineError> {
        let Some(deduction) = single_point(&self.board) else {
            return Ok(false);
        };
        let reason = match deduction.rule {
            Rule::AllFlagged => Reason::AllFlagged,
            Rule::AllMissing => Reason::AllMissing,
        };
        debug!(
            verdict = ?deduction.verdict,
            source = %deduction.source,
            ?reason,
            "single-point verdict"
        );

        match deduction.verdict {
            Verdict::Safe(point) => {
                self.probe(point, reason)?;
            }
            Verdict::Hazard(point) => {
                self.board.flag_hazard(point)?;
                self.record(point, Action::Flag, reason, false);
            }
        }
        Ok(true)
    }

    /// Asks the oracle for a provably safe cell. Oracle failures are logged and
    /// count as "nothing provable".
    fn apply_oracle(&mut self) -> Result<bool, EngineError> {
        let Some(oracle) = self.oracle.as_mut() else {
            return Ok(false);
        };

        let found = KnowledgeBase::build(&self.board).and_then(|kb| {
            if kb.is_empty() {
                return Ok(None);
            }
            first_provably_safe(
                oracle.as_mut(),
                &kb,
                self.board.unresolved(),
                self.config.oracle_budget,
            )
        });

        match found {
            Ok(Some(point)) => {
                debug!(%point, "oracle proved cell safe");
                self.probe(point, Reason::Oracle)?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => {
                warn!(%err, "oracle query failed; treating cycle as undetermined");
                Ok(false)
            }
        }
    }

    fn probe(&mut self, point: Point, reason: Reason) -> Result<Probe, EngineError> {
        let probe = self
            .frontier
            .probe(&mut self.board, &mut self.env, point)?;
        self.record(point, Action::Probe, reason, probe == Probe::Hazard);
        Ok(probe)
    }

    fn record(&mut self, point: Point, action: Action, reason: Reason, exposed: bool) {
        debug!(%point, ?action, ?reason, exposed, "move");
        self.moves.push(Move {
            point,
            action,
            reason,
            exposed,
        });
    }

    /// Checks for a terminal state after a board mutation.
    fn settle(&mut self) -> Option<Outcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }
        if self.env.status() == Status::Lost {
            self.finish(Outcome::Lost);
            return self.outcome;
        }

        // Every unknown cell must be a hazard once the counts line up.
        let remaining_hazards = self
            .env
            .hazard_count()
            .saturating_sub(self.board.flagged_count());
        if self.board.unknown_count() == remaining_hazards {
            let rest: Vec<Point> = self.board.unresolved().collect();
            for point in rest {
                if self.board.flag_hazard(point).is_ok() {
                    self.record(point, Action::Flag, Reason::TerminalSweep, false);
                }
            }
        }

        if self.env.status() == Status::Won {
            self.finish(Outcome::Won);
        }
        self.outcome
    }

    fn finish(&mut self, outcome: Outcome) {
        info!(
            %outcome,
            moves = self.moves.len(),
            exposures = self.env.exposures(),
            "episode finished"
        );
        self.outcome = Some(outcome);
    }

    pub fn report(&self) -> EpisodeReport {
        EpisodeReport {
            size: self.board.size(),
            cells: self.board.cells().to_vec(),
            outcome: self.outcome,
            moves: self.moves.clone(),
            exposures: self.env.exposures(),
            policy: self.env.policy(),
        }
    }
}

/// Everything a caller needs after an episode: the final board, the outcome and the trace.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EpisodeReport {
    pub size: usize,
    /// Final board, indexed by `y * size + x`.
    pub cells: Vec<CellState>,
    pub outcome: Option<Outcome>,
    pub moves: Vec<Move>,
    pub exposures: usize,
    pub policy: HazardPolicy,
}

impl EpisodeReport {
    /// Deserializes a report from bytes.
    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        Ok(bcs::from_bytes(bts)?)
    }

    /// Serializes the report to bytes.
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }
}
