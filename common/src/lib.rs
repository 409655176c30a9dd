//! Deduction engine for a hidden-grid hazard-avoidance game.
//!
//! An [`Agent`] probes an [`Environment`] it cannot see into, records what it
//! learns on its [`Board`], floods out from zero hints, and settles the rest
//! with single-point inference or, failing that, a SAT oracle (varisat). It
//! never guesses once a deduction exists, and stops as stuck when none does.

pub mod agent;
pub mod board;
pub mod encoder;
pub mod environment;
pub mod frontier;
pub mod inference;
pub mod layout;
pub mod oracle;

pub use agent::{
    Action, Agent, EpisodeConfig, EpisodeReport, Move, Outcome, Reason, Strategy,
    StrategyParseError, default_openings,
};
pub use board::{Board, BoardError, CellState, Point};
pub use encoder::{Constraint, Formula, KnowledgeBase};
pub use environment::{Environment, HazardPolicy, Probe, ProbeError, Status};
pub use frontier::Frontier;
pub use inference::{Deduction, Rule, Verdict, single_point};
pub use layout::{Layout, LayoutError};
pub use oracle::{CnfAssumption, DnfAugmentation, OracleError, OracleKind, SatQuery};

/// A broken engine invariant: the driver asked for something the board or
/// environment cannot do. Never produced by a correct driving loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}
