use crate::EngineError;
use crate::board::{Board, Point};
use crate::environment::{Environment, Probe, Status};
use std::collections::VecDeque;
use tracing::debug;

/// Work-list of revealed zero cells whose neighbours have not been drained yet.
#[derive(Debug, Default)]
pub struct Frontier {
    pending: VecDeque<Point>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Probes `point` and records the answer on `board`.
    ///
    /// This is the only place a hint reaches the board. A zero hint is queued
    /// for expansion. A tolerated hazard exposure is flagged, since the agent
    /// now knows the cell.
    pub fn probe(
        &mut self,
        board: &mut Board,
        env: &mut Environment,
        point: Point,
    ) -> Result<Probe, EngineError> {
        let probe = env.probe(point)?;
        match probe {
            Probe::Hint(hint) => {
                board.reveal(point, hint)?;
                if hint == 0 {
                    self.pending.push_back(point);
                }
            }
            Probe::Hazard => board.flag_hazard(point)?,
        }
        Ok(probe)
    }

    /// Probes every unknown neighbour of every queued zero cell, following new
    /// zeros as they appear. Returns the probed cells in order.
    pub fn expand(
        &mut self,
        board: &mut Board,
        env: &mut Environment,
    ) -> Result<Vec<Point>, EngineError> {
        let mut probed = Vec::new();

        while let Some(zero) = self.pending.pop_front() {
            if env.status() != Status::Running {
                self.pending.clear();
                break;
            }

            let targets: Vec<Point> = board
                .neighbors(zero)
                .filter(|&n| board.state(n).is_unknown())
                .collect();
            for neighbor in targets {
                if env.is_terminal() {
                    break;
                }
                self.probe(board, env, neighbor)?;
                probed.push(neighbor);
            }
        }

        if !probed.is_empty() {
            debug!(count = probed.len(), "frontier expanded");
        }
        Ok(probed)
    }
}
