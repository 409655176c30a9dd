use crate::board::Point;
use crate::layout::Layout;
use std::collections::BTreeSet;

/// The answer to a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Hint(u8),
    Hazard,
}

/// What happens when a hazard is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum HazardPolicy {
    /// Probing a hazard loses the episode.
    #[default]
    Fatal,
    /// Exposure is counted and play continues.
    Tolerated,
}

/// Represents the current state of the episode, as the environment sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Won,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("probe {0} is outside the grid")]
    OutOfBounds(Point),
    #[error("cell {0} was already probed")]
    AlreadyProbed(Point),
    #[error("episode has ended")]
    EpisodeOver,
}

/// Owns the ground truth and answers probes against it.
///
/// The layout itself is never handed out; callers only learn what `probe`
/// discloses.
pub struct Environment {
    layout: Layout,
    /// Hint for every cell (meaningless on hazards).
    hints: Vec<u8>,
    /// Indices of cells that have not been probed yet.
    covered: BTreeSet<usize>,
    policy: HazardPolicy,
    status: Status,
    exposures: usize,
}

impl Environment {
    pub fn new(layout: Layout, policy: HazardPolicy) -> Self {
        let size = layout.size();
        let hints = (0..size * size)
            .map(|i| layout.hint_at(Point { x: i % size, y: i / size }))
            .collect();
        let mut env = Environment {
            covered: (0..size * size).collect(),
            layout,
            hints,
            policy,
            status: Status::Running,
            exposures: 0,
        };
        env.refresh_status();
        env
    }

    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn hazard_count(&self) -> usize {
        self.layout.hazard_count()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status != Status::Running
    }

    pub fn covered_count(&self) -> usize {
        self.covered.len()
    }

    pub fn policy(&self) -> HazardPolicy {
        self.policy
    }

    /// Hazards probed under [`HazardPolicy::Tolerated`].
    pub fn exposures(&self) -> usize {
        self.exposures
    }

    pub fn probe(&mut self, point: Point) -> Result<Probe, ProbeError> {
        let size = self.size();
        if point.x >= size || point.y >= size {
            return Err(ProbeError::OutOfBounds(point));
        }
        if self.is_terminal() {
            return Err(ProbeError::EpisodeOver);
        }
        let index = point.y * size + point.x;
        if !self.covered.remove(&index) {
            return Err(ProbeError::AlreadyProbed(point));
        }

        let probe = if self.layout.is_hazard(point) {
            match self.policy {
                HazardPolicy::Fatal => self.status = Status::Lost,
                HazardPolicy::Tolerated => self.exposures += 1,
            }
            Probe::Hazard
        } else {
            Probe::Hint(self.hints[index])
        };

        self.refresh_status();
        Ok(probe)
    }

    /// Won iff every still-covered cell is a hazard. Linear in the covered set.
    fn refresh_status(&mut self) {
        if self.status == Status::Lost {
            return;
        }
        let size = self.size();
        let won = self.covered.iter().all(|&i| {
            self.layout.is_hazard(Point {
                x: i % size,
                y: i / size,
            })
        });
        if won {
            self.status = Status::Won;
        }
    }
}
