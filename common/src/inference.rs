//! Single-point inference: local rules that settle a cell from one hint neighbour.

use crate::board::{Board, CellState, Point};

/// A proved fact about one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe(Point),
    Hazard(Point),
}

impl Verdict {
    pub fn point(self) -> Point {
        match self {
            Verdict::Safe(p) | Verdict::Hazard(p) => p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The hint is already accounted for by flagged neighbours.
    AllFlagged,
    /// Every unknown neighbour is needed to reach the hint.
    AllMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deduction {
    pub verdict: Verdict,
    pub rule: Rule,
    /// The hint cell that forced the verdict.
    pub source: Point,
}

/// Scans unknown cells in row-major order and returns the first local verdict.
///
/// For each candidate, the all-flagged rule is tried against every hint
/// neighbour before the all-missing rule.
pub fn single_point(board: &Board) -> Option<Deduction> {
    for cell in board.unresolved() {
        let hints: Vec<(Point, u8)> = board
            .neighbors(cell)
            .filter_map(|n| match board.state(n) {
                CellState::Revealed(hint) => Some((n, hint)),
                _ => None,
            })
            .collect();
        if hints.is_empty() {
            continue;
        }

        let tallies: Vec<_> = hints
            .iter()
            .map(|&(source, hint)| (source, hint as usize, board.tally(source)))
            .collect();

        if let Some(&(source, _, _)) = tallies
            .iter()
            .find(|(_, hint, tally)| tally.flagged == *hint)
        {
            return Some(Deduction {
                verdict: Verdict::Safe(cell),
                rule: Rule::AllFlagged,
                source,
            });
        }

        if let Some(&(source, _, _)) = tallies.iter().find(|(_, hint, tally)| {
            hint.checked_sub(tally.flagged) == Some(tally.unknown.len())
        }) {
            return Some(Deduction {
                verdict: Verdict::Hazard(cell),
                rule: Rule::AllMissing,
                source,
            });
        }
    }
    None
}
