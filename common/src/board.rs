use std::fmt;

/// Represents a 2D coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What the agent knows about a single cell.
/// A cell leaves `Unknown` exactly once and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CellState {
    Unknown,
    Revealed(u8), // The u8 is the number of adjacent hazards.
    FlaggedHazard,
}

impl CellState {
    pub fn is_unknown(self) -> bool {
        matches!(self, CellState::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("cell {point} is already resolved as {state:?}")]
    AlreadyResolved { point: Point, state: CellState },
    #[error("cell {point} lies outside the {size}x{size} board")]
    OutOfBounds { point: Point, size: usize },
}

/// Unknown and flagged neighbours of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tally {
    /// Unknown neighbours, in row-major order.
    pub unknown: Vec<Point>,
    pub flagged: usize,
}

/// The agent's partial view of an N×N grid.
///
/// Cells are stored in a flat arena indexed by `y * size + x`. Every derived
/// view (unresolved, resolved, hint cells) is computed from that arena, so the
/// views can never drift apart from the base mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<CellState>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![CellState::Unknown; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x < self.size && point.y < self.size
    }

    pub fn index(&self, point: Point) -> usize {
        point.y * self.size + point.x
    }

    pub fn point(&self, index: usize) -> Point {
        Point {
            x: index % self.size,
            y: index / self.size,
        }
    }

    pub fn state(&self, point: Point) -> CellState {
        self.cells[self.index(point)]
    }

    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Records a hint disclosed by the environment.
    pub fn reveal(&mut self, point: Point, hint: u8) -> Result<(), BoardError> {
        self.resolve(point, CellState::Revealed(hint))
    }

    /// Marks a cell as a known hazard.
    pub fn flag_hazard(&mut self, point: Point) -> Result<(), BoardError> {
        self.resolve(point, CellState::FlaggedHazard)
    }

    fn resolve(&mut self, point: Point, next: CellState) -> Result<(), BoardError> {
        if !self.contains(point) {
            return Err(BoardError::OutOfBounds {
                point,
                size: self.size,
            });
        }
        let index = self.index(point);
        match self.cells[index] {
            CellState::Unknown => {
                self.cells[index] = next;
                Ok(())
            }
            state => Err(BoardError::AlreadyResolved { point, state }),
        }
    }

    /// Every coordinate, in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + use<> {
        let size = self.size;
        (0..size * size).map(move |index| Point {
            x: index % size,
            y: index / size,
        })
    }

    /// Cells still `Unknown`, in row-major order.
    pub fn unresolved(&self) -> impl Iterator<Item = Point> + '_ {
        self.points().filter(|&p| self.state(p).is_unknown())
    }

    /// Cells that are revealed or flagged.
    pub fn resolved(&self) -> impl Iterator<Item = Point> + '_ {
        self.points().filter(|&p| !self.state(p).is_unknown())
    }

    /// Revealed cells together with their hint.
    pub fn hint_cells(&self) -> impl Iterator<Item = (Point, u8)> + '_ {
        self.points().filter_map(|p| match self.state(p) {
            CellState::Revealed(hint) => Some((p, hint)),
            _ => None,
        })
    }

    pub fn unknown_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_unknown()).count()
    }

    pub fn flagged_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, CellState::FlaggedHazard))
            .count()
    }

    /// All valid neighbour coordinates of `point`, clipped at the edges and corners.
    pub fn neighbors(&self, point: Point) -> impl Iterator<Item = Point> + use<> {
        let size = self.size as isize;

        // Offsets from -1 to 1 in both axes, in row-major order.
        (-1..=1).flat_map(move |dy| {
            (-1..=1).filter_map(move |dx| {
                if dx == 0 && dy == 0 {
                    return None;
                }

                let nx = point.x as isize + dx;
                let ny = point.y as isize + dy;

                if nx >= 0 && nx < size && ny >= 0 && ny < size {
                    Some(Point {
                        x: nx as usize,
                        y: ny as usize,
                    })
                } else {
                    None
                }
            })
        })
    }

    pub fn tally(&self, point: Point) -> Tally {
        let mut tally = Tally::default();
        for neighbor in self.neighbors(point) {
            match self.state(neighbor) {
                CellState::Unknown => tally.unknown.push(neighbor),
                CellState::FlaggedHazard => tally.flagged += 1,
                CellState::Revealed(_) => {}
            }
        }
        tally
    }

    /// The symbol a renderer shows for a cell.
    pub fn symbol(&self, point: Point) -> char {
        match self.state(point) {
            CellState::Unknown => '?',
            CellState::Revealed(hint) => char::from(b'0' + hint),
            CellState::FlaggedHazard => '*',
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for x in 0..self.size {
            write!(f, "{:^3}", x)?;
        }
        writeln!(f, "\n  +{}", "---".repeat(self.size))?;

        for y in 0..self.size {
            write!(f, "{:^2}|", y)?;
            for x in 0..self.size {
                write!(f, " {} ", self.symbol(Point { x, y }))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
