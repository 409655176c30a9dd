use crate::board::Point;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout is empty")]
    Empty,
    #[error("expected {expected} cells for a {size}x{size} layout, found {found}")]
    WrongLength {
        size: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row} has {found} cells, expected {expected}")]
    NotSquare {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown symbol {symbol:?} at {point}")]
    UnknownSymbol { symbol: char, point: Point },
    #[error("layout needs at least one safe cell")]
    NoSafeCell,
    #[error("cannot place {hazards} hazards on {available} free cells")]
    TooManyHazards { hazards: usize, available: usize },
}

/// Ground-truth hazard placement for an N×N grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    size: usize,
    /// `true` marks a hazard. Indexed by `y * size + x`.
    hazards: Vec<bool>,
}

impl Layout {
    pub fn new(size: usize, hazards: Vec<bool>) -> Result<Self, LayoutError> {
        if size == 0 {
            return Err(LayoutError::Empty);
        }
        if hazards.len() != size * size {
            return Err(LayoutError::WrongLength {
                size,
                expected: size * size,
                found: hazards.len(),
            });
        }
        if hazards.iter().all(|&h| h) {
            return Err(LayoutError::NoSafeCell);
        }
        Ok(Layout { size, hazards })
    }

    /// Places `hazards` hazards uniformly at random, never on a `keep_clear` point.
    pub fn random<R: Rng + ?Sized>(
        size: usize,
        hazards: usize,
        keep_clear: &[Point],
        rng: &mut R,
    ) -> Result<Self, LayoutError> {
        let candidates: Vec<usize> = (0..size * size)
            .filter(|&i| {
                !keep_clear
                    .iter()
                    .any(|p| p.y * size + p.x == i && p.x < size && p.y < size)
            })
            .collect();
        // At least one cell must stay safe.
        let available = candidates.len().min((size * size).saturating_sub(1));
        if hazards > available {
            return Err(LayoutError::TooManyHazards { hazards, available });
        }

        let mut cells = vec![false; size * size];
        for &index in candidates.choose_multiple(rng, hazards) {
            cells[index] = true;
        }
        Layout::new(size, cells)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_hazard(&self, point: Point) -> bool {
        self.hazards[point.y * self.size + point.x]
    }

    pub fn hazard_count(&self) -> usize {
        self.hazards.iter().filter(|&&h| h).count()
    }

    /// Number of hazards among the 8-connected neighbours of `point`.
    pub fn hint_at(&self, point: Point) -> u8 {
        let size = self.size as isize;
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = point.x as isize + dx;
                let ny = point.y as isize + dy;
                if nx >= 0 && nx < size && ny >= 0 && ny < size {
                    if self.hazards[(ny * size + nx) as usize] {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

impl FromStr for Layout {
    type Err = LayoutError;

    /// One line per row. `t`, `*` or `x` is a hazard; `.`, `?` or a digit is safe.
    /// Blank lines and whitespace inside a row are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<Vec<char>> = s
            .lines()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|row| !row.is_empty())
            .collect();

        let size = rows.len();
        if size == 0 {
            return Err(LayoutError::Empty);
        }

        let mut hazards = Vec::with_capacity(size * size);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(LayoutError::NotSquare {
                    row: y,
                    expected: size,
                    found: row.len(),
                });
            }
            for (x, &symbol) in row.iter().enumerate() {
                let hazard = match symbol {
                    't' | 'T' | '*' | 'x' | 'X' => true,
                    '.' | '?' | '0'..='8' => false,
                    _ => {
                        return Err(LayoutError::UnknownSymbol {
                            symbol,
                            point: Point { x, y },
                        });
                    }
                };
                hazards.push(hazard);
            }
        }

        Layout::new(size, hazards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_parse_layout() {
        let layout: Layout = "
            . . 1
            . 2 t
            1 t 2
        "
        .parse()
        .unwrap();

        assert_eq!(layout.size(), 3);
        assert_eq!(layout.hazard_count(), 2);
        assert!(layout.is_hazard(Point::new(2, 1)));
        assert!(layout.is_hazard(Point::new(1, 2)));
        assert!(!layout.is_hazard(Point::new(0, 0)));
        assert_eq!(layout.hint_at(Point::new(2, 2)), 2);
        assert_eq!(layout.hint_at(Point::new(0, 0)), 0);
        assert_eq!(layout.hint_at(Point::new(1, 1)), 2);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Layout>(), Err(LayoutError::Empty));
        assert_eq!(
            "..\n...".parse::<Layout>(),
            Err(LayoutError::NotSquare {
                row: 1,
                expected: 2,
                found: 3,
            })
        );
        assert!(matches!(
            "...\n...".parse::<Layout>(),
            Err(LayoutError::NotSquare { row: 0, .. })
        ));
        assert_eq!(
            ".a\n..".parse::<Layout>(),
            Err(LayoutError::UnknownSymbol {
                symbol: 'a',
                point: Point::new(1, 0),
            })
        );
        assert_eq!("tt\ntt".parse::<Layout>(), Err(LayoutError::NoSafeCell));
    }

    #[test]
    fn test_new_checks_length() {
        assert!(matches!(
            Layout::new(2, vec![false; 3]),
            Err(LayoutError::WrongLength { expected: 4, .. })
        ));
    }

    #[test]
    fn test_random_keeps_openings_clear() {
        let mut rng = StdRng::seed_from_u64(7);
        let clear = [Point::new(0, 0), Point::new(2, 2)];
        for _ in 0..20 {
            let layout = Layout::random(5, 10, &clear, &mut rng).unwrap();
            assert_eq!(layout.hazard_count(), 10);
            assert!(clear.iter().all(|&p| !layout.is_hazard(p)));
        }
    }

    #[test]
    fn test_random_rejects_overfull_board() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            Layout::random(2, 4, &[], &mut rng),
            Err(LayoutError::TooManyHazards {
                hazards: 4,
                available: 3,
            })
        );
    }
}
