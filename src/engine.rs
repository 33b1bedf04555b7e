use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::scoring::{PassTally, ScoringConfig};
use crate::tiles::{Tile, TileCatalog, UNKNOWN_SYMBOL};

/// Side length of the grid.
pub const SIZE: usize = 5;

/// Upper bound on clear/drop/fill passes in one [`Board::simulate`] call.
///
/// With `Refill::Random` a cascade is not guaranteed to stop on its own.
pub const MAX_CASCADE_PASSES: usize = 64;

type Cells = [[Option<Tile>; SIZE]; SIZE];

/// A grid coordinate. `x` is the column (0 = left), `y` the row (0 = top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub x: u8,
    pub y: u8,
}

impl Pos {
    #[inline]
    pub const fn new(x: u8, y: u8) -> Self { Self { x, y } }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{},{}", self.x + 1, self.y + 1) }
}

/// Exchange of two orthogonally adjacent cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Swap {
    pub a: Pos,
    pub b: Pos,
}

impl Swap {
    pub const fn new(a: Pos, b: Pos) -> Self { Self { a, b } }
}

impl fmt::Display for Swap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}<->{}", self.a, self.b) }
}

/// What empty cells become after a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Refill {
    /// Uniformly random catalog type (simulation and self-play).
    Random,
    /// [`Tile::Unknown`] (live play, where refills cannot be predicted).
    #[default]
    Unknown,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum BoardError {
    #[error("board must have {SIZE} rows, got {0}")]
    Rows(usize),
    #[error("row {row} has {len} cells, expected {SIZE}")]
    RowLength { row: usize, len: usize },
    #[error("unknown tile symbol '{symbol}' at {x},{y}")]
    UnknownSymbol { symbol: char, x: usize, y: usize },
}

/// The 5x5 grid plus the per-cell cleared mask.
///
/// Cells are stored column-major (`cells[x][y]`). The cleared mask is only
/// meaningful between [`Board::clear`] and the following [`Board::drop`].
/// Cloning copies the grid; the catalog is shared.
#[derive(Clone)]
pub struct Board {
    cells: Cells,
    cleared: [[bool; SIZE]; SIZE],
    catalog: Arc<TileCatalog>,
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool { self.cells == other.cells && self.cleared == other.cleared }
}

impl Board {
    fn with_cells(catalog: Arc<TileCatalog>, cells: Cells) -> Self {
        Self { cells, cleared: [[false; SIZE]; SIZE], catalog }
    }

    /// Build from row-major tiles (`rows[y][x]`).
    pub fn from_tiles(catalog: Arc<TileCatalog>, rows: Vec<Vec<Tile>>) -> Result<Self, BoardError> {
        if rows.len() != SIZE {
            return Err(BoardError::Rows(rows.len()));
        }
        let mut cells: Cells = [[None; SIZE]; SIZE];
        for (y, row) in rows.iter().enumerate() {
            if row.len() != SIZE {
                return Err(BoardError::RowLength { row: y, len: row.len() });
            }
            for (x, &tile) in row.iter().enumerate() {
                cells[x][y] = Some(tile);
            }
        }
        Ok(Self::with_cells(catalog, cells))
    }

    /// Parse five whitespace-separated rows of tile symbols, top row first.
    /// `?` marks an unknown cell; symbols are case-insensitive.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use ai_match3::engine::Board;
    /// use ai_match3::tiles::TileCatalog;
    /// let board = Board::parse(Arc::new(TileCatalog::gemology()), "
    ///     RGBYP
    ///     GBYPR
    ///     BYPRG
    ///     YPRGB
    ///     PRGB?
    /// ").unwrap();
    /// assert!(board.validate());
    /// ```
    pub fn parse(catalog: Arc<TileCatalog>, text: &str) -> Result<Self, BoardError> {
        let rows: Vec<&str> = text.split_whitespace().collect();
        if rows.len() != SIZE {
            return Err(BoardError::Rows(rows.len()));
        }
        let mut cells: Cells = [[None; SIZE]; SIZE];
        for (y, row) in rows.iter().enumerate() {
            let len = row.chars().count();
            if len != SIZE {
                return Err(BoardError::RowLength { row: y, len });
            }
            for (x, symbol) in row.chars().enumerate() {
                let tile = if symbol == UNKNOWN_SYMBOL {
                    Tile::Unknown
                } else {
                    catalog.by_symbol(symbol).map(Tile::Known).ok_or(BoardError::UnknownSymbol { symbol, x, y })?
                };
                cells[x][y] = Some(tile);
            }
        }
        Ok(Self::with_cells(catalog, cells))
    }

    /// Board of uniformly random tiles. It may contain matches; settle it
    /// with [`Board::simulate`] before searching.
    pub fn random<R: Rng + ?Sized>(catalog: Arc<TileCatalog>, rng: &mut R) -> Self {
        let mut cells: Cells = [[None; SIZE]; SIZE];
        for column in cells.iter_mut() {
            for cell in column.iter_mut() {
                *cell = Some(catalog.random_tile(rng));
            }
        }
        Self::with_cells(catalog, cells)
    }

    /// Board where every cell is [`Tile::Unknown`].
    pub fn unknown(catalog: Arc<TileCatalog>) -> Self { Self::with_cells(catalog, [[Some(Tile::Unknown); SIZE]; SIZE]) }

    #[inline]
    pub fn catalog(&self) -> &Arc<TileCatalog> { &self.catalog }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Tile> { self.cells[pos.x as usize][pos.y as usize] }

    #[inline]
    pub fn set(&mut self, pos: Pos, tile: Option<Tile>) { self.cells[pos.x as usize][pos.y as usize] = tile; }

    #[inline]
    pub fn is_cleared(&self, pos: Pos) -> bool { self.cleared[pos.x as usize][pos.y as usize] }

    pub fn count_empty(&self) -> usize { self.cells.iter().flatten().filter(|c| c.is_none()).count() }

    pub fn count_cleared(&self) -> usize { self.cleared.iter().flatten().filter(|&&c| c).count() }

    /// Exchange the two cells of `swap`.
    #[inline]
    pub fn swap(&mut self, swap: Swap) {
        let a = self.get(swap.a);
        let b = self.get(swap.b);
        self.set(swap.a, b);
        self.set(swap.b, a);
    }

    /// Mark every cell that is part of a horizontal or vertical run of three
    /// identical known tiles, returning the per-type tally.
    pub fn mark(&mut self) -> PassTally {
        for y in 0..SIZE {
            for x in 0..SIZE - 2 {
                if same_known(self.cells[x][y], self.cells[x + 1][y], self.cells[x + 2][y]) {
                    self.cleared[x][y] = true;
                    self.cleared[x + 1][y] = true;
                    self.cleared[x + 2][y] = true;
                }
            }
        }
        for x in 0..SIZE {
            for y in 0..SIZE - 2 {
                if same_known(self.cells[x][y], self.cells[x][y + 1], self.cells[x][y + 2]) {
                    self.cleared[x][y] = true;
                    self.cleared[x][y + 1] = true;
                    self.cleared[x][y + 2] = true;
                }
            }
        }
        let mut tally = PassTally::new(self.catalog.len());
        for x in 0..SIZE {
            for y in 0..SIZE {
                if self.cleared[x][y] {
                    if let Some(Tile::Known(id)) = self.cells[x][y] {
                        tally.add(id);
                    }
                }
            }
        }
        tally
    }

    /// Mark matches and score them.
    pub fn clear(&mut self, scoring: &ScoringConfig) -> f64 {
        let tally = self.mark();
        scoring.score_pass(&tally)
    }

    /// Compact every column downward over its cleared cells, leaving the
    /// vacated slots empty at the top. Resets the cleared mask and returns the
    /// number of empty cells on the board; zero means the board is settled.
    pub fn drop(&mut self) -> usize {
        for x in 0..SIZE {
            let mut column = [None; SIZE];
            let mut dest = SIZE;
            for y in (0..SIZE).rev() {
                if self.cleared[x][y] {
                    continue;
                }
                if let Some(tile) = self.cells[x][y] {
                    dest -= 1;
                    column[dest] = Some(tile);
                }
            }
            self.cells[x] = column;
            self.cleared[x] = [false; SIZE];
        }
        self.count_empty()
    }

    /// Replace every empty cell according to `refill`.
    pub fn fill<R: Rng + ?Sized>(&mut self, refill: Refill, rng: &mut R) {
        for x in 0..SIZE {
            for y in 0..SIZE {
                if self.cells[x][y].is_none() {
                    self.cells[x][y] = Some(match refill {
                        Refill::Random => self.catalog.random_tile(rng),
                        Refill::Unknown => Tile::Unknown,
                    });
                }
            }
        }
    }

    /// Run clear, drop and fill until nothing clears, returning the summed
    /// points of every pass.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use ai_match3::engine::{Board, Refill};
    /// use ai_match3::scoring::ScoringConfig;
    /// use ai_match3::tiles::TileCatalog;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(5);
    /// let mut board = Board::random(Arc::new(TileCatalog::gemology()), &mut rng);
    /// let scoring = ScoringConfig::gemology().actual();
    /// board.simulate(&scoring, Refill::Random, &mut rng);
    /// assert!(board.validate());
    /// ```
    pub fn simulate<R: Rng + ?Sized>(&mut self, scoring: &ScoringConfig, refill: Refill, rng: &mut R) -> f64 {
        let mut points = 0.0;
        for pass in 0..MAX_CASCADE_PASSES {
            let pass_points = self.clear(scoring);
            let emptied = self.drop();
            points += pass_points;
            if emptied == 0 {
                break;
            }
            trace!(pass, pass_points, emptied, "cascade pass");
            self.fill(refill, rng);
        }
        points
    }

    /// True when no cell is empty and nothing would clear. Does not modify
    /// `self`.
    pub fn validate(&self) -> bool {
        if self.count_empty() > 0 {
            return false;
        }
        let mut probe = self.clone();
        probe.cleared = [[false; SIZE]; SIZE];
        probe.mark();
        probe.drop() == 0
    }

    /// Rows of symbols separated by newlines, parseable by [`Board::parse`].
    /// Empty cells render as `.`.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(SIZE * (SIZE + 1));
        for y in 0..SIZE {
            for x in 0..SIZE {
                out.push(match self.cells[x][y] {
                    Some(tile) => self.catalog.symbol_of(tile),
                    None => '.',
                });
            }
            if y + 1 < SIZE {
                out.push('\n');
            }
        }
        out
    }

    /// Grid with full tile names, `(c)` for cleared cells and `Empty` for
    /// empty ones.
    pub fn describe_large(&self) -> String {
        let mut desc = String::from(" ");
        for x in 0..SIZE {
            desc.push_str(&format!(" {:>10}", x + 1));
        }
        desc.push('\n');
        for y in 0..SIZE {
            desc.push_str(&(y + 1).to_string());
            for x in 0..SIZE {
                match self.cells[x][y] {
                    None => desc.push_str(&format!(" {:>10}", "Empty")),
                    Some(tile) if self.cleared[x][y] => {
                        desc.push_str(&format!(" {:>7}(c)", self.catalog.name_of(tile)))
                    }
                    Some(tile) => desc.push_str(&format!(" {:>10}", self.catalog.name_of(tile))),
                }
            }
            desc.push('\n');
        }
        desc
    }
}

#[inline]
fn same_known(a: Option<Tile>, b: Option<Tile>, c: Option<Tile>) -> bool {
    match (a, b, c) {
        (Some(Tile::Known(a)), Some(Tile::Known(b)), Some(Tile::Known(c))) => a == b && b == c,
        _ => false,
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Board({:?})", self.to_text().replace('\n', "/")) }
}

/// Compact grid: a header of column numbers, then each row prefixed with its
/// number. Cleared cells are lowercase, empty cells blank.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " ")?;
        for x in 0..SIZE {
            write!(f, "{}", x + 1)?;
        }
        writeln!(f)?;
        for y in 0..SIZE {
            write!(f, "{}", y + 1)?;
            for x in 0..SIZE {
                let c = match self.cells[x][y] {
                    None => ' ',
                    Some(tile) if self.cleared[x][y] => self.catalog.symbol_of(tile).to_ascii_lowercase(),
                    Some(tile) => self.catalog.symbol_of(tile),
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const SETTLED: &str = "RGBYP GBYPR BYPRG YPRGB PRGBY";

    fn gems() -> Arc<TileCatalog> { Arc::new(TileCatalog::gemology()) }

    fn board(text: &str) -> Board { Board::parse(gems(), text).unwrap() }

    fn no_probability() -> ScoringConfig { ScoringConfig::gemology().with_probability_points(false) }

    #[test]
    fn it_parses_and_renders() {
        let b = board(SETTLED);
        assert_eq!(b.to_text(), "RGBYP\nGBYPR\nBYPRG\nYPRGB\nPRGBY");
        assert_eq!(b.to_string(), " 12345\n1RGBYP\n2GBYPR\n3BYPRG\n4YPRGB\n5PRGBY\n");
        let red = b.catalog().tile("Red");
        assert_eq!(b.get(Pos::new(0, 0)), red);
        assert_eq!(b.get(Pos::new(4, 1)), red);
    }

    #[test]
    fn it_rejects_malformed_snapshots() {
        assert_eq!(Board::parse(gems(), "RGBYP GBYPR").unwrap_err(), BoardError::Rows(2));
        assert_eq!(
            Board::parse(gems(), "RGBYP GBYP BYPRG YPRGB PRGBY").unwrap_err(),
            BoardError::RowLength { row: 1, len: 4 }
        );
        assert_eq!(
            Board::parse(gems(), "RGBYP GBYPR BYZRG YPRGB PRGBY").unwrap_err(),
            BoardError::UnknownSymbol { symbol: 'Z', x: 2, y: 2 }
        );
        let rows = vec![vec![Tile::Unknown; SIZE]; SIZE - 1];
        assert_eq!(Board::from_tiles(gems(), rows).unwrap_err(), BoardError::Rows(4));
    }

    #[test]
    fn it_clears_nothing_without_runs() {
        let mut b = board(SETTLED);
        assert_eq!(b.clear(&ScoringConfig::gemology()), 0.0);
        assert_eq!(b.count_cleared(), 0);
        assert_eq!(b.drop(), 0);
    }

    #[test]
    fn it_marks_horizontal_and_vertical_runs() {
        // Row 3 holds RRR; column 5 holds PPP in rows 1..3.
        let mut b = board("RGBYP GBYPP RRRGP YPBGB PRGBY");
        let tally = b.mark();
        assert_eq!(b.count_cleared(), 6);
        let red = b.catalog().by_name("Red").unwrap();
        let purple = b.catalog().by_name("Purple").unwrap();
        assert_eq!(tally.count(red), 3);
        assert_eq!(tally.count(purple), 3);
        assert!(b.is_cleared(Pos::new(4, 0)));
        assert!(!b.is_cleared(Pos::new(3, 2)));
    }

    #[test]
    fn it_ignores_unknown_runs() {
        let mut b = board("???YP GBYPR BYPRG YPRGB PRGBY");
        assert_eq!(b.clear(&no_probability()), 0.0);
        let mut b = board("RR?YP GBYPR BYPRG YPRGB PRGBY");
        assert_eq!(b.clear(&no_probability()), 0.0);
    }

    #[test]
    fn it_drops_preserving_order() {
        // Column 1 top to bottom: R G B Y P. Clear G and Y.
        let mut b = board(SETTLED);
        b.cleared[0][1] = true;
        b.cleared[0][3] = true;
        assert_eq!(b.drop(), 2);
        assert_eq!(b.get(Pos::new(0, 0)), None);
        assert_eq!(b.get(Pos::new(0, 1)), None);
        let cat = b.catalog().clone();
        assert_eq!(b.get(Pos::new(0, 2)), cat.tile("Red"));
        assert_eq!(b.get(Pos::new(0, 3)), cat.tile("Blue"));
        assert_eq!(b.get(Pos::new(0, 4)), cat.tile("Purple"));
        assert_eq!(b.count_cleared(), 0);
        // Other columns untouched.
        assert_eq!(b.get(Pos::new(1, 0)), cat.tile("Green"));
    }

    #[test]
    fn it_fills_with_unknown_or_random() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut b = board(SETTLED);
        b.cleared[2][4] = true;
        b.cleared[3][4] = true;
        b.drop();
        let mut unknown = b.clone();
        unknown.fill(Refill::Unknown, &mut rng);
        assert_eq!(unknown.get(Pos::new(2, 0)), Some(Tile::Unknown));
        assert_eq!(unknown.count_empty(), 0);
        b.fill(Refill::Random, &mut rng);
        assert!(b.get(Pos::new(3, 0)).is_some_and(|t| t.is_known()));
    }

    #[test]
    fn it_simulates_single_pass_with_unknown_refill() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut b = board("RGBYP GBYPR RRRGB YPBGY PRGBY");
        let points = b.simulate(&no_probability(), Refill::Unknown, &mut rng);
        assert_eq!(points, 10.0);
        assert!(b.validate());
        assert_eq!(b.to_text().lines().next(), Some("???YP"));
    }

    #[test]
    fn simulate_settles_random_boards() {
        let mut rng = StdRng::seed_from_u64(42);
        let scoring = ScoringConfig::gemology();
        for _ in 0..50 {
            let mut b = Board::random(gems(), &mut rng);
            b.simulate(&scoring, Refill::Random, &mut rng);
            assert_eq!(b.count_empty(), 0);
            assert_eq!(b.clone().clear(&scoring), 0.0);
            assert!(b.validate());
        }
    }

    #[test]
    fn it_validates_snapshots() {
        assert!(Board::unknown(gems()).validate());
        assert!(board(SETTLED).validate());
        assert!(!board("RGBYP GBYPR RRRGB YPBGY PRGBY").validate());
        let mut b = board(SETTLED);
        b.set(Pos::new(1, 1), None);
        assert!(!b.validate());
    }

    #[test]
    fn it_swaps_cells() {
        let mut b = board(SETTLED);
        let swap = Swap::new(Pos::new(0, 0), Pos::new(1, 0));
        b.swap(swap);
        assert_eq!(b.to_text().lines().next(), Some("GRBYP"));
        assert_eq!(swap.to_string(), "1,1<->2,1");
    }

    #[test]
    fn it_describes_large() {
        let mut b = board("RGBYP GBYPR RRRGB YPBGY PRGBY");
        b.mark();
        let large = b.describe_large();
        let lines: Vec<&str> = large.lines().collect();
        assert_eq!(lines[0], format!(" {:>11}{:>11}{:>11}{:>11}{:>11}", 1, 2, 3, 4, 5));
        assert!(lines[3].starts_with(&format!("3 {:>7}(c)", "Red")));
        b.drop();
        assert!(b.describe_large().lines().nth(1).is_some_and(|l| l.contains("Empty")));
    }
}
