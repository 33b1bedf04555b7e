use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::{Board, Pos, Swap, SIZE};
use crate::tiles::{Tile, TileCatalog};

use super::Move;

/// A swap under consideration, with the tiles observed before swapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub swap: Swap,
    pub tiles: [Tile; 2],
}

impl Candidate {
    pub fn into_move(self, points: f64, submove: Option<Box<Move>>) -> Move {
        Move { swap: self.swap, tiles: self.tiles, points, submove }
    }

    /// `x,y(S)<->x,y(S)` with 1-based coordinates.
    pub fn describe(&self, catalog: &TileCatalog) -> String {
        format!(
            "{}({})<->{}({})",
            self.swap.a,
            catalog.symbol_of(self.tiles[0]),
            self.swap.b,
            catalog.symbol_of(self.tiles[1])
        )
    }
}

/// Every right and down neighbour pair whose two cells differ.
///
/// Pairs holding identical tiles (two `Unknown`s included) are skipped since
/// swapping them cannot change the board. Empty cells never appear on a
/// settled board and are skipped as well.
pub fn enumerate(board: &Board) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(2 * SIZE * (SIZE - 1));
    let mut push = |a: Pos, b: Pos| {
        if let (Some(ta), Some(tb)) = (board.get(a), board.get(b)) {
            if ta != tb {
                out.push(Candidate { swap: Swap::new(a, b), tiles: [ta, tb] });
            }
        }
    };
    let last = (SIZE - 1) as u8;
    for x in 0..last {
        for y in 0..last {
            push(Pos::new(x, y), Pos::new(x + 1, y));
            push(Pos::new(x, y), Pos::new(x, y + 1));
        }
    }
    for x in 0..last {
        push(Pos::new(x, last), Pos::new(x + 1, last));
    }
    for y in 0..last {
        push(Pos::new(last, y), Pos::new(last, y + 1));
    }
    out
}

/// [`enumerate`], shuffled with `rng`.
pub fn shuffled<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Vec<Candidate> {
    let mut out = enumerate(board);
    out.shuffle(rng);
    out
}
