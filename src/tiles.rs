//! Tile types and the immutable catalog every board is built against.
//!
//! A [`TileCatalog`] is constructed once (from a preset or from config) and
//! then shared read-only behind an `Arc` by boards, scoring and the search.
//! Tile identity is the catalog index ([`TileId`]); names and symbols are only
//! used for parsing and display.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Symbol reserved for cells whose contents are not known.
pub const UNKNOWN_SYMBOL: char = '?';

/// Stable identity of a tile type inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(u8);

impl TileId {
    #[inline]
    pub fn index(self) -> usize { self.0 as usize }
}

/// Contents of an occupied cell.
///
/// `Unknown` stands for a tile the acquisition layer (or a refill during live
/// search) could not identify. It never matches anything, not even another
/// `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    Known(TileId),
    Unknown,
}

impl Tile {
    #[inline]
    pub fn is_known(self) -> bool { matches!(self, Tile::Known(_)) }

    #[inline]
    pub fn id(self) -> Option<TileId> {
        match self {
            Tile::Known(id) => Some(id),
            Tile::Unknown => None,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TileType {
    id: TileId,
    name: String,
    symbol: char,
    factor: f64,
}

impl TileType {
    pub fn id(&self) -> TileId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn symbol(&self) -> char { self.symbol }
    /// Default multiplier applied to points earned when this type clears.
    pub fn factor(&self) -> f64 { self.factor }
}

/// Declarative description of a tile type, as found in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSpec {
    pub name: String,
    /// Defaults to the upper-cased first letter of `name`.
    #[serde(default)]
    pub symbol: Option<char>,
    #[serde(default = "default_factor")]
    pub factor: f64,
}

fn default_factor() -> f64 { 1.0 }

impl TileSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), symbol: None, factor: 1.0 }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = Some(symbol);
        self
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("tile catalog must contain at least one type")]
    Empty,
    #[error("tile catalog supports at most {max} types, got {got}")]
    TooMany { max: usize, got: usize },
    #[error("duplicate tile name: {0}")]
    DuplicateName(String),
    #[error("duplicate tile symbol '{symbol}' on {name}")]
    DuplicateSymbol { name: String, symbol: char },
    #[error("tile {name} has invalid symbol '{symbol}' (ASCII letters only)")]
    InvalidSymbol { name: String, symbol: char },
}

/// Read-only registry of the tile types in play.
#[derive(Debug, Clone, PartialEq)]
pub struct TileCatalog {
    types: Vec<TileType>,
}

impl TileCatalog {
    pub const MAX_TYPES: usize = 26;

    /// Build a catalog, assigning ids in declaration order.
    ///
    /// ```
    /// use ai_match3::tiles::{TileCatalog, TileSpec};
    /// let catalog = TileCatalog::new(vec![TileSpec::new("Red"), TileSpec::new("Blue")]).unwrap();
    /// assert_eq!(catalog.len(), 2);
    /// assert_eq!(catalog.by_symbol('B').map(|id| id.index()), Some(1));
    /// ```
    pub fn new(specs: Vec<TileSpec>) -> Result<Self, CatalogError> {
        if specs.is_empty() {
            return Err(CatalogError::Empty);
        }
        if specs.len() > Self::MAX_TYPES {
            return Err(CatalogError::TooMany { max: Self::MAX_TYPES, got: specs.len() });
        }
        let mut types: Vec<TileType> = Vec::with_capacity(specs.len());
        for (idx, spec) in specs.into_iter().enumerate() {
            let symbol = spec
                .symbol
                .or_else(|| spec.name.chars().next())
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or(UNKNOWN_SYMBOL);
            if !symbol.is_ascii_alphabetic() {
                return Err(CatalogError::InvalidSymbol { name: spec.name, symbol });
            }
            if types.iter().any(|t| t.name == spec.name) {
                return Err(CatalogError::DuplicateName(spec.name));
            }
            if types.iter().any(|t| t.symbol == symbol) {
                return Err(CatalogError::DuplicateSymbol { name: spec.name, symbol });
            }
            types.push(TileType { id: TileId(idx as u8), name: spec.name, symbol, factor: spec.factor });
        }
        Ok(Self { types })
    }

    /// The five gems of the Gemology mini-game.
    pub fn gemology() -> Self {
        Self::from_names(&["Red", "Green", "Blue", "Yellow", "Purple"])
    }

    /// The five elements of the Dragon Souls mini-game.
    pub fn dragon_souls() -> Self {
        Self::from_names(&["Wind", "Electro", "Ice", "Fire", "Random"])
    }

    // Presets have distinct alphabetic initials, so construction cannot fail.
    fn from_names(names: &[&str]) -> Self {
        let types = names
            .iter()
            .enumerate()
            .map(|(idx, name)| TileType {
                id: TileId(idx as u8),
                name: (*name).to_string(),
                symbol: name.chars().next().unwrap_or(UNKNOWN_SYMBOL),
                factor: 1.0,
            })
            .collect();
        Self { types }
    }

    #[inline]
    pub fn len(&self) -> usize { self.types.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &TileType> { self.types.iter() }

    /// Specs that rebuild this catalog with [`TileCatalog::new`].
    pub fn specs(&self) -> Vec<TileSpec> {
        self.types.iter().map(|t| TileSpec::new(t.name.clone()).with_symbol(t.symbol).with_factor(t.factor)).collect()
    }

    /// Entry for `id`. Ids only come from this catalog, so the index is in range.
    #[inline]
    pub fn get(&self, id: TileId) -> &TileType { &self.types[id.index()] }

    pub fn by_name(&self, name: &str) -> Option<TileId> {
        self.types.iter().find(|t| t.name.eq_ignore_ascii_case(name)).map(|t| t.id)
    }

    pub fn by_symbol(&self, symbol: char) -> Option<TileId> {
        let symbol = symbol.to_ascii_uppercase();
        self.types.iter().find(|t| t.symbol == symbol).map(|t| t.id)
    }

    /// Shorthand for `Tile::Known(by_name(name))`.
    pub fn tile(&self, name: &str) -> Option<Tile> { self.by_name(name).map(Tile::Known) }

    pub fn symbol_of(&self, tile: Tile) -> char {
        match tile {
            Tile::Known(id) => self.get(id).symbol,
            Tile::Unknown => UNKNOWN_SYMBOL,
        }
    }

    pub fn name_of(&self, tile: Tile) -> &str {
        match tile {
            Tile::Known(id) => &self.get(id).name,
            Tile::Unknown => "Unknown",
        }
    }

    /// Uniformly random known tile.
    #[inline]
    pub fn random_tile<R: Rng + ?Sized>(&self, rng: &mut R) -> Tile {
        Tile::Known(TileId(rng.gen_range(0..self.types.len()) as u8))
    }
}

impl fmt::Display for TileCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> =
            self.types.iter().map(|t| format!("{}({}) x{:.2}", t.name, t.symbol, t.factor)).collect();
        write!(f, "{}", parts.join(", "))
    }
}
