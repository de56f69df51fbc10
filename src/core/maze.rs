use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MazeError {
    #[error("maze grid is empty")]
    Empty,
    #[error("maze row {row} has {len} cells, expected {expected}")]
    Ragged { row: usize, len: usize, expected: usize },
    #[error("maze must contain exactly one start, found {0}")]
    StartCount(usize),
    #[error("maze must contain exactly one exit, found {0}")]
    ExitCount(usize),
    #[error("unknown trap style {0}")]
    TrapStyle(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Orthogonal neighbours only; diagonals never count.
    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan(other) == 1
    }
}

/// Cosmetic trap variant; travels as `1`, `2` or `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TrapStyle {
    Spikes,
    Pit,
    Snare,
}

impl TrapStyle {
    pub const ALL: [TrapStyle; 3] = [TrapStyle::Spikes, TrapStyle::Pit, TrapStyle::Snare];
}

impl TryFrom<u8> for TrapStyle {
    type Error = MazeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(TrapStyle::Spikes),
            2 => Ok(TrapStyle::Pit),
            3 => Ok(TrapStyle::Snare),
            other => Err(MazeError::TrapStyle(other)),
        }
    }
}

impl From<TrapStyle> for u8 {
    fn from(style: TrapStyle) -> u8 {
        match style {
            TrapStyle::Spikes => 1,
            TrapStyle::Pit => 2,
            TrapStyle::Snare => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Cell {
    Path,
    Wall,
    Door,
    Start,
    Exit,
    FakeExit,
    CrystalBall,
    Map,
    KeyPowerup { reward: u8 },
    Trap { style: TrapStyle },
}

impl Cell {
    pub fn kind(self) -> CellKind {
        match self {
            Cell::Path => CellKind::Path,
            Cell::Wall => CellKind::Wall,
            Cell::Door => CellKind::Door,
            Cell::Start => CellKind::Start,
            Cell::Exit => CellKind::Exit,
            Cell::FakeExit => CellKind::FakeExit,
            Cell::CrystalBall => CellKind::CrystalBall,
            Cell::Map => CellKind::Map,
            Cell::KeyPowerup { .. } => CellKind::KeyPowerup,
            Cell::Trap { .. } => CellKind::Trap,
        }
    }
}

/// Payload-free cell tag, used where only the kind matters (traversal sets, counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Path,
    Wall,
    Door,
    Start,
    Exit,
    FakeExit,
    CrystalBall,
    Map,
    KeyPowerup,
    Trap,
}

impl CellKind {
    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KindSet(u16);

impl KindSet {
    pub const fn of(kinds: &[CellKind]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < kinds.len() {
            bits |= kinds[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub const fn with(self, kind: CellKind) -> Self {
        Self(self.0 | kind.bit())
    }

    pub const fn contains(self, kind: CellKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

/// Rectangular grid of cells. Row-major storage; `(0, 0)` is top-left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Maze {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    start: Position,
    exit: Position,
}

impl Maze {
    /// A grid of `fill` with placeholder endpoints; the generator places the
    /// real start and exit before handing the maze out.
    pub(crate) fn blank(width: u32, height: u32, fill: Cell) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; (width as usize) * (height as usize)],
            start: Position::new(0, 0),
            exit: Position::new(0, 0),
        }
    }

    pub(crate) fn set_endpoints(&mut self, start: Position, exit: Position) {
        self.start = start;
        self.exit = exit;
        self.set(start, Cell::Start);
        self.set(exit, Cell::Exit);
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, MazeError> {
        let expected = rows.first().map(Vec::len).unwrap_or(0);
        if expected == 0 {
            return Err(MazeError::Empty);
        }

        let mut cells = Vec::with_capacity(expected * rows.len());
        let mut starts = Vec::new();
        let mut exits = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(MazeError::Ragged {
                    row: y,
                    len: row.len(),
                    expected,
                });
            }
            for (x, cell) in row.iter().enumerate() {
                let pos = Position::new(x as u32, y as u32);
                match cell {
                    Cell::Start => starts.push(pos),
                    Cell::Exit => exits.push(pos),
                    _ => {}
                }
                cells.push(*cell);
            }
        }

        if starts.len() != 1 {
            return Err(MazeError::StartCount(starts.len()));
        }
        if exits.len() != 1 {
            return Err(MazeError::ExitCount(exits.len()));
        }

        Ok(Self {
            width: expected as u32,
            height: rows.len() as u32,
            cells,
            start: starts[0],
            exit: exits[0],
        })
    }

    pub fn rows(&self) -> Vec<Vec<Cell>> {
        self.cells
            .chunks(self.width as usize)
            .map(<[Cell]>::to_vec)
            .collect()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn exit(&self) -> Position {
        self.exit
    }

    /// The interior cell a player steps onto when leaving the start.
    pub fn start_entry(&self) -> Position {
        self.inward(self.start)
    }

    /// The interior cell a player steps from when reaching the exit.
    pub fn exit_entry(&self) -> Position {
        self.inward(self.exit)
    }

    fn inward(&self, pos: Position) -> Position {
        if pos.x == 0 && self.width > 1 {
            Position::new(1, pos.y)
        } else if pos.x + 1 == self.width && pos.x > 0 {
            Position::new(pos.x - 1, pos.y)
        } else if pos.y == 0 && self.height > 1 {
            Position::new(pos.x, 1)
        } else if pos.y + 1 == self.height && pos.y > 0 {
            Position::new(pos.x, pos.y - 1)
        } else {
            pos
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn is_border(&self, pos: Position) -> bool {
        pos.x == 0 || pos.y == 0 || pos.x + 1 == self.width || pos.y + 1 == self.height
    }

    fn idx(&self, pos: Position) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    pub fn get(&self, pos: Position) -> Option<Cell> {
        if !self.contains(pos) {
            return None;
        }
        Some(self.cells[self.idx(pos)])
    }

    pub fn kind_at(&self, pos: Position) -> Option<CellKind> {
        self.get(pos).map(Cell::kind)
    }

    /// Overwrites one cell. Out-of-bounds writes are ignored and reported as `false`.
    pub fn set(&mut self, pos: Position, cell: Cell) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let i = self.idx(pos);
        self.cells[i] = cell;
        true
    }

    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        const STEPS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
        STEPS
            .into_iter()
            .filter_map(move |(dx, dy)| pos.offset(dx, dy))
            .filter(move |&n| self.contains(n))
    }

    /// Row-major walk over every cell.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        let w = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &c)| (Position::new((i % w) as u32, (i / w) as u32), c))
    }

    pub fn positions_of(&self, kind: CellKind) -> impl Iterator<Item = Position> + '_ {
        self.iter()
            .filter(move |(_, c)| c.kind() == kind)
            .map(|(p, _)| p)
    }

    pub fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|c| c.kind() == kind).count()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Maze {
    type Error = MazeError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        Maze::from_rows(rows)
    }
}

impl From<Maze> for Vec<Vec<Cell>> {
    fn from(maze: Maze) -> Self {
        maze.rows()
    }
}
