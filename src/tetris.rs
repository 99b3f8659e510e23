//! Tetris engine: playfield, tetromino bitmaps, collision, rotation, line clear, levels.

use log::{debug, info};
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;

/// Playfield width in cells.
pub const WIDTH: usize = 10;
/// Playfield height in cells.
pub const HEIGHT: usize = 20;

/// Lines needed to advance one level.
const LINES_PER_LEVEL: u32 = 10;

/// Points per clear of 1, 2, 3 and 4+ lines, before the level multiplier.
const LINE_POINTS: [u32; 4] = [100, 300, 500, 800];

/// Colour tag of a landed block; one per tetromino.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tint {
    Cyan,
    Yellow,
    Purple,
    Orange,
    Blue,
    Green,
    Red,
}

impl Tint {
    pub const ALL: [Self; 7] = [
        Self::Cyan,
        Self::Yellow,
        Self::Purple,
        Self::Orange,
        Self::Blue,
        Self::Green,
        Self::Red,
    ];

    /// Position in `ALL`, used to index colour tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Tetromino kinds, in spawn-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tetromino {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

impl Tetromino {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::L, Self::J, Self::S, Self::Z];

    /// Spawn orientation bitmap.
    pub fn shape(self) -> Shape {
        match self {
            Self::I => Shape::from_rows(&[&[1, 1, 1, 1]]),
            Self::O => Shape::from_rows(&[&[1, 1], &[1, 1]]),
            Self::T => Shape::from_rows(&[&[1, 1, 1], &[0, 1, 0]]),
            Self::L => Shape::from_rows(&[&[1, 1, 1], &[1, 0, 0]]),
            Self::J => Shape::from_rows(&[&[1, 1, 1], &[0, 0, 1]]),
            Self::S => Shape::from_rows(&[&[0, 1, 1], &[1, 1, 0]]),
            Self::Z => Shape::from_rows(&[&[1, 1, 0], &[0, 1, 1]]),
        }
    }

    pub fn tint(self) -> Tint {
        Tint::ALL[self as usize]
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Up to 4x4 occupancy bitmap. Bit `x` of `rows[y]` is the cell at column x, row y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    rows: [u8; 4],
    width: u8,
    height: u8,
}

impl Shape {
    /// Build from rows of 0/1; every row has the same length.
    fn from_rows(rows: &[&[u8]]) -> Self {
        let mut bits = [0u8; 4];
        for (y, row) in rows.iter().enumerate() {
            for (x, &cell) in row.iter().enumerate() {
                if cell != 0 {
                    bits[y] |= 1 << x;
                }
            }
        }
        Self {
            rows: bits,
            width: rows.first().map_or(0, |r| r.len()) as u8,
            height: rows.len() as u8,
        }
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn height(&self) -> usize {
        self.height as usize
    }

    #[inline]
    pub fn occupied(&self, x: usize, y: usize) -> bool {
        x < self.width() && y < self.height() && (self.rows[y] >> x) & 1 == 1
    }

    /// Occupied cells as (x, y) relative to the bounding box.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height()).flat_map(move |y| {
            (0..self.width()).filter_map(move |x| self.occupied(x, y).then_some((x, y)))
        })
    }

    /// Clockwise quarter turn: reverse the rows, then transpose.
    pub fn rotated_cw(&self) -> Self {
        let (w, h) = (self.width(), self.height());
        let mut rows = [0u8; 4];
        for (ny, row) in rows.iter_mut().enumerate().take(w) {
            for nx in 0..h {
                if self.occupied(ny, h - 1 - nx) {
                    *row |= 1 << nx;
                }
            }
        }
        Self {
            rows,
            width: self.height,
            height: self.width,
        }
    }
}

/// The falling piece: shape and tint plus the board position of its bounding
/// box's top-left corner. Moves and rotations produce new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub kind: Tetromino,
    pub shape: Shape,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    /// Centered on the top row.
    pub fn spawn(kind: Tetromino) -> Self {
        let shape = kind.shape();
        Self {
            kind,
            shape,
            x: (WIDTH / 2) as i32 - (shape.width() / 2) as i32,
            y: 0,
        }
    }

    pub fn tint(&self) -> Tint {
        self.kind.tint()
    }

    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn rotated(&self) -> Self {
        Self {
            shape: self.shape.rotated_cw(),
            ..*self
        }
    }

    /// Board coordinates (x, y) of every occupied cell; may lie off the board.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .cells()
            .map(move |(dx, dy)| (self.x + dx as i32, self.y + dy as i32))
    }
}

/// Single cell: empty or a landed block of some tint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Block(Tint),
}

impl Cell {
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

pub type Row = [Cell; WIDTH];

/// Playfield: y=0 is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playfield {
    rows: VecDeque<Row>,
}

impl Default for Playfield {
    fn default() -> Self {
        Self::new()
    }
}

impl Playfield {
    pub fn new() -> Self {
        Self {
            rows: (0..HEIGHT).map(|_| [Cell::Empty; WIDTH]).collect(),
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// True if the piece overlaps a wall, the floor, or a landed block.
    /// Cells above the top row only need to respect the side walls.
    pub fn collides(&self, piece: &Piece) -> bool {
        piece.cells().any(|(x, y)| {
            if x < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
                return true;
            }
            y >= 0 && !matches!(self.get(x as usize, y as usize), Some(Cell::Empty))
        })
    }

    /// Write the piece's tint into the cells it covers; off-board cells are dropped.
    pub fn merge(&mut self, piece: &Piece) {
        let tint = piece.tint();
        for (x, y) in piece.cells() {
            if x >= 0 && y >= 0 {
                self.set(x as usize, y as usize, Cell::Block(tint));
            }
        }
    }

    /// Remove every full row and push an empty row on top for each. Returns the count.
    pub fn clear_full_rows(&mut self) -> u32 {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().any(|c| c.is_empty()));
        let cleared = before - self.rows.len();
        for _ in 0..cleared {
            self.rows.push_front([Cell::Empty; WIDTH]);
        }
        cleared as u32
    }
}

/// Points for clearing `lines` rows at once at `level`.
pub fn line_clear_points(lines: u32, level: u32) -> u32 {
    match lines {
        0 => 0,
        n => LINE_POINTS[(n as usize - 1).min(LINE_POINTS.len() - 1)] * level,
    }
}

/// Score, level, line count and game-over flag of one Tetris session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    pub game_over: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            score: 0,
            level: 1,
            lines_cleared: 0,
            game_over: false,
        }
    }
}

impl Session {
    /// Book a clear of `lines` rows: score at the current level, then re-level.
    pub fn record_clear(&mut self, lines: u32) {
        if lines == 0 {
            return;
        }
        self.lines_cleared += lines;
        self.score += line_clear_points(lines, self.level);
        self.level = self.lines_cleared / LINES_PER_LEVEL + 1;
    }

    /// Auto-fall period at the current level: `base / level`, no lower bound.
    pub fn drop_interval(&self, base: Duration) -> Duration {
        base / self.level.max(1)
    }
}

/// Player/timer actions the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Left,
    Right,
    Down,
    Rotate,
    Drop,
}

/// A running Tetris game.
#[derive(Debug)]
pub struct Game<R> {
    playfield: Playfield,
    piece: Piece,
    next: Tetromino,
    session: Session,
    rng: R,
}

impl<R: Rng> Game<R> {
    pub fn new(mut rng: R) -> Self {
        let first = Tetromino::random(&mut rng);
        let next = Tetromino::random(&mut rng);
        let game = Self {
            playfield: Playfield::new(),
            piece: Piece::spawn(first),
            next,
            session: Session::default(),
            rng,
        };
        info!("tetris: new game, first {:?}, next {:?}", first, next);
        game
    }

    pub fn playfield(&self) -> &Playfield {
        &self.playfield
    }

    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    pub fn next(&self) -> Tetromino {
        self.next
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn is_over(&self) -> bool {
        self.session.game_over
    }

    /// Apply one action. Returns whether the piece moved or rotated; a drop
    /// always reports true. A finished game ignores everything.
    pub fn apply(&mut self, action: Action) -> bool {
        if self.session.game_over {
            return false;
        }
        match action {
            Action::Left => self.try_move(-1, 0),
            Action::Right => self.try_move(1, 0),
            Action::Down => self.soft_drop(),
            Action::Rotate => self.rotate(),
            Action::Drop => {
                self.hard_drop();
                true
            }
        }
    }

    /// Commit the shifted piece unless it collides.
    pub fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        let candidate = self.piece.shifted(dx, dy);
        if self.playfield.collides(&candidate) {
            return false;
        }
        self.piece = candidate;
        true
    }

    /// Rotate clockwise in place; rejected on collision (no wall kicks).
    pub fn rotate(&mut self) -> bool {
        let candidate = self.piece.rotated();
        if self.playfield.collides(&candidate) {
            return false;
        }
        self.piece = candidate;
        true
    }

    /// One step down; lands the piece when blocked. Returns whether it moved.
    pub fn soft_drop(&mut self) -> bool {
        if self.try_move(0, 1) {
            return true;
        }
        self.lock_piece();
        false
    }

    /// Fall until blocked, then land.
    pub fn hard_drop(&mut self) {
        let mut rows = 0;
        while self.try_move(0, 1) {
            rows += 1;
        }
        debug!("tetris: hard drop {:?} by {} rows", self.piece.kind, rows);
        self.lock_piece();
    }

    fn lock_piece(&mut self) {
        self.playfield.merge(&self.piece);
        let cleared = self.playfield.clear_full_rows();
        if cleared > 0 {
            self.session.record_clear(cleared);
            debug!(
                "tetris: cleared {} lines, score {}, level {}",
                cleared, self.session.score, self.session.level
            );
        }
        self.spawn_next();
    }

    fn spawn_next(&mut self) {
        let kind = self.next;
        self.next = Tetromino::random(&mut self.rng);
        self.piece = Piece::spawn(kind);
        if self.playfield.collides(&self.piece) {
            self.session.game_over = true;
            info!(
                "tetris: game over, score {}, lines {}",
                self.session.score, self.session.lines_cleared
            );
        }
    }
}
