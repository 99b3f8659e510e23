//! 2048 board engine: slide/merge, tile spawning, win and deadlock checks.

use log::{debug, info};
use rand::Rng;

/// Board edge length (cells).
pub const SIZE: usize = 4;

/// Tile value that wins the game.
pub const WINNING_TILE: u32 = 2048;

pub type Row = [u32; SIZE];

/// Slide direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Slide a single row toward index 0, merging equal neighbours once per pass.
/// Returns the new row and the points gained.
pub fn slide_row(row: Row) -> (Row, u32) {
    let mut packed: Vec<u32> = row.iter().copied().filter(|&v| v != 0).collect();
    let mut gained = 0;
    for i in 0..packed.len().saturating_sub(1) {
        if packed[i] != 0 && packed[i] == packed[i + 1] {
            packed[i] *= 2;
            gained += packed[i];
            packed[i + 1] = 0;
        }
    }
    let mut out = [0; SIZE];
    for (slot, v) in out.iter_mut().zip(packed.into_iter().filter(|&v| v != 0)) {
        *slot = v;
    }
    (out, gained)
}

/// Result of sliding a board in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub board: Board,
    pub moved: bool,
    pub gained: u32,
}

/// 4x4 grid; 0 is an empty cell. `cells[row][col]`, row 0 on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    cells: [Row; SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(cells: [Row; SIZE]) -> Self {
        Self { cells }
    }

    pub fn rows(&self) -> &[Row; SIZE] {
        &self.cells
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    fn mirrored(&self) -> Self {
        let mut cells = self.cells;
        for row in &mut cells {
            row.reverse();
        }
        Self { cells }
    }

    fn transposed(&self) -> Self {
        let mut cells = [[0; SIZE]; SIZE];
        for (r, row) in self.cells.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                cells[c][r] = v;
            }
        }
        Self { cells }
    }

    fn slid_left(&self) -> (Self, u32) {
        let mut cells = [[0; SIZE]; SIZE];
        let mut gained = 0;
        for (out, &row) in cells.iter_mut().zip(self.cells.iter()) {
            let (slid, points) = slide_row(row);
            *out = slid;
            gained += points;
        }
        (Self { cells }, gained)
    }

    /// Slide every row/column in `dir`. Right, up and down reduce to the left
    /// primitive by mirroring and transposing.
    pub fn shifted(&self, dir: Direction) -> Shift {
        let (board, gained) = match dir {
            Direction::Left => self.slid_left(),
            Direction::Right => {
                let (b, g) = self.mirrored().slid_left();
                (b.mirrored(), g)
            }
            Direction::Up => {
                let (b, g) = self.transposed().slid_left();
                (b.transposed(), g)
            }
            Direction::Down => {
                let (b, g) = self.transposed().mirrored().slid_left();
                (b.mirrored().transposed(), g)
            }
        };
        Shift {
            board,
            moved: board != *self,
            gained,
        }
    }

    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(SIZE * SIZE);
        for (r, row) in self.cells.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                if v == 0 {
                    out.push((r, c));
                }
            }
        }
        out
    }

    /// Place a 2 (90%) or 4 (10%) in a uniformly random empty cell.
    /// No-op on a full board.
    pub fn spawn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(usize, usize)> {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return None;
        }
        let (r, c) = empty[rng.random_range(0..empty.len())];
        self.cells[r][c] = if rng.random_ratio(1, 10) { 4 } else { 2 };
        Some((r, c))
    }

    /// True if some slide would change the board.
    pub fn can_move(&self) -> bool {
        for r in 0..SIZE {
            for c in 0..SIZE {
                let v = self.cells[r][c];
                if v == 0 {
                    return true;
                }
                if r + 1 < SIZE && self.cells[r + 1][c] == v {
                    return true;
                }
                if c + 1 < SIZE && self.cells[r][c + 1] == v {
                    return true;
                }
            }
        }
        false
    }

    pub fn has_won(&self) -> bool {
        self.cells.iter().flatten().any(|&v| v == WINNING_TILE)
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Playing,
    Won,
    Lost,
}

/// Score and end state of one 2048 session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    pub score: u32,
    pub status: Status,
}

impl Session {
    pub fn is_over(&self) -> bool {
        self.status != Status::Playing
    }
}

/// A running 2048 game: board, session and the generator used for spawns.
#[derive(Debug)]
pub struct Game<R> {
    board: Board,
    session: Session,
    rng: R,
}

impl<R: Rng> Game<R> {
    /// Empty board with two spawned tiles.
    pub fn new(rng: R) -> Self {
        Self::with_board(Board::empty(), rng, 2)
    }

    fn with_board(board: Board, rng: R, initial_tiles: usize) -> Self {
        let mut game = Self {
            board,
            session: Session::default(),
            rng,
        };
        for _ in 0..initial_tiles {
            game.board.spawn(&mut game.rng);
        }
        info!("2048: new game, {} tiles on board", SIZE * SIZE - game.board.empty_cells().len());
        game
    }

    /// Start from a prepared board without spawning.
    #[cfg(test)]
    pub(crate) fn from_board(board: Board, rng: R) -> Self {
        Self::with_board(board, rng, 0)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn session(&self) -> Session {
        self.session
    }

    /// Apply one slide. Spawns a tile only when the board changed; returns
    /// whether it did. Finished games ignore further slides.
    pub fn slide(&mut self, dir: Direction) -> bool {
        if self.session.is_over() {
            return false;
        }
        let shift = self.board.shifted(dir);
        if !shift.moved {
            return false;
        }
        self.board = shift.board;
        self.session.score += shift.gained;
        if let Some((r, c)) = self.board.spawn(&mut self.rng) {
            debug!("2048: {:?} +{} pts, spawned at ({}, {})", dir, shift.gained, r, c);
        }
        if self.board.has_won() {
            self.session.status = Status::Won;
            info!("2048: reached {} with score {}", WINNING_TILE, self.session.score);
        } else if !self.board.can_move() {
            self.session.status = Status::Lost;
            info!("2048: no moves left, score {}", self.session.score);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_slide_row_first_pair_merges() {
        assert_eq!(slide_row([2, 2, 2, 0]), ([4, 2, 0, 0], 4));
    }

    #[test]
    fn test_slide_row_two_pairs() {
        assert_eq!(slide_row([2, 2, 2, 2]), ([4, 4, 0, 0], 8));
    }

    #[test]
    fn test_slide_row_merged_tile_does_not_remerge() {
        assert_eq!(slide_row([4, 4, 8, 0]), ([8, 8, 0, 0], 8));
        assert_eq!(slide_row([0, 2, 0, 2]), ([4, 0, 0, 0], 4));
        assert_eq!(slide_row([2, 4, 8, 16]), ([2, 4, 8, 16], 0));
    }

    #[test]
    fn test_directions_are_symmetric() {
        let board = Board::from_rows([
            [2, 2, 2, 0],
            [0, 0, 0, 0],
            [2, 0, 0, 0],
            [2, 0, 0, 0],
        ]);
        let right = board.shifted(Direction::Right);
        assert_eq!(right.board.rows()[0], [0, 0, 2, 4]);
        assert_eq!(right.gained, 4);

        let up = board.shifted(Direction::Up);
        assert_eq!(up.board.rows()[0], [4, 2, 2, 0]);
        assert_eq!(up.board.rows()[1], [2, 0, 0, 0]);

        let down = board.shifted(Direction::Down);
        assert_eq!(down.board.rows()[3], [4, 2, 2, 0]);
        assert_eq!(down.board.rows()[2], [2, 0, 0, 0]);
        assert_eq!(down.gained, 4);
    }

    #[test]
    fn test_no_change_reports_not_moved() {
        let board = Board::from_rows([
            [2, 4, 0, 0],
            [8, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]);
        let shift = board.shifted(Direction::Left);
        assert!(!shift.moved);
        assert_eq!(shift.board, board);
        assert_eq!(shift.gained, 0);
    }

    #[test]
    fn test_second_slide_same_direction_is_noop() {
        let board = Board::from_rows([
            [0, 2, 0, 4],
            [8, 0, 8, 0],
            [0, 0, 0, 2],
            [4, 0, 16, 0],
        ]);
        for dir in [Direction::Left, Direction::Right, Direction::Up, Direction::Down] {
            let first = board.shifted(dir);
            assert!(first.moved);
            assert!(!first.board.shifted(dir).moved, "{:?}", dir);
        }
    }

    #[test]
    fn test_can_move_deadlocked_board() {
        let board = Board::from_rows([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        assert!(!board.can_move());
        for dir in [Direction::Left, Direction::Right, Direction::Up, Direction::Down] {
            assert!(!board.shifted(dir).moved);
        }
    }

    #[test]
    fn test_can_move_with_vertical_pair_or_hole() {
        let pair = Board::from_rows([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 8],
            [4, 2, 4, 8],
        ]);
        assert!(pair.can_move());

        let mut hole = Board::from_rows([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        hole.cells[1][1] = 0;
        assert!(hole.can_move());
    }

    #[test]
    fn test_spawn_fills_an_empty_cell_with_2_or_4() {
        let mut board = Board::empty();
        let mut rng = rng();
        for _ in 0..SIZE * SIZE {
            let (r, c) = board.spawn(&mut rng).unwrap();
            assert!(matches!(board.get(r, c), Some(2 | 4)));
        }
        assert!(board.empty_cells().is_empty());
        let full = board;
        assert_eq!(board.spawn(&mut rng), None);
        assert_eq!(board, full);
    }

    #[test]
    fn test_spawn_is_mostly_twos() {
        let mut rng = rng();
        let mut fours = 0;
        for _ in 0..2000 {
            let mut board = Board::empty();
            let (r, c) = board.spawn(&mut rng).unwrap();
            if board.get(r, c) == Some(4) {
                fours += 1;
            }
        }
        assert!((100..300).contains(&fours), "fours = {}", fours);
    }

    #[test]
    fn test_has_won_exact_tile() {
        let mut board = Board::empty();
        assert!(!board.has_won());
        board.cells[3][3] = 4096;
        assert!(!board.has_won());
        board.cells[0][0] = WINNING_TILE;
        assert!(board.has_won());
    }

    #[test]
    fn test_new_game_has_two_tiles() {
        let game = Game::new(rng());
        assert_eq!(game.board().empty_cells().len(), SIZE * SIZE - 2);
        assert_eq!(game.session(), Session::default());
    }

    #[test]
    fn test_game_slide_without_change_does_not_spawn() {
        let board = Board::from_rows([
            [2, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]);
        let mut game = Game::with_board(board, rng(), 0);
        assert!(!game.slide(Direction::Left));
        assert!(!game.slide(Direction::Up));
        assert_eq!(*game.board(), board);

        assert!(game.slide(Direction::Right));
        assert_eq!(game.board().empty_cells().len(), SIZE * SIZE - 2);
    }

    #[test]
    fn test_game_scores_merges_and_wins() {
        let board = Board::from_rows([
            [1024, 1024, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]);
        let mut game = Game::with_board(board, rng(), 0);
        assert!(game.slide(Direction::Left));
        assert_eq!(game.session().score, 2048);
        assert_eq!(game.session().status, Status::Won);

        let frozen = *game.board();
        assert!(!game.slide(Direction::Right));
        assert_eq!(*game.board(), frozen);
    }

    #[test]
    fn test_game_detects_loss_after_last_move() {
        // One merge leaves exactly one hole; the spawn fills it.
        let board = Board::from_rows([
            [8, 16, 8, 16],
            [16, 8, 16, 8],
            [8, 16, 8, 16],
            [32, 64, 2, 2],
        ]);
        let mut game = Game::with_board(board, rng(), 0);
        assert!(game.slide(Direction::Right));
        let rows = game.board().rows();
        assert_eq!(&rows[3][1..], &[32, 64, 4]);
        assert!(matches!(rows[3][0], 2 | 4));
        assert_eq!(game.session().score, 4);
        assert_eq!(game.session().status, Status::Lost);
        assert!(!game.slide(Direction::Left));
    }
}
