//! Game state: board, active piece, gravity, line clears, scoring.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::time::Duration;

/// Number of piece colours; colour is picked independently of the shape.
pub const NUM_COLORS: u8 = 6;

/// Upcoming pieces kept pre-selected; the front is shown in the preview.
const QUEUE_LEN: usize = 4;

/// Drop interval at level 1.
const START_DROP_MS: u64 = 500;
/// Drop interval never goes below this.
const MIN_DROP_MS: u64 = 50;
/// Interval reduction per level.
const DROP_STEP_MS: u64 = 50;

/// Level advances every this many cleared lines.
const LEVEL_UP_LINES: u32 = 10;

/// Points for clearing 1, 2, 3, or 4 rows at once.
const LINE_SCORES: [u32; 4] = [100, 300, 500, 800];

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// 4 cells relative to origin (0,0); each (dx, dy), dy grows downward.
    pub fn cells(&self) -> &[(i8, i8); 4] {
        match self {
            Self::I => &[(0, 0), (1, 0), (2, 0), (3, 0)],
            Self::O => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::T => &[(0, 0), (1, 0), (2, 0), (1, 1)],
            Self::S => &[(1, 0), (2, 0), (0, 1), (1, 1)],
            Self::Z => &[(0, 0), (1, 0), (1, 1), (2, 1)],
            Self::J => &[(0, 0), (0, 1), (1, 1), (2, 1)],
            Self::L => &[(2, 0), (0, 1), (1, 1), (2, 1)],
        }
    }

    /// Rotation pivot within the base cell table.
    fn pivot(&self) -> (i8, i8) {
        match self {
            Self::I => (1, 0),
            _ => (1, 1),
        }
    }

    /// Piece width in columns at spawn rotation, for centering.
    fn spawn_width(&self) -> i32 {
        let cells = self.cells();
        let min = cells.iter().map(|&(dx, _)| dx).min().unwrap_or(0);
        let max = cells.iter().map(|&(dx, _)| dx).max().unwrap_or(0);
        i32::from(max - min) + 1
    }
}

/// Rotate a cell offset r quarter-turns clockwise around the pivot.
fn rotate_cell(dx: i8, dy: i8, r: u8, cx: i8, cy: i8) -> (i8, i8) {
    let dx = dx - cx;
    let dy = dy - cy;
    let (dx, dy) = match r % 4 {
        1 => (-dy, dx),
        2 => (-dx, -dy),
        3 => (dy, -dx),
        _ => (dx, dy),
    };
    (dx + cx, dy + cy)
}

/// A pre-selected shape + colour pair, queued before it becomes the active piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSpec {
    pub kind: TetrominoKind,
    pub color: u8,
}

impl PieceSpec {
    /// Shape and colour are drawn independently, so any kind can appear in any colour.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let kind = *TetrominoKind::ALL.choose(&mut rng).unwrap_or(&TetrominoKind::I);
        let color = rng.gen_range(0..NUM_COLORS);
        Self { kind, color }
    }
}

/// Active piece: shape, colour, anchor position, rotation state (0..4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: TetrominoKind,
    pub color: u8,
    pub x: i32,
    pub y: i32,
    pub rotation: u8,
}

impl Piece {
    /// Absolute board coordinates of the 4 occupied cells at the current rotation.
    pub fn cells(&self) -> [(i32, i32); 4] {
        let base = self.kind.cells();
        // O is rotation-invariant.
        let r = if self.kind == TetrominoKind::O { 0 } else { self.rotation % 4 };
        let (cx, cy) = self.kind.pivot();
        let mut out = [(0i32, 0i32); 4];
        for (i, &(dx, dy)) in base.iter().enumerate() {
            let (rdx, rdy) = rotate_cell(dx, dy, r, cx, cy);
            out[i] = (self.x + i32::from(rdx), self.y + i32::from(rdy));
        }
        out
    }
}

/// Single cell: empty or filled with a colour index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Filled(u8),
}

/// Playing field: rows[0] is the top, y grows downward.
#[derive(Debug, Clone)]
pub struct Board {
    pub width: usize,
    pub height: usize,
    rows: Vec<Vec<Cell>>,
}

impl Board {
    pub fn new(width: u16, height: u16) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self {
            width: w,
            height: h,
            rows: (0..h).map(|_| vec![Cell::Empty; w]).collect(),
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

    /// True if every cell of the piece is in bounds and unoccupied.
    pub fn can_place(&self, piece: &Piece) -> bool {
        for (x, y) in piece.cells() {
            if x < 0 || x >= self.width as i32 || y < 0 || y >= self.height as i32 {
                return false;
            }
            if matches!(self.get(x as usize, y as usize), Some(Cell::Filled(_))) {
                return false;
            }
        }
        true
    }

    /// Write the piece's cells into the board.
    fn lock(&mut self, piece: &Piece) {
        for (x, y) in piece.cells() {
            if x >= 0 && y >= 0 {
                self.set(x as usize, y as usize, Cell::Filled(piece.color));
            }
        }
    }

    /// Indices of rows with no empty cell, top to bottom.
    pub fn full_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|c| matches!(c, Cell::Filled(_))))
            .map(|(y, _)| y)
            .collect()
    }

    /// Remove the given rows; rows above shift down, empty rows appear at the top.
    fn remove_rows(&mut self, cleared: &[usize]) {
        if cleared.is_empty() {
            return;
        }
        let mut kept: Vec<Vec<Cell>> = Vec::with_capacity(self.height);
        for (y, row) in self.rows.drain(..).enumerate() {
            if !cleared.contains(&y) {
                kept.push(row);
            }
        }
        let missing = self.height - kept.len();
        let mut rows: Vec<Vec<Cell>> =
            (0..missing).map(|_| vec![Cell::Empty; self.width]).collect();
        rows.extend(kept);
        self.rows = rows;
    }
}

/// Game state: board, active piece, upcoming queue, score, level, lines.
#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub piece: Option<Piece>,
    pub queue: VecDeque<PieceSpec>,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    pub game_over: bool,
    /// Rows awaiting removal (animation); collapsed in `finish_line_clear`.
    pub clearing_rows: Vec<usize>,
    pub line_clear_in_progress: bool,
    start_level: u32,
}

impl GameState {
    pub fn new(width: u16, height: u16, start_level: u32) -> Self {
        let mut queue: VecDeque<PieceSpec> = (0..QUEUE_LEN).map(|_| PieceSpec::random()).collect();
        let first = queue.pop_front().unwrap_or_else(PieceSpec::random);
        queue.push_back(PieceSpec::random());
        let board = Board::new(width, height);
        let piece = Some(Self::spawn_piece(width, first));
        let mut state = Self {
            board,
            piece,
            queue,
            score: 0,
            level: start_level.max(1),
            lines_cleared: 0,
            game_over: false,
            clearing_rows: Vec::new(),
            line_clear_in_progress: false,
            start_level: start_level.max(1),
        };
        if state.piece.as_ref().is_some_and(|p| !state.board.can_place(p)) {
            state.game_over = true;
        }
        state
    }

    /// Top-centre spawn position for a queued piece.
    fn spawn_piece(width: u16, spec: PieceSpec) -> Piece {
        let w = i32::from(width);
        Piece {
            kind: spec.kind,
            color: spec.color,
            x: w / 2 - spec.kind.spawn_width() / 2,
            y: 0,
            rotation: 0,
        }
    }

    /// True while gameplay input and gravity should be ignored.
    fn blocked(&self) -> bool {
        self.game_over || self.line_clear_in_progress
    }

    pub fn move_left(&mut self) {
        if self.blocked() {
            return;
        }
        if let Some(ref mut piece) = self.piece {
            piece.x -= 1;
            if !self.board.can_place(piece) {
                piece.x += 1;
            }
        }
    }

    pub fn move_right(&mut self) {
        if self.blocked() {
            return;
        }
        if let Some(ref mut piece) = self.piece {
            piece.x += 1;
            if !self.board.can_place(piece) {
                piece.x -= 1;
            }
        }
    }

    /// Try the next rotation state; reject and keep the current one on collision.
    /// No wall-kick attempts.
    pub fn rotate_cw(&mut self) {
        if self.blocked() {
            return;
        }
        if let Some(ref mut piece) = self.piece {
            let old = piece.rotation;
            piece.rotation = (piece.rotation + 1) % 4;
            if !self.board.can_place(piece) {
                piece.rotation = old;
            }
        }
    }

    pub fn rotate_ccw(&mut self) {
        if self.blocked() {
            return;
        }
        if let Some(ref mut piece) = self.piece {
            let old = piece.rotation;
            piece.rotation = (piece.rotation + 3) % 4;
            if !self.board.can_place(piece) {
                piece.rotation = old;
            }
        }
    }

    /// Move down one row; locks the piece when the move fails.
    pub fn tick_gravity(&mut self) {
        if self.blocked() {
            return;
        }
        if let Some(ref mut piece) = self.piece {
            piece.y += 1;
            if !self.board.can_place(piece) {
                piece.y -= 1;
                self.lock_piece();
            }
        }
    }

    /// Player-initiated drop: one row, 1 point; locks on failure.
    pub fn soft_drop(&mut self) {
        if self.blocked() {
            return;
        }
        if let Some(ref mut piece) = self.piece {
            piece.y += 1;
            if self.board.can_place(piece) {
                self.score += 1;
            } else {
                piece.y -= 1;
                self.lock_piece();
            }
        }
    }

    /// Drop to the last valid row and lock, 2 points per row travelled.
    pub fn hard_drop(&mut self) {
        if self.blocked() {
            return;
        }
        let Some(piece) = self.piece.clone() else {
            return;
        };
        let mut target = piece.clone();
        loop {
            let mut next = target.clone();
            next.y += 1;
            if self.board.can_place(&next) {
                target = next;
            } else {
                break;
            }
        }
        self.score += 2 * (target.y - piece.y).max(0) as u32;
        self.piece = Some(target);
        self.lock_piece();
    }

    /// Merge the piece into the board, then clear lines and spawn the next piece.
    /// When rows cleared, the spawn waits for `finish_line_clear`.
    fn lock_piece(&mut self) {
        let piece = match self.piece.take() {
            Some(p) => p,
            None => return,
        };
        self.board.lock(&piece);
        self.process_clears();
        if !self.line_clear_in_progress {
            self.spawn_next();
        }
    }

    /// Detect full rows and award score/lines/level; removal is deferred so the
    /// renderer can fade the rows out first.
    fn process_clears(&mut self) {
        let rows = self.board.full_rows();
        if rows.is_empty() {
            return;
        }
        self.score += line_points(rows.len());
        self.lines_cleared += rows.len() as u32;
        self.level = self.start_level + self.lines_cleared / LEVEL_UP_LINES;
        self.clearing_rows = rows;
        self.line_clear_in_progress = true;
    }

    /// Called once the clear animation ends (or immediately with animation off):
    /// collapse the cleared rows and spawn the next piece.
    pub fn finish_line_clear(&mut self) {
        if !self.line_clear_in_progress {
            return;
        }
        let rows = std::mem::take(&mut self.clearing_rows);
        self.board.remove_rows(&rows);
        self.line_clear_in_progress = false;
        self.spawn_next();
    }

    /// Promote the queue front to the active piece; game over when it does not fit.
    fn spawn_next(&mut self) {
        let spec = self.queue.pop_front().unwrap_or_else(PieceSpec::random);
        self.queue.push_back(PieceSpec::random());
        let piece = Self::spawn_piece(self.board.width as u16, spec);
        if !self.board.can_place(&piece) {
            self.game_over = true;
        }
        self.piece = Some(piece);
    }

    /// Gravity interval for the current level; shrinks 50 ms per level down to a 50 ms floor.
    pub fn drop_interval(&self) -> Duration {
        let ms = START_DROP_MS
            .saturating_sub(u64::from(self.level.saturating_sub(1)) * DROP_STEP_MS)
            .max(MIN_DROP_MS);
        Duration::from_millis(ms)
    }
}

fn line_points(rows: usize) -> u32 {
    LINE_SCORES[rows.clamp(1, LINE_SCORES.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state(width: u16, height: u16) -> GameState {
        let mut state = GameState::new(width, height, 1);
        state.piece = None;
        state
    }

    fn fill_row_except(board: &mut Board, y: usize, skip: usize) {
        for x in 0..board.width {
            if x != skip {
                board.set(x, y, Cell::Filled(0));
            }
        }
    }

    fn piece(kind: TetrominoKind, x: i32, y: i32, rotation: u8) -> Piece {
        Piece {
            kind,
            color: 2,
            x,
            y,
            rotation,
        }
    }

    #[test]
    fn move_into_wall_is_rejected() {
        let mut state = empty_state(10, 20);
        state.piece = Some(piece(TetrominoKind::O, 0, 5, 0));
        let before = state.piece.clone();
        state.move_left();
        assert_eq!(state.piece, before);
    }

    #[test]
    fn move_into_filled_cell_is_rejected() {
        let mut state = empty_state(10, 20);
        state.board.set(5, 5, Cell::Filled(1));
        state.piece = Some(piece(TetrominoKind::O, 3, 4, 0));
        let before = state.piece.clone();
        state.move_right();
        assert_eq!(state.piece, before);
    }

    #[test]
    fn rotation_out_of_bounds_is_rejected() {
        // Vertical I hugging the left wall: rotating to horizontal would
        // reach x = -2, so the rotation must be refused outright.
        let mut state = empty_state(10, 20);
        state.piece = Some(piece(TetrominoKind::I, -1, 5, 1));
        assert!(state.board.can_place(state.piece.as_ref().unwrap()));
        let before = state.piece.clone();
        state.rotate_cw();
        assert_eq!(state.piece, before);
    }

    #[test]
    fn rotation_into_stack_is_rejected() {
        let mut state = empty_state(10, 20);
        for y in 0..20 {
            state.board.set(5, y, Cell::Filled(3));
        }
        state.piece = Some(piece(TetrominoKind::I, 3, 10, 1));
        let before = state.piece.clone();
        state.rotate_cw();
        assert_eq!(state.piece, before);
    }

    #[test]
    fn o_piece_rotation_is_identity() {
        let p = piece(TetrominoKind::O, 4, 4, 0);
        let mut rotated = p.clone();
        rotated.rotation = 1;
        assert_eq!(p.cells(), rotated.cells());
    }

    #[test]
    fn four_rotations_return_to_start() {
        for kind in TetrominoKind::ALL {
            let p = piece(kind, 4, 4, 0);
            let mut q = p.clone();
            q.rotation = 4;
            assert_eq!(p.cells(), q.cells(), "{kind:?}");
        }
    }

    #[test]
    fn hard_drop_locks_at_bottom() {
        let mut state = empty_state(10, 20);
        state.piece = Some(piece(TetrominoKind::O, 4, 0, 0));
        state.hard_drop();
        assert_eq!(state.board.get(4, 19), Some(Cell::Filled(2)));
        assert_eq!(state.board.get(5, 19), Some(Cell::Filled(2)));
        assert_eq!(state.board.get(4, 18), Some(Cell::Filled(2)));
        assert_eq!(state.board.get(5, 18), Some(Cell::Filled(2)));
        // 2 points per row travelled (18 rows).
        assert_eq!(state.score, 36);
    }

    #[test]
    fn partial_row_is_not_full() {
        let mut board = Board::new(10, 20);
        fill_row_except(&mut board, 19, 9);
        assert!(board.full_rows().is_empty());
    }

    #[test]
    fn full_row_is_detected() {
        let mut board = Board::new(10, 20);
        for x in 0..10 {
            board.set(x, 19, Cell::Filled(4));
        }
        assert_eq!(board.full_rows(), vec![19]);
    }

    #[test]
    fn removing_rows_shifts_above_rows_down() {
        let mut board = Board::new(4, 6);
        board.set(1, 2, Cell::Filled(5));
        for x in 0..4 {
            board.set(x, 3, Cell::Filled(0));
            board.set(x, 5, Cell::Filled(0));
        }
        board.set(2, 4, Cell::Filled(1));
        board.remove_rows(&[3, 5]);
        // Marker at y=2 falls by two, marker at y=4 by one.
        assert_eq!(board.get(1, 4), Some(Cell::Filled(5)));
        assert_eq!(board.get(2, 5), Some(Cell::Filled(1)));
        assert!(board.full_rows().is_empty());
        for x in 0..4 {
            assert_eq!(board.get(x, 0), Some(Cell::Empty));
            assert_eq!(board.get(x, 1), Some(Cell::Empty));
        }
    }

    #[test]
    fn line_scores_follow_bonus_table() {
        assert_eq!(line_points(1), 100);
        assert_eq!(line_points(2), 300);
        assert_eq!(line_points(3), 500);
        assert_eq!(line_points(4), 800);
    }

    #[test]
    fn level_advances_every_ten_lines() {
        let mut state = empty_state(10, 20);
        state.lines_cleared = 9;
        fill_row_except(&mut state.board, 19, 9);
        state.piece = Some(piece(TetrominoKind::I, 8, 1, 1));
        state.hard_drop();
        assert_eq!(state.lines_cleared, 10);
        assert_eq!(state.level, 2);
    }

    #[test]
    fn drop_interval_shrinks_with_level_to_floor() {
        let mut state = empty_state(10, 20);
        let mut last = Duration::from_millis(u64::MAX);
        for level in 1..=15 {
            state.level = level;
            let interval = state.drop_interval();
            assert!(interval <= last);
            if last > Duration::from_millis(50) {
                assert!(interval < last);
            }
            last = interval;
        }
        assert_eq!(last, Duration::from_millis(50));
    }

    #[test]
    fn blocked_spawn_sets_game_over() {
        let mut state = empty_state(10, 20);
        for y in 0..3 {
            for x in 0..10 {
                state.board.set(x, y, Cell::Filled(1));
            }
        }
        state.spawn_next();
        assert!(state.game_over);
    }

    #[test]
    fn clearing_bottom_row_scenario() {
        // Bottom row full except the last column; a vertical I dropped into
        // that column clears the row and the remainder shifts down one.
        let mut state = empty_state(10, 20);
        fill_row_except(&mut state.board, 19, 9);
        // Vertical I whose cells sit in column 9.
        state.piece = Some(piece(TetrominoKind::I, 8, 1, 1));
        while !state.line_clear_in_progress {
            state.tick_gravity();
        }
        assert_eq!(state.clearing_rows, vec![19]);
        assert_eq!(state.score, 100);
        assert_eq!(state.lines_cleared, 1);
        state.finish_line_clear();
        assert!(!state.line_clear_in_progress);
        // The three remaining I cells end up in rows 17..=19 of column 9.
        for y in 17..20 {
            assert_eq!(state.board.get(9, y), Some(Cell::Filled(2)), "y={y}");
        }
        for x in 0..9 {
            assert_eq!(state.board.get(x, 19), Some(Cell::Empty), "x={x}");
        }
        assert!(!state.game_over);
        assert!(state.piece.is_some());
    }
}
