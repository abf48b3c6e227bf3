//! Layout and drawing: board, sidebar, next preview, welcome/pause/game-over overlays.

use crate::app::Screen;
use crate::game::{Cell, GameState, PieceSpec};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each board cell is drawn as two terminal columns ("██") by one row.
const CELL_WIDTH: u16 = 2;

const SIDEBAR_WIDTH: u16 = 22;

/// Duration of the line-clear fade in ms.
const LINE_CLEAR_FADE_MS: u32 = 350;

/// Board size in terminal cells (border included) for given grid dimensions.
fn board_pixel_size(width: u16, height: u16) -> (u16, u16) {
    (width * CELL_WIDTH + 2, height + 2)
}

/// Max board size (in grid cells) that fits the given terminal, sidebar included.
pub fn max_board_cells_for_terminal(term_cols: u16, term_rows: u16) -> (u16, u16) {
    let max_w = term_cols.saturating_sub(2 + SIDEBAR_WIDTH) / CELL_WIDTH;
    let max_h = term_rows.saturating_sub(2);
    (max_w, max_h)
}

/// Clamp the requested board size so board, border, and sidebar fit on screen.
/// Never smaller than 4×4 (an I piece must fit either way up).
pub fn board_size_for_terminal(
    requested: (u16, u16),
    term_cols: u16,
    term_rows: u16,
) -> (u16, u16) {
    let (max_w, max_h) = max_board_cells_for_terminal(term_cols, term_rows);
    (
        requested.0.min(max_w).max(4),
        requested.1.min(max_h).max(4),
    )
}

/// Outer (bordered) board rect, centred together with the sidebar.
fn board_outer_rect(area: Rect, state: &GameState) -> Rect {
    let (pw, ph) = board_pixel_size(state.board.width as u16, state.board.height as u16);
    let total_w = pw + SIDEBAR_WIDTH;
    Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2,
        y: area.y + area.height.saturating_sub(ph) / 2,
        width: pw.min(area.width),
        height: ph.min(area.height),
    }
}

/// Board interior (no border); matches `draw_game` layout.
fn board_rect(area: Rect, state: &GameState) -> Rect {
    let outer = board_outer_rect(area, state);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (state.board.width as u16 * CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: (state.board.height as u16).min(outer.height.saturating_sub(2)),
    }
}

/// Centred popup of the given size.
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Draw the current screen; overlays (welcome, pause, game over) sit on top of the board.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    high_score: u32,
    new_high_score: bool,
    no_animation: bool,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    draw_game(frame, state, theme, high_score, area);
    match screen {
        Screen::Welcome => draw_welcome(frame, theme, area),
        Screen::Playing => {
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
            if state.line_clear_in_progress && !no_animation {
                apply_line_clear_effect(
                    frame,
                    state,
                    theme,
                    area,
                    line_clear_effect,
                    line_clear_process_time,
                    now,
                );
            }
        }
        Screen::GameOver => draw_game_over(frame, state, theme, high_score, new_high_score, area),
    }
}

fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, high_score: u32, area: Rect) {
    let outer = board_outer_rect(area, state);
    let board_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));
    frame.render_widget(board_block, outer);

    let inner = board_rect(area, state);

    // Board plus the active piece, composited cell by cell.
    let mut grid: Vec<Vec<Option<u8>>> =
        vec![vec![None; state.board.width]; state.board.height];
    for (y, row) in grid.iter_mut().enumerate() {
        for (x, slot) in row.iter_mut().enumerate() {
            if let Some(Cell::Filled(c)) = state.board.get(x, y) {
                *slot = Some(c);
            }
        }
    }
    if let Some(ref piece) = state.piece {
        for (x, y) in piece.cells() {
            if x < 0 || y < 0 {
                continue;
            }
            if let Some(slot) = grid
                .get_mut(y as usize)
                .and_then(|row| row.get_mut(x as usize))
            {
                *slot = Some(piece.color);
            }
        }
    }

    let empty = Style::default().bg(theme.bg);
    let lines: Vec<Line> = grid
        .iter()
        .map(|row| {
            Line::from(
                row.iter()
                    .map(|slot| match slot {
                        Some(c) => Span::styled(
                            "██",
                            Style::default().fg(theme.piece_color(*c)).bg(theme.bg),
                        ),
                        None => Span::styled("  ", empty),
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);

    draw_sidebar(frame, state, theme, high_score, outer, area);
}

fn draw_sidebar(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    high_score: u32,
    board_outer: Rect,
    area: Rect,
) {
    let sidebar = Rect {
        x: board_outer.x + board_outer.width,
        y: board_outer.y,
        width: SIDEBAR_WIDTH.min(area.width.saturating_sub(board_outer.width)),
        height: board_outer.height,
    };
    if sidebar.width == 0 || sidebar.height == 0 {
        return;
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.panel_bg))
        .title(Span::styled(
            " tetratui ",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(sidebar);
    frame.render_widget(block, sidebar);

    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.main_fg);
    let dim = Style::default().fg(theme.border);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Score      ", label),
            Span::styled(state.score.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Level      ", label),
            Span::styled(state.level.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Lines      ", label),
            Span::styled(state.lines_cleared.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("High score ", label),
            Span::styled(high_score.to_string(), value),
        ]),
        Line::default(),
        Line::from(Span::styled("Next", label)),
    ];
    lines.extend(next_preview_lines(state.queue.front(), theme));
    lines.push(Line::default());
    lines.extend([
        Line::from(Span::styled("←/→ move   ↑ rotate", dim)),
        Line::from(Span::styled("↓ soft   ⏎/spc hard", dim)),
        Line::from(Span::styled("p pause  r restart", dim)),
        Line::from(Span::styled("q quit", dim)),
    ]);
    frame.render_widget(Paragraph::new(lines), inner);

    // Progress towards the next level, below the fixed text.
    let gauge_rect = Rect {
        x: inner.x,
        y: (inner.y + inner.height).saturating_sub(1),
        width: inner.width,
        height: 1.min(inner.height),
    };
    let into_level = state.lines_cleared % 10;
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(theme.title).bg(theme.bg))
        .ratio(f64::from(into_level) / 10.0)
        .label(format!("{into_level}/10"));
    frame.render_widget(gauge, gauge_rect);
}

/// Mini preview of the upcoming piece on a 4×2 grid.
fn next_preview_lines(next: Option<&PieceSpec>, theme: &Theme) -> Vec<Line<'static>> {
    let Some(spec) = next else {
        return vec![Line::default(), Line::default()];
    };
    let cells = spec.kind.cells();
    let color = theme.piece_color(spec.color);
    (0..2)
        .map(|y| {
            Line::from(
                (0..4)
                    .map(|x| {
                        if cells.contains(&(x, y)) {
                            Span::styled("██", Style::default().fg(color))
                        } else {
                            Span::raw("  ")
                        }
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

fn draw_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 44, 11);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .style(Style::default().bg(theme.panel_bg));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    let lines = vec![
        Line::from(Span::styled(
            "Welcome to tetratui!",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Arrange falling blocks to clear lines.",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            "Arrow keys move and rotate,",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            "Down drops one row, Enter drops fully.",
            Style::default().fg(theme.main_fg),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to play",
            Style::default().fg(theme.title),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        inner,
    );
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 30, 3);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .style(Style::default().bg(theme.panel_bg));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "Paused — p to resume",
            Style::default().fg(theme.main_fg),
        )))
        .alignment(Alignment::Center),
        inner,
    );
}

fn draw_game_over(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    high_score: u32,
    new_high_score: bool,
    area: Rect,
) {
    let popup = popup_rect(area, 36, 10);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .style(Style::default().bg(theme.panel_bg));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    let value = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(Span::styled(
            "Game Over",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(format!("Score  {}", state.score), value)),
        Line::from(Span::styled(format!("Lines  {}", state.lines_cleared), value)),
        Line::from(Span::styled(format!("Best   {high_score}"), value)),
    ];
    if new_high_score {
        lines.push(Line::from(Span::styled(
            "New high score!",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "r restart   q quit",
        Style::default().fg(theme.border),
    )));
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        inner,
    );
}

/// Buffer positions covered by the rows being cleared.
fn clearing_buffer_positions(board: Rect, rows: &[usize], width: usize) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &row in rows {
        let y = board.y + row as u16;
        if y >= board.y + board.height {
            continue;
        }
        for cx in 0..width as u16 * CELL_WIDTH {
            let x = board.x + cx;
            if x < board.x + board.width {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Create or update the line-clear fade and process it for this frame.
fn apply_line_clear_effect(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, state);
    let delta = line_clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u128::from(u32::MAX)) as u32);
    *line_clear_process_time = Some(now);

    if line_clear_effect.is_none() {
        let clearing = clearing_buffer_positions(board, &state.clearing_rows, state.board.width);
        let filter = CellFilter::PositionFn(ref_count(move |pos: ratatui::layout::Position| {
            clearing.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (LINE_CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *line_clear_effect = Some(effect);
    }

    if let Some(effect) = line_clear_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_max_board_fits_terminal() {
        let (w, h) = max_board_cells_for_terminal(80, 32);
        let (pw, ph) = board_pixel_size(w, h);
        assert!(pw + SIDEBAR_WIDTH <= 80);
        assert!(ph <= 32);
    }

    #[test]
    fn requested_size_is_clamped_not_grown() {
        // A 20x30 board cannot fit an 80x24 terminal; width can.
        let (w, h) = board_size_for_terminal((20, 30), 80, 24);
        assert_eq!(w, 20);
        assert_eq!(h, 22);
        // A small request stays as requested.
        assert_eq!(board_size_for_terminal((10, 20), 120, 40), (10, 20));
    }

    #[test]
    fn clamp_never_goes_below_piece_size() {
        let (w, h) = board_size_for_terminal((20, 30), 10, 5);
        assert!(w >= 4);
        assert!(h >= 4);
    }

    #[test]
    fn clearing_positions_cover_full_rows() {
        let board = Rect::new(5, 3, 20, 10);
        let set = clearing_buffer_positions(board, &[2, 4], 10);
        assert_eq!(set.len(), 40);
        assert!(set.contains(&(5, 5)));
        assert!(set.contains(&(24, 7)));
        assert!(!set.contains(&(5, 4)));
    }
}
