//! App: terminal init, main loop, gravity tick and key handling.

use crate::game::GameState;
use crate::highscore;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, ui};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding. 50 ms ≈ 20 moves/sec.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Event-poll timeout; doubles as the frame budget (~60 FPS).
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Playing,
    GameOver,
}

pub struct App {
    args: Args,
    theme: Theme,
    /// Board size clamped to the terminal so board + sidebar fit on screen.
    board_width: u16,
    board_height: u16,
    state: GameState,
    screen: Screen,
    paused: bool,
    last_drop: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    /// Fade effect for the rows being cleared (created when the animation starts).
    line_clear_effect: Option<Effect>,
    line_clear_effect_process_time: Option<Instant>,
    /// Best score on disk (updated whenever a game ends with a record).
    high_score: u32,
    new_high_score: bool,
}

impl App {
    pub fn new(args: Args, theme: Theme) -> Self {
        let high_score = highscore::load(args.high_score_file.as_deref());
        let state = GameState::new(args.width, args.height, args.start_level);
        let screen = if args.no_welcome {
            Screen::Playing
        } else {
            Screen::Welcome
        };
        Self {
            board_width: args.width,
            board_height: args.height,
            args,
            theme,
            state,
            screen,
            paused: false,
            last_drop: Instant::now(),
            repeat_state: None,
            last_repeat_fire: None,
            line_clear_effect: None,
            line_clear_effect_process_time: None,
            high_score,
            new_high_score: false,
        }
    }

    /// High score shown while playing: the stored record or the live score, whichever is higher.
    fn display_high_score(&self) -> u32 {
        self.high_score.max(self.state.score)
    }

    /// Persist the score if it strictly beats the stored record. Safe to call twice.
    fn record_high_score(&mut self) -> Result<()> {
        if self.state.score > self.high_score {
            self.new_high_score = true;
        }
        self.high_score = highscore::record(
            self.args.high_score_file.as_deref(),
            self.high_score,
            self.state.score,
        )?;
        Ok(())
    }

    /// Start a fresh game; the previous one counts as ended for the record.
    fn reset_game(&mut self) -> Result<()> {
        self.record_high_score()?;
        self.state = GameState::new(self.board_width, self.board_height, self.args.start_level);
        self.screen = Screen::Playing;
        self.paused = false;
        self.new_high_score = false;
        self.last_drop = Instant::now();
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.line_clear_effect = None;
        self.line_clear_effect_process_time = None;
        Ok(())
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::MoveLeft => self.state.move_left(),
            Action::MoveRight => self.state.move_right(),
            Action::RotateCw => self.state.rotate_cw(),
            Action::RotateCcw => self.state.rotate_ccw(),
            Action::SoftDrop => self.state.soft_drop(),
            Action::HardDrop => {
                self.state.hard_drop();
                self.repeat_state = None;
            }
            Action::Pause | Action::Restart | Action::Quit | Action::None => {}
        }
    }

    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let (action, first) = match self.repeat_state {
            Some(s) => s,
            None => return,
        };
        if !matches!(action, Action::MoveLeft | Action::MoveRight | Action::SoftDrop) {
            return;
        }
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action);
            self.last_repeat_fire = Some(now);
            // A lock mid-repeat must not carry movement into the next piece.
            if self.state.line_clear_in_progress || self.state.piece.is_none() {
                self.repeat_state = None;
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Attempt to enable enhanced keyboard for Release events (hold-to-repeat).
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        // Clamp the board so it fits the terminal; respect --width/--height when they do.
        let (term_cols, term_rows) = size()?;
        let (w, h) =
            ui::board_size_for_terminal((self.args.width, self.args.height), term_cols, term_rows);
        if (w, h) != (self.board_width, self.board_height) {
            self.board_width = w;
            self.board_height = h;
            self.state = GameState::new(w, h, self.args.start_level);
        }

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    self.display_high_score(),
                    self.new_high_score,
                    self.args.no_animation,
                    &mut self.line_clear_effect,
                    &mut self.line_clear_effect_process_time,
                    now,
                );
            })?;

            if self.state.line_clear_in_progress {
                let animation_done = self.args.no_animation
                    || self.line_clear_effect.as_ref().is_some_and(|e| e.done());
                if animation_done {
                    self.state.finish_line_clear();
                    self.line_clear_effect = None;
                    self.line_clear_effect_process_time = None;
                }
            }

            if event::poll(Duration::from_millis(FRAME_MS))? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);

                        // Only act on the first Press; Release ends our own repeat.
                        if key.kind != KeyEventKind::Press {
                            if key.kind == KeyEventKind::Release
                                && self.repeat_state.map(|(a, _)| a) == Some(action)
                            {
                                self.repeat_state = None;
                                self.last_repeat_fire = None;
                            }
                            continue;
                        }
                        // Ignore OS auto-repeat for an action we are already repeating.
                        if self.repeat_state.map(|(a, _)| a) == Some(action) {
                            continue;
                        }

                        match self.screen {
                            Screen::Welcome => match action {
                                Action::Quit => return Ok(()),
                                Action::HardDrop => {
                                    self.screen = Screen::Playing;
                                    self.last_drop = Instant::now();
                                }
                                _ => {}
                            },
                            Screen::Playing => {
                                if self.paused {
                                    match action {
                                        Action::Pause => self.paused = false,
                                        Action::Restart => self.reset_game()?,
                                        Action::Quit => {
                                            self.record_high_score()?;
                                            return Ok(());
                                        }
                                        _ => {}
                                    }
                                } else {
                                    match action {
                                        Action::Pause => self.paused = true,
                                        Action::Restart => self.reset_game()?,
                                        Action::Quit => {
                                            self.record_high_score()?;
                                            return Ok(());
                                        }
                                        Action::None => {}
                                        _ => {
                                            self.apply_action(action);
                                            let repeatable = matches!(
                                                action,
                                                Action::MoveLeft
                                                    | Action::MoveRight
                                                    | Action::SoftDrop
                                            );
                                            if repeatable {
                                                self.repeat_state = Some((action, Instant::now()));
                                                self.last_repeat_fire = None;
                                            }
                                            if self.state.line_clear_in_progress
                                                || self.state.piece.is_none()
                                            {
                                                self.repeat_state = None;
                                            }
                                        }
                                    }
                                }
                            }
                            Screen::GameOver => match action {
                                Action::Quit => return Ok(()),
                                Action::Restart => self.reset_game()?,
                                _ => {}
                            },
                        }
                    }
                }
            }

            if self.screen == Screen::Playing && !self.paused {
                self.tick_repeat();
                if self.last_drop.elapsed() >= self.state.drop_interval() {
                    self.last_drop = Instant::now();
                    self.state.tick_gravity();
                }
                if self.state.game_over {
                    self.record_high_score()?;
                    self.screen = Screen::GameOver;
                }
            }
        }
    }
}
