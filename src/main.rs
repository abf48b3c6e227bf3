//! tetratui — classic falling-block puzzle game in the terminal.

mod app;
mod game;
mod highscore;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_default();
    let mut app = App::new(args, theme);
    app.run()
}

/// Classic falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tetratui",
    version,
    about = "Classic falling-block puzzle in the terminal. Clear full rows to score; speed rises with level.",
    long_about = "Tetratui is a terminal rendition of the classic falling-block puzzle.\n\n\
        Arrange the falling tetrominoes to complete horizontal rows. Full rows clear, score and \
        level rise, and the fall speed increases every 10 lines. The best score is kept in a small \
        JSON file between runs.\n\n\
        CONTROLS (normal):\n  Left/Right  Move    Up        Rotate CW   Down       Soft drop\n  Enter/Space Hard drop   P          Pause      R          Restart    Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/l         Move    k          Rotate CW   u          Rotate CCW\n  j           Soft drop  Space      Hard drop\n\n\
        Hold a movement key to keep the piece moving. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the built-in palette if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Board width in columns (grid cells); clamped so the board fits the terminal.
    #[arg(long, default_value = "20", value_name = "COLS")]
    pub width: u16,

    /// Board height in rows (grid cells); clamped so the board fits the terminal.
    #[arg(long, default_value = "30", value_name = "ROWS")]
    pub height: u16,

    /// Starting level; raises the initial fall speed.
    #[arg(long, default_value = "1", value_name = "N")]
    pub start_level: u32,

    /// Disable the line-clear animation (rows collapse instantly).
    #[arg(long)]
    pub no_animation: bool,

    /// Skip the welcome screen and start playing immediately.
    #[arg(long)]
    pub no_welcome: bool,

    /// High-score file to use instead of the default (config dir / tetratui / high_score.json).
    #[arg(long, value_name = "FILE")]
    pub high_score_file: Option<PathBuf>,
}
