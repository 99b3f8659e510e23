//! App: terminal init/restore and the two game loops.

use crate::TetrisConfig;
use crate::input::{ActionSource, BlockingKeys, Command, PolledKeys, TetrisKeys, TileKeys};
use crate::tetris;
use crate::theme::Theme;
use crate::twenty48::{self, Direction, Status};
use crate::ui::{self, GameOverFade};
use anyhow::Result;
use log::{info, warn};
use rand::Rng;
use ratatui::backend::Backend;
use ratatui::{DefaultTerminal, Frame, Terminal};
use std::time::Instant;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Quit,
    Won,
    Lost,
    GameOver,
}

#[derive(Debug, Clone, Copy)]
pub struct TilesOutcome {
    pub ending: Ending,
    pub session: twenty48::Session,
    pub best_tile: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct TetrisOutcome {
    pub ending: Ending,
    pub session: tetris::Session,
}

/// Raw mode + alternate screen around `f`; the terminal is restored even when `f` fails.
fn with_terminal<T>(f: impl FnOnce(&mut DefaultTerminal) -> Result<T>) -> Result<T> {
    use crossterm::{
        cursor, execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }

    let result = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
        .map_err(anyhow::Error::from)
        .and_then(|mut terminal| f(&mut terminal));

    // Restore
    let restored = execute!(std::io::stdout(), LeaveAlternateScreen, cursor::Show);
    disable_raw_mode()?;
    let value = result?;
    restored?;
    Ok(value)
}

fn redraw<B: Backend>(terminal: &mut Terminal<B>, render: impl FnOnce(&mut Frame)) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    terminal.draw(render)?;
    Ok(())
}

/// Play 2048 in the real terminal with blocking key reads.
pub fn play_tiles<R: Rng>(rng: R, theme: &Theme) -> Result<TilesOutcome> {
    with_terminal(|terminal| {
        let mut game = twenty48::Game::new(rng);
        let ending = run_tiles(terminal, &mut BlockingKeys::<TileKeys>::new(), &mut game, theme)?;
        Ok(TilesOutcome {
            ending,
            session: game.session(),
            best_tile: game.board().max_tile(),
        })
    })
}

/// Play Tetris in the real terminal with polled key reads.
pub fn play_tetris<R: Rng>(rng: R, theme: &Theme, config: &TetrisConfig) -> Result<TetrisOutcome> {
    with_terminal(|terminal| {
        let mut game = tetris::Game::new(rng);
        let ending = run_tetris(
            terminal,
            &mut PolledKeys::<TetrisKeys>::new(),
            &mut game,
            theme,
            config,
        )?;
        Ok(TetrisOutcome {
            ending,
            session: game.session(),
        })
    })
}

/// 2048 loop: wait for a key, slide, redraw when the board changed, stop on
/// quit, win or loss. The final board stays up until one more key press.
pub fn run_tiles<B, S, R>(
    terminal: &mut Terminal<B>,
    keys: &mut S,
    game: &mut twenty48::Game<R>,
    theme: &Theme,
) -> Result<Ending>
where
    B: Backend,
    B::Error: Send + Sync + 'static,
    S: ActionSource<Action = Direction>,
    R: Rng,
{
    info!("2048: session start");
    redraw(terminal, |f| ui::draw_tiles(f, game.board(), game.session(), theme))?;
    loop {
        let dir = match keys.next_command()? {
            Some(Command::Play(dir)) => dir,
            Some(Command::Quit) => {
                info!("2048: quit with score {}", game.session().score);
                return Ok(Ending::Quit);
            }
            None => continue,
        };
        if !game.slide(dir) {
            continue;
        }
        redraw(terminal, |f| ui::draw_tiles(f, game.board(), game.session(), theme))?;
        let ending = match game.session().status {
            Status::Playing => continue,
            Status::Won => Ending::Won,
            Status::Lost => Ending::Lost,
        };
        keys.next_command()?;
        return Ok(ending);
    }
}

/// Tetris loop: poll for a key, apply it, let the piece fall when the level's
/// interval has passed, redraw on change, sleep. After game over the faded
/// board stays up for the configured pause.
pub fn run_tetris<B, S, R>(
    terminal: &mut Terminal<B>,
    keys: &mut S,
    game: &mut tetris::Game<R>,
    theme: &Theme,
    config: &TetrisConfig,
) -> Result<Ending>
where
    B: Backend,
    B::Error: Send + Sync + 'static,
    S: ActionSource<Action = tetris::Action>,
    R: Rng,
{
    info!("tetris: session start, base interval {:?}", config.drop_interval);
    let mut last_fall = Instant::now();
    let mut warned_fast = false;
    redraw(terminal, |f| ui::draw_tetris(f, game, theme, None, Instant::now()))?;

    while !game.is_over() {
        let now = Instant::now();
        let mut dirty = false;
        match keys.next_command()? {
            Some(Command::Quit) => {
                info!("tetris: quit with score {}", game.session().score);
                return Ok(Ending::Quit);
            }
            Some(Command::Play(action)) => {
                game.apply(action);
                dirty = true;
            }
            None => {}
        }

        let interval = game.session().drop_interval(config.drop_interval);
        if !warned_fast && interval < config.poll_interval {
            warn!(
                "tetris: fall interval {:?} at level {} is below the poll interval {:?}",
                interval,
                game.session().level,
                config.poll_interval
            );
            warned_fast = true;
        }
        if now.duration_since(last_fall) > interval {
            game.apply(tetris::Action::Down);
            last_fall = now;
            dirty = true;
        }

        if dirty {
            redraw(terminal, |f| ui::draw_tetris(f, game, theme, None, Instant::now()))?;
        }
        std::thread::sleep(config.poll_interval);
    }

    let mut fade = GameOverFade::default();
    let until = Instant::now() + config.game_over_pause;
    loop {
        let now = Instant::now();
        if !fade.done() {
            redraw(terminal, |f| ui::draw_tetris(f, game, theme, Some(&mut fade), now))?;
        }
        if now >= until || matches!(keys.next_command()?, Some(Command::Quit)) {
            break;
        }
        std::thread::sleep(config.poll_interval);
    }
    Ok(Ending::GameOver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Scripted;
    use crate::ui::buffer_text;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    fn terminal() -> Terminal<TestBackend> {
        Terminal::new(TestBackend::new(80, 30)).unwrap()
    }

    fn slow_config() -> TetrisConfig {
        TetrisConfig {
            drop_interval: Duration::from_secs(3600),
            poll_interval: Duration::ZERO,
            game_over_pause: Duration::ZERO,
        }
    }

    #[test]
    fn test_tiles_quit_keeps_score() {
        let mut game = twenty48::Game::new(StdRng::seed_from_u64(1));
        let mut keys = Scripted::new([
            Some(Command::Play(Direction::Left)),
            None,
            Some(Command::Play(Direction::Up)),
            Some(Command::Quit),
            Some(Command::Play(Direction::Down)),
        ]);
        let mut term = terminal();
        let ending = run_tiles(&mut term, &mut keys, &mut game, &Theme::default()).unwrap();
        assert_eq!(ending, Ending::Quit);
        assert!(!game.session().is_over());
        let text = buffer_text(term.backend().buffer());
        assert!(text.contains(&format!("{} pts", game.session().score)));
    }

    #[test]
    fn test_tiles_win_waits_for_a_key() {
        let board = twenty48::Board::from_rows([
            [1024, 1024, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]);
        let mut game = twenty48::Game::from_board(board, StdRng::seed_from_u64(1));
        let mut keys = Scripted::new([
            Some(Command::Play(Direction::Right)),
            Some(Command::Play(Direction::Left)),
        ]);
        let mut term = terminal();
        let ending = run_tiles(&mut term, &mut keys, &mut game, &Theme::default()).unwrap();
        assert_eq!(ending, Ending::Won);
        assert_eq!(game.session().score, 2048);
        // The extra key only dismissed the final screen.
        assert_eq!(game.board().rows()[0][3], 2048);
        let text = buffer_text(term.backend().buffer());
        assert!(text.contains("Winner winner chicken dinner!"));
    }

    #[test]
    fn test_tetris_quit_before_game_over() {
        let mut game = tetris::Game::new(StdRng::seed_from_u64(9));
        let mut keys = Scripted::new([
            Some(Command::Play(tetris::Action::Left)),
            None,
            Some(Command::Play(tetris::Action::Rotate)),
            Some(Command::Quit),
        ]);
        let mut term = terminal();
        let ending =
            run_tetris(&mut term, &mut keys, &mut game, &Theme::default(), &slow_config()).unwrap();
        assert_eq!(ending, Ending::Quit);
        assert!(!game.is_over());
        assert_eq!(game.session().score, 0);
    }

    #[test]
    fn test_tetris_stacking_drops_ends_game() {
        let mut game = tetris::Game::new(StdRng::seed_from_u64(5));
        let mut keys = Scripted::new((0..200).map(|_| Some(Command::Play(tetris::Action::Drop))));
        let mut term = terminal();
        let ending =
            run_tetris(&mut term, &mut keys, &mut game, &Theme::default(), &slow_config()).unwrap();
        assert_eq!(ending, Ending::GameOver);
        assert!(game.is_over());
        let text = buffer_text(term.backend().buffer());
        assert!(text.contains("GAME OVER!"));
        assert!(text.contains("Final Score: 0"));
    }

    #[test]
    fn test_tetris_timer_drops_piece() {
        let mut game = tetris::Game::new(StdRng::seed_from_u64(2));
        let start_y = game.piece().y;
        let config = TetrisConfig {
            drop_interval: Duration::ZERO,
            ..slow_config()
        };
        // Each idle iteration triggers one timed fall.
        let mut keys = Scripted::new([None, None, None, Some(Command::Quit)]);
        let mut term = terminal();
        run_tetris(&mut term, &mut keys, &mut game, &Theme::default(), &config).unwrap();
        assert!(game.piece().y > start_y);
    }
}
