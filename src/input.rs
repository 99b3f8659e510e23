//! Key bindings and action sources: blocking reads for 2048, polling for Tetris.

use crate::{tetris, twenty48::Direction};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::marker::PhantomData;
use std::time::Duration;

/// What a key press asks for: a game action or leaving the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<A> {
    Play(A),
    Quit,
}

/// Maps key events to one game's commands. Unbound keys map to `None`.
pub trait Keymap {
    type Action: Copy;

    fn command(key: KeyEvent) -> Option<Command<Self::Action>>;
}

/// Source of player commands, independent of how the terminal is read.
pub trait ActionSource {
    type Action: Copy;

    /// Next command, or `None` when the input was unbound or nothing arrived.
    fn next_command(&mut self) -> Result<Option<Command<Self::Action>>>;
}

/// True for modifier sets we treat as a plain key.
fn plain(modifiers: KeyModifiers) -> bool {
    modifiers.is_empty() || modifiers == KeyModifiers::SHIFT
}

/// 2048: arrows or vim keys slide, q / Esc quits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileKeys;

impl Keymap for TileKeys {
    type Action = Direction;

    fn command(key: KeyEvent) -> Option<Command<Direction>> {
        let KeyEvent { code, modifiers, .. } = key;
        if !plain(modifiers) {
            return None;
        }
        let dir = match code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(Command::Quit),
            KeyCode::Up | KeyCode::Char('k') => Direction::Up,
            KeyCode::Down | KeyCode::Char('j') => Direction::Down,
            KeyCode::Left | KeyCode::Char('h') => Direction::Left,
            KeyCode::Right | KeyCode::Char('l') => Direction::Right,
            _ => return None,
        };
        Some(Command::Play(dir))
    }
}

/// Tetris: WASD + space (any case) or arrows + Enter; q / Esc quits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TetrisKeys;

impl Keymap for TetrisKeys {
    type Action = tetris::Action;

    fn command(key: KeyEvent) -> Option<Command<tetris::Action>> {
        use tetris::Action;

        let KeyEvent { code, modifiers, .. } = key;
        if !plain(modifiers) {
            return None;
        }
        let code = match code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        let action = match code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(Command::Quit),
            KeyCode::Char('a') | KeyCode::Left => Action::Left,
            KeyCode::Char('d') | KeyCode::Right => Action::Right,
            KeyCode::Char('s') | KeyCode::Down => Action::Down,
            KeyCode::Char('w') | KeyCode::Up => Action::Rotate,
            KeyCode::Char(' ') | KeyCode::Enter => Action::Drop,
            _ => return None,
        };
        Some(Command::Play(action))
    }
}

/// Only key presses count; releases and repeats (reported on some platforms) are dropped.
fn pressed_key(ev: Event) -> Option<KeyEvent> {
    match ev {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(key),
        _ => None,
    }
}

/// Waits for the next key press.
#[derive(Debug, Default)]
pub struct BlockingKeys<K> {
    _keys: PhantomData<K>,
}

impl<K> BlockingKeys<K> {
    pub fn new() -> Self {
        Self { _keys: PhantomData }
    }
}

impl<K: Keymap> ActionSource for BlockingKeys<K> {
    type Action = K::Action;

    fn next_command(&mut self) -> Result<Option<Command<K::Action>>> {
        loop {
            if let Some(key) = pressed_key(event::read()?) {
                return Ok(K::command(key));
            }
        }
    }
}

/// Returns immediately; `None` when no key is waiting.
#[derive(Debug, Default)]
pub struct PolledKeys<K> {
    _keys: PhantomData<K>,
}

impl<K> PolledKeys<K> {
    pub fn new() -> Self {
        Self { _keys: PhantomData }
    }
}

impl<K: Keymap> ActionSource for PolledKeys<K> {
    type Action = K::Action;

    fn next_command(&mut self) -> Result<Option<Command<K::Action>>> {
        // Drain non-key events so a resize does not hide a queued key press.
        while event::poll(Duration::ZERO)? {
            if let Some(key) = pressed_key(event::read()?) {
                return Ok(K::command(key));
            }
        }
        Ok(None)
    }
}

/// Replays a fixed list of commands, then reports quit. Used to drive the
/// game loops without a terminal.
#[cfg(test)]
#[derive(Debug)]
pub struct Scripted<A> {
    commands: std::collections::VecDeque<Option<Command<A>>>,
}

#[cfg(test)]
impl<A: Copy> Scripted<A> {
    pub fn new(commands: impl IntoIterator<Item = Option<Command<A>>>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl<A: Copy> ActionSource for Scripted<A> {
    type Action = A;

    fn next_command(&mut self) -> Result<Option<Command<A>>> {
        Ok(self.commands.pop_front().unwrap_or(Some(Command::Quit)))
    }
}
