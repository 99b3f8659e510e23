//! Layout and drawing: 2048 tiles, Tetris playfield, next preview, stats, end panels.

use crate::tetris::{self, Cell, HEIGHT, Piece, Tetromino, WIDTH};
use crate::theme::Theme;
use crate::twenty48::{self, Board, SIZE, Status};
use rand::Rng;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// 2048 tile size in terminal cells.
const TILE_W: u16 = 7;
const TILE_H: u16 = 3;

/// Tetris cell: glyph plus a spacer column.
const CELL_W: u16 = 2;
const SIDEBAR_WIDTH: u16 = 14;
/// Duration of the game-over fade of the playfield.
const GAME_OVER_FADE_MS: u32 = 800;

const TETRIS_CONTROLS: &str =
    "Controls: A - left, D - right, S - down, W - rotate, SPACE - drop, Q - quit";

/// `w` x `h` rect centered in `area`, clipped to it.
fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn bold(style: Style) -> Style {
    style.add_modifier(Modifier::BOLD)
}

fn tile_label(value: u32) -> String {
    if value == 0 {
        ".".to_string()
    } else {
        value.to_string()
    }
}

/// Draw the 2048 board: header with score, 4x4 coloured tiles, key hint and end status.
pub fn draw_tiles(frame: &mut Frame, board: &Board, session: twenty48::Session, theme: &Theme) {
    let width = TILE_W * SIZE as u16;
    let pts = format!("{} pts", session.score);
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{:<w$}", "2048", w = (width as usize).saturating_sub(pts.len())),
                bold(Style::default().fg(theme.title)),
            ),
            Span::styled(pts, bold(Style::default().fg(theme.main_fg))),
        ]),
        Line::from(""),
    ];

    for row in board.rows() {
        for band in 0..TILE_H {
            let spans: Vec<Span> = row
                .iter()
                .map(|&v| {
                    let text = if band == TILE_H / 2 {
                        format!("{:^w$}", tile_label(v), w = TILE_W as usize)
                    } else {
                        " ".repeat(TILE_W as usize)
                    };
                    Span::styled(text, Style::default().fg(theme.tile_fg).bg(theme.tile_color(v)))
                })
                .collect();
            lines.push(Line::from(spans));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("{:^w$}", "←,↑,→,↓ or q", w = width as usize),
        Style::default().fg(theme.inactive_fg),
    )));

    match session.status {
        Status::Playing => {}
        Status::Won => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Winner winner chicken dinner!",
                bold(Style::default().fg(Color::Green)),
            )));
        }
        Status::Lost => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "GAME OVER",
                bold(Style::default().fg(Color::Red)),
            )));
        }
    }
    if session.is_over() {
        lines.push(Line::from(Span::styled(
            "press any key",
            Style::default().fg(theme.inactive_fg),
        )));
    }

    let height = lines.len() as u16;
    let rect = centered(frame.area(), width.max(29), height);
    frame.render_widget(Paragraph::new(lines), rect);
}

/// Fade state for the Tetris game-over pause.
#[derive(Default)]
pub struct GameOverFade {
    effect: Option<Effect>,
    last_frame: Option<Instant>,
}

impl GameOverFade {
    pub fn done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }
}

/// Fade the playfield toward the background; created on first call.
fn apply_game_over_effect(
    frame: &mut Frame,
    board_rect: Rect,
    theme: &Theme,
    fade: &mut GameOverFade,
    now: Instant,
) {
    let delta = fade
        .last_frame
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    fade.last_frame = Some(now);

    let effect = fade.effect.get_or_insert_with(|| {
        fx::fade_to(
            theme.inactive_fg,
            theme.bg,
            (GAME_OVER_FADE_MS, Interpolation::Linear),
        )
    });
    frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
}

/// Playfield rect (with border) and sidebar rect for a given screen area.
fn tetris_layout(area: Rect) -> (Rect, Rect) {
    let pw = WIDTH as u16 * CELL_W + 2;
    let ph = HEIGHT as u16 + 2;
    let outer = centered(area, pw + SIDEBAR_WIDTH, ph + 2);
    let playfield = Rect {
        width: pw.min(outer.width),
        height: ph.min(outer.height),
        ..outer
    };
    let sidebar = Rect {
        x: outer.x + playfield.width,
        y: outer.y,
        width: outer.width.saturating_sub(playfield.width),
        height: playfield.height,
    };
    (playfield, sidebar)
}

/// Draw Tetris: playfield with the live piece, next preview, stats, controls,
/// and on game over the faded board under a final-score panel.
pub fn draw_tetris<R: Rng>(
    frame: &mut Frame,
    game: &tetris::Game<R>,
    theme: &Theme,
    fade: Option<&mut GameOverFade>,
    now: Instant,
) {
    let area = frame.area();
    let (playfield_area, sidebar_area) = tetris_layout(area);
    let session = game.session();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Tetris ", theme.title));
    let inner = block.inner(playfield_area);
    frame.render_widget(block, playfield_area);

    let live = (!session.game_over).then(|| *game.piece());
    draw_playfield(frame, game.playfield(), live.as_ref(), theme, inner);
    draw_sidebar(frame, game.next(), theme, sidebar_area);

    let footer = Rect {
        x: area.x,
        y: playfield_area.y + playfield_area.height,
        width: area.width,
        height: 2u16.min(area.height.saturating_sub(playfield_area.y + playfield_area.height - area.y)),
    };
    let footer_lines = vec![
        Line::from(Span::styled(
            format!(
                "Score: {} | Level: {} | Lines: {}",
                session.score, session.level, session.lines_cleared
            ),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(TETRIS_CONTROLS, Style::default().fg(theme.inactive_fg))),
    ];
    frame.render_widget(Paragraph::new(footer_lines).alignment(Alignment::Center), footer);

    if session.game_over {
        if let Some(fade) = fade {
            apply_game_over_effect(frame, inner, theme, fade, now);
        }
        draw_game_over(frame, session, theme, playfield_area);
    }
}

fn draw_playfield(
    frame: &mut Frame,
    field: &tetris::Playfield,
    piece: Option<&Piece>,
    theme: &Theme,
    rect: Rect,
) {
    let buf = frame.buffer_mut();
    let mut put = |x: usize, y: usize, cell: Cell| {
        let rx = rect.x + x as u16 * CELL_W;
        let ry = rect.y + y as u16;
        if rx + CELL_W > rect.x + rect.width || ry >= rect.y + rect.height {
            return;
        }
        let (symbol, style) = match cell {
            Cell::Empty => ("  ", Style::default().bg(theme.bg)),
            Cell::Block(tint) => ("■ ", Style::default().fg(theme.piece_color(tint)).bg(theme.bg)),
        };
        buf.set_string(rx, ry, symbol, style);
    };

    for (y, row) in field.rows().enumerate() {
        for (x, &cell) in row.iter().enumerate() {
            put(x, y, cell);
        }
    }
    if let Some(piece) = piece {
        for (x, y) in piece.cells() {
            if x >= 0 && y >= 0 && (x as usize) < WIDTH && (y as usize) < HEIGHT {
                put(x as usize, y as usize, Cell::Block(piece.tint()));
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, next: Tetromino, theme: &Theme, area: Rect) {
    if area.width < 2 || area.height < 2 {
        return;
    }
    let x0 = area.x + 2;
    let title = Rect { x: x0, y: area.y + 1, width: area.width - 2, height: 1 };
    frame.render_widget(
        Paragraph::new(Span::styled("Next:", theme.title)),
        title,
    );

    let shape = next.shape();
    let style = Style::default().fg(theme.piece_color(next.tint())).bg(theme.bg);
    let buf = frame.buffer_mut();
    for (x, y) in shape.cells() {
        let rx = x0 + x as u16 * CELL_W;
        let ry = area.y + 2 + y as u16;
        if rx + CELL_W <= area.x + area.width && ry < area.y + area.height {
            buf.set_string(rx, ry, "■ ", style);
        }
    }
}

fn draw_game_over(frame: &mut Frame, session: tetris::Session, theme: &Theme, playfield: Rect) {
    let popup = centered(playfield, 20, 5);
    let lines = vec![
        Line::from(Span::styled(
            " GAME OVER! ",
            bold(Style::default().fg(Color::White).bg(Color::Red)),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Final Score: {}", session.score),
            Style::default().fg(theme.main_fg),
        )),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        ),
        popup,
    );
}

#[cfg(test)]
pub(crate) fn buffer_text(buf: &ratatui::buffer::Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            out.push_str(buf[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}
