use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::{countdown, progress_bar, stars};
use crate::session::{GameSession, LyricSlot, Phase};
use crate::tui::{App, Tone};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(session) = &app.session else {
        let block = Block::default().borders(Borders::ALL).title(" Play ");
        let paragraph = Paragraph::new("No song playing").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Playback
            Constraint::Min(5),    // Lyrics
            Constraint::Length(3), // Candidates
            Constraint::Length(4), // Feedback / result
        ])
        .split(area);

    draw_playback(f, session, chunks[0]);
    draw_lyrics(f, session, chunks[1]);
    draw_candidates(f, app, session, chunks[2]);
    draw_status(f, app, session, chunks[3]);
}

fn draw_playback(f: &mut Frame, session: &GameSession, area: Rect) {
    let state = if session.is_playing() {
        "▶"
    } else if session.reached_end() {
        "■"
    } else {
        "⏸"
    };
    let width = area.width.saturating_sub(8) as usize;

    let line = Line::from(vec![
        Span::styled(format!("{state} "), Style::default().fg(Color::Cyan)),
        Span::styled(
            progress_bar(session.playback_progress(), width),
            Style::default().fg(Color::Blue),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " {} · {} ({}/{}) ",
            session.song().title,
            session.section().title,
            session.section_index() + 1,
            session.song().total_sections()
        ))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_lyrics(f: &mut Frame, session: &GameSession, area: Rect) {
    let mut spans = Vec::new();
    for slot in session.lyric_view() {
        let span = match slot {
            LyricSlot::Word(word) => Span::styled(word, Style::default().fg(Color::White)),
            LyricSlot::Filled(word) => Span::styled(
                word,
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            LyricSlot::Blank { current: true } => Span::styled(
                "_____",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::UNDERLINED),
            ),
            LyricSlot::Blank { current: false } => {
                Span::styled("_____", Style::default().fg(Color::DarkGray))
            }
        };
        spans.push(span);
        spans.push(Span::raw(" "));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Lyrics {} ",
            progress_bar(session.progress(), 10)
        ))
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_candidates(f: &mut Frame, app: &App, session: &GameSession, area: Rect) {
    let answering = session.phase() == Phase::Answering;
    let mut spans = Vec::new();

    for (i, word) in session.candidates().iter().enumerate() {
        let style = if answering && i == app.candidate_cursor {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if answering {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {}:{} ", i + 1, word), style));
        spans.push(Span::raw(" "));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Words ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(
        Paragraph::new(Line::from(spans))
            .block(block)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_status(f: &mut Frame, app: &App, session: &GameSession, area: Rect) {
    let mut lines = Vec::new();

    if let Some(feedback) = &app.feedback {
        let color = match feedback.tone {
            Tone::Good => Color::Green,
            Tone::Bad => Color::Red,
            Tone::Info => Color::Cyan,
        };
        lines.push(Line::from(Span::styled(
            feedback.message.as_str(),
            Style::default().fg(color),
        )));
    }

    if let Some(result) = session.last_result() {
        lines.push(Line::from(vec![
            Span::styled(stars(result.stars), Style::default().fg(Color::Yellow)),
            Span::styled(
                format!(
                    "  {:.0}% accuracy, {} mistakes, {}s",
                    result.accuracy * 100.0,
                    result.mistakes,
                    result.time_taken.as_secs()
                ),
                Style::default().fg(Color::Gray),
            ),
            Span::styled(
                if session.has_next_section() {
                    "  <CR> next  r replay"
                } else {
                    "  <CR> finish  r replay"
                },
                Style::default().fg(Color::Cyan),
            ),
        ]));
    } else {
        let hearts = Span::styled(
            format!("♥ {}", app.record.hearts),
            Style::default().fg(Color::Red),
        );
        let mut spans = vec![
            hearts,
            Span::styled(
                format!("  mistakes: {}", session.mistakes()),
                Style::default().fg(Color::Gray),
            ),
        ];
        if app.record.hearts == 0 {
            if let Some(wait) = app.next_heart_in {
                spans.push(Span::styled(
                    format!("  next heart in {}", countdown(wait)),
                    Style::default().fg(Color::Yellow),
                ));
            }
        }
        lines.push(Line::from(spans));
    }

    let block = Block::default().borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}
