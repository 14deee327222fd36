use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::songs::difficulty_color;
use crate::catalog::Song;
use crate::tui::{App, Tone};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(song) = &app.selected_song else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Song Detail ");
        let paragraph = Paragraph::new("No song selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Header info
            Constraint::Min(0),    // Sections
        ])
        .split(area);

    draw_header(f, app, song, chunks[0]);
    draw_sections(f, app, song, chunks[1]);
}

fn draw_header(f: &mut Frame, app: &App, song: &Song, area: Rect) {
    let status = if app.is_unlocked(song) {
        Span::styled("Unlocked", Style::default().fg(Color::Green))
    } else {
        let (have, need) = app.gate.progress(&app.record);
        Span::styled(
            format!("Locked ({have}/{need} XP from starter songs)"),
            Style::default().fg(Color::Red),
        )
    };

    let mut text = vec![
        Line::from(vec![
            Span::styled("Artist: ", Style::default().fg(Color::Gray)),
            Span::styled(song.artist.as_str(), Style::default().fg(Color::White)),
            Span::raw("  "),
            Span::styled("Length: ", Style::default().fg(Color::Gray)),
            Span::styled(song.formatted_duration(), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Difficulty: ", Style::default().fg(Color::Gray)),
            Span::styled(
                song.difficulty.label(),
                Style::default().fg(difficulty_color(song.difficulty)),
            ),
            Span::raw("  "),
            Span::styled("Status: ", Style::default().fg(Color::Gray)),
            status,
        ]),
    ];

    if let Some(feedback) = &app.feedback {
        let color = match feedback.tone {
            Tone::Good => Color::Green,
            Tone::Bad => Color::Red,
            Tone::Info => Color::Cyan,
        };
        text.push(Line::from(Span::styled(
            feedback.message.as_str(),
            Style::default().fg(color),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", song.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_sections(f: &mut Frame, app: &App, song: &Song, area: Rect) {
    let items: Vec<ListItem> = song
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| {
            let done = app.record.is_section_completed(&song.id, &section.id);
            let (marker, color) = if done {
                ("✓", Color::Green)
            } else {
                ("•", Color::DarkGray)
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", marker), Style::default().fg(color)),
                Span::styled(
                    format!("{}. {:<16}", i + 1, section.title),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{} blanks", section.blank_count()),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Sections ({}/{}) ",
            app.record.completed_count(&song.id),
            song.total_sections()
        ))
        .title_style(Style::default().fg(Color::Cyan));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
