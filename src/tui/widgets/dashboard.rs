use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::{countdown, progress_bar};
use crate::achievements::unlocked_ratio;
use crate::models::{Achievement, MAX_HEARTS};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Stats + hearts row
            Constraint::Min(0),    // Achievements
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_stats(f, app, top_chunks[0]);
    draw_hearts(f, app, top_chunks[1]);
    draw_achievements(f, app, chunks[1]);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let record = &app.record;
    let needed = record.xp_for_next_level();
    let xp_fraction = if needed == 0 {
        0.0
    } else {
        record.total_xp as f64 / needed as f64
    };
    let (proxy, required) = app.gate.progress(record);

    let text = vec![
        Line::from(vec![
            Span::styled("Level: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", record.current_level),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("XP: ", Style::default().fg(Color::Gray)),
            Span::styled(progress_bar(xp_fraction, 12), Style::default().fg(Color::Green)),
            Span::styled(
                format!(" {}/{}", record.total_xp, needed),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Streak: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} days", record.streak),
                Style::default().fg(if record.streak > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Score: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", record.total_score),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(vec![
            Span::styled("Sections: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} completed, {} perfect",
                    record.total_completed_sections(),
                    record.perfect_sections
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Unlock: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{proxy}/{required} XP"),
                Style::default().fg(if proxy >= required {
                    Color::Green
                } else {
                    Color::DarkGray
                }),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Progress ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_hearts(f: &mut Frame, app: &App, area: Rect) {
    let hearts = app.record.hearts.min(MAX_HEARTS) as usize;
    let row = format!(
        "{}{}",
        "♥".repeat(hearts),
        "·".repeat(MAX_HEARTS as usize - hearts)
    );

    let status = match app.next_heart_in {
        Some(wait) => Line::from(vec![
            Span::styled("Next heart in ", Style::default().fg(Color::Gray)),
            Span::styled(countdown(wait), Style::default().fg(Color::Yellow)),
        ]),
        None => Line::from(Span::styled("Full", Style::default().fg(Color::Green))),
    };

    let text = vec![
        Line::from(Span::styled(row, Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            format!("{}/{}", hearts, MAX_HEARTS),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        status,
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Hearts ")
        .title_style(Style::default().fg(Color::Red));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn achievement_color(achievement: Achievement) -> Color {
    match achievement.color() {
        "warning" => Color::Yellow,
        "error" => Color::Red,
        "primary" => Color::Blue,
        "accent" => Color::Magenta,
        "success" => Color::Green,
        _ => Color::White,
    }
}

fn draw_achievements(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = Achievement::ALL
        .iter()
        .map(|&achievement| {
            let unlocked = app.record.has_achievement(achievement);
            let (marker, title_style) = if unlocked {
                (
                    "✓ ",
                    Style::default()
                        .fg(achievement_color(achievement))
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default().fg(Color::DarkGray))
            };
            let fresh = app.recent_unlocks.contains(&achievement);

            let mut spans = vec![
                Span::styled(marker, Style::default().fg(Color::Green)),
                Span::styled(format!("{:<18}", achievement.title()), title_style),
                Span::styled(achievement.description(), Style::default().fg(Color::Gray)),
            ];
            if fresh {
                spans.push(Span::styled(" new!", Style::default().fg(Color::Yellow)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Achievements ({:.0}%) ",
            unlocked_ratio(&app.record) * 100.0
        ))
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
