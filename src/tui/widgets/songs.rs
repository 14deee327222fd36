use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{progress_bar, truncate};
use crate::models::Difficulty;
use crate::tui::App;

pub(crate) fn difficulty_color(difficulty: Difficulty) -> Color {
    match difficulty {
        Difficulty::Beginner => Color::Green,
        Difficulty::Intermediate => Color::Yellow,
        Difficulty::Advanced => Color::Red,
    }
}

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let mut filters = Vec::new();
    if let Some(difficulty) = app.filter_difficulty {
        filters.push(difficulty.label().to_string());
    }
    if !app.search.is_empty() {
        filters.push(format!("\"{}\"", app.search));
    }
    let title = if filters.is_empty() {
        " Songs ".to_string()
    } else {
        format!(" Songs ({}) ", filters.join(", "))
    };

    let items: Vec<ListItem> = app
        .songs
        .items
        .iter()
        .map(|song| {
            let unlocked = app.is_unlocked(song);
            let completion = app
                .record
                .completion_percentage(&song.id, song.total_sections());
            let name_style = if unlocked {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(Line::from(vec![
                Span::styled(if unlocked { "  " } else { "🔒" }, name_style),
                Span::styled(format!("{:<24}", truncate(&song.title, 22)), name_style),
                Span::styled(
                    format!("{:<18}", truncate(&song.artist, 16)),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!("{:<14}", song.difficulty.label()),
                    Style::default().fg(difficulty_color(song.difficulty)),
                ),
                Span::styled(progress_bar(completion, 5), Style::default().fg(Color::Green)),
                Span::styled(
                    format!(
                        " {}/{}",
                        app.record.completed_count(&song.id),
                        song.total_sections()
                    ),
                    Style::default().fg(Color::Yellow),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("    {:<24}", "Title"), header_style),
        Span::styled(format!("{:<18}", "Artist"), header_style),
        Span::styled(format!("{:<14}", "Difficulty"), header_style),
        Span::styled("Progress", header_style),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.songs.selected);

    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
}
