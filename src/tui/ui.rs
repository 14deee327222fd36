use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, play, song_detail, songs};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Songs", "Play"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Songs | View::SongDetail => 1,
        View::Play => 2,
    };

    let hearts = format!(" ♥ {} ", app.record.hearts);
    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" LyricLoop ")
                .title_bottom(Line::from(hearts).right_aligned()),
        )
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Songs => songs::draw(f, app, area),
        View::SongDetail => song_detail::draw(f, app, area),
        View::Play => play::draw(f, app, area),
    }
}

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.search_mode {
        vec![
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(&app.search_input),
            Span::styled("█", Style::default().fg(Color::Yellow)),
            Span::raw(" | "),
            key("<CR>"),
            Span::raw(" Apply  "),
            key("<Esc>"),
            Span::raw(" Cancel"),
        ]
    } else {
        let mut spans = Vec::new();

        match app.view {
            View::Dashboard => {
                spans.extend(vec![
                    key("h/l"),
                    Span::raw(" Views  "),
                    key("^r"),
                    Span::raw(" Refresh  "),
                ]);
            }
            View::Songs => {
                spans.extend(vec![
                    key("h/l"),
                    Span::raw(" Views  "),
                    key("j/k"),
                    Span::raw(" Nav  "),
                    key("l/<CR>"),
                    Span::raw(" Open  "),
                    key("d"),
                    Span::raw(" Difficulty  "),
                    key("/"),
                    Span::raw(" Search  "),
                ]);
                if !app.search.is_empty() || app.filter_difficulty.is_some() {
                    spans.extend(vec![key("<Esc>"), Span::raw(" Clear  ")]);
                }
            }
            View::SongDetail => {
                spans.extend(vec![
                    key("h/<Esc>"),
                    Span::raw(" Back  "),
                    key("p/<CR>"),
                    Span::raw(" Play  "),
                ]);
            }
            View::Play => {
                spans.extend(vec![
                    key("h/l"),
                    Span::raw(" Choose  "),
                    key("<CR>/1-9"),
                    Span::raw(" Answer  "),
                    key("<Space>"),
                    Span::raw(" Play/Pause  "),
                    key("r"),
                    Span::raw(" Replay  "),
                    key("n"),
                    Span::raw(" Next  "),
                    key("<Esc>"),
                    Span::raw(" Exit  "),
                ]);
            }
        }

        if app.view != View::Play {
            spans.extend(vec![key("q"), Span::raw(" Quit")]);
        }

        spans
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
