use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use quizr::app::App;
use quizr::history::{describe_age, format_duration};
use quizr::scoring::QuizResult;
use quizr::user::User;

/// Pure presenter for a single leaderboard row
pub fn present_user_row(rank: usize, user: &User, current_user: &str) -> Row<'static> {
    let rank_color = match rank {
        1 => Color::Yellow,
        2 => Color::Gray,
        3 => Color::Rgb(205, 127, 50),
        _ => Color::Reset,
    };
    let name_style = if user.id == current_user {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    Row::new(vec![
        Cell::from(format!("#{rank}"))
            .style(Style::default().fg(rank_color).add_modifier(Modifier::BOLD)),
        Cell::from(user.name.clone()).style(name_style),
        Cell::from(user.points.to_string()),
        Cell::from(user.total_quizzes.to_string()),
    ])
}

/// Pure presenter for a single history row
pub fn present_result_row(result: &QuizResult, title: &str, age: String) -> Row<'static> {
    let accuracy = result.accuracy();
    let accuracy_color = if accuracy >= 80.0 {
        Color::Green
    } else if accuracy >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(title.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}/{}", result.score, result.total_questions))
            .style(Style::default().fg(accuracy_color)),
        Cell::from(format!("+{}", result.points_earned)),
        Cell::from(format_duration(result.time_taken_secs)),
        Cell::from(age),
    ])
}

fn layout(f: &Frame) -> std::rc::Rc<[ratatui::layout::Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Table
            Constraint::Length(2), // Instructions
        ])
        .split(f.area())
}

fn header(cells: &[&'static str]) -> Row<'static> {
    Row::new(cells.iter().map(|c| Cell::from(*c)).collect::<Vec<_>>()).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn title(text: String) -> Paragraph<'static> {
    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
}

fn instructions(f: &mut Frame, area: ratatui::layout::Rect) {
    let widget = Paragraph::new("(b/esc) back to menu")
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(widget, area);
}

/// Render the leaderboard screen
pub fn render_leaderboard(app: &App, f: &mut Frame) {
    let chunks = layout(f);
    f.render_widget(title("Leaderboard".to_string()), chunks[0]);

    if app.leaderboard.is_empty() {
        let no_data = Paragraph::new("Nobody has finished a quiz yet.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let rows: Vec<Row> = app
            .leaderboard
            .iter()
            .enumerate()
            .map(|(idx, user)| present_user_row(idx + 1, user, &app.user.id))
            .collect();

        let widths = [
            Constraint::Length(6),  // Rank
            Constraint::Min(16),    // Name
            Constraint::Length(10), // Points
            Constraint::Length(10), // Quizzes
        ];

        let table = Table::new(rows, widths)
            .header(header(&["Rank", "Player", "Points", "Quizzes"]))
            .block(Block::default().borders(Borders::ALL).title("Top players"))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);
    }

    instructions(f, chunks[2]);
}

/// Render the result history of the current user
pub fn render_history(app: &App, f: &mut Frame) {
    let chunks = layout(f);
    f.render_widget(
        title(format!("{}'s recent quizzes", app.user.name)),
        chunks[0],
    );

    if app.history.is_empty() {
        let no_data = Paragraph::new("No results yet. Finish a quiz to see it here.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let now = chrono::Local::now();
        let rows: Vec<Row> = app
            .history
            .iter()
            .map(|result| {
                let quiz_title = app
                    .quiz_title(&result.quiz_id)
                    .unwrap_or(result.quiz_id.as_str());
                present_result_row(result, quiz_title, describe_age(result.completed_at, now))
            })
            .collect();

        let widths = [
            Constraint::Min(20),    // Quiz
            Constraint::Length(8),  // Score
            Constraint::Length(8),  // Points
            Constraint::Length(8),  // Time
            Constraint::Length(18), // When
        ];

        let table = Table::new(rows, widths)
            .header(header(&["Quiz", "Score", "Points", "Time", "When"]))
            .block(Block::default().borders(Borders::ALL).title("History"))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);
    }

    instructions(f, chunks[2]);
}
