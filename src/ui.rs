pub mod screen;
pub mod tables;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;
use webbrowser::Browser;

use quizr::app::App;
use quizr::history::format_duration;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const LOW_TIME_SECS: u32 = 10;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn render_status(app: &App, f: &mut Frame, area: Rect) {
    if let Some(status) = &app.status {
        let widget = Paragraph::new(Span::styled(
            status.as_str(),
            Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        f.render_widget(widget, area);
    }
}

pub fn render_menu(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // user
            Constraint::Min(3),    // quizzes
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(f.area());

    let user_line = Paragraph::new(Line::from(vec![
        Span::styled(app.user.name.as_str(), bold().fg(Color::Cyan)),
        Span::raw(format!(
            "   {} pts   {} quizzes   referral {}",
            app.user.points, app.user.total_quizzes, app.user.referral_code
        )),
    ]))
    .block(Block::default().borders(Borders::ALL).title("quizr"))
    .alignment(Alignment::Center);
    f.render_widget(user_line, chunks[0]);

    let mut last_category: Option<&str> = None;
    let items: Vec<ListItem> = app
        .entries
        .iter()
        .map(|entry| {
            let category = if last_category != Some(entry.category.as_str()) {
                last_category = Some(entry.category.as_str());
                entry.category.as_str()
            } else {
                ""
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<20}", category), dim_bold()),
                Span::styled(format!("{:<28}", entry.title), bold()),
                Span::raw(format!(
                    "{:>2} questions  {:>2} min  {:>3} pts",
                    entry.questions, entry.time_limit_minutes, entry.points_reward
                )),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Quizzes"))
        .highlight_style(bold().fg(Color::Green))
        .highlight_symbol("› ");
    let mut state = ListState::default().with_selected(Some(app.menu_cursor));
    f.render_stateful_widget(list, chunks[1], &mut state);

    render_status(app, f, chunks[2]);

    let legend = Paragraph::new(Span::styled(
        "(↑/↓) choose / (enter) play / (l)eaderboard / (h)istory / (esc)ape",
        italic(),
    ));
    f.render_widget(legend, chunks[3]);
}

pub fn render_quiz(app: &App, f: &mut Frame) {
    let Some(session) = app.session.as_ref() else {
        return;
    };
    let area = f.area();
    let question = session.current_question();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_lines =
        ((question.prompt.width() as f64 / max_chars_per_line as f64).ceil() as u16).max(1);
    let option_lines = question.options.len() as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // progress + timer
            Constraint::Length(1), // padding
            Constraint::Length(prompt_lines),
            Constraint::Length(1), // padding
            Constraint::Length(option_lines),
            Constraint::Min(0),
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[0]);

    let progress = Paragraph::new(Span::styled(
        format!(
            "{}  ·  question {}/{}",
            session.quiz().title,
            session.current_index() + 1,
            session.quiz().question_count()
        ),
        dim_bold(),
    ));
    f.render_widget(progress, header[0]);

    let time_style = if session.time_left() <= LOW_TIME_SECS {
        bold().fg(Color::Red)
    } else {
        dim_bold()
    };
    let timer = Paragraph::new(Span::styled(format_duration(session.time_left()), time_style))
        .alignment(Alignment::Right);
    f.render_widget(timer, header[1]);

    let prompt = Paragraph::new(Span::styled(question.prompt.as_str(), bold()))
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true });
    f.render_widget(prompt, chunks[2]);

    let selected = session.selected_for_current();
    let options: Vec<Line> = question
        .options
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            let marker = if idx == app.option_cursor { "› " } else { "  " };
            let style = if selected == Some(idx) {
                bold().fg(Color::Green)
            } else if idx == app.option_cursor {
                bold()
            } else {
                dim_bold()
            };
            Line::from(Span::styled(format!("{}{}. {}", marker, idx + 1, option), style))
        })
        .collect();
    f.render_widget(Paragraph::new(options), chunks[4]);

    render_status(app, f, chunks[6]);

    let next = if session.is_last_question() {
        "finish"
    } else {
        "next"
    };
    let legend = Paragraph::new(Span::styled(
        format!("(1-9) answer / (↑/↓) move / (enter) {} / (esc) abandon", next),
        italic(),
    ));
    f.render_widget(legend, chunks[7]);
}

pub fn render_results(app: &App, f: &mut Frame) {
    let Some(result) = app.last_result.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // headline
            Constraint::Length(1), // points + time
            Constraint::Length(1), // totals
            Constraint::Length(1), // padding
            Constraint::Min(1),    // review
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(f.area());

    let headline_style = if result.is_perfect() {
        bold().fg(Color::Green)
    } else {
        bold()
    };
    let headline = Paragraph::new(Span::styled(
        format!(
            "{}/{} correct   {}%",
            result.score,
            result.total_questions,
            result.accuracy()
        ),
        headline_style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(headline, chunks[0]);

    let earned = Paragraph::new(Span::styled(
        format!(
            "+{} points   {} taken",
            result.points_earned,
            format_duration(result.time_taken_secs)
        ),
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(earned, chunks[1]);

    let totals = Paragraph::new(Span::styled(
        format!(
            "{}: {} pts over {} quizzes",
            app.user.name, app.user.points, app.user.total_quizzes
        ),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(totals, chunks[2]);

    if let Some(session) = app.session.as_ref() {
        let mut lines = Vec::new();
        for (idx, question) in session.quiz().questions.iter().enumerate() {
            let chosen = session.selected_for(idx);
            let correct = chosen.is_some_and(|answer| question.is_correct(answer));
            let (mark, style) = if correct {
                ("✓", Style::default().fg(Color::Green))
            } else {
                ("✗", Style::default().fg(Color::Red))
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{} ", mark), style.add_modifier(Modifier::BOLD)),
                Span::styled(question.prompt.as_str(), bold()),
            ]));
            let answer = chosen
                .and_then(|o| question.options.get(o))
                .map(String::as_str)
                .unwrap_or("no answer");
            let mut detail = format!("   your answer: {}", answer);
            if !correct {
                detail.push_str(&format!(
                    "   correct: {}",
                    question.correct_option().unwrap_or("?")
                ));
            }
            lines.push(Line::from(Span::styled(detail, dim_bold())));
            if let Some(explanation) = &question.explanation {
                lines.push(Line::from(Span::styled(format!("   {}", explanation), italic())));
            }
        }
        let review = Paragraph::new(lines)
            .block(Block::default().borders(Borders::TOP).title("Review"))
            .wrap(Wrap { trim: false });
        f.render_widget(review, chunks[4]);
    }

    render_status(app, f, chunks[5]);

    let legend = Paragraph::new(Span::styled(
        String::from(if Browser::is_available() {
            "(r)etry / (m)enu / (l)eaderboard / (h)istory / (t)weet / (esc)ape"
        } else {
            "(r)etry / (m)enu / (l)eaderboard / (h)istory / (esc)ape"
        }),
        italic(),
    ));
    f.render_widget(legend, chunks[6]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use quizr::catalog::{BundledCatalog, QuizSource};
    use quizr::config::Config;
    use quizr::store::MemoryUserStore;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::mpsc;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::channel();
        let categories = BundledCatalog::load().unwrap().categories().unwrap();
        App::new(
            Config::default(),
            categories,
            Box::new(MemoryUserStore::new()),
            tx,
        )
        .unwrap()
    }

    fn rendered(app: &App, draw: fn(&App, &mut Frame)) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn menu_lists_bundled_quizzes() {
        let app = test_app();
        let text = rendered(&app, render_menu);
        assert!(text.contains("Everyday Trivia"));
        assert!(text.contains("Player"));
    }

    #[test]
    fn quiz_screen_shows_prompt_and_timer() {
        let mut app = test_app();
        app.start_quiz("1");
        let text = rendered(&app, render_quiz);
        assert!(text.contains("question 1/3"));
        assert!(text.contains("10:00"));
        assert!(text.contains("How many continents"));
        app.abandon();
    }

    #[test]
    fn results_screen_shows_score() {
        let mut app = test_app();
        app.start_quiz("1");
        for _ in 0..3 {
            app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        }
        let text = rendered(&app, render_results);
        assert!(text.contains("correct"));
        assert!(text.contains("points"));
        assert!(text.contains("Review"));
    }
}
