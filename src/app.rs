//! Terminal-independent application state: which screen is showing, the
//! session being played and the countdown that drives it.
//!
//! `main.rs` feeds events in and draws whatever this holds.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::thread_rng;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::quiz::Category;
use crate::runtime::{Countdown, QuizEvent};
use crate::scoring::QuizResult;
use crate::session::QuizSession;
use crate::store::UserStore;
use crate::user::User;

const LEADERBOARD_SIZE: usize = 10;
const HISTORY_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AppState {
    Menu,
    Playing,
    Results,
    Leaderboard,
    History,
}

/// What the outer loop should do after a key was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    None,
    Quit,
    Share(String),
}

/// One selectable row of the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub category: String,
    pub quiz_id: String,
    pub title: String,
    pub questions: usize,
    pub time_limit_minutes: u32,
    pub points_reward: u32,
}

pub struct App {
    pub config: Config,
    pub categories: Vec<Category>,
    pub entries: Vec<MenuEntry>,
    pub menu_cursor: usize,
    pub state: AppState,
    pub session: Option<QuizSession>,
    /// Option under the cursor on the quiz screen
    pub option_cursor: usize,
    pub user: User,
    pub last_result: Option<QuizResult>,
    pub leaderboard: Vec<User>,
    pub history: Vec<QuizResult>,
    /// Last error worth showing to the player
    pub status: Option<String>,
    store: Box<dyn UserStore>,
    countdown: Option<Countdown>,
    epoch: u64,
    ticks: Sender<QuizEvent>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("state", &self.state)
            .field("user", &self.user)
            .field("session", &self.session)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl App {
    pub fn new(
        config: Config,
        categories: Vec<Category>,
        mut store: Box<dyn UserStore>,
        ticks: Sender<QuizEvent>,
    ) -> crate::error::StoreResult<Self> {
        let user = store.identify(&config.user_id, &config.display_name)?;
        let entries = categories
            .iter()
            .flat_map(|c| {
                c.quizzes.iter().map(move |q| MenuEntry {
                    category: c.name.clone(),
                    quiz_id: q.id.clone(),
                    title: q.title.clone(),
                    questions: q.questions.len(),
                    time_limit_minutes: q.time_limit_minutes,
                    points_reward: q.points_reward,
                })
            })
            .collect();

        Ok(Self {
            config,
            categories,
            entries,
            menu_cursor: 0,
            state: AppState::Menu,
            session: None,
            option_cursor: 0,
            user,
            last_result: None,
            leaderboard: Vec::new(),
            history: Vec::new(),
            status: None,
            store,
            countdown: None,
            epoch: 0,
            ticks,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    pub fn countdown_running(&self) -> bool {
        self.countdown.as_ref().is_some_and(Countdown::is_running)
    }

    /// Begin a fresh attempt at `quiz_id`
    pub fn start_quiz(&mut self, quiz_id: &str) {
        let Some(quiz) = self
            .categories
            .iter()
            .flat_map(|c| c.quizzes.iter())
            .find(|q| q.id == quiz_id)
            .cloned()
        else {
            self.status = Some(format!("quiz {quiz_id} not found"));
            return;
        };

        let quiz = if self.config.shuffle_questions {
            quiz.shuffled(&mut thread_rng())
        } else {
            quiz
        };

        self.stop_countdown();
        match QuizSession::start_with_clock(quiz, self.user.id.clone(), self.clock.clone()) {
            Ok(session) => {
                self.epoch += 1;
                self.countdown = Some(Countdown::every_second(self.ticks.clone(), self.epoch));
                self.session = Some(session);
                self.option_cursor = 0;
                self.status = None;
                self.state = AppState::Playing;
            }
            Err(err) => {
                warn!(quiz = quiz_id, error = %err, "could not start session");
                self.status = Some(err.to_string());
            }
        }
    }

    pub fn on_tick(&mut self, epoch: u64) {
        if self.state != AppState::Playing || epoch != self.epoch {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.on_tick() {
            Ok(Some(result)) => self.complete(result),
            Ok(None) => {}
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.abandon();
            return AppAction::Quit;
        }

        match self.state {
            AppState::Menu => self.on_menu_key(key.code),
            AppState::Playing => {
                self.on_playing_key(key.code);
                AppAction::None
            }
            AppState::Results => self.on_results_key(key.code),
            AppState::Leaderboard | AppState::History => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Enter
                ) {
                    self.state = AppState::Menu;
                }
                AppAction::None
            }
        }
    }

    fn on_menu_key(&mut self, code: KeyCode) -> AppAction {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Up | KeyCode::Char('k') => {
                self.menu_cursor = self.menu_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.menu_cursor + 1 < self.entries.len() {
                    self.menu_cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(entry) = self.entries.get(self.menu_cursor) {
                    let id = entry.quiz_id.clone();
                    self.start_quiz(&id);
                }
            }
            KeyCode::Char('l') => self.show_leaderboard(),
            KeyCode::Char('h') => self.show_history(),
            _ => {}
        }
        AppAction::None
    }

    fn on_playing_key(&mut self, code: KeyCode) {
        let Some(session) = self.session.as_mut() else {
            self.state = AppState::Menu;
            return;
        };
        let options = session.current_question().options.len();

        let outcome = match code {
            KeyCode::Esc => {
                self.abandon();
                return;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.option_cursor = self.option_cursor.saturating_sub(1);
                Ok(None)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.option_cursor + 1 < options {
                    self.option_cursor += 1;
                }
                Ok(None)
            }
            KeyCode::Char(' ') => session.select(self.option_cursor).map(|_| None),
            KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                let option = c as usize - '1' as usize;
                if option < options {
                    self.option_cursor = option;
                    session.select(option).map(|_| None)
                } else {
                    Ok(None)
                }
            }
            KeyCode::Enter | KeyCode::Right => {
                // Enter on a highlighted option with no selection picks it
                if code == KeyCode::Enter && session.selected_for_current().is_none() {
                    if let Err(err) = session.select(self.option_cursor) {
                        self.status = Some(err.to_string());
                        return;
                    }
                }
                let result = session.advance();
                if matches!(result, Ok(None)) {
                    self.option_cursor = session.selected_for_current().unwrap_or(0);
                }
                result
            }
            _ => Ok(None),
        };

        match outcome {
            Ok(Some(result)) => self.complete(result),
            Ok(None) => {}
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn on_results_key(&mut self, code: KeyCode) -> AppAction {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Char('r') => {
                if let Some(result) = &self.last_result {
                    let id = result.quiz_id.clone();
                    self.start_quiz(&id);
                }
            }
            KeyCode::Char('m') | KeyCode::Enter => self.state = AppState::Menu,
            KeyCode::Char('l') => self.show_leaderboard(),
            KeyCode::Char('h') => self.show_history(),
            KeyCode::Char('t') => {
                if let Some(url) = self.share_url() {
                    return AppAction::Share(url);
                }
            }
            _ => {}
        }
        AppAction::None
    }

    /// Persist a finished session's result and show it
    fn complete(&mut self, result: QuizResult) {
        self.stop_countdown();
        match self.store.record_result(&result) {
            Ok(user) => {
                info!(user = %user.id, points = user.points, "points awarded");
                self.user = user;
            }
            Err(err) => {
                warn!(error = %err, "could not record result");
                self.status = Some(err.to_string());
            }
        }
        self.last_result = Some(result);
        self.state = AppState::Results;
    }

    /// Leave the running session without a result
    pub fn abandon(&mut self) {
        self.stop_countdown();
        if let Some(session) = self.session.take() {
            if !session.is_finished() {
                info!(quiz = %session.quiz().id, "session abandoned");
            }
        }
        if self.state == AppState::Playing {
            self.state = AppState::Menu;
        }
    }

    fn stop_countdown(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.cancel();
        }
    }

    pub fn show_leaderboard(&mut self) {
        match self.store.leaderboard(LEADERBOARD_SIZE) {
            Ok(users) => self.leaderboard = users,
            Err(err) => self.status = Some(err.to_string()),
        }
        self.state = AppState::Leaderboard;
    }

    pub fn show_history(&mut self) {
        match self.store.results_for(&self.user.id, HISTORY_SIZE) {
            Ok(results) => self.history = results,
            Err(err) => self.status = Some(err.to_string()),
        }
        self.state = AppState::History;
    }

    pub fn quiz_title(&self, quiz_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.quiz_id == quiz_id)
            .map(|e| e.title.as_str())
    }

    /// Prefilled post announcing the last result
    pub fn share_url(&self) -> Option<String> {
        let result = self.last_result.as_ref()?;
        let title = self.quiz_title(&result.quiz_id).unwrap_or("a quiz");
        let text = format!(
            "I scored {}/{} on {} and earned {} points! Referral code: {}",
            result.score, result.total_questions, title, result.points_earned, self.user.referral_code
        );
        Some(format!(
            "https://twitter.com/intent/tweet?text={}",
            encode_component(&text)
        ))
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.stop_countdown();
    }
}

fn encode_component(text: &str) -> String {
    text.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
