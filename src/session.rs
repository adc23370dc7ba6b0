use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{SessionError, SessionResult};
use crate::quiz::{Question, Quiz};
use crate::scoring::{self, QuizResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Finished,
}

/// What the owner must do after `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to this question index
    Next(usize),
    /// The last question was passed; the session must be finished
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running(u32),
    Expired,
}

/// Mutable in-flight state of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizProgress {
    pub current_question: usize,
    pub answers: BTreeMap<usize, usize>,
    pub time_left: u32,
    pub is_active: bool,
}

/// Begin an attempt: question 0, no answers, the full time budget.
pub fn start_session(quiz: &Quiz) -> SessionResult<QuizProgress> {
    if quiz.questions.is_empty() {
        return Err(SessionError::InvalidQuiz(quiz.id.clone()));
    }

    Ok(QuizProgress {
        current_question: 0,
        answers: BTreeMap::new(),
        time_left: quiz.time_budget_secs(),
        is_active: true,
    })
}

/// Record (or replace) the option chosen for a question.
pub fn select_answer(
    progress: &mut QuizProgress,
    quiz: &Quiz,
    question_index: usize,
    option_index: usize,
) -> SessionResult<()> {
    if !progress.is_active {
        return Err(SessionError::SessionNotActive);
    }

    let question = quiz
        .questions
        .get(question_index)
        .ok_or(SessionError::QuestionOutOfRange {
            question: question_index,
            questions: quiz.questions.len(),
        })?;

    if option_index >= question.options.len() {
        return Err(SessionError::InvalidOption {
            question: question_index,
            option: option_index,
            options: question.options.len(),
        });
    }

    progress.answers.insert(question_index, option_index);
    Ok(())
}

/// Move to the next question, or report that the last one was passed.
pub fn advance(progress: &mut QuizProgress, quiz: &Quiz) -> SessionResult<Advance> {
    if !progress.is_active {
        return Err(SessionError::SessionNotActive);
    }

    if progress.current_question + 1 < quiz.questions.len() {
        progress.current_question += 1;
        Ok(Advance::Next(progress.current_question))
    } else {
        Ok(Advance::Finish)
    }
}

/// One countdown second.
pub fn tick(progress: &mut QuizProgress) -> TickOutcome {
    progress.time_left = progress.time_left.saturating_sub(1);
    if progress.time_left == 0 {
        TickOutcome::Expired
    } else {
        TickOutcome::Running(progress.time_left)
    }
}

/// Score the attempt and close it. A second call is rejected so the
/// result cannot be awarded twice.
pub fn finish_session(
    progress: &mut QuizProgress,
    quiz: &Quiz,
    user_id: &str,
    now: chrono::DateTime<chrono::Local>,
) -> SessionResult<QuizResult> {
    if !progress.is_active {
        return Err(SessionError::SessionAlreadyFinished);
    }

    let total = quiz.questions.len();
    let score = scoring::score(quiz, &progress.answers);
    let result = QuizResult {
        quiz_id: quiz.id.clone(),
        user_id: user_id.to_string(),
        score,
        total_questions: total,
        points_earned: scoring::points_earned(score, total, quiz.points_reward),
        time_taken_secs: scoring::time_taken(quiz.time_budget_secs(), progress.time_left),
        completed_at: now,
    };

    progress.is_active = false;
    Ok(result)
}

/// A quiz attempt owned by whichever screen or controller is running it
pub struct QuizSession {
    quiz: Quiz,
    user_id: String,
    progress: QuizProgress,
    result: Option<QuizResult>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz", &self.quiz.id)
            .field("user_id", &self.user_id)
            .field("progress", &self.progress)
            .field("result", &self.result)
            .finish()
    }
}

impl QuizSession {
    pub fn start(quiz: Quiz, user_id: impl Into<String>) -> SessionResult<Self> {
        Self::start_with_clock(quiz, user_id, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        quiz: Quiz,
        user_id: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> SessionResult<Self> {
        let progress = start_session(&quiz)?;
        let user_id = user_id.into();
        info!(
            quiz = %quiz.id,
            user = %user_id,
            questions = quiz.questions.len(),
            budget_secs = progress.time_left,
            "session started"
        );
        Ok(Self {
            quiz,
            user_id,
            progress,
            result: None,
            clock,
        })
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn progress(&self) -> &QuizProgress {
        &self.progress
    }

    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        if self.progress.is_active {
            SessionStatus::InProgress
        } else {
            SessionStatus::Finished
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status() == SessionStatus::Finished
    }

    pub fn time_left(&self) -> u32 {
        self.progress.time_left
    }

    pub fn current_index(&self) -> usize {
        self.progress.current_question
    }

    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.progress.current_question]
    }

    pub fn is_last_question(&self) -> bool {
        self.progress.current_question + 1 == self.quiz.questions.len()
    }

    pub fn selected_for(&self, question_index: usize) -> Option<usize> {
        self.progress.answers.get(&question_index).copied()
    }

    pub fn selected_for_current(&self) -> Option<usize> {
        self.selected_for(self.progress.current_question)
    }

    pub fn select_answer(&mut self, question_index: usize, option_index: usize) -> SessionResult<()> {
        select_answer(&mut self.progress, &self.quiz, question_index, option_index)?;
        debug!(
            quiz = %self.quiz.id,
            question = question_index,
            option = option_index,
            "answer selected"
        );
        Ok(())
    }

    /// Select an option for the question on screen
    pub fn select(&mut self, option_index: usize) -> SessionResult<()> {
        self.select_answer(self.progress.current_question, option_index)
    }

    /// Advance, finishing the session when the last question is passed.
    /// Returns the result when this call finished the session.
    pub fn advance(&mut self) -> SessionResult<Option<QuizResult>> {
        match advance(&mut self.progress, &self.quiz)? {
            Advance::Next(idx) => {
                debug!(quiz = %self.quiz.id, question = idx, "advanced");
                Ok(None)
            }
            Advance::Finish => self.finish().map(Some),
        }
    }

    /// Count down one second; force-finishes with the answers recorded so
    /// far once the budget runs out.
    pub fn on_tick(&mut self) -> SessionResult<Option<QuizResult>> {
        if !self.progress.is_active {
            return Ok(None);
        }
        match tick(&mut self.progress) {
            TickOutcome::Running(_) => Ok(None),
            TickOutcome::Expired => {
                info!(quiz = %self.quiz.id, "time expired, finishing session");
                self.finish().map(Some)
            }
        }
    }

    pub fn finish(&mut self) -> SessionResult<QuizResult> {
        let result = finish_session(
            &mut self.progress,
            &self.quiz,
            &self.user_id,
            self.clock.now(),
        )?;
        info!(
            quiz = %result.quiz_id,
            score = result.score,
            total = result.total_questions,
            points = result.points_earned,
            time_taken_secs = result.time_taken_secs,
            "session finished"
        );
        self.result = Some(result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::quiz::fixtures::sample_quiz;
    use assert_matches::assert_matches;
    use chrono::{Local, TimeZone};

    fn fixed_now() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn session() -> QuizSession {
        QuizSession::start_with_clock(sample_quiz(), "u1", Arc::new(FixedClock::new(fixed_now())))
            .unwrap()
    }

    #[test]
    fn start_initializes_progress() {
        let progress = start_session(&sample_quiz()).unwrap();
        assert_eq!(progress.current_question, 0);
        assert!(progress.answers.is_empty());
        assert_eq!(progress.time_left, 600);
        assert!(progress.is_active);
    }

    #[test]
    fn start_rejects_empty_quiz() {
        let mut quiz = sample_quiz();
        quiz.questions.clear();
        assert_matches!(start_session(&quiz), Err(SessionError::InvalidQuiz(id)) if id == "1");
    }

    #[test]
    fn select_rejects_out_of_range_option() {
        let quiz = sample_quiz();
        let mut progress = start_session(&quiz).unwrap();
        assert_matches!(
            select_answer(&mut progress, &quiz, 0, 4),
            Err(SessionError::InvalidOption {
                question: 0,
                option: 4,
                options: 4
            })
        );
        assert!(progress.answers.is_empty());
    }

    #[test]
    fn select_rejects_out_of_range_question() {
        let quiz = sample_quiz();
        let mut progress = start_session(&quiz).unwrap();
        assert_matches!(
            select_answer(&mut progress, &quiz, 3, 0),
            Err(SessionError::QuestionOutOfRange { question: 3, questions: 3 })
        );
    }

    #[test]
    fn select_overwrites_previous_choice() {
        let quiz = sample_quiz();
        let mut progress = start_session(&quiz).unwrap();
        select_answer(&mut progress, &quiz, 0, 1).unwrap();
        select_answer(&mut progress, &quiz, 0, 2).unwrap();
        assert_eq!(progress.answers.get(&0), Some(&2));
        assert_eq!(progress.answers.len(), 1);
    }

    #[test]
    fn advance_walks_then_requests_finish() {
        let quiz = sample_quiz();
        let mut progress = start_session(&quiz).unwrap();
        assert_eq!(advance(&mut progress, &quiz).unwrap(), Advance::Next(1));
        assert_eq!(advance(&mut progress, &quiz).unwrap(), Advance::Next(2));
        assert_eq!(advance(&mut progress, &quiz).unwrap(), Advance::Finish);
        assert_eq!(progress.current_question, 2);
    }

    #[test]
    fn advance_requires_active_session() {
        let quiz = sample_quiz();
        let mut progress = start_session(&quiz).unwrap();
        finish_session(&mut progress, &quiz, "u1", fixed_now()).unwrap();
        assert_matches!(
            advance(&mut progress, &quiz),
            Err(SessionError::SessionNotActive)
        );
    }

    #[test]
    fn finish_scores_example_scenario() {
        let quiz = sample_quiz();
        let mut progress = start_session(&quiz).unwrap();
        for (q, o) in [(0, 2), (1, 1), (2, 0)] {
            select_answer(&mut progress, &quiz, q, o).unwrap();
        }
        progress.time_left = 480;

        let result = finish_session(&mut progress, &quiz, "u1", fixed_now()).unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.points_earned, 33);
        assert_eq!(result.time_taken_secs, 120);
        assert_eq!(result.completed_at, fixed_now());
        assert_eq!(result.user_id, "u1");
        assert!(!progress.is_active);
    }

    #[test]
    fn finish_twice_is_rejected() {
        let quiz = sample_quiz();
        let mut progress = start_session(&quiz).unwrap();
        finish_session(&mut progress, &quiz, "u1", fixed_now()).unwrap();
        assert_matches!(
            finish_session(&mut progress, &quiz, "u1", fixed_now()),
            Err(SessionError::SessionAlreadyFinished)
        );
    }

    #[test]
    fn tick_counts_down_to_expiry() {
        let mut quiz = sample_quiz();
        quiz.time_limit_minutes = 1;
        let mut progress = start_session(&quiz).unwrap();
        for expected in (1..60).rev() {
            assert_eq!(tick(&mut progress), TickOutcome::Running(expected));
        }
        assert_eq!(tick(&mut progress), TickOutcome::Expired);
        assert_eq!(progress.time_left, 0);
    }

    #[test]
    fn session_advance_finishes_on_last_question() {
        let mut s = session();
        assert_eq!(s.status(), SessionStatus::InProgress);
        s.select(2).unwrap();
        assert!(s.advance().unwrap().is_none());
        s.select(1).unwrap();
        assert!(s.advance().unwrap().is_none());
        assert!(s.is_last_question());
        s.select(2).unwrap();

        let result = s.advance().unwrap().expect("last advance finishes");
        assert_eq!(result.score, 3);
        assert_eq!(result.points_earned, 50);
        assert_eq!(s.status(), SessionStatus::Finished);
        assert_eq!(s.result(), Some(&result));
    }

    #[test]
    fn session_timeout_force_finishes() {
        let mut quiz = sample_quiz();
        quiz.time_limit_minutes = 1;
        let mut s =
            QuizSession::start_with_clock(quiz, "u1", Arc::new(FixedClock::new(fixed_now())))
                .unwrap();
        s.select(2).unwrap();

        let mut finished = None;
        for _ in 0..60 {
            if let Some(r) = s.on_tick().unwrap() {
                finished = Some(r);
                break;
            }
        }

        let result = finished.expect("timer should expire");
        assert_eq!(result.score, 1);
        assert_eq!(result.points_earned, 16);
        assert_eq!(result.time_taken_secs, 60);
        assert!(s.is_finished());
        // ticks after expiry are ignored
        assert!(s.on_tick().unwrap().is_none());
    }

    #[test]
    fn session_finish_only_once() {
        let mut s = session();
        s.finish().unwrap();
        assert_matches!(s.finish(), Err(SessionError::SessionAlreadyFinished));
        assert_matches!(s.select(0), Err(SessionError::SessionNotActive));
    }
}
