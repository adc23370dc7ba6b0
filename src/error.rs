//! Error types for the quiz engine and its collaborators.

use thiserror::Error;

/// Invariant violations raised by the session engine.
///
/// None of these are transient: they mean the caller handed the engine
/// bad data or drove it out of order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session was started on a quiz without questions
    #[error("quiz {0} has no questions")]
    InvalidQuiz(String),

    /// The selected option does not exist for the question
    #[error("option {option} is out of range for question {question} ({options} options)")]
    InvalidOption {
        question: usize,
        option: usize,
        options: usize,
    },

    /// The question index does not exist in the quiz
    #[error("question {question} is out of range ({questions} questions)")]
    QuestionOutOfRange { question: usize, questions: usize },

    /// The session is not in progress
    #[error("session is not active")]
    SessionNotActive,

    /// Finish was requested on a session that already produced its result
    #[error("session already finished")]
    SessionAlreadyFinished,
}

/// Failures loading quizzes from a data source.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("quiz not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Quiz data that breaks the question invariants
    #[error("invalid quiz {quiz}: {reason}")]
    Invalid { quiz: String, reason: String },
}

/// Failures reading or writing user records and result history.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("invalid stored timestamp: {0}")]
    Timestamp(String),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
