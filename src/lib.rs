// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app;
pub mod app_dirs;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod quiz;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod store;
pub mod user;

pub use error::{CatalogError, SessionError, StoreError};
pub use quiz::{Category, Question, Quiz};
pub use scoring::{apply_result_to_user, QuizResult};
pub use session::{
    advance, finish_session, select_answer, start_session, Advance, QuizProgress, QuizSession,
    SessionStatus,
};
pub use user::User;
