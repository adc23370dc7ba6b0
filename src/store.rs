use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Local};
use itertools::Itertools;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::scoring::{apply_result_to_user, QuizResult};
use crate::user::User;

/// Repository for user records and their result history
pub trait UserStore {
    fn get_user(&self, id: &str) -> StoreResult<Option<User>>;

    fn upsert_user(&mut self, user: &User) -> StoreResult<()>;

    /// Fetch the user, creating an empty record on first sight
    fn ensure_user(&mut self, id: &str, name: &str) -> StoreResult<User> {
        if let Some(user) = self.get_user(id)? {
            return Ok(user);
        }
        let user = User::new(id, name);
        self.upsert_user(&user)?;
        Ok(user)
    }

    /// Like `ensure_user`, but a changed display name replaces the stored one.
    /// Points and quiz count are kept.
    fn identify(&mut self, id: &str, name: &str) -> StoreResult<User> {
        let mut user = self.ensure_user(id, name)?;
        if user.name != name {
            debug!(id, from = %user.name, to = name, "renaming user");
            user.name = name.to_string();
            self.upsert_user(&user)?;
        }
        Ok(user)
    }

    /// Fold a result into its user's totals and append it to history.
    fn record_result(&mut self, result: &QuizResult) -> StoreResult<User>;

    /// Most recent results first
    fn results_for(&self, user_id: &str, limit: usize) -> StoreResult<Vec<QuizResult>>;

    /// Users ranked by points, then quizzes taken, then name
    fn leaderboard(&self, limit: usize) -> StoreResult<Vec<User>>;
}

/// Non-persistent store, handy for tests and throwaway runs
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: HashMap<String, User>,
    results: Vec<QuizResult>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.get(id).cloned())
    }

    fn upsert_user(&mut self, user: &User) -> StoreResult<()> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn record_result(&mut self, result: &QuizResult) -> StoreResult<User> {
        let user = self
            .users
            .get(&result.user_id)
            .ok_or_else(|| StoreError::UnknownUser(result.user_id.clone()))?;
        let updated = apply_result_to_user(user, result);
        self.users.insert(updated.id.clone(), updated.clone());
        self.results.push(result.clone());
        Ok(updated)
    }

    fn results_for(&self, user_id: &str, limit: usize) -> StoreResult<Vec<QuizResult>> {
        Ok(self
            .results
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn leaderboard(&self, limit: usize) -> StoreResult<Vec<User>> {
        Ok(self
            .users
            .values()
            .sorted_by(|a, b| {
                b.points
                    .cmp(&a.points)
                    .then(b.total_quizzes.cmp(&a.total_quizzes))
                    .then(a.name.cmp(&b.name))
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

/// SQLite-backed store
#[derive(Debug)]
pub struct SqliteUserStore {
    conn: Connection,
}

impl SqliteUserStore {
    /// Open (or create) the database file and bring the schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        run_migrations(&conn)?;
        info!(path = %path.display(), "user store opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Every stored result, oldest first
    pub fn all_results(&self) -> StoreResult<Vec<QuizResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT quiz_id, user_id, score, total_questions, points_earned, time_taken_secs, completed_at
            FROM quiz_results
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map([], row_to_result)?;
        collect_results(rows)
    }
}

fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            points INTEGER NOT NULL DEFAULT 0,
            total_quizzes INTEGER NOT NULL DEFAULT 0,
            referral_code TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS quiz_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quiz_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            score INTEGER NOT NULL,
            total_questions INTEGER NOT NULL,
            points_earned INTEGER NOT NULL,
            time_taken_secs INTEGER NOT NULL,
            completed_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_quiz_results_user ON quiz_results(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_points ON users(points)",
        [],
    )?;

    Ok(())
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        points: row.get::<_, i64>(2)? as u64,
        total_quizzes: row.get::<_, i64>(3)? as u64,
        referral_code: row.get(4)?,
    })
}

/// Raw row; the timestamp is parsed afterwards so a bad value surfaces as
/// `StoreError::Timestamp` rather than a column type error.
type ResultRow = (String, String, i64, i64, i64, i64, String);

fn row_to_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResultRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn collect_results<I>(rows: I) -> StoreResult<Vec<QuizResult>>
where
    I: Iterator<Item = rusqlite::Result<ResultRow>>,
{
    let mut results = Vec::new();
    for row in rows {
        let (quiz_id, user_id, score, total, points, taken, completed_at) = row?;
        let completed_at = DateTime::parse_from_rfc3339(&completed_at)
            .map_err(|_| StoreError::Timestamp(completed_at.clone()))?
            .with_timezone(&Local);
        results.push(QuizResult {
            quiz_id,
            user_id,
            score: score as usize,
            total_questions: total as usize,
            points_earned: points as u32,
            time_taken_secs: taken as u32,
            completed_at,
        });
    }
    Ok(results)
}

impl UserStore for SqliteUserStore {
    fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, points, total_quizzes, referral_code FROM users WHERE id = ?1",
                [id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn upsert_user(&mut self, user: &User) -> StoreResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (id, name, points, total_quizzes, referral_code)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                points = excluded.points,
                total_quizzes = excluded.total_quizzes,
                referral_code = excluded.referral_code
            "#,
            params![
                user.id,
                user.name,
                user.points as i64,
                user.total_quizzes as i64,
                user.referral_code,
            ],
        )?;
        Ok(())
    }

    fn record_result(&mut self, result: &QuizResult) -> StoreResult<User> {
        let tx = self.conn.transaction()?;

        let user = tx
            .query_row(
                "SELECT id, name, points, total_quizzes, referral_code FROM users WHERE id = ?1",
                [&result.user_id],
                row_to_user,
            )
            .optional()?
            .ok_or_else(|| StoreError::UnknownUser(result.user_id.clone()))?;

        let updated = apply_result_to_user(&user, result);

        tx.execute(
            "UPDATE users SET points = ?1, total_quizzes = ?2 WHERE id = ?3",
            params![
                updated.points as i64,
                updated.total_quizzes as i64,
                updated.id
            ],
        )?;

        tx.execute(
            r#"
            INSERT INTO quiz_results
            (quiz_id, user_id, score, total_questions, points_earned, time_taken_secs, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                result.quiz_id,
                result.user_id,
                result.score as i64,
                result.total_questions as i64,
                result.points_earned as i64,
                result.time_taken_secs as i64,
                result.completed_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        debug!(
            user = %updated.id,
            points = updated.points,
            quizzes = updated.total_quizzes,
            "result recorded"
        );
        Ok(updated)
    }

    fn results_for(&self, user_id: &str, limit: usize) -> StoreResult<Vec<QuizResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT quiz_id, user_id, score, total_questions, points_earned, time_taken_secs, completed_at
            FROM quiz_results
            WHERE user_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], row_to_result)?;
        collect_results(rows)
    }

    fn leaderboard(&self, limit: usize) -> StoreResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, points, total_quizzes, referral_code
            FROM users
            ORDER BY points DESC, total_quizzes DESC, name ASC
            LIMIT ?1
            "#,
        )?;
        let users = stmt
            .query_map([limit as i64], row_to_user)?
            .collect::<rusqlite::Result<Vec<User>>>()?;
        Ok(users)
    }
}
