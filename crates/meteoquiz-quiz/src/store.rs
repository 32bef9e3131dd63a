//! SQLite-backed user, question and attempt storage.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{QuizError, QuizResult};
use crate::repository::{AttemptTotals, QuestionRepository, RecordedAttempt, UserRepository};
use crate::types::{AnswerAttempt, AnswerOption, NewQuestion, Question, QuestionId, User, UserId};

const USER_COLUMNS: &str = "id, nickname, total_score, created_at";
const QUESTION_COLUMNS: &str =
    "id, prompt, option_a, option_b, option_c, option_d, correct_option";
const ATTEMPT_COLUMNS: &str = "user_id, question_id, correct, points, timestamp";

/// How long a writer waits for another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Fixed precision so text ordering matches time ordering
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Quiz storage over a single SQLite connection.
pub struct SqliteQuizStore {
    conn: Mutex<Connection>,
}

impl SqliteQuizStore {
    /// Open or create the database at `path`.
    ///
    /// Several stores (or processes) may share one file; writers queue on
    /// SQLite's lock for up to five seconds.
    pub fn open<P: AsRef<Path>>(path: P) -> QuizResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> QuizResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> QuizResult<()> {
        self.conn.lock().execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nickname TEXT NOT NULL UNIQUE,
                total_score INTEGER NOT NULL DEFAULT 0 CHECK (total_score >= 0),
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt TEXT NOT NULL,
                option_a TEXT NOT NULL,
                option_b TEXT NOT NULL,
                option_c TEXT NOT NULL,
                option_d TEXT NOT NULL,
                correct_option TEXT NOT NULL CHECK (correct_option IN ('a', 'b', 'c', 'd'))
            );

            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                question_id INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                points INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_scores_user_question ON scores(user_id, question_id);
            CREATE INDEX IF NOT EXISTS idx_users_score ON users(total_score DESC);
            "#,
        )?;
        Ok(())
    }

    /// Register a user with a zero score.
    pub fn create_user(&self, nickname: &str) -> QuizResult<User> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(QuizError::Validation("Nickname must not be empty".to_string()));
        }

        let now = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (nickname, total_score, created_at) VALUES (?1, 0, ?2)",
            params![nickname, format_timestamp(now)],
        )?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Created user {} ({})", id, nickname);

        Ok(User {
            id,
            nickname: nickname.to_string(),
            total_score: 0,
            created_at: now,
        })
    }

    /// Insert questions in a single transaction. Returns how many were added.
    pub fn insert_questions(&self, questions: &[NewQuestion]) -> QuizResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO questions (prompt, option_a, option_b, option_c, option_d, correct_option)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for q in questions {
                stmt.execute(params![
                    q.prompt,
                    q.option_a,
                    q.option_b,
                    q.option_c,
                    q.option_d,
                    q.correct_option.as_str(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!("Inserted {} questions", questions.len());
        Ok(questions.len())
    }

    /// Remove every question. Recorded attempts are kept.
    pub fn clear_questions(&self) -> QuizResult<usize> {
        let removed = self.conn.lock().execute("DELETE FROM questions", [])?;
        tracing::info!("Cleared {} questions", removed);
        Ok(removed)
    }

    pub fn question_count(&self) -> QuizResult<u64> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at: String = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            nickname: row.get(1)?,
            total_score: row.get(2)?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_question(row: &rusqlite::Row) -> rusqlite::Result<Question> {
        let correct: String = row.get(6)?;
        let correct_option = correct.parse::<AnswerOption>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Question {
            id: row.get(0)?,
            prompt: row.get(1)?,
            option_a: row.get(2)?,
            option_b: row.get(3)?,
            option_c: row.get(4)?,
            option_d: row.get(5)?,
            correct_option,
        })
    }

    fn row_to_attempt(row: &rusqlite::Row) -> rusqlite::Result<AnswerAttempt> {
        let correct: i32 = row.get(2)?;
        let timestamp: String = row.get(4)?;
        Ok(AnswerAttempt {
            user_id: row.get(0)?,
            question_id: row.get(1)?,
            correct: correct != 0,
            points: row.get(3)?,
            timestamp: Self::parse_timestamp(&timestamp),
        })
    }

    fn fetch_user(conn: &Connection, id: UserId) -> rusqlite::Result<Option<User>> {
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            Self::row_to_user,
        )
        .optional()
    }

    fn prior_correct(
        conn: &Connection,
        user_id: UserId,
        question_id: QuestionId,
    ) -> rusqlite::Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM scores
                 WHERE user_id = ?1 AND question_id = ?2 AND correct = 1 LIMIT 1",
                params![user_id, question_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl UserRepository for SqliteQuizStore {
    fn get_user(&self, id: UserId) -> QuizResult<Option<User>> {
        Ok(Self::fetch_user(&self.conn.lock(), id)?)
    }

    fn count_users(&self) -> QuizResult<u64> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn users_by_score(&self, offset: u64, limit: u32) -> QuizResult<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY total_score DESC, id ASC LIMIT ?1 OFFSET ?2",
            USER_COLUMNS
        ))?;

        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit, offset], Self::row_to_user)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count_users_above(&self, score: u32) -> QuizResult<u64> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM users WHERE total_score > ?1",
            params![score],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn answered_question_ids(&self, user_id: UserId) -> QuizResult<HashSet<QuestionId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT question_id FROM scores WHERE user_id = ?1")?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, QuestionId>(0))?;
        Ok(rows.collect::<Result<HashSet<_>, _>>()?)
    }

    fn has_correct_attempt(&self, user_id: UserId, question_id: QuestionId) -> QuizResult<bool> {
        Ok(Self::prior_correct(&self.conn.lock(), user_id, question_id)?)
    }

    fn record_attempt(&self, attempt: &AnswerAttempt) -> QuizResult<RecordedAttempt> {
        let save_failed = |e: rusqlite::Error| QuizError::SaveFailed(e.to_string());

        let mut conn = self.conn.lock();
        // Write lock is held from the prior-correct read through commit.
        // Dropping the transaction without commit rolls back both writes.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(save_failed)?;

        let already_answered =
            Self::prior_correct(&tx, attempt.user_id, attempt.question_id).map_err(save_failed)?;
        let credited = if attempt.correct && !already_answered {
            attempt.points
        } else {
            0
        };

        tx.execute(
            "INSERT INTO scores (user_id, question_id, correct, points, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                attempt.user_id,
                attempt.question_id,
                attempt.correct as i32,
                attempt.points,
                format_timestamp(attempt.timestamp),
            ],
        )
        .map_err(save_failed)?;

        if credited > 0 {
            let updated = tx
                .execute(
                    "UPDATE users SET total_score = total_score + ?1 WHERE id = ?2",
                    params![credited, attempt.user_id],
                )
                .map_err(save_failed)?;
            if updated == 0 {
                return Err(QuizError::UserNotFound(attempt.user_id));
            }
        }

        let user = Self::fetch_user(&tx, attempt.user_id)
            .map_err(save_failed)?
            .ok_or(QuizError::UserNotFound(attempt.user_id))?;

        tx.commit().map_err(save_failed)?;
        Ok(RecordedAttempt {
            user,
            already_answered,
            credited,
        })
    }

    fn recent_attempts(&self, user_id: UserId, limit: u32) -> QuizResult<Vec<AnswerAttempt>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM scores WHERE user_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            ATTEMPT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id, limit], Self::row_to_attempt)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn attempt_totals(&self, user_id: UserId) -> QuizResult<AttemptTotals> {
        let (attempts, points): (i64, i64) = self.conn.lock().query_row(
            "SELECT COUNT(*), COALESCE(SUM(points), 0) FROM scores WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(AttemptTotals {
            attempts: attempts as u64,
            points: points as u64,
        })
    }
}

impl QuestionRepository for SqliteQuizStore {
    fn get_question(&self, id: QuestionId) -> QuizResult<Option<Question>> {
        let question = self
            .conn
            .lock()
            .query_row(
                &format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS),
                params![id],
                Self::row_to_question,
            )
            .optional()?;
        Ok(question)
    }

    fn question_ids(&self) -> QuizResult<Vec<QuestionId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id FROM questions ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, QuestionId>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
