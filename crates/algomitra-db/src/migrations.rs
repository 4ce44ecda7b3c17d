use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, problems)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('student', 'teacher')),
                bio         TEXT,
                photo_url   TEXT,
                badges      TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE problems (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                difficulty  TEXT NOT NULL CHECK (difficulty IN ('Easy', 'Medium', 'Hard')),
                created_by  TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_problems_author
                ON problems(created_by, created_at);

            CREATE TABLE test_cases (
                problem_id  TEXT NOT NULL REFERENCES problems(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                input       TEXT NOT NULL,
                output      TEXT NOT NULL,
                is_sample   INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (problem_id, position)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (submission activity)");
        conn.execute_batch(
            "
            CREATE TABLE submission_activity (
                user_id     TEXT NOT NULL REFERENCES users(id),
                day         TEXT NOT NULL,
                count       INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, day)
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
