use std::collections::HashMap;

use algomitra_types::models::{Problem, ProblemSummary, SubmissionActivity, TestCase, User};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::models::{
    NewProblem, NewUser, ProblemRow, TestCaseRow, UserRecord, UserRow, format_timestamp,
    parse_difficulty, parse_timestamp, parse_uuid,
};
use crate::{Database, DbError, Result};

const USER_COLUMNS: &str =
    "id, name, email, password, role, bio, photo_url, badges, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let ts = format_timestamp(now);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id.to_string(), new.name, new.email, new.password_hash, new.role.as_str(), ts],
            )
            .map_err(|e| unique_violation(e, "User with this email already exists."))?;
            Ok(())
        })?;

        Ok(User {
            id,
            name: new.name.clone(),
            email: new.email.clone(),
            role: new.role,
            bio: None,
            photo_url: None,
            badges: vec![],
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
            .map(|record| record.map(|r| r.user))
    }

    /// Write whichever of `bio` / `photo_url` were given; empty strings count
    /// as not given. Returns `None` if the user no longer exists.
    pub fn update_profile(
        &self,
        id: Uuid,
        bio: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Option<User>> {
        let bio = bio.filter(|s| !s.is_empty());
        let photo_url = photo_url.filter(|s| !s.is_empty());
        let ts = format_timestamp(Utc::now());

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users
                 SET bio = COALESCE(?2, bio),
                     photo_url = COALESCE(?3, photo_url),
                     updated_at = ?4
                 WHERE id = ?1",
                params![id.to_string(), bio, photo_url, ts],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            Ok(query_user(conn, "id", &id.to_string())?.map(|r| r.user))
        })
    }

    // -- Submission activity --

    pub fn record_submission(&self, user_id: Uuid, day: NaiveDate) -> Result<SubmissionActivity> {
        let uid = user_id.to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO submission_activity (user_id, day, count) VALUES (?1, ?2, 1)
                 ON CONFLICT(user_id, day) DO UPDATE SET count = count + 1",
                params![uid, day.format("%Y-%m-%d").to_string()],
            )?;
            query_activity(conn, &uid)
        })
    }

    pub fn get_submission_activity(&self, user_id: Uuid) -> Result<SubmissionActivity> {
        self.with_conn(|conn| query_activity(conn, &user_id.to_string()))
    }

    // -- Problems --

    pub fn title_exists(&self, title: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM problems WHERE title = ?1", [title], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Insert a problem and its test cases atomically.
    pub fn create_problem(&self, new: &NewProblem) -> Result<Problem> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let pid = id.to_string();
        let ts = format_timestamp(now);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO problems (id, title, description, difficulty, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    pid,
                    new.title,
                    new.description,
                    new.difficulty.as_str(),
                    new.created_by.to_string(),
                    ts
                ],
            )
            .map_err(|e| unique_violation(e, "A problem with this title already exists."))?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO test_cases (problem_id, position, input, output, is_sample)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (i, tc) in new.test_cases.iter().enumerate() {
                    stmt.execute(params![pid, i as i64, tc.input, tc.output, tc.is_sample])?;
                }
            }

            tx.commit()?;
            Ok(())
        })?;

        Ok(Problem {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            difficulty: new.difficulty,
            test_cases: new.test_cases.clone(),
            created_by: new.created_by,
            created_at: now,
        })
    }

    /// Every problem with its test cases, newest first.
    pub fn list_problems(&self) -> Result<Vec<Problem>> {
        let (rows, case_rows) = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, difficulty, created_by, created_at
                 FROM problems
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ProblemRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        description: row.get(2)?,
                        difficulty: row.get(3)?,
                        created_by: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                "SELECT problem_id, input, output, is_sample
                 FROM test_cases
                 ORDER BY problem_id, position",
            )?;
            let case_rows = stmt
                .query_map([], |row| {
                    Ok(TestCaseRow {
                        problem_id: row.get(0)?,
                        input: row.get(1)?,
                        output: row.get(2)?,
                        is_sample: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, case_rows))
        })?;

        // Group test cases by problem (cheap in-memory work, outside the lock)
        let mut cases: HashMap<String, Vec<TestCase>> = HashMap::new();
        for row in case_rows {
            cases.entry(row.problem_id).or_default().push(TestCase {
                input: row.input,
                output: row.output,
                is_sample: row.is_sample,
            });
        }

        rows.into_iter()
            .map(|row| {
                Ok(Problem {
                    id: parse_uuid(&row.id)?,
                    difficulty: parse_difficulty(&row.difficulty)?,
                    created_by: parse_uuid(&row.created_by)?,
                    created_at: parse_timestamp(&row.created_at)?,
                    test_cases: cases.remove(&row.id).unwrap_or_default(),
                    title: row.title,
                    description: row.description,
                })
            })
            .collect()
    }

    /// Problems authored by `author`, newest first, without test cases.
    pub fn list_problems_by_author(&self, author: Uuid) -> Result<Vec<ProblemSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.title, p.difficulty, p.created_at, COUNT(t.position)
                 FROM problems p
                 LEFT JOIN test_cases t ON t.problem_id = p.id
                 WHERE p.created_by = ?1
                 GROUP BY p.id
                 ORDER BY p.created_at DESC, p.rowid DESC",
            )?;
            let rows = stmt
                .query_map([author.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, u32>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, title, difficulty, created_at, count)| {
                    Ok(ProblemSummary {
                        id: parse_uuid(&id)?,
                        title,
                        difficulty: parse_difficulty(&difficulty)?,
                        test_case_count: count,
                        created_at: parse_timestamp(&created_at)?,
                    })
                })
                .collect()
        })
    }

    pub fn count_problems_by_author(&self, author: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM problems WHERE created_by = ?1",
                [author.to_string()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Cheap liveness probe for the health route.
    pub fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRecord>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let row = conn.query_row(&sql, [value], user_row).optional()?;
    row.map(UserRow::into_record).transpose()
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        bio: row.get(5)?,
        photo_url: row.get(6)?,
        badges: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn query_activity(conn: &Connection, user_id: &str) -> Result<SubmissionActivity> {
    let mut stmt =
        conn.prepare("SELECT day, count FROM submission_activity WHERE user_id = ?1")?;
    let activity = stmt
        .query_map([user_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
        .collect::<std::result::Result<SubmissionActivity, _>>()?;
    Ok(activity)
}

fn unique_violation(err: rusqlite::Error, message: &str) -> DbError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            DbError::Conflict(message.to_string())
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algomitra_types::models::{Difficulty, Role};

    fn new_user(db: &Database, email: &str, role: Role) -> User {
        db.create_user(&NewUser {
            name: "Test".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role,
        })
        .unwrap()
    }

    fn new_problem(author: Uuid, title: &str) -> NewProblem {
        NewProblem {
            title: title.into(),
            description: "desc".into(),
            difficulty: Difficulty::Easy,
            test_cases: vec![
                TestCase { input: "1".into(), output: "1".into(), is_sample: true },
                TestCase { input: "2".into(), output: "4".into(), is_sample: false },
            ],
            created_by: author,
        }
    }

    #[test]
    fn test_user_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db, "a@mitwpu.edu.in", Role::Student);

        let record = db.get_user_by_email("a@mitwpu.edu.in").unwrap().unwrap();
        assert_eq!(record.user.id, user.id);
        assert_eq!(record.password_hash, "hash");
        assert_eq!(record.user.role, Role::Student);
        assert!(record.user.badges.is_empty());

        let by_id = db.get_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(by_id.email, "a@mitwpu.edu.in");
        assert!(db.get_user_by_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        new_user(&db, "dup@mitwpu.edu.in", Role::Student);
        let err = db
            .create_user(&NewUser {
                name: "Other".into(),
                email: "dup@mitwpu.edu.in".into(),
                password_hash: "x".into(),
                role: Role::Teacher,
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[test]
    fn test_update_profile_only_touches_given_fields() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db, "p@mitwpu.edu.in", Role::Student);

        let updated = db.update_profile(user.id, Some("hello"), None).unwrap().unwrap();
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert!(updated.photo_url.is_none());

        let updated = db
            .update_profile(user.id, Some(""), Some("http://img/x.png"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert_eq!(updated.photo_url.as_deref(), Some("http://img/x.png"));

        assert!(db.update_profile(Uuid::new_v4(), Some("x"), None).unwrap().is_none());
    }

    #[test]
    fn test_record_submission_increments_per_day() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db, "s@mitwpu.edu.in", Role::Student);
        let day = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
        let next = NaiveDate::from_ymd_opt(2025, 11, 14).unwrap();

        db.record_submission(user.id, day).unwrap();
        db.record_submission(user.id, day).unwrap();
        let activity = db.record_submission(user.id, next).unwrap();

        assert_eq!(activity.get("2025-11-13"), Some(&2));
        assert_eq!(activity.get("2025-11-14"), Some(&1));
        assert_eq!(db.get_submission_activity(user.id).unwrap(), activity);
    }

    #[test]
    fn test_problem_title_is_unique() {
        let db = Database::open_in_memory().unwrap();
        let teacher = new_user(&db, "t@mitwpu.edu.in", Role::Teacher);

        assert!(!db.title_exists("Two Sum").unwrap());
        db.create_problem(&new_problem(teacher.id, "Two Sum")).unwrap();
        assert!(db.title_exists("Two Sum").unwrap());

        let err = db.create_problem(&new_problem(teacher.id, "Two Sum")).unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert_eq!(db.list_problems().unwrap().len(), 1);
    }

    #[test]
    fn test_list_problems_keeps_case_order_and_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let teacher = new_user(&db, "t@mitwpu.edu.in", Role::Teacher);
        let other = new_user(&db, "o@mitwpu.edu.in", Role::Teacher);

        db.create_problem(&new_problem(teacher.id, "First")).unwrap();
        db.create_problem(&new_problem(other.id, "Second")).unwrap();
        db.create_problem(&new_problem(teacher.id, "Third")).unwrap();

        let all = db.list_problems().unwrap();
        let titles: Vec<_> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);
        assert_eq!(all[0].test_cases[0].input, "1");
        assert!(all[0].test_cases[0].is_sample);
        assert_eq!(all[0].test_cases[1].output, "4");

        let mine = db.list_problems_by_author(teacher.id).unwrap();
        let titles: Vec<_> = mine.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Third", "First"]);
        assert_eq!(mine[0].test_case_count, 2);
        assert_eq!(db.count_problems_by_author(teacher.id).unwrap(), 2);
        assert_eq!(db.count_problems_by_author(other.id).unwrap(), 1);
    }
}
