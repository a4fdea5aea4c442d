//! Select and insert shapes for every declared table.
//!
//! A select shape (`*Row`) is the full stored row, server defaults included.
//! An insert shape (`New*`) carries the required columns and leaves
//! defaulted or generated columns optional. Both are tied back to their
//! `Table` declaration so column lists never drift from the schema.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Value;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::schema::{FOO, POSTS, SESSIONS, Table, USERS};

/// Format of `CURRENT_TIMESTAMP` values.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored row of a declared table.
pub trait Model: Sized {
    const TABLE: &'static Table;

    /// Build from a row selected with `TABLE.select_list()`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Values for creating a row.
pub trait NewModel {
    type Output: Model;

    /// Supplied columns only; omitted columns take their declared default.
    fn values(&self) -> Vec<(&'static str, Value)>;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

// -- users --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    /// Stored representation, already hashed by the caller.
    pub password: String,
}

impl Model for UserRow {
    const TABLE: &'static Table = &USERS;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password: row.get(2)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            password: password_hash.into(),
        }
    }
}

impl NewModel for NewUser {
    type Output = UserRow;

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Text(self.id.clone())),
            ("email", Value::Text(self.email.clone())),
            ("password", Value::Text(self.password.clone())),
        ]
    }

    fn validate(&self) -> Result<()> {
        require_text(&USERS, "id", &self.id)?;
        require_text(&USERS, "email", &self.email)?;
        require_text(&USERS, "password", &self.password)
    }
}

// -- posts --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: i64,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

impl PostRow {
    /// `created_at` as UTC. Accepts RFC 3339 for rows written by other tools.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

impl Model for PostRow {
    const TABLE: &'static Table = &POSTS;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            author_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub id: Option<i64>,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub created_at: Option<String>,
}

impl NewPost {
    pub fn new(
        author_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

impl NewModel for NewPost {
    type Output = PostRow;

    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut values = Vec::with_capacity(5);
        if let Some(id) = self.id {
            values.push(("id", Value::Integer(id)));
        }
        values.push(("author_id", Value::Text(self.author_id.clone())));
        values.push(("title", Value::Text(self.title.clone())));
        values.push(("content", Value::Text(self.content.clone())));
        if let Some(created_at) = &self.created_at {
            values.push(("created_at", Value::Text(created_at.clone())));
        }
        values
    }

    fn validate(&self) -> Result<()> {
        require_text(&POSTS, "author_id", &self.author_id)?;
        validate_post_text(&self.title, &self.content)
    }
}

// -- sessions --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub expires_at: i64,
}

impl SessionRow {
    /// Expired sessions stay stored until something deletes them.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }
}

impl Model for SessionRow {
    const TABLE: &'static Table = &SESSIONS;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            expires_at: row.get(2)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub user_id: String,
    pub expires_at: i64,
}

impl NewSession {
    pub fn new(user_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            expires_at: expires_at.timestamp(),
        }
    }
}

impl NewModel for NewSession {
    type Output = SessionRow;

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Text(self.id.clone())),
            ("user_id", Value::Text(self.user_id.clone())),
            ("expires_at", Value::Integer(self.expires_at)),
        ]
    }

    fn validate(&self) -> Result<()> {
        require_text(&SESSIONS, "id", &self.id)?;
        require_text(&SESSIONS, "user_id", &self.user_id)
    }
}

// -- foo --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooRow {
    pub bar: String,
}

impl Model for FooRow {
    const TABLE: &'static Table = &FOO;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { bar: row.get(0)? })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewFoo {
    pub bar: Option<String>,
}

impl NewModel for NewFoo {
    type Output = FooRow;

    fn values(&self) -> Vec<(&'static str, Value)> {
        self.bar
            .iter()
            .map(|bar| ("bar", Value::Text(bar.clone())))
            .collect()
    }
}

/// Checks shared by creating and editing a post.
pub fn validate_post_text(title: &str, content: &str) -> Result<()> {
    require_text(&POSTS, "title", title)?;
    require_text(&POSTS, "content", content)
}

/// Rejects empty required text and text longer than the declared maximum.
fn require_text(table: &Table, column: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DbError::Validation {
            column,
            reason: "must not be empty".into(),
        });
    }
    let max_len = table.column(column).and_then(|c| c.max_len);
    if let Some(max) = max_len {
        let len = value.chars().count();
        if len > max {
            return Err(DbError::Validation {
                column,
                reason: format!("{len} characters exceeds the maximum of {max}"),
            });
        }
    }
    Ok(())
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
