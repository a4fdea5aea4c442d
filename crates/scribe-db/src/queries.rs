use rusqlite::types::{ToSql, Value};
use rusqlite::{Connection, OptionalExtension, Params};

use crate::Database;
use crate::error::Result;
use crate::models::{Model, NewModel, PostRow, SessionRow, UserRow, validate_post_text};

impl Database {
    /// Insert a row and return it as stored, defaults filled in.
    pub fn insert<N: NewModel>(&self, new: &N) -> Result<N::Output> {
        new.validate()?;
        let values = new.values();
        let table = <N::Output as Model>::TABLE;
        let sql = insert_sql(table.name, &table.select_list(), &values);

        self.with_conn(|conn| {
            let params: Vec<&dyn ToSql> = values.iter().map(|(_, v)| v as &dyn ToSql).collect();
            let row = conn.query_row(&sql, params.as_slice(), <N::Output as Model>::from_row)?;
            Ok(row)
        })
    }

    // -- Users --

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| select_one(conn, "\"id\" = ?1", [id]))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| select_one(conn, "\"email\" = ?1", [email]))
    }

    // -- Posts --

    /// Newest first. `datetime()` lets RFC 3339 and `CURRENT_TIMESTAMP`
    /// values compare as instants.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            select_many(
                conn,
                "1 ORDER BY datetime(\"created_at\") DESC, \"id\" DESC",
                [],
            )
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| select_one(conn, "\"id\" = ?1", [id]))
    }

    pub fn posts_by_author(&self, author_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            select_many(
                conn,
                "\"author_id\" = ?1 ORDER BY datetime(\"created_at\") DESC, \"id\" DESC",
                [author_id],
            )
        })
    }

    /// Replace title and content. `None` when the post does not exist.
    pub fn update_post(&self, id: i64, title: &str, content: &str) -> Result<Option<PostRow>> {
        validate_post_text(title, content)?;
        let sql = format!(
            "UPDATE \"posts\" SET \"title\" = ?1, \"content\" = ?2 WHERE \"id\" = ?3 RETURNING {}",
            PostRow::TABLE.select_list()
        );
        self.with_conn(|conn| {
            let row = conn
                .query_row(&sql, rusqlite::params![title, content, id], PostRow::from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM \"posts\" WHERE \"id\" = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Sessions --

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| select_one(conn, "\"id\" = ?1", [id]))
    }

    pub fn sessions_for_user(&self, user_id: &str) -> Result<Vec<SessionRow>> {
        self.with_conn(|conn| {
            select_many(conn, "\"user_id\" = ?1 ORDER BY \"expires_at\"", [user_id])
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM \"sessions\" WHERE \"id\" = ?1", [id])?;
            Ok(n > 0)
        })
    }
}

fn insert_sql(table: &str, returning: &str, values: &[(&'static str, Value)]) -> String {
    if values.is_empty() {
        return format!("INSERT INTO \"{table}\" DEFAULT VALUES RETURNING {returning}");
    }
    let columns: Vec<String> = values.iter().map(|(c, _)| format!("\"{c}\"")).collect();
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO \"{table}\" ({}) VALUES ({}) RETURNING {returning}",
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn select_sql<M: Model>(filter: &str) -> String {
    format!(
        "SELECT {} FROM \"{}\" WHERE {filter}",
        M::TABLE.select_list(),
        M::TABLE.name
    )
}

fn select_one<M: Model, P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Option<M>> {
    let row = conn
        .query_row(&select_sql::<M>(filter), params, M::from_row)
        .optional()?;
    Ok(row)
}

fn select_many<M: Model, P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<M>> {
    let mut stmt = conn.prepare(&select_sql::<M>(filter))?;
    let rows = stmt
        .query_map(params, M::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
