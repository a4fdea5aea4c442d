//! Table declarations.
//!
//! Every table the application persists is declared here as static
//! metadata. DDL, select lists and insert statements are all derived from
//! these declarations, so this file is the single place a column changes.

use std::fmt::Write as _;

/// Separates statements in rendered schema files.
pub const STATEMENT_BREAKPOINT: &str = "--> statement-breakpoint";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
        }
    }
}

/// Value the engine fills in when an insert omits the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// `CURRENT_TIMESTAMP`, stored as `YYYY-MM-DD HH:MM:SS` in UTC.
    CurrentTimestamp,
    Text(&'static str),
}

impl DefaultValue {
    fn as_sql(self) -> String {
        match self {
            Self::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub not_null: bool,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
    pub references: Option<ForeignKey>,
    /// Intended maximum length. Checked by insert shapes, never by storage.
    pub max_len: Option<usize>,
}

impl Column {
    const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            not_null: false,
            primary_key: false,
            autoincrement: false,
            unique: false,
            default: None,
            references: None,
            max_len: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, SqlType::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, SqlType::Integer)
    }

    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Only meaningful on an `INTEGER` primary key.
    pub const fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }

    pub const fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    /// True when an insert may leave this column out.
    pub fn is_optional_on_insert(&self) -> bool {
        !self.not_null || self.default.is_some() || self.autoincrement
    }

    fn definition(&self) -> String {
        let mut sql = format!("\"{}\" {}", self.name, self.sql_type.as_sql());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = self.default {
            let _ = write!(sql, " DEFAULT ({})", default.as_sql());
        }
        if let Some(fk) = self.references {
            let _ = write!(sql, " REFERENCES \"{}\"(\"{}\")", fk.table, fk.column);
        }
        sql
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Comma-separated, quoted column list in declaration order.
    pub fn select_list(&self) -> String {
        self.column_names()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn references(&self) -> impl Iterator<Item = (&Column, ForeignKey)> + '_ {
        self.columns
            .iter()
            .filter_map(|c| c.references.map(|fk| (c, fk)))
    }

    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.definition()))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n);", self.name, columns)
    }
}

pub const USERS: Table = Table {
    name: "users",
    columns: &[
        Column::text("id").primary_key(),
        Column::text("email").not_null().unique(),
        Column::text("password").not_null(),
    ],
};

pub const POSTS: Table = Table {
    name: "posts",
    columns: &[
        Column::integer("id").primary_key().autoincrement(),
        Column::text("author_id").not_null().references("users", "id"),
        Column::text("title").not_null().max_len(256),
        Column::text("content").not_null().max_len(1000),
        Column::text("created_at")
            .not_null()
            .default(DefaultValue::CurrentTimestamp),
    ],
};

pub const SESSIONS: Table = Table {
    name: "sessions",
    columns: &[
        Column::text("id").primary_key(),
        Column::text("user_id").not_null().references("users", "id"),
        // Seconds since the Unix epoch.
        Column::integer("expires_at").not_null(),
    ],
};

/// Demo table with no relationships.
pub const FOO: Table = Table {
    name: "foo",
    columns: &[Column::text("bar").not_null().default(DefaultValue::Text("Hey!"))],
};

/// All tables, referenced tables before the tables that reference them.
pub const SCHEMA: &[&Table] = &[&USERS, &POSTS, &SESSIONS, &FOO];

/// Render `tables` as DDL, one statement per table.
pub fn render(tables: &[&Table]) -> String {
    let separator = format!("\n{STATEMENT_BREAKPOINT}\n");
    tables
        .iter()
        .map(|t| t.create_sql())
        .collect::<Vec<_>>()
        .join(separator.as_str())
}
