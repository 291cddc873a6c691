//! DDL (Data Definition Language) support.
//!
//! Builders for the CREATE TABLE statements of the schema bootstrap.
//!
//! # Examples
//!
//! ```ignore
//! use sensorthings::sql::{ColumnDef, CreateTable, DataType, Dialect};
//!
//! let table = CreateTable::new("things")
//!     .if_not_exists()
//!     .column(ColumnDef::new("id", DataType::Int64).identity().primary_key())
//!     .column(ColumnDef::new("name", DataType::Text).not_null());
//!
//! println!("{}", table.to_sql(Dialect::Sqlite));
//! ```

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

pub use super::types::DataType;

// ============================================================================
// CREATE TABLE
// ============================================================================

/// CREATE TABLE statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateTable {
    pub if_not_exists: bool,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
}

impl CreateTable {
    /// Create a new CREATE TABLE statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            if_not_exists: false,
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add IF NOT EXISTS clause.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Add a column definition.
    pub fn column(mut self, col: ColumnDef) -> Self {
        self.columns.push(col);
        self
    }

    /// Add multiple column definitions.
    pub fn columns(mut self, cols: impl IntoIterator<Item = ColumnDef>) -> Self {
        self.columns.extend(cols);
        self
    }

    /// Add a table constraint.
    pub fn constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Create).space().push(Token::Table);

        if self.if_not_exists && dialect.supports_if_not_exists() {
            ts.space()
                .push(Token::If)
                .space()
                .push(Token::Not)
                .space()
                .push(Token::Exists);
        }

        ts.space().push(Token::Ident(self.name.clone()));

        ts.space().lparen();

        let mut first = true;
        for col in &self.columns {
            if !first {
                ts.comma();
            }
            first = false;
            ts.newline().indent(1).append(&col.to_tokens(dialect));
        }

        for constraint in &self.constraints {
            if !first {
                ts.comma();
            }
            first = false;
            ts.newline().indent(1).append(&constraint.to_tokens());
        }

        ts.newline().rparen();

        ts
    }
}

// ============================================================================
// Column Definition
// ============================================================================

/// Column definition for CREATE TABLE.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: Option<bool>,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDef {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: None,
            constraints: Vec::new(),
        }
    }

    /// Mark column as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    /// Add PRIMARY KEY constraint.
    pub fn primary_key(mut self) -> Self {
        self.constraints.push(ColumnConstraint::PrimaryKey);
        self
    }

    /// Add REFERENCES constraint.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.constraints.push(ColumnConstraint::References {
            table: table.into(),
            column: column.into(),
            on_delete: None,
        });
        self
    }

    /// Add REFERENCES constraint with an ON DELETE action.
    pub fn references_on_delete(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        action: ReferentialAction,
    ) -> Self {
        self.constraints.push(ColumnConstraint::References {
            table: table.into(),
            column: column.into(),
            on_delete: Some(action),
        });
        self
    }

    /// Generated key that still accepts explicit values.
    pub fn identity(mut self) -> Self {
        self.constraints.push(ColumnConstraint::Identity);
        self
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Ident(self.name.clone()));
        ts.space()
            .push(Token::Raw(dialect.emit_data_type(&self.data_type)));

        if self.constraints.contains(&ColumnConstraint::Identity) {
            let identity = dialect.emit_identity();
            if !identity.is_empty() {
                ts.space().append(&identity);
            }
        }

        if self.nullable == Some(false) {
            ts.space().push(Token::Not).space().push(Token::Null);
        }

        for constraint in &self.constraints {
            match constraint {
                ColumnConstraint::PrimaryKey => {
                    ts.space().push(Token::Primary).space().push(Token::Key);
                }
                ColumnConstraint::References {
                    table,
                    column,
                    on_delete,
                } => {
                    ts.space()
                        .push(Token::References)
                        .space()
                        .push(Token::Ident(table.clone()))
                        .lparen()
                        .push(Token::Ident(column.clone()))
                        .rparen();
                    if let Some(action) = on_delete {
                        ts.space().append(&action.to_tokens());
                    }
                }
                ColumnConstraint::Identity => {}
            }
        }

        ts
    }
}

/// Column-level constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    References {
        table: String,
        column: String,
        on_delete: Option<ReferentialAction>,
    },
    Identity,
}

/// Action taken on referencing rows when the referenced row goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
}

impl ReferentialAction {
    fn to_tokens(self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::On).space().push(Token::Delete).space();
        match self {
            ReferentialAction::Cascade => ts.push(Token::Raw("CASCADE".into())),
            ReferentialAction::SetNull => ts.push(Token::Set).space().push(Token::Null),
        };
        ts
    }
}

// ============================================================================
// Table Constraints
// ============================================================================

/// Table-level constraints.
#[derive(Debug, Clone)]
pub enum TableConstraint {
    PrimaryKey {
        columns: Vec<String>,
    },
    ForeignKey {
        columns: Vec<String>,
        references_table: String,
        references_columns: Vec<String>,
        on_delete: Option<ReferentialAction>,
    },
}

impl TableConstraint {
    /// Create a PRIMARY KEY constraint.
    pub fn primary_key(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        TableConstraint::PrimaryKey {
            columns: columns.into_iter().map(|c| c.into()).collect(),
        }
    }

    /// Create a FOREIGN KEY constraint.
    pub fn foreign_key(
        columns: impl IntoIterator<Item = impl Into<String>>,
        references_table: impl Into<String>,
        references_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        TableConstraint::ForeignKey {
            columns: columns.into_iter().map(|c| c.into()).collect(),
            references_table: references_table.into(),
            references_columns: references_columns.into_iter().map(|c| c.into()).collect(),
            on_delete: None,
        }
    }

    /// Set the ON DELETE action of a FOREIGN KEY constraint.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let TableConstraint::ForeignKey { on_delete, .. } = &mut self {
            *on_delete = Some(action);
        }
        self
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            TableConstraint::PrimaryKey { columns } => {
                ts.push(Token::Primary).space().push(Token::Key).space();
                emit_column_list(&mut ts, columns);
            }
            TableConstraint::ForeignKey {
                columns,
                references_table,
                references_columns,
                on_delete,
            } => {
                ts.push(Token::Foreign).space().push(Token::Key).space();
                emit_column_list(&mut ts, columns);
                ts.space()
                    .push(Token::References)
                    .space()
                    .push(Token::Ident(references_table.clone()))
                    .space();
                emit_column_list(&mut ts, references_columns);
                if let Some(action) = on_delete {
                    ts.space().append(&action.to_tokens());
                }
            }
        }

        ts
    }
}

fn emit_column_list(ts: &mut TokenStream, columns: &[String]) {
    ts.lparen();
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.push(Token::Ident(col.clone()));
    }
    ts.rparen();
}

// ============================================================================
// Tests
// ============================================================================
