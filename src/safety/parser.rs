//! SQL parsing and admission logic.
//!
//! Uses sqlparser-rs with the MySQL dialect to parse SQL and decide whether a
//! query is a single SELECT statement.

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::lexer::{classify_lexically, mask_hash_comments, statement_text};
use super::{QueryRejection, StatementType, ValidatedQuery};

/// Validator that parses SQL and admits only single SELECT statements.
#[derive(Debug)]
pub struct SqlValidator {
    dialect: MySqlDialect,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlValidator {
    /// Creates a new SQL validator.
    pub fn new() -> Self {
        Self {
            dialect: MySqlDialect {},
        }
    }

    /// Admits `sql` if it holds exactly one SELECT statement.
    ///
    /// The admitted text runs from the statement's first token to its last,
    /// without surrounding comments or terminators.
    pub fn validate(&self, sql: &str) -> Result<ValidatedQuery, QueryRejection> {
        let masked = mask_hash_comments(sql);
        let statements = self.classify_masked(&masked)?;

        match statements.as_slice() {
            [] => Err(QueryRejection::Invalid),
            [StatementType::Select] => Ok(ValidatedQuery::new(statement_text(
                &self.dialect,
                sql,
                &masked,
            )?)),
            [other] => Err(QueryRejection::NotSelect(other.clone())),
            many => Err(QueryRejection::MultipleStatements(many.len())),
        }
    }

    /// Classifies every statement in `sql`, in order.
    ///
    /// Input the grammar cannot read is classified from its tokens instead, so
    /// MySQL syntax outside the grammar is still typed by its leading keyword.
    pub fn classify(&self, sql: &str) -> Result<Vec<StatementType>, QueryRejection> {
        self.classify_masked(&mask_hash_comments(sql))
    }

    fn classify_masked(&self, sql: &str) -> Result<Vec<StatementType>, QueryRejection> {
        match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => Ok(statements.iter().map(classify_statement).collect()),
            Err(e) => {
                debug!("SQL parse error, classifying by tokens: {}", e);
                classify_lexically(&self.dialect, sql)
            }
        }
    }
}

/// Convenience function to validate SQL without creating a validator instance.
pub fn validate_sql(sql: &str) -> Result<ValidatedQuery, QueryRejection> {
    SqlValidator::new().validate(sql)
}

/// Classifies a single parsed statement by its top-level type.
fn classify_statement(statement: &Statement) -> StatementType {
    match statement {
        Statement::Query(query) => classify_query(query),

        Statement::Insert(_) => StatementType::Insert,
        Statement::Update { .. } => StatementType::Update,
        Statement::Delete(_) => StatementType::Delete,

        Statement::Drop { .. } => StatementType::Drop,
        Statement::Truncate { .. } => StatementType::Truncate,
        Statement::AlterTable { .. } => StatementType::Alter,
        Statement::AlterIndex { .. } => StatementType::Alter,
        Statement::AlterView { .. } => StatementType::Alter,
        Statement::CreateTable { .. } => StatementType::Create,
        Statement::CreateIndex { .. } => StatementType::Create,
        Statement::CreateView { .. } => StatementType::Create,
        Statement::CreateSchema { .. } => StatementType::Create,
        Statement::CreateDatabase { .. } => StatementType::Create,
        Statement::Grant { .. } => StatementType::Grant,
        Statement::Revoke { .. } => StatementType::Revoke,

        Statement::Explain { .. } => StatementType::Explain,
        Statement::ExplainTable { .. } => StatementType::Explain,
        Statement::ShowVariable { .. } => StatementType::Show,
        Statement::ShowTables { .. } => StatementType::Show,
        Statement::ShowColumns { .. } => StatementType::Show,
        Statement::ShowCreate { .. } => StatementType::Show,
        Statement::ShowFunctions { .. } => StatementType::Show,
        Statement::ShowStatus { .. } => StatementType::Show,
        Statement::ShowCollation { .. } => StatementType::Show,

        _ => StatementType::Unknown,
    }
}

/// Types a query by the leading branch of its body.
///
/// Subqueries and CTE bodies are not inspected: a query whose outermost body
/// is a SELECT is a SELECT.
fn classify_query(query: &Query) -> StatementType {
    classify_set_expr(&query.body)
}

fn classify_set_expr(set_expr: &SetExpr) -> StatementType {
    match set_expr {
        SetExpr::Select(_) => StatementType::Select,
        SetExpr::Query(query) => classify_query(query),
        // UNION, INTERSECT, EXCEPT
        SetExpr::SetOperation { left, .. } => classify_set_expr(left),
        SetExpr::Values(_) => StatementType::Values,
        SetExpr::Table(_) => StatementType::Table,
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => classify_statement(stmt),
        #[allow(unreachable_patterns)]
        _ => StatementType::Unknown,
    }
}
