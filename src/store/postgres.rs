//! PostgreSQL account store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Postgres, QueryBuilder, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument};

use super::{Account, AccountId, AccountStore, NewAccount, StoreError};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const SELECT_ACCOUNT: &str = r"
    SELECT id, first_name, last_name, email, phone_number, country, study_level,
           field_of_study, year_of_study, learning_goals, password_hash,
           created_at, updated_at
    FROM accounts
";

#[derive(Clone, Debug)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Apply the bundled schema. Every statement is idempotent.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "MIGRATE"
        );
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn fetch_one_where(
        &self,
        filter: &str,
        bind: Lookup<'_>,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!("{SELECT_ACCOUNT} WHERE {filter} AND deleted_at IS NULL");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let query = sqlx::query(&query);
        let query = match bind {
            Lookup::Email(email) => query.bind(email),
            Lookup::Id(id) => query.bind(id.0),
        };
        let row = query.fetch_optional(&self.pool).instrument(span).await?;

        row.as_ref()
            .map(account_from_row)
            .transpose()
            .map_err(StoreError::from)
    }
}

enum Lookup<'a> {
    Email(&'a str),
    Id(AccountId),
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: NewAccount) -> Result<AccountId, StoreError> {
        let mut builder = insert_query(&account);
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = builder.sql()
        );
        match builder
            .build()
            .fetch_one(&self.pool)
            .instrument(span)
            .await
        {
            Ok(row) => Ok(AccountId(row.try_get("id")?)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_one_where("email = $1", Lookup::Email(email))
            .await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.fetch_one_where("id = $1", Lookup::Id(id)).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

/// Build the INSERT for a new account. `phone_number` is only named in the
/// column list when present so the unique index never sees a blank value.
fn insert_query(account: &NewAccount) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO accounts (first_name, last_name, email, country, study_level, \
         field_of_study, year_of_study, learning_goals, password_hash",
    );
    if account.phone_number.is_some() {
        builder.push(", phone_number");
    }
    builder.push(") VALUES (");

    let mut values = builder.separated(", ");
    values.push_bind(&account.first_name);
    values.push_bind(&account.last_name);
    values.push_bind(&account.email);
    values.push_bind(&account.country);
    values.push_bind(&account.study_level);
    values.push_bind(&account.field_of_study);
    values.push_bind(account.year_of_study);
    values.push_bind(&account.learning_goals);
    values.push_bind(&account.password_hash);
    if let Some(phone_number) = &account.phone_number {
        values.push_bind(phone_number);
    }
    values.push_unseparated(") RETURNING id");

    builder
}

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: AccountId(row.try_get("id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        country: row.try_get("country")?,
        study_level: row.try_get("study_level")?,
        field_of_study: row.try_get("field_of_study")?,
        year_of_study: row.try_get("year_of_study")?,
        learning_goals: row.try_get("learning_goals")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
