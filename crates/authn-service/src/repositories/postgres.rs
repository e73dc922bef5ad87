//! PostgreSQL authentication store.
//!
//! Schema lives in `migrations/`. Methods are stored by [`Method::code`],
//! metadata as JSONB, and client tokens only as their SHA-256 hash.

use super::client_token::{generate_client_token, hash_client_token};
use super::page_token::{decode_optional, into_page};
use super::{reject_empty_filter, AuthenticationStore};
use crate::errors::AuthnError;
use crate::models::{
    Authentication, CreateAuthenticationRequest, DeleteFilter, ListAuthenticationsPredicate,
    ListRequest, Method, ResultSet,
};
use crate::observability::metrics::record_store_query;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

const AUTHENTICATION_COLUMNS: &str = "id, method, metadata, expires_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct AuthenticationRow {
    id: String,
    method: i16,
    metadata: Json<BTreeMap<String, String>>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AuthenticationRow> for Authentication {
    type Error = AuthnError;

    fn try_from(row: AuthenticationRow) -> Result<Self, Self::Error> {
        let method = Method::from_code(row.method).ok_or_else(|| {
            AuthnError::Internal(format!("unknown method code {} for {}", row.method, row.id))
        })?;

        Ok(Authentication {
            id: row.id,
            method,
            metadata: row.metadata.0,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn query_status<T>(result: &Result<T, sqlx::Error>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        query: &'static str,
        column: &str,
        value: &str,
    ) -> Result<Authentication, AuthnError> {
        let start = Instant::now();
        let sql = format!("SELECT {AUTHENTICATION_COLUMNS} FROM authentications WHERE {column} = $1");
        let result = sqlx::query_as::<_, AuthenticationRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await;
        record_store_query(query, query_status(&result), start.elapsed());

        result
            .map_err(|e| AuthnError::Database(format!("Failed to fetch authentication: {}", e)))?
            .ok_or_else(|| AuthnError::NotFound("authentication".to_string()))?
            .try_into()
    }
}

#[async_trait]
impl AuthenticationStore for PostgresStore {
    #[instrument(skip_all, fields(method = %request.method))]
    async fn create_authentication(
        &self,
        request: CreateAuthenticationRequest,
    ) -> Result<(SecretString, Authentication), AuthnError> {
        if request.method == Method::None {
            return Err(AuthnError::InvalidArgument(
                "authentication method is required".to_string(),
            ));
        }

        let client_token = match request.client_token {
            Some(token) => token,
            None => generate_client_token()?,
        };

        let sql = format!(
            r#"
            INSERT INTO authentications (id, method, client_token_hash, metadata, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {AUTHENTICATION_COLUMNS}
            "#
        );

        let start = Instant::now();
        let result = sqlx::query_as::<_, AuthenticationRow>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(request.method.code())
            .bind(hash_client_token(client_token.expose_secret()))
            .bind(Json(&request.metadata))
            .bind(request.expires_at)
            .fetch_one(&self.pool)
            .await;
        record_store_query("insert_authentication", query_status(&result), start.elapsed());

        let row = result.map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuthnError::InvalidArgument("client token already in use".to_string())
            }
            other => {
                AuthnError::Database(format!("Failed to create authentication: {}", other))
            }
        })?;

        Ok((client_token, row.try_into()?))
    }

    async fn get_authentication_by_client_token(
        &self,
        client_token: &str,
    ) -> Result<Authentication, AuthnError> {
        self.fetch_one_where(
            "select_authentication_by_token",
            "client_token_hash",
            &hash_client_token(client_token),
        )
        .await
    }

    async fn get_authentication_by_id(&self, id: &str) -> Result<Authentication, AuthnError> {
        self.fetch_one_where("select_authentication_by_id", "id", id)
            .await
    }

    async fn list_authentications(
        &self,
        request: &ListRequest<ListAuthenticationsPredicate>,
    ) -> Result<ResultSet<Authentication>, AuthnError> {
        let cursor = decode_optional(request.query_params.page_token.as_deref())?;
        let limit = request.query_params.limit;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {AUTHENTICATION_COLUMNS} FROM authentications WHERE TRUE"
        ));
        if let Some(method) = request.predicate.method {
            builder.push(" AND method = ").push_bind(method.code());
        }
        if let Some(cursor) = cursor {
            builder
                .push(" AND (created_at, id) >= (")
                .push_bind(cursor.created_at)
                .push(", ")
                .push_bind(cursor.id)
                .push(")");
        }
        builder.push(" ORDER BY created_at, id");
        if limit > 0 {
            // One extra row tells us whether another page exists.
            let fetch = i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX);
            builder.push(" LIMIT ").push_bind(fetch);
        }

        let start = Instant::now();
        let result = builder
            .build_query_as::<AuthenticationRow>()
            .fetch_all(&self.pool)
            .await;
        record_store_query("list_authentications", query_status(&result), start.elapsed());

        let rows = result
            .map_err(|e| AuthnError::Database(format!("Failed to list authentications: {}", e)))?;
        let authentications = rows
            .into_iter()
            .map(Authentication::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_page(authentications, limit))
    }

    async fn delete_authentications(&self, filter: &DeleteFilter) -> Result<u64, AuthnError> {
        reject_empty_filter(filter)?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("DELETE FROM authentications WHERE TRUE");
        if let Some(id) = &filter.id {
            builder.push(" AND id = ").push_bind(id.clone());
        }
        if let Some(method) = filter.method {
            builder.push(" AND method = ").push_bind(method.code());
        }
        if let Some(expired_before) = filter.expired_before {
            builder
                .push(" AND expires_at IS NOT NULL AND expires_at < ")
                .push_bind(expired_before);
        }

        let start = Instant::now();
        let result = builder.build().execute(&self.pool).await;
        record_store_query("delete_authentications", query_status(&result), start.elapsed());

        let done = result
            .map_err(|e| AuthnError::Database(format!("Failed to delete authentications: {}", e)))?;
        Ok(done.rows_affected())
    }

    async fn expire_authentication_by_id(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthnError> {
        // Single statement, so the row lock serializes concurrent calls.
        // Mirrors `next_expiry`: $2 <= $3 (now) logs out, otherwise extend-only.
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE authentications
            SET expires_at = CASE
                    WHEN $2 <= $3 THEN LEAST(COALESCE(expires_at, $2), $2)
                    ELSE GREATEST(COALESCE(expires_at, $2), $2)
                END,
                updated_at = CASE
                    WHEN expires_at IS NULL
                        OR ($2 <= $3 AND expires_at > $2)
                        OR ($2 > $3 AND expires_at < $2)
                    THEN $3
                    ELSE updated_at
                END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;
        record_store_query("expire_authentication", query_status(&result), start.elapsed());

        let done = result
            .map_err(|e| AuthnError::Database(format!("Failed to expire authentication: {}", e)))?;
        if done.rows_affected() == 0 {
            return Err(AuthnError::NotFound("authentication".to_string()));
        }

        Ok(())
    }
}
