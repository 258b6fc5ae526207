use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PrincipalsRepo, RepoError, UpsertCredentialsParams};
use crate::domain::principals::PrincipalRecord;

use super::{PostgresRepositories, map_sqlx_error};

const PRINCIPAL_COLUMNS: &str =
    "id, email, token_prefix, hashed_secret, admin, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PrincipalRow {
    id: Uuid,
    email: String,
    token_prefix: Option<String>,
    hashed_secret: Option<Vec<u8>>,
    admin: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PrincipalRow> for PrincipalRecord {
    fn from(row: PrincipalRow) -> Self {
        PrincipalRecord {
            id: row.id,
            email: row.email,
            token_prefix: row.token_prefix,
            hashed_secret: row.hashed_secret,
            admin: row.admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn find_principal_where(
        &self,
        column: &'static str,
        value: impl for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + 'static,
    ) -> Result<Option<PrincipalRecord>, RepoError> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE {column} = $1");
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(PrincipalRecord::from))
    }
}

#[async_trait::async_trait]
impl PrincipalsRepo for PostgresRepositories {
    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRecord>, RepoError> {
        self.find_principal_where("email", email.to_string()).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PrincipalRecord>, RepoError> {
        self.find_principal_where("id", id).await
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<PrincipalRecord>, RepoError> {
        self.find_principal_where("token_prefix", prefix.to_string())
            .await
    }

    async fn upsert_credentials(
        &self,
        params: UpsertCredentialsParams,
    ) -> Result<PrincipalRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO principals (id, email, token_prefix, hashed_secret, admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $5)
            ON CONFLICT (email) DO UPDATE
            SET token_prefix = EXCLUDED.token_prefix,
                hashed_secret = EXCLUDED.hashed_secret,
                updated_at = EXCLUDED.updated_at
            RETURNING {PRINCIPAL_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&params.email)
            .bind(&params.token_prefix)
            .bind(&params.hashed_secret)
            .bind(params.issued_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn set_admin(&self, id: Uuid, admin: bool) -> Result<PrincipalRecord, RepoError> {
        let sql = format!(
            "UPDATE principals SET admin = $2, updated_at = $3 WHERE id = $1 RETURNING {PRINCIPAL_COLUMNS}"
        );
        sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(id)
            .bind(admin)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .map(PrincipalRecord::from)
            .ok_or(RepoError::NotFound)
    }
}
