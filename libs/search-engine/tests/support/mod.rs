pub mod fixtures;
pub mod shared;

use anyhow::Context as _;
use futures::FutureExt as _;
use labsearch::db::{PgExecutor, StandardSchema};
use labsearch::{Config, SearchEngine};
use sqlx::{Connection as _, PgPool};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

pub use fixtures::*;

pub struct TestDb {
    pub engine: SearchEngine,
    pub pool: PgPool,
    schema: String,
    admin_database_url: String,
}

impl TestDb {
    async fn new(base_config: &Config) -> anyhow::Result<Self> {
        let mut config = base_config.clone();
        let admin_database_url = config.database.url.clone();

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let mut admin_conn = sqlx::PgConnection::connect(&admin_database_url)
            .await
            .context("connect admin db for schema create")?;
        sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
            .execute(&mut admin_conn)
            .await
            .context("create test schema")?;

        config.database.url = with_search_path(&admin_database_url, &schema)?;
        let executor = PgExecutor::connect(&config.database)
            .await
            .context("connect test pool")?;
        let pool = executor.pool().clone();
        fixtures::create_schema(&pool).await?;

        let engine = SearchEngine::new(
            Arc::new(executor),
            Arc::new(StandardSchema::new()),
            config.search.clone(),
        );

        Ok(Self {
            engine,
            pool,
            schema,
            admin_database_url,
        })
    }

    pub async fn cleanup(self) -> anyhow::Result<()> {
        self.pool.close().await;

        let mut admin_conn = sqlx::PgConnection::connect(&self.admin_database_url)
            .await
            .context("connect admin db for schema drop")?;
        sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
            .execute(&mut admin_conn)
            .await
            .context("drop test schema")?;

        Ok(())
    }
}

/// Runs `f` against a fresh schema. Without a configured test database the test
/// body is skipped.
pub async fn with_test_db<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a TestDb,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let shared = shared::shared().await?;
    let Some(base_config) = shared.base_config.as_ref() else {
        return Ok(());
    };
    let db = TestDb::new(base_config).await?;

    let result = std::panic::AssertUnwindSafe(f(&db)).catch_unwind().await;
    let cleanup_result = db.cleanup().await;

    if let Err(e) = cleanup_result {
        eprintln!("test schema cleanup failed: {e:?}");
    }

    match result {
        Ok(r) => r,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn with_search_path(database_url: &str, schema: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(database_url).context("parse database URL")?;
    url.query_pairs_mut()
        .append_pair("options", &format!("-c search_path={}", schema));
    Ok(url.to_string())
}
