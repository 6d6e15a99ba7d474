use anyhow::Context as _;
use labsearch::Config;
use std::sync::Arc;
use tokio::sync::OnceCell;

static SHARED: OnceCell<Arc<SharedTestResources>> = OnceCell::const_new();

pub struct SharedTestResources {
    /// `None` when no test database is configured; database tests then pass vacuously.
    pub base_config: Option<Config>,
}

pub async fn shared() -> anyhow::Result<Arc<SharedTestResources>> {
    SHARED
        .get_or_try_init(|| async {
            let mut config = Config::load().context("load Config for tests")?;
            init_tracing(&config);

            let url = std::env::var("LABSEARCH_TEST_DATABASE_URL")
                .ok()
                .or_else(|| config.database.test_database_url.clone());
            let Some(url) = url else {
                eprintln!("LABSEARCH_TEST_DATABASE_URL not set, skipping database tests");
                return Ok(Arc::new(SharedTestResources { base_config: None }));
            };
            config.database.url = url;

            // Per-test pools stay small; tests run in parallel, each with its own schema.
            config.database.pool_max_size = 2;
            config.database.acquire_timeout_seconds = 30;

            Ok(Arc::new(SharedTestResources {
                base_config: Some(config),
            }))
        })
        .await
        .cloned()
}

fn init_tracing(config: &Config) {
    use std::sync::OnceLock;
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let mut logging = config.logging.clone();
        logging.file_enabled = false;
        if let Ok(guard) = labsearch::logging::init_logging(&logging) {
            std::mem::forget(guard);
        }
    });
}
