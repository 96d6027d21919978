/// Which persistence client the service is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Managed Postgres through sqlx.
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    /// Privileged connection used only by admin, dashboard and export routes.
    pub admin_database_url: Option<String>,
    pub port: u16,
    pub admin_api_token: Option<String>,
    pub lead_webhook_url: Option<String>,
    pub mfa_issuer: String,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage_backend = match non_empty("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        };

        let database_url = non_empty("DATABASE_URL")
            .or_else(|| non_empty("DB_URL"))
            .map(validate_pg_url)
            .transpose()?;

        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL or DB_URL environment variable required for postgres storage");
        }

        let admin_database_url = non_empty("ADMIN_DATABASE_URL")
            .map(validate_pg_url)
            .transpose()?;

        let port = non_empty("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let lead_webhook_url = non_empty("LEAD_WEBHOOK_URL")
            .map(|url| {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("LEAD_WEBHOOK_URL must start with http:// or https://");
                }
                Ok(url)
            })
            .transpose()?;

        let run_migrations = match non_empty("RUN_MIGRATIONS").map(|v| v.to_lowercase()) {
            None => true,
            Some(v) if v == "true" || v == "1" => true,
            Some(v) if v == "false" || v == "0" => false,
            Some(v) => anyhow::bail!("RUN_MIGRATIONS must be true or false, got '{}'", v),
        };

        let config = Self {
            storage_backend,
            database_url,
            admin_database_url,
            port,
            admin_api_token: non_empty("ADMIN_API_TOKEN"),
            lead_webhook_url,
            mfa_issuer: non_empty("MFA_ISSUER").unwrap_or_else(|| "Consulting Leads".to_string()),
            run_migrations,
        };

        // Connection strings and tokens stay out of the logs
        tracing::debug!("Storage backend: {:?}", config.storage_backend);
        tracing::debug!(
            "Privileged admin connection configured: {}",
            config.admin_database_url.is_some()
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Lead webhook configured: {}",
            config.lead_webhook_url.is_some()
        );

        Ok(config)
    }

    /// Connection string for the privileged admin pool.
    pub fn admin_url(&self) -> Option<&str> {
        self.admin_database_url
            .as_deref()
            .or(self.database_url.as_deref())
    }
}

fn validate_pg_url(url: String) -> anyhow::Result<String> {
    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
        anyhow::bail!("Database URLs must start with postgresql:// or postgres://");
    }
    Ok(url)
}
