//! Application configuration loaded from environment variables.

use pipeline::{DispatchConfig, WarehouseTables};

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` / `PORT` — bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG` — tracing filter directive (default `"info"`)
/// - `ERP_BASE_URL` — ERP api2 endpoint root
/// - `STORAGE_BASE_URL` — object storage read endpoint root
/// - `WAREHOUSE_URL` — warehouse query endpoint
/// - `ERP_TOKEN_SECRET` / `EMAIL_KEY_SECRET` — secret identifiers
/// - `TEST_MODE` — `"true"` reroutes every email to `TEST_EMAIL`
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub erp_base_url: String,
    pub storage_base_url: String,
    pub warehouse_url: String,
    pub erp_token_secret: String,
    pub email_key_secret: String,
    pub from_email: String,
    pub template_id: String,
    pub test_mode: bool,
    pub test_email: String,
    pub contacts_table: String,
    pub sales_table: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let dispatch = DispatchConfig::default();
        let tables = WarehouseTables::default();
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: env_or("RUST_LOG", "info"),
            erp_base_url: env_or("ERP_BASE_URL", "https://api.tiny.com.br/api2"),
            storage_base_url: env_or("STORAGE_BASE_URL", "https://storage.googleapis.com"),
            warehouse_url: env_or("WAREHOUSE_URL", "http://127.0.0.1:9050/query"),
            erp_token_secret: env_or("ERP_TOKEN_SECRET", "z316-tiny-token-api"),
            email_key_secret: env_or("EMAIL_KEY_SECRET", "sendgrid-api-key"),
            from_email: env_or("FROM_EMAIL", &dispatch.from_email),
            template_id: env_or("TEMPLATE_ID", &dispatch.template_id),
            test_mode: env_or("TEST_MODE", "false") == "true",
            test_email: env_or("TEST_EMAIL", &dispatch.test_email),
            contacts_table: env_or("CONTACTS_TABLE", &tables.contacts),
            sales_table: env_or("SALES_TABLE", &tables.sales),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the dispatcher settings for one invocation.
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            from_email: self.from_email.clone(),
            template_id: self.template_id.clone(),
            test_mode: self.test_mode,
            test_email: self.test_email.clone(),
            ..DispatchConfig::default()
        }
    }

    /// Returns the warehouse table names.
    pub fn tables(&self) -> WarehouseTables {
        WarehouseTables {
            contacts: self.contacts_table.clone(),
            sales: self.sales_table.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployment_constants() {
        let config = Config::from_env();
        assert_eq!(config.erp_base_url, "https://api.tiny.com.br/api2");
        assert_eq!(config.template_id, "d-f5543523eceb42bc9eec353aebc19aef");
        assert_eq!(config.from_email, "sac@emporiozingaro.com");
    }

    #[test]
    fn addr_formatting() {
        let mut config = Config::from_env();
        config.host = "127.0.0.1".to_string();
        config.port = 8080;
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn dispatch_settings_carry_the_suppression_group() {
        let config = Config::from_env();
        let dispatch = config.dispatch();
        assert_eq!(dispatch.suppression.group_id, 23816);
        assert_eq!(
            dispatch.suppression.groups_to_display,
            vec![23816, 23831, 23817]
        );
    }
}
