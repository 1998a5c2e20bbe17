use crate::auth::jwt::JwtConfig;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration loaded from environment variables.
///
/// Everything except the database URLs and the JWT secret has a default
/// suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background services may drain after the server stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Reference (relational) database.
    pub database_url: String,
    /// Document database. May point at the same server as `database_url`.
    pub document_database_url: String,
    /// Connection limit per pool (default: `20`).
    pub db_max_connections: u32,
    pub log_format: LogFormat,
    /// JWT validation settings.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    /// | `DATABASE_URL`          | required                |
    /// | `DOCUMENT_DATABASE_URL` | required                |
    /// | `DB_MAX_CONNECTIONS`    | `20`                    |
    /// | `LOG_FORMAT`            | `pretty`                |
    ///
    /// # Panics
    ///
    /// Panics on missing required variables or unparseable values, so a
    /// misconfigured server never starts.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());

        let port: u16 = var("PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_url = var("DATABASE_URL").expect("DATABASE_URL must be set");
        let document_database_url =
            var("DOCUMENT_DATABASE_URL").expect("DOCUMENT_DATABASE_URL must be set");

        let db_max_connections: u32 = var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "20".into())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => panic!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'"),
        };

        let jwt = JwtConfig::from_vars(&var);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            document_database_url,
            db_max_connections,
            log_format,
            jwt,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/achievo"),
        ("DOCUMENT_DATABASE_URL", "postgres://localhost/achievo_docs"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_vars(vars(&REQUIRED));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert_eq!(config.db_max_connections, 20);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.document_database_url, "postgres://localhost/achievo_docs");
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("CORS_ORIGINS", "https://a.example, ,https://b.example"),
            ("DB_MAX_CONNECTIONS", "5"),
            ("LOG_FORMAT", "json"),
        ]);
        let config = ServerConfig::from_vars(vars(&pairs));
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    #[should_panic(expected = "DOCUMENT_DATABASE_URL must be set")]
    fn document_database_is_required() {
        ServerConfig::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/achievo"),
            ("JWT_SECRET", "secret"),
        ]));
    }

    #[test]
    #[should_panic(expected = "PORT must be a valid u16")]
    fn invalid_port_panics() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "http"));
        ServerConfig::from_vars(vars(&pairs));
    }
}
