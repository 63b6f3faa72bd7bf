//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for bazaar-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://bazaar.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Directory for daily-rolling log files. Console-only when unset.
    pub log_dir: Option<String>,

    /// Comma-separated list of allowed CORS origins. Wildcard when unset.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,

    /// Directory uploaded attachment files are written to and served from.
    pub upload_dir: String,

    /// Maximum accepted upload body, in bytes.
    pub max_upload_bytes: usize,

    /// HS256 secret for verifying bearer tokens issued by the account
    /// service. The verified-token middleware is disabled when unset.
    pub jwt_secret: Option<String>,

    /// Accept `X-User-Id` and `Bearer uid:<id>` development credentials.
    pub dev_identity: bool,

    /// Read member ids out of unsigned bearer-token payloads.
    /// Never enable this outside local development.
    pub allow_unverified_claims: bool,

    /// Reject requests that only declare an actor id in the body/query
    /// without any resolvable identity.
    pub require_identity: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("BAZAAR_BIND", "0.0.0.0:8080"),
            database_url: env_or("BAZAAR_DATABASE_URL", "sqlite://bazaar.db"),
            log_level: env_or("BAZAAR_LOG", "info"),
            log_json: env_flag("BAZAAR_LOG_JSON", false),
            log_dir: env_opt("BAZAAR_LOG_DIR"),
            cors_allowed_origins: env_opt("BAZAAR_CORS_ORIGINS"),
            enable_swagger: env_flag("BAZAAR_ENABLE_SWAGGER", true),
            upload_dir: env_or("BAZAAR_UPLOAD_DIR", "./uploads"),
            max_upload_bytes: parse_env("BAZAAR_MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            jwt_secret: env_opt("BAZAAR_JWT_SECRET"),
            dev_identity: env_flag("BAZAAR_DEV_IDENTITY", true),
            allow_unverified_claims: env_flag("BAZAAR_ALLOW_UNVERIFIED_CLAIMS", false),
            require_identity: env_flag("BAZAAR_REQUIRE_IDENTITY", false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_owned(),
            database_url: "sqlite://bazaar.db".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            log_dir: None,
            cors_allowed_origins: None,
            enable_swagger: true,
            upload_dir: "./uploads".to_owned(),
            max_upload_bytes: 20 * 1024 * 1024,
            jwt_secret: None,
            dev_identity: true,
            allow_unverified_claims: false,
            require_identity: false,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
