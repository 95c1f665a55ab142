use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

// --- Database Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite://data/pawtrips.db, overridable via PAWTRIPS__DATABASE__URL
}

// --- Stripe Config ---
// Secrets are usually "secret_from_env" in the config file and injected at load time.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StripeConfig {
    pub success_url: String, // Mandatory
    pub cancel_url: String,  // Mandatory
    pub default_currency: Option<String>,
    pub secret_key: Option<String>,     // STRIPE_SECRET_KEY
    pub webhook_secret: Option<String>, // STRIPE_WEBHOOK_SECRET
    /// Overrides https://api.stripe.com, used against local mocks.
    pub api_base: Option<String>,
}

// --- Email (Brevo) Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EmailTemplateIds {
    pub booking_confirmed: Option<i64>,
    pub cancellation_received: Option<i64>,
    pub cancellation_admin_review: Option<i64>,
    pub cancellation_approved: Option<i64>,
    pub cancellation_rejected: Option<i64>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EmailConfig {
    /// Transactional send endpoint, e.g. https://api.brevo.com/v3/smtp/email
    pub api_url: String,
    pub api_key: Option<String>, // BREVO_API_KEY
    pub sender_email: String,
    pub sender_name: Option<String>,
    /// Recipient of cancellation review mails.
    pub admin_email: String,
    #[serde(default)]
    pub templates: EmailTemplateIds,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FulfillmentConfig {
    pub shared_secret: Option<String>, // FULFILLMENT_SHARED_SECRET
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AdminConfig {
    pub api_key: Option<String>, // ADMIN_API_KEY
}

// --- Cancellation workflow ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CancellationConfig {
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_min_hours_before_start")]
    pub min_hours_before_start: i64,
    /// Base URL used to build magic links, e.g. https://api.pawtrips.ch
    pub public_base_url: String,
    /// IANA zone the slot dates are expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_token_ttl_hours() -> i64 {
    72
}

fn default_min_hours_before_start() -> i64 {
    48
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for CancellationConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: default_token_ttl_hours(),
            min_hours_before_start: default_min_hours_before_start(),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            timezone: default_timezone(),
        }
    }
}

// --- Outbound HTTP ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: Option<String>,
    /// When set, logs are additionally written to daily rolling files here.
    pub directory: Option<String>,
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_stripe: bool,
    #[serde(default)]
    pub use_email: bool,
    #[serde(default)]
    pub use_fulfillment: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub stripe: Option<StripeConfig>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub fulfillment: Option<FulfillmentConfig>,
    #[serde(default)]
    pub admin: Option<AdminConfig>,

    // --- Sections with usable defaults ---
    #[serde(default)]
    pub cancellation: CancellationConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}
