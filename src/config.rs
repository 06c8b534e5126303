use std::env;

/// Credentials for the Stripe API and webhook endpoint.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

/// Connection settings for the headless CMS that owns the order catalog.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Tuning for the reconciliation sweeper.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileSettings {
    /// How far back each sweep looks for completed sessions, in seconds.
    pub window_secs: i64,
    /// Per-sweep cap on sessions fetched from the processor.
    pub limit: u32,
    /// Period of the background sweep. Zero disables it.
    pub interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub stripe: StripeConfig,
    pub store: StoreConfig,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    pub reconcile: ReconcileSettings,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let cart_url = env::var("CART_URL")
            .unwrap_or_else(|_| "http://localhost:3001/shopping-cart".to_string());

        Self {
            host,
            port,
            stripe: StripeConfig {
                secret_key: require("STRIPE_SECRET_KEY"),
                webhook_secret: require("STRIPE_WEBHOOK_SECRET"),
            },
            store: StoreConfig {
                base_url: require("SERVER_URL"),
                api_key: require("PAYLOAD_API_KEY"),
            },
            checkout_success_url: env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| cart_url.clone()),
            checkout_cancel_url: env::var("CHECKOUT_CANCEL_URL").unwrap_or(cart_url),
            reconcile: ReconcileSettings {
                window_secs: env_or("RECONCILE_WINDOW_SECS", 24 * 60 * 60),
                limit: env_or("RECONCILE_LIMIT", 100),
                interval_secs: env_or("RECONCILE_INTERVAL_SECS", 60 * 60),
            },
            http_timeout_secs: env_or("HTTP_TIMEOUT_SECS", 30),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn require(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{} environment variable is not set", name))
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
