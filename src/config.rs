use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cors_origins: Vec<String>,
    pub frontend_url: String,
    pub stripe: StripeConfig,
    pub razorpay: RazorpayConfig,
    pub email: EmailConfig,
    pub sms: SmsConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "velobite".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "velobite-users".into()),
            ttl_minutes: env_i64("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_i64("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 30),
        };
        let cors_origins = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            database_url,
            jwt,
            cors_origins,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            stripe: StripeConfig {
                secret_key: std::env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
                webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            },
            razorpay: RazorpayConfig {
                key_id: std::env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
                key_secret: std::env::var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            },
            email: EmailConfig {
                api_url: std::env::var("EMAIL_API_URL").unwrap_or_default(),
                api_key: std::env::var("EMAIL_API_KEY").unwrap_or_default(),
                from: std::env::var("EMAIL_FROM").unwrap_or_default(),
            },
            sms: SmsConfig {
                account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
                auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
                from_number: std::env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            },
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}
