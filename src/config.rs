use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Credentials for the outbound mail relay.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub relay_url: String,
    pub api_token: String,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cortexa".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "cortexa-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let mail = MailConfig {
            relay_url: std::env::var("MAIL_RELAY_URL")?,
            api_token: std::env::var("MAIL_API_TOKEN")?,
            from_address: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@cortexa.app".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            mail,
        })
    }
}
