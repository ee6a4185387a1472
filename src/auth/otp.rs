use rand::Rng;
use time::{Duration, OffsetDateTime};

/// How long a freshly issued OTP stays valid.
pub const OTP_TTL: Duration = Duration::minutes(10);

/// Generate a 6-digit one-time password in [100000, 999999].
pub fn generate() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Absolute expiry instant for an OTP issued now.
pub fn expiry_from_now() -> OffsetDateTime {
    OffsetDateTime::now_utc() + OTP_TTL
}

pub fn is_expired(expiry: OffsetDateTime) -> bool {
    expiry < OffsetDateTime::now_utc()
}
