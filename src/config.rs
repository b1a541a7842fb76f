use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};

const DEFAULT_ACCESS_TOKEN_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_REFRESH_TOKEN_EXPIRY: Duration = Duration::from_secs(10 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub access_token_secret: String,
    pub access_token_expiry: Duration,
    pub refresh_token_secret: String,
    pub refresh_token_expiry: Duration,
    pub cors_origin: Option<String>,
    pub upload_dir: PathBuf,
    /// Sets the `Secure` attribute on auth cookies.
    pub cookie_secure: bool,
    pub cloudinary: Option<CloudinaryConfig>,
    pub media_timeout: Duration,
}

/// Credentials for the hosted media service, handed to the adapter at construction.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let access_token_secret =
            std::env::var("ACCESS_TOKEN_SECRET").context("ACCESS_TOKEN_SECRET must be set")?;
        let refresh_token_secret =
            std::env::var("REFRESH_TOKEN_SECRET").context("REFRESH_TOKEN_SECRET must be set")?;

        let port = match optional_var("PORT") {
            Some(port) => port.parse().context("PORT must be a valid port number")?,
            None => 8001,
        };
        let access_token_expiry = match optional_var("ACCESS_TOKEN_EXPIRY") {
            Some(value) => parse_duration(&value).context("Invalid ACCESS_TOKEN_EXPIRY")?,
            None => DEFAULT_ACCESS_TOKEN_EXPIRY,
        };
        let refresh_token_expiry = match optional_var("REFRESH_TOKEN_EXPIRY") {
            Some(value) => parse_duration(&value).context("Invalid REFRESH_TOKEN_EXPIRY")?,
            None => DEFAULT_REFRESH_TOKEN_EXPIRY,
        };
        let media_timeout = match optional_var("MEDIA_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .parse()
                    .context("MEDIA_TIMEOUT_SECS must be a number of seconds")?,
            ),
            None => Duration::from_secs(30),
        };
        let cookie_secure = match optional_var("COOKIE_SECURE") {
            Some(value) => value
                .parse()
                .context("COOKIE_SECURE must be true or false")?,
            None => true,
        };

        let cloudinary = match (
            optional_var("CLOUDINARY_CLOUD_NAME"),
            optional_var("CLOUDINARY_API_KEY"),
            optional_var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            host: optional_var("HOST").unwrap_or_else(|| "127.0.0.1".to_owned()),
            port,
            access_token_secret,
            access_token_expiry,
            refresh_token_secret,
            refresh_token_expiry,
            cors_origin: optional_var("CORS_ORIGIN"),
            upload_dir: optional_var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./public/temp")),
            cookie_secure,
            cloudinary,
            media_timeout,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .context("HOST and PORT do not form a valid address")
    }
}

fn optional_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parses `30`, `45s`, `15m`, `12h` or `10d`.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let (number, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(index) => value.split_at(index),
        None => (value, "s"),
    };
    if number.is_empty() {
        bail!("duration '{value}' has no amount");
    }
    let amount: u64 = number.parse()?;
    let unit_seconds: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => bail!("unknown duration unit '{other}'"),
    };
    let Some(seconds) = amount.checked_mul(unit_seconds) else {
        bail!("duration '{value}' is too large");
    };
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("10d").unwrap(), Duration::from_secs(864_000));
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(parse_duration("d").is_err());
        assert!(parse_duration("10w").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn rejects_durations_that_overflow() {
        let days = format!("{}d", u64::MAX / 2);
        assert!(parse_duration(&days).is_err());
        assert!(parse_duration("99999999999999999999s").is_err());
        assert_eq!(
            parse_duration(&format!("{}s", u64::MAX)).unwrap(),
            Duration::from_secs(u64::MAX)
        );
    }
}
