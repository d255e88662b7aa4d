use std::{env, fmt::Display, ops::RangeInclusive, str::FromStr};

use eventdesk_ledger::{Config, SESSION_DAYS};
use eventdesk_server::DEFAULT_PORT;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://eventdesk.db";
const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Connections kept open to the database
const MAX_CONNECTIONS: u32 = 8;

/// Everything eventdesk reads from the environment at startup
#[derive(Debug)]
pub struct Settings {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub admin_username: String,
    /// No admin is created when this is missing
    pub admin_password: Option<String>,
    pub ledger: Config,
}

#[derive(Debug, Error)]
#[error("{name} must be {expected}, got \"{value}\"")]
pub struct SettingsError {
    name: &'static str,
    expected: &'static str,
    value: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let defaults = Config::default();

        Ok(Self {
            port: parse_var("EVENTDESK_SERVER_PORT", "a port number", DEFAULT_PORT)?,
            database_url: env::var("EVENTDESK_DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            max_connections: MAX_CONNECTIONS,
            admin_username: env::var("EVENTDESK_ADMIN_USERNAME")
                .unwrap_or_else(|_| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_password: env::var("EVENTDESK_ADMIN_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty()),
            ledger: Config {
                session_duration_in_days: parse_ranged(
                    "EVENTDESK_SESSION_DAYS",
                    "a number of days between 1 and 3650",
                    SESSION_DAYS,
                    defaults.session_duration_in_days,
                )?,
                ..defaults
            },
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, expected: &'static str, default: T) -> Result<T, SettingsError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| SettingsError {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}

fn parse_ranged<T>(
    name: &'static str,
    expected: &'static str,
    range: RangeInclusive<T>,
    default: T,
) -> Result<T, SettingsError>
where
    T: FromStr + PartialOrd + Display,
{
    let value = parse_var(name, expected, default)?;

    if !range.contains(&value) {
        return Err(SettingsError {
            name,
            expected,
            value: value.to_string(),
        });
    }

    Ok(value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unset_variables_use_defaults() {
        let port = parse_var("EVENTDESK_TEST_UNSET_PORT", "a port number", 9050u16).unwrap();
        assert_eq!(port, 9050);
    }

    #[test]
    fn invalid_variables_are_reported() {
        env::set_var("EVENTDESK_TEST_BAD_PORT", "ninety");

        let error = parse_var("EVENTDESK_TEST_BAD_PORT", "a port number", 9050u16).unwrap_err();
        assert_eq!(
            error.to_string(),
            "EVENTDESK_TEST_BAD_PORT must be a port number, got \"ninety\""
        );
    }

    #[test]
    fn session_days_out_of_range_are_rejected() {
        let expected = "a number of days between 1 and 3650";

        for value in ["0", "-7", "3651", "1000000000000"] {
            env::set_var("EVENTDESK_TEST_SESSION_DAYS", value);

            let error =
                parse_ranged("EVENTDESK_TEST_SESSION_DAYS", expected, SESSION_DAYS, 7).unwrap_err();
            assert_eq!(
                error.to_string(),
                format!("EVENTDESK_TEST_SESSION_DAYS must be {expected}, got \"{value}\"")
            );
        }

        env::set_var("EVENTDESK_TEST_SESSION_DAYS", "30");
        let days = parse_ranged("EVENTDESK_TEST_SESSION_DAYS", expected, SESSION_DAYS, 7).unwrap();
        assert_eq!(days, 30);
    }
}
