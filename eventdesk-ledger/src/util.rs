use chrono::NaiveDateTime;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// The format event dates are submitted in, as produced by `datetime-local` inputs
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

/// Returns the trimmed string, or None if nothing is left
pub fn non_empty(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_datetime_local_format() {
        let date = parse_date("2025-03-01T10:00").unwrap();
        assert_eq!(date.to_string(), "2025-03-01 10:00:00");

        assert_eq!(parse_date("2025-03-01"), None);
        assert_eq!(parse_date("01/03/2025 10:00"), None);
    }

    #[test]
    fn random_strings_are_alphanumeric() {
        let token = random_string(32);

        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, random_string(32));
    }
}
