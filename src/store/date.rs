//! Fixed-width timestamp formatting for packed records.

use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Length of the formatted date string in characters.
pub const DATE_LEN: usize = 16;

/// Format a timestamp as the fixed-width local `DD/MM/YYYY HH:MM` string
/// stored in every record.
#[must_use]
pub fn format_timestamp(t: SystemTime) -> String {
    let local: DateTime<Local> = t.into();
    local.format("%d/%m/%Y %H:%M").to_string()
}

/// The current local time in record format.
#[must_use]
pub fn now_string() -> String {
    format_timestamp(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn formatted_length_is_fixed() {
        assert_eq!(format_timestamp(SystemTime::UNIX_EPOCH).len(), DATE_LEN);
        assert_eq!(now_string().len(), DATE_LEN);
    }

    #[test]
    fn day_comes_before_month() {
        // 2020-02-01 in UTC; regardless of timezone the format holds
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_580_515_200);
        let s = format_timestamp(t);
        assert_eq!(s.as_bytes()[2], b'/');
        assert_eq!(s.as_bytes()[5], b'/');
        assert_eq!(s.as_bytes()[10], b' ');
        assert_eq!(s.as_bytes()[13], b':');
    }
}
