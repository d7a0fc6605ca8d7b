use chrono::{DateTime, Local, Utc};

/// Decimal (SI) byte count, e.g. `999 B`, `1.5 kB`, `12.0 MB`.
pub fn byte_count_si(bytes: u64) -> String {
    const UNITS: &[&str] = &["kB", "MB", "GB", "TB", "PB", "EB"];
    if bytes < 1000 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64 / 1000.0;
    let mut unit_index = 0;
    while size >= 1000.0 && unit_index < UNITS.len() - 1 {
        size /= 1000.0;
        unit_index += 1;
    }
    format!("{:.1} {}", size, UNITS[unit_index])
}

/// Timestamp as shown in object listings, in local time.
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn si_units() {
        assert_eq!(byte_count_si(0), "0 B");
        assert_eq!(byte_count_si(999), "999 B");
        assert_eq!(byte_count_si(1000), "1.0 kB");
        assert_eq!(byte_count_si(1500), "1.5 kB");
        assert_eq!(byte_count_si(12_000_000), "12.0 MB");
        assert_eq!(byte_count_si(u64::MAX), "18.4 EB");
    }
}
