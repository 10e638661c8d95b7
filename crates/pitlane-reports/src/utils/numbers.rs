/// Compact row counts for the summary table: `26.1K`, `2.3M`. Counts under 10 000 print as-is.
pub fn format_numbers(n: usize) -> String {
    match n {
        n if n >= 1_000_000_000 => format!("{:0.1}B", n as f64 / 1_000_000_000.0),
        n if n >= 1_000_000 => format!("{:0.1}M", n as f64 / 1_000_000.0),
        n if n >= 10_000 => format!("{:0.1}K", n as f64 / 1_000.0),
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod test {
    use crate::utils::numbers::format_numbers;

    #[test]
    fn test_format_m() {
        assert_eq!(format_numbers(2_336_123), "2.3M");
    }

    #[test]
    fn test_format_k() {
        assert_eq!(format_numbers(26_080), "26.1K");
    }

    #[test]
    fn test_small_counts_stay_exact() {
        assert_eq!(format_numbers(1_125), "1125");
        assert_eq!(format_numbers(4_500), "4500");
        assert_eq!(format_numbers(0), "0");
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(format_numbers(10_000), "10.0K");
        assert_eq!(format_numbers(1_000_000), "1.0M");
    }
}
