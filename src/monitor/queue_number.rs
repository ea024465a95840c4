//! Queue number helpers.
//!
//! Queue numbers look like `MMDDYY-XXXX` (`012526-0007`); the part after the
//! date is the counter shown on the board and spoken in announcements.

/// The counter part of a queue number: the second `-` separated segment, or
/// the whole number when there is no dash.
pub fn queue_counter(queue_number: &str) -> &str {
    queue_number.split('-').nth(1).unwrap_or(queue_number)
}

/// The counter as it should be spoken: leading digits read as an integer
/// (`"0007"` → `"7"`), or the raw counter when it does not start with digits.
pub fn spoken_counter(queue_number: &str) -> String {
    let counter = queue_counter(queue_number).trim();
    let digits_end = counter
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(counter.len());
    let digits = &counter[..digits_end];

    if digits.is_empty() {
        return counter.to_string();
    }
    match digits.trim_start_matches('0') {
        "" => "0".to_string(),
        significant => significant.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_counter() {
        assert_eq!(queue_counter("012526-0007"), "0007");
        assert_eq!(queue_counter("0007"), "0007");
        assert_eq!(queue_counter("012526-0007-B"), "0007");
        assert_eq!(queue_counter(""), "");
    }

    #[test]
    fn test_spoken_counter_strips_leading_zeros() {
        assert_eq!(spoken_counter("012526-0007"), "7");
        assert_eq!(spoken_counter("012526-0120"), "120");
        assert_eq!(spoken_counter("012526-0000"), "0");
    }

    #[test]
    fn test_spoken_counter_reads_leading_digits_only() {
        assert_eq!(spoken_counter("012526-12A"), "12");
    }

    #[test]
    fn test_spoken_counter_without_digits_is_raw() {
        assert_eq!(spoken_counter("012526-VIP"), "VIP");
        assert_eq!(spoken_counter("walk-in"), "in");
    }

    #[test]
    fn test_spoken_counter_handles_huge_numbers() {
        assert_eq!(
            spoken_counter("x-000123456789012345678901234567890"),
            "123456789012345678901234567890"
        );
    }
}
