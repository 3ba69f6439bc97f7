pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// The most recent `limit` items, in their original order.
pub fn window<T>(records: &[T], limit: usize) -> &[T] {
    let start = records.len().saturating_sub(limit);
    &records[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_is_returned_whole() {
        let records = [1, 2, 3];
        assert_eq!(window(&records, 3), &records);
        assert_eq!(window(&records, 100), &records);
    }

    #[test]
    fn test_keeps_last_records_in_order() {
        let records: Vec<u32> = (1..=150).collect();
        let recent = window(&records, DEFAULT_HISTORY_LIMIT);

        assert_eq!(recent.len(), 100);
        assert_eq!(recent.first(), Some(&51));
        assert_eq!(recent.last(), Some(&150));
        assert!(recent.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_zero_limit() {
        let records = [1, 2, 3];
        assert!(window(&records, 0).is_empty());
        assert!(window::<u8>(&[], 0).is_empty());
    }
}
