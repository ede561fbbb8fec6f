//! Fast path for the tree API's category listings.
//!
//! A listing is a bare JSON array of decimal ids, e.g. `[123,456,789]`, and
//! can hold several hundred entries. Rather than run it through a JSON
//! decoder, the brackets are sliced off and the body is scanned for comma
//! bytes, each slice being converted digit by digit.
//!
//! Malformed input never panics. A body that is not bracket-delimited yields
//! no ids; slices that are not plain decimal numbers are skipped, so a
//! damaged body yields the well-formed ids it does contain.

const OPEN: u8 = b'[';
const CLOSE: u8 = b']';
const DELIMITER: u8 = b',';

pub fn parse_ids(body: &[u8]) -> Vec<i64> {
    let body = body.trim_ascii();

    if body.len() < 2 || body[0] != OPEN || body[body.len() - 1] != CLOSE {
        return Vec::new();
    }

    let inner = &body[1..body.len() - 1];
    if inner.is_empty() {
        return Vec::new();
    }

    inner
        .split(|&b| b == DELIMITER)
        .filter_map(parse_decimal)
        .collect()
}

fn parse_decimal(digits: &[u8]) -> Option<i64> {
    if digits.is_empty() {
        return None;
    }

    digits.iter().try_fold(0i64, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(i64::from(b - b'0'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_array() {
        assert_eq!(parse_ids(b"[1,22,333]"), vec![1, 22, 333]);
    }

    #[test]
    fn test_single_element_keeps_last_value() {
        assert_eq!(parse_ids(b"[41270001]"), vec![41270001]);
    }

    #[test]
    fn test_empty_array() {
        assert!(parse_ids(b"[]").is_empty());
    }

    #[test]
    fn test_not_bracket_delimited() {
        assert!(parse_ids(b"").is_empty());
        assert!(parse_ids(b"[").is_empty());
        assert!(parse_ids(b"]").is_empty());
        assert!(parse_ids(b"1,2,3").is_empty());
        assert!(parse_ids(b"[1,2,3").is_empty(), "truncated body");
        assert!(parse_ids(b"null").is_empty());
    }

    #[test]
    fn test_damaged_slices_are_skipped() {
        assert_eq!(parse_ids(b"[1,,x2,3,-4,5]"), vec![1, 3, 5]);
    }

    #[test]
    fn test_overflowing_value_is_skipped() {
        assert_eq!(parse_ids(b"[7,99999999999999999999,8]"), vec![7, 8]);
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        assert_eq!(parse_ids(b" [10,20]\n"), vec![10, 20]);
    }

    #[test]
    fn test_large_listing_preserves_order() {
        let ids: Vec<i64> = (1..=500).rev().collect();
        let body = format!(
            "[{}]",
            ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
        );
        assert_eq!(parse_ids(body.as_bytes()), ids);
    }
}
