/// Length of the longest valid UTF-8 prefix in `bytes`.
pub(super) fn utf8_valid_prefix_len(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Ok(_) => bytes.len(),
        Err(e) => e.valid_up_to(),
    }
}

/// Byte index of the earliest occurrence of any stop string in `text`.
pub(super) fn find_stop(text: &str, stops: &[String]) -> Option<usize> {
    stops
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_prefix_stops_before_split_codepoint() {
        let bytes = "aé".as_bytes();
        assert_eq!(utf8_valid_prefix_len(bytes), 3);
        assert_eq!(utf8_valid_prefix_len(&bytes[..2]), 1);
    }

    #[test]
    fn earliest_stop_wins() {
        let stops = vec!["END".to_string(), "\n".to_string(), String::new()];
        assert_eq!(find_stop("abc\ndef END", &stops), Some(3));
        assert_eq!(find_stop("nothing here", &stops), None);
    }
}
