use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except ASCII letters, digits and `-._~` gets encoded. Nothing is "safe", so `/`,
/// `:` and `?` are encoded too.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Turns a raw url into the key it is stored under. Urls are stored encoded, so a lookup must
/// encode exactly once: an already encoded string will have its `%` encoded again.
pub fn normalize(raw: &str) -> String {
    utf8_percent_encode(raw, KEY_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreserved_passes_through() {
        let plain = "abcXYZ0189-._~";
        assert_eq!(normalize(plain), plain);
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn reserved_characters_are_encoded() {
        assert_eq!(
            normalize("www.sfu.ca/about/economic-recovery/1-10.html"),
            "www.sfu.ca%2Fabout%2Feconomic-recovery%2F1-10.html"
        );
        assert_eq!(
            normalize("umbrella.cisco.com/?dtid=osscdc000283"),
            "umbrella.cisco.com%2F%3Fdtid%3Dosscdc000283"
        );
        assert_eq!(
            normalize("www.geeksforgeeks.org:443/python-build-a-rest-api-using-flask/"),
            "www.geeksforgeeks.org%3A443%2Fpython-build-a-rest-api-using-flask%2F"
        );
        assert_eq!(normalize("a b&c"), "a%20b%26c");
    }

    #[test]
    fn non_ascii_is_utf8_encoded() {
        assert_eq!(normalize("café"), "caf%C3%A9");
    }

    #[test]
    fn encoding_twice_changes_the_key() {
        let once = normalize("ubc.ca/academics/");
        assert_eq!(once, "ubc.ca%2Facademics%2F");
        assert_eq!(normalize(&once), "ubc.ca%252Facademics%252F");
    }
}
