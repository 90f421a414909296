//! Address-list normalization.

use std::collections::HashSet;

/// Split a comma-separated address header into unique trimmed addresses.
///
/// Duplicates are dropped, keeping each address's first position. An absent
/// or empty header yields an empty list. Multiplicity of repeated addresses
/// is not retained; only membership is used downstream.
pub fn split_address_list(value: Option<&str>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    value
        .split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .filter(|addr| seen.insert(addr.to_string()))
        .map(str::to_string)
        .collect()
}

/// The local part of an address: everything before the first `@`.
pub fn local_part(address: &str) -> &str {
    match address.find('@') {
        Some(at) => &address[..at],
        None => address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_deduplicates() {
        let addresses = split_address_list(Some("a@x.com, b@y.com,a@x.com"));
        assert_eq!(addresses, vec!["a@x.com", "b@y.com"]);
    }

    #[test]
    fn split_trims_whitespace() {
        let addresses = split_address_list(Some("  a@x.com ,\n\tb@y.com "));
        assert_eq!(addresses, vec!["a@x.com", "b@y.com"]);
    }

    #[test]
    fn split_empty_string() {
        assert!(split_address_list(Some("")).is_empty());
    }

    #[test]
    fn split_absent_header() {
        assert!(split_address_list(None).is_empty());
    }

    #[test]
    fn split_skips_empty_tokens() {
        let addresses = split_address_list(Some("a@x.com,, ,b@y.com"));
        assert_eq!(addresses, vec!["a@x.com", "b@y.com"]);
    }

    #[test]
    fn local_part_of_address() {
        assert_eq!(local_part("phillip.allen@enron.com"), "phillip.allen");
        assert_eq!(local_part("no-at-sign"), "no-at-sign");
    }
}
