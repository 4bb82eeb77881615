//! Property-based tests for the pure helpers behind identifiers, QR binding,
//! certificate rendering, and catalog query parsing.

use agridirect_api::{
    identifiers,
    services::{
        catalog::{CatalogCriteria, SortBy},
        certificate::escape_html,
        qr_binder::verification_url,
    },
    storage::sanitize_filename,
};
use proptest::prelude::*;
use uuid::Uuid;

fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn base_url_strategy() -> impl Strategy<Value = String> {
    ("(http|https)", "[a-z]{3,12}", prop_oneof!["com", "in", "org"])
        .prop_map(|(scheme, host, tld)| format!("{}://{}.{}", scheme, host, tld))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn any_uuid_round_trips_in_both_textual_forms(id in uuid_strategy()) {
        prop_assert_eq!(identifiers::parse(&id.to_string()).unwrap(), id);
        prop_assert_eq!(identifiers::parse(&id.simple().to_string()).unwrap(), id);
    }

    #[test]
    fn short_strings_never_validate(s in "[a-z0-9-]{0,31}") {
        prop_assert!(!identifiers::validate(&s));
    }

    #[test]
    fn verification_url_ignores_one_trailing_slash(base in base_url_strategy(), id in uuid_strategy()) {
        let bare = verification_url(&base, id);
        let slashed = verification_url(&format!("{}/", base), id);
        prop_assert_eq!(&bare, &slashed);
        prop_assert_eq!(bare, format!("{}/product/{}/view", base, id));
    }

    #[test]
    fn escaped_html_has_no_markup_characters(raw in ".*") {
        let escaped = escape_html(&raw);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
    }

    #[test]
    fn plain_text_is_not_altered_by_escaping(raw in "[A-Za-z0-9 .,]*") {
        prop_assert_eq!(escape_html(&raw), raw);
    }

    #[test]
    fn sanitized_filenames_are_path_free(name in ".{0,40}") {
        let cleaned = sanitize_filename(&name);
        prop_assert!(!cleaned.is_empty());
        prop_assert!(!cleaned.starts_with('.'));
        prop_assert!(cleaned
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')));
    }

    #[test]
    fn numeric_price_bounds_always_parse(cents in 0u64..10_000_000) {
        let raw = format!("{}.{:02}", cents / 100, cents % 100);
        let criteria = CatalogCriteria::from_query_pairs([("min_price", raw.as_str())]).unwrap();
        prop_assert!(criteria.min_price.is_some());
    }

    #[test]
    fn unknown_sort_keys_mean_default_order(key in "[a-z_]{1,12}") {
        let expected = SortBy::parse(&key);
        let criteria = CatalogCriteria::from_query_pairs([("sort_by", key.as_str())]).unwrap();
        prop_assert_eq!(criteria.sort_by, expected);
        if !matches!(key.as_str(), "price_asc" | "price_desc" | "newest") {
            prop_assert!(criteria.sort_by.is_none());
        }
    }
}
