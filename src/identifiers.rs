//! Entity identifiers.
//!
//! Every entity key is a UUID v7: generated without coordination, ordered by
//! creation time, and safe to embed in a URL path segment. Syntactic checks
//! never touch the store, so a malformed id is reported separately from an
//! id that simply does not resolve.

use uuid::Uuid;

use crate::errors::ServiceError;

/// Generates a fresh identifier for a new entity.
pub fn generate() -> Uuid {
    Uuid::now_v7()
}

/// Pure syntactic check. Accepts the hyphenated and simple UUID forms.
pub fn validate(candidate: &str) -> bool {
    parse(candidate).is_ok()
}

/// Parses an identifier supplied by a caller.
pub fn parse(candidate: &str) -> Result<Uuid, ServiceError> {
    let trimmed = candidate.trim();
    if trimmed.len() != 36 && trimmed.len() != 32 {
        return Err(ServiceError::InvalidIdentifier(candidate.to_string()));
    }
    Uuid::try_parse(trimmed).map_err(|_| ServiceError::InvalidIdentifier(candidate.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[test]
    fn generated_ids_are_time_ordered_and_unique() {
        let ids: Vec<Uuid> = (0..64).map(|_| generate()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(ids[0].get_version_num(), 7);
    }

    #[rstest]
    #[case("0191f0b4-6a0e-7cc1-a3f4-5b2f0d6d7f10", true)]
    #[case("0191f0b46a0e7cc1a3f45b2f0d6d7f10", true)]
    #[case("not-an-id", false)]
    #[case("", false)]
    #[case("{0191f0b4-6a0e-7cc1-a3f4-5b2f0d6d7f10}", false)]
    #[case("urn:uuid:0191f0b4-6a0e-7cc1-a3f4-5b2f0d6d7f10", false)]
    #[case("0191f0b4-6a0e-7cc1-a3f4-5b2f0d6d7f1z", false)]
    fn validate_is_syntactic(#[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(validate(candidate), expected);
    }

    #[test]
    fn parse_failure_is_invalid_identifier() {
        assert_matches!(parse("abc"), Err(ServiceError::InvalidIdentifier(raw)) if raw == "abc");
    }

    #[test]
    fn generated_id_round_trips_through_parse() {
        let id = generate();
        assert_eq!(parse(&id.to_string()).unwrap(), id);
    }
}
