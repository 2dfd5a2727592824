//! Property-based tests for pointer and number primitives.
//!
//! Properties under test:
//! 1. RFC 6901 string round-trip: `parse(to_string(p)) == p`
//! 2. URI-fragment round-trip: `parse_uri_fragment(to_uri_fragment(p)) == p`
//! 3. `evaluate` returns the node whose path was followed
//! 4. Decimal display round-trip preserves mathematical value

use json_schema_eval_core::{JsonNode, JsonPointer, Number};
use proptest::prelude::*;
use serde_json::json;

/// Arbitrary pointer tokens, biased toward the RFC 6901 edge cases.
fn arb_token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("".to_string()),
        Just("/".to_string()),
        Just("~".to_string()),
        Just("~0".to_string()),
        Just("~1".to_string()),
        Just("0".to_string()),
        Just("-".to_string()),
        "[[:print:]]{0,20}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, ..Default::default() })]

    #[test]
    fn pointer_string_roundtrip(tokens in proptest::collection::vec(arb_token(), 0..6)) {
        let pointer = JsonPointer::from_tokens(tokens.clone());
        let parsed = JsonPointer::parse(&pointer.to_string()).unwrap();
        prop_assert_eq!(parsed.tokens(), tokens.as_slice());
    }

    #[test]
    fn pointer_uri_fragment_roundtrip(tokens in proptest::collection::vec(arb_token(), 0..6)) {
        let pointer = JsonPointer::from_tokens(tokens);
        let fragment = pointer.to_uri_fragment();
        let parsed = JsonPointer::parse_uri_fragment(&fragment).unwrap();
        prop_assert_eq!(parsed, pointer);
    }

    #[test]
    fn pointer_concatenation_associates(
        a in proptest::collection::vec(arb_token(), 0..4),
        b in proptest::collection::vec(arb_token(), 0..4),
        c in proptest::collection::vec(arb_token(), 0..4),
    ) {
        let (pa, pb, pc) = (
            JsonPointer::from_tokens(a),
            JsonPointer::from_tokens(b),
            JsonPointer::from_tokens(c),
        );
        prop_assert_eq!(pa.join(&pb).join(&pc), pa.join(&pb.join(&pc)));
    }

    #[test]
    fn parent_inverts_child(tokens in proptest::collection::vec(arb_token(), 0..4), last in arb_token()) {
        let pointer = JsonPointer::from_tokens(tokens);
        prop_assert_eq!(pointer.child(last).parent(), Some(pointer));
    }

    #[test]
    fn evaluate_follows_object_keys(keys in proptest::collection::vec("[a-z]{1,8}", 1..4)) {
        // Build a nested object along `keys` ending in a sentinel.
        let mut value = json!("sentinel");
        for key in keys.iter().rev() {
            value = json!({ key.clone(): value });
        }
        let root = JsonNode::from_value(&value);
        let pointer = JsonPointer::from_tokens(keys);
        let found = pointer.evaluate(&root).unwrap();
        prop_assert_eq!(found.to_json(), json!("sentinel"));
    }

    #[test]
    fn number_display_roundtrip(mantissa in -1_000_000i64..1_000_000, exponent in -6i32..6) {
        let literal = format!("{mantissa}e{exponent}");
        let number = Number::from_literal(&literal).unwrap();
        let redisplayed = Number::from_literal(&number.to_string()).unwrap();
        prop_assert!(number == redisplayed);
    }

    #[test]
    fn number_multiple_of_scaled_self(mantissa in 1i64..100_000, exponent in -4i32..4) {
        let literal = format!("{mantissa}e{exponent}");
        let number = Number::from_literal(&literal).unwrap();
        prop_assert!(number.is_multiple_of(&number));
        // 3x is always a multiple of x.
        let tripled = Number::from_literal(&format!("{}e{exponent}", mantissa * 3)).unwrap();
        prop_assert!(tripled.is_multiple_of(&number));
    }
}
