//! Property-based tests for packet framing round-trips (spec §6 wire
//! grammar): every LEN6-representable length and every two-digit packet
//! id must survive an encode/classify round trip.

use das::stream::framing::{classify_tag, data_tag, descriptor_tag, encode_len6, parse_len6, PacketTag};
use proptest::prelude::*;

proptest! {
    #[test]
    fn len6_round_trips_over_its_whole_range(len in 0usize..=999_999) {
        let enc = encode_len6(len).unwrap();
        prop_assert_eq!(parse_len6(&enc).unwrap(), len);
    }

    #[test]
    fn descriptor_tag_round_trips_for_every_valid_id(id in 0u8..=99) {
        let tag = descriptor_tag(id);
        prop_assert_eq!(classify_tag(&tag).unwrap(), PacketTag::Descriptor(id));
    }

    #[test]
    fn data_tag_round_trips_for_every_nonzero_id(id in 1u8..=99) {
        let tag = data_tag(id);
        prop_assert_eq!(classify_tag(&tag).unwrap(), PacketTag::Data(id));
    }

    #[test]
    fn len6_beyond_capacity_always_errors(len in 1_000_000usize..10_000_000) {
        prop_assert!(encode_len6(len).is_err());
    }
}
