//! Emulation prevention for NAL unit payloads
//!
//! Inside an Annex-B stream a NAL payload may never contain `00 00 0x` with
//! `x <= 3`. Encoders insert a `0x03` byte after every pair of zero bytes
//! that would otherwise form such a pattern; decoders strip it again.

const EMULATION_PREVENTION_BYTE: u8 = 0x03;

/// Strip emulation prevention bytes (EBSP -> RBSP)
#[must_use]
pub fn unescape(ebsp: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(ebsp.len());
    let mut zeros = 0usize;

    for &byte in ebsp {
        if zeros >= 2 && byte == EMULATION_PREVENTION_BYTE {
            zeros = 0;
            continue;
        }
        rbsp.push(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }

    rbsp
}

/// Insert emulation prevention bytes (RBSP -> EBSP)
///
/// A payload whose escaped form ends in `0x00` gets a trailing `0x03`, so the
/// zero cannot merge with the following start code.
#[must_use]
pub fn escape(rbsp: &[u8]) -> Vec<u8> {
    let mut ebsp = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 1);
    let mut zeros = 0usize;

    for &byte in rbsp {
        if zeros >= 2 && byte <= EMULATION_PREVENTION_BYTE {
            ebsp.push(EMULATION_PREVENTION_BYTE);
            zeros = 0;
        }
        ebsp.push(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }

    if ebsp.last() == Some(&0) {
        ebsp.push(EMULATION_PREVENTION_BYTE);
    }

    ebsp
}

/// Whether `rbsp` survives `escape` followed by `unescape`
///
/// An odd run of trailing zero bytes does not: the `0x03` appended after the
/// last zero follows a single zero and reads back as data.
#[must_use]
pub fn survives_escaping(rbsp: &[u8]) -> bool {
    rbsp.iter().rev().take_while(|&&b| b == 0).count() % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_escape_inserts_after_two_zeros() {
        assert_eq!(escape(&[0x00, 0x00, 0x01]), vec![0x00, 0x00, 0x03, 0x01]);
        assert_eq!(
            escape(&[0x00, 0x00, 0x00, 0x00]),
            vec![0x00, 0x00, 0x03, 0x00, 0x00, 0x03]
        );
        assert_eq!(escape(&[0x00, 0x00, 0x04]), vec![0x00, 0x00, 0x04]);
    }

    #[test]
    fn test_unescape_strips_prevention_bytes() {
        assert_eq!(unescape(&[0x00, 0x00, 0x03, 0x01]), vec![0x00, 0x00, 0x01]);
        assert_eq!(
            unescape(&[0x65, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03]),
            vec![0x65, 0x00, 0x00, 0x00, 0x00]
        );
        // A lone 0x03 after a single zero is data
        assert_eq!(unescape(&[0x00, 0x03, 0x00]), vec![0x00, 0x03, 0x00]);
    }

    #[test]
    fn test_odd_trailing_zeros_do_not_survive() {
        assert!(!survives_escaping(&[0x88, 0x00]));
        assert_eq!(unescape(&escape(&[0x88, 0x00])), vec![0x88, 0x00, 0x03]);
        assert!(!survives_escaping(&[0x88, 0x00, 0x00, 0x00]));
        assert!(survives_escaping(&[0x88, 0x00, 0x00]));
        assert!(survives_escaping(&[0x88, 0x80]));
        assert!(survives_escaping(&[]));
    }

    #[test]
    fn test_cabac_zero_words_round_trip() {
        let rbsp = [0x88, 0x84, 0x00, 0x00];
        let ebsp = escape(&rbsp);
        assert_eq!(ebsp, vec![0x88, 0x84, 0x00, 0x00, 0x03]);
        assert_eq!(unescape(&ebsp), rbsp.to_vec());
    }

    proptest! {
        #[test]
        fn escape_then_unescape_is_identity(
            mut payload in proptest::collection::vec(any::<u8>(), 0..512)
        ) {
            // Real RBSPs end in a stop bit, never in a lone zero byte
            payload.push(0x80);
            prop_assert_eq!(unescape(&escape(&payload)), payload);
        }

        #[test]
        fn survives_escaping_matches_round_trip(
            payload in proptest::collection::vec(0u8..4, 0..64)
        ) {
            let round_trips = unescape(&escape(&payload)) == payload;
            prop_assert_eq!(survives_escaping(&payload), round_trips);
        }

        #[test]
        fn escaped_payload_has_no_start_code(
            payload in proptest::collection::vec(0u8..4, 0..512)
        ) {
            let ebsp = escape(&payload);
            let emulated = ebsp
                .windows(3)
                .any(|w| w[0] == 0 && w[1] == 0 && w[2] <= 0x02);
            prop_assert!(!emulated);
            prop_assert_ne!(ebsp.last(), Some(&0u8));
        }
    }
}
