//! Property tests for the envelope codec
//!
//! Uses a reduced work factor; the properties do not depend on it.

use proptest::prelude::*;
use whisperbox::envelope::{MIN_ENVELOPE_LEN, SALT_LEN};
use whisperbox::kdf::KdfParams;
use whisperbox::{Codec, ErrorKind};

fn codec() -> Codec {
    Codec::new(KdfParams::with_iterations(64))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn roundtrip(plaintext in ".{0,300}", passphrase in ".{0,40}") {
        let envelope = codec().encrypt(&plaintext, &passphrase).unwrap();
        prop_assert_eq!(codec().decrypt(envelope.as_bytes(), &passphrase).unwrap(), plaintext);
    }

    #[test]
    fn wrong_passphrase_rejected(
        plaintext in ".{0,100}",
        right in ".{0,20}",
        wrong in ".{0,20}",
    ) {
        prop_assume!(right != wrong);
        let envelope = codec().encrypt(&plaintext, &right).unwrap();
        let err = codec().decrypt(envelope.as_bytes(), &wrong).unwrap_err();
        prop_assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn envelope_length_tracks_plaintext(plaintext in ".{0,200}") {
        let envelope = codec().encrypt(&plaintext, "pw").unwrap();
        prop_assert_eq!(envelope.len(), MIN_ENVELOPE_LEN + plaintext.len());
    }

    #[test]
    fn tampering_detected(
        plaintext in ".{1,100}",
        position in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let envelope = codec().encrypt(&plaintext, "pw").unwrap();
        let mut bytes = envelope.into_bytes();
        let i = position.index(bytes.len());
        bytes[i] ^= flip;

        let err = codec().decrypt(&bytes, "pw").unwrap_err();
        prop_assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn short_input_is_malformed(bytes in prop::collection::vec(any::<u8>(), 0..MIN_ENVELOPE_LEN)) {
        // Only finishes if no key is derived
        let slow = Codec::new(KdfParams::with_iterations(u32::MAX));
        let err = slow.decrypt(&bytes, "pw").unwrap_err();
        prop_assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn kdf_is_deterministic(passphrase in ".{0,40}", salt in any::<[u8; SALT_LEN]>()) {
        let params = KdfParams::with_iterations(64);
        let k1 = params.derive(&passphrase, &salt).unwrap();
        let k2 = params.derive(&passphrase, &salt).unwrap();
        prop_assert_eq!(*k1, *k2);
    }

    #[test]
    fn kdf_separates_salts(
        passphrase in ".{0,40}",
        s1 in any::<[u8; SALT_LEN]>(),
        s2 in any::<[u8; SALT_LEN]>(),
    ) {
        prop_assume!(s1 != s2);
        let params = KdfParams::with_iterations(64);
        prop_assert_ne!(*params.derive(&passphrase, &s1).unwrap(), *params.derive(&passphrase, &s2).unwrap());
    }
}
