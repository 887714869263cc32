use hdwallet::bits::{bits_in_range, bytes_to_bit_string, left_pad};
use hdwallet::mnemonic::{self, Language};
use proptest::prelude::*;

fn entropy() -> impl Strategy<Value = Vec<u8>> {
    prop::sample::select(vec![16usize, 20, 24, 28, 32])
        .prop_flat_map(|len| prop::collection::vec(any::<u8>(), len))
}

fn bit_window() -> impl Strategy<Value = (Vec<u8>, usize, usize)> {
    prop::collection::vec(any::<u8>(), 1..16)
        .prop_flat_map(|bytes| {
            let total = bytes.len() * 8;
            (Just(bytes), 0..total)
        })
        .prop_flat_map(|(bytes, start)| {
            let max = (bytes.len() * 8 - start).min(64);
            (Just(bytes), Just(start), 1..=max)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn encoded_phrases_validate(entropy in entropy()) {
        let words = mnemonic::encode(&entropy, Language::English).unwrap();
        prop_assert_eq!(words.len(), (entropy.len() * 8 + entropy.len() / 4) / 11);
        prop_assert_eq!(mnemonic::is_valid(&words.join(" "), Language::English), Ok(true));
    }

    #[test]
    fn encoding_agrees_with_bip39_crate(entropy in entropy()) {
        let words = mnemonic::encode(&entropy, Language::English).unwrap();
        let reference = bip39::Mnemonic::from_entropy(&entropy).unwrap();
        prop_assert_eq!(words.join(" "), reference.to_string());
    }

    #[test]
    fn japanese_phrases_validate(entropy in entropy()) {
        let words = mnemonic::encode(&entropy, Language::Japanese).unwrap();
        prop_assert_eq!(mnemonic::is_valid(&words.join(" "), Language::Japanese), Ok(true));
    }

    #[test]
    fn bit_ranges_match_bit_strings((bytes, start, len) in bit_window()) {
        let bits = bytes_to_bit_string(&bytes);
        let expected = u64::from_str_radix(&bits[start..start + len], 2).unwrap();
        prop_assert_eq!(bits_in_range(&bytes, start, len), expected);
    }

    #[test]
    fn left_pad_keeps_the_low_bits(value in any::<u32>(), target in 1usize..40) {
        let bits = format!("{:b}", value);
        let padded = left_pad(&bits, target);
        prop_assert_eq!(padded.len(), target);
        if bits.len() <= target {
            prop_assert!(padded.ends_with(&bits));
        } else {
            prop_assert!(bits.ends_with(&padded));
        }
    }
}
