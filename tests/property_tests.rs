use gcif_entropy::{
    bitstreams::{BitReader, BitWriter},
    huffman::{
        decoder::HuffmanDecoder,
        encoder::HuffmanEncoder,
        meta::{read_code_lengths, write_code_lengths, MetaTableEncoder, Predictor},
        MAX_CODE_SIZE, MAX_TABLE_BITS,
    },
    read_section, write_section, CodecConfig,
};
use proptest::prelude::*;

fn used_symbols(freqs: &[u32]) -> Vec<u16> {
    freqs
        .iter()
        .enumerate()
        .filter(|&(_, &f)| f > 0)
        .map(|(s, _)| s as u16)
        .collect()
}

/// Drops lengths that would oversubscribe the code space, leaving a complete
/// or under-full code.
fn fit_code_space(mut lens: Vec<u8>) -> Vec<u8> {
    let full = 1u32 << MAX_CODE_SIZE;
    let mut used = 0u32;

    for len in lens.iter_mut().filter(|len| **len > 0) {
        let share = full >> *len;
        if used + share > full {
            *len = 0;
        } else {
            used += share;
        }
    }

    lens
}

proptest! {
    #[test]
    fn test_huffman_roundtrip(
        freqs in prop::collection::vec(0..1000u32, 2..300),
        picks in prop::collection::vec(any::<usize>(), 0..500),
        table_bits in 0..=MAX_TABLE_BITS,
    ) {
        let used = used_symbols(&freqs);
        prop_assume!(!used.is_empty());

        let symbols = picks.iter().map(|&p| used[p % used.len()]).collect::<Vec<_>>();

        let encoder = HuffmanEncoder::new(&freqs).unwrap();

        let mut writer = BitWriter::new();
        let header_bits = encoder.write_table(&mut writer).unwrap();
        for &sym in symbols.iter() {
            encoder.write_symbol(sym, &mut writer);
        }
        let written = writer.written_bits;

        let mut reader = BitReader::new(writer.into_words().into());
        let decoder = HuffmanDecoder::read_table(&mut reader, freqs.len(), table_bits).unwrap();
        prop_assert_eq!(reader.position(), header_bits as usize);

        let decoded = (0..symbols.len())
            .map(|_| decoder.next(&mut reader).unwrap())
            .collect::<Vec<_>>();

        prop_assert_eq!(decoded, symbols);
        prop_assert_eq!(reader.position(), written);
    }

    #[test]
    fn test_explicit_lengths_roundtrip(
        lens in prop::collection::vec(0..=16u8, 2..400).prop_map(fit_code_space),
        picks in prop::collection::vec(any::<usize>(), 0..300),
        table_bits in 0..=MAX_TABLE_BITS,
    ) {
        let used = lens
            .iter()
            .enumerate()
            .filter(|&(_, &len)| len > 0)
            .map(|(s, _)| s as u16)
            .collect::<Vec<_>>();
        prop_assume!(!used.is_empty());

        let symbols = picks.iter().map(|&p| used[p % used.len()]).collect::<Vec<_>>();

        let encoder = HuffmanEncoder::from_code_lengths(&lens).unwrap();

        let mut writer = BitWriter::new();
        encoder.write_table(&mut writer).unwrap();
        for &sym in symbols.iter() {
            encoder.write_symbol(sym, &mut writer);
        }
        let written = writer.written_bits;

        let mut reader = BitReader::new(writer.into_words().into());
        let decoder = HuffmanDecoder::read_table(&mut reader, lens.len(), table_bits).unwrap();

        let decoded = (0..symbols.len())
            .map(|_| decoder.next(&mut reader).unwrap())
            .collect::<Vec<_>>();

        prop_assert_eq!(decoded, symbols);
        prop_assert_eq!(reader.position(), written);
    }

    #[test]
    fn test_table_width_equivalence(
        freqs in prop::collection::vec(0..5000u32, 2..600),
        picks in prop::collection::vec(any::<usize>(), 1..300),
        table_bits in 1..=MAX_TABLE_BITS,
    ) {
        let used = used_symbols(&freqs);
        prop_assume!(!used.is_empty());

        let encoder = HuffmanEncoder::new(&freqs).unwrap();
        let lens = encoder.code_lengths();
        prop_assert!(lens.iter().all(|&len| len as usize <= MAX_CODE_SIZE));

        let mut writer = BitWriter::new();
        for &p in picks.iter() {
            encoder.write_symbol(used[p % used.len()], &mut writer);
        }
        let words = writer.into_words();

        let slow = HuffmanDecoder::from_code_lengths(&lens, 0).unwrap();
        let fast = HuffmanDecoder::from_code_lengths(&lens, table_bits).unwrap();

        let mut slow_reader = BitReader::new(words.clone().into());
        let mut fast_reader = BitReader::new(words.into());

        for _ in 0..picks.len() {
            prop_assert_eq!(slow.next(&mut slow_reader).unwrap(), fast.next(&mut fast_reader).unwrap());
            prop_assert_eq!(slow_reader.position(), fast_reader.position());
        }
    }

    #[test]
    fn test_length_table_roundtrip(
        lens in prop::collection::vec(prop_oneof![3 => Just(0u8), 2 => 1..=16u8], 2..1200),
    ) {
        prop_assume!(lens.iter().any(|&len| len > 0));

        let mut writer = BitWriter::new();
        let bits = write_code_lengths(&lens, &mut writer).unwrap();

        let mut reader = BitReader::new(writer.into_words().into());
        let decoded = read_code_lengths(&mut reader, lens.len()).unwrap();

        prop_assert_eq!(decoded, lens);
        prop_assert_eq!(reader.position(), bits as usize);
    }

    #[test]
    fn test_chosen_predictor_is_cheapest(
        lens in prop::collection::vec(0..=16u8, 21..500),
    ) {
        let best = MetaTableEncoder::new(&lens).unwrap();

        for predictor in Predictor::ALL {
            let candidate = MetaTableEncoder::with_predictor(&lens, predictor).unwrap();
            prop_assert!(best.cost() <= candidate.cost());
        }
    }

    #[test]
    fn test_section_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..3000),
        huffman_threshold in 1..200usize,
        table_bits in 0..=MAX_TABLE_BITS,
    ) {
        let config = CodecConfig { table_bits, huffman_threshold, ..Default::default() };

        let mut writer = BitWriter::new();
        write_section(&data, &config, &mut writer).unwrap();

        let mut reader = BitReader::from_bytes(&writer.into_bytes());
        prop_assert_eq!(read_section(&mut reader, &config).unwrap(), data);
    }
}
