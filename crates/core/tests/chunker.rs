use proptest::prelude::*;
use sow_core::chunker::chunk_text;

proptest! {
    #[test]
    fn chunks_reproduce_word_sequence(
        text in "[a-zA-Z0-9.,$ \t\n]{0,400}",
        size in 1usize..40,
    ) {
        let chunks = chunk_text(&text, size, "doc");
        let original: Vec<&str> = text.split_whitespace().collect();
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.text.split(' ')).collect();
        prop_assert_eq!(&rejoined, &original);

        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.ordinal, i);
            let words = chunk.text.split(' ').count();
            if i + 1 < chunks.len() {
                prop_assert_eq!(words, size);
            } else {
                prop_assert!(words >= 1 && words <= size);
            }
        }
        prop_assert_eq!(chunks.is_empty(), original.is_empty());
    }
}
