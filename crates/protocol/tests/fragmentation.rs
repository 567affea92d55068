//! Chunking must never change what the decoder produces.
//!
//! Every test encodes a stream once, then feeds it to fresh decoders split
//! at arbitrary byte offsets (including inside multi-byte characters and
//! inside the `\n\n` delimiter) and compares against the single-chunk run.

use ot_domain::Message;
use ot_protocol::{Frame, FrameDecoder, MessageFold};
use proptest::prelude::*;

fn decode_all(bytes: &[u8], cuts: &[usize]) -> Vec<Frame> {
    let mut dec = FrameDecoder::new("data: ");
    let mut frames = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        frames.extend(dec.feed(&bytes[start..cut]));
        start = cut;
    }
    frames.extend(dec.feed(&bytes[start..]));
    frames.extend(dec.finish());
    frames
}

fn sorted_cuts(len: usize, raw: Vec<usize>) -> Vec<usize> {
    let mut cuts: Vec<usize> = raw.into_iter().map(|c| c % (len + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();
    cuts
}

fn encode_tokens(tokens: &[String]) -> Vec<u8> {
    let mut out = String::new();
    for t in tokens {
        let payload = serde_json::json!({ "type": "token", "content": t });
        out.push_str("data: ");
        out.push_str(&payload.to_string());
        out.push_str("\n\n");
    }
    out.into_bytes()
}

// Mixed-width characters so splits regularly land inside a code point.
fn token_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just('a'),
            Just(' '),
            Just('é'),
            Just('数'),
            Just('🙂'),
            Just('\n'),
        ],
        0..12,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn frames_are_independent_of_chunking(
        tokens in proptest::collection::vec(token_text(), 0..8),
        raw_cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let bytes = encode_tokens(&tokens);
        let whole = decode_all(&bytes, &[]);
        let cuts = sorted_cuts(bytes.len(), raw_cuts);
        let split = decode_all(&bytes, &cuts);

        prop_assert_eq!(whole.len(), tokens.len());
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn arbitrary_text_is_chunking_invariant(
        text in "(data: |\n|x|é|🙂| ){0,40}",
        raw_cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let bytes = text.as_bytes();
        let cuts = sorted_cuts(bytes.len(), raw_cuts);
        prop_assert_eq!(decode_all(bytes, &[]), decode_all(bytes, &cuts));
    }

    #[test]
    fn folded_content_is_chunking_invariant(
        tokens in proptest::collection::vec(token_text(), 1..8),
        raw_cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let bytes = encode_tokens(&tokens);
        let cuts = sorted_cuts(bytes.len(), raw_cuts);

        let mut fold = MessageFold::new(Message::assistant_placeholder(), "data: ");
        let mut start = 0;
        for cut in cuts {
            fold.feed(&bytes[start..cut]);
            start = cut;
        }
        fold.feed(&bytes[start..]);
        fold.finish();

        prop_assert_eq!(fold.stats().malformed, 0);
        prop_assert_eq!(&fold.message().content, &tokens.concat());
    }
}

#[test]
fn every_single_split_point_of_a_mixed_stream() {
    let stream = concat!(
        "data: {\"type\":\"step\",\"id\":\"s1\",\"title\":\"Uji normalitas\",\"status\":\"running\"}\n\n",
        ": comment\n\n",
        "data: {\"type\":\"token\",\"content\":\"数据 🙂\"}\n\n",
        "data: not json\n\n",
        "data: {\"type\":\"done\"}",
    )
    .as_bytes();
    let whole = decode_all(stream, &[]);
    assert_eq!(whole.len(), 4);
    for cut in 0..=stream.len() {
        assert_eq!(decode_all(stream, &[cut]), whole, "split at byte {cut}");
    }
}
