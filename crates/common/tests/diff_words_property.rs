use clause_common::diff::{apply_spans, diff_words, SpanKind};
use proptest::collection::vec;
use proptest::prelude::*;

fn interesting_char() -> impl Strategy<Value = char> {
    prop_oneof![
        (b'a'..=b'e').prop_map(char::from),
        (b'A'..=b'C').prop_map(char::from),
        (b'0'..=b'3').prop_map(char::from),
        Just(' '),
        Just(' '),
        Just('\n'),
        Just('\t'),
        Just('$'),
        Just('.'),
        Just(','),
        Just('#'),
        Just('🙂'),
        Just('中'),
        Just('é'),
    ]
}

fn prose(min_len: usize, max_len: usize) -> impl Strategy<Value = String> {
    vec(interesting_char(), min_len..max_len).prop_map(|chars| chars.into_iter().collect())
}

fn assert_reconstructs(old_text: &str, new_text: &str) {
    let spans = diff_words(old_text, new_text);
    let rebuilt = apply_spans(old_text, &spans);
    assert_eq!(
        rebuilt,
        new_text,
        "reconstruction mismatch: old_len={} new_len={} spans={}",
        old_text.len(),
        new_text.len(),
        spans.len()
    );
}

fn build_document(paragraphs: usize, marker: &str) -> String {
    let mut out = String::new();
    for i in 0..paragraphs {
        out.push_str("## Section ");
        out.push_str(&i.to_string());
        out.push('\n');
        out.push_str("Marker: ");
        out.push_str(marker);
        out.push('\n');
        out.push_str("Body text with repeated words for diff stress.\n\n");
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn reconstructs_new_text_from_baseline(old in prose(0, 120), new in prose(0, 120)) {
        assert_reconstructs(&old, &new);
    }

    #[test]
    fn identical_inputs_produce_no_spans(text in prose(0, 200)) {
        prop_assert!(diff_words(&text, &text).is_empty());
    }

    #[test]
    fn local_edit_reconstructs(
        base in prose(0, 200),
        insert in prose(0, 20),
        cut in 0usize..200,
    ) {
        let boundary = base
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(base.len()))
            .nth(cut % (base.chars().count() + 1))
            .unwrap_or(base.len());
        let mut edited = base.clone();
        edited.insert_str(boundary, &insert);
        assert_reconstructs(&base, &edited);
        assert_reconstructs(&edited, &base);
    }

    #[test]
    fn span_positions_are_ordered_and_in_bounds(old in prose(0, 120), new in prose(0, 120)) {
        let spans = diff_words(&old, &new);
        let mut last = 0usize;
        for span in &spans {
            prop_assert!(span.position >= last);
            prop_assert!(span.position <= old.len());
            prop_assert!(!span.text.is_empty());
            if span.kind == SpanKind::Removed {
                prop_assert_eq!(&old[span.position..span.position + span.text.len()], span.text.as_str());
            }
            last = span.position;
        }
    }
}

#[test]
fn large_document_single_marker_change() {
    let old = build_document(400, "before");
    let mut new = old.clone();
    let at = new.find("Marker: before").expect("marker should exist") + "Marker: ".len();
    new.replace_range(at..at + "before".len(), "after");

    let spans = diff_words(&old, &new);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].kind, SpanKind::Removed);
    assert_eq!(spans[0].text, "before\n");
    assert_eq!(spans[1].text, "after\n");
    assert_eq!(apply_spans(&old, &spans), new);
}

#[test]
fn large_document_scattered_changes() {
    let old = build_document(300, "m");
    let new = old
        .replace("## Section 2\nMarker: m\n", "## Section 2\nMarker: early\n")
        .replace("## Section 297\nMarker: m\n", "## Section 297\nMarker: late\n");

    let spans = diff_words(&old, &new);
    let texts: Vec<(SpanKind, &str)> =
        spans.iter().map(|span| (span.kind, span.text.as_str())).collect();
    assert_eq!(texts, vec![
        (SpanKind::Removed, "m\n"),
        (SpanKind::Added, "early\n"),
        (SpanKind::Removed, "m\n"),
        (SpanKind::Added, "late\n"),
    ]);
    assert_eq!(apply_spans(&old, &spans), new);
}

#[test]
fn heavy_rewrite_of_large_document_still_reconstructs() {
    let old = build_document(300, "m");
    let new = old.replace("Section 1", "Part 1").replace("repeated", "recurring");
    assert_reconstructs(&old, &new);
}
