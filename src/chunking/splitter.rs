//! Recursive separator-based splitter with overlapping windows.
//!
//! Two passes:
//! 1. Cut the text into segments no longer than the budget. Each separator is
//!    tried in priority order, and only segments that are still too long are
//!    handed to the next one. Arbitrary character boundaries are the last
//!    resort. A separator opens the segment that follows it, so a `// bad`
//!    marker stays with the code it introduces, and the segments
//!    concatenate back to the input.
//! 2. Merge segments greedily into windows up to the budget. A new window
//!    starts with the trailing whole segments of the previous one that fit in
//!    the overlap budget.

/// A window over the source, in byte offsets, plus its character bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// Character offset of `start` in the source
    pub start_char: usize,
    pub char_len: usize,
    /// Leading characters shared with the previous span
    pub overlap: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
    chars: usize,
}

/// Split `text` into overlapping spans of at most `max_chars` characters.
///
/// `overlap` must be smaller than `max_chars`; callers validate this through
/// the chunking config.
pub fn split_spans(text: &str, separators: &[String], max_chars: usize, overlap: usize) -> Vec<Span> {
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut segments = Vec::new();
    segment(text, 0, separators, max_chars, &mut segments);
    merge(&segments, max_chars, overlap.min(max_chars.saturating_sub(1)))
}

fn segment(text: &str, offset: usize, separators: &[String], max_chars: usize, out: &mut Vec<Segment>) {
    let chars = text.chars().count();
    if chars <= max_chars {
        out.push(Segment {
            start: offset,
            end: offset + text.len(),
            chars,
        });
        return;
    }

    match separators.split_first() {
        Some((sep, rest)) if !sep.is_empty() && text.contains(sep.as_str()) => {
            let mut pos = offset;
            for piece in split_leading(text, sep) {
                segment(piece, pos, rest, max_chars, out);
                pos += piece.len();
            }
        }
        Some((_, rest)) => segment(text, offset, rest, max_chars, out),
        None => split_by_chars(text, offset, max_chars, out),
    }
}

/// Split before every occurrence of `sep`. No piece is empty.
fn split_leading<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (idx, _) in text.match_indices(sep) {
        if idx > start {
            pieces.push(&text[start..idx]);
            start = idx;
        }
    }
    pieces.push(&text[start..]);
    pieces
}

fn split_by_chars(text: &str, offset: usize, max_chars: usize, out: &mut Vec<Segment>) {
    let mut piece_start = 0usize;
    let mut count = 0usize;

    for (i, _) in text.char_indices() {
        if count == max_chars {
            out.push(Segment {
                start: offset + piece_start,
                end: offset + i,
                chars: count,
            });
            piece_start = i;
            count = 0;
        }
        count += 1;
    }

    if count > 0 {
        out.push(Segment {
            start: offset + piece_start,
            end: offset + text.len(),
            chars: count,
        });
    }
}

fn merge(segments: &[Segment], max_chars: usize, overlap: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    // Segments in the current window; the first `carried` of them are overlap.
    let mut window: Vec<Segment> = Vec::new();
    let mut window_chars = 0usize;
    let mut carried = 0usize;
    let mut carried_chars = 0usize;
    let mut char_cursor = 0usize;

    for seg in segments {
        if !window.is_empty() && window_chars + seg.chars > max_chars {
            spans.push(window_span(&window, window_chars, carried_chars, char_cursor));

            // Keep the longest tail of whole segments that fits both the
            // overlap budget and the room left next to `seg`.
            let budget = overlap.min(max_chars - seg.chars);
            let mut keep_from = window.len();
            let mut kept_chars = 0usize;
            while keep_from > 0 && kept_chars + window[keep_from - 1].chars <= budget {
                keep_from -= 1;
                kept_chars += window[keep_from].chars;
            }

            char_cursor += window_chars - kept_chars;
            window.drain(..keep_from);
            window_chars = kept_chars;
            carried = window.len();
            carried_chars = kept_chars;
        }

        window.push(*seg);
        window_chars += seg.chars;
    }

    if window.len() > carried {
        spans.push(window_span(&window, window_chars, carried_chars, char_cursor));
    }

    spans
}

fn window_span(window: &[Segment], chars: usize, overlap: usize, start_char: usize) -> Span {
    Span {
        start: window[0].start,
        end: window[window.len() - 1].end,
        start_char,
        char_len: chars,
        overlap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seps(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn texts<'a>(text: &'a str, spans: &[Span]) -> Vec<&'a str> {
        spans.iter().map(|s| &text[s.start..s.end]).collect()
    }

    #[test]
    fn test_empty_text_has_no_spans() {
        assert!(split_spans("", &seps(&["\n\n"]), 10, 2).is_empty());
    }

    #[test]
    fn test_small_text_is_one_span() {
        let text = "short rule";
        let spans = split_spans(text, &seps(&["\n\n", "\n"]), 100, 10);
        assert_eq!(spans.len(), 1);
        assert_eq!(texts(text, &spans), vec![text]);
        assert_eq!(spans[0].overlap, 0);
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = "aaaa aaaa\n\nbbbb bbbb\n\ncccc cccc";
        let spans = split_spans(text, &seps(&["\n\n", "\n", " "]), 12, 0);
        assert_eq!(
            texts(text, &spans),
            vec!["aaaa aaaa", "\n\nbbbb bbbb", "\n\ncccc cccc"]
        );
    }

    #[test]
    fn test_falls_back_to_line_breaks_for_long_paragraph() {
        let text = "line one\nline two\nline three";
        let spans = split_spans(text, &seps(&["\n\n", "\n"]), 11, 0);
        assert_eq!(texts(text, &spans), vec!["line one", "\nline two", "\nline three"]);
    }

    #[test]
    fn test_comment_marker_stays_with_its_code() {
        let text = "// bad\nvar total = 0;\n// good\nlet total = 0;";
        let spans = split_spans(text, &seps(&["\n\n", "\n// ", "\n", "//", ";", "{", "}", " "]), 24, 0);
        assert_eq!(
            texts(text, &spans),
            vec!["// bad\nvar total = 0;", "\n// good\nlet total = 0;"]
        );
    }

    #[test]
    fn test_leading_split_keeps_every_byte() {
        let text = "\n\n\nab\n\ncd\n\n";
        let pieces = split_leading(text, "\n\n");
        assert_eq!(pieces.concat(), text);
        assert!(pieces.iter().all(|p| !p.is_empty()));
        assert_eq!(pieces, vec!["\n\n\nab", "\n\ncd", "\n\n"]);
    }

    #[test]
    fn test_falls_back_to_characters() {
        let text = "abcdefghij";
        let spans = split_spans(text, &seps(&["\n\n", "\n", " "]), 4, 0);
        assert_eq!(texts(text, &spans), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_overlap_carries_whole_trailing_segments() {
        let text = "aa bb cc dd ee";
        let spans = split_spans(text, &seps(&[" "]), 6, 3);
        let chunks = texts(text, &spans);
        assert_eq!(chunks[0], "aa bb");
        // " bb" (3 chars) is carried into the next window
        assert_eq!(spans[1].overlap, 3);
        assert!(chunks[1].starts_with(" bb"));
        for span in &spans {
            assert!(span.char_len <= 6);
        }
    }

    #[test]
    fn test_overlap_zero_when_tail_segment_too_big() {
        let text = "aaaaa bbbbb";
        let spans = split_spans(text, &seps(&[" "]), 6, 2);
        assert_eq!(texts(text, &spans), vec!["aaaaa", " bbbbb"]);
        assert_eq!(spans[1].overlap, 0);
    }

    #[test]
    fn test_multibyte_characters_count_as_one() {
        let text = "规范规范规范";
        let spans = split_spans(text, &seps(&[]), 4, 0);
        assert_eq!(texts(text, &spans), vec!["规范规范", "规范"]);
        assert_eq!(spans[1].start_char, 4);
    }

    #[test]
    fn test_start_char_tracks_overlap() {
        let text = "aa bb cc dd";
        let spans = split_spans(text, &seps(&[" "]), 6, 3);
        for span in &spans {
            let expected: String = text.chars().skip(span.start_char).take(span.char_len).collect();
            assert_eq!(&text[span.start..span.end], expected);
        }
    }
}
