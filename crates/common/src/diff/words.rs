use serde::{Deserialize, Serialize};

/// Upper bound on the edit distance (token inserts plus deletes) the Myers
/// search explores. Past it the trimmed middle is reported as a single
/// removed/added pair. The search trace grows with the square of this bound.
pub const MAX_EDIT_DISTANCE: usize = 1_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Added,
    Removed,
}

/// One added or removed run of words.
///
/// `position` is a UTF-8 byte offset into the baseline (old) text. Removed
/// spans start at `position`; added spans are inserted at `position`, which
/// for a replacement is the end of the removed run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffSpan {
    pub kind: SpanKind,
    pub text: String,
    pub position: usize,
}

impl DiffSpan {
    pub fn added(text: impl Into<String>, position: usize) -> Self {
        Self { kind: SpanKind::Added, text: text.into(), position }
    }

    pub fn removed(text: impl Into<String>, position: usize) -> Self {
        Self { kind: SpanKind::Removed, text: text.into(), position }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenEdit {
    Equal,
    Insert(usize),
    Delete(usize),
}

/// Splits `text` into word tokens: a run of non-whitespace followed by the
/// whitespace after it. Leading whitespace forms its own token.
///
/// Concatenating the tokens yields `text` again.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0usize;
    let mut prev_is_ws = false;

    for (index, ch) in text.char_indices() {
        let is_ws = ch.is_whitespace();
        if index > 0 && prev_is_ws && !is_ws {
            tokens.push(&text[start..index]);
            start = index;
        }
        prev_is_ws = is_ws;
    }

    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Computes a word-level diff from `old_text` to `new_text`.
///
/// Unchanged regions are implicit. Within one change hunk the removed span is
/// emitted before the added span.
pub fn diff_words(old_text: &str, new_text: &str) -> Vec<DiffSpan> {
    if old_text == new_text {
        return Vec::new();
    }

    let old_tokens = tokenize(old_text);
    let new_tokens = tokenize(new_text);

    let prefix = old_tokens.iter().zip(&new_tokens).take_while(|(a, b)| a == b).count();
    let suffix = old_tokens[prefix..]
        .iter()
        .rev()
        .zip(new_tokens[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_middle = &old_tokens[prefix..old_tokens.len() - suffix];
    let new_middle = &new_tokens[prefix..new_tokens.len() - suffix];
    let base_offset: usize = old_tokens[..prefix].iter().map(|t| t.len()).sum();

    let edits = myers_token_edits(old_middle, new_middle, MAX_EDIT_DISTANCE).unwrap_or_else(|| {
        (0..old_middle.len())
            .map(TokenEdit::Delete)
            .chain((0..new_middle.len()).map(TokenEdit::Insert))
            .collect()
    });

    edits_to_spans(&edits, old_middle, new_middle, base_offset)
}

/// Rebuilds the new text from the baseline and its diff spans.
pub fn apply_spans(old_text: &str, spans: &[DiffSpan]) -> String {
    let mut out = String::with_capacity(old_text.len());
    let mut cursor = 0usize;

    for span in spans {
        let position = span.position.min(old_text.len());
        if position > cursor {
            out.push_str(old_text.get(cursor..position).unwrap_or_default());
            cursor = position;
        }
        match span.kind {
            SpanKind::Removed => {
                cursor = (cursor + span.text.len()).min(old_text.len());
            }
            SpanKind::Added => out.push_str(&span.text),
        }
    }

    out.push_str(old_text.get(cursor..).unwrap_or_default());
    out
}

/// Shortest edit script from `old` to `new`, or None when it needs more than
/// `max_distance` edits.
fn myers_token_edits<T: PartialEq>(
    old: &[T],
    new: &[T],
    max_distance: usize,
) -> Option<Vec<TokenEdit>> {
    let old_len = old.len();
    let new_len = new.len();

    if old_len == 0 {
        return Some((0..new_len).map(TokenEdit::Insert).collect());
    }
    if new_len == 0 {
        return Some((0..old_len).map(TokenEdit::Delete).collect());
    }

    let max = old_len + new_len;
    let offset = max as isize;
    let mut v = vec![0isize; 2 * max + 1];
    // trace[d] holds the diagonals -d..=d of `v` as they were before step d.
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let mut solved_d = None;

    'outer: for d in 0..=max.min(max_distance) {
        let d_isize = d as isize;
        trace.push(v[(offset - d_isize) as usize..=(offset + d_isize) as usize].to_vec());

        let mut k = -d_isize;
        while k <= d_isize {
            let mut x = if k == -d_isize
                || (k != d_isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
            {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = x - k;

            while x < old_len as isize && y < new_len as isize && old[x as usize] == new[y as usize]
            {
                x += 1;
                y += 1;
            }

            v[(k + offset) as usize] = x;

            if x >= old_len as isize && y >= new_len as isize {
                solved_d = Some(d);
                break 'outer;
            }

            k += 2;
        }
    }

    solved_d.map(|d| backtrack_token_edits(old_len, new_len, &trace, d))
}

fn backtrack_token_edits(
    old_len: usize,
    new_len: usize,
    trace: &[Vec<isize>],
    solved_d: usize,
) -> Vec<TokenEdit> {
    let mut edits = Vec::new();
    let mut x = old_len as isize;
    let mut y = new_len as isize;

    for d in (0..=solved_d).rev() {
        let d_isize = d as isize;
        let v = &trace[d];
        let at = |k: isize| v[(k + d_isize) as usize];
        let k = x - y;

        let prev_k = if d == 0 {
            0
        } else if k == -d_isize || (k != d_isize && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { at(prev_k) };
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(TokenEdit::Equal);
            x -= 1;
            y -= 1;
        }

        if d == 0 {
            break;
        }

        if x == prev_x {
            edits.push(TokenEdit::Insert((y - 1) as usize));
            y -= 1;
        } else {
            edits.push(TokenEdit::Delete((x - 1) as usize));
            x -= 1;
        }
    }

    edits.reverse();
    edits
}

fn edits_to_spans(
    edits: &[TokenEdit],
    old_tokens: &[&str],
    new_tokens: &[&str],
    base_offset: usize,
) -> Vec<DiffSpan> {
    let mut spans = Vec::new();
    let mut old_offset = base_offset;
    let mut old_index = 0usize;
    let mut hunk_start = base_offset;
    let mut removed = String::new();
    let mut added = String::new();

    for edit in edits {
        match edit {
            TokenEdit::Equal => {
                flush_hunk(&mut spans, hunk_start, &mut removed, &mut added);
                old_offset += old_tokens[old_index].len();
                old_index += 1;
                hunk_start = old_offset;
            }
            TokenEdit::Delete(index) => {
                removed.push_str(old_tokens[*index]);
                old_offset += old_tokens[*index].len();
                old_index += 1;
            }
            TokenEdit::Insert(index) => added.push_str(new_tokens[*index]),
        }
    }

    flush_hunk(&mut spans, hunk_start, &mut removed, &mut added);
    spans
}

fn flush_hunk(spans: &mut Vec<DiffSpan>, start: usize, removed: &mut String, added: &mut String) {
    let removed_len = removed.len();
    if !removed.is_empty() {
        spans.push(DiffSpan::removed(std::mem::take(removed), start));
    }
    if !added.is_empty() {
        spans.push(DiffSpan::added(std::mem::take(added), start + removed_len));
    }
}
