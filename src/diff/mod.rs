//! line/word/char diffing and unified-diff rendering
//!
//! the core algorithm is a straightforward LCS dynamic-programming table;
//! line, word, and character diff are all the same engine over different
//! token types.

pub mod patch;

/// a single diff operation over one token (a line, word, or character)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffOp<T> {
    Equal(T),
    Delete(T),
    Insert(T),
}

impl<T> DiffOp<T> {
    pub fn value(&self) -> &T {
        match self {
            DiffOp::Equal(v) | DiffOp::Delete(v) | DiffOp::Insert(v) => v,
        }
    }
}

/// options controlling line diffing
#[derive(Clone, Debug)]
pub struct DiffOptions {
    pub ignore_whitespace: bool,
    pub ignore_blank_lines: bool,
    pub context_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { ignore_whitespace: false, ignore_blank_lines: false, context_lines: 3 }
    }
}

/// diff two token sequences via an O(mn) LCS table, back-tracing into a
/// sequence of equal/delete/insert operations in forward order
pub fn lcs_diff<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<DiffOp<T>> {
    lcs_diff_by(a, b, |x, y| x == y)
}

/// like [`lcs_diff`] but with a caller-supplied equality predicate, so callers
/// can diff under a normalized comparison (e.g. ignoring whitespace) while
/// still emitting the original token values
fn lcs_diff_by<T: Clone>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> Vec<DiffOp<T>> {
    let (m, n) = (a.len(), b.len());
    let mut table = vec![vec![0u32; n + 1]; m + 1];

    for i in (0..m).rev() {
        for j in (0..n).rev() {
            table[i][j] = if eq(&a[i], &b[j]) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if eq(&a[i], &b[j]) {
            ops.push(DiffOp::Equal(a[i].clone()));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            ops.push(DiffOp::Delete(a[i].clone()));
            i += 1;
        } else {
            ops.push(DiffOp::Insert(b[j].clone()));
            j += 1;
        }
    }
    while i < m {
        ops.push(DiffOp::Delete(a[i].clone()));
        i += 1;
    }
    while j < n {
        ops.push(DiffOp::Insert(b[j].clone()));
        j += 1;
    }
    ops
}

fn normalized_key(line: &str, options: &DiffOptions) -> String {
    if options.ignore_whitespace {
        line.trim().to_string()
    } else {
        line.to_string()
    }
}

fn lines_equal(a: &str, b: &str, options: &DiffOptions) -> bool {
    normalized_key(a, options) == normalized_key(b, options)
}

/// diff two texts line by line, honoring [`DiffOptions`]
pub fn diff_lines(old: &str, new: &str, options: &DiffOptions) -> Vec<DiffOp<String>> {
    let a: Vec<&str> = split_lines(old);
    let b: Vec<&str> = split_lines(new);

    let ops = if options.ignore_blank_lines {
        diff_lines_ignoring_blanks(&a, &b, options)
    } else {
        lcs_diff_by(&a, &b, |x, y| lines_equal(x, y, options))
    };

    ops.into_iter().map(|op| match op {
        DiffOp::Equal(v) => DiffOp::Equal(v.to_string()),
        DiffOp::Delete(v) => DiffOp::Delete(v.to_string()),
        DiffOp::Insert(v) => DiffOp::Insert(v.to_string()),
    }).collect()
}

/// blank (empty-after-trim) lines are removed from both sides before the LCS
/// table runs, rather than special-cased in the equality predicate, so an
/// unequal count of blank lines on each side (one blank line replaced by two,
/// say) never forces a spurious insert/delete pairing - the lines simply
/// aren't there to be paired. the surviving lines keep their relative order,
/// so hunk positions are still reported against genuine original content.
fn diff_lines_ignoring_blanks<'a>(a: &[&'a str], b: &[&'a str], options: &DiffOptions) -> Vec<DiffOp<&'a str>> {
    let a_filtered: Vec<&str> = a.iter().copied().filter(|l| !l.trim().is_empty()).collect();
    let b_filtered: Vec<&str> = b.iter().copied().filter(|l| !l.trim().is_empty()).collect();
    lcs_diff_by(&a_filtered, &b_filtered, |x, y| lines_equal(x, y, options))
}

/// split on `\n` without yielding a trailing empty element for a final newline
pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

/// tokenize on runs of whitespace and punctuation, keeping each run (and each
/// run of "word" characters) as its own token, for word-level diffing
pub fn tokenize_words(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_word: Option<bool> = None;

    for ch in text.chars() {
        let is_word = ch.is_alphanumeric() || ch == '_';
        if current_is_word == Some(is_word) {
            current.push(ch);
        } else {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            current.push(ch);
            current_is_word = Some(is_word);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// diff two texts at word granularity
pub fn diff_words(old: &str, new: &str) -> Vec<DiffOp<String>> {
    lcs_diff(&tokenize_words(old), &tokenize_words(new))
}

/// diff two texts at the level of individual Unicode code points
pub fn diff_chars(old: &str, new: &str) -> Vec<DiffOp<char>> {
    let a: Vec<char> = old.chars().collect();
    let b: Vec<char> = new.chars().collect();
    lcs_diff(&a, &b)
}

/// one contiguous hunk of a unified diff
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffOp<String>>,
}

/// group a flat op sequence into hunks per the unified-diff context rules:
/// leading/trailing context up to `context_lines`, merging runs separated by
/// a gap of equal lines no larger than `2 * context_lines`
pub fn build_hunks(ops: &[DiffOp<String>], context_lines: usize) -> Vec<Hunk> {
    let change_indices: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, DiffOp::Equal(_)))
        .map(|(i, _)| i)
        .collect();
    if change_indices.is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut start = change_indices[0];
    let mut end = change_indices[0];

    for &idx in &change_indices[1..] {
        let gap = idx - end - 1;
        if gap <= 2 * context_lines {
            end = idx;
        } else {
            groups.push((start, end));
            start = idx;
            end = idx;
        }
    }
    groups.push((start, end));

    groups
        .into_iter()
        .map(|(start, end)| {
            let lo = start.saturating_sub(context_lines);
            let hi = (end + context_lines + 1).min(ops.len());
            make_hunk(ops, lo, hi)
        })
        .collect()
}

fn make_hunk(ops: &[DiffOp<String>], lo: usize, hi: usize) -> Hunk {
    let slice = &ops[lo..hi];

    let old_count = slice.iter().filter(|op| !matches!(op, DiffOp::Insert(_))).count();
    let new_count = slice.iter().filter(|op| !matches!(op, DiffOp::Delete(_))).count();

    let old_start = ops[..lo].iter().filter(|op| !matches!(op, DiffOp::Insert(_))).count() + 1;
    let new_start = ops[..lo].iter().filter(|op| !matches!(op, DiffOp::Delete(_))).count() + 1;

    Hunk {
        old_start: if old_count == 0 { old_start.saturating_sub(1) } else { old_start },
        old_count,
        new_start: if new_count == 0 { new_start.saturating_sub(1) } else { new_start },
        new_count,
        lines: slice.to_vec(),
    }
}

/// render a unified diff: `--- old`, `+++ new`, then each hunk
pub fn unified_diff(old_label: &str, new_label: &str, old: &str, new: &str, options: &DiffOptions) -> String {
    let ops = diff_lines(old, new, options);
    let hunks = build_hunks(&ops, options.context_lines);

    let mut out = format!("--- {old_label}\n+++ {new_label}\n");
    for hunk in &hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        ));
        for op in &hunk.lines {
            match op {
                DiffOp::Equal(line) => out.push_str(&format!(" {line}\n")),
                DiffOp::Delete(line) => out.push_str(&format!("-{line}\n")),
                DiffOp::Insert(line) => out.push_str(&format!("+{line}\n")),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcs_diff_simple() {
        let a = vec!["a", "b", "c"];
        let b = vec!["a", "x", "c"];
        let ops = lcs_diff(&a, &b);
        assert_eq!(
            ops,
            vec![DiffOp::Equal("a"), DiffOp::Delete("b"), DiffOp::Insert("x"), DiffOp::Equal("c")]
        );
    }

    #[test]
    fn test_diff_lines_identical() {
        let ops = diff_lines("a\nb\nc\n", "a\nb\nc\n", &DiffOptions::default());
        assert!(ops.iter().all(|op| matches!(op, DiffOp::Equal(_))));
    }

    #[test]
    fn test_diff_lines_detects_insertion() {
        let ops = diff_lines("a\nb\n", "a\nb\nc\n", &DiffOptions::default());
        assert_eq!(ops.last(), Some(&DiffOp::Insert("c".to_string())));
    }

    #[test]
    fn test_ignore_whitespace_option() {
        let options = DiffOptions { ignore_whitespace: true, ..Default::default() };
        let ops = diff_lines("  hi  \n", "hi\n", &options);
        assert_eq!(ops, vec![DiffOp::Equal("  hi  ".to_string())]);
    }

    #[test]
    fn test_ignore_blank_lines_option() {
        let options = DiffOptions { ignore_blank_lines: true, ..Default::default() };
        let ops = diff_lines("a\n\nb\n", "a\n   \nb\n", &options);
        assert!(ops.iter().all(|op| matches!(op, DiffOp::Equal(_))));
    }

    #[test]
    fn test_ignore_blank_lines_unequal_blank_count_no_spurious_ops() {
        // old has one blank line, new has two: a naive equality-relaxation
        // diff would pair one blank on each side and leave a spurious
        // insert for the extra blank. filtering blanks out before diffing
        // should produce no diff ops at all, since the non-blank content
        // ("a", "b") is identical on both sides.
        let options = DiffOptions { ignore_blank_lines: true, ..Default::default() };
        let ops = diff_lines("a\n\nb\n", "a\n\n\nb\n", &options);
        assert!(ops.iter().all(|op| matches!(op, DiffOp::Equal(_))));
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_tokenize_words() {
        let tokens = tokenize_words("hello, world!");
        assert_eq!(tokens, vec!["hello", ",", " ", "world", "!"]);
    }

    #[test]
    fn test_diff_words() {
        let ops = diff_words("the quick fox", "the slow fox");
        let changed: Vec<_> = ops.iter().filter(|op| !matches!(op, DiffOp::Equal(_))).collect();
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn test_diff_chars() {
        let ops = diff_chars("cat", "car");
        assert_eq!(ops.last(), Some(&DiffOp::Insert('r')));
    }

    #[test]
    fn test_unified_diff_no_changes_has_no_hunks() {
        let rendered = unified_diff("a", "b", "same\n", "same\n", &DiffOptions::default());
        assert_eq!(rendered, "--- a\n+++ b\n");
    }

    #[test]
    fn test_unified_diff_single_hunk() {
        let old = "one\ntwo\nthree\n";
        let new = "one\ntwo\nTHREE\n";
        let rendered = unified_diff("old", "new", old, new, &DiffOptions { context_lines: 1, ..Default::default() });

        assert!(rendered.contains("--- old"));
        assert!(rendered.contains("+++ new"));
        assert!(rendered.contains("@@ -2,2 +2,2 @@"));
        assert!(rendered.contains("-three"));
        assert!(rendered.contains("+THREE"));
    }

    #[test]
    fn test_build_hunks_merges_close_changes() {
        let old = "a\nb\nc\nd\ne\nf\n";
        let new = "A\nb\nc\nd\ne\nF\n";
        let ops = diff_lines(old, new, &DiffOptions { context_lines: 3, ..Default::default() });
        let hunks = build_hunks(&ops, 3);
        // gap of 4 equal lines is <= 2*3, so both changes merge into one hunk
        assert_eq!(hunks.len(), 1);
    }

    #[test]
    fn test_build_hunks_splits_far_changes() {
        let old = "a\n1\n2\n3\n4\n5\n6\n7\n8\n9\nb\n";
        let new = "A\n1\n2\n3\n4\n5\n6\n7\n8\n9\nB\n";
        let ops = diff_lines(old, new, &DiffOptions { context_lines: 1, ..Default::default() });
        let hunks = build_hunks(&ops, 1);
        assert_eq!(hunks.len(), 2);
    }
}
