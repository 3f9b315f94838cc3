//! parsing, applying, and reversing unified-diff patches

use crate::error::{Error, Result};

/// one line inside a hunk body
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchLine {
    Context(String),
    Delete(String),
    Insert(String),
}

impl PatchLine {
    fn text(&self) -> &str {
        match self {
            PatchLine::Context(s) | PatchLine::Delete(s) | PatchLine::Insert(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<PatchLine>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    pub old_file: String,
    pub new_file: String,
    pub hunks: Vec<PatchHunk>,
}

/// a hunk that could not be located in the target text during `apply`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyError {
    pub hunk_index: usize,
    pub message: String,
}

const FUZZ: i64 = 10;

/// parse a unified diff previously produced by [`super::unified_diff`] or a
/// compatible tool
pub fn parse(text: &str) -> Result<Patch> {
    let mut lines = text.lines();

    let old_file = lines
        .next()
        .and_then(|l| l.strip_prefix("--- "))
        .ok_or_else(|| Error::PatchParse("missing '--- ' header".to_string()))?
        .to_string();
    let new_file = lines
        .next()
        .and_then(|l| l.strip_prefix("+++ "))
        .ok_or_else(|| Error::PatchParse("missing '+++ ' header".to_string()))?
        .to_string();

    let mut hunks = Vec::new();
    let mut current: Option<PatchHunk> = None;

    for line in lines {
        if let Some(rest) = line.strip_prefix("@@ ") {
            if let Some(hunk) = current.take() {
                hunks.push(hunk);
            }
            let (old_start, old_count, new_start, new_count) = parse_hunk_header(rest)?;
            current = Some(PatchHunk { old_start, old_count, new_start, new_count, lines: Vec::new() });
        } else if line.starts_with('\\') {
            // "\ No newline at end of file" - ignored
        } else {
            let hunk = current.as_mut().ok_or_else(|| Error::PatchParse("hunk body before any header".to_string()))?;
            if let Some(text) = line.strip_prefix('+') {
                hunk.lines.push(PatchLine::Insert(text.to_string()));
            } else if let Some(text) = line.strip_prefix('-') {
                hunk.lines.push(PatchLine::Delete(text.to_string()));
            } else if let Some(text) = line.strip_prefix(' ') {
                hunk.lines.push(PatchLine::Context(text.to_string()));
            } else if line.is_empty() {
                hunk.lines.push(PatchLine::Context(String::new()));
            } else {
                return Err(Error::PatchParse(format!("unrecognized hunk line: {line}")));
            }
        }
    }
    if let Some(hunk) = current.take() {
        hunks.push(hunk);
    }

    Ok(Patch { old_file, new_file, hunks })
}

fn parse_hunk_header(rest: &str) -> Result<(usize, usize, usize, usize)> {
    let rest = rest.strip_prefix('-').ok_or_else(|| Error::PatchParse(format!("bad hunk header: @@ {rest}")))?;
    let (old_range, after) = rest.split_once(" +").ok_or_else(|| Error::PatchParse(format!("bad hunk header: @@ {rest}")))?;
    let (new_range, _trailing) = after.split_once(" @@").ok_or_else(|| Error::PatchParse(format!("bad hunk header: @@ {after}")))?;

    let (old_start, old_count) = parse_range(old_range)?;
    let (new_start, new_count) = parse_range(new_range)?;
    Ok((old_start, old_count, new_start, new_count))
}

fn parse_range(range: &str) -> Result<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Ok((
            start.parse().map_err(|_| Error::PatchParse(format!("bad range: {range}")))?,
            count.parse().map_err(|_| Error::PatchParse(format!("bad range: {range}")))?,
        )),
        None => Ok((range.parse().map_err(|_| Error::PatchParse(format!("bad range: {range}")))?, 1)),
    }
}

/// render a patch back to unified-diff text
pub fn format(patch: &Patch) -> String {
    let mut out = format!("--- {}\n+++ {}\n", patch.old_file, patch.new_file);
    for hunk in &patch.hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        ));
        for line in &hunk.lines {
            let (prefix, text) = match line {
                PatchLine::Context(t) => (' ', t),
                PatchLine::Delete(t) => ('-', t),
                PatchLine::Insert(t) => ('+', t),
            };
            out.push(prefix);
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

/// swap a patch's direction: headers, hunk ranges, and `+`/`-` lines
pub fn reverse(patch: &Patch) -> Patch {
    Patch {
        old_file: patch.new_file.clone(),
        new_file: patch.old_file.clone(),
        hunks: patch
            .hunks
            .iter()
            .map(|hunk| PatchHunk {
                old_start: hunk.new_start,
                old_count: hunk.new_count,
                new_start: hunk.old_start,
                new_count: hunk.old_count,
                lines: hunk
                    .lines
                    .iter()
                    .map(|line| match line {
                        PatchLine::Context(t) => PatchLine::Context(t.clone()),
                        PatchLine::Delete(t) => PatchLine::Insert(t.clone()),
                        PatchLine::Insert(t) => PatchLine::Delete(t.clone()),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// apply `patch` to `original`, returning the patched text and any hunks that
/// could not be located (each left un-applied, subsequent hunks still tried)
pub fn apply(patch: &Patch, original: &str) -> (String, Vec<ApplyError>) {
    let mut lines: Vec<String> = super::split_lines(original).iter().map(|s| s.to_string()).collect();
    let mut offset: i64 = 0;
    let mut errors = Vec::new();

    for (index, hunk) in patch.hunks.iter().enumerate() {
        let old_seq: Vec<&str> = hunk
            .lines
            .iter()
            .filter(|l| !matches!(l, PatchLine::Insert(_)))
            .map(|l| l.text())
            .collect();
        let new_seq: Vec<String> = hunk
            .lines
            .iter()
            .filter(|l| !matches!(l, PatchLine::Delete(_)))
            .map(|l| l.text().to_string())
            .collect();

        let expected_start = hunk.old_start as i64 - 1 + offset;
        match find_match(&lines, expected_start, &old_seq) {
            Some(at) => {
                lines.splice(at..at + old_seq.len(), new_seq.iter().cloned());
                offset += new_seq.len() as i64 - old_seq.len() as i64;
            }
            None => errors.push(ApplyError { hunk_index: index, message: format!("hunk #{} failed to match", index + 1) }),
        }
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    (out, errors)
}

fn find_match(lines: &[String], expected_start: i64, old_seq: &[&str]) -> Option<usize> {
    for delta in 0..=FUZZ {
        for candidate in [expected_start + delta, expected_start - delta] {
            if candidate < 0 {
                continue;
            }
            let candidate = candidate as usize;
            if candidate + old_seq.len() > lines.len() {
                continue;
            }
            if lines[candidate..candidate + old_seq.len()].iter().map(String::as_str).eq(old_seq.iter().copied()) {
                return Some(candidate);
            }
            if delta == 0 {
                break;
            }
        }
    }
    None
}
