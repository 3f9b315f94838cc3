//! three-way text merge with conflict markers, plus merge-base search and the
//! per-file fast paths used by a commit-level merge

use crate::diff::{lcs_diff, split_lines, DiffOp};
use crate::error::{Error, Result};
use crate::hash::Hash;

/// conflict marker style
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictStyle {
    Merge,
    Diff3,
}

#[derive(Clone, Debug)]
pub struct MergeOptions {
    pub conflict_style: ConflictStyle,
    pub ours_label: String,
    pub theirs_label: String,
    pub base_label: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self { conflict_style: ConflictStyle::Merge, ours_label: "ours".to_string(), theirs_label: "theirs".to_string(), base_label: "base".to_string() }
    }
}

/// a single conflict region recorded by [`merge_texts`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub base: Vec<String>,
    pub ours: Vec<String>,
    pub theirs: Vec<String>,
    /// 1-indexed, inclusive line span of the conflict block in the merged output
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Clone, Debug)]
pub struct MergeResult {
    pub text: String,
    pub conflicts: Vec<Conflict>,
}

/// a run of base lines replaced by one side's content; `base_start == base_end`
/// marks a pure insertion at that base position
#[derive(Clone, Debug, PartialEq, Eq)]
struct Region {
    base_start: usize,
    base_end: usize,
    content: Vec<String>,
}

fn compute_regions(base: &[String], other: &[String]) -> Vec<Region> {
    let ops = lcs_diff(base, other);
    let mut regions = Vec::new();
    let mut base_idx = 0;
    let mut i = 0;

    while i < ops.len() {
        if matches!(ops[i], DiffOp::Equal(_)) {
            base_idx += 1;
            i += 1;
            continue;
        }
        let start = base_idx;
        let mut content = Vec::new();
        while i < ops.len() && !matches!(ops[i], DiffOp::Equal(_)) {
            match &ops[i] {
                DiffOp::Delete(_) => base_idx += 1,
                DiffOp::Insert(v) => content.push(v.clone()),
                DiffOp::Equal(_) => unreachable!(),
            }
            i += 1;
        }
        regions.push(Region { base_start: start, base_end: base_idx, content });
    }
    regions
}

/// three-way merge of line-based text, per the short-circuit + region-walk algorithm
pub fn merge_texts(base: &str, ours: &str, theirs: &str, options: &MergeOptions) -> MergeResult {
    if base == ours {
        return MergeResult { text: theirs.to_string(), conflicts: Vec::new() };
    }
    if base == theirs {
        return MergeResult { text: ours.to_string(), conflicts: Vec::new() };
    }
    if ours == theirs {
        return MergeResult { text: ours.to_string(), conflicts: Vec::new() };
    }

    let base_lines: Vec<String> = split_lines(base).iter().map(|s| s.to_string()).collect();
    let ours_lines: Vec<String> = split_lines(ours).iter().map(|s| s.to_string()).collect();
    let theirs_lines: Vec<String> = split_lines(theirs).iter().map(|s| s.to_string()).collect();

    let ours_regions = compute_regions(&base_lines, &ours_lines);
    let theirs_regions = compute_regions(&base_lines, &theirs_lines);

    let mut out: Vec<String> = Vec::new();
    let mut conflicts = Vec::new();

    let mut base_pos = 0;
    let mut oi = 0;
    let mut ti = 0;

    while base_pos < base_lines.len() || oi < ours_regions.len() || ti < theirs_regions.len() {
        let next_start = match (ours_regions.get(oi), theirs_regions.get(ti)) {
            (Some(o), Some(t)) => Some(o.base_start.min(t.base_start)),
            (Some(o), None) => Some(o.base_start),
            (None, Some(t)) => Some(t.base_start),
            (None, None) => None,
        };

        match next_start {
            None => {
                out.extend(base_lines[base_pos..].iter().cloned());
                base_pos = base_lines.len();
            }
            Some(start) if start > base_pos => {
                // unchanged gap before the next region: copy verbatim
                out.extend(base_lines[base_pos..start].iter().cloned());
                base_pos = start;
            }
            Some(start) => {
                // a region starts here (or earlier, caught up by a prior overlapping
                // region on the other side): absorb every region from either side
                // whose start falls inside the group's span, growing the span as
                // regions extend it, until neither side has anything more to add
                let mut group_end = start;
                let mut group_ours: Vec<&Region> = Vec::new();
                let mut group_theirs: Vec<&Region> = Vec::new();

                loop {
                    let mut grew = false;
                    if let Some(r) = ours_regions.get(oi) {
                        if r.base_start <= group_end {
                            group_end = group_end.max(r.base_end);
                            group_ours.push(r);
                            oi += 1;
                            grew = true;
                        }
                    }
                    if let Some(r) = theirs_regions.get(ti) {
                        if r.base_start <= group_end {
                            group_end = group_end.max(r.base_end);
                            group_theirs.push(r);
                            ti += 1;
                            grew = true;
                        }
                    }
                    if !grew {
                        break;
                    }
                }

                let ours_content: Vec<String> = group_ours.iter().flat_map(|r| r.content.iter().cloned()).collect();
                let theirs_content: Vec<String> = group_theirs.iter().flat_map(|r| r.content.iter().cloned()).collect();

                if group_ours.is_empty() {
                    out.extend(theirs_content);
                } else if group_theirs.is_empty() {
                    out.extend(ours_content);
                } else if ours_content == theirs_content {
                    out.extend(ours_content);
                } else {
                    let conflict_base = base_lines[start..group_end].to_vec();
                    let start_line = out.len() + 1;

                    out.push(format!("<<<<<<< {}", options.ours_label));
                    out.extend(ours_content.iter().cloned());
                    if options.conflict_style == ConflictStyle::Diff3 {
                        out.push(format!("||||||| {}", options.base_label));
                        out.extend(conflict_base.iter().cloned());
                    }
                    out.push("=======".to_string());
                    out.extend(theirs_content.iter().cloned());
                    out.push(format!(">>>>>>> {}", options.theirs_label));

                    conflicts.push(Conflict {
                        base: conflict_base,
                        ours: ours_content,
                        theirs: theirs_content,
                        start_line,
                        end_line: out.len(),
                    });
                }

                base_pos = group_end;
            }
        }
    }

    let mut text = out.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    MergeResult { text, conflicts }
}

/// true iff all three conflict marker prefixes occur in `text`
pub fn has_conflicts(text: &str) -> bool {
    text.contains("<<<<<<<") && text.contains("=======") && text.contains(">>>>>>>")
}

/// a conflict region parsed back out of merged text by [`extract_conflicts`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedConflict {
    pub ours: Vec<String>,
    pub base: Option<Vec<String>>,
    pub theirs: Vec<String>,
    pub start_line: usize,
    pub end_line: usize,
}

/// parse `<<<<<<<` / `|||||||` / `=======` / `>>>>>>>` marker regions out of `text`
pub fn extract_conflicts(text: &str) -> Vec<ExtractedConflict> {
    let lines: Vec<&str> = split_lines(text);
    let mut out = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("<<<<<<<") {
            let start_line = i + 1;
            let mut j = i + 1;
            let mut ours = Vec::new();
            while j < lines.len() && !lines[j].starts_with("|||||||") && !lines[j].starts_with("=======") {
                ours.push(lines[j].to_string());
                j += 1;
            }

            let mut base = None;
            if j < lines.len() && lines[j].starts_with("|||||||") {
                j += 1;
                let mut base_lines = Vec::new();
                while j < lines.len() && !lines[j].starts_with("=======") {
                    base_lines.push(lines[j].to_string());
                    j += 1;
                }
                base = Some(base_lines);
            }

            if j < lines.len() && lines[j].starts_with("=======") {
                j += 1;
            }
            let mut theirs = Vec::new();
            while j < lines.len() && !lines[j].starts_with(">>>>>>>") {
                theirs.push(lines[j].to_string());
                j += 1;
            }
            let end_line = j + 1;
            if j < lines.len() {
                j += 1;
            }

            out.push(ExtractedConflict { ours, base, theirs, start_line, end_line });
            i = j;
        } else {
            i += 1;
        }
    }
    out
}

/// how to resolve a single conflict region in [`resolve_conflict`]
pub enum Resolution {
    Ours,
    Theirs,
    Base,
    Literal(String),
}

/// rewrite the `index`-th conflict region in `text`, leaving the rest untouched
pub fn resolve_conflict(text: &str, index: usize, choice: Resolution) -> Result<String> {
    let conflicts = extract_conflicts(text);
    let total = conflicts.len();
    let conflict = conflicts.get(index).ok_or(Error::ConflictIndexOutOfRange(index, total))?;

    let replacement = match choice {
        Resolution::Ours => conflict.ours.join("\n"),
        Resolution::Theirs => conflict.theirs.join("\n"),
        Resolution::Base => conflict
            .base
            .as_ref()
            .ok_or_else(|| Error::InvalidConflictChoice("no base text recorded (merge style, not diff3)".to_string()))?
            .join("\n"),
        Resolution::Literal(text) => text,
    };

    let lines: Vec<&str> = split_lines(text);
    let mut out = Vec::new();
    out.extend(lines[..conflict.start_line - 1].iter().map(|s| s.to_string()));
    if !replacement.is_empty() {
        out.extend(replacement.split('\n').map(|s| s.to_string()));
    }
    out.extend(lines[conflict.end_line..].iter().map(|s| s.to_string()));

    let mut result = out.join("\n");
    if !result.is_empty() {
        result.push('\n');
    }
    Ok(result)
}

/// BFS the first-parent-and-all-parents ancestry of a commit, collecting every
/// reachable commit hash
fn ancestors(repo: &crate::repo::Repo, start: Hash) -> Result<std::collections::HashSet<Hash>> {
    let mut seen = std::collections::HashSet::new();
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(start);
    seen.insert(start);

    while let Some(hash) = queue.pop_front() {
        let commit = crate::objects::commit::read_commit(repo, &hash)?;
        for parent in commit.parents {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(seen)
}

/// true iff `ancestor` is `descendant` or reachable by walking `descendant`'s parents
pub fn is_ancestor(repo: &crate::repo::Repo, ancestor: Hash, descendant: Hash) -> Result<bool> {
    if ancestor == descendant {
        return Ok(true);
    }
    Ok(ancestors(repo, descendant)?.contains(&ancestor))
}

/// find the best common ancestor of two commits by BFS-ing both ancestor sets
/// and taking the first commit that appears in both, walking `a`'s history
/// breadth-first (closest-to-`a` wins on ties)
pub fn merge_base(repo: &crate::repo::Repo, a: Hash, b: Hash) -> Result<Hash> {
    let b_ancestors = ancestors(repo, b)?;

    let mut seen = std::collections::HashSet::new();
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(a);
    seen.insert(a);

    while let Some(hash) = queue.pop_front() {
        if b_ancestors.contains(&hash) {
            return Ok(hash);
        }
        let commit = crate::objects::commit::read_commit(repo, &hash)?;
        for parent in commit.parents {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }

    Err(Error::UnrelatedHistories(a, b))
}

/// outcome of the per-path fast-path decision during a commit-level merge
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    /// no conflict; this is the path's final content (`None` means deleted)
    Resolved(Option<Hash>),
    /// both sides touched the path incompatibly; content left in place is a best-effort guess
    Conflict(Option<Hash>),
}

/// decide the fast path for one file across base/ours/theirs, per the
/// unchanged/changed-one-side/identical/differs/added/deleted cases
pub fn classify_file(base: Option<Hash>, ours: Option<Hash>, theirs: Option<Hash>) -> FileOutcome {
    match (base, ours, theirs) {
        (None, None, None) => FileOutcome::Resolved(None),
        // present on at most one side, absent everywhere else: take the added one
        (None, None, Some(t)) => FileOutcome::Resolved(Some(t)),
        (None, Some(o), None) => FileOutcome::Resolved(Some(o)),
        (Some(_), None, None) => FileOutcome::Resolved(None),
        // added on both sides
        (None, Some(o), Some(t)) if o == t => FileOutcome::Resolved(Some(o)),
        (None, Some(_), Some(t)) => FileOutcome::Conflict(Some(t)),
        // deleted on one side, the other side's state decides
        (Some(b), None, Some(t)) => {
            if b == t {
                FileOutcome::Resolved(None)
            } else {
                FileOutcome::Conflict(Some(t))
            }
        }
        (Some(b), Some(o), None) => {
            if b == o {
                FileOutcome::Resolved(None)
            } else {
                FileOutcome::Conflict(Some(o))
            }
        }
        (Some(_), Some(o), Some(t)) if o == t => FileOutcome::Resolved(Some(o)),
        (Some(b), Some(o), Some(t)) => {
            if b == o {
                FileOutcome::Resolved(Some(t))
            } else if b == t {
                FileOutcome::Resolved(Some(o))
            } else {
                FileOutcome::Conflict(Some(o))
            }
        }
    }
}
