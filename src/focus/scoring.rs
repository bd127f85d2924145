//! Confidence scoring of window candidates against project hints.
//!
//! Every enumeration backend feeds its candidates through the same [`score`] function, so
//! the rules never depend on where a window came from. All string comparisons are
//! case-insensitive and empty strings never contribute points.

use std::path::is_separator;

use super::{FocusRequest, WindowCandidate};

/// The window's document path contains the project path.
pub const DOCUMENT_PATH_SCORE: u32 = 100;
/// The window title equals the project name.
pub const EXACT_TITLE_SCORE: u32 = 50;
/// The window title names one of the project path's directories.
pub const ANCESTOR_SCORE: u32 = 30;
/// The window title and the project name contain one another.
pub const PARTIAL_TITLE_SCORE: u32 = 25;

/// Coarse classification of a score, used to gate the more invasive strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchBand {
    /// Document path or exact title evidence.
    Direct,
    /// At least an ancestor-directory match, but nothing stronger.
    Ancestor,
    /// Partial title evidence only, or nothing.
    Weak,
}

impl MatchBand {
    pub fn of(score: u32) -> Self {
        if score >= EXACT_TITLE_SCORE {
            MatchBand::Direct
        } else if score >= ANCESTOR_SCORE {
            MatchBand::Ancestor
        } else {
            MatchBand::Weak
        }
    }
}

/// The highest scoring candidate of one enumeration pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BestMatch {
    /// Position of the candidate in enumeration order.
    pub index: usize,
    pub candidate: WindowCandidate,
    pub score: u32,
}

impl BestMatch {
    pub fn band(&self) -> MatchBand {
        MatchBand::of(self.score)
    }

    pub fn title(&self) -> Option<&str> {
        self.candidate.title.as_deref()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Computes the confidence that `candidate` is the window the request is looking for.
///
/// # Arguments
///
/// * `candidate` - Window attributes from any enumeration backend.
/// * `request` - The project hints to match against.
///
/// # Returns
///
/// The additive score; zero means "no evidence at all".
pub fn score(candidate: &WindowCandidate, request: &FocusRequest) -> u32 {
    let title = non_empty(candidate.title.as_deref());
    let document = non_empty(candidate.document.as_deref());
    let project_path = non_empty(request.project_path());
    let project_name = non_empty(request.project_name());
    let mut score = 0;

    if let (Some(document), Some(path)) = (document, project_path)
        && document.to_lowercase().contains(&path.to_lowercase())
    {
        score += DOCUMENT_PATH_SCORE;
    }

    if let (Some(title), Some(name)) = (title, project_name) {
        let title = title.to_lowercase();
        let name = name.to_lowercase();
        if title == name {
            score += EXACT_TITLE_SCORE;
        } else if title.contains(&name) || name.contains(&title) {
            score += PARTIAL_TITLE_SCORE;
        }
    }

    if let (Some(title), Some(path)) = (title, project_path)
        && is_ancestor_title(title, path)
    {
        score += ANCESTOR_SCORE;
    }

    score
}

/// Checks whether `title` names one of the directories along `project_path`.
/// E.g. a window titled `.claude` for the project `/Users/bob/.claude/repos/app`.
pub fn is_ancestor_title(title: &str, project_path: &str) -> bool {
    workspace_root(title, project_path).is_some()
}

/// Cuts `project_path` right after the first component equal to `title`.
///
/// # Arguments
///
/// * `title` - A window title that may name one of the project's directories.
/// * `project_path` - The project path hint.
///
/// # Returns
///
/// `Some(path)` with the original casing of `project_path` preserved, e.g. `/Users/bob/.claude`
/// for the title `.claude` and the project `/Users/bob/.claude/repos/app`; `None` if no
/// component matches.
pub fn workspace_root(title: &str, project_path: &str) -> Option<String> {
    if title.is_empty() {
        return None;
    }
    let title = title.to_lowercase();
    let mut offset = 0;
    for component in project_path.split(is_separator) {
        let end = offset + component.len();
        if !component.is_empty() && component.to_lowercase() == title {
            return Some(project_path[..end].to_string());
        }
        // Separators are single byte ASCII.
        offset = end + 1;
    }
    None
}

/// Stable arg-max over one enumeration pass: the first candidate with the highest positive
/// score wins.
///
/// # Returns
///
/// `None` if the slice is empty or no candidate scored above zero.
pub fn best_match(candidates: &[WindowCandidate], request: &FocusRequest) -> Option<BestMatch> {
    let mut best: Option<BestMatch> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = score(candidate, request);
        if score > 0 && best.as_ref().is_none_or(|best| score > best.score) {
            best = Some(BestMatch {
                index,
                candidate: candidate.clone(),
                score,
            });
        }
    }
    best
}
