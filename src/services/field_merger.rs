//! Priority merge of pattern results into a single partial match
//!
//! Steps are applied in order and a field, once set, stays set. This is what
//! lets a filename-derived season outrank one recovered from a directory.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::patterns::PatternSet;

/// Raw show/season/episode tokens gathered before numeric conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialMatch {
    pub show: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub second_episode: Option<String>,
}

impl PartialMatch {
    pub fn is_empty(&self) -> bool {
        self.show.is_none()
            && self.season.is_none()
            && self.episode.is_none()
            && self.second_episode.is_none()
    }

    /// Fill unset fields from `other`, restricted to the fields in `mask`
    pub fn fill_from(&mut self, other: PartialMatch, mask: FieldMask) {
        fill(&mut self.show, other.show, mask.show);
        fill(&mut self.season, other.season, mask.season);
        fill(&mut self.episode, other.episode, mask.episode);
        fill(&mut self.second_episode, other.second_episode, mask.second_episode);
    }
}

fn fill(target: &mut Option<String>, value: Option<String>, allowed: bool) {
    if allowed && target.is_none() {
        *target = value;
    }
}

/// Which fields a merge step may write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMask {
    pub show: bool,
    pub season: bool,
    pub episode: bool,
    pub second_episode: bool,
}

impl FieldMask {
    pub const ALL: Self = Self {
        show: true,
        season: true,
        episode: true,
        second_episode: true,
    };

    /// Show, season and episode; directory names never supply a second episode
    pub const SHOW_SEASON_EPISODE: Self = Self {
        second_episode: false,
        ..Self::ALL
    };

    pub const SEASON: Self = Self {
        show: false,
        season: true,
        episode: false,
        second_episode: false,
    };

    pub const EPISODE: Self = Self {
        show: false,
        season: false,
        episode: true,
        second_episode: false,
    };
}

/// One (pattern set, fragment) pair in a merge
#[derive(Debug, Clone, Copy)]
pub struct MergeStep<'a> {
    pub label: &'static str,
    pub patterns: &'a PatternSet,
    pub text: &'a str,
    pub mask: FieldMask,
}

/// Apply steps in priority order, never overwriting a populated field
pub fn merge<'a, I>(steps: I) -> PartialMatch
where
    I: IntoIterator<Item = MergeStep<'a>>,
{
    let mut acc = PartialMatch::default();

    for step in steps {
        let Some(found) = step.patterns.apply(step.text) else {
            trace!(step = step.label, text = %step.text, "No pattern matched");
            continue;
        };

        trace!(
            step = step.label,
            text = %step.text,
            show = ?found.show,
            season = ?found.season,
            episode = ?found.episode,
            "Pattern matched"
        );
        acc.fill_from(found, step.mask);
    }

    acc
}
