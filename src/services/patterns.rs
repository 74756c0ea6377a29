//! Pattern library for episode filename recognition
//!
//! Patterns are grouped into sets by the scope they target:
//! - Standalone: a whole "Show - 3x04 - Title" or "Show S03E04" filename
//! - Embedded: "S03E04", "3x03" or ".602." fragments inside a longer name
//! - Season folder: a trailing number on a directory ("Season 3", "3")
//! - Episode only: bare episode numbers ("01 of 08", "ep234")
//!
//! All patterns expect lower-cased input.

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use super::field_merger::PartialMatch;

/// Scope a pattern set is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Standalone,
    Embedded,
    SeasonFolder,
    EpisodeOnly,
}

/// Capture group index for each field a pattern can populate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSlots {
    pub show: Option<usize>,
    pub season: Option<usize>,
    pub episode: Option<usize>,
    pub second_episode: Option<usize>,
}

impl FieldSlots {
    /// Resolve slots from the conventional group names
    /// (`show`, `season`, `ep`, `secondEp`)
    pub fn from_names(regex: &Regex) -> Self {
        let mut slots = Self::default();
        for (index, name) in regex.capture_names().enumerate() {
            match name {
                Some("show") => slots.show = Some(index),
                Some("season") => slots.season = Some(index),
                Some("ep") => slots.episode = Some(index),
                Some("secondEp") => slots.second_episode = Some(index),
                _ => {}
            }
        }
        slots
    }

    fn extract(&self, caps: &Captures<'_>) -> PartialMatch {
        let token = |slot: Option<usize>| {
            slot.and_then(|i| caps.get(i))
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        PartialMatch {
            show: token(self.show),
            season: token(self.season),
            episode: token(self.episode),
            second_episode: token(self.second_episode),
        }
    }
}

/// A compiled pattern paired with its field extractor
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    slots: FieldSlots,
}

impl Pattern {
    /// Compile a pattern whose fields are named capture groups
    pub fn named(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid episode pattern: {}", pattern))?;
        let slots = FieldSlots::from_names(&regex);
        Ok(Self { regex, slots })
    }

    /// Compile a pattern whose fields are given by group position
    pub fn positional(pattern: &str, slots: FieldSlots) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid episode pattern: {}", pattern))?;

        let groups = regex.captures_len();
        for index in [slots.show, slots.season, slots.episode, slots.second_episode]
            .into_iter()
            .flatten()
        {
            if index >= groups {
                anyhow::bail!(
                    "Capture group {} out of range for pattern {} ({} groups)",
                    index,
                    pattern,
                    groups
                );
            }
        }

        Ok(Self { regex, slots })
    }

    pub fn slots(&self) -> FieldSlots {
        self.slots
    }

    /// Fields from the first match of this pattern, if it matches at all
    pub fn apply(&self, text: &str) -> Option<PartialMatch> {
        self.regex.captures(text).map(|caps| self.slots.extract(&caps))
    }
}

/// Ordered patterns sharing a matching scope
#[derive(Debug, Clone)]
pub struct PatternSet {
    kind: PatternKind,
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new(kind: PatternKind, patterns: Vec<Pattern>) -> Self {
        Self { kind, patterns }
    }

    fn from_named(kind: PatternKind, sources: &[&str]) -> Result<Self> {
        let patterns = sources
            .iter()
            .map(|p| Pattern::named(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(kind, patterns))
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Run the set against one fragment.
    ///
    /// The first pattern that matches wins and all of its fields are taken
    /// together; later patterns are never consulted to fill gaps.
    pub fn apply(&self, text: &str) -> Option<PartialMatch> {
        self.patterns.iter().find_map(|p| p.apply(text))
    }
}

const EMBEDDED_PATTERNS: &[&str] = &[
    // s03e04, s03e04-e05
    r"(?P<show>.*?)[sS](?P<season>[0-9]+)[\._ ]*[eE](?P<ep>[0-9]+)([- ]?[Ee+](?P<secondEp>[0-9]+))?",
    // s03-04
    r"(?P<show>.*?)[sS](?P<season>[0-9]{2})[\._\- ]+(?P<ep>[0-9]+)",
    // 3x03, 3x03-3x04
    r"(?P<show>.*?)([^0-9]|^)(?P<season>[0-9]{1,2})[Xx](?P<ep>[0-9]+)(-[0-9]+[Xx](?P<secondEp>[0-9]+))?",
    // .602.
    r"(.*?)[^0-9a-z](?P<season>[0-9]{1,2})(?P<ep>[0-9]{2})([\.\-][0-9]+(?P<secondEp>[0-9]{2})([ \-_\.]|$)[\.\-]?)?([^0-9a-z%]|$)",
];

const STANDALONE_PATTERNS: &[&str] = &[
    // Newzbin style: "show (2004) - 3x04 - title"
    r"(.*?)( \(([0-9]+)\))? - ([0-9]+)+x([0-9]+)(-[0-9]+[Xx]([0-9]+))?( - (.*))?",
    // "show (2004) s03e04 - title"
    r"(.*?)( \(([0-9]+)\))?[Ss]([0-9]+)+[Ee]([0-9]+)(-[0-9]+[Xx]([0-9]+))?( - (.*))?",
];

/// Group layout shared by both standalone patterns
const STANDALONE_SLOTS: FieldSlots = FieldSlots {
    show: Some(1),
    season: Some(4),
    episode: Some(5),
    second_episode: Some(7),
};

const SEASON_FOLDER_PATTERNS: &[&str] = &[r".*?(?P<season>[0-9]+)$"];

const EPISODE_ONLY_PATTERNS: &[&str] = &[
    // 01 of 08
    r"(?P<ep>[0-9]{1,3})[\. -_]of[\. -_]+[0-9]{1,3}",
    // 01 - foo
    r"^(?P<ep>[0-9]{1,3})[^0-9]",
    // blah blah ep234
    r"e[a-z]*[ \.\-_]*(?P<ep>[0-9]{2,3})([^0-9c-uw-z%]|$)",
    // flah - 04 - blah
    r".*?[ \.\-_](?P<ep>[0-9]{2,3})[^0-9c-uw-z%]+",
    // flah - 04
    r".*?[ \.\-_](?P<ep>[0-9]{2,3})$",
    // flah707
    r".*?[^0-9x](?P<ep>[0-9]{2,3})$",
];

/// The four pattern tiers consulted by the episode matcher
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    pub standalone: PatternSet,
    pub embedded: PatternSet,
    pub season_folder: PatternSet,
    pub episode_only: PatternSet,
}

impl PatternLibrary {
    /// Compile the built-in pattern tables
    pub fn standard() -> Result<Self> {
        let standalone = STANDALONE_PATTERNS
            .iter()
            .map(|p| Pattern::positional(p, STANDALONE_SLOTS))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            standalone: PatternSet::new(PatternKind::Standalone, standalone),
            embedded: PatternSet::from_named(PatternKind::Embedded, EMBEDDED_PATTERNS)?,
            season_folder: PatternSet::from_named(
                PatternKind::SeasonFolder,
                SEASON_FOLDER_PATTERNS,
            )?,
            episode_only: PatternSet::from_named(PatternKind::EpisodeOnly, EPISODE_ONLY_PATTERNS)?,
        })
    }
}
