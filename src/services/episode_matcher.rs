//! Episode matcher
//!
//! Resolves a media file path to a catalog episode:
//! 1. Pattern passes over the filename, parent and grandparent directory
//!    names, merged by priority (see [`field_merger`](super::field_merger))
//! 2. Release metadata from the filename
//! 3. A single title search against the [`ShowResolver`]
//!
//! The matcher holds no mutable state, so one instance can serve concurrent
//! calls as long as the resolver can.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::field_merger::{self, FieldMask, MergeStep, PartialMatch};
use super::filename_parser::{FileMetadata, MetadataDictionaries};
use super::patterns::PatternLibrary;
use super::show_resolver::ShowResolver;
use super::text_utils::{normalize_show_title, title_similarity};

/// How season/episode tokens that are not valid numbers are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberPolicy {
    /// Unparsable tokens become 0
    #[default]
    Lenient,
    /// Unparsable tokens fail the match
    Strict,
}

impl NumberPolicy {
    /// Convert a raw token. A missing token is 0 under either policy.
    fn convert(self, field: &'static str, token: Option<&str>) -> Result<u32, MatchError> {
        let Some(token) = token else {
            return Ok(0);
        };

        match token.parse::<u32>() {
            Ok(value) => Ok(value),
            Err(_) if self == NumberPolicy::Lenient => {
                warn!(field = field, token = token, "Unparsable number in filename, using 0");
                Ok(0)
            }
            Err(_) => Err(MatchError::MalformedNumber {
                field,
                token: token.to_string(),
            }),
        }
    }
}

/// Matcher behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatcherConfig {
    pub number_policy: NumberPolicy,
}

/// Failures from [`EpisodeMatcher::match_path`]
#[derive(Debug, Error)]
pub enum MatchError {
    /// The resolver call itself failed
    #[error(transparent)]
    ResolverUnavailable(anyhow::Error),

    #[error("No matching show for title {title:?}")]
    NoMatchingShow { title: String },

    #[error("Malformed {field} number {token:?}")]
    MalformedNumber { field: &'static str, token: String },
}

/// A file matched to a catalog episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEpisode {
    pub show_id: String,
    pub season: u32,
    pub number: u32,
    pub files: Vec<FileMetadata>,
}

/// Everything learned from a path before the catalog is consulted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    pub partial: PartialMatch,
    pub file: FileMetadata,
}

/// Path components the pattern passes look at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PathParts {
    filename: String,
    dir: String,
    parent: Option<String>,
    grandparent: Option<String>,
}

/// Resolve `.` and `..` lexically, keeping leading `..` of relative paths
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

impl PathParts {
    fn split(path: &str) -> Self {
        let normalized = normalize_lexically(Path::new(path));
        let path = normalized.as_path();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent_path = path.parent();
        let dir = parent_path
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut ancestors = parent_path
            .into_iter()
            .flat_map(Path::ancestors)
            .filter_map(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());

        let parent = ancestors.next();
        let grandparent = ancestors.next();

        Self {
            filename,
            dir,
            parent,
            grandparent,
        }
    }
}

/// Filename-to-episode matcher
pub struct EpisodeMatcher {
    patterns: PatternLibrary,
    dictionaries: MetadataDictionaries,
    resolver: Arc<dyn ShowResolver>,
    config: MatcherConfig,
}

impl EpisodeMatcher {
    pub fn new(
        patterns: PatternLibrary,
        resolver: Arc<dyn ShowResolver>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            patterns,
            dictionaries: MetadataDictionaries::default(),
            resolver,
            config,
        }
    }

    /// Replace the built-in metadata dictionaries
    pub fn with_dictionaries(mut self, dictionaries: MetadataDictionaries) -> Self {
        self.dictionaries = dictionaries;
        self
    }

    pub fn config(&self) -> MatcherConfig {
        self.config
    }

    /// Run the pattern and metadata passes without touching the catalog
    pub fn identify(&self, path: &str) -> Identification {
        let parts = PathParts::split(path);
        let filename = parts.filename.to_lowercase();
        let parent = parts.parent.as_deref().map(str::to_lowercase);
        let grandparent = parts.grandparent.as_deref().map(str::to_lowercase);

        let lib = &self.patterns;
        let mut steps = vec![
            MergeStep {
                label: "filename/standalone",
                patterns: &lib.standalone,
                text: &filename,
                mask: FieldMask::ALL,
            },
            MergeStep {
                label: "filename/embedded",
                patterns: &lib.embedded,
                text: &filename,
                mask: FieldMask::ALL,
            },
            MergeStep {
                label: "filename/episode",
                patterns: &lib.episode_only,
                text: &filename,
                mask: FieldMask::EPISODE,
            },
        ];

        if let Some(parent) = parent.as_deref() {
            steps.push(MergeStep {
                label: "parent/season",
                patterns: &lib.season_folder,
                text: parent,
                mask: FieldMask::SEASON,
            });
            steps.push(MergeStep {
                label: "parent/embedded",
                patterns: &lib.embedded,
                text: parent,
                mask: FieldMask::SHOW_SEASON_EPISODE,
            });
        }

        if let Some(grandparent) = grandparent.as_deref() {
            steps.push(MergeStep {
                label: "grandparent/embedded",
                patterns: &lib.embedded,
                text: grandparent,
                mask: FieldMask::SHOW_SEASON_EPISODE,
            });
        }

        let partial = field_merger::merge(steps);
        let file = self.dictionaries.parse(&parts.filename, &parts.dir);

        Identification { partial, file }
    }

    /// Match a path to catalog episodes.
    ///
    /// Returns an empty list when no show token is recognized. At most one
    /// episode is returned.
    pub async fn match_path(&self, path: &str) -> Result<Vec<ResolvedEpisode>, MatchError> {
        let Identification { partial, file } = self.identify(path);

        let Some(title) = partial
            .show
            .as_deref()
            .map(normalize_show_title)
            .filter(|t| !t.is_empty())
        else {
            debug!(path = path, "No show recognized in path, skipping");
            return Ok(Vec::new());
        };

        let policy = self.config.number_policy;
        let season = policy.convert("season", partial.season.as_deref())?;
        let number = policy.convert("episode", partial.episode.as_deref())?;

        let shows = self
            .resolver
            .query_shows_by_title(&title)
            .await
            .map_err(|e| {
                info!(path = path, title = %title, error = %e, "Could not query shows for file");
                MatchError::ResolverUnavailable(e)
            })?;

        let Some(show) = shows.into_iter().next() else {
            return Err(MatchError::NoMatchingShow { title });
        };

        debug!(
            title = %title,
            candidate = %show.title,
            similarity = title_similarity(&title, &show.title),
            "Taking first show candidate"
        );

        if let Some(second) = partial.second_episode.as_deref() {
            debug!(path = path, second_episode = second, "Ignoring second episode in file");
        }

        info!(
            show = %show.title,
            show_id = show.id,
            season = season,
            episode = number,
            path = path,
            "Got match S{:02}E{:02}",
            season,
            number
        );

        Ok(vec![ResolvedEpisode {
            show_id: show.id.to_string(),
            season,
            number,
            files: vec![file],
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::show_resolver::Show;
    use anyhow::Result;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct NoShows;

    #[async_trait]
    impl ShowResolver for NoShows {
        async fn query_shows_by_title(&self, _title: &str) -> Result<Vec<Show>> {
            Ok(Vec::new())
        }
    }

    fn matcher() -> EpisodeMatcher {
        EpisodeMatcher::new(
            PatternLibrary::standard().unwrap(),
            Arc::new(NoShows),
            MatcherConfig::default(),
        )
    }

    fn token(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_split_path() {
        let parts = PathParts::split("/tv/The.Wire/The.Wire.S03E04.mkv");
        assert_eq!(parts.filename, "The.Wire.S03E04.mkv");
        assert_eq!(parts.dir, "/tv/The.Wire");
        assert_eq!(parts.parent, token("The.Wire"));
        assert_eq!(parts.grandparent, token("tv"));
    }

    #[test]
    fn test_split_path_without_ancestors() {
        let parts = PathParts::split("readme.txt");
        assert_eq!(parts.filename, "readme.txt");
        assert_eq!(parts.parent, None);
        assert_eq!(parts.grandparent, None);

        let parts = PathParts::split("/show.s01e01.mkv");
        assert_eq!(parts.dir, "/");
        assert_eq!(parts.parent, None);
    }

    #[test]
    fn test_split_path_resolves_dot_components() {
        let parts = PathParts::split("/tv/Show.S01E01/Season 2/../03.mkv");
        assert_eq!(parts.filename, "03.mkv");
        assert_eq!(parts.dir, "/tv/Show.S01E01");
        assert_eq!(parts.parent, token("Show.S01E01"));
        assert_eq!(parts.grandparent, token("tv"));

        let parts = PathParts::split("./shows/./Lost/Lost.S01E02.mkv");
        assert_eq!(parts.dir, "shows/Lost");
        assert_eq!(parts.parent, token("Lost"));

        let parts = PathParts::split("../Lost/Lost.S01E02.mkv");
        assert_eq!(parts.dir, "../Lost");
        assert_eq!(parts.parent, token("Lost"));
        assert_eq!(parts.grandparent, None);

        let parts = PathParts::split("/../Lost.S01E02.mkv");
        assert_eq!(parts.dir, "/");
        assert_eq!(parts.parent, None);
    }

    #[test]
    fn test_identify_scene_release() {
        let id = matcher().identify("/tv/The.Wire/The.Wire.S03E04.720p.HDTV.x264-LOL.mkv");
        assert_eq!(id.partial.show, token("the.wire."));
        assert_eq!(id.partial.season, token("03"));
        assert_eq!(id.partial.episode, token("04"));
        assert_eq!(id.file.release_group, token("LOL"));
        assert_eq!(id.file.resolution, token("720p"));
    }

    #[test]
    fn test_identify_filename_season_beats_parent() {
        let id = matcher().identify("/tv/Show.S05E01/Show.S03E04.mkv");
        assert_eq!(id.partial.season, token("03"));
        assert_eq!(id.partial.episode, token("04"));
    }

    #[test]
    fn test_identify_season_folder() {
        let id = matcher().identify("/tv/Some Show/Season 3/03.mkv");
        assert_eq!(id.partial.show, None);
        assert_eq!(id.partial.season, token("3"));
        assert_eq!(id.partial.episode, token("03"));
    }

    #[test]
    fn test_identify_show_from_grandparent() {
        let id = matcher().identify("/tv/Some.Show.S03E01/Season 3/03.mkv");
        assert_eq!(id.partial.show, token("some.show."));
        assert_eq!(id.partial.season, token("3"));
        assert_eq!(id.partial.episode, token("03"));
    }

    #[test]
    fn test_identify_show_from_parent_fills_gaps() {
        let id = matcher().identify("/tv/Show.Name.S02E01-E03/show.name.602.hdtv.mkv");
        assert_eq!(id.partial.show, token("show.name."));
        assert_eq!(id.partial.season, token("6"));
        assert_eq!(id.partial.episode, token("02"));
        assert_eq!(id.partial.second_episode, None);
    }

    #[test]
    fn test_custom_dictionaries_and_config() {
        let matcher = EpisodeMatcher::new(
            PatternLibrary::standard().unwrap(),
            Arc::new(NoShows),
            MatcherConfig {
                number_policy: NumberPolicy::Strict,
            },
        )
        .with_dictionaries(MetadataDictionaries {
            release_groups: vec!["HomeRip".to_string()],
            ..Default::default()
        });

        assert_eq!(matcher.config().number_policy, NumberPolicy::Strict);
        let id = matcher.identify("/tv/Show/Show.S01E01.720p-HomeRip.mkv");
        assert_eq!(id.file.release_group, token("HomeRip"));
        assert_eq!(id.file.resolution, token("720p"));
    }

    #[test]
    fn test_number_policy() {
        assert_eq!(NumberPolicy::Lenient.convert("season", Some("03")).unwrap(), 3);
        assert_eq!(NumberPolicy::Lenient.convert("season", Some("x")).unwrap(), 0);
        assert_eq!(NumberPolicy::Lenient.convert("season", None).unwrap(), 0);
        assert_eq!(NumberPolicy::Strict.convert("season", None).unwrap(), 0);
        assert!(matches!(
            NumberPolicy::Strict.convert("episode", Some("99999999999")),
            Err(MatchError::MalformedNumber { field: "episode", .. })
        ));
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let err = matcher()
            .match_path("/tv/The.Wire/The.Wire.S03E04.mkv")
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::NoMatchingShow { ref title } if title == "the wire"));
    }
}
