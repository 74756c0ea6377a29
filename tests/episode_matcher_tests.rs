//! Integration tests for the episode matcher
//!
//! These tests drive the full match flow against an in-memory catalog:
//! - Pattern priority across filename and directories
//! - Metadata extraction
//! - Show resolution and its failure modes
//! - Numeric conversion policy

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use assert_matches::assert_matches;
use async_trait::async_trait;
use pretty_assertions::assert_eq;

use librarian_matcher::services::{
    FieldSlots, Pattern, PatternKind, PatternSet, parse_metadata,
};
use librarian_matcher::{
    EpisodeMatcher, FileMetadata, MatchError, MatcherConfig, NumberPolicy, PatternLibrary,
    ResolvedEpisode, Show, ShowResolver,
};

// ============================================================================
// In-memory catalog
// ============================================================================

/// Catalog keyed by exact query, recording every query it receives
#[derive(Default)]
struct MemoryCatalog {
    shows: HashMap<String, Vec<Show>>,
    fail_with: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl MemoryCatalog {
    fn with_show(mut self, query: &str, show: Show) -> Self {
        self.shows.entry(query.to_string()).or_default().push(show);
        self
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShowResolver for MemoryCatalog {
    async fn query_shows_by_title(&self, title: &str) -> Result<Vec<Show>> {
        self.queries.lock().unwrap().push(title.to_string());
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message);
        }
        Ok(self.shows.get(title).cloned().unwrap_or_default())
    }
}

fn the_wire_catalog() -> MemoryCatalog {
    MemoryCatalog::default().with_show("the wire", Show::new(2993, "The Wire"))
}

fn matcher_with(catalog: Arc<MemoryCatalog>, policy: NumberPolicy) -> EpisodeMatcher {
    EpisodeMatcher::new(
        PatternLibrary::standard().unwrap(),
        catalog,
        MatcherConfig {
            number_policy: policy,
        },
    )
}

fn matcher(catalog: Arc<MemoryCatalog>) -> EpisodeMatcher {
    matcher_with(catalog, NumberPolicy::Lenient)
}

const THE_WIRE_PATH: &str = "/tv/The.Wire/The.Wire.S03E04.720p.HDTV.x264-LOL.mkv";

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_scene_release_resolves() {
    let catalog = Arc::new(the_wire_catalog());
    let episodes = matcher(catalog.clone())
        .match_path(THE_WIRE_PATH)
        .await
        .unwrap();

    assert_eq!(
        episodes,
        vec![ResolvedEpisode {
            show_id: "2993".to_string(),
            season: 3,
            number: 4,
            files: vec![FileMetadata {
                name: "The.Wire.S03E04.720p.HDTV.x264-LOL.mkv".to_string(),
                path: "/tv/The.Wire".to_string(),
                video_codec: Some("x264".to_string()),
                audio_codec: None,
                source: Some("hdtv".to_string()),
                resolution: Some("720p".to_string()),
                release_group: Some("LOL".to_string()),
            }],
        }]
    );
    assert_eq!(catalog.queries(), vec!["the wire"]);
}

#[tokio::test]
async fn test_first_candidate_wins() {
    let catalog = Arc::new(
        the_wire_catalog().with_show("the wire", Show::new(1, "The Wire (Remake)")),
    );
    let episodes = matcher(catalog).match_path(THE_WIRE_PATH).await.unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].show_id, "2993");
}

#[tokio::test]
async fn test_unrecognized_file_is_skipped() {
    let catalog = Arc::new(the_wire_catalog());
    let episodes = matcher(catalog.clone()).match_path("readme.txt").await.unwrap();
    assert!(episodes.is_empty());
    assert!(catalog.queries().is_empty());
}

#[tokio::test]
async fn test_season_folder_without_show_is_skipped() {
    let catalog = Arc::new(the_wire_catalog());
    let episodes = matcher(catalog.clone())
        .match_path("/tv/Some Show/Season 3/03.mkv")
        .await
        .unwrap();
    assert!(episodes.is_empty());
    assert!(catalog.queries().is_empty());
}

#[tokio::test]
async fn test_season_folder_with_show_in_grandparent() {
    let catalog = Arc::new(MemoryCatalog::default().with_show("some show", Show::new(77, "Some Show")));
    let episodes = matcher(catalog.clone())
        .match_path("/tv/Some.Show.S03E01/Season 3/03.mkv")
        .await
        .unwrap();

    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].show_id, "77");
    assert_eq!(episodes[0].season, 3);
    assert_eq!(episodes[0].number, 3);
    assert_eq!(catalog.queries(), vec!["some show"]);
}

#[tokio::test]
async fn test_filename_season_beats_parent_directory() {
    let catalog = Arc::new(the_wire_catalog());
    let episodes = matcher(catalog)
        .match_path("/tv/The.Wire.S05E01/The.Wire.S03E04.mkv")
        .await
        .unwrap();
    assert_eq!(episodes[0].season, 3);
    assert_eq!(episodes[0].number, 4);
}

#[tokio::test]
async fn test_show_from_parent_directory() {
    let catalog = Arc::new(the_wire_catalog());
    let episodes = matcher(catalog)
        .match_path("/tv/The.Wire.S03E01-E12/the.wire.305.hdtv.mkv")
        .await
        .unwrap();
    assert_eq!(episodes[0].show_id, "2993");
    assert_eq!(episodes[0].season, 3);
    assert_eq!(episodes[0].number, 5);
}

#[tokio::test]
async fn test_cross_format_filename() {
    let catalog = Arc::new(MemoryCatalog::default().with_show("lost", Show::new(123, "Lost")));
    let episodes = matcher(catalog)
        .match_path("/tv/Lost/Lost - 2x07 - The Other 48 Days.avi")
        .await
        .unwrap();
    assert_eq!(episodes[0].season, 2);
    assert_eq!(episodes[0].number, 7);
}

// ============================================================================
// Failure modes
// ============================================================================

#[tokio::test]
async fn test_no_matching_show() {
    let catalog = Arc::new(MemoryCatalog::default());
    let err = matcher(catalog).match_path(THE_WIRE_PATH).await.unwrap_err();
    assert_matches!(err, MatchError::NoMatchingShow { ref title } if title == "the wire");
}

#[tokio::test]
async fn test_resolver_failure_is_propagated() {
    let catalog = Arc::new(MemoryCatalog::failing("catalog offline"));
    let err = matcher(catalog).match_path(THE_WIRE_PATH).await.unwrap_err();
    assert_eq!(err.to_string(), "catalog offline");
    assert_matches!(err, MatchError::ResolverUnavailable(_));
}

#[tokio::test]
async fn test_metadata_does_not_depend_on_resolution() {
    let catalog = Arc::new(MemoryCatalog::failing("catalog offline"));
    let matcher = matcher(catalog);

    let identification = matcher.identify(THE_WIRE_PATH);
    assert!(matcher.match_path(THE_WIRE_PATH).await.is_err());

    assert_eq!(
        identification.file,
        parse_metadata("The.Wire.S03E04.720p.HDTV.x264-LOL.mkv", "/tv/The.Wire")
    );
    assert_eq!(identification.file.release_group.as_deref(), Some("LOL"));
}

// ============================================================================
// Numeric conversion
// ============================================================================

#[tokio::test]
async fn test_overflowing_season_is_zero_when_lenient() {
    let catalog = Arc::new(MemoryCatalog::default().with_show("show", Show::new(5, "Show")));
    let episodes = matcher(catalog)
        .match_path("/tv/Show/Show.S99999999999E02.mkv")
        .await
        .unwrap();
    assert_eq!(episodes[0].season, 0);
    assert_eq!(episodes[0].number, 2);
}

#[tokio::test]
async fn test_overflowing_season_fails_when_strict() {
    let catalog = Arc::new(MemoryCatalog::default().with_show("show", Show::new(5, "Show")));
    let err = matcher_with(catalog.clone(), NumberPolicy::Strict)
        .match_path("/tv/Show/Show.S99999999999E02.mkv")
        .await
        .unwrap_err();
    assert_matches!(err, MatchError::MalformedNumber { field: "season", .. });
    assert!(catalog.queries().is_empty());
}

#[tokio::test]
async fn test_non_digit_token_is_zero_when_lenient() {
    // A custom tier whose season slot can capture letters
    let loose = Pattern::positional(
        r"^(.+?)\.season-([a-z]+)\.ep([0-9]+)",
        FieldSlots {
            show: Some(1),
            season: Some(2),
            episode: Some(3),
            second_episode: None,
        },
    )
    .unwrap();

    let mut library = PatternLibrary::standard().unwrap();
    library.standalone = PatternSet::new(PatternKind::Standalone, vec![loose]);

    let catalog = Arc::new(MemoryCatalog::default().with_show("show", Show::new(5, "Show")));
    let matcher = EpisodeMatcher::new(library, catalog, MatcherConfig::default());

    let episodes = matcher.match_path("show.season-two.ep07.mkv").await.unwrap();
    assert_eq!(episodes[0].season, 0);
    assert_eq!(episodes[0].number, 7);
}

// ============================================================================
// Determinism and concurrency
// ============================================================================

#[test]
fn test_repeated_calls_are_identical() {
    let matcher = matcher(Arc::new(the_wire_catalog()));
    let first = tokio_test::block_on(matcher.match_path(THE_WIRE_PATH)).unwrap();
    for _ in 0..5 {
        let again = tokio_test::block_on(matcher.match_path(THE_WIRE_PATH)).unwrap();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_concurrent_matches_share_one_matcher() {
    let catalog = Arc::new(
        the_wire_catalog().with_show("lost", Show::new(123, "Lost")),
    );
    let matcher = Arc::new(matcher(catalog));

    let paths = [
        THE_WIRE_PATH,
        "/tv/Lost/Lost.S01E02.mkv",
        "readme.txt",
        "/tv/The.Wire/The.Wire.S01E01.mkv",
    ];

    let handles: Vec<_> = paths
        .iter()
        .map(|path| {
            let matcher = matcher.clone();
            let path = path.to_string();
            tokio::spawn(async move { matcher.match_path(&path).await })
        })
        .collect();

    let mut counts = Vec::new();
    for handle in handles {
        counts.push(handle.await.unwrap().unwrap().len());
    }
    assert_eq!(counts, vec![1, 1, 0, 1]);
}
