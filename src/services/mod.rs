//! Episode matching services and catalog integrations

pub mod episode_matcher;
pub mod field_merger;
pub mod filename_parser;
pub mod patterns;
pub mod rate_limiter;
pub mod show_resolver;
pub mod text_utils;
pub mod tvmaze;

pub use episode_matcher::{
    EpisodeMatcher, Identification, MatchError, MatcherConfig, NumberPolicy, ResolvedEpisode,
};
pub use field_merger::{FieldMask, MergeStep, PartialMatch};
pub use filename_parser::{FileMetadata, MetadataDictionaries, parse_metadata};
pub use patterns::{FieldSlots, Pattern, PatternKind, PatternLibrary, PatternSet};
pub use show_resolver::{CatalogEpisode, CatalogSeason, Show, ShowResolver};
pub use tvmaze::TvMazeClient;
