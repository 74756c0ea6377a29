//! Librarian Matcher - filename-to-episode identification
//!
//! Resolves a TV episode's file path to a catalog show, season and episode,
//! along with the release metadata carried in the filename.

pub mod config;
pub mod services;

pub use config::Config;
pub use services::{
    EpisodeMatcher, FileMetadata, Identification, MatchError, MatcherConfig, NumberPolicy,
    PatternLibrary, ResolvedEpisode, Show, ShowResolver, TvMazeClient,
};
