//! Show catalog interface consumed by the episode matcher

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A show as known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// Canonical catalog identifier
    pub id: u64,
    pub title: String,
    pub year: Option<i32>,
    pub network: Option<String>,
    pub status: Option<String>,
    pub tvdb_id: Option<u32>,
    pub imdb_id: Option<String>,
}

impl Show {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            year: None,
            network: None,
            status: None,
            tvdb_id: None,
            imdb_id: None,
        }
    }
}

/// An episode record from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEpisode {
    pub id: u64,
    pub season: u32,
    pub number: u32,
    pub title: Option<String>,
    pub air_date: Option<String>,
}

/// A season record from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSeason {
    pub id: u64,
    pub number: u32,
    /// Announced episode count, if the catalog knows it
    pub episode_count: Option<u32>,
    pub premiere_date: Option<String>,
}

/// Title search and numbered lookups over a show catalog.
///
/// `query_shows_by_title` must return candidates already sorted by
/// relevance; the matcher takes the first one without further ranking.
/// Implementations own their timeout and retry policy.
#[async_trait]
pub trait ShowResolver: Send + Sync {
    async fn query_shows_by_title(&self, title: &str) -> Result<Vec<Show>>;

    async fn get_show(&self, show_id: &str) -> Result<Show> {
        anyhow::bail!("Show lookup is not supported by this resolver (show {})", show_id)
    }

    async fn get_seasons_by_show(&self, show_id: &str) -> Result<Vec<CatalogSeason>> {
        anyhow::bail!("Season listing is not supported by this resolver (show {})", show_id)
    }

    async fn get_episode_by_number(
        &self,
        show_id: &str,
        season: u32,
        number: u32,
    ) -> Result<CatalogEpisode> {
        anyhow::bail!(
            "Episode lookup is not supported by this resolver (show {} S{:02}E{:02})",
            show_id,
            season,
            number
        )
    }

    async fn get_episodes_by_season_number(
        &self,
        show_id: &str,
        season: u32,
    ) -> Result<Vec<CatalogEpisode>> {
        anyhow::bail!(
            "Season lookup is not supported by this resolver (show {} season {})",
            show_id,
            season
        )
    }
}

/// Parse the string show id emitted by the matcher back into a catalog id
pub fn parse_show_id(show_id: &str) -> Result<u64> {
    show_id
        .trim()
        .parse()
        .with_context(|| format!("Invalid show id: {:?}", show_id))
}
