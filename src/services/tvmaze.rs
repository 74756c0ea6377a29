//! TVMaze API client for show lookups
//!
//! TVMaze is a free API that doesn't require authentication.
//! Base URL: https://api.tvmaze.com
//!
//! Responses are mapped onto [`Show`], [`CatalogSeason`] and [`CatalogEpisode`] field by field
//! so a change in TVMaze's shapes fails here instead of silently dropping data.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::rate_limiter::{
    Attempt, RateLimitConfig, RateLimitedClient, RetryConfig, is_transient_status, retry_async,
};
use super::show_resolver::{CatalogEpisode, CatalogSeason, Show, ShowResolver, parse_show_id};

pub const DEFAULT_BASE_URL: &str = "https://api.tvmaze.com";

/// Show search result from TVMaze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeSearchResult {
    pub score: f64,
    pub show: TvMazeShow,
}

/// Show details from TVMaze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeShow {
    pub id: u32,
    pub name: String,
    pub status: Option<String>,
    pub premiered: Option<String>,
    pub network: Option<TvMazeChannel>,
    #[serde(rename = "webChannel")]
    pub web_channel: Option<TvMazeChannel>,
    pub externals: Option<TvMazeExternals>,
}

/// Broadcast network or streaming channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeChannel {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeExternals {
    pub tvrage: Option<u32>,
    pub thetvdb: Option<u32>,
    pub imdb: Option<String>,
}

/// Season from TVMaze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeSeason {
    pub id: u32,
    pub number: u32,
    pub name: Option<String>,
    #[serde(rename = "episodeOrder")]
    pub episode_order: Option<u32>,
    #[serde(rename = "premiereDate")]
    pub premiere_date: Option<String>,
}

/// Episode from TVMaze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeEpisode {
    pub id: u32,
    pub name: Option<String>,
    pub season: u32,
    /// Null for specials
    pub number: Option<u32>,
    pub airdate: Option<String>,
}

impl TvMazeShow {
    /// Get the premiere year from the premiered date
    pub fn premiere_year(&self) -> Option<i32> {
        self.premiered
            .as_ref()
            .and_then(|p| p.split('-').next().and_then(|y| y.parse().ok()))
    }

    /// Get the network name, falling back to the web channel
    pub fn network_name(&self) -> Option<&str> {
        self.network
            .as_ref()
            .map(|n| n.name.as_str())
            .or_else(|| self.web_channel.as_ref().map(|w| w.name.as_str()))
    }
}

pub fn show_from_tvmaze(show: &TvMazeShow) -> Show {
    Show {
        id: u64::from(show.id),
        title: show.name.clone(),
        year: show.premiere_year(),
        network: show.network_name().map(str::to_string),
        status: show.status.clone(),
        tvdb_id: show.externals.as_ref().and_then(|e| e.thetvdb),
        imdb_id: show.externals.as_ref().and_then(|e| e.imdb.clone()),
    }
}

pub fn season_from_tvmaze(season: &TvMazeSeason) -> CatalogSeason {
    CatalogSeason {
        id: u64::from(season.id),
        number: season.number,
        episode_count: season.episode_order,
        premiere_date: season.premiere_date.clone().filter(|d| !d.is_empty()),
    }
}

pub fn episode_from_tvmaze(episode: &TvMazeEpisode) -> CatalogEpisode {
    CatalogEpisode {
        id: u64::from(episode.id),
        season: episode.season,
        number: episode.number.unwrap_or(0),
        title: episode.name.clone(),
        air_date: episode.airdate.clone().filter(|d| !d.is_empty()),
    }
}

/// TVMaze API client
pub struct TvMazeClient {
    http: RateLimitedClient,
    base_url: String,
    retry: RetryConfig,
}

impl TvMazeClient {
    pub fn new(base_url: &str, rate_limit: RateLimitConfig, retry: RetryConfig) -> Result<Self> {
        Ok(Self {
            http: RateLimitedClient::new("tvmaze", rate_limit, Duration::from_secs(30))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON resource, retrying transient failures. 404 yields `None`.
    async fn fetch<T, Q>(&self, path: &str, query: &Q, what: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();
        let http = &self.http;

        retry_async(
            move || async move {
                let response = http
                    .get_with_query(url, query)
                    .await
                    .map_err(Attempt::Transient)?;

                let status = response.status();
                if status == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if !status.is_success() {
                    let error = anyhow::anyhow!("TVMaze {} failed with status: {}", what, status);
                    return Err(if is_transient_status(status) {
                        Attempt::Transient(error)
                    } else {
                        Attempt::Permanent(error)
                    });
                }

                response
                    .json::<T>()
                    .await
                    .with_context(|| format!("Failed to parse TVMaze {}", what))
                    .map(Some)
                    .map_err(Attempt::Permanent)
            },
            &self.retry,
            what,
        )
        .await
    }

    /// Search for shows by name, in TVMaze's relevance order
    pub async fn search_shows(&self, query: &str) -> Result<Vec<TvMazeSearchResult>> {
        info!(query = %query, "Searching TVMaze for shows");

        let results: Vec<TvMazeSearchResult> = self
            .fetch("/search/shows", &[("q", query)], "show search")
            .await?
            .unwrap_or_default();

        debug!(count = results.len(), "TVMaze search returned results");
        Ok(results)
    }

    /// Get show details by TVMaze ID
    pub async fn fetch_show(&self, tvmaze_id: u64) -> Result<TvMazeShow> {
        info!(tvmaze_id = tvmaze_id, "Fetching show from TVMaze");

        self.fetch(&format!("/shows/{}", tvmaze_id), &[] as &[(&str, &str)], "show lookup")
            .await?
            .with_context(|| format!("TVMaze show {} not found", tvmaze_id))
    }

    /// Get seasons for a show
    pub async fn fetch_seasons(&self, tvmaze_id: u64) -> Result<Vec<TvMazeSeason>> {
        info!(tvmaze_id = tvmaze_id, "Fetching seasons from TVMaze");

        let seasons: Vec<TvMazeSeason> = self
            .fetch(
                &format!("/shows/{}/seasons", tvmaze_id),
                &[] as &[(&str, &str)],
                "season list",
            )
            .await?
            .with_context(|| format!("TVMaze show {} not found", tvmaze_id))?;

        debug!(count = seasons.len(), "TVMaze returned seasons");
        Ok(seasons)
    }

    /// Get all episodes for a show
    pub async fn fetch_episodes(&self, tvmaze_id: u64) -> Result<Vec<TvMazeEpisode>> {
        info!(tvmaze_id = tvmaze_id, "Fetching episodes from TVMaze");

        let episodes: Vec<TvMazeEpisode> = self
            .fetch(
                &format!("/shows/{}/episodes", tvmaze_id),
                &[] as &[(&str, &str)],
                "episode list",
            )
            .await?
            .with_context(|| format!("TVMaze show {} not found", tvmaze_id))?;

        debug!(count = episodes.len(), "TVMaze returned episodes");
        Ok(episodes)
    }

    /// Get a single episode by season and number
    pub async fn fetch_episode_by_number(
        &self,
        tvmaze_id: u64,
        season: u32,
        number: u32,
    ) -> Result<TvMazeEpisode> {
        info!(
            tvmaze_id = tvmaze_id,
            season = season,
            number = number,
            "Fetching episode from TVMaze"
        );

        self.fetch(
            &format!("/shows/{}/episodebynumber", tvmaze_id),
            &[("season", season), ("number", number)],
            "episode lookup",
        )
        .await?
        .with_context(|| {
            format!(
                "TVMaze episode S{:02}E{:02} of show {} not found",
                season, number, tvmaze_id
            )
        })
    }
}

#[async_trait]
impl ShowResolver for TvMazeClient {
    async fn query_shows_by_title(&self, title: &str) -> Result<Vec<Show>> {
        let results = self.search_shows(title).await?;
        Ok(results.iter().map(|r| show_from_tvmaze(&r.show)).collect())
    }

    async fn get_show(&self, show_id: &str) -> Result<Show> {
        let id = parse_show_id(show_id)?;
        let show = self.fetch_show(id).await?;
        Ok(show_from_tvmaze(&show))
    }

    async fn get_seasons_by_show(&self, show_id: &str) -> Result<Vec<CatalogSeason>> {
        let id = parse_show_id(show_id)?;
        let seasons = self.fetch_seasons(id).await?;
        Ok(seasons.iter().map(season_from_tvmaze).collect())
    }

    async fn get_episode_by_number(
        &self,
        show_id: &str,
        season: u32,
        number: u32,
    ) -> Result<CatalogEpisode> {
        let id = parse_show_id(show_id)?;
        let episode = self.fetch_episode_by_number(id, season, number).await?;
        Ok(episode_from_tvmaze(&episode))
    }

    async fn get_episodes_by_season_number(
        &self,
        show_id: &str,
        season: u32,
    ) -> Result<Vec<CatalogEpisode>> {
        let id = parse_show_id(show_id)?;
        let episodes = self.fetch_episodes(id).await?;
        Ok(episodes
            .iter()
            .filter(|e| e.season == season)
            .map(episode_from_tvmaze)
            .collect())
    }
}
