use std::time::Duration;

use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_with::serde_as;
use serde_with::VecSkipError;

use super::{FeedPlayer, FieldSnapshot, GolfFeed, LiveSnapshot, Ranking, ScheduledEvent};
use crate::config::Settings;
use crate::error::GenericError;

#[serde_as]
#[derive(Deserialize, Debug)]
struct ScheduleResponse {
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    schedule: Vec<ScheduledEvent>,
}

#[serde_as]
#[derive(Deserialize, Debug)]
struct RankingsResponse {
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    rankings: Vec<Ranking>,
}

#[serde_as]
#[derive(Deserialize, Debug)]
struct PlayerListResponse(#[serde_as(as = "VecSkipError<_>")] Vec<FeedPlayer>);

/// Client for the DataGolf REST feed. Every call carries the API key as the
/// `key` query parameter and is bounded by the configured timeout.
pub struct DataGolfClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DataGolfClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenericError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenericError::Config(format!("Unable to build feed client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, GenericError> {
        Self::new(
            settings.datagolf_base_url.clone(),
            settings.datagolf_api_key.clone(),
            settings.feed_timeout,
        )
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, GenericError> {
        debug!("Fetching {endpoint} from DataGolf");
        let resp = self
            .http
            .get(self.url(endpoint))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!("Unable to fetch {} from DataGolf: {}", endpoint, e);
                GenericError::Feed(format!("Unable to reach the golf feed ({endpoint})"))
            })?
            .error_for_status()
            .map_err(|e| {
                error!("DataGolf answered {} with an error status: {}", endpoint, e);
                GenericError::Feed(format!(
                    "Golf feed answered {endpoint} with status {}",
                    e.status().map(|s| s.as_u16()).unwrap_or_default()
                ))
            })?;
        resp.json().await.map_err(|e| {
            error!("DataGolf issue while converting {} to json: {:#?}", endpoint, e);
            GenericError::Feed(format!("Golf feed returned a malformed {endpoint} payload"))
        })
    }
}

#[rocket::async_trait]
impl GolfFeed for DataGolfClient {
    async fn schedule(&self, tour: &str) -> Result<Vec<ScheduledEvent>, GenericError> {
        let resp: ScheduleResponse = self.get("get-schedule", &[("tour", tour)]).await?;
        Ok(resp.schedule)
    }

    async fn field(&self, tour: &str) -> Result<FieldSnapshot, GenericError> {
        self.get("field-updates", &[("tour", tour)]).await
    }

    async fn player_list(&self) -> Result<Vec<FeedPlayer>, GenericError> {
        let resp: PlayerListResponse = self.get("get-player-list", &[]).await?;
        Ok(resp.0)
    }

    async fn rankings(&self) -> Result<Vec<Ranking>, GenericError> {
        let resp: RankingsResponse = self.get("preds/get-dg-rankings", &[]).await?;
        Ok(resp.rankings)
    }

    async fn live_stats(&self, tour: &str) -> Result<LiveSnapshot, GenericError> {
        self.get("preds/live-tournament-stats", &[("tour", tour)]).await
    }
}
