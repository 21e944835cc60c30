use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use gamelist_core::filter::{GameFilter, Page, Pagination};
use gamelist_core::game::{Game, GameDraft, GameId, GameUpdate, QueueEntry};
use gamelist_core::stats::LibraryStats;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::store::RecordStore;

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// `RecordStore` backed by the gamelist REST API.
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpRecordStore {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::NetworkFailure(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.client.request(method, self.config.api_url(path));
        match self.config.bearer_token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ClientError> {
        let resp = req.send().await.map_err(network_error)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });
        tracing::debug!(status = status.as_u16(), %message, "Store rejected request");

        if status == StatusCode::NOT_FOUND {
            Err(ClientError::NotFound(message))
        } else {
            Err(ClientError::ServerRejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = self.send(req).await?;
        let bytes = resp.bytes().await.map_err(network_error)?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send_unit(&self, req: RequestBuilder) -> Result<(), ClientError> {
        self.send(req).await.map(|_| ())
    }
}

fn network_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::NetworkFailure(format!("request timed out: {e}"))
    } else {
        ClientError::NetworkFailure(e.to_string())
    }
}

fn game_path(id: &GameId) -> String {
    format!("/games/{id}")
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn get_game(&self, id: &GameId) -> Result<Game, ClientError> {
        self.send_json(self.request(Method::GET, &game_path(id)))
            .await
    }

    async fn update_game(&self, id: &GameId, update: &GameUpdate) -> Result<Game, ClientError> {
        self.send_json(self.request(Method::PUT, &game_path(id)).json(update))
            .await
    }

    async fn set_order(&self, ids: &[GameId]) -> Result<(), ClientError> {
        self.send_unit(
            self.request(Method::PUT, "/games/to-play/reorder")
                .json(ids),
        )
        .await
    }

    async fn list_games(
        &self,
        filter: &GameFilter,
        pagination: Pagination,
    ) -> Result<Page<Game>, ClientError> {
        let req = self
            .request(Method::GET, "/games")
            .query(&filter.to_query())
            .query(&pagination.to_query()[..]);
        self.send_json(req).await
    }

    async fn list_to_play(&self) -> Result<Vec<QueueEntry>, ClientError> {
        let games: Vec<Game> = self
            .send_json(self.request(Method::GET, "/games/to-play"))
            .await?;
        Ok(games.into_iter().map(QueueEntry::from).collect())
    }

    async fn create_game(&self, draft: &GameDraft) -> Result<Game, ClientError> {
        self.send_json(self.request(Method::POST, "/games").json(draft))
            .await
    }

    async fn delete_game(&self, id: &GameId) -> Result<(), ClientError> {
        self.send_unit(self.request(Method::DELETE, &game_path(id)))
            .await
    }

    async fn set_to_play(&self, id: &GameId, to_play: bool) -> Result<Game, ClientError> {
        let path = format!("{}/to-play", game_path(id));
        self.send_json(self.request(Method::PUT, &path).json(&to_play))
            .await
    }

    async fn stats(&self) -> Result<LibraryStats, ClientError> {
        self.send_json(self.request(Method::GET, "/stats")).await
    }

    async fn random_game(&self, filter: &GameFilter) -> Result<Game, ClientError> {
        let req = self
            .request(Method::GET, "/games/random")
            .query(&filter.to_query());
        self.send_json(req).await
    }
}
