use std::net::SocketAddr;
use std::time::Duration;

use gamelist_core::game::{Game, GameDraft};

use gamelist_server::build_app_with_store;
use gamelist_server::config::{AuthFileConfig, ServerConfig};
use gamelist_server::store::GameStore;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with no auth and an empty store.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Start a test server requiring `token` on mutating routes.
    pub async fn with_auth(token: &str) -> Self {
        let config = ServerConfig {
            auth: AuthFileConfig {
                bearer_token: Some(token.to_string()),
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    /// Start a test server with the given drafts already stored.
    pub async fn seeded(drafts: Vec<GameDraft>) -> Self {
        Self::from_store(ServerConfig::default(), GameStore::seeded(drafts)).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        Self::from_store(config, GameStore::new()).await
    }

    pub async fn from_store(config: ServerConfig, store: GameStore) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app_with_store(config, store);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://{}/api{path}", self.addr)
    }
}

/// Create a draft with one platform, one device and one genre.
pub fn draft(title: &str) -> GameDraft {
    gamelist_core::test_helpers::make_draft(title)
}

/// Create a draft already on the to-play list.
pub fn queued_draft(title: &str) -> GameDraft {
    GameDraft {
        to_play: true,
        ..draft(title)
    }
}

/// POST a draft and return the created record.
pub async fn create(client: &reqwest::Client, server: &TestServer, draft: &GameDraft) -> Game {
    let resp = client
        .post(server.api_url("/games"))
        .json(draft)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

/// Titles of the to-play list in order.
pub async fn to_play_titles(client: &reqwest::Client, server: &TestServer) -> Vec<String> {
    let games: Vec<Game> = client
        .get(server.api_url("/games/to-play"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    games.into_iter().map(|g| g.title).collect()
}
