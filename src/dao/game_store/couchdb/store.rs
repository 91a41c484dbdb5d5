use std::{sync::Arc, time::Duration};

use async_stream::stream;
use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use reqwest::{Client, Method, StatusCode};
use serde_json::from_value;
use tokio::time::sleep;
use tracing::warn;

use crate::dao::{
    game_store::GameDocStore,
    models::{GameDocument, GamePatch},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CHANGES_PATH, ChangesResponse, CouchGameEnvelope, GAME_DOC_ID, seq_to_string},
};

const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Game-document store backed by a CouchDB database.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
    poll_timeout: Duration,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
            poll_timeout: config.poll_timeout,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authenticated(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authenticated(self.client.request(method, url))
    }

    fn database_request(&self, method: Method) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, self.database);
        self.authenticated(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let response = self
            .database_request(Method::GET)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .database_request(Method::PUT)
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_envelope(&self) -> CouchResult<Option<CouchGameEnvelope>> {
        let response = self
            .request(Method::GET, GAME_DOC_ID)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: GAME_DOC_ID.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchGameEnvelope>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: GAME_DOC_ID.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: GAME_DOC_ID.to_string(),
                status: other,
            }),
        }
    }

    async fn put_envelope(&self, envelope: &CouchGameEnvelope) -> CouchResult<()> {
        let response = self
            .request(Method::PUT, GAME_DOC_ID)
            .json(envelope)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: GAME_DOC_ID.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: GAME_DOC_ID.to_string(),
                status: response.status(),
            })
        }
    }

    async fn poll_changes(&self, since: Option<&str>) -> CouchResult<ChangesResponse> {
        let mut query = vec![
            ("feed", "longpoll".to_string()),
            ("include_docs", "true".to_string()),
            ("timeout", self.poll_timeout.as_millis().to_string()),
        ];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }

        let response = self
            .request(Method::GET, CHANGES_PATH)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: CHANGES_PATH.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: CHANGES_PATH.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<ChangesResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: CHANGES_PATH.to_string(),
                source,
            })
    }
}

impl GameDocStore for CouchGameStore {
    fn fetch(&self) -> BoxFuture<'static, StorageResult<Option<GameDocument>>> {
        let store = self.clone();
        Box::pin(async move {
            let envelope = store.get_envelope().await?;
            Ok(envelope.map(|envelope| envelope.game))
        })
    }

    fn merge_write(&self, patch: GamePatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut envelope = store
                .get_envelope()
                .await?
                .unwrap_or_else(|| CouchGameEnvelope::new(GameDocument::default()));
            patch.apply_to(&mut envelope.game);
            store.put_envelope(&envelope).await.map_err(Into::into)
        })
    }

    fn subscribe(&self) -> BoxStream<'static, GameDocument> {
        let store = self.clone();
        stream! {
            // The first poll runs without a cursor, so CouchDB replays the
            // current revision immediately and the subscriber starts from a
            // full snapshot.
            let mut since: Option<String> = None;
            let mut delay = RETRY_INITIAL_DELAY;

            loop {
                match store.poll_changes(since.as_deref()).await {
                    Ok(changes) => {
                        delay = RETRY_INITIAL_DELAY;
                        since = Some(seq_to_string(&changes.last_seq));

                        for row in changes.results {
                            if row.id != GAME_DOC_ID {
                                continue;
                            }
                            let Some(doc) = row.doc else { continue };
                            match from_value::<GameDocument>(doc) {
                                Ok(snapshot) => yield snapshot,
                                Err(err) => {
                                    warn!(error = %err, "skipping undecodable change row");
                                }
                            }
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "changes feed poll failed; backing off");
                        sleep(delay).await;
                        delay = (delay * 2).min(RETRY_MAX_DELAY);
                    }
                }
            }
        }
        .boxed()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let database = store.database.to_string();
            let response = store
                .database_request(Method::GET)
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: database.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::DatabaseStatus {
                    database,
                    status: response.status(),
                }
                .into())
            }
        })
    }
}
