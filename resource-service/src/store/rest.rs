use super::{RemoteStore, StoreError, StorePath, TreeEvent};
use crate::config::StoreSettings;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;

/// Client for the hosted realtime database's REST dialect: every location is
/// addressed as `{base}/{path}.json`.
///
/// The tree feed is kept fresh by a background task that re-reads the whole
/// tree on an interval and publishes it when it changed.
pub struct RestStore {
    client: Client,
    base_url: String,
    auth_token: Option<Secret<String>>,
    events: watch::Sender<TreeEvent>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl RestStore {
    pub fn new(settings: &StoreSettings) -> Result<Self, StoreError> {
        let base_url = settings
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Connectivity("store URL is not configured".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        let (events, _) = watch::channel(TreeEvent::Loading);

        tracing::info!(url = %base_url, "Remote store client configured");

        Ok(Self {
            client,
            base_url,
            auth_token: settings.auth_token.clone(),
            events,
        })
    }

    /// Start the refresh loop. It stops once the store is dropped.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                store.poll_once().await;
            }
            tracing::debug!("Remote store polling stopped");
        })
    }

    /// Fetch the tree once and publish it if it differs from the last one.
    pub async fn poll_once(&self) {
        match self.get_tree().await {
            Ok(tree) => {
                self.events.send_if_modified(|current| match current {
                    TreeEvent::Tree(previous) if **previous == tree => false,
                    _ => {
                        *current = TreeEvent::Tree(Arc::new(tree));
                        true
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh tree from remote store");
                self.events.send_replace(TreeEvent::Failed(e.to_string()));
            }
        }
    }

    fn url(&self, path: &StorePath) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    fn request(&self, method: Method, path: &StorePath) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.auth_token {
            Some(token) => builder.query(&[("auth", token.expose_secret().as_str())]),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Connectivity(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    #[instrument(skip(self), fields(path = %path))]
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok((!value.is_null()).then_some(value))
    }

    #[instrument(skip(self, value), fields(path = %path))]
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.send(self.request(Method::PUT, path).json(&value))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, children), fields(path = %path))]
    async fn update(
        &self,
        path: &StorePath,
        children: Map<String, Value>,
    ) -> Result<(), StoreError> {
        for key in children.keys() {
            path.child(key)?;
        }
        self.send(self.request(Method::PATCH, path).json(&children))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    #[instrument(skip(self, value), fields(path = %path))]
    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        let response = self
            .send(self.request(Method::POST, path).json(&value))
            .await?;
        let created: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(created.name)
    }

    fn subscribe(&self) -> watch::Receiver<TreeEvent> {
        self.events.subscribe()
    }
}
