//! The put.io provider.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{info, instrument};

use crate::client::{ClientError, PutioClient};
use crate::config::{ProviderConfig, ResolvedConfig};
use crate::error::ProviderError;
use crate::rss_feed::{self, RSS_FEED};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
use crate::validation::validate;

/// Everything a resource operation needs once the provider is configured.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    client: PutioClient,
}

impl ProviderContext {
    /// Wrap an authenticated client.
    pub fn new(client: PutioClient) -> Self {
        Self { client }
    }

    /// The authenticated put.io client.
    pub fn client(&self) -> &PutioClient {
        &self.client
    }
}

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// put.io resource provider.
///
/// Resource operations fail with [`ProviderError::NotConfigured`] until
/// [`ProviderService::configure`] has succeeded.
pub struct PutioProvider {
    context: RwLock<Option<Arc<ProviderContext>>>,
    env: Box<EnvLookup>,
}

impl PutioProvider {
    /// A provider that reads its token fallback from the process environment.
    pub fn new() -> Self {
        Self::with_env(|key| std::env::var(key).ok())
    }

    /// A provider with a custom environment lookup.
    pub fn with_env<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            context: RwLock::new(None),
            env: Box::new(env),
        }
    }

    /// The configured context, if `configure` has succeeded.
    pub fn context(&self) -> Result<Arc<ProviderContext>, ProviderError> {
        let guard = self
            .context
            .read()
            .map_err(|_| ProviderError::Internal("provider context lock poisoned".to_string()))?;
        guard.clone().ok_or_else(|| {
            ProviderError::NotConfigured(
                "configure must succeed before managing resources".to_string(),
            )
        })
    }

    fn set_context(&self, context: ProviderContext) -> Result<(), ProviderError> {
        let mut guard = self
            .context
            .write()
            .map_err(|_| ProviderError::Internal("provider context lock poisoned".to_string()))?;
        *guard = Some(Arc::new(context));
        Ok(())
    }
}

impl Default for PutioProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == RSS_FEED {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

async fn connect(config: &ResolvedConfig) -> Result<PutioClient, ProviderError> {
    let failed = |e: ClientError| {
        ProviderError::configuration("Unable to create put.io client", e.to_string())
    };

    let client = PutioClient::new(&config.token, &config.base_url).map_err(failed)?;
    let token = client.validate_token().await.map_err(failed)?;
    info!(user_id = ?token.user_id, base_url = %client.base_url(), "put.io token validated");
    Ok(client)
}

#[async_trait::async_trait]
impl ProviderService for PutioProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(RSS_FEED, rss_feed::schema())
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: vec![RSS_FEED.to_string()],
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&ProviderConfig::schema(), &config))
    }

    #[instrument(skip(self, config), name = "putio.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let resolved = ProviderConfig::from_value(&config)?.resolve(|key| (self.env)(key))?;
        let client = connect(&resolved).await?;
        self.set_context(ProviderContext::new(client))?;
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        check_resource_type(resource_type)?;
        Ok(validate(&rss_feed::schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        check_resource_type(resource_type)?;
        rss_feed::plan(prior_state.as_ref(), proposed_state, &config)
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let ctx = self.context()?;
        rss_feed::create(&ctx, planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let ctx = self.context()?;
        rss_feed::read(&ctx, &current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        _prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        // Unconfigured providers reject every lifecycle call.
        self.context()?;
        rss_feed::update(planned_state)
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        check_resource_type(resource_type)?;
        let ctx = self.context()?;
        rss_feed::delete(&ctx, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        check_resource_type(resource_type)?;
        let ctx = self.context()?;
        let imported = rss_feed::import(&ctx, id).await?;
        Ok(vec![imported])
    }
}
