use std::sync::Arc;

use crate::assist::generator::{ContentGenerator, DisabledGenerator, HttpContentGenerator};
use crate::config::{AdminPolicy, AppConfig, JwtConfig};
use crate::guard::GuardPaths;
use crate::moderation::{ModerationWorkflow, PromptClassifier, TextClassifier};
use crate::profiles::ProfileResolver;
use crate::store::{DocumentStore, MemoryDocumentStore, PgDocumentStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
    pub profiles: ProfileResolver,
    pub generator: Arc<dyn ContentGenerator>,
    pub moderation: ModerationWorkflow,
    pub guard_paths: Arc<GuardPaths>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn DocumentStore> = match &config.database_url {
            Some(url) => {
                let store = PgDocumentStore::connect(url).await?;
                // Run migrations if present
                if let Err(e) = sqlx::migrate!("./migrations").run(store.pool()).await {
                    tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
                }
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using the in-memory document store");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        let generator: Arc<dyn ContentGenerator> = match &config.generator {
            Some(cfg) => Arc::new(HttpContentGenerator::new(cfg)?),
            None => {
                tracing::warn!("GENERATOR_URL not set; generation and moderation are disabled");
                Arc::new(DisabledGenerator)
            }
        };

        Ok(Self::from_parts(store, config, generator))
    }

    pub fn from_parts(
        store: Arc<dyn DocumentStore>,
        config: Arc<AppConfig>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        let classifier = Arc::new(PromptClassifier::new(generator.clone()));
        Self {
            profiles: ProfileResolver::new(store.clone(), config.admin.clone()),
            moderation: ModerationWorkflow::new(store.clone(), classifier),
            store,
            config,
            generator,
            guard_paths: Arc::new(GuardPaths::default()),
        }
    }

    /// Swap the generator; the moderation classifier follows it.
    pub fn with_generator(self, generator: Arc<dyn ContentGenerator>) -> Self {
        Self::from_parts(self.store, self.config, generator)
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.moderation = ModerationWorkflow::new(self.store.clone(), classifier);
        self
    }

    /// In-memory state for tests: no database, generation disabled.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            admin: AdminPolicy::from_parts("ops@example.com", None),
            generator: None,
        });
        Self::from_parts(
            Arc::new(MemoryDocumentStore::new()),
            config,
            Arc::new(DisabledGenerator),
        )
    }
}
