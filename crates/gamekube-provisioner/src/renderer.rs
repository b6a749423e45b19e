//! Template lookup and manifest rendering

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use gamekube_common::template::{TemplateContext, TemplateEngine, TemplateError};
use tracing::debug;

use crate::error::ProvisionError;
use crate::identity::ServerIdentity;
use crate::request::{Game, ServerCreationRequest};

/// Source of game templates, addressed by lower-cased game name
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Load the template registered under `name`, or `None` if there is none
    async fn load(&self, name: &str) -> Result<Option<String>, ProvisionError>;
}

/// Templates stored as `<dir>/<name>.yml`
#[derive(Debug, Clone)]
pub struct DirTemplateRepository {
    dir: PathBuf,
}

impl DirTemplateRepository {
    /// Read templates from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a template with `name` would be read from
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.yml", name))
    }
}

#[async_trait]
impl TemplateRepository for DirTemplateRepository {
    async fn load(&self, name: &str) -> Result<Option<String>, ProvisionError> {
        let path = self.path_for(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProvisionError::io(path, e)),
        }
    }
}

/// Templates held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateRepository {
    templates: HashMap<String, String>,
}

impl InMemoryTemplateRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `name`
    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn load(&self, name: &str) -> Result<Option<String>, ProvisionError> {
        Ok(self.templates.get(name).cloned())
    }
}

/// Manifest text rendered for one server
#[derive(Debug, PartialEq, Eq)]
pub struct RenderedManifest {
    identity: ServerIdentity,
    game: Game,
    text: String,
}

impl RenderedManifest {
    /// Identity the manifest was rendered for
    pub fn identity(&self) -> ServerIdentity {
        self.identity
    }

    /// Game the manifest was rendered for
    pub fn game(&self) -> Game {
        self.game
    }

    /// Rendered text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume the manifest into its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.text.into_bytes()
    }
}

/// Renders game templates into manifests
pub struct TemplateRenderer {
    repository: Arc<dyn TemplateRepository>,
    engine: TemplateEngine,
}

impl TemplateRenderer {
    /// Create a renderer over `repository`
    pub fn new(repository: Arc<dyn TemplateRepository>) -> Self {
        Self {
            repository,
            engine: TemplateEngine::new(),
        }
    }

    /// Render the template for `request.game` with the request's bindings
    pub async fn render(
        &self,
        request: &ServerCreationRequest,
        identity: &ServerIdentity,
    ) -> Result<RenderedManifest, ProvisionError> {
        let game = request.game;
        let template = self
            .repository
            .load(&game.template_name())
            .await?
            .ok_or_else(|| ProvisionError::TemplateNotFound {
                game: game.to_string(),
            })?;

        let ctx = bindings(request, identity);
        let text = self
            .engine
            .render(&template, &ctx)
            .map_err(|e| classify(game, e))?;

        debug!(game = %game, server_id = %identity, bytes = text.len(), "rendered manifest");
        Ok(RenderedManifest {
            identity: *identity,
            game,
            text,
        })
    }

    /// Check every supported game's template at startup
    ///
    /// Returns the games that have a template. A template that does not
    /// parse is an error; a missing one is not, since requests for that game
    /// fail with `TemplateNotFound` on their own.
    pub async fn preflight(&self) -> Result<Vec<Game>, ProvisionError> {
        let mut available = Vec::new();
        for game in Game::ALL {
            let Some(template) = self.repository.load(&game.template_name()).await? else {
                continue;
            };
            self.engine
                .validate_syntax(&template)
                .map_err(|e| classify(game, e))?;
            available.push(game);
        }
        Ok(available)
    }
}

fn bindings(request: &ServerCreationRequest, identity: &ServerIdentity) -> TemplateContext {
    TemplateContext::builder()
        .bind("ID", identity.to_string())
        .bind("Size", request.server_type.as_str())
        .bind("Name", request.name.as_str())
        .bind("Game", request.game.as_str())
        .bind("Description", request.description.as_deref().unwrap_or_default())
        .build()
}

fn classify(game: Game, err: TemplateError) -> ProvisionError {
    let message = err.to_string();
    if err.is_syntax() {
        ProvisionError::TemplateSyntax {
            game: game.to_string(),
            message,
        }
    } else {
        ProvisionError::TemplateExecution {
            game: game.to_string(),
            message,
        }
    }
}
