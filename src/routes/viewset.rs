use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::State,
    handler::Handler,
    routing::{MethodRouter, get},
};

use crate::{AppState, config::AppConfig, hyperlinks::Hyperlinks};

/// Capability
///
/// One of the generic operations a resource may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    List,
    Create,
    Retrieve,
    Update,
    PartialUpdate,
    Destroy,
}

impl Capability {
    fn is_collection(self) -> bool {
        matches!(self, Capability::List | Capability::Create)
    }
}

/// ViewSet
///
/// Collects one handler per capability and mounts them the conventional way:
///
/// | capability       | route               | method |
/// |------------------|---------------------|--------|
/// | list             | `/{prefix}/`        | GET    |
/// | create           | `/{prefix}/`        | POST   |
/// | retrieve         | `/{prefix}/{id}/`   | GET    |
/// | update           | `/{prefix}/{id}/`   | PUT    |
/// | partial_update   | `/{prefix}/{id}/`   | PATCH  |
/// | destroy          | `/{prefix}/{id}/`   | DELETE |
///
/// Extra detail actions mount at `/{prefix}/{id}/{name}/`. A method that was
/// not registered answers 405.
pub struct ViewSet {
    capabilities: Vec<Capability>,
    collection: MethodRouter<AppState>,
    detail: MethodRouter<AppState>,
    actions: Vec<(&'static str, MethodRouter<AppState>)>,
}

impl Default for ViewSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewSet {
    pub fn new() -> Self {
        Self {
            capabilities: Vec::new(),
            collection: MethodRouter::new(),
            detail: MethodRouter::new(),
            actions: Vec::new(),
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn list<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.collection = self.collection.get(handler);
        self.capabilities.push(Capability::List);
        self
    }

    pub fn create<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.collection = self.collection.post(handler);
        self.capabilities.push(Capability::Create);
        self
    }

    pub fn retrieve<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.detail = self.detail.get(handler);
        self.capabilities.push(Capability::Retrieve);
        self
    }

    pub fn update<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.detail = self.detail.put(handler);
        self.capabilities.push(Capability::Update);
        self
    }

    pub fn partial_update<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.detail = self.detail.patch(handler);
        self.capabilities.push(Capability::PartialUpdate);
        self
    }

    pub fn destroy<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.detail = self.detail.delete(handler);
        self.capabilities.push(Capability::Destroy);
        self
    }

    /// Registers an extra route on a single object, e.g. `highlight`.
    pub fn detail_action(mut self, name: &'static str, route: MethodRouter<AppState>) -> Self {
        self.actions.push((name, route));
        self
    }

    fn into_router(self, prefix: &str) -> Router<AppState> {
        let mut router = Router::new();

        if self.capabilities.iter().any(|c| c.is_collection()) {
            router = router.route(&format!("/{prefix}/"), self.collection);
        }
        if self.capabilities.iter().any(|c| !c.is_collection()) {
            router = router.route(&format!("/{prefix}/{{id}}/"), self.detail);
        }
        for (name, route) in self.actions {
            router = router.route(&format!("/{prefix}/{{id}}/{name}/"), route);
        }
        router
    }
}

/// ApiRouter
///
/// Registers viewsets under URL prefixes and serves an API root at `/` that
/// lists the collection URL of every registered prefix.
#[derive(Default)]
pub struct ApiRouter {
    router: Router<AppState>,
    prefixes: Vec<&'static str>,
}

impl ApiRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, prefix: &'static str, viewset: ViewSet) -> Self {
        tracing::debug!(prefix, capabilities = ?viewset.capabilities(), "registering viewset");
        self.router = self.router.merge(viewset.into_router(prefix));
        self.prefixes.push(prefix);
        self
    }

    pub fn prefixes(&self) -> &[&'static str] {
        &self.prefixes
    }

    pub fn into_router(self) -> Router<AppState> {
        let prefixes = self.prefixes;
        let root = get(move |State(config): State<AppConfig>| {
            let prefixes = prefixes.clone();
            async move { api_root(&config, &prefixes) }
        });
        self.router.route("/", root)
    }
}

fn api_root(config: &AppConfig, prefixes: &[&'static str]) -> Json<BTreeMap<&'static str, String>> {
    let links = Hyperlinks::new(&config.public_url);
    Json(
        prefixes
            .iter()
            .map(|prefix| (*prefix, links.collection(prefix)))
            .collect(),
    )
}
