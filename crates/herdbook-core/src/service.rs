//! Genealogy service: cached remote trees and the local fast path.
//!
//! [`GenealogyService`] is the entry point the presentation layer talks
//! to. It owns a [`TreeSource`], a shared [`TreeCache`] and the genealogy
//! settings; every level computation below it is synchronous.

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::animal::{AnimalId, AnimalRecord};
use crate::cache::{CacheKey, TreeCache};
use crate::client::{AnimalDependencies, ClientError, TreeRequest, TreeSource};
use crate::config::{Config, GenealogyConfig, DEFAULT_PAGE_SIZE};
use crate::graph::{merge, Direction, GraphAdjacency, TreeGraph};
use crate::levels::{build_tree_levels, effective_depth, GeneticTree, TreeOrigin};
use crate::local::LocalIndex;

/// Errors surfaced by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ServiceError {
    /// Message suitable for showing in the tree view.
    pub fn user_message(&self) -> &'static str {
        match self {
            ServiceError::Client(e) => e.user_message(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Client(ClientError::NotFound(_)))
    }
}

/// Options for [`GenealogyService::load_more`]. `None` means the
/// configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadMore {
    pub increment: Option<usize>,
    pub fields: Option<String>,
}

impl LoadMore {
    pub fn by(increment: usize) -> Self {
        Self {
            increment: Some(increment),
            fields: None,
        }
    }
}

/// Builds the levels of a server graph.
///
/// Orientation is detected from the edges around the root. A graph that
/// declares no depth is walked up to `fallback_depth` generations.
pub fn graph_tree(graph: &TreeGraph, direction: Direction, fallback_depth: usize, check_sex: bool) -> GeneticTree {
    let Some(root) = graph.root() else {
        if graph.is_missing_root() {
            warn!("Tree graph root {:?} is not among its nodes", graph.root_id);
        }
        return GeneticTree::empty();
    };

    let adjacency = GraphAdjacency::with_direction(graph, direction);
    let max_depth = effective_depth(graph.depth, fallback_depth);

    GeneticTree {
        animal: Some(root.clone()),
        levels: build_tree_levels(root, &adjacency, direction, max_depth, check_sex),
    }
}

/// Service over a [`TreeSource`] with a shared stale-while-revalidate cache.
pub struct GenealogyService<S> {
    source: Arc<S>,
    cache: Arc<TreeCache>,
    config: GenealogyConfig,
    page_size: u32,
    collection: OnceCell<Vec<AnimalRecord>>,
}

impl<S> GenealogyService<S>
where
    S: TreeSource + 'static,
{
    pub fn new(source: Arc<S>, cache: Arc<TreeCache>) -> Self {
        Self {
            source,
            cache,
            config: GenealogyConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            collection: OnceCell::new(),
        }
    }

    /// Creates a service whose cache and settings come from `config`.
    pub fn from_config(source: S, config: &Config) -> Self {
        Self::new(Arc::new(source), Arc::new(TreeCache::from_config(&config.cache)))
            .with_config(config.genealogy.clone())
            .with_page_size(config.api.page_size)
    }

    pub fn with_config(mut self, config: GenealogyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Seeds the local collection so [`Self::build_genetic_tree`] never
    /// lists the herd from the backend.
    pub fn with_collection(mut self, collection: Vec<AnimalRecord>) -> Self {
        self.collection = OnceCell::from(collection);
        self
    }

    pub fn config(&self) -> &GenealogyConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<TreeCache> {
        &self.cache
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub async fn fetch_ancestors(
        &self,
        root_id: AnimalId,
        max_depth: usize,
        fields: Option<&str>,
    ) -> Result<TreeGraph, ServiceError> {
        self.fetch_tree(Direction::Ancestors, root_id, max_depth, fields).await
    }

    pub async fn fetch_descendants(
        &self,
        root_id: AnimalId,
        max_depth: usize,
        fields: Option<&str>,
    ) -> Result<TreeGraph, ServiceError> {
        self.fetch_tree(Direction::Descendants, root_id, max_depth, fields).await
    }

    /// Fetches a tree graph, serving the cache first.
    ///
    /// A cache hit returns immediately and schedules a background refresh
    /// of the same key. A miss runs the advisory dependency check, fetches
    /// from the source and caches the result.
    pub async fn fetch_tree(
        &self,
        direction: Direction,
        root_id: AnimalId,
        max_depth: usize,
        fields: Option<&str>,
    ) -> Result<TreeGraph, ServiceError> {
        let fields = fields.unwrap_or(&self.config.default_fields);
        let key = CacheKey::new(direction, root_id, max_depth, fields);
        let request = TreeRequest::new(root_id, max_depth, fields);

        if let Some(cached) = self.cache.get(&key) {
            debug!("Tree cache hit for {}", key);
            self.spawn_revalidation(key, direction, request);
            return Ok(cached);
        }

        let dependencies = self.dependencies(root_id).await;
        let graph = self.source.get_tree(direction, &request).await?;
        if let Some(dependencies) = dependencies {
            check_consistency(&graph, direction, dependencies);
        }

        self.cache.set(&key, graph.clone());
        Ok(graph)
    }

    /// Refetches `request` and replaces the cached entry if the fresh graph
    /// is strictly newer. Returns `Ok(false)` when nothing was replaced or
    /// another refresh of the same key is already running.
    pub async fn revalidate(
        &self,
        direction: Direction,
        request: &TreeRequest,
    ) -> Result<bool, ServiceError> {
        let key = CacheKey::new(direction, request.animal_id, request.max_depth, &request.fields);
        refresh(&self.source, &self.cache, &key, direction, request).await
    }

    fn spawn_revalidation(&self, key: CacheKey, direction: Direction, request: TreeRequest) {
        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);

        tokio::spawn(async move {
            match refresh(&source, &cache, &key, direction, &request).await {
                Ok(true) => debug!("Revalidated {}", key),
                Ok(false) => {}
                Err(e) => warn!("Background refresh of {} failed: {}", key, e),
            }
        });
    }

    /// Fetches `current.depth + increment` generations and merges them
    /// into `current`, keeping everything already loaded.
    pub async fn load_more(
        &self,
        direction: Direction,
        root_id: AnimalId,
        current: &TreeGraph,
        options: LoadMore,
    ) -> Result<TreeGraph, ServiceError> {
        let increment = options.increment.unwrap_or(self.config.load_more_increment);
        let fields = options.fields.as_deref().unwrap_or(&self.config.default_fields);
        let depth = usize::try_from(current.depth).unwrap_or(0) + increment;

        // Always from the source: the cached entry at `depth` may be the
        // shallower graph that `current` came from.
        let request = TreeRequest::new(root_id, depth, fields);
        let fresh = self.source.get_tree(direction, &request).await?;
        let merged = merge(current, &fresh);
        info!(
            "Loaded {} to depth {} for {}: {} nodes, {} edges",
            direction, merged.depth, root_id, merged.counts.nodes, merged.counts.edges
        );

        self.cache.set(&CacheKey::new(direction, root_id, depth, fields), merged.clone());
        Ok(merged)
    }

    /// Levels of a fetched graph under the configured depth fallback and
    /// sex-consistency policy.
    pub fn levels_for(&self, graph: &TreeGraph, direction: Direction) -> GeneticTree {
        graph_tree(
            graph,
            direction,
            self.config.fallback_depth,
            self.config.sex_consistency.applies_to(TreeOrigin::Remote),
        )
    }

    /// Builds the ancestor tree of `root_id` from the local collection.
    ///
    /// When the root is not in the collection, falls back to the backend:
    /// the animal itself plus its remote ancestors graph. An animal the
    /// backend does not know yields [`GeneticTree::empty`]; one it knows but
    /// has no ancestors graph for yields the root alone.
    pub async fn build_genetic_tree(
        &self,
        root_id: AnimalId,
        max_depth: usize,
    ) -> Result<GeneticTree, ServiceError> {
        if let Some(collection) = self.local_collection().await {
            let check_sex = self.config.sex_consistency.applies_to(TreeOrigin::Local);
            let tree = LocalIndex::new(collection).build(Some(root_id), Direction::Ancestors, max_depth, check_sex);
            if tree.animal.is_some() {
                return Ok(tree);
            }
            debug!("Animal {} not in local collection, asking the backend", root_id);
        }

        match self.remote_genetic_tree(root_id, max_depth).await {
            Err(e) if e.is_not_found() => Ok(GeneticTree::empty()),
            other => other,
        }
    }

    async fn remote_genetic_tree(
        &self,
        root_id: AnimalId,
        max_depth: usize,
    ) -> Result<GeneticTree, ServiceError> {
        let animal = self.source.get_by_id(root_id).await?;
        let graph = match self.fetch_ancestors(root_id, max_depth, None).await {
            Ok(graph) => graph,
            // A known animal without genealogy data is a root-only tree.
            Err(e) if e.is_not_found() => {
                debug!("No ancestors graph for {}: {}", root_id, e);
                return Ok(GeneticTree {
                    levels: vec![vec![animal.clone()]],
                    animal: Some(animal),
                });
            }
            Err(e) => return Err(e),
        };

        let mut tree = self.levels_for(&graph, Direction::Ancestors);
        tree.levels.truncate(max_depth + 1);
        if tree.levels.is_empty() {
            tree.levels.push(vec![animal.clone()]);
        }
        tree.animal = Some(animal);
        Ok(tree)
    }

    /// The seeded collection, or every page of the herd loaded once.
    async fn local_collection(&self) -> Option<&[AnimalRecord]> {
        match self.collection.get_or_try_init(|| self.list_all_animals()).await {
            Ok(collection) => Some(collection.as_slice()),
            Err(e) => {
                warn!("Could not load the herd for local trees: {}", e);
                None
            }
        }
    }

    async fn list_all_animals(&self) -> Result<Vec<AnimalRecord>, ClientError> {
        let mut animals = Vec::new();
        let mut number = 1;

        loop {
            let page = self.source.list_animals(number, self.page_size).await?;
            let done = page.is_last() || number >= page.total_pages;
            animals.extend(page.items);
            if done {
                break;
            }
            number += 1;
        }

        info!("Loaded {} animals over {} pages", animals.len(), number);
        Ok(animals)
    }

    async fn dependencies(&self, root_id: AnimalId) -> Option<AnimalDependencies> {
        match self.source.get_animal_dependencies(root_id).await {
            Ok(dependencies) => Some(dependencies),
            Err(e) => {
                debug!("Dependency check for {} failed: {}", root_id, e);
                None
            }
        }
    }
}

async fn refresh<S>(
    source: &Arc<S>,
    cache: &TreeCache,
    key: &CacheKey,
    direction: Direction,
    request: &TreeRequest,
) -> Result<bool, ServiceError>
where
    S: TreeSource + ?Sized,
{
    let Some(_guard) = cache.begin_revalidation(key) else {
        debug!("Refresh of {} already running", key);
        return Ok(false);
    };

    let fresh = source.get_tree(direction, request).await?;
    Ok(cache.replace_if_newer(key, fresh))
}

/// Warns when the dependency check and the fetched graph disagree.
/// Returns whether they agree.
fn check_consistency(graph: &TreeGraph, direction: Direction, dependencies: AnimalDependencies) -> bool {
    let expected = dependencies.expects(direction);
    let found = !graph.edges.is_empty();
    if expected != found {
        warn!(
            "Inconsistent {} data for {:?}: backend reports relatives={} but graph has {} edges",
            direction,
            graph.root_id,
            expected,
            graph.edges.len()
        );
        return false;
    }
    true
}
