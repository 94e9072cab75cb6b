//! Tree view state.
//!
//! [`TreeView`] is what a screen binds to: a loading flag, an error
//! message, the current graph and its levels, plus the user's lineage and
//! "generations shown" choices. Fetch failures never escape; they become
//! a message.

use std::sync::Arc;

use log::debug;

use crate::animal::AnimalId;
use crate::client::TreeSource;
use crate::graph::{Direction, TreeGraph};
use crate::levels::Level;
use crate::lineage::{filter_lineage, LineageMode};
use crate::service::{GenealogyService, LoadMore};

pub struct TreeView<S> {
    service: Arc<GenealogyService<S>>,
    direction: Direction,
    root_id: Option<AnimalId>,
    fields: Option<String>,
    loading: bool,
    error: Option<String>,
    graph: Option<TreeGraph>,
    levels: Vec<Level>,
    lineage: LineageMode,
    generations: Option<usize>,
}

impl<S> TreeView<S>
where
    S: TreeSource + 'static,
{
    pub fn new(service: Arc<GenealogyService<S>>, direction: Direction) -> Self {
        Self {
            service,
            direction,
            root_id: None,
            fields: None,
            loading: false,
            error: None,
            graph: None,
            levels: Vec::new(),
            lineage: LineageMode::default(),
            generations: None,
        }
    }

    /// Loads the tree of `root_id` to `max_depth` generations.
    ///
    /// On failure the graph and levels are cleared and [`Self::error`]
    /// holds the message to show.
    pub async fn load(&mut self, root_id: AnimalId, max_depth: usize, fields: Option<&str>) {
        self.loading = true;
        self.error = None;
        self.root_id = Some(root_id);
        self.fields = fields.map(str::to_string);

        let result = self
            .service
            .fetch_tree(self.direction, root_id, max_depth, fields)
            .await;
        match result {
            Ok(graph) => self.show(graph),
            Err(e) => {
                debug!("Loading {} of {} failed: {}", self.direction, root_id, e);
                self.error = Some(e.user_message().to_string());
                self.graph = None;
                self.levels.clear();
            }
        }

        self.loading = false;
    }

    /// Loads `increment` more generations on top of the current graph.
    ///
    /// Does nothing before a successful [`Self::load`]. On failure the
    /// current graph is kept and the message is set.
    pub async fn load_more(&mut self, increment: Option<usize>) {
        let (Some(root_id), Some(current)) = (self.root_id, self.graph.as_ref()) else {
            return;
        };

        self.loading = true;
        self.error = None;

        let options = LoadMore {
            increment,
            fields: self.fields.clone(),
        };
        let result = self
            .service
            .load_more(self.direction, root_id, current, options)
            .await;
        match result {
            Ok(merged) => self.show(merged),
            Err(e) => self.error = Some(e.user_message().to_string()),
        }

        self.loading = false;
    }

    fn show(&mut self, graph: TreeGraph) {
        self.levels = self.service.levels_for(&graph, self.direction).levels;
        self.graph = Some(graph);
    }

    pub fn set_lineage(&mut self, lineage: LineageMode) {
        self.lineage = lineage;
    }

    /// Limits the shown generations, root included. `None` shows all.
    pub fn set_generations(&mut self, generations: Option<usize>) {
        self.generations = generations;
    }

    /// Levels after the lineage filter, truncated to the generations shown.
    pub fn visible_levels(&self) -> Vec<Level> {
        let mut levels = filter_lineage(&self.levels, self.lineage);
        if let Some(n) = self.generations {
            levels.truncate(n);
        }
        levels
    }

    /// True when nothing beyond the root is known, whatever the reason.
    pub fn is_empty_state(&self) -> bool {
        self.levels.len() <= 1
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn graph(&self) -> Option<&TreeGraph> {
        self.graph.as_ref()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn lineage(&self) -> LineageMode {
        self.lineage
    }

    pub fn generations(&self) -> Option<usize> {
        self.generations
    }
}
