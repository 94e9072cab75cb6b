pub mod animal;
pub mod cache;
pub mod client;
pub mod config;
pub mod graph;
pub mod levels;
pub mod lineage;
pub mod local;
pub mod service;
pub mod view;

pub use animal::{AnimalId, AnimalRecord, ParentIds, Sex};
pub use cache::{CacheKey, TreeCache};
pub use client::{ClientError, HttpTreeClient, TreeRequest, TreeSource};
pub use config::Config;
pub use graph::{merge, Direction, TreeEdge, TreeGraph};
pub use levels::{build_levels, GeneticTree, Level, SexConsistency};
pub use lineage::{filter_lineage, level_label, LineageMode};
pub use local::{build_local_tree, LocalIndex};
pub use service::{GenealogyService, LoadMore, ServiceError};
pub use view::TreeView;
