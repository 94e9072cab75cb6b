use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::debug;

use herdbook_core::lineage::parent_role;
use herdbook_core::{
    build_local_tree, filter_lineage, level_label, Config, Direction, GenealogyService,
    HttpTreeClient, Level, LineageMode, TreeView,
};

#[derive(Parser)]
#[command(name = "herdbook")]
#[command(about = "Livestock ancestor and descendant trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the ancestors of an animal
    Ancestors(TreeArgs),
    /// Show the descendants of an animal
    Descendants(TreeArgs),
    /// Build an ancestor tree from the herd list, asking the backend only
    /// when the animal is not in it
    Tree {
        /// Animal id
        id: u64,
        /// Generations to build
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// Build a tree from an exported animal list (.json, .yaml)
    Local {
        /// Path to the exported list
        file: PathBuf,
        /// Animal id
        id: u64,
        /// Generations to build
        #[arg(short, long, default_value_t = 10)]
        depth: usize,
        /// ancestors or descendants
        #[arg(long, default_value = "ancestors")]
        direction: Direction,
        /// ambos, paterna or materna
        #[arg(short, long, default_value = "ambos")]
        lineage: LineageMode,
    },
    /// Print the default configuration
    Config,
    /// Remove every cached tree
    ClearCache,
}

#[derive(Args)]
struct TreeArgs {
    /// Animal id
    id: u64,
    /// Generations to fetch
    #[arg(short, long)]
    depth: Option<usize>,
    /// Comma-separated node fields to request
    #[arg(short, long)]
    fields: Option<String>,
    /// ambos, paterna or materna
    #[arg(short, long, default_value = "ambos")]
    lineage: LineageMode,
    /// Only show this many generations, root included
    #[arg(short, long)]
    generations: Option<usize>,
    /// Load this many extra generations after the first fetch
    #[arg(long)]
    more: Option<usize>,
    /// Print the raw graph as JSON instead of levels
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Ancestors(args) => show_remote(Direction::Ancestors, args).await,
        Commands::Descendants(args) => show_remote(Direction::Descendants, args).await,
        Commands::Tree { id, depth } => {
            let config = Config::load()?;
            let depth = depth.unwrap_or(config.genealogy.default_max_depth);
            let service = service(&config)?;

            let tree = service.build_genetic_tree(id, depth).await?;
            if tree.animal.is_none() {
                println!("Animal {} not found.", id);
                return Ok(());
            }
            print_levels(&tree.levels, Direction::Ancestors);
            Ok(())
        }
        Commands::Local {
            file,
            id,
            depth,
            direction,
            lineage,
        } => {
            let collection = herdbook_core::animal::load_collection(&file)?;
            debug!("Loaded {} animals from {}", collection.len(), file.display());

            let tree = build_local_tree(Some(id), &collection, direction, depth);
            if tree.animal.is_none() {
                println!("Animal {} not found in {}.", id, file.display());
                return Ok(());
            }
            print_levels(&filter_lineage(&tree.levels, lineage), direction);
            Ok(())
        }
        Commands::Config => {
            println!("{}", Config::default_config_string());
            Ok(())
        }
        Commands::ClearCache => {
            let config = Config::load()?;
            service(&config)?.cache().clear();
            println!("Cleared {}", config.cache.cache_dir().display());
            Ok(())
        }
    }
}

fn service(config: &Config) -> Result<GenealogyService<HttpTreeClient>, Box<dyn Error>> {
    let client = HttpTreeClient::from_config(&config.api)?;
    Ok(GenealogyService::from_config(client, config))
}

async fn show_remote(direction: Direction, args: TreeArgs) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let depth = args.depth.unwrap_or(config.genealogy.default_max_depth);

    let mut view = TreeView::new(Arc::new(service(&config)?), direction);
    view.load(args.id, depth, args.fields.as_deref()).await;
    if let Some(increment) = args.more {
        view.load_more(Some(increment)).await;
    }

    if let Some(message) = view.error() {
        eprintln!("{}", message);
        std::process::exit(1);
    }

    if args.json {
        if let Some(graph) = view.graph() {
            println!("{}", serde_json::to_string_pretty(graph)?);
        }
        return Ok(());
    }

    view.set_lineage(args.lineage);
    view.set_generations(args.generations);
    print_levels(&view.visible_levels(), direction);

    if view.is_empty_state() {
        match direction {
            Direction::Ancestors => println!("No ancestors recorded."),
            Direction::Descendants => println!("No descendants recorded."),
        }
    }
    Ok(())
}

fn print_levels(levels: &[Level], direction: Direction) {
    for (depth, level) in levels.iter().enumerate() {
        println!("{}:", level_label(direction, depth));

        for animal in level {
            let role = match (direction, depth) {
                (Direction::Ancestors, 1..) => parent_role(animal, &levels[depth - 1]),
                _ => None,
            };
            match role {
                Some(role) => println!(
                    "  {:<12} {:<8} {}",
                    animal.display_label(),
                    animal.sex().label(),
                    role
                ),
                None => println!("  {:<12} {}", animal.display_label(), animal.sex().label()),
            }
        }
    }
}
