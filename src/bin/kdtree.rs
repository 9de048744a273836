//! Build a kd-tree from a point file, or answer nearest-neighbor queries with a saved one.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kd_nearest::data::{brute_force_nearest, read_points_from_path};
use kd_nearest::kdtree::{codec, KdTree, KdTreeIndex};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kdtree", version, about)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a tree from a point file and save its encoding
    Build {
        /// Comma or whitespace separated points, one per line
        data: PathBuf,

        /// Where to write the tree [default: <DATA>.kdtree]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Answer one nearest-neighbor query per line, checking each against a linear scan
    Query {
        /// A tree written by `build`
        tree: PathBuf,

        /// The point file the tree was built from
        data: PathBuf,

        /// Query points, one per line
        queries: PathBuf,

        /// Where to write the matched indices [default: <QUERIES>.results]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Build { data, output } => build(&data, output),
        Command::Query {
            tree,
            data,
            queries,
            output,
        } => query(&tree, &data, &queries, output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `path` with `suffix` appended to its file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn build(data: &Path, output: Option<PathBuf>) -> Result<()> {
    info!("Reading data from {}", data.display());
    let points = read_points_from_path::<f64>(data)
        .with_context(|| format!("{} is improperly formatted or empty", data.display()))?;
    info!(
        "Read {} vectors of size {}",
        points.len(),
        points.first().map_or(0, Vec::len)
    );

    let tree = KdTree::build(&points).context("Failed to build the kd-tree")?;

    let output = output.unwrap_or_else(|| with_suffix(data, ".kdtree"));
    info!("Serializing kd-tree to {}", output.display());
    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    codec::encode(&tree, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn query(tree_path: &Path, data: &Path, queries: &Path, output: Option<PathBuf>) -> Result<()> {
    info!("Deserializing {}", tree_path.display());
    let file = File::open(tree_path)
        .with_context(|| format!("Failed to open {}", tree_path.display()))?;
    let tree: KdTree<f64> = codec::decode(BufReader::new(file))
        .with_context(|| format!("{} is not a valid kd-tree", tree_path.display()))?;
    debug!(num_items = tree.num_items(), dimension = ?tree.dimension(), "loaded tree");

    info!("Reading original points from {}", data.display());
    let points = read_points_from_path::<f64>(data)
        .with_context(|| format!("{} is improperly formatted or empty", data.display()))?;
    if tree.num_items() != points.len() {
        bail!(
            "The tree holds {} points but {} has {}",
            tree.num_items(),
            data.display(),
            points.len()
        );
    }

    info!("Reading query points from {}", queries.display());
    let query_points = read_points_from_path::<f64>(queries)
        .with_context(|| format!("{} is improperly formatted or empty", queries.display()))?;

    let output = output.unwrap_or_else(|| with_suffix(queries, ".results"));
    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    for (i, query) in query_points.iter().enumerate() {
        let line = i + 1;
        let nearest = tree
            .nearest_neighbor(query)
            .with_context(|| format!("Query on line {line}"))?
            .context("No tree has been constructed")?;
        let expected = brute_force_nearest(&points, query)
            .context("The original data set is empty")?;

        if nearest.index() as usize != expected {
            writer.flush()?;
            bail!(
                "Query on line {line}: result index {} doesn't match brute force index {expected}",
                nearest.index()
            );
        }
        // ..then check the actual points, in case the tree and data disagree
        if nearest.point.coords() != points[expected].as_slice() {
            writer.flush()?;
            bail!("Query on line {line}: tree point doesn't match the original data");
        }
        writeln!(writer, "{}", nearest.index())?;
    }
    writer.flush()?;

    info!(
        "Answered {} queries, results written to {}",
        query_points.len(),
        output.display()
    );
    Ok(())
}
