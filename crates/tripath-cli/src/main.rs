//! tripath CLI - triangle navmesh tooling.
//!
//! - `tripath info` - mesh, adjacency, and BSP summary
//! - `tripath search` - waypoints between two points
//! - `tripath convert` - binary <-> OBJ, optionally merging vertices

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use tripath_core::Vec3;
use tripath_mesh::{PathfindingConfig, TriangleMeshData, TriangleMeshPathFinding};

#[derive(Parser)]
#[command(name = "tripath")]
#[command(about = "Triangle navmesh pathfinding", version)]
struct Cli {
    /// Pathfinding configuration (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a mesh
    Info {
        #[arg(long)]
        mesh: PathBuf,
    },

    /// Find a path between two points
    Search {
        #[arg(long)]
        mesh: PathBuf,

        /// Start point as `x,y,z`
        #[arg(long, allow_hyphen_values = true)]
        from: Point,

        /// End point as `x,y,z`
        #[arg(long, allow_hyphen_values = true)]
        to: Point,

        /// Print JSON instead of one waypoint per line
        #[arg(long)]
        json: bool,
    },

    /// Convert between the binary format and OBJ (chosen by extension)
    Convert {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Merge near-coincident vertices and drop degenerate triangles
        #[arg(long)]
        merge: bool,
    },
}

/// `x,y,z` on the command line.
#[derive(Debug, Clone, Copy)]
struct Point(Vec3);

impl FromStr for Point {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let coords = s
            .split(',')
            .map(|c| c.trim().parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid coordinate in `{s}`: {e}"))?;
        match coords.as_slice() {
            &[x, y, z] => Ok(Point(Vec3::new(x, y, z))),
            _ => Err(format!("expected `x,y,z`, got `{s}`")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => PathfindingConfig::load(path)?,
        None => PathfindingConfig::default(),
    };

    match cli.command {
        Commands::Info { mesh } => show_info(&mesh, &config),
        Commands::Search {
            mesh,
            from,
            to,
            json,
        } => run_search(&mesh, &config, from.0, to.0, json).await,
        Commands::Convert {
            input,
            output,
            merge,
        } => convert(&input, &output, &config, merge),
    }
}

fn load_mesh(path: &Path) -> Result<TriangleMeshData> {
    TriangleMeshData::load(path).with_context(|| format!("Failed to load mesh from {}", path.display()))
}

fn show_info(path: &Path, config: &PathfindingConfig) -> Result<()> {
    let data = load_mesh(path)?;
    let (vertices, triangles) = (data.vertex_count(), data.triangle_count());
    let nav = TriangleMeshPathFinding::new(data, config)
        .with_context(|| format!("Invalid mesh in {}", path.display()))?;
    let mesh = nav.mesh();
    let bsp = mesh.bsp().stats();

    println!("Mesh: {}", path.display());
    println!();
    println!("Vertices:  {vertices}");
    println!("Triangles: {triangles} ({} after preparation)", mesh.triangle_count());
    println!("Routes:    {}", mesh.route_count());
    println!("Islands:   {}", mesh.islands().len());
    for island in mesh.islands().iter().take(5) {
        println!("  - triangle {}", island.0);
    }
    if mesh.islands().len() > 5 {
        println!("  ... and {} more", mesh.islands().len() - 5);
    }
    println!();
    println!("BSP:");
    println!("  nodes:          {}", bsp.nodes);
    println!("  leaves:         {}", bsp.leaves);
    println!("  max depth:      {}", bsp.max_depth);
    println!("  fragments:      {}", bsp.fragments);
    println!("  max leaf size:  {}", bsp.max_leaf_fragments);
    println!("  unsplittable:   {}", bsp.unsplittable_leaves);

    Ok(())
}

async fn run_search(
    path: &Path,
    config: &PathfindingConfig,
    from: Vec3,
    to: Vec3,
    json: bool,
) -> Result<()> {
    let data = load_mesh(path)?;
    let nav = TriangleMeshPathFinding::new(data, config)
        .with_context(|| format!("Invalid mesh in {}", path.display()))?;

    tracing::info!(?from, ?to, "Searching");
    let waypoints = nav
        .search_async(from, to)
        .await
        .context("No path found")?;

    if json {
        let out = serde_json::json!({
            "from": from,
            "to": to,
            "waypoints": waypoints,
            "length": waypoints.windows(2).map(|w| w[0].distance(w[1])).sum::<f32>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for w in &waypoints {
            println!("{} {} {}", w.x, w.y, w.z);
        }
    }
    Ok(())
}

fn convert(input: &Path, output: &Path, config: &PathfindingConfig, merge: bool) -> Result<()> {
    if input == output {
        bail!("input and output are the same file: {}", input.display());
    }
    let mut data = load_mesh(input)?;

    if merge {
        let report = data.merge_vertices(config.merge.gap, config.merge.degenerate_epsilon);
        println!(
            "Merged vertices {} -> {}, triangles {} -> {}",
            report.vertices_before, report.vertices_after, report.triangles_before, report.triangles_after
        );
    }

    data.save(output)
        .with_context(|| format!("Failed to write mesh to {}", output.display()))?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        triangles = data.triangle_count(),
        "Converted mesh"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse_from_comma_separated_triples() {
        let p: Point = "1.5, -2,0.25".parse().expect("point");
        assert_eq!(p.0, Vec3::new(1.5, -2.0, 0.25));
        assert!("1,2".parse::<Point>().is_err());
        assert!("1,2,z".parse::<Point>().is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
