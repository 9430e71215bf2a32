use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::Parser;
use ndarray::Array2;

use dendro::clustering::{upgma, DistanceMatrix};
use dendro::weights::{set_weights, WeightConfig};

/// UPGMA clustering and branch-length weighting over distance matrices.
#[derive(Parser)]
#[command(name = "dendro")]
struct Args {
    /// CSV distance matrix; header row holds the leaf labels
    matrix: PathBuf,

    /// Write per-leaf weights as `label,weight` CSV to this path
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Rescale branch lengths to integers no larger than this before printing
    #[arg(long)]
    scale: Option<f64>,

    /// Use ultrametric scaling (equal root-to-leaf integer totals)
    #[arg(long, requires = "scale")]
    ultrametric: bool,
}

fn read_matrix(path: &Path) -> Result<(DistanceMatrix, Vec<String>), Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let labels: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let n = labels.len();

    let mut values = Vec::with_capacity(n * n);
    for record in reader.records() {
        let record = record?;
        for field in record.iter() {
            values.push(field.trim().parse::<f64>()?);
        }
    }

    let rows = values.len() / n.max(1);
    let data = Array2::from_shape_vec((rows, n), values)?;
    let matrix = DistanceMatrix::from_square(data)?;
    Ok((matrix, labels))
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut start = Instant::now();
    let (matrix, labels) = read_matrix(&args.matrix)?;
    let n = matrix.n();
    let elapsed = start.elapsed();
    println!(
        "read {}x{} distance matrix in {}.{:03} seconds",
        n,
        n,
        elapsed.as_secs(),
        elapsed.subsec_millis()
    );

    start = Instant::now();
    let (mut tree, root) = upgma(matrix, labels)?;
    let elapsed = start.elapsed();
    println!(
        "clustered {} leaves in {}.{:03} seconds",
        n,
        elapsed.as_secs(),
        elapsed.subsec_millis()
    );

    if let Some(weights_path) = &args.weights {
        set_weights(&mut tree, root, &WeightConfig::default())?;
        let leaf_weights = tree.leaf_weights(root)?;

        let mut writer = csv::Writer::from_path(weights_path)?;
        writer.write_record(["label", "weight"])?;
        let mut rows: Vec<(&String, &f64)> = leaf_weights.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        for (label, weight) in rows {
            let weight = weight.to_string();
            writer.write_record([label.as_str(), weight.as_str()])?;
        }
        writer.flush()?;
        println!("wrote {} leaf weights to {}", n, weights_path.display());
    }

    if let Some(max_length) = args.scale {
        tree.scale_branch_lengths(root, max_length, args.ultrametric)?;
    }

    println!("{}", tree.to_newick(root)?);
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
