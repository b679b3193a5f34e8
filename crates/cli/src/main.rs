//! geolearn CLI - Segmentation and regression for remote-sensing notebooks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geolearn_algorithms::cluster::{mark_boundaries, mean_image, slic, KMeansParams, SlicParams};
use geolearn_algorithms::metrics::rmse;
use geolearn_algorithms::model_selection::{sweep, train_test_split, train_validation_test_split, SplitFractions};
use geolearn_algorithms::pipeline::{fit_segmenter, RegressionExperiment, SegmentationConfig};
use geolearn_algorithms::regression::{
    DecisionTreeRegressor, KNeighborsRegressor, Lasso, LinearRegression, MaxFeatures, RandomForestRegressor,
    RegressorKind, TreeParams, Weights,
};
use geolearn_algorithms::statistics::{correlation_matrix, target_correlations};
use geolearn_algorithms::transform::{
    display_composite, normalize_image, select_indices, to_rgb8, ConstantChannel, Scaler, SENTINEL2_RGB,
};
use geolearn_core::io::{load_image_dir, read_csv_table, write_labels, write_multiband, write_rgb8};
use geolearn_core::{Estimator, ImageStack, Predictor, TabularDataset};
use ndarray::Axis;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geolearn")]
#[command(author, version, about = "Segmentation and regression for multispectral and tabular data", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe an image directory or a CSV table
    Info {
        /// Directory of .tif/.npy images, or a .csv file
        input: PathBuf,
        /// Target column (CSV only)
        #[arg(short, long, default_value = "MedHouseVal")]
        target: String,
    },
    /// Write a normalized RGB composite of one image
    Composite {
        /// Directory of .tif/.npy images
        input: PathBuf,
        /// Output TIFF (three float pages)
        output: PathBuf,
        /// Image index in sorted file order
        #[arg(short, long, default_value = "0")]
        image: usize,
        /// Red, green, blue band indices
        #[arg(long, default_value = "3,2,1")]
        rgb: String,
        /// Constant-channel policy: zero, unscaled, error
        #[arg(long, default_value = "zero")]
        constant: String,
        /// Also write an 8-bit RGB preview here
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Unsupervised segmentation
    Segment {
        #[command(subcommand)]
        algorithm: SegmentCommands,
    },
    /// Pearson correlation of table columns
    Correlate {
        /// Input CSV
        input: PathBuf,
        #[arg(short, long, default_value = "MedHouseVal")]
        target: String,
    },
    /// Fit one regressor and report RMSE on a held-out split
    Regress {
        /// Input CSV
        input: PathBuf,
        #[arg(short, long, default_value = "MedHouseVal")]
        target: String,
        #[command(flatten)]
        model: ModelArgs,
        /// Comma-separated feature names (default: all)
        #[arg(short, long)]
        features: Option<String>,
        /// Scaler: none, standard, robust, minmax
        #[arg(long, default_value = "none")]
        scaler: String,
        /// Share of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare hyperparameter values on a validation split
    Sweep {
        /// Input CSV
        input: PathBuf,
        #[arg(short, long, default_value = "MedHouseVal")]
        target: String,
        #[command(flatten)]
        model: ModelArgs,
        /// Swept parameter: alpha (lasso), k (knn), max-depth (tree, forest)
        #[arg(long)]
        values: String,
        /// Scaler: none, standard, robust, minmax
        #[arg(long, default_value = "none")]
        scaler: String,
        #[arg(long, default_value = "0.2")]
        validation: f64,
        #[arg(long, default_value = "0.2")]
        test: f64,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Print the scores as JSON
        #[arg(long)]
        json: bool,
    },
}

// ─── Segment subcommands ────────────────────────────────────────────────

#[derive(Subcommand)]
enum SegmentCommands {
    /// K-means clustering of pixel spectra, applied to every image
    Kmeans {
        /// Directory of .tif/.npy images
        input: PathBuf,
        /// Output directory for one label TIFF per image
        output: PathBuf,
        /// Number of clusters
        #[arg(short, long, default_value = "5")]
        k: usize,
        /// Comma-separated band indices (default: all)
        #[arg(short, long)]
        bands: Option<String>,
        /// Comma-separated indices of the training images
        #[arg(long, default_value = "0")]
        train: String,
        /// Scaler: none, standard, robust, minmax
        #[arg(long, default_value = "minmax")]
        scaler: String,
        /// Random subsample of training pixels (0 = all)
        #[arg(long, default_value = "100000")]
        max_pixels: usize,
        #[arg(long, default_value = "300")]
        max_iter: usize,
        #[arg(long, default_value = "1")]
        n_init: usize,
        #[arg(long, default_value = "42")]
        seed: u64,
    },
    /// SLIC superpixels of one image
    Slic {
        /// Directory of .tif/.npy images
        input: PathBuf,
        /// Output label TIFF
        output: PathBuf,
        #[arg(short, long, default_value = "0")]
        image: usize,
        /// Comma-separated band indices (default: B04,B03,B02)
        #[arg(short, long)]
        bands: Option<String>,
        #[arg(short, long, default_value = "100")]
        n_segments: usize,
        #[arg(short, long, default_value = "10.0")]
        compactness: f64,
        #[arg(long, default_value = "10")]
        max_iter: usize,
        /// Keep disconnected fragments
        #[arg(long)]
        no_connectivity: bool,
        /// Also write the per-segment mean image here
        #[arg(long)]
        mean_output: Option<PathBuf>,
        /// Also write an 8-bit RGB preview with segment boundaries (three bands only)
        #[arg(long)]
        overlay: Option<PathBuf>,
    },
}

/// Regressor selection shared by `regress` and `sweep`
#[derive(clap::Args)]
struct ModelArgs {
    /// Model: linear, lasso, knn, tree, forest
    #[arg(short, long, default_value = "linear")]
    model: String,
    /// LASSO regularization strength
    #[arg(long, default_value = "1.0")]
    alpha: f64,
    /// Neighbours for knn
    #[arg(short, long, default_value = "5")]
    k: usize,
    /// knn weighting: uniform, distance
    #[arg(long, default_value = "uniform")]
    weights: String,
    /// Trees in the forest
    #[arg(long, default_value = "100")]
    n_estimators: usize,
    /// Tree depth limit
    #[arg(long)]
    max_depth: Option<usize>,
    /// Features per split: all, sqrt, or a fraction such as 0.33
    #[arg(long, default_value = "all")]
    max_features: String,
    #[arg(long, default_value = "42")]
    model_seed: u64,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_stack(dir: &Path) -> Result<ImageStack> {
    let pb = spinner("Reading images...");
    let stack = load_image_dir(dir).with_context(|| format!("Failed to load images from {}", dir.display()))?;
    pb.finish_and_clear();
    let (n, b, rows, cols) = stack.shape();
    info!("Input: {} images, {} bands, {} x {}", n, b, cols, rows);
    Ok(stack)
}

fn read_table(path: &Path, target: &str) -> Result<TabularDataset> {
    let pb = spinner("Reading table...");
    let dataset = read_csv_table(path, target).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!(
        "Input: {} samples, {} features",
        dataset.table.n_samples(),
        dataset.table.n_features()
    );
    Ok(dataset)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn write_preview(composite: ndarray::ArrayView3<'_, f64>, path: &Path) -> Result<()> {
    let (_, rows, cols) = composite.dim();
    let bytes = to_rgb8(composite).context("Preview needs exactly three bands")?;
    write_rgb8(&bytes, rows, cols, path).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Preview saved to: {}", path.display());
    Ok(())
}

fn parse_indices(s: &str) -> Result<Vec<usize>> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid index: {}", part))
        })
        .collect()
}

fn parse_rgb(s: &str) -> Result<[usize; 3]> {
    let bands = parse_indices(s)?;
    match bands.as_slice() {
        &[r, g, b] => Ok([r, g, b]),
        _ => anyhow::bail!("Expected three bands 'r,g,b', got: {}", s),
    }
}

fn parse_constant(s: &str) -> Result<ConstantChannel> {
    match s.to_lowercase().as_str() {
        "zero" | "0" => Ok(ConstantChannel::Zero),
        "unscaled" | "keep" => Ok(ConstantChannel::Unscaled),
        "error" | "fail" => Ok(ConstantChannel::Error),
        _ => anyhow::bail!("Unknown constant-channel policy: {}. Use zero, unscaled, or error.", s),
    }
}

fn parse_scaler(s: &str) -> Result<Option<Scaler>> {
    match s.to_lowercase().as_str() {
        "none" | "off" => Ok(None),
        "standard" | "std" | "z" => Ok(Some(Scaler::Standard)),
        "robust" => Ok(Some(Scaler::Robust)),
        "minmax" | "min-max" => Ok(Some(Scaler::MinMax)),
        _ => anyhow::bail!("Unknown scaler: {}. Use none, standard, robust, or minmax.", s),
    }
}

fn parse_weights(s: &str) -> Result<Weights> {
    match s.to_lowercase().as_str() {
        "uniform" | "u" => Ok(Weights::Uniform),
        "distance" | "d" => Ok(Weights::Distance),
        _ => anyhow::bail!("Unknown weights: {}. Use uniform or distance.", s),
    }
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s.to_lowercase().as_str() {
        "all" => Ok(MaxFeatures::All),
        "sqrt" => Ok(MaxFeatures::Sqrt),
        other => {
            let f: f64 = other
                .parse()
                .with_context(|| format!("Invalid max-features: {}", s))?;
            Ok(MaxFeatures::Fraction(f))
        }
    }
}

fn parse_values(s: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(|v| v.trim().parse::<f64>().with_context(|| format!("Invalid value: {}", v)))
        .collect()
}

fn build_model(args: &ModelArgs) -> Result<RegressorKind> {
    let kind = match args.model.to_lowercase().as_str() {
        "linear" | "ols" => LinearRegression::default().into(),
        "lasso" => Lasso::with_alpha(args.alpha).into(),
        "knn" => KNeighborsRegressor::new(args.k, parse_weights(&args.weights)?).into(),
        "tree" => DecisionTreeRegressor {
            params: TreeParams {
                max_depth: args.max_depth,
                max_features: parse_max_features(&args.max_features)?,
                ..Default::default()
            },
            seed: args.model_seed,
        }
        .into(),
        "forest" | "rf" => RandomForestRegressor {
            n_estimators: args.n_estimators,
            max_depth: args.max_depth,
            max_features: parse_max_features(&args.max_features)?,
            seed: args.model_seed,
            ..Default::default()
        }
        .into(),
        _ => anyhow::bail!("Unknown model: {}. Use linear, lasso, knn, tree, or forest.", args.model),
    };
    Ok(kind)
}

/// One candidate per swept value, varying the model's main hyperparameter.
fn sweep_candidates(base: RegressorKind, values: &[f64]) -> Result<Vec<RegressorKind>> {
    values
        .iter()
        .map(|&v| {
            let mut kind = base.clone();
            match &mut kind {
                RegressorKind::Lasso(m) => m.alpha = v,
                RegressorKind::KNeighbors(m) => m.k = v as usize,
                RegressorKind::DecisionTree(m) => m.params.max_depth = Some(v as usize),
                RegressorKind::RandomForest(m) => m.max_depth = Some(v as usize),
                RegressorKind::Linear(_) => anyhow::bail!("linear regression has no hyperparameter to sweep"),
            }
            Ok(kind)
        })
        .collect()
}

#[derive(Serialize)]
struct SweepOutput<'a> {
    scores: &'a [geolearn_algorithms::model_selection::SweepScore],
    best: String,
    test_rmse: f64,
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input, target } => {
            let is_csv = input
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

            if is_csv {
                let dataset = read_table(&input, &target)?;
                println!("File: {}", input.display());
                print!("{}", dataset.description);
            } else {
                let stack = read_stack(&input)?;
                let (n, bands, rows, cols) = stack.shape();
                println!("Directory: {}", input.display());
                println!("Images: {}  Bands: {}  Size: {} x {}", n, bands, cols, rows);
                for (i, src) in stack.sources().iter().enumerate() {
                    println!("  [{}] {}", i, src.display());
                }
                println!("\nBand ranges (all images):");
                for b in 0..bands {
                    let band = stack.data().index_axis(Axis(1), b);
                    let min = band.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = band.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    let mean = band.sum() / band.len() as f64;
                    println!("  B{:<3} min {:>10.2}  max {:>10.2}  mean {:>10.2}", b, min, max, mean);
                }
            }
        }

        // ── Composite ────────────────────────────────────────────────
        Commands::Composite {
            input,
            output,
            image,
            rgb,
            constant,
            preview,
        } => {
            let rgb = parse_rgb(&rgb)?;
            let policy = parse_constant(&constant)?;
            let stack = read_stack(&input)?;
            let start = Instant::now();
            let composite =
                display_composite(&stack, image, rgb, policy).context("Failed to build RGB composite")?;
            write_multiband(composite.view(), &output).context("Failed to write output")?;
            if let Some(path) = preview {
                write_preview(composite.view(), &path)?;
            }
            done("Composite", &output, start.elapsed());
        }

        // ── Segmentation ─────────────────────────────────────────────
        Commands::Segment { algorithm } => match algorithm {
            SegmentCommands::Kmeans {
                input,
                output,
                k,
                bands,
                train,
                scaler,
                max_pixels,
                max_iter,
                n_init,
                seed,
            } => {
                let stack = read_stack(&input)?;
                let config = SegmentationConfig {
                    bands: bands.as_deref().map(parse_indices).transpose()?.unwrap_or_default(),
                    scaler: parse_scaler(&scaler)?,
                    kmeans: KMeansParams {
                        k,
                        max_iterations: max_iter,
                        n_init,
                        seed,
                        ..Default::default()
                    },
                    max_training_pixels: (max_pixels > 0).then_some(max_pixels),
                };
                let train = parse_indices(&train)?;

                let start = Instant::now();
                let pb = spinner("Fitting k-means...");
                let segmenter = fit_segmenter(&stack, &train, &config).context("Failed to fit k-means")?;
                pb.finish_and_clear();

                std::fs::create_dir_all(&output)
                    .with_context(|| format!("Failed to create {}", output.display()))?;
                for i in 0..stack.n_images() {
                    let labels = segmenter.segment(&stack, i).context("Failed to segment image")?;
                    let stem = stack
                        .sources()
                        .get(i)
                        .and_then(|p| p.file_stem())
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| format!("image_{}", i));
                    let path = output.join(format!("{}_labels.tif", stem));
                    write_labels(&labels, &path).context("Failed to write labels")?;
                    info!("{}: {:?} pixels per cluster", stem, labels.counts().to_vec());
                }
                println!("Inertia: {:.4}", segmenter.model().inertia);
                done("Labels", &output, start.elapsed());
            }

            SegmentCommands::Slic {
                input,
                output,
                image,
                bands,
                n_segments,
                compactness,
                max_iter,
                no_connectivity,
                mean_output,
                overlay,
            } => {
                let stack = read_stack(&input)?;
                let bands = match bands {
                    Some(b) => parse_indices(&b)?,
                    None => SENTINEL2_RGB.to_vec(),
                };
                let selected = select_indices(stack.image(image)?, Axis(0), &bands)?;
                let normalized = normalize_image(selected.view(), ConstantChannel::Zero)?;

                let params = SlicParams {
                    n_segments,
                    compactness,
                    max_iterations: max_iter,
                    enforce_connectivity: !no_connectivity,
                    ..Default::default()
                };
                let start = Instant::now();
                let pb = spinner("Computing superpixels...");
                let labels = slic(normalized.view(), &params).context("Failed to compute SLIC")?;
                pb.finish_and_clear();
                let elapsed = start.elapsed();

                println!("Segments: {}", labels.n_labels());
                write_labels(&labels, &output).context("Failed to write labels")?;
                if let Some(path) = mean_output {
                    let means = mean_image(normalized.view(), &labels)?;
                    write_multiband(means.view(), &path).context("Failed to write mean image")?;
                    println!("Mean image saved to: {}", path.display());
                }
                if let Some(path) = overlay {
                    let white = vec![1.0; normalized.dim().0];
                    let marked = mark_boundaries(normalized.view(), &labels, &white)?;
                    write_preview(marked.view(), &path)?;
                }
                done("SLIC labels", &output, elapsed);
            }
        },

        // ── Correlation ──────────────────────────────────────────────
        Commands::Correlate { input, target } => {
            let dataset = read_table(&input, &target)?;
            let table = &dataset.table;
            let matrix = correlation_matrix(table.features())?;
            let with_target = target_correlations(table)?;

            let names = table.feature_names();
            print!("{:>12}", "");
            for name in names {
                print!(" {:>10.10}", name);
            }
            println!();
            for (i, name) in names.iter().enumerate() {
                print!("{:>12.12}", name);
                for v in matrix.row(i) {
                    print!(" {:>10.3}", v);
                }
                println!();
            }
            println!("\nCorrelation with '{}':", table.target_name());
            let mut ranked: Vec<(&String, f64)> = names.iter().zip(with_target.iter().copied()).collect();
            ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
            for (name, r) in ranked {
                println!("  {:<16} {:>7.3}", name, r);
            }
        }

        // ── Regression ───────────────────────────────────────────────
        Commands::Regress {
            input,
            target,
            model,
            features,
            scaler,
            test_fraction,
            seed,
            json,
        } => {
            let dataset = read_table(&input, &target)?;
            let (train, test) = train_test_split(&dataset.table, test_fraction, seed)?;

            let mut experiment = RegressionExperiment::new(build_model(&model)?);
            experiment.scaler = parse_scaler(&scaler)?;
            if let Some(f) = features {
                experiment = experiment.with_features(f.split(',').map(str::trim));
            }

            let start = Instant::now();
            let pb = spinner("Fitting model...");
            let report = experiment.run(&train, &test).context("Regression failed")?;
            pb.finish_and_clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Model: {}", report.model);
                println!("Features: {}", report.features.join(", "));
                println!("Train: {} rows  RMSE {:.4}  R² {:.4}", report.n_train, report.train_rmse, report.train_r2);
                println!(
                    "Test:  {} rows  RMSE {:.4}  R² {:.4}  MAE {:.4}",
                    report.n_eval, report.eval_rmse, report.eval_r2, report.eval_mae
                );
                println!("  Processing time: {:.2?}", start.elapsed());
            }
        }

        // ── Sweep ────────────────────────────────────────────────────
        Commands::Sweep {
            input,
            target,
            model,
            values,
            scaler,
            validation,
            test,
            seed,
            json,
        } => {
            let values = parse_values(&values)?;
            let dataset = read_table(&input, &target)?;
            let split = train_validation_test_split(&dataset.table, SplitFractions { validation, test }, seed)?;
            split.ensure_holdouts().context("Sweep needs validation and test rows")?;
            let (mut train, mut valid, mut holdout) = (split.train, split.validation, split.test);

            if let Some(kind) = parse_scaler(&scaler)? {
                let state = kind.fit(train.features())?;
                train = train.with_features(state.transform(train.features())?)?;
                valid = valid.with_features(state.transform(valid.features())?)?;
                holdout = holdout.with_features(state.transform(holdout.features())?)?;
            }

            let candidates = sweep_candidates(build_model(&model)?, &values)?;
            let pb = spinner("Sweeping...");
            let scores = sweep(&candidates, &train, &valid).context("Sweep failed")?;
            pb.finish_and_clear();

            // Refit the winner and score it once on the untouched test rows
            let best = &candidates[scores[0].index];
            let fitted = best.fit(train.features(), train.target())?;
            let test_rmse = rmse(holdout.target(), fitted.predict(holdout.features())?.view())?;

            if json {
                let out = SweepOutput {
                    scores: &scores,
                    best: best.label(),
                    test_rmse,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{:<32} {:>12} {:>12}", "candidate", "train RMSE", "valid RMSE");
                for s in &scores {
                    println!("{:<32} {:>12.4} {:>12.4}", s.label, s.train_rmse, s.validation_rmse);
                }
                println!("\nBest: {}  test RMSE {:.4}", best.label(), test_rmse);
            }
        }
    }

    Ok(())
}
