//! `ndpix` CLI - load, transform and save N-dimensional images.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ndpix::{Engine, ErasedArray, LabeledArray, Options};

/// Load images, run a chain of algorithms on them and save the results.
#[derive(Parser, Debug)]
#[command(name = "ndpix")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input file or directory.
    #[arg(value_name = "INPUT", required_unless_present_any = ["list", "help_format", "help_algo"])]
    input: Option<PathBuf>,

    /// Output file, or output directory when INPUT is a directory.
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Output format. Predicted from OUTPUT when omitted.
    #[arg(short, long, value_name = "NAME")]
    format: Option<String>,

    /// Algorithm to apply; repeat to chain. A numeric suffix (`blur_2`) selects
    /// a separate entry of --algo-options.
    #[arg(short, long = "algorithm", value_name = "NAME")]
    algorithms: Vec<String>,

    /// JSON object mapping algorithm names to their options.
    #[arg(long, value_name = "JSON")]
    algo_options: Option<String>,

    /// JSON object of loading options.
    #[arg(long, value_name = "JSON")]
    loading_options: Option<String>,

    /// JSON object of saving options.
    #[arg(long, value_name = "JSON")]
    saving_options: Option<String>,

    /// JSON preset file; explicit flags take precedence.
    #[arg(long, value_name = "FILE")]
    preset: Option<PathBuf>,

    /// Recurse into subdirectories.
    #[arg(short, long)]
    recurse: bool,

    /// Treat every image of a directory as one multi-image input.
    #[arg(long)]
    as_one: bool,

    /// Only print information about the input.
    #[arg(long)]
    print_info: bool,

    /// Allow overwriting existing files.
    #[arg(long)]
    allow_override: bool,

    /// Show the supported types and options of a format.
    #[arg(long, value_name = "NAME")]
    help_format: Option<String>,

    /// Show the supported types and options of an algorithm.
    #[arg(long, value_name = "NAME")]
    help_algo: Option<String>,

    /// List supported formats and algorithms.
    #[arg(long)]
    list: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

/// Settings stored in a `--preset` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Preset {
    format: Option<String>,
    algorithms: Vec<String>,
    algo_options: HashMap<String, Options>,
    loading_options: Options,
    saving_options: Options,
    recurse: bool,
    as_one: bool,
    allow_override: bool,
    print_info: bool,
}

impl Preset {
    fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read preset {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("{} is not a valid preset", path.display()))
    }

    /// Overlay command line flags on the preset.
    fn merge_args(mut self, args: &Args) -> Result<Self> {
        if args.format.is_some() {
            self.format.clone_from(&args.format);
        }
        if !args.algorithms.is_empty() {
            self.algorithms.clone_from(&args.algorithms);
        }
        if let Some(text) = &args.algo_options {
            self.algo_options = serde_json::from_str(text).context("--algo-options is not a JSON object of option maps")?;
        }
        if let Some(text) = &args.loading_options {
            self.loading_options = Options::from_json(text).context("Invalid --loading-options")?;
        }
        if let Some(text) = &args.saving_options {
            self.saving_options = Options::from_json(text).context("Invalid --saving-options")?;
        }
        self.recurse |= args.recurse;
        self.as_one |= args.as_one;
        self.allow_override |= args.allow_override;
        self.print_info |= args.print_info;
        Ok(self)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ndpix={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    let engine = Engine::new().context("Failed to initialize engine")?;

    if args.list {
        println!("Supported formats:");
        for name in engine.supported_formats() {
            println!("\t{name}");
        }
        println!("Supported algorithms:");
        for name in engine.supported_algorithms() {
            println!("\t{name}");
        }
        return Ok(());
    }
    if let Some(name) = &args.help_format {
        println!("SUPPORTED TYPES: {}", type_list(engine.format(name)?.supported_types()));
        println!("LOADING OPTIONS:\n{}", engine.loading_schema(name)?);
        println!("SAVING OPTIONS:\n{}", engine.saving_schema(name)?);
        return Ok(());
    }
    if let Some(name) = &args.help_algo {
        println!("SUPPORTED TYPES: {}", type_list(engine.algorithm(name)?.supported_types()));
        println!("OPTIONS:\n{}", engine.algorithm_schema(name)?);
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        bail!("Input path is required");
    };
    if !input.exists() {
        bail!("Input path does not exist: {}", input.display());
    }
    let preset = match &args.preset {
        Some(path) => Preset::load(path)?,
        None => Preset::default(),
    };
    let settings = preset.merge_args(args)?;
    let directory_mode = input.is_dir();
    if !directory_mode && (settings.recurse || settings.as_one) {
        bail!("--recurse and --as-one require INPUT to be a directory");
    }

    if settings.print_info {
        return print_info(&engine, input, directory_mode, &settings);
    }

    let Some(output) = args.output.as_deref() else {
        bail!("Output path is required");
    };
    if directory_mode && settings.format.is_none() {
        bail!("--format is required when INPUT is a directory");
    }

    // Load everything and run the algorithm chain before touching the output.
    let mut groups = if directory_mode {
        engine.load_directory(input, settings.recurse, None, &settings.loading_options)?
    } else {
        vec![engine.load_image(input, None, None, &settings.loading_options)?]
    };
    if settings.as_one {
        groups = vec![merge_groups(groups)];
    }
    debug!(files = groups.len(), "images loaded");

    let mut writes = Vec::new();
    for images in groups {
        let images = apply_algorithms(&engine, images, &settings)?;
        if images.is_empty() {
            continue;
        }
        let (single, many_dir) = if directory_mode {
            let first = output.join(&images[0].label);
            let dir = first.parent().map(Path::to_path_buf).unwrap_or_else(|| output.to_path_buf());
            (first, dir)
        } else {
            (output.to_path_buf(), output.to_path_buf())
        };
        writes.extend(plan_writes(&engine, images, &single, &many_dir, settings.format.as_deref())?);
    }

    for (_, path) in &writes {
        if !settings.allow_override && path.exists() {
            bail!("{} already exists, use --allow-override to replace it", path.display());
        }
    }
    for (images, path) in &writes {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        engine
            .save_image(images, path, settings.format.as_deref(), &settings.saving_options)
            .with_context(|| format!("Failed to save {}", path.display()))?;
    }

    println!("Wrote {} file(s)", writes.len());
    Ok(())
}

fn type_list(types: &[ndpix::PixelType]) -> String {
    types.iter().map(|t| t.name()).collect::<Vec<_>>().join(" ")
}

/// Algorithm name without a trailing `_<digits>` instance suffix.
fn base_algorithm(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((base, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => name,
    }
}

fn apply_algorithms(engine: &Engine, mut images: Vec<LabeledArray>, settings: &Preset) -> Result<Vec<LabeledArray>> {
    let none = Options::new();
    for name in &settings.algorithms {
        let options = settings.algo_options.get(name).unwrap_or(&none);
        let algorithm = base_algorithm(name);
        debug!(algorithm, images = images.len(), "applying");
        images = engine
            .apply_labeled(&images, algorithm, options)
            .with_context(|| format!("Algorithm '{name}' failed"))?;
    }
    Ok(images)
}

/// Labels made unique by appending `_` to repeats.
fn merge_groups(groups: Vec<Vec<LabeledArray>>) -> Vec<LabeledArray> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for mut image in groups.into_iter().flatten() {
        while seen.contains(&image.label) {
            let mut label = image.label.into_os_string();
            label.push("_");
            image.label = label.into();
        }
        seen.insert(image.label.clone());
        out.push(image);
    }
    out
}

/// Decide which files the images go to and resolve their final paths.
///
/// All images go to `single` when one file can hold them; otherwise each image
/// gets its own file in `many_dir`, named after its label.
fn plan_writes(
    engine: &Engine,
    images: Vec<LabeledArray>,
    single: &Path,
    many_dir: &Path,
    format: Option<&str>,
) -> Result<Vec<(Vec<ErasedArray>, PathBuf)>> {
    let arrays: Vec<ErasedArray> = images.iter().map(|i| i.image.clone()).collect();
    match engine.resolve_save(&arrays, single, format) {
        Ok((_, path)) => return Ok(vec![(arrays, path)]),
        Err(err) if images.len() == 1 => return Err(err.into()),
        Err(_) => {}
    }

    let mut out = Vec::new();
    for image in images {
        let name = image.label.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("image"));
        let single = vec![image.image];
        let (_, path) = engine
            .resolve_save(&single, &many_dir.join(name), format)
            .with_context(|| format!("No way to save {}", image.label.display()))?;
        out.push((single, path));
    }
    Ok(out)
}

fn print_info(engine: &Engine, input: &Path, directory_mode: bool, settings: &Preset) -> Result<()> {
    if !directory_mode {
        return print_file_info(engine, input, &settings.loading_options);
    }
    let mut entries = fs::read_dir(input)?.map(|e| e.map(|e| e.path())).collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() && settings.recurse {
            print_info(engine, &path, true, settings)?;
        } else if path.is_file() {
            print_file_info(engine, &path, &settings.loading_options)?;
        }
    }
    Ok(())
}

fn print_file_info(engine: &Engine, path: &Path, options: &Options) -> Result<()> {
    let size = fs::metadata(path)?.len();
    let props = engine.properties(path, options).with_context(|| format!("Cannot read {}", path.display()))?;
    println!("{}:", path.display());
    println!("File size: {:.1} KB", size as f64 / 1000.0);
    println!("{props}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_algorithm() {
        assert_eq!(base_algorithm("blur_2"), "blur");
        assert_eq!(base_algorithm("to_gray8"), "to_gray8");
        assert_eq!(base_algorithm("blur_"), "blur_");
        assert_eq!(base_algorithm("fft"), "fft");
    }

    #[test]
    fn test_preset_merge() {
        let preset: Preset = serde_json::from_str(
            r#"{"format": "png", "algorithms": ["blur"], "recurse": true,
                "algo_options": {"blur": {"intensity": 2.0}}}"#,
        )
        .unwrap();
        let args = Args::parse_from(["ndpix", "in", "out", "-a", "fft", "--allow-override"]);
        let merged = preset.merge_args(&args).unwrap();
        assert_eq!(merged.format.as_deref(), Some("png"));
        assert_eq!(merged.algorithms, vec!["fft"]);
        assert!(merged.recurse && merged.allow_override);
        assert_eq!(merged.algo_options["blur"].get_double("intensity").unwrap(), 2.0);
    }

    #[test]
    fn test_existing_outputs_block_every_write() {
        let root = std::env::temp_dir().join(format!("ndpix-cli-{}-override", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let (input, output) = (root.join("in"), root.join("out"));
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();

        let engine = Engine::new().unwrap();
        let image = ndpix::TypedArray::<u8>::from_vec(&[2, 2], vec![0, 64, 128, 255]).erase();
        for name in ["a.png", "b.png"] {
            engine.save_image(&[image.clone()], &input.join(name), Some("png"), &Options::new()).unwrap();
        }
        fs::write(output.join("b.png"), b"keep").unwrap();

        let argv = |extra: &[&str]| {
            let mut argv = vec!["ndpix".into(), input.clone().into_os_string(), output.clone().into_os_string()];
            argv.extend(["-f", "png"].iter().chain(extra).map(std::ffi::OsString::from));
            Args::parse_from(argv)
        };

        let err = run(&argv(&[])).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(!output.join("a.png").exists());
        assert_eq!(fs::read(output.join("b.png")).unwrap(), b"keep");

        run(&argv(&["--allow-override"])).unwrap();
        assert!(output.join("a.png").exists());
        assert_ne!(fs::read(output.join("b.png")).unwrap(), b"keep");
        let _ = fs::remove_dir_all(&root);
    }
}
