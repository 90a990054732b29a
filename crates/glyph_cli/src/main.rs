mod config;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glyph_render::{
    CanvasLayout, GlyphRamp, GlyphRenderer, ImageSource, Preprocess, RenderContext, RenderedArt,
    SampleCatalog, DEFAULT_EXPORT_NAME, PLACEHOLDER_MESSAGE,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert images to block-glyph text or canvas art")]
struct Cli {
    /// Configuration file (defaults to <config dir>/glyph-art/config.toml)
    #[arg(long, global = true, env = "GLYPH_ART_CONFIG")]
    config: Option<PathBuf>,
    /// Directory holding named sample images
    #[arg(long, global = true)]
    samples_dir: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print glyph art to stdout
    Preview(PreviewArgs),
    /// Convert one or more images to text files
    Convert(ConvertArgs),
    /// Draw glyph art onto a canvas and export it as PNG
    Paint(PaintArgs),
    /// List the available sample images
    Samples,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Input image path
    input: Option<PathBuf>,
    /// Name of a sample image instead of a path
    #[arg(long)]
    sample: Option<String>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Rasterization strategy
    #[arg(long, value_enum, default_value = "threshold")]
    strategy: StrategyChoice,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output file, or output directory when several inputs are given
    #[arg(short, long)]
    output: PathBuf,
    /// Rasterization strategy
    #[arg(long, value_enum, default_value = "threshold")]
    strategy: StrategyChoice,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug)]
struct PaintArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// PNG output path
    #[arg(short, long, default_value = DEFAULT_EXPORT_NAME)]
    output: PathBuf,
    /// Square canvas size in pixels
    #[arg(long)]
    size: Option<u32>,
    /// Aspect-fit the image into the canvas instead of cropping it to a square
    #[arg(long, default_value_t = false)]
    no_crop: bool,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug, Clone)]
struct RenderSettings {
    /// Glyph ramp preset for the continuous ramp
    #[arg(long, value_enum)]
    ramp: Option<RampPreset>,
    /// Custom glyph ramp, most ink first (overrides --ramp)
    #[arg(long)]
    glyphs: Option<String>,
    /// Grid columns for the continuous ramp
    #[arg(long)]
    columns: Option<u32>,
    /// Brightness gain for the continuous ramp
    #[arg(long)]
    gain: Option<f64>,
    /// Contrast for the threshold pre-pass (-255..255)
    #[arg(long)]
    contrast: Option<f64>,
    /// Mean channel value below which the ink glyph is used
    #[arg(long)]
    threshold: Option<f64>,
    /// Sample every Nth pixel in threshold mode
    #[arg(long)]
    pixel_skip: Option<u32>,
    /// Bound the image is scaled to fit before threshold sampling
    #[arg(long)]
    max_bound: Option<u32>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyChoice {
    /// Contrast pass and ink/blank threshold on a fixed pixel stride
    Threshold,
    /// Gain-scaled brightness over a continuous glyph ramp
    Ramp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum RampPreset {
    Blocks,
    Shades,
    InkBlank,
    Standard,
    Detailed,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.samples_dir {
        config.samples_dir = Some(dir.clone());
    }

    match cli.command {
        Commands::Preview(args) => preview(config, args),
        Commands::Convert(args) => convert(config, args),
        Commands::Paint(args) => paint(config, args),
        Commands::Samples => samples(&config),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

fn preview(mut config: Config, args: PreviewArgs) -> Result<()> {
    args.settings.apply(&mut config);
    let catalog = load_catalog(&config)?;
    let source = args.source.to_source();
    let renderer = text_renderer(&config, args.strategy)?;

    let art = match renderer.render_source(&source, &catalog) {
        Ok(art) => art,
        Err(err) if err.is_decode() => {
            eprintln!("{PLACEHOLDER_MESSAGE}");
            return Err(err).with_context(|| format!("failed to load {}", args.source));
        },
        Err(err) => return Err(err).with_context(|| format!("failed to render {}", args.source)),
    };

    for row in art.grid().rows() {
        println!("{}", row);
    }

    Ok(())
}

fn convert(mut config: Config, args: ConvertArgs) -> Result<()> {
    args.settings.apply(&mut config);
    let renderer = text_renderer(&config, args.strategy)?;

    if let [input] = args.inputs.as_slice() {
        let art = renderer
            .render_path(input)
            .with_context(|| format!("failed to render {:?}", input))?;
        return write_text(&args.output, &art);
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create output directory {:?}", args.output))?;

    let progress = ProgressBar::new(args.inputs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images",
        )?
        .progress_chars("=> "),
    );

    for input in &args.inputs {
        let art = renderer
            .render_path(input)
            .with_context(|| format!("failed to render {:?}", input))?;
        write_text(&text_output_path(&args.output, input), &art)?;
        progress.inc(1);
    }

    progress.finish_with_message(format!("Text written to {:?}", args.output));
    Ok(())
}

fn paint(mut config: Config, args: PaintArgs) -> Result<()> {
    args.settings.apply(&mut config);
    if let Some(size) = args.size {
        config.canvas.size = size;
    }
    if args.no_crop {
        config.canvas.crop = false;
    }

    let size = f64::from(config.canvas.size);
    let (preprocess, layout) = if config.canvas.crop {
        (
            Preprocess::CropSquare(config.canvas.crop_size),
            CanvasLayout::Full { width: size, height: size },
        )
    } else {
        let layout = CanvasLayout::AspectFit { container_width: size, container_height: size };
        (Preprocess::None, layout)
    };

    let renderer = GlyphRenderer::new(preprocess, config.continuous_ramp(layout)?);
    let mut context = RenderContext::new(renderer)
        .with_catalog(load_catalog(&config)?)
        .with_canvas(config.canvas()?);

    if let Err(err) = context.load(args.source.to_source()) {
        eprintln!("{PLACEHOLDER_MESSAGE}");
        return Err(err).with_context(|| format!("failed to load {}", args.source));
    }

    if context.request_render().is_none() {
        let reason = context.session().message().unwrap_or(PLACEHOLDER_MESSAGE).to_owned();
        anyhow::bail!("nothing was rendered: {reason}");
    }

    context
        .export_png(&args.output)
        .with_context(|| format!("failed to export {:?}", args.output))?;
    info!("wrote {}", args.output.display());
    println!("{}", args.output.display());
    Ok(())
}

fn samples(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;
    if catalog.is_empty() {
        println!("no sample images found");
        return Ok(());
    }

    for (name, path) in catalog.iter() {
        println!("{name}\t{}", path.display());
    }
    Ok(())
}

fn load_catalog(config: &Config) -> Result<SampleCatalog> {
    match &config.samples_dir {
        Some(dir) => SampleCatalog::scan(dir)
            .with_context(|| format!("failed to scan sample directory {:?}", dir)),
        None => Ok(SampleCatalog::new()),
    }
}

fn text_renderer(config: &Config, strategy: StrategyChoice) -> Result<GlyphRenderer> {
    let bound = config.threshold.max_bound;
    let renderer = match strategy {
        StrategyChoice::Threshold => {
            GlyphRenderer::new(Preprocess::FitWithin(bound), config.threshold_stride()?)
        },
        StrategyChoice::Ramp => {
            let bound = f64::from(bound);
            let layout =
                CanvasLayout::AspectFit { container_width: bound, container_height: bound };
            GlyphRenderer::new(Preprocess::None, config.continuous_ramp(layout)?)
        },
    };
    Ok(renderer)
}

fn write_text(path: &Path, art: &RenderedArt) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    for row in art.grid().rows() {
        writeln!(file, "{}", row)?;
    }
    Ok(())
}

fn text_output_path(dir: &Path, input: &Path) -> PathBuf {
    let mut name =
        input.file_stem().map(|stem| stem.to_os_string()).unwrap_or_else(|| "image".into());
    name.push(".txt");
    dir.join(name)
}

impl SourceArgs {
    fn to_source(&self) -> ImageSource {
        match (&self.input, &self.sample) {
            (_, Some(name)) => ImageSource::Sample(name.clone()),
            (Some(path), None) => ImageSource::Path(path.clone()),
            // The argument group requires one of the two.
            (None, None) => ImageSource::Sample(String::new()),
        }
    }
}

impl std::fmt::Display for SourceArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.input, &self.sample) {
            (_, Some(name)) => write!(f, "sample `{name}`"),
            (Some(path), None) => write!(f, "{:?}", path),
            (None, None) => write!(f, "<no input>"),
        }
    }
}

impl RenderSettings {
    fn apply(&self, config: &mut Config) {
        if let Some(preset) = self.ramp {
            config.ramp.glyphs = preset.to_ramp().to_string();
        }
        if let Some(glyphs) = &self.glyphs {
            config.ramp.glyphs = glyphs.clone();
        }
        if let Some(columns) = self.columns {
            config.ramp.columns = columns;
        }
        if let Some(gain) = self.gain {
            config.ramp.gain = gain;
        }
        if let Some(contrast) = self.contrast {
            config.threshold.contrast = contrast;
        }
        if let Some(threshold) = self.threshold {
            config.threshold.threshold = threshold;
        }
        if let Some(pixel_skip) = self.pixel_skip {
            config.threshold.pixel_skip = pixel_skip;
        }
        if let Some(max_bound) = self.max_bound {
            config.threshold.max_bound = max_bound;
        }
    }
}

impl RampPreset {
    fn to_ramp(self) -> GlyphRamp {
        match self {
            RampPreset::Blocks => GlyphRamp::blocks(),
            RampPreset::Shades => GlyphRamp::shades(),
            RampPreset::InkBlank => GlyphRamp::ink_blank(),
            RampPreset::Standard => GlyphRamp::standard(),
            RampPreset::Detailed => GlyphRamp::detailed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_defaults_to_image_png() {
        let cli = Cli::try_parse_from(["glyph-art", "paint", "photo.jpg"]).unwrap();
        let Commands::Paint(args) = cli.command else { panic!("expected paint") };
        assert_eq!(args.output, PathBuf::from("image.png"));
        assert_eq!(args.source.to_source(), ImageSource::Path("photo.jpg".into()));
        assert!(!args.no_crop);
    }

    #[test]
    fn input_and_sample_are_exclusive() {
        assert!(Cli::try_parse_from(["glyph-art", "preview", "a.png", "--sample", "b"]).is_err());
        assert!(Cli::try_parse_from(["glyph-art", "preview"]).is_err());

        let cli = Cli::try_parse_from(["glyph-art", "preview", "--sample", "portrait"]).unwrap();
        let Commands::Preview(args) = cli.command else { panic!("expected preview") };
        assert_eq!(args.source.to_source(), ImageSource::Sample("portrait".into()));
        assert_eq!(args.strategy, StrategyChoice::Threshold);
    }

    #[test]
    fn settings_override_config() {
        let cli = Cli::try_parse_from([
            "glyph-art",
            "convert",
            "a.png",
            "-o",
            "a.txt",
            "--ramp",
            "shades",
            "--columns",
            "80",
            "--pixel-skip",
            "2",
        ])
        .unwrap();
        let Commands::Convert(args) = cli.command else { panic!("expected convert") };

        let mut config = Config::default();
        args.settings.apply(&mut config);
        assert_eq!(config.ramp.glyphs, GlyphRamp::shades().to_string());
        assert_eq!(config.ramp.columns, 80);
        assert_eq!(config.threshold.pixel_skip, 2);
        assert_eq!(config.ramp.gain, 1.2);
    }

    #[test]
    fn batch_outputs_use_input_stems() {
        let path = text_output_path(Path::new("out"), Path::new("photos/cat.jpeg"));
        assert_eq!(path, PathBuf::from("out/cat.txt"));

        let path = text_output_path(Path::new("out"), Path::new("scan.v2.png"));
        assert_eq!(path, PathBuf::from("out/scan.v2.txt"));
    }

    #[test]
    fn convert_writes_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("art.txt");
        let art = RenderedArt::Text(glyph_render::GlyphGrid::new(2, 2, "#  #".chars().collect()));

        write_text(&output, &art).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "# \n #\n");
    }
}
