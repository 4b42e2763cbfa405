//! Headless renderer for the Erdtree demo scene.
//!
//! Renders one frame on the CPU reference backend and writes it as PNG.

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use erdtree_fx::backend::SoftwareBackend;
use erdtree_fx::layers::PassConfig;
use erdtree_fx::options::{CompositeMode, Options};
use erdtree_fx::renderer::RenderPipeline;
use erdtree_fx::scene::demo::erdtree_scene;
use erdtree_fx::util::frame_timing::ManualClock;
use erdtree_fx::viewport::Viewport;
use erdtree_fx::PipelineError;

const PRESET_DIR: &str = "assets/presets";

#[derive(Debug, Parser)]
#[command(name = "erdtree-fx", version, about = "Render the Erdtree demo scene to PNG")]
struct Args {
    /// Output PNG path.
    #[arg(short, long, default_value = "erdtree.png")]
    output: PathBuf,
    /// Logical viewport width.
    #[arg(long, default_value_t = 800)]
    width: u32,
    /// Logical viewport height.
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Device pixel ratio (clamped to 2).
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f32,
    /// Animation time in seconds fed to the glow shimmer.
    #[arg(short, long, default_value_t = 0.0)]
    time: f32,
    /// Preset name under assets/presets, or a path to a TOML file.
    #[arg(short, long)]
    preset: Option<String>,
    /// Draw the composite as one draw per effect.
    #[arg(long)]
    separate: bool,
    /// Disable the bloom stage.
    #[arg(long)]
    no_bloom: bool,
    /// Disable the glow stage.
    #[arg(long)]
    no_glow: bool,
    /// Print the options JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// List the presets and exit.
    #[arg(long)]
    list_presets: bool,
    /// Open an interactive window instead of writing a PNG.
    #[cfg(feature = "viewer")]
    #[arg(long)]
    view: bool,
}

fn load_options(args: &Args) -> Result<Options, PipelineError> {
    let mut options = match &args.preset {
        Some(preset) => {
            let path = Path::new(preset);
            if path.is_file() {
                Options::load(path)?
            } else {
                Options::load(&Path::new(PRESET_DIR).join(format!("{preset}.toml")))?
            }
        }
        None => Options::default(),
    };
    if args.separate {
        options.composite.mode = CompositeMode::Separate;
    }
    options.bloom.enabled &= !args.no_bloom;
    options.glow.enabled &= !args.no_glow;
    Ok(options)
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout().lock();
    if args.print_schema {
        let schema = serde_json::to_string_pretty(&Options::json_schema())?;
        writeln!(stdout, "{schema}")?;
        return Ok(());
    }
    if args.list_presets {
        for name in Options::list_presets(Path::new(PRESET_DIR)) {
            writeln!(stdout, "{name}")?;
        }
        return Ok(());
    }

    let options = load_options(args)?;
    #[cfg(feature = "viewer")]
    if args.view {
        erdtree_fx::viewer::Viewer::builder()
            .with_options(options)
            .build()
            .run()?;
        return Ok(());
    }

    let viewport = Viewport::new(args.width, args.height, args.pixel_ratio);
    let (width, height) = viewport.physical_size();
    if viewport.is_empty() {
        return Err(format!("empty viewport {width}x{height}").into());
    }

    let demo = erdtree_scene(viewport.aspect());
    let mut pipeline = RenderPipeline::with_config(
        SoftwareBackend::new(width, height),
        demo.scene.into_shared(),
        Rc::new(RefCell::new(demo.camera)),
        viewport,
        ManualClock::at(args.time),
        PassConfig::default(),
        options,
    )?;
    let report = pipeline.render()?;
    log::info!(
        "rendered {width}x{height}: {} draws, {} bloom writes",
        report.draws,
        report.bloom_writes
    );

    let pixels = pipeline.backend().screen().to_rgba8();
    image::save_buffer(
        &args.output,
        &pixels,
        width,
        height,
        image::ExtendedColorType::Rgba8,
    )?;
    pipeline.destroy();
    log::info!("wrote {}", args.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
