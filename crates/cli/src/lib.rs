use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfmask_engine::{default_decoder, PdfDecoder, PdfDocument};
use pdfmask_scheduler::{
    InlineExecutor, PageRenderScheduler, PageSurface, RenderExecutor, RenderJob, RenderWorkerPool,
    WorkerPoolConfig,
};
use pdfmask_viewer::{Point, ScrollHost, SimulatedScrollHost, Viewer, ViewerConfig, ViewerEvent};
use serde::Serialize;
use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "pdfmask-cli")]
#[command(about = "pdfmask viewer engine CLI")]
pub struct Cli {
    /// Viewer configuration (JSON). `PDFMASK_*` environment variables override it.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable page geometry.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render one page to a PNG on the worker pool.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 2)]
        workers: usize,
    },
    /// Scroll a simulated viewport through a document and print viewer events as JSON lines.
    Simulate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value = "800x600")]
        viewport: ViewportSize,
        #[arg(long, default_value_t = 10)]
        steps: u32,
        #[arg(long, default_value_t = 120.0)]
        step_px: f32,
        /// Zoom ticks applied at the viewport centre before scrolling.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        zoom_ticks: i32,
    },
    /// Print CLI version.
    Version,
}

/// `WIDTHxHEIGHT` in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewportSize {
    width: f32,
    height: f32,
}

impl FromStr for ViewportSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (width, height) =
            value.split_once(['x', 'X']).ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f32>()
                .ok()
                .filter(|n| n.is_finite() && *n > 0.0)
                .ok_or_else(|| format!("invalid viewport dimension {part:?}"))
        };
        Ok(Self { width: parse(width)?, height: parse(height)? })
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    page_number: u32,
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename = "finished")]
struct SimulationSummary {
    current_page_number: u32,
    scale: f32,
    scroll_y: f32,
    render_window: Vec<u32>,
    renders_applied: u64,
    renders_failed: u64,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Render { file, page, scale, output, workers } => {
            run_render(&file, page, scale, output.as_deref(), workers)
        }
        Commands::Simulate { file, viewport, steps, step_px, zoom_ticks } => {
            let config = load_config(cli.config.as_deref())?;
            run_simulate(&file, config, viewport, steps, step_px, zoom_ticks)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let base = match path {
        Some(path) => ViewerConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    base.with_env_overrides().context("invalid viewer configuration")
}

fn open_document(file: &Path) -> Result<Arc<dyn PdfDocument>> {
    ensure_pdf_exists(file)?;
    default_decoder().open(file).context("failed to open PDF")
}

fn run_info(file: &Path) -> Result<()> {
    let document = open_document(file)?;
    let page_count = document.page_count();

    let pages = (1..=page_count)
        .map(|page_number| {
            let page = document.get_page(page_number)?;
            Ok(PageOutput { page_number, width: page.natural_width, height: page.natural_height })
        })
        .collect::<Result<Vec<_>>>()?;

    let payload = InfoOutput { path: file.display().to_string(), page_count, pages };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_render(
    file: &Path,
    page_number: u32,
    scale: f32,
    output: Option<&Path>,
    workers: usize,
) -> Result<()> {
    if page_number == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    if !scale.is_finite() || scale <= 0.0 {
        anyhow::bail!("--scale must be a positive number, got {scale}");
    }

    let document = open_document(file)?;
    let page = document.get_page(page_number).context("failed to look up page")?;

    let pool = RenderWorkerPool::new(WorkerPoolConfig::new(workers))
        .context("failed to start render workers")?;
    let mut scheduler = PageRenderScheduler::new();
    let ticket = scheduler
        .mount(page, scale, Instant::now())
        .context("scheduler refused the render")?;
    pool.submit(RenderJob::new(ticket, document));

    let outcome = pool.wait_completed(RENDER_TIMEOUT).context("render timed out")?;
    scheduler.complete(outcome);
    pool.shutdown();

    let bitmap = match scheduler.surface(page.index) {
        Some(PageSurface::Ready(bitmap)) => bitmap.clone(),
        Some(PageSurface::Failed { reason, .. }) => {
            anyhow::bail!("failed to render page {page_number}: {reason}")
        }
        _ => anyhow::bail!("render of page {page_number} produced no bitmap"),
    };

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page_number));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    bitmap
        .image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    log::info!("rendered page {page_number} at scale {scale} to {}", output.display());
    println!("{}", output.display());
    Ok(())
}

fn run_simulate(
    file: &Path,
    config: ViewerConfig,
    viewport: ViewportSize,
    steps: u32,
    step_px: f32,
    zoom_ticks: i32,
) -> Result<()> {
    ensure_pdf_exists(file)?;

    let frame = config.frame_interval().max(Duration::from_millis(1));
    let settle = config.zoom_debounce();
    let mut viewer = Viewer::new(config, Box::new(InlineExecutor::new()))?;
    let mut host = SimulatedScrollHost::new(viewport.width, viewport.height);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    viewer.subscribe(move |event: &ViewerEvent| sink.borrow_mut().push(event.clone()));

    // Simulated clock: one frame per step.
    let mut now = Instant::now();
    viewer.load_file(file, &mut host, now).context("failed to open PDF")?;
    viewer.tick(&mut host, now);
    viewer.pump_until_idle(now);
    flush_events(&events)?;

    if zoom_ticks != 0 {
        let centre = Point::new(viewport.width / 2.0, viewport.height / 2.0);
        viewer.zoom_at(zoom_ticks, centre, &mut host, now);
        flush_events(&events)?;
    }

    for _ in 0..steps {
        now += frame;
        host.scroll_by(0.0, step_px);
        viewer.on_scroll();
        viewer.tick(&mut host, now);
        viewer.pump_until_idle(now);
        flush_events(&events)?;
    }

    // Let debounced zoom renders land.
    now += settle + frame;
    viewer.tick(&mut host, now);
    viewer.pump_until_idle(now);
    flush_events(&events)?;

    let stats = viewer.scheduler_stats();
    let summary = SimulationSummary {
        current_page_number: viewer.current_page().current_page_number,
        scale: viewer.current_scale(),
        scroll_y: host.scroll_offset().y,
        render_window: viewer.render_window().iter().collect(),
        renders_applied: stats.renders_applied,
        renders_failed: stats.renders_failed,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn flush_events(events: &Rc<RefCell<Vec<ViewerEvent>>>) -> Result<()> {
    for event in events.borrow_mut().drain(..) {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
