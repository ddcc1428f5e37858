use clap::Parser;
use edgematch::io::{edges_from_rgb, load_rgb, save_overlay, trim, EdgeParams};
use edgematch::{EdgeStats, Match, MatchConfig, Matcher, SpaceConfig, Strategy, StrategyMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "EdgeMatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StrategyConfig {
    Auto,
    TranslationFirst,
    ScaleFirst,
}

impl From<StrategyConfig> for StrategyMode {
    fn from(value: StrategyConfig) -> Self {
        match value {
            StrategyConfig::Auto => StrategyMode::Auto,
            StrategyConfig::TranslationFirst => StrategyMode::TranslationFirst,
            StrategyConfig::ScaleFirst => StrategyMode::ScaleFirst,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EdgeConfigJson {
    sigma: f32,
    kernel_size: u32,
    low_threshold: Option<f32>,
    high_threshold: Option<f32>,
}

impl Default for EdgeConfigJson {
    fn default() -> Self {
        let cfg = EdgeParams::default();
        Self {
            sigma: cfg.sigma,
            kernel_size: cfg.kernel_size,
            low_threshold: cfg.low_threshold,
            high_threshold: cfg.high_threshold,
        }
    }
}

impl From<EdgeConfigJson> for EdgeParams {
    fn from(value: EdgeConfigJson) -> Self {
        Self {
            sigma: value.sigma,
            kernel_size: value.kernel_size,
            low_threshold: value.low_threshold,
            high_threshold: value.high_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SpaceConfigJson {
    max_working_dim: f32,
    max_scale: f32,
    scale_floor: f32,
    scale_step: f32,
    rotation_step_deg: u32,
    max_rotation_deg: u32,
}

impl Default for SpaceConfigJson {
    fn default() -> Self {
        let cfg = SpaceConfig::default();
        Self {
            max_working_dim: cfg.max_working_dim,
            max_scale: cfg.max_scale,
            scale_floor: cfg.scale_floor,
            scale_step: cfg.scale_step,
            rotation_step_deg: cfg.rotation_step_deg,
            max_rotation_deg: cfg.max_rotation_deg,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    accept_threshold: f32,
    dense_edge_ratio: f32,
    dense_bound_width: f32,
    sparse_bound_width: f32,
    anchor_stride: usize,
    beam_width: usize,
    min_extent: f32,
    max_chance: f32,
    max_depth: usize,
    strategy: StrategyConfig,
    parallel: bool,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            accept_threshold: cfg.accept_threshold,
            dense_edge_ratio: cfg.dense_edge_ratio,
            dense_bound_width: cfg.dense_bound_width,
            sparse_bound_width: cfg.sparse_bound_width,
            anchor_stride: cfg.anchor_stride,
            beam_width: cfg.beam_width,
            min_extent: cfg.min_extent,
            max_chance: cfg.max_chance,
            max_depth: cfg.max_depth,
            strategy: StrategyConfig::Auto,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    exemplar_path: String,
    search_path: String,
    output_dir: Option<String>,
    label: String,
    crop: bool,
    edges: EdgeConfigJson,
    space: SpaceConfigJson,
    #[serde(rename = "match")]
    match_cfg: MatchConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exemplar_path: String::new(),
            search_path: String::new(),
            output_dir: None,
            label: "match".to_string(),
            crop: true,
            edges: EdgeConfigJson::default(),
            space: SpaceConfigJson::default(),
            match_cfg: MatchConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PoseRecord {
    x: i64,
    y: i64,
    width: u32,
    height: u32,
    sx: f32,
    sy: f32,
    angle_deg: u32,
}

#[derive(Debug, Serialize)]
struct StatsRecord {
    exemplar_edges: usize,
    exemplar_pixels: usize,
    search_edges: usize,
    search_pixels: usize,
    edge_ratio: f32,
    dense: bool,
    strategy: Option<&'static str>,
    max_tolerance: u8,
    refined: usize,
}

impl StatsRecord {
    fn new(exemplar: EdgeStats, result: &Match) -> Self {
        Self {
            exemplar_edges: exemplar.edges,
            exemplar_pixels: exemplar.pixels,
            search_edges: result.stats.search.edges,
            search_pixels: result.stats.search.pixels,
            edge_ratio: result.stats.edge_ratio,
            dense: result.stats.dense,
            strategy: result.stats.strategy.map(|s| match s {
                Strategy::TranslationFirst => "translation_first",
                Strategy::ScaleFirst => "scale_first",
            }),
            max_tolerance: result.stats.max_tolerance,
            refined: result.stats.refined,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    matched: bool,
    score: f32,
    pose: Option<PoseRecord>,
    stats: StatsRecord,
    overlay_path: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("edgematch=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.exemplar_path.is_empty() || config.search_path.is_empty() {
        return Err("exemplar_path and search_path must be set in the config".into());
    }
    let params: EdgeParams = config.edges.into();

    let exemplar_rgb = load_rgb(&config.exemplar_path)?;
    let search_rgb = load_rgb(&config.search_path)?;
    let mut exemplar = edges_from_rgb(&exemplar_rgb, &params)?;
    let mut search = edges_from_rgb(&search_rgb, &params)?;
    let mut scene = search_rgb;
    if config.crop {
        exemplar = trim(&exemplar, &exemplar_rgb)?
            .map(|(edges, _)| edges)
            .ok_or("exemplar image has no edges")?;
        if let Some((edges, color)) = trim(&search, &scene)? {
            search = edges;
            scene = color;
        }
    }

    let mut matcher = Matcher::new(exemplar)?.with_config(MatchConfig {
        accept_threshold: config.match_cfg.accept_threshold,
        dense_edge_ratio: config.match_cfg.dense_edge_ratio,
        dense_bound_width: config.match_cfg.dense_bound_width,
        sparse_bound_width: config.match_cfg.sparse_bound_width,
        anchor_stride: config.match_cfg.anchor_stride,
        beam_width: config.match_cfg.beam_width,
        min_extent: config.match_cfg.min_extent,
        max_chance: config.match_cfg.max_chance,
        max_depth: config.match_cfg.max_depth,
        strategy: config.match_cfg.strategy.into(),
        parallel: config.match_cfg.parallel,
    });
    matcher.build_space(SpaceConfig {
        max_working_dim: config.space.max_working_dim,
        max_scale: config.space.max_scale,
        scale_floor: config.space.scale_floor,
        scale_step: config.space.scale_step,
        rotation_step_deg: config.space.rotation_step_deg,
        max_rotation_deg: config.space.max_rotation_deg,
    })?;

    let result = matcher.match_edges(&search)?;

    let overlay_path = match &config.output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = save_overlay(&scene, &result, dir, &config.label)?;
            tracing::info!(path = %path.display(), "overlay written");
            Some(path.display().to_string())
        }
        None => None,
    };

    let pose = result.pose.zip(result.overlay_rect()).map(|(pose, rect)| PoseRecord {
        x: rect.0,
        y: rect.1,
        width: rect.2,
        height: rect.3,
        sx: pose.transform.sx,
        sy: pose.transform.sy,
        angle_deg: pose.transform.angle_deg,
    });
    let output = Output {
        matched: result.matched,
        score: result.score,
        pose,
        stats: StatsRecord::new(matcher.exemplar_stats(), &result),
        overlay_path,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
