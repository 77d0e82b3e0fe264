use std::io::{self, BufRead, Write};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use weather_dashboard::{
    config::{RuntimeConfig, WEATHER_DASHBOARD_LOG_ENV},
    error::{
        AppError, RUNTIME_IO, RUNTIME_PROVIDER_INIT, RUNTIME_SERIALIZE, USER_INVALID_INPUT,
        USER_OUTPUT_MODE_CONFLICT,
    },
    model::{
        DEFAULT_CITY, DEFAULT_COUNTRY, DEFAULT_FORECAST_DAYS, DashboardInputs, DisplayMode,
        Metric, RawDashboardInputs,
    },
    providers::{HttpProviders, ProviderApi},
    service::Dashboard,
    view::{ChartSpec, NoticeLevel, TableSection, ViewModel},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Weather dashboard: geocode a place and chart its forecast")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render the dashboard once for the given inputs.
    Show(ShowArgs),
    /// Render once per JSON input line read from stdin, sharing caches.
    Session {
        #[arg(long, value_enum)]
        output: Option<OutputModeArg>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct ShowArgs {
    #[arg(long, default_value = DEFAULT_CITY)]
    city: String,
    #[arg(long, default_value = DEFAULT_COUNTRY)]
    country: String,
    /// Forecast length in days (1-7).
    #[arg(long, default_value_t = DEFAULT_FORECAST_DAYS)]
    days: u8,
    /// Hourly metric to include; repeat for several. Defaults to temperature.
    #[arg(long = "metric", value_enum)]
    metrics: Vec<MetricArg>,
    /// Select no metrics at all.
    #[arg(long, conflicts_with = "metrics")]
    no_metrics: bool,
    #[arg(long, value_enum, default_value_t = ModeArg::Graph)]
    mode: ModeArg,
    #[arg(long, value_enum)]
    output: Option<OutputModeArg>,
    #[arg(long)]
    json: bool,
}

const ENVELOPE_SCHEMA_VERSION: &str = "v1";
const COMMAND_SHOW: &str = "weather.show";
const COMMAND_SESSION: &str = "weather.session";
const DEFAULT_LOG_FILTER: &str = "error";
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputModeArg {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MetricArg {
    Temperature,
    Humidity,
    WindSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Graph,
    Table,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliOutputMode {
    Human,
    Json,
}

impl From<OutputModeArg> for CliOutputMode {
    fn from(value: OutputModeArg) -> Self {
        match value {
            OutputModeArg::Human => CliOutputMode::Human,
            OutputModeArg::Json => CliOutputMode::Json,
        }
    }
}

impl From<MetricArg> for Metric {
    fn from(value: MetricArg) -> Self {
        match value {
            MetricArg::Temperature => Metric::Temperature,
            MetricArg::Humidity => Metric::Humidity,
            MetricArg::WindSpeed => Metric::WindSpeed,
        }
    }
}

impl From<ModeArg> for DisplayMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Graph => DisplayMode::Graph,
            ModeArg::Table => DisplayMode::Table,
            ModeArg::Both => DisplayMode::Both,
        }
    }
}

impl Cli {
    fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Show(_) => COMMAND_SHOW,
            Commands::Session { .. } => COMMAND_SESSION,
        }
    }

    fn output_mode_hint(&self) -> CliOutputMode {
        let (output, json) = match &self.command {
            Commands::Show(args) => (args.output, args.json),
            Commands::Session { output, json } => (*output, *json),
        };
        if json {
            CliOutputMode::Json
        } else if let Some(explicit) = output {
            explicit.into()
        } else {
            CliOutputMode::Human
        }
    }
}

impl ShowArgs {
    fn selected_metrics(&self) -> Vec<Metric> {
        if self.no_metrics {
            Vec::new()
        } else if self.metrics.is_empty() {
            vec![Metric::Temperature]
        } else {
            self.metrics.iter().copied().map(Into::into).collect()
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let command = cli.command_name();
    let output_mode = cli.output_mode_hint();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    if let Err(error) = run(cli, stdin.lock(), &mut stdout) {
        emit_error(command, output_mode, &error);
        std::process::exit(error.exit_code());
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(WEATHER_DASHBOARD_LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run<R: BufRead, W: Write>(cli: Cli, input: R, out: &mut W) -> Result<(), AppError> {
    let config = RuntimeConfig::from_env();
    let providers = HttpProviders::new(&config)
        .map_err(|error| AppError::runtime(RUNTIME_PROVIDER_INIT, error.to_string()))?;
    let dashboard = Dashboard::new(&config, providers);
    run_with(cli, &dashboard, Utc::now, input, out)
}

fn run_with<P, N, R, W>(
    cli: Cli,
    dashboard: &Dashboard<P>,
    now_fn: N,
    input: R,
    out: &mut W,
) -> Result<(), AppError>
where
    P: ProviderApi,
    N: Fn() -> DateTime<Utc> + Copy,
    R: BufRead,
    W: Write,
{
    match cli.command {
        Commands::Show(args) => {
            let output_mode = resolve_output_mode(args.output, args.json, CliOutputMode::Human)?;
            let inputs = DashboardInputs::new(
                &args.city,
                &args.country,
                args.days,
                &args.selected_metrics(),
                args.mode.into(),
            )
            .map_err(AppError::from)?;

            let view = dashboard.render(&inputs, now_fn);
            let rendered = render_view(COMMAND_SHOW, &view, output_mode)?;
            write_line(out, &rendered)
        }
        Commands::Session { output, json } => {
            let output_mode = resolve_output_mode(output, json, CliOutputMode::Human)?;
            run_session(dashboard, now_fn, input, out, output_mode)
        }
    }
}

fn run_session<P, N, R, W>(
    dashboard: &Dashboard<P>,
    now_fn: N,
    input: R,
    out: &mut W,
    output_mode: CliOutputMode,
) -> Result<(), AppError>
where
    P: ProviderApi,
    N: Fn() -> DateTime<Utc> + Copy,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line.map_err(|error| AppError::runtime(RUNTIME_IO, error.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_session_line(trimmed) {
            Ok(inputs) => {
                let view = dashboard.render(&inputs, now_fn);
                let rendered = render_view(COMMAND_SESSION, &view, output_mode)?;
                write_line(out, &rendered)?;
            }
            Err(error) => match render_error(COMMAND_SESSION, output_mode, &error) {
                (Channel::Stdout, rendered) => write_line(out, &rendered)?,
                (Channel::Stderr, rendered) => eprintln!("{rendered}"),
            },
        }
        dashboard.purge_expired(now_fn());
    }

    Ok(())
}

fn parse_session_line(line: &str) -> Result<DashboardInputs, AppError> {
    let raw: RawDashboardInputs = serde_json::from_str(line).map_err(|error| {
        AppError::user(USER_INVALID_INPUT, format!("invalid session input: {error}"))
    })?;
    raw.validate().map_err(AppError::from)
}

fn write_line<W: Write>(out: &mut W, rendered: &str) -> Result<(), AppError> {
    writeln!(out, "{rendered}")
        .and_then(|()| out.flush())
        .map_err(|error| AppError::runtime(RUNTIME_IO, error.to_string()))
}

fn resolve_output_mode(
    output: Option<OutputModeArg>,
    json_flag: bool,
    default_mode: CliOutputMode,
) -> Result<CliOutputMode, AppError> {
    match (output.map(Into::into), json_flag) {
        (Some(mode), true) if mode != CliOutputMode::Json => Err(AppError::user(
            USER_OUTPUT_MODE_CONFLICT,
            format!(
                "conflicting output flags: --json requires --output json (got {})",
                output_mode_label(mode)
            ),
        )),
        (Some(mode), _) => Ok(mode),
        (None, true) => Ok(CliOutputMode::Json),
        (None, false) => Ok(default_mode),
    }
}

fn render_view(
    command: &str,
    view: &ViewModel,
    output_mode: CliOutputMode,
) -> Result<String, AppError> {
    match output_mode {
        CliOutputMode::Json => render_json_envelope(command, view),
        CliOutputMode::Human => Ok(format_text_output(view)),
    }
}

fn render_json_envelope(command: &str, view: &ViewModel) -> Result<String, AppError> {
    let result = serde_json::to_value(view).map_err(|error| {
        AppError::runtime(RUNTIME_SERIALIZE, format!("failed to serialize view: {error}"))
    })?;
    serde_json::to_string(&json!({
        "schema_version": ENVELOPE_SCHEMA_VERSION,
        "command": command,
        "ok": true,
        "result": result,
    }))
    .map_err(|error| {
        AppError::runtime(
            RUNTIME_SERIALIZE,
            format!("failed to serialize output envelope: {error}"),
        )
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Stdout,
    Stderr,
}

fn emit_error(command: &str, output_mode: CliOutputMode, error: &AppError) {
    match render_error(command, output_mode, error) {
        (Channel::Stdout, rendered) => println!("{rendered}"),
        (Channel::Stderr, rendered) => eprintln!("{rendered}"),
    }
}

fn render_error(command: &str, output_mode: CliOutputMode, error: &AppError) -> (Channel, String) {
    match output_mode {
        CliOutputMode::Json => {
            let payload = json!({
                "schema_version": ENVELOPE_SCHEMA_VERSION,
                "command": command,
                "ok": false,
                "error": {
                    "code": error.code,
                    "message": error.message,
                    "details": {
                        "kind": error.kind.label(),
                        "exit_code": error.exit_code(),
                    }
                }
            });
            (Channel::Stdout, payload.to_string())
        }
        CliOutputMode::Human => (Channel::Stderr, error.to_string()),
    }
}

fn output_mode_label(mode: CliOutputMode) -> &'static str {
    match mode {
        CliOutputMode::Human => "human",
        CliOutputMode::Json => "json",
    }
}

fn format_text_output(view: &ViewModel) -> String {
    let mut lines = vec![view.title.clone(), view.subtitle.clone()];

    let mut header = format!("{}, {}", view.place.city, view.place.country);
    if let Some(coordinates) = &view.coordinates {
        header.push_str(&format!(" ({})", coordinates.label()));
    }
    header.push_str(&format!(" | days={}", view.days));
    if let Some(timezone) = &view.timezone {
        header.push_str(&format!(" | timezone={timezone}"));
    }
    lines.push(header);

    for notice in &view.notices {
        let level = match notice.level {
            NoticeLevel::Error => "error",
            NoticeLevel::Warning => "warning",
        };
        lines.push(format!("[{level}] {}", notice.message));
    }

    if let Some(summary) = &view.summary {
        lines.push(String::new());
        lines.push(summary.heading.clone());
        lines.push(format!(
            "Min Temperature (°C): {}",
            format_value(summary.figures.min_temperature_c)
        ));
        lines.push(format!(
            "Max Temperature (°C): {}",
            format_value(summary.figures.max_temperature_c)
        ));
        lines.push(format!(
            "Total rainfall (mm): {}",
            format_value(summary.figures.precipitation_sum_mm)
        ));
    }

    if let Some(section) = &view.table {
        lines.push(String::new());
        lines.extend(format_table(section));
    }

    if let Some(chart) = &view.chart {
        lines.push(String::new());
        lines.extend(format_chart(chart));
    }

    lines.join("\n")
}

fn format_table(section: &TableSection) -> Vec<String> {
    let table = &section.table;
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            std::iter::once(row.time.clone())
                .chain(row.values.iter().map(|value| format_value(*value)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = table
        .header
        .iter()
        .enumerate()
        .map(|(index, title)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(title.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = vec![section.heading.clone(), join_cells(&table.header, &widths)];
    lines.extend(cells.iter().map(|row| join_cells(row, &widths)));
    lines
}

fn join_cells(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn format_chart(chart: &ChartSpec) -> Vec<String> {
    let mut lines = vec![chart.title.clone()];
    if chart.series.is_empty() {
        lines.push("(no metrics selected)".to_string());
        return lines;
    }

    let legend = chart.legend();
    let name_width = legend
        .iter()
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0);

    for (name, series) in legend.iter().zip(&chart.series) {
        let values: Vec<Option<f64>> = series.points.iter().map(|point| point.value).collect();
        let (min, max) = value_range(&values);
        lines.push(format!(
            "{name:<name_width$}  {}  min={} max={}",
            sparkline(&values),
            format_value(min),
            format_value(max),
        ));
    }

    lines
}

fn value_range(values: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    values
        .iter()
        .flatten()
        .fold((None, None), |(min, max): (Option<f64>, Option<f64>), value| {
            (
                Some(min.map_or(*value, |current| current.min(*value))),
                Some(max.map_or(*value, |current| current.max(*value))),
            )
        })
}

fn sparkline(values: &[Option<f64>]) -> String {
    let (Some(min), Some(max)) = value_range(values) else {
        return " ".repeat(values.len());
    };
    let span = max - min;
    let top = SPARK_LEVELS.len() - 1;

    values
        .iter()
        .map(|value| match value {
            None => ' ',
            Some(_) if span <= f64::EPSILON => SPARK_LEVELS[top / 2],
            Some(value) => {
                let level = (((value - min) / span) * top as f64).round() as usize;
                SPARK_LEVELS[level.min(top)]
            }
        })
        .collect()
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.1}"))
}
