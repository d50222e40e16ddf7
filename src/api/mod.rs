use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::chart::render_svg;
use crate::core::{
    DEFAULT_SALE_YEAR, DEFAULT_START_YEAR, DiscountAnchor, MAX_YEAR, MIN_YEAR, Projection,
    ProjectionError, ProjectionOptions, ScenarioInputs, run_projection,
};
use crate::report::{render_table, write_csv};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_TAX_RATE: f64 = 50.0;
const MAX_ANNUAL_RETURN: f64 = 20.0;
const MAX_ANNUAL_INFLATION: f64 = 10.0;
const MAX_YEARS_TO_FUTURE: u32 = 20;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDiscountAnchor {
    FixedYear,
    HoldSaleYear,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiDiscountAnchor {
    #[serde(alias = "fixedYear", alias = "fixed_year", alias = "fixed")]
    FixedYear,
    #[serde(alias = "holdSaleYear", alias = "hold_sale_year", alias = "sale-year")]
    HoldSaleYear,
}

impl From<ApiDiscountAnchor> for CliDiscountAnchor {
    fn from(value: ApiDiscountAnchor) -> Self {
        match value {
            ApiDiscountAnchor::FixedYear => CliDiscountAnchor::FixedYear,
            ApiDiscountAnchor::HoldSaleYear => CliDiscountAnchor::HoldSaleYear,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    purchase_price: Option<f64>,
    current_value: Option<f64>,
    sell_rebuy_year: Option<i32>,
    sell_rebuy_value: Option<f64>,
    tax_rate: Option<f64>,
    annual_return: Option<f64>,
    annual_inflation: Option<f64>,
    years_to_future: Option<u32>,

    start_year: Option<i32>,
    sale_year: Option<i32>,

    inflation_adjusted: Option<bool>,
    include_gross: Option<bool>,
    discount_anchor: Option<ApiDiscountAnchor>,
    anchor_year: Option<i32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "hold_rebuy",
    about = "Compare holding an inherited position against selling and rebuying earlier (German capital gains tax)"
)]
struct Cli {
    #[arg(long, default_value_t = 10_000.0, help = "Original purchase price")]
    purchase_price: f64,
    #[arg(long, default_value_t = 50_000.0, help = "Value at the hold sale year")]
    current_value: f64,
    #[arg(long, default_value_t = 2015, help = "Year of the hypothetical sell & rebuy")]
    sell_rebuy_year: i32,
    #[arg(long, default_value_t = 40_000.0, help = "Value when sold and rebought")]
    sell_rebuy_value: f64,
    #[arg(
        long,
        default_value_t = 26.375,
        help = "Effective tax rate on gains in percent (0-50)"
    )]
    tax_rate: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Annual return after the sale or rebuy in percent (0-20)"
    )]
    annual_return: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Annual inflation rate in percent (0-10)"
    )]
    annual_inflation: f64,
    #[arg(
        long,
        default_value_t = 5,
        help = "Years projected past the hold sale year (0-20)"
    )]
    years_to_future: u32,
    #[arg(long, default_value_t = DEFAULT_START_YEAR, help = "First year of the timeline")]
    start_year: i32,
    #[arg(long, default_value_t = DEFAULT_SALE_YEAR, help = "Year the hold strategy sells")]
    sale_year: i32,
    #[arg(long, help = "Skip the inflation-adjusted series")]
    no_inflation: bool,
    #[arg(long, help = "Skip the pre-tax gross series")]
    no_gross: bool,
    #[arg(
        long,
        value_enum,
        default_value_t = CliDiscountAnchor::FixedYear,
        help = "Reference year for inflation discounting: a fixed calendar year or the hold sale year"
    )]
    discount_anchor: CliDiscountAnchor,
    #[arg(
        long,
        default_value_t = DEFAULT_SALE_YEAR,
        help = "Calendar year used when --discount-anchor=fixed-year"
    )]
    anchor_year: i32,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    #[arg(long, help = "Also write the chart as SVG to this path")]
    chart: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Args(#[from] clap::Error),
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
struct ProjectionRequest {
    inputs: ScenarioInputs,
    options: ProjectionOptions,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: &Cli) -> Result<ProjectionRequest, String> {
    for (name, value) in [
        ("--purchase-price", cli.purchase_price),
        ("--current-value", cli.current_value),
        ("--sell-rebuy-value", cli.sell_rebuy_value),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }

    for (name, year) in [
        ("--start-year", cli.start_year),
        ("--sale-year", cli.sale_year),
        ("--anchor-year", cli.anchor_year),
    ] {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(format!("{name} must be between {MIN_YEAR} and {MAX_YEAR}"));
        }
    }

    if cli.start_year >= cli.sale_year {
        return Err("--start-year must be < --sale-year".to_string());
    }

    if !(cli.start_year..=cli.sale_year).contains(&cli.sell_rebuy_year) {
        return Err(format!(
            "--sell-rebuy-year must be between {} and {}",
            cli.start_year, cli.sale_year
        ));
    }

    for (name, rate, max) in [
        ("--tax-rate", cli.tax_rate, MAX_TAX_RATE),
        ("--annual-return", cli.annual_return, MAX_ANNUAL_RETURN),
        ("--annual-inflation", cli.annual_inflation, MAX_ANNUAL_INFLATION),
    ] {
        if !(0.0..=max).contains(&rate) {
            return Err(format!("{name} must be between 0 and {max}"));
        }
    }

    if cli.years_to_future > MAX_YEARS_TO_FUTURE {
        return Err(format!(
            "--years-to-future must be between 0 and {MAX_YEARS_TO_FUTURE}"
        ));
    }

    let discount_anchor = match cli.discount_anchor {
        CliDiscountAnchor::FixedYear => DiscountAnchor::FixedYear(cli.anchor_year),
        CliDiscountAnchor::HoldSaleYear => DiscountAnchor::HoldSaleYear,
    };

    Ok(ProjectionRequest {
        inputs: ScenarioInputs {
            purchase_price: cli.purchase_price,
            current_value: cli.current_value,
            sell_rebuy_year: cli.sell_rebuy_year,
            sell_rebuy_value: cli.sell_rebuy_value,
            tax_rate: cli.tax_rate / 100.0,
            annual_return: cli.annual_return / 100.0,
            annual_inflation: cli.annual_inflation / 100.0,
            years_to_future: cli.years_to_future,
            start_year: cli.start_year,
            sale_year: cli.sale_year,
        },
        options: ProjectionOptions {
            inflation_adjusted: !cli.no_inflation,
            include_gross: !cli.no_gross,
            discount_anchor,
        },
    })
}

/// Runs the `project` subcommand; `args[0]` is treated as the command name.
pub fn run_cli<I, T>(args: I) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let stdout = io::stdout();
    run_cli_to(args, stdout.lock())
}

fn run_cli_to<I, T, W>(args: I, mut out: W) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
{
    let cli = Cli::try_parse_from(args)?;
    let request = build_request(&cli).map_err(CliError::Input)?;
    log::debug!("projecting {:?} with {:?}", request.inputs, request.options);
    let projection = run_projection(&request.inputs, &request.options)?;

    if let Some(path) = &cli.chart {
        fs::write(path, render_svg(&projection))?;
        log::info!("chart written to {}", path.display());
    }

    match cli.format {
        OutputFormat::Table => out.write_all(render_table(&projection).as_bytes())?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &projection)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_csv(&projection, &mut out)?,
    }
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/chart.svg", get(chart_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("Hold vs. sell & rebuy calculator listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(query: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match query {
        Ok(Query(payload)) => project_handler_impl(payload),
        Err(rejection) => rejected_payload_response(&rejection.body_text()),
    }
}

async fn project_post_handler(json: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match json {
        Ok(Json(payload)) => project_handler_impl(payload),
        Err(rejection) => rejected_payload_response(&rejection.body_text()),
    }
}

async fn chart_handler(query: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    let payload = match query {
        Ok(Query(payload)) => payload,
        Err(rejection) => return rejected_payload_response(&rejection.body_text()),
    };
    match projection_from_payload(payload) {
        Ok(projection) => with_cache_control((
            [(header::CONTENT_TYPE, "image/svg+xml; charset=utf-8")],
            render_svg(&projection),
        )),
        Err((status, msg)) => error_response(status, &msg),
    }
}

fn rejected_payload_response(msg: &str) -> Response {
    log::warn!("rejected projection payload: {msg}");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    match projection_from_payload(payload) {
        Ok(projection) => json_response(StatusCode::OK, projection),
        Err((status, msg)) => error_response(status, &msg),
    }
}

fn projection_from_payload(payload: ProjectPayload) -> Result<Projection, (StatusCode, String)> {
    let request = api_request_from_payload(payload).map_err(|msg| {
        log::warn!("rejected projection request: {msg}");
        (StatusCode::BAD_REQUEST, msg)
    })?;
    log::debug!("projection request {:?}", request.inputs);
    run_projection(&request.inputs, &request.options).map_err(|err| {
        log::warn!("projection failed: {err}");
        (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    })
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ProjectionRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.purchase_price {
        cli.purchase_price = v;
    }
    if let Some(v) = payload.current_value {
        cli.current_value = v;
    }
    if let Some(v) = payload.sell_rebuy_year {
        cli.sell_rebuy_year = v;
    }
    if let Some(v) = payload.sell_rebuy_value {
        cli.sell_rebuy_value = v;
    }
    if let Some(v) = payload.tax_rate {
        cli.tax_rate = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.annual_inflation {
        cli.annual_inflation = v;
    }
    if let Some(v) = payload.years_to_future {
        cli.years_to_future = v;
    }

    if let Some(v) = payload.start_year {
        cli.start_year = v;
    }
    if let Some(v) = payload.sale_year {
        cli.sale_year = v;
    }

    if let Some(v) = payload.inflation_adjusted {
        cli.no_inflation = !v;
    }
    if let Some(v) = payload.include_gross {
        cli.no_gross = !v;
    }
    if let Some(v) = payload.discount_anchor {
        cli.discount_anchor = v.into();
    }
    if let Some(v) = payload.anchor_year {
        cli.anchor_year = v;
    }

    build_request(&cli).map_err(|msg| msg.replace("--", ""))
}

fn default_cli_for_api() -> Cli {
    Cli {
        purchase_price: 10_000.0,
        current_value: 50_000.0,
        sell_rebuy_year: 2015,
        sell_rebuy_value: 40_000.0,
        tax_rate: 26.375,
        annual_return: 5.0,
        annual_inflation: 2.0,
        years_to_future: 5,
        start_year: DEFAULT_START_YEAR,
        sale_year: DEFAULT_SALE_YEAR,
        no_inflation: false,
        no_gross: false,
        discount_anchor: CliDiscountAnchor::FixedYear,
        anchor_year: DEFAULT_SALE_YEAR,
        format: OutputFormat::Table,
        chart: None,
    }
}
