// src/main.rs
use clap::{Parser, Subcommand, ValueEnum};
use finance_reader::aqr::{self, AqrReader, Table};
use finance_reader::marketscreener::news::date_timestamp;
use finance_reader::marketscreener::{MarketscreenerReader, NewsItem, ReaderConfig};
use finance_reader::storage::StorageManager;
use finance_reader::utils::{logging, AppError, ReaderError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Command Line Interface for the company data readers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Company name, ticker or ISIN to look up (every command except `aqr`)
    #[arg(short, long)]
    identifier: Option<String>,

    /// Site base URL (defaults to FINANCE_READER_BASE_URL, then the public site; for `aqr`, www.aqr.com)
    #[arg(long)]
    base_url: Option<String>,

    /// Output directory; when set every table is also written there as JSON
    #[arg(short, long)]
    output_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Members of the board
    Board,
    /// Executive managers
    Managers,
    /// Main shareholders
    Shareholders,
    /// Sector classification chain
    Sectors,
    /// Sales per region
    Regions,
    /// Sales per business segment
    Segments,
    /// Name, ticker, ISIN and last price
    Header,
    /// Paginated news listing, newest first
    News {
        /// One of: most_relevant, all, analysts, other_languages, press_releases, official_publications, sector
        #[arg(short, long, default_value = "all")]
        category: String,

        /// Oldest date to include, as YYYY-MM-DD or unix seconds (default: today)
        #[arg(long)]
        since: Option<String>,

        /// Report dates as unix timestamps instead of ISO dates
        #[arg(long)]
        timestamps: bool,

        /// Stop after this many items
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Every company-page table
    All,
    /// One of the AQR research data sets
    Aqr {
        #[arg(value_enum)]
        dataset: AqrDataset,

        /// daily or monthly, for the factor files published in both
        #[arg(short, long, default_value = "monthly")]
        frequency: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AqrDataset {
    EsgFrontier,
    BabFactors,
    FactorPremiaCentury,
    CommoditiesLongRun,
    MomentumIndices,
    QualitySorted,
    QmjFactors,
    QualitySizeSorted,
    HmlDevilFactors,
    TimeSeriesMomentum,
    VmeFactors,
    VmePortfolios,
}

impl AqrDataset {
    fn read(self, reader: &AqrReader, frequency: &str) -> Result<BTreeMap<String, Table>, ReaderError> {
        match self {
            AqrDataset::EsgFrontier => reader.esg_efficient_frontier_portfolios(),
            AqrDataset::BabFactors => reader.bab_factors(frequency),
            AqrDataset::FactorPremiaCentury => reader.factor_premia_century(),
            AqrDataset::CommoditiesLongRun => reader.commodities_long_run(),
            AqrDataset::MomentumIndices => reader.momentum_indices(),
            AqrDataset::QualitySorted => reader.quality_sorted_portfolios(),
            AqrDataset::QmjFactors => reader.qmj_factors(frequency),
            AqrDataset::QualitySizeSorted => reader.quality_size_sorted_portfolios(),
            AqrDataset::HmlDevilFactors => reader.hml_devil_factors(frequency),
            AqrDataset::TimeSeriesMomentum => reader.time_series_momentum(),
            AqrDataset::VmeFactors => reader.value_momentum_everywhere_factors(),
            AqrDataset::VmePortfolios => reader.value_momentum_everywhere_portfolios(),
        }
    }

    /// The name given on the command line, e.g. `bab-factors`.
    fn name(self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default()
    }
}

/// Converts a reader result to JSON; a section the entity does not have becomes `null`.
fn to_json<T: Serialize>(name: &str, result: Result<T, ReaderError>) -> Result<serde_json::Value, AppError> {
    match result {
        Ok(value) => Ok(serde_json::to_value(value)?),
        Err(err) if err.is_data_unavailable() => {
            tracing::warn!("No '{}' data: {}", name, err);
            Ok(serde_json::Value::Null)
        }
        Err(err) => Err(err.into()),
    }
}

fn parse_since(since: Option<&str>) -> Result<i64, AppError> {
    let Some(since) = since else {
        return Ok(date_timestamp(chrono::Local::now().date_naive()));
    };
    if let Ok(timestamp) = since.parse::<i64>() {
        return Ok(timestamp);
    }
    chrono::NaiveDate::parse_from_str(since, "%Y-%m-%d")
        .map(date_timestamp)
        .map_err(|e| AppError::Config(format!("invalid --since '{}': {}", since, e)))
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    if let Command::Aqr { dataset, frequency } = &args.command {
        return run_aqr(&args, *dataset, frequency);
    }

    let mut config = ReaderConfig::from_env();
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url.clone());
    }

    // 3. Resolve the entity
    let identifier = args
        .identifier
        .as_deref()
        .ok_or_else(|| AppError::Config("--identifier is required for company commands".to_string()))?;
    let reader = MarketscreenerReader::with_config(identifier, config)?;
    let storage = args.output_dir.as_deref().map(StorageManager::new).transpose()?;

    // 4. Read the requested tables
    let mut tables: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    match &args.command {
        Command::Board => {
            tables.insert("board_members".into(), to_json("board_members", reader.board_members())?);
        }
        Command::Managers => {
            tables.insert("managers".into(), to_json("managers", reader.managers())?);
        }
        Command::Shareholders => {
            tables.insert("shareholders".into(), to_json("shareholders", reader.shareholders())?);
        }
        Command::Sectors => {
            tables.insert("industries".into(), to_json("industries", reader.industry_information())?);
        }
        Command::Regions => {
            tables.insert("regions".into(), to_json("regions", reader.country_information())?);
        }
        Command::Segments => {
            tables.insert("segments".into(), to_json("segments", reader.segment_information())?);
        }
        Command::Header => {
            tables.insert("quote".into(), to_json("quote", reader.quote_header())?);
        }
        Command::News { category, since, timestamps, limit } => {
            let start = parse_since(since.as_deref())?;
            let feed = reader.news(category, start, *timestamps)?;
            let items: Vec<NewsItem> = match limit {
                Some(limit) => feed.take(*limit).collect::<Result<_, _>>()?,
                None => feed.collect::<Result<_, _>>()?,
            };
            tracing::info!("Read {} news items", items.len());
            tables.insert(format!("news_{}", category), serde_json::to_value(items)?);
        }
        Command::All => {
            tables = reader.tables()?;
        }
        Command::Aqr { .. } => return Err(AppError::Config("aqr is not a company command".to_string())),
    }

    // 5. Persist and print
    if let Some(storage) = &storage {
        let mut written = Vec::new();
        for (name, table) in &tables {
            if table.is_null() {
                continue;
            }
            storage.save_table(reader.entity(), name, table)?;
            written.push(name.as_str());
        }
        storage.save_metadata(reader.entity(), &written)?;
    }

    let output = if tables.len() == 1 {
        tables.into_values().next().unwrap_or(serde_json::Value::Null)
    } else {
        serde_json::to_value(tables)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    tracing::info!("Processing finished for {}", reader.entity().name);
    Ok(())
}

/// Downloads one AQR data set, prints it and optionally saves it under `<output_dir>/aqr/`.
fn run_aqr(args: &Args, dataset: AqrDataset, frequency: &str) -> Result<(), AppError> {
    let base_url = args.base_url.clone().unwrap_or_else(|| aqr::reader::DEFAULT_BASE_URL.to_string());
    let reader = AqrReader::with_config(ReaderConfig::default().with_base_url(base_url))?;

    let tables = dataset.read(&reader, frequency)?;
    tracing::info!("Read {} tables for {}", tables.len(), dataset.name());

    if let Some(output_dir) = &args.output_dir {
        StorageManager::new(output_dir)?.save_in("aqr", &dataset.name(), &tables)?;
    }
    println!("{}", serde_json::to_string_pretty(&tables)?);
    Ok(())
}
