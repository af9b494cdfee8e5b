// src/aqr/reader.rs
use crate::aqr::table::Table;
use crate::aqr::workbook::Workbook;
use crate::marketscreener::client::{FileSource, HttpSource, ReaderConfig};
use crate::utils::error::ReaderError;
use std::collections::BTreeMap;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://www.aqr.com";

/// Where the published data-set workbooks live below the base URL.
const DATA_SETS_PATH: &str = "/-/media/AQR/Documents/Insights/Data-Sets";

/// Sheets of the factor files: the headline factor first, then the common series.
const FACTOR_SHEETS: [&str; 6] = ["MKT", "SMB", "HML FF", "HML Devil", "UMD", "RF"];

const QUALITY_DECILES: [&str; 10] = [
    "P1 (low quality)", "P2", "P3", "P4", "P5", "P6", "P7", "P8", "P9", "P10 (high quality)",
];
const QUALITY_DECILES_GLOBAL: [&str; 10] = [
    "P1 (low quality).1", "P2.1", "P3.1", "P4.1", "P5.1", "P6.1", "P7.1", "P8.1", "P9.1", "P10 (high quality).1",
];

const SIZE_QUALITY_US: [&str; 7] = ["Low", "Medium", "Large", "Low.1", "Medium.1", "Large.1", "QMJ Factor"];
const SIZE_QUALITY_GLOBAL: [&str; 7] = ["Low.2", "Medium.2", "Large.2", "Low.3", "Medium.3", "Large.3", "Factor.1"];
const SIZE_QUALITY_NAMES: [&str; 7] = [
    "Small Low", "Small Medium", "Small Large", "Big Low", "Big Medium", "Big Large", "QMJ Factor",
];

/// Date-led column blocks of the ESG frontier sheets: emissions, sin stocks,
/// accruals, overall ESG score.
const ESG_BLOCKS: [&[&str]; 4] = [
    &["Date", "E1 \n(high CO2 emissions)", "E2", "E3", "E4", "E5 \n(low CO2 emissions)", "E5-E1"],
    &["Date.1", "S1\n(sin stocks)", "S2 \n(non-sin stocks)", "S2-S1"],
    &["Date.2", "G1 \n(high accruals)", "G2", "G3", "G4", "G5 \n(low accruals)", "G5-G1"],
    &["Date.3", "ESG1 \n(low ESG)", "ESG2", "ESG3", "ESG4", "ESG5\n(high ESG)", "ESG5-ESG1"],
];

/// Sampling frequency of the files published in both flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
        }
    }
}

impl FromStr for Frequency {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(ReaderError::InvalidArgument(format!(
                "frequency '{}' must be daily or monthly",
                other
            ))),
        }
    }
}

/// Reader for the AQR research data sets.
///
/// Every method downloads one workbook and returns its tables keyed by sheet
/// (or by region, for the files that put several regions on one sheet).
/// Nothing is cached; each call downloads again.
pub struct AqrReader<S: FileSource = HttpSource> {
    source: S,
    config: ReaderConfig,
}

impl AqrReader<HttpSource> {
    pub fn new() -> Result<Self, ReaderError> {
        Self::with_config(ReaderConfig::default().with_base_url(DEFAULT_BASE_URL))
    }

    pub fn with_config(config: ReaderConfig) -> Result<Self, ReaderError> {
        let source = HttpSource::new(&config)?;
        Ok(Self::with_source(source, config))
    }
}

impl<S: FileSource> AqrReader<S> {
    pub fn with_source(source: S, config: ReaderConfig) -> Self {
        Self { source, config }
    }

    fn workbook(&self, file: &str) -> Result<Workbook, ReaderError> {
        let url = self.config.absolute_url(&format!("{}/{}", DATA_SETS_PATH, file));
        let bytes = self.source.download(&url)?;
        Workbook::from_bytes(bytes)
    }

    /// Reads each sheet labelled by its first column.
    fn indexed_sheets(&self, file: &str, sheets: &[&str], skip_rows: usize) -> Result<BTreeMap<String, Table>, ReaderError> {
        let mut workbook = self.workbook(file)?;
        let mut tables = BTreeMap::new();
        for name in sheets {
            let table = workbook.sheet(name, skip_rows)?.indexed()?;
            tracing::debug!("{}: {} rows", name, table.rows.len());
            tables.insert(name.to_string(), table);
        }
        Ok(tables)
    }

    fn factor_sheets(&self, file: &str, headline: &str) -> Result<BTreeMap<String, Table>, ReaderError> {
        let sheets: Vec<&str> = std::iter::once(headline).chain(FACTOR_SHEETS).collect();
        self.indexed_sheets(file, &sheets, 18)
    }

    /// ESG efficient frontier portfolios, value- and equal-weighted. The four
    /// blocks of each sheet are joined on their dates.
    pub fn esg_efficient_frontier_portfolios(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        let mut workbook = self.workbook("ESG_efficient_frontier_portfolios_vF.xlsx")?;
        let mut tables = BTreeMap::new();
        for (name, skip_rows) in [("Value-weighted excess returns", 12), ("Equal-weighted excess returns", 9)] {
            let sheet = workbook.sheet(name, skip_rows)?;
            let blocks = ESG_BLOCKS
                .iter()
                .map(|columns| sheet.block(columns))
                .collect::<Result<Vec<_>, _>>()?;
            tables.insert(name.to_string(), Table::join(blocks));
        }
        Ok(tables)
    }

    /// Betting Against Beta factors with the market, size, value, momentum and risk-free series.
    pub fn bab_factors(&self, frequency: &str) -> Result<BTreeMap<String, Table>, ReaderError> {
        let frequency: Frequency = frequency.parse()?;
        self.factor_sheets(
            &format!("Betting-Against-Beta-Equity-Factors-{}.xlsx", frequency.as_str()),
            "BAB Factors",
        )
    }

    pub fn factor_premia_century(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        self.indexed_sheets("Century-of-Factor-Premia-Monthly.xlsx", &["Century of Factor Premia"], 18)?
            .into_iter()
            .map(|(name, table)| Ok((name, table.with_date_index()?)))
            .collect()
    }

    pub fn commodities_long_run(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        self.indexed_sheets(
            "Commodities-for-the-Long-Run-Index-Level-Data-Monthly.xlsx",
            &["Commodities for the Long Run"],
            10,
        )
    }

    pub fn momentum_indices(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        self.indexed_sheets("AQR-Index-Returns.xls", &["Returns"], 1)
    }

    /// Ten quality-sorted portfolios, as `US` and `Global` tables with the same columns.
    pub fn quality_sorted_portfolios(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        let mut workbook = self.workbook("Quality-Minus-Junk-10-QualitySorted-Portfolios-Monthly.xlsx")?;
        let table = workbook.sheet("10 Portfolios Formed on Quality", 18)?.indexed()?;

        let mut tables = BTreeMap::new();
        tables.insert("US".to_string(), table.select(&QUALITY_DECILES)?);
        tables.insert(
            "Global".to_string(),
            table.select(&QUALITY_DECILES_GLOBAL)?.rename(&QUALITY_DECILES)?,
        );
        Ok(tables)
    }

    /// Quality Minus Junk factors with the market, size, value, momentum and risk-free series.
    pub fn qmj_factors(&self, frequency: &str) -> Result<BTreeMap<String, Table>, ReaderError> {
        let frequency: Frequency = frequency.parse()?;
        self.factor_sheets(
            &format!("Quality-Minus-Junk-Factors-{}.xlsx", frequency.as_str()),
            "QMJ Factors",
        )
    }

    /// Six size x quality portfolios plus the factor, as `US` and `Global` tables.
    pub fn quality_size_sorted_portfolios(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        let mut workbook =
            self.workbook("Quality-Minus-Junk-Six-Portfolios-Formed-on-Size-and-Quality-Monthly.xlsx")?;
        let table = workbook.sheet("Size x Quality (2 x3)", 18)?.indexed()?;

        let mut tables = BTreeMap::new();
        tables.insert("US".to_string(), table.select(&SIZE_QUALITY_US)?.rename(&SIZE_QUALITY_NAMES)?);
        tables.insert(
            "Global".to_string(),
            table.select(&SIZE_QUALITY_GLOBAL)?.rename(&SIZE_QUALITY_NAMES)?,
        );
        Ok(tables)
    }

    pub fn hml_devil_factors(&self, frequency: &str) -> Result<BTreeMap<String, Table>, ReaderError> {
        let frequency: Frequency = frequency.parse()?;
        let sheets = ["HML Devil", "MKT", "SMB", "HML FF", "UMD", "RF"];
        self.indexed_sheets(
            &format!("The-Devil-in-HMLs-Details-Factors-{}.xlsx", frequency.as_str()),
            &sheets,
            18,
        )
    }

    pub fn time_series_momentum(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        self.indexed_sheets("Time-Series-Momentum-Factors-Monthly.xlsx", &["TSMOM Factors"], 17)
    }

    pub fn value_momentum_everywhere_factors(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        self.indexed_sheets("Value-and-Momentum-Everywhere-Factors-Monthly.xlsx", &["VME Factors"], 21)
    }

    pub fn value_momentum_everywhere_portfolios(&self) -> Result<BTreeMap<String, Table>, ReaderError> {
        self.indexed_sheets("Value-and-Momentum-Everywhere-Portfolios-Monthly.xlsx", &["VME Portfolios"], 20)
    }
}
