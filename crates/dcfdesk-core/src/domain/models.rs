use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::timestamp::iso_date;
use crate::ValidationError;

/// One reported free-cash-flow figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub amount: f64,
}

impl CashFlowPoint {
    pub fn new(date: Date, amount: f64) -> Result<Self, ValidationError> {
        validate_finite("amount", amount)?;
        Ok(Self { date, amount })
    }
}

/// Historical free cash flow, chronologically ascending.
///
/// The last point is the most recent actual observation and seeds every
/// projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CashFlowPoint>", into = "Vec<CashFlowPoint>")]
pub struct CashFlowSeries {
    points: Vec<CashFlowPoint>,
}

impl CashFlowSeries {
    /// Validates amounts and sorts by date ascending.
    pub fn new(mut points: Vec<CashFlowPoint>) -> Result<Self, ValidationError> {
        for point in &points {
            validate_finite("amount", point.amount)?;
        }
        points.sort_by_key(|point| point.date);
        Ok(Self { points })
    }

    pub fn points(&self) -> &[CashFlowPoint] {
        &self.points
    }

    pub fn amounts(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|point| point.amount)
    }

    pub fn last(&self) -> Option<&CashFlowPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<Vec<CashFlowPoint>> for CashFlowSeries {
    type Error = ValidationError;

    fn try_from(points: Vec<CashFlowPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<CashFlowSeries> for Vec<CashFlowPoint> {
    fn from(series: CashFlowSeries) -> Self {
        series.points
    }
}

/// Daily close with the dividend paid on that day (zero when none).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub close: f64,
    pub dividend: f64,
}

impl PricePoint {
    pub fn new(date: Date, close: f64, dividend: f64) -> Result<Self, ValidationError> {
        validate_non_negative("close", close)?;
        validate_non_negative("dividend", dividend)?;
        Ok(Self {
            date,
            close,
            dividend,
        })
    }
}

/// Price and dividend history, chronologically ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    points: Vec<PricePoint>,
}

impl PriceHistory {
    pub fn new(mut points: Vec<PricePoint>) -> Result<Self, ValidationError> {
        for point in &points {
            validate_non_negative("close", point.close)?;
            validate_non_negative("dividend", point.dividend)?;
        }
        points.sort_by_key(|point| point.date);
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Financial-statement figures for the most recent reporting period.
///
/// Fields are `None` when the provider has no line for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    #[serde(default, with = "optional_iso_date")]
    pub as_of: Option<Date>,
    pub ebitda: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub cash: Option<f64>,
}

impl FinancialSnapshot {
    pub fn new(
        as_of: Option<Date>,
        ebitda: Option<f64>,
        long_term_debt: Option<f64>,
        cash: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_optional_finite("ebitda", ebitda)?;
        validate_optional_finite("long_term_debt", long_term_debt)?;
        validate_optional_finite("cash", cash)?;

        Ok(Self {
            as_of,
            ebitda,
            long_term_debt,
            cash,
        })
    }
}

/// Lookback window for price history requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[default]
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "max")]
    Max,
}

impl HistoryRange {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::TenYears => "10y",
            Self::Max => "max",
        }
    }
}

impl Display for HistoryRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            "10y" => Ok(Self::TenYears),
            "max" => Ok(Self::Max),
            _ => Err(ValidationError::InvalidRange {
                value: value.to_owned(),
            }),
        }
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_finite(field, value)?;
    }
    Ok(())
}

mod optional_iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => super::iso_date::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|value| crate::domain::parse_date(&value).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn series_sorts_ascending_and_exposes_latest() {
        let series = CashFlowSeries::new(vec![
            CashFlowPoint::new(date!(2023 - 12 - 31), 121.0).unwrap(),
            CashFlowPoint::new(date!(2021 - 12 - 31), 100.0).unwrap(),
            CashFlowPoint::new(date!(2022 - 12 - 31), 110.0).unwrap(),
        ])
        .expect("valid series");

        assert_eq!(series.amounts().collect::<Vec<_>>(), vec![100.0, 110.0, 121.0]);
        assert_eq!(series.last().map(|p| p.amount), Some(121.0));
    }

    #[test]
    fn rejects_non_finite_cash_flow() {
        let err = CashFlowPoint::new(date!(2023 - 12 - 31), f64::NAN).expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { field: "amount" }));
    }

    #[test]
    fn rejects_negative_close() {
        let err = PricePoint::new(date!(2024 - 01 - 02), -1.0, 0.0).expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { field: "close" }));
    }

    #[test]
    fn series_serializes_as_plain_records() {
        let series =
            CashFlowSeries::new(vec![CashFlowPoint::new(date!(2023 - 09 - 30), 5.0).unwrap()])
                .unwrap();
        let json = serde_json::to_value(&series).expect("serializes");
        assert_eq!(json, serde_json::json!([{ "date": "2023-09-30", "amount": 5.0 }]));

        let back: CashFlowSeries = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, series);
    }

    #[test]
    fn history_range_round_trips_through_str() {
        assert_eq!("5Y".parse::<HistoryRange>(), Ok(HistoryRange::FiveYears));
        assert_eq!(HistoryRange::default().as_str(), "5y");
        assert!("3w".parse::<HistoryRange>().is_err());
    }
}
