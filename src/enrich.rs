//! Feature enrichment: calendar attributes and output column names

use crate::calendar::{parse_day, CalendarNames, DateFeatures, Portuguese};
use crate::error::{EtlError, Result};
use crate::frame::string_values;
use crate::schema::{
    normalize_columns, DATE, DROPPED_COLUMNS, MONTH, MONTH_LOCALIZED, MONTH_NUMBER, SEASON,
    WEEKDAY, WEEKDAY_LOCALIZED, WEEKDAY_NUMBER, YEAR,
};
use chrono::NaiveDate;
use polars::prelude::*;

/// Remove the unused source columns in place; absent columns are skipped
pub fn drop_unused_columns(df: &mut DataFrame) -> Result<()> {
    for column in DROPPED_COLUMNS {
        if df.column(column).is_ok() {
            df.drop_in_place(column)?;
            log::debug!("Dropped column {}", column);
        } else {
            log::debug!("Column {} already absent", column);
        }
    }
    Ok(())
}

fn parse_date(value: Option<&str>, row: usize) -> Result<NaiveDate> {
    let value = value.ok_or_else(|| EtlError::InvalidDate(format!("missing date at row {}", row)))?;
    parse_day(value)
        .map_err(|e| EtlError::InvalidDate(format!("'{}' at row {}: {}", value, row, e)))
}

/// Append the calendar columns derived from the date column
pub fn add_date_features(df: &mut DataFrame, names: &dyn CalendarNames) -> Result<()> {
    let dates = string_values(df, DATE)?;

    let mut features = Vec::with_capacity(dates.len());
    for (row, value) in dates.iter().enumerate() {
        let date = parse_date(value.as_deref(), row)?;
        features.push(DateFeatures::from_date(date, names)?);
    }

    let year: Vec<i32> = features.iter().map(|f| f.year).collect();
    let month: Vec<&str> = features.iter().map(|f| f.month.as_str()).collect();
    let month_number: Vec<i32> = features.iter().map(|f| f.month_number as i32).collect();
    let month_localized: Vec<&str> = features.iter().map(|f| f.month_localized).collect();
    let weekday: Vec<&str> = features.iter().map(|f| f.weekday.as_str()).collect();
    let weekday_localized: Vec<&str> = features.iter().map(|f| f.weekday_localized).collect();
    let weekday_number: Vec<i32> = features.iter().map(|f| f.weekday_number as i32).collect();
    let season: Vec<&str> = features.iter().map(|f| f.season).collect();

    df.with_column(Series::new(YEAR, year))?;
    df.with_column(Series::new(MONTH, month))?;
    df.with_column(Series::new(MONTH_NUMBER, month_number))?;
    df.with_column(Series::new(MONTH_LOCALIZED, month_localized))?;
    df.with_column(Series::new(WEEKDAY, weekday))?;
    df.with_column(Series::new(WEEKDAY_LOCALIZED, weekday_localized))?;
    df.with_column(Series::new(WEEKDAY_NUMBER, weekday_number))?;
    df.with_column(Series::new(SEASON, season))?;

    Ok(())
}

/// Drop unused columns, add date features and normalize the column names
pub fn enrich(df: &mut DataFrame) -> Result<()> {
    enrich_with(df, &Portuguese)
}

pub fn enrich_with(df: &mut DataFrame, names: &dyn CalendarNames) -> Result<()> {
    drop_unused_columns(df)?;
    log::info!("Adding date features to {} rows", df.height());
    add_date_features(df, names)?;
    normalize_columns(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Season;
    use crate::frame::i64_values;
    use crate::schema::{IN_TREATMENT_NEW, NEW_CASES, RECOVERED_NEW};

    fn cleaned_frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new(DATE, &["2020-12-21", "2021-06-20"]),
            Series::new(NEW_CASES, &[4i64, 5]),
            Series::new(RECOVERED_NEW, &[Some(1i64), None]),
            Series::new(IN_TREATMENT_NEW, &[Some(2i64), None]),
            Series::new("codRegiaoSaude", &[35001i64, 35001]),
        ])
        .unwrap()
    }

    /// Names that only know about December
    struct DecemberOnly;

    impl CalendarNames for DecemberOnly {
        fn month(&self, english: &str) -> Result<&'static str> {
            match english {
                "December" => Ok("Dezembro"),
                other => Err(EtlError::UnknownCalendarKey {
                    kind: "month",
                    key: other.to_string(),
                }),
            }
        }

        fn weekday(&self, english: &str) -> Result<&'static str> {
            Portuguese.weekday(english)
        }

        fn season(&self, season: Season) -> &'static str {
            Portuguese.season(season)
        }
    }

    #[test]
    fn test_enrich_adds_features_and_normalizes() {
        let mut df = cleaned_frame();
        enrich(&mut df).unwrap();

        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "data",
                "casos_novos",
                "cod_regiao_saude",
                "ano",
                "mes",
                "mes_numerico",
                "mes_traduzido",
                "dia_semana",
                "dia_semana_traduzido",
                "dia_semana_numerico",
                "estacao",
            ]
        );

        assert_eq!(
            string_values(&df, SEASON).unwrap(),
            vec![Some("Verão".to_string()), Some("Outono".to_string())]
        );
        assert_eq!(
            string_values(&df, MONTH_LOCALIZED).unwrap(),
            vec![Some("Dezembro".to_string()), Some("Junho".to_string())]
        );
        // 2020-12-21 was a Monday, 2021-06-20 a Sunday
        assert_eq!(i64_values(&df, WEEKDAY_NUMBER).unwrap(), vec![Some(0), Some(6)]);
        assert_eq!(
            string_values(&df, WEEKDAY_LOCALIZED).unwrap(),
            vec![Some("Segunda-feira".to_string()), Some("Domingo".to_string())]
        );
        assert_eq!(i64_values(&df, YEAR).unwrap(), vec![Some(2020), Some(2021)]);
    }

    #[test]
    fn test_drop_unused_columns_in_place_twice() {
        let mut df = cleaned_frame();
        drop_unused_columns(&mut df).unwrap();
        assert!(df.column(RECOVERED_NEW).is_err());
        assert!(df.column(IN_TREATMENT_NEW).is_err());
        assert_eq!(df.width(), 3);

        drop_unused_columns(&mut df).unwrap();
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_unmapped_month_is_fatal() {
        let mut df = cleaned_frame();
        match enrich_with(&mut df, &DecemberOnly) {
            Err(EtlError::UnknownCalendarKey { kind, key }) => {
                assert_eq!(kind, "month");
                assert_eq!(key, "June");
            }
            other => panic!("Expected UnknownCalendarKey, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_is_fatal() {
        let mut df = DataFrame::new(vec![Series::new(DATE, &[Some("2020-02-30"), None])]).unwrap();
        assert!(matches!(enrich(&mut df), Err(EtlError::InvalidDate(_))));
    }
}
