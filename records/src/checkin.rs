use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::literal::parse_symbols;
use crate::UserID;

/// One user-day of check-ins.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckinRecord {
    pub user_id: UserID,
    pub user_number: u64,
    pub date: NaiveDate,
    // As written in the source, for metadata and exports
    pub raw_date: String,
    pub day_of_week: String,
    pub visits: Vec<Visit>,
}

/// A single stop during the day. The four parallel columns of the source are zipped into these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Visit {
    pub place: String,
    pub cell: String,
    pub duration: String,
    pub distance: String,
}

/// Reads a tab-delimited check-in table. Needs at least the columns `user_id`, `date`,
/// `dayofweek`, `place`, `token`, `duration_bucket` and `distance_label`; the last four hold
/// sequence literals of equal length.
pub fn load<R: std::io::Read>(reader: R) -> Result<Vec<CheckinRecord>> {
    let mut results = Vec::new();
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(reader);
    for (idx, rec) in csv_reader.deserialize().enumerate() {
        let rec: Row = rec?;
        let record = rec
            .parse()
            .with_context(|| format!("row {} of the check-in table", idx + 1))?;
        results.push(record);
    }
    debug!("Read {} check-in rows", results.len());
    Ok(results)
}

#[derive(Deserialize)]
struct Row {
    user_id: UserID,
    date: String,
    dayofweek: String,
    place: String,
    token: String,
    duration_bucket: String,
    distance_label: String,
}

impl Row {
    fn parse(self) -> Result<CheckinRecord> {
        let user_number = self.user_id.number()?;
        let date = parse_date(&self.date)?;
        let day_of_week = match parse_symbols(&self.dayofweek)?.into_iter().next() {
            Some(x) => x,
            None => bail!("dayofweek {:?} is empty", self.dayofweek),
        };

        let places = parse_symbols(&self.place).context("place")?;
        let cells = parse_symbols(&self.token).context("token")?;
        let durations = parse_symbols(&self.duration_bucket).context("duration_bucket")?;
        let distances = parse_symbols(&self.distance_label).context("distance_label")?;
        if places.len() != cells.len()
            || places.len() != durations.len()
            || places.len() != distances.len()
        {
            bail!(
                "Parallel sequences differ in length: {} places, {} tokens, {} durations, {} distances",
                places.len(),
                cells.len(),
                durations.len(),
                distances.len()
            );
        }

        let visits = places
            .into_iter()
            .zip(cells)
            .zip(durations)
            .zip(distances)
            .map(|(((place, cell), duration), distance)| Visit {
                place,
                cell,
                duration,
                distance,
            })
            .collect();

        Ok(CheckinRecord {
            user_id: self.user_id,
            user_number,
            date,
            raw_date: self.date,
            day_of_week,
            visits,
        })
    }
}

// Dates are usually plain, but tolerate a trailing time of day
fn parse_date(raw: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        Ok(datetime) => Ok(datetime.date()),
        Err(err) => bail!("Can't parse date {:?}: {}", raw, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "user_id\tdate\tdayofweek\tplace\ttoken\tduration_bucket\tdistance_label\textra\n";

    #[test]
    fn test_load() {
        let input = format!(
            "{HEADER}user_35\t2020-03-01\t[4]\t['Workplace', 'Restaurant']\t[88, 90]\t['0-60', '60-120']\t['near', 'far']\tx\n\
             user_2\t2020-03-02 00:00:00\t['day_0']\t[]\t[]\t[]\t[]\ty\n"
        );
        let records = load(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.user_id, UserID("user_35".to_string()));
        assert_eq!(first.user_number, 35);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        assert_eq!(first.day_of_week, "4");
        assert_eq!(
            first.visits[1],
            Visit {
                place: "Restaurant".to_string(),
                cell: "90".to_string(),
                duration: "60-120".to_string(),
                distance: "far".to_string(),
            }
        );

        let second = &records[1];
        assert_eq!(second.raw_date, "2020-03-02 00:00:00");
        assert_eq!(second.day_of_week, "day_0");
        assert!(second.visits.is_empty());
    }

    #[test]
    fn test_unequal_lengths() {
        let input = format!(
            "{HEADER}user_1\t2020-03-01\t[4]\t['Home']\t[1, 2]\t['0-60']\t['near']\tx\n"
        );
        let err = load(input.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("differ in length"));
    }

    #[test]
    fn test_malformed_literal() {
        let input = format!(
            "{HEADER}user_1\t2020-03-01\t[4]\t['Home'\t[1]\t['0-60']\t['near']\tx\n"
        );
        let err = load(input.as_bytes()).unwrap_err();
        assert!(err.root_cause().downcast_ref::<crate::LiteralError>().is_some());
    }

    #[test]
    fn test_bad_date() {
        let input = format!("{HEADER}user_1\t03/01/2020\t[4]\t[]\t[]\t[]\t[]\tx\n");
        assert!(load(input.as_bytes()).is_err());
    }
}
