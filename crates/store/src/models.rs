use browscap_parse::Properties;
use exn::ResultExt;
use time::UtcDateTime;

use crate::error::{Error, ErrorKind};

/// A resolved pattern as persisted: the `LIKE` pattern and every property it
/// resolved to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub pattern: String,
    pub properties: Properties,
}
impl Record {
    pub fn new(pattern: impl Into<String>, properties: Properties) -> Self {
        Self { pattern: pattern.into(), properties }
    }
}

/// Identifies the imported data set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Marker {
    /// Version token reported by the data source.
    pub version: String,
    pub imported_at: UtcDateTime,
}
impl Marker {
    pub fn new(version: impl Into<String>, imported_at: UtcDateTime) -> Self {
        Self { version: version.into(), imported_at }
    }
}

/// A cached classification and when it was written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CacheEntry {
    pub properties: Properties,
    pub created: UtcDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct RecordRow {
    pub(crate) pattern: String,
    pub(crate) data: String,
}
impl TryFrom<&Record> for RecordRow {
    type Error = Error;
    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            pattern: record.pattern.clone(),
            data: serde_json::to_string(&record.properties).or_raise(|| ErrorKind::InvalidData("properties"))?,
        })
    }
}
impl TryFrom<RecordRow> for Record {
    type Error = Error;
    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            pattern: row.pattern,
            properties: serde_json::from_str(&row.data).or_raise(|| ErrorKind::InvalidData("properties"))?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct MarkerRow {
    pub(crate) version: String,
    pub(crate) imported_at: i64,
}
impl From<&Marker> for MarkerRow {
    fn from(marker: &Marker) -> Self {
        Self {
            version: marker.version.clone(),
            imported_at: marker.imported_at.unix_timestamp(),
        }
    }
}
impl TryFrom<MarkerRow> for Marker {
    type Error = Error;
    fn try_from(row: MarkerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            version: row.version,
            imported_at: UtcDateTime::from_unix_timestamp(row.imported_at)
                .or_raise(|| ErrorKind::InvalidData("import date"))?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CacheRow {
    pub(crate) data: String,
    pub(crate) created_at: i64,
}
impl TryFrom<CacheRow> for CacheEntry {
    type Error = Error;
    fn try_from(row: CacheRow) -> Result<Self, Self::Error> {
        Ok(Self {
            properties: serde_json::from_str(&row.data).or_raise(|| ErrorKind::InvalidData("cached properties"))?,
            created: UtcDateTime::from_unix_timestamp(row.created_at)
                .or_raise(|| ErrorKind::InvalidData("cache date"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_to_row_and_back() {
        let properties = Properties::from([
            ("browser".to_string(), "IE".to_string()),
            ("version".to_string(), "9.0".to_string()),
        ]);
        let record = Record::new("Mozilla%Trident/5.0%", properties);
        let row = RecordRow::try_from(&record).unwrap();
        assert_eq!(row.data, r#"{"browser":"IE","version":"9.0"}"#);
        assert_eq!(Record::try_from(row).unwrap(), record);
    }

    #[test]
    fn test_corrupt_row_is_invalid_data() {
        let row = RecordRow {
            pattern: "%".to_string(),
            data: "not json".to_string(),
        };
        let error = Record::try_from(row).unwrap_err();
        assert!(matches!(&*error, ErrorKind::InvalidData("properties")));
    }

    #[test]
    fn test_marker_row_keeps_seconds() {
        let marker = Marker::new("6000013", UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let row = MarkerRow::from(&marker);
        assert_eq!(row.imported_at, 1_700_000_000);
        assert_eq!(Marker::try_from(row).unwrap(), marker);
    }
}
