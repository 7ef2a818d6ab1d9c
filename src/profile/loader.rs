//! Load profiles (JSON) and earnings histories (CSV)

use super::{EarningsHistory, EarningsMode, PersonProfile};
use crate::error::LoadError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Raw CSV row of an earnings file: `age,earnings`
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    age: u32,
    /// Blank when not provided
    #[serde(default)]
    earnings: Option<String>,
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load a profile from a JSON file
pub fn load_profile<P: AsRef<Path>>(path: P) -> Result<PersonProfile, LoadError> {
    let file = open(path.as_ref())?;
    Ok(serde_json::from_reader(file)?)
}

/// Load an earnings history for `profile` from any reader
///
/// Ages outside the profile's history are ignored; blank earnings cells stay
/// unsupplied. Amount cells may use the same formatting as the reference table.
pub fn load_earnings_from_reader<R: Read>(
    reader: R,
    profile: &PersonProfile,
    mode: EarningsMode,
) -> Result<EarningsHistory, LoadError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut history = EarningsHistory::empty(profile).with_mode(mode);

    for (index, result) in csv_reader.deserialize().enumerate() {
        let row: CsvRow = result?;
        let earnings = match row.earnings.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(cell) => Some(crate::reference::clean_numeric(cell).ok_or_else(|| LoadError::Row {
                row: index + 2,
                reason: format!("unreadable earnings {:?}", cell),
            })?),
        };
        history.set(row.age, earnings);
    }

    Ok(history)
}

/// Load an earnings history for `profile` from a CSV file
pub fn load_earnings<P: AsRef<Path>>(
    path: P,
    profile: &PersonProfile,
    mode: EarningsMode,
) -> Result<EarningsHistory, LoadError> {
    let file = open(path.as_ref())?;
    load_earnings_from_reader(file, profile, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_earnings_from_reader() {
        let profile = PersonProfile {
            birth_month: 5,
            ..Default::default()
        };
        let data = "age,earnings\n17,3690\n18,\n19,\"22 440 $\"\n99,1000\n";
        let history = load_earnings_from_reader(data.as_bytes(), &profile, EarningsMode::Amount).unwrap();

        let entries = history.entries();
        assert_eq!(entries[0].earnings, Some(3690.0));
        assert_eq!(entries[1].earnings, None);
        assert_eq!(entries[2].earnings, Some(22440.0));
        assert!(entries.iter().all(|e| e.age <= 72));
    }

    #[test]
    fn test_unreadable_earnings_is_an_error() {
        let profile = PersonProfile::default();
        let data = "age,earnings\n20,lots\n";
        let err = load_earnings_from_reader(data.as_bytes(), &profile, EarningsMode::Amount).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_load_sample_files() {
        let profile = load_profile("data/sample/profile.json").unwrap();
        assert_eq!(profile.birth_month, 11);
        assert_eq!(profile.benefit_claim_age, 60);

        let history = load_earnings("data/sample/earnings.csv", &profile, EarningsMode::Amount).unwrap();
        assert_eq!(history.len(), 56);
        assert_eq!(history.entries()[0].earnings, Some(50000.0));
        assert_eq!(history.entries()[28].earnings, None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_profile("data/sample/no_such_profile.json").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_profile_json_round_trip() {
        let profile = PersonProfile::default();
        let json = serde_json::to_string(&profile).unwrap();
        let parsed: PersonProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }
}
