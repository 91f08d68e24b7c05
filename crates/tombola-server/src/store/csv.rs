//! File-backed bet store: one CSV line per bet.
//!
//! Record layout: `agency,first_name,last_name,document,birthdate,number`.
//! The file is append-only during a run and scanned whole at draw time.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use tombola_proto::Bet;

use super::{BetStore, StoreError};

/// Per-run CSV file store.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// Store backed by the file at `path`. The file is created on the first
    /// append; a missing file scans as empty.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

/// The record format has no quoting, so separators and line breaks cannot
/// appear inside a field.
fn check_storable(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.contains(',') || value.contains('\n') || value.contains('\r') {
        return Err(StoreError::UnstorableField { field });
    }
    Ok(())
}

fn parse_line(line_number: usize, line: &str) -> Result<Bet, StoreError> {
    let malformed = |reason: String| StoreError::MalformedRecord { line: line_number, reason };

    let fields: Vec<&str> = line.split(',').collect();
    let [agency, first_name, last_name, document, birthdate, number] = fields[..] else {
        return Err(malformed(format!("expected 6 fields, found {}", fields.len())));
    };

    let agency = agency
        .parse::<u32>()
        .map_err(|_| malformed(format!("agency is not a number: {agency:?}")))?;

    Ok(Bet {
        agency,
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        document: document.to_owned(),
        birthdate: birthdate.to_owned(),
        number: number.to_owned(),
    })
}

impl BetStore for CsvStore {
    fn store_bets(&self, bets: &[Bet]) -> Result<(), StoreError> {
        if bets.is_empty() {
            return Ok(());
        }

        // Validate the whole batch before touching the file, so a rejected
        // batch leaves no partial records behind.
        let mut records = String::new();
        for bet in bets {
            check_storable("first_name", &bet.first_name)?;
            check_storable("last_name", &bet.last_name)?;
            check_storable("document", &bet.document)?;
            check_storable("birthdate", &bet.birthdate)?;
            check_storable("number", &bet.number)?;

            records.push_str(&format!(
                "{},{},{},{},{},{}\n",
                bet.agency, bet.first_name, bet.last_name, bet.document, bet.birthdate, bet.number
            ));
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(records.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn load_bets(&self) -> Result<Vec<Bet>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.is_empty())
            .map(|(index, line)| parse_line(index + 1, line))
            .collect()
    }
}
