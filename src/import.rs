use std::{collections::HashSet, io::Read};

use csv::{Position, ReaderBuilder, StringRecord, Trim};
use potion::HtmlError;

use crate::{
    constants::{NAME_MAX_LEN, UNIT_MAX_LEN},
    error::ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {source}")]
    Invalid {
        line: u64,
        source: ValidationError,
    },
}

impl From<ImportError> for potion::Error {
    fn from(value: ImportError) -> Self {
        HtmlError::InvalidRequest.new(&value.to_string())
    }
}

fn check(value: &str, field: &'static str, max: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Headerless `name,measurement_unit` rows. Repeated pairs keep their first
/// occurrence.
pub fn parse_ingredients<R: Read>(source: R) -> Result<Vec<IngredientRecord>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_reader(source);

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut row = StringRecord::new();
    while reader.read_record(&mut row)? {
        // physical line where the record starts; quoted fields may span lines
        let line = row.position().map_or(0, Position::line);
        let (name, measurement_unit): (String, String) = row.deserialize(None)?;

        check(&name, "name", NAME_MAX_LEN)
            .and_then(|_| check(&measurement_unit, "measurement_unit", UNIT_MAX_LEN))
            .map_err(|source| ImportError::Invalid { line, source })?;

        let record = IngredientRecord {
            name,
            measurement_unit,
        };
        if seen.insert(record.clone()) {
            records.push(record);
        } else {
            log::trace!("skipping duplicate ingredient on line {line}");
        }
    }

    Ok(records)
}
