use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use polars::prelude::{DataFrame, DataType, LazyCsvReader, LazyFileListReader, PlPath, PolarsError};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::domain::{RowId, WardError};
use crate::form::Draft;
use crate::records::Record;

/// Column name holding the row id in seed files.
const ID_COLUMN: &str = "id";

/// All cells of a csv file as strings, keyed by column name.
pub struct StringFrame {
    columns: HashMap<String, Vec<String>>,
    height: usize,
}

impl StringFrame {
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, column: &str, row: usize) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|c| c.get(row))
            .map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }
}

/// Reads a csv file. Each column is converted to strings on its own rayon task.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_csv(path: &Path) -> Result<StringFrame, WardError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => WardError::FileNotFound(path.to_path_buf()),
        _ => WardError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(WardError::InvalidConfig(format!(
            "{} is not a file",
            path.display()
        )));
    }

    let start_time = Instant::now();
    let df = LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()?
        .collect()?;
    let columns: Vec<(String, Vec<String>)> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name.as_str()))
        .collect::<Result<_, PolarsError>>()?;

    info!(
        "Loaded {} rows in {}ms",
        df.height(),
        start_time.elapsed().as_millis()
    );
    Ok(StringFrame {
        columns: columns.into_iter().collect(),
        height: df.height(),
    })
}

fn load_column(df: &DataFrame, name: &str) -> Result<(String, Vec<String>), PolarsError> {
    let col = df.column(name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let data = series
        .into_iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect();
    Ok((name.to_string(), data))
}

/// Seeds a page from `<data_dir>/<T::NAME>.csv`.
///
/// A missing file yields an empty collection. Rows without a usable id are
/// numbered after the largest id in the file. Rows that fail record
/// validation or repeat an id are skipped with a warning.
#[instrument(skip_all, fields(record = T::NAME))]
pub fn load_records<T: Record>(data_dir: &Path) -> Result<Vec<T>, WardError> {
    let path = data_dir.join(format!("{}.csv", T::NAME));
    let frame = match load_csv(&path) {
        Ok(frame) => frame,
        Err(WardError::FileNotFound(path)) => {
            warn!("No seed data at {}, starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let ids: Vec<Option<RowId>> = (0..frame.height())
        .map(|row| {
            frame
                .get(ID_COLUMN, row)
                .and_then(|id| id.trim().parse::<RowId>().ok())
        })
        .collect();
    let mut next_id = ids.iter().flatten().max().map_or(1, |max| max + 1);
    let mut seen = HashSet::with_capacity(ids.len());

    let fields = T::fields();
    let mut records = Vec::with_capacity(frame.height());
    for (row, id) in ids.into_iter().enumerate() {
        let id = id.unwrap_or_else(|| {
            next_id += 1;
            next_id - 1
        });
        if !seen.insert(id) {
            warn!("Skipping row {row} of {}: duplicate id {id}", path.display());
            continue;
        }
        let draft = Draft::from_strings(&fields, |name| frame.get(name, row));
        match T::from_draft(id, &draft) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping row {row} of {}: {e}", path.display()),
        }
    }
    if !frame.has_column(ID_COLUMN) {
        debug!("{} has no id column, numbering rows", path.display());
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::tests::temp_file;
    use crate::records::{Medication, Patient};
    use crate::table::Row;
    use std::path::PathBuf;

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    #[test]
    fn seed_files_load() {
        let patients = load_records::<Patient>(&data_dir()).unwrap();
        assert!(patients.len() > 5);
        assert!(patients.iter().all(|p| !p.name.is_empty()));
        let medications = load_records::<Medication>(&data_dir()).unwrap();
        assert!(medications.iter().all(|m| !m.dosage_times.is_empty()));
    }

    #[test]
    fn cells_map_through_the_schema() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("medications.csv"),
            "id,name,dosage,form,stock,dosage_times,prescription_only,instructions\n\
             4,Aspirin,100mg,tablet,12,morning|night,false,\n\
             9,Broken,1mg,tablet,1,,true,no times\n",
        )
        .unwrap();
        let meds = load_records::<Medication>(dir.path()).unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].id(), 4);
        assert_eq!(meds[0].dosage_times, vec!["morning", "night"]);
        assert_eq!(meds[0].stock, 12);
        assert!(!meds[0].prescription_only);
    }

    #[test]
    fn ids_stay_unique() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("medications.csv"),
            "id,name,dosage,form,stock,dosage_times,prescription_only,instructions\n\
             ,Aspirin,100mg,tablet,12,morning,false,\n\
             1,Ibuprofen,200mg,tablet,30,noon,false,\n\
             1,Copy,200mg,tablet,30,noon,false,\n\
             x,Codeine,30mg,tablet,8,night,true,\n",
        )
        .unwrap();
        let meds = load_records::<Medication>(dir.path()).unwrap();
        let ids: Vec<_> = meds.iter().map(|m| (m.id(), m.name.as_str())).collect();
        assert_eq!(ids, vec![(2, "Aspirin"), (1, "Ibuprofen"), (3, "Codeine")]);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_records::<Patient>(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn frame_holds_string_cells() {
        let file = temp_file(".csv", b"name,dosage\nA,1mg\nB,2mg\n");
        let frame = load_csv(file.path()).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.get("name", 1), Some("B"));
        assert_eq!(frame.get("stock", 0), None);
        assert!(!frame.has_column("id"));
    }
}
