//! Tabular Data Loader Module
//! Loads delimited text with Polars and spreadsheets with calamine into a `DataFrame`.

use crate::error::{AtlasError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Tabular file formats accepted by the loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
    Xls,
}

impl TableFormat {
    /// Pick the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("xlsx") => Ok(TableFormat::Xlsx),
            Some("xls") => Ok(TableFormat::Xls),
            _ => Err(AtlasError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Load a table, dispatching on the file extension.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    let format = TableFormat::from_path(path)?;
    if !path.is_file() {
        return Err(AtlasError::load(path, "file not found"));
    }

    let df = match format {
        TableFormat::Csv => read_csv(path)?,
        TableFormat::Xlsx | TableFormat::Xls => read_spreadsheet(path)?,
    };

    info!(
        path = %path.display(),
        ?format,
        rows = df.height(),
        columns = df.width(),
        "loaded table"
    );
    Ok(df)
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    // Use lazy evaluation for memory efficiency, then collect
    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .with_ignore_errors(true)
        .finish()
        .and_then(|lazy| lazy.collect())
        .map_err(|e| AtlasError::load(path, e))
}

/// Read the first worksheet. The first row is the header.
fn read_spreadsheet(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| AtlasError::load(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AtlasError::load(path, "workbook has no worksheets"))?
        .map_err(|e| AtlasError::load(path, e))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let names = header_names(header);
    let body: Vec<&[Data]> = rows.collect();

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            sheet_column(&name, &cells)
        })
        .collect();

    DataFrame::new(columns).map_err(|e| AtlasError::load(path, e))
}

/// Header cells as column names; blanks get `Unnamed: i`, repeats get `.1`, `.2`, ...
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell {
                Data::Empty => format!("Unnamed: {idx}"),
                other => other.to_string().trim().to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

/// Build a typed column: integers when every number is integral, floats when numeric,
/// strings otherwise.
fn sheet_column(name: &str, cells: &[&Data]) -> Column {
    let mut numeric = true;
    let mut integral = true;
    for cell in cells {
        match cell {
            Data::Empty => {}
            Data::Int(_) => {}
            Data::Float(f) => {
                if f.fract() != 0.0 || !f.is_finite() {
                    integral = false;
                }
            }
            _ => {
                numeric = false;
                break;
            }
        }
    }

    if numeric && integral {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Int(i) => Some(*i),
                Data::Float(f) => Some(*f as i64),
                _ => None,
            })
            .collect();
        Column::new(name.into(), values)
    } else if numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Int(i) => Some(*i as f64),
                Data::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        Column::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Empty => None,
                other => Some(other.to_string()),
            })
            .collect();
        Column::new(name.into(), values)
    }
}

/// Fail with a load error unless `name` is a column of `df`.
pub fn require_column(df: &DataFrame, name: &str, origin: &Path) -> Result<()> {
    if df.get_column_names().iter().any(|c| c.as_str() == name) {
        Ok(())
    } else {
        Err(AtlasError::load(origin, format!("missing column `{name}`")))
    }
}

/// Column values as integers.
///
/// Cells that are not a whole number (text, `13110.5`, NaN) become `None` rather
/// than being truncated onto a neighbouring code.
pub fn int_values(column: &Column) -> Result<Vec<Option<i64>>> {
    if column.dtype().is_integer() {
        let cast = column.cast(&DataType::Int64)?;
        return Ok(cast.i64()?.into_iter().collect());
    }
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| {
            v.filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        })
        .collect())
}

/// Column values as floats; missing cells become NaN.
pub fn float_values(column: &Column) -> Result<Vec<f64>> {
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Column values as trimmed strings.
pub fn string_values(column: &Column) -> Result<Vec<Option<String>>> {
    let cast = column.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn format_is_sniffed_from_extension() {
        assert_eq!(
            TableFormat::from_path(Path::new("a/score.csv")).unwrap(),
            TableFormat::Csv
        );
        assert_eq!(
            TableFormat::from_path(Path::new("score.XLSX")).unwrap(),
            TableFormat::Xlsx
        );
        assert_eq!(
            TableFormat::from_path(Path::new("./data/cut.xls")).unwrap(),
            TableFormat::Xls
        );
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        for name in ["score.parquet", "score", "csv.txt"] {
            let err = TableFormat::from_path(&PathBuf::from(name)).unwrap_err();
            assert!(matches!(err, AtlasError::UnsupportedFormat(_)), "{name}");
        }
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        let err = load_table(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, AtlasError::DataLoad { .. }));
    }

    #[test]
    fn csv_columns_extract_as_typed_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("score.csv");
        fs::write(
            &path,
            "Cod_comuna,Ranking1,Nombre\n13110,0.8, La Cisterna\n13101,,Santiago\n",
        )
        .unwrap();

        let df = load_table(&path).unwrap();
        assert_eq!(df.height(), 2);

        let codes = int_values(df.column("Cod_comuna").unwrap()).unwrap();
        assert_eq!(codes, vec![Some(13110), Some(13101)]);

        let scores = float_values(df.column("Ranking1").unwrap()).unwrap();
        assert_eq!(scores[0], 0.8);
        assert!(scores[1].is_nan());

        let names = string_values(df.column("Nombre").unwrap()).unwrap();
        assert_eq!(names[0].as_deref(), Some("La Cisterna"));

        assert!(require_column(&df, "Ranking1", &path).is_ok());
        assert!(require_column(&df, "Ranking2", &path).is_err());
    }

    #[test]
    fn fractional_codes_are_not_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("score.csv");
        fs::write(&path, "Cod_comuna\n13110.5\n13101.0\nabc\n").unwrap();

        let df = load_table(&path).unwrap();
        let codes = int_values(df.column("Cod_comuna").unwrap()).unwrap();
        assert_eq!(codes, vec![None, Some(13101), None]);
    }

    #[test]
    fn spreadsheet_columns_are_typed_by_content() {
        let ints = [Data::Float(13.0), Data::Int(5), Data::Empty];
        let cells: Vec<&Data> = ints.iter().collect();
        assert_eq!(sheet_column("code", &cells).dtype(), &DataType::Int64);

        let floats = [Data::Float(0.5), Data::Int(2)];
        let cells: Vec<&Data> = floats.iter().collect();
        assert_eq!(sheet_column("score", &cells).dtype(), &DataType::Float64);

        let text = [Data::Int(1), Data::String("Arica".into())];
        let cells: Vec<&Data> = text.iter().collect();
        assert_eq!(sheet_column("name", &cells).dtype(), &DataType::String);
    }

    #[test]
    fn header_names_are_unique() {
        let header = [
            Data::String("Código Región".into()),
            Data::Empty,
            Data::String("Código Región".into()),
        ];
        assert_eq!(
            header_names(&header),
            vec!["Código Región", "Unnamed: 1", "Código Región.1"]
        );
    }
}
