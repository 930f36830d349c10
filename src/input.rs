//! Tabular batch input and task planning.
//!
//! A batch file is a CSV with (at least) a text column and a destination
//! column. Rows become [`TaskUnit`]s numbered from 1 in file order; rows
//! with blank text are accounted for up front as failed [`Outcome`]s so the
//! report covers every row.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{InputError, TaskFailure};
use crate::paths::derive_destination;
use crate::task::{Outcome, TaskUnit};

/// Longest text accepted for a single synthesis, in characters.
pub const MAX_TEXT_CHARS: usize = 5000;

/// One row of a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularRecord {
    pub text: String,
    pub destination_hint: String,
}

/// Runnable tasks plus the rows rejected while planning.
#[derive(Debug, Default)]
pub struct TaskPlan {
    pub tasks: Vec<TaskUnit>,
    pub rejected: Vec<Outcome>,
}

pub fn validate_text(text: &str, max_chars: usize) -> Result<(), InputError> {
    if text.is_empty() {
        return Err(InputError::EmptyText);
    }
    if text.trim().is_empty() {
        return Err(InputError::BlankText);
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(InputError::TextTooLong {
            len,
            max: max_chars,
        });
    }
    Ok(())
}

/// Read up to `max_records` rows from the CSV at `path`.
pub fn read_records(
    path: &Path,
    text_column: &str,
    path_column: &str,
    max_records: Option<usize>,
) -> Result<Vec<TabularRecord>, InputError> {
    if !path.is_file() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    if std::fs::metadata(path)?.len() == 0 {
        return Err(InputError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
            .ok_or_else(|| InputError::MissingColumn(name.to_string()))
    };
    let text_idx = column(text_column)?;
    let path_idx = column(path_column)?;

    let mut records = Vec::new();
    for row in reader.records() {
        if max_records.is_some_and(|max| records.len() >= max) {
            break;
        }
        let row = row?;
        records.push(TabularRecord {
            text: row.get(text_idx).unwrap_or_default().to_string(),
            destination_hint: row.get(path_idx).unwrap_or_default().to_string(),
        });
    }

    log::info!("Read {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Number records from 1, derive destinations, and split off blank rows.
pub fn plan_tasks(records: &[TabularRecord], output_dir: &Path) -> TaskPlan {
    let mut plan = TaskPlan::default();
    for (i, record) in records.iter().enumerate() {
        let ordinal = i + 1;
        let text = record.text.trim();
        let destination = derive_destination(&record.destination_hint, ordinal, output_dir);
        let task = TaskUnit::new(text, destination, ordinal);
        if text.is_empty() {
            plan.rejected
                .push(Outcome::failure(&task, &TaskFailure::EmptyText));
        } else {
            plan.tasks.push(task);
        }
    }
    plan
}

/// Write a starter CSV (UTF-8 with BOM so spreadsheet apps detect the
/// encoding) with the expected columns and a few sample rows.
pub fn write_template(path: &Path, text_column: &str, path_column: &str) -> Result<(), InputError> {
    let mut file = File::create(path)?;
    file.write_all("\u{feff}".as_bytes())?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record([text_column, path_column])?;
    writer.write_record(["这是第一条要转换的文本内容", "output/audio1.mp3"])?;
    writer.write_record(["这是第二条要转换的文本内容", "output/audio2.mp3"])?;
    writer.write_record(["欢迎使用文本转语音工具", "output/audio3.mp3"])?;
    writer.flush()?;
    Ok(())
}
