use csv::{ReaderBuilder, Terminator, WriterBuilder};
use std::fs::File;
use std::path::Path;

use crate::error::{Result, ReuseError};

/// Header written to generated tables; also the preferred input column.
pub const JOB_COLUMN: &str = "input_folder_name";
const JOB_COLUMN_ALIASES: [&str; 2] = [JOB_COLUMN, "folder"];
/// First cells that mark a header row in a loosely formatted job list.
const HEADER_LIKE: [&str; 3] = [JOB_COLUMN, "job_name", "name"];

fn table_error(path: &Path, message: impl ToString) -> ReuseError {
    ReuseError::BatchTable {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Job identifiers from a batch table, in row order. The table needs an
/// `input_folder_name` (or `folder`) header column.
pub fn read_batch_table(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| table_error(path, e))?;
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers().map_err(|e| table_error(path, e))?;
    let column = headers
        .iter()
        .position(|h| JOB_COLUMN_ALIASES.contains(&h.trim()))
        .ok_or_else(|| {
            table_error(
                path,
                format!("no '{JOB_COLUMN}' or 'folder' column in header {headers:?}"),
            )
        })?;

    let mut jobs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| table_error(path, e))?;
        if let Some(job) = record.get(column).map(str::trim).filter(|j| !j.is_empty()) {
            jobs.push(job.to_string());
        }
    }
    Ok(jobs)
}

/// True for first cells that label a column rather than name a job.
pub fn is_header_like(cell: &str) -> bool {
    HEADER_LIKE.contains(&cell.trim().to_ascii_lowercase().as_str())
}

/// First cell of every non-blank row of a headed CSV or a plain
/// one-name-per-line list. Header-like rows are returned as well so the
/// caller can report them; see [`is_header_like`].
pub fn read_job_list(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| table_error(path, e))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut jobs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| table_error(path, e))?;
        if let Some(job) = record.get(0).map(str::trim).filter(|j| !j.is_empty()) {
            jobs.push(job.to_string());
        }
    }
    Ok(jobs)
}

/// Writes a one-column job table with LF line endings.
pub fn write_job_table(path: &Path, jobs: &[String]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)
        .map_err(|e| table_error(path, e))?;
    writer
        .write_record([JOB_COLUMN])
        .map_err(|e| table_error(path, e))?;
    for job in jobs {
        writer
            .write_record([job.as_str()])
            .map_err(|e| table_error(path, e))?;
    }
    writer.flush().map_err(|e| ReuseError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_either_header_name() {
        let td = tempdir().unwrap();
        let a = td.path().join("a.csv");
        fs::write(&a, "input_folder_name,extra\nA-B,1\n\nC-D_K4,2\n").unwrap();
        assert_eq!(read_batch_table(&a).unwrap(), vec!["A-B", "C-D_K4"]);

        let b = td.path().join("b.csv");
        fs::write(&b, "id,folder\r\n1,E-F\r\n").unwrap();
        assert_eq!(read_batch_table(&b).unwrap(), vec!["E-F"]);
    }

    #[test]
    fn missing_file_or_header_is_fatal() {
        let td = tempdir().unwrap();
        assert!(matches!(
            read_batch_table(&td.path().join("none.csv")),
            Err(ReuseError::BatchTable { .. })
        ));
        let bad = td.path().join("bad.csv");
        fs::write(&bad, "job\nA-B\n").unwrap();
        assert!(matches!(
            read_batch_table(&bad),
            Err(ReuseError::BatchTable { .. })
        ));
    }

    #[test]
    fn lenient_list_reads_first_cells_and_flags_headers() {
        let td = tempdir().unwrap();
        let list = td.path().join("list.csv");
        fs::write(&list, "job_name\nNSD2i-H3_K36\n\n Name \nNSD2i-H4,extra\n").unwrap();
        let jobs = read_job_list(&list).unwrap();
        assert_eq!(jobs, vec!["job_name", "NSD2i-H3_K36", "Name", "NSD2i-H4"]);
        let headers: Vec<bool> = jobs.iter().map(|j| is_header_like(j)).collect();
        assert_eq!(headers, vec![true, false, true, false]);
        assert!(is_header_like("INPUT_FOLDER_NAME"));
    }

    #[test]
    fn written_tables_use_lf_and_read_back() {
        let td = tempdir().unwrap();
        let out = td.path().join("gen.csv");
        write_job_table(&out, &["A-B".to_string(), "C-D".to_string()]).unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "input_folder_name\nA-B\nC-D\n"
        );
        assert_eq!(read_batch_table(&out).unwrap(), vec!["A-B", "C-D"]);
    }
}
