//! Delimited-text source and export
//!
//! Reads the raw cohort from a headed CSV file and writes the scored cohort
//! back out with every derived column. Columns are matched by header name;
//! absent columns read as missing for every record.

use crate::error::InstabilityError;
use crate::normalizer::coerce_numeric;
use crate::types::{ScoredCohort, Signal, StudentId, StudentRecord};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Column names shared by the source, the export, and the snapshot
pub mod columns {
    pub const STUDENT_ID: &str = "student_id";
    pub const GENDER: &str = "gender";
    pub const HOURS: &str = "hours_studied";
    pub const ATTENDANCE: &str = "attendance_percent";
    pub const ASSIGNMENTS: &str = "assignments_completed";
    pub const TEST_SCORE: &str = "test_score";

    pub const HOURS_NORM: &str = "hours_norm";
    pub const ATTENDANCE_NORM: &str = "attendance_norm";
    pub const ASSIGNMENTS_NORM: &str = "assignments_norm";

    pub const PRESSURE_LOAD: &str = "pressure_cognitive_load";
    pub const PRESSURE_ATTENDANCE: &str = "pressure_attendance";
    pub const PRESSURE_ENGAGEMENT: &str = "pressure_engagement";

    pub const BUFFER: &str = "buffer_strength";
    pub const INSTABILITY: &str = "instability_index";
    pub const ZONE: &str = "early_warning_zone";

    /// Export column order
    pub const EXPORT: [&str; 15] = [
        STUDENT_ID,
        GENDER,
        HOURS,
        ATTENDANCE,
        ASSIGNMENTS,
        TEST_SCORE,
        HOURS_NORM,
        ATTENDANCE_NORM,
        ASSIGNMENTS_NORM,
        PRESSURE_LOAD,
        PRESSURE_ATTENDANCE,
        PRESSURE_ENGAGEMENT,
        BUFFER,
        INSTABILITY,
        ZONE,
    ];
}

/// Load the raw cohort from a CSV file
pub fn load_raw(path: &Path) -> Result<Vec<StudentRecord>, InstabilityError> {
    if !path.exists() {
        return Err(InstabilityError::SourceNotFound(path.to_path_buf()));
    }
    let records = read_records(File::open(path)?)?;
    info!(path = %path.display(), rows = records.len(), "raw cohort loaded");
    Ok(records)
}

/// Parse raw records from any CSV reader with a header row
pub fn read_records<R: Read>(reader: R) -> Result<Vec<StudentRecord>, InstabilityError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);

    let id_col = find(columns::STUDENT_ID);
    let gender_col = find(columns::GENDER);
    let hours_col = find(columns::HOURS);
    let attendance_col = find(columns::ATTENDANCE);
    let assignments_col = find(columns::ASSIGNMENTS);
    let test_col = find(columns::TEST_SCORE);

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let cell = |col: Option<usize>| col.and_then(|i| row.get(i));
        let signal = |col: Option<usize>| cell(col).map_or(Signal::Missing, coerce_numeric);

        records.push(StudentRecord {
            student_id: cell(id_col).and_then(StudentId::parse),
            gender: cell(gender_col)
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(String::from),
            hours_studied: signal(hours_col),
            attendance_percent: signal(attendance_col),
            assignments_completed: signal(assignments_col),
            test_score: signal(test_col),
        });
    }

    Ok(records)
}

/// Export the scored cohort to a CSV file, creating parent directories
pub fn export_csv(cohort: &ScoredCohort, path: &Path) -> Result<(), InstabilityError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_records(cohort, File::create(path)?)?;
    info!(path = %path.display(), rows = cohort.len(), "snapshot exported");
    Ok(())
}

/// Write the scored cohort as CSV, missing values as empty fields
pub fn write_records<W: Write>(cohort: &ScoredCohort, writer: W) -> Result<(), InstabilityError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(columns::EXPORT)?;

    let opt = |s: Signal| s.value().map(|v| v.to_string()).unwrap_or_default();

    for r in cohort.iter() {
        wtr.write_record([
            r.record
                .student_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            r.record.gender.clone().unwrap_or_default(),
            opt(r.record.hours_studied),
            opt(r.record.attendance_percent),
            opt(r.record.assignments_completed),
            opt(r.record.test_score),
            opt(r.scales.hours),
            opt(r.scales.attendance),
            opt(r.scales.assignments),
            r.pressures.cognitive_load.to_string(),
            r.pressures.attendance.to_string(),
            r.pressures.engagement.to_string(),
            r.buffer_strength.to_string(),
            r.instability_index.to_string(),
            r.zone.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::score_cohort;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
student_id,gender,hours_studied,attendance_percent,assignments_completed,test_score
1, Female ,10,90,9,88
2,Male,5,n/a,5,71
3,Other,0,10,1,
";

    #[test]
    fn test_read_records_coerces_and_trims() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].student_id, Some(StudentId::Int(1)));
        assert_eq!(records[0].gender.as_deref(), Some("Female"));
        assert_eq!(records[0].test_score, Signal::Present(88.0));
        assert_eq!(records[1].attendance_percent, Signal::Missing);
        assert_eq!(records[2].test_score, Signal::Missing);
    }

    #[test]
    fn test_absent_columns_read_as_missing() {
        let records = read_records("hours_studied\n3\n4\n".as_bytes()).unwrap();
        assert_eq!(records[0].student_id, None);
        assert_eq!(records[0].gender, None);
        assert_eq!(records[1].hours_studied, Signal::Present(4.0));
        assert_eq!(records[1].attendance_percent, Signal::Missing);
    }

    #[test]
    fn test_blank_gender_survives_export() {
        let raw = "\
student_id,gender,hours_studied,attendance_percent,assignments_completed
1,,4,70,5
2,  ,6,90,8
3,Male,2,60,3
";
        let records = read_records(raw.as_bytes()).unwrap();
        assert_eq!(records[0].gender, None);
        assert_eq!(records[1].gender, None);

        let cohort = score_cohort(&records).unwrap();
        let mut buf = Vec::new();
        write_records(&cohort, &mut buf).unwrap();
        assert_eq!(read_records(buf.as_slice()).unwrap(), records);

        // A source without a gender column reads back the same way
        let no_gender = read_records("hours_studied\n3\n4\n".as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_records(&score_cohort(&no_gender).unwrap(), &mut buf).unwrap();
        assert_eq!(read_records(buf.as_slice()).unwrap(), no_gender);
    }

    #[test]
    fn test_load_raw_missing_file() {
        let err = load_raw(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, InstabilityError::SourceNotFound(_)));
    }

    #[test]
    fn test_export_preserves_derived_columns() {
        let cohort = score_cohort(&read_records(SAMPLE.as_bytes()).unwrap()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("snapshot.csv");
        export_csv(&cohort, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, columns::EXPORT.map(String::from).to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);
        // Missing attendance exports as an empty field
        assert_eq!(&rows[1][3], "");
        assert_eq!(&rows[2][14], cohort.records[2].zone.as_str());

        // Raw columns read back identically
        let reread = read_records(File::open(&path).unwrap()).unwrap();
        assert_eq!(reread, cohort.raw_records());
    }
}
