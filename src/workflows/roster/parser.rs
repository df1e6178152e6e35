use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::workflows::placement::domain::{
    BacklogRecord, Gender, StudentId, StudentSnapshot,
};

use super::RosterImportError;

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Student ID")]
    student_id: String,
    #[serde(rename = "University")]
    university: String,
    #[serde(rename = "Department")]
    department: String,
    #[serde(rename = "Course")]
    course: String,
    #[serde(rename = "Batch")]
    batch: String,
    #[serde(rename = "CGPA")]
    cgpa: f32,
    #[serde(rename = "Current Backlogs", default)]
    current_backlogs: Option<u8>,
    #[serde(rename = "Backlog History", default)]
    backlog_history: Option<u8>,
    #[serde(rename = "Gender", default, deserialize_with = "empty_string_as_none")]
    gender: Option<String>,
    #[serde(rename = "Verified", default, deserialize_with = "empty_string_as_none")]
    verified: Option<String>,
}

pub(crate) fn parse_roster<R: Read>(reader: R) -> Result<Vec<StudentSnapshot>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut snapshots = Vec::new();

    // Line 1 is the header row.
    for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
        let line = index + 2;
        let row = record?;
        snapshots.push(snapshot_from_row(row, line)?);
    }

    Ok(snapshots)
}

fn snapshot_from_row(row: RosterRow, line: usize) -> Result<StudentSnapshot, RosterImportError> {
    if row.student_id.is_empty() {
        return Err(RosterImportError::InvalidRow {
            line,
            message: "missing student id".to_string(),
        });
    }

    if !(0.0..=10.0).contains(&row.cgpa) {
        return Err(RosterImportError::InvalidRow {
            line,
            message: format!("cgpa {} outside the 0-10 scale", row.cgpa),
        });
    }

    let gender = match row.gender.as_deref() {
        Some(value) => parse_gender(value).ok_or_else(|| RosterImportError::InvalidRow {
            line,
            message: format!("unrecognized gender '{value}'"),
        })?,
        None => Gender::Other,
    };

    Ok(StudentSnapshot {
        student: StudentId(row.student_id),
        university: row.university,
        department: row.department,
        course: row.course,
        batch: row.batch,
        cgpa: row.cgpa,
        backlogs: BacklogRecord {
            current: row.current_backlogs.unwrap_or(0),
            history: row.backlog_history.unwrap_or(0),
        },
        gender,
        verified: row
            .verified
            .map(|value| is_truthy(&value))
            .unwrap_or(false),
    })
}

fn parse_gender(value: &str) -> Option<Gender> {
    match value.trim().to_ascii_lowercase().as_str() {
        "male" | "m" => Some(Gender::Male),
        "female" | "f" => Some(Gender::Female),
        "other" | "non-binary" | "prefer not to say" => Some(Gender::Other),
        _ => None,
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "y" | "true" | "1" | "verified"
    )
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
