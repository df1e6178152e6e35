//! CSV import of university student rosters into eligibility snapshots.

mod parser;

use std::io::Read;
use std::path::Path;

use crate::workflows::placement::domain::StudentSnapshot;

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, message: String },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster file: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::InvalidRow { line, message } => {
                write!(f, "roster row at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<StudentSnapshot>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<StudentSnapshot>, RosterImportError> {
        parser::parse_roster(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::placement::domain::Gender;
    use std::io::Cursor;

    const HEADER: &str =
        "Student ID,University,Department,Course,Batch,CGPA,Current Backlogs,Backlog History,Gender,Verified\n";

    #[test]
    fn parses_complete_rows() {
        let csv = format!(
            "{HEADER}stu-001,Metro State,Computer Science,B.Tech,2026,8.4,0,1,female,yes\n"
        );
        let roster = RosterImporter::from_reader(Cursor::new(csv)).expect("roster parses");

        assert_eq!(roster.len(), 1);
        let snapshot = &roster[0];
        assert_eq!(snapshot.student.0, "stu-001");
        assert_eq!(snapshot.gender, Gender::Female);
        assert_eq!(snapshot.backlogs.current, 0);
        assert_eq!(snapshot.backlogs.history, 1);
        assert!(snapshot.verified);
    }

    #[test]
    fn blank_optional_columns_fall_back_to_defaults() {
        let csv = format!("{HEADER}stu-002,Metro State,Physics,B.Sc,2025,7.1,,,,\n");
        let roster = RosterImporter::from_reader(Cursor::new(csv)).expect("roster parses");

        let snapshot = &roster[0];
        assert_eq!(snapshot.backlogs.current, 0);
        assert_eq!(snapshot.backlogs.history, 0);
        assert_eq!(snapshot.gender, Gender::Other);
        assert!(!snapshot.verified);
    }

    #[test]
    fn rejects_out_of_scale_cgpa_with_line_number() {
        let csv = format!(
            "{HEADER}stu-003,Metro State,Physics,B.Sc,2025,11.2,0,0,male,yes\n"
        );
        match RosterImporter::from_reader(Cursor::new(csv)) {
            Err(RosterImportError::InvalidRow { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("cgpa"));
            }
            other => panic!("expected invalid row error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_gender_values() {
        let csv = format!(
            "{HEADER}stu-004,Metro State,Physics,B.Sc,2025,6.8,0,0,unknown,no\n"
        );
        match RosterImporter::from_reader(Cursor::new(csv)) {
            Err(RosterImportError::InvalidRow { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected invalid row error, got {other:?}"),
        }
    }
}
