use serde::{Deserialize, Serialize};

use super::domain::{DriveCriteria, StudentSnapshot};

/// Named predicates a drive imposes on applicants. Surfacing the failed rule
/// names lets students and administrators see why a profile was filtered out
/// instead of receiving an opaque boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityRule {
    MinimumCgpa,
    CurrentBacklogs,
    HistoricalBacklogs,
    Course,
    Department,
    Batch,
    GenderPreference,
}

impl EligibilityRule {
    pub const fn label(self) -> &'static str {
        match self {
            EligibilityRule::MinimumCgpa => "minimum_cgpa",
            EligibilityRule::CurrentBacklogs => "current_backlogs",
            EligibilityRule::HistoricalBacklogs => "historical_backlogs",
            EligibilityRule::Course => "course",
            EligibilityRule::Department => "department",
            EligibilityRule::Batch => "batch",
            EligibilityRule::GenderPreference => "gender_preference",
        }
    }
}

/// Outcome of evaluating one student against one drive's criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub eligible: bool,
    pub failed_rules: Vec<EligibilityRule>,
}

impl EligibilityReport {
    pub fn failed(&self, rule: EligibilityRule) -> bool {
        self.failed_rules.contains(&rule)
    }
}

/// Evaluate every rule independently and collect the failures. Pure and
/// deterministic: no clock, no I/O, no mutation of the snapshot.
pub fn evaluate(student: &StudentSnapshot, criteria: &DriveCriteria) -> EligibilityReport {
    let mut failed_rules = Vec::new();

    if student.cgpa < criteria.minimum_cgpa {
        failed_rules.push(EligibilityRule::MinimumCgpa);
    }

    if student.backlogs.current > criteria.allowed_backlogs.current {
        failed_rules.push(EligibilityRule::CurrentBacklogs);
    }

    if student.backlogs.history > criteria.allowed_backlogs.history {
        failed_rules.push(EligibilityRule::HistoricalBacklogs);
    }

    if !criteria.courses.is_empty() && !criteria.courses.contains(&student.course) {
        failed_rules.push(EligibilityRule::Course);
    }

    if !criteria.departments.is_empty() && !criteria.departments.contains(&student.department) {
        failed_rules.push(EligibilityRule::Department);
    }

    if !criteria.batches.is_empty() && !criteria.batches.contains(&student.batch) {
        failed_rules.push(EligibilityRule::Batch);
    }

    if !criteria.gender_preference.admits(student.gender) {
        failed_rules.push(EligibilityRule::GenderPreference);
    }

    EligibilityReport {
        eligible: failed_rules.is_empty(),
        failed_rules,
    }
}
