//! Doctor directory: joins the patient's doctor assignments with the doctor
//! roster into display rows, then filters them.
//!
//! The roster endpoint does not return identifiers, so the join cannot
//! always be made safely. [`JoinStrategy::Strict`] refuses to guess;
//! [`JoinStrategy::FirstEntry`] pairs every assignment with the first roster
//! doctor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{PortalError, PortalResult};
use crate::models::{Doctor, DoctorAssignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    FirstEntry,
    #[default]
    Strict,
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinStrategy::FirstEntry => write!(f, "first_entry"),
            JoinStrategy::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for JoinStrategy {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "first_entry" | "first" => Ok(JoinStrategy::FirstEntry),
            "strict" => Ok(JoinStrategy::Strict),
            other => Err(PortalError::InvalidConfigValue {
                key: "directory.join_strategy".to_string(),
                message: format!("Unknown join strategy '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorRow {
    /// `{doctor_id}-{department}`
    pub id: String,
    pub doctor_id: String,
    pub department: String,
    pub specialty: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl DoctorRow {
    fn joined(assignment: &DoctorAssignment, doctor: &Doctor) -> Self {
        Self {
            id: row_id(assignment),
            doctor_id: assignment.doctor_id.clone(),
            department: assignment.department.clone(),
            specialty: assignment
                .specialty
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| doctor.specialty.clone()),
            full_name: doctor.full_name.clone().unwrap_or_default(),
            phone: doctor.phone.clone(),
            email: doctor.email.clone(),
        }
    }

    fn placeholder(assignment: &DoctorAssignment) -> Self {
        Self {
            id: row_id(assignment),
            doctor_id: assignment.doctor_id.clone(),
            department: assignment.department.clone(),
            specialty: assignment.specialty.clone(),
            full_name: placeholder_name(&assignment.doctor_id),
            phone: None,
            email: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.phone.is_none()
            && self.email.is_none()
            && self.full_name == placeholder_name(&self.doctor_id)
    }

    fn search_matches(&self, term: &str) -> bool {
        [
            Some(self.full_name.as_str()),
            Some(self.department.as_str()),
            self.specialty.as_deref(),
            self.email.as_deref(),
            self.phone.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(term))
    }
}

fn row_id(assignment: &DoctorAssignment) -> String {
    format!("{}-{}", assignment.doctor_id, assignment.department)
}

pub fn placeholder_name(doctor_id: &str) -> String {
    let short: String = doctor_id.chars().take(8).collect();
    format!("Doctor {}", short)
}

/// One row per assignment, in assignment order.
pub fn merge_doctors(
    assignments: &[DoctorAssignment],
    roster: &[Doctor],
    strategy: JoinStrategy,
) -> PortalResult<Vec<DoctorRow>> {
    debug!(
        assignments = assignments.len(),
        roster = roster.len(),
        %strategy,
        "Merging doctor directory"
    );

    match strategy {
        JoinStrategy::FirstEntry => Ok(merge_first_entry(assignments, roster)),
        JoinStrategy::Strict => merge_strict(assignments, roster),
    }
}

fn merge_first_entry(assignments: &[DoctorAssignment], roster: &[Doctor]) -> Vec<DoctorRow> {
    let first = roster.first().filter(|d| d.has_name());
    assignments
        .iter()
        .map(|assignment| match first {
            Some(doctor) => DoctorRow::joined(assignment, doctor),
            None => {
                warn!(doctor_id = %assignment.doctor_id, "No named roster doctor, using placeholder");
                DoctorRow::placeholder(assignment)
            }
        })
        .collect()
}

fn merge_strict(assignments: &[DoctorAssignment], roster: &[Doctor]) -> PortalResult<Vec<DoctorRow>> {
    if roster.is_empty() {
        return Ok(assignments.iter().map(DoctorRow::placeholder).collect());
    }

    let identified = roster.iter().any(|d| d.doctor_id.is_some());
    if identified {
        return assignments
            .iter()
            .map(|assignment| {
                roster
                    .iter()
                    .find(|d| d.doctor_id.as_deref() == Some(assignment.doctor_id.as_str()))
                    .map(|doctor| DoctorRow::joined(assignment, doctor))
                    .ok_or_else(|| PortalError::UnmatchedDoctor(assignment.doctor_id.clone()))
            })
            .collect();
    }

    let distinct: BTreeSet<&str> = assignments.iter().map(|a| a.doctor_id.as_str()).collect();
    if roster.len() == 1 && distinct.len() <= 1 {
        return Ok(merge_first_entry(assignments, roster));
    }

    Err(PortalError::AmbiguousDoctorJoin {
        assignments: assignments.len(),
        roster: roster.len(),
    })
}

/// Unique departments, sorted.
pub fn departments(rows: &[DoctorRow]) -> Vec<String> {
    rows.iter()
        .map(|r| r.department.clone())
        .filter(|d| !d.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Case-insensitive search over name, department, specialty, email and
/// phone, combined with an exact department match.
pub fn filter_rows<'a>(
    rows: &'a [DoctorRow],
    search: &str,
    department: Option<&str>,
) -> Vec<&'a DoctorRow> {
    let term = search.trim().to_lowercase();
    rows.iter()
        .filter(|row| term.is_empty() || row.search_matches(&term))
        .filter(|row| department.map_or(true, |d| d.is_empty() || row.department == d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(doctor_id: &str, department: &str) -> DoctorAssignment {
        DoctorAssignment {
            doctor_id: doctor_id.to_string(),
            department: department.to_string(),
            specialty: None,
        }
    }

    fn doctor(name: &str) -> Doctor {
        Doctor {
            doctor_id: None,
            full_name: Some(name.to_string()),
            phone: Some("600111222".to_string()),
            email: Some(format!("{}@clinic.org", name.to_lowercase().replace(' ', "."))),
            specialty: Some("General".to_string()),
        }
    }

    #[test]
    fn test_placeholder_name_truncates() {
        assert_eq!(placeholder_name("4f9a7c21-aaaa"), "Doctor 4f9a7c21");
        assert_eq!(placeholder_name("d1"), "Doctor d1");
    }

    #[test]
    fn test_first_entry_uses_first_doctor_for_every_row() {
        let assignments = vec![
            assignment("d-1", "Cardiology"),
            assignment("d-2", "Neurology"),
        ];
        let roster = vec![doctor("Meredith Grey"), doctor("Derek Shepherd")];

        let rows = merge_doctors(&assignments, &roster, JoinStrategy::FirstEntry).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.full_name == "Meredith Grey"));
        assert_eq!(rows[1].id, "d-2-Neurology");
        assert_eq!(rows[1].specialty.as_deref(), Some("General"));
    }

    #[test]
    fn test_first_entry_placeholder_when_first_unnamed() {
        let assignments = vec![assignment("abcdef123456", "ENT")];
        let roster = vec![Doctor::default(), doctor("Derek Shepherd")];

        let rows = merge_doctors(&assignments, &roster, JoinStrategy::FirstEntry).unwrap();
        assert_eq!(rows[0].full_name, "Doctor abcdef12");
        assert!(rows[0].is_placeholder());
    }

    #[test]
    fn test_assignment_specialty_wins() {
        let mut a = assignment("d-1", "Cardiology");
        a.specialty = Some("Electrophysiology".to_string());
        let rows = merge_doctors(&[a], &[doctor("Ana")], JoinStrategy::FirstEntry).unwrap();
        assert_eq!(rows[0].specialty.as_deref(), Some("Electrophysiology"));
    }

    #[test]
    fn test_strict_single_doctor_accepted() {
        let assignments = vec![assignment("d-1", "Cardiology"), assignment("d-1", "Surgery")];
        let rows = merge_doctors(&assignments, &[doctor("Ana")], JoinStrategy::Strict).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.full_name == "Ana"));
    }

    #[test]
    fn test_strict_rejects_ambiguous_roster() {
        let assignments = vec![assignment("d-1", "Cardiology"), assignment("d-2", "Surgery")];
        let err = merge_doctors(&assignments, &[doctor("Ana")], JoinStrategy::Strict).unwrap_err();
        assert!(matches!(
            err,
            PortalError::AmbiguousDoctorJoin {
                assignments: 2,
                roster: 1
            }
        ));

        let err = merge_doctors(
            &assignments[..1],
            &[doctor("Ana"), doctor("Bo")],
            JoinStrategy::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, PortalError::AmbiguousDoctorJoin { .. }));
    }

    #[test]
    fn test_strict_joins_by_identifier() {
        let mut ana = doctor("Ana");
        ana.doctor_id = Some("d-1".to_string());
        let mut bo = doctor("Bo");
        bo.doctor_id = Some("d-2".to_string());

        let assignments = vec![assignment("d-2", "Surgery"), assignment("d-1", "Cardiology")];
        let rows = merge_doctors(&assignments, &[ana.clone(), bo], JoinStrategy::Strict).unwrap();
        assert_eq!(rows[0].full_name, "Bo");
        assert_eq!(rows[1].full_name, "Ana");

        let err = merge_doctors(&[assignment("d-9", "ENT")], &[ana], JoinStrategy::Strict).unwrap_err();
        assert!(matches!(err, PortalError::UnmatchedDoctor(ref id) if id == "d-9"));
    }

    #[test]
    fn test_strict_empty_roster_gives_placeholders() {
        let rows = merge_doctors(&[assignment("d-1", "ENT")], &[], JoinStrategy::Strict).unwrap();
        assert_eq!(rows[0].full_name, "Doctor d-1");
    }

    #[test]
    fn test_departments_and_filter() {
        let assignments = vec![
            assignment("d-1", "Neurology"),
            assignment("d-1", "Cardiology"),
            assignment("d-1", "Neurology"),
        ];
        let rows = merge_doctors(&assignments, &[doctor("Ana Lima")], JoinStrategy::FirstEntry).unwrap();

        assert_eq!(departments(&rows), vec!["Cardiology", "Neurology"]);
        assert_eq!(filter_rows(&rows, "", None).len(), 3);
        assert_eq!(filter_rows(&rows, "ana", None).len(), 3);
        assert_eq!(filter_rows(&rows, "CARDIO", None).len(), 1);
        assert_eq!(filter_rows(&rows, "", Some("Neurology")).len(), 2);
        assert_eq!(filter_rows(&rows, "cardio", Some("Neurology")).len(), 0);
        assert_eq!(filter_rows(&rows, "600111", None).len(), 3);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("first-entry".parse::<JoinStrategy>().unwrap(), JoinStrategy::FirstEntry);
        assert_eq!("strict".parse::<JoinStrategy>().unwrap(), JoinStrategy::Strict);
        assert!("guess".parse::<JoinStrategy>().is_err());
        assert_eq!(JoinStrategy::default(), JoinStrategy::Strict);
    }
}
