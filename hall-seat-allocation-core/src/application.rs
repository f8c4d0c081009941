use core::fmt::{self, Display};
use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HallError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

impl Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    CalledForViva,
}

impl ApplicationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::CalledForViva => "called_for_viva",
        }
    }

    /// Administrative transitions. Approved and Rejected are final.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected | Self::CalledForViva)
                | (Self::CalledForViva, Self::Approved | Self::Rejected)
        )
    }
}

impl Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown application status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "called_for_viva" => Ok(Self::CalledForViva),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VivaSchedule {
    pub date: NaiveDate,
    pub serial: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub full_name: String,
    pub student_id: String,
    pub department: String,
    pub session: String,
    pub contact: String,
    pub payment_reference: String,
    pub photo: Option<String>,
    pub status: ApplicationStatus,
    pub viva: Option<VivaSchedule>,
    pub created_at: DateTime<Utc>,
}

/// A seat request as submitted by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub full_name: String,
    pub student_id: String,
    pub department: String,
    pub session: String,
    pub contact: String,
    pub payment_reference: String,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Longest accepted values in characters, the column widths of the `applications` table.
pub mod limits {
    pub const FULL_NAME: usize = 255;
    pub const STUDENT_ID: usize = 64;
    pub const DEPARTMENT: usize = 128;
    pub const SESSION: usize = 32;
    pub const CONTACT: usize = 255;
    pub const PAYMENT_REFERENCE: usize = 128;
    pub const PHOTO: usize = 1024;
}

#[derive(Default)]
struct Problems {
    missing: Vec<&'static str>,
    too_long: Vec<String>,
}

impl Problems {
    fn check_length(&mut self, field: &'static str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.too_long.push(format!("{field} (at most {max} characters)"));
        }
    }

    fn required(&mut self, field: &'static str, value: &str, max: usize) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.missing.push(field);
        }
        self.check_length(field, value, max);
        value.to_owned()
    }

    fn into_error(self) -> Option<HallError> {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing required fields: {}", self.missing.join(", ")));
        }
        if !self.too_long.is_empty() {
            parts.push(format!("fields too long: {}", self.too_long.join(", ")));
        }
        (!parts.is_empty()).then(|| HallError::Validation(parts.join("; ")))
    }
}

impl NewApplication {
    /// Trims every field and checks that the required ones are present and every value fits.
    pub fn validate(self) -> Result<Self, HallError> {
        let mut problems = Problems::default();
        let validated = Self {
            full_name: problems.required("full_name", &self.full_name, limits::FULL_NAME),
            student_id: problems.required("student_id", &self.student_id, limits::STUDENT_ID),
            department: problems.required("department", &self.department, limits::DEPARTMENT),
            session: problems.required("session", &self.session, limits::SESSION),
            contact: problems.required("contact", &self.contact, limits::CONTACT),
            payment_reference: problems.required(
                "payment_reference",
                &self.payment_reference,
                limits::PAYMENT_REFERENCE,
            ),
            photo: self
                .photo
                .map(|photo| photo.trim().to_owned())
                .filter(|photo| !photo.is_empty()),
        };
        if let Some(photo) = &validated.photo {
            problems.check_length("photo", photo, limits::PHOTO);
        }
        match problems.into_error() {
            Some(err) => Err(err),
            None => Ok(validated),
        }
    }
}

/// Administrative status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    /// When set, the update only applies if the stored status still matches.
    #[serde(default)]
    pub expected_status: Option<ApplicationStatus>,
    #[serde(default)]
    pub viva: Option<VivaSchedule>,
}

impl StatusChange {
    #[must_use]
    pub const fn to(status: ApplicationStatus) -> Self {
        Self {
            status,
            expected_status: None,
            viva: None,
        }
    }

    #[must_use]
    pub const fn expecting(mut self, expected_status: ApplicationStatus) -> Self {
        self.expected_status = Some(expected_status);
        self
    }

    #[must_use]
    pub const fn with_viva(mut self, viva: VivaSchedule) -> Self {
        self.viva = Some(viva);
        self
    }

    /// Checks the change against the current state of the application.
    pub fn check(&self, application: &Application) -> Result<(), HallError> {
        if let Some(expected) = self.expected_status {
            if expected != application.status {
                return Err(HallError::StaleWrite {
                    id: application.id,
                    expected,
                    actual: application.status,
                });
            }
        }
        if !application.status.can_transition_to(self.status) {
            return Err(HallError::InvalidTransition {
                id: application.id,
                from: application.status,
                to: self.status,
            });
        }
        match (self.status, self.viva) {
            (ApplicationStatus::CalledForViva, None) => Err(HallError::Validation(
                "a viva date and serial number are required when calling for viva".to_owned(),
            )),
            (ApplicationStatus::CalledForViva, Some(viva)) if viva.serial == 0 => Err(
                HallError::Validation("viva serial numbers start at 1".to_owned()),
            ),
            (ApplicationStatus::CalledForViva, Some(_)) | (_, None) => Ok(()),
            (_, Some(_)) => Err(HallError::Validation(format!(
                "viva data is only accepted when calling for viva, not when setting {}",
                self.status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: ApplicationId(1),
            full_name: "Jane Doe".to_owned(),
            student_id: "S1".to_owned(),
            department: "CSE".to_owned(),
            session: "2023-24".to_owned(),
            contact: "jane@example.com".to_owned(),
            payment_reference: "PAY-1".to_owned(),
            photo: None,
            status,
            viva: None,
            created_at: Utc::now(),
        }
    }

    fn viva() -> VivaSchedule {
        VivaSchedule {
            date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            serial: 12,
        }
    }

    #[test]
    fn allowed_transitions() {
        use ApplicationStatus::{Approved, CalledForViva, Pending, Rejected};

        let all = [Pending, Approved, Rejected, CalledForViva];
        let allowed = [
            (Pending, Approved),
            (Pending, Rejected),
            (Pending, CalledForViva),
            (CalledForViva, Approved),
            (CalledForViva, Rejected),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::CalledForViva,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
        assert_eq!(
            "allocated".parse::<ApplicationStatus>(),
            Err(UnknownStatus("allocated".to_owned()))
        );
    }

    #[test]
    fn validation_trims_and_lists_missing_fields() {
        let submitted = NewApplication {
            full_name: "  Jane Doe ".to_owned(),
            student_id: "S1".to_owned(),
            department: " ".to_owned(),
            session: "2023-24".to_owned(),
            contact: String::new(),
            payment_reference: "PAY-1".to_owned(),
            photo: Some("   ".to_owned()),
        };
        match submitted.clone().validate() {
            Err(HallError::Validation(message)) => {
                assert_eq!(message, "missing required fields: department, contact");
            }
            other => panic!("unexpected result {other:?}"),
        }

        let fixed = NewApplication {
            department: "CSE".to_owned(),
            contact: "jane@example.com".to_owned(),
            ..submitted
        }
        .validate()
        .unwrap();
        assert_eq!(fixed.full_name, "Jane Doe");
        assert_eq!(fixed.photo, None);
    }

    #[test]
    fn validation_enforces_column_widths() {
        let submitted = NewApplication {
            full_name: "J".repeat(limits::FULL_NAME),
            student_id: "S1".to_owned(),
            department: "CSE".to_owned(),
            session: "2023-24".to_owned(),
            contact: "jane@example.com".to_owned(),
            payment_reference: "PAY-1".to_owned(),
            photo: None,
        };
        assert!(submitted.clone().validate().is_ok());

        // widths count characters, not bytes
        let multibyte = NewApplication {
            full_name: "é".repeat(limits::FULL_NAME),
            ..submitted.clone()
        };
        assert!(multibyte.validate().is_ok());

        let too_long = NewApplication {
            full_name: "J".repeat(limits::FULL_NAME + 1),
            student_id: String::new(),
            photo: Some("p".repeat(limits::PHOTO + 1)),
            ..submitted
        };
        match too_long.validate() {
            Err(HallError::Validation(message)) => assert_eq!(
                message,
                "missing required fields: student_id; fields too long: full_name (at most 255 \
                 characters), photo (at most 1024 characters)"
            ),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn status_change_checks_expected_status_first() {
        let change = StatusChange::to(ApplicationStatus::Approved)
            .expecting(ApplicationStatus::CalledForViva);
        assert!(matches!(
            change.check(&application(ApplicationStatus::Pending)),
            Err(HallError::StaleWrite {
                expected: ApplicationStatus::CalledForViva,
                actual: ApplicationStatus::Pending,
                ..
            })
        ));
    }

    #[test]
    fn status_change_rejects_final_states() {
        let change = StatusChange::to(ApplicationStatus::Pending);
        assert!(matches!(
            change.check(&application(ApplicationStatus::Approved)),
            Err(HallError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn viva_data_is_required_exactly_when_calling_for_viva() {
        let pending = application(ApplicationStatus::Pending);
        assert!(matches!(
            StatusChange::to(ApplicationStatus::CalledForViva).check(&pending),
            Err(HallError::Validation(_))
        ));
        assert!(StatusChange::to(ApplicationStatus::CalledForViva)
            .with_viva(viva())
            .check(&pending)
            .is_ok());
        assert!(matches!(
            StatusChange::to(ApplicationStatus::CalledForViva)
                .with_viva(VivaSchedule { serial: 0, ..viva() })
                .check(&pending),
            Err(HallError::Validation(_))
        ));
        assert!(matches!(
            StatusChange::to(ApplicationStatus::Approved)
                .with_viva(viva())
                .check(&pending),
            Err(HallError::Validation(_))
        ));
    }
}
