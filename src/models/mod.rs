//! Transport DTOs exchanged with the backend. The console never owns these
//! records; it displays the last fetched copy and requests mutations.

/// Generates a status enum carried on the wire as an upper-case string.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().replace('-', "_");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(&wanted))
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("unknown value `{s}`, expected one of {}", allowed.join(", "))
                    })
            }
        }
    };
}

pub mod activity;
pub mod document;
pub mod exam;
pub mod points;
pub mod rating;
pub mod survey;
pub mod user;

pub use activity::{Activity, ActivityStatus, Participant, ParticipantStatus};
pub use document::{Document, DocumentStatus, UploadedFile};
pub use exam::{Exam, ExamQuestion};
pub use points::Member;
pub use rating::{RatingCriterion, RatingLevel, RatingPeriod, SelfRating, SubmissionStatus};
pub use survey::{QuestionType, Survey, SurveyQuestion, SurveyResponse, SurveyStatus};
pub use user::{User, UserActivity};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_case_insensitively() {
        assert_eq!("active".parse::<ActivityStatus>(), Ok(ActivityStatus::Active));
        assert_eq!(
            "needs-revision".parse::<SubmissionStatus>(),
            Ok(SubmissionStatus::NeedsRevision)
        );
        assert!("finished".parse::<SurveyStatus>().is_err());
    }

    #[test]
    fn statuses_use_wire_names() {
        let json = serde_json::to_string(&ParticipantStatus::CheckedIn).unwrap();
        assert_eq!(json, "\"CHECKED_IN\"");
        let parsed: DocumentStatus = serde_json::from_str("\"PUBLISHED\"").unwrap();
        assert_eq!(parsed, DocumentStatus::Published);
    }
}
