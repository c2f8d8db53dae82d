//! Per-entity form schemas. Each form holds the raw text the operator
//! entered and validates it into the request body the backend expects.

pub mod activity;
pub mod document;
pub mod exam;
pub mod points;
pub mod rating;
pub mod survey;

pub use activity::{AbsenceForm, ActivityForm};
pub use document::{DocumentForm, UploadSelection};
pub use exam::ExamForm;
pub use points::PointsAdjustmentForm;
pub use rating::{RatingPeriodForm, RatingReviewForm};
pub use survey::SurveyForm;
