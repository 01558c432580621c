//! Patient feedback: the rating on one finished visit and the nurse's
//! feedback list with a star filter.

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, NursingBackend};
use crate::models::{Appointment, AppointmentStatus, Feedback};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "stars", rename_all = "snake_case")]
pub enum RatingFilter {
    #[default]
    All,
    Stars(u8),
}

impl RatingFilter {
    pub fn matches(&self, feedback: &Feedback) -> bool {
        match self {
            RatingFilter::All => true,
            RatingFilter::Stars(n) => feedback.rating == *n,
        }
    }
}

pub fn filter(feedback: &[Feedback], by: RatingFilter) -> Vec<Feedback> {
    feedback.iter().filter(|f| by.matches(f)).cloned().collect()
}

/// Mean star rating, `None` when there is nothing to average.
pub fn average_rating(feedback: &[Feedback]) -> Option<f64> {
    if feedback.is_empty() {
        return None;
    }
    let total: u32 = feedback.iter().map(|f| u32::from(f.rating)).sum();
    Some(f64::from(total) / feedback.len() as f64)
}

/// Count per star, index 0 holding one-star ratings.
pub fn rating_histogram(feedback: &[Feedback]) -> [usize; 5] {
    let mut counts = [0usize; 5];
    for f in feedback {
        if let Some(slot) = usize::from(f.rating).checked_sub(1).and_then(|i| counts.get_mut(i)) {
            *slot += 1;
        }
    }
    counts
}

/// Feedback only exists once a visit is finished; anything earlier is
/// answered locally with `None`.
pub fn feedback_for(
    appointment: &Appointment,
    medical_record_id: &str,
    backend: &dyn NursingBackend,
) -> Result<Option<Feedback>, ApiError> {
    if appointment.status != AppointmentStatus::Success {
        return Ok(None);
    }
    backend.feedback(medical_record_id)
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSummary {
    pub items: Vec<Feedback>,
    pub total: usize,
    pub average: Option<f64>,
    pub histogram: [usize; 5],
}

/// The nurse's feedback list, filtered; stats cover the unfiltered list.
pub fn nurse_feedback_summary(
    backend: &dyn NursingBackend,
    nurse_id: &str,
    by: RatingFilter,
) -> Result<FeedbackSummary, ApiError> {
    let all = backend.nurse_feedback(nurse_id)?;
    Ok(FeedbackSummary {
        items: filter(&all, by),
        total: all.len(),
        average: average_rating(&all),
        histogram: rating_histogram(&all),
    })
}
