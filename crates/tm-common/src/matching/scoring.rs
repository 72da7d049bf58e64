use serde::Serialize;

use super::checks::{run_all_checks, CheckOutcome, MatchCriterion};
use crate::{ParentRequest, TutorProfile};

/// 1組（依頼, 講師）の適合度。score は満たした項目数（0〜3）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    pub score: u8,
    pub details: Vec<MatchCriterion>,
    #[serde(skip)]
    pub outcomes: Vec<CheckOutcome>,
}

impl MatchScore {
    pub fn from_outcomes(outcomes: Vec<CheckOutcome>) -> Self {
        let details: Vec<_> = outcomes
            .iter()
            .filter(|outcome| outcome.matched)
            .map(|outcome| outcome.criterion)
            .collect();

        Self {
            score: details.len() as u8,
            details,
            outcomes,
        }
    }

    pub const MAX: u8 = MatchCriterion::ALL.len() as u8;

    pub fn is_perfect(&self) -> bool {
        self.score == Self::MAX
    }

    pub fn matched(&self, criterion: MatchCriterion) -> bool {
        self.details.contains(&criterion)
    }

    /// 管理画面向けの説明（"payment: ... / location: ..."）
    pub fn explain(&self) -> String {
        self.outcomes
            .iter()
            .map(|outcome| format!("{}: {}", outcome.criterion.as_ref(), outcome.reason))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// 適合度スコア計算。副作用なし、講師の assigned 状態は見ない。
pub fn score_match(request: &ParentRequest, tutor: &TutorProfile) -> MatchScore {
    MatchScore::from_outcomes(run_all_checks(request, tutor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Address;

    fn request() -> ParentRequest {
        ParentRequest {
            id: "req-1".into(),
            address: Address::new("Kondapur", None),
            preferred_timings: "Evenings".into(),
            payment_min: Some("8000".into()),
            payment_max: Some("12000".into()),
            ..ParentRequest::default()
        }
    }

    fn tutor(salary: &str, timings: &str, address: &str) -> TutorProfile {
        TutorProfile {
            user_id: "t-1".into(),
            expected_salary: salary.into(),
            available_timings: timings.into(),
            address: Address::new(address, None),
            ..TutorProfile::default()
        }
    }

    #[test]
    fn perfect_match_scores_three() {
        let score = score_match(
            &request(),
            &tutor("10000", "Evenings, Weekdays", "Kondapur Cross Roads"),
        );

        assert_eq!(score.score, 3);
        assert!(score.is_perfect());
        assert_eq!(
            score.details,
            vec![
                MatchCriterion::Payment,
                MatchCriterion::Location,
                MatchCriterion::Timing
            ]
        );
    }

    #[test]
    fn details_length_always_equals_score() {
        let cases = [
            tutor("10000", "Evenings", "Kondapur"),
            tutor("20000", "Evenings", "Kondapur"),
            tutor("20000", "Mornings", "Kondapur"),
            tutor("20000", "Mornings", "Gachibowli"),
            tutor("", "", ""),
        ];

        for case in &cases {
            let score = score_match(&request(), case);
            assert!(score.score <= MatchScore::MAX);
            assert_eq!(score.details.len(), score.score as usize);
        }
    }

    #[test]
    fn keeps_check_order_when_payment_misses() {
        let score = score_match(&request(), &tutor("20000", "Evenings", "Kondapur"));

        assert_eq!(score.score, 2);
        assert!(!score.matched(MatchCriterion::Payment));
        assert_eq!(
            score.details,
            vec![MatchCriterion::Location, MatchCriterion::Timing]
        );
    }

    #[test]
    fn explains_every_check() {
        let score = score_match(&request(), &tutor("20000", "Mornings", "Gachibowli"));

        assert_eq!(score.score, 0);
        let explanation = score.explain();
        assert!(explanation.contains("payment: salary 20000 outside 8000..=12000"));
        assert!(explanation.contains("location:"));
        assert!(explanation.contains("timing:"));
    }

    #[test]
    fn serializes_labels_in_lowercase() {
        let score = score_match(&request(), &tutor("10000", "Evenings", "Kondapur"));
        let json = serde_json::to_value(&score).unwrap();

        assert_eq!(json["score"], 3);
        assert_eq!(json["details"], serde_json::json!(["payment", "location", "timing"]));
    }
}
