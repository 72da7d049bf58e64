use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{ParentRequest, TutorProfile};

/// 判定項目。並び順がそのまま matchDetails の順序になる。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchCriterion {
    Payment,
    Location,
    Timing,
}

impl MatchCriterion {
    pub const ALL: [MatchCriterion; 3] = [
        MatchCriterion::Payment,
        MatchCriterion::Location,
        MatchCriterion::Timing,
    ];
}

/// 1項目分の判定結果（理由は管理画面の説明用）
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub criterion: MatchCriterion,
    pub matched: bool,
    pub reason: String,
}

/// 全項目の判定をまとめて実行する（順序は MatchCriterion::ALL）
pub fn run_all_checks(request: &ParentRequest, tutor: &TutorProfile) -> Vec<CheckOutcome> {
    MatchCriterion::ALL
        .iter()
        .map(|criterion| match criterion {
            MatchCriterion::Payment => check_payment(request, tutor),
            MatchCriterion::Location => check_location(request, tutor),
            MatchCriterion::Timing => check_timing(request, tutor),
        })
        .collect()
}

/// 報酬判定（講師希望額が依頼レンジ内なら一致、両端を含む）
pub fn check_payment(request: &ParentRequest, tutor: &TutorProfile) -> CheckOutcome {
    let range = request.payment_range();

    let (matched, reason) = match tutor.salary() {
        Some(salary) if range.contains(salary) => (
            true,
            format!("salary {} within {}..={}", salary, range.min, range.max),
        ),
        Some(salary) => (
            false,
            format!("salary {} outside {}..={}", salary, range.min, range.max),
        ),
        None => (
            false,
            format!("salary_unknown: {:?}", tutor.expected_salary),
        ),
    };

    CheckOutcome {
        criterion: MatchCriterion::Payment,
        matched,
        reason,
    }
}

/// 依頼住所の先頭トークン（前後の句読点は除去、小文字化）
pub fn location_token(address: &str) -> Option<String> {
    address
        .split_whitespace()
        .next()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// 勤務地判定（市区・エリア名の部分一致。ジオコーディングはしない）
pub fn check_location(request: &ParentRequest, tutor: &TutorProfile) -> CheckOutcome {
    let tutor_address = tutor.address.text().to_lowercase();

    let (matched, reason) = match location_token(request.address.text()) {
        None => (false, "location_unknown: 依頼住所が空".to_string()),
        Some(_) if tutor_address.trim().is_empty() => {
            (false, "location_unknown: 講師住所が空".to_string())
        }
        Some(token) if tutor_address.contains(&token) => {
            (true, format!("tutor address contains '{}'", token))
        }
        Some(token) => (false, format!("tutor address lacks '{}'", token)),
    };

    CheckOutcome {
        criterion: MatchCriterion::Location,
        matched,
        reason,
    }
}

/// 時間帯判定（講師の可能時間に依頼の希望時間がそのまま含まれるか）
pub fn check_timing(request: &ParentRequest, tutor: &TutorProfile) -> CheckOutcome {
    let wanted = request.preferred_timings.to_lowercase();
    let available = tutor.available_timings.to_lowercase();

    let (matched, reason) = if wanted.trim().is_empty() || available.trim().is_empty() {
        (false, "timing_unknown: 時間帯情報不足".to_string())
    } else if available.contains(&wanted) {
        (true, format!("available timings include '{}'", wanted))
    } else {
        (false, format!("available timings lack '{}'", wanted))
    };

    CheckOutcome {
        criterion: MatchCriterion::Timing,
        matched,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Address;

    fn request() -> ParentRequest {
        ParentRequest {
            id: "req-1".into(),
            address: Address::new("Madhapur, Hyderabad", None),
            preferred_timings: "4 PM - 6 PM".into(),
            payment_min: Some("10000".into()),
            payment_max: Some("15000".into()),
            ..ParentRequest::default()
        }
    }

    fn tutor() -> TutorProfile {
        TutorProfile {
            user_id: "t-1".into(),
            address: Address::new("Near Madhapur Metro", None),
            available_timings: "4 PM - 6 PM, Weekdays".into(),
            expected_salary: "10000".into(),
            ..TutorProfile::default()
        }
    }

    #[test]
    fn payment_bounds_are_inclusive() {
        let request = request();
        let mut tutor = tutor();

        for (salary, expected) in [("10000", true), ("15000", true), ("9999", false), ("15001", false)] {
            tutor.expected_salary = salary.into();
            assert_eq!(check_payment(&request, &tutor).matched, expected, "salary {salary}");
        }
    }

    #[test]
    fn unparseable_salary_never_matches() {
        let mut tutor = tutor();
        tutor.expected_salary = "negotiable".into();

        let outcome = check_payment(&ParentRequest::default(), &tutor);
        assert!(!outcome.matched);
        assert!(outcome.reason.contains("salary_unknown"));
    }

    #[test]
    fn blank_bounds_fall_back_to_defaults() {
        let mut request = request();
        request.payment_min = None;
        request.payment_max = Some("   ".into());
        let mut tutor = tutor();
        tutor.expected_salary = "500000".into();

        assert!(check_payment(&request, &tutor).matched);
    }

    #[test]
    fn location_uses_first_token_case_insensitively() {
        let request = request();
        let mut tutor = tutor();
        assert!(check_location(&request, &tutor).matched);

        tutor.address = Address::new("Kukatpally", None);
        assert!(!check_location(&request, &tutor).matched);

        tutor.address = Address::new("MADHAPUR main road", None);
        assert!(check_location(&request, &tutor).matched);
    }

    #[test]
    fn empty_addresses_do_not_match() {
        let mut blank_request = request();
        blank_request.address = Address::new("   ", None);
        assert!(!check_location(&blank_request, &tutor()).matched);

        let mut blank_tutor = tutor();
        blank_tutor.address = Address::default();
        assert!(!check_location(&request(), &blank_tutor).matched);
    }

    #[test]
    fn timing_requires_substring() {
        let request = request();
        let mut tutor = tutor();
        assert!(check_timing(&request, &tutor).matched);

        tutor.available_timings = "Weekends only".into();
        assert!(!check_timing(&request, &tutor).matched);
    }

    #[test]
    fn timing_compares_untrimmed_preference() {
        let mut padded = request();
        padded.preferred_timings = "4 PM - 6 PM ".into();
        assert!(!check_timing(&padded, &tutor()).matched);

        let mut blank = request();
        blank.preferred_timings = "   ".into();
        assert!(!check_timing(&blank, &tutor()).matched);
    }

    #[test]
    fn runs_checks_in_fixed_order() {
        let outcomes = run_all_checks(&request(), &tutor());
        let criteria: Vec<_> = outcomes.iter().map(|o| o.criterion).collect();
        assert_eq!(criteria, MatchCriterion::ALL.to_vec());
        assert!(outcomes.iter().all(|o| o.matched));
    }

    #[test]
    fn location_token_strips_punctuation() {
        assert_eq!(location_token("Madhapur, Hyderabad").as_deref(), Some("madhapur"));
        assert_eq!(location_token("  ").as_deref(), None);
        assert_eq!(location_token("--- Kondapur").as_deref(), None);
    }
}
