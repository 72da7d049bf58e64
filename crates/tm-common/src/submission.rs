use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::{
    Address, Gender, ParentRequest, PreferredGender, RequestStatus, TutorProfile, ids,
    notify::phone_digits,
    store::{Store, StoreError},
};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("at least one subject is required")]
    NoSubjects,
    #[error("phone number must contain digits")]
    InvalidPhone,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 保護者フォームの入力
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParentRequest {
    #[serde(default)]
    pub user_id: String,
    pub father_name: String,
    pub mother_name: String,
    pub number_of_children: String,
    pub syllabus: String,
    pub subjects: Vec<String>,
    #[serde(default)]
    pub preferred_gender: PreferredGender,
    pub address: String,
    #[serde(default)]
    pub pin_point_location: Option<String>,
    pub preferred_timings: String,
    #[serde(default)]
    pub payment_min: Option<String>,
    #[serde(default)]
    pub payment_max: Option<String>,
    #[serde(default, rename = "paymentDependsOnDemo")]
    pub demo_rate: Option<String>,
    pub phone_number: String,
    #[serde(default)]
    pub additional_requirements: Option<String>,
}

/// 講師フォームの入力
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTutorProfile {
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    pub age: String,
    #[serde(default)]
    pub gender: Gender,
    pub qualification: String,
    #[serde(default)]
    pub has_experience: bool,
    #[serde(default)]
    pub years_of_experience: Option<String>,
    pub address: String,
    #[serde(default)]
    pub pin_point_location: Option<String>,
    pub available_timings: String,
    pub expected_salary: String,
    pub phone_number: String,
    pub subjects: Vec<String>,
    #[serde(default)]
    pub referred_by: Option<String>,
}

fn clean_subjects(subjects: Vec<String>) -> Result<Vec<String>, SubmissionError> {
    let mut cleaned: Vec<String> = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let subject = subject.trim().to_string();
        if !subject.is_empty() && !cleaned.contains(&subject) {
            cleaned.push(subject);
        }
    }
    if cleaned.is_empty() {
        return Err(SubmissionError::NoSubjects);
    }
    Ok(cleaned)
}

fn require_phone(phone: &str) -> Result<(), SubmissionError> {
    if phone_digits(phone).is_empty() {
        return Err(SubmissionError::InvalidPhone);
    }
    Ok(())
}

/// 空欄の任意項目は None に寄せる
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl NewParentRequest {
    pub fn into_request(self, now: DateTime<Utc>) -> Result<ParentRequest, SubmissionError> {
        let subjects = clean_subjects(self.subjects)?;
        require_phone(&self.phone_number)?;

        Ok(ParentRequest {
            id: ids::request_id(),
            user_id: self.user_id,
            father_name: self.father_name,
            mother_name: self.mother_name,
            number_of_children: self.number_of_children,
            syllabus: self.syllabus,
            subjects,
            preferred_gender: self.preferred_gender,
            address: Address::new(self.address, self.pin_point_location),
            preferred_timings: self.preferred_timings,
            payment_min: self.payment_min,
            payment_max: self.payment_max,
            demo_rate: non_blank(self.demo_rate),
            phone_number: self.phone_number,
            additional_requirements: non_blank(self.additional_requirements),
            status: RequestStatus::Pending,
            assigned_tutor_id: None,
            created_at: now,
        })
    }
}

impl NewTutorProfile {
    pub fn into_profile(self, now: DateTime<Utc>) -> Result<TutorProfile, SubmissionError> {
        let subjects = clean_subjects(self.subjects)?;
        require_phone(&self.phone_number)?;

        let user_id = if self.user_id.trim().is_empty() {
            ids::generate()
        } else {
            self.user_id
        };

        Ok(TutorProfile {
            user_id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            qualification: self.qualification,
            has_experience: self.has_experience,
            years_of_experience: if self.has_experience {
                non_blank(self.years_of_experience)
            } else {
                None
            },
            address: Address::new(self.address, self.pin_point_location),
            available_timings: self.available_timings,
            expected_salary: self.expected_salary,
            phone_number: self.phone_number,
            subjects,
            referred_by: non_blank(self.referred_by),
            assigned: false,
            created_at: now,
        })
    }
}

/// 保護者の依頼を pending として追加する
#[instrument(skip(store, form))]
pub fn submit_parent_request<S: Store + ?Sized>(
    store: &S,
    form: NewParentRequest,
    now: DateTime<Utc>,
) -> Result<ParentRequest, SubmissionError> {
    let request = form.into_request(now)?;
    store.add_request(request.clone())?;
    info!(request_id = %request.id, subjects = request.subjects.len(), "parent request submitted");
    Ok(request)
}

/// 講師プロフィールを未割当として追加する
#[instrument(skip(store, form))]
pub fn submit_tutor_profile<S: Store + ?Sized>(
    store: &S,
    form: NewTutorProfile,
    now: DateTime<Utc>,
) -> Result<TutorProfile, SubmissionError> {
    let profile = form.into_profile(now)?;
    store.add_tutor(profile.clone())?;
    info!(tutor_id = %profile.user_id, "tutor profile submitted");
    Ok(profile)
}
