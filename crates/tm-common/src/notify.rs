//! Outbound WhatsApp messages for parents and tutors.
//!
//! Building a message is pure: [`Notification`] is just a digits-only phone
//! number and a body. Opening the `wa.me` deep link is left to a
//! [`NotificationDispatcher`] supplied by the caller.

use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{ParentRequest, TutorProfile};

static RE_NON_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]").expect("valid non-digit regex"));

pub const DEFAULT_BRAND: &str = "EduMatch";

/// "+91 98765-43210" -> "919876543210"
pub fn phone_digits(phone: &str) -> String {
    RE_NON_DIGIT.replace_all(phone, "").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub phone_digits: String,
    pub body: String,
}

impl Notification {
    pub fn new(phone: &str, body: impl Into<String>) -> Self {
        Self {
            phone_digits: phone_digits(phone),
            body: body.into(),
        }
    }

    /// `https://wa.me/<digits>?text=<url-encoded body>`
    pub fn deep_link(&self) -> String {
        format!(
            "https://wa.me/{}?text={}",
            self.phone_digits,
            urlencoding::encode(&self.body)
        )
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub brand: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            brand: DEFAULT_BRAND.to_string(),
        }
    }
}

impl NotificationConfig {
    pub fn from_env() -> Self {
        let brand = std::env::var("TM_BRAND")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BRAND.to_string());
        Self { brand }
    }
}

/// 割当時に送る2通（講師宛て・保護者宛て）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentNotifications {
    pub tutor: Notification,
    pub parent: Notification,
}

impl AssignmentNotifications {
    pub fn iter(&self) -> impl Iterator<Item = (Recipient, &Notification)> {
        [(Recipient::Tutor, &self.tutor), (Recipient::Parent, &self.parent)].into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Recipient {
    Tutor,
    Parent,
}

pub fn build_assignment_notifications(
    config: &NotificationConfig,
    request: &ParentRequest,
    tutor: &TutorProfile,
) -> AssignmentNotifications {
    AssignmentNotifications {
        tutor: Notification::new(&tutor.phone_number, tutor_match_message(config, request, tutor)),
        parent: Notification::new(
            &request.phone_number,
            parent_match_message(request, tutor),
        ),
    }
}

fn tutor_match_message(
    config: &NotificationConfig,
    request: &ParentRequest,
    tutor: &TutorProfile,
) -> String {
    let mut body = format!(
        "Hello {}! You have been matched through {}.\n\n👨‍👩‍👧 Parent: {}\n📞 Contact: {}\n📍 Address: {}",
        tutor.name,
        config.brand,
        request.parent_names(),
        request.phone_number,
        request.address.text(),
    );
    if let Some(pin) = request.address.pin() {
        body.push_str(&format!("\n📌 Location: {pin}"));
    }
    body.push_str("\n\nPlease connect to discuss further details.");
    body
}

fn parent_match_message(request: &ParentRequest, tutor: &TutorProfile) -> String {
    let mut body = format!(
        "Hello {}! Your tutor request has been approved.\n\n👨‍🏫 Tutor: {}\n📞 Contact: {}\n🎓 Qualification: {}\n💰 Expected Salary: ₹{}/month\n\n",
        request.parent_names(),
        tutor.name,
        tutor.phone_number,
        tutor.qualification,
        tutor.expected_salary,
    );
    if let Some(pin) = tutor.address.pin() {
        body.push_str(&format!("📌 Tutor Location: {pin}\n"));
    }
    body.push_str("Please contact your tutor to schedule a demo.");
    body
}

/// 割当済みペア画面から保護者へ再送するメッセージ
pub fn parent_follow_up(
    config: &NotificationConfig,
    request: &ParentRequest,
    tutor: &TutorProfile,
) -> Notification {
    let body = format!(
        "Hello! This is {}.\n\nYour assigned tutor is {}.\n📍 Location: {}\n📞 Contact: {}\n\nPlease connect to discuss further details.",
        config.brand,
        tutor.name,
        or_na(tutor.address.text()),
        tutor.phone_number,
    );
    Notification::new(&request.phone_number, body)
}

/// 割当済みペア画面から講師へ再送するメッセージ（地図検索リンク付き）
pub fn tutor_follow_up(
    config: &NotificationConfig,
    request: &ParentRequest,
    tutor: &TutorProfile,
) -> Notification {
    let location = request
        .address
        .map_search_url()
        .unwrap_or_else(|| "N/A".to_string());
    let body = format!(
        "Hello! This is {}.\n\nYou have been assigned to {}.\n📍 Address: {}\n📞 Parent Contact: {}\n🗺 Location: {}\n\nPlease connect to discuss further details.",
        config.brand,
        request.parent_names(),
        or_na(request.address.text()),
        request.phone_number,
        location,
    );
    Notification::new(&tutor.phone_number, body)
}

pub fn tutor_welcome(config: &NotificationConfig, tutor: &TutorProfile) -> Notification {
    let body = format!(
        "Welcome {}! Thank you for joining {}. We’ll contact you soon about teaching opportunities.",
        tutor.name, config.brand,
    );
    Notification::new(&tutor.phone_number, body)
}

pub fn tutor_outreach(config: &NotificationConfig, tutor: &TutorProfile) -> Notification {
    let body = format!(
        "Hello {}, this is {} Admin. We’d like to discuss tutoring opportunities with you.",
        tutor.name, config.brand,
    );
    Notification::new(&tutor.phone_number, body)
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no phone digits to dispatch to")]
    MissingPhone,
    #[error("dispatch failed: {0}")]
    Failed(String),
}

/// 送信手段（UI の deep link オープン等）の差し替え口
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// deep link をログに出すだけのディスパッチャ（サーバ既定）
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDispatcher;

impl NotificationDispatcher for TracingDispatcher {
    fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        if notification.phone_digits.is_empty() {
            return Err(DispatchError::MissingPhone);
        }
        info!(
            phone = %notification.phone_digits,
            deep_link = %notification.deep_link(),
            "notification dispatched"
        );
        Ok(())
    }
}

/// 送信内容をメモリに溜めるディスパッチャ
#[derive(Debug, Default)]
pub struct OutboxDispatcher {
    sent: Mutex<Vec<Notification>>,
}

impl OutboxDispatcher {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl NotificationDispatcher for OutboxDispatcher {
    fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| DispatchError::Failed("outbox lock poisoned".into()))?;
        sent.push(notification.clone());
        Ok(())
    }
}
