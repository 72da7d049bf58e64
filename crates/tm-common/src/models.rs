use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// 依頼のライフサイクル。pending -> approved は割当トランザクションのみが行う。
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Completed => "completed",
        }
    }

    /// approved / completed の依頼だけが担当講師を持つ
    pub fn expects_tutor(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PreferredGender {
    Male,
    Female,
    /// 未選択（""）や未知の値もここに寄せる
    #[default]
    #[serde(other)]
    Any,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    #[serde(other)]
    Other,
}

static RE_LEADING_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:₹|Rs\.?|INR)?\s*([0-9][0-9,]*)").expect("valid amount regex"));

/// Leading-digit parse of a rupee amount ("12,000/month" -> 12000).
///
/// Returns `None` when the string has no leading digits.
pub fn parse_amount(raw: &str) -> Option<u64> {
    let caps = RE_LEADING_AMOUNT.captures(raw)?;
    let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// 自由記述の住所と、任意のピン座標（地図リンク or "lat, lng"）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAddress", into = "RawAddress")]
pub enum Address {
    Text { text: String },
    Pinned { text: String, coordinates: String },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAddress {
    #[serde(default)]
    address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pin_point_location: Option<String>,
}

impl From<RawAddress> for Address {
    fn from(raw: RawAddress) -> Self {
        Address::new(raw.address, raw.pin_point_location)
    }
}

impl From<Address> for RawAddress {
    fn from(address: Address) -> Self {
        match address {
            Address::Text { text } => RawAddress {
                address: text,
                pin_point_location: None,
            },
            Address::Pinned { text, coordinates } => RawAddress {
                address: text,
                pin_point_location: Some(coordinates),
            },
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::Text {
            text: String::new(),
        }
    }
}

impl Address {
    /// 空白だけのピンは無視して Text とする
    pub fn new(text: impl Into<String>, pin: Option<String>) -> Self {
        let text = text.into();
        match pin.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
            Some(coordinates) => Address::Pinned { text, coordinates },
            None => Address::Text { text },
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Address::Text { text } | Address::Pinned { text, .. } => text,
        }
    }

    pub fn pin(&self) -> Option<&str> {
        match self {
            Address::Text { .. } => None,
            Address::Pinned { coordinates, .. } => Some(coordinates),
        }
    }

    /// Google Maps search URL for the pin, with whitespace removed from the coordinates.
    pub fn map_search_url(&self) -> Option<String> {
        let cleaned: String = self.pin()?.chars().filter(|c| !c.is_whitespace()).collect();
        Some(format!(
            "https://www.google.com/maps/search/?api=1&query={cleaned}"
        ))
    }
}

/// 依頼側の報酬レンジ（下限/上限とも両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentRange {
    pub min: u64,
    pub max: u64,
}

impl Default for PaymentRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

impl PaymentRange {
    pub const DEFAULT_MIN: u64 = 0;
    pub const DEFAULT_MAX: u64 = 999_999;

    /// 空欄・数値として読めない値はそれぞれのデフォルト境界に落とす
    pub fn from_bounds(min: Option<&str>, max: Option<&str>) -> Self {
        Self {
            min: min.and_then(parse_amount).unwrap_or(Self::DEFAULT_MIN),
            max: max.and_then(parse_amount).unwrap_or(Self::DEFAULT_MAX),
        }
    }

    pub fn contains(&self, amount: u64) -> bool {
        self.min <= amount && amount <= self.max
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRequest {
    pub id: String,
    pub user_id: String,
    pub father_name: String,
    pub mother_name: String,
    pub number_of_children: String,
    pub syllabus: String,
    pub subjects: Vec<String>,
    #[serde(default)]
    pub preferred_gender: PreferredGender,
    #[serde(flatten)]
    pub address: Address,
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
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_tutor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ParentRequest {
    pub fn payment_range(&self) -> PaymentRange {
        PaymentRange::from_bounds(self.payment_min.as_deref(), self.payment_max.as_deref())
    }

    pub fn parent_names(&self) -> String {
        format!("{} & {}", self.father_name, self.mother_name)
    }

    /// assignedTutorId は approved/completed のときに限り設定される
    pub fn is_consistent(&self) -> bool {
        self.status.expects_tutor() == self.assigned_tutor_id.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorProfile {
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
    #[serde(flatten)]
    pub address: Address,
    pub available_timings: String,
    pub expected_salary: String,
    pub phone_number: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub assigned: bool,
    pub created_at: DateTime<Utc>,
}

impl TutorProfile {
    pub fn salary(&self) -> Option<u64> {
        parse_amount(&self.expected_salary)
    }
}
