use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{Gender, ReferralStatus};

/// Referral sub-state carried by every client row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralState {
    pub referred_to: Option<i64>,
    pub referred_to_username: Option<String>,
    pub referral_status: ReferralStatus,
    pub referral_notes: String,
    pub is_referred: bool,
    pub referred_at: Option<NaiveDateTime>,
    pub referral_completed_at: Option<NaiveDateTime>,
    pub referral_seen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub age: u8,
    pub email: Option<String>,
    pub phone: String,
    pub gender: Gender,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub prescriptions: String,
    pub doctor_notes: String,
    pub created_by: i64,
    pub created_by_username: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_visited: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub referral: ReferralState,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_diagnosis(&self) -> bool {
        !self.diagnosis.trim().is_empty()
    }

    pub fn has_treatment_plan(&self) -> bool {
        !self.treatment_plan.trim().is_empty()
    }

    pub fn is_referred_to(&self, user_id: i64) -> bool {
        self.referral.referred_to == Some(user_id)
    }
}

/// Validated identity fields shared by registration and the medical edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub first_name: String,
    pub last_name: String,
    pub age: u8,
    pub email: Option<String>,
    pub phone: String,
    pub gender: Gender,
}

/// Validated medical edit: identity fields plus the doctor's findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicalUpdate {
    pub identity: ClientIdentity,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub prescriptions: String,
    pub doctor_notes: String,
}
