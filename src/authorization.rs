//! Role-based access control for clinic staff.
//!
//! Every operation the service exposes is an `Operation`; its required role
//! and its failure mode are declared in one exhaustive match here. Handlers
//! call `authorize` once and never compare role strings themselves.
//!
//! Client visibility is global: any authenticated staff member may list and
//! open any client record, whoever registered it.

use std::fmt;

use serde::Serialize;

use crate::models::{User, UserType};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Effective role of an authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Doctor,
    Receptionist,
}

impl Role {
    /// Superusers act as doctors regardless of their stored user type.
    pub fn of(user: &User) -> Self {
        if user.is_superuser {
            return Self::Doctor;
        }
        match user.user_type {
            UserType::Doctor => Self::Doctor,
            UserType::Receptionist => Self::Receptionist,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Doctor => "doctor",
            Self::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity, passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Caller {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: Role::of(user),
        }
    }

    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }
}

/// How a rejected request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Page views are sent back to the dashboard.
    RedirectToDashboard,
    /// Incremental requests get an explicit JSON error.
    JsonError,
}

/// Every role-gated operation of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewDashboard,
    CreateClient,
    ViewClient,
    EditMedical,
    DeleteClient,
    ReferClient,
    CompleteReferral,
    MarkReferralSeen,
    ListPendingReferrals,
    PollNotifications,
    SignUpStaff,
}

impl Operation {
    /// `None` means any authenticated role.
    pub fn required_role(self) -> Option<Role> {
        match self {
            Self::ViewDashboard
            | Self::CreateClient
            | Self::ViewClient
            | Self::ReferClient
            | Self::PollNotifications => None,
            Self::EditMedical
            | Self::DeleteClient
            | Self::CompleteReferral
            | Self::MarkReferralSeen
            | Self::ListPendingReferrals
            | Self::SignUpStaff => Some(Role::Doctor),
        }
    }

    pub fn failure_mode(self) -> FailureMode {
        match self {
            Self::ReferClient
            | Self::CompleteReferral
            | Self::MarkReferralSeen
            | Self::PollNotifications => FailureMode::JsonError,
            Self::ViewDashboard
            | Self::CreateClient
            | Self::ViewClient
            | Self::EditMedical
            | Self::DeleteClient
            | Self::ListPendingReferrals
            | Self::SignUpStaff => FailureMode::RedirectToDashboard,
        }
    }

    /// Human phrasing used in rejection messages.
    pub fn action(self) -> &'static str {
        match self {
            Self::ViewDashboard => "view the dashboard",
            Self::CreateClient => "register clients",
            Self::ViewClient => "view clients",
            Self::EditMedical => "edit medical records",
            Self::DeleteClient => "delete clients",
            Self::ReferClient => "refer clients",
            Self::CompleteReferral => "complete referrals",
            Self::MarkReferralSeen => "acknowledge referrals",
            Self::ListPendingReferrals => "view pending referrals",
            Self::PollNotifications => "check notifications",
            Self::SignUpStaff => "create staff accounts",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ViewDashboard => "view_dashboard",
            Self::CreateClient => "create_client",
            Self::ViewClient => "view_client",
            Self::EditMedical => "edit_medical",
            Self::DeleteClient => "delete_client",
            Self::ReferClient => "refer_client",
            Self::CompleteReferral => "complete_referral",
            Self::MarkReferralSeen => "mark_referral_seen",
            Self::ListPendingReferrals => "list_pending_referrals",
            Self::PollNotifications => "poll_notifications",
            Self::SignUpStaff => "sign_up_staff",
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Only {required}s can {}", operation.action())]
    RoleRequired {
        operation: Operation,
        required: Role,
    },
}

impl AccessError {
    pub fn operation(&self) -> Operation {
        match self {
            Self::RoleRequired { operation, .. } => *operation,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Authorization check
// ═══════════════════════════════════════════════════════════

/// Check that `caller` may perform `operation`.
pub fn authorize(caller: &Caller, operation: Operation) -> Result<(), AccessError> {
    match operation.required_role() {
        None => Ok(()),
        Some(required) if caller.role == required => Ok(()),
        Some(required) => {
            tracing::warn!(
                user = %caller.username,
                role = %caller.role,
                operation = operation.name(),
                "Operation rejected for role"
            );
            Err(AccessError::RoleRequired {
                operation,
                required,
            })
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
