use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// --- Identity & Access Schemas ---

/// Role
///
/// Coarse-grained actor category as carried on the wire by the platform backend.
/// Only `SUPER_ADMIN` and `ADMIN` are admitted into the console; the other two
/// exist because the shared `/auth/login` endpoint serves the whole platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "SUPER_ADMIN")]
    SuperAdmin,
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "CREATOR")]
    Creator,
    #[serde(rename = "USER")]
    User,
}

impl Role {
    /// True for the roles allowed to operate the console at all.
    pub fn is_admin_grade(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

/// Permission
///
/// A capability token gating visibility of one functional area. The catalog is
/// fixed; an unknown token in a stored user record fails deserialization, which
/// the session layer treats as an absent session rather than guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManagePayments,
    ManageReports,
    ManageUsers,
    ManagePlans,
    ManageSettings,
}

/// AdminUser
///
/// The persisted user record half of a session, exactly as returned by
/// `POST /auth/login`. The `permissions` array is meaningful only for plain
/// `ADMIN` accounts; see `Authority` for how the superuser bypass is modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Session
///
/// The authenticated operator's identity, held client-side for the duration of
/// a login. A session is either fully present (token + parseable user record)
/// or absent; the session layer never constructs a partial one.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: AdminUser,
}

impl Session {
    /// Derives the type-level access scope for this session.
    pub fn authority(&self) -> Authority {
        Authority::of(&self.user)
    }
}

/// Authority
///
/// Tagged form of the access rules: the superuser bypass is a variant, not an
/// `if role == ...` scattered at each call site. `Scoped` holds the permission
/// set that strictly gates every non-superuser account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authority {
    /// Holds every permission implicitly, regardless of the stored set.
    SuperAdmin,
    /// Gated strictly by set membership.
    Scoped(HashSet<Permission>),
}

impl Authority {
    /// Builds the authority from a user record.
    pub fn of(user: &AdminUser) -> Self {
        match user.role {
            Role::SuperAdmin => Authority::SuperAdmin,
            _ => Authority::Scoped(user.permissions.iter().copied().collect()),
        }
    }

    /// Whether this authority covers the given permission.
    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Authority::SuperAdmin => true,
            Authority::Scoped(set) => set.contains(&permission),
        }
    }

    /// Whether this authority is the superuser bypass.
    pub fn is_super(&self) -> bool {
        matches!(self, Authority::SuperAdmin)
    }
}

// --- Auth Payloads ---

/// LoginRequest
///
/// Input payload for `POST /auth/login`. The password is passed through to the
/// external auth service and never persisted or logged by this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// LoginResponse
///
/// Raw response from the auth endpoint. The token is opaque to this client:
/// no signature or expiry validation happens client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminUser,
}

// --- Upload Pipeline Payloads ---

/// PresignUrlRequest
///
/// Input payload for `POST /files/presign-url`. The backend uses these fields
/// to constrain the write capability it issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignUrlRequest {
    /// The randomized destination filename, extension included.
    pub file_name: String,
    /// The MIME type the storage PUT must declare.
    pub file_type: String,
    /// Destination folder under the bucket root.
    pub folder: String,
}

/// PresignGrant
///
/// The write capability returned by the backend: a time-limited URL authorizing
/// one direct client-to-storage PUT, plus the final storage key callers persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignGrant {
    pub upload_url: String,
    pub key: String,
}

// --- Admin Account Management (superuser-only screens) ---

/// CreateAdminRequest
///
/// Input payload for provisioning a new console operator (`POST /admin`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

// --- KYC / Agency Verification ---

/// AgencyApplication
///
/// One pending identity-verification submission in the KYC review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyApplication {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub status: String,
    /// Storage keys of the submitted photo evidence.
    #[serde(default)]
    pub documents: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// RejectReasonRequest
///
/// Body for `POST /agencies/admin/{id}/reject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectReasonRequest {
    pub reason: String,
}

// --- Payments ---

/// PaymentRecord
///
/// One pending payment awaiting manual approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// --- Subscription Plans ---

/// Plan
///
/// A subscription plan offered on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub duration_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// PlanPayload
///
/// Input payload shared by plan creation (`POST /plans`) and full update
/// (`PUT /plans/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPayload {
    pub name: String,
    pub price: f64,
    pub duration_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// --- Reports ---

/// Report
///
/// One abuse/content report filed by a platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(alias = "_id")]
    pub id: String,
    pub reporter_id: String,
    pub target_id: String,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// ReportResolution
///
/// Body for `PATCH /reports/{id}`: the new status plus the moderation action
/// taken against the reported target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResolution {
    pub status: String,
    pub action: String,
}

// --- Settings ---

/// Setting
///
/// One key/value pair of platform configuration (banner images, QR codes,
/// contact addresses, ...). Values holding uploaded assets store the storage
/// key, not an absolute URL; see `assets::asset_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

// --- Platform Users ---

/// UserAccount
///
/// A platform end-user row as listed on the user-management screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// UserQuery
///
/// Accepted query parameters for `GET /users`. Optional fields are omitted
/// from the query string entirely when unset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// UserPage
///
/// One page of the paginated user listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<UserAccount>,
    pub total: i64,
}

/// UserStatusRequest
///
/// Body for `PATCH /users/{id}/status` (ban / unban).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusRequest {
    pub is_active: bool,
}

/// CreatorVerificationRequest
///
/// Body for `PATCH /creators/{id}/verification`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorVerificationRequest {
    pub is_verified: bool,
    pub verification_status: String,
}
