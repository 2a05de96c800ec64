use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::errors::{AdminError, Result};
use crate::models::{
    AdminUser, AgencyApplication, CreateAdminRequest, CreatorVerificationRequest, LoginRequest,
    LoginResponse, PaymentRecord, Plan, PlanPayload, RejectReasonRequest, Report,
    ReportResolution, Session, Setting, UserAccount, UserPage, UserQuery, UserStatusRequest,
};
use crate::session::{self, SessionState, SessionStore, TOKEN_KEY};

/// ApiClient
///
/// Typed client for every backend endpoint the console consumes. All
/// authenticated calls flow through one response checkpoint, so an expired or
/// revoked session is handled uniformly (persisted state cleared, caller told
/// to re-authenticate) instead of ad hoc per screen.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: SessionState,
}

impl ApiClient {
    pub fn new(config: &AppConfig, session: SessionState) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Joins a path onto the configured base URL.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The stored bearer token; authenticated calls fail fast without one.
    fn token(&self) -> Result<String> {
        self.session
            .get(TOKEN_KEY)
            .ok_or(AdminError::AuthenticationMissing)
    }

    /// check
    ///
    /// The single response checkpoint for authenticated calls. Successful
    /// responses pass through; every failure is routed into
    /// `intercept_failure`, so session invalidation happens in exactly one
    /// place.
    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(intercept_failure(status, &body, self.session.as_ref()))
    }

    /// Sends an authenticated request and decodes the JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.bearer_auth(self.token()?).send().await?;
        Ok(self.check(response).await?.json::<T>().await?)
    }

    /// Sends an authenticated request, discarding any response body.
    async fn send_unit(&self, request: RequestBuilder) -> Result<()> {
        let response = request.bearer_auth(self.token()?).send().await?;
        self.check(response).await?;
        Ok(())
    }

    // --- Authentication ---

    /// login
    ///
    /// Exchanges credentials for a session via `POST /auth/login`. The session
    /// is admitted only for admin-grade roles; on success the token and user
    /// record are persisted, overwriting any previous session.
    ///
    /// A 401 here means bad credentials, not an expired session, so this is
    /// the one call that does not go through the interceptor.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.endpoint("/auth/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdminError::ServerRejected {
                status: status.as_u16(),
                message: extract_message(&body),
            });
        }

        let session = admit_login(response.json::<LoginResponse>().await?)?;
        session::save_session(self.session.as_ref(), &session);
        Ok(session)
    }

    // --- Admin Accounts (superuser-only in practice) ---

    pub async fn list_admins(&self) -> Result<Vec<AdminUser>> {
        self.send_json(self.client.get(self.endpoint("/admin"))).await
    }

    pub async fn create_admin(&self, request: &CreateAdminRequest) -> Result<AdminUser> {
        self.send_json(self.client.post(self.endpoint("/admin")).json(request))
            .await
    }

    pub async fn delete_admin(&self, id: &str) -> Result<()> {
        self.send_unit(self.client.delete(self.endpoint(&format!("/admin/{id}"))))
            .await
    }

    // --- KYC / Agency Verification ---

    pub async fn pending_agencies(&self) -> Result<Vec<AgencyApplication>> {
        self.send_json(self.client.get(self.endpoint("/agencies/admin/pending")))
            .await
    }

    pub async fn verify_agency(&self, id: &str) -> Result<()> {
        self.send_unit(
            self.client
                .post(self.endpoint(&format!("/agencies/admin/{id}/verify"))),
        )
        .await
    }

    pub async fn reject_agency(&self, id: &str, reason: &str) -> Result<()> {
        self.send_unit(
            self.client
                .post(self.endpoint(&format!("/agencies/admin/{id}/reject")))
                .json(&RejectReasonRequest {
                    reason: reason.to_string(),
                }),
        )
        .await
    }

    // --- Payments ---

    pub async fn pending_payments(&self) -> Result<Vec<PaymentRecord>> {
        self.send_json(self.client.get(self.endpoint("/payments/admin/pending")))
            .await
    }

    pub async fn approve_payment(&self, id: &str) -> Result<()> {
        self.send_unit(
            self.client
                .post(self.endpoint(&format!("/payments/admin/{id}/approve"))),
        )
        .await
    }

    pub async fn reject_payment(&self, id: &str) -> Result<()> {
        self.send_unit(
            self.client
                .post(self.endpoint(&format!("/payments/admin/{id}/reject"))),
        )
        .await
    }

    // --- Subscription Plans ---

    pub async fn list_plans(&self) -> Result<Vec<Plan>> {
        self.send_json(self.client.get(self.endpoint("/plans"))).await
    }

    pub async fn create_plan(&self, payload: &PlanPayload) -> Result<Plan> {
        self.send_json(self.client.post(self.endpoint("/plans")).json(payload))
            .await
    }

    pub async fn update_plan(&self, id: &str, payload: &PlanPayload) -> Result<Plan> {
        self.send_json(
            self.client
                .put(self.endpoint(&format!("/plans/{id}")))
                .json(payload),
        )
        .await
    }

    pub async fn delete_plan(&self, id: &str) -> Result<()> {
        self.send_unit(self.client.delete(self.endpoint(&format!("/plans/{id}"))))
            .await
    }

    // --- Reports ---

    pub async fn list_reports(&self) -> Result<Vec<Report>> {
        self.send_json(self.client.get(self.endpoint("/reports"))).await
    }

    pub async fn resolve_report(&self, id: &str, resolution: &ReportResolution) -> Result<()> {
        self.send_unit(
            self.client
                .patch(self.endpoint(&format!("/reports/{id}")))
                .json(resolution),
        )
        .await
    }

    // --- Settings ---

    /// Fetches settings, optionally narrowed to one key.
    pub async fn get_settings(&self, key: Option<&str>) -> Result<Vec<Setting>> {
        let mut request = self.client.get(self.endpoint("/settings"));
        if let Some(key) = key {
            request = request.query(&[("key", key)]);
        }
        self.send_json(request).await
    }

    /// Writes one setting. Two concurrent writes to the same key are not
    /// serialized client-side; the last response to arrive wins.
    pub async fn save_setting(&self, setting: &Setting) -> Result<()> {
        self.send_unit(self.client.post(self.endpoint("/settings")).json(setting))
            .await
    }

    // --- Platform Users ---

    pub async fn list_users(&self, query: &UserQuery) -> Result<UserPage> {
        self.send_json(self.client.get(self.endpoint("/users")).query(query))
            .await
    }

    pub async fn set_user_status(&self, id: &str, is_active: bool) -> Result<UserAccount> {
        self.send_json(
            self.client
                .patch(self.endpoint(&format!("/users/{id}/status")))
                .json(&UserStatusRequest { is_active }),
        )
        .await
    }

    // --- Creators ---

    pub async fn set_creator_verification(
        &self,
        id: &str,
        request: &CreatorVerificationRequest,
    ) -> Result<()> {
        self.send_unit(
            self.client
                .patch(self.endpoint(&format!("/creators/{id}/verification")))
                .json(request),
        )
        .await
    }
}

/// intercept_failure
///
/// The centralized unauthorized interceptor, applied to every failed
/// authenticated response: a 401 clears the persisted session and surfaces
/// `SessionExpired`, uniformly, wherever the call originated; any other
/// failure surfaces the backend's `message` when present and leaves the
/// session untouched. Factored out of the transport layer so the dispatch
/// rule is testable without a live backend.
pub fn intercept_failure(status: StatusCode, body: &str, session: &dyn SessionStore) -> AdminError {
    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!("backend answered 401, invalidating stored session");
        session.clear();
        return AdminError::SessionExpired;
    }

    AdminError::ServerRejected {
        status: status.as_u16(),
        message: extract_message(body),
    }
}

/// admit_login
///
/// Gate applied to a successful login response before the session is accepted:
/// only admin-grade roles may operate the console. Pure function, so the rule
/// is testable without a live backend.
pub fn admit_login(response: LoginResponse) -> Result<Session> {
    if !response.user.role.is_admin_grade() {
        return Err(AdminError::AuthorizationDenied);
    }

    Ok(Session {
        token: response.token,
        user: response.user,
    })
}

/// extract_message
///
/// Pulls the backend's `message` field out of an error body, falling back to
/// the raw body (or a placeholder) when the body is not the expected JSON.
pub fn extract_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => "no error detail provided".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
