use crate::client::AnalysisClient;
use crate::core::AuthorizationError;
use serde::Serialize;

/// Role string that allows retrieving a finished job by reference.
pub const PRIVILEGED_ROLE: &str = "privileged_user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Regular,
    Privileged,
}

impl Role {
    pub fn from_roles<S: AsRef<str>>(roles: &[S]) -> Self {
        if roles.iter().any(|r| r.as_ref() == PRIVILEGED_ROLE) {
            Self::Privileged
        } else {
            Self::Regular
        }
    }

    pub fn can_retrieve_by_reference(&self) -> bool {
        matches!(self, Self::Privileged)
    }
}

/// Pre-flight account check. Runs once, before anything is dispatched.
pub struct AccessPolicyGate;

impl AccessPolicyGate {
    /// Resolves the caller's role from the first user on the account.
    pub async fn authorize(client: &dyn AnalysisClient) -> Result<Role, AuthorizationError> {
        let account = client.lookup_account().await?;
        let user = account.users.first().ok_or(AuthorizationError::NoIdentity)?;
        let role = Role::from_roles(&user.roles);

        tracing::debug!(user = %user.id, ?role, "resolved account role");
        Ok(role)
    }
}
