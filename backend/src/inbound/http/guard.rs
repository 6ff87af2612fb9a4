//! Request guards composing the session with role-based access control.
//!
//! Handlers call these explicitly at the top of each protected operation so
//! the authorisation requirements are visible at the call site.

use crate::domain::{AccessControl, AccessError, Error, Role, User};
use crate::inbound::http::session::SessionContext;

/// Resolve the session to a user whose role is in `allowed_roles`.
///
/// Authenticates first and authorises second; the first failure wins. When
/// the session references a user that no longer exists the session is cleared
/// before the denial is returned.
pub async fn require_roles(
    access: &AccessControl,
    session: &SessionContext,
    allowed_roles: &[Role],
) -> Result<User, Error> {
    let session_user = session.user_id()?;
    match access.require_any(session_user, allowed_roles).await {
        Ok(user) => Ok(user),
        Err(AccessError::StaleSession) => {
            session.clear();
            Err(AccessError::StaleSession.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Resolve the session to any authenticated user, regardless of role.
pub async fn require_user(
    access: &AccessControl,
    session: &SessionContext,
) -> Result<User, Error> {
    let session_user = session.user_id()?;
    match access.authenticate(session_user).await {
        Ok(user) => Ok(user),
        Err(AccessError::StaleSession) => {
            session.clear();
            Err(AccessError::StaleSession.into())
        }
        Err(err) => Err(err.into()),
    }
}
