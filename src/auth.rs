//! Request-scoped authentication and the single role check.

use std::{future::Future, pin::Pin};

use actix_identity::IdentityExt;
use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use serde::Serialize;

use crate::{
    db,
    errors::AppError,
    structs::{Role, User},
    AppState,
};

/// The logged-in user, reloaded from the store on every request so role
/// changes take effect immediately.
#[derive(Serialize, Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn requires(&self, role: Role) -> Result<(), AppError> {
        if self.role.satisfies(role) {
            Ok(())
        } else {
            log::warn!(
                "User {} ({}) denied access requiring {}",
                self.username,
                self.role,
                role
            );
            Err(AppError::Forbidden)
        }
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = req.get_identity();
        let state = req.app_data::<Data<AppState>>().cloned();

        Box::pin(async move {
            let identity = identity.map_err(|_| AppError::Unauthenticated)?;
            let id = identity
                .id()
                .map_err(|e| AppError::IdentityError(e.to_string()))?;
            let Ok(user_id) = id.parse::<i64>() else {
                identity.logout();
                return Err(AppError::Unauthenticated);
            };
            let state = state.ok_or_else(|| {
                log::error!("AppState missing from app data");
                AppError::InternalServerError
            })?;

            match db::get_user_by_id(&state.db_pool, user_id).await? {
                Some(user) => Ok(CurrentUser::from(user)),
                None => {
                    identity.logout();
                    Err(AppError::Unauthenticated)
                }
            }
        })
    }
}

/// A `CurrentUser` that has passed `requires(Role::Admin)`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = CurrentUser::from_request(req, payload);
        Box::pin(async move {
            let user = user.await?;
            user.requires(Role::Admin)?;
            Ok(AdminUser(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: 1,
            username: "clerk".into(),
            role,
        }
    }

    #[test]
    fn requires_admin_rejects_plain_users() {
        assert!(matches!(user(Role::User).requires(Role::Admin), Err(AppError::Forbidden)));
        assert!(user(Role::Admin).requires(Role::Admin).is_ok());
        assert!(user(Role::User).requires(Role::User).is_ok());
    }
}
