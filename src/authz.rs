use uuid::Uuid;

use crate::{
    auth::{jwt::AuthUser, repo::Role},
    error::ApiError,
};

/// The one ownership rule used by every mutating operation: the actor owns
/// the resource or holds the admin role.
pub fn owner_or_admin(actor: &AuthUser, owner_id: Uuid) -> bool {
    actor.id == owner_id || actor.role == Role::Admin
}

pub fn require_owner_or_admin(
    actor: &AuthUser,
    owner_id: Uuid,
    message: &str,
) -> Result<(), ApiError> {
    if owner_or_admin(actor, owner_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message.into()))
    }
}

pub fn require_role(actor: &AuthUser, role: Role) -> Result<(), ApiError> {
    if actor.role == role || actor.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Forbidden - insufficient permissions".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn owner_may_mutate() {
        let a = actor(Role::Customer);
        assert!(owner_or_admin(&a, a.id));
    }

    #[test]
    fn admin_may_mutate_anything() {
        let a = actor(Role::Admin);
        assert!(owner_or_admin(&a, Uuid::new_v4()));
    }

    #[test]
    fn stranger_is_rejected() {
        let a = actor(Role::Restaurant);
        assert!(!owner_or_admin(&a, Uuid::new_v4()));
        assert!(require_owner_or_admin(&a, Uuid::new_v4(), "no").is_err());
    }

    #[test]
    fn role_gate_admits_admin() {
        assert!(require_role(&actor(Role::Delivery), Role::Delivery).is_ok());
        assert!(require_role(&actor(Role::Admin), Role::Delivery).is_ok());
        assert!(require_role(&actor(Role::Customer), Role::Delivery).is_err());
    }
}
