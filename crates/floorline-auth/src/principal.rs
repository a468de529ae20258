use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    Manager,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
        }
    }

    pub fn parse(value: &str) -> AuthResult<Self> {
        match value {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            other => Err(AuthError::Forbidden(format!("unknown staff role {other}"))),
        }
    }
}

/// The five request principals. One request resolves to exactly one.
#[derive(Clone, Debug, PartialEq)]
pub enum Principal {
    Anonymous { session_id: Option<String> },
    Customer { customer_id: Uuid, email: String },
    Trade { trade_customer_id: Uuid, email: String },
    Rep { rep_id: Uuid, email: String },
    Staff { staff_id: Uuid, role: StaffRole },
}

impl Principal {
    pub fn staff_role(&self) -> Option<StaffRole> {
        match self {
            Self::Staff { role, .. } => Some(*role),
            _ => None,
        }
    }

    /// Role gate for staff routes. Managers may hold most routes but are
    /// never allowed to administer admin accounts; that narrower rule is
    /// enforced where staff accounts are mutated.
    pub fn require_staff_role(&self, allowed: &[StaffRole]) -> AuthResult<Uuid> {
        match self {
            Self::Staff { staff_id, role } if allowed.contains(role) => Ok(*staff_id),
            Self::Staff { .. } => Err(AuthError::Forbidden(
                "insufficient role for this route".into(),
            )),
            _ => Err(AuthError::InvalidSession),
        }
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        match self {
            Self::Anonymous { .. } => None,
            Self::Customer { customer_id, .. } => Some(*customer_id),
            Self::Trade {
                trade_customer_id, ..
            } => Some(*trade_customer_id),
            Self::Rep { rep_id, .. } => Some(*rep_id),
            Self::Staff { staff_id, .. } => Some(*staff_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_fails_admin_only_gate() {
        let principal = Principal::Staff {
            staff_id: Uuid::new_v4(),
            role: StaffRole::Manager,
        };
        assert!(principal.require_staff_role(&[StaffRole::Admin]).is_err());
        assert!(principal
            .require_staff_role(&[StaffRole::Admin, StaffRole::Manager])
            .is_ok());
    }

    #[test]
    fn non_staff_is_unauthenticated_not_forbidden() {
        let principal = Principal::Anonymous { session_id: None };
        let err = principal
            .require_staff_role(&[StaffRole::Admin])
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSession));
    }
}
