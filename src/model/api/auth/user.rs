use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::db::member::{Member, MemberCore};

/// A kind of user of our application, having defined rights.
pub trait User {
    /// The rights needed to act as this kind of user.
    const RIGHTS: Rights;
}

/// Different privilege levels. Higher levels include the lower ones.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Member = 0,
    Admin = 1,
}

impl Rights {
    /// The rights a member currently holds.
    pub fn of(member: &MemberCore) -> Self {
        if member.admin {
            Self::Admin
        } else {
            Self::Member
        }
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Member => "member",
                Self::Admin => "admin",
            }
        )
    }
}

/// Marker for routes that only administrators may use.
pub struct Admin;

impl User for Member {
    const RIGHTS: Rights = Rights::Member;
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_includes_member() {
        assert!(Rights::Admin >= Rights::Member);
        assert!(Rights::Member < Rights::Admin);
    }

    #[test]
    fn rights_follow_admin_flag() {
        assert_eq!(Rights::of(&MemberCore::example()), Rights::Member);
        assert_eq!(Rights::of(&MemberCore::admin_example()), Rights::Admin);
    }
}
