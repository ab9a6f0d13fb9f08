use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::member::Member};

/// An admin's request to add a new member. The password is in plaintext and
/// is hashed before storage.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewMemberRequest {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub starving: bool,
}

/// A member's edits to a profile. The password is only changed if both
/// password fields are present and non-empty.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

impl ProfileUpdate {
    /// The current and new password, if the member asked to change it.
    pub fn password_change(&self) -> Option<(&str, &str)> {
        match (self.current_password.as_deref(), self.new_password.as_deref()) {
            (Some(current), Some(new)) if !current.is_empty() && !new.is_empty() => {
                Some((current, new))
            }
            _ => None,
        }
    }
}

/// An API-friendly view of a member, without the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDescription {
    pub id: ApiId,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub starving: bool,
    pub admin: bool,
    pub active: bool,
    pub password_expired: bool,
}

impl From<&Member> for MemberDescription {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.into(),
            username: member.username.clone(),
            firstname: member.firstname.clone(),
            lastname: member.lastname.clone(),
            email: member.email.clone(),
            starving: member.starving,
            admin: member.admin,
            active: member.active,
            password_expired: member.password_expired,
        }
    }
}

impl From<Member> for MemberDescription {
    fn from(member: Member) -> Self {
        (&member).into()
    }
}

/// A member's profile page.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub member: MemberDescription,
    /// Whether the viewer may edit this profile: it is their own, or they are an admin.
    pub can_edit: bool,
}

/// Dues status of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuesStatus {
    pub username: String,
    pub starving: bool,
    /// Monthly dues in cents.
    pub monthly_rate: u32,
    /// When the paid period runs out: local midnight after the last covered day.
    pub paid_through: Option<DateTime<Utc>>,
    pub paid_up: bool,
}

impl DuesStatus {
    pub fn new(member: &Member, monthly_rate: u32, now: DateTime<Utc>) -> Self {
        Self {
            username: member.username.clone(),
            starving: member.starving,
            monthly_rate,
            paid_through: member.paid_through(),
            paid_up: member.dues_paid_at(now),
        }
    }
}

/// An admin's record of a dues payment.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DuesPayment {
    /// `MM/DD/YYYY`, the last day covered by the payment.
    pub paid_through: String,
}


#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, TimeZone};
    use mongodb::bson::DateTime as BsonDateTime;

    use super::*;
    use crate::model::{common::date::parse_end_of_date, db::member::MemberCore, mongodb::Id};

    #[test]
    fn password_change_needs_both_fields() {
        let mut update = ProfileUpdate::example();
        assert_eq!(update.password_change(), None);

        update.current_password = Some("old password".into());
        assert_eq!(update.password_change(), None);

        update.new_password = Some(String::new());
        assert_eq!(update.password_change(), None);

        update.new_password = Some("new password".into());
        assert_eq!(
            update.password_change(),
            Some(("old password", "new password"))
        );
    }

    #[test]
    fn description_hides_password() {
        let member = Member {
            id: Id::new(),
            member: MemberCore::example(),
        };
        let description = MemberDescription::from(&member);
        let json = rocket::serde::json::serde_json::to_string(&description).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains(&member.password_hash));
        assert_eq!(description.username, "alice");
    }

    #[test]
    fn dues_status_reports_payment() {
        let now = Utc::now();
        let mut member = Member {
            id: Id::new(),
            member: MemberCore::example2(),
        };
        member.dues_paid_through = Some(BsonDateTime::from_chrono(now + Duration::days(10)));

        let status = DuesStatus::new(&member, 2500, now);
        assert!(status.starving);
        assert!(status.paid_up);
        assert_eq!(status.monthly_rate, 2500);
        assert!(status.paid_through.is_some());
    }

    #[test]
    fn paid_up_for_the_whole_last_day() {
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let end = parse_end_of_date("03/14/2024", eastern).unwrap();
        let mut member = Member {
            id: Id::new(),
            member: MemberCore::example(),
        };
        member.dues_paid_through = Some(BsonDateTime::from_chrono(end));

        // Noon on the 14th, local time.
        let noon = Utc.with_ymd_and_hms(2024, 3, 14, 17, 0, 0).unwrap();
        assert!(DuesStatus::new(&member, 5000, noon).paid_up);
        // One second before local midnight.
        let last_second = Utc.with_ymd_and_hms(2024, 3, 15, 4, 59, 59).unwrap();
        assert!(DuesStatus::new(&member, 5000, last_second).paid_up);
        // Midnight starting the 15th.
        let midnight = Utc.with_ymd_and_hms(2024, 3, 15, 5, 0, 0).unwrap();
        assert!(!DuesStatus::new(&member, 5000, midnight).paid_up);
    }
}
