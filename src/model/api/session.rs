use serde::Serialize;

use crate::model::{api::member::MemberDescription, db::member::Member};

/// A link in the site's sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub name: &'static str,
    pub path: &'static str,
    /// Whether the page being viewed is this one.
    pub selected: bool,
}

const MEMBER_PAGES: [(&str, &str); 4] = [
    ("Home", "/home"),
    ("Members", "/members"),
    ("Elections", "/elections"),
    ("Dues", "/dues"),
];

const ADMIN_PAGES: [(&str, &str); 2] = [("Admin", "/admin"), ("Admin Dues", "/admindues")];

/// Build the sidebar for a member viewing the page at `current`.
/// Administrators get the admin pages too.
pub fn sidebar(admin: bool, current: &str) -> Vec<NavEntry> {
    let admin_pages: &[(&'static str, &'static str)] = if admin { &ADMIN_PAGES } else { &[] };
    MEMBER_PAGES
        .iter()
        .chain(admin_pages)
        .map(|&(name, path)| NavEntry {
            name,
            path,
            selected: current.contains(path),
        })
        .collect()
}

/// Who is logged in, and what they can navigate to.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub member: MemberDescription,
    pub admin: bool,
    pub sidebar: Vec<NavEntry>,
}

impl SessionInfo {
    pub fn new(member: &Member, current: &str) -> Self {
        Self {
            member: member.into(),
            admin: member.admin,
            sidebar: sidebar(member.admin, current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[NavEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.name).collect()
    }

    #[test]
    fn members_see_member_pages() {
        let entries = sidebar(false, "/home");
        assert_eq!(names(&entries), ["Home", "Members", "Elections", "Dues"]);
    }

    #[test]
    fn admins_see_admin_pages() {
        let entries = sidebar(true, "/home");
        assert_eq!(
            names(&entries),
            ["Home", "Members", "Elections", "Dues", "Admin", "Admin Dues"]
        );
    }

    #[test]
    fn current_page_is_selected() {
        let entries = sidebar(false, "/members/alice");
        let selected: Vec<_> = entries.iter().filter(|e| e.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Members");
    }

    #[test]
    fn unknown_page_selects_nothing() {
        assert!(sidebar(true, "/").iter().all(|e| !e.selected));
    }
}
