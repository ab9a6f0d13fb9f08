use rocket::form::FromFormField;
use serde::Serialize;

use crate::model::{
    api::member::MemberDescription,
    common::election::{ElectionKind, Position},
};

/// The tasks on the admin panel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, FromFormField)]
pub enum AdminTask {
    AddMember,
    AddElection,
    ResetPassword,
}

impl AdminTask {
    pub const ALL: [AdminTask; 3] = [
        AdminTask::AddMember,
        AdminTask::AddElection,
        AdminTask::ResetPassword,
    ];

    /// Human-readable task name.
    pub fn title(&self) -> &'static str {
        match self {
            Self::AddMember => "Add Member",
            Self::AddElection => "Add Election",
            Self::ResetPassword => "Reset Password",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskEntry {
    pub task: AdminTask,
    pub title: &'static str,
}

#[derive(Debug, Serialize)]
pub struct KindEntry {
    pub kind: ElectionKind,
    pub title: String,
}

/// Everything the admin panel needs to render the selected task.
#[derive(Debug, Serialize)]
pub struct AdminPanel {
    pub tasks: Vec<TaskEntry>,
    pub task: Option<AdminTask>,
    pub election_kinds: Vec<KindEntry>,
    pub positions: Vec<Position>,
    /// Members whose password can be reset; only for [`AdminTask::ResetPassword`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberDescription>>,
}

impl AdminPanel {
    pub fn new(task: Option<AdminTask>, members: Option<Vec<MemberDescription>>) -> Self {
        Self {
            tasks: AdminTask::ALL
                .iter()
                .map(|&task| TaskEntry {
                    task,
                    title: task.title(),
                })
                .collect(),
            task,
            election_kinds: ElectionKind::ALL
                .iter()
                .map(|&kind| KindEntry {
                    kind,
                    title: kind.to_string(),
                })
                .collect(),
            positions: Position::ALL.to_vec(),
            members,
        }
    }
}
