// Project lifecycle: status table, viewer roles and permitted actions

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProjectStatus {
    Open,
    Assigned,
    InProgress,
    Review,
    Revision,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 6] = [
        ProjectStatus::Open,
        ProjectStatus::Assigned,
        ProjectStatus::InProgress,
        ProjectStatus::Review,
        ProjectStatus::Revision,
        ProjectStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Open => "open",
            ProjectStatus::Assigned => "assigned",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Review => "review",
            ProjectStatus::Revision => "revision",
            ProjectStatus::Completed => "completed",
        }
    }

    pub fn successors(self) -> &'static [ProjectStatus] {
        match self {
            ProjectStatus::Open => &[ProjectStatus::Assigned],
            ProjectStatus::Assigned => &[ProjectStatus::InProgress],
            ProjectStatus::InProgress => &[ProjectStatus::Review],
            ProjectStatus::Review => &[ProjectStatus::Completed, ProjectStatus::Revision],
            ProjectStatus::Revision => &[ProjectStatus::Review],
            ProjectStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    pub fn has_freelancer(self) -> bool {
        self != ProjectStatus::Open
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown project status '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Client,
    Freelancer,
    Other,
}

impl ViewerRole {
    pub fn of(viewer_id: &str, client_id: &str, freelancer_id: Option<&str>) -> Self {
        if viewer_id == client_id {
            ViewerRole::Client
        } else if freelancer_id == Some(viewer_id) {
            ViewerRole::Freelancer
        } else {
            ViewerRole::Other
        }
    }
}

impl fmt::Display for ViewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewerRole::Client => "client",
            ViewerRole::Freelancer => "freelancer",
            ViewerRole::Other => "other",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    StartWork,
    SubmitWork,
    ResubmitWork,
    Approve,
    RequestRevision,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 5] = [
        LifecycleAction::StartWork,
        LifecycleAction::SubmitWork,
        LifecycleAction::ResubmitWork,
        LifecycleAction::Approve,
        LifecycleAction::RequestRevision,
    ];

    pub fn from_status(self) -> ProjectStatus {
        match self {
            LifecycleAction::StartWork => ProjectStatus::Assigned,
            LifecycleAction::SubmitWork => ProjectStatus::InProgress,
            LifecycleAction::ResubmitWork => ProjectStatus::Revision,
            LifecycleAction::Approve | LifecycleAction::RequestRevision => ProjectStatus::Review,
        }
    }

    pub fn target(self) -> ProjectStatus {
        match self {
            LifecycleAction::StartWork => ProjectStatus::InProgress,
            LifecycleAction::SubmitWork | LifecycleAction::ResubmitWork => ProjectStatus::Review,
            LifecycleAction::Approve => ProjectStatus::Completed,
            LifecycleAction::RequestRevision => ProjectStatus::Revision,
        }
    }

    pub fn actor(self) -> ViewerRole {
        match self {
            LifecycleAction::StartWork
            | LifecycleAction::SubmitWork
            | LifecycleAction::ResubmitWork => ViewerRole::Freelancer,
            LifecycleAction::Approve | LifecycleAction::RequestRevision => ViewerRole::Client,
        }
    }

    pub fn requires_note(self) -> bool {
        self == LifecycleAction::RequestRevision
    }

    // open -> assigned has none; it only happens by accepting an application.
    pub fn for_transition(from: ProjectStatus, to: ProjectStatus) -> Option<Self> {
        LifecycleAction::ALL
            .into_iter()
            .find(|action| action.from_status() == from && action.target() == to)
    }
}

pub fn permitted_actions(status: ProjectStatus, role: ViewerRole) -> BTreeSet<LifecycleAction> {
    LifecycleAction::ALL
        .into_iter()
        .filter(|action| action.from_status() == status && action.actor() == role)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Cannot move a project from '{from}' to '{to}'")]
    NotAllowed {
        from: ProjectStatus,
        to: ProjectStatus,
    },

    #[error("A project is assigned by accepting one of its applications")]
    AcceptanceOnly,

    #[error("Only the project's {expected} can do this")]
    WrongRole { expected: ViewerRole },

    #[error("A note describing the requested changes is required")]
    NoteRequired,
}

pub fn check_transition(
    from: ProjectStatus,
    to: ProjectStatus,
    role: ViewerRole,
    note: Option<&str>,
) -> Result<LifecycleAction, TransitionError> {
    if !from.can_transition_to(to) {
        return Err(TransitionError::NotAllowed { from, to });
    }

    let action = LifecycleAction::for_transition(from, to).ok_or(TransitionError::AcceptanceOnly)?;

    if action.actor() != role {
        return Err(TransitionError::WrongRole {
            expected: action.actor(),
        });
    }

    if action.requires_note() && note.map_or(true, |n| n.trim().is_empty()) {
        return Err(TransitionError::NoteRequired);
    }

    Ok(action)
}
