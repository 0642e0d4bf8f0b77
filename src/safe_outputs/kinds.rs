// SPDX-License-Identifier: MIT

//! Safe output types and their static properties

use crate::permissions::{PermissionLevel, PermissionScope, Permissions};
use std::fmt;
use std::str::FromStr;

/// A side effect the agent can request through the safe output channel.
/// Declaration order is dispatch order inside each handler category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SafeOutputKind {
    CreateProject,
    UpdateProject,
    CopyProject,
    CreateProjectStatusUpdate,
    CreateIssue,
    CreateDiscussion,
    AddComment,
    UpdateIssue,
    CloseIssue,
    AddLabels,
    CreatePullRequestReviewComment,
    CreateCodeScanningAlert,
    MissingTool,
    Noop,
    CreatePullRequest,
    PushToPullRequestBranch,
    UploadAsset,
}

/// Which step of the consolidated job executes a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerCategory {
    /// Runs in the privileged project handler before everything else
    Project,
    /// Runs in the shared handler manager
    Message,
    /// Needs a checked out working tree and runs in its own step
    WorkingTree,
}

impl SafeOutputKind {
    pub const ALL: [SafeOutputKind; 17] = [
        SafeOutputKind::CreateProject,
        SafeOutputKind::UpdateProject,
        SafeOutputKind::CopyProject,
        SafeOutputKind::CreateProjectStatusUpdate,
        SafeOutputKind::CreateIssue,
        SafeOutputKind::CreateDiscussion,
        SafeOutputKind::AddComment,
        SafeOutputKind::UpdateIssue,
        SafeOutputKind::CloseIssue,
        SafeOutputKind::AddLabels,
        SafeOutputKind::CreatePullRequestReviewComment,
        SafeOutputKind::CreateCodeScanningAlert,
        SafeOutputKind::MissingTool,
        SafeOutputKind::Noop,
        SafeOutputKind::CreatePullRequest,
        SafeOutputKind::PushToPullRequestBranch,
        SafeOutputKind::UploadAsset,
    ];

    /// Key under `safe-outputs:` in the frontmatter
    pub fn config_key(&self) -> &'static str {
        match self {
            SafeOutputKind::CreateProject => "create-project",
            SafeOutputKind::UpdateProject => "update-project",
            SafeOutputKind::CopyProject => "copy-project",
            SafeOutputKind::CreateProjectStatusUpdate => "create-project-status-update",
            SafeOutputKind::CreateIssue => "create-issue",
            SafeOutputKind::CreateDiscussion => "create-discussion",
            SafeOutputKind::AddComment => "add-comment",
            SafeOutputKind::UpdateIssue => "update-issue",
            SafeOutputKind::CloseIssue => "close-issue",
            SafeOutputKind::AddLabels => "add-labels",
            SafeOutputKind::CreatePullRequestReviewComment => "create-pull-request-review-comment",
            SafeOutputKind::CreateCodeScanningAlert => "create-code-scanning-alert",
            SafeOutputKind::MissingTool => "missing-tool",
            SafeOutputKind::Noop => "noop",
            SafeOutputKind::CreatePullRequest => "create-pull-request",
            SafeOutputKind::PushToPullRequestBranch => "push-to-pull-request-branch",
            SafeOutputKind::UploadAsset => "upload-asset",
        }
    }

    /// Name the agent reports in its `output_types` output
    pub fn output_type(&self) -> String {
        self.config_key().replace('-', "_")
    }

    /// Maximum number of items processed when the config has no `max`.
    /// Zero means unlimited.
    pub fn default_max(&self) -> u32 {
        match self {
            SafeOutputKind::AddLabels => 3,
            SafeOutputKind::CreatePullRequestReviewComment => 10,
            SafeOutputKind::UpdateProject => 10,
            SafeOutputKind::UploadAsset => 10,
            SafeOutputKind::CreateCodeScanningAlert | SafeOutputKind::MissingTool => 0,
            _ => 1,
        }
    }

    pub fn category(&self) -> HandlerCategory {
        match self {
            SafeOutputKind::CreateProject
            | SafeOutputKind::UpdateProject
            | SafeOutputKind::CopyProject
            | SafeOutputKind::CreateProjectStatusUpdate => HandlerCategory::Project,
            SafeOutputKind::CreatePullRequest
            | SafeOutputKind::PushToPullRequestBranch
            | SafeOutputKind::UploadAsset => HandlerCategory::WorkingTree,
            _ => HandlerCategory::Message,
        }
    }

    pub fn requires_working_tree(&self) -> bool {
        self.category() == HandlerCategory::WorkingTree
    }

    pub fn is_project(&self) -> bool {
        self.category() == HandlerCategory::Project
    }

    /// Token grants the consolidated job needs to execute this kind
    pub fn permissions(&self) -> Permissions {
        use PermissionLevel::{Read, Write};
        use PermissionScope::*;

        match self {
            SafeOutputKind::CreateIssue
            | SafeOutputKind::UpdateIssue
            | SafeOutputKind::CloseIssue => {
                Permissions::from_scopes([(Contents, Read), (Issues, Write)])
            }
            SafeOutputKind::CreateDiscussion => {
                Permissions::from_scopes([(Contents, Read), (Discussions, Write)])
            }
            SafeOutputKind::AddComment => Permissions::from_scopes([
                (Contents, Read),
                (Issues, Write),
                (PullRequests, Write),
                (Discussions, Write),
            ]),
            SafeOutputKind::AddLabels => Permissions::from_scopes([
                (Contents, Read),
                (Issues, Write),
                (PullRequests, Write),
            ]),
            SafeOutputKind::CreatePullRequestReviewComment => {
                Permissions::from_scopes([(Contents, Read), (PullRequests, Write)])
            }
            SafeOutputKind::CreateCodeScanningAlert => Permissions::from_scopes([
                (Contents, Read),
                (SecurityEvents, Write),
                (Actions, Read),
            ]),
            SafeOutputKind::CreatePullRequest => Permissions::from_scopes([
                (Contents, Write),
                (Issues, Write),
                (PullRequests, Write),
            ]),
            SafeOutputKind::PushToPullRequestBranch => {
                Permissions::from_scopes([(Contents, Write), (PullRequests, Write)])
            }
            SafeOutputKind::UploadAsset => Permissions::from_scopes([(Contents, Write)]),
            // project kinds act through their own token
            SafeOutputKind::CreateProject
            | SafeOutputKind::UpdateProject
            | SafeOutputKind::CopyProject
            | SafeOutputKind::CreateProjectStatusUpdate
            | SafeOutputKind::MissingTool
            | SafeOutputKind::Noop => Permissions::contents_read(),
        }
    }

    /// Step id of the dedicated step for working tree kinds
    pub fn step_id(&self) -> String {
        self.output_type()
    }
}

impl fmt::Display for SafeOutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

impl FromStr for SafeOutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SafeOutputKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.config_key() == s)
            .ok_or_else(|| format!("unknown safe output type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_key_round_trip() {
        for kind in SafeOutputKind::ALL {
            assert_eq!(kind.config_key().parse::<SafeOutputKind>().unwrap(), kind);
        }
        assert!("create-tweet".parse::<SafeOutputKind>().is_err());
    }

    #[test]
    fn test_output_type_uses_underscores() {
        assert_eq!(SafeOutputKind::CreatePullRequest.output_type(), "create_pull_request");
        assert_eq!(SafeOutputKind::Noop.output_type(), "noop");
    }

    #[test]
    fn test_categories() {
        assert!(SafeOutputKind::CreateProject.is_project());
        assert!(SafeOutputKind::CreateProjectStatusUpdate.is_project());
        assert!(SafeOutputKind::PushToPullRequestBranch.requires_working_tree());
        assert_eq!(SafeOutputKind::AddComment.category(), HandlerCategory::Message);
    }

    #[test]
    fn test_working_tree_kinds_need_contents_write() {
        for kind in SafeOutputKind::ALL {
            if kind.requires_working_tree() {
                assert_eq!(
                    kind.permissions().get(PermissionScope::Contents),
                    Some(PermissionLevel::Write),
                    "{}",
                    kind
                );
            }
        }
    }

    #[test]
    fn test_all_is_sorted_in_dispatch_order() {
        let mut sorted = SafeOutputKind::ALL;
        sorted.sort();
        assert_eq!(sorted, SafeOutputKind::ALL);
    }
}
