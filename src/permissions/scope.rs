// SPDX-License-Identifier: MIT

//! Permission scopes, levels and shorthands

use std::fmt;
use std::str::FromStr;

/// A permission scope of the CI token.
/// Declared in alphabetical order so ordered maps render sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionScope {
    Actions,
    Attestations,
    Checks,
    Contents,
    Deployments,
    Discussions,
    IdToken,
    Issues,
    Metadata,
    Models,
    OrganizationPackages,
    OrganizationProjects,
    Packages,
    Pages,
    PullRequests,
    RepositoryProjects,
    SecurityEvents,
    Statuses,
}

impl PermissionScope {
    /// Every scope, in rendering order
    pub const ALL: [PermissionScope; 18] = [
        PermissionScope::Actions,
        PermissionScope::Attestations,
        PermissionScope::Checks,
        PermissionScope::Contents,
        PermissionScope::Deployments,
        PermissionScope::Discussions,
        PermissionScope::IdToken,
        PermissionScope::Issues,
        PermissionScope::Metadata,
        PermissionScope::Models,
        PermissionScope::OrganizationPackages,
        PermissionScope::OrganizationProjects,
        PermissionScope::Packages,
        PermissionScope::Pages,
        PermissionScope::PullRequests,
        PermissionScope::RepositoryProjects,
        PermissionScope::SecurityEvents,
        PermissionScope::Statuses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionScope::Actions => "actions",
            PermissionScope::Attestations => "attestations",
            PermissionScope::Checks => "checks",
            PermissionScope::Contents => "contents",
            PermissionScope::Deployments => "deployments",
            PermissionScope::Discussions => "discussions",
            PermissionScope::IdToken => "id-token",
            PermissionScope::Issues => "issues",
            PermissionScope::Metadata => "metadata",
            PermissionScope::Models => "models",
            PermissionScope::OrganizationPackages => "organization-packages",
            PermissionScope::OrganizationProjects => "organization-projects",
            PermissionScope::Packages => "packages",
            PermissionScope::Pages => "pages",
            PermissionScope::PullRequests => "pull-requests",
            PermissionScope::RepositoryProjects => "repository-projects",
            PermissionScope::SecurityEvents => "security-events",
            PermissionScope::Statuses => "statuses",
        }
    }

    /// `id-token` has no read level
    pub fn supports_read(&self) -> bool {
        !matches!(self, PermissionScope::IdToken)
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionScope::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| format!("unknown permission scope: {}", s))
    }
}

/// Access level for a single scope, ordered `none < read < write`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionLevel {
    None,
    Read,
    Write,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PermissionLevel::None),
            "read" => Ok(PermissionLevel::Read),
            "write" => Ok(PermissionLevel::Write),
            other => Err(format!("unknown permission level: {}", other)),
        }
    }
}

/// Shorthand granting every scope at once, ordered `none < read-all < write-all`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionShorthand {
    None,
    ReadAll,
    WriteAll,
}

impl PermissionShorthand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionShorthand::None => "none",
            PermissionShorthand::ReadAll => "read-all",
            PermissionShorthand::WriteAll => "write-all",
        }
    }

    /// Level the shorthand grants to every scope
    pub fn level(&self) -> PermissionLevel {
        match self {
            PermissionShorthand::None => PermissionLevel::None,
            PermissionShorthand::ReadAll => PermissionLevel::Read,
            PermissionShorthand::WriteAll => PermissionLevel::Write,
        }
    }

    /// Level the shorthand grants to `scope`; `None` when the scope
    /// cannot hold that level
    pub fn level_for(&self, scope: PermissionScope) -> Option<PermissionLevel> {
        let level = self.level();
        if level == PermissionLevel::Read && !scope.supports_read() {
            return None;
        }
        Some(level)
    }
}

impl fmt::Display for PermissionShorthand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionShorthand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PermissionShorthand::None),
            "read-all" => Ok(PermissionShorthand::ReadAll),
            "write-all" => Ok(PermissionShorthand::WriteAll),
            other => Err(format!("unknown permission shorthand: {}", other)),
        }
    }
}
