use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, Entity, PositionId, TenantId};

use crate::modules::AllowedModules;
use crate::permissions::PermissionSet;

/// Breadth of records a position's holder may see or act upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataScope {
    All,
    Project,
    Group,
    #[serde(rename = "self")]
    SelfOnly,
}

impl DataScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataScope::All => "all",
            DataScope::Project => "project",
            DataScope::Group => "group",
            DataScope::SelfOnly => "self",
        }
    }

    /// Rank used to compare scopes: `all > project > group > self`.
    pub fn breadth(self) -> u8 {
        match self {
            DataScope::All => 3,
            DataScope::Project => 2,
            DataScope::Group => 1,
            DataScope::SelfOnly => 0,
        }
    }

    pub fn is_at_least(self, other: DataScope) -> bool {
        self.breadth() >= other.breadth()
    }
}

impl core::fmt::Display for DataScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organisational tier of a position. Display-only; never consulted for access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PositionLevel {
    Headquarters = 1,
    Project = 2,
    Group = 3,
}

impl TryFrom<u8> for PositionLevel {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Headquarters),
            2 => Ok(Self::Project),
            3 => Ok(Self::Group),
            other => Err(DomainError::validation(format!(
                "position level must be 1, 2 or 3 (got {other})"
            ))),
        }
    }
}

impl From<PositionLevel> for u8 {
    fn from(value: PositionLevel) -> Self {
        value as u8
    }
}

/// A job-role template in the permission catalog.
///
/// Shared by every employee assigned to it. The engine only reads positions;
/// editing them is ordinary administration outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: PositionId,
    pub tenant_id: TenantId,
    pub code: String,
    pub name: String,
    pub level: PositionLevel,
    /// Informational tag (finance, hr, admin, ...).
    #[serde(default)]
    pub function_role: Option<String>,
    pub data_scope: DataScope,
    #[serde(default)]
    pub can_manage_subordinates: bool,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub allowed_modules: AllowedModules,
}

impl Entity for Position {
    type Id = PositionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
