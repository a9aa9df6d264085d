use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use campus_core::DomainError;

/// Role assigned to a user account.
///
/// Roles are a closed set. The wire names (`"super_admin"`, `"secretaria"`, ...)
/// are the values stored by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Secretaria,
    Professor,
    Aluno,
    Coordenador,
    SuperAdmin,
    Tecnico,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::Admin,
        Role::Secretaria,
        Role::Professor,
        Role::Aluno,
        Role::Coordenador,
        Role::SuperAdmin,
        Role::Tecnico,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Secretaria => "secretaria",
            Role::Professor => "professor",
            Role::Aluno => "aluno",
            Role::Coordenador => "coordenador",
            Role::SuperAdmin => "super_admin",
            Role::Tecnico => "tecnico",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| DomainError::unknown("role", s))
    }
}

/// Parse role names as delivered by the directory.
///
/// Unknown names are skipped and returned separately so the caller can log them;
/// they never grant anything.
pub fn parse_role_names<I, S>(names: I) -> (BTreeSet<Role>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut roles = BTreeSet::new();
    let mut unknown = Vec::new();

    for name in names {
        let name = name.as_ref().trim();
        match name.parse::<Role>() {
            Ok(role) => {
                roles.insert(role);
            }
            Err(_) => unknown.push(name.to_string()),
        }
    }

    (roles, unknown)
}
