//! Read-only view of the role→permission matrix (role administration screen, audits).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::registry::role_permissions;
use crate::{Permission, Role};

/// Role definition with its granted permissions.
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub role: Role,
    pub description: &'static str,
    pub permissions: Vec<Permission>,
}

/// Permission definition.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub permission: Permission,
    pub category: &'static str,
    pub description: String,
    /// Roles whose row contains this permission.
    pub granted_to: Vec<Role>,
}

/// Complete view of the RBAC matrix.
#[derive(Debug, Clone, Serialize)]
pub struct RbacCatalog {
    pub roles: Vec<RoleDefinition>,
    /// Permissions grouped by resource.
    pub permissions: BTreeMap<&'static str, Vec<PermissionDefinition>>,
}

impl RbacCatalog {
    pub fn build() -> Self {
        let roles = Role::ALL
            .iter()
            .map(|role| RoleDefinition {
                role: *role,
                description: role_description(*role),
                permissions: role_permissions(*role).to_vec(),
            })
            .collect();

        let mut permissions: BTreeMap<&'static str, Vec<PermissionDefinition>> = BTreeMap::new();
        for permission in Permission::ALL {
            permissions
                .entry(permission.resource())
                .or_default()
                .push(PermissionDefinition {
                    permission: *permission,
                    category: permission.resource(),
                    description: permission_description(*permission),
                    granted_to: Role::ALL
                        .iter()
                        .copied()
                        .filter(|r| role_permissions(*r).contains(permission))
                        .collect(),
                });
        }

        Self { roles, permissions }
    }

    pub fn role(&self, role: Role) -> Option<&RoleDefinition> {
        self.roles.iter().find(|d| d.role == role)
    }
}

fn role_description(role: Role) -> &'static str {
    match role {
        Role::SuperAdmin => "Platform operator with access to every institution",
        Role::Admin => "Institution administrator with every institution-level permission",
        Role::Secretaria => "Academic office: enrolment, classes, documents and requests",
        Role::Coordenador => "Course coordination: curricula, classes and grades",
        Role::Professor => "Teaching staff: own classes and grade entry",
        Role::Aluno => "Student self-service: grades, documents and requests",
        Role::Tecnico => "Technical staff account without application permissions",
    }
}

fn permission_description(permission: Permission) -> String {
    let action = match permission.action() {
        "view" => "View",
        "create" => "Create",
        "edit" => "Edit",
        "delete" => "Delete",
        "generate" => "Generate",
        "manage" => "Manage",
        "restore" => "Restore",
        "admin" => "Staff access to",
        "aluno" => "Student access to",
        "settings" => "Configure",
        other => other,
    };
    format!("{} {}", action, permission.resource())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_role_and_permission() {
        let catalog = RbacCatalog::build();
        assert_eq!(catalog.roles.len(), Role::ALL.len());

        let listed: usize = catalog.permissions.values().map(Vec::len).sum();
        assert_eq!(listed, Permission::ALL.len());

        let tecnico = catalog.role(Role::Tecnico).unwrap();
        assert!(tecnico.permissions.is_empty());
    }

    #[test]
    fn permission_entries_know_their_granting_roles() {
        let catalog = RbacCatalog::build();
        let notas = &catalog.permissions["notas"];
        let edit = notas
            .iter()
            .find(|d| d.permission == Permission::NotasEdit)
            .unwrap();
        assert_eq!(edit.description, "Edit notas");
        assert!(edit.granted_to.contains(&Role::Professor));
        assert!(!edit.granted_to.contains(&Role::Secretaria));
    }
}
