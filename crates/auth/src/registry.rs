//! Static role→permission matrix and its evaluation.
//!
//! - No IO
//! - No panics
//! - Permissions are additive across roles: no deny rules, no hierarchy

use std::collections::BTreeSet;

use crate::{Permission, Role};

use Permission::*;

const ADMIN: &[Permission] = &[
    DashboardAdmin,
    DashboardAluno,
    AlunosView,
    AlunosCreate,
    AlunosEdit,
    AlunosDelete,
    CursosView,
    CursosCreate,
    CursosEdit,
    CursosDelete,
    DisciplinasView,
    DisciplinasCreate,
    DisciplinasEdit,
    DisciplinasDelete,
    TurmasView,
    TurmasCreate,
    TurmasEdit,
    TurmasDelete,
    NotasView,
    NotasEdit,
    DocumentosView,
    DocumentosGenerate,
    RequerimentosView,
    RequerimentosCreate,
    RequerimentosManage,
    UsersView,
    UsersCreate,
    UsersEdit,
    UsersDelete,
    AuditView,
    RelatoriosView,
    LixeiraView,
    LixeiraRestore,
    InstitutionSettings,
];

const SECRETARIA: &[Permission] = &[
    DashboardAdmin,
    AlunosView,
    AlunosCreate,
    AlunosEdit,
    AlunosDelete,
    CursosView,
    DisciplinasView,
    TurmasView,
    TurmasCreate,
    TurmasEdit,
    TurmasDelete,
    NotasView,
    DocumentosView,
    DocumentosGenerate,
    RequerimentosView,
    RequerimentosCreate,
    RequerimentosManage,
    RelatoriosView,
    LixeiraView,
];

const COORDENADOR: &[Permission] = &[
    DashboardAdmin,
    AlunosView,
    CursosView,
    CursosCreate,
    CursosEdit,
    CursosDelete,
    DisciplinasView,
    DisciplinasCreate,
    DisciplinasEdit,
    DisciplinasDelete,
    TurmasView,
    TurmasCreate,
    TurmasEdit,
    TurmasDelete,
    NotasView,
    NotasEdit,
    RequerimentosView,
    RequerimentosManage,
    RelatoriosView,
];

const PROFESSOR: &[Permission] = &[
    DashboardAdmin,
    AlunosView,
    DisciplinasView,
    TurmasView,
    NotasView,
    NotasEdit,
];

const ALUNO: &[Permission] = &[
    DashboardAluno,
    NotasView,
    DocumentosView,
    RequerimentosView,
    RequerimentosCreate,
];

/// The matrix row for a single role.
///
/// The `match` is exhaustive, so a new `Role` variant does not compile until it
/// is given a row. `Tecnico` is deliberately mapped to nothing.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::SuperAdmin => Permission::ALL,
        Role::Admin => ADMIN,
        Role::Secretaria => SECRETARIA,
        Role::Coordenador => COORDENADOR,
        Role::Professor => PROFESSOR,
        Role::Aluno => ALUNO,
        Role::Tecnico => &[],
    }
}

/// True iff any of `roles` grants `permission`.
///
/// This is the single gating check; route guards and action handlers call it
/// directly. An empty role set never grants anything.
pub fn has_permission<'a, I>(roles: I, permission: Permission) -> bool
where
    I: IntoIterator<Item = &'a Role>,
{
    roles
        .into_iter()
        .any(|role| role_permissions(*role).contains(&permission))
}

/// Union of the permissions granted by `roles`.
///
/// Meant for computing UI affordances (which buttons to show), not for gating.
pub fn permissions_of<'a, I>(roles: I) -> BTreeSet<Permission>
where
    I: IntoIterator<Item = &'a Role>,
{
    roles
        .into_iter()
        .flat_map(|role| role_permissions(*role).iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(roles: &[Role]) -> BTreeSet<Role> {
        roles.iter().copied().collect()
    }

    #[test]
    fn fixture_expectations() {
        assert!(has_permission(&set(&[Role::Professor]), NotasEdit));
        assert!(!has_permission(&set(&[Role::Aluno]), NotasEdit));
        assert!(has_permission(&set(&[Role::Admin]), AuditView));
        assert!(!has_permission(&set(&[Role::Coordenador]), UsersDelete));
    }

    #[test]
    fn every_role_has_an_explicit_row() {
        for role in Role::ALL {
            // Only the technician row is intentionally empty.
            assert_eq!(role_permissions(*role).is_empty(), *role == Role::Tecnico, "{role}");
        }
    }

    #[test]
    fn super_admin_holds_everything_admin_holds_all_but_platform_management() {
        let super_admin = permissions_of(&set(&[Role::SuperAdmin]));
        assert_eq!(super_admin.len(), Permission::ALL.len());

        let admin = permissions_of(&set(&[Role::Admin]));
        assert!(!admin.contains(&InstitutionsManage));
        assert_eq!(admin.len(), Permission::ALL.len() - 1);
    }

    #[test]
    fn mixed_roles_get_the_union_not_the_highest_role() {
        // Aluno alone lacks dashboard.admin, professor alone lacks dashboard.aluno.
        let roles = set(&[Role::Aluno, Role::Professor]);
        assert!(has_permission(&roles, DashboardAluno));
        assert!(has_permission(&roles, DashboardAdmin));
        assert!(has_permission(&roles, RequerimentosCreate));
        assert!(has_permission(&roles, NotasEdit));
    }

    #[test]
    fn empty_and_unmapped_sets_are_fail_closed() {
        for p in Permission::ALL {
            assert!(!has_permission(&set(&[]), *p));
            assert!(!has_permission(&set(&[Role::Tecnico]), *p));
        }
        assert!(permissions_of(&set(&[Role::Tecnico])).is_empty());
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn permission_strategy() -> impl Strategy<Value = Permission> {
        prop::sample::select(Permission::ALL.to_vec())
    }

    fn role_set_strategy() -> impl Strategy<Value = BTreeSet<Role>> {
        prop::collection::btree_set(role_strategy(), 0..=Role::ALL.len())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: `has_permission(R1 ∪ R2, P) == has_permission(R1, P) || has_permission(R2, P)`.
        #[test]
        fn union_law(r1 in role_set_strategy(), r2 in role_set_strategy(), p in permission_strategy()) {
            let union: BTreeSet<Role> = r1.union(&r2).copied().collect();
            prop_assert_eq!(
                has_permission(&union, p),
                has_permission(&r1, p) || has_permission(&r2, p)
            );
        }

        /// Property: the answer depends only on the role set, not on iteration order
        /// or on previous calls.
        #[test]
        fn deterministic_and_order_independent(roles in prop::collection::vec(role_strategy(), 0..8), p in permission_strategy()) {
            let forward = has_permission(&roles, p);
            let reversed: Vec<Role> = roles.iter().rev().copied().collect();
            prop_assert_eq!(forward, has_permission(&reversed, p));
            prop_assert_eq!(forward, has_permission(&roles, p));
        }

        /// Property: `permissions_of` agrees with `has_permission` for every token.
        #[test]
        fn permissions_of_matches_has_permission(roles in role_set_strategy()) {
            let granted = permissions_of(&roles);
            for p in Permission::ALL {
                prop_assert_eq!(granted.contains(p), has_permission(&roles, *p));
            }
        }
    }
}
