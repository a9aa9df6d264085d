//! Application routes and what each of them requires.

use serde::Serialize;

use crate::{Permission, RouteDecision, RouteRequirement, Session, authorize_route};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    /// Platform overview for super admins.
    PlatformOverview,
    /// Platform-level institution management.
    Institutions,
    StaffDashboard,
    StudentPanel,
    Perfil,
    Alunos,
    Cursos,
    Disciplinas,
    Turmas,
    Notas,
    Documentos,
    Requerimentos,
    Usuarios,
    Auditoria,
    Lixeira,
    Configuracoes,
}

impl Route {
    pub const ALL: &'static [Route] = &[
        Route::Login,
        Route::PlatformOverview,
        Route::Institutions,
        Route::StaffDashboard,
        Route::StudentPanel,
        Route::Perfil,
        Route::Alunos,
        Route::Cursos,
        Route::Disciplinas,
        Route::Turmas,
        Route::Notas,
        Route::Documentos,
        Route::Requerimentos,
        Route::Usuarios,
        Route::Auditoria,
        Route::Lixeira,
        Route::Configuracoes,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::PlatformOverview => "/super-admin",
            Route::Institutions => "/super-admin/instituicoes",
            Route::StaffDashboard => "/dashboard",
            Route::StudentPanel => "/painel-aluno",
            Route::Perfil => "/perfil",
            Route::Alunos => "/alunos",
            Route::Cursos => "/cursos",
            Route::Disciplinas => "/disciplinas",
            Route::Turmas => "/turmas",
            Route::Notas => "/notas",
            Route::Documentos => "/documentos",
            Route::Requerimentos => "/requerimentos",
            Route::Usuarios => "/usuarios",
            Route::Auditoria => "/auditoria",
            Route::Lixeira => "/lixeira",
            Route::Configuracoes => "/configuracoes",
        }
    }

    /// `None` for public routes.
    pub const fn requirement(self) -> Option<RouteRequirement> {
        use Permission::*;

        let permission = match self {
            Route::Login => return None,
            Route::Perfil => return Some(RouteRequirement::Authenticated),
            Route::PlatformOverview | Route::Institutions => InstitutionsManage,
            Route::StaffDashboard => DashboardAdmin,
            Route::StudentPanel => DashboardAluno,
            Route::Alunos => AlunosView,
            Route::Cursos => CursosView,
            Route::Disciplinas => DisciplinasView,
            Route::Turmas => TurmasView,
            Route::Notas => NotasView,
            Route::Documentos => DocumentosView,
            Route::Requerimentos => RequerimentosView,
            Route::Usuarios => UsersView,
            Route::Auditoria => AuditView,
            Route::Lixeira => LixeiraView,
            Route::Configuracoes => InstitutionSettings,
        };
        Some(RouteRequirement::Permission(permission))
    }

    /// Exact-path lookup; a trailing slash is ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = match path.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest,
            _ => path,
        };
        Route::ALL.iter().copied().find(|r| r.path() == trimmed)
    }

    /// Authorize the current session against this route.
    pub fn authorize(self, session: &Session) -> RouteDecision {
        match self.requirement() {
            None => RouteDecision::Allowed,
            Some(requirement) => authorize_route(session, requirement),
        }
    }
}

impl core::fmt::Display for Route {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.path())
    }
}

/// Authorize a raw path. Unknown paths yield `None` (render not-found).
pub fn authorize_path(session: &Session, path: &str) -> Option<RouteDecision> {
    Route::from_path(path).map(|route| route.authorize(session))
}
