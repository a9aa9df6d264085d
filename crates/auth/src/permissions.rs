use core::str::FromStr;

use serde::{Deserialize, Serialize};

use campus_core::DomainError;

macro_rules! permissions {
    ($($(#[$meta:meta])* $variant:ident => $name:literal),+ $(,)?) => {
        /// Fine-grained capability token, named `<resource>.<action>`.
        ///
        /// The set is closed: adding a permission means adding a variant here and
        /// deciding which roles get it in the registry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Permission {
            $(
                $(#[$meta])*
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Permission {
            /// Every permission, in declaration order.
            pub const ALL: &'static [Permission] = &[$(Permission::$variant,)+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Permission::$variant => $name,)+
                }
            }
        }

        impl FromStr for Permission {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Permission::$variant),)+
                    _ => Err(DomainError::unknown("permission", s)),
                }
            }
        }
    };
}

permissions! {
    /// Staff dashboard (secretaria, coordination, teaching staff, admins).
    DashboardAdmin => "dashboard.admin",
    /// Student self-service panel.
    DashboardAluno => "dashboard.aluno",

    AlunosView => "alunos.view",
    AlunosCreate => "alunos.create",
    AlunosEdit => "alunos.edit",
    AlunosDelete => "alunos.delete",

    CursosView => "cursos.view",
    CursosCreate => "cursos.create",
    CursosEdit => "cursos.edit",
    CursosDelete => "cursos.delete",

    DisciplinasView => "disciplinas.view",
    DisciplinasCreate => "disciplinas.create",
    DisciplinasEdit => "disciplinas.edit",
    DisciplinasDelete => "disciplinas.delete",

    TurmasView => "turmas.view",
    TurmasCreate => "turmas.create",
    TurmasEdit => "turmas.edit",
    TurmasDelete => "turmas.delete",

    NotasView => "notas.view",
    NotasEdit => "notas.edit",

    DocumentosView => "documentos.view",
    /// Issue certificates, transcripts and other generated documents.
    DocumentosGenerate => "documentos.generate",

    RequerimentosView => "requerimentos.view",
    RequerimentosCreate => "requerimentos.create",
    /// Answer, approve or reject student requests.
    RequerimentosManage => "requerimentos.manage",

    UsersView => "users.view",
    UsersCreate => "users.create",
    UsersEdit => "users.edit",
    UsersDelete => "users.delete",

    AuditView => "audit.view",

    RelatoriosView => "relatorios.view",

    /// List soft-deleted records.
    LixeiraView => "lixeira.view",
    /// Restore soft-deleted records.
    LixeiraRestore => "lixeira.restore",

    /// Edit the caller's own institution settings.
    InstitutionSettings => "institution.settings",
    /// Platform-level management of every institution.
    InstitutionsManage => "institutions.manage",
}

impl Permission {
    /// Resource part of the token (`"alunos"` for `alunos.edit`).
    pub fn resource(self) -> &'static str {
        let name = self.as_str();
        name.split_once('.').map_or(name, |(resource, _)| resource)
    }

    /// Action part of the token (`"edit"` for `alunos.edit`).
    pub fn action(self) -> &'static str {
        let name = self.as_str();
        name.split_once('.').map_or(name, |(_, action)| action)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
