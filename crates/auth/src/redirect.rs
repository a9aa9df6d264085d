use crate::{Permission, Route, Session};

/// Pick the landing route for the current caller.
///
/// Priority is fixed: platform operators first, then anyone holding
/// `dashboard.admin`, then the student panel for every other signed-in caller
/// (including roles with no permissions at all). A session without identity is
/// sent to the login screen.
pub fn choose_home(session: &Session) -> Route {
    if !session.is_authenticated() {
        return Route::Login;
    }

    if session.is_super_admin() {
        Route::PlatformOverview
    } else if session.has_permission(Permission::DashboardAdmin) {
        Route::StaffDashboard
    } else {
        Route::StudentPanel
    }
}
