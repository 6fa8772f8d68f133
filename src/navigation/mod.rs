//! View admission: the guard decision plus the console's route table.

mod guard;
mod routes;

use parking_lot::Mutex;
use tracing::info;

pub use guard::{decide, Decision, Redirect, RouteMeta};
pub use routes::{Navigation, ResolvedRoute, RouteRecord, RouteTable, DEFAULT_ROUTE, LOGIN_ROUTE};

use crate::identity::{Navigator, SessionStatus};

#[derive(Debug, Default)]
struct ViewState {
    path: String,
    title: String,
}

/// Current view and document title of a headless console front-end.
/// Navigation attempts go through the guard; redirects from the authorizer
/// land here too.
pub struct ConsoleNavigator {
    table: RouteTable,
    view: Mutex<ViewState>,
}

impl ConsoleNavigator {
    pub fn new(table: RouteTable, start: &str) -> Self {
        Self { table, view: Mutex::new(ViewState { path: start.to_string(), title: String::new() }) }
    }

    pub fn table(&self) -> &RouteTable { &self.table }

    pub fn title(&self) -> String { self.view.lock().title.clone() }

    /// Try to move to `path`. Applies the title and whichever path the guard
    /// settles on, and returns the decision.
    pub fn navigate(&self, path: &str, session: SessionStatus) -> Navigation {
        let nav = self.table.navigate(path, session);
        let mut v = self.view.lock();
        v.title = nav.title.clone();
        let next = match (&nav.decision, &nav.redirect_path, &nav.route) {
            (Decision::Allow, _, Some(route)) => route.path.clone(),
            (Decision::Allow, _, None) => path.to_string(),
            (Decision::DenyTo(_), Some(target), _) => target.clone(),
            (Decision::DenyTo(_), None, _) => v.path.clone(),
        };
        v.path = next;
        nav
    }
}

impl Navigator for ConsoleNavigator {
    fn current_path(&self) -> String {
        self.view.lock().path.clone()
    }

    fn redirect(&self, path: &str) {
        info!(target: "vecdesk::nav", "redirect -> {}", path);
        let title = self.table.title_for(self.table.resolve(path).as_ref().map(|r| &r.meta));
        let mut v = self.view.lock();
        v.path = path.to_string();
        v.title = title;
    }
}
