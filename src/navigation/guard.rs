use crate::identity::SessionStatus;

/// Admission requirements and display title of a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub title: Option<String>,
}

impl RouteMeta {
    pub fn public<S: Into<String>>(title: S) -> Self {
        Self { title: Some(title.into()), ..Default::default() }
    }

    pub fn authed<S: Into<String>>(title: S) -> Self {
        Self { requires_auth: true, title: Some(title.into()), ..Default::default() }
    }

    pub fn admin<S: Into<String>>(title: S) -> Self {
        Self { requires_auth: true, requires_admin: true, title: Some(title.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Login,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    DenyTo(Redirect),
}

/// Admission check run before every view transition. Pure; the caller does
/// the redirect.
pub fn decide(target: &RouteMeta, session: SessionStatus) -> Decision {
    if target.requires_auth && !session.is_logged_in {
        Decision::DenyTo(Redirect::Login)
    } else if target.requires_admin && !session.is_admin {
        Decision::DenyTo(Redirect::Default)
    } else {
        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANON: SessionStatus = SessionStatus { is_logged_in: false, is_admin: false };
    const USER: SessionStatus = SessionStatus { is_logged_in: true, is_admin: false };
    const ADMIN: SessionStatus = SessionStatus { is_logged_in: true, is_admin: true };

    #[test]
    fn unauthenticated_goes_to_login() {
        assert_eq!(decide(&RouteMeta::authed("Dashboard"), ANON), Decision::DenyTo(Redirect::Login));
        assert_eq!(decide(&RouteMeta::admin("Databases"), ANON), Decision::DenyTo(Redirect::Login));
    }

    #[test]
    fn non_admin_goes_to_default() {
        assert_eq!(decide(&RouteMeta::admin("Databases"), USER), Decision::DenyTo(Redirect::Default));
    }

    #[test]
    fn allowed_cases() {
        assert_eq!(decide(&RouteMeta::public("Login"), ANON), Decision::Allow);
        assert_eq!(decide(&RouteMeta::authed("Query"), USER), Decision::Allow);
        assert_eq!(decide(&RouteMeta::admin("Databases"), ADMIN), Decision::Allow);
    }

    #[test]
    fn admin_flag_without_auth_flag_still_checks_admin() {
        let meta = RouteMeta { requires_admin: true, ..Default::default() };
        assert_eq!(decide(&meta, ANON), Decision::DenyTo(Redirect::Default));
    }
}
