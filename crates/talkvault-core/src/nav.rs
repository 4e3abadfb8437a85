//! Views and the navigation gate.
//!
//! Every navigation attempt is decided exactly once: show a loading
//! indicator while the session is still resolving, render the view, or
//! redirect to the login view.

use std::fmt;

use crate::auth::{SessionPhase, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    Register,
    Dashboard,
    Meetings,
    Documents,
    Upload,
    History,
    Profile,
}

impl View {
    /// Views that need a logged-in user.
    pub fn is_protected(&self) -> bool {
        !matches!(self, View::Login | View::Register)
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Login => "Login",
            View::Register => "Register",
            View::Dashboard => "Dashboard",
            View::Meetings => "Meetings",
            View::Documents => "Documents",
            View::Upload => "Upload",
            View::History => "History",
            View::Profile => "Profile",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Session still resolving; show a neutral loading indicator.
    Loading,
    Render(View),
    Redirect(View),
}

/// Decide whether `requested` may render for this session.
pub fn guard(requested: View, session: &SessionState) -> GateDecision {
    if !requested.is_protected() {
        return GateDecision::Render(requested);
    }
    match session.phase() {
        SessionPhase::Resolving => GateDecision::Loading,
        SessionPhase::Authenticated => GateDecision::Render(requested),
        SessionPhase::Unauthenticated => GateDecision::Redirect(View::Login),
    }
}

/// Tracks the view currently on screen.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: Option<View>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// `None` until the first navigation has rendered something.
    pub fn current(&self) -> Option<View> {
        self.current
    }

    /// Run the gate for `requested` and apply its decision.
    /// A `Loading` decision leaves the current view unchanged.
    pub fn navigate(&mut self, requested: View, session: &SessionState) -> GateDecision {
        let decision = guard(requested, session);
        match decision {
            GateDecision::Render(view) | GateDecision::Redirect(view) => self.current = Some(view),
            GateDecision::Loading => {}
        }
        decision
    }

    /// Unconditional jump, used when the session has just been torn down.
    pub fn force(&mut self, view: View) {
        self.current = Some(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;

    fn authenticated() -> SessionState {
        SessionState {
            credential: Some("tok1".to_string()),
            user: Some(serde_json::from_str::<UserProfile>(r#"{"username": "u1"}"#).unwrap()),
            is_loading: false,
        }
    }

    const PROTECTED: [View; 6] = [
        View::Dashboard,
        View::Meetings,
        View::Documents,
        View::Upload,
        View::History,
        View::Profile,
    ];

    #[test]
    fn test_resolving_never_renders_protected_view() {
        let session = SessionState::resolving();
        for view in PROTECTED {
            assert_eq!(guard(view, &session), GateDecision::Loading);
        }
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let session = SessionState::logged_out();
        for view in PROTECTED {
            assert_eq!(guard(view, &session), GateDecision::Redirect(View::Login));
        }
    }

    #[test]
    fn test_authenticated_renders() {
        let session = authenticated();
        for view in PROTECTED {
            assert_eq!(guard(view, &session), GateDecision::Render(view));
        }
    }

    #[test]
    fn test_public_views_always_render() {
        for session in [SessionState::resolving(), SessionState::logged_out(), authenticated()] {
            assert_eq!(guard(View::Login, &session), GateDecision::Render(View::Login));
            assert_eq!(guard(View::Register, &session), GateDecision::Render(View::Register));
        }
    }

    #[test]
    fn test_navigator_applies_decision() {
        let mut nav = Navigator::new();
        assert_eq!(nav.navigate(View::Meetings, &SessionState::resolving()), GateDecision::Loading);
        assert_eq!(nav.current(), None);

        nav.navigate(View::Meetings, &SessionState::logged_out());
        assert_eq!(nav.current(), Some(View::Login));

        nav.navigate(View::Meetings, &authenticated());
        assert_eq!(nav.current(), Some(View::Meetings));

        nav.force(View::Login);
        assert_eq!(nav.current(), Some(View::Login));
    }
}
