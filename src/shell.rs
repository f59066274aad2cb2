//! Client-side application state: who is signed in, which page is showing
//! and which overlays are open. Pure state transitions, no I/O.

use serde::{Deserialize, Serialize};

use crate::chat;
use crate::models::{CatalogItem, ChatRoom, Id};
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Page {
    #[default]
    Home,
    Profile,
    RequestHelp,
    BrowseRequests,
    Shop,
    History,
    Settings,
    About,
}

impl Page {
    /// Pages that only make sense with a session.
    pub fn requires_session(self) -> bool {
        !matches!(self, Page::Home | Page::About)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlays {
    pub menu: bool,
    pub auth_modal: bool,
    pub admin_panel: bool,
    pub support: bool,
    pub chat_hub: bool,
    pub active_chat: Option<Id>,
    pub redeem_item: Option<CatalogItem>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("sign in first")]
    SignedOut,
    #[error("not enough points: have {balance}, need {cost}")]
    InsufficientPoints { balance: i64, cost: i64 },
}

#[derive(Debug, Clone, Default)]
pub struct AppShell {
    session: Option<Session>,
    page: Page,
    overlays: Overlays,
    rooms: Vec<ChatRoom>,
    unread: usize,
}

impl AppShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn rooms(&self) -> &[ChatRoom] {
        &self.rooms
    }

    pub fn sign_in(&mut self, session: Session) {
        self.session = Some(session);
        self.overlays.auth_modal = false;
    }

    /// Replaces the cached profile, e.g. after a points change arrives.
    pub fn refresh_session(&mut self, session: Session) {
        if self.session.is_some() {
            self.session = Some(session);
        }
    }

    pub fn sign_out(&mut self) {
        self.session = None;
        self.page = Page::Home;
        self.overlays = Overlays::default();
        self.rooms.clear();
        self.unread = 0;
    }

    /// Signed-out visits to member pages open the auth modal instead.
    pub fn navigate(&mut self, page: Page) {
        self.overlays.menu = false;
        if page.requires_session() && self.session.is_none() {
            self.overlays.auth_modal = true;
            return;
        }
        self.page = page;
    }

    pub fn toggle_menu(&mut self) {
        self.overlays.menu = !self.overlays.menu;
    }

    /// Returns whether the panel is open afterwards.
    pub fn toggle_admin_panel(&mut self) -> bool {
        let is_admin = self.session.as_ref().is_some_and(Session::is_admin);
        self.overlays.admin_panel = is_admin && !self.overlays.admin_panel;
        self.overlays.admin_panel
    }

    pub fn toggle_support(&mut self) {
        self.overlays.support = self.session.is_some() && !self.overlays.support;
    }

    pub fn open_chat_hub(&mut self) {
        self.overlays.chat_hub = self.session.is_some();
    }

    pub fn open_chat(&mut self, room_id: impl Into<Id>) {
        if self.session.is_none() {
            return;
        }
        self.overlays.chat_hub = false;
        self.overlays.active_chat = Some(room_id.into());
    }

    pub fn close_chat(&mut self) {
        self.overlays.active_chat = None;
    }

    pub fn begin_redeem(&mut self, item: CatalogItem) -> Result<(), ShellError> {
        let session = self.session.as_ref().ok_or(ShellError::SignedOut)?;
        if session.profile.points < item.cost {
            return Err(ShellError::InsufficientPoints { balance: session.profile.points, cost: item.cost });
        }
        self.overlays.redeem_item = Some(item);
        Ok(())
    }

    pub fn cancel_redeem(&mut self) {
        self.overlays.redeem_item = None;
    }

    pub fn set_rooms(&mut self, rooms: Vec<ChatRoom>) {
        self.unread = match &self.session {
            Some(s) => chat::unread_count(&rooms, &s.profile.uid),
            None => 0,
        };
        self.rooms = rooms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::identity::Identity;
    use crate::ledger;
    use crate::session::default_profile;

    fn session(role: Role, points: i64) -> Session {
        let mut profile = default_profile(&Identity { uid: "u1".into(), email: "aina@example.com".into() });
        profile.points = points;
        Session { profile, role }
    }

    fn room(id: &str, last_sender: Option<&str>) -> ChatRoom {
        ChatRoom {
            id: id.into(),
            request_id: id.into(),
            request_category: "food".into(),
            request_name: "Aina".into(),
            participants: vec!["u1".into(), "u2".into()],
            participant_names: vec!["aina".into(), "ben".into()],
            last_message: last_sender.map(|_| "hi".to_string()),
            last_sender_id: last_sender.map(str::to_string),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn sign_out_resets_page_and_overlays() {
        let mut shell = AppShell::new();
        shell.sign_in(session(Role::Admin, 10));
        shell.navigate(Page::Shop);
        shell.toggle_admin_panel();
        shell.open_chat("r1");
        shell.toggle_menu();
        shell.sign_out();
        assert!(shell.session().is_none());
        assert_eq!(shell.page(), Page::Home);
        assert_eq!(shell.overlays(), &Overlays::default());
    }

    #[test]
    fn navigate_closes_menu_and_gates_member_pages() {
        let mut shell = AppShell::new();
        shell.toggle_menu();
        shell.navigate(Page::History);
        assert!(!shell.overlays().menu);
        assert_eq!(shell.page(), Page::Home);
        assert!(shell.overlays().auth_modal);

        shell.sign_in(session(Role::Member, 10));
        assert!(!shell.overlays().auth_modal);
        shell.navigate(Page::History);
        assert_eq!(shell.page(), Page::History);
    }

    #[test]
    fn admin_panel_only_for_admins() {
        let mut shell = AppShell::new();
        shell.sign_in(session(Role::Member, 10));
        assert!(!shell.toggle_admin_panel());
        shell.sign_in(session(Role::Admin, 10));
        assert!(shell.toggle_admin_panel());
        assert!(!shell.toggle_admin_panel());
    }

    #[test]
    fn begin_redeem_checks_balance() {
        let mut shell = AppShell::new();
        let item = ledger::find_item("1").unwrap();
        assert_eq!(shell.begin_redeem(item.clone()), Err(ShellError::SignedOut));

        shell.sign_in(session(Role::Member, 5));
        assert_eq!(
            shell.begin_redeem(item.clone()),
            Err(ShellError::InsufficientPoints { balance: 5, cost: 20 })
        );
        assert!(shell.overlays().redeem_item.is_none());

        shell.sign_in(session(Role::Member, 25));
        shell.begin_redeem(item).unwrap();
        assert_eq!(shell.overlays().redeem_item.as_ref().map(|i| i.cost), Some(20));
    }

    #[test]
    fn set_rooms_counts_unread_for_viewer() {
        let mut shell = AppShell::new();
        shell.sign_in(session(Role::Member, 10));
        shell.set_rooms(vec![room("a", Some("u2")), room("b", Some("u1")), room("c", None)]);
        assert_eq!(shell.unread(), 1);
        assert_eq!(shell.rooms().len(), 3);
    }

    #[test]
    fn open_chat_replaces_hub() {
        let mut shell = AppShell::new();
        shell.sign_in(session(Role::Member, 10));
        shell.open_chat_hub();
        shell.open_chat("r9");
        assert!(!shell.overlays().chat_hub);
        assert_eq!(shell.overlays().active_chat.as_deref(), Some("r9"));
        shell.close_chat();
        assert!(shell.overlays().active_chat.is_none());
    }

    #[test]
    fn signed_out_shell_ignores_member_overlays() {
        let mut shell = AppShell::new();
        shell.toggle_support();
        shell.open_chat_hub();
        shell.open_chat("r1");
        shell.refresh_session(session(Role::Member, 99));
        assert_eq!(shell.overlays(), &Overlays::default());
        assert!(shell.session().is_none());

        shell.sign_in(session(Role::Member, 40));
        shell.toggle_support();
        assert!(shell.overlays().support);
        shell.begin_redeem(ledger::find_item("2").unwrap()).unwrap();
        shell.cancel_redeem();
        assert!(shell.overlays().redeem_item.is_none());
        shell.refresh_session(session(Role::Member, 0));
        assert_eq!(shell.session().map(|s| s.profile.points), Some(0));
    }
}
