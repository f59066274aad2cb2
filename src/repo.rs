use async_trait::async_trait;

use crate::feed::ChangeFeed;
use crate::lifecycle::RuleViolation;
use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error(transparent)] Rule(#[from] RuleViolation),
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get_profile(&self, uid: &str) -> RepoResult<Profile>;
    /// Fails with `Conflict` when a profile already exists for `profile.uid`.
    async fn create_profile(&self, profile: Profile) -> RepoResult<Profile>;
    async fn list_profiles(&self) -> RepoResult<Vec<Profile>>;
    async fn update_profile(&self, uid: &str, upd: ProfileUpdate) -> RepoResult<Profile>;
    async fn update_settings(&self, uid: &str, settings: Settings) -> RepoResult<Profile>;
    async fn admin_update_profile(&self, uid: &str, upd: AdminProfileUpdate) -> RepoResult<Profile>;
}

/// Board entries and their history mirrors. Every write touches both
/// collections in one atomic step.
#[async_trait]
pub trait RequestRepo: Send + Sync {
    /// Pending requests, newest first.
    async fn list_pending_requests(&self) -> RepoResult<Vec<HelpRequest>>;
    async fn get_request(&self, id: &str) -> RepoResult<HelpRequest>;
    async fn get_history_entry(&self, id: &str) -> RepoResult<HelpRequest>;
    async fn create_request(&self, requester: &str, new: NewHelpRequest) -> RepoResult<HelpRequest>;
    async fn offer_help(&self, id: &str, helper: &str) -> RepoResult<HelpRequest>;
    /// Completes the request and credits the helper with its reward.
    async fn confirm_receipt(&self, id: &str, requester: &str) -> RepoResult<HelpRequest>;
    async fn delete_request(&self, id: &str, owner: &str) -> RepoResult<()>;
    async fn history_for_requester(&self, uid: &str, limit: Option<usize>) -> RepoResult<Vec<HelpRequest>>;
    async fn history_for_helper(&self, uid: &str) -> RepoResult<Vec<HelpRequest>>;
}

#[async_trait]
pub trait RedeemRepo: Send + Sync {
    /// Read balance, check, deduct and record as a single transaction.
    async fn redeem(&self, uid: &str, item: &CatalogItem, form: &RedeemForm) -> RepoResult<Redemption>;
    async fn redemptions_for(&self, uid: &str) -> RepoResult<Vec<RedeemRecord>>;
    async fn all_redemptions(&self) -> RepoResult<Vec<RedeemRecord>>;
}

#[async_trait]
pub trait ChatRepo: Send + Sync {
    /// Create-if-absent keyed by request id.
    async fn open_room(&self, request_id: &str, caller: &str) -> RepoResult<ChatRoom>;
    async fn get_room(&self, id: &str) -> RepoResult<ChatRoom>;
    /// Rooms containing `uid`, most recently active first.
    async fn rooms_for(&self, uid: &str) -> RepoResult<Vec<ChatRoom>>;
    async fn room_messages(&self, room_id: &str) -> RepoResult<Vec<ChatMessage>>;
    async fn send_message(&self, room_id: &str, sender: &str, text: &str) -> RepoResult<ChatMessage>;
}

#[async_trait]
pub trait SupportRepo: Send + Sync {
    async fn member_send(&self, uid: &str, text: &str) -> RepoResult<ChatMessage>;
    /// Fails with `NotFound` until the member has opened the thread.
    async fn admin_reply(&self, member: &str, admin: &str, text: &str) -> RepoResult<ChatMessage>;
    async fn support_threads(&self) -> RepoResult<Vec<SupportThread>>;
    /// Fails with `NotFound` when the member never wrote in.
    async fn support_thread(&self, uid: &str) -> RepoResult<SupportThread>;
    async fn support_messages(&self, uid: &str) -> RepoResult<Vec<ChatMessage>>;
}

/// Stores that push change notifications for live queries.
pub trait ChangeSource: Send + Sync {
    fn feed(&self) -> ChangeFeed;
}

pub trait Repo: ProfileRepo + RequestRepo + RedeemRepo + ChatRepo + SupportRepo + ChangeSource {}

impl<T> Repo for T where T: ProfileRepo + RequestRepo + RedeemRepo + ChatRepo + SupportRepo + ChangeSource {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use crate::chat;
    use crate::feed::Topic;
    use crate::ledger;
    use crate::lifecycle;
    use chrono::{DateTime, Duration, Utc};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use crate::snapshot::{self, SnapshotError, SnapshotWriter};
    use std::path::Path;
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

    const SNAPSHOT_FILE: &str = "state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        profiles: HashMap<Id, Profile>,
        requests: HashMap<Id, HelpRequest>,
        history: HashMap<Id, HelpRequest>,
        redemptions: HashMap<Id, RedeemRecord>,
        chats: HashMap<Id, ChatRoom>,
        chat_messages: HashMap<Id, Vec<ChatMessage>>,
        support_threads: HashMap<Id, SupportThread>,
        support_messages: HashMap<Id, Vec<ChatMessage>>,
        last_stamp: Option<DateTime<Utc>>,
    }

    /// Server-assigned timestamp, strictly increasing across the store.
    fn stamp(state: &mut State) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match state.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        state.last_stamp = Some(ts);
        ts
    }

    fn new_id() -> Id {
        uuid::Uuid::new_v4().to_string()
    }

    fn newest_first(v: &mut [HelpRequest]) {
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot: Option<Arc<SnapshotWriter>>,
        feed: ChangeFeed,
    }

    impl InMemRepo {
        /// Loads `state.json` from `dir` if present; writes go back there.
        /// A snapshot that cannot be parsed is an error rather than an empty store.
        pub fn open(dir: &Path) -> Result<Self, SnapshotError> {
            let path = dir.join(SNAPSHOT_FILE);
            let state: State = snapshot::load(&path)?;
            Ok(Self {
                state: Arc::new(RwLock::new(state)),
                snapshot: Some(Arc::new(SnapshotWriter::new(path))),
                feed: ChangeFeed::default(),
            })
        }

        /// No snapshot file; state lives as long as the value.
        pub fn ephemeral() -> Self {
            Self { state: Arc::new(RwLock::new(State::default())), snapshot: None, feed: ChangeFeed::default() }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("store lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("store lock poisoned".into()))
        }

        /// Stages the snapshot under the write guard, releases it, then writes
        /// the file and publishes `topics`.
        fn commit(&self, guard: RwLockWriteGuard<'_, State>, topics: &[Topic]) {
            let staged = match &self.snapshot {
                Some(writer) => match writer.stage(&*guard) {
                    Ok(staged) => Some((writer, staged)),
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialise store snapshot");
                        None
                    }
                },
                None => None,
            };
            drop(guard);
            if let Some((writer, staged)) = staged {
                writer.store(staged);
            }
            for t in topics {
                self.feed.publish(t.clone());
            }
        }
    }

    impl ChangeSource for InMemRepo {
        fn feed(&self) -> ChangeFeed { self.feed.clone() }
    }

    #[async_trait]
    impl ProfileRepo for InMemRepo {
        async fn get_profile(&self, uid: &str) -> RepoResult<Profile> {
            let s = self.read()?;
            s.profiles.get(uid).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_profile(&self, profile: Profile) -> RepoResult<Profile> {
            let mut s = self.write()?;
            if s.profiles.contains_key(&profile.uid) {
                return Err(RepoError::Conflict);
            }
            s.profiles.insert(profile.uid.clone(), profile.clone());
            self.commit(s, &[Topic::Profiles]);
            Ok(profile)
        }

        async fn list_profiles(&self) -> RepoResult<Vec<Profile>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.profiles.values().cloned().collect();
            v.sort_by(|a, b| a.email.cmp(&b.email));
            Ok(v)
        }

        async fn update_profile(&self, uid: &str, upd: ProfileUpdate) -> RepoResult<Profile> {
            lifecycle::validate_age(upd.age)?;
            if upd.display_name.trim().is_empty() {
                return Err(RuleViolation::Invalid("display name is required".into()).into());
            }
            let mut s = self.write()?;
            let p = s.profiles.get_mut(uid).ok_or(RepoError::NotFound)?;
            p.display_name = upd.display_name.trim().to_string();
            p.age = Some(upd.age);
            p.phone = upd.phone;
            p.address = upd.address;
            let updated = p.clone();
            self.commit(s, &[Topic::Profiles]);
            Ok(updated)
        }

        async fn update_settings(&self, uid: &str, settings: Settings) -> RepoResult<Profile> {
            let mut s = self.write()?;
            let p = s.profiles.get_mut(uid).ok_or(RepoError::NotFound)?;
            p.settings = settings;
            let updated = p.clone();
            self.commit(s, &[Topic::Profiles]);
            Ok(updated)
        }

        async fn admin_update_profile(&self, uid: &str, upd: AdminProfileUpdate) -> RepoResult<Profile> {
            let mut s = self.write()?;
            let p = s.profiles.get_mut(uid).ok_or(RepoError::NotFound)?;
            if let Some(name) = upd.display_name.filter(|n| !n.trim().is_empty()) {
                p.display_name = name;
            }
            if let Some(points) = upd.points {
                p.points = points;
            }
            let updated = p.clone();
            self.commit(s, &[Topic::Profiles]);
            Ok(updated)
        }
    }

    #[async_trait]
    impl RequestRepo for InMemRepo {
        async fn list_pending_requests(&self) -> RepoResult<Vec<HelpRequest>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.requests.values()
                .filter(|r| r.status == RequestStatus::Pending)
                .cloned()
                .collect();
            newest_first(&mut v);
            Ok(v)
        }

        async fn get_request(&self, id: &str) -> RepoResult<HelpRequest> {
            let s = self.read()?;
            s.requests.get(id).cloned().ok_or(RepoError::NotFound)
        }

        async fn get_history_entry(&self, id: &str) -> RepoResult<HelpRequest> {
            let s = self.read()?;
            s.history.get(id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_request(&self, requester: &str, new: NewHelpRequest) -> RepoResult<HelpRequest> {
            lifecycle::validate_new_request(&new)?;
            let mut s = self.write()?;
            let profile = s.profiles.get(requester).cloned().ok_or(RepoError::NotFound)?;
            let now = stamp(&mut s);
            let req = lifecycle::build_request(new_id(), &profile, new, now)?;
            s.requests.insert(req.id.clone(), req.clone());
            s.history.insert(req.id.clone(), req.clone());
            self.commit(s, &[Topic::Requests, Topic::History]);
            Ok(req)
        }

        async fn offer_help(&self, id: &str, helper: &str) -> RepoResult<HelpRequest> {
            let mut s = self.write()?;
            let helper_name = s.profiles.get(helper).map(|p| p.display_name.clone()).ok_or(RepoError::NotFound)?;
            let mut req = s.requests.get(id).cloned().ok_or(RepoError::NotFound)?;
            let now = stamp(&mut s);
            lifecycle::apply_offer(&mut req, helper, &helper_name, now)?;
            s.requests.insert(req.id.clone(), req.clone());
            s.history.insert(req.id.clone(), req.clone());
            self.commit(s, &[Topic::Requests, Topic::History]);
            Ok(req)
        }

        async fn confirm_receipt(&self, id: &str, requester: &str) -> RepoResult<HelpRequest> {
            let mut s = self.write()?;
            let mut req = s.requests.get(id).cloned().ok_or(RepoError::NotFound)?;
            let now = stamp(&mut s);
            let helper = lifecycle::apply_completion(&mut req, requester, now)?;
            // nothing is written until the helper is known to exist
            let profile = s.profiles.get_mut(&helper).ok_or(RepoError::NotFound)?;
            profile.points += req.points;
            s.requests.insert(req.id.clone(), req.clone());
            s.history.insert(req.id.clone(), req.clone());
            self.commit(s, &[Topic::Requests, Topic::History, Topic::Profiles]);
            Ok(req)
        }

        async fn delete_request(&self, id: &str, owner: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            let req = s.requests.get(id).ok_or(RepoError::NotFound)?;
            lifecycle::check_delete(req, owner)?;
            s.requests.remove(id);
            s.history.remove(id);
            self.commit(s, &[Topic::Requests, Topic::History]);
            Ok(())
        }

        async fn history_for_requester(&self, uid: &str, limit: Option<usize>) -> RepoResult<Vec<HelpRequest>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.history.values().filter(|r| r.user_id == uid).cloned().collect();
            newest_first(&mut v);
            if let Some(n) = limit { v.truncate(n); }
            Ok(v)
        }

        async fn history_for_helper(&self, uid: &str) -> RepoResult<Vec<HelpRequest>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.history.values()
                .filter(|r| r.fulfilled_by.as_deref() == Some(uid))
                .cloned()
                .collect();
            newest_first(&mut v);
            Ok(v)
        }
    }

    #[async_trait]
    impl RedeemRepo for InMemRepo {
        async fn redeem(&self, uid: &str, item: &CatalogItem, form: &RedeemForm) -> RepoResult<Redemption> {
            ledger::validate_form(form)?;
            let mut s = self.write()?;
            let now = stamp(&mut s);
            let profile = s.profiles.get_mut(uid).ok_or(RepoError::NotFound)?;
            let record = ledger::redeem(profile, item, form, new_id(), now)?;
            let balance = profile.points;
            s.redemptions.insert(record.id.clone(), record.clone());
            self.commit(s, &[Topic::Profiles, Topic::Redemptions]);
            Ok(Redemption { record, balance })
        }

        async fn redemptions_for(&self, uid: &str) -> RepoResult<Vec<RedeemRecord>> {
            let mut v = self.all_redemptions().await?;
            v.retain(|r| r.user_id == uid);
            Ok(v)
        }

        async fn all_redemptions(&self) -> RepoResult<Vec<RedeemRecord>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.redemptions.values().cloned().collect();
            v.sort_by(|a, b| b.redeemed_at.cmp(&a.redeemed_at));
            Ok(v)
        }
    }

    #[async_trait]
    impl ChatRepo for InMemRepo {
        async fn open_room(&self, request_id: &str, caller: &str) -> RepoResult<ChatRoom> {
            let mut s = self.write()?;
            if let Some(room) = s.chats.get(request_id) {
                if !chat::is_participant(room, caller) {
                    return Err(RuleViolation::NotParticipant.into());
                }
                return Ok(room.clone());
            }
            let req = s.requests.get(request_id).cloned().ok_or(RepoError::NotFound)?;
            let now = stamp(&mut s);
            let room = chat::room_for_request(&req, caller, now)?;
            s.chats.insert(room.id.clone(), room.clone());
            self.commit(s, &[Topic::ChatRooms]);
            Ok(room)
        }

        async fn get_room(&self, id: &str) -> RepoResult<ChatRoom> {
            let s = self.read()?;
            s.chats.get(id).cloned().ok_or(RepoError::NotFound)
        }

        async fn rooms_for(&self, uid: &str) -> RepoResult<Vec<ChatRoom>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.chats.values().filter(|r| chat::is_participant(r, uid)).cloned().collect();
            v.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(v)
        }

        async fn room_messages(&self, room_id: &str) -> RepoResult<Vec<ChatMessage>> {
            let s = self.read()?;
            let mut v = s.chat_messages.get(room_id).cloned().unwrap_or_default();
            v.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            Ok(v)
        }

        async fn send_message(&self, room_id: &str, sender: &str, text: &str) -> RepoResult<ChatMessage> {
            let text = chat::message_text(text)?;
            let mut s = self.write()?;
            let sender_name = s.profiles.get(sender).map(|p| p.display_name.clone()).ok_or(RepoError::NotFound)?;
            let room = s.chats.get(room_id).ok_or(RepoError::NotFound)?;
            if !chat::is_participant(room, sender) {
                return Err(RuleViolation::NotParticipant.into());
            }
            let now = stamp(&mut s);
            let msg = chat::message(new_id(), sender, &sender_name, text, now, false);
            s.chat_messages.entry(room_id.to_string()).or_default().push(msg.clone());
            if let Some(room) = s.chats.get_mut(room_id) {
                room.last_message = Some(msg.text.clone());
                room.last_sender_id = Some(sender.to_string());
                room.updated_at = now;
            }
            self.commit(s, &[Topic::ChatRooms, Topic::ChatMessages(room_id.to_string())]);
            Ok(msg)
        }
    }

    #[async_trait]
    impl SupportRepo for InMemRepo {
        async fn member_send(&self, uid: &str, text: &str) -> RepoResult<ChatMessage> {
            let text = chat::message_text(text)?;
            let mut s = self.write()?;
            let profile = s.profiles.get(uid).cloned().ok_or(RepoError::NotFound)?;
            let now = stamp(&mut s);
            s.support_threads.insert(uid.to_string(), SupportThread {
                user_id: uid.to_string(),
                user_name: profile.display_name.clone(),
                user_email: profile.email.clone(),
                last_message: text.clone(),
                updated_at: now,
            });
            let msg = chat::message(new_id(), uid, &profile.display_name, text, now, false);
            s.support_messages.entry(uid.to_string()).or_default().push(msg.clone());
            self.commit(s, &[Topic::SupportThreads, Topic::SupportMessages(uid.to_string())]);
            Ok(msg)
        }

        async fn admin_reply(&self, member: &str, admin: &str, text: &str) -> RepoResult<ChatMessage> {
            let text = chat::message_text(text)?;
            let mut s = self.write()?;
            if !s.support_threads.contains_key(member) {
                return Err(RepoError::NotFound);
            }
            let now = stamp(&mut s);
            if let Some(thread) = s.support_threads.get_mut(member) {
                thread.last_message = text.clone();
                thread.updated_at = now;
            }
            let msg = chat::message(new_id(), admin, chat::ADMIN_SENDER_NAME, text, now, true);
            s.support_messages.entry(member.to_string()).or_default().push(msg.clone());
            self.commit(s, &[Topic::SupportThreads, Topic::SupportMessages(member.to_string())]);
            Ok(msg)
        }

        async fn support_threads(&self) -> RepoResult<Vec<SupportThread>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.support_threads.values().cloned().collect();
            v.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(v)
        }

        async fn support_thread(&self, uid: &str) -> RepoResult<SupportThread> {
            let s = self.read()?;
            s.support_threads.get(uid).cloned().ok_or(RepoError::NotFound)
        }

        async fn support_messages(&self, uid: &str) -> RepoResult<Vec<ChatMessage>> {
            let s = self.read()?;
            Ok(s.support_messages.get(uid).cloned().unwrap_or_default())
        }
    }
}
