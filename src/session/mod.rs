//! Authenticated identity and its durable copy.
//!
//! The store is the only owner of identity state. Three operations mutate
//! it: [`SessionStore::establish`], [`SessionStore::update_organization`]
//! and [`SessionStore::clear`]. Reads observe a whole [`Session`] snapshot,
//! so a token is never seen without its user and organization.

mod identity;
mod storage;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use color_eyre::Result;

pub use identity::{AuthToken, Organization, Session, User, UserRole};
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage};

pub const TOKEN_KEY: &str = "paydash.token";
pub const USER_KEY: &str = "paydash.user";
pub const ORGANIZATION_KEY: &str = "paydash.organization";

pub struct SessionStore {
  current: RwLock<Option<Arc<Session>>>,
  storage: Box<dyn KeyValueStorage>,
}

impl SessionStore {
  /// Create an empty store. Call [`restore`](Self::restore) to load the
  /// persisted identity.
  pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
    Self {
      current: RwLock::new(None),
      storage,
    }
  }

  fn read(&self) -> RwLockReadGuard<'_, Option<Arc<Session>>> {
    self.current.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<Session>>> {
    self.current.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Load identity from durable storage. Missing or corrupted content
  /// leaves the store unauthenticated.
  pub fn restore(&self) {
    let restored = self.load_persisted().map(Arc::new);
    match &restored {
      Some(session) => tracing::info!(user = %session.user.id, "session restored"),
      None => tracing::debug!("no stored session"),
    }
    *self.write() = restored;
  }

  fn load_persisted(&self) -> Option<Session> {
    let token = AuthToken::new(self.read_entry(TOKEN_KEY)?).ok()?;

    let user = match serde_json::from_str(&self.read_entry(USER_KEY)?) {
      Ok(user) => user,
      Err(e) => {
        tracing::warn!(error = %e, "stored user is corrupted, ignoring stored session");
        return None;
      }
    };

    let organization = match self.read_entry(ORGANIZATION_KEY) {
      None => None,
      Some(raw) => match serde_json::from_str(&raw) {
        Ok(organization) => Some(organization),
        Err(e) => {
          tracing::warn!(error = %e, "stored organization is corrupted, ignoring stored session");
          return None;
        }
      },
    };

    Some(Session {
      token,
      user,
      organization,
    })
  }

  fn read_entry(&self, key: &str) -> Option<String> {
    match self.storage.get(key) {
      Ok(value) => value,
      Err(e) => {
        tracing::warn!(key, error = %e, "failed to read session storage");
        None
      }
    }
  }

  /// Replace the identity after a successful login, signup or similar,
  /// and persist it. Returns the identity that was replaced.
  pub fn establish(&self, session: Session) -> Option<Arc<Session>> {
    let mut current = self.write();
    if let Err(e) = self.persist(&session) {
      tracing::warn!(error = %e, "failed to persist session, it will not survive a restart");
    }
    tracing::info!(user = %session.user.id, "session established");
    current.replace(Arc::new(session))
  }

  fn persist(&self, session: &Session) -> Result<()> {
    let user = serde_json::to_string(&session.user)?;
    match &session.organization {
      Some(organization) => {
        let organization = serde_json::to_string(organization)?;
        self.storage.replace(
          &[
            (TOKEN_KEY, session.token.as_str()),
            (USER_KEY, user.as_str()),
            (ORGANIZATION_KEY, organization.as_str()),
          ],
          &[],
        )
      }
      None => self.storage.replace(
        &[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user.as_str())],
        &[ORGANIZATION_KEY],
      ),
    }
  }

  /// Replace only the organization. Token and user stay untouched.
  ///
  /// Returns `false` (and changes nothing) when no one is signed in.
  pub fn update_organization(&self, organization: Organization) -> bool {
    let mut current = self.write();
    let Some(existing) = current.as_ref() else {
      tracing::debug!("organization update ignored, no active session");
      return false;
    };

    match serde_json::to_string(&organization) {
      Ok(raw) => {
        if let Err(e) = self.storage.set_many(&[(ORGANIZATION_KEY, raw.as_str())]) {
          tracing::warn!(error = %e, "failed to persist organization");
        }
      }
      Err(e) => tracing::warn!(error = %e, "failed to encode organization"),
    }

    let mut updated = Session::clone(existing);
    updated.organization = Some(organization);
    *current = Some(Arc::new(updated));
    true
  }

  /// Forget the identity in memory and on disk. Safe to call repeatedly.
  pub fn clear(&self) {
    let mut current = self.write();
    self.erase(&mut current);
  }

  /// Clear the session only if it still holds `token`. Returns whether it
  /// did; a later login is left alone.
  pub fn revoke(&self, token: &str) -> bool {
    let mut current = self.write();
    let matches = current
      .as_ref()
      .is_some_and(|session| session.token.as_str() == token);
    if matches {
      self.erase(&mut current);
    }
    matches
  }

  fn erase(&self, current: &mut Option<Arc<Session>>) {
    if let Err(e) = self
      .storage
      .remove_many(&[TOKEN_KEY, USER_KEY, ORGANIZATION_KEY])
    {
      tracing::warn!(error = %e, "failed to erase stored session");
    }
    if current.take().is_some() {
      tracing::info!("session cleared");
    }
  }

  pub fn is_authenticated(&self) -> bool {
    self.read().is_some()
  }

  /// Snapshot of the whole identity.
  pub fn current(&self) -> Option<Arc<Session>> {
    self.read().clone()
  }

  pub fn token(&self) -> Option<String> {
    self.read().as_ref().map(|s| s.token.as_str().to_string())
  }

  pub fn user(&self) -> Option<User> {
    self.read().as_ref().map(|s| s.user.clone())
  }

  pub fn organization(&self) -> Option<Organization> {
    self.read().as_ref().and_then(|s| s.organization.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user() -> User {
    User {
      id: "u1".to_string(),
      email: "ada@example.com".to_string(),
      name: "Ada".to_string(),
      role: UserRole::Owner,
    }
  }

  fn organization(name: &str) -> Organization {
    Organization {
      id: "o1".to_string(),
      name: name.to_string(),
      country: Some("KE".to_string()),
      business_type: None,
      onboarding_completed: false,
    }
  }

  fn session(token: &str) -> Session {
    Session {
      token: AuthToken::new(token).unwrap(),
      user: user(),
      organization: Some(organization("Acme")),
    }
  }

  fn store() -> (SessionStore, MemoryStorage) {
    let storage = MemoryStorage::new();
    (SessionStore::new(Box::new(storage.clone())), storage)
  }

  #[test]
  fn test_restore_without_stored_session() {
    let (store, _) = store();
    store.restore();
    assert!(!store.is_authenticated());
    assert_eq!(store.token(), None);
  }

  #[test]
  fn test_establish_then_clear() {
    let (store, storage) = store();

    store.establish(session("tok_abc"));
    assert!(store.is_authenticated());
    assert_eq!(store.user(), Some(user()));
    assert_eq!(store.organization(), Some(organization("Acme")));
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), Some("tok_abc".to_string()));

    store.clear();
    assert!(!store.is_authenticated());
    assert_eq!(store.user(), None);
    assert!(storage.keys().is_empty());

    // Idempotent
    store.clear();
    assert!(!store.is_authenticated());
  }

  #[test]
  fn test_restore_after_restart() {
    let storage = MemoryStorage::new();
    SessionStore::new(Box::new(storage.clone())).establish(session("tok_abc"));

    let restarted = SessionStore::new(Box::new(storage));
    restarted.restore();
    assert_eq!(restarted.current().as_deref(), Some(&session("tok_abc")));
  }

  #[test]
  fn test_corrupted_storage_reads_as_empty() {
    let storage = MemoryStorage::new();
    storage
      .set_many(&[(TOKEN_KEY, "tok_abc"), (USER_KEY, "{not json")])
      .unwrap();

    let store = SessionStore::new(Box::new(storage.clone()));
    store.restore();
    assert!(!store.is_authenticated());

    storage
      .set_many(&[
        (USER_KEY, serde_json::to_string(&user()).unwrap().as_str()),
        (ORGANIZATION_KEY, "[]"),
      ])
      .unwrap();
    store.restore();
    assert!(!store.is_authenticated());
  }

  #[test]
  fn test_update_organization_leaves_token_and_user() {
    let (store, storage) = store();
    store.establish(session("tok_abc"));

    let mut onboarded = organization("Acme Ltd");
    onboarded.onboarding_completed = true;
    assert!(store.update_organization(onboarded.clone()));

    assert_eq!(store.token(), Some("tok_abc".to_string()));
    assert_eq!(store.user(), Some(user()));
    assert_eq!(store.organization(), Some(onboarded.clone()));

    let persisted: Organization =
      serde_json::from_str(&storage.get(ORGANIZATION_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(persisted, onboarded);
  }

  #[test]
  fn test_update_organization_requires_session() {
    let (store, storage) = store();
    assert!(!store.update_organization(organization("Acme")));
    assert!(!store.is_authenticated());
    assert!(storage.keys().is_empty());
  }

  #[test]
  fn test_establish_without_organization_drops_stale_copy() {
    let (store, storage) = store();
    store.establish(session("tok_1"));

    let previous = store.establish(Session {
      token: AuthToken::new("tok_2").unwrap(),
      user: user(),
      organization: None,
    });

    assert_eq!(previous.map(|s| s.token.as_str().to_string()), Some("tok_1".to_string()));
    assert_eq!(storage.get(ORGANIZATION_KEY).unwrap(), None);
    assert_eq!(store.organization(), None);
  }

  /// Accepts a fixed number of writes, then fails every later one.
  struct LimitedStorage {
    inner: MemoryStorage,
    writes_left: std::sync::Mutex<u32>,
  }

  impl KeyValueStorage for LimitedStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
      self.inner.get(key)
    }

    fn replace(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<()> {
      let mut left = self.writes_left.lock().unwrap();
      if *left == 0 {
        return Err(color_eyre::eyre::eyre!("disk full"));
      }
      *left -= 1;
      self.inner.replace(set, remove)
    }
  }

  #[test]
  fn test_establish_writes_identity_in_one_step() {
    let storage = MemoryStorage::new();
    SessionStore::new(Box::new(storage.clone())).establish(session("tok_1"));

    let store = SessionStore::new(Box::new(LimitedStorage {
      inner: storage.clone(),
      writes_left: std::sync::Mutex::new(1),
    }));
    store.establish(Session {
      token: AuthToken::new("tok_2").unwrap(),
      user: user(),
      organization: None,
    });

    let restarted = SessionStore::new(Box::new(storage));
    restarted.restore();
    assert_eq!(restarted.token(), Some("tok_2".to_string()));
    assert_eq!(restarted.organization(), None);
  }

  #[test]
  fn test_revoke_only_clears_matching_token() {
    let (store, storage) = store();
    store.establish(session("tok_new"));

    assert!(!store.revoke("tok_old"));
    assert_eq!(store.token(), Some("tok_new".to_string()));

    assert!(store.revoke("tok_new"));
    assert!(!store.is_authenticated());
    assert!(storage.keys().is_empty());
  }
}
