use chrono::{DateTime, Utc};

use chirpy_types::models::{Message, User};

use crate::error::{Result, StoreError};
use crate::models::{MessageRecord, SortOrder, UserChanges, UserRecord, normalize_email};
use crate::password::{hash_password, verify_password};
use crate::{Database, Outcome};

impl Database {
    // -- Messages --

    pub fn create_message(&self, body: &str, author_id: u64) -> Result<Message> {
        self.with_snapshot_mut(|snapshot, sequences| {
            let record = MessageRecord {
                id: sequences.next_message(),
                author_id,
                body: body.to_string(),
            };
            snapshot.messages.insert(record.id, record.clone());
            Ok(Outcome::Changed(record.into()))
        })
    }

    pub fn get_message(&self, id: u64) -> Result<Message> {
        self.with_snapshot(|snapshot| {
            snapshot
                .messages
                .get(&id)
                .cloned()
                .map(Message::from)
                .ok_or_else(|| StoreError::NotFound(format!("message {id}")))
        })
    }

    /// Messages ordered by id, optionally only those by `author_id`.
    pub fn list_messages(&self, author_id: Option<u64>, order: SortOrder) -> Result<Vec<Message>> {
        self.with_snapshot(|snapshot| {
            let mut messages: Vec<Message> = snapshot
                .messages
                .values()
                .filter(|m| author_id.is_none_or(|a| m.author_id == a))
                .cloned()
                .map(Message::from)
                .collect();
            if order == SortOrder::Desc {
                messages.reverse();
            }
            Ok(messages)
        })
    }

    /// Remove a message. Returns whether it existed; a missing id is not an
    /// error and leaves the file untouched.
    pub fn delete_message(&self, id: u64) -> Result<bool> {
        self.with_snapshot_mut(|snapshot, _| {
            Ok(match snapshot.messages.remove(&id) {
                Some(_) => Outcome::Changed(true),
                None => Outcome::Unchanged(false),
            })
        })
    }

    // -- Users --

    pub fn create_user(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        // Hash outside the lock; Argon2 is deliberately slow.
        let password_hash = hash_password(self.policy(), password)?;

        self.with_snapshot_mut(|snapshot, sequences| {
            if snapshot.emails.contains_key(&email) {
                return Err(StoreError::Conflict(format!("user {email}")));
            }
            let record = UserRecord {
                id: sequences.next_user(),
                email,
                is_privileged: false,
                password_hash,
            };
            snapshot.emails.insert(record.email.clone(), record.id);
            let user = User::from(&record);
            snapshot.users.insert(record.id, record);
            Ok(Outcome::Changed(user))
        })
    }

    /// Apply the fields present in `changes`. An email already held by another
    /// user is a conflict.
    pub fn update_user(&self, id: u64, changes: UserChanges) -> Result<User> {
        let password_hash = changes
            .password
            .as_deref()
            .map(|p| hash_password(self.policy(), p))
            .transpose()?;
        let email = changes.email.as_deref().map(normalize_email);

        self.with_snapshot_mut(|snapshot, _| {
            let Some(record) = snapshot.users.get_mut(&id) else {
                return Err(StoreError::NotFound(format!("user {id}")));
            };
            if changes.is_empty() {
                return Ok(Outcome::Unchanged(User::from(&*record)));
            }

            if let Some(email) = email.filter(|e| *e != record.email) {
                match snapshot.emails.get(&email) {
                    Some(&owner) if owner != id => {
                        return Err(StoreError::Conflict(format!("user {email}")));
                    }
                    _ => {}
                }
                snapshot.emails.remove(&record.email);
                snapshot.emails.insert(email.clone(), id);
                record.email = email;
            }
            if let Some(hash) = password_hash {
                record.password_hash = hash;
            }
            if let Some(flag) = changes.is_privileged {
                record.is_privileged = flag;
            }

            Ok(Outcome::Changed(User::from(&*record)))
        })
    }

    pub fn get_user(&self, id: u64) -> Result<User> {
        self.with_snapshot(|snapshot| {
            snapshot
                .users
                .get(&id)
                .map(User::from)
                .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        let email = normalize_email(email);
        self.with_snapshot(|snapshot| {
            snapshot
                .emails
                .get(&email)
                .and_then(|id| snapshot.users.get(id))
                .map(User::from)
                .ok_or_else(|| StoreError::NotFound(format!("user {email}")))
        })
    }

    /// All users, ascending by id.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_snapshot(|snapshot| Ok(snapshot.users.values().map(User::from).collect()))
    }

    /// Check credentials. Unknown email and wrong password both yield
    /// [`StoreError::Unauthorized`].
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let record = self.with_snapshot(|snapshot| {
            Ok(snapshot
                .emails
                .get(&email)
                .and_then(|id| snapshot.users.get(id))
                .cloned())
        })?;

        // Verify after releasing the lock.
        match record {
            Some(record) if verify_password(password, &record.password_hash) => {
                Ok(User::from(&record))
            }
            Some(_) => Err(StoreError::Unauthorized),
            None => {
                let _ = verify_password(password, &self.decoy_hash);
                Err(StoreError::Unauthorized)
            }
        }
    }

    // -- Revocations --

    /// Record `token` as revoked now. Revoking twice keeps the first time.
    pub fn revoke_token(&self, token: &str) -> Result<()> {
        self.with_snapshot_mut(|snapshot, _| {
            if snapshot.revocations.contains_key(token) {
                return Ok(Outcome::Unchanged(()));
            }
            snapshot.revocations.insert(token.to_string(), Utc::now());
            Ok(Outcome::Changed(()))
        })
    }

    pub fn is_token_revoked(&self, token: &str) -> Result<bool> {
        self.with_snapshot(|snapshot| Ok(snapshot.revocations.contains_key(token)))
    }

    pub fn token_revoked_at(&self, token: &str) -> Result<Option<DateTime<Utc>>> {
        self.with_snapshot(|snapshot| Ok(snapshot.revocations.get(token).copied()))
    }
}
