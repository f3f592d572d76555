//! In-memory document store backing the reference handlers.
//!
//! # Design Decisions
//! - `DashMap` collections, shared through `Arc`
//! - Email uniqueness is claimed through the `emails` index entry, so two
//!   concurrent sign-ups with one address cannot both succeed

use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Movie fields supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieInput {
    pub country: String,
    pub director: String,
    pub duration: f64,
    pub year: String,
    pub description: String,
    pub image: String,
    pub trailer_link: String,
    pub thumbnail: String,
    pub movie_id: i64,
    #[serde(rename = "nameRU")]
    pub name_ru: String,
    #[serde(rename = "nameEN")]
    pub name_en: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner: String,
    #[serde(flatten)]
    pub movie: MovieInput,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    users: DashMap<String, UserRecord>,
    emails: DashMap<String, String>,
    movies: DashMap<String, MovieRecord>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user; `Conflict` if the email is taken.
    pub fn create_user(&self, name: &str, email: &str, password_hash: String) -> Result<UserRecord, ApiError> {
        let id = Uuid::new_v4().to_string();
        match self.emails.entry(normalize_email(email)) {
            Entry::Occupied(_) => Err(ApiError::Conflict("User with this email already exists".to_string())),
            Entry::Vacant(slot) => {
                let record = UserRecord {
                    id: id.clone(),
                    name: name.to_string(),
                    email: email.trim().to_string(),
                    password_hash,
                };
                self.users.insert(id.clone(), record.clone());
                slot.insert(id);
                Ok(record)
            }
        }
    }

    pub fn find_user(&self, id: &str) -> Option<UserRecord> {
        self.users.get(id).map(|u| u.value().clone())
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<UserRecord> {
        let id = self.emails.get(&normalize_email(email))?.value().clone();
        self.find_user(&id)
    }

    /// Change name and email; `Conflict` if the new email belongs to someone else.
    pub fn update_user(&self, id: &str, name: &str, email: &str) -> Result<UserRecord, ApiError> {
        let current = self
            .find_user(id)
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let old_key = normalize_email(&current.email);
        let new_key = normalize_email(email);
        if new_key != old_key {
            match self.emails.entry(new_key) {
                Entry::Occupied(_) => {
                    return Err(ApiError::Conflict("User with this email already exists".to_string()))
                }
                Entry::Vacant(slot) => {
                    slot.insert(id.to_string());
                }
            }
            self.emails.remove(&old_key);
        }

        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        user.name = name.to_string();
        user.email = email.trim().to_string();
        Ok(user.value().clone())
    }

    pub fn add_movie(&self, owner: &str, movie: MovieInput) -> MovieRecord {
        let record = MovieRecord {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            movie,
        };
        self.movies.insert(record.id.clone(), record.clone());
        record
    }

    pub fn movies_of(&self, owner: &str) -> Vec<MovieRecord> {
        let mut movies: Vec<MovieRecord> = self
            .movies
            .iter()
            .filter(|m| m.owner == owner)
            .map(|m| m.value().clone())
            .collect();
        movies.sort_by_key(|m| m.movie.movie_id);
        movies
    }

    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }

    /// Delete a movie owned by `owner`.
    pub fn delete_movie(&self, id: &str, owner: &str) -> Result<MovieRecord, ApiError> {
        match self.movies.entry(id.to_string()) {
            Entry::Vacant(_) => Err(ApiError::NotFound("Movie not found".to_string())),
            Entry::Occupied(entry) if entry.get().owner != owner => {
                Err(ApiError::Forbidden("Cannot delete another user's movie".to_string()))
            }
            Entry::Occupied(entry) => Ok(entry.remove()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn movie(movie_id: i64) -> MovieInput {
        MovieInput {
            country: "USA".into(),
            director: "Someone".into(),
            duration: 120.0,
            year: "1999".into(),
            description: "A film".into(),
            image: "https://example.com/i.jpg".into(),
            trailer_link: "https://example.com/t".into(),
            thumbnail: "https://example.com/th.jpg".into(),
            movie_id,
            name_ru: "Фильм".into(),
            name_en: "Film".into(),
        }
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let store = DocumentStore::new();
        store.create_user("Al", "a@b.com", "h".into()).unwrap();
        let err = store.create_user("Bo", " A@B.com ", "h".into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(store.find_user_by_email("A@b.COM").is_some());
    }

    #[test]
    fn test_update_user_moves_email_index() {
        let store = DocumentStore::new();
        let al = store.create_user("Al", "a@b.com", "h".into()).unwrap();
        store.create_user("Bo", "bo@b.com", "h".into()).unwrap();

        assert_eq!(
            store.update_user(&al.id, "Al", "bo@b.com").unwrap_err().kind(),
            ErrorKind::Conflict
        );
        let updated = store.update_user(&al.id, "Alan", "alan@b.com").unwrap();
        assert_eq!(updated.name, "Alan");
        assert!(store.find_user_by_email("a@b.com").is_none());
        assert_eq!(store.find_user_by_email("alan@b.com").unwrap().id, al.id);
    }

    #[test]
    fn test_delete_movie_ownership() {
        let store = DocumentStore::new();
        let record = store.add_movie("owner-1", movie(1));

        assert_eq!(store.delete_movie("missing", "owner-1").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(store.delete_movie(&record.id, "owner-2").unwrap_err().kind(), ErrorKind::Forbidden);
        assert_eq!(store.delete_movie(&record.id, "owner-1").unwrap().id, record.id);
        assert_eq!(store.movie_count(), 0);
    }

    #[test]
    fn test_movies_are_scoped_to_owner() {
        let store = DocumentStore::new();
        store.add_movie("a", movie(2));
        store.add_movie("a", movie(1));
        store.add_movie("b", movie(3));
        let ids: Vec<i64> = store.movies_of("a").iter().map(|m| m.movie.movie_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_movie_wire_names() {
        let json = serde_json::to_value(MovieRecord {
            id: "m1".into(),
            owner: "u1".into(),
            movie: movie(5),
        })
        .unwrap();
        assert_eq!(json["_id"], "m1");
        assert_eq!(json["trailerLink"], "https://example.com/t");
        assert_eq!(json["nameRU"], "Фильм");
        assert_eq!(json["movieId"], 5);
    }
}
