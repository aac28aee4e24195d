use std::hash::{Hash, Hasher};

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use url::Url;

/// Music service user identifier (`/me` → `id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Music service playlist identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct PlaylistId(pub String);

/// Music service track identifier (base-62, without the `spotify:track:` prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI form accepted by the add-tracks endpoint.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The authenticated user. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct UserIdentity {
    pub user_id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserIdentity {
    #[must_use]
    pub fn new(user_id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            display_name,
        }
    }
}

/// Read-only projection of one of the user's playlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PlaylistSummary {
    pub id: PlaylistId,
    pub name: String,
    pub track_count: u32,
    /// Items endpoint as reported by the service. Informational only: reads are
    /// built from `id` so a forged endpoint never receives the token.
    pub tracks_endpoint: Url,
}

impl PlaylistSummary {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        track_count: u32,
        tracks_endpoint: Url,
    ) -> Self {
        Self {
            id: PlaylistId(id.into()),
            name: name.into(),
            track_count,
            tracks_endpoint,
        }
    }
}

/// A track with display metadata. Two refs are equal when their ids are.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrackRef {
    pub track_id: TrackId,
    pub title: String,
    /// All artist names joined with `", "`.
    pub artist: String,
    pub album: String,
}

impl TrackRef {
    #[must_use]
    pub fn new(
        track_id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            track_id: TrackId(track_id.into()),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
        }
    }
}

impl PartialEq for TrackRef {
    fn eq(&self, other: &Self) -> bool {
        self.track_id == other.track_id
    }
}

impl Eq for TrackRef {}

impl Hash for TrackRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.track_id.hash(state);
    }
}

/// A playlist created by assembly: its id and the link a user can open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub id: PlaylistId,
    /// External (web player) URL.
    pub link: String,
}

impl CreatedPlaylist {
    #[must_use]
    pub fn new(id: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: PlaylistId(id.into()),
            link: link.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn track_ref_equality_by_id_only() {
        let a = TrackRef::new("4uLU6hMCjMI75M1A2tKUQC", "Song", "Artist", "Album");
        let b = TrackRef::new("4uLU6hMCjMI75M1A2tKUQC", "Other title", "Other", "Other");
        let c = TrackRef::new("7ouMYWpwJ422jRcDASZB7P", "Song", "Artist", "Album");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn track_uri() {
        let id = TrackId::from("4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(id.uri(), "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn user_identity_serde_roundtrip() {
        let identity = UserIdentity::new("wizzler", Some("Wizzler".into()));
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, r#"{"user_id":"wizzler","display_name":"Wizzler"}"#);
        let parsed: UserIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, identity);
    }

    #[test]
    fn newtypes_prevent_mixing() {
        fn takes_track_id(_: &TrackId) {}
        fn takes_playlist_id(_: &PlaylistId) {}

        let track = TrackId::from("id".to_string());
        let playlist = PlaylistId::from("id".to_string());

        takes_track_id(&track);
        takes_playlist_id(&playlist);
        // takes_track_id(&playlist);  // Compile error!
        assert_eq!(track.to_string(), playlist.to_string());
    }
}
