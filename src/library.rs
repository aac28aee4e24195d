//! Identity and library reads, plus the two playlist writes used by assembly.

use futures::{Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::http;
use crate::types::{
    CreatedPlaylist, PlaylistId, PlaylistSummary, TrackId, TrackRef, UserId, UserIdentity,
};

/// Page size for playlist enumeration (service maximum).
const PLAYLIST_PAGE_LIMIT: u32 = 50;
/// Page size for playlist items (service maximum).
const PLAYLIST_ITEMS_PAGE_LIMIT: u32 = 100;
/// Most ids accepted by one track metadata request.
pub const MAX_TRACKS_PER_LOOKUP: usize = 50;
/// Most URIs accepted by one add-tracks request.
pub const MAX_TRACKS_PER_ADD: usize = 100;

/// Web API client for one bearer token's library.
pub struct LibraryClient {
    http: reqwest::Client,
    api_base: Url,
}

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct ProfileObject {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    tracks: PlaylistTracksRef,
}

#[derive(Deserialize)]
struct PlaylistTracksRef {
    href: Url,
    total: u32,
}

impl From<PlaylistObject> for PlaylistSummary {
    fn from(p: PlaylistObject) -> Self {
        PlaylistSummary::new(p.id, p.name, p.tracks.total, p.tracks.href)
    }
}

#[derive(Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    track: Option<ItemTrack>,
}

#[derive(Deserialize)]
struct ItemTrack {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct TracksResponse {
    tracks: Vec<Option<TrackObject>>,
}

#[derive(Deserialize)]
struct TrackObject {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<NamedObject>,
    album: NamedObject,
}

#[derive(Deserialize)]
struct NamedObject {
    name: String,
}

impl TrackObject {
    fn into_track_ref(self) -> Option<TrackRef> {
        let id = self.id?;
        let artist = self
            .artists
            .into_iter()
            .map(|a| a.name)
            .collect::<Vec<_>>()
            .join(", ");
        Some(TrackRef::new(id, self.name, artist, self.album.name))
    }
}

#[derive(Serialize)]
struct CreatePlaylistBody<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct CreatedPlaylistObject {
    id: String,
    external_urls: ExternalUrls,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: String,
}

#[derive(Serialize)]
struct AddTracksBody<'a> {
    uris: &'a [String],
}

impl LibraryClient {
    /// `api_base` must end with `/`; see
    /// [`CuratorConfig::with_api_base_url`](crate::CuratorConfig::with_api_base_url).
    #[must_use]
    pub fn new(api_base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /me`.
    ///
    /// # Errors
    ///
    /// [`Error::Unauthorized`] on 401, [`Error::TransientFetch`] on network or 5xx.
    pub async fn fetch_identity(&self, access_token: &str) -> Result<UserIdentity, Error> {
        let url = self.endpoint(&["me"])?;
        let profile: ProfileObject =
            http::send_json(self.http.get(url).bearer_auth(access_token), "identity").await?;
        Ok(UserIdentity {
            user_id: UserId(profile.id),
            display_name: profile.display_name,
        })
    }

    /// Every playlist of the current user, in server order, following `next`
    /// links until the last page.
    ///
    /// The stream is lazy; calling this again starts over from the first page.
    pub fn playlists<'a>(
        &'a self,
        access_token: &'a str,
    ) -> impl Stream<Item = Result<PlaylistSummary, Error>> + 'a {
        let first = self.endpoint(&["me", "playlists"]).map(|mut url| {
            url.query_pairs_mut()
                .append_pair("limit", &PLAYLIST_PAGE_LIMIT.to_string())
                .append_pair("offset", "0");
            url
        });
        self.paginate::<PlaylistObject>(first, access_token, "playlist listing")
            .map_ok(PlaylistSummary::from)
    }

    /// Collects [`playlists`](Self::playlists).
    ///
    /// # Errors
    ///
    /// The first page failure; nothing is returned partially.
    pub async fn list_playlists(&self, access_token: &str) -> Result<Vec<PlaylistSummary>, Error> {
        self.playlists(access_token).try_collect().await
    }

    /// Ids of every track in a playlist, in playlist order.
    ///
    /// The items URL is built from `playlist_id` on the API base; a
    /// caller-supplied endpoint is never followed with the bearer token.
    /// Local files and podcast episodes have no usable track id and are skipped.
    ///
    /// # Errors
    ///
    /// Same mapping as [`fetch_identity`](Self::fetch_identity).
    pub async fn playlist_track_ids(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
    ) -> Result<Vec<TrackId>, Error> {
        let first = self
            .endpoint(&["playlists", playlist_id.0.as_str(), "tracks"])
            .map(|mut url| {
                url.query_pairs_mut()
                    .append_pair("limit", &PLAYLIST_ITEMS_PAGE_LIMIT.to_string())
                    .append_pair("offset", "0");
                url
            });

        self.paginate::<PlaylistItem>(first, access_token, "playlist items")
            .try_filter_map(|item| async move {
                Ok::<_, Error>(
                    item.track
                        .filter(|t| t.kind.as_deref().is_none_or(|k| k == "track"))
                        .and_then(|t| t.id)
                        .map(TrackId),
                )
            })
            .try_collect()
            .await
    }

    /// Track metadata for `ids`, in the same order. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Same mapping as [`fetch_identity`](Self::fetch_identity).
    pub async fn fetch_tracks(
        &self,
        access_token: &str,
        ids: &[TrackId],
    ) -> Result<Vec<TrackRef>, Error> {
        let mut tracks = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_TRACKS_PER_LOOKUP) {
            let joined = chunk
                .iter()
                .map(TrackId::as_str)
                .collect::<Vec<_>>()
                .join(",");
            let mut url = self.endpoint(&["tracks"])?;
            url.query_pairs_mut().append_pair("ids", &joined);

            let response: TracksResponse =
                http::send_json(self.http.get(url).bearer_auth(access_token), "track lookup")
                    .await?;
            debug!(
                requested = chunk.len(),
                returned = response.tracks.len(),
                "Fetched track metadata"
            );
            tracks.extend(
                response
                    .tracks
                    .into_iter()
                    .flatten()
                    .filter_map(TrackObject::into_track_ref),
            );
        }
        Ok(tracks)
    }

    /// `POST /users/{user_id}/playlists`.
    ///
    /// # Errors
    ///
    /// Same mapping as [`fetch_identity`](Self::fetch_identity).
    pub async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &UserId,
        name: &str,
        description: &str,
    ) -> Result<CreatedPlaylist, Error> {
        let url = self.endpoint(&["users", user_id.0.as_str(), "playlists"])?;
        let created: CreatedPlaylistObject = http::send_json(
            self.http
                .post(url)
                .bearer_auth(access_token)
                .json(&CreatePlaylistBody { name, description }),
            "create playlist",
        )
        .await?;
        Ok(CreatedPlaylist {
            id: PlaylistId(created.id),
            link: created.external_urls.spotify,
        })
    }

    /// `POST /playlists/{id}/tracks` with at most [`MAX_TRACKS_PER_ADD`] URIs, appended in order.
    ///
    /// # Errors
    ///
    /// Same mapping as [`fetch_identity`](Self::fetch_identity).
    pub async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
        uris: &[String],
    ) -> Result<(), Error> {
        debug_assert!(uris.len() <= MAX_TRACKS_PER_ADD);
        let url = self.endpoint(&["playlists", playlist_id.0.as_str(), "tracks"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&AddTracksBody { uris })
            .send()
            .await
            .map_err(http::transport_error("add tracks"))?;
        http::ensure_success(response, "add tracks").await?;
        Ok(())
    }

    /// API URL for the given path segments, percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::Config(format!("API base URL cannot be a base: {}", self.api_base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Parses a server-supplied link; only links on the API origin may carry the token.
    fn api_link(&self, link: &str, operation: &'static str) -> Result<Url, Error> {
        let url = Url::parse(link).map_err(|e| Error::UnexpectedResponse {
            operation,
            detail: format!("invalid next link: {e}"),
        })?;
        if url.origin() != self.api_base.origin() {
            return Err(Error::UnexpectedResponse {
                operation,
                detail: format!(
                    "next link leaves the API origin: {}",
                    url.origin().ascii_serialization()
                ),
            });
        }
        Ok(url)
    }

    fn paginate<'a, T>(
        &'a self,
        first: Result<Url, Error>,
        access_token: &'a str,
        operation: &'static str,
    ) -> impl Stream<Item = Result<T, Error>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        async_stream::try_stream! {
            let mut next = Some(first?);
            let mut page_no = 0usize;
            while let Some(url) = next.take() {
                let page: Page<T> =
                    http::send_json(self.http.get(url).bearer_auth(access_token), operation).await?;
                page_no += 1;
                debug!(operation, page = page_no, items = page.items.len(), "Fetched page");

                next = page
                    .next
                    .as_deref()
                    .map(|link| self.api_link(link, operation))
                    .transpose()?;
                for item in page.items {
                    yield item;
                }
            }
        }
    }
}
