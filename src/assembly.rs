//! Create-then-populate state machine for the curated playlist.
//!
//! ```text
//! Created ──create──▶ PlaylistCreated ──add (chunked)──▶ TracksAdded
//!    │                     │
//!    └──────────┬──────────┘
//!               ▼
//!      Failed { stage, cause }
//! ```
//!
//! A created playlist is never deleted on a later failure; its id and link stay
//! on the job and in [`Error::AssemblyFailed`] so the user can inspect or retry it.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::Error;
use crate::library::{LibraryClient, MAX_TRACKS_PER_ADD};
use crate::types::{CreatedPlaylist, PlaylistSummary, TrackId, TrackRef, UserId};

/// A step that can fail, named after the stage it would have reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStep {
    #[display("playlist creation")]
    PlaylistCreated,
    #[display("track insertion")]
    TracksAdded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssemblyStage {
    /// Nothing sent yet.
    Created,
    /// The playlist exists; tracks may be partially added.
    PlaylistCreated,
    /// Terminal success.
    TracksAdded,
    /// Terminal failure at `stage`; see `new_playlist` for what was left behind.
    Failed { stage: AssemblyStep, cause: String },
}

/// The unit of work for one create-and-populate request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AssemblyJob {
    pub target_name: String,
    pub description: String,
    pub source_playlist: PlaylistSummary,
    pub candidate_tracks: Vec<TrackId>,
    pub matched_tracks: Vec<TrackRef>,
    pub new_playlist: Option<CreatedPlaylist>,
    /// Leading `matched_tracks` already confirmed added.
    pub tracks_added: usize,
    pub stage: AssemblyStage,
}

impl AssemblyJob {
    /// A job with no side effects yet.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPlaylistName`] for a blank name, [`Error::EmptySelection`]
    /// when there is nothing to add.
    pub fn new(
        target_name: impl Into<String>,
        description: impl Into<String>,
        source_playlist: PlaylistSummary,
        candidate_tracks: Vec<TrackId>,
        matched_tracks: Vec<TrackRef>,
    ) -> Result<Self, Error> {
        let target_name = target_name.into().trim().to_string();
        if target_name.is_empty() {
            return Err(Error::InvalidPlaylistName);
        }
        if matched_tracks.is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok(Self {
            target_name,
            description: description.into(),
            source_playlist,
            candidate_tracks,
            matched_tracks,
            new_playlist: None,
            tracks_added: 0,
            stage: AssemblyStage::Created,
        })
    }

    /// Description given to the new playlist.
    #[must_use]
    pub fn playlist_description(&self) -> String {
        format!(
            "Collection of songs in {} that are {}, carefully chosen by Playlist Curator.",
            self.source_playlist.name, self.description
        )
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == AssemblyStage::TracksAdded
    }

    fn fail(&mut self, stage: AssemblyStep, cause: Error) -> Error {
        error!(
            %stage,
            error = %cause,
            playlist_id = ?self.new_playlist.as_ref().map(|p| &p.id),
            tracks_added = self.tracks_added,
            "Playlist assembly failed"
        );
        self.stage = AssemblyStage::Failed {
            stage,
            cause: cause.to_string(),
        };
        Error::AssemblyFailed {
            stage,
            playlist: self.new_playlist.clone(),
            source: Box::new(cause),
        }
    }
}

/// Drives an [`AssemblyJob`] against the user's library, one remote call at a time.
pub struct PlaylistAssembler<'a> {
    library: &'a LibraryClient,
    access_token: &'a str,
    user_id: &'a UserId,
}

impl<'a> PlaylistAssembler<'a> {
    #[must_use]
    pub fn new(library: &'a LibraryClient, access_token: &'a str, user_id: &'a UserId) -> Self {
        Self {
            library,
            access_token,
            user_id,
        }
    }

    /// Advance `job` from its recorded stage to `TracksAdded`.
    ///
    /// Running a failed job again resumes it: a job whose playlist exists only
    /// sends the tracks not yet added, and a finished job makes no calls.
    ///
    /// # Errors
    ///
    /// [`Error::AssemblyFailed`] with the step that failed and, once created,
    /// the playlist left on the account.
    pub async fn run(&self, job: &mut AssemblyJob) -> Result<CreatedPlaylist, Error> {
        let playlist = match job.new_playlist.clone() {
            Some(playlist) => playlist,
            None => self.create(job).await?,
        };
        if !job.is_complete() {
            self.add_remaining(job, &playlist).await?;
        }
        Ok(playlist)
    }

    async fn create(&self, job: &mut AssemblyJob) -> Result<CreatedPlaylist, Error> {
        let description = job.playlist_description();
        let created = self
            .library
            .create_playlist(self.access_token, self.user_id, &job.target_name, &description)
            .await;
        let playlist = created.map_err(|e| job.fail(AssemblyStep::PlaylistCreated, e))?;

        // Recorded before any track is sent so a later failure can still surface it.
        job.new_playlist = Some(playlist.clone());
        job.stage = AssemblyStage::PlaylistCreated;
        debug!(playlist_id = %playlist.id, "Created playlist");
        Ok(playlist)
    }

    async fn add_remaining(
        &self,
        job: &mut AssemblyJob,
        playlist: &CreatedPlaylist,
    ) -> Result<(), Error> {
        job.stage = AssemblyStage::PlaylistCreated;
        let uris: Vec<String> = job
            .matched_tracks
            .iter()
            .skip(job.tracks_added)
            .map(|t| t.track_id.uri())
            .collect();

        for chunk in uris.chunks(MAX_TRACKS_PER_ADD) {
            self.library
                .add_tracks(self.access_token, &playlist.id, chunk)
                .await
                .map_err(|e| job.fail(AssemblyStep::TracksAdded, e))?;
            job.tracks_added += chunk.len();
            debug!(
                playlist_id = %playlist.id,
                added = job.tracks_added,
                total = job.matched_tracks.len(),
                "Added tracks"
            );
        }

        job.stage = AssemblyStage::TracksAdded;
        info!(
            playlist_id = %playlist.id,
            tracks = job.matched_tracks.len(),
            "Playlist assembled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> PlaylistSummary {
        PlaylistSummary::new(
            "src",
            "Road Trip",
            3,
            "https://api.spotify.com/v1/playlists/src/tracks".parse().unwrap(),
        )
    }

    fn track(id: &str) -> TrackRef {
        TrackRef::new(id, "Title", "Artist", "Album")
    }

    #[test]
    fn new_job_starts_created() {
        let job = AssemblyJob::new("Happy", "happy", source(), vec![], vec![track("a")]).unwrap();
        assert_eq!(job.stage, AssemblyStage::Created);
        assert!(job.new_playlist.is_none());
        assert_eq!(job.tracks_added, 0);
    }

    #[test]
    fn blank_name_rejected() {
        let err = AssemblyJob::new("  ", "happy", source(), vec![], vec![track("a")]).unwrap_err();
        assert!(matches!(err, Error::InvalidPlaylistName));
    }

    #[test]
    fn empty_selection_rejected() {
        let err = AssemblyJob::new("Happy", "happy", source(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, Error::EmptySelection));
    }

    #[test]
    fn description_embeds_source_and_text() {
        let job = AssemblyJob::new("Happy", "upbeat", source(), vec![], vec![track("a")]).unwrap();
        assert_eq!(
            job.playlist_description(),
            "Collection of songs in Road Trip that are upbeat, \
             carefully chosen by Playlist Curator."
        );
    }

    #[test]
    fn failed_stage_serializes_with_cause() {
        let stage = AssemblyStage::Failed {
            stage: AssemblyStep::TracksAdded,
            cause: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&stage).unwrap(),
            serde_json::json!({"status": "failed", "stage": "tracks_added", "cause": "boom"})
        );
    }
}
