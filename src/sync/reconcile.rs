use std::{fmt, sync::Arc};

use reqwest::StatusCode;

use crate::{
    config::PlaylistDefaults,
    failure, info,
    management::{SessionStore, StoreError},
    spotify::{SpotifyClient, TransportError},
    success,
    types::{PlaylistDetails, SyncReason, UserSession},
    utils::{self, BATCH_SIZE},
    warning,
};

/// Stage of a reconciliation pass, used to classify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchLiked,
    CheckPlaylist,
    ReadPlaylist,
    Empty,
    Unfollow,
    Create,
    Fill,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::FetchLiked => "fetching liked songs",
            Step::CheckPlaylist => "checking the mirror playlist",
            Step::ReadPlaylist => "reading the mirror playlist",
            Step::Empty => "emptying the mirror playlist",
            Step::Unfollow => "unfollowing the mirror playlist",
            Step::Create => "creating the mirror playlist",
            Step::Fill => "filling the mirror playlist",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum ReconcileError {
    /// A 401 ended the pass; remaining batches were not attempted.
    Unauthorized { step: Step },
    Remote { step: Step, source: TransportError },
    BatchesFailed { step: Step, failed: usize, total: usize },
    Store(StoreError),
}

impl ReconcileError {
    fn remote(step: Step, source: TransportError) -> Self {
        if source.is_unauthorized() {
            ReconcileError::Unauthorized { step }
        } else {
            ReconcileError::Remote { step, source }
        }
    }

    pub fn step(&self) -> Option<Step> {
        match self {
            ReconcileError::Unauthorized { step }
            | ReconcileError::Remote { step, .. }
            | ReconcileError::BatchesFailed { step, .. } => Some(*step),
            ReconcileError::Store(_) => None,
        }
    }

    pub fn reason(&self) -> SyncReason {
        match self.step() {
            Some(Step::FetchLiked) | Some(Step::CheckPlaylist) => SyncReason::FetchFailed,
            _ => SyncReason::WriteFailed,
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::Unauthorized { step } => write!(f, "unauthorized while {step}"),
            ReconcileError::Remote { step, source } => write!(f, "failed while {step}: {source}"),
            ReconcileError::BatchesFailed {
                step,
                failed,
                total,
            } => write!(f, "{failed} of {total} batches failed while {step}"),
            ReconcileError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReconcileError {}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        ReconcileError::Store(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub playlist_id: String,
    pub added: usize,
    pub removed: usize,
    pub recreated: bool,
}

/// Rebuilds a user's mirror playlist from their liked songs.
///
/// One pass: read the liked set, make sure the mirror exists and is still
/// followed (creating one otherwise), empty it, and append the liked set in
/// liked order. If emptying fails the mirror is abandoned and a fresh one
/// with the same name and description takes its place.
#[derive(Clone)]
pub struct PlaylistReconciler {
    client: SpotifyClient,
    store: Arc<dyn SessionStore>,
    defaults: PlaylistDefaults,
}

impl PlaylistReconciler {
    pub fn new(
        client: SpotifyClient,
        store: Arc<dyn SessionStore>,
        defaults: PlaylistDefaults,
    ) -> Self {
        Self {
            client,
            store,
            defaults,
        }
    }

    pub async fn reconcile(
        &self,
        session: &UserSession,
        access_token: &str,
    ) -> Result<ReconcileReport, ReconcileError> {
        info!("Fetching liked songs...");
        let liked = self
            .client
            .liked_track_ids(access_token)
            .await
            .map_err(|e| ReconcileError::remote(Step::FetchLiked, e))?;
        let uris = utils::dedup_preserving_order(
            liked.iter().map(|id| utils::track_uri(id)).collect(),
        );

        let mut removed = 0;
        let mut recreated = false;

        let playlist_id = match self.followed_playlist(session, access_token).await? {
            None => {
                recreated = true;
                self.create(session, access_token, None).await?
            }
            Some(playlist_id) => {
                let details = self.capture_details(access_token, &playlist_id).await?;

                info!("Emptying liked songs playlist...");
                match self.empty(access_token, &playlist_id).await? {
                    Some(count) => {
                        removed = count;
                        playlist_id
                    }
                    None => {
                        warning!("Failed to empty the liked songs playlist, replacing it...");
                        self.abandon(access_token, &playlist_id).await?;
                        recreated = true;
                        self.create(session, access_token, details).await?
                    }
                }
            }
        };

        info!("Adding the liked songs to the liked songs playlist...");
        let added = self.fill(access_token, &playlist_id, &uris).await?;

        Ok(ReconcileReport {
            playlist_id,
            added,
            removed,
            recreated,
        })
    }

    /// The stored mirror id, if the user still follows that playlist.
    async fn followed_playlist(
        &self,
        session: &UserSession,
        access_token: &str,
    ) -> Result<Option<String>, ReconcileError> {
        let Some(playlist_id) = session.playlist_id.clone() else {
            info!("User has no liked songs playlist yet, creating one...");
            return Ok(None);
        };

        let follows = self
            .client
            .is_following_playlist(access_token, &playlist_id, &session.id)
            .await
            .map_err(|e| ReconcileError::remote(Step::CheckPlaylist, e))?;

        if !follows {
            info!("User no longer follows playlist {}, creating a new one...", playlist_id);
            return Ok(None);
        }

        Ok(Some(playlist_id))
    }

    /// Name and description to reuse if the playlist has to be rebuilt.
    async fn capture_details(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Option<PlaylistDetails>, ReconcileError> {
        match self.client.playlist_details(access_token, playlist_id).await {
            Ok(details) => Ok(Some(details)),
            Err(e) if e.is_unauthorized() => Err(ReconcileError::Unauthorized {
                step: Step::ReadPlaylist,
            }),
            Err(e) => {
                failure!("Failed to fetch liked songs playlist details: {}", e);
                Ok(None)
            }
        }
    }

    async fn create(
        &self,
        session: &UserSession,
        access_token: &str,
        details: Option<PlaylistDetails>,
    ) -> Result<String, ReconcileError> {
        let (name, description) = match details {
            Some(d) => (
                d.name,
                d.description
                    .filter(|desc| !desc.is_empty())
                    .unwrap_or_else(|| self.defaults.description.clone()),
            ),
            None => (self.defaults.name.clone(), self.defaults.description.clone()),
        };

        let playlist_id = self
            .client
            .create_playlist(access_token, &name, &description, self.defaults.public)
            .await
            .map_err(|e| ReconcileError::remote(Step::Create, e))?;

        self.store.set_playlist(&session.id, &playlist_id).await?;
        success!("Created liked songs playlist, id = {}", playlist_id);
        Ok(playlist_id)
    }

    /// Removes the playlist's current contents in batches.
    ///
    /// Returns the number of URIs removed, or `None` when any batch (or the
    /// read of the current contents) failed for a reason other than 401.
    async fn empty(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Option<usize>, ReconcileError> {
        let current = match self.client.playlist_track_uris(access_token, playlist_id).await {
            Ok(uris) => utils::dedup_preserving_order(uris),
            Err(e) if e.is_unauthorized() => {
                return Err(ReconcileError::Unauthorized { step: Step::Empty });
            }
            Err(e) => {
                failure!("Failed to read the liked songs playlist: {}", e);
                return Ok(None);
            }
        };

        let mut all_ok = true;
        let mut count = 0;

        for batch in current.chunks(BATCH_SIZE) {
            match self
                .client
                .remove_tracks(access_token, playlist_id, batch)
                .await
            {
                Ok(status) if status == StatusCode::OK => {
                    count += batch.len();
                    info!(
                        "Removed {} songs, total removed = {} | total songs = {}",
                        batch.len(),
                        count,
                        current.len()
                    );
                }
                Ok(status) => {
                    failure!("Unexpected status {} while removing songs", status);
                    all_ok = false;
                }
                Err(e) if e.is_unauthorized() => {
                    failure!("Unauthorized while removing songs from the liked songs playlist");
                    return Err(ReconcileError::Unauthorized { step: Step::Empty });
                }
                Err(e) => {
                    failure!("Failed to remove songs from the liked songs playlist: {}", e);
                    all_ok = false;
                }
            }
        }

        Ok(all_ok.then_some(count))
    }

    async fn abandon(&self, access_token: &str, playlist_id: &str) -> Result<(), ReconcileError> {
        match self.client.unfollow_playlist(access_token, playlist_id).await {
            Ok(()) => {
                info!("Unfollowed old liked songs playlist {}", playlist_id);
                Ok(())
            }
            Err(e) if e.is_unauthorized() => Err(ReconcileError::Unauthorized {
                step: Step::Unfollow,
            }),
            Err(e) => {
                // the replacement is created either way
                failure!("Failed to unfollow old liked songs playlist: {}", e);
                Ok(())
            }
        }
    }

    /// Appends `uris` in order, 100 at a time. Every batch must answer 201.
    async fn fill(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<usize, ReconcileError> {
        let total = uris.len().div_ceil(BATCH_SIZE);
        let mut failed = 0;
        let mut count = 0;

        for batch in uris.chunks(BATCH_SIZE) {
            match self.client.add_tracks(access_token, playlist_id, batch).await {
                Ok(status) if status == StatusCode::CREATED => {
                    count += batch.len();
                    info!(
                        "Added {} songs, total added = {} | total songs = {}",
                        batch.len(),
                        count,
                        uris.len()
                    );
                }
                Ok(status) => {
                    failure!("Unexpected status {} while adding songs", status);
                    failed += 1;
                }
                Err(e) if e.is_unauthorized() => {
                    failure!("Unauthorized while adding songs to the liked songs playlist");
                    return Err(ReconcileError::Unauthorized { step: Step::Fill });
                }
                Err(e) => {
                    failure!("Failed to add songs to the liked songs playlist: {}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(ReconcileError::BatchesFailed {
                step: Step::Fill,
                failed,
                total,
            });
        }

        Ok(count)
    }
}
