use reqwest::StatusCode;

use super::{SpotifyClient, TransportError};
use crate::types::{
    AddTracksRequest, CreatePlaylistRequest, CreatePlaylistResponse, PlaylistDetails,
    RemoveTracksRequest, TrackUri,
};

const PLAYLIST_PAGE_SIZE: u32 = 100;

impl SpotifyClient {
    /// Creates a playlist owned by the token bearer and returns its id.
    pub async fn create_playlist(
        &self,
        access_token: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<String, TransportError> {
        let body = CreatePlaylistRequest {
            name: name.to_string(),
            description: description.to_string(),
            public,
            collaborative: false,
        };

        let request = self
            .transport
            .client()
            .post(self.endpoint("/me/playlists"))
            .bearer_auth(access_token)
            .json(&body);

        let response = self.transport.send(request).await?;
        Ok(response.json::<CreatePlaylistResponse>().await?.id)
    }

    pub async fn playlist_details(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<PlaylistDetails, TransportError> {
        let request = self
            .transport
            .client()
            .get(self.endpoint(&format!("/playlists/{playlist_id}")))
            .query(&[("fields", "name,description")])
            .bearer_auth(access_token);

        let response = self.transport.send(request).await?;
        Ok(response.json::<PlaylistDetails>().await?)
    }

    /// URIs currently in the playlist, in playlist order. Local files are left out.
    pub async fn playlist_track_uris(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Vec<String>, TransportError> {
        let mut next = Some(format!(
            "{}?limit={}",
            self.endpoint(&format!("/playlists/{playlist_id}/tracks")),
            PLAYLIST_PAGE_SIZE
        ));
        let mut uris = Vec::new();

        while let Some(url) = next {
            let page = self.track_page(&url, access_token).await?;
            uris.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.track.and_then(|t| t.uri))
                    .filter(|uri| !uri.starts_with("spotify:local:")),
            );
            next = page.next;
        }

        Ok(uris)
    }

    /// Whether `user_id` still follows the playlist. Deleting a playlist you
    /// own is an unfollow on Spotify, so `false` also covers deletion.
    pub async fn is_following_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<bool, TransportError> {
        let request = self
            .transport
            .client()
            .get(self.endpoint(&format!("/playlists/{playlist_id}/followers/contains")))
            .query(&[("ids", user_id)])
            .bearer_auth(access_token);

        let response = self.transport.send(request).await?;
        let follows = response.json::<Vec<bool>>().await?;
        Ok(follows.first().copied().unwrap_or(false))
    }

    /// Appends up to 100 URIs. Returns the status so callers can insist on 201.
    pub async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<StatusCode, TransportError> {
        let body = AddTracksRequest {
            uris: uris.to_vec(),
        };

        let request = self
            .transport
            .client()
            .post(self.endpoint(&format!("/playlists/{playlist_id}/tracks")))
            .bearer_auth(access_token)
            .json(&body);

        Ok(self.transport.send(request).await?.status())
    }

    /// Removes every occurrence of up to 100 URIs.
    pub async fn remove_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<StatusCode, TransportError> {
        let body = RemoveTracksRequest {
            tracks: uris.iter().map(|uri| TrackUri { uri: uri.clone() }).collect(),
        };

        let request = self
            .transport
            .client()
            .delete(self.endpoint(&format!("/playlists/{playlist_id}/tracks")))
            .bearer_auth(access_token)
            .json(&body);

        Ok(self.transport.send(request).await?.status())
    }

    pub async fn unfollow_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<(), TransportError> {
        let request = self
            .transport
            .client()
            .delete(self.endpoint(&format!("/playlists/{playlist_id}/followers")))
            .bearer_auth(access_token);

        self.transport.send(request).await?;
        Ok(())
    }
}
