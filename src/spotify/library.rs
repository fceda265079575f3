use super::{SpotifyClient, TransportError};
use crate::{
    info,
    types::{TrackItem, TrackPage},
    utils,
};

impl SpotifyClient {
    /// Reads the whole liked-songs collection, newest first as Spotify returns it.
    ///
    /// Pages are followed through `next` until the service reports none. Any
    /// page failure fails the whole read; nothing fetched so far is returned.
    pub async fn liked_track_ids(&self, access_token: &str) -> Result<Vec<String>, TransportError> {
        let mut next = Some(format!(
            "{}?limit={}",
            self.endpoint("/me/tracks"),
            utils::LIKED_PAGE_SIZE
        ));
        let mut ids = Vec::new();

        while let Some(url) = next {
            let page = self.track_page(&url, access_token).await?;
            let before = ids.len();
            ids.extend(page.items.into_iter().filter_map(track_id));
            info!("Fetched {} liked songs, total = {}", ids.len() - before, ids.len());
            next = page.next;
        }

        Ok(ids)
    }

    pub(super) async fn track_page(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<TrackPage, TransportError> {
        let request = self.transport.client().get(url).bearer_auth(access_token);
        let response = self.transport.send(request).await?;
        Ok(response.json::<TrackPage>().await?)
    }
}

// removed and local tracks come back without an id
fn track_id(item: TrackItem) -> Option<String> {
    item.track.and_then(|t| t.id).filter(|id| !id.is_empty())
}
