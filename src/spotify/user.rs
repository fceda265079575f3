use super::{SpotifyClient, TransportError};
use crate::types::Identity;

impl SpotifyClient {
    /// Identity of the bearer of `access_token`.
    pub async fn current_user(&self, access_token: &str) -> Result<Identity, TransportError> {
        let request = self
            .transport
            .client()
            .get(self.endpoint("/me"))
            .bearer_auth(access_token);

        let response = self.transport.send(request).await?;
        Ok(response.json::<Identity>().await?)
    }
}
