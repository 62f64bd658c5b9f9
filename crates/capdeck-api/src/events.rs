// Event log endpoints

use reqwest::Method;

use crate::client::{AgentClient, Endpoint};
use crate::error::Error;
use crate::models::Event;

impl AgentClient {
    /// Fetch the most recent `limit` events, oldest first.
    ///
    /// `GET {base}/events?n={limit}`
    pub async fn get_events(&self, endpoint: &Endpoint, limit: u32) -> Result<Vec<Event>, Error> {
        let url = endpoint.url("events")?;
        let builder = self
            .request(Method::GET, endpoint, url)
            .query(&[("n", limit.to_string())]);
        self.send_json(builder).await
    }

    /// Wipe the agent's event log.
    ///
    /// `DELETE {base}/events`
    pub async fn clear_events(&self, endpoint: &Endpoint) -> Result<(), Error> {
        let url = endpoint.url("events")?;
        self.send(self.request(Method::DELETE, endpoint, url))
            .await?;
        Ok(())
    }
}
