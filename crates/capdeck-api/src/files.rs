// Remote file endpoints
//
// Raw text in both directions; the agent does not wrap file contents
// in JSON.

use reqwest::Method;
use tracing::debug;

use crate::client::{AgentClient, Endpoint};
use crate::error::Error;

impl AgentClient {
    /// Read a file from the agent's filesystem.
    ///
    /// `GET {base}/file?name={name}`
    pub async fn read_file(&self, endpoint: &Endpoint, name: &str) -> Result<String, Error> {
        let url = endpoint.url("file")?;
        debug!(name, "reading remote file");
        let builder = self
            .request(Method::GET, endpoint, url)
            .query(&[("name", name)]);
        let resp = self.send(builder).await?;
        resp.text().await.map_err(Error::Transport)
    }

    /// Overwrite a file on the agent's filesystem.
    ///
    /// `POST {base}/file?name={name}` with the raw contents as body.
    pub async fn write_file(
        &self,
        endpoint: &Endpoint,
        name: &str,
        contents: String,
    ) -> Result<(), Error> {
        let url = endpoint.url("file")?;
        debug!(name, bytes = contents.len(), "writing remote file");
        let builder = self
            .request(Method::POST, endpoint, url)
            .query(&[("name", name)])
            .body(contents);
        self.send(builder).await?;
        Ok(())
    }
}
