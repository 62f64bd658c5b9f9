// Session endpoints
//
// `GET /session` returns the agent's full state; `POST /session` runs a
// command line in the agent's interactive session.

use reqwest::Method;
use tracing::debug;

use crate::client::{AgentClient, Endpoint};
use crate::error::Error;
use crate::models::{CommandRequest, CommandResponse, Session};

impl AgentClient {
    /// Fetch the agent's full session state.
    ///
    /// `GET {base}/session`
    pub async fn get_session(&self, endpoint: &Endpoint) -> Result<Session, Error> {
        let url = endpoint.url("session")?;
        self.send_json(self.request(Method::GET, endpoint, url))
            .await
    }

    /// Execute a command line on the agent.
    ///
    /// `POST {base}/session` with `{"cmd": "..."}`. A failing command comes
    /// back as a non-success status with an `{"error": "..."}` body, which
    /// surfaces as [`Error::Status`].
    pub async fn run_command(
        &self,
        endpoint: &Endpoint,
        cmd: &str,
    ) -> Result<CommandResponse, Error> {
        let url = endpoint.url("session")?;
        debug!(cmd, "running command");
        let builder = self
            .request(Method::POST, endpoint, url)
            .json(&CommandRequest { cmd });
        self.send_json(builder).await
    }
}
