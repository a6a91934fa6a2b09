use std::time::Duration;

use clap::Parser;
use reqwest::{Client, Url};

use crate::prelude::*;

/// Dead man's switch, pinged after every run.
#[derive(Parser)]
pub struct HeartbeatArgs {
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub url: Option<Url>,
}

impl HeartbeatArgs {
    /// Report the run outcome, failures get reported to the `/fail` endpoint.
    pub async fn send(&self, is_success: bool) {
        let Some(url) = &self.url else {
            return;
        };
        let result = match if is_success { Ok(url.clone()) } else { failure_url(url) } {
            Ok(url) => Self::send_fallible(url).await,
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    #[instrument(skip_all, fields(%url))]
    async fn send_fallible(url: Url) -> Result {
        info!("sending a heartbeat…");
        Client::builder()
            .timeout(Duration::from_secs(3))
            .build()?
            .post(url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn failure_url(url: &Url) -> Result<Url> {
    let mut url = url.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("the heartbeat URL cannot be a base"))?
        .pop_if_empty()
        .push("fail");
    Ok(url)
}
