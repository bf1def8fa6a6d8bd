//! HTTP bridge to a running THOR simulator.
//!
//! The bridge process owns the simulator executable; this adapter only
//! speaks JSON to it. Expected endpoints:
//! - `POST {base_url}/start` -- body: [`StartRequest`]
//! - `POST {base_url}/reset` -- body: `{"scene": "...", "change_seed": bool}`
//! - `POST {base_url}/step`  -- body: an [`Action`]
//!
//! All three return JSON matching [`ServerResponse`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::traits::{Action, Frame, Observation, Simulator};
use crate::config::SimulatorConfig;

/// A simulator driven over HTTP.
#[derive(Debug)]
pub struct ThorSimulator {
    base_url: String,
    http: reqwest::Client,
    config: SimulatorConfig,
    seed: u64,
    last_observation: Option<Observation>,
    frame: Option<Frame>,
}

/// Launch parameters forwarded to the bridge.
#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    scene: &'a str,
    gpu_id: usize,
    grid_size: f64,
    fov: f64,
    randomize_objects: bool,
    seed: u64,
    local_executable_path: String,
}

/// The JSON shape returned by the bridge.
#[derive(Debug, Deserialize)]
struct ServerResponse {
    #[serde(default)]
    metadata: Option<Observation>,
    #[serde(default)]
    frame: Option<Frame>,
    #[serde(default)]
    error: Option<String>,
}

impl ThorSimulator {
    /// Create an adapter for the bridge configured in `config`. Nothing is
    /// contacted until [`Simulator::start`].
    pub fn new(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            base_url: config.server_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            config,
            seed,
            last_observation: None,
            frame: None,
        }
    }

    async fn post<B>(&self, endpoint: &str, body: &B) -> Result<ServerResponse>
    where
        B: Serialize + ?Sized,
    {
        let resp: ServerResponse = self
            .http
            .post(format!("{}/{endpoint}", self.base_url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to reach simulator bridge on {endpoint}"))?
            .error_for_status()
            .with_context(|| format!("simulator bridge rejected {endpoint}"))?
            .json()
            .await
            .with_context(|| format!("failed to parse simulator {endpoint} response"))?;

        if let Some(message) = &resp.error {
            anyhow::bail!("simulator bridge reported an error on {endpoint}: {message}");
        }
        Ok(resp)
    }

    fn absorb(&mut self, resp: ServerResponse) {
        if let Some(frame) = resp.frame {
            self.frame = Some(frame);
        }
        if let Some(metadata) = resp.metadata {
            self.last_observation = Some(metadata);
        }
    }
}

impl Simulator for ThorSimulator {
    async fn start(&mut self, scene: &str, gpu_id: usize) -> Result<()> {
        let body = StartRequest {
            scene,
            gpu_id,
            grid_size: self.config.grid_size,
            fov: self.config.fov,
            randomize_objects: self.config.randomize_objects,
            seed: self.seed,
            local_executable_path: self.config.local_executable_path().display().to_string(),
        };
        let resp = self.post("start", &body).await?;
        self.absorb(resp);

        tracing::debug!(scene, gpu_id, url = %self.base_url, "simulator started");
        Ok(())
    }

    async fn reset(&mut self, scene: &str, change_seed: bool) -> Result<()> {
        let body = serde_json::json!({ "scene": scene, "change_seed": change_seed });
        let resp = self.post("reset", &body).await?;
        self.last_observation = None;
        self.absorb(resp);

        tracing::debug!(scene, change_seed, "simulator reset");
        Ok(())
    }

    async fn step(&mut self, action: &Action) -> Result<Observation> {
        let resp = self.post("step", action).await?;
        let observation = resp
            .metadata
            .clone()
            .context("simulator step response carried no metadata")?;
        self.absorb(resp);
        Ok(observation)
    }

    fn last_observation(&self) -> Option<&Observation> {
        self.last_observation.as_ref()
    }

    fn current_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_response_tolerates_missing_fields() {
        let resp: ServerResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.metadata.is_none());
        assert!(resp.frame.is_none());

        let resp: ServerResponse = serde_json::from_str(
            r#"{"metadata": {"lastActionSuccess": true, "objects": []},
                "frame": {"width": 1, "height": 1, "data": [1, 2, 3]}}"#,
        )
        .unwrap();
        assert!(resp.metadata.unwrap().last_action_success);
        assert_eq!(resp.frame.unwrap().data, vec![1, 2, 3]);
    }

    #[test]
    fn new_trims_trailing_slash() {
        let config = SimulatorConfig {
            server_url: "http://localhost:8200/".into(),
            ..SimulatorConfig::default()
        };
        let sim = ThorSimulator::new(config, 4);
        assert_eq!(sim.base_url, "http://localhost:8200");
        assert!(sim.last_observation().is_none());
    }

    #[tokio::test]
    async fn start_against_unreachable_bridge_fails() {
        let config = SimulatorConfig {
            server_url: "http://127.0.0.1:9".into(),
            ..SimulatorConfig::default()
        };
        let mut sim = ThorSimulator::new(config, 0);
        assert!(sim.start("FloorPlan1", 0).await.is_err());
    }
}
