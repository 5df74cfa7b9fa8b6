//! One engine session: configuration, node client, scratch space and the
//! protocol parameter cache, created together and shared by every component.

use crate::params::{ProtocolParameterCache, ProtocolParameters, PARAMS_PREFIX};
use crate::scratch::ScratchSpace;
use crate::TxError;
use adakit_node::{CommandRunner, NodeCli, ProcessRunner, Tip, TxSource};
use adakit_types::{SessionConfig, TxId};

pub struct Session<R = ProcessRunner> {
    config: SessionConfig,
    node: NodeCli<R>,
    scratch: ScratchSpace,
    params: ProtocolParameterCache,
}

impl Session<ProcessRunner> {
    /// Session driving the real node binary.
    pub fn open(config: SessionConfig) -> Result<Self, TxError> {
        let node = NodeCli::from_config(&config);
        Self::from_parts(config, node)
    }
}

impl<R: CommandRunner> Session<R> {
    /// Session driving `runner` instead of the real binary.
    pub fn with_runner(config: SessionConfig, runner: R) -> Result<Self, TxError> {
        let node = NodeCli::new(&config, runner);
        Self::from_parts(config, node)
    }

    fn from_parts(config: SessionConfig, node: NodeCli<R>) -> Result<Self, TxError> {
        let scratch_dir = config.scratch_dir();
        std::fs::create_dir_all(&scratch_dir)?;
        let tag = config
            .scratch_tag
            .clone()
            .unwrap_or_else(ScratchSpace::default_tag);
        log::debug!("session scratch {} tag {}", scratch_dir.display(), tag);

        let scratch = ScratchSpace::new(scratch_dir, tag);
        let params = ProtocolParameterCache::new(scratch.session_path(PARAMS_PREFIX, "json"));
        Ok(Self {
            config,
            node,
            scratch,
            params,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn node(&self) -> &NodeCli<R> {
        &self.node
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    pub fn parameter_cache(&self) -> &ProtocolParameterCache {
        &self.params
    }

    pub async fn tip(&self) -> Result<Tip, TxError> {
        self.node
            .query_tip()
            .await
            .map_err(TxError::query("query tip"))
    }

    /// Re-query protocol parameters unconditionally.
    pub async fn refresh_parameters(&self) -> Result<ProtocolParameters, TxError> {
        self.params.refresh(&self.node).await
    }

    /// Cached protocol parameters, fetched on first use.
    pub async fn protocol_parameters(&self) -> Result<ProtocolParameters, TxError> {
        self.params.current(&self.node).await
    }

    /// Content-derived id of a body or of a signed transaction.
    pub async fn txid(&self, source: &TxSource) -> Result<TxId, TxError> {
        self.node
            .txid(source)
            .await
            .map_err(TxError::query("transaction txid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adakit_node::FakeNode;

    #[tokio::test]
    async fn test_creates_scratch_dir_and_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path()).with_scratch_tag("t1");
        let session = Session::with_runner(config, FakeNode::new()).unwrap();
        assert!(dir.path().join("tmp").is_dir());
        assert_eq!(session.scratch().tag(), "t1");

        session.protocol_parameters().await.unwrap();
        session.protocol_parameters().await.unwrap();
        let queries = session
            .node()
            .runner()
            .call_count("query protocol-parameters");
        assert_eq!(queries, 1);
        assert!(dir.path().join("tmp/protocol-parameters_t1.json").exists());

        session.refresh_parameters().await.unwrap();
        assert_eq!(
            session.node().runner().call_count("query protocol-parameters"),
            2
        );
    }

    #[tokio::test]
    async fn test_sessions_keep_separate_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let first = Session::with_runner(
            SessionConfig::new(dir.path()).with_scratch_tag("a"),
            FakeNode::new(),
        )
        .unwrap();
        let second_node = FakeNode::new();
        second_node.set_param("txFeePerByte", serde_json::json!(50));
        let second = Session::with_runner(
            SessionConfig::new(dir.path()).with_scratch_tag("b"),
            second_node,
        )
        .unwrap();

        assert_eq!(first.protocol_parameters().await.unwrap().tx_fee_per_byte, 44);
        assert_eq!(second.protocol_parameters().await.unwrap().tx_fee_per_byte, 50);

        let first_path = first.parameter_cache().path();
        let second_path = second.parameter_cache().path();
        assert_ne!(first_path, second_path);
        let on_disk = std::fs::read_to_string(first_path).unwrap();
        let on_disk = ProtocolParameters::from_json(&on_disk).unwrap();
        assert_eq!(on_disk.tx_fee_per_byte, 44);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let node = FakeNode::new();
        let session = Session::with_runner(SessionConfig::new(dir.path()), node).unwrap();
        assert_eq!(session.protocol_parameters().await.unwrap().tx_fee_per_byte, 44);

        session.node().runner().set_param("txFeePerByte", serde_json::json!(50));
        assert_eq!(session.protocol_parameters().await.unwrap().tx_fee_per_byte, 44);
        assert_eq!(session.refresh_parameters().await.unwrap().tx_fee_per_byte, 50);
    }
}
