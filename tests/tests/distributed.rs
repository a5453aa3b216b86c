mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use chainload::report::{BLOCKS_CHART, LATENCY_CHART, SUMMARY_FILE};
    use chainload::{Reporter, Slave};
    use chainload_runtime::{Controller, ControllerError};
    use std::time::Duration;

    fn slave(url: String, mnemonic: &str, target_type: &str) -> Slave {
        Slave {
            url,
            mnemonic: mnemonic.to_string(),
            target_type: target_type.to_string(),
        }
    }

    #[tokio::test]
    #[ntest::timeout(30000)]
    async fn two_slaves_prepare_fire_and_report() {
        init();
        let chain = mock_service::spawn().await.unwrap();
        let slaves = vec![
            slave(spawn_slave().await, SLAVE_MNEMONICS[0], "tx_send"),
            slave(spawn_slave().await, SLAVE_MNEMONICS[1], "query_account"),
        ];

        let mut controller = Controller::new(config(&chain.base_url(), 10, 2, 0), slaves);
        controller.prepare(MASTER_MNEMONIC).await.unwrap();
        assert_eq!(controller.state_params().len(), 2);

        let from = controller.latest_height().await.unwrap();
        controller.start_load_test().await.unwrap();
        // Let at least one more block close over the fired transactions.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let to = controller.latest_height().await.unwrap();
        assert!(to > from);

        assert!(controller.results().iter().all(|body| !body.is_empty()));
        let results = controller.attack_results().unwrap();
        assert!(results.len() <= 40);
        assert!(results.iter().any(|r| r.attack == "tx_send"));
        assert!(results.iter().any(|r| r.attack == "query_account"));
        assert!(results.iter().all(|r| r.is_success()));

        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(
            reqwest::Client::new(),
            &chain.base_url(),
            Some(dir.path().to_path_buf()),
        );
        let report = reporter.report(&results, from, to).await.unwrap();
        assert_eq!(report.metrics.requests(), results.len() as u64);
        assert_eq!(report.metrics.success_ratio(), 1.0);
        assert_eq!(report.blocks.len() as u64, to - from);
        for file in [LATENCY_CHART, BLOCKS_CHART, SUMMARY_FILE] {
            assert!(dir.path().join(file).exists(), "{file} missing");
        }
    }

    #[tokio::test]
    #[ntest::timeout(10000)]
    async fn rejected_load_fires_nothing() {
        init();
        let chain = mock_service::spawn().await.unwrap();
        let slaves = vec![
            slave(spawn_slave().await, SLAVE_MNEMONICS[0], "query_block"),
            slave(spawn_slave().await, SLAVE_MNEMONICS[1], "tx_burn"),
        ];

        let mut controller = Controller::new(config(&chain.base_url(), 10, 1, 0), slaves);
        let err = controller.start_load_test().await.unwrap_err();

        match err {
            ControllerError::RequestFailed { status, body, .. } => {
                assert_eq!(status, Some(reqwest::StatusCode::BAD_REQUEST));
                assert!(body.contains("tx_burn"));
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(controller.results().iter().all(Vec::is_empty));
        assert_eq!(chain.calls("/blocks/latest"), 0);
    }
}
