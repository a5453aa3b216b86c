mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use chainload::prelude::*;
    use chainload::scenario::HEIGHT_PARAM;
    use chainload::AttackResult;
    use futures::StreamExt;
    use std::sync::Arc;

    async fn run(generator: &LoadGenerator, label: &str) -> Vec<AttackResult> {
        generator.fire(label).collect().await
    }

    #[tokio::test]
    #[ntest::timeout(20000)]
    async fn ramped_run_never_outruns_the_buffer() {
        init();
        let chain = mock_service::spawn().await.unwrap();

        let config = Arc::new(config(&chain.base_url(), 100, 4, 2));
        let scenario = ScenarioKind::QueryAccount
            .build(config.clone(), &StateParams::new())
            .unwrap();
        let mut generator =
            LoadGenerator::apply_config(config, scenario.targets_per_user()).unwrap();
        assert_eq!(generator.num_users(), 400);
        assert_eq!(generator.target_capacity(), 400);

        let built = generator
            .build_targets(move |account, index| scenario.generate_target(account, index))
            .await
            .unwrap();
        assert_eq!(built, 400);

        let results = run(&generator, "query_account").await;
        assert!(!results.is_empty());
        assert!(results.len() <= 400, "fired {} of 400", results.len());
        // Duration bounds the run, so the ramp fires about 2 + 99 * 2 + 200 hits.
        assert!(results.len() >= 295, "fired {} of ~301", results.len());
        assert!(results.iter().all(AttackResult::is_success));
    }

    #[tokio::test]
    #[ntest::timeout(20000)]
    async fn constant_run_fires_the_whole_buffer() {
        init();
        let chain = mock_service::spawn().await.unwrap();

        let config = Arc::new(config(&chain.base_url(), 100, 4, 0));
        let scenario = ScenarioKind::QueryAccount
            .build(config.clone(), &StateParams::new())
            .unwrap();
        let mut generator =
            LoadGenerator::apply_config(config, scenario.targets_per_user()).unwrap();
        assert_eq!(generator.num_users(), 400);

        let built = generator
            .build_targets(move |account, index| scenario.generate_target(account, index))
            .await
            .unwrap();
        assert_eq!(built, 400);

        let results = run(&generator, "query_account").await;
        assert_eq!(results.len(), 400);
        assert!(results.iter().all(AttackResult::is_success));
    }

    #[tokio::test]
    #[ntest::timeout(10000)]
    async fn blocks_with_tx_results_starts_at_prepared_height() {
        init();
        let chain = mock_service::spawn().await.unwrap();

        let config = Arc::new(config(&chain.base_url(), 1, 1, 0));
        let params = StateParams::from([(HEIGHT_PARAM.to_string(), "3".to_string())]);
        let scenario = ScenarioKind::QueryBlocksWithTxResults
            .build(config.clone(), &params)
            .unwrap();
        let mut generator =
            LoadGenerator::apply_config(config, scenario.targets_per_user()).unwrap();
        generator
            .build_targets(move |account, index| scenario.generate_target(account, index))
            .await
            .unwrap();

        let targets: Vec<_> = generator.targets().collect();
        assert_eq!(targets.len(), 1);
        assert!(targets[0].url.ends_with("/blocks_with_tx_results/3?fetchsize=3"));

        let results = run(&generator, "query_blocks_with_tx_results").await;
        assert_eq!(results.len(), 1);
        assert_eq!(chain.calls("/blocks_with_tx_results/3"), 1);
    }

    #[tokio::test]
    #[ntest::timeout(20000)]
    async fn prepared_sends_are_accepted() {
        init();
        let chain = mock_service::spawn().await.unwrap();
        let client = reqwest::Client::new();

        let config = Arc::new(config(&chain.base_url(), 5, 2, 0));
        let master = HdWallets::from_mnemonic(MASTER_MNEMONIC, &config.address_prefix)
            .unwrap()
            .account(0)
            .unwrap();
        let users = HdWallets::from_mnemonic(&config.mnemonic, &config.address_prefix).unwrap();

        let scenario = ScenarioKind::TxSend
            .build(config.clone(), &StateParams::new())
            .unwrap();
        let params = Preparer::new(config.clone(), client.clone())
            .prepare(scenario.as_ref(), &master, &users, &StateParams::new())
            .await
            .unwrap();
        // One funding transaction per user.
        assert_eq!(chain.sequence(&master.address), 10);
        assert!(params.contains_key(HEIGHT_PARAM));

        let scenario = ScenarioKind::TxSend.build(config.clone(), &params).unwrap();
        let mut generator = LoadGenerator::apply_config(config, scenario.targets_per_user())
            .unwrap()
            .with_client(client);
        let built = generator
            .build_targets(move |account, index| scenario.generate_target(account, index))
            .await
            .unwrap();
        assert_eq!(built, 10);

        let results = run(&generator, "tx_send").await;
        assert!(!results.is_empty());
        assert!(results.iter().all(AttackResult::is_success));
        assert_eq!(chain.calls("/txs"), 10 + results.len());
    }
}
