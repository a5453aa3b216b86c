//! Per-process load generation: materialise every target up front, then fire them on schedule.
use crate::attack::{AttackStream, Attacker, StaticTargets};
use crate::error::{LoadError, ScenarioError};
use crate::pacer::{pacer_for, Pacer};
use crate::wallet::{Account, HdWallets, Wallets};
use chainload_core::{Config, ConfigValidationError, Target};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Output of one user's generation unit.
type UnitOutput = (usize, Vec<Target>, usize);

pub struct LoadGenerator {
    config: Arc<Config>,
    targets_per_user: usize,
    num_users: usize,
    wallets: Arc<HdWallets>,
    pacer: Arc<dyn Pacer>,
    client: reqwest::Client,
    targets: Vec<Option<Target>>,
}

impl LoadGenerator {
    /// Validates `config` and sizes the target buffer at `tps * duration * targets_per_user`.
    pub fn apply_config(config: Arc<Config>, targets_per_user: usize) -> Result<Self, LoadError> {
        config.validate()?;
        let pacer: Arc<dyn Pacer> = Arc::from(pacer_for(config.pacer()?, &config));
        let wallets = HdWallets::from_mnemonic(&config.mnemonic, &config.address_prefix)?;

        let num_users = config.num_users();
        let capacity = num_users.checked_mul(targets_per_user).ok_or(
            ConfigValidationError::TooManyTargets {
                users: num_users,
                per_user: targets_per_user,
            },
        )?;
        debug!("Applying config: {num_users} users, {capacity} target slots");

        Ok(Self {
            config,
            targets_per_user,
            num_users,
            wallets: Arc::new(wallets),
            pacer,
            client: reqwest::Client::new(),
            targets: vec![None; capacity],
        })
    }

    /// Fire through `client` instead of a private one.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn num_users(&self) -> usize {
        self.num_users
    }

    pub fn target_capacity(&self) -> usize {
        self.targets.len()
    }

    /// Targets built so far, in buffer order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().flatten()
    }

    pub fn is_loaded(&self) -> bool {
        self.targets.iter().any(Option::is_some)
    }

    /// Runs `generate` for every virtual user on the blocking pool, at most `max_workers` at a
    /// time, and stores the output in the user's slots.
    ///
    /// The first failure stops scheduling. Units already running are drained, then the first
    /// error is returned and the buffer is left empty. Returns the number of targets built.
    #[instrument(skip_all, fields(users = self.num_users))]
    pub async fn build_targets<F>(&mut self, generate: F) -> Result<usize, LoadError>
    where
        F: Fn(&Account, usize) -> Result<(Vec<Target>, usize), ScenarioError>
            + Send
            + Sync
            + 'static,
    {
        self.targets.iter_mut().for_each(|slot| *slot = None);

        let generate = Arc::new(generate);
        let gate = Arc::new(Semaphore::new(self.config.max_workers));
        let failure: Arc<Mutex<Option<LoadError>>> = Arc::new(Mutex::new(None));
        let mut units: JoinSet<Option<UnitOutput>> = JoinSet::new();

        for index in 0..self.num_users {
            let permit = gate
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| LoadError::GateClosed)?;

            let failed = failure.lock()?.is_some();
            if failed {
                debug!("Not scheduling user {index} after a failure");
                break;
            }

            let wallets = self.wallets.clone();
            let generate = generate.clone();
            let failure = failure.clone();
            units.spawn_blocking(move || {
                let _permit = permit;
                let outcome = wallets
                    .account(index)
                    .map_err(LoadError::from)
                    .and_then(|account| generate(&account, index).map_err(LoadError::from));

                match outcome {
                    Ok((targets, count)) => Some((index, targets, count)),
                    Err(err) => {
                        error!("Target generation failed for user {index}: {err}");
                        record_failure(&failure, err);
                        None
                    }
                }
            });
        }

        let mut outputs = Vec::with_capacity(self.num_users);
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(Some(output)) => outputs.push(output),
                Ok(None) => {}
                Err(err) => record_failure(&failure, LoadError::Unit(err.to_string())),
            }
        }

        let first_error = failure.lock()?.take();
        if let Some(err) = first_error {
            return Err(err);
        }

        let per_user = self.targets_per_user;
        let mut built = 0;
        for (index, targets, count) in outputs {
            let slots = &mut self.targets[index * per_user..(index + 1) * per_user];
            for (slot, target) in slots.iter_mut().zip(targets.into_iter().take(count)) {
                *slot = Some(target);
                built += 1;
            }
        }

        info!("Built {built} targets for {} users", self.num_users);
        Ok(built)
    }

    /// A fresh attack over the loaded targets, paced by the configured pacer for the configured
    /// duration.
    pub fn fire(&self, label: &str) -> AttackStream {
        let targets = StaticTargets::new(self.targets().cloned().collect());
        let attacker = Attacker::new(self.client.clone(), self.pacer.clone(), self.config.duration);
        attacker.attack(targets, label)
    }
}

fn record_failure(slot: &Mutex<Option<LoadError>>, err: LoadError) {
    match slot.lock() {
        Ok(mut first) => {
            if first.is_none() {
                *first = Some(err);
            }
        }
        Err(_) => error!("Failure slot poisoned, dropping: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ScenarioKind, HEIGHT_PARAM};
    use chainload_core::StateParams;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn config(tps: u64, secs: u64, ramp: u64, target_url: &str) -> Arc<Config> {
        Arc::new(Config {
            tps,
            duration: Duration::from_secs(secs),
            ramp_up_time: Duration::from_secs(ramp),
            max_workers: 8,
            target_url: target_url.to_string(),
            chain_id: "test-chain".to_string(),
            mnemonic: "legal winner thank year wave sausage worth useful legal winner thank yellow"
                .to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn sizes_buffer_from_config() {
        let generator =
            LoadGenerator::apply_config(config(100, 4, 2, "http://localhost:1317"), 3).unwrap();
        assert_eq!(generator.num_users(), 400);
        assert_eq!(generator.target_capacity(), 1200);
        assert!(!generator.is_loaded());
    }

    #[test]
    fn rejects_invalid_config() {
        let cases = [
            (config(0, 4, 0, "http://localhost"), ConfigValidationError::ZeroTps),
            (config(1, 0, 0, "http://localhost"), ConfigValidationError::ZeroDuration),
            (config(1, 1, 0, ""), ConfigValidationError::EmptyTargetUrl),
        ];
        for (config, expected) in cases {
            match LoadGenerator::apply_config(config, 1) {
                Err(LoadError::Config(err)) => assert_eq!(err, expected),
                Err(err) => panic!("unexpected error {err}"),
                Ok(_) => panic!("expected {expected}"),
            }
        }
    }

    #[test]
    fn oversized_buffers_are_rejected() {
        let tps = usize::MAX as u64 / 8;
        match LoadGenerator::apply_config(config(tps, 4, 0, "http://localhost:1317"), 3) {
            Err(LoadError::Config(ConfigValidationError::TooManyTargets { users, per_user })) => {
                assert_eq!(users, (tps * 4) as usize);
                assert_eq!(per_user, 3);
            }
            Err(err) => panic!("unexpected error {err}"),
            Ok(_) => panic!("expected an overflow"),
        }

        match LoadGenerator::apply_config(config(u64::MAX / 2, 4, 0, "http://localhost:1317"), 1)
        {
            Err(LoadError::Config(ConfigValidationError::TooManyUsers { secs: 4, .. })) => {}
            Err(err) => panic!("unexpected error {err}"),
            Ok(_) => panic!("expected an overflow"),
        }
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn generation_respects_max_workers() {
        let mut generator =
            LoadGenerator::apply_config(config(40, 2, 0, "http://localhost:1317"), 1).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (running, highest) = (active.clone(), peak.clone());
        let built = generator
            .build_targets(move |account, _| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                highest.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok((vec![Target::get(format!("http://x/{}", account.address))], 1))
            })
            .await
            .unwrap();

        assert_eq!(built, 80);
        assert_eq!(active.load(Ordering::SeqCst), 0);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= 8, "{peak} units ran at once with max_workers 8");
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn fills_every_users_slots() {
        let cfg = config(5, 2, 0, "http://localhost:1317");
        let scenario = ScenarioKind::QueryAccount
            .build(cfg.clone(), &StateParams::new())
            .unwrap();
        let mut generator =
            LoadGenerator::apply_config(cfg, scenario.targets_per_user()).unwrap();

        let built = generator
            .build_targets(move |account, index| scenario.generate_target(account, index))
            .await
            .unwrap();
        assert_eq!(built, 10);

        let urls: std::collections::HashSet<_> =
            generator.targets().map(|t| t.url.clone()).collect();
        assert_eq!(urls.len(), 10);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn first_failure_wins_and_leaves_nothing_loaded() {
        let mut generator =
            LoadGenerator::apply_config(config(50, 2, 0, "http://localhost:1317"), 1).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let result = generator
            .build_targets(move |account, index| {
                counter.fetch_add(1, Ordering::SeqCst);
                if index == 3 {
                    return Err(ScenarioError::MissingParam(HEIGHT_PARAM));
                }
                std::thread::sleep(Duration::from_millis(20));
                Ok((vec![Target::get(format!("http://x/{}", account.address))], 1))
            })
            .await;

        assert!(matches!(
            result,
            Err(LoadError::Scenario(ScenarioError::MissingParam("height")))
        ));
        assert!(!generator.is_loaded());
        // Scheduling stopped well before every user ran.
        assert!(calls.load(Ordering::SeqCst) < 100);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn short_users_leave_empty_slots() {
        let mut generator =
            LoadGenerator::apply_config(config(2, 1, 0, "http://localhost:1317"), 3).unwrap();
        let built = generator
            .build_targets(|_, index| {
                let n = if index == 0 { 3 } else { 1 };
                Ok(((0..n).map(|i| Target::get(format!("http://x/{index}/{i}"))).collect(), n))
            })
            .await
            .unwrap();
        assert_eq!(built, 4);
        assert_eq!(generator.target_capacity(), 6);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    #[ntest::timeout(10000)]
    async fn fires_at_most_the_buffer() {
        let server = mock_service::spawn().await.unwrap();
        let cfg = config(20, 2, 1, &server.base_url());
        let scenario = ScenarioKind::QueryBlock
            .build(cfg.clone(), &StateParams::new())
            .unwrap();
        let mut generator =
            LoadGenerator::apply_config(cfg, scenario.targets_per_user()).unwrap();
        generator
            .build_targets(move |account, index| scenario.generate_target(account, index))
            .await
            .unwrap();

        let results: Vec<_> = generator.fire("query_block").collect().await;
        assert!(!results.is_empty());
        assert!(results.len() <= 40);
        assert!(results.iter().all(|r| r.attack == "query_block"));
        assert_eq!(server.calls("/blocks/latest"), results.len());
    }
}
