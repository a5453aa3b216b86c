//! The slave's HTTP surface: load targets, then fire them.
use crate::error::{HandlerError, ServerError};
use axum::{
    body::{Body, Bytes},
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chainload::error::{LoadError, ScenarioError};
use chainload::{LoadGenerator, ScenarioKind};
use chainload_core::{LoadRequest, FIRE_ENDPOINT, LOAD_ENDPOINT};
use futures_util::StreamExt;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};

const NDJSON: &str = "application/x-ndjson";

pub(crate) async fn server_task(port: u16) -> Result<(), ServerError> {
    let socket_addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let listener = TcpListener::bind(socket_addr).await?;

    debug!("Axum server starting up...");
    serve(listener).await?;

    Ok(())
}

/// Serves the slave API on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    axum::serve(listener, app()).await
}

pub fn app() -> Router {
    let state = ServerState {
        loaded: Mutex::new(None),
        client: reqwest::Client::new(),
    };

    Router::new()
        .route(LOAD_ENDPOINT, post(load))
        .route(FIRE_ENDPOINT, post(fire))
        .with_state(Arc::new(state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

struct ServerState {
    loaded: Mutex<Option<Loaded>>,
    client: reqwest::Client,
}

struct Loaded {
    generator: LoadGenerator,
    label: String,
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        use HandlerError::*;
        let status = match &self {
            Scenario(_)
            | Load(LoadError::Config(_))
            | Load(LoadError::Wallet(_))
            | Load(LoadError::Scenario(ScenarioError::UnknownScenario(_))) => {
                StatusCode::BAD_REQUEST
            }
            NotLoaded => StatusCode::CONFLICT,
            Load(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{self}");
        }
        (status, self.to_string()).into_response()
    }
}

#[instrument(skip_all, fields(target_type = %req.target_type))]
async fn load(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<LoadRequest>,
) -> Result<String, HandlerError> {
    // Held for the whole build so a concurrent fire never sees a half-built buffer.
    let mut loaded = state.loaded.lock().await;
    *loaded = None;

    let kind: ScenarioKind = req.target_type.parse()?;
    let config = Arc::new(req.config);
    let scenario = kind.build(config.clone(), &req.state_params)?;

    let mut generator = LoadGenerator::apply_config(config, scenario.targets_per_user())?
        .with_client(state.client.clone());
    let built = generator
        .build_targets(move |account, index| scenario.generate_target(account, index))
        .await?;

    info!("Loaded {built} targets");
    *loaded = Some(Loaded {
        generator,
        label: kind.to_string(),
    });

    Ok(format!("Loaded {built} targets for {kind}"))
}

#[instrument(skip_all)]
async fn fire(State(state): State<Arc<ServerState>>) -> Result<Response, HandlerError> {
    let stream = {
        let loaded = state.loaded.lock().await;
        let loaded = loaded.as_ref().ok_or(HandlerError::NotLoaded)?;
        info!("Firing {}", loaded.label);
        loaded.generator.fire(&loaded.label)
    };

    let body = Body::from_stream(stream.map(|result| result.encode_line().map(Bytes::from)));
    Ok(([(header::CONTENT_TYPE, NDJSON)], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainload_core::{decode_results, Config, StateParams};
    use reqwest::{header::CONTENT_TYPE, StatusCode};
    use std::time::Duration;

    async fn spawn_slave() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener));
        format!("http://{addr}")
    }

    fn config(target_url: &str) -> Config {
        Config {
            tps: 10,
            duration: Duration::from_secs(1),
            target_url: target_url.to_string(),
            chain_id: "mock-chain".to_string(),
            mnemonic: "legal winner thank year wave sausage worth useful legal winner thank yellow"
                .to_string(),
            ..Default::default()
        }
    }

    fn request(target_type: &str, config: Config) -> LoadRequest {
        LoadRequest {
            target_type: target_type.to_string(),
            config,
            state_params: StateParams::new(),
        }
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn fire_before_load_conflicts() {
        let slave = spawn_slave().await;
        let res = reqwest::Client::new()
            .post(format!("{slave}{FIRE_ENDPOINT}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn bad_loads_are_client_errors() {
        let slave = spawn_slave().await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{slave}{LOAD_ENDPOINT}"))
            .json(&request("tx_burn", config("http://localhost:1317")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(res.text().await.unwrap().contains("tx_burn"));

        let res = client
            .post(format!("{slave}{LOAD_ENDPOINT}"))
            .json(&request(
                "query_block",
                Config {
                    tps: 0,
                    ..config("http://localhost:1317")
                },
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    #[ntest::timeout(10000)]
    async fn load_then_fire_streams_results() {
        let chain = mock_service::spawn().await.unwrap();
        let slave = spawn_slave().await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{slave}{LOAD_ENDPOINT}"))
            .json(&request("query_account", config(&chain.base_url())))
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());

        let res = client
            .post(format!("{slave}{FIRE_ENDPOINT}"))
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());
        assert_eq!(res.headers()[CONTENT_TYPE], NDJSON);

        let results = decode_results(&res.bytes().await.unwrap()).unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 10);
        assert!(results.iter().all(|r| r.attack == "query_account"));
        assert!(results.iter().all(|r| r.is_success()));
    }
}
