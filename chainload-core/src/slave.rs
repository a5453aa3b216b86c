use crate::Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque string-keyed parameters produced by state preparation and threaded into target
/// generation.
pub type StateParams = BTreeMap<String, String>;

/// One remote load generator driven by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slave {
    pub url: String,
    pub mnemonic: String,
    pub target_type: String,
}

impl Slave {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

/// Body of `POST /target/load`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    pub target_type: String,
    pub config: Config,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state_params: StateParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_request_keeps_protocol_shape() {
        let req = LoadRequest {
            target_type: "query_account".to_string(),
            config: Config::default(),
            state_params: StateParams::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["config".to_string(), "target_type".to_string()]);

        // Bodies from older controllers without params still parse.
        let parsed: LoadRequest = serde_json::from_value(serde_json::json!({
            "target_type": "tx_send",
            "config": {"tps": 1},
        }))
        .unwrap();
        assert!(parsed.state_params.is_empty());
        assert_eq!(parsed.config.tps, 1);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let slave = Slave {
            url: "http://10.0.0.1:8000/".to_string(),
            mnemonic: String::new(),
            target_type: String::new(),
        };
        assert_eq!(slave.endpoint("/target/load"), "http://10.0.0.1:8000/target/load");
    }
}
