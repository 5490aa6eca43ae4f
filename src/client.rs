//! Remote calculator service and its HTTP client

use reqwest::blocking::Client;
use reqwest::header::{COOKIE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Identity;
use crate::error::{PlannerError, Result};
use crate::models::{Avatar, BatchComputeResponse, Catalog, EntityList, UpgradeRequest, Weapon};

pub const DEFAULT_BASE_URL: &str = "https://sg-public-api.hoyolab.com/event/calculateos";
const CLIENT_USER_AGENT: &str = "mat-planner/0.1";

/// Returned when the cookie carries no session at all
const RETCODE_NOT_LOGGED_IN: i64 = -100;

/// Everything the planner needs from the remote calculator
pub trait CalculatorService {
    fn avatars(&self) -> Result<Vec<Avatar>>;

    fn weapons(&self) -> Result<Vec<Weapon>>;

    /// Compute material consumption for a batch of upgrade requests
    fn batch_compute(&self, items: &[UpgradeRequest]) -> Result<BatchComputeResponse>;

    fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog {
            avatars: self.avatars()?,
            weapons: self.weapons()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HoyoLabClient {
    base_url: String,
    identity: Identity,
    client: Client,
}

impl HoyoLabClient {
    pub fn new(identity: Identity) -> Result<Self> {
        Self::with_base_url(identity, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(identity: Identity, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|err| PlannerError::remote(format!("client build failed: {err}")))?;

        debug!(uid = %identity.uid, region = %identity.region, "calculator client ready");
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            identity,
            client,
        })
    }

    fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .header(COOKIE, &self.identity.cookies)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .json(body)
            .send()
            .map_err(|err| PlannerError::remote(format!("http request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_else(|_| "<no body>".to_string());
            return Err(PlannerError::remote(format!(
                "http status {}: {message}",
                status.as_u16()
            )));
        }

        let envelope: ApiEnvelope = response
            .json()
            .map_err(|err| PlannerError::remote(format!("decode response failed: {err}")))?;
        unwrap_envelope(envelope)
    }

    fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let body = ListBody {
            element_attr_ids: [],
            weapon_cat_ids: [],
            page: 1,
            size: 999,
            is_all: true,
            lang: "en-us",
        };
        let list: EntityList<T> = self.post(path, &body)?;
        Ok(list.list)
    }
}

impl CalculatorService for HoyoLabClient {
    fn avatars(&self) -> Result<Vec<Avatar>> {
        self.list("avatar/list")
    }

    fn weapons(&self) -> Result<Vec<Weapon>> {
        self.list("weapon/list")
    }

    fn batch_compute(&self, items: &[UpgradeRequest]) -> Result<BatchComputeResponse> {
        debug!(items = items.len(), "batch compute");
        let body = ComputeBody {
            items,
            uid: &self.identity.uid,
            region: &self.identity.region,
        };
        self.post("batch_compute", &body)
    }
}

#[derive(Debug, Serialize)]
struct ListBody {
    element_attr_ids: [i64; 0],
    weapon_cat_ids: [i64; 0],
    page: u32,
    size: u32,
    is_all: bool,
    lang: &'static str,
}

#[derive(Debug, Serialize)]
struct ComputeBody<'a> {
    items: &'a [UpgradeRequest],
    uid: &'a str,
    region: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    retcode: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

fn unwrap_envelope<T: DeserializeOwned>(envelope: ApiEnvelope) -> Result<T> {
    if envelope.retcode == RETCODE_NOT_LOGGED_IN {
        return Err(PlannerError::InvalidIdentity);
    }
    if envelope.retcode != 0 {
        return Err(PlannerError::remote(envelope.message));
    }

    let data = match envelope.data {
        Some(serde_json::Value::Null) | None => {
            return Err(PlannerError::remote("response carried no data"));
        }
        Some(data) => data,
    };

    if data.get("HasUserInfo").and_then(serde_json::Value::as_bool) == Some(false) {
        return Err(PlannerError::InvalidIdentity);
    }

    serde_json::from_value(data)
        .map_err(|err| PlannerError::remote(format!("decode response failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> ApiEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn nonzero_retcode_is_remote_failure() {
        let result: Result<BatchComputeResponse> = unwrap_envelope(envelope(json!({
            "retcode": 10001,
            "message": "too many items",
            "data": null
        })));
        match result {
            Err(PlannerError::RemoteFailure { message }) => assert_eq!(message, "too many items"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_user_info_is_invalid_identity() {
        let result: Result<BatchComputeResponse> = unwrap_envelope(envelope(json!({
            "retcode": 0,
            "message": "OK",
            "data": { "HasUserInfo": false, "items": [] }
        })));
        assert!(matches!(result, Err(PlannerError::InvalidIdentity)));
    }

    #[test]
    fn not_logged_in_is_invalid_identity() {
        let result: Result<BatchComputeResponse> = unwrap_envelope(envelope(json!({
            "retcode": -100,
            "message": "Please login"
        })));
        assert!(matches!(result, Err(PlannerError::InvalidIdentity)));
    }

    #[test]
    fn success_decodes_data() {
        let response: BatchComputeResponse = unwrap_envelope(envelope(json!({
            "retcode": 0,
            "message": "OK",
            "data": {
                "HasUserInfo": true,
                "items": [],
                "available_material": [{ "id": 104301, "num": 12 }],
                "overall_consume": [{ "id": 104301, "name": "Teachings of Freedom", "num": 9, "lack_num": 0 }]
            }
        })))
        .unwrap();
        assert_eq!(response.available_material[0].num, 12);
        assert_eq!(response.overall_consume[0].name, "Teachings of Freedom");
    }

    #[test]
    fn list_body_matches_service_shape() {
        let body = ListBody {
            element_attr_ids: [],
            weapon_cat_ids: [],
            page: 1,
            size: 999,
            is_all: true,
            lang: "en-us",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "element_attr_ids": [],
                "weapon_cat_ids": [],
                "page": 1,
                "size": 999,
                "is_all": true,
                "lang": "en-us"
            })
        );
    }
}
