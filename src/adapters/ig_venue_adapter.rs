//! IG Markets REST venue adapter.
//!
//! Session handshake: POST /session with the account credentials; the
//! venue answers with `CST` and `X-SECURITY-TOKEN` headers that every
//! subsequent request must carry alongside the API key.

use crate::domain::error::IgTraderError;
use crate::domain::intent::Side;
use crate::domain::market::{OrderResult, PricePoint, PriceSeries, Quote, Snapshot};
use crate::ports::config_port::ConfigPort;
use crate::ports::venue_port::VenuePort;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub const DEMO_BASE_URL: &str = "https://demo-api.ig.com/gateway/deal";
pub const LIVE_BASE_URL: &str = "https://api.ig.com/gateway/deal";

const ACCEPT_JSON: &str = "application/json; charset=UTF-8";
const POINT_TS_FMT: &str = "%Y/%m/%d %H:%M:%S";

/// Account credentials read from the `[venue]` config section.
#[derive(Debug, Clone)]
pub struct IgCredentials {
    pub username: String,
    pub password: String,
    pub api_key: String,
    pub demo: bool,
}

impl IgCredentials {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, IgTraderError> {
        let get = |key: &str| {
            config
                .get_string("venue", key)
                .ok_or_else(|| IgTraderError::ConfigMissing {
                    section: "venue".into(),
                    key: key.into(),
                })
        };

        let account_type = get("account_type")?;
        let demo = match account_type.to_lowercase().as_str() {
            "demo" => true,
            "live" => false,
            other => {
                return Err(IgTraderError::ConfigInvalid {
                    section: "venue".into(),
                    key: "account_type".into(),
                    reason: format!("expected demo or live, got {}", other),
                });
            }
        };

        Ok(Self {
            username: get("username")?,
            password: get("password")?,
            api_key: get("api_key")?,
            demo,
        })
    }

    pub fn base_url(&self) -> &'static str {
        if self.demo { DEMO_BASE_URL } else { LIVE_BASE_URL }
    }
}

/// Tokens issued at login. Owned by the adapter, never global.
#[derive(Debug, Clone)]
struct IgSession {
    base_url: String,
    api_key: String,
    cst: String,
    security_token: String,
}

pub struct IgVenueAdapter {
    http: Client,
    session: IgSession,
}

impl IgVenueAdapter {
    /// Authenticate and return an adapter holding the session. Any failure
    /// here is fatal to the process.
    pub fn login(credentials: &IgCredentials) -> Result<Self, IgTraderError> {
        let http = Client::new();
        let base_url = credentials.base_url().to_string();

        let response = http
            .post(format!("{}/session", base_url))
            .header("Accept", ACCEPT_JSON)
            .header("X-IG-API-KEY", &credentials.api_key)
            .header("Version", "2")
            .json(&SessionRequest {
                identifier: &credentials.username,
                password: &credentials.password,
                encrypted_password: None,
            })
            .send()
            .map_err(|e| IgTraderError::Auth {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(IgTraderError::Auth {
                reason: format!("login returned {}", response.status()),
            });
        }

        let session_header = |name: &str| -> Result<String, IgTraderError> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| IgTraderError::Auth {
                    reason: format!("login response missing {} header", name),
                })
        };

        let cst = session_header("CST")?;
        let security_token = session_header("X-SECURITY-TOKEN")?;

        Ok(Self {
            http,
            session: IgSession {
                base_url,
                api_key: credentials.api_key.clone(),
                cst,
                security_token,
            },
        })
    }

    fn with_session(&self, builder: RequestBuilder, version: &str) -> RequestBuilder {
        builder
            .header("Accept", ACCEPT_JSON)
            .header("X-IG-API-KEY", &self.session.api_key)
            .header("CST", &self.session.cst)
            .header("X-SECURITY-TOKEN", &self.session.security_token)
            .header("Version", version)
    }

    fn check(response: Response) -> Result<Response, IgTraderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let reason = response
            .text()
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect::<String>();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(IgTraderError::Auth {
                reason: format!("venue returned {}: {}", status, reason),
            });
        }
        Err(IgTraderError::Venue {
            status: status.as_u16(),
            reason,
        })
    }

    fn transport(e: reqwest::Error) -> IgTraderError {
        IgTraderError::Network {
            reason: e.to_string(),
        }
    }

    fn decode(e: reqwest::Error) -> IgTraderError {
        IgTraderError::Venue {
            status: 200,
            reason: format!("undecodable response body: {}", e),
        }
    }
}

impl VenuePort for IgVenueAdapter {
    fn fetch_history(
        &self,
        epic: &str,
        date: NaiveDate,
        interval: u32,
    ) -> Result<PriceSeries, IgTraderError> {
        let url = format!(
            "{}/prices/{}?resolution=SECOND_{}&from={}T00:00:00&to={}T23:59:59",
            self.session.base_url, epic, interval, date, date
        );

        let response = self
            .with_session(self.http.get(url), "3")
            .send()
            .map_err(Self::transport)?;
        let body: HistoryResponse = Self::check(response)?.json().map_err(Self::decode)?;

        Ok(body.into_series())
    }

    fn fetch_quote(&self, epic: &str) -> Result<Quote, IgTraderError> {
        let url = format!("{}/markets/{}", self.session.base_url, epic);

        let response = self
            .with_session(self.http.get(url), "3")
            .send()
            .map_err(Self::transport)?;
        let body: MarketResponse = Self::check(response)?.json().map_err(Self::decode)?;

        let snapshot = body.snapshot.ok_or_else(|| IgTraderError::Venue {
            status: 200,
            reason: format!("market response for {} carried no snapshot", epic),
        })?;

        Ok(Quote {
            epic: epic.to_string(),
            bid: snapshot.bid,
            offer: snapshot.offer,
            timestamp: Utc::now().naive_utc(),
        })
    }

    fn submit_order(
        &self,
        epic: &str,
        side: Side,
        size: f64,
    ) -> Result<OrderResult, IgTraderError> {
        let url = format!("{}/positions/otc", self.session.base_url);

        let response = self
            .with_session(self.http.post(url), "2")
            .json(&OrderRequest {
                epic,
                direction: &side.to_string(),
                size,
                order_type: "MARKET",
                expiry: "-",
            })
            .send()
            .map_err(Self::transport)?;
        let body: DealResponse = Self::check(response)?.json().map_err(Self::decode)?;

        Ok(OrderResult {
            deal_reference: body.deal_reference,
        })
    }
}

// Wire format.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
    encrypted_password: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderRequest<'a> {
    epic: &'a str,
    direction: &'a str,
    size: f64,
    order_type: &'a str,
    expiry: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealResponse {
    deal_reference: String,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    snapshot: Option<SnapshotWire>,
    #[serde(default)]
    prices: Vec<PricePointWire>,
}

impl HistoryResponse {
    fn into_series(self) -> PriceSeries {
        let points = self
            .prices
            .into_iter()
            .filter_map(|p| p.into_point())
            .collect();
        PriceSeries {
            snapshot: self.snapshot.map(SnapshotWire::into_snapshot),
            points,
        }
    }
}

#[derive(Deserialize)]
struct MarketResponse {
    #[serde(default)]
    snapshot: Option<SnapshotWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotWire {
    #[serde(default)]
    open: f64,
    #[serde(default)]
    close: f64,
    #[serde(default)]
    bid: f64,
    #[serde(default)]
    offer: f64,
}

impl SnapshotWire {
    fn into_snapshot(self) -> Snapshot {
        Snapshot {
            open: self.open,
            close: self.close,
            bid: self.bid,
            offer: self.offer,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricePointWire {
    snapshot_time: String,
    close_price: PriceFieldWire,
}

#[derive(Deserialize)]
struct PriceFieldWire {
    #[serde(default)]
    bid: Option<f64>,
    #[serde(default)]
    ask: Option<f64>,
}

impl PricePointWire {
    /// Points missing both sides of the close, or with an unparseable
    /// timestamp, are dropped.
    fn into_point(self) -> Option<PricePoint> {
        let close = match (self.close_price.bid, self.close_price.ask) {
            (Some(bid), Some(ask)) => (bid + ask) / 2.0,
            (Some(bid), None) => bid,
            (None, Some(ask)) => ask,
            (None, None) => return None,
        };
        let timestamp = NaiveDateTime::parse_from_str(&self.snapshot_time, POINT_TS_FMT).ok()?;
        Some(PricePoint { timestamp, close })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VENUE_INI: &str = "[venue]\n\
        username = demo_user\n\
        password = hunter2\n\
        api_key = abc123\n\
        account_type = demo\n";

    #[test]
    fn credentials_from_config() {
        let config = FileConfigAdapter::from_string(VENUE_INI).unwrap();
        let creds = IgCredentials::from_config(&config).unwrap();
        assert_eq!(creds.username, "demo_user");
        assert!(creds.demo);
        assert_eq!(creds.base_url(), DEMO_BASE_URL);
    }

    #[test]
    fn live_account_uses_live_gateway() {
        let ini = VENUE_INI.replace("demo", "live");
        let config = FileConfigAdapter::from_string(&ini).unwrap();
        let creds = IgCredentials::from_config(&config).unwrap();
        assert_eq!(creds.base_url(), LIVE_BASE_URL);
    }

    #[test]
    fn missing_key_is_config_error() {
        let config = FileConfigAdapter::from_string("[venue]\nusername = u\n").unwrap();
        match IgCredentials::from_config(&config) {
            Err(IgTraderError::ConfigMissing { section, .. }) => assert_eq!(section, "venue"),
            other => panic!("expected ConfigMissing, got {:?}", other.map(|c| c.username)),
        }
    }

    #[test]
    fn unknown_account_type_is_rejected() {
        let ini = VENUE_INI.replace("demo", "paper");
        let config = FileConfigAdapter::from_string(&ini).unwrap();
        assert!(matches!(
            IgCredentials::from_config(&config),
            Err(IgTraderError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn history_response_decodes_and_converts() {
        let json = r#"{
            "snapshot": {"open": 7500.0, "close": 7510.0, "bid": 7509.0, "offer": 7511.0},
            "prices": [
                {"snapshotTime": "2024/03/01 10:00:00", "closePrice": {"bid": 7500.0, "ask": 7502.0}},
                {"snapshotTime": "2024/03/01 10:00:10", "closePrice": {"bid": 7501.0}},
                {"snapshotTime": "2024/03/01 10:00:20", "closePrice": {}}
            ]
        }"#;
        let body: HistoryResponse = serde_json::from_str(json).unwrap();
        let series = body.into_series();

        let snapshot = series.snapshot.unwrap();
        assert_eq!(snapshot.offer, 7511.0);

        // Third point carried no close at all and is dropped.
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].close, 7501.0);
        assert_eq!(series.points[1].close, 7501.0);
    }

    #[test]
    fn history_response_without_snapshot_is_empty() {
        let body: HistoryResponse = serde_json::from_str("{}").unwrap();
        let series = body.into_series();
        assert!(series.snapshot.is_none());
        assert!(series.points.is_empty());
    }

    #[test]
    fn deal_response_decodes() {
        let body: DealResponse =
            serde_json::from_str(r#"{"dealReference": "DIAAAABBBCCC"}"#).unwrap();
        assert_eq!(body.deal_reference, "DIAAAABBBCCC");
    }

    #[test]
    fn order_request_serializes_venue_field_names() {
        let request = OrderRequest {
            epic: "IX.D.FTSE.DAILY.IP",
            direction: "BUY",
            size: 1.0,
            order_type: "MARKET",
            expiry: "-",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["orderType"], "MARKET");
        assert_eq!(json["direction"], "BUY");
        assert_eq!(json["expiry"], "-");
    }

    #[test]
    fn point_with_unparseable_timestamp_is_dropped() {
        let wire = PricePointWire {
            snapshot_time: "not a time".into(),
            close_price: PriceFieldWire {
                bid: Some(1.0),
                ask: Some(2.0),
            },
        };
        assert!(wire.into_point().is_none());
    }
}
