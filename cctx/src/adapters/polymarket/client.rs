//! Concrete Polymarket `Exchange` adapter.
//!
//! Market discovery goes through the Gamma API (richer metadata: volume,
//! liquidity, outcome labels); order execution and order books go through
//! the CLOB API. Every outbound call is wrapped in [`with_retry`], which
//! takes a [`RateLimiter`] slot before each attempt.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use super::parse::parse_market;
use super::settings::PolymarketSettings;
use crate::clob::{self, ContractRegistry, L2Credentials, MarketTerms, OrderParams};
use crate::config::ExchangeConfig;
use crate::error::{Error, Result};
use crate::exchange::{Capabilities, Exchange, MarketWebsocketCapable, OrderbookCapable, Params, SlugResolvable};
use crate::models::{
    Market, MarketId, Order, OrderId, OrderStatus, OrderbookData, Position, Side, TokenId,
};
use crate::orderbook::{OrderbookSource, Subscription};
use crate::ratelimit::RateLimiter;
use crate::retry::with_retry;
use crate::tracker::OrderTracker;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;

/// The concrete Polymarket adapter. Wraps the Gamma/CLOB HTTP surfaces,
/// the shared rate limiter and retry policy, order signing, and the
/// order tracker every `create_order` registers fills into.
pub struct PolymarketAdapter {
    http: HttpClient,
    settings: PolymarketSettings,
    config: ExchangeConfig,
    rate_limiter: RateLimiter,
    tracker: OrderTracker,
    signer: Option<PrivateKeySigner>,
    contracts: ContractRegistry,
    market_ws: Arc<Subscription>,
}

impl PolymarketAdapter {
    /// Construct a new adapter from caller-supplied config. The wallet
    /// signer is only built if `privateKey` was supplied; order
    /// submission without it fails with [`Error::Authentication`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the config or private key is
    /// malformed.
    pub fn new(config: ExchangeConfig) -> Result<Self> {
        let settings = PolymarketSettings::from_config(&config)?;

        let signer = settings
            .private_key
            .as_deref()
            .map(|key| {
                PrivateKeySigner::from_str(key)
                    .map(|signer| signer.with_chain_id(Some(settings.chain_id)))
                    .map_err(|err| Error::Config(format!("invalid private key: {err}")))
            })
            .transpose()?;

        let mut contracts = ContractRegistry::new();
        if let Some(contract) = settings.ctf_exchange_contract {
            contracts.insert(settings.chain_id, false, contract);
        }
        if let Some(contract) = settings.neg_risk_ctf_exchange_contract {
            contracts.insert(settings.chain_id, true, contract);
        }

        let http = HttpClient::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            settings,
            rate_limiter: RateLimiter::new(config.rate_limit),
            tracker: OrderTracker::new(),
            signer,
            contracts,
            market_ws: Subscription::new(Default::default()),
            config,
        })
    }

    fn l2_credentials(&self) -> Result<L2Credentials> {
        match (&self.settings.api_key, &self.settings.api_secret, &self.settings.api_passphrase) {
            (Some(api_key), Some(secret), Some(passphrase)) => Ok(L2Credentials {
                api_key: api_key.clone(),
                secret: secret.clone(),
                passphrase: passphrase.clone(),
            }),
            _ => Err(Error::Authentication("no L2 API credentials configured".to_string())),
        }
    }

    fn signer(&self) -> Result<&PrivateKeySigner> {
        self.signer
            .as_ref()
            .ok_or_else(|| Error::Authentication("no wallet private key configured".to_string()))
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        with_retry(
            &self.rate_limiter,
            self.config.max_retries,
            self.config.retry_delay(),
            self.config.retry_backoff,
            || async {
                let response = self.http.get(url).send().await.map_err(classify_reqwest_error)?;
                let response = response.error_for_status().map_err(classify_reqwest_error)?;
                response.json::<Value>().await.map_err(classify_reqwest_error)
            },
        )
        .await
    }

    async fn fetch_gamma_market_raw(&self, market_id: &MarketId) -> Result<Value> {
        let url = format!("{}/markets?condition_id={}", self.settings.gamma_base_url, market_id);
        let mut page = self.get_json(&url).await?;
        match page.as_array_mut().and_then(|arr| if arr.is_empty() { None } else { Some(arr.remove(0)) }) {
            Some(market) => Ok(market),
            None => Err(Error::MarketNotFound(market_id.to_string())),
        }
    }

    /// Outcome token id and market terms needed to build an order,
    /// derived from the market's metadata.
    fn order_terms(market: &Market, outcome: &str) -> Result<(TokenId, MarketTerms)> {
        let index = market
            .outcomes
            .iter()
            .position(|o| o == outcome)
            .ok_or_else(|| Error::InvalidOrder(format!("unknown outcome {outcome:?}")))?;

        let token_ids: Vec<String> = market
            .metadata
            .get("clob_token_ids")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        let token_id = token_ids
            .get(index)
            .map(|id| TokenId::new(id.clone()))
            .ok_or_else(|| Error::InvalidOrder("market has no clobTokenIds for this outcome".to_string()))?;

        let neg_risk = market
            .metadata
            .get("neg_risk")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok((token_id, MarketTerms { tick_size: market.tick_size, neg_risk, chain_id: 0 }))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() || err.is_connect() {
        Error::Network(err.to_string())
    } else if err.status().is_some_and(|s| s.as_u16() == 429) {
        Error::RateLimit(err.to_string())
    } else {
        Error::Http(err)
    }
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

#[async_trait]
impl Exchange for PolymarketAdapter {
    fn id(&self) -> &'static str {
        "polymarket"
    }

    fn name(&self) -> &'static str {
        "Polymarket"
    }

    fn describe(&self) -> Capabilities {
        Capabilities {
            slug_resolvable: true,
            orderbook: true,
            market_websocket: true,
            user_websocket: false,
            positions_for_market: false,
        }
    }

    async fn fetch_markets(&self, params: &Params) -> Result<Vec<Market>> {
        let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(500);
        let url = format!(
            "{}/markets?active=true&closed=false&limit={limit}",
            self.settings.gamma_base_url
        );
        let raw = self.get_json(&url).await?;
        let entries = raw.as_array().cloned().unwrap_or_default();
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let markets: Vec<Market> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| parse_market(entry, MarketId::new(format!("unknown-{i}"))))
            .filter(|market| !market.outcomes.is_empty())
            .collect();

        if markets.is_empty() {
            return Err(Error::Exchange("no markets could be parsed from the Gamma response".to_string()));
        }
        Ok(markets)
    }

    async fn fetch_market(&self, id: &MarketId) -> Result<Market> {
        let raw = self.fetch_gamma_market_raw(id).await?;
        Ok(parse_market(&raw, id.clone()))
    }

    async fn create_order(
        &self,
        market_id: &MarketId,
        outcome: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
        params: &Params,
    ) -> Result<Order> {
        let signer = self.signer()?;
        let market = self.fetch_market(market_id).await?;
        let (token_id, mut terms) = Self::order_terms(&market, outcome)?;
        terms.chain_id = self.settings.chain_id;

        let wallet = signer.address();
        let order_params = OrderParams {
            token_id: token_id.clone(),
            price,
            size,
            side,
            maker: wallet,
            signer: wallet,
            taker: params
                .get("taker")
                .and_then(Value::as_str)
                .map(Address::from_str)
                .transpose()
                .map_err(|err| Error::InvalidOrder(format!("invalid taker address: {err}")))?,
            fee_rate_bps: params.get("feeRateBps").and_then(Value::as_u64).unwrap_or(0),
            expiration: params.get("expiration").and_then(Value::as_u64).unwrap_or(0),
            nonce: params.get("nonce").and_then(Value::as_u64).unwrap_or(0),
        };

        let signed = clob::build_and_sign_order(order_params, terms, &self.contracts, signer)?;
        let credentials = self.l2_credentials()?;
        let body = serde_json::to_string(&signed)?;
        let headers = clob::build_l2_headers(&wallet.to_string(), &credentials, now_unix(), "POST", "/order", Some(&body))?;

        let url = format!("{}/order", self.settings.clob_base_url);
        let response: Value = with_retry(
            &self.rate_limiter,
            self.config.max_retries,
            self.config.retry_delay(),
            self.config.retry_backoff,
            || async {
                self.http
                    .post(&url)
                    .header("POLY_ADDRESS", &headers.poly_address)
                    .header("POLY_SIGNATURE", &headers.poly_signature)
                    .header("POLY_TIMESTAMP", &headers.poly_timestamp)
                    .header("POLY_API_KEY", &headers.poly_api_key)
                    .header("POLY_PASSPHRASE", &headers.poly_passphrase)
                    .json(&signed)
                    .send()
                    .await
                    .map_err(classify_reqwest_error)?
                    .error_for_status()
                    .map_err(classify_reqwest_error)?
                    .json::<Value>()
                    .await
                    .map_err(classify_reqwest_error)
            },
        )
        .await?;

        let order_id = response
            .get("orderID")
            .and_then(Value::as_str)
            .map(OrderId::new)
            .ok_or_else(|| Error::Exchange("order response missing orderID".to_string()))?;

        let order = Order {
            id: order_id,
            market_id: market_id.clone(),
            token_id,
            outcome: outcome.to_string(),
            side,
            price,
            size,
            filled: Decimal::ZERO,
            status: OrderStatus::Open,
            created_at: chrono::Utc::now(),
            updated_at: None,
        };
        self.tracker.register(order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &OrderId, _market_id: Option<&MarketId>) -> Result<Order> {
        let credentials = self.l2_credentials()?;
        let signer = self.signer()?;
        let path = format!("/order/{order_id}");
        let headers = clob::build_l2_headers(&signer.address().to_string(), &credentials, now_unix(), "DELETE", &path, None)?;

        let url = format!("{}{path}", self.settings.clob_base_url);
        with_retry(
            &self.rate_limiter,
            self.config.max_retries,
            self.config.retry_delay(),
            self.config.retry_backoff,
            || async {
                self.http
                    .delete(&url)
                    .header("POLY_ADDRESS", &headers.poly_address)
                    .header("POLY_SIGNATURE", &headers.poly_signature)
                    .header("POLY_TIMESTAMP", &headers.poly_timestamp)
                    .header("POLY_API_KEY", &headers.poly_api_key)
                    .header("POLY_PASSPHRASE", &headers.poly_passphrase)
                    .send()
                    .await
                    .map_err(classify_reqwest_error)?
                    .error_for_status()
                    .map_err(classify_reqwest_error)
                    .map(|_| ())
            },
        )
        .await?;

        self.fetch_order(order_id, None).await
    }

    async fn fetch_order(&self, order_id: &OrderId, _market_id: Option<&MarketId>) -> Result<Order> {
        let credentials = self.l2_credentials()?;
        let signer = self.signer()?;
        let path = format!("/data/order/{order_id}");
        let headers = clob::build_l2_headers(&signer.address().to_string(), &credentials, now_unix(), "GET", &path, None)?;
        let url = format!("{}{path}", self.settings.clob_base_url);

        let raw: Value = with_retry(
            &self.rate_limiter,
            self.config.max_retries,
            self.config.retry_delay(),
            self.config.retry_backoff,
            || async {
                self.http
                    .get(&url)
                    .header("POLY_ADDRESS", &headers.poly_address)
                    .header("POLY_SIGNATURE", &headers.poly_signature)
                    .header("POLY_TIMESTAMP", &headers.poly_timestamp)
                    .header("POLY_API_KEY", &headers.poly_api_key)
                    .header("POLY_PASSPHRASE", &headers.poly_passphrase)
                    .send()
                    .await
                    .map_err(classify_reqwest_error)?
                    .error_for_status()
                    .map_err(classify_reqwest_error)?
                    .json::<Value>()
                    .await
                    .map_err(classify_reqwest_error)
            },
        )
        .await?;

        order_from_clob_response(&raw, order_id)
    }

    async fn fetch_open_orders(&self, market_id: Option<&MarketId>, _params: &Params) -> Result<Vec<Order>> {
        let credentials = self.l2_credentials()?;
        let signer = self.signer()?;
        let path = "/data/orders".to_string();
        let headers = clob::build_l2_headers(&signer.address().to_string(), &credentials, now_unix(), "GET", &path, None)?;
        let mut url = format!("{}{path}", self.settings.clob_base_url);
        if let Some(market_id) = market_id {
            url.push_str(&format!("?market={market_id}"));
        }

        let raw: Value = with_retry(
            &self.rate_limiter,
            self.config.max_retries,
            self.config.retry_delay(),
            self.config.retry_backoff,
            || async {
                self.http
                    .get(&url)
                    .header("POLY_ADDRESS", &headers.poly_address)
                    .header("POLY_SIGNATURE", &headers.poly_signature)
                    .header("POLY_TIMESTAMP", &headers.poly_timestamp)
                    .header("POLY_API_KEY", &headers.poly_api_key)
                    .header("POLY_PASSPHRASE", &headers.poly_passphrase)
                    .send()
                    .await
                    .map_err(classify_reqwest_error)?
                    .error_for_status()
                    .map_err(classify_reqwest_error)?
                    .json::<Value>()
                    .await
                    .map_err(classify_reqwest_error)
            },
        )
        .await?;

        let entries = raw.as_array().cloned().unwrap_or_default();
        let orders = entries
            .iter()
            .filter_map(|entry| {
                let id = entry.get("id").and_then(Value::as_str).map(OrderId::new)?;
                order_from_clob_response(entry, &id).ok()
            })
            .collect();
        Ok(orders)
    }

    async fn fetch_positions(&self, market_id: Option<&MarketId>) -> Result<Vec<Position>> {
        let Some(signer) = &self.signer else {
            return Ok(Vec::new());
        };
        let mut url = format!("{}/positions?user={}", self.settings.clob_base_url, signer.address());
        if let Some(market_id) = market_id {
            url.push_str(&format!("&market={market_id}"));
        }

        let raw = self.get_json(&url).await?;
        let entries = raw.as_array().cloned().unwrap_or_default();
        let positions = entries.iter().filter_map(position_from_response).collect();
        Ok(positions)
    }

    async fn fetch_balance(&self) -> Result<HashMap<String, Decimal>> {
        debug!("Polymarket settles in USDC on Polygon; balance lookup requires an on-chain RPC call outside this adapter's scope");
        Ok(HashMap::new())
    }
}

fn order_from_clob_response(raw: &Value, fallback_id: &OrderId) -> Result<Order> {
    let id = raw.get("id").and_then(Value::as_str).map_or_else(|| fallback_id.clone(), OrderId::new);
    let market_id = raw
        .get("market")
        .and_then(Value::as_str)
        .map(MarketId::new)
        .ok_or_else(|| Error::Exchange("order response missing market".to_string()))?;
    let token_id = raw
        .get("asset_id")
        .and_then(Value::as_str)
        .map(TokenId::new)
        .ok_or_else(|| Error::Exchange("order response missing asset_id".to_string()))?;
    let side = match raw.get("side").and_then(Value::as_str) {
        Some("BUY") => Side::Buy,
        Some("SELL") => Side::Sell,
        _ => return Err(Error::Exchange("order response has unrecognized side".to_string())),
    };
    let price = raw.get("price").and_then(Value::as_str).and_then(|s| Decimal::from_str(s).ok()).unwrap_or_default();
    let size = raw
        .get("original_size")
        .and_then(Value::as_str)
        .and_then(|s| Decimal::from_str(s).ok())
        .unwrap_or_default();
    let filled = raw
        .get("size_matched")
        .and_then(Value::as_str)
        .and_then(|s| Decimal::from_str(s).ok())
        .unwrap_or_default();
    let status = match raw.get("status").and_then(Value::as_str) {
        Some("LIVE") if filled > Decimal::ZERO => OrderStatus::PartiallyFilled,
        Some("LIVE") => OrderStatus::Open,
        Some("MATCHED") => OrderStatus::Filled,
        Some("CANCELED") => OrderStatus::Cancelled,
        _ => OrderStatus::Pending,
    };

    Ok(Order {
        id,
        market_id,
        token_id,
        outcome: raw.get("outcome").and_then(Value::as_str).unwrap_or_default().to_string(),
        side,
        price,
        size,
        filled,
        status,
        created_at: chrono::Utc::now(),
        updated_at: None,
    })
}

fn position_from_response(raw: &Value) -> Option<Position> {
    Some(Position {
        market_id: MarketId::new(raw.get("conditionId").and_then(Value::as_str)?),
        outcome: raw.get("outcome").and_then(Value::as_str).unwrap_or_default().to_string(),
        size: raw.get("size").and_then(Value::as_str).and_then(|s| Decimal::from_str(s).ok())?,
        average_price: raw.get("avgPrice").and_then(Value::as_str).and_then(|s| Decimal::from_str(s).ok()).unwrap_or_default(),
        current_price: raw.get("curPrice").and_then(Value::as_str).and_then(|s| Decimal::from_str(s).ok()).unwrap_or_default(),
    })
}

#[async_trait]
impl SlugResolvable for PolymarketAdapter {
    async fn fetch_markets_by_slug(&self, slug: &str) -> Result<Vec<Market>> {
        let slug = slug.rsplit('/').next().unwrap_or(slug).split('?').next().unwrap_or(slug);
        let url = format!("{}/markets?slug={slug}", self.settings.gamma_base_url);
        let raw = self.get_json(&url).await?;
        let entries = raw.as_array().cloned().unwrap_or_default();
        Ok(entries
            .iter()
            .enumerate()
            .map(|(i, entry)| parse_market(entry, MarketId::new(format!("{slug}-{i}"))))
            .collect())
    }
}

#[async_trait]
impl OrderbookCapable for PolymarketAdapter {
    async fn get_orderbook(&self, token_id: &TokenId) -> Result<OrderbookData> {
        let url = format!("{}/book?token_id={token_id}", self.settings.clob_base_url);
        let raw = self.get_json(&url).await?;
        orderbook_from_response(&raw, token_id.clone())
    }
}

#[async_trait]
impl OrderbookSource for PolymarketAdapter {
    async fn fetch(&self, token_id: &TokenId) -> Result<OrderbookData> {
        self.get_orderbook(token_id).await
    }
}

impl MarketWebsocketCapable for PolymarketAdapter {
    fn market_websocket(&self) -> &Subscription {
        &self.market_ws
    }
}

fn orderbook_from_response(raw: &Value, token_id: TokenId) -> Result<OrderbookData> {
    let level = |entry: &Value| -> Option<crate::models::Level> {
        Some(crate::models::Level {
            price: entry.get("price").and_then(Value::as_str).and_then(|s| Decimal::from_str(s).ok())?,
            size: entry.get("size").and_then(Value::as_str).and_then(|s| Decimal::from_str(s).ok())?,
        })
    };

    let bids = raw.get("bids").and_then(Value::as_array).map(|arr| arr.iter().filter_map(level).collect()).unwrap_or_default();
    let asks = raw.get("asks").and_then(Value::as_array).map(|arr| arr.iter().filter_map(level).collect()).unwrap_or_default();
    let market_id = raw.get("market").and_then(Value::as_str).map(MarketId::new).unwrap_or_else(|| MarketId::new(""));

    if bids.is_empty() && asks.is_empty() {
        warn!(%token_id, "orderbook response had no parseable levels");
    }

    Ok(OrderbookData {
        bids,
        asks,
        timestamp_ms: now_unix() * 1000,
        asset_id: token_id,
        market_id,
    })
}
