//! Energy price lookup, stake/energy conversion and fee_limit estimation.

use chrono::{TimeZone, Utc};
use num_bigint::BigUint;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::http_client::TronHttpClient;
use super::provider::HttpProvider;
use super::transaction::TRC20_TRANSFER_SELECTOR;
use super::transport::HttpMethod;
use super::types::*;
use super::utils::*;
use crate::config::Network;
use crate::tron_error::{
    TronError, CODE_ESTIMATE_FAILED, CODE_ESTIMATE_INVALID_CONTRACT, CODE_ESTIMATE_NO_ENERGY,
    CODE_ESTIMATE_TRC20_CONTRACT, CODE_ESTIMATE_TRC20_RECIPIENT,
};

/// Sun per unit of energy when the node does not report a price.
pub const DEFAULT_ENERGY_PRICE: u64 = 420;

/// Energy released to stakers per day.
pub const DAILY_ENERGY_SUPPLY: f64 = 180_000_000_000.0;

/// TRX staked for energy network-wide when the chain parameter is unavailable.
pub const FALLBACK_TOTAL_ENERGY_STAKED: u64 = 16_096_397;

/// Energy per staked TRX used when the total stake is unknown.
pub const FALLBACK_ENERGY_PER_TRX: f64 = 11.183;

/// Upper bound of any suggested fee_limit: 500 TRX.
pub const MAX_FEE_LIMIT: u64 = 500 * SUN_PER_TRX;

/// Upper bound for simulated and TRC20 transfer estimates: 50 TRX.
pub const SIMULATED_FEE_LIMIT_CAP: u64 = 50 * SUN_PER_TRX;

/// Margin applied to `triggerconstantcontract` simulations.
pub const SIMULATION_BUFFER: f64 = 1.3;

/// Margin applied to TRC20 transfer estimates.
pub const TRC20_TRANSFER_BUFFER: f64 = 1.2;

/// Energy assumed for a TRC20 transfer when estimation fails.
pub const FALLBACK_TRC20_ENERGY: u64 = 100_000;

/// Timeout of the public endpoint queried by `get_energy_price_from_network`.
const NETWORK_PRICE_TIMEOUT_MS: u64 = 10_000;

/// `floor(1 TRX / price)`; zero for a zero price.
pub fn energy_per_trx(price: u64) -> u64 {
    if price == 0 {
        0
    } else {
        SUN_PER_TRX / price
    }
}

/// `%Y-%m-%d %H:%M:%S` in UTC, `None` for the genesis timestamp 0.
pub fn format_price_date(timestamp_ms: u64) -> Option<String> {
    if timestamp_ms == 0 {
        return None;
    }
    let seconds = i64::try_from(timestamp_ms / 1000).ok()?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Parse the `"ts:price,ts:price,..."` history reported by `/wallet/getenergyprices`.
pub fn parse_energy_prices(prices: &str) -> Vec<EnergyPricePoint> {
    prices
        .split(',')
        .filter_map(|point| {
            let (timestamp, price) = point.trim().split_once(':')?;
            let timestamp = timestamp.trim().parse::<u64>().ok()?;
            let price = price.trim().parse::<u64>().ok().filter(|p| *p > 0)?;
            Some(EnergyPricePoint {
                timestamp,
                date: format_price_date(timestamp),
                price,
                energy_per_trx: energy_per_trx(price),
            })
        })
        .collect()
}

/// `floor(trx / total_staked * 180e9)`, or the fixed ratio without a stake.
pub fn energy_from_trx(trx: f64, total_staked: u64) -> u64 {
    let energy = if total_staked == 0 {
        trx * FALLBACK_ENERGY_PER_TRX
    } else {
        trx / total_staked as f64 * DAILY_ENERGY_SUPPLY
    };
    energy.max(0.0).floor() as u64
}

/// `energy * total_staked / 180e9`, or the fixed ratio without a stake.
pub fn trx_for_energy(energy: u64, total_staked: u64) -> f64 {
    if total_staked == 0 {
        energy as f64 / FALLBACK_ENERGY_PER_TRX
    } else {
        energy as f64 * total_staked as f64 / DAILY_ENERGY_SUPPLY
    }
}

/// fee_limit (sun) suggested for `energy` at `price`.
pub fn suggested_fee_limit(energy: u64, price: u64, method: EstimationMethod) -> u64 {
    match method {
        EstimationMethod::EstimateEnergy => energy.saturating_mul(price).min(MAX_FEE_LIMIT),
        EstimationMethod::TriggerConstantContract => {
            let buffered = (energy as f64 * price as f64 * SIMULATION_BUFFER) as u64;
            buffered.min(SIMULATED_FEE_LIMIT_CAP).min(MAX_FEE_LIMIT)
        }
        EstimationMethod::DefaultFallback => SIMULATED_FEE_LIMIT_CAP,
    }
}

/// fee_limit (sun) suggested for a TRC20 transfer.
pub fn trc20_transfer_fee_limit(energy: u64, price: u64) -> u64 {
    let buffered = (energy as f64 * price as f64 * TRC20_TRANSFER_BUFFER) as u64;
    buffered.min(SIMULATED_FEE_LIMIT_CAP)
}

fn default_price_info(
    network: Option<Network>,
    message: String,
    error: Option<String>,
) -> EnergyPriceInfo {
    EnergyPriceInfo {
        success: false,
        network,
        current_price: DEFAULT_ENERGY_PRICE,
        energy_per_trx: energy_per_trx(DEFAULT_ENERGY_PRICE),
        price_history: Vec::new(),
        message: Some(message),
        error,
        raw_data: None,
    }
}

/// `None` when the response carries no price history.
fn price_info_from_response(result: Value, network: Option<Network>) -> Option<EnergyPriceInfo> {
    let prices = result
        .get("prices")
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())?;

    let price_history = parse_energy_prices(prices);
    let current_price = price_history
        .last()
        .map(|point| point.price)
        .unwrap_or(DEFAULT_ENERGY_PRICE);

    Some(EnergyPriceInfo {
        success: true,
        network,
        current_price,
        energy_per_trx: energy_per_trx(current_price),
        price_history,
        message: None,
        error: None,
        raw_data: Some(result),
    })
}

fn estimate(energy_used: u64, energy_price: u64, method: EstimationMethod, result: Value) -> EnergyEstimate {
    let fee_limit = suggested_fee_limit(energy_used, energy_price, method);
    EnergyEstimate {
        energy_used,
        energy_price,
        suggested_fee_limit: fee_limit,
        suggested_fee_limit_trx: from_tron(fee_limit as i64),
        estimation_method: method,
        result: Some(result),
        error: None,
    }
}

impl TronHttpClient {
    /// Energy price history from the configured full node.
    ///
    /// Never fails: missing data or errors yield `success == false` with the
    /// default price.
    pub async fn get_energy_price(&self) -> EnergyPriceInfo {
        match self.manager.get("/wallet/getenergyprices", &Value::Null).await {
            Ok(result) => price_info_from_response(result, None).unwrap_or_else(|| {
                default_price_info(None, "energy prices unavailable, using default".to_string(), None)
            }),
            Err(e) => {
                warn!(error = %e, "failed to fetch energy prices, using default");
                default_price_info(
                    None,
                    "failed to fetch energy prices, using default".to_string(),
                    Some(e.to_string()),
                )
            }
        }
    }

    /// Energy price history from a network's public endpoint, retrying empty
    /// or failed responses `retries` times, `delay_ms` apart.
    pub async fn get_energy_price_from_network(
        &self,
        network: Network,
        retries: u32,
        delay_ms: u64,
    ) -> EnergyPriceInfo {
        let provider = HttpProvider::new(network.base_url(), self.manager.full_node().transport())
            .with_timeout(NETWORK_PRICE_TIMEOUT_MS)
            .with_api_key(self.api_key.clone());
        let delay = std::time::Duration::from_millis(delay_ms);
        let retries = retries.max(1);
        let mut last_error = None;

        for attempt in 1..=retries {
            match provider
                .request("/wallet/getenergyprices", &Value::Null, HttpMethod::GET)
                .await
            {
                Ok(result) => match price_info_from_response(result, Some(network)) {
                    Some(info) => return info,
                    None if attempt == retries => {
                        return default_price_info(
                            Some(network),
                            format!("empty energy prices from {}", network),
                            None,
                        );
                    }
                    None => debug!(%network, attempt, "empty energy prices, retrying"),
                },
                Err(e) => {
                    debug!(%network, attempt, error = %e, "energy price request failed");
                    last_error = Some(e.to_string());
                }
            }

            if attempt < retries {
                provider.transport().pause(delay).await;
            }
        }

        warn!(%network, error = ?last_error, "energy price unavailable, using default");
        default_price_info(
            Some(network),
            format!("energy price unavailable from {}, using default", network),
            last_error,
        )
    }

    /// Current energy price in sun; the default price on any failure.
    pub async fn get_current_energy_price(&self) -> u64 {
        self.get_energy_price().await.current_price
    }

    /// TRX staked for energy network-wide (`getTotalEnergyWeight`).
    pub async fn get_total_energy_staked(&self) -> u64 {
        let result = match self
            .manager
            .post("/wallet/getchainparameters", &Value::Null)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "failed to fetch chain parameters, using fallback stake");
                return FALLBACK_TOTAL_ENERGY_STAKED;
            }
        };

        result
            .get("chainParameter")
            .and_then(Value::as_array)
            .and_then(|params| {
                params
                    .iter()
                    .find(|p| p.get("key").and_then(Value::as_str) == Some("getTotalEnergyWeight"))
            })
            .and_then(|p| p.get("value"))
            .and_then(Value::as_u64)
            .map(|weight| weight / SUN_PER_TRX)
            .filter(|staked| *staked > 0)
            .unwrap_or(FALLBACK_TOTAL_ENERGY_STAKED)
    }

    /// Energy obtained by staking `trx`.
    pub async fn calculate_energy_from_trx(&self, trx: f64) -> u64 {
        energy_from_trx(trx, self.get_total_energy_staked().await)
    }

    /// TRX to stake for `energy`.
    pub async fn calculate_trx_for_energy(&self, energy: u64) -> f64 {
        trx_for_energy(energy, self.get_total_energy_staked().await)
    }

    /// Estimate the energy of a contract call and a fee_limit for it.
    ///
    /// `parameters` are ABI encoded words, concatenated in order. `from`
    /// defaults to the client address.
    pub async fn estimate_energy(
        &self,
        contract_address: &str,
        function_selector: &str,
        parameters: &[String],
        from: Option<&str>,
    ) -> Result<EnergyEstimate, TronError> {
        if !is_address(contract_address) {
            return Err(TronError::operation(
                CODE_ESTIMATE_INVALID_CONTRACT,
                "failed to estimate energy",
                TronError::InvalidContractAddress(contract_address.to_string()),
            ));
        }
        let owner = self.resolve_address(from).map_err(|e| {
            TronError::operation(CODE_ESTIMATE_INVALID_CONTRACT, "failed to estimate energy", e)
        })?;

        self.try_estimate_energy(contract_address, function_selector, parameters, &owner)
            .await
            .map_err(|e| match e {
                e @ TronError::Operation { .. } => e,
                e => TronError::operation(CODE_ESTIMATE_FAILED, "failed to estimate energy", e),
            })
    }

    async fn try_estimate_energy(
        &self,
        contract_address: &str,
        function_selector: &str,
        parameters: &[String],
        owner: &str,
    ) -> Result<EnergyEstimate, TronError> {
        let mut payload = json!({
            "owner_address": to_hex_address(owner)?,
            "contract_address": to_hex_address(contract_address)?,
            "function_selector": function_selector,
        });
        if !parameters.is_empty() {
            payload["parameter"] = json!(parameters.concat());
        }

        match self
            .manager
            .post("/walletsolidity/estimateenergy", &payload)
            .await
        {
            Ok(result) => {
                if let Some(energy) = result.get("energy_required").and_then(Value::as_u64) {
                    let price = self.get_current_energy_price().await;
                    return Ok(estimate(energy, price, EstimationMethod::EstimateEnergy, result));
                }
                debug!(?result, "estimateenergy returned no energy_required, simulating");
            }
            Err(e) => debug!(error = %e, "estimateenergy unavailable, simulating"),
        }

        let result = self
            .query("/wallet/triggerconstantcontract", &payload, HttpMethod::POST)
            .await?;
        let energy = result
            .get("energy_used")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                TronError::operation(
                    CODE_ESTIMATE_NO_ENERGY,
                    "failed to estimate energy",
                    "node returned no energy_used",
                )
            })?;
        let price = self.get_current_energy_price().await;
        Ok(estimate(
            energy,
            price,
            EstimationMethod::TriggerConstantContract,
            result,
        ))
    }

    /// Estimate a TRC20 `transfer` of the decimal `amount` to `to`.
    ///
    /// Address validation errors are returned; every later failure yields a
    /// conservative default estimate carrying the error message.
    pub async fn estimate_trc20_transfer_energy(
        &self,
        contract_address: &str,
        to: &str,
        amount: &str,
        from: Option<&str>,
    ) -> Result<Trc20TransferEstimate, TronError> {
        if !is_address(contract_address) {
            return Err(TronError::operation(
                CODE_ESTIMATE_TRC20_CONTRACT,
                "failed to estimate TRC20 transfer",
                TronError::InvalidContractAddress(contract_address.to_string()),
            ));
        }
        if !is_address(to) {
            return Err(TronError::operation(
                CODE_ESTIMATE_TRC20_RECIPIENT,
                "failed to estimate TRC20 transfer",
                TronError::invalid_address(to),
            ));
        }

        let mut token_decimals = None;
        let outcome = async {
            let decimals = self.contract(contract_address)?.decimals().await?;
            token_decimals = Some(decimals);
            let raw: BigUint = parse_token_amount(amount, decimals as u32)?;
            let parameters = vec![encode_address_param(to)?, encode_uint256(&raw)?];
            self.estimate_energy(contract_address, TRC20_TRANSFER_SELECTOR, &parameters, from)
                .await
        }
        .await;

        let estimate = match outcome {
            Ok(mut estimate) => {
                estimate.suggested_fee_limit =
                    trc20_transfer_fee_limit(estimate.energy_used, estimate.energy_price);
                estimate.suggested_fee_limit_trx = from_tron(estimate.suggested_fee_limit as i64);
                estimate
            }
            Err(e) => {
                warn!(contract = contract_address, to, error = %e, "TRC20 transfer estimate failed, using defaults");
                EnergyEstimate {
                    energy_used: FALLBACK_TRC20_ENERGY,
                    energy_price: self.get_current_energy_price().await,
                    suggested_fee_limit: SIMULATED_FEE_LIMIT_CAP,
                    suggested_fee_limit_trx: from_tron(SIMULATED_FEE_LIMIT_CAP as i64),
                    estimation_method: EstimationMethod::DefaultFallback,
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        };

        Ok(Trc20TransferEstimate {
            estimate,
            contract_address: contract_address.to_string(),
            to_address: to.to_string(),
            amount: amount.to_string(),
            token_decimals,
        })
    }
}
