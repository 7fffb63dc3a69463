//! Stake 2.0: freezing and unfreezing TRX for bandwidth or energy.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

use super::http_client::TronHttpClient;
use super::transaction::TronTransaction;
use super::types::StakeOutcome;
use super::utils::*;
use crate::tron_error::{
    TronError, CODE_DELEGATED_RESOURCE, CODE_FREEZE_BAD_RESPONSE, CODE_FREEZE_FAILED,
    CODE_FREEZE_NODE_ERROR, CODE_UNFREEZE_FAILED, CODE_UNFREEZE_NODE_ERROR,
    CODE_UNFREEZE_NO_RESULT,
};

/// Resource obtained by staking, sent to the node as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ResourceType {
    Bandwidth = 0,
    Energy = 1,
    TronPower = 2,
}

impl TryFrom<i64> for ResourceType {
    type Error = TronError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResourceType::Bandwidth),
            1 => Ok(ResourceType::Energy),
            2 => Ok(ResourceType::TronPower),
            other => Err(TronError::InvalidResourceType(other)),
        }
    }
}

impl From<ResourceType> for i64 {
    fn from(resource: ResourceType) -> Self {
        resource as i64
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceType::Bandwidth => "BANDWIDTH",
            ResourceType::Energy => "ENERGY",
            ResourceType::TronPower => "TRON_POWER",
        })
    }
}

struct StakeCodes {
    context: &'static str,
    node_error: u32,
    bad_response: u32,
    failed: u32,
}

const FREEZE: StakeCodes = StakeCodes {
    context: "failed to freeze balance (public TronGrid gateways may not support staking, use a full node)",
    node_error: CODE_FREEZE_NODE_ERROR,
    bad_response: CODE_FREEZE_BAD_RESPONSE,
    failed: CODE_FREEZE_FAILED,
};

const UNFREEZE: StakeCodes = StakeCodes {
    context: "failed to unfreeze balance",
    node_error: CODE_UNFREEZE_NODE_ERROR,
    bad_response: CODE_UNFREEZE_NO_RESULT,
    failed: CODE_UNFREEZE_FAILED,
};

fn trx_to_sun(trx: f64) -> Result<u64, TronError> {
    u64::try_from(to_tron(trx)?)
        .map_err(|_| TronError::InvalidAmount(format!("{} TRX must not be negative", trx)))
}

impl TronHttpClient {
    /// Stake `amount_sun` for `resource`.
    ///
    /// `owner` defaults to the client address and `receiver` to the owner.
    /// With a private key configured the transaction built by the node is
    /// signed and broadcast, otherwise it is returned unsigned.
    pub async fn freeze_balance_v2(
        &self,
        amount_sun: u64,
        resource: ResourceType,
        receiver: Option<&str>,
        owner: Option<&str>,
    ) -> Result<StakeOutcome, TronError> {
        let run = async {
            let (owner, receiver) = self.stake_addresses(receiver, owner)?;
            let params = json!({
                "owner_address": owner,
                "receiver_address": receiver,
                "resource": i64::from(resource),
                "frozen_balance": amount_sun,
            });
            debug!(%params, "freezebalancev2");
            let response = self.manager.post("/wallet/freezebalancev2", &params).await?;
            self.stake_outcome(response, &FREEZE).await
        };
        run.await.map_err(|e| wrap_stake_error(e, &FREEZE))
    }

    pub async fn freeze_balance_for_energy_v2(
        &self,
        trx: f64,
        receiver: Option<&str>,
        owner: Option<&str>,
    ) -> Result<StakeOutcome, TronError> {
        let amount = trx_to_sun(trx).map_err(|e| wrap_stake_error(e, &FREEZE))?;
        self.freeze_balance_v2(amount, ResourceType::Energy, receiver, owner)
            .await
    }

    pub async fn freeze_balance_for_bandwidth_v2(
        &self,
        trx: f64,
        receiver: Option<&str>,
        owner: Option<&str>,
    ) -> Result<StakeOutcome, TronError> {
        let amount = trx_to_sun(trx).map_err(|e| wrap_stake_error(e, &FREEZE))?;
        self.freeze_balance_v2(amount, ResourceType::Bandwidth, receiver, owner)
            .await
    }

    /// Release `trx` previously staked for `resource`.
    pub async fn unfreeze_balance_v2(
        &self,
        trx: f64,
        resource: ResourceType,
        receiver: Option<&str>,
        owner: Option<&str>,
    ) -> Result<StakeOutcome, TronError> {
        let run = async {
            let (owner, receiver) = self.stake_addresses(receiver, owner)?;
            let params = json!({
                "owner_address": owner,
                "receiver_address": receiver,
                "resource": i64::from(resource),
                "balance": trx_to_sun(trx)?,
            });
            debug!(%params, "unfreezebalancev2");
            let response = self
                .manager
                .post("/wallet/unfreezebalancev2", &params)
                .await?;
            self.stake_outcome(response, &UNFREEZE).await
        };
        run.await.map_err(|e| wrap_stake_error(e, &UNFREEZE))
    }

    /// Resources delegated from `address` to itself, as returned by the node.
    pub async fn get_account_delegated_resource(
        &self,
        address: Option<&str>,
    ) -> Result<Value, TronError> {
        let address = self.resolve_address(address)?;
        if !is_address(&address) {
            return Err(TronError::invalid_address(&address));
        }

        let run = async {
            let hex = to_hex_address(&address)?;
            self.manager
                .post(
                    "/wallet/getdelegatedresource",
                    &json!({ "fromAddress": hex, "toAddress": hex }),
                )
                .await
        };
        run.await.map_err(|e| {
            TronError::operation(CODE_DELEGATED_RESOURCE, "failed to get delegated resources", e)
        })
    }

    /// Hex `(owner, receiver)`; the receiver defaults to the owner.
    fn stake_addresses(
        &self,
        receiver: Option<&str>,
        owner: Option<&str>,
    ) -> Result<(String, String), TronError> {
        let owner = to_hex_address(&self.resolve_address(owner)?)?;
        let receiver = match receiver.filter(|r| !r.is_empty()) {
            Some(receiver) => to_hex_address(receiver)?,
            None => owner.clone(),
        };
        Ok((owner, receiver))
    }

    async fn stake_outcome(
        &self,
        response: Value,
        codes: &StakeCodes,
    ) -> Result<StakeOutcome, TronError> {
        debug!(%response, "stake response");

        if let Some(error) = response.get("Error") {
            let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
            return Err(TronError::Operation {
                code: codes.node_error,
                message,
            });
        }

        let has_transaction = response.get("transaction").map_or(false, Value::is_object)
            || response.get("txID").is_some();
        if has_transaction {
            let unsigned = TronTransaction::from_node_response(&response)?.unsigned_tx;
            if self.private_key.is_none() {
                return Ok(StakeOutcome::Unsigned(unsigned));
            }
            return Ok(StakeOutcome::Broadcast(
                self.sign_and_broadcast(&unsigned).await?,
            ));
        }

        if response.get("result").is_some() {
            return Ok(StakeOutcome::Completed(response));
        }

        Err(TronError::Operation {
            code: codes.bad_response,
            message: format!("unexpected staking response: {}", response),
        })
    }
}

/// Node and response errors keep their code; everything else is wrapped.
fn wrap_stake_error(e: TronError, codes: &StakeCodes) -> TronError {
    match e {
        TronError::Operation { code, .. } if code == codes.node_error || code == codes.bad_response => {
            TronError::Operation {
                code,
                message: format!("{}: {}", codes.context, e),
            }
        }
        other => TronError::operation(codes.failed, codes.context, other),
    }
}
