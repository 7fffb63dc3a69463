//! Matching incoming TRC20 payments against an expected amount.

use chrono::Utc;
use num_bigint::BigUint;
use tracing::debug;

use super::http_client::{amount_equals, TronHttpClient};
use super::types::*;
use super::utils::*;
use crate::tron_error::TronError;

/// Look-back window used when none is given: one hour.
pub const DEFAULT_PAYMENT_TIMESPAN_MS: u64 = 3_600_000;

/// Transfers fetched per payment check.
pub const PAYMENT_QUERY_LIMIT: u32 = 100;

/// First transfer to `address` whose raw value equals `expected`, skipping
/// transaction ids already in `existing_ids`.
pub fn find_matching_payment(
    transfers: &[Trc20Transfer],
    address: &str,
    expected: &BigUint,
    decimals: u32,
    existing_ids: &[String],
) -> Option<PaymentMatch> {
    transfers
        .iter()
        .filter(|tx| !existing_ids.iter().any(|id| id == &tx.transaction_id))
        .filter(|tx| tx.to == address)
        .find(|tx| amount_equals(&tx.value, expected))
        .map(|tx| {
            let raw = BigUint::parse_bytes(tx.value.trim().as_bytes(), 10).unwrap_or_default();
            PaymentMatch {
                transaction_id: tx.transaction_id.clone(),
                from: tx.from.clone(),
                to: tx.to.clone(),
                amount: format_token_amount(&raw, decimals),
                block_timestamp: tx.block_timestamp,
                token_info: tx.token_info.clone(),
            }
        })
}

impl TronHttpClient {
    /// Look for a confirmed incoming transfer of exactly `amount` tokens to
    /// `address` within the last `timespan_ms` milliseconds.
    ///
    /// `amount` is a decimal string; precision beyond the token's decimals is
    /// truncated. Returns `None` when nothing matches.
    pub async fn check_trc20_payment(
        &self,
        address: &str,
        contract_address: &str,
        amount: &str,
        timespan_ms: Option<u64>,
        existing_ids: &[String],
    ) -> Result<Option<PaymentMatch>, TronError> {
        let address = to_base58_address(address).map_err(|_| TronError::invalid_address(address))?;
        let decimals = self.contract(contract_address)?.decimals().await? as u32;
        let expected = parse_token_amount(amount, decimals)?;

        let timespan = timespan_ms.unwrap_or(DEFAULT_PAYMENT_TIMESPAN_MS);
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let query = Trc20TransferQuery {
            contract_address: Some(contract_address.to_string()),
            limit: PAYMENT_QUERY_LIMIT,
            fingerprint: None,
            min_timestamp: Some(now_ms.saturating_sub(timespan)),
            only_confirmed: true,
            only_to: true,
            only_from: false,
        };

        let page = self.get_trc20_transactions_by_account(&address, &query).await?;
        debug!(
            %address,
            contract = contract_address,
            expected = %expected,
            candidates = page.data.len(),
            "checking TRC20 payment"
        );

        Ok(find_matching_payment(
            &page.data,
            &address,
            &expected,
            decimals,
            existing_ids,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tron::http_client::test_support::*;
    use crate::tron::transport::mock::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn transfer(id: &str, to: &str, value: &str) -> Trc20Transfer {
        Trc20Transfer {
            transaction_id: id.to_string(),
            token_info: None,
            block_timestamp: 1_700_000_000_000,
            from: RECIPIENT.to_string(),
            to: to.to_string(),
            transfer_type: "Transfer".to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_skips_processed_ids_and_other_recipients() {
        let expected = BigUint::from(1_500_000u64);
        let transfers = vec![
            transfer("t1", HOLDER, "1500000"),
            transfer("t2", RECIPIENT, "1500000"),
            transfer("t3", HOLDER, "1500001"),
            transfer("t4", HOLDER, "01500000"),
        ];

        let first = find_matching_payment(&transfers, HOLDER, &expected, 6, &[]).unwrap();
        assert_eq!(first.transaction_id, "t1");
        assert_eq!(first.amount, "1.500000");

        let next =
            find_matching_payment(&transfers, HOLDER, &expected, 6, &["t1".to_string()]).unwrap();
        assert_eq!(next.transaction_id, "t4");

        let none = find_matching_payment(
            &transfers,
            HOLDER,
            &expected,
            6,
            &["t1".to_string(), "t4".to_string()],
        );
        assert!(none.is_none());
    }

    #[test]
    fn test_empty_transfer_list() {
        assert!(find_matching_payment(&[], HOLDER, &BigUint::from(1u8), 6, &[]).is_none());
    }

    #[tokio::test]
    async fn test_check_trc20_payment() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/wallet/triggerconstantcontract", uint_result(6));
        mock.reply(
            &format!("/v1/accounts/{}/transactions/trc20", HOLDER),
            json!({
                "data": [
                    {"transaction_id": "seen", "from": RECIPIENT, "to": HOLDER, "value": "2500000", "block_timestamp": 1},
                    {"transaction_id": "fresh", "from": RECIPIENT, "to": HOLDER, "value": "2500000", "block_timestamp": 2,
                     "token_info": {"symbol": "USDT", "address": USDT, "decimals": 6, "name": "Tether USD"}}
                ],
                "success": true
            }),
        );
        let client = client(&mock);

        let found = client
            .check_trc20_payment(HOLDER, USDT, "2.5", None, &["seen".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.transaction_id, "fresh");
        assert_eq!(found.amount, "2.500000");
        assert_eq!(found.block_timestamp, 2);
        assert_eq!(found.token_info.unwrap().symbol, "USDT");

        let url = &mock.requests_to(&format!("/v1/accounts/{}/transactions/trc20", HOLDER))[0].url;
        assert!(url.contains("limit=100"));
        assert!(url.contains("only_to=true"));
        assert!(url.contains("only_confirmed=true"));
        assert!(url.contains("min_timestamp="));

        // Hex input is normalized to the base58 form transfers report.
        let by_hex = client
            .check_trc20_payment(HOLDER_HEX, USDT, "2.5", Some(60_000), &[])
            .await
            .unwrap();
        assert_eq!(by_hex.unwrap().transaction_id, "seen");

        let missing = client
            .check_trc20_payment(HOLDER, USDT, "3", None, &[])
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_check_trc20_payment_window() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/wallet/triggerconstantcontract", uint_result(6));
        mock.reply(
            &format!("/v1/accounts/{}/transactions/trc20", HOLDER),
            json!({"data": []}),
        );
        let client = client(&mock);

        let before = Utc::now().timestamp_millis() as u64;
        let result = client
            .check_trc20_payment(HOLDER, USDT, "1", Some(1_000), &[])
            .await
            .unwrap();
        assert!(result.is_none());

        let url = mock.requests_to(&format!("/v1/accounts/{}/transactions/trc20", HOLDER))[0]
            .url
            .clone();
        let min_timestamp: u64 = url
            .split("min_timestamp=")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
            .and_then(|v| v.parse().ok())
            .unwrap();
        assert!(min_timestamp + 1_000 >= before);
        assert!(min_timestamp <= before);

        let err = client
            .check_trc20_payment("nope", USDT, "1", None, &[])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 1001);
    }
}
