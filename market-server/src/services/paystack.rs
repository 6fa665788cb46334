//! Payment Gateway Client (Paystack)
//!
//! Outbound REST calls keyed by the server-held secret: verify a transaction
//! by reference, create/update payout subaccounts, list banks, resolve an
//! account number. Bounded timeout, no retry; a duplicate submission must
//! not double-charge, so failures stay failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::PaystackConfig;
use crate::utils::AppError;

/// Gateway response envelope: `{status, message, data}`
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

/// Verify-by-reference result
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub success: bool,
    /// Raw gateway payload, returned to the client on failure
    pub raw: Value,
}

/// Subaccount creation payload
#[derive(Debug, Clone, Serialize)]
pub struct SubaccountRequest {
    pub business_name: String,
    pub settlement_bank: String,
    pub account_number: String,
    pub percentage_charge: f64,
    pub description: String,
    pub primary_contact_email: String,
    pub primary_contact_name: String,
}

#[derive(Clone)]
pub struct PaystackClient {
    config: PaystackConfig,
    client: reqwest::Client,
}

impl PaystackClient {
    pub fn new(config: PaystackConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn public_key(&self) -> &str {
        &self.config.public_key
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn parse(&self, response: reqwest::Response) -> Result<Envelope, AppError> {
        let http_ok = response.status().is_success();
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| AppError::transactional(format!("Gateway returned malformed body: {e}")))?;
        if !http_ok && !envelope.status {
            return Err(AppError::transactional(format!(
                "Gateway error: {}",
                envelope.message
            )));
        }
        Ok(envelope)
    }

    /// GET /transaction/verify/{reference}
    ///
    /// A reachable gateway that reports a non-successful payment is an
    /// Ok(VerifyOutcome{success:false}); only transport/protocol failures
    /// are errors.
    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifyOutcome, AppError> {
        let response = self
            .client
            .get(self.url(&format!("/transaction/verify/{reference}")))
            .bearer_auth(&self.config.secret_key)
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|e| AppError::transactional(format!("Gateway unreachable: {e}")))?;

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| AppError::transactional(format!("Gateway returned malformed body: {e}")))?;

        let success = envelope.status
            && envelope
                .data
                .get("status")
                .and_then(Value::as_str)
                .is_some_and(|s| s == "success");

        Ok(VerifyOutcome {
            success,
            raw: envelope.data,
        })
    }

    /// POST /subaccount, returns the gateway subaccount code
    pub async fn create_subaccount(&self, request: &SubaccountRequest) -> Result<String, AppError> {
        if self.config.secret_key.is_empty() {
            return Err(AppError::transactional("Paystack secret key not configured."));
        }
        let response = self
            .client
            .post(self.url("/subaccount"))
            .bearer_auth(&self.config.secret_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::transactional(format!("Gateway unreachable: {e}")))?;

        let envelope = self.parse(response).await?;
        if !envelope.status {
            return Err(AppError::transactional(format!(
                "Gateway error: {}",
                envelope.message
            )));
        }
        envelope
            .data
            .get("subaccount_code")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::transactional("Gateway response missing subaccount_code".to_string())
            })
    }

    /// PUT /subaccount/{code}, push changed bank details
    pub async fn update_subaccount(&self, code: &str, fields: &Value) -> Result<(), AppError> {
        if self.config.secret_key.is_empty() {
            return Err(AppError::transactional("Paystack secret key not configured."));
        }
        let response = self
            .client
            .put(self.url(&format!("/subaccount/{code}")))
            .bearer_auth(&self.config.secret_key)
            .json(fields)
            .send()
            .await
            .map_err(|e| AppError::transactional(format!("Gateway unreachable: {e}")))?;

        let envelope = self.parse(response).await?;
        if !envelope.status {
            return Err(AppError::transactional(format!(
                "Gateway update error: {}",
                envelope.message
            )));
        }
        Ok(())
    }

    /// GET /bank?currency=..., bank list for dropdowns
    pub async fn list_banks(&self, currency: &str) -> Result<Value, AppError> {
        let response = self
            .client
            .get(self.url("/bank"))
            .query(&[("currency", currency)])
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| AppError::transactional(format!("Gateway unreachable: {e}")))?;
        let envelope = self.parse(response).await?;
        Ok(envelope.data)
    }

    /// GET /bank/resolve, account number to account name
    pub async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<Value, AppError> {
        let response = self
            .client
            .get(self.url("/bank/resolve"))
            .query(&[("account_number", account_number), ("bank_code", bank_code)])
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| AppError::transactional(format!("Gateway unreachable: {e}")))?;
        let envelope = self.parse(response).await?;
        if !envelope.status {
            return Err(AppError::transactional(format!(
                "Failed to resolve account: {}",
                envelope.message
            )));
        }
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_client() -> PaystackClient {
        PaystackClient::new(PaystackConfig {
            secret_key: "sk_test".into(),
            public_key: "pk_test".into(),
            base_url: "http://127.0.0.1:1".into(),
            timeout_ms: 300,
        })
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transactional_error() {
        let client = unreachable_client();
        let err = client.verify_transaction("ORD-x").await.unwrap_err();
        assert!(matches!(err, AppError::Transactional(_)));
    }

    #[tokio::test]
    async fn test_missing_secret_fails_closed() {
        let client = PaystackClient::new(PaystackConfig {
            secret_key: String::new(),
            public_key: "pk".into(),
            base_url: "http://127.0.0.1:1".into(),
            timeout_ms: 300,
        });
        let err = client
            .create_subaccount(&SubaccountRequest {
                business_name: "Store".into(),
                settlement_bank: "058".into(),
                account_number: "0001112223".into(),
                percentage_charge: 0.0,
                description: "Vendor".into(),
                primary_contact_email: "v@example.com".into(),
                primary_contact_name: "V".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transactional(_)));
    }
}
