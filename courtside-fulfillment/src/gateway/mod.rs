//! Payment gateway integration via REST API (no SDK dependency)

use hmac::{Hmac, Mac};
use sha2::Sha256;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const API_BASE: &str = "https://api.payments.example.com/v1";

/// Outcome of an off-session charge attempt, as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Succeeded,
    /// Customer authentication required (3DS); the charge is parked
    RequiresAction,
    /// Declined or cancelled; the charge will not recover on its own
    Failed,
}

impl ChargeOutcome {
    pub fn from_intent_status(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "requires_action" | "requires_confirmation" => Self::RequiresAction,
            _ => Self::Failed,
        }
    }
}

/// Parameters for the deferred second seat charge
pub struct OffSessionCharge<'a> {
    pub customer_id: &'a str,
    pub amount: i64,
    pub currency: &'a str,
    pub pairing_id: &'a str,
    pub purchase_id: &'a str,
    /// Stable across retries of the same attempt series; replaying it makes
    /// the gateway return the original intent instead of charging again
    pub idempotency_key: &'a str,
}

fn off_session_request(
    http: &reqwest::Client,
    secret_key: &str,
    charge: &OffSessionCharge<'_>,
) -> reqwest::RequestBuilder {
    http.post(format!("{API_BASE}/payment_intents"))
        .basic_auth(secret_key, None::<&str>)
        .header("Idempotency-Key", charge.idempotency_key)
        .form(&[
            ("amount", charge.amount.to_string()),
            ("currency", charge.currency.to_string()),
            ("customer", charge.customer_id.to_string()),
            ("off_session", "true".to_string()),
            ("confirm", "true".to_string()),
            (
                "metadata[paymentScenario]",
                "GROUP_SPLIT_SECOND_CHARGE".to_string(),
            ),
            ("metadata[pairingId]", charge.pairing_id.to_string()),
            ("metadata[purchaseId]", charge.purchase_id.to_string()),
        ])
}

/// Create and confirm an off-session payment intent for the deferred
/// second seat charge. Returns the intent id and its settled status.
pub async fn create_off_session_intent(
    http: &reqwest::Client,
    secret_key: &str,
    charge: &OffSessionCharge<'_>,
) -> Result<(String, ChargeOutcome), BoxError> {
    let resp: serde_json::Value = off_session_request(http, secret_key, charge)
        .send()
        .await?
        .json()
        .await?;

    // Declined off-session attempts come back as an error envelope that
    // still carries the parked intent
    let intent = if resp.get("error").is_some() {
        &resp["error"]["payment_intent"]
    } else {
        &resp
    };

    let id = intent["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| format!("Gateway create_off_session_intent failed: {resp}"))?;
    let status = intent["status"].as_str().unwrap_or("");
    Ok((id, ChargeOutcome::from_intent_status(status)))
}

/// Look up the actual gateway fee for a settled intent via its charge's
/// balance transaction. Best effort; callers treat failure as non-fatal.
pub async fn fetch_intent_fee(
    http: &reqwest::Client,
    secret_key: &str,
    intent_id: &str,
) -> Result<Option<i64>, BoxError> {
    let resp: serde_json::Value = http
        .get(format!("{API_BASE}/payment_intents/{intent_id}"))
        .basic_auth(secret_key, None::<&str>)
        .query(&[("expand[]", "latest_charge.balance_transaction")])
        .send()
        .await?
        .json()
        .await?;

    Ok(resp["latest_charge"]["balance_transaction"]["fee"].as_i64())
}

/// Verify the gateway webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid signature header");
    }

    let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap_or(""));
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(signed_payload.as_bytes());

    // Decode hex signature and use constant-time comparison via hmac::verify_slice
    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, ts: i64) -> String {
        let signed = format!("{ts}.{}", std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={ts},v1={sig}")
    }

    #[test]
    fn test_verify_webhook_signature_valid() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", chrono::Utc::now().timestamp());
        assert!(verify_webhook_signature(payload, &header, "whsec_test").is_ok());
    }

    #[test]
    fn test_verify_webhook_signature_wrong_secret() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", chrono::Utc::now().timestamp());
        assert!(verify_webhook_signature(payload, &header, "whsec_other").is_err());
    }

    #[test]
    fn test_verify_webhook_signature_stale_timestamp() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", chrono::Utc::now().timestamp() - 600);
        assert_eq!(
            verify_webhook_signature(payload, &header, "whsec_test"),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn test_verify_webhook_signature_malformed_header() {
        assert!(verify_webhook_signature(b"{}", "garbage", "whsec_test").is_err());
    }

    #[test]
    fn test_off_session_request_carries_idempotency_key() {
        let http = reqwest::Client::new();
        let charge = OffSessionCharge {
            customer_id: "cus_1",
            amount: 2500,
            currency: "eur",
            pairing_id: "pr_1",
            purchase_id: "pr_1:guarantee",
            idempotency_key: "pr_1:second-charge",
        };
        let req = off_session_request(&http, "sk_test", &charge).build().unwrap();

        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(
            req.headers()
                .get("Idempotency-Key")
                .and_then(|v| v.to_str().ok()),
            Some("pr_1:second-charge")
        );

        let body = std::str::from_utf8(req.body().unwrap().as_bytes().unwrap()).unwrap();
        assert!(body.contains("off_session=true"));
        assert!(body.contains("confirm=true"));
        assert!(body.contains("amount=2500"));
    }

    #[test]
    fn test_charge_outcome_mapping() {
        assert_eq!(
            ChargeOutcome::from_intent_status("succeeded"),
            ChargeOutcome::Succeeded
        );
        assert_eq!(
            ChargeOutcome::from_intent_status("requires_action"),
            ChargeOutcome::RequiresAction
        );
        assert_eq!(
            ChargeOutcome::from_intent_status("requires_payment_method"),
            ChargeOutcome::Failed
        );
        assert_eq!(ChargeOutcome::from_intent_status("canceled"), ChargeOutcome::Failed);
    }
}
