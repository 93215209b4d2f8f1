//! Request/response DTOs for payment endpoints.

use serde::Serialize;

use crate::domain::gateway::SignedRequest;

/// Response for `POST /api/payments/orders/:id/form`: everything the
/// frontend needs to render the auto-submitting gateway form.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentFormResponse {
    /// Gateway endpoint to POST the form to.
    pub url: String,
    /// Form fields, named exactly as the gateway expects them.
    pub params: GatewayFormParams,
}

/// The three vendor form fields.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayFormParams {
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

impl From<SignedRequest> for PaymentFormResponse {
    fn from(signed: SignedRequest) -> Self {
        Self {
            url: signed.endpoint,
            params: GatewayFormParams {
                signature_version: signed.signature_version,
                merchant_parameters: signed.merchant_parameters,
                signature: signed.signature,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_response_uses_vendor_field_names() {
        let response = PaymentFormResponse::from(SignedRequest {
            endpoint: "https://sis-t.redsys.es:25443/sis/realizarPago".to_string(),
            signature_version: "HMAC_SHA256_V1".to_string(),
            merchant_parameters: "eyJ9".to_string(),
            signature: "c2ln".to_string(),
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["params"]["Ds_SignatureVersion"], "HMAC_SHA256_V1");
        assert_eq!(json["params"]["Ds_MerchantParameters"], "eyJ9");
        assert_eq!(json["params"]["Ds_Signature"], "c2ln");
    }
}
