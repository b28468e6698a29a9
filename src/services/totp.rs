use totp_rs::{Algorithm, Secret, TOTP};

use crate::modules::auth::interface::AuthError;

pub const TOTP_DIGITS: usize = 6;
pub const TOTP_STEP: u64 = 30;
/// Accept the current code plus one step either side for clock skew.
pub const TOTP_SKEW: u8 = 1;

/// RFC 6238 engine: secret provisioning, otpauth URI, QR rendering and
/// code verification. Stateless apart from the configured issuer name.
#[derive(Clone)]
pub struct TotpService {
    issuer: String,
}

impl TotpService {
    pub fn new(issuer: String) -> Self {
        Self { issuer }
    }

    /// New random 160-bit secret, base32-encoded (32 characters).
    pub fn generate_secret(&self) -> Result<String, AuthError> {
        let bytes = Secret::generate_secret()
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("secret generation failed: {e:?}")))?;
        Ok(self.build(bytes, "seed")?.get_secret_base32())
    }

    pub fn provisioning_uri(&self, secret_base32: &str, email: &str) -> Result<String, AuthError> {
        Ok(self.from_base32(secret_base32, email)?.get_url())
    }

    /// QR code for the provisioning URI as a `data:image/png;base64,...` URL.
    pub fn qr_data_url(&self, secret_base32: &str, email: &str) -> Result<String, AuthError> {
        let qr = self
            .from_base32(secret_base32, email)?
            .get_qr_base64()
            .map_err(|e| AuthError::Internal(format!("QR rendering failed: {e}")))?;
        Ok(format!("data:image/png;base64,{qr}"))
    }

    /// Checks `code` against the current time window (± `TOTP_SKEW` steps).
    pub fn verify(&self, secret_base32: &str, email: &str, code: &str) -> Result<bool, AuthError> {
        Ok(self
            .from_base32(secret_base32, email)?
            .check_current(code)
            .unwrap_or(false))
    }

    fn from_base32(&self, secret_base32: &str, account: &str) -> Result<TOTP, AuthError> {
        let bytes = Secret::Encoded(secret_base32.to_string())
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("bad TOTP secret: {e:?}")))?;
        self.build(bytes, account)
    }

    fn build(&self, secret: Vec<u8>, account: &str) -> Result<TOTP, AuthError> {
        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| AuthError::Internal(format!("TOTP init failed: {e}")))
    }
}
