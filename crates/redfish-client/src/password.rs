//! Per-BMC standard password derivation
//!
//! Every BMC gets its own password, derived from a site-wide master key and
//! the BMC's IPv4 address with PBKDF2-HMAC-SHA256.

use crate::error::RedfishError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::net::Ipv4Addr;

/// Length of the generated password in base64 characters.
pub const PASSWORD_LENGTH: usize = 20;

const SALT: &[u8] = b"NaCl";
const ITERATIONS: u32 = 100_000;
// 6 bits per base64 character
const KEY_BYTES: usize = PASSWORD_LENGTH * 6 / 8;

/// Returns the standard password for the BMC at `ip_address`.
///
/// ```
/// use redfish_client::password::standard_password;
/// assert_eq!(
///     standard_password("10.3.2.30", "ultra-secret string").unwrap(),
///     "Vbyf7AFhiY2phtD1vcF0"
/// );
/// ```
pub fn standard_password(ip_address: &str, master_key: &str) -> Result<String, RedfishError> {
    if ip_address.parse::<Ipv4Addr>().is_err() {
        return Err(RedfishError::InvalidInput(format!(
            "Need an IPv4 address, not '{ip_address}'"
        )));
    }
    if master_key.is_empty() {
        return Err(RedfishError::InvalidInput("Missing/empty master_key!".to_string()));
    }

    let mut key = [0u8; KEY_BYTES];
    pbkdf2_hmac::<Sha256>(format!("{master_key}{ip_address}").as_bytes(), SALT, ITERATIONS, &mut key);
    Ok(STANDARD.encode(key))
}
