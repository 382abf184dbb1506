//! BMC password rotation
//!
//! Brings a BMC onto its standard password: if the standard password does
//! not open a session, the caller's old password and then the factory
//! defaults are tried, the account is re-patched and the new password is
//! verified with a fresh session.

use crate::bmc_trait::{BmcTrait, Method, Session};
use crate::error::RedfishError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

const FACTORY_B64: &str = "Y2FsdmluLGNhbHZpbmNhbHZpbixjYWx2aW4xLGNhbHZpbmNhbHZpbjE=";

/// Pause between failed logins so the BMC does not lock us out.
pub const DEFAULT_LOGIN_DELAY: Duration = Duration::from_secs(30);

/// Vendor factory default passwords, in the order they are tried.
pub fn factory_passwords() -> Vec<String> {
    STANDARD
        .decode(FACTORY_B64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Ensures `new_password` is the BMC's password for `bmc.username()`.
///
/// Returns true when the password had to be changed.
pub async fn set_bmc_password(
    bmc: &dyn BmcTrait,
    new_password: &str,
    old_password: Option<&str>,
    login_delay: Duration,
) -> Result<bool, RedfishError> {
    if let Some(session) = bmc.open_session(new_password).await? {
        info!("Production BMC credentials are working on this BMC.");
        bmc.close_session(&session).await?;
        return Ok(false);
    }

    info!("Production BMC credentials don't work on this BMC. Trying old / factory default credentials.");

    let candidates: Vec<String> = old_password
        .map(str::to_string)
        .into_iter()
        .chain(factory_passwords())
        .filter(|p| !p.is_empty())
        .collect();

    let mut session = None;
    for (attempt, password) in candidates.iter().enumerate() {
        if attempt > 0 {
            tokio::time::sleep(login_delay).await;
        }
        if let Some(opened) = bmc.open_session(password).await? {
            session = Some(opened);
            break;
        }
        debug!("Login attempt {} rejected by BMC {}", attempt + 1, bmc.ip_address());
    }
    let Some(session) = session else {
        return Err(RedfishError::Authentication(format!(
            "Unable to log in to BMC {} with any known password!",
            bmc.ip_address()
        )));
    };

    info!("Changing BMC password to standard");
    set_account_password(bmc, &session, new_password).await?;
    info!("BMC password has been set.");
    bmc.close_session(&session).await?;

    match bmc.open_session(new_password).await? {
        Some(session) => {
            info!("Production BMC credentials are working on this BMC.");
            bmc.close_session(&session).await?;
            Ok(true)
        }
        None => Err(RedfishError::Authentication(format!(
            "BMC {} does not accept the new password",
            bmc.ip_address()
        ))),
    }
}

/// Crawls the account service and patches the password of the account
/// named `bmc.username()`.
pub async fn set_account_password(bmc: &dyn BmcTrait, session: &Session, password: &str) -> Result<(), RedfishError> {
    let accounts = user_accounts(bmc, session).await?;
    let mut matched = None;
    for account in accounts {
        let detail = bmc.session_request(session, Method::Get, &account, None).await?;
        if detail.get("UserName").and_then(Value::as_str) == Some(bmc.username()) {
            matched = Some(account);
            break;
        }
    }
    let account = matched.ok_or_else(|| {
        RedfishError::Authentication(format!("Unable to find BMC account for {}", bmc.username()))
    })?;
    debug!("Found account {account}");

    bmc.session_request(session, Method::Patch, &account, Some(&json!({"Password": password})))
        .await?;
    Ok(())
}

/// Paths of every account on the BMC, found without vendor-specific paths.
pub async fn user_accounts(bmc: &dyn BmcTrait, session: &Session) -> Result<Vec<String>, RedfishError> {
    let root = bmc.session_request(session, Method::Get, "/redfish/v1", None).await?;
    let account_service = odata_id(&root, "/redfish/v1", "AccountService")?;
    let service = bmc.session_request(session, Method::Get, &account_service, None).await?;
    let accounts_path = odata_id(&service, &account_service, "Accounts")?;
    let accounts = bmc.session_request(session, Method::Get, &accounts_path, None).await?;

    Ok(accounts
        .get("Members")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m.get("@odata.id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

fn odata_id(data: &Value, path: &str, field: &str) -> Result<String, RedfishError> {
    data.get(field)
        .and_then(|v| v.get("@odata.id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RedfishError::MissingField {
            path: path.to_string(),
            field: format!("{field}.@odata.id"),
        })
}
