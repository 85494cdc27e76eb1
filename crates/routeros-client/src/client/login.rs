//! Challenge-response login.

use std::time::Duration;

use md5::{Digest, Md5};
use routeros_protocol::{ProtocolError, Request, Response, ResponseType};
use routeros_transport_traits::{CharsetKind, Charsets, Communicator, Direction};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Computes the `response` argument of the second login sentence.
///
/// The credential is `"00"` followed by the hex MD5 digest of a zero byte,
/// the password and the decoded challenge.
pub fn challenge_response(password: &[u8], challenge: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update([0u8]);
    hasher.update(password);
    hasher.update(challenge);
    format!("00{}", hex::encode(hasher.finalize()))
}

/// Logs `username` in over `com`.
///
/// Returns `Ok(false)` when the router rejects the credentials. With both
/// charsets set the password is transliterated into the remote charset
/// first. Persistent connections are locked in both directions for the
/// duration of the handshake.
///
/// Failures that show the peer is not a RouterOS API service are reported
/// as [`Error::IncompatibleService`].
pub async fn login<C>(com: &C, username: &str, password: &str) -> Result<bool>
where
    C: Communicator + ?Sized,
{
    let charsets = Charsets {
        local: com.charset(CharsetKind::Local),
        remote: com.charset(CharsetKind::Remote),
    };
    let password = charsets.to_remote(password.as_bytes());

    let held = if com.is_persistent() {
        Some(com.lock(Direction::All).await?)
    } else {
        None
    };
    let outcome = handshake(com, username, &password).await;
    if let Some(previous) = held {
        com.unlock(previous).await?;
    }

    match outcome {
        Ok(accepted) => {
            debug!(username, accepted, "Login finished");
            Ok(accepted)
        }
        Err(err) => Err(classify(com, err).await),
    }
}

async fn handshake<C>(com: &C, username: &str, password: &[u8]) -> Result<bool>
where
    C: Communicator + ?Sized,
{
    let mut request = Request::new("/login")?;
    request.send(com, None).await?;
    let challenge = Response::receive(com, false).await?;
    let ret = challenge
        .argument("ret")
        .ok_or_else(|| ProtocolError::UnexpectedValue("login challenge is missing".into()))?;
    let challenge = hex::decode(ret.as_text().as_ref()).map_err(|e| {
        ProtocolError::UnexpectedValue(format!("login challenge is not hex: {e}"))
    })?;

    request.set_argument("name", username)?;
    request.set_argument("response", challenge_response(password, &challenge))?;
    request.send(com, None).await?;
    let reply = Response::receive(com, false).await?;
    Ok(reply.response_type() == ResponseType::Final && reply.argument("ret").is_none())
}

async fn classify<C>(com: &C, err: Error) -> Error
where
    C: Communicator + ?Sized,
{
    let unexpected = matches!(&err, Error::Protocol(p) if p.is_incompatibility());
    let silent = !matches!(com.is_data_awaiting(Some(Duration::ZERO)).await, Ok(true));
    if unexpected || silent {
        warn!(error = %err, "Peer is not a compatible RouterOS service");
        Error::IncompatibleService(Box::new(err))
    } else {
        err
    }
}
