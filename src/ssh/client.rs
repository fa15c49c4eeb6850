//! SSH Client implementation using russh

use std::sync::Arc;
use std::time::Duration;

use russh::client;
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::PublicKey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::auth::{load_identity_async, Identity};
use super::config::SshConfig;
use super::error::SshError;
use super::host_trust::{HostKey, HostTrustValidator, TrustDecision};
use crate::state::IdentityState;

/// Connects to a server and authenticates with the vault's credentials
pub struct SshClient {
    config: SshConfig,
}

impl SshClient {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Connect, validate the host key and authenticate.
    ///
    /// Cancelling `cancel` aborts the attempt; a host key seen for the first
    /// time is then not stored.
    pub async fn connect(
        self,
        state: &IdentityState,
        cancel: &CancellationToken,
    ) -> Result<client::Handle<ClientHandler>, SshError> {
        let cancel = cancel.child_token();
        // russh runs the handshake, host key check included, on a task that
        // outlives this future. An attempt that does not finish cancels it.
        let abort = cancel.clone().drop_guard();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SshError::Cancelled),
            result = self.connect_inner(state, &cancel) => result,
        };
        if result.is_ok() {
            abort.disarm();
        }
        result
    }

    async fn connect_inner(
        &self,
        state: &IdentityState,
        cancel: &CancellationToken,
    ) -> Result<client::Handle<ClientHandler>, SshError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!("Connecting to SSH server at {}", addr);

        let socket_addr = tokio::net::lookup_host(&addr)
            .await
            .map_err(|e| SshError::ConnectionFailed(format!("Failed to resolve address: {}", e)))?
            .next()
            .ok_or_else(|| SshError::ConnectionFailed("No address found".to_string()))?;

        let ssh_config = client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = ClientHandler::new(
            state.validator(),
            self.config.host.clone(),
            self.config.port,
            cancel.clone(),
        );

        // Handler errors (host key mismatch) come back unchanged
        let mut handle = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            client::connect(Arc::new(ssh_config), socket_addr, handler),
        )
        .await
        .map_err(|_| {
            cancel.cancel();
            SshError::Timeout("Connection timed out".to_string())
        })??;

        debug!("SSH handshake completed");

        let authenticated = match load_identity_async(state.vault()).await? {
            Identity::PublicKey(key) => {
                let key_with_hash = PrivateKeyWithHashAlg::new(Arc::new(key), None);
                handle
                    .authenticate_publickey(&self.config.username, key_with_hash)
                    .await
                    .map_err(|e| SshError::AuthenticationFailed(e.to_string()))?
            }
            Identity::Password(password) => handle
                .authenticate_password(&self.config.username, password.as_str())
                .await
                .map_err(|e| SshError::AuthenticationFailed(e.to_string()))?,
        };

        if !authenticated.success() {
            return Err(SshError::AuthenticationFailed(
                "Authentication rejected by server".to_string(),
            ));
        }

        info!("SSH authentication successful");
        Ok(handle)
    }
}

/// Client handler for russh callbacks.
///
/// Host key verification goes through the TOFU validator; a mismatch fails
/// the handshake with [`SshError::HostKeyMismatch`].
pub struct ClientHandler {
    validator: Arc<HostTrustValidator>,
    host: String,
    port: u16,
    cancel: CancellationToken,
}

impl ClientHandler {
    pub fn new(
        validator: Arc<HostTrustValidator>,
        host: String,
        port: u16,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            validator,
            host,
            port,
            cancel,
        }
    }
}

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let key = HostKey::from(server_public_key);
        let decision = self
            .validator
            .validate(&self.host, self.port, &key, &self.cancel)
            .await?;

        match decision {
            TrustDecision::FirstUse { fingerprint } => info!(
                "Host key for {}:{} trusted on first use ({})",
                self.host, self.port, fingerprint
            ),
            TrustDecision::Verified { .. } => {
                info!("Host key verified for {}:{}", self.host, self.port)
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use russh::client::Handler;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::vault::CredentialVault;

    const ED25519_KEY: &str = include_str!("../../testdata/openssh_ed25519.key");

    const ED25519_PUB: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOKwqBArb4211lqN05a4utYMmTxCLT9P6HHwVG4zMqOy";
    const RSA_PUB: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAAAgQDftufUnQw4IoB7hGQg17XLhvXSk6Rv0UXfBBurQ32O46Ducm4ZnUwkdwDXbr6gV2XW0VRLr6aEhyuuFHA8Nve381LLYB+/8ijuaNiO3OMkTnlch1Bi71ecWT8KN4ps7yJZ7LF162V7J8CkcMEA9fhwR3/q0EPygygJ8OmmehC6sw==";

    fn handler(validator: &Arc<HostTrustValidator>) -> ClientHandler {
        ClientHandler::new(
            validator.clone(),
            "example.com".to_string(),
            22,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_check_server_key_tofu() {
        let validator = Arc::new(HostTrustValidator::new(CredentialVault::in_memory()));
        let ed25519 = PublicKey::from_openssh(ED25519_PUB).unwrap();
        let rsa = PublicKey::from_openssh(RSA_PUB).unwrap();

        assert!(handler(&validator).check_server_key(&ed25519).await.unwrap());
        assert!(handler(&validator).check_server_key(&ed25519).await.unwrap());

        let err = handler(&validator).check_server_key(&rsa).await.unwrap_err();
        assert!(err.is_security_warning());
        assert!(matches!(err, SshError::HostKeyMismatch { ref endpoint, .. } if endpoint == "example.com:22"));
    }

    #[tokio::test]
    async fn test_connect_cancelled() {
        let state = IdentityState::in_memory();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = SshClient::new(SshConfig::new("127.0.0.1", 22, "user"))
            .connect(&state, &cancel)
            .await;
        assert!(matches!(result, Err(SshError::Cancelled)));
    }

    struct AcceptAll;

    impl russh::server::Handler for AcceptAll {
        type Error = russh::Error;
    }

    /// Serve one connection with a real russh server. The server's version
    /// line goes through at once; everything after it is held back for
    /// `delay`, so the client's host key check runs late.
    async fn slow_kex_server(delay: Duration) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let key = russh::keys::decode_secret_key(ED25519_KEY, None).unwrap();
        let config = Arc::new(russh::server::Config {
            keys: vec![key],
            ..Default::default()
        });

        tokio::spawn(async move {
            let (client, _) = listener.accept().await.unwrap();
            let (server_io, relay_io) = tokio::io::duplex(64 * 1024);
            tokio::spawn(async move {
                if let Ok(session) = russh::server::run_stream(config, server_io, AcceptAll).await {
                    let _ = session.await;
                }
            });

            let (mut client_read, mut client_write) = client.into_split();
            let (mut relay_read, mut relay_write) = tokio::io::split(relay_io);
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut client_read, &mut relay_write).await;
            });

            let mut version_line = Vec::new();
            let mut byte = [0u8; 1];
            while relay_read.read_exact(&mut byte).await.is_ok() {
                version_line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            let _ = client_write.write_all(&version_line).await;

            tokio::time::sleep(delay).await;
            let _ = tokio::io::copy(&mut relay_read, &mut client_write).await;
        });

        port
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_out_connect_never_stores_host_key() {
        let port = slow_kex_server(Duration::from_secs(2)).await;
        let state = IdentityState::in_memory();

        let result = SshClient::new(SshConfig::new("127.0.0.1", port, "u").with_timeout(1))
            .connect(&state, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SshError::Timeout(_))));

        // Key exchange finishes on russh's task after the attempt is over
        tokio::time::sleep(Duration::from_secs(3)).await;
        let stored = state.vault().retrieve_host_fingerprint("127.0.0.1", port).unwrap();
        assert_eq!(stored, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropped_connect_never_stores_host_key() {
        let port = slow_kex_server(Duration::from_secs(2)).await;
        let state = IdentityState::in_memory();

        let cancel = CancellationToken::new();
        let attempt = SshClient::new(SshConfig::new("127.0.0.1", port, "u").with_timeout(30))
            .connect(&state, &cancel);
        assert!(tokio::time::timeout(Duration::from_secs(1), attempt).await.is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        let stored = state.vault().retrieve_host_fingerprint("127.0.0.1", port).unwrap();
        assert_eq!(stored, None);
    }
}
