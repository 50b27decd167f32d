//! HTTP Basic authentication for the JSON-RPC endpoint.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use futures::FutureExt;
use hmac::{Hmac, Mac};
use hyper::{StatusCode, header};
use jsonrpsee::{
    core::BoxError,
    server::{HttpBody, HttpRequest, HttpResponse},
};
use rand::{Rng, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
#[allow(deprecated)]
use sha2::{
    Sha256,
    digest::{CtOutput, OutputSizeUser, generic_array::GenericArray},
};
use tower::Service;
use tracing::{info, warn};

use crate::{
    config::RpcAuthSection,
    error::{Error, ErrorKind},
    fl,
};

/// Delay applied to every rejected request, to slow down password guessing.
const FAILED_AUTH_DELAY: Duration = Duration::from_millis(250);

type SaltedPasswordHash = CtOutput<Hmac<Sha256>>;

/// Hashes a password as `HMAC-SHA256(key = salt, message = password)`.
fn hash_password(password: &str, salt: &str) -> SaltedPasswordHash {
    let mut h = Hmac::<Sha256>::new_from_slice(salt.as_bytes())
        .expect("cannot fail, HMAC accepts any key length");
    h.write_all(password.as_bytes())
        .expect("can write into a digester");
    h.finalize()
}

/// 401 Unauthorized response, with no body.
async fn unauthorized() -> Result<HttpResponse, BoxError> {
    HttpResponse::builder()
        .header(header::WWW_AUTHENTICATE, "Basic realm=\"jsonrpc\"")
        .status(StatusCode::UNAUTHORIZED)
        .body(HttpBody::empty())
        .map_err(BoxError::from)
}

/// A salted password hash, in the `salt$hash` form written by `paycoind add-rpc-user`.
#[derive(Clone)]
pub(crate) struct PasswordHash {
    salt: String,
    hash: SaltedPasswordHash,
}

impl FromStr for PasswordHash {
    type Err = ();

    #[allow(deprecated)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (salt, hash) = s.split_once('$').ok_or(())?;
        let hash = hex::decode(hash).map_err(|_| ())?;

        (hash.len() == Hmac::<Sha256>::output_size())
            .then(|| Self {
                salt: salt.into(),
                hash: CtOutput::new(GenericArray::clone_from_slice(hash.as_slice())),
            })
            .ok_or(())
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("salt", &self.salt)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hash = hex::encode(self.hash.clone().into_bytes());
        write!(f, "{}${hash}", self.salt)
    }
}

impl PasswordHash {
    pub(crate) fn from_bare(password: &str) -> Self {
        let salt: [u8; 16] = OsRng.r#gen();
        let salt = hex::encode(salt);
        let hash = hash_password(password, &salt);
        Self { salt, hash }
    }

    fn check(&self, password: &str) -> bool {
        // `CtOutput` compares in constant time.
        hash_password(password, &self.salt) == self.hash
    }
}

/// Credentials accepted by the JSON-RPC endpoint, keyed by user name.
#[derive(Clone, Debug)]
pub(crate) struct Users(HashMap<String, PasswordHash>);

impl Users {
    /// Parses the `[[rpc.auth]]` entries of the config.
    ///
    /// Each entry must carry exactly one of `password` and `pwhash`, and at least one
    /// entry must be present.
    pub(crate) fn from_config(auth: &[RpcAuthSection]) -> Result<Self, Error> {
        if auth.is_empty() {
            return Err(ErrorKind::Init
                .context("Configure at least one `[[rpc.auth]]` user to start the RPC server")
                .into());
        }

        let mut using_bare_password = false;
        let mut using_pwhash = false;

        let users = auth
            .iter()
            .map(|a| match (&a.password, &a.pwhash) {
                (Some(password), None) => {
                    using_bare_password = true;
                    Ok((a.user.clone(), PasswordHash::from_bare(password.expose_secret())))
                }
                (None, Some(pwhash)) => {
                    using_pwhash = true;
                    pwhash.parse().map(|hash| (a.user.clone(), hash)).map_err(|()| {
                        ErrorKind::Init
                            .context(format!("Invalid `pwhash` for RPC user {}", a.user))
                            .into()
                    })
                }
                _ => Err(ErrorKind::Init
                    .context(format!(
                        "RPC user {} must have exactly one of `password` or `pwhash`",
                        a.user,
                    ))
                    .into()),
            })
            .collect::<Result<_, Error>>()?;

        if using_bare_password {
            info!("{}", fl!("rpc-bare-password-auth-info"));
            warn!("\n{}", fl!("rpc-bare-password-auth-warn"));
        }
        if using_pwhash {
            info!("{}", fl!("rpc-pwhash-auth-info"));
        }

        Ok(Self(users))
    }

    /// Checks a `Basic` authorization header against the known users.
    fn is_authorized(&self, auth_header: &header::HeaderValue) -> bool {
        let encoded_user_pass = match auth_header
            .to_str()
            .ok()
            .and_then(|s| s.strip_prefix("Basic "))
            .and_then(|s| Base64::decode_vec(s.trim()).ok())
            .and_then(|b| String::from_utf8(b).ok())
        {
            Some(s) => SecretString::new(s),
            None => return false,
        };

        let Some((user, pass)) = encoded_user_pass.expose_secret().split_once(':') else {
            return false;
        };

        self.0
            .get(user)
            .is_some_and(|password| password.check(pass))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Authorization<S> {
    service: S,
    users: Users,
}

/// Implements [`tower::Layer`] for [`Authorization`].
#[derive(Clone)]
pub(crate) struct AuthorizationLayer {
    users: Users,
}

impl AuthorizationLayer {
    pub(crate) fn new(users: Users) -> Self {
        Self { users }
    }
}

impl<S> tower::Layer<S> for AuthorizationLayer {
    type Service = Authorization<S>;

    fn layer(&self, service: S) -> Self::Service {
        Authorization {
            service,
            users: self.users.clone(),
        }
    }
}

impl<S> Service<HttpRequest<HttpBody>> for Authorization<S>
where
    S: Service<HttpRequest, Response = HttpResponse> + Clone + Send + 'static,
    S::Error: Into<BoxError> + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = BoxError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: HttpRequest<HttpBody>) -> Self::Future {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .is_some_and(|auth_header| self.users.is_authorized(auth_header));

        if authorized {
            let mut service = self.service.clone();
            async move { service.call(request).await.map_err(Into::into) }.boxed()
        } else {
            warn!("Rejected RPC request with missing or incorrect credentials");
            async {
                tokio::time::sleep(FAILED_AUTH_DELAY).await;
                unauthorized().await
            }
            .boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use base64ct::{Base64, Encoding};
    use hyper::header::HeaderValue;
    use secrecy::SecretString;

    use super::{PasswordHash, Users};
    use crate::config::RpcAuthSection;

    fn basic(user_pass: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Basic {}", Base64::encode_string(user_pass.as_bytes())))
            .unwrap()
    }

    #[test]
    fn pwhash_round_trip() {
        let password = "abadpassword";
        let pwhash = PasswordHash::from_bare(password);
        assert!(pwhash.check(password));
        assert!(!pwhash.check("anotherpassword"));

        let parsed_pwhash = pwhash.to_string().parse::<PasswordHash>().unwrap();
        assert!(parsed_pwhash.check(password));
    }

    #[test]
    fn malformed_pwhash() {
        assert!("nodollar".parse::<PasswordHash>().is_err());
        assert!("salt$nothex".parse::<PasswordHash>().is_err());
        assert!("salt$abcd".parse::<PasswordHash>().is_err());
    }

    #[test]
    fn basic_auth() {
        let users = Users::from_config(&[
            RpcAuthSection {
                user: "paycoin_tests".into(),
                password: Some(SecretString::new(
                    "PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ".into(),
                )),
                pwhash: None,
            },
            RpcAuthSection {
                user: "hashed".into(),
                password: None,
                pwhash: Some(PasswordHash::from_bare("hunter2").to_string()),
            },
        ])
        .unwrap();

        assert!(users.is_authorized(&basic("paycoin_tests:PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ")));
        assert!(users.is_authorized(&basic("hashed:hunter2")));
        assert!(!users.is_authorized(&basic("paycoin_tests:wrong")));
        assert!(!users.is_authorized(&basic("nobody:hunter2")));
        assert!(!users.is_authorized(&basic("no-colon")));
        assert!(!users.is_authorized(&HeaderValue::from_static("Bearer abc")));
    }

    #[test]
    fn rejects_bad_auth_config() {
        assert!(Users::from_config(&[]).is_err());
        assert!(
            Users::from_config(&[RpcAuthSection {
                user: "both".into(),
                password: Some(SecretString::new("a".into())),
                pwhash: Some(PasswordHash::from_bare("a").to_string()),
            }])
            .is_err()
        );
        assert!(
            Users::from_config(&[RpcAuthSection {
                user: "neither".into(),
                password: None,
                pwhash: None,
            }])
            .is_err()
        );
    }
}
