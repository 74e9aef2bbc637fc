// onboarding/src/services/credentials.rs

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Random bytes behind each generated password (144 bits).
const PASSWORD_ENTROPY_BYTES: usize = 18;

/// Initial password for a newly provisioned account.
///
/// `Debug` and `Display` never print the value; the only way to read it is
/// `expose()`, which the approval pipeline calls exactly twice: once for the
/// identity call and once for the email body.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimePassword(String);

impl OneTimePassword {
  pub fn generate() -> Self {
    let mut bytes = [0u8; PASSWORD_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    OneTimePassword(URL_SAFE_NO_PAD.encode(bytes))
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Debug for OneTimePassword {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("OneTimePassword([REDACTED])")
  }
}

impl std::fmt::Display for OneTimePassword {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("[REDACTED]")
  }
}
