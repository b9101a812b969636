use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{ecdsa::Signature, All, Message, PublicKey, Secp256k1, SecretKey};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{ChainflowError, Result};

/// Authentication-key scheme byte for single-key accounts.
pub const SINGLE_KEY_SCHEME: u8 = 0x02;

/// `AnyPublicKey` variant tag for secp256k1 ECDSA keys.
const SECP256K1_ECDSA_VARIANT: u8 = 0x01;

/// Length of an uncompressed SEC1 public key.
pub const PUBLIC_KEY_LEN: usize = 65;

fn context() -> &'static Secp256k1<All> {
	static CTX: OnceLock<Secp256k1<All>> = OnceLock::new();
	CTX.get_or_init(Secp256k1::new)
}

// -- Addresses --

/// A 32-byte on-chain account address.
///
/// Parses both full (`0x` + 64 hex) and short (`0x1`) forms; always
/// displays the full form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
	pub const ONE: Self = Self::from_u8(1);
	pub const THREE: Self = Self::from_u8(3);

	const fn from_u8(v: u8) -> Self {
		let mut bytes = [0u8; 32];
		bytes[31] = v;
		Self(bytes)
	}

	pub fn new(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	/// Full `0x`-prefixed form.
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(self.0))
	}

	/// Shortest `0x` form, as framework addresses are usually written.
	pub fn to_short_hex(&self) -> String {
		let full = hex::encode(self.0);
		let trimmed = full.trim_start_matches('0');
		if trimmed.is_empty() {
			"0x0".into()
		} else {
			format!("0x{trimmed}")
		}
	}
}

impl FromStr for AccountAddress {
	type Err = ChainflowError;

	fn from_str(s: &str) -> Result<Self> {
		let clean = s.strip_prefix("0x").unwrap_or(s);
		if clean.is_empty() || clean.len() > 64 {
			return Err(ChainflowError::BuildInvalid(format!("invalid address: {s:?}")));
		}
		let padded = format!("{clean:0>64}");
		let bytes = hex::decode(&padded)
			.map_err(|e| ChainflowError::BuildInvalid(format!("invalid address {s:?}: {e}")))?;
		let mut out = [0u8; 32];
		out.copy_from_slice(&bytes);
		Ok(Self(out))
	}
}

impl TryFrom<String> for AccountAddress {
	type Error = ChainflowError;

	fn try_from(s: String) -> Result<Self> {
		s.parse()
	}
}

impl From<AccountAddress> for String {
	fn from(a: AccountAddress) -> Self {
		a.to_hex()
	}
}

impl fmt::Display for AccountAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl fmt::Debug for AccountAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "AccountAddress({})", self.to_short_hex())
	}
}

// -- Key pairs --

/// A secp256k1 signing key and its public half, used as a single-key
/// account.  Ed25519 keys are not supported.
///
/// `Debug` prints only the public key.
#[derive(Clone)]
pub struct KeyPair {
	secret: SecretKey,
	public: PublicKey,
}

impl KeyPair {
	/// Generate a fresh key pair from OS entropy.
	pub fn generate() -> Result<Self> {
		let mut bytes = [0u8; 32];
		OsRng
			.try_fill_bytes(&mut bytes)
			.map_err(|e| ChainflowError::KeyMaterial(format!("entropy source failed: {e}")))?;
		let secret = SecretKey::from_slice(&bytes)
			.map_err(|e| ChainflowError::KeyMaterial(format!("generated key rejected: {e}")))?;
		Ok(Self::from_secret(secret))
	}

	/// Restore from a 32-byte secret, hex encoded with or without `0x`.
	pub fn from_secret_hex(hex_str: &str) -> Result<Self> {
		let clean = hex_str.trim().strip_prefix("0x").unwrap_or(hex_str.trim());
		let bytes = hex::decode(clean)
			.map_err(|e| ChainflowError::KeyMaterial(format!("private key is not hex: {e}")))?;
		let secret = SecretKey::from_slice(&bytes)
			.map_err(|e| ChainflowError::KeyMaterial(format!("private key rejected: {e}")))?;
		Ok(Self::from_secret(secret))
	}

	fn from_secret(secret: SecretKey) -> Self {
		let public = PublicKey::from_secret_key(context(), &secret);
		Self { secret, public }
	}

	/// Hex form of the secret, for handing to the user exactly once.
	pub fn export_secret_hex(&self) -> SecretString {
		SecretString::from(format!("0x{}", hex::encode(self.secret.secret_bytes())))
	}

	/// Uncompressed SEC1 public key (65 bytes, `0x04` prefix).
	pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
		self.public.serialize_uncompressed()
	}

	pub fn public_key_hex(&self) -> String {
		format!("0x{}", hex::encode(self.public_key_bytes()))
	}

	/// Address owned by this key: the single-key authentication key,
	/// `SHA3-256(bcs(AnyPublicKey::Secp256k1Ecdsa(pk)) || 0x02)`.
	pub fn address(&self) -> AccountAddress {
		let mut h = Sha3_256::new();
		// BCS: enum variant tag, then the key as a length-prefixed vector.
		h.update([SECP256K1_ECDSA_VARIANT, PUBLIC_KEY_LEN as u8]);
		h.update(self.public_key_bytes());
		h.update([SINGLE_KEY_SCHEME]);
		AccountAddress(h.finalize().into())
	}

	/// Sign `SHA3-256(message)` and return the 64-byte compact signature
	/// (low-S normalised).
	pub fn sign(&self, message: &[u8]) -> [u8; 64] {
		let msg = Message::from_digest(sha3_256(message));
		context().sign_ecdsa(&msg, &self.secret).serialize_compact()
	}
}

impl fmt::Debug for KeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyPair")
			.field("public", &self.public_key_hex())
			.finish_non_exhaustive()
	}
}

/// Check a compact signature produced by [`KeyPair::sign`].
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8; 64]) -> bool {
	let Ok(pk) = PublicKey::from_slice(public_key) else {
		return false;
	};
	let Ok(sig) = Signature::from_compact(signature) else {
		return false;
	};
	let msg = Message::from_digest(sha3_256(message));
	context().verify_ecdsa(&msg, &sig, &pk).is_ok()
}

pub fn sha3_256(data: &[u8]) -> [u8; 32] {
	Sha3_256::digest(data).into()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_addresses_are_left_padded() {
		let a: AccountAddress = "0x1".parse().unwrap();
		assert_eq!(a, AccountAddress::ONE);
		assert_eq!(a.to_short_hex(), "0x1");
		assert_eq!(a.to_hex().len(), 66);
		assert!(a.to_hex().ends_with("0001"));
	}

	#[test]
	fn address_rejects_garbage() {
		assert!("".parse::<AccountAddress>().is_err());
		assert!("0x".parse::<AccountAddress>().is_err());
		assert!("0xzz".parse::<AccountAddress>().is_err());
		let too_long = format!("0x{}", "1".repeat(65));
		assert!(too_long.parse::<AccountAddress>().is_err());
	}

	#[test]
	fn address_serde_uses_hex_string() {
		let a = AccountAddress::THREE;
		let json = serde_json::to_string(&a).unwrap();
		assert_eq!(json, format!("\"{}\"", a.to_hex()));
		let back: AccountAddress = serde_json::from_str(&json).unwrap();
		assert_eq!(back, a);
	}

	#[test]
	fn restored_key_derives_same_address() {
		let kp = KeyPair::generate().unwrap();
		use secrecy::ExposeSecret;
		let exported = kp.export_secret_hex();
		let restored = KeyPair::from_secret_hex(exported.expose_secret()).unwrap();
		assert_eq!(kp.address(), restored.address());
	}

	#[test]
	fn signatures_verify_against_public_key() {
		let kp = KeyPair::generate().unwrap();
		let sig = kp.sign(b"payload");
		assert!(verify(&kp.public_key_bytes(), b"payload", &sig));
		assert!(!verify(&kp.public_key_bytes(), b"tampered", &sig));
	}

	#[test]
	fn debug_hides_secret() {
		let kp = KeyPair::from_secret_hex(
			"477396f5f3a2f35ce89d0c917cbcd8cda2b84b27a1130d2723e7418a9c0e5085",
		)
		.unwrap();
		let dbg = format!("{kp:?}");
		assert!(!dbg.contains("477396f5"));
		assert!(dbg.contains(&kp.public_key_hex()));
	}

	#[test]
	fn single_key_address_is_pinned() {
		// Secret 1: the public key is the curve generator.
		let kp = KeyPair::from_secret_hex(&format!("0x{:064x}", 1)).unwrap();
		assert_eq!(
			kp.public_key_hex(),
			"0x0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
			 483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
				.replace(char::is_whitespace, "")
		);
		assert_eq!(
			kp.address().to_hex(),
			"0xd27beca0d8d20fa2ce444c7beab733b080d020711abcb65b2cb991868fb8fddb"
		);

		let kp = KeyPair::from_secret_hex(
			"0x477396f5f3a2f35ce89d0c917cbcd8cda2b84b27a1130d2723e7418a9c0e5085",
		)
		.unwrap();
		assert_eq!(
			kp.address().to_hex(),
			"0x9ee457980796f239542e4ff5444bcfbdb53d346b27901a0865d94823466a957b"
		);
	}

	#[test]
	fn signature_covers_sha3_digest() {
		let kp = KeyPair::generate().unwrap();
		let sig = Signature::from_compact(&kp.sign(b"signing message")).unwrap();
		let pk = PublicKey::from_slice(&kp.public_key_bytes()).unwrap();
		let sha3 = Message::from_digest(sha3_256(b"signing message"));
		let raw = Message::from_digest(*b"signing message, not its digest.");
		assert!(context().verify_ecdsa(&sha3, &sig, &pk).is_ok());
		assert!(context().verify_ecdsa(&raw, &sig, &pk).is_err());
	}

	#[test]
	fn bad_private_keys_are_key_material_errors() {
		assert!(matches!(
			KeyPair::from_secret_hex("not hex"),
			Err(ChainflowError::KeyMaterial(_))
		));
		assert!(matches!(
			KeyPair::from_secret_hex("00"),
			Err(ChainflowError::KeyMaterial(_))
		));
	}
}
