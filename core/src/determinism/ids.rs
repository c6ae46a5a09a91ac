use sha2::{Digest, Sha256};
use ulid::Ulid;

pub fn comparison_id_ulid() -> String {
    format!("cmp_{}", Ulid::new())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}
