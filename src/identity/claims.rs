//! Id-token payload decoding
//!
//! The id token stored in the session is the one the app itself obtained
//! from the token endpoint over TLS, so its claims are read without
//! signature verification. Only the payload segment is decoded.

use serde_json::{Map, Value};

/// Decode the claims from a JWT payload without verifying the signature.
///
/// Returns None for anything that is not a three-part token with a JSON
/// object payload.
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload = base64_url_decode(parts[1])?;
    match serde_json::from_slice::<Value>(&payload) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Decode base64url string (JWT uses base64url without padding)
fn base64_url_decode(input: &str) -> Option<Vec<u8>> {
    // Replace URL-safe characters and add padding
    let mut s = input.replace('-', "+").replace('_', "/");
    match s.len() % 4 {
        2 => s.push_str("=="),
        3 => s.push('='),
        _ => {}
    }

    base64_decode_simple(&s).ok()
}

/// Simple base64 decoder (standard alphabet)
fn base64_decode_simple(input: &str) -> Result<Vec<u8>, ()> {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut output = Vec::new();
    let mut buf = 0u32;
    let mut bits = 0;

    for c in input.bytes() {
        if c == b'=' {
            break;
        }
        let val = ALPHABET.iter().position(|&x| x == c).ok_or(())? as u32;
        buf = (buf << 6) | val;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            output.push((buf >> bits) as u8);
            buf &= (1 << bits) - 1;
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Header: {"alg":"none","typ":"JWT"}
    const HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";

    fn token_with_payload(claims: &serde_json::Value) -> String {
        let payload = claims.to_string();
        let encoded = base64_url_encode(payload.as_bytes());
        format!("{}.{}.", HEADER, encoded)
    }

    // Test-only encoder matching the decoder above
    fn base64_url_encode(input: &[u8]) -> String {
        const ALPHABET: &[u8] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
        let mut out = String::new();
        for chunk in input.chunks(3) {
            let b = [
                chunk[0],
                chunk.get(1).copied().unwrap_or(0),
                chunk.get(2).copied().unwrap_or(0),
            ];
            let n = ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32;
            out.push(ALPHABET[(n >> 18) as usize & 63] as char);
            out.push(ALPHABET[(n >> 12) as usize & 63] as char);
            if chunk.len() > 1 {
                out.push(ALPHABET[(n >> 6) as usize & 63] as char);
            }
            if chunk.len() > 2 {
                out.push(ALPHABET[n as usize & 63] as char);
            }
        }
        out
    }

    #[test]
    fn test_decode_claims_reads_payload() {
        let token = token_with_payload(&serde_json::json!({
            "sub": "user-1",
            "preferred_username": "ada@example.com",
            "exp": 4102444800i64
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.get("sub").unwrap(), "user-1");
        assert_eq!(
            claims.get("preferred_username").unwrap(),
            "ada@example.com"
        );
    }

    #[test]
    fn test_decode_claims_rejects_malformed() {
        assert!(decode_claims("not-a-jwt").is_none());
        assert!(decode_claims("only.two").is_none());
        assert!(decode_claims("").is_none());
    }

    #[test]
    fn test_decode_claims_rejects_non_object_payload() {
        let encoded = base64_url_encode(b"[1,2,3]");
        let token = format!("{}.{}.", HEADER, encoded);
        assert!(decode_claims(&token).is_none());
    }
}
