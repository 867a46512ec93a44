use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JWT claims minted at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub id: i64,
    /// User email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
}

/// Claims as they arrive from a caller, before the subject is coerced.
///
/// Tokens minted by other HMAC libraries may encode the id as a float, so the
/// raw JSON value is kept and checked in [`coerce_subject_id`].
#[derive(Debug, Deserialize)]
pub struct IncomingClaims {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
}

/// Identity claims that survived verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub user_id: i64,
    pub email: Option<String>,
}

/// Coerces the `id` claim to a non-negative integer id.
///
/// Accepts integers and integral floats. Zero is a valid subject; handlers
/// read it the same way as an absent identity.
pub fn coerce_subject_id(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };

    let id = if let Some(unsigned) = number.as_u64() {
        i64::try_from(unsigned).ok()?
    } else {
        let float = number.as_f64()?;
        if !float.is_finite() || float.fract() != 0.0 || float < 0.0 || float >= i64::MAX as f64 {
            return None;
        }
        float as i64
    };

    Some(id)
}
