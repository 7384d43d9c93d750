use crate::RpcError;

pub fn encode_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

pub fn parse_quantity(raw: &str) -> Result<u128, RpcError> {
    let digits = strip_prefix(raw)?;
    if digits.is_empty() {
        return Err(RpcError::malformed(format!("empty quantity '{raw}'")));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|_| RpcError::malformed(format!("invalid quantity '{raw}'")))
}

pub fn parse_u64_quantity(raw: &str) -> Result<u64, RpcError> {
    u64::try_from(parse_quantity(raw)?)
        .map_err(|_| RpcError::malformed(format!("quantity '{raw}' exceeds 64 bits")))
}

pub fn encode_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn parse_data(raw: &str) -> Result<Vec<u8>, RpcError> {
    hex::decode(strip_prefix(raw)?)
        .map_err(|err| RpcError::malformed(format!("invalid data '{raw}': {err}")))
}

fn strip_prefix(raw: &str) -> Result<&str, RpcError> {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| RpcError::malformed(format!("missing 0x prefix in '{raw}'")))
}
