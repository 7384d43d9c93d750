use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Number of fractional digits between the chain's base unit and the display unit.
pub const DISPLAY_DECIMALS: usize = 18;
pub const BASE_UNITS_PER_DISPLAY: u128 = 1_000_000_000_000_000_000;

const ADDRESS_LEN: usize = 20;
const TX_HASH_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex characters, got {0}")]
    WrongLength(usize),
    #[error("address contains non-hex characters")]
    NotHex,
    #[error("address checksum mismatch")]
    BadChecksum,
}

/// A 20-byte account identity. Equality is over the raw bytes, so two spellings of the
/// same address that differ only in letter case compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Parses `0x` + 40 hex digits. All-lowercase and all-uppercase spellings are accepted
    /// as-is; mixed case must carry a valid EIP-55 checksum.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AddressError::Empty);
        }
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::WrongLength(digits.len()));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::NotHex)?;
        let address = Self(bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.checksum_digits() != digits {
            return Err(AddressError::BadChecksum);
        }
        Ok(address)
    }

    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    fn checksum_digits(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());
        lower
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
                if c.is_ascii_alphabetic() && nibble >= 8 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect()
    }

    pub fn to_checksum(&self) -> String {
        format!("0x{}", self.checksum_digits())
    }

    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Status-line rendering, e.g. `0x5aAeb6...Ef1BeAed`.
    pub fn short(&self) -> String {
        let full = self.to_checksum();
        format!("{}...{}", &full[..8], &full[full.len() - 8..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("'{0}' is not a plain decimal amount")]
    Malformed(String),
    #[error("amount has more than 18 decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

/// A monetary quantity held in the chain's smallest base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const ONE: Amount = Amount(BASE_UNITS_PER_DISPLAY);

    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    pub const fn base_units(&self) -> u128 {
        self.0
    }

    /// Parses a display-unit decimal such as `"1"`, `"0.5"` or `".25"` into base units.
    pub fn parse_display(input: &str) -> Result<Self, AmountError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, fraction) = match input.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (input, ""),
        };
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(AmountError::Malformed(input.to_string()));
        }
        if fraction.len() > DISPLAY_DECIMALS {
            return Err(AmountError::TooPrecise);
        }

        let whole_units = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| AmountError::Overflow)?
                .checked_mul(BASE_UNITS_PER_DISPLAY)
                .ok_or(AmountError::Overflow)?
        };
        let fraction_units = if fraction.is_empty() {
            0
        } else {
            format!("{fraction:0<width$}", width = DISPLAY_DECIMALS)
                .parse::<u128>()
                .map_err(|_| AmountError::Malformed(input.to_string()))?
        };

        whole_units
            .checked_add(fraction_units)
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    pub fn to_display(&self) -> String {
        let whole = self.0 / BASE_UNITS_PER_DISPLAY;
        let fraction = self.0 % BASE_UNITS_PER_DISPLAY;
        if fraction == 0 {
            return whole.to_string();
        }
        let fraction = format!("{fraction:0>width$}", width = DISPLAY_DECIMALS);
        format!("{whole}.{}", fraction.trim_end_matches('0'))
    }

    pub fn checked_mul(self, factor: u128) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    pub fn checked_add(self, other: Amount) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.to_display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; TX_HASH_LEN]);

impl TxHash {
    pub const fn from_bytes(bytes: [u8; TX_HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn parse(input: &str) -> Option<Self> {
        let digits = input.trim().strip_prefix("0x")?;
        let mut bytes = [0u8; TX_HASH_LEN];
        hex::decode_to_slice(digits, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub address: Address,
    pub staked_amount: Amount,
    pub efficiency_score: u64,
    pub credits_owned: u64,
    pub total_rewards_earned: Amount,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarbonOffsetInfo {
    pub price_per_credit: Amount,
    pub available_credits: u64,
    pub total_purchases: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub validator_count: u64,
    pub total_staked: Amount,
    pub reward_pool: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price_per_credit: Amount,
    pub available_credits: u64,
    pub total_purchases: u64,
    pub validator_count: u64,
    pub total_staked: Amount,
    pub reward_pool: Amount,
}

impl MarketSnapshot {
    pub fn from_parts(offset: CarbonOffsetInfo, stats: NetworkStats) -> Self {
        Self {
            price_per_credit: offset.price_per_credit,
            available_credits: offset.available_credits,
            total_purchases: offset.total_purchases,
            validator_count: stats.validator_count,
            total_staked: stats.total_staked,
            reward_pool: stats.reward_pool,
        }
    }

    pub fn offset_info(&self) -> CarbonOffsetInfo {
        CarbonOffsetInfo {
            price_per_credit: self.price_per_credit,
            available_credits: self.available_credits,
            total_purchases: self.total_purchases,
        }
    }

    pub fn quote(&self, credits: u64) -> Option<Amount> {
        self.price_per_credit.checked_mul(u128::from(credits))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    RegisterValidator,
    PurchaseOffset,
    DistributeRewards,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TransactionIntent {
    RegisterValidator { stake: Amount, score: u64 },
    PurchaseOffset { credits: u64 },
    DistributeRewards,
}

impl TransactionIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::RegisterValidator { .. } => IntentKind::RegisterValidator,
            Self::PurchaseOffset { .. } => IntentKind::PurchaseOffset,
            Self::DistributeRewards => IntentKind::DistributeRewards,
        }
    }
}

impl IntentKind {
    pub fn pending_message(&self) -> &'static str {
        match self {
            Self::RegisterValidator => "Registering validator...",
            Self::PurchaseOffset => "Purchasing carbon credits...",
            Self::DistributeRewards => "Distributing sustainability rewards...",
        }
    }

    pub fn confirmed_message(&self) -> &'static str {
        match self {
            Self::RegisterValidator => "Validator registered successfully!",
            Self::PurchaseOffset => "Carbon credits purchased successfully!",
            Self::DistributeRewards => "Rewards distributed successfully!",
        }
    }

    pub fn failure_prefix(&self) -> &'static str {
        match self {
            Self::RegisterValidator => "Failed to register validator",
            Self::PurchaseOffset => "Failed to purchase carbon credits",
            Self::DistributeRewards => "Failed to distribute rewards",
        }
    }
}
