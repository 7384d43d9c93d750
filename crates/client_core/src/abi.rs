use sha3::{Digest, Keccak256};
use shared::domain::{Address, Amount};
use thiserror::Error;

pub const WORD_LEN: usize = 32;

pub const REGISTER_VALIDATOR: &str = "registerValidator(uint256)";
pub const PURCHASE_CARBON_OFFSET: &str = "purchaseCarbonOffset(uint256)";
pub const DISTRIBUTE_SUSTAINABILITY_REWARDS: &str = "distributeSustainabilityRewards()";
pub const GET_VALIDATOR_INFO: &str = "getValidatorInfo(address)";
pub const GET_CARBON_OFFSET_INFO: &str = "getCarbonOffsetInfo()";
pub const GET_VALIDATOR_COUNT: &str = "getValidatorCount()";
pub const TOTAL_STAKED: &str = "totalStaked()";
pub const REWARD_POOL: &str = "rewardPool()";
pub const OWNER: &str = "owner()";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("return data too short: needed {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("integer does not fit in 128 bits")]
    Overflow,
    #[error("integer {0} is out of range for the target field")]
    OutOfRange(u128),
    #[error("word is not a valid boolean")]
    InvalidBool,
    #[error("word is not a valid address")]
    InvalidAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn encode_word(token: Token) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    match token {
        Token::Uint(value) => word[16..].copy_from_slice(&value.to_be_bytes()),
        Token::Address(address) => word[12..].copy_from_slice(address.as_bytes()),
    }
    word
}

pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD_LEN);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(&encode_word(*arg));
    }
    data
}

/// Sequential reader over a flat tuple of static words.
pub struct Decoder<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn next_word(&mut self) -> Result<&'a [u8], AbiError> {
        let end = self.offset + WORD_LEN;
        if self.data.len() < end {
            return Err(AbiError::Truncated {
                needed: end,
                actual: self.data.len(),
            });
        }
        let word = &self.data[self.offset..end];
        self.offset = end;
        Ok(word)
    }

    pub fn uint(&mut self) -> Result<u128, AbiError> {
        let word = self.next_word()?;
        if word[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow);
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(low))
    }

    pub fn u64(&mut self) -> Result<u64, AbiError> {
        let value = self.uint()?;
        u64::try_from(value).map_err(|_| AbiError::OutOfRange(value))
    }

    pub fn amount(&mut self) -> Result<Amount, AbiError> {
        self.uint().map(Amount::from_base_units)
    }

    pub fn boolean(&mut self) -> Result<bool, AbiError> {
        match self.uint() {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            _ => Err(AbiError::InvalidBool),
        }
    }

    pub fn address(&mut self) -> Result<Address, AbiError> {
        let word = self.next_word()?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::InvalidAddress);
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Ok(Address::from_bytes(bytes))
    }
}
