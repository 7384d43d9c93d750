use std::sync::Arc;

use shared::{
    domain::{Address, Amount, CarbonOffsetInfo, NetworkStats, TxHash, ValidatorRecord},
    error::ClientError,
};
use tracing::{debug, info, warn};

use crate::{
    abi::{self, AbiError, Decoder, Token},
    wallet::{CallRequest, TransactionRequest, TxReceipt, WalletProvider},
};

pub const REGISTER_VALIDATOR_GAS: u64 = 300_000;
pub const PURCHASE_CARBON_OFFSET_GAS: u64 = 200_000;
pub const DISTRIBUTE_REWARDS_GAS: u64 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHandle {
    pub tx_hash: TxHash,
    pub gas_limit: u64,
}

fn malformed(err: AbiError) -> ClientError {
    ClientError::Unknown(format!("malformed contract response: {err}"))
}

/// Validates operator input before anything is sent to the remote service.
pub fn parse_address(raw: &str) -> Result<Address, ClientError> {
    Address::parse(raw)
        .map_err(|err| ClientError::InvalidAddress(format!("'{}': {err}", raw.trim())))
}

pub struct ContractGateway {
    wallet: Arc<dyn WalletProvider>,
    contract: Address,
}

impl ContractGateway {
    pub fn new(wallet: Arc<dyn WalletProvider>, contract: Address) -> Self {
        Self { wallet, contract }
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    async fn read(&self, signature: &str, args: &[Token]) -> Result<Vec<u8>, ClientError> {
        let data = abi::encode_call(signature, args);
        debug!(call = signature, "contract read");
        self.wallet
            .call(CallRequest {
                to: self.contract,
                data,
            })
            .await
            .map_err(|err| {
                warn!(call = signature, "contract read failed: {err}");
                err.into_read_error()
            })
    }

    pub async fn get_validator_info(
        &self,
        validator: Address,
    ) -> Result<ValidatorRecord, ClientError> {
        let data = self
            .read(abi::GET_VALIDATOR_INFO, &[Token::Address(validator)])
            .await?;
        let mut decoder = Decoder::new(&data);
        Ok(ValidatorRecord {
            address: validator,
            staked_amount: decoder.amount().map_err(malformed)?,
            efficiency_score: decoder.u64().map_err(malformed)?,
            credits_owned: decoder.u64().map_err(malformed)?,
            total_rewards_earned: decoder.amount().map_err(malformed)?,
            is_active: decoder.boolean().map_err(malformed)?,
        })
    }

    pub async fn get_carbon_offset_info(&self) -> Result<CarbonOffsetInfo, ClientError> {
        let data = self.read(abi::GET_CARBON_OFFSET_INFO, &[]).await?;
        let mut decoder = Decoder::new(&data);
        Ok(CarbonOffsetInfo {
            price_per_credit: decoder.amount().map_err(malformed)?,
            available_credits: decoder.u64().map_err(malformed)?,
            total_purchases: decoder.u64().map_err(malformed)?,
        })
    }

    pub async fn get_validator_count(&self) -> Result<u64, ClientError> {
        let data = self.read(abi::GET_VALIDATOR_COUNT, &[]).await?;
        Decoder::new(&data).u64().map_err(malformed)
    }

    pub async fn total_staked(&self) -> Result<Amount, ClientError> {
        let data = self.read(abi::TOTAL_STAKED, &[]).await?;
        Decoder::new(&data).amount().map_err(malformed)
    }

    pub async fn reward_pool(&self) -> Result<Amount, ClientError> {
        let data = self.read(abi::REWARD_POOL, &[]).await?;
        Decoder::new(&data).amount().map_err(malformed)
    }

    pub async fn owner(&self) -> Result<Address, ClientError> {
        let data = self.read(abi::OWNER, &[]).await?;
        Decoder::new(&data).address().map_err(malformed)
    }

    pub async fn network_stats(&self) -> Result<NetworkStats, ClientError> {
        let (validator_count, total_staked, reward_pool) = futures::try_join!(
            self.get_validator_count(),
            self.total_staked(),
            self.reward_pool()
        )?;
        Ok(NetworkStats {
            validator_count,
            total_staked,
            reward_pool,
        })
    }

    async fn submit(
        &self,
        from: Address,
        signature: &str,
        args: &[Token],
        value: Amount,
        gas_limit: u64,
    ) -> Result<TransactionHandle, ClientError> {
        let request = TransactionRequest {
            from,
            to: self.contract,
            data: abi::encode_call(signature, args),
            value,
            gas_limit,
        };
        debug!(
            call = signature,
            data = %hex::encode(&request.data),
            value = %value,
            gas_limit,
            "submitting contract write"
        );
        let tx_hash = self
            .wallet
            .send_transaction(request)
            .await
            .map_err(|err| err.into_write_error())?;
        info!(call = signature, %tx_hash, "contract write accepted");
        Ok(TransactionHandle { tx_hash, gas_limit })
    }

    pub async fn register_validator(
        &self,
        from: Address,
        score: u64,
        stake: Amount,
    ) -> Result<TransactionHandle, ClientError> {
        self.submit(
            from,
            abi::REGISTER_VALIDATOR,
            &[Token::Uint(u128::from(score))],
            stake,
            REGISTER_VALIDATOR_GAS,
        )
        .await
    }

    pub async fn purchase_carbon_offset(
        &self,
        from: Address,
        credits: u64,
        value: Amount,
    ) -> Result<TransactionHandle, ClientError> {
        self.submit(
            from,
            abi::PURCHASE_CARBON_OFFSET,
            &[Token::Uint(u128::from(credits))],
            value,
            PURCHASE_CARBON_OFFSET_GAS,
        )
        .await
    }

    pub async fn distribute_sustainability_rewards(
        &self,
        from: Address,
    ) -> Result<TransactionHandle, ClientError> {
        self.submit(
            from,
            abi::DISTRIBUTE_SUSTAINABILITY_REWARDS,
            &[],
            Amount::ZERO,
            DISTRIBUTE_REWARDS_GAS,
        )
        .await
    }

    /// Waits for finality. A reverted receipt is a `RemoteRejected` failure; a revert that
    /// burned the whole gas budget is reported as budget exhaustion.
    pub async fn await_finality(
        &self,
        handle: TransactionHandle,
    ) -> Result<TxReceipt, ClientError> {
        let receipt = self
            .wallet
            .wait_for_receipt(handle.tx_hash)
            .await
            .map_err(|err| err.into_write_error())?;
        if receipt.success {
            return Ok(receipt);
        }
        let reason = if receipt.gas_used >= handle.gas_limit {
            "resource budget exceeded"
        } else {
            "transaction reverted"
        };
        warn!(tx_hash = %handle.tx_hash, gas_used = receipt.gas_used, "{reason}");
        Err(ClientError::RemoteRejected(reason.to_string()))
    }
}
