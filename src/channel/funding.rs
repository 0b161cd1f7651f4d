//! Funding phase: who paid what, and the amounts required to open.

use alloc::{vec, vec::Vec};
use serde::Deserialize;

use crate::{abiencode::types::U256, quorum::WatchtowerIdx};

/// Amounts (in wei) required during funding.
///
/// The defaults are those of the evaluation setup: a fee of 20 split evenly
/// between Alice and Ingrid and a stake of 50 per watchtower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FundingConfig {
    /// Part of Alice's funding paid as fee, the rest is her collateral.
    pub alice_fee_share: u64,
    /// Part of Ingrid's funding paid as fee, the rest is her collateral.
    pub ingrid_fee_share: u64,
    /// Exact amount each watchtower has to lock.
    pub watchtower_stake: u64,
}

impl Default for FundingConfig {
    fn default() -> Self {
        FundingConfig {
            alice_fee_share: 10,
            ingrid_fee_share: 10,
            watchtower_stake: 50,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FundingError {
    /// Alice or Ingrid did not pay more than their fee share.
    BelowFeeShare { required: U256, value: U256 },
    /// A watchtower paid something else than the stake.
    WrongStake { required: U256, value: U256 },
    AlreadyFunded,
    /// Both collaterals together do not fit into a U256.
    ValueOverflow,
}

/// Collateral and funding flags collected before `open`.
#[derive(Debug, Clone)]
pub(crate) struct Funding {
    pub(crate) config: FundingConfig,
    pub(crate) alice_collateral: U256,
    pub(crate) ingrid_collateral: Option<U256>,
    pub(crate) watchtowers: Vec<bool>,
}

impl Funding {
    pub(crate) fn new(
        config: FundingConfig,
        committee_size: usize,
        alice_value: U256,
    ) -> Result<Self, FundingError> {
        let alice_collateral = collateral(alice_value, config.alice_fee_share)?;
        Ok(Funding {
            config,
            alice_collateral,
            ingrid_collateral: None,
            watchtowers: vec![false; committee_size],
        })
    }

    pub(crate) fn fund_ingrid(&mut self, value: U256) -> Result<(), FundingError> {
        if self.ingrid_collateral.is_some() {
            return Err(FundingError::AlreadyFunded);
        }
        let ingrid_collateral = collateral(value, self.config.ingrid_fee_share)?;
        if self.alice_collateral.checked_add(ingrid_collateral).is_none() {
            return Err(FundingError::ValueOverflow);
        }
        self.ingrid_collateral = Some(ingrid_collateral);
        Ok(())
    }

    /// Caller checks that `idx` is inside the committee.
    pub(crate) fn fund_watchtower(
        &mut self,
        idx: WatchtowerIdx,
        value: U256,
    ) -> Result<(), FundingError> {
        let required = U256::from(self.config.watchtower_stake);
        if value != required {
            return Err(FundingError::WrongStake { required, value });
        }
        if self.watchtowers[idx] {
            return Err(FundingError::AlreadyFunded);
        }
        self.watchtowers[idx] = true;
        Ok(())
    }

    pub(crate) fn missing_watchtowers(&self) -> usize {
        self.watchtowers.iter().filter(|funded| !**funded).count()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.ingrid_collateral.is_some() && self.missing_watchtowers() == 0
    }

    pub(crate) fn ingrid_collateral(&self) -> U256 {
        self.ingrid_collateral.unwrap_or_default()
    }

    /// Sum of both collaterals, i.e. the `channelValue` of every state.
    /// [Funding::fund_ingrid] makes sure the sum fits.
    pub(crate) fn channel_value(&self) -> U256 {
        self.alice_collateral + self.ingrid_collateral()
    }
}

fn collateral(value: U256, fee_share: u64) -> Result<U256, FundingError> {
    let required = U256::from(fee_share);
    if value <= required {
        return Err(FundingError::BelowFeeShare { required, value });
    }
    Ok(value - required)
}
