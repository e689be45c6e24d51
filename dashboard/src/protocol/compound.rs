use std::time::Duration;

use alloy::{
    network::{Ethereum, ReceiptResponse},
    primitives::{Address, TxHash, U256},
    providers::Provider,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use super::{
    address_book::COMPTROLLER, AccountLiquidity, AddressBook, Asset, LendingProtocol,
    ProtocolError,
};
use crate::utils::{
    constants::{DEFAULT_RECEIPT_TIMEOUT_SECS, PRICE_MANTISSA_DECIMALS},
    contracts::{
        CErc20Contract, CEtherContract, CTokenContract, ComptrollerContract, Erc20Contract,
        PriceOracleContract,
    },
    math_helper,
};

/// Compound v2 markets reached through a wallet-backed provider.
///
/// Writes are simulated with `eth_call` first: Compound reports most failures as
/// a non-zero return code instead of reverting, so a mined transaction alone
/// says nothing about success.
pub struct CompoundProtocol<P: Provider<Ethereum>> {
    provider: P,
    comptroller: Address,
    assets: Vec<Asset>,
    oracle: OnceCell<Address>,
    /// Bound on waiting for an ERC-20 approval to be mined before `mint`
    approval_timeout: Duration,
}

impl<P: Provider<Ethereum>> CompoundProtocol<P> {
    pub fn new(provider: P, comptroller: Address, assets: Vec<Asset>) -> Self {
        Self {
            provider,
            comptroller,
            assets,
            oracle: OnceCell::new(),
            approval_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
        }
    }

    pub fn with_approval_timeout(mut self, approval_timeout: Duration) -> Self {
        self.approval_timeout = approval_timeout;
        self
    }

    /// Resolves the comptroller and the configured markets for `network`
    pub fn from_address_book(
        provider: P,
        address_book: &AddressBook,
        network: &str,
        symbols: &[String],
    ) -> Result<Self> {
        let comptroller = address_book.address(COMPTROLLER, network)?;
        let assets = address_book.resolve_assets(symbols, network)?;
        Ok(Self::new(provider, comptroller, assets))
    }

    async fn oracle(&self) -> Result<Address> {
        self.oracle
            .get_or_try_init(|| async {
                let oracle = ComptrollerContract::new(self.comptroller, &self.provider)
                    .oracle()
                    .call()
                    .await
                    .context("Failed to read the price oracle address")?
                    ._0;
                debug!("Using price oracle {}", oracle);
                Ok::<_, anyhow::Error>(oracle)
            })
            .await
            .copied()
    }

    fn ensure_success(action: &'static str, code: U256) -> Result<()> {
        if code.is_zero() {
            Ok(())
        } else {
            Err(ProtocolError::ProtocolCode { action, code }.into())
        }
    }

    /// Approves `market` to pull `amount` of the underlying when the current allowance is short
    async fn ensure_allowance(&self, account: Address, asset: &Asset, amount: U256) -> Result<()> {
        let underlying = CTokenContract::new(asset.market, &self.provider)
            .underlying()
            .call()
            .await
            .with_context(|| format!("Failed to read the underlying of {}", asset.symbol))?
            ._0;

        let token = Erc20Contract::new(underlying, &self.provider);
        let allowance = token
            .allowance(account, asset.market)
            .call()
            .await
            .with_context(|| format!("Failed to read the {} allowance", asset.symbol))?
            ._0;

        if allowance >= amount {
            return Ok(());
        }

        info!("Approving {} {} for {}", amount, asset.symbol, asset.market);
        let pending = token
            .approve(asset.market, amount)
            .from(account)
            .send()
            .await
            .with_context(|| format!("Failed to send the {} approval", asset.symbol))?;

        let receipt = tokio::time::timeout(self.approval_timeout, pending.get_receipt())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "{} approval not mined after {}s",
                    asset.symbol,
                    self.approval_timeout.as_secs()
                )
            })?
            .with_context(|| format!("Failed to confirm the {} approval", asset.symbol))?;

        if !receipt.status() {
            anyhow::bail!(
                "{} approval {} reverted",
                asset.symbol,
                receipt.transaction_hash
            );
        }
        Ok(())
    }
}

#[async_trait]
impl<P> LendingProtocol for CompoundProtocol<P>
where
    P: Provider<Ethereum> + Send + Sync + 'static,
{
    fn assets(&self) -> &[Asset] {
        &self.assets
    }

    async fn account_liquidity(&self, account: Address) -> Result<AccountLiquidity> {
        let result = ComptrollerContract::new(self.comptroller, &self.provider)
            .getAccountLiquidity(account)
            .call()
            .await
            .context("Failed to read account liquidity")?;

        Self::ensure_success("getAccountLiquidity", result.err)?;

        Ok(AccountLiquidity {
            liquidity: result.liquidity,
            shortfall: result.shortfall,
        })
    }

    async fn underlying_balance(&self, account: Address, asset: &Asset) -> Result<U256> {
        Ok(CTokenContract::new(asset.market, &self.provider)
            .balanceOfUnderlying(account)
            .call()
            .await
            .with_context(|| format!("Failed to read the supplied {}", asset.symbol))?
            ._0)
    }

    async fn borrow_balance(&self, account: Address, asset: &Asset) -> Result<U256> {
        Ok(CTokenContract::new(asset.market, &self.provider)
            .borrowBalanceCurrent(account)
            .call()
            .await
            .with_context(|| format!("Failed to read the borrowed {}", asset.symbol))?
            ._0)
    }

    async fn assets_in(&self, account: Address) -> Result<Vec<Address>> {
        Ok(ComptrollerContract::new(self.comptroller, &self.provider)
            .getAssetsIn(account)
            .call()
            .await
            .context("Failed to read entered markets")?
            ._0)
    }

    async fn price(&self, asset: &Asset) -> Result<f64> {
        let oracle = self.oracle().await?;
        let mantissa = PriceOracleContract::new(oracle, &self.provider)
            .getUnderlyingPrice(asset.market)
            .call()
            .await
            .with_context(|| format!("Failed to read the {} price", asset.symbol))?
            ._0;

        let precision = PRICE_MANTISSA_DECIMALS
            .checked_sub(asset.decimals)
            .with_context(|| format!("{} has too many decimals", asset.symbol))?;

        Ok(math_helper::divide_by_precision_f64(mantissa, precision))
    }

    #[instrument("SUPPLY", skip(self, asset), fields(asset = %asset.symbol))]
    async fn supply(&self, account: Address, asset: &Asset, amount: U256) -> Result<TxHash> {
        if asset.is_native() {
            let pending = CEtherContract::new(asset.market, &self.provider)
                .mint()
                .value(amount)
                .from(account)
                .send()
                .await
                .context("Failed to send mint")?;
            return Ok(*pending.tx_hash());
        }

        self.ensure_allowance(account, asset, amount).await?;

        let market = CErc20Contract::new(asset.market, &self.provider);
        let code = market
            .mint(amount)
            .from(account)
            .call()
            .await
            .context("Failed to simulate mint")?
            ._0;
        Self::ensure_success("mint", code)?;

        let pending = market
            .mint(amount)
            .from(account)
            .send()
            .await
            .context("Failed to send mint")?;
        Ok(*pending.tx_hash())
    }

    #[instrument("BORROW", skip(self, asset), fields(asset = %asset.symbol))]
    async fn borrow(&self, account: Address, asset: &Asset, amount: U256) -> Result<TxHash> {
        let market = CTokenContract::new(asset.market, &self.provider);
        let code = market
            .borrow(amount)
            .from(account)
            .call()
            .await
            .context("Failed to simulate borrow")?
            ._0;
        Self::ensure_success("borrow", code)?;

        let pending = market
            .borrow(amount)
            .from(account)
            .send()
            .await
            .context("Failed to send borrow")?;
        Ok(*pending.tx_hash())
    }

    #[instrument("ENTER_MARKET", skip(self, asset), fields(asset = %asset.symbol))]
    async fn enter_market(&self, account: Address, asset: &Asset) -> Result<TxHash> {
        let comptroller = ComptrollerContract::new(self.comptroller, &self.provider);
        let codes = comptroller
            .enterMarkets(vec![asset.market])
            .from(account)
            .call()
            .await
            .context("Failed to simulate enterMarkets")?
            ._0;
        for code in codes {
            Self::ensure_success("enterMarkets", code)?;
        }

        let pending = comptroller
            .enterMarkets(vec![asset.market])
            .from(account)
            .send()
            .await
            .context("Failed to send enterMarkets")?;
        Ok(*pending.tx_hash())
    }

    #[instrument("EXIT_MARKET", skip(self, asset), fields(asset = %asset.symbol))]
    async fn exit_market(&self, account: Address, asset: &Asset) -> Result<TxHash> {
        let comptroller = ComptrollerContract::new(self.comptroller, &self.provider);
        let code = comptroller
            .exitMarket(asset.market)
            .from(account)
            .call()
            .await
            .context("Failed to simulate exitMarket")?
            ._0;
        Self::ensure_success("exitMarket", code)?;

        let pending = comptroller
            .exitMarket(asset.market)
            .from(account)
            .send()
            .await
            .context("Failed to send exitMarket")?;
        Ok(*pending.tx_hash())
    }
}
