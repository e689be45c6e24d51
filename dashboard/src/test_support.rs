//! In-memory wallet and protocol used by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use alloy::primitives::{address, Address, TxHash, U256};
use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    protocol::{AccountLiquidity, Asset, LendingProtocol},
    wallet::{TxReceipt, WalletProvider},
};

pub fn test_account() -> Address {
    address!("8ba1f109551bd432803012645ac136ddd64dba72")
}

pub fn test_assets() -> Vec<Asset> {
    vec![
        Asset::new("ETH", 18, address!("4ddc2d193948926d02f9b1fe9e1daa0718270ed5")),
        Asset::new("USDC", 6, address!("39aa39c021dfbae8fac545936693ac917d5e7563")),
        Asset::new("UNI", 18, address!("35a18000230da775cac24873d00ff85bccded550")),
    ]
}

pub fn test_symbols() -> Vec<String> {
    test_assets()
        .into_iter()
        .map(|asset| asset.symbol)
        .collect()
}

/// `n * 10^decimals`
pub fn units(n: u64, decimals: u8) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(decimals))
}

pub struct FakeWallet {
    /// Number of empty `accounts` answers before the account shows up
    connect_after: Option<usize>,
    /// Set by `connect`, wins over `connect_after`
    connected: AtomicBool,
    accounts_calls: AtomicUsize,
    request_calls: AtomicUsize,
    reject_requests: AtomicBool,
    fail_chain_id: AtomicBool,
    confirm_all: AtomicBool,
    receipts: Mutex<HashMap<TxHash, TxReceipt>>,
}

impl FakeWallet {
    fn with_connect_after(connect_after: Option<usize>) -> Self {
        Self {
            connect_after,
            connected: AtomicBool::new(false),
            accounts_calls: AtomicUsize::new(0),
            request_calls: AtomicUsize::new(0),
            reject_requests: AtomicBool::new(false),
            fail_chain_id: AtomicBool::new(false),
            confirm_all: AtomicBool::new(false),
            receipts: Mutex::new(HashMap::new()),
        }
    }

    pub fn connected_after(empty_answers: usize) -> Self {
        Self::with_connect_after(Some(empty_answers))
    }

    pub fn never_connected() -> Self {
        Self::with_connect_after(None)
    }

    /// The account shows up from the next `accounts` call on
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn accounts_calls(&self) -> usize {
        self.accounts_calls.load(Ordering::SeqCst)
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn reject_requests(&self) {
        self.reject_requests.store(true, Ordering::SeqCst);
    }

    pub fn fail_chain_id(&self) {
        self.fail_chain_id.store(true, Ordering::SeqCst);
    }

    /// Every transaction gets a successful receipt
    pub fn confirm_all(&self) {
        self.confirm_all.store(true, Ordering::SeqCst);
    }

    pub fn set_receipt(&self, hash: TxHash, receipt: TxReceipt) {
        self.receipts.lock().insert(hash, receipt);
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn accounts(&self) -> Result<Vec<Address>> {
        let call = self.accounts_calls.fetch_add(1, Ordering::SeqCst);
        if self.connected.load(Ordering::SeqCst) {
            return Ok(vec![test_account()]);
        }
        match self.connect_after {
            Some(empty_answers) if call >= empty_answers => Ok(vec![test_account()]),
            _ => Ok(vec![]),
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_requests.load(Ordering::SeqCst) {
            bail!("User rejected the request");
        }
        Ok(vec![test_account()])
    }

    async fn chain_id(&self) -> Result<u64> {
        if self.fail_chain_id.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(1)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>> {
        if self.confirm_all.load(Ordering::SeqCst) {
            return Ok(Some(TxReceipt {
                success: true,
                block_number: Some(1),
            }));
        }
        Ok(self.receipts.lock().get(&hash).copied())
    }
}

#[derive(Default)]
struct ProtocolState {
    prices: HashMap<String, f64>,
    price_delays: HashMap<String, Duration>,
    supplied: HashMap<String, U256>,
    failing_supplied: HashSet<String>,
    borrowed: HashMap<String, U256>,
    liquidity: Option<AccountLiquidity>,
    fail_liquidity: bool,
    liquidity_calls: usize,
    assets_in: Vec<Address>,
    write_error: Option<String>,
    hang_writes: bool,
    writes: Vec<(String, String, Option<U256>)>,
    sent: u8,
}

/// Balances default to zero; a price that was never set fails to read
pub struct FakeProtocol {
    assets: Vec<Asset>,
    state: Mutex<ProtocolState>,
}

impl FakeProtocol {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self {
            assets,
            state: Mutex::new(ProtocolState::default()),
        }
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.state.lock().prices.insert(symbol.to_string(), price);
    }

    pub fn set_price_delay(&self, symbol: &str, delay: Duration) {
        self.state
            .lock()
            .price_delays
            .insert(symbol.to_string(), delay);
    }

    pub fn set_supplied(&self, symbol: &str, amount: U256) {
        self.state.lock().supplied.insert(symbol.to_string(), amount);
    }

    pub fn fail_supplied(&self, symbol: &str) {
        self.state
            .lock()
            .failing_supplied
            .insert(symbol.to_string());
    }

    pub fn set_borrowed(&self, symbol: &str, amount: U256) {
        self.state.lock().borrowed.insert(symbol.to_string(), amount);
    }

    pub fn set_liquidity(&self, liquidity: U256, shortfall: U256) {
        self.state.lock().liquidity = Some(AccountLiquidity {
            liquidity,
            shortfall,
        });
    }

    pub fn fail_liquidity(&self) {
        self.state.lock().fail_liquidity = true;
    }

    pub fn liquidity_calls(&self) -> usize {
        self.state.lock().liquidity_calls
    }

    pub fn set_assets_in(&self, markets: Vec<Address>) {
        self.state.lock().assets_in = markets;
    }

    /// Every write fails with `message` from now on
    pub fn fail_writes(&self, message: &str) {
        self.state.lock().write_error = Some(message.to_string());
    }

    /// Writes never resolve from now on, like an unanswered wallet prompt
    pub fn hang_writes(&self) {
        self.state.lock().hang_writes = true;
    }

    /// Accepted writes as `(method, symbol, amount)`
    pub fn writes(&self) -> Vec<(String, String, Option<U256>)> {
        self.state.lock().writes.clone()
    }

    async fn write(&self, method: &str, asset: &Asset, amount: Option<U256>) -> Result<TxHash> {
        let hang = self.state.lock().hang_writes;
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock();
        if let Some(message) = &state.write_error {
            bail!("{}", message);
        }

        state
            .writes
            .push((method.to_string(), asset.symbol.clone(), amount));
        state.sent += 1;
        Ok(TxHash::with_last_byte(state.sent))
    }
}

#[async_trait]
impl LendingProtocol for FakeProtocol {
    fn assets(&self) -> &[Asset] {
        &self.assets
    }

    async fn account_liquidity(&self, _account: Address) -> Result<AccountLiquidity> {
        let mut state = self.state.lock();
        state.liquidity_calls += 1;
        if state.fail_liquidity {
            bail!("comptroller unavailable");
        }
        Ok(state.liquidity.unwrap_or(AccountLiquidity {
            liquidity: U256::ZERO,
            shortfall: U256::ZERO,
        }))
    }

    async fn underlying_balance(&self, _account: Address, asset: &Asset) -> Result<U256> {
        let state = self.state.lock();
        if state.failing_supplied.contains(&asset.symbol) {
            bail!("balanceOfUnderlying reverted for {}", asset.symbol);
        }
        Ok(state
            .supplied
            .get(&asset.symbol)
            .copied()
            .unwrap_or_default())
    }

    async fn borrow_balance(&self, _account: Address, asset: &Asset) -> Result<U256> {
        Ok(self
            .state
            .lock()
            .borrowed
            .get(&asset.symbol)
            .copied()
            .unwrap_or_default())
    }

    async fn assets_in(&self, _account: Address) -> Result<Vec<Address>> {
        Ok(self.state.lock().assets_in.clone())
    }

    async fn price(&self, asset: &Asset) -> Result<f64> {
        let delay = self.state.lock().price_delays.get(&asset.symbol).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.state.lock().prices.get(&asset.symbol) {
            Some(price) => Ok(*price),
            None => bail!("no price for {}", asset.symbol),
        }
    }

    async fn supply(&self, _account: Address, asset: &Asset, amount: U256) -> Result<TxHash> {
        self.write("supply", asset, Some(amount)).await
    }

    async fn borrow(&self, _account: Address, asset: &Asset, amount: U256) -> Result<TxHash> {
        self.write("borrow", asset, Some(amount)).await
    }

    async fn enter_market(&self, _account: Address, asset: &Asset) -> Result<TxHash> {
        self.write("enter_market", asset, None).await
    }

    async fn exit_market(&self, _account: Address, asset: &Asset) -> Result<TxHash> {
        self.write("exit_market", asset, None).await
    }
}
