// In crates/core-types/src/types.rs

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Quote assets recognised when splitting a pair such as `BTCUSDT`.
const KNOWN_QUOTE_ASSETS: &[&str] = &[
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", "BTC", "ETH", "BNB", "EUR", "TRY",
];

// --- Market Data ---

/// A single closing-price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// The open time of the candle this close belongs to.
    pub timestamp: DateTime<Utc>,
    pub close: Decimal,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: Decimal) -> Self {
        Self { timestamp, close }
    }
}

/// A trading pair, e.g. `BTCUSDT`, with its base and quote assets resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    name: String,
    split_at: usize,
}

impl Symbol {
    /// Parses a pair name. The quote asset is the longest known suffix.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().trim().to_uppercase();
        let quote = KNOWN_QUOTE_ASSETS
            .iter()
            .filter(|quote| name.len() > quote.len() && name.ends_with(*quote))
            .max_by_key(|quote| quote.len())
            .ok_or_else(|| Error::InvalidSymbol(name.clone()))?;

        let split_at = name.len() - quote.len();
        Ok(Self { name, split_at })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The asset being bought or sold (e.g. `BTC`).
    pub fn base_asset(&self) -> &str {
        &self.name[..self.split_at]
    }

    /// The asset prices are quoted in (e.g. `USDT`).
    pub fn quote_asset(&self) -> &str {
        &self.name[self.split_at..]
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<String> for Symbol {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Symbol::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.name
    }
}

// --- Signals ---

/// The direction implied by the relation of the short and long averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Up,
    Down,
    #[default]
    Flat,
}

impl Signal {
    /// The numeric form used by the classic crossover formulation: +1 / -1 / 0.
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Up => 1,
            Signal::Down => -1,
            Signal::Flat => 0,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Signal::Up => "UP",
            Signal::Down => "DOWN",
            Signal::Flat => "FLAT",
        };
        f.write_str(label)
    }
}

/// A signal together with the cycle time it was derived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSample {
    pub signal: Signal,
    pub at: DateTime<Utc>,
}

impl SignalSample {
    pub fn new(signal: Signal, at: DateTime<Utc>) -> Self {
        Self { signal, at }
    }

    pub fn flat(at: DateTime<Utc>) -> Self {
        Self::new(Signal::Flat, at)
    }
}

/// What the engine should do after comparing two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[default]
    None,
    EnterLong,
    ExitLong,
}

impl Action {
    /// The order side this action trades on, if it trades at all.
    pub fn side(self) -> Option<Side> {
        match self {
            Action::None => None,
            Action::EnterLong => Some(Side::Buy),
            Action::ExitLong => Some(Side::Sell),
        }
    }

    pub fn is_trade(self) -> bool {
        self.side().is_some()
    }
}

// --- Orders ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The wire representation used by the exchange.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Rejected,
    Expired,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the exchange took the order (as opposed to refusing it outright).
    pub fn is_accepted(self) -> bool {
        !matches!(self, OrderStatus::Rejected | OrderStatus::Expired)
    }
}

/// The exchange's acknowledgement of a submitted market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub status: OrderStatus,
    pub executed_quantity: Option<Decimal>,
    pub average_price: Option<Decimal>,
}

/// Local copy of an exchange order, as last seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub exchange_order_id: String,
    pub status: OrderStatus,
}

// --- Balances ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetBalance {
    pub free: Decimal,
    pub locked: Decimal,
}

impl AssetBalance {
    pub fn new(free: Decimal, locked: Decimal) -> Self {
        Self { free, locked }
    }

    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }

    pub fn is_zero(&self) -> bool {
        self.free.is_zero() && self.locked.is_zero()
    }
}

/// Asset symbol to balance. Ordered so snapshots serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<String, AssetBalance>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a book where every listed asset is entirely free.
    pub fn from_free<I, S>(assets: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        Self(
            assets
                .into_iter()
                .map(|(asset, free)| (asset.into(), AssetBalance::new(free, Decimal::ZERO)))
                .collect(),
        )
    }

    /// Balance for an asset; unknown assets read as zero.
    pub fn get(&self, asset: &str) -> AssetBalance {
        self.0.get(asset).copied().unwrap_or_default()
    }

    pub fn free(&self, asset: &str) -> Decimal {
        self.get(asset).free
    }

    pub fn insert(&mut self, asset: impl Into<String>, balance: AssetBalance) {
        self.0.insert(asset.into(), balance);
    }

    pub fn credit_free(&mut self, asset: &str, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::NonPositiveAmount(amount));
        }
        let free = self
            .free(asset)
            .checked_add(amount)
            .ok_or_else(|| Error::Overflow(asset.to_string()))?;
        self.0.entry(asset.to_string()).or_default().free = free;
        Ok(())
    }

    /// Removes `amount` from the free balance, refusing to go below zero.
    pub fn debit_free(&mut self, asset: &str, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::NonPositiveAmount(amount));
        }
        let available = self.free(asset);
        if available < amount {
            return Err(Error::InsufficientBalance {
                asset: asset.to_string(),
                required: amount,
                available,
            });
        }
        self.0.entry(asset.to_string()).or_default().free = available - amount;
        Ok(())
    }

    /// The first asset holding a negative free or locked amount, if any.
    pub fn first_negative(&self) -> Option<(&str, AssetBalance)> {
        self.0
            .iter()
            .find(|(_, b)| b.free.is_sign_negative() || b.locked.is_sign_negative())
            .map(|(asset, b)| (asset.as_str(), *b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetBalance)> {
        self.0.iter().map(|(asset, b)| (asset.as_str(), b))
    }

    /// Drops assets with nothing free or locked.
    pub fn non_zero(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, b)| !b.is_zero())
                .map(|(asset, b)| (asset.clone(), *b))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// --- Trade Log ---

/// One executed trade. Written once by the ledger and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub side: Side,
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Balances right after the trade.
    pub balances: Balances,
    /// Present for trades placed on a live exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    pub at: DateTime<Utc>,
}

impl TradeLogEntry {
    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_symbol_splits_on_longest_quote_suffix() {
        let btc = Symbol::new("btcusdt").unwrap();
        assert_eq!(btc.as_str(), "BTCUSDT");
        assert_eq!(btc.base_asset(), "BTC");
        assert_eq!(btc.quote_asset(), "USDT");

        let fd = Symbol::new("BTCFDUSD").unwrap();
        assert_eq!(fd.base_asset(), "BTC");
        assert_eq!(fd.quote_asset(), "FDUSD");

        let cross = Symbol::new("ETHBTC").unwrap();
        assert_eq!(cross.base_asset(), "ETH");
        assert_eq!(cross.quote_asset(), "BTC");
    }

    #[test]
    fn test_symbol_rejects_unknown_or_bare_quote() {
        assert!(matches!(Symbol::new("FOOBAR"), Err(Error::InvalidSymbol(_))));
        assert!(Symbol::new("USDT").is_err());
    }

    #[test]
    fn test_symbol_serializes_as_plain_string() {
        let symbol = Symbol::new("SOLUSDT").unwrap();
        let json = serde_json::to_string(&symbol).unwrap();
        assert_eq!(json, "\"SOLUSDT\"");
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(back.quote_asset(), "USDT");
    }

    #[test]
    fn test_signal_numeric_form() {
        assert_eq!(Signal::Up.as_i8(), 1);
        assert_eq!(Signal::Down.as_i8(), -1);
        assert_eq!(Signal::Flat.as_i8(), 0);
    }

    #[test]
    fn test_action_sides() {
        assert_eq!(Action::EnterLong.side(), Some(Side::Buy));
        assert_eq!(Action::ExitLong.side(), Some(Side::Sell));
        assert!(!Action::None.is_trade());
    }

    #[test]
    fn test_debit_refuses_overdraft_and_leaves_book_alone() {
        let mut book = Balances::from_free([("USDT", dec!(100))]);
        let before = book.clone();

        let err = book.debit_free("USDT", dec!(100.01)).unwrap_err();
        assert_eq!(
            err,
            Error::InsufficientBalance {
                asset: "USDT".to_string(),
                required: dec!(100.01),
                available: dec!(100),
            }
        );
        assert_eq!(book, before);

        book.debit_free("USDT", dec!(100)).unwrap();
        assert_eq!(book.free("USDT"), Decimal::ZERO);
        assert!(book.first_negative().is_none());
    }

    #[test]
    fn test_credit_creates_missing_asset() {
        let mut book = Balances::new();
        book.credit_free("BTC", dec!(0.001)).unwrap();
        assert_eq!(book.get("BTC"), AssetBalance::new(dec!(0.001), Decimal::ZERO));
        assert!(book.credit_free("BTC", dec!(0)).is_err());
    }

    #[test]
    fn test_non_zero_filters_empty_assets() {
        let mut book = Balances::from_free([("USDT", dec!(5)), ("BTC", dec!(0))]);
        book.insert("ETH", AssetBalance::new(dec!(0), dec!(1)));
        let shown = book.non_zero();
        assert_eq!(shown.len(), 2);
        assert!(shown.iter().all(|(asset, _)| asset != "BTC"));
    }

    #[test]
    fn test_order_status_unknown_variant() {
        let status: OrderStatus = serde_json::from_str("\"EXPIRED_IN_MATCH\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
        assert!(!OrderStatus::Rejected.is_accepted());
        assert!(OrderStatus::Filled.is_accepted());
    }
}
