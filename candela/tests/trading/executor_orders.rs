use std::sync::Arc;

use candela::trading::{Decision, OrderExecutor};
use candela_core::connector::{OrderProvider, PageDirection};
use candela_core::{CandelaError, OrderRequest, OrderSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::helpers::{TICKER, paged};

async fn account(krw: Decimal, btc: Decimal) -> (OrderExecutor, candela_mock::DynamicMockController) {
    let (conn, ctl) = paged(PageDirection::Backward, Some(10));
    ctl.set_balance("KRW", krw).await;
    ctl.set_balance("BTC", btc).await;
    let orders: Arc<dyn OrderProvider> = conn;
    (OrderExecutor::new(orders), ctl)
}

#[tokio::test]
async fn market_buy_spends_the_fraction_after_fees() {
    let (exec, ctl) = account(dec!(1_000_000), dec!(0)).await;

    let ack = exec
        .execute(&Decision::buy(TICKER, dec!(0.5)), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(ack.side, OrderSide::Buy);
    assert_eq!(
        ctl.orders().await,
        vec![OrderRequest::market_buy(TICKER, dec!(499_750))]
    );
}

#[tokio::test]
async fn budget_caps_the_spend() {
    let (exec, ctl) = account(dec!(1_000_000), dec!(0)).await;

    exec.execute(&Decision::buy(TICKER, dec!(0.5)), Some(dec!(200_000)))
        .await
        .unwrap();

    assert_eq!(
        ctl.orders().await,
        vec![OrderRequest::market_buy(TICKER, dec!(99_950))]
    );
}

#[tokio::test]
async fn limit_buy_converts_spend_into_volume() {
    let (exec, ctl) = account(dec!(1_000_000), dec!(0)).await;
    let decision = Decision::buy(TICKER, dec!(0.5)).at_price(dec!(50_000_000));

    exec.execute(&decision, None).await.unwrap();

    assert_eq!(
        ctl.orders().await,
        vec![OrderRequest::limit(TICKER, OrderSide::Buy, dec!(0.009995), dec!(50_000_000))]
    );
}

#[tokio::test]
async fn sell_commits_the_fraction_of_holdings() {
    let (exec, ctl) = account(dec!(0), dec!(0.2)).await;

    exec.execute(&Decision::sell(TICKER, dec!(0.5)), None)
        .await
        .unwrap();

    assert_eq!(
        ctl.orders().await,
        vec![OrderRequest::market_sell(TICKER, dec!(0.1))]
    );
}

#[tokio::test]
async fn hold_places_nothing() {
    let (exec, ctl) = account(dec!(1_000_000), dec!(1)).await;

    assert!(exec.execute(&Decision::hold(TICKER), None).await.unwrap().is_none());
    assert!(ctl.orders().await.is_empty());
}

#[tokio::test]
async fn empty_balances_are_order_errors() {
    let (exec, ctl) = account(dec!(0), dec!(0)).await;

    let buy = exec.execute(&Decision::buy(TICKER, dec!(1)), None).await;
    let sell = exec.execute(&Decision::sell(TICKER, dec!(1)), None).await;

    assert!(matches!(buy, Err(CandelaError::Order(_))));
    assert!(matches!(sell, Err(CandelaError::Order(_))));
    assert!(ctl.orders().await.is_empty());
}
