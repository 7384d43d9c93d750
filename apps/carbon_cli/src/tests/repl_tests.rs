use super::*;

use serde_json::json;
use shared::{
    domain::{Address, Amount, NetworkId},
    error::{ErrorCode, ErrorPayload},
    protocol::SessionSnapshot,
};

#[test]
fn parses_every_presentation_command() {
    assert_eq!(
        parse_line("connect"),
        Ok(Input::Command(ClientCommand::Connect))
    );
    assert_eq!(
        parse_line("  register 1.5 80 "),
        Ok(Input::Command(ClientCommand::RegisterValidator {
            stake: "1.5".into(),
            score: 80
        }))
    );
    assert_eq!(
        parse_line("BUY 10"),
        Ok(Input::Command(ClientCommand::PurchaseOffset { credits: 10 }))
    );
    assert_eq!(
        parse_line("info me"),
        Ok(Input::Command(ClientCommand::FetchOwnValidatorInfo))
    );
    assert_eq!(
        parse_line("info 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
        Ok(Input::Command(ClientCommand::FetchValidatorInfo {
            address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".into()
        }))
    );
    assert_eq!(
        parse_line("info"),
        Ok(Input::Command(ClientCommand::FetchValidatorInfo {
            address: String::new()
        }))
    );
    assert_eq!(
        parse_line("distribute"),
        Ok(Input::Command(ClientCommand::DistributeRewards))
    );
    assert_eq!(
        parse_line("refresh"),
        Ok(Input::Command(ClientCommand::RefreshAll))
    );
    assert_eq!(parse_line("quote 3"), Ok(Input::Quote(3)));
    assert_eq!(parse_line("status"), Ok(Input::Status));
    assert_eq!(parse_line("exit"), Ok(Input::Quit));
    assert_eq!(parse_line("   "), Ok(Input::Empty));
}

#[test]
fn rejects_bad_arity_and_numbers() {
    assert!(parse_line("register 1").is_err());
    assert!(parse_line("buy").is_err());
    assert!(parse_line("buy -1").is_err());
    assert!(parse_line("register 1 eighty").is_err());
    assert!(parse_line("connect now").is_err());
    assert!(parse_line("dance").is_err());
}

#[test]
fn renders_session_and_errors() {
    let address = Address::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").expect("address");
    let line = render_event(&ClientEvent::SessionChanged(SessionSnapshot {
        address: Some(address),
        network: Some(NetworkId(1337)),
        is_privileged: true,
    }));
    assert_eq!(line, "Connected: 0x5aAeb6...Ef1BeAed (network 1337) [owner]");

    let line = render_event(&ClientEvent::SessionChanged(SessionSnapshot::default()));
    assert_eq!(line, "Not Connected");

    let line = render_event(&ClientEvent::Error(ErrorPayload::new(
        ErrorCode::Validation,
        "Minimum stake amount is 1 ETH",
    )));
    assert_eq!(line, "error [validation]: Minimum stake amount is 1 ETH");
}

#[test]
fn renders_lifecycle_with_hash() {
    let event: ClientEvent = serde_json::from_value(json!({
        "type": "transaction_lifecycle",
        "payload": {
            "kind": "purchase_offset",
            "description": "Purchasing carbon credits...",
            "phase": "pending",
            "tx_hash": "0xabc",
            "at": "2024-01-01T00:00:00Z",
        }
    }))
    .expect("lifecycle event");
    assert_eq!(
        render_event(&event),
        "tx: Purchasing carbon credits... (pending 0xabc)"
    );
}

#[test]
fn renders_market_amounts_in_display_units() {
    let snapshot = MarketSnapshot {
        price_per_credit: Amount::parse_display("0.01").expect("price"),
        available_credits: 1000,
        total_purchases: 2,
        validator_count: 3,
        total_staked: Amount::parse_display("12.5").expect("staked"),
        reward_pool: Amount::ZERO,
    };
    let line = render_market(&snapshot);
    assert!(line.contains("price/credit 0.01 ETH"));
    assert!(line.contains("staked 12.5 ETH"));
    assert!(line.contains("reward pool 0 ETH"));
}
