use crate::{
    domain::{Address, AddressError, Amount, AmountError, MarketSnapshot, BASE_UNITS_PER_DISPLAY},
    error::{ClientError, ErrorCode},
    protocol::{ClientEvent, SessionSnapshot},
};

const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

#[test]
fn address_accepts_checksummed_lower_and_upper_spellings() {
    let mixed = Address::parse(CHECKSUMMED).expect("checksummed");
    let lower = Address::parse(&CHECKSUMMED.to_ascii_lowercase()).expect("lower");
    let upper = Address::parse(&format!("0x{}", CHECKSUMMED[2..].to_ascii_uppercase()))
        .expect("upper");

    assert_eq!(mixed, lower);
    assert_eq!(mixed, upper);
    assert_eq!(lower.to_checksum(), CHECKSUMMED);
}

#[test]
fn address_checksum_matches_known_vectors() {
    for vector in [
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ] {
        let parsed = Address::parse(vector).expect("vector parses");
        assert_eq!(parsed.to_string(), vector);
    }
}

#[test]
fn address_rejects_malformed_input() {
    assert_eq!(Address::parse(""), Err(AddressError::Empty));
    assert_eq!(Address::parse("   "), Err(AddressError::Empty));
    assert_eq!(
        Address::parse("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
        Err(AddressError::MissingPrefix)
    );
    assert_eq!(Address::parse("0x1234"), Err(AddressError::WrongLength(4)));
    assert_eq!(
        Address::parse("0xzzzzzz053f3e94c9b9a09f33669435e7ef1beaed"),
        Err(AddressError::NotHex)
    );
    assert_eq!(
        Address::parse("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
        Err(AddressError::BadChecksum)
    );
}

#[test]
fn address_short_form_keeps_prefix_and_tail() {
    let address = Address::parse(CHECKSUMMED).expect("address");
    assert_eq!(address.short(), "0x5aAeb6...Ef1BeAed");
}

#[test]
fn address_serializes_as_checksum_string() {
    let address = Address::parse(&CHECKSUMMED.to_ascii_lowercase()).expect("address");
    let json = serde_json::to_string(&address).expect("serialize");
    assert_eq!(json, format!("\"{CHECKSUMMED}\""));
    let back: Address = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, address);
}

#[test]
fn amount_parses_display_decimals() {
    assert_eq!(Amount::parse_display("1"), Ok(Amount::ONE));
    assert_eq!(
        Amount::parse_display("0.5").map(|a| a.base_units()),
        Ok(BASE_UNITS_PER_DISPLAY / 2)
    );
    assert_eq!(
        Amount::parse_display(".25").map(|a| a.base_units()),
        Ok(BASE_UNITS_PER_DISPLAY / 4)
    );
    assert_eq!(Amount::parse_display("2."), Amount::parse_display("2"));
    assert_eq!(
        Amount::parse_display("0.000000000000000001").map(|a| a.base_units()),
        Ok(1)
    );
}

#[test]
fn amount_rejects_bad_display_input() {
    assert_eq!(Amount::parse_display(""), Err(AmountError::Empty));
    assert!(matches!(
        Amount::parse_display("-1"),
        Err(AmountError::Malformed(_))
    ));
    assert!(matches!(
        Amount::parse_display("1e5"),
        Err(AmountError::Malformed(_))
    ));
    assert!(matches!(
        Amount::parse_display("1.2.3"),
        Err(AmountError::Malformed(_))
    ));
    assert!(matches!(
        Amount::parse_display("."),
        Err(AmountError::Malformed(_))
    ));
    assert_eq!(
        Amount::parse_display("0.0000000000000000001"),
        Err(AmountError::TooPrecise)
    );
    assert_eq!(
        Amount::parse_display("999999999999999999999999"),
        Err(AmountError::Overflow)
    );
}

#[test]
fn amount_display_round_trips_at_full_precision() {
    for raw in ["0", "1", "0.1", "0.01", "12.345", "0.000000000000000001", "42.5"] {
        let amount = Amount::parse_display(raw).expect("parse");
        assert_eq!(amount.to_display(), raw);
        assert_eq!(Amount::parse_display(&amount.to_display()), Ok(amount));
    }
    assert_eq!(Amount::parse_display("1.50").expect("parse").to_display(), "1.5");
}

#[test]
fn snapshot_quote_multiplies_cached_price() {
    let snapshot = MarketSnapshot {
        price_per_credit: Amount::parse_display("0.01").expect("price"),
        available_credits: 1000,
        total_purchases: 4,
        validator_count: 2,
        total_staked: Amount::parse_display("3").expect("staked"),
        reward_pool: Amount::ZERO,
    };

    assert_eq!(
        snapshot.quote(10).map(|a| a.to_display()),
        Some("0.1".to_string())
    );
    assert_eq!(snapshot.quote(0), Some(Amount::ZERO));
}

#[test]
fn error_codes_and_locality() {
    assert_eq!(ClientError::Busy.code(), ErrorCode::Busy);
    assert!(ClientError::Busy.is_local());
    assert!(ClientError::validation("bad").is_local());
    assert!(!ClientError::RemoteUnavailable("down".into()).is_local());

    let from_amount: ClientError = AmountError::Empty.into();
    assert_eq!(from_amount.code(), ErrorCode::Validation);
    let from_address: ClientError = AddressError::NotHex.into();
    assert_eq!(from_address.code(), ErrorCode::InvalidAddress);
}

#[test]
fn session_event_serializes_with_type_tag() {
    let event = ClientEvent::SessionChanged(SessionSnapshot {
        address: Some(Address::parse(CHECKSUMMED).expect("address")),
        network: None,
        is_privileged: true,
    });
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(value["type"], "session_changed");
    assert_eq!(value["payload"]["address"], CHECKSUMMED);
    assert_eq!(value["payload"]["is_privileged"], true);
    assert!(value["payload"].get("network").is_none());
}
