use shared::{
    domain::{MarketSnapshot, ValidatorRecord},
    protocol::{ClientCommand, ClientEvent, TransactionPhase},
};

pub const HELP: &str = "\
commands:
  connect                      authorize a wallet account
  register <stake> <score>     register as validator (stake in ETH, score 50-100)
  buy <credits>                purchase carbon offset credits
  quote <credits>              cost preview at the cached price
  info <address>|me            look up a validator (blank clears)
  distribute                   distribute sustainability rewards (owner only)
  refresh                      re-read market data
  status                       show session, market and transaction state
  help                         show this text
  quit                         exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(ClientCommand),
    Quote(u64),
    Status,
    Help,
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> Result<Input, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(Input::Empty);
    };
    let args: Vec<&str> = parts.collect();

    let input = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("connect", []) => Input::Command(ClientCommand::Connect),
        ("register", [stake, score]) => Input::Command(ClientCommand::RegisterValidator {
            stake: (*stake).to_string(),
            score: parse_count(score, "score")?,
        }),
        ("buy", [credits]) => Input::Command(ClientCommand::PurchaseOffset {
            credits: parse_count(credits, "credits")?,
        }),
        ("quote", [credits]) => Input::Quote(parse_count(credits, "credits")?),
        ("info", ["me"]) => Input::Command(ClientCommand::FetchOwnValidatorInfo),
        ("info", [address]) => Input::Command(ClientCommand::FetchValidatorInfo {
            address: (*address).to_string(),
        }),
        ("info", []) => Input::Command(ClientCommand::FetchValidatorInfo {
            address: String::new(),
        }),
        ("distribute", []) => Input::Command(ClientCommand::DistributeRewards),
        ("refresh", []) => Input::Command(ClientCommand::RefreshAll),
        ("status", []) => Input::Status,
        ("help" | "?", _) => Input::Help,
        ("quit" | "exit", []) => Input::Quit,
        (verb, _) => return Err(format!("unrecognized command '{verb}'; type 'help'")),
    };
    Ok(input)
}

fn parse_count(raw: &str, what: &str) -> Result<u64, String> {
    raw.parse()
        .map_err(|_| format!("{what} must be a whole number, got '{raw}'"))
}

pub fn render_market(snapshot: &MarketSnapshot) -> String {
    format!(
        "market: price/credit {} | available {} | purchased {} | validators {} | staked {} | reward pool {}",
        snapshot.price_per_credit,
        snapshot.available_credits,
        snapshot.total_purchases,
        snapshot.validator_count,
        snapshot.total_staked,
        snapshot.reward_pool,
    )
}

pub fn render_validator(record: &ValidatorRecord) -> String {
    format!(
        "validator {}: staked {} | score {} | credits {} | rewards {} | {}",
        record.address.short(),
        record.staked_amount,
        record.efficiency_score,
        record.credits_owned,
        record.total_rewards_earned,
        if record.is_active { "active" } else { "inactive" },
    )
}

pub fn render_event(event: &ClientEvent) -> String {
    match event {
        ClientEvent::SessionChanged(session) => {
            let mut line = session.status_line();
            if let Some(network) = session.network {
                line.push_str(&format!(" (network {network})"));
            }
            if session.is_privileged {
                line.push_str(" [owner]");
            }
            line
        }
        ClientEvent::MarketUpdated(snapshot) => render_market(snapshot),
        ClientEvent::ValidatorUpdated(Some(record)) => render_validator(record),
        ClientEvent::ValidatorUpdated(None) => "validator: cleared".to_string(),
        ClientEvent::TransactionLifecycle(update) => match &update.phase {
            TransactionPhase::Submitting => format!("tx: {}", update.description),
            TransactionPhase::Pending { tx_hash } => {
                format!("tx: {} (pending {tx_hash})", update.description)
            }
            TransactionPhase::Confirmed { tx_hash } => {
                format!("tx: {} ({tx_hash})", update.description)
            }
            TransactionPhase::Failed { .. } => format!("tx: {}", update.description),
        },
        ClientEvent::Error(payload) => {
            let code = serde_json::to_value(payload.code)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            format!("error [{code}]: {}", payload.message)
        }
    }
}

#[cfg(test)]
#[path = "tests/repl_tests.rs"]
mod tests;
