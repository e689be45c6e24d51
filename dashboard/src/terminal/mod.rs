use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, info, warn};

use crate::{
    dashboard::DashboardEvent,
    utils::{cancellation::CancellationToken, constants::ENABLE_BUTTON_ID},
    view::{element_id, Element, ElementRole, MemorySurface, UiSurface},
};

const HELP: &str = "commands: connect | supply <asset> <amount> | borrow <asset> <amount> | \
collateral <asset> on|off | refresh | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect,
    Supply { asset: String, amount: String },
    Borrow { asset: String, amount: String },
    Collateral { asset: String, enabled: bool },
    Refresh,
    Help,
    Quit,
}

/// Parses one line typed by the user
pub fn parse_command(line: &str) -> Result<Command> {
    let words = line.split_whitespace().collect::<Vec<_>>();

    let command = match words.as_slice() {
        ["connect"] => Command::Connect,
        ["supply", asset, amount] => Command::Supply {
            asset: asset.to_uppercase(),
            amount: amount.to_string(),
        },
        ["borrow", asset, amount] => Command::Borrow {
            asset: asset.to_uppercase(),
            amount: amount.to_string(),
        },
        ["collateral", asset, switch] => Command::Collateral {
            asset: asset.to_uppercase(),
            enabled: match *switch {
                "on" => true,
                "off" => false,
                other => bail!("expected on or off, got {}", other),
            },
        },
        ["refresh"] => Command::Refresh,
        ["help"] | [] => Command::Help,
        ["quit"] | ["exit"] => Command::Quit,
        _ => bail!("unknown command {:?}", line.trim()),
    };

    Ok(command)
}

/// Memory-backed surface that prints a position table to stdout on every render
pub struct TerminalSurface {
    inner: MemorySurface,
    assets: Vec<String>,
}

impl TerminalSurface {
    pub fn new(assets: &[String]) -> Self {
        Self {
            inner: MemorySurface::with_dashboard_elements(assets),
            assets: assets.to_vec(),
        }
    }

    /// Writes the command's inputs into the surface and returns the matching click
    pub fn apply(&self, command: Command) -> Option<DashboardEvent> {
        match command {
            Command::Connect => Some(DashboardEvent::ConnectClicked),
            Command::Supply { asset, amount } => {
                self.set_input(&asset, ElementRole::SupplyInput, &amount)?;
                Some(DashboardEvent::SupplyClicked { asset })
            }
            Command::Borrow { asset, amount } => {
                self.set_input(&asset, ElementRole::BorrowInput, &amount)?;
                Some(DashboardEvent::BorrowClicked { asset })
            }
            Command::Collateral { asset, enabled } => {
                self.known_element(&asset, ElementRole::CollateralCheckbox)?;
                Some(DashboardEvent::CollateralToggled {
                    asset,
                    checked: enabled,
                })
            }
            Command::Refresh => Some(DashboardEvent::Refresh),
            Command::Quit => Some(DashboardEvent::Quit),
            Command::Help => {
                println!("{}", HELP);
                None
            }
        }
    }

    /// Position table as printed by `render`, headed by the connection status
    pub fn table(&self) -> String {
        let mut lines = Vec::new();

        let status = self
            .inner
            .element(ENABLE_BUTTON_ID)
            .map(|button| button.text())
            .unwrap_or_default();
        if !status.is_empty() {
            lines.push(status);
        }

        lines.push(format!(
            "{:<8} {:>16} {:>16} {:>16} {:>10}",
            "ASSET", "SUPPLIED", "BORROWED", "BORROWABLE", "COLLATERAL"
        ));

        for asset in &self.assets {
            let text = |role| {
                self.inner
                    .element(&element_id(asset, role))
                    .map(|element| element.text())
                    .unwrap_or_default()
            };
            let collateral = self
                .inner
                .element(&element_id(asset, ElementRole::CollateralCheckbox))
                .map(|element| element.is_checked())
                .unwrap_or_default();

            lines.push(format!(
                "{:<8} {:>16} {:>16} {:>16} {:>10}",
                asset,
                text(ElementRole::Supplied),
                text(ElementRole::Borrowed),
                text(ElementRole::Borrowable),
                if collateral { "yes" } else { "no" }
            ));
        }

        lines.join("\n")
    }

    fn known_element(&self, asset: &str, role: ElementRole) -> Option<Element> {
        let element = self.inner.element(&element_id(asset, role));
        if element.is_none() {
            println!("unknown asset {}", asset);
        }
        element
    }

    fn set_input(&self, asset: &str, role: ElementRole, amount: &str) -> Option<()> {
        self.known_element(asset, role)?.set_value(amount);
        Some(())
    }
}

impl UiSurface for TerminalSurface {
    fn element(&self, id: &str) -> Option<Element> {
        self.inner.element(id)
    }

    fn alert(&self, message: &str) {
        self.inner.alert(message);
        println!("! {}", message);
    }

    fn render(&self) {
        println!("{}\n", self.table());
    }
}

/// Turns stdin lines into dashboard events until `quit`, end of input or cancellation
pub async fn read_commands(
    surface: Arc<TerminalSurface>,
    events: UnboundedSender<DashboardEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read from stdin")?,
        };

        let Some(line) = line else {
            info!("stdin closed");
            let _ = events.send(DashboardEvent::Quit);
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                println!("{}\n{}", e, HELP);
                continue;
            }
        };
        debug!("Command {:?}", command);

        let quit = command == Command::Quit;
        if let Some(event) = surface.apply(command) {
            if events.send(event).is_err() {
                break;
            }
        }
        if quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_symbols;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("connect").unwrap(), Command::Connect);
        assert_eq!(
            parse_command("  supply eth 1.5 ").unwrap(),
            Command::Supply {
                asset: "ETH".to_string(),
                amount: "1.5".to_string()
            }
        );
        assert_eq!(
            parse_command("collateral usdc off").unwrap(),
            Command::Collateral {
                asset: "USDC".to_string(),
                enabled: false
            }
        );
        assert_eq!(parse_command("").unwrap(), Command::Help);
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
        assert!(parse_command("collateral usdc maybe").is_err());
        assert!(parse_command("borrow eth").is_err());
        assert!(parse_command("withdraw eth 1").is_err());
    }

    #[test]
    fn test_apply_writes_input_before_click() {
        let surface = TerminalSurface::new(&test_symbols());

        let event = surface.apply(Command::Borrow {
            asset: "UNI".to_string(),
            amount: "3".to_string(),
        });

        assert_eq!(
            event,
            Some(DashboardEvent::BorrowClicked {
                asset: "UNI".to_string()
            })
        );
        assert_eq!(surface.element("uni-borrow-input").unwrap().value(), "3");
    }

    #[test]
    fn test_apply_ignores_unknown_asset() {
        let surface = TerminalSurface::new(&test_symbols());

        let event = surface.apply(Command::Supply {
            asset: "DOGE".to_string(),
            amount: "1".to_string(),
        });

        assert_eq!(event, None);
    }

    #[test]
    fn test_table_lists_every_asset() {
        let surface = TerminalSurface::new(&test_symbols());
        surface.element("eth-supplied").unwrap().set_text("1.5");
        surface
            .element("usdc-collateral-checkbox")
            .unwrap()
            .set_checked(true);

        let table = surface.table();
        let rows = table.lines().collect::<Vec<_>>();

        assert_eq!(rows.len(), 4);
        assert!(rows[1].starts_with("ETH") && rows[1].contains("1.5"));
        assert!(rows[2].starts_with("USDC") && rows[2].ends_with("yes"));
        assert!(rows[3].ends_with("no"));

        surface
            .element(ENABLE_BUTTON_ID)
            .unwrap()
            .set_text("Connected 0xabc");
        let table = surface.table();
        assert_eq!(table.lines().next(), Some("Connected 0xabc"));
        assert_eq!(table.lines().count(), 5);
    }
}
