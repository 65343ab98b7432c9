//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::app::App;
use crate::core::session::SessionSettings;
use crate::core::transport::{ExchangeEvent, TransportService};

pub async fn run_say(
    prompt: Vec<String>,
    settings: SessionSettings,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: confab say <prompt>");
        std::process::exit(1);
    }

    let mut app = App::new(settings);
    let (transport, mut rx) = TransportService::new();

    let Some(params) = app.exchange().submit(&prompt) else {
        return Ok(());
    };
    let exchange_id = params.exchange_id;
    transport.spawn_call(params);

    loop {
        match rx.recv().await {
            Some((ExchangeEvent::Fragment(content), id)) if id == exchange_id => {
                print!("{}", content);
                io::stdout().flush()?;
            }
            Some((ExchangeEvent::Failed(message), _)) => {
                eprintln!("\n\n❌ Error: {}", message);
                std::process::exit(1);
            }
            Some((ExchangeEvent::Closed, _)) => {
                println!();
                break;
            }
            Some((ExchangeEvent::Interrupted, _)) => break,
            Some(_) => {}
            None => break,
        }
    }

    Ok(())
}
