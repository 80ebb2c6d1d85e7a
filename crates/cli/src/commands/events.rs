use serde_json::json;
use xray_history::EventType;

use crate::{print_json, Config, OutputFormat};

pub(crate) fn cmd_events(config: &Config) {
    match config.output {
        OutputFormat::Json => {
            let table: Vec<serde_json::Value> = EventType::ALL
                .iter()
                .map(|t| {
                    json!({
                        "code": t.code(),
                        "name": t.name(),
                        "internal": t.is_internal(),
                    })
                })
                .collect();
            print_json(&table);
        }
        OutputFormat::Text => {
            for t in EventType::ALL {
                let marker = if t.is_internal() { "  (internal)" } else { "" };
                println!("{:>3}  {}{}", t.code(), t.name(), marker);
            }
        }
    }
}
