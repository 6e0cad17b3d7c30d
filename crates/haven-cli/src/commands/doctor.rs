use std::path::Path;

use console::style;
use haven_chain::{ChainClient, RpcClient, format_ether};
use haven_config::{HavenConfig, WarningSeverity};
use haven_core::Result;

use super::start::open_store;

pub(super) async fn cmd_doctor(config: &HavenConfig, path: &Path, offline: bool) -> Result<()> {
    println!("🩺 Haven Doctor");
    println!("   Config: {}", path.display());
    println!();

    let warnings = match config.validate() {
        Ok(w) => w,
        Err(e) => {
            println!("{e}");
            return Ok(());
        }
    };

    let mut warn_count = 0;
    let mut info_count = 0;
    for w in &warnings {
        println!("  {w}");
        match w.severity {
            WarningSeverity::Warning => warn_count += 1,
            WarningSeverity::Info => info_count += 1,
            WarningSeverity::Error => {}
        }
    }
    if !warnings.is_empty() {
        println!();
    }

    let mut ok_count = 0;
    let mut fail_count = 0;
    let mut check = |name: &str, outcome: std::result::Result<String, String>| match outcome {
        Ok(detail) => {
            ok_count += 1;
            println!("  {} {name}: {detail}", style("✓").green().bold());
        }
        Err(detail) => {
            fail_count += 1;
            println!("  {} {name}: {}", style("✗").red().bold(), style(detail).red());
        }
    };

    let missing = config.missing_agent_settings();
    check(
        "agent settings",
        if missing.is_empty() {
            Ok(format!("model {}", config.agent.model))
        } else {
            Err(format!("missing {}", missing.join(", ")))
        },
    );

    check(
        "store",
        open_store(config)
            .and_then(|store| store.shelter_count())
            .map(|n| format!("{} ({n} shelters)", config.storage.db_path.display()))
            .map_err(|e| e.to_string()),
    );

    if !offline {
        let outcome = match (&config.chain.rpc_url, &config.chain.contract_address) {
            (Some(url), Some(contract)) => RpcClient::new(url.clone())
                .balance(contract)
                .await
                .map(|wei| format!("contract balance {} ETH", format_ether(wei)))
                .map_err(|e| e.to_string()),
            (None, _) => Err("chain.rpc_url is not set".to_string()),
            (_, None) => Err("chain.contract_address is not set".to_string()),
        };
        check("chain", outcome);
    }

    println!();
    println!(
        "  ✅ {ok_count} checks passed, ❌ {fail_count} failed, ⚠️  {warn_count} warnings, 💡 {info_count} suggestions"
    );
    Ok(())
}
