use console::style;
use haven_config::HavenConfig;
use haven_core::{Result, ShelterSummary};

use super::start::open_store;

pub(super) fn cmd_list(config: &HavenConfig, json: bool) -> Result<()> {
    let shelters = open_store(config)?.list_shelters()?;

    if json {
        let summaries: Vec<ShelterSummary> = shelters.iter().map(ShelterSummary::from).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if shelters.is_empty() {
        println!("No shelters stored.");
        return Ok(());
    }
    for shelter in &shelters {
        println!(
            "{}  {} ({})",
            style(&shelter.id).dim(),
            style(&shelter.name).bold(),
            shelter.location
        );
        println!(
            "   {} animals listed, {} in care, adoption rate {:.1}%",
            shelter.animals.len(),
            shelter.metrics.current_animals,
            shelter.metrics.adoption_rate * 100.0
        );
    }
    Ok(())
}

pub(super) fn cmd_delete(config: &HavenConfig, id: &str) -> Result<()> {
    if open_store(config)?.delete_shelter(id)? {
        println!("{} deleted shelter {id}", style("✓").green().bold());
    } else {
        println!("{} no shelter with id {id}", style("✗").red().bold());
    }
    Ok(())
}
