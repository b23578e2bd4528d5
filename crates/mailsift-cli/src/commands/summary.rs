//! `mailsift summary` — label distribution grouped by urgency

use anyhow::Result;
use mailsift_core::{CorpusStore, Taxonomy, UrgencyGroup};

const BAR_WIDTH: u64 = 40;

pub fn run(store: &dyn CorpusStore, taxonomy: &Taxonomy) -> Result<()> {
    let distribution = store.label_distribution()?;
    let total = store.message_count()?;
    let unlabeled = store.unlabeled_count()?;

    println!(
        "{total} messages ingested, {} labeled, {unlabeled} unlabeled",
        total - unlabeled
    );

    let max = distribution.values().copied().max().unwrap_or(0);
    for group in [
        UrgencyGroup::Action,
        UrgencyGroup::Informational,
        UrgencyGroup::Noise,
    ] {
        println!("\n{}", group.heading());
        for spec in taxonomy.group(group) {
            let count = distribution.get(&spec.name).copied().unwrap_or(0);
            let bar = if max == 0 {
                0
            } else {
                (count * BAR_WIDTH / max) as usize
            };
            println!("  {:<26} {:>6}  {}", spec.name, count, "#".repeat(bar));
        }
    }
    Ok(())
}
