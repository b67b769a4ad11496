//! List rules command implementation.

use kolint::rules::all_rules;

/// Runs the list-rules command.
pub fn run() {
    println!("Available rules:\n");
    println!("{:<40} {:<13} Description", "Rule", "Stability");
    println!("{}", "-".repeat(110));

    for rule in all_rules() {
        let stability = if rule.descriptor().experimental {
            "experimental"
        } else {
            "stable"
        };
        println!(
            "{:<40} {:<13} {}",
            rule.id().as_str(),
            stability,
            rule.description()
        );
    }

    println!("\nPresets:");
    println!("  standard      - All stable rules (default)");
    println!("  experimental  - Experimental rules only");
    println!("  all           - Stable and experimental rules");

    println!("\nDisable a rule in kolint.toml, e.g.:");
    println!("  [rules.\"standard:max-line-length\"]");
    println!("  enabled = false");
}
